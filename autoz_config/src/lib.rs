#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas for the Z-offset acquisition engine.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - Custom sampling plans can be loaded from a strict `x,y` CSV.
//! - `PersistedState` is the durable offset / boot-wizard record.
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// One XY point of a sampling plan, in bed coordinates (mm).
///
/// CSV headers:
/// x,y
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct PlanPoint {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Deserialize)]
pub struct Pins {
    pub hx711_sck: u8,
    pub hx711_dt: u8,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Hardware {
    /// Max time to wait for HX711 data-ready (DT low) before transferring anyway
    #[serde(alias = "sensor_ms")]
    pub sensor_read_timeout_ms: u64,
    /// Conversion rate the amplifier is strapped to
    pub sample_rate_hz: u32,
}

impl Default for Hardware {
    fn default() -> Self {
        Self {
            sensor_read_timeout_ms: 20,
            sample_rate_hz: 80,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct FilterCfg {
    /// High-pass cutoff
    pub cutoff_hz: f32,
    /// Low-pass smoothing weight of the newest sample, (0, 1]
    pub lowpass_k: f32,
}

impl Default for FilterCfg {
    fn default() -> Self {
        Self {
            cutoff_hz: 1.0,
            lowpass_k: 0.9,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TriggerCfg {
    pub min_hold: f32,
    pub max_hold: f32,
}

impl Default for TriggerCfg {
    fn default() -> Self {
        Self {
            min_hold: 2000.0,
            max_hold: 10000.0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ScanCfg {
    pub step_mm: f32,
    /// Deepest travel below the scan base, negative
    pub max_depth_mm: f32,
    pub xy_speed_mm_s: f32,
    pub z_speed_mm_s: f32,
    pub baseline_samples: usize,
}

impl Default for ScanCfg {
    fn default() -> Self {
        Self {
            step_mm: 0.02,
            max_depth_mm: -10.0,
            xy_speed_mm_s: 100.0,
            z_speed_mm_s: 2.0,
            baseline_samples: 8,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RepeatCfg {
    /// Rounds of paired scans; 0 means a single scan
    pub attempts: i32,
    pub tolerance_mm: f32,
    /// Repeated measurements per press, aggregated by median
    pub press_samples: usize,
}

impl Default for RepeatCfg {
    fn default() -> Self {
        Self {
            attempts: 0,
            tolerance_mm: 0.0,
            press_samples: 3,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ReconcileCfg {
    pub initial_samples: u8,
    pub max_samples: u8,
    pub tolerance_mm: f32,
    pub y_spacing_mm: f32,
}

impl Default for ReconcileCfg {
    fn default() -> Self {
        Self {
            initial_samples: 1,
            max_samples: 2,
            tolerance_mm: 0.05,
            y_spacing_mm: 5.0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct OffsetCfg {
    pub min_mm: f32,
    pub max_mm: f32,
    /// Added to every press result to compensate nozzle thermal expansion
    pub nozzle_expansion_mm: f32,
    /// Values closer to zero than this are treated as unmeasured
    pub ghost_epsilon_mm: f32,
}

impl Default for OffsetCfg {
    fn default() -> Self {
        Self {
            min_mm: -5.0,
            max_mm: 0.0,
            nozzle_expansion_mm: 0.05,
            ghost_epsilon_mm: 0.001,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ProbeCfg {
    /// Touch probe XY position relative to the nozzle
    pub nozzle_to_probe: [f32; 2],
    /// Where single-scan diagnostics press
    pub press_position: [f32; 2],
    pub travel_z_mm: f32,
    pub shake_times: u32,
}

impl Default for ProbeCfg {
    fn default() -> Self {
        Self {
            nozzle_to_probe: [-24.25, -15.0],
            press_position: [25.0, 28.0],
            travel_z_mm: 4.0,
            shake_times: 20,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlanKind {
    #[default]
    Four,
    Five,
    Custom,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct PlanCfg {
    pub kind: PlanKind,
    /// Inline points for `kind = "custom"`
    pub points: Vec<[f32; 2]>,
    /// CSV alternative to `points`; takes precedence when both are set
    pub points_csv: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CleanCfg {
    pub enabled: bool,
    pub start: [f32; 3],
    pub end: [f32; 3],
    pub hotend_c: f32,
    pub bed_c: f32,
}

impl Default for CleanCfg {
    fn default() -> Self {
        Self {
            enabled: true,
            start: [0.0, 15.0, 0.0],
            end: [0.0, 60.0, 0.0],
            hotend_c: 175.0,
            bed_c: 60.0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ThermalCfg {
    pub wait_timeout_ms: u64,
    pub hotend_tolerance_c: f32,
    pub bed_tolerance_c: f32,
}

impl Default for ThermalCfg {
    fn default() -> Self {
        Self {
            wait_timeout_ms: 300_000,
            hotend_tolerance_c: 5.0,
            bed_tolerance_c: 2.0,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub pins: Pins,
    #[serde(default)]
    pub hardware: Hardware,
    #[serde(default)]
    pub filter: FilterCfg,
    #[serde(default)]
    pub trigger: TriggerCfg,
    #[serde(default)]
    pub scan: ScanCfg,
    #[serde(default)]
    pub repeat: RepeatCfg,
    #[serde(default)]
    pub reconcile: ReconcileCfg,
    #[serde(default)]
    pub offset: OffsetCfg,
    #[serde(default)]
    pub probe: ProbeCfg,
    #[serde(default)]
    pub plan: PlanCfg,
    #[serde(default)]
    pub clean: CleanCfg,
    #[serde(default)]
    pub thermal: ThermalCfg,
    #[serde(default)]
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

pub fn load_points_csv(path: &Path) -> eyre::Result<Vec<PlanPoint>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open plan CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["x", "y"];
    let actual: Vec<String> = headers.iter().map(ToString::to_string).collect();
    if actual != expected {
        eyre::bail!(
            "plan CSV must have headers 'x,y', got: {}",
            actual.join(",")
        );
    }

    let mut points = Vec::new();
    for (idx, rec) in rdr.deserialize::<PlanPoint>().enumerate() {
        match rec {
            Ok(p) => points.push(p),
            Err(e) => eyre::bail!("invalid CSV row {}: {}", idx + 2, e),
        }
    }
    if points.is_empty() {
        eyre::bail!("plan CSV {:?} has no points", path);
    }
    Ok(points)
}

impl Config {
    /// Points of a custom plan: CSV when configured, otherwise the inline list.
    /// Empty for the built-in plans.
    pub fn custom_points(&self) -> eyre::Result<Vec<PlanPoint>> {
        if self.plan.kind != PlanKind::Custom {
            return Ok(Vec::new());
        }
        if let Some(path) = &self.plan.points_csv {
            return load_points_csv(path);
        }
        Ok(self
            .plan
            .points
            .iter()
            .map(|[x, y]| PlanPoint { x: *x, y: *y })
            .collect())
    }

    pub fn validate(&self) -> eyre::Result<()> {
        // Pins
        if self.pins.hx711_sck == self.pins.hx711_dt {
            eyre::bail!("pins.hx711_sck and pins.hx711_dt must differ");
        }

        // Hardware
        if self.hardware.sensor_read_timeout_ms == 0 {
            eyre::bail!("hardware.sensor_read_timeout_ms must be >= 1");
        }
        if self.hardware.sample_rate_hz == 0 {
            eyre::bail!("hardware.sample_rate_hz must be > 0");
        }

        // Filter
        if !(self.filter.cutoff_hz.is_finite() && self.filter.cutoff_hz > 0.0) {
            eyre::bail!("filter.cutoff_hz must be > 0");
        }
        if !(self.filter.lowpass_k > 0.0 && self.filter.lowpass_k <= 1.0) {
            eyre::bail!("filter.lowpass_k must be in (0.0, 1.0]");
        }

        // Trigger
        if !(self.trigger.min_hold.is_finite() && self.trigger.min_hold > 0.0) {
            eyre::bail!("trigger.min_hold must be > 0");
        }
        if !(self.trigger.max_hold.is_finite() && self.trigger.max_hold > self.trigger.min_hold) {
            eyre::bail!("trigger.max_hold must be greater than trigger.min_hold");
        }

        // Scan
        if !(self.scan.step_mm > 0.0 && self.scan.step_mm <= 1.0) {
            eyre::bail!("scan.step_mm must be in (0.0, 1.0]");
        }
        if !(self.scan.max_depth_mm.is_finite() && self.scan.max_depth_mm < 0.0) {
            eyre::bail!("scan.max_depth_mm must be negative");
        }
        if self.scan.xy_speed_mm_s <= 0.0 || self.scan.z_speed_mm_s <= 0.0 {
            eyre::bail!("scan speeds must be > 0");
        }
        if self.scan.baseline_samples == 0 {
            eyre::bail!("scan.baseline_samples must be >= 1");
        }

        // Repeat
        if self.repeat.tolerance_mm < 0.0 {
            eyre::bail!("repeat.tolerance_mm must be >= 0.0");
        }
        if self.repeat.press_samples == 0 {
            eyre::bail!("repeat.press_samples must be >= 1");
        }

        // Reconcile
        if !(1..=3).contains(&self.reconcile.initial_samples) {
            eyre::bail!("reconcile.initial_samples must be in [1, 3]");
        }
        if !(1..=3).contains(&self.reconcile.max_samples) {
            eyre::bail!("reconcile.max_samples must be in [1, 3]");
        }
        if self.reconcile.tolerance_mm < 0.0 {
            eyre::bail!("reconcile.tolerance_mm must be >= 0.0");
        }

        // Offset
        if !(self.offset.min_mm.is_finite()
            && self.offset.max_mm.is_finite()
            && self.offset.min_mm < self.offset.max_mm)
        {
            eyre::bail!("offset.min_mm must be less than offset.max_mm");
        }
        if self.offset.ghost_epsilon_mm < 0.0 {
            eyre::bail!("offset.ghost_epsilon_mm must be >= 0.0");
        }

        // Probe
        if !self.probe.travel_z_mm.is_finite() || self.probe.travel_z_mm <= 0.0 {
            eyre::bail!("probe.travel_z_mm must be > 0");
        }

        // Plan
        if self.plan.kind == PlanKind::Custom
            && self.plan.points.is_empty()
            && self.plan.points_csv.is_none()
        {
            eyre::bail!("plan.kind = \"custom\" requires plan.points or plan.points_csv");
        }

        // Thermal
        if self.thermal.hotend_tolerance_c <= 0.0 || self.thermal.bed_tolerance_c <= 0.0 {
            eyre::bail!("thermal tolerances must be > 0");
        }
        if self.thermal.wait_timeout_ms > 60 * 60 * 1000 {
            eyre::bail!("thermal.wait_timeout_ms is unreasonably large (>1h)");
        }

        Ok(())
    }
}

/// Durable machine state written after a committed run.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Default)]
#[serde(default)]
pub struct PersistedState {
    pub z_offset_mm: f32,
    /// First-run wizard still in progress
    pub boot_wizard_pending: bool,
    pub boot_step: u8,
}

impl PersistedState {
    pub fn from_toml(s: &str) -> eyre::Result<Self> {
        toml::from_str(s).map_err(|e| eyre::eyre!("parse persisted state: {e}"))
    }

    pub fn to_toml(&self) -> eyre::Result<String> {
        toml::to_string(self).map_err(|e| eyre::eyre!("serialize persisted state: {e}"))
    }

    /// Missing file reads as the default state.
    pub fn load(path: &Path) -> eyre::Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(s) => Self::from_toml(&s),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(eyre::eyre!("read persisted state {:?}: {}", path, e)),
        }
    }

    /// Bounds check before a durable write.
    pub fn check_range(&self, min_mm: f32, max_mm: f32) -> eyre::Result<()> {
        if !self.z_offset_mm.is_finite() || self.z_offset_mm < min_mm || self.z_offset_mm > max_mm {
            eyre::bail!(
                "z_offset_mm {} outside [{}, {}]",
                self.z_offset_mm,
                min_mm,
                max_mm
            );
        }
        Ok(())
    }
}
