//! Runtime configuration for the acquisition engine.
//!
//! These are separate from the TOML-deserialized config in `autoz_config`;
//! `conversions` bridges the two.

use std::time::Duration;

use autoz_traits::Position;

use crate::error::BuildError;

/// Half the sample window: rolling context and analysis zone are each this long.
pub const WINDOW_HALF: usize = 32;
/// Full sample window length.
pub const WINDOW_LEN: usize = WINDOW_HALF * 2;

/// Filter chain constants.
#[derive(Debug, Clone, Copy)]
pub struct FilterCfg {
    /// High-pass cutoff (Hz).
    pub cutoff_hz: f32,
    /// Sample rate the high-pass coefficient is computed for (Hz).
    pub sample_rate_hz: f32,
    /// Low-pass weight of the newest sample.
    pub lowpass_k: f32,
}

impl Default for FilterCfg {
    fn default() -> Self {
        Self {
            cutoff_hz: 1.0,
            sample_rate_hz: 80.0,
            lowpass_k: 0.9,
        }
    }
}

/// Contact detector thresholds, in filtered counts.
#[derive(Debug, Clone, Copy, PartialEq)]
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

#[derive(Debug, Clone, Copy)]
pub struct ScanCfg {
    pub step_mm: f32,
    pub max_depth_mm: f32,
    pub xy_speed_mm_s: f32,
    pub z_speed_mm_s: f32,
    pub baseline_samples: usize,
    /// Upper bound on a single amplifier read.
    pub read_timeout: Duration,
}

impl Default for ScanCfg {
    fn default() -> Self {
        Self {
            step_mm: 0.02,
            max_depth_mm: -10.0,
            xy_speed_mm_s: 100.0,
            z_speed_mm_s: 2.0,
            baseline_samples: 8,
            read_timeout: Duration::from_millis(20),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RepeatCfg {
    pub attempts: i32,
    pub tolerance_mm: f32,
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

#[derive(Debug, Clone, Copy)]
pub struct ReconcileCfg {
    /// Samples taken up front, clamped into [1, 3].
    pub initial_samples: u8,
    /// Total samples permitted, clamped into [1, 3].
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

/// Acceptance window for offsets.
#[derive(Debug, Clone, Copy)]
pub struct OffsetBounds {
    pub min_mm: f32,
    pub max_mm: f32,
    pub nozzle_expansion_mm: f32,
    pub ghost_epsilon_mm: f32,
}

impl Default for OffsetBounds {
    fn default() -> Self {
        Self {
            min_mm: -5.0,
            max_mm: 0.0,
            nozzle_expansion_mm: 0.05,
            ghost_epsilon_mm: 0.001,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ProbeCfg {
    /// Touch probe XY relative to the nozzle.
    pub nozzle_to_probe: (f32, f32),
    pub press_position: (f32, f32),
    pub travel_z_mm: f32,
    pub shake_times: u32,
}

impl Default for ProbeCfg {
    fn default() -> Self {
        Self {
            nozzle_to_probe: (-24.25, -15.0),
            press_position: (25.0, 28.0),
            travel_z_mm: 4.0,
            shake_times: 20,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CleanCfg {
    pub enabled: bool,
    pub start: Position,
    pub end: Position,
    pub hotend_c: f32,
    pub bed_c: f32,
}

impl Default for CleanCfg {
    fn default() -> Self {
        Self {
            enabled: true,
            start: Position::new(0.0, 15.0, 0.0),
            end: Position::new(0.0, 60.0, 0.0),
            hotend_c: 175.0,
            bed_c: 60.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ThermalCfg {
    pub wait_timeout: Duration,
    pub hotend_tolerance_c: f32,
    pub bed_tolerance_c: f32,
    pub poll_interval: Duration,
}

impl Default for ThermalCfg {
    fn default() -> Self {
        Self {
            wait_timeout: Duration::from_secs(300),
            hotend_tolerance_c: 5.0,
            bed_tolerance_c: 2.0,
            poll_interval: Duration::from_millis(100),
        }
    }
}

/// Everything one calibration run needs to know.
#[derive(Debug, Clone, Copy, Default)]
pub struct CalibrationConfig {
    pub filter: FilterCfg,
    pub trigger: TriggerCfg,
    pub scan: ScanCfg,
    pub repeat: RepeatCfg,
    pub reconcile: ReconcileCfg,
    pub offset: OffsetBounds,
    pub probe: ProbeCfg,
    pub clean: CleanCfg,
    pub thermal: ThermalCfg,
}

impl CalibrationConfig {
    pub fn validate(&self) -> Result<(), BuildError> {
        let f = &self.filter;
        if !(f.cutoff_hz.is_finite() && f.cutoff_hz > 0.0) {
            return Err(BuildError::InvalidConfig("cutoff_hz must be > 0"));
        }
        if !(f.sample_rate_hz.is_finite() && f.sample_rate_hz > 0.0) {
            return Err(BuildError::InvalidConfig("sample_rate_hz must be > 0"));
        }
        if !(f.lowpass_k > 0.0 && f.lowpass_k <= 1.0) {
            return Err(BuildError::InvalidConfig("lowpass_k must be in (0, 1]"));
        }
        let t = &self.trigger;
        if !(t.min_hold > 0.0 && t.max_hold > t.min_hold) {
            return Err(BuildError::InvalidConfig(
                "trigger thresholds must satisfy 0 < min_hold < max_hold",
            ));
        }
        let s = &self.scan;
        if !(s.step_mm > 0.0 && s.step_mm.is_finite()) {
            return Err(BuildError::InvalidConfig("step_mm must be > 0"));
        }
        if s.max_depth_mm.is_nan() || s.max_depth_mm >= 0.0 {
            return Err(BuildError::InvalidConfig("max_depth_mm must be negative"));
        }
        if s.xy_speed_mm_s <= 0.0 || s.z_speed_mm_s <= 0.0 {
            return Err(BuildError::InvalidConfig("scan speeds must be > 0"));
        }
        if s.baseline_samples == 0 {
            return Err(BuildError::InvalidConfig("baseline_samples must be >= 1"));
        }
        if s.read_timeout.is_zero() {
            return Err(BuildError::InvalidConfig("read_timeout must be > 0"));
        }
        if self.repeat.press_samples == 0 {
            return Err(BuildError::InvalidConfig("press_samples must be >= 1"));
        }
        if self.repeat.tolerance_mm < 0.0 || self.reconcile.tolerance_mm < 0.0 {
            return Err(BuildError::InvalidConfig("tolerances must be >= 0"));
        }
        let o = &self.offset;
        if !(o.min_mm.is_finite() && o.max_mm.is_finite()) || o.min_mm >= o.max_mm {
            return Err(BuildError::InvalidConfig("offset min_mm must be < max_mm"));
        }
        if o.ghost_epsilon_mm < 0.0 {
            return Err(BuildError::InvalidConfig("ghost_epsilon_mm must be >= 0"));
        }
        if self.probe.travel_z_mm <= 0.0 {
            return Err(BuildError::InvalidConfig("travel_z_mm must be > 0"));
        }
        if self.thermal.poll_interval.is_zero() {
            return Err(BuildError::InvalidConfig("thermal poll_interval must be > 0"));
        }
        Ok(())
    }
}
