//! Stepped descent with one load-cell sample per step.

use autoz_traits::{Cooperative, Motion, Position, SampleSource};
use tracing::debug;

use crate::cancel::{self, CancelToken};
use crate::config::{CalibrationConfig, TriggerCfg, WINDOW_HALF};
use crate::detector::{ContactDetector, Trigger};
use crate::error::AutoZResult;
use crate::filter::FilterChain;
use crate::hw_error::boxed;
use crate::locator;
use crate::window::SampleWindow;

/// Slowest Z feed used while stepping down.
const MIN_STEP_FEED_MM_S: f32 = 2.0;

/// Parameters of one scan. Immutable for its duration.
#[derive(Debug, Clone, Copy)]
pub struct ScanConfig {
    pub base: Position,
    pub step_mm: f32,
    /// Deepest relative Z, negative.
    pub depth_limit_mm: f32,
    pub trigger: TriggerCfg,
    pub xy_speed_mm_s: f32,
    pub z_speed_mm_s: f32,
    pub baseline_samples: usize,
    pub read_timeout: std::time::Duration,
}

impl ScanConfig {
    /// Scan at `base` using the configured scan and trigger sections.
    pub fn from_calibration(cfg: &CalibrationConfig, base: Position) -> Self {
        Self {
            base,
            step_mm: cfg.scan.step_mm,
            depth_limit_mm: cfg.scan.max_depth_mm,
            trigger: cfg.trigger,
            xy_speed_mm_s: cfg.scan.xy_speed_mm_s,
            z_speed_mm_s: cfg.scan.z_speed_mm_s,
            baseline_samples: cfg.scan.baseline_samples,
            read_timeout: cfg.scan.read_timeout,
        }
    }

    pub fn with_step(mut self, step_mm: f32) -> Self {
        self.step_mm = step_mm;
        self
    }

    pub fn with_depth_limit(mut self, depth_limit_mm: f32) -> Self {
        self.depth_limit_mm = depth_limit_mm;
        self
    }

    pub fn with_max_hold(mut self, max_hold: f32) -> Self {
        self.trigger.max_hold = max_hold;
        self
    }

    pub fn with_z_speed(mut self, z_speed_mm_s: f32) -> Self {
        self.z_speed_mm_s = z_speed_mm_s;
        self
    }
}

/// Height found by one scan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasurementResult {
    /// Relative to the scan base Z.
    pub height_mm: f32,
    /// Analysis-zone index the height came from.
    pub index: usize,
    pub trigger: Option<Trigger>,
}

impl MeasurementResult {
    pub const NO_CONTACT: Self = Self {
        height_mm: 0.0,
        index: WINDOW_HALF - 1,
        trigger: None,
    };

    pub fn is_contact(&self) -> bool {
        self.trigger.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Positioning,
    Baselining,
    Scanning,
    Triggered,
    TravelLimitReached,
}

/// Owns the sample window for the duration of its borrows of the machine
/// and the sample source, so only one scan can be in flight.
pub struct StepScanProbe<'a, M: ?Sized, S: ?Sized> {
    machine: &'a mut M,
    source: &'a mut S,
    chain: FilterChain,
    cancel: Option<&'a CancelToken>,
    window: SampleWindow,
    state: ScanState,
    baseline: i32,
}

impl<'a, M, S> StepScanProbe<'a, M, S>
where
    M: Motion + Cooperative + ?Sized,
    S: SampleSource + ?Sized,
{
    pub fn new(machine: &'a mut M, source: &'a mut S, chain: FilterChain) -> Self {
        Self {
            machine,
            source,
            chain,
            cancel: None,
            window: SampleWindow::new(),
            state: ScanState::Idle,
            baseline: 0,
        }
    }

    pub fn with_cancel(mut self, cancel: Option<&'a CancelToken>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    pub fn window(&self) -> &SampleWindow {
        &self.window
    }

    /// DC offset measured by the last scan.
    pub fn baseline(&self) -> i32 {
        self.baseline
    }

    /// Position, baseline, then step down until the detector fires or the
    /// travel limit is reached. Soft endstops are restored on every exit.
    pub fn scan(&mut self, cfg: &ScanConfig) -> AutoZResult<MeasurementResult> {
        self.state = ScanState::Positioning;
        self.machine
            .move_to_xy(cfg.base.x, cfg.base.y, cfg.xy_speed_mm_s)
            .map_err(boxed)?;
        self.machine
            .move_to_z(cfg.base.z, cfg.z_speed_mm_s)
            .map_err(boxed)?;

        self.state = ScanState::Baselining;
        self.baseline = self.measure_baseline(cfg)?;
        debug!(
            baseline = self.baseline,
            x = cfg.base.x,
            y = cfg.base.y,
            z = cfg.base.z,
            "scan baseline"
        );

        let prev_soft = self.machine.set_soft_endstops(false);
        let res = self.descend(cfg);
        self.machine.set_soft_endstops(prev_soft);
        res
    }

    fn measure_baseline(&mut self, cfg: &ScanConfig) -> AutoZResult<i32> {
        let n = cfg.baseline_samples.max(1);
        let mut sum: i64 = 0;
        for _ in 0..n {
            sum += i64::from(self.source.read(cfg.read_timeout).map_err(boxed)?);
            self.machine.idle();
        }
        // integer mean of i32 readings always fits in i32
        Ok((sum / n as i64) as i32)
    }

    fn descend(&mut self, cfg: &ScanConfig) -> AutoZResult<MeasurementResult> {
        self.state = ScanState::Scanning;
        self.window.reset();
        let detector = ContactDetector::new(&cfg.trigger);
        let feed = cfg.z_speed_mm_s.max(MIN_STEP_FEED_MM_S);

        loop {
            cancel::check(self.cancel)?;

            let target = self.machine.position().z - cfg.step_mm;
            self.machine.move_to_z(target, feed).map_err(boxed)?;
            let rel_z = self.machine.position().z - cfg.base.z;

            let raw = self.source.read(cfg.read_timeout).map_err(boxed)?;
            let pressure = (i64::from(raw) - i64::from(self.baseline)) as f32;
            self.window.push(pressure, rel_z);
            debug!(raw, pressure, rel_z, "scan step");

            let filtered = self.window.filtered(&self.chain);
            if let Some(trigger) = detector.evaluate(&filtered, self.window.is_filled()) {
                let found = locator::locate(&self.window, &self.chain);
                self.state = ScanState::Triggered;
                debug!(
                    ?trigger,
                    index = found.index,
                    height_mm = found.height_mm,
                    at_rel_z = rel_z,
                    "scan triggered"
                );
                return Ok(MeasurementResult {
                    height_mm: found.height_mm,
                    index: found.index,
                    trigger: Some(trigger),
                });
            }

            if rel_z <= cfg.depth_limit_mm {
                self.state = ScanState::TravelLimitReached;
                debug!(rel_z, limit = cfg.depth_limit_mm, "scan reached travel limit");
                return Ok(MeasurementResult::NO_CONTACT);
            }

            self.machine.idle();
        }
    }
}
