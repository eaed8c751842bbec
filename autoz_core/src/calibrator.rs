//! Touch-probe vs load-cell measurement at one XY, and the multi-sample
//! reconciliation built on top of it.

use autoz_traits::{Machine, Position, SampleSource};
use tracing::{debug, info};

use crate::cancel::CancelToken;
use crate::config::{CalibrationConfig, ReconcileCfg};
use crate::error::AutoZResult;
use crate::filter::FilterChain;
use crate::hw_error::boxed;
use crate::repeat::RepeatedMeasurement;
use crate::scan::{ScanConfig, StepScanProbe};
use crate::stats::median_of;

const SHAKE_AMPLITUDE_MM: f32 = 0.04;
const SHAKE_FEED_MM_S: f32 = 1.0;
const TOUCH_Z_FEED_MM_S: f32 = 5.0;
const TOUCH_XY_FEED_MM_S: f32 = 100.0;
const RAISE_Z_MM: f32 = 5.0;
const RAISE_FEED_MM_S: f32 = 5.0;

/// Which measurement halves run. Disabling either is a diagnostic mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeasureModes {
    pub press: bool,
    pub touch: bool,
}

impl MeasureModes {
    pub const BOTH: Self = Self {
        press: true,
        touch: true,
    };

    pub fn is_complete(&self) -> bool {
        self.press && self.touch
    }
}

impl Default for MeasureModes {
    fn default() -> Self {
        Self::BOTH
    }
}

/// Per-XY outcome.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationSample {
    pub touch_mm: f32,
    pub press_mm: f32,
    pub difference_mm: f32,
}

/// Produces one `(touch, press, difference)` at a nozzle position.
pub trait PointMeasurer<M: ?Sized, S: ?Sized> {
    fn point_difference(
        &mut self,
        machine: &mut M,
        source: &mut S,
        at: Position,
        modes: MeasureModes,
    ) -> AutoZResult<CalibrationSample>;
}

/// Relieve Z backlash with small up/down moves around the current height.
pub fn shake_z<M: Machine + ?Sized>(machine: &mut M, times: u32) -> AutoZResult<()> {
    let z0 = machine.position().z;
    for _ in 0..times {
        machine
            .move_to_z(z0 + SHAKE_AMPLITUDE_MM, SHAKE_FEED_MM_S)
            .map_err(boxed)?;
        machine.move_to_z(z0, SHAKE_FEED_MM_S).map_err(boxed)?;
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct DualModeCalibrator {
    cfg: CalibrationConfig,
    chain: FilterChain,
    cancel: Option<CancelToken>,
}

impl DualModeCalibrator {
    pub fn new(cfg: &CalibrationConfig) -> Self {
        Self {
            cfg: *cfg,
            chain: FilterChain::new(&cfg.filter),
            cancel: None,
        }
    }

    pub fn with_cancel(mut self, cancel: Option<CancelToken>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Shake, approach and probe. The probe is stowed on every exit and the
    /// temperature targets are put back as they were found.
    fn touch<M: Machine + ?Sized>(&self, machine: &mut M, at: Position) -> AutoZResult<f32> {
        let hotend = machine.hotend_target();
        let bed = machine.bed_target();

        let (ox, oy) = self.cfg.probe.nozzle_to_probe;
        let (px, py) = (at.x - ox, at.y - oy);
        let probed = self.approach_and_touch(machine, at.z, px, py);

        machine.set_hotend_target(hotend);
        machine.set_bed_target(bed);
        let stowed = machine.stow().map_err(boxed);
        let z = probed?;
        stowed?;
        debug!(x = px, y = py, touch_mm = z, "touch probe");
        Ok(z)
    }

    fn approach_and_touch<M: Machine + ?Sized>(
        &self,
        machine: &mut M,
        z: f32,
        px: f32,
        py: f32,
    ) -> AutoZResult<f32> {
        shake_z(machine, self.cfg.probe.shake_times)?;
        machine.move_to_z(z, TOUCH_Z_FEED_MM_S).map_err(boxed)?;
        machine
            .move_to_xy(px, py, TOUCH_XY_FEED_MM_S)
            .map_err(boxed)?;
        machine.probe_at(px, py).map_err(boxed)
    }

    fn press<M, S>(&self, machine: &mut M, source: &mut S, base: Position) -> AutoZResult<f32>
    where
        M: Machine + ?Sized,
        S: SampleSource + ?Sized,
    {
        let scan = ScanConfig::from_calibration(&self.cfg, base);
        let repeat =
            RepeatedMeasurement::new(self.cfg.repeat.attempts, self.cfg.repeat.tolerance_mm);
        let mut probe =
            StepScanProbe::new(machine, source, self.chain).with_cancel(self.cancel.as_ref());
        let mut heights = Vec::with_capacity(self.cfg.repeat.press_samples);
        for _ in 0..self.cfg.repeat.press_samples {
            heights.push(repeat.measure(&mut probe, &scan)?);
        }
        let med = median_of(&heights).unwrap_or_default();
        debug!(?heights, median_mm = med, "press heights");
        Ok(med + self.cfg.offset.nozzle_expansion_mm)
    }

    fn measure<M, S>(
        &self,
        machine: &mut M,
        source: &mut S,
        at: Position,
        modes: MeasureModes,
    ) -> AutoZResult<CalibrationSample>
    where
        M: Machine + ?Sized,
        S: SampleSource + ?Sized,
    {
        machine.set_leveling(false);
        let touch_mm = if modes.touch { self.touch(machine, at)? } else { 0.0 };
        let press_mm = if modes.press {
            let base_z = if modes.touch { touch_mm } else { at.z };
            self.press(machine, source, at.with_z(base_z))?
        } else {
            0.0
        };
        Ok(CalibrationSample {
            touch_mm,
            press_mm,
            difference_mm: press_mm - touch_mm,
        })
    }
}

impl<M, S> PointMeasurer<M, S> for DualModeCalibrator
where
    M: Machine + ?Sized,
    S: SampleSource + ?Sized,
{
    fn point_difference(
        &mut self,
        machine: &mut M,
        source: &mut S,
        at: Position,
        modes: MeasureModes,
    ) -> AutoZResult<CalibrationSample> {
        let res = self.measure(machine, source, at, modes);
        let raised = machine.move_to_z(RAISE_Z_MM, RAISE_FEED_MM_S).map_err(boxed);
        let sample = res?;
        raised?;
        Ok(sample)
    }
}

/// Smaller-magnitude of two samples; ties keep `a1`.
pub fn smaller_magnitude(a0: f32, a1: f32) -> f32 {
    if a0.abs() < a1.abs() { a0 } else { a1 }
}

/// Average when `|a0|` and `|a1|` agree within `tol`.
pub fn reconcile_pair(a0: f32, a1: f32, tol: f32) -> Option<f32> {
    ((a0.abs() - a1.abs()).abs() <= tol).then(|| 0.5 * (a0 + a1))
}

/// Resolve a disagreeing pair with a third sample.
pub fn reconcile_third(a0: f32, a1: f32, a2: f32, tol: f32) -> f32 {
    let d20 = (a2.abs() - a0.abs()).abs();
    let d21 = (a2.abs() - a1.abs()).abs();
    if d20 > tol && d21 > tol {
        return smaller_magnitude(a0, a1);
    }
    if d20 <= tol {
        // a2 sides with a0: a1 is the outlier
        0.5 * (a0 + a2)
    } else {
        0.5 * (a2 + a1)
    }
}

/// Multi-sample reconciliation around one plan point.
#[derive(Debug, Clone, Copy)]
pub struct Reconciler {
    initial: u8,
    max: u8,
    tolerance_mm: f32,
    y_spacing_mm: f32,
}

impl Reconciler {
    pub fn new(cfg: &ReconcileCfg) -> Self {
        Self {
            initial: cfg.initial_samples.clamp(1, 3),
            max: cfg.max_samples.clamp(1, 3),
            tolerance_mm: cfg.tolerance_mm,
            y_spacing_mm: cfg.y_spacing_mm,
        }
    }

    pub fn reconcile<M, S, P>(
        &self,
        measurer: &mut P,
        machine: &mut M,
        source: &mut S,
        base: Position,
        modes: MeasureModes,
    ) -> AutoZResult<f32>
    where
        M: ?Sized,
        S: ?Sized,
        P: PointMeasurer<M, S> + ?Sized,
    {
        let mut vals = [0.0f32; 3];
        for k in 0..self.initial {
            let at = Position {
                y: base.y - f32::from(k) * self.y_spacing_mm,
                ..base
            };
            let s = measurer.point_difference(machine, source, at, modes)?;
            info!(
                x = at.x,
                y = at.y,
                touch_mm = s.touch_mm,
                press_mm = s.press_mm,
                offset_mm = s.difference_mm,
                "point sample"
            );
            vals[usize::from(k)] = s.difference_mm;
        }
        if self.initial == 1 {
            return Ok(vals[0]);
        }

        let (a0, a1) = (vals[0], vals[1]);
        if let Some(avg) = reconcile_pair(a0, a1, self.tolerance_mm) {
            return Ok(avg);
        }
        if self.max >= 3 {
            let s = measurer.point_difference(machine, source, base, modes)?;
            info!(x = base.x, y = base.y, offset_mm = s.difference_mm, "third sample");
            return Ok(reconcile_third(a0, a1, s.difference_mm, self.tolerance_mm));
        }
        Ok(smaller_magnitude(a0, a1))
    }
}
