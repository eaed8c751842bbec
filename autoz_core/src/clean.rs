//! Heat-and-wipe cleaning pass run before sampling.

use autoz_traits::{Clock, Machine, Notifier, Position, SampleSource, UiStage};
use tracing::{info, warn};

use crate::cancel::CancelToken;
use crate::config::CalibrationConfig;
use crate::error::{AutoZError, AutoZResult};
use crate::filter::FilterChain;
use crate::hw_error::boxed;
use crate::repeat::RepeatedMeasurement;
use crate::scan::{ScanConfig, StepScanProbe};
use crate::thermal::{Heater, wait_for_temperature};

const Z_FEED_MM_S: f32 = 5.0;
const XY_FEED_MM_S: f32 = 50.0;
const WIPE_FEED_MM_S: f32 = 5.0;
const APPROACH_Y_MM: f32 = 10.0;
const WIPE_INSET_MM: f32 = 3.0;
const WIPE_DIG_MM: f32 = 0.1;
const EXIT_MM: f32 = 10.0;

const TRIANGULATE_STEP_MM: f32 = 0.03;
const TRIANGULATE_DEPTH_MM: f32 = -10.0;
const TRIANGULATE: RepeatedMeasurement = RepeatedMeasurement::new(3, 0.2);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CleanOutcome {
    pub wiped: bool,
    /// Absolute Z of the surface at the wipe start.
    pub start_mm: f32,
    pub end_mm: f32,
}

pub struct CleanContext<'a, M: ?Sized, S: ?Sized, N: ?Sized, C: ?Sized> {
    pub machine: &'a mut M,
    pub source: &'a mut S,
    pub notifier: &'a mut N,
    pub clock: &'a C,
    pub cancel: Option<&'a CancelToken>,
}

/// Heat, triangulate the wiping strip, wipe, home Z.
///
/// A triangulation without contact skips the wipe; everything else is an error.
pub fn clean_nozzle<M, S, N, C>(
    ctx: CleanContext<'_, M, S, N, C>,
    cfg: &CalibrationConfig,
    chain: FilterChain,
) -> AutoZResult<CleanOutcome>
where
    M: Machine + ?Sized,
    S: SampleSource + ?Sized,
    N: Notifier + ?Sized,
    C: Clock + ?Sized,
{
    let CleanContext {
        machine,
        source,
        notifier,
        clock,
        cancel,
    } = ctx;
    let clean = &cfg.clean;
    let thermal = &cfg.thermal;

    machine.move_to_z(clean.start.z, Z_FEED_MM_S).map_err(boxed)?;
    machine
        .move_to_xy(clean.start.x, clean.start.y - APPROACH_Y_MM, XY_FEED_MM_S)
        .map_err(boxed)?;

    notifier.notify(UiStage::Heating);
    machine.set_hotend_target(clean.hotend_c);
    machine.set_bed_target(clean.bed_c);
    for (heater, tol) in [
        (Heater::Hotend, thermal.hotend_tolerance_c),
        (Heater::Bed, thermal.bed_tolerance_c),
    ] {
        wait_for_temperature(
            machine,
            clock,
            heater,
            tol,
            thermal.wait_timeout,
            thermal.poll_interval,
        );
    }

    notifier.notify(UiStage::Cleaning);
    machine
        .move_to_xy(clean.start.x, clean.start.y, XY_FEED_MM_S)
        .map_err(boxed)?;

    let heights = {
        let mut probe =
            StepScanProbe::new(&mut *machine, &mut *source, chain).with_cancel(cancel);
        let mut locate = |at: Position| -> AutoZResult<Option<f32>> {
            let scan = ScanConfig::from_calibration(cfg, at)
                .with_step(TRIANGULATE_STEP_MM)
                .with_depth_limit(TRIANGULATE_DEPTH_MM)
                .with_max_hold(cfg.trigger.max_hold / 2.0);
            match TRIANGULATE.measure(&mut probe, &scan) {
                Ok(rel) => Ok(Some(at.z + rel)),
                Err(AutoZError::SensorFault) => Ok(None),
                Err(e) => Err(e),
            }
        };
        let start = locate(clean.start)?;
        let end = locate(clean.end)?;
        (start, end)
    };

    let outcome = if let (Some(z_s), Some(z_e)) = heights {
        info!(start_mm = z_s, end_mm = z_e, "wiping nozzle");
        let dug = z_e - WIPE_DIG_MM;
        let wipe = [
            (
                Position::new(clean.start.x, clean.start.y + WIPE_INSET_MM, z_s),
                XY_FEED_MM_S,
            ),
            (
                Position::new(clean.end.x, clean.end.y - WIPE_INSET_MM, dug),
                WIPE_FEED_MM_S,
            ),
            (
                Position::new(clean.end.x - EXIT_MM, clean.end.y - EXIT_MM, dug),
                WIPE_FEED_MM_S,
            ),
        ];
        for (pos, feed) in wipe {
            machine.move_to_xyz(pos, feed).map_err(boxed)?;
        }
        CleanOutcome {
            wiped: true,
            start_mm: z_s,
            end_mm: z_e,
        }
    } else {
        warn!(start = ?heights.0, end = ?heights.1, "cleaning strip not found, skipping wipe");
        CleanOutcome {
            wiped: false,
            start_mm: heights.0.unwrap_or(f32::NAN),
            end_mm: heights.1.unwrap_or(f32::NAN),
        }
    };

    machine.home_z().map_err(boxed)?;
    Ok(outcome)
}
