//! Host command entry points: diagnostics and the one-shot offset command.

use autoz_traits::{Machine, Notifier, OffsetStore, SampleSource, UiStage};
use tracing::info;

use crate::calibrator::{MeasureModes, PointMeasurer};
use crate::error::{AutoZError, AutoZResult, Result};
use crate::hw_error::boxed;
use crate::orchestrator::{OffsetOrchestrator, RunOptions, ZOffsetEstimate};
use crate::scan::MeasurementResult;
use crate::types::RawSample;

/// First-run wizard step reached once the offset is known.
pub const BOOT_STEP_LEVELING: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BootWizard {
    pub pending: bool,
    pub step: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiagnosticOptions {
    /// Dump this many raw readings and do nothing else.
    pub raw: Option<usize>,
    /// One scan at the press position.
    pub single_scan: bool,
    /// Full-routine repetitions.
    pub count: usize,
    pub clean: bool,
    pub press: bool,
    pub touch: bool,
}

impl Default for DiagnosticOptions {
    fn default() -> Self {
        Self {
            raw: None,
            single_scan: false,
            count: 1,
            clean: false,
            press: false,
            touch: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DiagnosticReport {
    Raw(Vec<RawSample>),
    Scan(MeasurementResult),
    Runs(Vec<AutoZResult<ZOffsetEstimate>>),
    /// No sub-flag selected.
    Nothing,
}

/// Raw dump, single scan, or `count` full runs; the first selected wins.
pub fn diagnostic<M, S, O, N, P>(
    orch: &mut OffsetOrchestrator<M, S, O, N, P>,
    opts: &DiagnosticOptions,
) -> Result<DiagnosticReport>
where
    M: Machine,
    S: SampleSource,
    O: OffsetStore,
    N: Notifier,
    P: PointMeasurer<M, S>,
{
    if let Some(n) = opts.raw {
        return Ok(DiagnosticReport::Raw(orch.read_raw(n)?));
    }
    if opts.single_scan {
        return Ok(DiagnosticReport::Scan(orch.single_scan()?));
    }
    if !(opts.clean || opts.press || opts.touch) {
        return Ok(DiagnosticReport::Nothing);
    }

    let run = RunOptions {
        clean: opts.clean,
        modes: MeasureModes {
            press: opts.press,
            touch: opts.touch,
        },
    };
    let mut runs = Vec::with_capacity(opts.count);
    for i in 0..opts.count.max(1) {
        let res = orch.run(run);
        info!(run = i + 1, ok = res.is_ok(), "diagnostic run");
        let cancelled = matches!(res, Err(AutoZError::Cancelled));
        runs.push(res);
        if cancelled {
            break;
        }
    }
    Ok(DiagnosticReport::Runs(runs))
}

#[derive(Debug, Clone, PartialEq)]
pub struct OneShotOutcome {
    pub estimate: ZOffsetEstimate,
    /// `LevelingNext` or `ReturnToMenu`.
    pub exit: UiStage,
}

/// Full routine with every flag set, then home and pick the exit path.
pub fn one_shot<M, S, O, N, P>(
    orch: &mut OffsetOrchestrator<M, S, O, N, P>,
    leveling: bool,
    wizard: &mut BootWizard,
) -> Result<OneShotOutcome>
where
    M: Machine,
    S: SampleSource,
    O: OffsetStore,
    N: Notifier,
    P: PointMeasurer<M, S>,
{
    let estimate = orch.run(RunOptions::default())?;

    if wizard.pending {
        wizard.step = BOOT_STEP_LEVELING;
    }
    if let Err(e) = orch.machine_mut().home_all() {
        orch.notifier_mut().notify(UiStage::Failed);
        return Err(AutoZError::Prerequisite(format!("homing: {}", boxed(e))).into());
    }

    let exit = if leveling {
        UiStage::LevelingNext
    } else {
        UiStage::ReturnToMenu
    };
    info!(z_offset_mm = estimate.value_mm, ?exit, "one-shot z-offset done");
    orch.notifier_mut().notify(exit);
    Ok(OneShotOutcome { estimate, exit })
}
