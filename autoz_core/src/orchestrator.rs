//! Full Z-offset run: home, optional clean, sample the plan, aggregate, commit.

use std::sync::Arc;

use autoz_traits::{
    Clock, Machine, MonotonicClock, Notifier, OffsetStore, Position, SampleSource, UiStage,
};
use tracing::{info, warn};

use crate::calibrator::{DualModeCalibrator, MeasureModes, PointMeasurer, Reconciler};
use crate::cancel::{self, CancelToken};
use crate::clean::{CleanContext, CleanOutcome, clean_nozzle};
use crate::config::CalibrationConfig;
use crate::error::{AutoZError, AutoZResult, BuildError, RejectReason};
use crate::filter::FilterChain;
use crate::hw_error::boxed;
use crate::scan::{MeasurementResult, ScanConfig, StepScanProbe};
use crate::self_check::{SelfCheckReport, self_check};
use crate::stats::{check_offset, median_of};
use crate::types::RawSample;

/// Base Z of the diagnostic single scan.
const SINGLE_SCAN_Z_MM: f32 = 3.0;
const SINGLE_SCAN_DEPTH_MM: f32 = -10.0;
const SINGLE_SCAN_Z_SPEED_MM_S: f32 = 5.0;
const SINGLE_SCAN_STEP_MM: f32 = 0.02;

/// Where on the bed the offset is sampled.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SamplingPlan {
    #[default]
    FourPoint,
    FivePoint,
    Custom(Vec<(f32, f32)>),
}

const FOUR_POINT: [(f32, f32); 4] = [(28.0, 28.0), (110.0, 110.0), (180.0, 28.0), (28.0, 180.0)];
const FIVE_POINT: [(f32, f32); 5] = [
    (28.0, 28.0),
    (110.0, 110.0),
    (180.0, 180.0),
    (180.0, 28.0),
    (28.0, 180.0),
];

impl SamplingPlan {
    pub fn points(&self) -> &[(f32, f32)] {
        match self {
            Self::FourPoint => &FOUR_POINT,
            Self::FivePoint => &FIVE_POINT,
            Self::Custom(pts) => pts,
        }
    }

    /// Resolve `[plan]`, reading the CSV for custom plans.
    pub fn from_config(cfg: &autoz_config::Config) -> eyre::Result<Self> {
        Ok(match cfg.plan.kind {
            autoz_config::PlanKind::Four => Self::FourPoint,
            autoz_config::PlanKind::Five => Self::FivePoint,
            autoz_config::PlanKind::Custom => {
                Self::Custom(cfg.custom_points()?.into_iter().map(|p| (p.x, p.y)).collect())
            }
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub clean: bool,
    pub modes: MeasureModes,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            clean: true,
            modes: MeasureModes::BOTH,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    Idle,
    Homing,
    Cleaning,
    Sampling,
    Aggregating,
    Committed,
    /// Estimate computed by a partial-mode run; nothing written.
    Reported,
    Rejected,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ZOffsetEstimate {
    pub value_mm: f32,
    pub points_sampled: usize,
    pub points_discarded: usize,
    pub kept: Vec<f32>,
    pub committed: bool,
    pub clean: Option<CleanOutcome>,
}

pub struct OffsetOrchestrator<M, S, O, N, P = DualModeCalibrator> {
    machine: M,
    source: S,
    store: O,
    notifier: N,
    measurer: P,
    cfg: CalibrationConfig,
    chain: FilterChain,
    plan: SamplingPlan,
    clock: Arc<dyn Clock + Send + Sync>,
    cancel: Option<CancelToken>,
    stage: RunStage,
}

impl<M, S, O, N> OffsetOrchestrator<M, S, O, N>
where
    M: Machine,
    S: SampleSource,
    O: OffsetStore,
    N: Notifier,
{
    pub fn new(
        machine: M,
        source: S,
        store: O,
        notifier: N,
        cfg: CalibrationConfig,
    ) -> Result<Self, BuildError> {
        cfg.validate()?;
        Ok(Self {
            machine,
            source,
            store,
            notifier,
            measurer: DualModeCalibrator::new(&cfg),
            chain: FilterChain::new(&cfg.filter),
            cfg,
            plan: SamplingPlan::default(),
            clock: Arc::new(MonotonicClock::new()),
            cancel: None,
            stage: RunStage::Idle,
        })
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.measurer = DualModeCalibrator::new(&self.cfg).with_cancel(Some(cancel.clone()));
        self.cancel = Some(cancel);
        self
    }
}

impl<M, S, O, N, P> OffsetOrchestrator<M, S, O, N, P> {
    /// Replace the per-point measurer.
    pub fn with_measurer<Q>(self, measurer: Q) -> OffsetOrchestrator<M, S, O, N, Q> {
        OffsetOrchestrator {
            machine: self.machine,
            source: self.source,
            store: self.store,
            notifier: self.notifier,
            measurer,
            cfg: self.cfg,
            chain: self.chain,
            plan: self.plan,
            clock: self.clock,
            cancel: self.cancel,
            stage: self.stage,
        }
    }

    pub fn with_plan(mut self, plan: SamplingPlan) -> Self {
        self.plan = plan;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = clock;
        self
    }

    pub fn stage(&self) -> RunStage {
        self.stage
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.cfg
    }

    pub fn plan(&self) -> &SamplingPlan {
        &self.plan
    }

    pub fn machine(&self) -> &M {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut M {
        &mut self.machine
    }

    pub fn store(&self) -> &O {
        &self.store
    }

    pub fn notifier_mut(&mut self) -> &mut N {
        &mut self.notifier
    }

    pub fn cancel_token(&self) -> Option<&CancelToken> {
        self.cancel.as_ref()
    }
}

impl<M, S, O, N, P> OffsetOrchestrator<M, S, O, N, P>
where
    M: Machine,
    S: SampleSource,
    O: OffsetStore,
    N: Notifier,
    P: PointMeasurer<M, S>,
{
    /// Run the whole routine. Any error exit notifies `Failed`.
    pub fn run(&mut self, opts: RunOptions) -> AutoZResult<ZOffsetEstimate> {
        let res = self.run_inner(opts);
        if let Err(e) = &res {
            warn!(error = %e, stage = ?self.stage, "z-offset run failed");
            self.notifier.notify(UiStage::Failed);
        }
        res
    }

    fn run_inner(&mut self, opts: RunOptions) -> AutoZResult<ZOffsetEstimate> {
        self.stage = RunStage::Idle;
        self.store.apply(0.0);

        self.stage = RunStage::Homing;
        cancel::check(self.cancel.as_ref())?;
        self.machine
            .home_all()
            .map_err(|e| prerequisite("homing", boxed(e)))?;

        let clean = if opts.clean && self.cfg.clean.enabled {
            self.stage = RunStage::Cleaning;
            Some(self.clean()?)
        } else {
            None
        };

        self.stage = RunStage::Sampling;
        self.notifier.notify(UiStage::Measuring);
        let (kept, discarded) = self.sample(opts.modes)?;

        self.stage = RunStage::Aggregating;
        let points_sampled = kept.len() + discarded;
        let Some(median) = median_of(&kept) else {
            self.stage = RunStage::Rejected;
            return Err(AutoZError::Rejected(RejectReason::NoValidPoints));
        };
        let bounds = &self.cfg.offset;
        if !(bounds.min_mm..=bounds.max_mm).contains(&median) {
            self.stage = RunStage::Rejected;
            warn!(
                median_mm = median,
                min = bounds.min_mm,
                max = bounds.max_mm,
                "median out of range"
            );
            return Err(AutoZError::Rejected(RejectReason::MedianOutOfRange));
        }
        self.notifier.notify(UiStage::HeightFound);

        let mut estimate = ZOffsetEstimate {
            value_mm: median,
            points_sampled,
            points_discarded: discarded,
            kept,
            committed: false,
            clean,
        };
        if !opts.modes.is_complete() {
            self.stage = RunStage::Reported;
            info!(z_offset_mm = median, modes = ?opts.modes, "partial run, offset not committed");
            return Ok(estimate);
        }

        self.store.persist(median).map_err(boxed)?;
        self.store.apply(median);
        estimate.committed = true;
        self.stage = RunStage::Committed;
        info!(z_offset_mm = median, kept = estimate.kept.len(), discarded, "z-offset committed");
        self.notifier.notify(UiStage::Finished);
        Ok(estimate)
    }

    fn clean(&mut self) -> AutoZResult<CleanOutcome> {
        let ctx = CleanContext {
            machine: &mut self.machine,
            source: &mut self.source,
            notifier: &mut self.notifier,
            clock: self.clock.as_ref(),
            cancel: self.cancel.as_ref(),
        };
        clean_nozzle(ctx, &self.cfg, self.chain).map_err(|e| prerequisite("cleaning", e))
    }

    fn sample(&mut self, modes: MeasureModes) -> AutoZResult<(Vec<f32>, usize)> {
        let reconciler = Reconciler::new(&self.cfg.reconcile);
        let mut kept = Vec::with_capacity(self.plan.points().len());
        let mut discarded = 0usize;
        for &(x, y) in self.plan.points() {
            cancel::check(self.cancel.as_ref())?;
            let base = Position::new(x, y, self.cfg.probe.travel_z_mm);
            let measured = reconciler
                .reconcile(
                    &mut self.measurer,
                    &mut self.machine,
                    &mut self.source,
                    base,
                    modes,
                )
                .and_then(|v| check_offset(v, &self.cfg.offset));
            match measured {
                Ok(v) => {
                    info!(x, y, offset_mm = v, "point kept");
                    kept.push(v);
                }
                Err(e @ AutoZError::Range { .. }) => {
                    info!(x, y, error = %e, "point discarded");
                    discarded += 1;
                }
                Err(AutoZError::Cancelled) => return Err(AutoZError::Cancelled),
                Err(e) => {
                    warn!(x, y, error = %e, "point failed, discarded");
                    discarded += 1;
                }
            }
        }
        Ok((kept, discarded))
    }
}

impl<M, S, O, N, P> OffsetOrchestrator<M, S, O, N, P>
where
    M: Machine,
    S: SampleSource,
{
    /// Read the amplifier `n` times, stamping each reading.
    pub fn read_raw(&mut self, n: usize) -> AutoZResult<Vec<RawSample>> {
        let epoch = self.clock.now();
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            cancel::check(self.cancel.as_ref())?;
            let value = self.source.read(self.cfg.scan.read_timeout).map_err(boxed)?;
            out.push(RawSample {
                value,
                at_ms: self.clock.ms_since(epoch),
            });
            self.machine.idle();
        }
        Ok(out)
    }

    /// One scan at the press position, without repeats or depth clamp.
    pub fn single_scan(&mut self) -> AutoZResult<MeasurementResult> {
        let (x, y) = self.cfg.probe.press_position;
        let scan = ScanConfig::from_calibration(&self.cfg, Position::new(x, y, SINGLE_SCAN_Z_MM))
            .with_depth_limit(SINGLE_SCAN_DEPTH_MM)
            .with_z_speed(SINGLE_SCAN_Z_SPEED_MM_S)
            .with_step(SINGLE_SCAN_STEP_MM);
        let mut probe = StepScanProbe::new(&mut self.machine, &mut self.source, self.chain)
            .with_cancel(self.cancel.as_ref());
        let r = probe.scan(&scan)?;
        info!(
            height_mm = r.height_mm,
            index = r.index,
            trigger = ?r.trigger,
            baseline = probe.baseline(),
            "single scan"
        );
        Ok(r)
    }

    pub fn self_check(&mut self) -> AutoZResult<SelfCheckReport> {
        self_check(
            &mut self.source,
            &mut self.machine,
            self.cfg.scan.read_timeout,
            self.cfg.filter.lowpass_k,
            self.cfg.trigger.max_hold,
        )
    }
}

/// Collaborator failures before sampling; cancellation passes through.
fn prerequisite(what: &str, e: AutoZError) -> AutoZError {
    match e {
        AutoZError::Cancelled => AutoZError::Cancelled,
        other => AutoZError::Prerequisite(format!("{what}: {other}")),
    }
}
