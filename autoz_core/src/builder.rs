//! Type-state builder for the boxed `Orchestrator`.
//!
//! `build()` only exists once a machine, a sample source and an offset store
//! have been provided. `try_build()` is always available for dynamic checks.

use std::marker::PhantomData;
use std::sync::Arc;

use autoz_traits::{Clock, Machine, Notifier, OffsetStore, SampleSource};

use crate::cancel::CancelToken;
use crate::config::CalibrationConfig;
use crate::error::{BuildError, Result};
use crate::mocks::NoopNotifier;
use crate::orchestrator::{OffsetOrchestrator, SamplingPlan};

/// Dynamically dispatched orchestrator produced by the builder.
pub type Orchestrator = OffsetOrchestrator<
    Box<dyn Machine>,
    Box<dyn SampleSource>,
    Box<dyn OffsetStore>,
    Box<dyn Notifier>,
>;

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

pub struct OrchestratorBuilder<Mc, Src, St> {
    machine: Option<Box<dyn Machine>>,
    source: Option<Box<dyn SampleSource>>,
    store: Option<Box<dyn OffsetStore>>,
    notifier: Option<Box<dyn Notifier>>,
    config: Option<CalibrationConfig>,
    plan: Option<SamplingPlan>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    cancel: Option<CancelToken>,
    _state: PhantomData<(Mc, Src, St)>,
}

impl Default for OrchestratorBuilder<Missing, Missing, Missing> {
    fn default() -> Self {
        Self {
            machine: None,
            source: None,
            store: None,
            notifier: None,
            config: None,
            plan: None,
            clock: None,
            cancel: None,
            _state: PhantomData,
        }
    }
}

impl Orchestrator {
    pub fn builder() -> OrchestratorBuilder<Missing, Missing, Missing> {
        OrchestratorBuilder::default()
    }
}

impl<Mc, Src, St> OrchestratorBuilder<Mc, Src, St> {
    fn retype<A, B, C>(self) -> OrchestratorBuilder<A, B, C> {
        OrchestratorBuilder {
            machine: self.machine,
            source: self.source,
            store: self.store,
            notifier: self.notifier,
            config: self.config,
            plan: self.plan,
            clock: self.clock,
            cancel: self.cancel,
            _state: PhantomData,
        }
    }

    pub fn with_config(mut self, config: CalibrationConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_plan(mut self, plan: SamplingPlan) -> Self {
        self.plan = Some(plan);
        self
    }

    /// Defaults to a notifier that drops every stage.
    pub fn with_notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Some(Box::new(notifier));
        self
    }

    /// Provide a custom clock implementation; defaults to `MonotonicClock`.
    pub fn with_clock(mut self, clock: Box<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Fallible build available in any type-state; reports the first missing piece.
    pub fn try_build(self) -> Result<Orchestrator> {
        let machine = self
            .machine
            .ok_or_else(|| eyre::Report::new(BuildError::MissingMachine))?;
        let source = self
            .source
            .ok_or_else(|| eyre::Report::new(BuildError::MissingSource))?;
        let store = self
            .store
            .ok_or_else(|| eyre::Report::new(BuildError::MissingStore))?;
        let notifier = self.notifier.unwrap_or_else(|| Box::new(NoopNotifier));

        let mut orch = OffsetOrchestrator::new(
            machine,
            source,
            store,
            notifier,
            self.config.unwrap_or_default(),
        )
        .map_err(eyre::Report::new)?
        .with_plan(self.plan.unwrap_or_default());
        if let Some(clock) = self.clock {
            orch = orch.with_clock(Arc::from(clock));
        }
        if let Some(cancel) = self.cancel {
            orch = orch.with_cancel(cancel);
        }
        Ok(orch)
    }
}

impl<Src, St> OrchestratorBuilder<Missing, Src, St> {
    pub fn with_machine(
        mut self,
        machine: impl Machine + 'static,
    ) -> OrchestratorBuilder<Set, Src, St> {
        self.machine = Some(Box::new(machine));
        self.retype()
    }
}

impl<Mc, St> OrchestratorBuilder<Mc, Missing, St> {
    pub fn with_source(
        mut self,
        source: impl SampleSource + 'static,
    ) -> OrchestratorBuilder<Mc, Set, St> {
        self.source = Some(Box::new(source));
        self.retype()
    }
}

impl<Mc, Src> OrchestratorBuilder<Mc, Src, Missing> {
    pub fn with_store(
        mut self,
        store: impl OffsetStore + 'static,
    ) -> OrchestratorBuilder<Mc, Src, Set> {
        self.store = Some(Box::new(store));
        self.retype()
    }
}

impl OrchestratorBuilder<Set, Set, Set> {
    /// Validate and build. Only available once machine, source and store are set.
    pub fn build(self) -> Result<Orchestrator> {
        self.try_build()
    }
}
