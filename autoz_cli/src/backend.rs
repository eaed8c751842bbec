//! Collaborator assembly: simulated printer, load-cell source and UI sink.

use std::str::FromStr;

use autoz_core::{CalibrationConfig, CancelToken, Orchestrator, SamplingPlan};
use autoz_hardware::{SimParams, simulated};
use autoz_traits::{Notifier, UiStage};
use tracing::info;

use crate::store::FileOffsetStore;

/// Reports UI stages as log events.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&mut self, stage: UiStage) {
        info!(?stage, "ui");
    }
}

fn env_value<T>(key: &str) -> eyre::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| eyre::eyre!("{key}={raw:?}: {e}")),
        _ => Ok(None),
    }
}

/// Simulator knobs, overridable from `AUTOZ_SIM_*` environment variables.
pub fn sim_params_from_env() -> eyre::Result<SimParams> {
    let mut p = SimParams::default();
    if let Some(v) = env_value("AUTOZ_SIM_BED_Z")? {
        p.bed_z_mm = v;
    }
    if let Some(v) = env_value("AUTOZ_SIM_TILT_X")? {
        p.tilt_x = v;
    }
    if let Some(v) = env_value("AUTOZ_SIM_TILT_Y")? {
        p.tilt_y = v;
    }
    if let Some(v) = env_value("AUTOZ_SIM_NOISE")? {
        p.noise_counts = v;
    }
    if let Some(v) = env_value("AUTOZ_SIM_DRIFT")? {
        p.drift_per_read = v;
    }
    if let Some(v) = env_value("AUTOZ_SIM_SEED")? {
        p.seed = v;
    }
    if let Some(v) = env_value("AUTOZ_SIM_FAIL_TOUCH")? {
        p.fail_touch = v;
    }
    if let Some(v) = env_value("AUTOZ_SIM_FAIL_HOMING")? {
        p.fail_homing = v;
    }
    Ok(p)
}

/// Build the boxed orchestrator for one CLI invocation.
pub fn build_orchestrator(
    cfg: &autoz_config::Config,
    store: FileOffsetStore,
    cancel: CancelToken,
    hardware: bool,
) -> eyre::Result<Orchestrator> {
    let plan = SamplingPlan::from_config(cfg)?;
    let (printer, cell, _handle) = simulated(sim_params_from_env()?);
    let builder = Orchestrator::builder()
        .with_config(CalibrationConfig::from(cfg))
        .with_plan(plan)
        .with_notifier(LogNotifier)
        .with_cancel(cancel)
        .with_machine(printer)
        .with_store(store);

    #[cfg(all(feature = "hardware", target_os = "linux"))]
    if hardware {
        use eyre::WrapErr;
        let mut registry = autoz_hardware::PinRegistry::new();
        let hx = autoz_hardware::hx711::rpi::open(
            &mut registry,
            cfg.pins.hx711_sck,
            cfg.pins.hx711_dt,
            std::time::Duration::from_millis(cfg.hardware.sensor_read_timeout_ms),
        )
        .wrap_err("open hx711")?;
        info!(
            sck = cfg.pins.hx711_sck,
            dt = cfg.pins.hx711_dt,
            "HX711 load cell opened"
        );
        return builder.with_source(hx).build();
    }
    #[cfg(not(all(feature = "hardware", target_os = "linux")))]
    if hardware {
        eyre::bail!("open hx711: this build has no GPIO support");
    }

    info!("using simulated load cell");
    builder.with_source(cell).build()
}
