mod backend;
mod cli;
mod error_fmt;
mod logging;
mod report;
mod store;

use std::path::Path;

use autoz_config::PersistedState;
use autoz_core::command::{BootWizard, DiagnosticOptions, DiagnosticReport, diagnostic, one_shot};
use autoz_core::CancelToken;
use clap::Parser;
use eyre::WrapErr;
use tracing::{info, warn};

use crate::cli::{Cli, Commands, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};
use crate::store::{FileOffsetStore, write_state};

fn main() {
    if let Err(e) = real_main() {
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
        }
        std::process::exit(exit_code_for_error(&e));
    }
}

fn load_config(path: &Path) -> eyre::Result<autoz_config::Config> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("read config {}", path.display()))?;
    let cfg = autoz_config::load_toml(&text)
        .map_err(|e| eyre::eyre!("parse config {}: {e}", path.display()))?;
    cfg.validate()
        .wrap_err_with(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

fn real_main() -> eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    let cfg = load_config(&cli.config)?;
    logging::init_tracing(cli.json, &cli.log_level, &cfg.logging)?;

    let cancel = CancelToken::new();
    {
        let token = cancel.clone();
        if let Err(e) = ctrlc::set_handler(move || token.cancel()) {
            warn!(error = %e, "Ctrl-C handler not installed; runs cannot be cancelled");
        }
    }

    let store = FileOffsetStore::new(&cli.state, cfg.offset.min_mm, cfg.offset.max_mm);
    let mut orch = backend::build_orchestrator(&cfg, store, cancel, cli.hardware)?;

    match cli.cmd {
        Commands::Diag {
            raw,
            scan,
            clean,
            press,
            touch,
            count,
            csv,
        } => {
            let opts = DiagnosticOptions {
                raw,
                single_scan: scan,
                count,
                clean,
                press,
                touch,
            };
            match diagnostic(&mut orch, &opts)? {
                DiagnosticReport::Raw(samples) => {
                    if let Some(path) = csv {
                        report::write_raw_csv(&path, &samples)?;
                        info!(path = %path.display(), n = samples.len(), "raw dump written");
                    }
                    report::print_raw(&samples, cli.json);
                }
                DiagnosticReport::Scan(res) => report::print_scan(&res, cli.json),
                DiagnosticReport::Runs(runs) => {
                    report::print_runs(&runs, cli.json);
                    if !runs.iter().any(Result::is_ok) {
                        if let Some(Err(e)) = runs.into_iter().last() {
                            return Err(e.into());
                        }
                    }
                }
                DiagnosticReport::Nothing => {
                    warn!("diag: select --raw, --scan, or at least one of --clean/--press/--touch");
                }
            }
        }
        Commands::OneShot { leveling } => {
            let loaded = PersistedState::load(&cli.state)?;
            let mut wizard = BootWizard {
                pending: loaded.boot_wizard_pending,
                step: loaded.boot_step,
            };
            let outcome = one_shot(&mut orch, leveling, &mut wizard)?;

            // reload: the store has just written the new offset
            let mut state = PersistedState::load(&cli.state)?;
            state.boot_step = wizard.step;
            write_state(&cli.state, &state)?;
            info!(step = wizard.step, exit = ?outcome.exit, "state saved");
            report::print_estimate(&outcome.estimate, cli.json);
        }
        Commands::SelfCheck => {
            let r = orch.self_check()?;
            report::print_self_check(&r, cli.json);
            if !r.healthy {
                eyre::bail!(
                    "load cell self-check failed: idle spread {:.0} outside the healthy band",
                    r.spread()
                );
            }
        }
    }
    Ok(())
}
