//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "autoz", version, about = "Load-cell nozzle Z-offset tool")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/autoz.toml")]
    pub config: PathBuf,

    /// Persisted offset and boot-wizard state
    #[arg(long, value_name = "FILE", default_value = "autoz_state.toml")]
    pub state: PathBuf,

    /// Log and report as JSON lines instead of pretty text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Read the load cell from the HX711 on [pins] instead of the simulator.
    /// Motion stays simulated. Needs a build with the `hardware` feature.
    #[arg(long, action = ArgAction::SetTrue)]
    pub hardware: bool,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Diagnostics: raw dump, single scan, or repeated full routines
    Diag {
        /// Dump N raw amplifier readings with timestamps and stop
        #[arg(long, value_name = "N")]
        raw: Option<usize>,
        /// One scan at the press position (no homing)
        #[arg(long, action = ArgAction::SetTrue)]
        scan: bool,
        /// Include the nozzle cleaning stage
        #[arg(long, action = ArgAction::SetTrue)]
        clean: bool,
        /// Measure by load-cell press
        #[arg(long, action = ArgAction::SetTrue)]
        press: bool,
        /// Measure by touch probe
        #[arg(long, action = ArgAction::SetTrue)]
        touch: bool,
        /// Full-routine repetitions
        #[arg(long, value_name = "N", default_value_t = 1)]
        count: usize,
        /// Write the raw dump as CSV (at_ms,value)
        #[arg(long, value_name = "FILE", requires = "raw")]
        csv: Option<PathBuf>,
    },
    /// Measure, persist and apply the offset, then home
    OneShot {
        /// Continue to bed leveling afterwards instead of returning to the menu
        #[arg(long, value_name = "BOOL", default_value_t = true, action = ArgAction::Set)]
        leveling: bool,
    },
    /// Idle-noise health check of the load cell
    SelfCheck,
}
