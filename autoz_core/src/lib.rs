#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Load-cell Z-offset acquisition engine (hardware-agnostic).
//!
//! All printer and sensor access goes through the `autoz_traits` seams.
//!
//! ## Architecture
//!
//! - **Signal path**: `SampleWindow` → `FilterChain` → `ContactDetector` → `locator`
//! - **Scanning**: `StepScanProbe` descends one step per sample; `RepeatedMeasurement`
//!   repeats scans until two agree
//! - **Per point**: `DualModeCalibrator` compares touch probe and load cell;
//!   `Reconciler` samples around a point
//! - **Run**: `OffsetOrchestrator` homes, cleans, samples the plan, takes the
//!   median and commits it through `OffsetStore`
//! - **Entry points**: `command::diagnostic` and `command::one_shot`

pub mod builder;
pub mod calibrator;
pub mod cancel;
pub mod clean;
pub mod command;
pub mod config;
pub mod conversions;
pub mod detector;
pub mod error;
pub mod filter;
pub mod hw_error;
pub mod locator;
pub mod mocks;
pub mod orchestrator;
pub mod repeat;
pub mod scan;
pub mod self_check;
pub mod stats;
pub mod thermal;
pub mod types;
pub mod window;

pub use builder::{Orchestrator, OrchestratorBuilder};
pub use calibrator::{
    CalibrationSample, DualModeCalibrator, MeasureModes, PointMeasurer, Reconciler,
};
pub use cancel::CancelToken;
pub use config::CalibrationConfig;
pub use error::{AutoZError, AutoZResult, BuildError, RejectReason};
pub use filter::FilterChain;
pub use orchestrator::{OffsetOrchestrator, RunOptions, RunStage, SamplingPlan, ZOffsetEstimate};
pub use repeat::RepeatedMeasurement;
pub use scan::{MeasurementResult, ScanConfig, StepScanProbe};
