use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AutoZError {
    #[error("no contact detected within travel limit")]
    SensorFault,
    #[error("offset {value:.3} mm rejected (bounds [{min}, {max}], zero excluded)")]
    Range { value: f32, min: f32, max: f32 },
    #[error("repeat scans disagreed after {attempts} attempts (tolerance {tolerance_mm} mm)")]
    RetryExhausted { attempts: u32, tolerance_mm: f32 },
    #[error("prerequisite failed: {0}")]
    Prerequisite(String),
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("timeout waiting for sensor")]
    Timeout,
    #[error("cancelled")]
    Cancelled,
    #[error("run rejected: {0}")]
    Rejected(RejectReason),
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    #[error("no valid points")]
    NoValidPoints,
    #[error("median outside offset bounds")]
    MedianOutOfRange,
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing machine")]
    MissingMachine,
    #[error("missing sample source")]
    MissingSource,
    #[error("missing offset store")]
    MissingStore,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub type AutoZResult<T> = std::result::Result<T, AutoZError>;
pub use eyre::Report;
