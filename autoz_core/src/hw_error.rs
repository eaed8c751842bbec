//! Maps `Box<dyn Error>` from trait boundaries to typed `AutoZError`.
//!
//! The traits in `autoz_traits` use `Box<dyn Error + Send + Sync>`; this module
//! converts those to our typed error enum, with an optional feature-gated path
//! for `autoz_hardware::HwError` downcasting.

use crate::error::AutoZError;

/// Map a trait-boundary error to a typed `AutoZError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> AutoZError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<autoz_hardware::error::HwError>() {
            return match hw {
                autoz_hardware::error::HwError::DataReadyTimeout => AutoZError::Timeout,
                other => AutoZError::HardwareFault(other.to_string()),
            };
        }
    }

    if let Some(az) = e.downcast_ref::<AutoZError>() {
        return az.clone();
    }

    // Fallback: string-based detection
    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        AutoZError::Timeout
    } else {
        AutoZError::Hardware(s)
    }
}

/// Convenience for `map_err` on boxed collaborator results.
pub(crate) fn boxed(e: autoz_traits::BoxError) -> AutoZError {
    map_hw_error(e.as_ref())
}
