use std::time::{Duration, Instant};

use crate::error::{HwError, Result};

/// Wait until the provided `is_high` predicate reports false (line went low),
/// or `timeout` expires. `pause` runs between polls so the caller decides
/// whether that is a sleep, a delay or a cooperative yield.
pub fn wait_until_low_with_timeout(
    mut is_high: impl FnMut() -> Result<bool>,
    timeout: Duration,
    mut pause: impl FnMut(),
) -> Result<()> {
    let deadline = Instant::now() + timeout;
    while is_high()? {
        if Instant::now() >= deadline {
            return Err(HwError::DataReadyTimeout);
        }
        pause();
    }
    Ok(())
}

/// Sign-extend a 24-bit two's complement value into an `i32`.
#[inline]
pub fn sign_extend_24(raw: u32) -> i32 {
    ((raw << 8) as i32) >> 8
}
