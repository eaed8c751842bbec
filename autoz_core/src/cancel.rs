use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{AutoZError, AutoZResult};

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// `Err(Cancelled)` once the flag is set.
    pub fn check(&self) -> AutoZResult<()> {
        if self.is_cancelled() {
            Err(AutoZError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Check an optional token.
pub(crate) fn check(token: Option<&CancelToken>) -> AutoZResult<()> {
    token.map_or(Ok(()), CancelToken::check)
}
