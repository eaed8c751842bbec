//! Explicit record of GPIO lines that have already been configured.
//!
//! Passed by `&mut` into whoever opens a driver, so the "configured once"
//! rule lives in a value the caller owns instead of process-wide state.

use crate::error::{HwError, Result};

#[derive(Debug, Default, Clone)]
pub struct PinRegistry {
    configured: Vec<u8>,
}

impl PinRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `pin` as configured. Returns true when this call claimed it,
    /// false when it had already been configured earlier.
    pub fn claim(&mut self, pin: u8) -> bool {
        if self.is_configured(pin) {
            return false;
        }
        self.configured.push(pin);
        true
    }

    pub fn is_configured(&self, pin: u8) -> bool {
        self.configured.contains(&pin)
    }

    /// `PinInUse` for the first of `pins` already configured. Nothing is
    /// claimed either way.
    pub fn ensure_free(&self, pins: &[u8]) -> Result<()> {
        match pins.iter().find(|p| self.is_configured(**p)) {
            Some(pin) => Err(HwError::PinInUse(*pin)),
            None => Ok(()),
        }
    }

    pub fn release(&mut self, pin: u8) {
        self.configured.retain(|p| *p != pin);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claims_each_pin_once() {
        let mut reg = PinRegistry::new();
        assert!(reg.claim(4));
        assert!(!reg.claim(4));
        assert!(reg.claim(6));
        assert!(reg.is_configured(4));
        reg.release(4);
        assert!(!reg.is_configured(4));
        assert!(reg.claim(4));
    }

    #[test]
    fn configured_pin_is_refused_without_claiming_the_rest() {
        let mut reg = PinRegistry::new();
        assert!(reg.ensure_free(&[6, 5]).is_ok());
        reg.claim(5);
        assert!(matches!(reg.ensure_free(&[6, 5]), Err(HwError::PinInUse(5))));
        assert!(!reg.is_configured(6));
    }
}
