use crate::config::TriggerCfg;

/// Why the detector fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Monotonic rise through the magnitude and slope gates.
    Contact,
    /// Last three samples all beyond `max_hold`; fires regardless of slope.
    Overpressure,
}

/// Stateless trigger predicate over the tail of a filtered window.
#[derive(Debug, Clone, Copy)]
pub struct ContactDetector {
    min_hold: f32,
    max_hold: f32,
}

impl ContactDetector {
    pub fn new(cfg: &TriggerCfg) -> Self {
        Self {
            min_hold: cfg.min_hold,
            max_hold: cfg.max_hold,
        }
    }

    /// Evaluate the last three values of `filtered` (A = last, B, C).
    /// `filled` is the window fill state; nothing fires before the window is full.
    pub fn evaluate(&self, filtered: &[f32], filled: bool) -> Option<Trigger> {
        if !filled {
            return None;
        }
        let [c, b, a] = match filtered {
            [.., c, b, a] => [*c, *b, *a],
            _ => return None,
        };

        if a.abs() > self.max_hold && b.abs() > self.max_hold && c.abs() > self.max_hold {
            return Some(Trigger::Overpressure);
        }
        if !(a > b && b > c) {
            return None;
        }
        if a.abs() < self.min_hold {
            return None;
        }
        if a - c < self.min_hold * 0.25 {
            return None;
        }
        Some(Trigger::Contact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det() -> ContactDetector {
        ContactDetector::new(&TriggerCfg {
            min_hold: 2000.0,
            max_hold: 10000.0,
        })
    }

    #[test]
    fn unfilled_window_never_fires() {
        assert_eq!(det().evaluate(&[0.0, 50_000.0, 60_000.0, 70_000.0], false), None);
    }

    #[test]
    fn too_short_never_fires() {
        assert_eq!(det().evaluate(&[3000.0, 9000.0], true), None);
    }

    #[test]
    fn magnitude_gate_is_inclusive() {
        // |A| == min_hold passes, A - C == 0.25 * min_hold passes
        assert_eq!(det().evaluate(&[1500.0, 1800.0, 2000.0], true), Some(Trigger::Contact));
        assert_eq!(det().evaluate(&[1500.0, 1800.0, 1999.0], true), None);
    }

    #[test]
    fn slope_gate_rejects_slow_rise() {
        assert_eq!(det().evaluate(&[2600.0, 2700.0, 2800.0], true), None);
    }

    #[test]
    fn overpressure_bypasses_slope() {
        assert_eq!(
            det().evaluate(&[12_000.0, 12_000.0, 12_000.0], true),
            Some(Trigger::Overpressure)
        );
        assert_eq!(
            det().evaluate(&[-12_000.0, 12_000.0, -12_000.0], true),
            Some(Trigger::Overpressure)
        );
    }
}
