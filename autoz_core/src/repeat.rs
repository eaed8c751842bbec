use autoz_traits::{Cooperative, Motion, SampleSource};
use tracing::{debug, warn};

use crate::error::{AutoZError, AutoZResult};
use crate::scan::{ScanConfig, StepScanProbe};

/// No repeated scan travels deeper than this below its base.
pub const DEPTH_CLAMP_MM: f32 = -3.0;

/// Repeat scans until two consecutive heights agree.
#[derive(Debug, Clone, Copy)]
pub struct RepeatedMeasurement {
    /// Rounds of paired scans; `<= 0` means exactly one scan.
    pub attempts: i32,
    pub tolerance_mm: f32,
}

impl RepeatedMeasurement {
    pub const fn new(attempts: i32, tolerance_mm: f32) -> Self {
        Self {
            attempts,
            tolerance_mm,
        }
    }

    pub const fn single() -> Self {
        Self::new(0, 0.0)
    }

    /// Average height of the first agreeing pair, or of the last pair once
    /// attempts run out. A scan without contact fails with `SensorFault`.
    pub fn measure<M, S>(
        &self,
        probe: &mut StepScanProbe<'_, M, S>,
        scan: &ScanConfig,
    ) -> AutoZResult<f32>
    where
        M: Motion + Cooperative + ?Sized,
        S: SampleSource + ?Sized,
    {
        let scan = scan.with_depth_limit(scan.depth_limit_mm.max(DEPTH_CLAMP_MM));
        let mut once = || -> AutoZResult<f32> {
            let r = probe.scan(&scan)?;
            if r.is_contact() {
                Ok(r.height_mm)
            } else {
                Err(AutoZError::SensorFault)
            }
        };

        if self.attempts <= 0 {
            return once();
        }

        let (mut a, mut b) = (0.0f32, 0.0f32);
        for attempt in 1..=self.attempts {
            a = once()?;
            b = once()?;
            if (a - b).abs() <= self.tolerance_mm {
                return Ok((a + b) / 2.0);
            }
            debug!(attempt, a, b, tolerance_mm = self.tolerance_mm, "repeat scans disagree");
        }
        let best_effort = (a + b) / 2.0;
        let exhausted = AutoZError::RetryExhausted {
            attempts: self.attempts.unsigned_abs(),
            tolerance_mm: self.tolerance_mm,
        };
        warn!(error = %exhausted, best_effort_mm = best_effort, "using average of last pair");
        Ok(best_effort)
    }
}
