//! Idle-baseline health check for the amplifier.

use std::time::Duration;

use autoz_traits::{Cooperative, SampleSource};
use tracing::info;

use crate::config::WINDOW_HALF;
use crate::error::AutoZResult;
use crate::filter::{despike, low_pass};
use crate::hw_error::boxed;

/// Smallest idle spread a live amplifier shows.
pub const MIN_IDLE_SPREAD: f32 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelfCheckReport {
    pub min: f32,
    pub avg: f32,
    pub max: f32,
    pub healthy: bool,
}

impl SelfCheckReport {
    pub fn spread(&self) -> f32 {
        self.max - self.min
    }
}

/// Summarize filtered idle readings. Healthy iff the spread lies in
/// `[MIN_IDLE_SPREAD, upper)`.
pub fn summarize(vals: &mut [f32], lowpass_k: f32, upper: f32) -> Option<SelfCheckReport> {
    if vals.is_empty() {
        return None;
    }
    despike(vals);
    low_pass(vals, lowpass_k);
    let min = vals.iter().copied().fold(f32::INFINITY, f32::min);
    let max = vals.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let avg = vals.iter().sum::<f32>() / vals.len() as f32;
    let spread = max - min;
    Some(SelfCheckReport {
        min,
        avg,
        max,
        healthy: (MIN_IDLE_SPREAD..upper).contains(&spread),
    })
}

/// Discard a half window of readings to settle, then summarize the next half.
pub fn self_check<S, C>(
    source: &mut S,
    coop: &mut C,
    timeout: Duration,
    lowpass_k: f32,
    upper: f32,
) -> AutoZResult<SelfCheckReport>
where
    S: SampleSource + ?Sized,
    C: Cooperative + ?Sized,
{
    for _ in 0..WINDOW_HALF {
        source.read(timeout).map_err(boxed)?;
        coop.idle();
    }
    let mut vals = [0.0f32; WINDOW_HALF];
    for v in &mut vals {
        *v = source.read(timeout).map_err(boxed)? as f32;
        coop.idle();
    }
    let report = summarize(&mut vals, lowpass_k, upper).unwrap_or(SelfCheckReport {
        min: 0.0,
        avg: 0.0,
        max: 0.0,
        healthy: false,
    });
    info!(
        min = report.min,
        avg = report.avg,
        max = report.max,
        healthy = report.healthy,
        "amplifier self-check"
    );
    Ok(report)
}
