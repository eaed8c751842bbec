//! Contact-height location inside a triggered window.
//!
//! The analysis zone is normalized to `[0, 1]`, the residual linear trend is
//! treated as a rotation and removed, and the lowest rotated point marks the
//! last sample before load built up.

use crate::config::{WINDOW_HALF, WINDOW_LEN};
use crate::filter::FilterChain;
use crate::window::SampleWindow;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Located {
    /// Analysis-zone index, `0..WINDOW_HALF`.
    pub index: usize,
    /// Depth captured with that sample, relative to the scan base.
    pub height_mm: f32,
}

/// Min-max normalize in place; a flat zone becomes all zeros.
pub fn normalize(zone: &mut [f32]) {
    let (lo, hi) = zone
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(*v), hi.max(*v))
        });
    let span = hi - lo;
    if !(span.is_finite() && span > 0.0) {
        zone.iter_mut().for_each(|v| *v = 0.0);
        return;
    }
    zone.iter_mut().for_each(|v| *v = (*v - lo) / span);
}

/// Normalize, remove drift by rotating `(i, v)` through `-atan((last-first)/len)`,
/// and return the argmin index. Later indices win ties.
pub fn locate_in_zone(zone: &mut [f32]) -> usize {
    if zone.is_empty() {
        return 0;
    }
    normalize(zone);
    let n = zone.len();
    let theta = ((zone[n - 1] - zone[0]) / n as f32).atan();
    let (sin, cos) = (-theta).sin_cos();
    let mut best = f32::INFINITY;
    let mut best_idx = n - 1;
    for (i, v) in zone.iter_mut().enumerate() {
        *v = i as f32 * sin + *v * cos;
        if *v <= best {
            best = *v;
            best_idx = i;
        }
    }
    best_idx
}

/// Filter the whole window, locate the minimum in its analysis zone and map it
/// back to the depth stored with that sample.
pub fn locate(window: &SampleWindow, chain: &FilterChain) -> Located {
    let filtered: [f32; WINDOW_LEN] = window.filtered(chain);
    let mut zone = [0.0f32; WINDOW_HALF];
    zone.copy_from_slice(&filtered[WINDOW_HALF..]);
    let index = locate_in_zone(&mut zone);
    Located {
        index,
        height_mm: window.zone_depth(index),
    }
}
