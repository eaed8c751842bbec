use crate::config::OffsetBounds;
use crate::error::{AutoZError, AutoZResult};

/// Median of `vals`: middle element for odd counts, mean of the two middle
/// elements for even counts. `None` when empty.
pub fn median_of(vals: &[f32]) -> Option<f32> {
    if vals.is_empty() {
        return None;
    }
    let mut work = vals.to_vec();
    work.sort_by(f32::total_cmp);
    let n = work.len();
    if n % 2 == 1 {
        Some(work[n / 2])
    } else {
        Some(0.5 * (work[n / 2 - 1] + work[n / 2]))
    }
}

/// Finite, not a ghost zero-contact, and inside `[min, max]`.
pub fn is_valid_offset(v: f32, bounds: &OffsetBounds) -> bool {
    v.is_finite()
        && v.abs() >= bounds.ghost_epsilon_mm
        && v >= bounds.min_mm
        && v <= bounds.max_mm
}

/// Pass `v` through, or reject it with [`AutoZError::Range`].
pub fn check_offset(v: f32, bounds: &OffsetBounds) -> AutoZResult<f32> {
    if is_valid_offset(v, bounds) {
        Ok(v)
    } else {
        Err(AutoZError::Range {
            value: v,
            min: bounds.min_mm,
            max: bounds.max_mm,
        })
    }
}
