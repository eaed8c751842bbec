//! Despike → high-pass → low-pass, applied in place to caller-owned buffers.
//!
//! Every stage is a pure function of its input; nothing is carried between
//! calls.

use crate::config::FilterCfg;

/// Smaller-magnitude of two values; ties keep `b`.
#[inline]
fn smaller_magnitude(a: f32, b: f32) -> f32 {
    if a.abs() < b.abs() { a } else { b }
}

/// 3-tap glitch suppressor over `[0, len-3)`. Buffers shorter than 4 are left alone.
pub fn despike(buf: &mut [f32]) {
    let n = buf.len();
    if n < 4 {
        return;
    }
    for i in 0..n - 3 {
        let m = smaller_magnitude(buf[i], buf[i + 1]);
        buf[i] = smaller_magnitude(m, buf[i + 2]);
    }
}

/// Coefficient of a single-pole RC high-pass at `cutoff_hz` sampled at `sample_rate_hz`.
pub fn high_pass_coeff(cutoff_hz: f32, sample_rate_hz: f32) -> f32 {
    let rc = 1.0 / (2.0 * std::f32::consts::PI * cutoff_hz);
    let dt = 1.0 / sample_rate_hz;
    rc / (rc + dt)
}

/// Rectified single-pole high-pass. The recursion carries the signed output;
/// the buffer receives its magnitude.
pub fn high_pass(buf: &mut [f32], coeff: f32) {
    let Some(&first) = buf.first() else {
        return;
    };
    let mut x_prev = first;
    let mut y_prev = 0.0f32;
    for v in buf.iter_mut() {
        let x = *v;
        let y = (x - x_prev + y_prev) * coeff;
        x_prev = x;
        y_prev = y;
        *v = y.abs();
    }
}

/// Single-pole low-pass, `v[i] = v[i-1]*(1-k) + v[i]*k` for `i >= 1`.
pub fn low_pass(buf: &mut [f32], k: f32) {
    for i in 1..buf.len() {
        buf[i] = buf[i - 1] * (1.0 - k) + buf[i] * k;
    }
}

/// Precomputed filter chain.
#[derive(Debug, Clone, Copy)]
pub struct FilterChain {
    hp_coeff: f32,
    lp_k: f32,
}

impl FilterChain {
    pub fn new(cfg: &FilterCfg) -> Self {
        Self {
            hp_coeff: high_pass_coeff(cfg.cutoff_hz, cfg.sample_rate_hz),
            lp_k: cfg.lowpass_k,
        }
    }

    pub fn hp_coeff(&self) -> f32 {
        self.hp_coeff
    }

    pub fn lowpass_k(&self) -> f32 {
        self.lp_k
    }

    /// Run all three stages in order.
    pub fn apply(&self, buf: &mut [f32]) {
        despike(buf);
        high_pass(buf, self.hp_coeff);
        low_pass(buf, self.lp_k);
    }
}

impl Default for FilterChain {
    fn default() -> Self {
        Self::new(&FilterCfg::default())
    }
}
