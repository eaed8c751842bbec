use crate::config::{WINDOW_HALF, WINDOW_LEN};
use crate::filter::FilterChain;

/// Fixed-length FIFO of `(pressure, relative_z)` pairs.
///
/// The first `WINDOW_HALF` entries are rolling context, the second half is
/// the analysis zone. Length never changes; pushes shift everything left.
#[derive(Debug, Clone)]
pub struct SampleWindow {
    pressure: [f32; WINDOW_LEN],
    depth: [f32; WINDOW_LEN],
    pushes: usize,
}

impl Default for SampleWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleWindow {
    pub const fn new() -> Self {
        Self {
            pressure: [0.0; WINDOW_LEN],
            depth: [0.0; WINDOW_LEN],
            pushes: 0,
        }
    }

    pub fn reset(&mut self) {
        self.pressure = [0.0; WINDOW_LEN];
        self.depth = [0.0; WINDOW_LEN];
        self.pushes = 0;
    }

    pub fn push(&mut self, pressure: f32, relative_z: f32) {
        self.pressure.copy_within(1.., 0);
        self.depth.copy_within(1.., 0);
        self.pressure[WINDOW_LEN - 1] = pressure;
        self.depth[WINDOW_LEN - 1] = relative_z;
        self.pushes = self.pushes.saturating_add(1);
    }

    /// Pushes received since the last reset.
    pub fn pushes(&self) -> usize {
        self.pushes
    }

    /// True once every slot holds a real sample.
    pub fn is_filled(&self) -> bool {
        self.pushes >= WINDOW_LEN
    }

    pub fn pressures(&self) -> &[f32; WINDOW_LEN] {
        &self.pressure
    }

    pub fn depths(&self) -> &[f32; WINDOW_LEN] {
        &self.depth
    }

    /// Depth recorded at analysis-zone index `i`.
    pub fn zone_depth(&self, i: usize) -> f32 {
        self.depth[WINDOW_HALF + i.min(WINDOW_HALF - 1)]
    }

    /// Filtered copy of the pressure column; the window itself is untouched.
    pub fn filtered(&self, chain: &FilterChain) -> [f32; WINDOW_LEN] {
        let mut out = self.pressure;
        chain.apply(&mut out);
        out
    }
}
