//! Deterministic simulated printer and load cell.
//!
//! Both halves share one `SimState`, so the load cell "feels" whatever the
//! simulated nozzle is doing. The bed is a plane; the load cell reports
//! `baseline + stiffness * penetration` plus bounded pseudo-random noise.

use std::cell::{Ref, RefCell};
use std::rc::Rc;
use std::time::Duration;

use autoz_traits::{BoxError, Cooperative, Motion, Position, SampleSource, Thermal, TouchProbe};
use tracing::trace;

use crate::error::HwError;

const COUNTS_MAX: f32 = 8_388_607.0;
const COUNTS_MIN: f32 = -8_388_608.0;

#[derive(Debug, Clone)]
pub struct SimParams {
    /// Bed height at the origin.
    pub bed_z_mm: f32,
    /// Bed slope in mm per mm of X travel.
    pub tilt_x: f32,
    /// Bed slope in mm per mm of Y travel.
    pub tilt_y: f32,
    /// The touch probe reports the bed height plus this.
    pub touch_reading_mm: f32,
    /// Load-cell counts per mm of nozzle penetration.
    pub counts_per_mm: f32,
    pub baseline_counts: i32,
    /// Noise amplitude; readings vary by at most `±noise_counts`.
    pub noise_counts: i32,
    /// Counts added per reading, independent of contact.
    pub drift_per_read: f32,
    pub seed: u32,
    /// Z position after homing.
    pub home_z_mm: f32,
    /// Lowest Z allowed while soft endstops are on.
    pub soft_min_z_mm: f32,
    pub fail_homing: bool,
    pub fail_touch: bool,
    /// XY moves fail, as when a stepper stalls.
    pub fail_xy_moves: bool,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            bed_z_mm: 0.0,
            tilt_x: 0.0,
            tilt_y: 0.0,
            touch_reading_mm: 1.6,
            counts_per_mm: 100_000.0,
            baseline_counts: 84_000,
            noise_counts: 40,
            drift_per_read: 0.0,
            seed: 0x1234_5678,
            home_z_mm: 5.0,
            soft_min_z_mm: 0.0,
            fail_homing: false,
            fail_touch: false,
            fail_xy_moves: false,
        }
    }
}

/// Everything observable about the simulated machine.
#[derive(Debug, Clone)]
pub struct SimState {
    pub params: SimParams,
    pub pos: Position,
    pub soft_endstops: bool,
    pub leveling: bool,
    pub hotend_target: f32,
    pub bed_target: f32,
    pub fan_speed: u8,
    pub homed: u32,
    pub touch_probes: u32,
    pub stows: u32,
    pub idles: u64,
    pub reads: u64,
    /// Deepest Z the nozzle reached.
    pub min_z_seen: f32,
    rng: u32,
}

impl SimState {
    fn new(params: SimParams) -> Self {
        let rng = if params.seed == 0 { 0x9E37_79B9 } else { params.seed };
        Self {
            pos: Position::new(0.0, 0.0, params.home_z_mm),
            soft_endstops: true,
            leveling: true,
            hotend_target: 0.0,
            bed_target: 0.0,
            fan_speed: 0,
            homed: 0,
            touch_probes: 0,
            stows: 0,
            idles: 0,
            reads: 0,
            min_z_seen: params.home_z_mm,
            rng,
            params,
        }
    }

    pub fn bed_at(&self, x: f32, y: f32) -> f32 {
        self.params.bed_z_mm + self.params.tilt_x * x + self.params.tilt_y * y
    }

    fn next_noise(&mut self) -> i32 {
        // xorshift32
        let mut s = self.rng;
        s ^= s << 13;
        s ^= s >> 17;
        s ^= s << 5;
        self.rng = s;
        let n = self.params.noise_counts;
        if n <= 0 {
            return 0;
        }
        let span = (2 * n + 1) as u32;
        (s % span) as i32 - n
    }

    fn set_z(&mut self, z: f32) {
        let z = if self.soft_endstops {
            z.max(self.params.soft_min_z_mm)
        } else {
            z
        };
        self.pos.z = z;
        self.min_z_seen = self.min_z_seen.min(z);
    }

    fn sample(&mut self) -> i32 {
        let bed = self.bed_at(self.pos.x, self.pos.y);
        let penetration = (bed - self.pos.z).max(0.0);
        let drift = self.params.drift_per_read * self.reads as f32;
        self.reads += 1;
        let v = self.params.baseline_counts as f32
            + self.params.counts_per_mm * penetration
            + drift
            + self.next_noise() as f32;
        v.clamp(COUNTS_MIN, COUNTS_MAX) as i32
    }
}

/// Read-only view onto the shared state, for assertions.
#[derive(Clone)]
pub struct SimHandle(Rc<RefCell<SimState>>);

impl SimHandle {
    pub fn state(&self) -> Ref<'_, SimState> {
        self.0.borrow()
    }

    /// Change a parameter mid-run (for example to fail the touch probe).
    pub fn update(&self, f: impl FnOnce(&mut SimParams)) {
        f(&mut self.0.borrow_mut().params);
    }
}

pub struct SimulatedPrinter {
    state: Rc<RefCell<SimState>>,
}

pub struct SimulatedLoadCell {
    state: Rc<RefCell<SimState>>,
}

/// Build a printer and load cell that share one simulated world.
pub fn simulated(params: SimParams) -> (SimulatedPrinter, SimulatedLoadCell, SimHandle) {
    let state = Rc::new(RefCell::new(SimState::new(params)));
    (
        SimulatedPrinter {
            state: state.clone(),
        },
        SimulatedLoadCell {
            state: state.clone(),
        },
        SimHandle(state),
    )
}

impl SimulatedPrinter {
    pub fn handle(&self) -> SimHandle {
        SimHandle(self.state.clone())
    }
}

impl SampleSource for SimulatedLoadCell {
    fn read(&mut self, _timeout: Duration) -> Result<i32, BoxError> {
        let v = self.state.borrow_mut().sample();
        trace!(raw = v, "sim load cell read");
        Ok(v)
    }
}

impl Motion for SimulatedPrinter {
    fn move_to_xy(&mut self, x: f32, y: f32, _feed_mm_s: f32) -> Result<(), BoxError> {
        let mut s = self.state.borrow_mut();
        if s.params.fail_xy_moves {
            return Err(Box::new(HwError::Gpio("xy stepper stalled".into())));
        }
        s.pos.x = x;
        s.pos.y = y;
        Ok(())
    }

    fn move_to_z(&mut self, z: f32, _feed_mm_s: f32) -> Result<(), BoxError> {
        self.state.borrow_mut().set_z(z);
        Ok(())
    }

    fn move_to_xyz(&mut self, pos: Position, _feed_mm_s: f32) -> Result<(), BoxError> {
        let mut s = self.state.borrow_mut();
        s.pos.x = pos.x;
        s.pos.y = pos.y;
        s.set_z(pos.z);
        Ok(())
    }

    fn position(&self) -> Position {
        self.state.borrow().pos
    }

    fn home_all(&mut self) -> Result<(), BoxError> {
        let mut s = self.state.borrow_mut();
        if s.params.fail_homing {
            return Err(Box::new(HwError::Gpio("z endstop did not trigger".into())));
        }
        let home_z = s.params.home_z_mm;
        s.pos = Position::new(0.0, 0.0, home_z);
        s.homed += 1;
        Ok(())
    }

    fn home_z(&mut self) -> Result<(), BoxError> {
        let mut s = self.state.borrow_mut();
        if s.params.fail_homing {
            return Err(Box::new(HwError::Gpio("z endstop did not trigger".into())));
        }
        let home_z = s.params.home_z_mm;
        s.pos.z = home_z;
        s.homed += 1;
        Ok(())
    }

    fn set_soft_endstops(&mut self, enabled: bool) -> bool {
        let mut s = self.state.borrow_mut();
        std::mem::replace(&mut s.soft_endstops, enabled)
    }

    fn set_leveling(&mut self, enabled: bool) {
        self.state.borrow_mut().leveling = enabled;
    }
}

/// Temperatures follow their targets instantly.
impl Thermal for SimulatedPrinter {
    fn hotend_target(&self) -> f32 {
        self.state.borrow().hotend_target
    }
    fn hotend_temp(&self) -> f32 {
        self.state.borrow().hotend_target
    }
    fn set_hotend_target(&mut self, celsius: f32) {
        self.state.borrow_mut().hotend_target = celsius;
    }
    fn bed_target(&self) -> f32 {
        self.state.borrow().bed_target
    }
    fn bed_temp(&self) -> f32 {
        self.state.borrow().bed_target
    }
    fn set_bed_target(&mut self, celsius: f32) {
        self.state.borrow_mut().bed_target = celsius;
    }
    fn set_fan_speed(&mut self, speed: u8) {
        self.state.borrow_mut().fan_speed = speed;
    }
}

impl TouchProbe for SimulatedPrinter {
    fn probe_at(&mut self, x: f32, y: f32) -> Result<f32, BoxError> {
        let mut s = self.state.borrow_mut();
        if s.params.fail_touch {
            return Err(Box::new(HwError::Gpio("touch probe did not trigger".into())));
        }
        s.touch_probes += 1;
        Ok(s.bed_at(x, y) + s.params.touch_reading_mm)
    }

    fn stow(&mut self) -> Result<(), BoxError> {
        self.state.borrow_mut().stows += 1;
        Ok(())
    }
}

impl Cooperative for SimulatedPrinter {
    fn idle(&mut self) {
        self.state.borrow_mut().idles += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_cell_follows_penetration() {
        let (mut printer, mut cell, _h) = simulated(SimParams {
            noise_counts: 0,
            ..SimParams::default()
        });
        printer.set_soft_endstops(false);
        printer.move_to_xyz(Position::new(10.0, 10.0, 1.0), 5.0).unwrap();
        assert_eq!(cell.read(Duration::ZERO).unwrap(), 84_000);
        printer.move_to_z(-0.5, 2.0).unwrap();
        assert_eq!(cell.read(Duration::ZERO).unwrap(), 84_000 + 50_000);
    }

    #[test]
    fn soft_endstops_clamp_z() {
        let (mut printer, _cell, h) = simulated(SimParams::default());
        printer.move_to_z(-1.0, 2.0).unwrap();
        assert_eq!(printer.position().z, 0.0);
        assert!(printer.set_soft_endstops(false));
        printer.move_to_z(-1.0, 2.0).unwrap();
        assert_eq!(h.state().min_z_seen, -1.0);
    }

    #[test]
    fn noise_stays_bounded() {
        let (_p, mut cell, _h) = simulated(SimParams {
            noise_counts: 25,
            ..SimParams::default()
        });
        for _ in 0..500 {
            let v = cell.read(Duration::ZERO).unwrap();
            assert!((84_000 - 25..=84_000 + 25).contains(&v), "{v}");
        }
    }
}
