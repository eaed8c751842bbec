pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

/// Error type used at every collaborator boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Cartesian nozzle position in millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Position {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Same XY, different Z.
    pub const fn with_z(self, z: f32) -> Self {
        Self { z, ..self }
    }
}

/// One raw conversion from the load-cell amplifier.
pub trait SampleSource {
    fn read(&mut self, timeout: std::time::Duration) -> Result<i32, BoxError>;
}

/// Blocking motion collaborator. Every move returns only once the
/// planner has physically completed it.
pub trait Motion {
    fn move_to_xy(&mut self, x: f32, y: f32, feed_mm_s: f32) -> Result<(), BoxError>;
    fn move_to_z(&mut self, z: f32, feed_mm_s: f32) -> Result<(), BoxError>;
    fn move_to_xyz(&mut self, pos: Position, feed_mm_s: f32) -> Result<(), BoxError>;
    fn position(&self) -> Position;
    fn home_all(&mut self) -> Result<(), BoxError>;
    fn home_z(&mut self) -> Result<(), BoxError>;
    /// Enable or disable soft endstops; returns the previous state.
    fn set_soft_endstops(&mut self, enabled: bool) -> bool;
    fn set_leveling(&mut self, enabled: bool);
}

pub trait Thermal {
    fn hotend_target(&self) -> f32;
    fn hotend_temp(&self) -> f32;
    fn set_hotend_target(&mut self, celsius: f32);
    fn bed_target(&self) -> f32;
    fn bed_temp(&self) -> f32;
    fn set_bed_target(&mut self, celsius: f32);
    fn set_fan_speed(&mut self, speed: u8);
}

/// Secondary mechanical probe with a fixed XY offset from the nozzle.
pub trait TouchProbe {
    /// Probe the bed at the given nozzle-space XY and return the measured Z.
    fn probe_at(&mut self, x: f32, y: f32) -> Result<f32, BoxError>;
    fn stow(&mut self) -> Result<(), BoxError>;
}

/// Cooperative yield into the firmware main loop (watchdog, serial, thermal).
pub trait Cooperative {
    fn idle(&mut self);
}

/// Everything the engine needs from the printer in one bound.
pub trait Machine: Motion + Thermal + TouchProbe + Cooperative {}

impl<T: Motion + Thermal + TouchProbe + Cooperative> Machine for T {}

/// Destination of the measured offset.
pub trait OffsetStore {
    /// Apply to the running machine (probe offset and babystep); not durable.
    fn apply(&mut self, z_offset_mm: f32);
    /// Durable write, atomic from the caller's perspective.
    fn persist(&mut self, z_offset_mm: f32) -> Result<(), BoxError>;
}

/// Progress stages reported to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiStage {
    Heating,
    Cleaning,
    Measuring,
    HeightFound,
    Finished,
    Failed,
    LevelingNext,
    ReturnToMenu,
}

/// Fire-and-forget UI notification sink.
pub trait Notifier {
    fn notify(&mut self, stage: UiStage);
}

// Boxed collaborators forward to their contents so trait objects can be
// handed to generic code.

impl<T: SampleSource + ?Sized> SampleSource for Box<T> {
    fn read(&mut self, timeout: std::time::Duration) -> Result<i32, BoxError> {
        (**self).read(timeout)
    }
}

impl<T: Motion + ?Sized> Motion for Box<T> {
    fn move_to_xy(&mut self, x: f32, y: f32, feed_mm_s: f32) -> Result<(), BoxError> {
        (**self).move_to_xy(x, y, feed_mm_s)
    }
    fn move_to_z(&mut self, z: f32, feed_mm_s: f32) -> Result<(), BoxError> {
        (**self).move_to_z(z, feed_mm_s)
    }
    fn move_to_xyz(&mut self, pos: Position, feed_mm_s: f32) -> Result<(), BoxError> {
        (**self).move_to_xyz(pos, feed_mm_s)
    }
    fn position(&self) -> Position {
        (**self).position()
    }
    fn home_all(&mut self) -> Result<(), BoxError> {
        (**self).home_all()
    }
    fn home_z(&mut self) -> Result<(), BoxError> {
        (**self).home_z()
    }
    fn set_soft_endstops(&mut self, enabled: bool) -> bool {
        (**self).set_soft_endstops(enabled)
    }
    fn set_leveling(&mut self, enabled: bool) {
        (**self).set_leveling(enabled);
    }
}

impl<T: Thermal + ?Sized> Thermal for Box<T> {
    fn hotend_target(&self) -> f32 {
        (**self).hotend_target()
    }
    fn hotend_temp(&self) -> f32 {
        (**self).hotend_temp()
    }
    fn set_hotend_target(&mut self, celsius: f32) {
        (**self).set_hotend_target(celsius);
    }
    fn bed_target(&self) -> f32 {
        (**self).bed_target()
    }
    fn bed_temp(&self) -> f32 {
        (**self).bed_temp()
    }
    fn set_bed_target(&mut self, celsius: f32) {
        (**self).set_bed_target(celsius);
    }
    fn set_fan_speed(&mut self, speed: u8) {
        (**self).set_fan_speed(speed);
    }
}

impl<T: TouchProbe + ?Sized> TouchProbe for Box<T> {
    fn probe_at(&mut self, x: f32, y: f32) -> Result<f32, BoxError> {
        (**self).probe_at(x, y)
    }
    fn stow(&mut self) -> Result<(), BoxError> {
        (**self).stow()
    }
}

impl<T: Cooperative + ?Sized> Cooperative for Box<T> {
    fn idle(&mut self) {
        (**self).idle();
    }
}

impl<T: OffsetStore + ?Sized> OffsetStore for Box<T> {
    fn apply(&mut self, z_offset_mm: f32) {
        (**self).apply(z_offset_mm);
    }
    fn persist(&mut self, z_offset_mm: f32) -> Result<(), BoxError> {
        (**self).persist(z_offset_mm)
    }
}

impl<T: Notifier + ?Sized> Notifier for Box<T> {
    fn notify(&mut self, stage: UiStage) {
        (**self).notify(stage);
    }
}
