//! Test and helper mocks for autoz_core

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use autoz_traits::{BoxError, Notifier, OffsetStore, Position, SampleSource, UiStage};

use crate::calibrator::{CalibrationSample, MeasureModes, PointMeasurer};
use crate::error::{AutoZError, AutoZResult};

/// Replays a fixed list of readings, then keeps returning the last one.
#[derive(Debug, Clone, Default)]
pub struct SequenceSource {
    vals: VecDeque<i32>,
    last: i32,
}

impl SequenceSource {
    pub fn new(vals: impl IntoIterator<Item = i32>) -> Self {
        Self {
            vals: vals.into_iter().collect(),
            last: 0,
        }
    }
}

impl SampleSource for SequenceSource {
    fn read(&mut self, _timeout: Duration) -> Result<i32, BoxError> {
        if let Some(v) = self.vals.pop_front() {
            self.last = v;
        }
        Ok(self.last)
    }
}

#[derive(Debug, Default)]
pub struct StoreLog {
    pub applied: Vec<f32>,
    pub persisted: Vec<f32>,
    pub fail_persist: bool,
}

/// In-memory offset store. Clones share one log.
#[derive(Debug, Clone, Default)]
pub struct MemoryOffsetStore(Rc<RefCell<StoreLog>>);

impl MemoryOffsetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let s = Self::default();
        s.0.borrow_mut().fail_persist = true;
        s
    }

    pub fn applied(&self) -> Vec<f32> {
        self.0.borrow().applied.clone()
    }

    pub fn persisted(&self) -> Vec<f32> {
        self.0.borrow().persisted.clone()
    }

    pub fn last_applied(&self) -> Option<f32> {
        self.0.borrow().applied.last().copied()
    }
}

impl OffsetStore for MemoryOffsetStore {
    fn apply(&mut self, z_offset_mm: f32) {
        self.0.borrow_mut().applied.push(z_offset_mm);
    }

    fn persist(&mut self, z_offset_mm: f32) -> Result<(), BoxError> {
        let mut log = self.0.borrow_mut();
        if log.fail_persist {
            return Err(Box::new(std::io::Error::other("store write failed")));
        }
        log.persisted.push(z_offset_mm);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&mut self, _stage: UiStage) {}
}

/// Remembers every stage. Clones share one history.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier(Rc<RefCell<Vec<UiStage>>>);

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stages(&self) -> Vec<UiStage> {
        self.0.borrow().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&mut self, stage: UiStage) {
        self.0.borrow_mut().push(stage);
    }
}

/// Per-point measurer that returns scripted differences in order and fails
/// with `SensorFault` once the script runs out.
#[derive(Debug, Clone, Default)]
pub struct ScriptedMeasurer {
    script: VecDeque<AutoZResult<f32>>,
    visited: Rc<RefCell<Vec<Position>>>,
}

impl ScriptedMeasurer {
    pub fn new(script: impl IntoIterator<Item = AutoZResult<f32>>) -> Self {
        Self {
            script: script.into_iter().collect(),
            visited: Rc::default(),
        }
    }

    pub fn from_values(vals: impl IntoIterator<Item = f32>) -> Self {
        Self::new(vals.into_iter().map(Ok))
    }

    /// Shared list of positions asked for so far.
    pub fn visited(&self) -> Rc<RefCell<Vec<Position>>> {
        Rc::clone(&self.visited)
    }
}

impl<M: ?Sized, S: ?Sized> PointMeasurer<M, S> for ScriptedMeasurer {
    fn point_difference(
        &mut self,
        _machine: &mut M,
        _source: &mut S,
        at: Position,
        _modes: MeasureModes,
    ) -> AutoZResult<CalibrationSample> {
        self.visited.borrow_mut().push(at);
        let d = self.script.pop_front().unwrap_or(Err(AutoZError::SensorFault))?;
        Ok(CalibrationSample {
            touch_mm: 0.0,
            press_mm: d,
            difference_mm: d,
        })
    }
}
