use std::time::Duration;

use autoz_traits::{Clock, Cooperative, Thermal};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heater {
    Hotend,
    Bed,
}

fn reading<M: Thermal + ?Sized>(machine: &M, heater: Heater) -> (f32, f32) {
    match heater {
        Heater::Hotend => (machine.hotend_target(), machine.hotend_temp()),
        Heater::Bed => (machine.bed_target(), machine.bed_temp()),
    }
}

/// Poll until the heater is within `tolerance_c` of its target or `timeout`
/// elapses on `clock`. Returns whether the target was reached.
pub fn wait_for_temperature<M, C>(
    machine: &mut M,
    clock: &C,
    heater: Heater,
    tolerance_c: f32,
    timeout: Duration,
    poll: Duration,
) -> bool
where
    M: Thermal + Cooperative + ?Sized,
    C: Clock + ?Sized,
{
    let start = clock.now();
    loop {
        let (target, current) = reading(machine, heater);
        if (target - current).abs() <= tolerance_c {
            debug!(?heater, target, current, "temperature reached");
            return true;
        }
        if clock.now().saturating_duration_since(start) >= timeout {
            warn!(
                ?heater,
                target,
                current,
                timeout_ms = timeout.as_millis() as u64,
                "temperature wait expired"
            );
            return false;
        }
        machine.idle();
        clock.sleep(poll);
    }
}
