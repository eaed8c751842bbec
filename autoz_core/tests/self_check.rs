use std::time::Duration;

use autoz_core::config::WINDOW_HALF;
use autoz_core::mocks::SequenceSource;
use autoz_core::self_check::{SelfCheckReport, self_check};
use autoz_traits::Cooperative;

struct Idle(u32);

impl Cooperative for Idle {
    fn idle(&mut self) {
        self.0 += 1;
    }
}

fn check(vals: Vec<i32>) -> SelfCheckReport {
    let mut src = SequenceSource::new(vals);
    let mut idle = Idle(0);
    let r = self_check(&mut src, &mut idle, Duration::from_millis(20), 1.0, 2000.0).unwrap();
    assert_eq!(idle.0, 2 * WINDOW_HALF as u32);
    r
}

#[test]
fn settling_reads_are_discarded() {
    // huge values in the discarded half must not show up in the report
    let mut vals = vec![9_000_000; WINDOW_HALF];
    vals.extend((0..WINDOW_HALF as i32).map(|i| 84_000 + (i % 2) * 300));
    let r = check(vals);
    assert!(r.max < 100_000.0);
}

#[test]
fn alternating_noise_inside_the_band_is_healthy() {
    // a two-step staircase survives the despike with a 300-count spread
    let mut vals = vec![84_000; WINDOW_HALF];
    vals.extend((0..WINDOW_HALF).map(|i| if i < WINDOW_HALF / 2 { 84_000 } else { 84_300 }));
    let r = check(vals);
    assert!((r.spread() - 300.0).abs() < 1e-3, "{r:?}");
    assert!(r.healthy);
}

#[test]
fn flat_idle_signal_is_a_fault() {
    let r = check(vec![84_000; 2 * WINDOW_HALF]);
    assert!(!r.healthy);
    assert_eq!(r.min, 84_000.0);
    assert_eq!(r.avg, 84_000.0);
}

#[test]
fn spread_beyond_the_upper_bound_is_a_fault() {
    let mut vals = vec![84_000; WINDOW_HALF];
    vals.extend((0..WINDOW_HALF).map(|i| if i < WINDOW_HALF / 2 { 84_000 } else { 90_000 }));
    assert!(!check(vals).healthy);
}
