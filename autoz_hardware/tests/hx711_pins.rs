use std::cell::RefCell;
use std::convert::Infallible;
use std::rc::Rc;
use std::time::Duration;

use autoz_hardware::error::HwError;
use autoz_hardware::hx711::Hx711;
use autoz_traits::SampleSource;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};

/// Shared wire state between the fake clock and data pins.
#[derive(Default)]
struct Wire {
    /// Bits the fake chip shifts out, MSB first.
    bits: Vec<bool>,
    /// Falling edges seen on SCK.
    falling_edges: usize,
    sck_high: bool,
    /// DT stays high (not ready) for this many polls.
    busy_polls: usize,
}

struct FakeSck(Rc<RefCell<Wire>>);
struct FakeDt(Rc<RefCell<Wire>>);
struct NoDelay;

impl ErrorType for FakeSck {
    type Error = Infallible;
}
impl ErrorType for FakeDt {
    type Error = Infallible;
}

impl OutputPin for FakeSck {
    fn set_low(&mut self) -> Result<(), Infallible> {
        let mut w = self.0.borrow_mut();
        if w.sck_high {
            w.falling_edges += 1;
        }
        w.sck_high = false;
        Ok(())
    }
    fn set_high(&mut self) -> Result<(), Infallible> {
        self.0.borrow_mut().sck_high = true;
        Ok(())
    }
}

impl InputPin for FakeDt {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        let mut w = self.0.borrow_mut();
        if w.falling_edges == 0 && w.busy_polls > 0 {
            w.busy_polls -= 1;
            return Ok(true);
        }
        if w.falling_edges == 0 {
            return Ok(false);
        }
        let idx = w.falling_edges - 1;
        Ok(w.bits.get(idx).copied().unwrap_or(true))
    }
    fn is_low(&mut self) -> Result<bool, Infallible> {
        self.is_high().map(|h| !h)
    }
}

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

fn bits_of(value: u32) -> Vec<bool> {
    (0..24).rev().map(|i| (value >> i) & 1 == 1).collect()
}

fn driver(value: u32, busy_polls: usize) -> (Hx711<FakeSck, FakeDt, NoDelay>, Rc<RefCell<Wire>>) {
    let wire = Rc::new(RefCell::new(Wire {
        bits: bits_of(value),
        busy_polls,
        ..Wire::default()
    }));
    let hx = Hx711::new(
        FakeSck(wire.clone()),
        FakeDt(wire.clone()),
        NoDelay,
        Duration::from_millis(20),
    )
    .expect("open driver");
    (hx, wire)
}

#[test]
fn reads_positive_value_with_one_gain_pulse() {
    let (mut hx, wire) = driver(0x01_2345, 0);
    let v = hx.read(Duration::from_millis(20)).expect("read");
    assert_eq!(v, 0x01_2345);
    // 24 data clocks + 1 gain pulse
    assert_eq!(wire.borrow().falling_edges, 25);
    assert!(!wire.borrow().sck_high, "clock idles low");
}

#[test]
fn sign_extends_negative_reading() {
    let (mut hx, _wire) = driver(0xFF_FFF6, 0);
    assert_eq!(hx.read(Duration::from_millis(20)).expect("read"), -10);
}

#[test]
fn waits_for_data_ready_before_clocking() {
    let (mut hx, wire) = driver(0x00_0042, 5);
    assert_eq!(hx.read(Duration::from_millis(50)).expect("read"), 0x42);
    assert_eq!(wire.borrow().busy_polls, 0);
}

#[test]
fn not_ready_still_transfers() {
    // DT never goes low in time; the transfer proceeds and returns what is on the line.
    let (mut hx, wire) = driver(0x00_0007, usize::MAX);
    let v = hx.read_raw(Duration::from_millis(2)).expect("read proceeds");
    assert_eq!(v, 7);
    assert_eq!(wire.borrow().falling_edges, 25);
}

#[test]
fn zero_timeout_uses_configured_window() {
    let (hx, _wire) = driver(0, 0);
    assert_eq!(hx.ready_timeout(), Duration::from_millis(20));
}

#[test]
fn gpio_error_maps_to_hw_error() {
    struct BrokenSck;
    #[derive(Debug)]
    struct Broken;
    impl embedded_hal::digital::Error for Broken {
        fn kind(&self) -> embedded_hal::digital::ErrorKind {
            embedded_hal::digital::ErrorKind::Other
        }
    }
    impl ErrorType for BrokenSck {
        type Error = Broken;
    }
    impl OutputPin for BrokenSck {
        fn set_low(&mut self) -> Result<(), Broken> {
            Err(Broken)
        }
        fn set_high(&mut self) -> Result<(), Broken> {
            Err(Broken)
        }
    }
    let wire = Rc::new(RefCell::new(Wire::default()));
    let res = Hx711::new(BrokenSck, FakeDt(wire), NoDelay, Duration::from_millis(1));
    assert!(matches!(res, Err(HwError::Gpio(_))));
}
