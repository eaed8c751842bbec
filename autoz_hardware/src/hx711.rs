use std::time::Duration;

use autoz_traits::{BoxError, SampleSource};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use tracing::{debug, trace};

use crate::error::{HwError, Result};
use crate::util::{sign_extend_24, wait_until_low_with_timeout};

/// Bits per conversion.
const DATA_BITS: u8 = 24;
/// Extra pulses after the data bits: 1 selects channel A, gain 128.
const GAIN_PULSES: u8 = 1;
/// Clock half-period.
const HALF_PERIOD_US: u32 = 1;
/// Poll interval while waiting for data-ready.
const READY_POLL_US: u32 = 100;

fn gpio<E: core::fmt::Debug>(e: E) -> HwError {
    HwError::Gpio(format!("{e:?}"))
}

/// Bit-banged HX711 over generic `embedded-hal` pins.
pub struct Hx711<SCK, DT, D> {
    sck: SCK,
    dt: DT,
    delay: D,
    ready_timeout: Duration,
}

impl<SCK, DT, D> Hx711<SCK, DT, D>
where
    SCK: OutputPin,
    DT: InputPin,
    D: DelayNs,
{
    /// Takes ownership of already-configured pins. The clock line is driven
    /// low, which also wakes the chip from power-down.
    pub fn new(mut sck: SCK, dt: DT, delay: D, ready_timeout: Duration) -> Result<Self> {
        sck.set_low().map_err(gpio)?;
        Ok(Self {
            sck,
            dt,
            delay,
            ready_timeout,
        })
    }

    pub fn ready_timeout(&self) -> Duration {
        self.ready_timeout
    }

    /// One conversion. A data-ready timeout is not an error: the transfer
    /// runs anyway and returns whatever the chip shifts out.
    pub fn read_raw(&mut self, ready_timeout: Duration) -> Result<i32> {
        let Self { sck, dt, delay, .. } = self;
        match wait_until_low_with_timeout(
            || dt.is_high().map_err(gpio),
            ready_timeout,
            || delay.delay_us(READY_POLL_US),
        ) {
            Ok(()) => {}
            Err(HwError::DataReadyTimeout) => {
                debug!(
                    timeout_ms = ready_timeout.as_millis() as u64,
                    "hx711 not ready, reading anyway"
                );
            }
            Err(e) => return Err(e),
        }

        let raw = critical_section::with(|_cs| transfer(sck, dt, delay))?;
        let value = sign_extend_24(raw);
        trace!(raw = value, "hx711 raw read");
        Ok(value)
    }

    /// Release the pins and delay provider.
    pub fn into_parts(self) -> (SCK, DT, D) {
        (self.sck, self.dt, self.delay)
    }
}

fn transfer<SCK, DT, D>(sck: &mut SCK, dt: &mut DT, delay: &mut D) -> Result<u32>
where
    SCK: OutputPin,
    DT: InputPin,
    D: DelayNs,
{
    let mut raw: u32 = 0;
    for _ in 0..DATA_BITS {
        sck.set_high().map_err(gpio)?;
        delay.delay_us(HALF_PERIOD_US);
        raw <<= 1;
        sck.set_low().map_err(gpio)?;
        delay.delay_us(HALF_PERIOD_US);
        if dt.is_high().map_err(gpio)? {
            raw |= 1;
        }
    }
    for _ in 0..GAIN_PULSES {
        sck.set_high().map_err(gpio)?;
        delay.delay_us(HALF_PERIOD_US);
        sck.set_low().map_err(gpio)?;
        delay.delay_us(HALF_PERIOD_US);
    }
    Ok(raw)
}

impl<SCK, DT, D> SampleSource for Hx711<SCK, DT, D>
where
    SCK: OutputPin,
    DT: InputPin,
    D: DelayNs,
{
    fn read(&mut self, timeout: Duration) -> std::result::Result<i32, BoxError> {
        let t = if timeout.is_zero() {
            self.ready_timeout
        } else {
            timeout
        };
        self.read_raw(t).map_err(|e| Box::new(e) as BoxError)
    }
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod rpi {
    //! Raspberry Pi wiring via `rppal`.
    use std::time::Duration;

    use rppal::gpio::{Gpio, InputPin, OutputPin};
    use rppal::hal::Delay;

    use super::Hx711;
    use crate::error::Result;
    use crate::pins::PinRegistry;

    pub type RpiHx711 = Hx711<OutputPin, InputPin, Delay>;

    /// Configure SCK as output (low) and DT as pulled-up input, then open the
    /// driver. Fails with `PinInUse`, touching no line, when either pin is
    /// already recorded in `registry`.
    pub fn open(
        registry: &mut PinRegistry,
        sck_pin: u8,
        dt_pin: u8,
        ready_timeout: Duration,
    ) -> Result<RpiHx711> {
        registry.ensure_free(&[sck_pin, dt_pin])?;
        let gpio = Gpio::new()?;
        let sck = gpio.get(sck_pin)?.into_output_low();
        let dt = gpio.get(dt_pin)?.into_input_pullup();
        registry.claim(sck_pin);
        registry.claim(dt_pin);
        Hx711::new(sck, dt, Delay::new(), ready_timeout)
    }
}
