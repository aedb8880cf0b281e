//! Mechanical relay driver for the compressor, heater and (de)humidifier
//! circuits.
//!
//! Generic over [`embedded_hal::digital::OutputPin`] so the same driver runs
//! against an ESP-IDF `PinDriver` on target and a plain mock pin in tests.
//! Most relay boards in this wiring are active-low (coil energised when the
//! input is pulled to ground), so polarity is a constructor argument rather
//! than an assumption.

use embedded_hal::digital::OutputPin;
use log::debug;

pub struct RelayDriver<P: OutputPin> {
    pin: P,
    label: &'static str,
    active_low: bool,
    engaged: bool,
}

impl<P: OutputPin> RelayDriver<P> {
    /// Wrap `pin` and drive it to the released level immediately, so a
    /// relay never starts energised after a reboot mid-run.
    pub fn new(mut pin: P, label: &'static str, active_low: bool) -> Result<Self, P::Error> {
        Self::write(&mut pin, active_low, false)?;
        Ok(Self {
            pin,
            label,
            active_low,
            engaged: false,
        })
    }

    pub fn set(&mut self, engaged: bool) -> Result<(), P::Error> {
        if engaged == self.engaged {
            return Ok(());
        }
        Self::write(&mut self.pin, self.active_low, engaged)?;
        self.engaged = engaged;
        debug!(
            "relay {}: {}",
            self.label,
            if engaged { "engaged" } else { "released" }
        );
        Ok(())
    }

    pub fn release(&mut self) -> Result<(), P::Error> {
        self.set(false)
    }

    pub fn is_engaged(&self) -> bool {
        self.engaged
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    fn write(pin: &mut P, active_low: bool, engaged: bool) -> Result<(), P::Error> {
        if engaged != active_low {
            pin.set_high()
        } else {
            pin.set_low()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;

    /// Records every level written so tests can assert on the wire state.
    struct MockPin {
        high: bool,
        writes: usize,
    }

    impl embedded_hal::digital::ErrorType for MockPin {
        type Error = Infallible;
    }

    impl OutputPin for MockPin {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.high = false;
            self.writes += 1;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            self.high = true;
            self.writes += 1;
            Ok(())
        }
    }

    fn mock() -> MockPin {
        MockPin {
            high: false,
            writes: 0,
        }
    }

    #[test]
    fn active_low_polarity() {
        let mut relay = RelayDriver::new(mock(), "cool", true).unwrap();
        // Released immediately on construction: active-low idle is high.
        assert!(relay.pin.high);

        relay.set(true).unwrap();
        assert!(!relay.pin.high);
        assert!(relay.is_engaged());

        relay.release().unwrap();
        assert!(relay.pin.high);
        assert!(!relay.is_engaged());
    }

    #[test]
    fn active_high_polarity() {
        let mut relay = RelayDriver::new(mock(), "heat", false).unwrap();
        assert!(!relay.pin.high);

        relay.set(true).unwrap();
        assert!(relay.pin.high);
    }

    #[test]
    fn redundant_writes_suppressed() {
        let mut relay = RelayDriver::new(mock(), "dehumidify", true).unwrap();
        let after_init = relay.pin.writes;

        relay.set(true).unwrap();
        relay.set(true).unwrap();
        relay.set(true).unwrap();
        assert_eq!(relay.pin.writes, after_init + 1);
    }
}
