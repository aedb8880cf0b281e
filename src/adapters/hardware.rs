//! Hardware adapter — bridges real peripherals to domain port traits.
//!
//! Owns the DHT22 driver and the relay bank, exposing them through
//! [`SensorPort`] and [`ActuatorPort`]. This is the only module in the
//! system that touches actual hardware. Generic over the pin type so the
//! same adapter wraps ESP-IDF `PinDriver`s on target and mock pins on
//! the host.
//!
//! Relays for unfitted actuators are simply `None`; commands addressed
//! to them are ignored.

use embedded_hal::digital::OutputPin;
use log::warn;

use crate::app::ports::{ActuatorPort, RelayCommands, SensorPort};
use crate::drivers::relay::RelayDriver;
use crate::sensors::dht22::Dht22Sensor;
use crate::sensors::{c_to_f, Reading};

pub struct HardwareAdapter<P: OutputPin> {
    sensor: Dht22Sensor,
    cool: Option<RelayDriver<P>>,
    heat: Option<RelayDriver<P>>,
    humidify: Option<RelayDriver<P>>,
    dehumidify: Option<RelayDriver<P>>,
}

impl<P: OutputPin> HardwareAdapter<P> {
    pub fn new(
        sensor: Dht22Sensor,
        cool: Option<RelayDriver<P>>,
        heat: Option<RelayDriver<P>>,
        humidify: Option<RelayDriver<P>>,
        dehumidify: Option<RelayDriver<P>>,
    ) -> Self {
        Self {
            sensor,
            cool,
            heat,
            humidify,
            dehumidify,
        }
    }

    fn set_relay(relay: &mut Option<RelayDriver<P>>, engaged: bool) {
        if let Some(relay) = relay {
            if let Err(e) = relay.set(engaged) {
                warn!("relay {}: pin write failed: {:?}", relay.label(), e);
            }
        }
    }
}

impl<P: OutputPin> SensorPort for HardwareAdapter<P> {
    fn read(&mut self) -> Option<Reading> {
        match self.sensor.read() {
            Ok(raw) => Some(Reading {
                humidity: raw.humidity,
                temperature_f: c_to_f(raw.temperature_c),
            }),
            Err(e) => {
                warn!("DHT22 read failed: {}", e);
                None
            }
        }
    }
}

impl<P: OutputPin> ActuatorPort for HardwareAdapter<P> {
    fn apply(&mut self, commands: RelayCommands) {
        Self::set_relay(&mut self.cool, commands.cool);
        Self::set_relay(&mut self.heat, commands.heat);
        Self::set_relay(&mut self.humidify, commands.humidify);
        Self::set_relay(&mut self.dehumidify, commands.dehumidify);
    }

    fn all_off(&mut self) {
        self.apply(RelayCommands::all_off());
    }
}

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;
    use core::convert::Infallible;

    struct TestPin {
        high: bool,
    }

    impl embedded_hal::digital::ErrorType for TestPin {
        type Error = Infallible;
    }

    impl OutputPin for TestPin {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.high = false;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            self.high = true;
            Ok(())
        }
    }

    fn relay(label: &'static str) -> RelayDriver<TestPin> {
        RelayDriver::new(TestPin { high: false }, label, true).unwrap()
    }

    #[test]
    fn commands_reach_fitted_relays_only() {
        let mut hw = HardwareAdapter::new(
            Dht22Sensor::new(5),
            Some(relay("cool")),
            None,
            None,
            Some(relay("dehumidify")),
        );

        hw.apply(RelayCommands {
            cool: true,
            heat: true,
            humidify: false,
            dehumidify: true,
        });
        assert!(hw.cool.as_ref().unwrap().is_engaged());
        assert!(hw.dehumidify.as_ref().unwrap().is_engaged());
        assert!(hw.heat.is_none());

        hw.all_off();
        assert!(!hw.cool.as_ref().unwrap().is_engaged());
        assert!(!hw.dehumidify.as_ref().unwrap().is_engaged());
    }
}
