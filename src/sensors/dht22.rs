//! DHT22 (AM2302) combined temperature / relative-humidity sensor.
//!
//! Single-wire protocol: the host pulls the data line low for >1 ms to
//! request a reading, then the sensor answers with an 80 us low / 80 us
//! high preamble followed by 40 bits (16 humidity, 16 temperature, 8
//! checksum). Bit value is encoded in the length of the high pulse.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: bit-bangs the data GPIO with interrupts masked for the
//! ~5 ms transaction, timing pulses against `esp_timer_get_time`.
//! On host/test: reads from static atomics for injection.

use core::sync::atomic::{AtomicBool, AtomicI16, AtomicU16};
#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::Ordering;

use crate::error::SensorError;

static SIM_HUMIDITY_X10: AtomicU16 = AtomicU16::new(700);
static SIM_TEMP_C_X10: AtomicI16 = AtomicI16::new(155);
static SIM_FAIL: AtomicBool = AtomicBool::new(false);

/// Inject a reading for host builds, in the sensor's native tenths.
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_reading(humidity_x10: u16, temp_c_x10: i16) {
    SIM_HUMIDITY_X10.store(humidity_x10, Ordering::Relaxed);
    SIM_TEMP_C_X10.store(temp_c_x10, Ordering::Relaxed);
}

/// Make subsequent host reads fail with [`SensorError::NoResponse`].
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_failing(failing: bool) {
    SIM_FAIL.store(failing, Ordering::Relaxed);
}

/// One transaction's worth of decoded sensor data, in native units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawReading {
    pub humidity: f64,
    pub temperature_c: f64,
}

pub struct Dht22Sensor {
    data_gpio: i32,
}

impl Dht22Sensor {
    pub fn new(data_gpio: i32) -> Self {
        Self { data_gpio }
    }

    /// Acquire one reading. The datasheet allows at most one transaction
    /// every two seconds; the caller's tick cadence enforces that.
    pub fn read(&mut self) -> Result<RawReading, SensorError> {
        let (humidity_x10, temp_c_x10) = self.read_raw()?;

        let humidity = f64::from(humidity_x10) / 10.0;
        let temperature_c = f64::from(temp_c_x10) / 10.0;
        if !(0.0..=100.0).contains(&humidity) || !(-40.0..=80.0).contains(&temperature_c) {
            return Err(SensorError::OutOfRange);
        }

        Ok(RawReading {
            humidity,
            temperature_c,
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_raw(&mut self) -> Result<(u16, i16), SensorError> {
        let _ = self.data_gpio;
        if SIM_FAIL.load(Ordering::Relaxed) {
            return Err(SensorError::NoResponse);
        }
        Ok((
            SIM_HUMIDITY_X10.load(Ordering::Relaxed),
            SIM_TEMP_C_X10.load(Ordering::Relaxed),
        ))
    }

    #[cfg(target_os = "espidf")]
    fn read_raw(&mut self) -> Result<(u16, i16), SensorError> {
        let bytes = self.transact()?;

        let sum = bytes[0]
            .wrapping_add(bytes[1])
            .wrapping_add(bytes[2])
            .wrapping_add(bytes[3]);
        if sum != bytes[4] {
            return Err(SensorError::ChecksumMismatch);
        }

        let humidity_x10 = u16::from_be_bytes([bytes[0], bytes[1]]);
        // Temperature is sign-magnitude: bit 15 set means below zero.
        let temp_raw = u16::from_be_bytes([bytes[2], bytes[3]]);
        let magnitude = (temp_raw & 0x7FFF) as i16;
        let temp_c_x10 = if temp_raw & 0x8000 != 0 {
            -magnitude
        } else {
            magnitude
        };

        Ok((humidity_x10, temp_c_x10))
    }

    /// Run one bus transaction and return the five raw bytes.
    #[cfg(target_os = "espidf")]
    fn transact(&mut self) -> Result<[u8; 5], SensorError> {
        use esp_idf_svc::sys::*;

        let gpio = self.data_gpio;

        // SAFETY: single-threaded main loop owns this GPIO; raw sys
        // calls mirror the hw_init direction/level helpers.
        unsafe {
            // Host start signal: drive low >1 ms, then release.
            gpio_set_direction(gpio, gpio_mode_t_GPIO_MODE_OUTPUT_OD);
            gpio_set_level(gpio, 0);
            esp_rom_delay_us(1100);
            gpio_set_level(gpio, 1);
            gpio_set_direction(gpio, gpio_mode_t_GPIO_MODE_INPUT);

            // The transaction is timing-critical end to end; keep the
            // scheduler from preempting us mid-pulse.
            vTaskSuspendAll();
            let result = self.transact_quiet(gpio);
            xTaskResumeAll();
            result
        }
    }

    #[cfg(target_os = "espidf")]
    unsafe fn transact_quiet(&mut self, gpio: i32) -> Result<[u8; 5], SensorError> {
        use esp_idf_svc::sys::*;

        unsafe fn wait_for(gpio: i32, want_high: bool, timeout_us: i64) -> Result<i64, SensorError> {
            let start = unsafe { esp_timer_get_time() };
            loop {
                let is_high = unsafe { gpio_get_level(gpio) } != 0;
                if is_high == want_high {
                    return Ok(unsafe { esp_timer_get_time() } - start);
                }
                if unsafe { esp_timer_get_time() } - start > timeout_us {
                    return Err(SensorError::NoResponse);
                }
            }
        }

        // Preamble: sensor pulls low ~80 us then high ~80 us.
        unsafe {
            wait_for(gpio, false, 200)?;
            wait_for(gpio, true, 200)?;
            wait_for(gpio, false, 200)?;
        }

        let mut bytes = [0u8; 5];
        for bit in 0..40 {
            // 50 us low gap, then a high pulse: ~27 us for 0, ~70 us for 1.
            unsafe { wait_for(gpio, true, 200)? };
            let pulse_start = unsafe { esp_timer_get_time() };
            unsafe { wait_for(gpio, false, 200)? };
            let high_us = unsafe { esp_timer_get_time() } - pulse_start;

            if high_us > 48 {
                bytes[bit / 8] |= 0x80 >> (bit % 8);
            }
        }

        Ok(bytes)
    }
}

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;

    // Tests share the sim statics, so run them one at a time.
    static SIM_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

    #[test]
    fn sim_injection_round_trip() {
        let _guard = SIM_LOCK.lock().unwrap();
        sim_set_failing(false);
        sim_set_reading(655, 248);
        let mut sensor = Dht22Sensor::new(5);
        let reading = sensor.read().unwrap();
        assert_eq!(reading.humidity, 65.5);
        assert_eq!(reading.temperature_c, 24.8);
    }

    #[test]
    fn sim_failure_injection() {
        let _guard = SIM_LOCK.lock().unwrap();
        sim_set_failing(true);
        let mut sensor = Dht22Sensor::new(5);
        assert_eq!(sensor.read(), Err(SensorError::NoResponse));
        sim_set_failing(false);
    }

    #[test]
    fn out_of_range_rejected() {
        let _guard = SIM_LOCK.lock().unwrap();
        sim_set_failing(false);
        sim_set_reading(1200, 200);
        let mut sensor = Dht22Sensor::new(5);
        assert_eq!(sensor.read(), Err(SensorError::OutOfRange));
        sim_set_reading(700, 155);
    }
}
