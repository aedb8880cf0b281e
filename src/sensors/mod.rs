//! Sensor subsystem — the DHT22 driver and the reading types the control
//! core consumes.

pub mod dht22;

/// Physically plausible chamber temperature range (°F). The DHT22 itself
/// reads wider, but anything outside this is a glitch for this hardware.
pub const TEMPERATURE_VALID_F: (f64, f64) = (0.0, 110.0);

/// Relative humidity is a percentage by definition.
pub const HUMIDITY_VALID: (f64, f64) = (0.0, 100.0);

/// One successfully acquired sample, converted to the units the
/// controller bands are configured in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    /// Relative humidity (%RH).
    pub humidity: f64,
    /// Temperature (°F — the sensor reports °C; see [`c_to_f`]).
    pub temperature_f: f64,
}

/// Celsius to Fahrenheit.
pub fn c_to_f(value: f64) -> f64 {
    (value * 1.8) + 32.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn c_to_f_known_points() {
        assert_eq!(c_to_f(0.0), 32.0);
        assert_eq!(c_to_f(100.0), 212.0);
        assert!((c_to_f(15.5) - 59.9).abs() < 1e-9);
    }
}
