//! System configuration parameters
//!
//! All tunable parameters for the chamber controller. Values are loaded
//! from a JSON file at boot (`/spiffs/chamberctl.json` in production) and
//! fall back to defaults field-by-field, so a partial config file is fine.

use serde::{Deserialize, Serialize};

use crate::control::window::MAX_CAPACITY;
use crate::error::{Error, Result};

/// Target band for one controlled quantity: the acceptable range is
/// `[target - pad, target + pad]`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BandConfig {
    /// Target setpoint (°F for temperature, %RH for humidity).
    pub target: f64,
    /// Deadband half-width.
    pub pad: f64,
}

impl BandConfig {
    pub fn new(target: f64, pad: f64) -> Self {
        Self { target, pad }
    }

    /// Lower band edge: the raising actuator trips at or below this.
    pub fn min(&self) -> f64 {
        self.target - self.pad
    }

    /// Upper band edge: the lowering actuator trips at or above this.
    pub fn max(&self) -> f64 {
        self.target + self.pad
    }
}

/// Control-law and learning tuning. One instance applies to both
/// quantities. Every constant the learner uses lives here by name —
/// nothing is hardcoded inline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlTuning {
    /// Smoothing window capacity (samples).
    pub queue_size: usize,
    /// Run duration used before anything has been learned (seconds).
    pub default_run_secs: f64,
    /// Lower clamp for learned run durations (seconds).
    pub min_run_secs: f64,
    /// Upper clamp for learned run durations (seconds).
    pub max_run_secs: f64,
    /// "Recently ran" suppression window: no actuator for a quantity may
    /// start while either actuator ran within this many seconds.
    pub recently_secs: f64,
    /// Minimum time after a run before a settle state may conclude.
    pub reversal_holdoff_secs: f64,
    /// The smoothed value must move this far back off the run extremum
    /// before the trend counts as reversed.
    pub reversal_margin: f64,
    /// Seconds of correction per unit of target-vs-extremum error.
    pub multiplier: f64,
    /// Starting deviation beyond which the cold-start time boost engages.
    pub boost_deviation: f64,
    /// Damping applied to the boosted duration to avoid overcorrecting.
    pub boost_safety: f64,
    /// Skip persistence of learning records (used by tests / bench rigs).
    pub dry_run: bool,
}

impl Default for ControlTuning {
    fn default() -> Self {
        Self {
            queue_size: 10,
            default_run_secs: 45.0,
            min_run_secs: 5.0,
            max_run_secs: 600.0,
            recently_secs: 300.0,
            reversal_holdoff_secs: 60.0,
            reversal_margin: 0.2,
            multiplier: 3.0,
            boost_deviation: 0.25,
            boost_safety: 0.9,
            dry_run: false,
        }
    }
}

/// Core system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChamberConfig {
    // --- Sensor ---
    /// DHT22 data GPIO.
    pub sensor_pin: i32,

    // --- Relays (None = actuator not fitted) ---
    pub cool_pin: Option<i32>,
    pub heat_pin: Option<i32>,
    pub humidify_pin: Option<i32>,
    pub dehumidify_pin: Option<i32>,
    /// Relay board drives on logic low (common for opto-isolated boards).
    pub relays_active_low: bool,

    // --- Bands ---
    /// Temperature band (°F).
    pub temperature: BandConfig,
    /// Relative humidity band (%RH).
    pub humidity: BandConfig,

    // --- Control / learning tuning ---
    pub tuning: ControlTuning,

    // --- Timing ---
    /// Control loop interval (milliseconds).
    pub tick_interval_ms: u32,
    /// Backoff between retries after a failed sensor read (milliseconds).
    pub retry_backoff_ms: u32,
}

impl Default for ChamberConfig {
    fn default() -> Self {
        Self {
            sensor_pin: crate::pins::DHT22_DATA_GPIO,
            cool_pin: Some(crate::pins::COOL_RELAY_GPIO),
            heat_pin: None,
            humidify_pin: None,
            dehumidify_pin: Some(crate::pins::DEHUMIDIFY_RELAY_GPIO),
            relays_active_low: true,
            temperature: BandConfig::new(60.0, 2.0),
            humidity: BandConfig::new(70.0, 2.0),
            tuning: ControlTuning::default(),
            tick_interval_ms: 1000,
            retry_backoff_ms: 1000,
        }
    }
}

impl ChamberConfig {
    /// Load configuration from a JSON file.
    ///
    /// Missing fields take their defaults; a missing file is an error so a
    /// typo'd path is caught at boot rather than silently running with
    /// defaults.
    pub fn load(path: &str) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {path}: {e}")))?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| Error::Config(format!("cannot parse {path}: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Range-check every field group. Called after deserialisation and
    /// before a runtime config replacement is accepted.
    pub fn validate(&self) -> Result<()> {
        let t = &self.tuning;
        if t.queue_size == 0 || t.queue_size > MAX_CAPACITY {
            return Err(Error::Config(format!(
                "queue_size must be 1..={MAX_CAPACITY}, got {}",
                t.queue_size
            )));
        }
        if t.min_run_secs <= 0.0 || t.min_run_secs > t.max_run_secs {
            return Err(Error::Config(format!(
                "run duration clamp is inverted: min={} max={}",
                t.min_run_secs, t.max_run_secs
            )));
        }
        if t.default_run_secs < t.min_run_secs || t.default_run_secs > t.max_run_secs {
            return Err(Error::Config(format!(
                "default_run_secs {} outside clamp [{}, {}]",
                t.default_run_secs, t.min_run_secs, t.max_run_secs
            )));
        }
        for (name, band) in [("temperature", &self.temperature), ("humidity", &self.humidity)] {
            if band.pad <= 0.0 {
                return Err(Error::Config(format!("{name} pad must be positive")));
            }
        }
        if self.tick_interval_ms == 0 {
            return Err(Error::Config("tick_interval_ms must be non-zero".into()));
        }
        // Each GPIO may drive exactly one thing. Relay construction takes
        // unique ownership of its pin, so duplicates must fail here.
        let mut used: Vec<i32> = vec![self.sensor_pin];
        for pin in [self.cool_pin, self.heat_pin, self.humidify_pin, self.dehumidify_pin]
            .into_iter()
            .flatten()
        {
            if used.contains(&pin) {
                return Err(Error::Config(format!("GPIO{pin} assigned twice")));
            }
            used.push(pin);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_sane() {
        let c = ChamberConfig::default();
        assert!(c.validate().is_ok());
        assert!(c.temperature.min() < c.temperature.max());
        assert!(c.humidity.min() < c.humidity.max());
        assert!(c.tuning.min_run_secs <= c.tuning.default_run_secs);
        assert!(c.tuning.default_run_secs <= c.tuning.max_run_secs);
        assert!(c.tick_interval_ms > 0);
    }

    #[test]
    fn band_edges_derive_from_target_and_pad() {
        let b = BandConfig::new(60.0, 2.0);
        assert_eq!(b.min(), 58.0);
        assert_eq!(b.max(), 62.0);
    }

    #[test]
    fn serde_roundtrip() {
        let c = ChamberConfig::default();
        let json = serde_json::to_string(&c).unwrap();
        let c2: ChamberConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(c.temperature.target, c2.temperature.target);
        assert_eq!(c.cool_pin, c2.cool_pin);
        assert_eq!(c.tuning.queue_size, c2.tuning.queue_size);
    }

    #[test]
    fn partial_json_takes_defaults() {
        let c: ChamberConfig =
            serde_json::from_str(r#"{"temperature": {"target": 34.0, "pad": 1.0}}"#).unwrap();
        assert_eq!(c.temperature.target, 34.0);
        assert_eq!(c.humidity.target, 70.0);
        assert_eq!(c.tuning.multiplier, 3.0);
    }

    #[test]
    fn zero_queue_size_rejected() {
        let mut c = ChamberConfig::default();
        c.tuning.queue_size = 0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn duplicate_gpio_rejected() {
        let mut c = ChamberConfig::default();
        c.heat_pin = c.cool_pin;
        assert!(c.validate().is_err());
    }

    #[test]
    fn inverted_run_clamp_rejected() {
        let mut c = ChamberConfig::default();
        c.tuning.min_run_secs = 100.0;
        c.tuning.max_run_secs = 10.0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn non_positive_pad_rejected() {
        let mut c = ChamberConfig::default();
        c.humidity.pad = 0.0;
        assert!(c.validate().is_err());
    }
}
