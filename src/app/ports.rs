//! Port traits — the hexagonal boundary between the control core and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ChamberService (domain)
//! ```
//!
//! Driven adapters (sensor, relays, event sinks, the learning store, the
//! trend log, the clock) implement these traits. The
//! [`ChamberService`](super::service::ChamberService) consumes them via
//! generics, so the domain core never touches hardware or the filesystem
//! directly — and tests drive the whole control loop with mocks and a
//! hand-cranked clock.

use crate::error::Result;
use crate::sensors::Reading;

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: one DHT22 poll.
///
/// `None` signals a failed read (no response, bad checksum). The caller
/// retries with backoff; a failed read is never fed into the core.
pub trait SensorPort {
    fn read(&mut self) -> Option<Reading>;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Relay states requested for this tick. `true` = engage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayCommands {
    pub cool: bool,
    pub heat: bool,
    pub humidify: bool,
    pub dehumidify: bool,
}

impl RelayCommands {
    /// All relays released — safe default.
    pub fn all_off() -> Self {
        Self::default()
    }
}

/// Write-side port: the domain calls this to command the relay bank.
pub trait ActuatorPort {
    /// Latch every relay to the commanded state.
    fn apply(&mut self, commands: RelayCommands);

    /// Release all relays — safe shutdown.
    fn all_off(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port. Adapters decide where they go (serial log, MQTT,
/// a test Vec, etc.).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic time source. Production wraps the platform timer; tests use
/// a manually-advanced stub so run durations and cooldowns are exact.
pub trait Clock {
    /// Seconds since an arbitrary epoch. Must never go backwards.
    fn monotonic_secs(&self) -> f64;
}

// ───────────────────────────────────────────────────────────────
// Learning store port (driven adapter: domain ↔ persisted calibration)
// ───────────────────────────────────────────────────────────────

/// One persisted calibration channel — an actuator whose run duration is
/// learned and recorded independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LearnChannel {
    Cool,
    Heat,
    Humidify,
    Dehumidify,
}

/// One learning observation: what was run, from where, and what it
/// achieved. The adapter adds the timestamp on write.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LearnRecord {
    /// Run duration that produced this observation (seconds).
    pub run_secs: f64,
    /// Smoothed value when the run began.
    pub start_value: f64,
    /// Extremum the run reached.
    pub achieved: f64,
    /// Band edge the run aimed for — the lookup key.
    pub key: f64,
}

/// Append-only calibration history.
///
/// Failures propagate: silently losing calibration data corrupts future
/// runs, so neither side of this port swallows I/O errors.
pub trait LearnStore {
    /// Most recent persisted duration whose key matches `key`, else
    /// `default_secs`.
    fn load(&mut self, channel: LearnChannel, default_secs: f64, key: f64) -> Result<f64>;

    /// Append one record to the channel's history.
    fn save(&mut self, channel: LearnChannel, record: &LearnRecord) -> Result<()>;
}

// ───────────────────────────────────────────────────────────────
// Trend log port (driven adapter: domain → per-tick data file)
// ───────────────────────────────────────────────────────────────

/// One row of the per-tick trend log.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendSample {
    pub temperature_f: f64,
    pub temperature_avg_f: f64,
    pub humidity: f64,
    pub humidity_avg: f64,
}

/// Per-tick observational record (`data.csv` in production).
pub trait TrendLog {
    fn append(&mut self, sample: &TrendSample) -> Result<()>;
}
