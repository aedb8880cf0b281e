//! Application service — the hexagonal core.
//!
//! [`ChamberService`] owns the two quantity controllers (temperature and
//! humidity) and sequences one control tick: enqueue the sample into both
//! windows, update both state machines, drain events, persist learning
//! records, append the trend row, and latch the relays. All I/O flows
//! through port traits, making the entire service testable with mock
//! adapters and a hand-cranked clock.
//!
//! ```text
//!  SensorPort ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!                 │        ChamberService        │ ──▶ LearnStore
//!   Clock ──────▶ │  temperature FSM, humidity   │ ──▶ TrendLog
//!                 │  FSM, learning               │
//!  ActuatorPort ◀─└──────────────────────────────┘
//! ```

use log::info;

use crate::config::ChamberConfig;
use crate::control::QuantityController;
use crate::error::Result;
use crate::fsm::context::Side;
use crate::fsm::StateId;
use crate::sensors::{Reading, HUMIDITY_VALID, TEMPERATURE_VALID_F};

use super::events::AppEvent;
use super::ports::{
    ActuatorPort, Clock, EventSink, LearnChannel, LearnRecord, LearnStore, RelayCommands, TrendLog,
};

// ───────────────────────────────────────────────────────────────
// ChamberService
// ───────────────────────────────────────────────────────────────

/// Orchestrates both quantity controllers over the port boundary.
pub struct ChamberService<C: Clock> {
    clock: C,
    temperature: QuantityController,
    humidity: QuantityController,
    tick_count: u64,
}

impl<C: Clock> ChamberService<C> {
    /// Build the service and seed each fitted actuator's run duration
    /// from the learning store, keyed by its triggering band edge — a
    /// restart resumes from the last persisted calibration instead of
    /// the default.
    pub fn new(config: &ChamberConfig, clock: C, store: &mut impl LearnStore) -> Result<Self> {
        config.validate()?;
        let now = clock.monotonic_secs();

        let mut temperature = QuantityController::new(
            "temperature",
            config.temperature,
            config.tuning,
            TEMPERATURE_VALID_F,
            config.cool_pin.is_some(),
            config.heat_pin.is_some(),
            now,
        );
        let mut humidity = QuantityController::new(
            "humidity",
            config.humidity,
            config.tuning,
            HUMIDITY_VALID,
            config.dehumidify_pin.is_some(),
            config.humidify_pin.is_some(),
            now,
        );

        let default_secs = config.tuning.default_run_secs;
        let mut seed = |controller: &mut QuantityController,
                        side: Side,
                        channel: LearnChannel,
                        fitted: bool|
         -> Result<()> {
            if !fitted {
                return Ok(());
            }
            let key = controller.trigger_key(side);
            let secs = store.load(channel, default_secs, key)?;
            if secs != default_secs {
                info!("{channel:?}: resuming learned run duration {secs:.1}s (key {key:.1})");
            }
            controller.seed_run_secs(side, secs);
            Ok(())
        };
        seed(&mut temperature, Side::Lower, LearnChannel::Cool, config.cool_pin.is_some())?;
        seed(&mut temperature, Side::Raise, LearnChannel::Heat, config.heat_pin.is_some())?;
        seed(&mut humidity, Side::Lower, LearnChannel::Dehumidify, config.dehumidify_pin.is_some())?;
        seed(&mut humidity, Side::Raise, LearnChannel::Humidify, config.humidify_pin.is_some())?;

        Ok(Self {
            clock,
            temperature,
            humidity,
            tick_count: 0,
        })
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Announce startup through the sink.
    pub fn start(&mut self, sink: &mut impl EventSink) {
        sink.emit(&AppEvent::Started);
        info!("ChamberService started");
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one full control cycle for a successfully-acquired reading:
    /// smooth → update both state machines → drain events → persist
    /// learning records → append the trend row → latch relays.
    ///
    /// The two quantity updates are independent; neither observes the
    /// other mid-update, and their order is irrelevant.
    pub fn tick(
        &mut self,
        reading: Reading,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
        store: &mut impl LearnStore,
        trend: &mut impl TrendLog,
    ) -> Result<RelayCommands> {
        self.tick_count += 1;
        let now = self.clock.monotonic_secs();

        // 1. Smooth + state machine update, per quantity.
        self.humidity.add(reading.humidity);
        self.temperature.add(reading.temperature_f);
        self.temperature.update(now)?;
        self.humidity.update(now)?;

        // 2. Drain control events to the sink.
        for event in self.temperature.drain_events() {
            sink.emit(&AppEvent::Control {
                quantity: "temperature",
                event,
            });
        }
        for event in self.humidity.drain_events() {
            sink.emit(&AppEvent::Control {
                quantity: "humidity",
                event,
            });
        }

        // 3. Persist any concluded learning records. Errors propagate —
        // losing calibration silently would corrupt future runs.
        if let Some(p) = self.temperature.take_pending_learn() {
            let channel = match p.side {
                Side::Lower => LearnChannel::Cool,
                Side::Raise => LearnChannel::Heat,
            };
            store.save(channel, &record_from(p))?;
        }
        if let Some(p) = self.humidity.take_pending_learn() {
            let channel = match p.side {
                Side::Lower => LearnChannel::Dehumidify,
                Side::Raise => LearnChannel::Humidify,
            };
            store.save(channel, &record_from(p))?;
        }

        // 4. Trend row for the observational log.
        trend.append(&super::ports::TrendSample {
            temperature_f: reading.temperature_f,
            temperature_avg_f: self.temperature.average()?,
            humidity: reading.humidity,
            humidity_avg: self.humidity.average()?,
        })?;

        // 5. Latch relays.
        let commands = self.commands();
        hw.apply(commands);
        Ok(commands)
    }

    // ── Queries ───────────────────────────────────────────────

    /// Relay states implied by the current machine states. Each quantity
    /// is in exactly one state, so its two relays can never both be set.
    pub fn commands(&self) -> RelayCommands {
        RelayCommands {
            cool: self.temperature.lowering_on(),
            heat: self.temperature.raising_on(),
            dehumidify: self.humidity.lowering_on(),
            humidify: self.humidity.raising_on(),
        }
    }

    pub fn temperature_state(&self) -> StateId {
        self.temperature.state()
    }

    pub fn humidity_state(&self) -> StateId {
        self.humidity.state()
    }

    /// Smoothed temperature (°F); `EmptyWindow` before the first sample.
    pub fn temperature_average_f(&self) -> Result<f64> {
        self.temperature.average()
    }

    /// Smoothed relative humidity (%RH).
    pub fn humidity_average(&self) -> Result<f64> {
        self.humidity.average()
    }

    /// Current learned run duration for a channel (diagnostics, tests).
    pub fn run_secs(&self, channel: LearnChannel) -> f64 {
        match channel {
            LearnChannel::Cool => self.temperature.run_secs(Side::Lower),
            LearnChannel::Heat => self.temperature.run_secs(Side::Raise),
            LearnChannel::Dehumidify => self.humidity.run_secs(Side::Lower),
            LearnChannel::Humidify => self.humidity.run_secs(Side::Raise),
        }
    }

    /// Total control ticks executed since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    // ── Runtime reconfiguration ───────────────────────────────

    /// Replace the band configuration at runtime. Both bands swap
    /// atomically from the tick loop's perspective (this runs between
    /// ticks); derived edges recompute immediately, while window
    /// contents, learned durations, and run state are retained.
    pub fn replace_config(&mut self, config: &ChamberConfig) -> Result<()> {
        config.validate()?;
        self.temperature.set_band(config.temperature);
        self.humidity.set_band(config.humidity);
        info!(
            "configuration replaced: temperature [{:.1}, {:.1}], humidity [{:.1}, {:.1}]",
            config.temperature.min(),
            config.temperature.max(),
            config.humidity.min(),
            config.humidity.max()
        );
        Ok(())
    }
}

fn record_from(p: crate::fsm::context::PendingLearn) -> LearnRecord {
    LearnRecord {
        run_secs: p.run_secs,
        start_value: p.start_value,
        achieved: p.achieved,
        key: p.key,
    }
}
