//! Shared mutable context threaded through every FSM handler.
//!
//! `BandContext` is the single struct that state handlers read from and
//! write to for one controlled quantity. It contains the smoothing window,
//! the smoothed value for this tick, band configuration and tuning, the
//! per-actuator run slots, running extrema, and the outboxes (control
//! events, pending learning record) that the service drains after each
//! tick. Think of it as the "blackboard" in a blackboard architecture.

use heapless::Vec;

use crate::app::events::ControlEvent;
use crate::config::{BandConfig, ControlTuning};
use crate::control::window::SampleWindow;

/// Which of a quantity's two actuators a slot refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Drives the value down: cooler, dehumidifier.
    Lower,
    /// Drives the value up: heater, humidifier.
    Raise,
}

// ---------------------------------------------------------------------------
// Run slot (one per actuator)
// ---------------------------------------------------------------------------

/// Bookkeeping for one actuator of a quantity.
#[derive(Debug, Clone, Copy)]
pub struct RunSlot {
    /// Hardware capability flag — `false` means the relay is not fitted
    /// and this side can never engage.
    pub present: bool,
    /// Learned run duration, kept inside `[min_run_secs, max_run_secs]`.
    pub run_secs: f64,
    /// Duration governing the in-flight run: `run_secs` after the
    /// cold-start boost, collapsed to elapsed time on overshoot.
    pub effective_secs: f64,
    /// Monotonic time the actuator switched on; `None` while off.
    pub enabled_at: Option<f64>,
    /// Monotonic time the last run completed. Initialised one full
    /// cooldown in the past so the first trigger is never suppressed.
    pub last_run_at: f64,
    /// Smoothed value at the instant the run began (learning input).
    pub start_value: f64,
}

impl RunSlot {
    fn new(present: bool, run_secs: f64, now_secs: f64, recently_secs: f64) -> Self {
        Self {
            present,
            run_secs,
            effective_secs: run_secs,
            enabled_at: None,
            last_run_at: now_secs - recently_secs,
            start_value: 0.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Pending learning record
// ---------------------------------------------------------------------------

/// A learning record queued by a settle handler, drained and persisted by
/// the service. Keeping persistence out of the handlers keeps them pure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingLearn {
    pub side: Side,
    /// Duration the run actually used (seconds).
    pub run_secs: f64,
    /// Smoothed value when the run began.
    pub start_value: f64,
    /// Extremum the run reached.
    pub achieved: f64,
    /// Band edge the run was aiming for — the store lookup key.
    pub key: f64,
}

// ---------------------------------------------------------------------------
// BandContext
// ---------------------------------------------------------------------------

/// Maximum control events a single tick can emit (run start + run end +
/// learning conclusion never exceeds this).
pub const EVENT_QUEUE_CAP: usize = 4;

/// The shared context passed to every state handler function.
pub struct BandContext {
    /// Quantity label for logs ("temperature" / "humidity").
    pub quantity: &'static str,

    // -- Configuration --
    pub band: BandConfig,
    pub tuning: ControlTuning,

    // -- Smoothing --
    pub window: SampleWindow,
    /// Smoothed mean for this tick. Written by the controller before the
    /// FSM tick; handlers only read it.
    pub value: f64,

    // -- Timing --
    /// Monotonic clock reading for this tick (seconds).
    pub now_secs: f64,

    // -- Actuators --
    pub lower: RunSlot,
    pub raise: RunSlot,

    // -- Extrema since last run start --
    pub extremum_low: f64,
    pub extremum_high: f64,

    // -- Outboxes (drained by the service each tick) --
    pub pending_learn: Option<PendingLearn>,
    pub events: Vec<ControlEvent, EVENT_QUEUE_CAP>,
}

impl BandContext {
    /// `valid_range` bounds physically plausible readings for the
    /// quantity; `now_secs` is the construction-time clock reading used to
    /// back-date the "last run" timestamps.
    pub fn new(
        quantity: &'static str,
        band: BandConfig,
        tuning: ControlTuning,
        valid_range: (f64, f64),
        lower_present: bool,
        raise_present: bool,
        now_secs: f64,
    ) -> Self {
        let recently = tuning.recently_secs;
        let run = tuning.default_run_secs;
        Self {
            quantity,
            band,
            tuning,
            window: SampleWindow::new(tuning.queue_size, valid_range.0, valid_range.1),
            value: 0.0,
            now_secs,
            lower: RunSlot::new(lower_present, run, now_secs, recently),
            raise: RunSlot::new(raise_present, run, now_secs, recently),
            extremum_low: f64::INFINITY,
            extremum_high: f64::NEG_INFINITY,
            pending_learn: None,
            events: Vec::new(),
        }
    }

    /// Fold the current smoothed value into the running extrema.
    /// Called unconditionally every tick, before the FSM update.
    pub fn track_extrema(&mut self) {
        self.extremum_low = self.extremum_low.min(self.value);
        self.extremum_high = self.extremum_high.max(self.value);
    }

    /// True if the given side's actuator completed a run within the
    /// cooldown window. Suppresses re-triggering and opposing-actuator
    /// thrash.
    pub fn ran_recently(&self, side: Side) -> bool {
        let slot = self.slot(side);
        self.now_secs - slot.last_run_at < self.tuning.recently_secs
    }

    /// Seconds the given side's actuator has been running; 0 when off.
    pub fn run_elapsed(&self, side: Side) -> f64 {
        match self.slot(side).enabled_at {
            Some(t) => self.now_secs - t,
            None => 0.0,
        }
    }

    pub fn slot(&self, side: Side) -> &RunSlot {
        match side {
            Side::Lower => &self.lower,
            Side::Raise => &self.raise,
        }
    }

    pub fn slot_mut(&mut self, side: Side) -> &mut RunSlot {
        match side {
            Side::Lower => &mut self.lower,
            Side::Raise => &mut self.raise,
        }
    }

    /// Queue a control event for the service to drain. The queue is sized
    /// for the worst case a tick can produce; an overflow would mean a
    /// handler bug, so it is dropped with a debug assertion.
    pub fn push_event(&mut self, event: ControlEvent) {
        let overflow = self.events.push(event).is_err();
        debug_assert!(!overflow, "control event queue overflow");
    }
}
