//! Outbound application events.
//!
//! State handlers queue [`ControlEvent`]s on their context; the
//! [`ChamberService`](super::service::ChamberService) drains them each
//! tick, tags them with the quantity, and emits them through the
//! [`EventSink`](super::ports::EventSink) port. Adapters on the other
//! side decide what to do with them — log to serial, publish, or collect
//! in a test Vec.

use crate::fsm::context::Side;

/// Events emitted by one quantity's state machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlEvent {
    /// An actuator engaged.
    RunStarted {
        side: Side,
        /// Smoothed value at engagement.
        value: f64,
        /// Duration the run is sized for (after any cold-start boost).
        planned_secs: f64,
    },

    /// An actuator released.
    RunFinished {
        side: Side,
        value: f64,
        elapsed_secs: f64,
        /// The run was cut short by crossing the opposite band edge.
        overshoot: bool,
    },

    /// A settle state concluded and adjusted the learned duration.
    DurationLearned {
        side: Side,
        from_secs: f64,
        to_secs: f64,
        /// Extremum the evaluated run reached.
        achieved: f64,
    },
}

/// Service-level events, tagged with their source quantity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AppEvent {
    /// The service has started (both quantities in Idle).
    Started,

    /// A control event from one quantity's machine.
    Control {
        quantity: &'static str,
        event: ControlEvent,
    },
}
