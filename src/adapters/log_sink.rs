//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the logger (UART / USB-CDC in production). A future MQTT or BLE
//! adapter would implement the same trait.

use log::info;

use crate::app::events::{AppEvent, ControlEvent};
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started => {
                info!("START | controller up, all machines Idle");
            }
            AppEvent::Control { quantity, event } => match event {
                ControlEvent::RunStarted {
                    side,
                    value,
                    planned_secs,
                } => {
                    info!(
                        "RUN   | {} {:?}: engaged at {:.2} for {:.1}s",
                        quantity, side, value, planned_secs
                    );
                }
                ControlEvent::RunFinished {
                    side,
                    value,
                    elapsed_secs,
                    overshoot,
                } => {
                    info!(
                        "RUN   | {} {:?}: released at {:.2} after {:.1}s{}",
                        quantity,
                        side,
                        value,
                        elapsed_secs,
                        if *overshoot { " (overshoot)" } else { "" }
                    );
                }
                ControlEvent::DurationLearned {
                    side,
                    from_secs,
                    to_secs,
                    achieved,
                } => {
                    info!(
                        "LEARN | {} {:?}: {:.1}s -> {:.1}s (reached {:.2})",
                        quantity, side, from_secs, to_secs, achieved
                    );
                }
            },
        }
    }
}
