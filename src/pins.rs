//! Default GPIO assignments for the chamber controller board.
//!
//! Single source of truth for fallback pin numbers — the real assignments
//! come from [`ChamberConfig`](crate::config::ChamberConfig), which defaults
//! to these. Change a pin here and it propagates everywhere.

/// DHT22 data line (single-wire, open-drain with external pull-up).
pub const DHT22_DATA_GPIO: i32 = 5;

/// Relay channel driving the compressor / cooling circuit.
pub const COOL_RELAY_GPIO: i32 = 17;

/// Relay channel driving the dehumidifier socket.
pub const DEHUMIDIFY_RELAY_GPIO: i32 = 16;
