//! Low-level actuator drivers.

pub mod relay;
