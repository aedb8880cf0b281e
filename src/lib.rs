//! chamberctl firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod control;
pub mod error;
pub mod fsm;

mod pins;

// ESP-IDF-only paths inside these are cfg-guarded; the host build gets
// the simulation halves.
pub mod adapters;
pub mod drivers;
pub mod sensors;
