//! chamberctl firmware — main entry point.
//!
//! Hexagonal architecture: adapters on the outside, the pure control
//! core behind port traits.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Adapters (outer ring)                    │
//! │                                                              │
//! │  HardwareAdapter    LogEventSink   CsvLearnStore  SystemClock│
//! │  (Sensor+Actuator)  (EventSink)    (LearnStore)   (Clock)    │
//! │  CsvTrendLog                                                 │
//! │  (TrendLog)                                                  │
//! │                                                              │
//! │  ─────────────── Port Trait Boundary ──────────────────      │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────┐      │
//! │  │           ChamberService (pure logic)              │      │
//! │  │  temperature FSM · humidity FSM · learning         │      │
//! │  └────────────────────────────────────────────────────┘      │
//! └──────────────────────────────────────────────────────────────┘
//! ```

#![deny(unused_must_use)]

use std::time::Duration;

use anyhow::{Context, Result};
use esp_idf_hal::gpio::{AnyOutputPin, Output, PinDriver};
use log::{error, info, warn};

use chamberctl::adapters::csv_store::CsvLearnStore;
use chamberctl::adapters::hardware::HardwareAdapter;
use chamberctl::adapters::log_sink::LogEventSink;
use chamberctl::adapters::recorder::CsvTrendLog;
use chamberctl::adapters::time::SystemClock;
use chamberctl::app::ports::{ActuatorPort, SensorPort};
use chamberctl::app::service::ChamberService;
use chamberctl::config::ChamberConfig;
use chamberctl::drivers::relay::RelayDriver;
use chamberctl::sensors::dht22::Dht22Sensor;

const CONFIG_PATH: &str = "/spiffs/chamberctl.json";
const STORE_DIR: &str = "/spiffs";
const TREND_PATH: &str = "/spiffs/data.csv";

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init().context("logger init")?;

    info!("chamberctl v{}", env!("CARGO_PKG_VERSION"));

    mount_spiffs().context("SPIFFS mount")?;

    // ── 2. Configuration ──────────────────────────────────────
    let config = match ChamberConfig::load(CONFIG_PATH) {
        Ok(cfg) => {
            info!("config loaded from {CONFIG_PATH}");
            cfg
        }
        Err(e) => {
            warn!("config load failed ({e}), using defaults");
            ChamberConfig::default()
        }
    };

    // ── 3. Hardware ───────────────────────────────────────────
    let sensor = Dht22Sensor::new(config.sensor_pin);
    let mut hw = HardwareAdapter::new(
        sensor,
        relay(config.cool_pin, "cool", config.relays_active_low)?,
        relay(config.heat_pin, "heat", config.relays_active_low)?,
        relay(config.humidify_pin, "humidify", config.relays_active_low)?,
        relay(config.dehumidify_pin, "dehumidify", config.relays_active_low)?,
    );

    // ── 4. Service wiring ─────────────────────────────────────
    let mut store = CsvLearnStore::new(STORE_DIR).context("learning store init")?;
    let mut trend = CsvTrendLog::new(TREND_PATH);
    let mut sink = LogEventSink::new();
    let mut service = ChamberService::new(&config, SystemClock::new(), &mut store)
        .map_err(|e| anyhow::anyhow!("service init: {e}"))?;
    service.start(&mut sink);

    // ── 5. Control loop ───────────────────────────────────────
    let tick_interval = Duration::from_millis(u64::from(config.tick_interval_ms));
    let retry_backoff = Duration::from_millis(u64::from(config.retry_backoff_ms));

    loop {
        let Some(reading) = hw.read() else {
            // Failed reads never enter the window; relays hold their
            // last commanded state while we retry.
            std::thread::sleep(retry_backoff);
            continue;
        };

        if let Err(e) = service.tick(reading, &mut hw, &mut sink, &mut store, &mut trend) {
            // A store write failure costs one observation, not the
            // control loop. Relays were not latched this tick, so
            // re-apply the current commands before sleeping.
            error!("tick failed: {e}");
            hw.apply(service.commands());
        }

        std::thread::sleep(tick_interval);
    }
}

type RelayPin = PinDriver<'static, AnyOutputPin, Output>;

/// Build the relay driver for a fitted channel, `None` if unfitted.
fn relay(gpio: Option<i32>, label: &'static str, active_low: bool) -> Result<Option<RelayDriver<RelayPin>>> {
    let Some(gpio) = gpio else {
        return Ok(None);
    };
    // SAFETY: each GPIO number appears in at most one config slot;
    // validate() rejects duplicates, so ownership is unique.
    let pin = unsafe { AnyOutputPin::new(gpio) };
    let driver = PinDriver::output(pin).with_context(|| format!("relay {label} on GPIO{gpio}"))?;
    RelayDriver::new(driver, label, active_low)
        .map(Some)
        .map_err(|e| anyhow::anyhow!("relay {label}: initial release failed: {e:?}"))
}

/// Register the SPIFFS partition at `/spiffs`, formatting on first boot.
fn mount_spiffs() -> Result<()> {
    use esp_idf_svc::sys::*;

    let base_path = c"/spiffs";
    let conf = esp_vfs_spiffs_conf_t {
        base_path: base_path.as_ptr(),
        partition_label: core::ptr::null(),
        max_files: 5,
        format_if_mount_failed: true,
    };
    // SAFETY: conf and base_path outlive the call; registration copies
    // what it keeps.
    let ret = unsafe { esp_vfs_spiffs_register(&conf) };
    if ret != ESP_OK as i32 {
        anyhow::bail!("esp_vfs_spiffs_register failed (rc={ret})");
    }
    Ok(())
}
