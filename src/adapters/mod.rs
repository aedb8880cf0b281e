//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements   | Connects to                    |
//! |-------------|--------------|--------------------------------|
//! | `hardware`  | SensorPort   | DHT22 on the data GPIO         |
//! |             | ActuatorPort | relay bank GPIOs               |
//! | `log_sink`  | EventSink    | serial log output              |
//! | `csv_store` | LearnStore   | per-channel calibration CSVs   |
//! | `recorder`  | TrendLog     | per-tick data CSV              |
//! | `time`      | Clock        | platform monotonic timer       |

pub mod csv_store;
pub mod hardware;
pub mod log_sink;
pub mod recorder;
pub mod time;
