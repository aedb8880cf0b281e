//! Monotonic clock adapter.
//!
//! - **`target_os = "espidf"`** — wraps `esp_timer_get_time()` from the
//!   ESP-IDF high-resolution timer (microsecond precision, monotonic).
//! - **`not(target_os = "espidf")`** — uses `std::time::Instant` for
//!   host-side testing and simulation.

use crate::app::ports::Clock;

pub struct SystemClock {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    #[cfg(target_os = "espidf")]
    fn monotonic_secs(&self) -> f64 {
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as f64 / 1_000_000.0
    }

    #[cfg(not(target_os = "espidf"))]
    fn monotonic_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;

    #[test]
    fn monotonic_never_decreases() {
        let clock = SystemClock::new();
        let a = clock.monotonic_secs();
        let b = clock.monotonic_secs();
        assert!(b >= a);
    }
}
