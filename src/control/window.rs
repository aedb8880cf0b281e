//! Bounded sample window: the smoothing stage in front of each band
//! controller.
//!
//! A fixed-capacity FIFO that retains the last `capacity` readings and
//! reports their arithmetic mean. Values outside the quantity's physically
//! valid range are dropped at this boundary — a glitched DHT22 frame never
//! reaches the state machine. Backed by a `heapless::Deque`, so steady-state
//! operation allocates nothing.

use heapless::Deque;
use log::debug;

use crate::error::{Error, Result};

/// Hard upper bound on the smoothing window; the runtime capacity from
/// config is clamped to this.
pub const MAX_CAPACITY: usize = 64;

/// FIFO of the most recent valid readings for one quantity.
#[derive(Debug)]
pub struct SampleWindow {
    samples: Deque<f64, MAX_CAPACITY>,
    capacity: usize,
    valid_min: f64,
    valid_max: f64,
}

impl SampleWindow {
    /// `capacity` is clamped to `1..=MAX_CAPACITY`. `valid_min..=valid_max`
    /// is the physically plausible range for the quantity; anything outside
    /// is silently discarded by [`push`](Self::push).
    pub fn new(capacity: usize, valid_min: f64, valid_max: f64) -> Self {
        Self {
            samples: Deque::new(),
            capacity: capacity.clamp(1, MAX_CAPACITY),
            valid_min,
            valid_max,
        }
    }

    /// Append a reading, evicting the oldest when full. Out-of-range and
    /// non-finite values are dropped without queueing.
    pub fn push(&mut self, value: f64) {
        if !value.is_finite() || value < self.valid_min || value > self.valid_max {
            debug!(
                "dropping out-of-range sample {value} (valid {}..={})",
                self.valid_min, self.valid_max
            );
            return;
        }
        if self.samples.len() >= self.capacity {
            let _ = self.samples.pop_front();
        }
        // Cannot fail: capacity <= MAX_CAPACITY and we just made room.
        let _ = self.samples.push_back(value);
    }

    /// Arithmetic mean of the current contents.
    pub fn mean(&self) -> Result<f64> {
        if self.samples.is_empty() {
            return Err(Error::EmptyWindow);
        }
        let sum: f64 = self.samples.iter().sum();
        Ok(sum / self.samples.len() as f64)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
