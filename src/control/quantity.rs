//! Per-quantity controller: one FSM plus its blackboard context.
//!
//! `QuantityController` is the unit the service owns twice — once for
//! temperature, once for humidity. A tick is `add(sample)` then
//! `update(now)`; everything else is accessors and the outbox drains.

use heapless::Vec;

use crate::app::events::ControlEvent;
use crate::config::{BandConfig, ControlTuning};
use crate::error::Result;
use crate::fsm::context::{BandContext, PendingLearn, Side, EVENT_QUEUE_CAP};
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, StateId};

pub struct QuantityController {
    fsm: Fsm,
    ctx: BandContext,
}

impl QuantityController {
    /// `valid_range` bounds plausible readings (°F or %RH); `now_secs` is
    /// the clock reading at construction, used to back-date cooldowns so
    /// the first trigger is never suppressed.
    pub fn new(
        quantity: &'static str,
        band: BandConfig,
        tuning: ControlTuning,
        valid_range: (f64, f64),
        lower_present: bool,
        raise_present: bool,
        now_secs: f64,
    ) -> Self {
        let mut ctx = BandContext::new(
            quantity,
            band,
            tuning,
            valid_range,
            lower_present,
            raise_present,
            now_secs,
        );
        let mut fsm = Fsm::new(build_state_table(), StateId::Idle);
        fsm.start(&mut ctx);
        Self { fsm, ctx }
    }

    /// Install a previously-learned run duration (from the learning
    /// store) for one side, clamped to the configured bounds.
    pub fn seed_run_secs(&mut self, side: Side, secs: f64) {
        let clamped = secs.clamp(self.ctx.tuning.min_run_secs, self.ctx.tuning.max_run_secs);
        let slot = self.ctx.slot_mut(side);
        slot.run_secs = clamped;
        slot.effective_secs = clamped;
    }

    /// Enqueue a raw sample. Out-of-range values are dropped inside the
    /// window; the state machine never sees them.
    pub fn add(&mut self, value: f64) {
        self.ctx.window.push(value);
    }

    /// Run one control-law evaluation against the smoothed mean.
    ///
    /// Fails with `EmptyWindow` only if called before any valid sample
    /// was ever added.
    pub fn update(&mut self, now_secs: f64) -> Result<()> {
        let v = self.ctx.window.mean()?;
        self.ctx.value = v;
        self.ctx.now_secs = now_secs;
        self.ctx.track_extrema();
        self.fsm.tick(&mut self.ctx);
        Ok(())
    }

    // ── Actuator outputs ──────────────────────────────────────

    /// Lowering actuator (cooler / dehumidifier) commanded on.
    pub fn lowering_on(&self) -> bool {
        self.fsm.current_state() == StateId::Lowering
    }

    /// Raising actuator (heater / humidifier) commanded on.
    pub fn raising_on(&self) -> bool {
        self.fsm.current_state() == StateId::Raising
    }

    // ── Outboxes ──────────────────────────────────────────────

    /// Take the learning record queued by a settle conclusion, if any.
    pub fn take_pending_learn(&mut self) -> Option<PendingLearn> {
        self.ctx.pending_learn.take()
    }

    /// Drain the control events emitted since the last drain.
    pub fn drain_events(&mut self) -> Vec<ControlEvent, EVENT_QUEUE_CAP> {
        core::mem::take(&mut self.ctx.events)
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> StateId {
        self.fsm.current_state()
    }

    /// Smoothed mean of the current window contents.
    pub fn average(&self) -> Result<f64> {
        self.ctx.window.mean()
    }

    pub fn band(&self) -> BandConfig {
        self.ctx.band
    }

    /// Current learned run duration for one side.
    pub fn run_secs(&self, side: Side) -> f64 {
        self.ctx.slot(side).run_secs
    }

    /// The band edge a given side's runs aim past — also the learning
    /// store lookup key for that side.
    pub fn trigger_key(&self, side: Side) -> f64 {
        match side {
            Side::Lower => self.ctx.band.min(),
            Side::Raise => self.ctx.band.max(),
        }
    }

    /// Replace the band configuration. Derived `min`/`max` follow the new
    /// band immediately; window contents, learned durations, and run
    /// state are retained.
    pub fn set_band(&mut self, band: BandConfig) {
        self.ctx.band = band;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller(queue_size: usize) -> QuantityController {
        let tuning = ControlTuning {
            queue_size,
            dry_run: true,
            ..ControlTuning::default()
        };
        QuantityController::new(
            "temperature",
            BandConfig::new(60.0, 2.0),
            tuning,
            (0.0, 110.0),
            true,
            false,
            0.0,
        )
    }

    #[test]
    fn hysteresis_cycle_reproduces_exactly() {
        // target=60, pad=2 (min=58, max=62), window of 1, cooler only.
        // Feed 60, 61, 62, 60, 58, 58 → off, off, on, on, off, off.
        let mut c = controller(1);
        let expect = [
            (60.0, false),
            (61.0, false),
            (62.0, true),
            (60.0, true),
            (58.0, false),
            (58.0, false),
        ];
        for (i, (value, on)) in expect.into_iter().enumerate() {
            c.add(value);
            c.update(i as f64).unwrap();
            assert_eq!(
                c.lowering_on(),
                on,
                "tick {i}: v={value} expected cooling={on}"
            );
        }
    }

    #[test]
    fn never_both_actuators_on() {
        let tuning = ControlTuning {
            queue_size: 1,
            dry_run: true,
            ..ControlTuning::default()
        };
        let mut c = QuantityController::new(
            "temperature",
            BandConfig::new(60.0, 2.0),
            tuning,
            (0.0, 110.0),
            true,
            true,
            0.0,
        );
        let values = [60.0, 63.0, 70.0, 55.0, 50.0, 58.0, 62.0, 65.0, 40.0, 90.0];
        for (i, v) in values.into_iter().enumerate() {
            c.add(v);
            c.update(i as f64 * 30.0).unwrap();
            assert!(!(c.lowering_on() && c.raising_on()), "tick {i}");
        }
    }

    #[test]
    fn update_before_any_sample_is_empty_window() {
        let mut c = controller(10);
        assert!(c.update(0.0).is_err());
    }

    #[test]
    fn invalid_samples_never_reach_the_machine() {
        let mut c = controller(1);
        c.add(200.0); // above valid range, dropped
        assert!(c.update(0.0).is_err());
        c.add(62.0);
        c.update(1.0).unwrap();
        assert!(c.lowering_on());
    }

    #[test]
    fn seeded_duration_is_clamped() {
        let mut c = controller(1);
        c.seed_run_secs(Side::Lower, 10_000.0);
        assert_eq!(c.run_secs(Side::Lower), 600.0);
        c.seed_run_secs(Side::Lower, 0.5);
        assert_eq!(c.run_secs(Side::Lower), 5.0);
    }

    #[test]
    fn set_band_moves_the_edges_atomically() {
        let mut c = controller(1);
        c.set_band(BandConfig::new(34.0, 1.0));
        assert_eq!(c.band().min(), 33.0);
        assert_eq!(c.band().max(), 35.0);
        assert_eq!(c.trigger_key(Side::Lower), 33.0);
        assert_eq!(c.trigger_key(Side::Raise), 35.0);
        // New edges drive the trigger immediately.
        c.add(35.0);
        c.update(0.0).unwrap();
        assert!(c.lowering_on());
    }

    #[test]
    fn deadband_is_quiet_forever() {
        let mut c = controller(3);
        for i in 0..500 {
            // Strictly inside (58, 62)
            let v = 60.0 + 1.8 * ((i as f64) * 0.7).sin();
            c.add(v);
            c.update(i as f64).unwrap();
            assert_eq!(c.state(), StateId::Idle);
        }
    }
}
