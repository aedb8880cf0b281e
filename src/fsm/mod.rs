//! Function-pointer finite state machine engine for one controlled
//! quantity.
//!
//! Classic embedded FSM pattern:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  StateTable                                                 │
//! │  ┌──────────────────┬───────────┬──────────┬──────────────┐ │
//! │  │ StateId           │ on_enter  │ on_exit  │ on_update    │ │
//! │  ├──────────────────┼───────────┼──────────┼──────────────┤ │
//! │  │ Idle              │ fn(ctx)   │ fn(ctx)  │ fn→Option<>  │ │
//! │  │ Lowering          │ fn(ctx)   │ fn(ctx)  │ fn→Option<>  │ │
//! │  │ Raising           │ fn(ctx)   │ fn(ctx)  │ fn→Option<>  │ │
//! │  │ SettleAfterLower  │ fn(ctx)   │ fn(ctx)  │ fn→Option<>  │ │
//! │  │ SettleAfterRaise  │ fn(ctx)   │ fn(ctx)  │ fn→Option<>  │ │
//! │  └──────────────────┴───────────┴──────────┴──────────────┘ │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each tick the engine calls `on_update` for the **current** state. If it
//! returns `Some(next_id)`, the engine runs `on_exit` for the current
//! state, then `on_enter` for the next, and updates the current pointer.
//! All functions receive `&mut BandContext` which holds the smoothed
//! value, band configuration, run slots, extrema, and timing. Because the
//! machine is in exactly one state, the two actuators of a quantity can
//! never be commanded on together.

pub mod context;
pub mod states;

use context::BandContext;
use log::info;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Enumeration of all control states for one quantity.
/// Must stay in sync with the table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StateId {
    /// Dead zone — the smoothed value sits inside the band, nothing runs.
    Idle = 0,
    /// The lowering actuator (cooler / dehumidifier) is engaged.
    Lowering = 1,
    /// The raising actuator (heater / humidifier) is engaged.
    Raising = 2,
    /// A lowering run ended; waiting for the trend to reverse upward.
    SettleAfterLower = 3,
    /// A raising run ended; waiting for the trend to reverse downward.
    SettleAfterRaise = 4,
}

impl StateId {
    /// Total number of states — used to size the table array.
    pub const COUNT: usize = 5;

    /// Convert a `u8` index back to `StateId`. Panics on out-of-range in
    /// debug builds; returns `Idle` in release (safe fallback: nothing on).
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Idle,
            1 => Self::Lowering,
            2 => Self::Raising,
            3 => Self::SettleAfterLower,
            4 => Self::SettleAfterRaise,
            _ => {
                debug_assert!(false, "invalid state index: {idx}");
                Self::Idle
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
/// These run exactly once on each state transition.
pub type StateActionFn = fn(&mut BandContext);

/// Signature for the per-tick update handler.
/// Returns `Some(next)` to trigger a transition, or `None` to stay.
pub type StateUpdateFn = fn(&mut BandContext) -> Option<StateId>;

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Static descriptor for a single FSM state.
/// Stored in a fixed-size array — no heap, no `dyn`.
pub struct StateDescriptor {
    pub id: StateId,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_update: StateUpdateFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

/// The finite state machine engine for one quantity.
///
/// Owns the state table (array of [`StateDescriptor`]); the mutable
/// [`BandContext`] is threaded through every handler call.
pub struct Fsm {
    /// Fixed-size table indexed by `StateId as usize`.
    table: [StateDescriptor; StateId::COUNT],
    /// Index of the currently active state.
    current: usize,
    /// Monotonically increasing tick counter (wraps at u64::MAX).
    tick_count: u64,
    /// Tick at which the current state was entered.
    state_entry_tick: u64,
}

impl Fsm {
    /// Construct a new FSM with the given state table, starting in `initial`.
    pub fn new(table: [StateDescriptor; StateId::COUNT], initial: StateId) -> Self {
        Self {
            table,
            current: initial as usize,
            tick_count: 0,
            state_entry_tick: 0,
        }
    }

    /// Run the initial `on_enter` for the starting state.
    /// Call once after construction, before the first `tick()`.
    pub fn start(&mut self, ctx: &mut BandContext) {
        info!(
            "{}: FSM starting in state {}",
            ctx.quantity, self.table[self.current].name
        );
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Advance the FSM by one tick.
    ///
    /// 1. Call `on_update` for the current state.
    /// 2. If it returns `Some(next)`, execute the transition:
    ///    `on_exit(current)` → update pointer → `on_enter(next)`.
    /// 3. Increment tick counter.
    pub fn tick(&mut self, ctx: &mut BandContext) {
        self.tick_count += 1;

        let next = (self.table[self.current].on_update)(ctx);

        if let Some(next_id) = next {
            self.transition(next_id, ctx);
        }
    }

    /// The current state's identity.
    pub fn current_state(&self) -> StateId {
        StateId::from_index(self.current)
    }

    /// How many ticks the FSM has been in the current state.
    pub fn ticks_in_current_state(&self) -> u64 {
        self.tick_count - self.state_entry_tick
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, next_id: StateId, ctx: &mut BandContext) {
        let next_idx = next_id as usize;

        info!(
            "{}: {} -> {} (v={:.2})",
            ctx.quantity, self.table[self.current].name, self.table[next_idx].name, ctx.value
        );

        // Exit current state
        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        // Update pointer and timing
        self.current = next_idx;
        self.state_entry_tick = self.tick_count;

        // Enter new state
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::context::BandContext;
    use super::*;
    use crate::config::{BandConfig, ControlTuning};

    fn make_ctx() -> BandContext {
        let tuning = ControlTuning {
            queue_size: 1,
            ..ControlTuning::default()
        };
        BandContext::new(
            "temperature",
            BandConfig::new(60.0, 2.0),
            tuning,
            (0.0, 110.0),
            true,
            true,
            0.0,
        )
    }

    fn make_fsm() -> Fsm {
        Fsm::new(states::build_state_table(), StateId::Idle)
    }

    fn feed(fsm: &mut Fsm, ctx: &mut BandContext, value: f64, now: f64) {
        ctx.window.push(value);
        ctx.value = ctx.window.mean().unwrap();
        ctx.now_secs = now;
        ctx.track_extrema();
        fsm.tick(ctx);
    }

    #[test]
    fn starts_in_idle() {
        let fsm = make_fsm();
        assert_eq!(fsm.current_state(), StateId::Idle);
    }

    #[test]
    fn tick_increments_counter() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        fsm.start(&mut ctx);
        feed(&mut fsm, &mut ctx, 60.0, 0.0);
        assert_eq!(fsm.ticks_in_current_state(), 1);
        feed(&mut fsm, &mut ctx, 60.0, 1.0);
        assert_eq!(fsm.ticks_in_current_state(), 2);
    }

    #[test]
    fn idle_to_lowering_at_upper_edge() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        fsm.start(&mut ctx);
        feed(&mut fsm, &mut ctx, 62.0, 0.0);
        assert_eq!(fsm.current_state(), StateId::Lowering);
    }

    #[test]
    fn idle_to_raising_at_lower_edge() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        fsm.start(&mut ctx);
        feed(&mut fsm, &mut ctx, 58.0, 0.0);
        assert_eq!(fsm.current_state(), StateId::Raising);
    }

    #[test]
    fn idle_stays_inside_band() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        fsm.start(&mut ctx);
        for (i, v) in [60.0, 61.9, 58.1, 60.5].into_iter().enumerate() {
            feed(&mut fsm, &mut ctx, v, i as f64);
            assert_eq!(fsm.current_state(), StateId::Idle);
        }
    }

    #[test]
    fn missing_actuator_never_engages() {
        let tuning = ControlTuning {
            queue_size: 1,
            ..ControlTuning::default()
        };
        let mut ctx = BandContext::new(
            "temperature",
            BandConfig::new(60.0, 2.0),
            tuning,
            (0.0, 110.0),
            true,  // cooler fitted
            false, // no heater
            0.0,
        );
        let mut fsm = make_fsm();
        fsm.start(&mut ctx);
        feed(&mut fsm, &mut ctx, 55.0, 0.0);
        assert_eq!(fsm.current_state(), StateId::Idle);
    }

    #[test]
    fn lowering_run_ends_at_opposite_edge() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        fsm.start(&mut ctx);
        feed(&mut fsm, &mut ctx, 62.0, 0.0);
        assert_eq!(fsm.current_state(), StateId::Lowering);
        feed(&mut fsm, &mut ctx, 60.0, 1.0);
        assert_eq!(fsm.current_state(), StateId::Lowering);
        feed(&mut fsm, &mut ctx, 58.0, 2.0);
        assert_eq!(fsm.current_state(), StateId::SettleAfterLower);
    }

    #[test]
    fn lowering_run_ends_when_duration_elapses() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        fsm.start(&mut ctx);
        feed(&mut fsm, &mut ctx, 62.0, 0.0);
        let planned = ctx.lower.effective_secs;
        feed(&mut fsm, &mut ctx, 61.0, planned + 1.0);
        assert_eq!(fsm.current_state(), StateId::SettleAfterLower);
    }

    #[test]
    fn settle_waits_for_holdoff_and_reversal() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        fsm.start(&mut ctx);
        feed(&mut fsm, &mut ctx, 62.0, 0.0);
        feed(&mut fsm, &mut ctx, 58.0, 2.0); // overshoot ends run
        assert_eq!(fsm.current_state(), StateId::SettleAfterLower);

        // Reversal present but holdoff not yet elapsed.
        feed(&mut fsm, &mut ctx, 58.5, 10.0);
        assert_eq!(fsm.current_state(), StateId::SettleAfterLower);

        // Holdoff elapsed but value still pinned at the extremum.
        feed(&mut fsm, &mut ctx, 58.0, 100.0);
        assert_eq!(fsm.current_state(), StateId::SettleAfterLower);

        // Both conditions met.
        feed(&mut fsm, &mut ctx, 58.5, 101.0);
        assert_eq!(fsm.current_state(), StateId::Idle);
    }

    #[test]
    fn settle_concludes_with_a_learning_update() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        ctx.tuning.dry_run = false;
        fsm.start(&mut ctx);
        feed(&mut fsm, &mut ctx, 62.0, 0.0);
        feed(&mut fsm, &mut ctx, 57.0, 2.0);
        feed(&mut fsm, &mut ctx, 58.5, 100.0);
        assert_eq!(fsm.current_state(), StateId::Idle);
        let rec = ctx.pending_learn.take().expect("learning record queued");
        assert_eq!(rec.key, 58.0);
        assert_eq!(rec.achieved, 57.0);
        assert_eq!(rec.start_value, 62.0);
    }

    #[test]
    fn state_id_from_index_roundtrip() {
        for i in 0..StateId::COUNT {
            let id = StateId::from_index(i);
            assert_eq!(id as usize, i);
        }
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn state_id_from_invalid_index_returns_idle() {
        let id = StateId::from_index(99);
        assert_eq!(id, StateId::Idle);
    }
}
