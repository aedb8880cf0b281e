//! Concrete state handler functions and table builder.
//!
//! Each state is defined by plain `fn` pointers — no closures, no dynamic
//! dispatch, no heap. Temperature and humidity each run one instance of
//! this machine; the handlers are symmetric over [`Side`].
//!
//! ```text
//!            ┌──[v >= max, cooldowns clear]──▶ LOWERING
//!            │                                    │
//!          IDLE                      [elapsed or v <= min]
//!            ▲                                    ▼
//!            ├──[holdoff + reversal, learn]── SETTLE_AFTER_LOWER
//!            │
//!            ├──[v <= min, cooldowns clear]──▶ RAISING
//!            │                                    │
//!            │                       [elapsed or v >= max]
//!            ▲                                    ▼
//!            └──[holdoff + reversal, learn]── SETTLE_AFTER_RAISE
//! ```
//!
//! The settle states block until the trend demonstrably reverses; there is
//! no timeout. Concluding a learning update from an unconfirmed extremum
//! would feed the learner garbage, so a stalled sensor parks the quantity
//! here with the actuator off.

use log::info;

use super::context::{BandContext, PendingLearn, Side};
use super::{StateDescriptor, StateId};
use crate::app::events::ControlEvent;
use crate::control::learn::{learn, time_boost};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table. Called once per quantity at startup.
pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        // Index 0 — Idle
        StateDescriptor {
            id: StateId::Idle,
            name: "Idle",
            on_enter: None,
            on_exit: None,
            on_update: idle_update,
        },
        // Index 1 — Lowering
        StateDescriptor {
            id: StateId::Lowering,
            name: "Lowering",
            on_enter: Some(lowering_enter),
            on_exit: None,
            on_update: lowering_update,
        },
        // Index 2 — Raising
        StateDescriptor {
            id: StateId::Raising,
            name: "Raising",
            on_enter: Some(raising_enter),
            on_exit: None,
            on_update: raising_update,
        },
        // Index 3 — SettleAfterLower
        StateDescriptor {
            id: StateId::SettleAfterLower,
            name: "SettleAfterLower",
            on_enter: None,
            on_exit: None,
            on_update: settle_after_lower_update,
        },
        // Index 4 — SettleAfterRaise
        StateDescriptor {
            id: StateId::SettleAfterRaise,
            name: "SettleAfterRaise",
            on_enter: None,
            on_exit: None,
            on_update: settle_after_raise_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  IDLE state — the dead zone
// ═══════════════════════════════════════════════════════════════════════════

fn idle_update(ctx: &mut BandContext) -> Option<StateId> {
    // Cooldown guard: neither actuator may start while either ran
    // recently. This is what stops the cooler and heater trading blows
    // when the value hovers around one edge.
    if ctx.ran_recently(Side::Lower) || ctx.ran_recently(Side::Raise) {
        return None;
    }

    // Band edges are inclusive triggers.
    if ctx.lower.present && ctx.value >= ctx.band.max() {
        return Some(StateId::Lowering);
    }
    if ctx.raise.present && ctx.value <= ctx.band.min() {
        return Some(StateId::Raising);
    }

    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  RUNNING states
// ═══════════════════════════════════════════════════════════════════════════

fn lowering_enter(ctx: &mut BandContext) {
    begin_run(ctx, Side::Lower);
}

fn raising_enter(ctx: &mut BandContext) {
    begin_run(ctx, Side::Raise);
}

fn lowering_update(ctx: &mut BandContext) -> Option<StateId> {
    run_update(ctx, Side::Lower)
}

fn raising_update(ctx: &mut BandContext) -> Option<StateId> {
    run_update(ctx, Side::Raise)
}

/// Start a run: record the starting value, reset the extrema baseline,
/// stamp the clock, and size the run — boosted when the start is far
/// outside the band (cold start / power loss).
fn begin_run(ctx: &mut BandContext, side: Side) {
    let v = ctx.value;
    let now = ctx.now_secs;
    let pad = ctx.band.pad;
    let threshold = match side {
        Side::Lower => ctx.band.max(),
        Side::Raise => ctx.band.min(),
    };
    let tuning = ctx.tuning;

    ctx.extremum_low = v;
    ctx.extremum_high = v;

    let slot = ctx.slot_mut(side);
    slot.start_value = v;
    slot.enabled_at = Some(now);
    slot.effective_secs = time_boost(
        slot.run_secs,
        v,
        threshold,
        pad,
        tuning.boost_deviation,
        tuning.boost_safety,
    );

    let planned = slot.effective_secs;
    info!(
        "{}: {:?} run started, v={:.2}, planned {:.1}s",
        ctx.quantity, side, v, planned
    );
    ctx.push_event(ControlEvent::RunStarted {
        side,
        value: v,
        planned_secs: planned,
    });
}

/// A run ends when its duration elapses or the smoothed value crosses the
/// opposite band edge (over-correction). Overshoot collapses the effective
/// duration to the time actually spent, so the learning step sees what
/// really happened rather than what was planned.
fn run_update(ctx: &mut BandContext, side: Side) -> Option<StateId> {
    let elapsed = ctx.run_elapsed(side);
    let overshoot = match side {
        Side::Lower => ctx.value <= ctx.band.min(),
        Side::Raise => ctx.value >= ctx.band.max(),
    };
    if elapsed < ctx.slot(side).effective_secs && !overshoot {
        return None;
    }

    let v = ctx.value;
    let now = ctx.now_secs;
    let slot = ctx.slot_mut(side);
    if overshoot {
        slot.effective_secs = elapsed;
    }
    slot.enabled_at = None;
    slot.last_run_at = now;

    info!(
        "{}: {:?} run finished after {:.1}s, v={:.2}{}",
        ctx.quantity,
        side,
        elapsed,
        v,
        if overshoot { " (overshoot)" } else { "" }
    );
    ctx.push_event(ControlEvent::RunFinished {
        side,
        value: v,
        elapsed_secs: elapsed,
        overshoot,
    });

    Some(match side {
        Side::Lower => StateId::SettleAfterLower,
        Side::Raise => StateId::SettleAfterRaise,
    })
}

// ═══════════════════════════════════════════════════════════════════════════
//  SETTLE states — wait for the trend to reverse, then learn
// ═══════════════════════════════════════════════════════════════════════════

fn settle_after_lower_update(ctx: &mut BandContext) -> Option<StateId> {
    settle_update(ctx, Side::Lower)
}

fn settle_after_raise_update(ctx: &mut BandContext) -> Option<StateId> {
    settle_update(ctx, Side::Raise)
}

/// Conclude a run once BOTH hold: the post-run holdoff has elapsed, and
/// the smoothed value has moved a hysteresis margin back off the run's
/// extremum. Only then is the extremum trustworthy as "how far the run
/// actually pushed", and the learning update fires.
fn settle_update(ctx: &mut BandContext, side: Side) -> Option<StateId> {
    let tuning = ctx.tuning;

    if ctx.now_secs - ctx.slot(side).last_run_at < tuning.reversal_holdoff_secs {
        return None;
    }

    let (extremum, reversed, target, increasing) = match side {
        Side::Lower => (
            ctx.extremum_low,
            ctx.value >= ctx.extremum_low + tuning.reversal_margin,
            ctx.band.min(),
            false,
        ),
        Side::Raise => (
            ctx.extremum_high,
            ctx.value <= ctx.extremum_high - tuning.reversal_margin,
            ctx.band.max(),
            true,
        ),
    };
    if !reversed {
        return None;
    }

    let slot = *ctx.slot(side);
    let mut queued = None;
    let outcome = learn(
        |run_secs, start_value, achieved| {
            queued = Some(PendingLearn {
                side,
                run_secs,
                start_value,
                achieved,
                key: target,
            });
        },
        slot.effective_secs,
        slot.start_value,
        target,
        extremum,
        tuning.multiplier,
        increasing,
        tuning.dry_run,
    );
    ctx.pending_learn = queued;

    let next = (outcome.used_secs + outcome.correction_secs)
        .clamp(tuning.min_run_secs, tuning.max_run_secs);
    let prev = ctx.slot(side).run_secs;
    ctx.slot_mut(side).run_secs = next;

    info!(
        "{}: {:?} learned {:.1}s -> {:.1}s (target {:.1}, reached {:.2})",
        ctx.quantity, side, prev, next, target, extremum
    );
    ctx.push_event(ControlEvent::DurationLearned {
        side,
        from_secs: prev,
        to_secs: next,
        achieved: extremum,
    });

    Some(StateId::Idle)
}
