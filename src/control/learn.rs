//! Online learning of actuator run durations.
//!
//! Two pure functions:
//!
//! - [`learn`] — after a run has completed and the trend has reversed,
//!   produce a proportional correction from the gap between the target
//!   band edge and the extremum the run actually reached.
//! - [`time_boost`] — on run entry, rescale the duration when the starting
//!   value is far off its trigger edge (cold start, power loss), where a
//!   normally-calibrated run would undershoot badly.
//!
//! All gains live in [`ControlTuning`](crate::config::ControlTuning);
//! nothing here is a magic number.

/// Outcome of a learning evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LearnOutcome {
    /// Duration that was actually used for the run (persisted as-is).
    pub used_secs: f64,
    /// Signed adjustment in seconds; the caller applies
    /// `next = clamp(used_secs + correction_secs)`.
    pub correction_secs: f64,
}

/// Evaluate the last run and produce the correction for the next one.
///
/// `persist` receives `(used_secs, start_value, actual)` unless `dry_run`.
/// `target` is the band edge the run was aiming for; `actual` the extremum
/// the smoothed value reached. `increasing` is true for an actuator that
/// drives the value up (heater, humidifier); the sign of the correction is
/// arranged so additive application is always right:
///
/// - raising run fell short (`actual < target`) → positive → run longer;
/// - lowering run overshot (`actual < target`) → negative → run shorter.
pub fn learn<F>(
    mut persist: F,
    used_secs: f64,
    start_value: f64,
    target: f64,
    actual: f64,
    multiplier: f64,
    increasing: bool,
    dry_run: bool,
) -> LearnOutcome
where
    F: FnMut(f64, f64, f64),
{
    if !dry_run {
        persist(used_secs, start_value, actual);
    }

    let mut correction = multiplier * (target - actual);
    if !increasing {
        correction = -correction;
    }

    LearnOutcome {
        used_secs,
        correction_secs: correction,
    }
}

/// Rescale a run duration for an oversized starting deviation.
///
/// A learned duration is calibrated to move the value roughly `2 * pad`
/// (from one band edge to the other). When the run starts `deviation`
/// units past its trigger edge, the required change is `2 * pad +
/// deviation`-ish; this approximates it by scaling seconds-per-unit,
/// damped by `boost_safety` so a cold start never slams straight through
/// the far edge. Deviations under `boost_deviation` leave the duration
/// untouched.
pub fn time_boost(
    duration_secs: f64,
    start_value: f64,
    start_threshold: f64,
    pad: f64,
    boost_deviation: f64,
    boost_safety: f64,
) -> f64 {
    let deviation = (start_value - start_threshold).abs();
    if deviation < boost_deviation {
        return duration_secs;
    }
    let secs_per_unit = duration_secs / (pad * 2.0);
    deviation * secs_per_unit * boost_safety
}

#[cfg(test)]
mod tests {
    use super::*;

    const MULT: f64 = 3.0;

    #[test]
    fn lowering_overshoot_shortens_next_run() {
        // Cooling aimed for 58, reached 55 — correction must be negative.
        let out = learn(|_, _, _| {}, 45.0, 62.0, 58.0, 55.0, MULT, false, true);
        assert_eq!(out.used_secs, 45.0);
        assert_eq!(out.correction_secs, -9.0);
    }

    #[test]
    fn lowering_undershoot_lengthens_next_run() {
        // Cooling stopped at 59.5, above the 58 target — run longer.
        let out = learn(|_, _, _| {}, 45.0, 62.0, 58.0, 59.5, MULT, false, true);
        assert!((out.correction_secs - 4.5).abs() < 1e-12);
    }

    #[test]
    fn raising_overshoot_shortens_next_run() {
        // Heating aimed for 62, reached 64 — correction must be negative.
        let out = learn(|_, _, _| {}, 45.0, 58.0, 62.0, 64.0, MULT, true, true);
        assert_eq!(out.correction_secs, -6.0);
    }

    #[test]
    fn persist_called_with_run_facts() {
        let mut seen = None;
        let out = learn(
            |secs, start, actual| seen = Some((secs, start, actual)),
            30.0,
            63.0,
            58.0,
            57.5,
            MULT,
            false,
            false,
        );
        assert_eq!(seen, Some((30.0, 63.0, 57.5)));
        assert_eq!(out.used_secs, 30.0);
    }

    #[test]
    fn dry_run_skips_persist() {
        let mut called = false;
        let _ = learn(|_, _, _| called = true, 30.0, 63.0, 58.0, 57.5, MULT, false, true);
        assert!(!called);
    }

    #[test]
    fn boost_untouched_below_deviation_gate() {
        // Triggered a hair past the edge — normal run, no rescale.
        let d = time_boost(45.0, 62.1, 62.0, 2.0, 0.25, 0.9);
        assert_eq!(d, 45.0);
    }

    #[test]
    fn boost_grows_with_deviation() {
        // Far-out cold start: duration strictly greater, linear in deviation.
        let base = 45.0;
        let d6 = time_boost(base, 68.0, 62.0, 2.0, 0.25, 0.9);
        let d12 = time_boost(base, 74.0, 62.0, 2.0, 0.25, 0.9);
        assert!(d6 > base);
        assert!((d12 / d6 - 2.0).abs() < 1e-9);
        // deviation * (duration / (2 * pad)) * safety
        assert!((d6 - 6.0 * (base / 4.0) * 0.9).abs() < 1e-9);
    }

    #[test]
    fn boost_direction_agnostic() {
        // A raising run starting far below its min edge boosts identically.
        let high = time_boost(40.0, 70.0, 62.0, 2.0, 0.25, 0.9);
        let low = time_boost(40.0, 50.0, 58.0, 2.0, 0.25, 0.9);
        assert_eq!(high, low);
    }
}
