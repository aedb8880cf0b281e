//! Property tests for the control core's safety invariants.
//!
//! Runs on host (x86_64) only — proptest is not available for ESP32
//! targets. On ESP32, these tests are compiled out.

#![cfg(not(target_os = "espidf"))]

use chamberctl::config::{BandConfig, ControlTuning};
use chamberctl::control::window::MAX_CAPACITY;
use chamberctl::control::{QuantityController, SampleWindow};
use chamberctl::fsm::StateId;
use proptest::prelude::*;

fn controller(band: BandConfig) -> QuantityController {
    let tuning = ControlTuning {
        queue_size: 1,
        ..ControlTuning::default()
    };
    QuantityController::new("temperature", band, tuning, (0.0, 110.0), true, true, 0.0)
}

proptest! {
    /// A quantity has one state machine, so its two actuators can never
    /// be commanded on together — for any reading sequence whatsoever.
    #[test]
    fn actuators_are_mutually_exclusive(
        readings in proptest::collection::vec(0.0f64..110.0, 1..200),
    ) {
        let mut ctl = controller(BandConfig::new(60.0, 2.0));
        let mut now = 0.0;
        for v in readings {
            now += 1.0;
            ctl.add(v);
            ctl.update(now).unwrap();
            prop_assert!(!(ctl.lowering_on() && ctl.raising_on()));
        }
    }

    /// Readings that stay strictly inside the band never wake either
    /// actuator, no matter how long they wander there.
    #[test]
    fn deadband_is_quiet(
        offsets in proptest::collection::vec(-1.9f64..1.9, 1..300),
    ) {
        let mut ctl = controller(BandConfig::new(60.0, 2.0));
        let mut now = 0.0;
        for off in offsets {
            now += 1.0;
            ctl.add(60.0 + off);
            ctl.update(now).unwrap();
            prop_assert_eq!(ctl.state(), StateId::Idle);
        }
    }

    /// The window never exceeds its configured capacity, and its mean
    /// stays inside the extremes of what was accepted.
    #[test]
    fn window_bounds_hold(
        capacity in 1usize..=MAX_CAPACITY,
        samples in proptest::collection::vec(-50.0f64..150.0, 1..500),
    ) {
        let mut window = SampleWindow::new(capacity, 0.0, 110.0);
        let mut accepted: Vec<f64> = Vec::new();
        for s in samples {
            window.push(s);
            if (0.0..=110.0).contains(&s) {
                accepted.push(s);
            }
        }
        prop_assert!(window.len() <= capacity);
        if accepted.is_empty() {
            prop_assert!(window.mean().is_err());
        } else {
            let mean = window.mean().unwrap();
            let lo = accepted.iter().cloned().fold(f64::INFINITY, f64::min);
            let hi = accepted.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            prop_assert!(mean >= lo - 1e-9 && mean <= hi + 1e-9);
        }
    }

    /// Non-finite garbage from a glitching sensor bus is dropped before
    /// it can poison the mean.
    #[test]
    fn non_finite_samples_never_poison_the_mean(
        good in 0.0f64..110.0,
    ) {
        let mut window = SampleWindow::new(8, 0.0, 110.0);
        window.push(good);
        window.push(f64::NAN);
        window.push(f64::INFINITY);
        window.push(f64::NEG_INFINITY);
        let mean = window.mean().unwrap();
        prop_assert!((mean - good).abs() < 1e-9);
    }
}
