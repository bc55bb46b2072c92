use std::time::{Duration, Instant};

use proptest::prelude::*;
use vitals::system::rate::{Observation, RateEstimator};
use vitals::system::sample::Sample;

/// Strictly increasing timestamps paired with counter increments.
fn steps() -> impl Strategy<Value = Vec<(u64, u64)>> {
    prop::collection::vec((1u64..5_000, 0u64..10_000_000), 1..64)
}

proptest! {
    #[test]
    fn monotonic_counter_never_yields_negative_rate(
        alpha in 0.01f64..=1.0,
        start in 0u64..1_000_000,
        steps in steps(),
    ) {
        let t0 = Instant::now();
        let mut est = RateEstimator::new(alpha);
        let mut elapsed_ms = 0u64;
        let mut value = start;
        est.observe(Sample::new(t0, value as f64));

        for (dt_ms, delta) in steps {
            elapsed_ms += dt_ms;
            value += delta;
            let rate = est.observe(Sample::new(t0 + Duration::from_millis(elapsed_ms), value as f64));
            prop_assert!(rate.is_finite());
            prop_assert!(rate >= 0.0, "rate {rate} went negative");
        }
    }

    #[test]
    fn smoothed_rate_stays_within_raw_extremes(
        alpha in 0.01f64..=1.0,
        steps in steps(),
    ) {
        let t0 = Instant::now();
        let mut est = RateEstimator::new(alpha);
        est.observe(Sample::new(t0, 0.0));

        let mut elapsed_ms = 0u64;
        let mut value = 0u64;
        let (mut lo, mut hi) = (f64::INFINITY, f64::NEG_INFINITY);
        for (dt_ms, delta) in steps {
            elapsed_ms += dt_ms;
            value += delta;
            let raw = delta as f64 / (dt_ms as f64 / 1000.0);
            lo = lo.min(raw);
            hi = hi.max(raw);
            let rate = est.observe(Sample::new(t0 + Duration::from_millis(elapsed_ms), value as f64));
            let slack = 1e-6 * hi.abs().max(1.0);
            prop_assert!(rate >= lo - slack && rate <= hi + slack, "{rate} outside [{lo}, {hi}]");
        }
    }

    #[test]
    fn constant_counter_settles_at_zero(
        value in 0u64..u64::from(u32::MAX),
        ticks in 2usize..32,
    ) {
        let t0 = Instant::now();
        let mut est = RateEstimator::new(0.5);
        for i in 0..ticks {
            let rate = est.observe(Sample::new(t0 + Duration::from_secs(i as u64), value as f64));
            prop_assert_eq!(rate, 0.0);
        }
    }

    #[test]
    fn counter_going_backwards_reports_zero_not_negative(
        high in 1_000u64..1_000_000,
        drop in 1u64..1_000,
    ) {
        let t0 = Instant::now();
        let mut est = RateEstimator::new(1.0);
        est.observe(Sample::new(t0, 0.0));
        est.observe(Sample::new(t0 + Duration::from_secs(1), high as f64));

        let after_reset = est.observe_detailed(Sample::new(t0 + Duration::from_secs(2), (high - drop) as f64));
        prop_assert_eq!(after_reset, Observation::CounterReset);
        prop_assert_eq!(est.current(), 0.0);
    }

    #[test]
    fn stalled_clock_holds_previous_rate(
        per_sec in 1u64..1_000_000,
        extra in 0u64..1_000_000,
    ) {
        let t0 = Instant::now();
        let t1 = t0 + Duration::from_secs(1);
        let mut est = RateEstimator::new(1.0);
        est.observe(Sample::new(t0, 0.0));
        let held = est.observe(Sample::new(t1, per_sec as f64));

        let stalled = est.observe_detailed(Sample::new(t1, (per_sec + extra) as f64));
        prop_assert_eq!(stalled, Observation::ClockAnomaly(held));
        prop_assert_eq!(est.current(), held);
    }
}
