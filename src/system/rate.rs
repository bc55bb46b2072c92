//! Rates from cumulative counters.
//!
//! A [`RateEstimator`] differences successive [`Sample`]s of one counter and applies
//! exponential smoothing. It never produces a negative or undefined rate: a counter
//! that goes backwards starts a new baseline, and a timestamp that does not advance
//! holds the previous estimate.

use super::sample::Sample;

pub const DEFAULT_SMOOTHING_ALPHA: f64 = 0.3;

/// What a single observation did to the estimator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Observation {
    /// First sample; stored as the baseline.
    Baseline,
    /// A new smoothed rate, in counter units per second.
    Rate(f64),
    /// The counter went backwards; the sample became the new baseline.
    CounterReset,
    /// Elapsed time was zero or negative; the held rate is reported unchanged.
    ClockAnomaly(f64),
}

impl Observation {
    pub fn rate(self) -> f64 {
        match self {
            Observation::Baseline | Observation::CounterReset => 0.0,
            Observation::Rate(rate) | Observation::ClockAnomaly(rate) => rate,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RateEstimator {
    alpha: f64,
    previous: Option<Sample>,
    smoothed: Option<f64>,
}

impl Default for RateEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_SMOOTHING_ALPHA)
    }
}

impl RateEstimator {
    /// `alpha` is clamped into (0, 1]; 1 disables smoothing.
    pub fn new(alpha: f64) -> Self {
        let alpha = if alpha.is_finite() && alpha > 0.0 {
            alpha.min(1.0)
        } else {
            DEFAULT_SMOOTHING_ALPHA
        };
        Self {
            alpha,
            previous: None,
            smoothed: None,
        }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Current smoothed rate, 0 until two usable samples have been seen.
    pub fn current(&self) -> f64 {
        self.smoothed.unwrap_or(0.0)
    }

    pub fn observe(&mut self, sample: Sample) -> f64 {
        self.observe_detailed(sample).rate()
    }

    pub fn observe_detailed(&mut self, sample: Sample) -> Observation {
        let Some(previous) = self.previous else {
            self.previous = Some(sample);
            return Observation::Baseline;
        };

        let elapsed = match sample.timestamp.checked_duration_since(previous.timestamp) {
            Some(d) if !d.is_zero() => d.as_secs_f64(),
            _ => return Observation::ClockAnomaly(self.current()),
        };

        if sample.value < previous.value {
            self.previous = Some(sample);
            self.smoothed = None;
            return Observation::CounterReset;
        }

        let raw = (sample.value - previous.value) / elapsed;
        let smoothed = match self.smoothed {
            Some(prev) => self.alpha * raw + (1.0 - self.alpha) * prev,
            None => raw,
        };
        self.previous = Some(sample);
        self.smoothed = Some(smoothed);
        Observation::Rate(smoothed)
    }
}
