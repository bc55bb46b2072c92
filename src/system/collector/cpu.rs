use tracing::debug;

use super::{Collector, busy_rate_to_percent};
use crate::system::error::CollectError;
use crate::system::rate::{Observation, RateEstimator};
use crate::system::sample::Sample;
use crate::system::snapshot::{CoreUsage, CpuSnapshot};
use crate::system::source::CpuSource;

pub struct CpuCollector {
    source: Box<dyn CpuSource>,
    alpha: f64,
    /// One estimator per core; the length is fixed by the first successful read.
    estimators: Option<Vec<RateEstimator>>,
}

impl CpuCollector {
    pub fn new(source: Box<dyn CpuSource>, alpha: f64) -> Self {
        Self {
            source,
            alpha,
            estimators: None,
        }
    }
}

impl Collector for CpuCollector {
    type Snapshot = CpuSnapshot;

    fn poll(&mut self) -> Result<CpuSnapshot, CollectError> {
        let reading = self.source.read_cpu()?;
        if reading.cores.is_empty() {
            return Err(CollectError::transient("no cores in cpu reading"));
        }

        let alpha = self.alpha;
        let estimators = self
            .estimators
            .get_or_insert_with(|| vec![RateEstimator::new(alpha); reading.cores.len()]);
        if estimators.len() != reading.cores.len() {
            return Err(CollectError::transient(format!(
                "expected {} cores, read {}",
                estimators.len(),
                reading.cores.len()
            )));
        }

        let per_core: Vec<CoreUsage> = reading
            .cores
            .iter()
            .zip(estimators.iter_mut())
            .enumerate()
            .map(|(core_id, (core, estimator))| {
                let observation =
                    estimator.observe_detailed(Sample::new(reading.timestamp, core.busy_ms as f64));
                if let Observation::ClockAnomaly(_) | Observation::CounterReset = observation {
                    debug!(core_id, ?observation, "cpu counter anomaly");
                }
                CoreUsage {
                    core_id,
                    utilization_percent: busy_rate_to_percent(observation.rate()).clamp(0.0, 100.0),
                    temperature_celsius: core.temperature_celsius,
                }
            })
            .collect();

        let aggregate_utilization_percent =
            per_core.iter().map(|c| c.utilization_percent).sum::<f64>() / per_core.len() as f64;

        Ok(CpuSnapshot {
            per_core,
            aggregate_utilization_percent,
            load_average: reading.load_average,
            frequency_mhz: reading.frequency_mhz,
            timestamp: reading.timestamp,
        })
    }
}
