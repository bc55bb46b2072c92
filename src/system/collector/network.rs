use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::debug;

use super::Collector;
use crate::system::error::CollectError;
use crate::system::rate::RateEstimator;
use crate::system::sample::Sample;
use crate::system::snapshot::{InterfaceRates, NetworkSnapshot};
use crate::system::source::NetworkSource;

struct InterfaceEstimators {
    rx: RateEstimator,
    tx: RateEstimator,
}

pub struct NetworkCollector {
    source: Box<dyn NetworkSource>,
    alpha: f64,
    estimators: HashMap<String, InterfaceEstimators>,
}

impl NetworkCollector {
    pub fn new(source: Box<dyn NetworkSource>, alpha: f64) -> Self {
        Self {
            source,
            alpha,
            estimators: HashMap::new(),
        }
    }

    /// Number of interfaces with live rate state.
    pub fn tracked_interfaces(&self) -> usize {
        self.estimators.len()
    }
}

impl Collector for NetworkCollector {
    type Snapshot = NetworkSnapshot;

    fn poll(&mut self) -> Result<NetworkSnapshot, CollectError> {
        let reading = self.source.read_network()?;
        let mut interfaces = BTreeMap::new();
        let mut seen = HashSet::with_capacity(reading.interfaces.len());

        for counters in reading.interfaces {
            if !seen.insert(counters.name.clone()) {
                continue;
            }
            let alpha = self.alpha;
            let estimators = self
                .estimators
                .entry(counters.name.clone())
                .or_insert_with(|| {
                    debug!(interface = %counters.name, "tracking new interface");
                    InterfaceEstimators {
                        rx: RateEstimator::new(alpha),
                        tx: RateEstimator::new(alpha),
                    }
                });
            let rx_rate_bps = estimators
                .rx
                .observe(Sample::new(reading.timestamp, counters.rx_bytes as f64));
            let tx_rate_bps = estimators
                .tx
                .observe(Sample::new(reading.timestamp, counters.tx_bytes as f64));

            interfaces.insert(
                counters.name,
                InterfaceRates {
                    rx_rate_bps,
                    tx_rate_bps,
                    rx_total_bytes: counters.rx_bytes,
                    tx_total_bytes: counters.tx_bytes,
                    ipv4: counters.ipv4,
                },
            );
        }

        self.estimators.retain(|name, _| {
            let keep = seen.contains(name);
            if !keep {
                debug!(interface = %name, "interface gone, retiring estimators");
            }
            keep
        });

        Ok(NetworkSnapshot {
            interfaces,
            timestamp: reading.timestamp,
        })
    }
}
