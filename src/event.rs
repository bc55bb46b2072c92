use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{self, Event as CrosstermEvent, KeyEvent};
use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::{trace, warn};

use crate::system::bus::{CollectorHealth, SnapshotBus};
use crate::system::snapshot::Domain;

#[derive(Clone, Debug)]
pub enum Event {
    Key(KeyEvent),
    /// New terminal size as (columns, rows).
    Resize(u16, u16),
    /// Some domain published or changed health since the previous `Data`.
    Data,
    /// Cadence tick with nothing new on the bus.
    Tick,
}

/// Generation and health per domain as of the last check.
pub struct BusWatch {
    bus: Arc<SnapshotBus>,
    seen: [(u64, CollectorHealth); Domain::ALL.len()],
}

impl BusWatch {
    pub fn new(bus: Arc<SnapshotBus>) -> Self {
        BusWatch {
            bus,
            seen: Default::default(),
        }
    }

    /// True once per batch of bus changes.
    pub fn changed(&mut self) -> bool {
        let mut changed = false;
        for domain in Domain::ALL {
            let now = (self.bus.generation(domain), self.bus.health(domain));
            let seen = &mut self.seen[domain.index()];
            if *seen != now {
                trace!(?domain, generation = now.0, "bus moved");
                *seen = now;
                changed = true;
            }
        }
        changed
    }
}

pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<Event>,
    _task: tokio::task::JoinHandle<()>,
}

impl EventHandler {
    /// Checks the bus every `tick_rate`; the UI only redraws for data when a
    /// collector actually published.
    pub fn new(tick_rate: Duration, bus: Arc<SnapshotBus>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel::<Event>();

        let task = tokio::spawn(async move {
            let mut reader = event::EventStream::new();
            let mut tick_interval = tokio::time::interval(tick_rate);
            let mut watch = BusWatch::new(bus);

            loop {
                let next = tokio::select! {
                    maybe_event = reader.next() => match maybe_event {
                        Some(Ok(CrosstermEvent::Key(key))) => Event::Key(key),
                        Some(Ok(CrosstermEvent::Resize(cols, rows))) => Event::Resize(cols, rows),
                        Some(Ok(_)) => continue,
                        Some(Err(err)) => {
                            warn!(error = %err, "terminal event stream failed");
                            break;
                        }
                        None => break,
                    },
                    _ = tick_interval.tick() => {
                        if watch.changed() { Event::Data } else { Event::Tick }
                    }
                };
                if tx.send(next).is_err() {
                    break;
                }
            }
        });

        Self { rx, _task: task }
    }

    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::error::CollectError;
    use crate::system::snapshot::MemorySnapshot;
    use std::time::Instant;

    fn memory() -> MemorySnapshot {
        MemorySnapshot {
            total_bytes: 100,
            used_bytes: 10,
            available_bytes: 90,
            swap_total_bytes: 0,
            swap_used_bytes: 0,
            timestamp: Instant::now(),
        }
    }

    #[test]
    fn quiet_bus_reports_nothing_new() {
        let mut watch = BusWatch::new(Arc::new(SnapshotBus::new()));
        assert!(!watch.changed());
        assert!(!watch.changed());
    }

    #[test]
    fn each_publish_is_reported_once() {
        let bus = Arc::new(SnapshotBus::new());
        let mut watch = BusWatch::new(Arc::clone(&bus));

        bus.publish(memory());
        assert!(watch.changed());
        assert!(!watch.changed());

        // Two publishes between checks collapse into one redraw.
        bus.publish(memory());
        bus.publish(memory());
        assert!(watch.changed());
        assert!(!watch.changed());
    }

    #[test]
    fn health_change_without_publish_is_reported() {
        let bus = Arc::new(SnapshotBus::new());
        let mut watch = BusWatch::new(Arc::clone(&bus));
        bus.publish(memory());
        assert!(watch.changed());

        bus.slot::<MemorySnapshot>()
            .record_failure(&CollectError::transient("meminfo busy"));
        assert!(watch.changed());
        assert_eq!(bus.generation(Domain::Memory), 1);
        assert!(!watch.changed());
    }
}
