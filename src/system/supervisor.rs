//! Collector lifecycles.
//!
//! Every collector runs in its own task on its own interval. A poll runs on the
//! blocking pool with the collector moved into it and handed back afterwards, so the
//! collector's state is only ever touched by one thread at a time. Failures stay in
//! the collector's own slot as [`CollectorHealth::Degraded`](super::bus::CollectorHealth).

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::bus::{Publish, SnapshotBus};
use super::collector::{
    Collector, CpuCollector, HostCollector, MemoryCollector, NetworkCollector, ProcessCollector,
    ProcessControl, ProcessView,
};
use super::error::StartupError;
use super::rate::DEFAULT_SMOOTHING_ALPHA;
use super::snapshot::Domain;
use super::source::Sources;

#[derive(Debug, Clone, PartialEq)]
pub struct SupervisorOptions {
    pub cpu_interval: Duration,
    pub memory_interval: Duration,
    pub network_interval: Duration,
    pub process_interval: Duration,
    pub host_interval: Duration,
    pub smoothing_alpha: f64,
    /// Upper bound on how long [`Supervisor::shutdown`] waits for all loops.
    pub shutdown_timeout: Duration,
    pub process_view: ProcessView,
}

impl Default for SupervisorOptions {
    fn default() -> Self {
        Self {
            cpu_interval: Duration::from_millis(1000),
            memory_interval: Duration::from_millis(2000),
            network_interval: Duration::from_millis(1000),
            process_interval: Duration::from_millis(2500),
            host_interval: Duration::from_millis(10_000),
            smoothing_alpha: DEFAULT_SMOOTHING_ALPHA,
            shutdown_timeout: Duration::from_millis(1000),
            process_view: ProcessView::default(),
        }
    }
}

impl SupervisorOptions {
    pub fn interval(&self, domain: Domain) -> Duration {
        let interval = match domain {
            Domain::Cpu => self.cpu_interval,
            Domain::Memory => self.memory_interval,
            Domain::Network => self.network_interval,
            Domain::Processes => self.process_interval,
            Domain::Host => self.host_interval,
        };
        // tokio::time::interval panics on a zero period.
        interval.max(Duration::from_millis(1))
    }
}

/// Loops that did not acknowledge shutdown in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    pub abandoned: Vec<Domain>,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.abandoned.is_empty()
    }
}

pub struct Supervisor {
    bus: Arc<SnapshotBus>,
    shutdown: watch::Sender<bool>,
    tasks: Vec<(Domain, JoinHandle<()>)>,
    process_control: ProcessControl,
    shutdown_timeout: Duration,
}

impl Supervisor {
    /// Spawns one loop per collector. Must be called from inside a tokio runtime.
    pub fn start(options: SupervisorOptions, sources: Sources) -> Self {
        let bus = Arc::new(SnapshotBus::new());
        let (shutdown, shutdown_rx) = watch::channel(false);
        let (process_control, view_rx) = ProcessControl::new(options.process_view.clone());
        let alpha = options.smoothing_alpha;

        let mut supervisor = Supervisor {
            bus,
            shutdown,
            tasks: Vec::with_capacity(Domain::ALL.len()),
            process_control,
            shutdown_timeout: options.shutdown_timeout,
        };

        supervisor.spawn(
            CpuCollector::new(sources.cpu, alpha),
            options.interval(Domain::Cpu),
            shutdown_rx.clone(),
        );
        supervisor.spawn(
            MemoryCollector::new(sources.memory),
            options.interval(Domain::Memory),
            shutdown_rx.clone(),
        );
        supervisor.spawn(
            NetworkCollector::new(sources.network, alpha),
            options.interval(Domain::Network),
            shutdown_rx.clone(),
        );
        supervisor.spawn(
            ProcessCollector::new(sources.processes, view_rx, alpha),
            options.interval(Domain::Processes),
            shutdown_rx.clone(),
        );
        supervisor.spawn(
            HostCollector::new(sources.host),
            options.interval(Domain::Host),
            shutdown_rx,
        );

        info!(collectors = supervisor.tasks.len(), alpha, "supervisor started");
        supervisor
    }

    /// [`Supervisor::start`] with OS-backed sources.
    pub fn start_native(options: SupervisorOptions) -> Result<Self, StartupError> {
        let sources = Sources::native()?;
        Ok(Self::start(options, sources))
    }

    fn spawn<C: Collector>(&mut self, collector: C, every: Duration, shutdown: watch::Receiver<bool>) {
        let domain = C::Snapshot::DOMAIN;
        let handle = tokio::spawn(run_collector(
            collector,
            Arc::clone(&self.bus),
            every,
            shutdown,
        ));
        self.tasks.push((domain, handle));
    }

    pub fn bus(&self) -> Arc<SnapshotBus> {
        Arc::clone(&self.bus)
    }

    pub fn process_control(&self) -> ProcessControl {
        self.process_control.clone()
    }

    /// Tells every loop to stop at its next tick boundary. Does not wait.
    pub fn request_shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Signals all loops and waits for them, never longer than the configured
    /// timeout in total. Loops still running at the deadline are aborted.
    pub async fn shutdown(self) -> ShutdownReport {
        self.request_shutdown();
        let deadline = Instant::now() + self.shutdown_timeout;
        let mut report = ShutdownReport::default();

        for (domain, mut handle) in self.tasks {
            match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(())) => debug!(domain = domain.label(), "collector acknowledged shutdown"),
                Ok(Err(err)) => {
                    error!(domain = domain.label(), error = %err, "collector task failed");
                    self.bus.mark_stopped(domain);
                }
                Err(_) => {
                    handle.abort();
                    self.bus.mark_stopped(domain);
                    warn!(
                        domain = domain.label(),
                        timeout_ms = self.shutdown_timeout.as_millis() as u64,
                        "collector did not stop in time, abandoning"
                    );
                    report.abandoned.push(domain);
                }
            }
        }

        info!(abandoned = report.abandoned.len(), "supervisor stopped");
        report
    }
}

async fn run_collector<C: Collector>(
    mut collector: C,
    bus: Arc<SnapshotBus>,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let domain = C::Snapshot::DOMAIN.label();
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    debug!(domain, interval_ms = every.as_millis() as u64, "collector started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
        if *shutdown.borrow() {
            break;
        }

        let polled = tokio::task::spawn_blocking(move || {
            let result = collector.poll();
            (collector, result)
        })
        .await;
        let (returned, result) = match polled {
            Ok(pair) => pair,
            Err(err) => {
                error!(domain, error = %err, "collector poll panicked, stopping loop");
                bus.slot::<C::Snapshot>().mark_stopped();
                return;
            }
        };
        collector = returned;

        match result {
            Ok(snapshot) => {
                if !bus.publish(snapshot) {
                    debug!(domain, "snapshot older than current, dropped");
                }
            }
            Err(err) => {
                let failures = bus.slot::<C::Snapshot>().record_failure(&err);
                warn!(domain, failures, error = %err, "poll failed, keeping previous snapshot");
            }
        }
    }

    bus.slot::<C::Snapshot>().mark_stopped();
    debug!(domain, "collector stopped");
}
