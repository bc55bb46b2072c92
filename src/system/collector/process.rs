//! Process table collector.
//!
//! Each pid gets its own estimators on first sight and loses them as soon as a scan
//! no longer reports it. Sorting, filtering and truncation are applied to the
//! entries of the current scan only, using whatever [`ProcessView`] was last
//! requested through [`ProcessControl`].

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{oneshot, watch};
use tracing::{debug, info, warn};

use super::{Collector, busy_rate_to_percent};
use crate::system::error::{CollectError, ProcessError};
use crate::system::kill::{self, TerminateSignal};
use crate::system::rate::RateEstimator;
use crate::system::sample::Sample;
use crate::system::snapshot::{ProcessEntry, ProcessSnapshot, SortKey};
use crate::system::source::{ProcessRecord, ProcessSource};

/// How the renderer wants the table presented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessView {
    pub sort: SortKey,
    pub reverse: bool,
    /// Case-insensitive substring of the name, or an exact pid.
    pub filter: String,
    /// Maximum entries per snapshot; 0 keeps them all.
    pub limit: usize,
}

impl Default for ProcessView {
    fn default() -> Self {
        Self {
            sort: SortKey::Cpu,
            reverse: false,
            filter: String::new(),
            limit: 200,
        }
    }
}

impl ProcessView {
    pub fn matches(&self, entry: &ProcessEntry) -> bool {
        let filter = self.filter.trim();
        if filter.is_empty() {
            return true;
        }
        if let Ok(pid) = filter.parse::<u32>()
            && pid == entry.pid
        {
            return true;
        }
        entry.name.to_lowercase().contains(&filter.to_lowercase())
    }

    /// Filters, orders and truncates one scan's entries.
    pub fn apply(&self, mut entries: Vec<ProcessEntry>) -> Vec<ProcessEntry> {
        entries.retain(|e| self.matches(e));
        entries.sort_by(|a, b| {
            let ord = self.sort.compare(a, b);
            if self.reverse { ord.reverse() } else { ord }
        });
        if self.limit > 0 {
            entries.truncate(self.limit);
        }
        entries
    }
}

struct PidEstimators {
    cpu: RateEstimator,
    disk_read: RateEstimator,
    disk_write: RateEstimator,
}

impl PidEstimators {
    fn new(alpha: f64) -> Self {
        Self {
            cpu: RateEstimator::new(alpha),
            disk_read: RateEstimator::new(alpha),
            disk_write: RateEstimator::new(alpha),
        }
    }
}

pub struct ProcessCollector {
    source: Box<dyn ProcessSource>,
    view: watch::Receiver<ProcessView>,
    alpha: f64,
    estimators: HashMap<u32, PidEstimators>,
}

impl ProcessCollector {
    pub fn new(
        source: Box<dyn ProcessSource>,
        view: watch::Receiver<ProcessView>,
        alpha: f64,
    ) -> Self {
        Self {
            source,
            view,
            alpha,
            estimators: HashMap::new(),
        }
    }

    /// Pids with live rate state.
    pub fn tracked_pids(&self) -> usize {
        self.estimators.len()
    }

    fn entry_for(&mut self, record: ProcessRecord, timestamp: std::time::Instant) -> ProcessEntry {
        let alpha = self.alpha;
        let estimators = self
            .estimators
            .entry(record.pid)
            .or_insert_with(|| PidEstimators::new(alpha));

        let cpu_ms_per_sec = estimators
            .cpu
            .observe(Sample::new(timestamp, record.cpu_time_ms as f64));
        let disk_read_bps = estimators
            .disk_read
            .observe(Sample::new(timestamp, record.disk_read_total as f64));
        let disk_write_bps = estimators
            .disk_write
            .observe(Sample::new(timestamp, record.disk_written_total as f64));

        ProcessEntry {
            pid: record.pid,
            name: record.name,
            cpu_percent: busy_rate_to_percent(cpu_ms_per_sec),
            memory_bytes: record.memory_bytes,
            status: record.status,
            owner: record.owner,
            threads: record.threads,
            disk_read_bps,
            disk_write_bps,
        }
    }
}

impl Collector for ProcessCollector {
    type Snapshot = ProcessSnapshot;

    fn poll(&mut self) -> Result<ProcessSnapshot, CollectError> {
        let reading = self.source.read_processes()?;
        let view = self.view.borrow().clone();

        let mut seen = HashSet::with_capacity(reading.processes.len());
        let mut entries = Vec::with_capacity(reading.processes.len());
        for record in reading.processes {
            if !seen.insert(record.pid) {
                debug!(pid = record.pid, "duplicate pid in scan, keeping first");
                continue;
            }
            entries.push(self.entry_for(record, reading.timestamp));
        }

        let before = self.estimators.len();
        self.estimators.retain(|pid, _| seen.contains(pid));
        let retired = before - self.estimators.len();
        if retired > 0 {
            debug!(retired, "dropped estimators for exited processes");
        }

        let total_count = entries.len();
        Ok(ProcessSnapshot {
            entries: view.apply(entries),
            total_count,
            sort: view.sort,
            reverse: view.reverse,
            timestamp: reading.timestamp,
        })
    }
}

/// Renderer-side handle for the process domain: view requests and termination.
///
/// Requests never touch collector state directly. View changes go through a watch
/// channel read at the top of the next poll; termination runs off the poll loop and
/// answers on its own channel.
#[derive(Clone)]
pub struct ProcessControl {
    view: Arc<watch::Sender<ProcessView>>,
}

impl ProcessControl {
    pub fn new(initial: ProcessView) -> (Self, watch::Receiver<ProcessView>) {
        let (tx, rx) = watch::channel(initial);
        (Self { view: Arc::new(tx) }, rx)
    }

    pub fn view(&self) -> ProcessView {
        self.view.borrow().clone()
    }

    pub fn request_sort(&self, sort: SortKey) {
        self.view.send_modify(|v| v.sort = sort);
    }

    pub fn request_reverse(&self, reverse: bool) {
        self.view.send_modify(|v| v.reverse = reverse);
    }

    pub fn request_filter(&self, filter: &str) {
        self.view.send_modify(|v| v.filter = filter.to_string());
    }

    /// Sends `signal` to `pid` on the blocking pool. Must be called inside a tokio
    /// runtime; the result arrives once on the returned receiver.
    pub fn terminate(
        &self,
        pid: u32,
        signal: TerminateSignal,
    ) -> oneshot::Receiver<Result<(), ProcessError>> {
        let (tx, rx) = oneshot::channel();
        tokio::task::spawn_blocking(move || {
            let result = kill::terminate(pid, signal);
            match &result {
                Ok(()) => info!(pid, ?signal, "signal delivered"),
                Err(err) => warn!(pid, ?signal, error = %err, "terminate failed"),
            }
            let _ = tx.send(result);
        });
        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::source::ProcessReading;
    use crate::system::source::fake::{FakeSource, scripted};
    use std::time::{Duration, Instant};

    fn record(pid: u32, name: &str, cpu_time_ms: u64, memory_bytes: u64) -> ProcessRecord {
        ProcessRecord {
            pid,
            name: name.to_string(),
            cpu_time_ms,
            memory_bytes,
            status: "Run".to_string(),
            owner: Some("root".to_string()),
            threads: None,
            disk_read_total: 0,
            disk_written_total: 0,
        }
    }

    fn reading(at: Instant, processes: Vec<ProcessRecord>) -> ProcessReading {
        ProcessReading {
            timestamp: at,
            processes,
        }
    }

    fn collector_with(
        script: Vec<Result<ProcessReading, CollectError>>,
        view: ProcessView,
    ) -> (ProcessCollector, ProcessControl) {
        let (control, rx) = ProcessControl::new(view);
        (
            ProcessCollector::new(Box::new(scripted(script)), rx, 1.0),
            control,
        )
    }

    #[test]
    fn cpu_percent_from_cumulative_cpu_time() {
        let t0 = Instant::now();
        let (mut collector, _control) = collector_with(
            vec![
                Ok(reading(t0, vec![record(7, "worker", 10_000, 1)])),
                Ok(reading(
                    t0 + Duration::from_secs(2),
                    vec![record(7, "worker", 13_000, 1)],
                )),
            ],
            ProcessView::default(),
        );
        collector.poll().unwrap();
        let snap = collector.poll().unwrap();
        // 3000 ms of cpu over 2 s: one and a half cores.
        assert!((snap.entries[0].cpu_percent - 150.0).abs() < 1e-9);
    }

    #[test]
    fn thread_count_passes_through() {
        let mut threaded = record(7, "worker", 0, 1);
        threaded.threads = Some(12);
        let (mut collector, _control) = collector_with(
            vec![Ok(reading(Instant::now(), vec![threaded, record(8, "sh", 0, 1)]))],
            ProcessView::default(),
        );
        let snap = collector.poll().unwrap();
        let threads = |pid| snap.entries.iter().find(|e| e.pid == pid).unwrap().threads;
        assert_eq!(threads(7), Some(12));
        assert_eq!(threads(8), None);
    }

    #[test]
    fn exited_process_is_dropped_with_its_estimator() {
        let t0 = Instant::now();
        let (mut collector, _control) = collector_with(
            vec![
                Ok(reading(t0, vec![record(1, "init", 0, 1), record(42, "job", 0, 1)])),
                Ok(reading(
                    t0 + Duration::from_secs(1),
                    vec![record(1, "init", 10, 1)],
                )),
            ],
            ProcessView::default(),
        );
        collector.poll().unwrap();
        assert_eq!(collector.tracked_pids(), 2);

        let snap = collector.poll().unwrap();
        assert!(snap.entries.iter().all(|e| e.pid != 42));
        assert_eq!(collector.tracked_pids(), 1);
    }

    #[test]
    fn estimator_map_stays_bounded_across_spawn_exit_cycles() {
        let t0 = Instant::now();
        let mut tick = 0u32;
        let source = FakeSource::new(move || {
            tick += 1;
            // A stable daemon plus a short-lived pid that is new every tick.
            Ok(reading(
                t0 + Duration::from_millis(u64::from(tick) * 100),
                vec![record(1, "daemon", 0, 1), record(1000 + tick, "short", 0, 1)],
            ))
        });
        let (_control, rx) = ProcessControl::new(ProcessView::default());
        let mut collector = ProcessCollector::new(Box::new(source), rx, 0.3);

        for _ in 0..1_000 {
            let snap = collector.poll().unwrap();
            assert_eq!(snap.entries.len(), 2);
            assert!(collector.tracked_pids() <= 2);
        }
    }

    #[test]
    fn duplicate_pids_are_collapsed() {
        let t0 = Instant::now();
        let (mut collector, _control) = collector_with(
            vec![Ok(reading(
                t0,
                vec![record(5, "first", 0, 1), record(5, "second", 0, 1)],
            ))],
            ProcessView::default(),
        );
        let snap = collector.poll().unwrap();
        assert_eq!(snap.entries.len(), 1);
        assert_eq!(snap.entries[0].name, "first");
        assert_eq!(snap.total_count, 1);
    }

    #[test]
    fn sort_request_applies_on_next_poll() {
        let t0 = Instant::now();
        let procs = || {
            vec![
                record(3, "beta", 0, 300),
                record(1, "Gamma", 0, 100),
                record(2, "alpha", 0, 200),
            ]
        };
        let (mut collector, control) = collector_with(
            vec![
                Ok(reading(t0, procs())),
                Ok(reading(t0 + Duration::from_secs(1), procs())),
                Ok(reading(t0 + Duration::from_secs(2), procs())),
            ],
            ProcessView {
                sort: SortKey::Memory,
                ..ProcessView::default()
            },
        );

        let pids = |s: &ProcessSnapshot| s.entries.iter().map(|e| e.pid).collect::<Vec<_>>();
        assert_eq!(pids(&collector.poll().unwrap()), vec![3, 2, 1]);

        control.request_sort(SortKey::Name);
        let snap = collector.poll().unwrap();
        assert_eq!(snap.sort, SortKey::Name);
        assert_eq!(pids(&snap), vec![2, 3, 1]);

        control.request_sort(SortKey::Pid);
        control.request_reverse(true);
        assert_eq!(pids(&collector.poll().unwrap()), vec![3, 2, 1]);
    }

    #[test]
    fn filter_and_limit_do_not_change_total_count() {
        let t0 = Instant::now();
        let (mut collector, control) = collector_with(
            vec![Ok(reading(
                t0,
                vec![
                    record(10, "postgres", 0, 1),
                    record(11, "postgres", 0, 2),
                    record(12, "nginx", 0, 3),
                ],
            ))],
            ProcessView {
                sort: SortKey::Pid,
                limit: 1,
                ..ProcessView::default()
            },
        );
        control.request_filter("POST");
        let snap = collector.poll().unwrap();
        assert_eq!(snap.total_count, 3);
        assert_eq!(snap.entries.len(), 1);
        assert_eq!(snap.entries[0].pid, 10);
    }

    #[test]
    fn filter_matches_exact_pid() {
        let view = ProcessView {
            filter: "12".to_string(),
            ..ProcessView::default()
        };
        let entries = vec![
            ProcessEntry {
                pid: 12,
                name: "nginx".to_string(),
                cpu_percent: 0.0,
                memory_bytes: 0,
                status: String::new(),
                owner: None,
                threads: None,
                disk_read_bps: 0.0,
                disk_write_bps: 0.0,
            },
            ProcessEntry {
                pid: 120,
                name: "bash".to_string(),
                cpu_percent: 0.0,
                memory_bytes: 0,
                status: String::new(),
                owner: None,
                threads: None,
                disk_read_bps: 0.0,
                disk_write_bps: 0.0,
            },
        ];
        let kept = view.apply(entries);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].pid, 12);
    }

    #[tokio::test]
    async fn terminate_missing_pid_leaves_next_snapshot_alone() {
        let t0 = Instant::now();
        let (mut collector, control) = collector_with(
            vec![
                Ok(reading(t0, vec![record(1, "init", 0, 1)])),
                Ok(reading(t0 + Duration::from_secs(1), vec![record(1, "init", 0, 1)])),
            ],
            ProcessView::default(),
        );
        let before = collector.poll().unwrap();

        // Above any kernel pid limit yet a valid pid_t, so kill(2) itself answers ESRCH.
        let missing = i32::MAX as u32;
        let result = control
            .terminate(missing, TerminateSignal::Graceful)
            .await
            .unwrap();
        assert_eq!(result, Err(ProcessError::NotFound(missing)));

        let after = collector.poll().unwrap();
        assert_eq!(before.entries, after.entries);
        assert_eq!(collector.tracked_pids(), 1);
    }
}
