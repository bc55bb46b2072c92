use std::hint::black_box;
use std::sync::Arc;
use std::time::{Duration, Instant};

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use ratatui::Terminal;
use ratatui::backend::TestBackend;
use vitals::app::App;
use vitals::config::Config;
use vitals::system::bus::SnapshotBus;
use vitals::system::collector::{Collector, ProcessCollector, ProcessControl, ProcessView};
use vitals::system::error::CollectError;
use vitals::system::source::fake::FakeSource;
use vitals::system::source::{ProcessReading, ProcessRecord};
use vitals::ui;

fn make_records(n: usize, tick: u64) -> Vec<ProcessRecord> {
    (0..n)
        .map(|i| ProcessRecord {
            pid: i as u32 + 1,
            name: format!("proc_{i}"),
            cpu_time_ms: tick * (i as u64 % 100),
            memory_bytes: ((n - i) as u64 + 1) * 1024,
            status: "Run".to_string(),
            owner: Some(format!("u{}", i % 8)),
            threads: Some(1 + i % 16),
            disk_read_total: tick * 4096,
            disk_written_total: tick * 512,
        })
        .collect()
}

/// A collector whose source reports `n` processes, each scan one second later.
fn make_collector(n: usize, view: ProcessView) -> (ProcessCollector, ProcessControl) {
    let t0 = Instant::now();
    let mut tick = 0u64;
    let source = FakeSource::new(move || -> Result<ProcessReading, CollectError> {
        tick += 1;
        Ok(ProcessReading {
            timestamp: t0 + Duration::from_secs(tick),
            processes: make_records(n, tick),
        })
    });
    let (control, rx) = ProcessControl::new(view);
    (ProcessCollector::new(Box::new(source), rx, 0.3), control)
}

fn bench_process_poll(c: &mut Criterion) {
    let mut group = c.benchmark_group("process_poll_500_1000_2000");

    for size in [500usize, 1000, 2000] {
        let (mut collector, _control) = make_collector(size, ProcessView::default());
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| black_box(collector.poll()))
        });
    }

    group.finish();
}

fn bench_process_poll_filtered(c: &mut Criterion) {
    let mut group = c.benchmark_group("process_poll_filtered_500_1000_2000");
    let view = ProcessView {
        filter: "proc_1".to_string(),
        limit: 0,
        ..ProcessView::default()
    };

    for size in [500usize, 1000, 2000] {
        let (mut collector, _control) = make_collector(size, view.clone());
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| black_box(collector.poll()))
        });
    }

    group.finish();
}

fn bench_dashboard_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("dashboard_render_500_1000_2000");

    for size in [500usize, 1000, 2000] {
        let (mut collector, _) = make_collector(size, ProcessView::default());
        let bus = Arc::new(SnapshotBus::new());
        for _ in 0..2 {
            if let Ok(snapshot) = collector.poll() {
                bus.publish(snapshot);
            }
        }
        let (control, _rx) = ProcessControl::new(ProcessView::default());
        let mut app = App::new(&Config::default(), bus, control);
        app.refresh_data();

        group.bench_with_input(BenchmarkId::from_parameter(size), &app, |b, app| {
            b.iter(|| {
                let backend = TestBackend::new(160, 50);
                let mut terminal = Terminal::new(backend).expect("bench terminal init failed");
                terminal
                    .draw(|frame| ui::draw(frame, black_box(app)))
                    .expect("bench draw failed");
                black_box(terminal.backend());
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_process_poll,
    bench_process_poll_filtered,
    bench_dashboard_render
);
criterion_main!(benches);
