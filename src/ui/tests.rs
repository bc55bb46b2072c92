use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use ratatui::Terminal;
use ratatui::backend::TestBackend;
use ratatui::layout::Rect;

use crate::app::{App, InputMode};
use crate::config::Config;
use crate::system::bus::SnapshotBus;
use crate::system::collector::{ProcessControl, ProcessView};
use crate::system::error::CollectError;
use crate::system::snapshot::{
    CoreUsage, CpuSnapshot, DiskUsage, Domain, HostSnapshot, InterfaceRates, MemorySnapshot,
    NetworkSnapshot, ProcessEntry, ProcessSnapshot, SortKey,
};
use crate::ui::theme::Theme;
use crate::ui::{cpu, header, memory, network, process_table, statusbar};

fn buffer_to_string(buf: &ratatui::buffer::Buffer) -> String {
    let area = buf.area;
    let mut out = String::new();
    for y in 0..area.height {
        for x in 0..area.width {
            let cell = buf.cell((x, y)).unwrap();
            out.push_str(cell.symbol());
        }
        if y + 1 < area.height {
            out.push('\n');
        }
    }
    out
}

fn render_to_string<F>(width: u16, height: u16, draw: F) -> String
where
    F: FnOnce(&mut ratatui::Frame),
{
    let backend = TestBackend::new(width, height);
    let mut terminal = Terminal::new(backend).unwrap();
    terminal.draw(draw).unwrap();
    let buf = terminal.backend().buffer();
    buffer_to_string(buf)
}

fn cpu_snapshot() -> CpuSnapshot {
    CpuSnapshot {
        per_core: vec![
            CoreUsage {
                core_id: 0,
                utilization_percent: 30.0,
                temperature_celsius: Some(48.0),
            },
            CoreUsage {
                core_id: 1,
                utilization_percent: 95.0,
                temperature_celsius: None,
            },
        ],
        aggregate_utilization_percent: 62.0,
        load_average: [1.5, 0.75, 0.25],
        frequency_mhz: 2400,
        timestamp: Instant::now(),
    }
}

fn host_snapshot() -> HostSnapshot {
    HostSnapshot {
        hostname: "buildbox".to_string(),
        os_version: "Linux 6.8".to_string(),
        kernel_version: "6.8.0".to_string(),
        cpu_brand: "Example CPU".to_string(),
        logical_cores: 2,
        boot_time: 0,
        uptime_seconds: 3_661,
        ip_address: Some(std::net::Ipv4Addr::new(192, 168, 1, 20)),
        root_disk: Some(DiskUsage {
            mount_point: "/".to_string(),
            total_bytes: 100 * 1024 * 1024 * 1024,
            used_bytes: 42 * 1024 * 1024 * 1024,
            free_bytes: 58 * 1024 * 1024 * 1024,
        }),
        timestamp: Instant::now(),
    }
}

fn process(pid: u32, name: &str, cpu: f64) -> ProcessEntry {
    ProcessEntry {
        pid,
        name: name.to_string(),
        cpu_percent: cpu,
        memory_bytes: 256 * 1024 * 1024,
        status: "Run".to_string(),
        owner: Some("alice".to_string()),
        threads: Some(pid as usize % 50),
        disk_read_bps: 2048.0,
        disk_write_bps: 0.0,
    }
}

fn process_snapshot() -> ProcessSnapshot {
    ProcessSnapshot {
        entries: vec![process(101, "postgres", 35.0), process(7, "nginx", 2.5)],
        total_count: 240,
        sort: SortKey::Cpu,
        reverse: false,
        timestamp: Instant::now(),
    }
}

#[test]
fn header_shows_host_facts() {
    let host = host_snapshot();
    let output = render_to_string(160, 3, |frame| {
        header::render(frame, Rect::new(0, 0, 160, 3), Some(&host), &Theme::dark());
    });
    assert!(output.contains("vitals"));
    assert!(output.contains("buildbox"));
    assert!(output.contains("up 01:01:01"));
    assert!(output.contains("ip 192.168.1.20"), "{output}");
    assert!(output.contains("/ 42% of 100.0 GB"), "{output}");
}

#[test]
fn header_without_host_says_no_data() {
    let output = render_to_string(60, 3, |frame| {
        header::render(frame, Rect::new(0, 0, 60, 3), None, &Theme::dark());
    });
    assert!(output.contains("no data"));
}

#[test]
fn cpu_panel_lists_cores_and_marks_missing_temperature() {
    let snapshot = cpu_snapshot();
    let output = render_to_string(70, 6, |frame| {
        cpu::render(frame, Rect::new(0, 0, 70, 6), Some(&snapshot), false, &Theme::dark());
    });
    assert!(output.contains("CPU 62%"), "{output}");
    assert!(output.contains("load 1.50 0.75 0.25"));
    assert!(output.contains("30.0%"));
    assert!(output.contains("95.0%"));
    assert!(output.contains("--"));
}

#[test]
fn degraded_panel_is_marked_stale() {
    let snapshot = cpu_snapshot();
    let output = render_to_string(70, 6, |frame| {
        cpu::render(frame, Rect::new(0, 0, 70, 6), Some(&snapshot), true, &Theme::dark());
    });
    assert!(output.contains("(stale)"));
}

#[test]
fn memory_panel_shows_ram_and_swap() {
    let snapshot = MemorySnapshot {
        used_bytes: 4 * 1024 * 1024 * 1024,
        total_bytes: 16 * 1024 * 1024 * 1024,
        available_bytes: 12 * 1024 * 1024 * 1024,
        swap_used_bytes: 0,
        swap_total_bytes: 0,
        timestamp: Instant::now(),
    };
    let output = render_to_string(60, 4, |frame| {
        memory::render(frame, Rect::new(0, 0, 60, 4), Some(&snapshot), false, &Theme::dark());
    });
    assert!(output.contains("RAM 4.0 GB/16.0 GB (25%)"), "{output}");
    assert!(output.contains("Swap none"));
}

#[test]
fn network_panel_lists_interfaces() {
    let mut interfaces = BTreeMap::new();
    interfaces.insert(
        "eth0".to_string(),
        InterfaceRates {
            rx_rate_bps: 2048.0,
            tx_rate_bps: 0.0,
            rx_total_bytes: 10 * 1024 * 1024,
            tx_total_bytes: 512,
            ipv4: Some(std::net::Ipv4Addr::new(10, 0, 0, 5)),
        },
    );
    let snapshot = NetworkSnapshot {
        interfaces,
        timestamp: Instant::now(),
    };
    let output = render_to_string(90, 5, |frame| {
        network::render(frame, Rect::new(0, 0, 90, 5), Some(&snapshot), false, &Theme::dark());
    });
    assert!(output.contains("eth0"));
    assert!(output.contains("10.0.0.5"), "{output}");
    assert!(output.contains("2 KB/s"));
    assert!(output.contains("10.0 MB"));
}

#[test]
fn process_table_shows_counts_and_sort_marker() {
    let snapshot = process_snapshot();
    let rows: Vec<&ProcessEntry> = snapshot.entries.iter().collect();
    let output = render_to_string(100, 6, |frame| {
        process_table::render(
            frame,
            Rect::new(0, 0, 100, 6),
            &process_table::TableView {
                rows: &rows,
                selected: 0,
                snapshot: Some(&snapshot),
                requested_sort: SortKey::Cpu,
                requested_reverse: false,
                degraded: false,
            },
            &Theme::dark(),
        );
    });
    assert!(output.contains("Processes 2/240"), "{output}");
    assert!(output.contains("CPU%\u{25bc}"));
    assert!(output.contains("postgres"));
    assert!(output.contains("alice"));
    assert!(output.contains("THR"));
    // postgres (pid 101) reports one thread in the fixture.
    let postgres_row = output.lines().find(|l| l.contains("postgres")).unwrap();
    assert!(postgres_row.split_whitespace().any(|cell| cell == "1"), "{postgres_row}");
}

#[test]
fn statusbar_lists_stale_domains() {
    let output = render_to_string(100, 1, |frame| {
        statusbar::render(
            frame,
            Rect::new(0, 0, 100, 1),
            &statusbar::StatusView {
                input_mode: InputMode::Normal,
                filter_text: "",
                status_message: None,
                degraded: &[Domain::Network],
            },
            &Theme::dark(),
        );
    });
    assert!(output.contains("Quit"));
    assert!(output.contains("stale: network"));
}

#[test]
fn statusbar_message_takes_priority() {
    let output = render_to_string(60, 1, |frame| {
        statusbar::render(
            frame,
            Rect::new(0, 0, 60, 1),
            &statusbar::StatusView {
                input_mode: InputMode::Normal,
                filter_text: "",
                status_message: Some("Process 42 not found"),
                degraded: &[],
            },
            &Theme::dark(),
        );
    });
    assert!(output.contains("Process 42 not found"));
    assert!(!output.contains("Quit"));
}

#[test]
fn full_dashboard_renders_without_data() {
    let bus = Arc::new(SnapshotBus::new());
    let (control, _rx) = ProcessControl::new(ProcessView::default());
    let app = App::new(&Config::default(), bus, control);
    let output = render_to_string(120, 30, |frame| crate::ui::draw(frame, &app));
    assert!(output.contains("no data"));
}

#[test]
fn full_dashboard_renders_published_snapshots() {
    let bus = Arc::new(SnapshotBus::new());
    bus.publish(cpu_snapshot());
    bus.publish(host_snapshot());
    bus.publish(process_snapshot());
    bus.slot::<NetworkSnapshot>()
        .record_failure(&CollectError::transient("interface list unavailable"));

    let (control, _rx) = ProcessControl::new(ProcessView::default());
    let mut app = App::new(&Config::default(), bus, control);
    app.dispatch(crate::action::Action::ToggleHelp);

    let output = render_to_string(140, 40, |frame| crate::ui::draw(frame, &app));
    assert!(output.contains("buildbox"));
    assert!(output.contains("postgres"));
    assert!(output.contains("Keys"));
}
