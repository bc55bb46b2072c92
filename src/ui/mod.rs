pub mod cpu;
pub mod header;
pub mod help;
pub mod memory;
pub mod network;
pub mod process_table;
pub mod statusbar;
pub mod theme;

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::Span;
use ratatui::widgets::{Block, BorderType, Borders};

use crate::app::App;
use crate::system::snapshot::Domain;
use crate::ui::theme::Theme;

pub const NO_DATA: &str = "no data";

/// Panel areas for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardLayout {
    pub header: Rect,
    pub cpu: Rect,
    pub memory: Rect,
    pub network: Rect,
    pub processes: Rect,
    pub status: Rect,
}

impl DashboardLayout {
    /// Process rows that fit under the table's borders and header line.
    pub fn process_rows(&self) -> usize {
        usize::from(self.processes.height.saturating_sub(3))
    }
}

/// The CPU panel grows with the core count, within bounds.
pub fn dashboard_layout(area: Rect, core_count: usize) -> DashboardLayout {
    let core_rows = u16::try_from(core_count.max(1)).unwrap_or(u16::MAX);
    let top_height = core_rows.saturating_add(2).clamp(8, 14);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(top_height),
            Constraint::Min(5),
            Constraint::Length(1),
        ])
        .split(area);
    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[1]);
    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(3)])
        .split(top[1]);

    DashboardLayout {
        header: chunks[0],
        cpu: top[0],
        memory: right[0],
        network: right[1],
        processes: chunks[2],
        status: chunks[3],
    }
}

pub fn draw(frame: &mut Frame, app: &App) {
    let layout = dashboard_layout(frame.area(), app.core_count());

    header::render(frame, layout.header, app.data.host.as_deref(), &app.theme);

    cpu::render(
        frame,
        layout.cpu,
        app.data.cpu.as_deref(),
        app.health(Domain::Cpu).is_degraded(),
        &app.theme,
    );

    memory::render(
        frame,
        layout.memory,
        app.data.memory.as_deref(),
        app.health(Domain::Memory).is_degraded(),
        &app.theme,
    );
    network::render(
        frame,
        layout.network,
        app.data.network.as_deref(),
        app.health(Domain::Network).is_degraded(),
        &app.theme,
    );

    let requested = app.requested_view();
    process_table::render(
        frame,
        layout.processes,
        &process_table::TableView {
            rows: &app.visible_processes(),
            selected: app.selected_index,
            snapshot: app.data.processes.as_deref(),
            requested_sort: requested.sort,
            requested_reverse: requested.reverse,
            degraded: app.health(Domain::Processes).is_degraded(),
        },
        &app.theme,
    );

    statusbar::render(
        frame,
        layout.status,
        &statusbar::StatusView {
            input_mode: app.input_mode,
            filter_text: &app.filter_text,
            status_message: app.status_message.as_ref().map(|(m, _)| m.as_str()),
            degraded: &app.degraded_domains(),
        },
        &app.theme,
    );

    // Help overlay, rendered last to appear on top
    if app.show_help() {
        help::render(frame, frame.area(), &app.help_entries(), &app.theme);
    }
}

/// Bordered panel; a degraded domain gets a "(stale)" marker in the title.
pub fn panel<'a>(title: String, degraded: bool, theme: &Theme) -> Block<'a> {
    let mut spans = vec![Span::styled(
        format!(" {title} "),
        Style::default()
            .fg(theme.text_secondary)
            .add_modifier(Modifier::BOLD),
    )];
    if degraded {
        spans.push(Span::styled(
            "(stale) ",
            Style::default()
                .fg(theme.status_warn)
                .add_modifier(Modifier::BOLD),
        ));
    }
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.border))
        .title(ratatui::text::Line::from(spans))
}

#[cfg(test)]
mod tests;
