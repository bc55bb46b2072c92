use ratatui::Frame;
use ratatui::layout::{Constraint, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::widgets::{Cell, Row, Table, TableState};

use crate::format::{format_bytes, format_rate, truncate_unicode};
use crate::system::snapshot::{ProcessEntry, ProcessSnapshot, SortKey};
use crate::ui::theme::Theme;
use crate::ui::{NO_DATA, panel};

pub struct TableView<'a> {
    pub rows: &'a [&'a ProcessEntry],
    pub selected: usize,
    pub snapshot: Option<&'a ProcessSnapshot>,
    /// Sort the user asked for; shown until a snapshot reflects it.
    pub requested_sort: SortKey,
    pub requested_reverse: bool,
    pub degraded: bool,
}

const COLUMNS: [(&str, Option<SortKey>); 9] = [
    ("PID", Some(SortKey::Pid)),
    ("NAME", Some(SortKey::Name)),
    ("CPU%", Some(SortKey::Cpu)),
    ("MEM", Some(SortKey::Memory)),
    ("THR", None),
    ("READ/s", None),
    ("WRITE/s", None),
    ("USER", None),
    ("STATE", None),
];

pub fn render(frame: &mut Frame, area: Rect, view: &TableView, theme: &Theme) {
    let title = match view.snapshot {
        Some(snapshot) => format!(
            "Processes {}/{}",
            view.rows.len(),
            snapshot.total_count
        ),
        None => format!("Processes ({NO_DATA})"),
    };

    let arrow = if view.requested_reverse { "\u{25b2}" } else { "\u{25bc}" };
    let header = Row::new(COLUMNS.iter().map(|(label, key)| {
        if *key == Some(view.requested_sort) {
            Cell::from(format!("{label}{arrow}")).style(Style::default().fg(theme.accent))
        } else {
            Cell::from(*label)
        }
    }))
    .style(
        Style::default()
            .fg(theme.text_secondary)
            .add_modifier(Modifier::BOLD),
    );

    let rows = view.rows.iter().map(|entry| {
        Row::new([
            Cell::from(entry.pid.to_string()),
            Cell::from(truncate_unicode(&entry.name, 24)),
            Cell::from(format!("{:.1}", entry.cpu_percent))
                .style(Style::default().fg(theme.heat(entry.cpu_percent))),
            Cell::from(format_bytes(entry.memory_bytes)),
            Cell::from(entry.threads.map_or_else(|| "-".to_string(), |n| n.to_string())),
            Cell::from(format_rate(entry.disk_read_bps)),
            Cell::from(format_rate(entry.disk_write_bps)),
            Cell::from(truncate_unicode(entry.owner.as_deref().unwrap_or("-"), 10)),
            Cell::from(entry.status.clone()),
        ])
        .style(Style::default().fg(theme.text_primary))
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(8),
            Constraint::Min(12),
            Constraint::Length(7),
            Constraint::Length(9),
            Constraint::Length(5),
            Constraint::Length(10),
            Constraint::Length(10),
            Constraint::Length(10),
            Constraint::Length(8),
        ],
    )
    .header(header)
    .row_highlight_style(
        Style::default()
            .bg(theme.selection_bg)
            .add_modifier(Modifier::BOLD),
    )
    .block(panel(title, view.degraded, theme));

    let mut state = TableState::default();
    if !view.rows.is_empty() {
        state.select(Some(view.selected.min(view.rows.len() - 1)));
    }
    frame.render_stateful_widget(table, area, &mut state);
}
