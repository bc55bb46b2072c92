use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::Style;
use ratatui::widgets::{Gauge, Paragraph};

use crate::format::format_bytes;
use crate::system::snapshot::MemorySnapshot;
use crate::ui::theme::Theme;
use crate::ui::{NO_DATA, panel};

pub fn render(
    frame: &mut Frame,
    area: Rect,
    memory: Option<&MemorySnapshot>,
    degraded: bool,
    theme: &Theme,
) {
    let block = panel("Memory".to_string(), degraded, theme);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(memory) = memory else {
        frame.render_widget(
            Paragraph::new(NO_DATA).style(Style::default().fg(theme.text_secondary)),
            inner,
        );
        return;
    };

    let [ram_area, swap_area] =
        Layout::vertical([Constraint::Length(1), Constraint::Length(1)]).areas(inner);

    let ram = memory.used_ratio();
    frame.render_widget(
        gauge(
            ram,
            format!(
                "RAM {}/{} ({:.0}%)",
                format_bytes(memory.used_bytes),
                format_bytes(memory.total_bytes),
                ram * 100.0
            ),
            theme,
        ),
        ram_area,
    );

    let swap_label = if memory.swap_total_bytes == 0 {
        "Swap none".to_string()
    } else {
        format!(
            "Swap {}/{}",
            format_bytes(memory.swap_used_bytes),
            format_bytes(memory.swap_total_bytes)
        )
    };
    frame.render_widget(gauge(memory.swap_ratio(), swap_label, theme), swap_area);
}

fn gauge<'a>(ratio: f64, label: String, theme: &Theme) -> Gauge<'a> {
    Gauge::default()
        .gauge_style(
            Style::default()
                .fg(theme.heat(ratio * 100.0))
                .bg(theme.gauge_unfilled),
        )
        .ratio(ratio.clamp(0.0, 1.0))
        .label(label)
}
