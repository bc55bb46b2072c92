use ratatui::Frame;
use ratatui::layout::{Constraint, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::widgets::{Cell, Paragraph, Row, Table};

use crate::format::{format_bytes, format_rate, truncate_unicode};
use crate::system::snapshot::NetworkSnapshot;
use crate::ui::theme::Theme;
use crate::ui::{NO_DATA, panel};

pub fn render(
    frame: &mut Frame,
    area: Rect,
    network: Option<&NetworkSnapshot>,
    degraded: bool,
    theme: &Theme,
) {
    let Some(network) = network else {
        frame.render_widget(
            Paragraph::new(NO_DATA)
                .style(Style::default().fg(theme.text_secondary))
                .block(panel("Network".to_string(), degraded, theme)),
            area,
        );
        return;
    };

    let title = format!(
        "Network \u{2193}{} \u{2191}{}",
        format_rate(network.total_rx_rate_bps()),
        format_rate(network.total_tx_rate_bps())
    );

    let header = Row::new(["IFACE", "IPV4", "RX/s", "TX/s", "RX", "TX"]).style(
        Style::default()
            .fg(theme.text_secondary)
            .add_modifier(Modifier::BOLD),
    );
    let rows = network.interfaces.iter().map(|(name, rates)| {
        Row::new([
            Cell::from(truncate_unicode(name, 12)),
            Cell::from(rates.ipv4.map_or_else(|| "-".to_string(), |ip| ip.to_string())),
            Cell::from(format_rate(rates.rx_rate_bps)).style(Style::default().fg(theme.rx_color)),
            Cell::from(format_rate(rates.tx_rate_bps)).style(Style::default().fg(theme.tx_color)),
            Cell::from(format_bytes(rates.rx_total_bytes)),
            Cell::from(format_bytes(rates.tx_total_bytes)),
        ])
        .style(Style::default().fg(theme.text_primary))
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(12),
            Constraint::Length(15),
            Constraint::Length(11),
            Constraint::Length(11),
            Constraint::Length(9),
            Constraint::Length(9),
        ],
    )
    .header(header)
    .block(panel(title, degraded, theme));

    frame.render_widget(table, area);
}
