use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Paragraph};

use crate::format::{format_bytes, format_uptime};
use crate::system::snapshot::HostSnapshot;
use crate::ui::NO_DATA;
use crate::ui::theme::Theme;

pub fn render(frame: &mut Frame, area: Rect, host: Option<&HostSnapshot>, theme: &Theme) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.border));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut spans = vec![Span::styled(
        " vitals ",
        Style::default()
            .fg(theme.header_accent_fg)
            .bg(theme.header_accent_bg)
            .add_modifier(Modifier::BOLD),
    )];

    let secondary = Style::default().fg(theme.text_secondary);
    match host {
        Some(host) => {
            spans.extend([
                Span::raw("  "),
                Span::styled(
                    host.hostname.clone(),
                    Style::default()
                        .fg(theme.text_primary)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(format!("  {}", host.os_version), secondary),
                Span::styled(format!("  kernel {}", host.kernel_version), secondary),
                Span::styled(
                    format!("  {} ({} cores)", host.cpu_brand, host.logical_cores),
                    secondary,
                ),
                Span::styled(format!("  up {}", format_uptime(host.uptime_seconds)), secondary),
            ]);
            if let Some(ip) = host.ip_address {
                spans.push(Span::styled(format!("  ip {ip}"), secondary));
            }
            if let Some(disk) = &host.root_disk {
                let pct = disk.used_ratio() * 100.0;
                spans.push(Span::styled(
                    format!(
                        "  {} {pct:.0}% of {}",
                        disk.mount_point,
                        format_bytes(disk.total_bytes)
                    ),
                    Style::default().fg(theme.heat(pct)),
                ));
            }
        }
        None => spans.push(Span::styled(format!("  {NO_DATA}"), secondary)),
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), inner);
}
