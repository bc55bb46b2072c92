use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::system::snapshot::{CoreUsage, CpuSnapshot};
use crate::ui::theme::Theme;
use crate::ui::{NO_DATA, panel};

const BAR_WIDTH: usize = 20;

pub fn render(
    frame: &mut Frame,
    area: Rect,
    cpu: Option<&CpuSnapshot>,
    degraded: bool,
    theme: &Theme,
) {
    let Some(cpu) = cpu else {
        let block = panel("CPU".to_string(), degraded, theme);
        frame.render_widget(
            Paragraph::new(NO_DATA)
                .style(Style::default().fg(theme.text_secondary))
                .block(block),
            area,
        );
        return;
    };

    let [one, five, fifteen] = cpu.load_average;
    let mut title = format!(
        "CPU {:.0}%  load {one:.2} {five:.2} {fifteen:.2}",
        cpu.aggregate_utilization_percent
    );
    if cpu.frequency_mhz > 0 {
        title.push_str(&format!("  {} MHz", cpu.frequency_mhz));
    }
    if let Some(hottest) = cpu.hottest_core_celsius() {
        title.push_str(&format!("  {hottest:.0}\u{b0}C"));
    }

    let lines: Vec<Line> = cpu.per_core.iter().map(|core| core_line(core, theme)).collect();
    frame.render_widget(
        Paragraph::new(lines).block(panel(title, degraded, theme)),
        area,
    );
}

fn core_line<'a>(core: &CoreUsage, theme: &Theme) -> Line<'a> {
    let percent = core.utilization_percent;
    let filled = ((percent / 100.0) * BAR_WIDTH as f64).round() as usize;
    let filled = filled.min(BAR_WIDTH);
    let temperature = match core.temperature_celsius {
        Some(t) => format!("{t:>4.0}\u{b0}C"),
        None => "   --".to_string(),
    };

    Line::from(vec![
        Span::styled(
            format!("{:>3} ", core.core_id),
            Style::default().fg(theme.text_secondary),
        ),
        Span::styled("\u{2588}".repeat(filled), Style::default().fg(theme.heat(percent))),
        Span::styled(
            "\u{2591}".repeat(BAR_WIDTH - filled),
            Style::default().fg(theme.gauge_unfilled),
        ),
        Span::styled(
            format!(" {percent:>5.1}%"),
            Style::default().fg(theme.text_primary),
        ),
        Span::styled(temperature, Style::default().fg(theme.text_secondary)),
    ])
}
