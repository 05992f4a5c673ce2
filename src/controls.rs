use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
};

use crate::theme::Theme;

fn build_spans(entries: &[(&str, &str)], theme: &Theme) -> Vec<Span<'static>> {
    let key_style = Style::default().fg(Color::Black).bg(theme.secondary);
    let mut spans = Vec::with_capacity(entries.len() * 2);
    for (key, label) in entries {
        spans.push(Span::styled(format!(" {key} "), key_style));
        spans.push(Span::raw(format!(" {label}  ")));
    }
    spans
}

/// Wrap spans into lines, breaking at group boundaries (every 2 spans = key + label).
fn wrap_lines(spans: Vec<Span<'static>>, inner_w: usize) -> Vec<Line<'static>> {
    if inner_w == 0 {
        return vec![Line::from(spans)];
    }
    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut current: Vec<Span<'static>> = Vec::new();
    let mut current_w: usize = 0;
    for chunk in spans.chunks(2) {
        let group_w: usize = Line::from(chunk.to_vec()).width();
        if current_w + group_w > inner_w && current_w > 0 {
            lines.push(Line::from(std::mem::take(&mut current)));
            current_w = 0;
        }
        current.extend(chunk.iter().cloned());
        current_w += group_w;
    }
    if !current.is_empty() {
        lines.push(Line::from(current));
    }
    lines
}

pub fn controls_height(entries: &[(&str, &str)], width: u16, theme: &Theme) -> u16 {
    let spans = build_spans(entries, theme);
    let inner_w = width.saturating_sub(2) as usize;
    wrap_lines(spans, inner_w).len() as u16 + 2
}

pub fn draw_controls(frame: &mut Frame, area: Rect, entries: &[(&str, &str)], theme: &Theme) {
    let spans = build_spans(entries, theme);
    let inner_w = area.width.saturating_sub(2) as usize;
    let lines = wrap_lines(spans, inner_w);
    let help = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .title(" Keys "),
    );
    frame.render_widget(help, area);
}
