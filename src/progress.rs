use std::time::Duration;

use ratatui::{
    Frame,
    layout::{Alignment, Rect},
    text::Line,
    widgets::{Block, BorderType, Borders},
};

use crate::gauge::RoundedGauge;
use crate::theme::Theme;

/// `m:ss`, seconds zero-padded. Episodes stay under an hour, so no hours
/// component.
pub fn format_time(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// Seek bar row. While the duration is unknown the total renders as `...`
/// and the bar stays empty; the surrounding key handling suppresses seeks
/// until then.
pub fn draw_progress(
    frame: &mut Frame,
    area: Rect,
    elapsed: Duration,
    total: Option<Duration>,
    volume: f32,
    theme: &Theme,
) {
    let label = match total {
        Some(t) if !t.is_zero() => format!("{} / {}", format_time(elapsed), format_time(t)),
        _ => format!("{} / ...", format_time(elapsed)),
    };
    let ratio = total
        .map(|t| {
            if t.is_zero() {
                0.0
            } else {
                (elapsed.as_secs_f64() / t.as_secs_f64()).min(1.0)
            }
        })
        .unwrap_or(0.0);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(" Progress ")
        .title(Line::from(format!(" {label} ")).alignment(Alignment::Right))
        .title_bottom(
            Line::from(format!(" vol {}% ", (volume * 100.0).round() as u16))
                .alignment(Alignment::Right),
        );

    let gauge = RoundedGauge::new(ratio, String::new(), theme.accent)
        .dimmed_color(theme.dimmed)
        .block(block);
    frame.render_widget(gauge, area);
}

/// Ratio along the gauge for a click at column `x`, or `None` outside it.
pub fn seek_ratio_at(area: Rect, x: u16, y: u16) -> Option<f64> {
    if area.width < 3 || y < area.y || y >= area.y + area.height {
        return None;
    }
    let inner_x = area.x + 1;
    let inner_w = area.width - 2;
    if x < inner_x || x >= inner_x + inner_w {
        return None;
    }
    Some((x - inner_x) as f64 / (inner_w.saturating_sub(1)).max(1) as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_minutes_and_zero_padded_seconds() {
        assert_eq!(format_time(Duration::from_secs(0)), "0:00");
        assert_eq!(format_time(Duration::from_secs(59)), "0:59");
        assert_eq!(format_time(Duration::from_secs(65)), "1:05");
        assert_eq!(format_time(Duration::from_secs(600)), "10:00");
        // no hours component even past 60 minutes
        assert_eq!(format_time(Duration::from_secs(3725)), "62:05");
    }

    #[test]
    fn click_ratio_spans_the_inner_width() {
        let area = Rect::new(0, 5, 42, 3);
        assert_eq!(seek_ratio_at(area, 1, 6), Some(0.0));
        assert_eq!(seek_ratio_at(area, 40, 6), Some(1.0));
        assert_eq!(seek_ratio_at(area, 0, 6), None); // border
        assert_eq!(seek_ratio_at(area, 20, 2), None); // outside row
    }
}
