use ratatui::{
    Frame,
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
};

use crate::api::Load;
use crate::follow::{Hint, ScrollFollow};
use crate::models::TranscriptSegment;
use crate::theme::Theme;

/// Row extent of one segment inside the fully laid-out transcript.
#[derive(Debug, Clone, Copy)]
pub struct SegmentRows {
    pub start: usize,
    pub rows: usize,
}

/// Per-segment row ranges for the current wrap width. Recomputed when the
/// transcript or the pane width changes, shared by drawing, scrolling, and
/// mouse hit-testing so they agree on geometry.
#[derive(Debug, Default)]
pub struct TranscriptLayout {
    segments: Vec<SegmentRows>,
    total: usize,
}

impl TranscriptLayout {
    pub fn compute(segments: &[TranscriptSegment], width: usize) -> Self {
        let mut rows = Vec::with_capacity(segments.len());
        let mut total = 0;
        for seg in segments {
            let n = wrap_text(&segment_label(seg), width).len().max(1);
            rows.push(SegmentRows { start: total, rows: n });
            total += n;
        }
        TranscriptLayout { segments: rows, total }
    }

    /// Build a layout from precomputed per-segment heights.
    pub fn from_rows(heights: &[usize]) -> Self {
        let mut rows = Vec::with_capacity(heights.len());
        let mut total = 0;
        for &n in heights {
            rows.push(SegmentRows { start: total, rows: n });
            total += n;
        }
        TranscriptLayout { segments: rows, total }
    }

    pub fn segment(&self, i: usize) -> Option<&SegmentRows> {
        self.segments.get(i)
    }

    pub fn total_rows(&self) -> usize {
        self.total
    }

    pub fn max_offset(&self, height: usize) -> usize {
        self.total.saturating_sub(height)
    }

    /// Fraction of segment `i`'s rows inside the viewport `[offset, offset+height)`.
    pub fn visibility(&self, i: usize, offset: usize, height: usize) -> f32 {
        let Some(seg) = self.segments.get(i) else {
            return 0.0;
        };
        if seg.rows == 0 {
            return 0.0;
        }
        let top = seg.start.max(offset);
        let bottom = (seg.start + seg.rows).min(offset + height);
        if bottom <= top {
            return 0.0;
        }
        (bottom - top) as f32 / seg.rows as f32
    }

    /// Which segment owns an absolute row, for mouse hit-testing.
    pub fn segment_at_row(&self, row: usize) -> Option<usize> {
        if row >= self.total {
            return None;
        }
        self.segments
            .iter()
            .position(|s| row >= s.start && row < s.start + s.rows)
    }
}

/// Greedy word wrap by character count. Transcript text is plain English; a
/// word longer than the width is hard-split rather than overflowing.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let need = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if need <= width {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
            continue;
        }
        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        let mut rest: Vec<char> = word.chars().collect();
        while rest.len() > width {
            lines.push(rest.drain(..width).collect());
        }
        current = rest.into_iter().collect();
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

pub fn segment_label(seg: &TranscriptSegment) -> String {
    match &seg.speaker {
        Some(speaker) if !speaker.is_empty() => format!("{speaker}: {}", seg.text),
        _ => seg.text.clone(),
    }
}

/// Resolve a mouse press/release pair into a segment activation.
///
/// A release on a different cell than the press is a selection drag (the
/// user is copying text), never a tap, so it resolves to nothing.
pub fn click_target(
    press: (u16, u16),
    release: (u16, u16),
    area: Rect,
    layout: &TranscriptLayout,
    offset: usize,
) -> Option<usize> {
    if press != release {
        return None;
    }
    let inner = Rect {
        x: area.x + 1,
        y: area.y + 1,
        width: area.width.saturating_sub(2),
        height: area.height.saturating_sub(2),
    };
    let (x, y) = release;
    if x < inner.x || x >= inner.x + inner.width || y < inner.y || y >= inner.y + inner.height {
        return None;
    }
    layout.segment_at_row(offset + (y - inner.y) as usize)
}

pub fn draw_transcript(
    frame: &mut Frame,
    area: Rect,
    transcripts: &Load<Vec<TranscriptSegment>>,
    layout: &TranscriptLayout,
    follow: &ScrollFollow,
    active: Option<usize>,
    cursor: Option<usize>,
    hint: Option<Hint>,
    theme: &Theme,
) {
    let mut block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(" Transcript ");
    if let Some(h) = hint {
        let arrow = match h {
            Hint::Up => "⇈",
            Hint::Down => "⇊",
        };
        block = block.title_bottom(
            Line::from(vec![
                Span::styled(
                    format!(" {arrow} b "),
                    Style::default().fg(theme.text).bg(theme.accent),
                ),
                Span::styled(" back to active ", Style::default().fg(theme.accent)),
            ])
            .alignment(Alignment::Right),
        );
    }
    let inner = block.inner(area);
    frame.render_widget(block, area);
    if inner.width == 0 || inner.height == 0 {
        return;
    }

    let segments = match transcripts {
        Load::Loading => {
            let msg = Paragraph::new("Loading transcript...")
                .style(Style::default().fg(theme.dimmed));
            frame.render_widget(msg, inner);
            return;
        }
        Load::Failed(err) => {
            let lines = vec![
                Line::styled("Could not load the transcript.", Style::default().fg(theme.negative)),
                Line::styled(err.as_str(), Style::default().fg(theme.dimmed)),
                Line::raw(""),
                Line::styled(
                    "Audio playback still works. Press r to retry.",
                    Style::default().fg(theme.dimmed),
                ),
            ];
            frame.render_widget(Paragraph::new(lines), inner);
            return;
        }
        Load::Ready(segments) if segments.is_empty() => {
            let msg = Paragraph::new("No transcript for this episode.")
                .style(Style::default().fg(theme.dimmed));
            frame.render_widget(msg, inner);
            return;
        }
        Load::Ready(segments) => segments,
    };

    let height = inner.height as usize;
    let top = follow.offset;
    let bottom = top + height;
    let mut lines: Vec<Line> = Vec::with_capacity(height);
    for (i, seg) in segments.iter().enumerate() {
        let Some(rows) = layout.segment(i) else {
            break;
        };
        if rows.start + rows.rows <= top {
            continue;
        }
        if rows.start >= bottom {
            break;
        }
        let style = if Some(i) == active {
            Style::default().fg(theme.text).add_modifier(Modifier::BOLD)
        } else if Some(i) == cursor {
            Style::default().fg(theme.secondary)
        } else {
            Style::default().fg(theme.dimmed)
        };
        let marker = if Some(i) == active {
            Span::styled("▌ ", Style::default().fg(theme.accent))
        } else if Some(i) == cursor {
            Span::styled("> ", Style::default().fg(theme.secondary))
        } else {
            Span::raw("  ")
        };
        let wrapped = wrap_text(&segment_label(seg), inner.width.saturating_sub(2) as usize);
        for (n, text) in wrapped.into_iter().enumerate() {
            let row = rows.start + n;
            if row < top || row >= bottom {
                continue;
            }
            let lead = if n == 0 {
                marker.clone()
            } else {
                Span::raw("  ")
            };
            lines.push(Line::from(vec![lead, Span::styled(text, style)]));
        }
    }
    frame.render_widget(Paragraph::new(lines), inner);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(text: &str, speaker: Option<&str>) -> TranscriptSegment {
        TranscriptSegment {
            id: "t1".into(),
            episode_id: "ep001".into(),
            order: 0,
            text: text.into(),
            speaker: speaker.map(String::from),
            start_time: 0.0,
            end_time: 1.0,
        }
    }

    #[test]
    fn wrap_respects_width_and_splits_long_words() {
        let lines = wrap_text("the quick brown fox jumps", 10);
        assert!(lines.iter().all(|l| l.chars().count() <= 10));
        assert_eq!(lines.join(" "), "the quick brown fox jumps");

        let lines = wrap_text("antidisestablishmentarianism", 10);
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| l.chars().count() <= 10));
    }

    #[test]
    fn empty_text_still_occupies_one_row() {
        assert_eq!(wrap_text("", 20).len(), 1);
    }

    #[test]
    fn speaker_prefix_is_part_of_the_label() {
        assert_eq!(segment_label(&seg("hello", Some("Anna"))), "Anna: hello");
        assert_eq!(segment_label(&seg("hello", None)), "hello");
    }

    #[test]
    fn layout_accumulates_rows() {
        let segs = vec![seg("one two three four five six", None), seg("hi", None)];
        let layout = TranscriptLayout::compute(&segs, 10);
        let first = layout.segment(0).unwrap();
        assert!(first.rows >= 2);
        assert_eq!(layout.segment(1).unwrap().start, first.rows);
        assert_eq!(layout.total_rows(), first.rows + 1);
    }

    #[test]
    fn visibility_fraction() {
        let layout = TranscriptLayout::from_rows(&[4, 4, 4]);
        // viewport rows 2..6 covers half of segment 0 and half of segment 1
        assert_eq!(layout.visibility(0, 2, 4), 0.5);
        assert_eq!(layout.visibility(1, 2, 4), 0.5);
        assert_eq!(layout.visibility(2, 2, 4), 0.0);
        assert_eq!(layout.visibility(1, 0, 12), 1.0);
    }

    #[test]
    fn click_resolves_to_segment_under_the_cell() {
        let layout = TranscriptLayout::from_rows(&[2, 2, 2]);
        let area = Rect::new(0, 10, 40, 8);
        // inner starts at y=11; row 3 of the layout = segment 1
        let hit = click_target((5, 14), (5, 14), area, &layout, 0);
        assert_eq!(hit, Some(1));
        // scrolled down by 2 rows the same cell lands on segment 2
        let hit = click_target((5, 14), (5, 14), area, &layout, 2);
        assert_eq!(hit, Some(2));
    }

    #[test]
    fn drag_is_a_selection_not_a_tap() {
        let layout = TranscriptLayout::from_rows(&[2, 2, 2]);
        let area = Rect::new(0, 10, 40, 8);
        assert_eq!(click_target((5, 14), (9, 14), area, &layout, 0), None);
    }

    #[test]
    fn click_outside_the_pane_is_ignored() {
        let layout = TranscriptLayout::from_rows(&[2, 2, 2]);
        let area = Rect::new(0, 10, 40, 8);
        assert_eq!(click_target((5, 9), (5, 9), area, &layout, 0), None);
        assert_eq!(click_target((5, 30), (5, 30), area, &layout, 0), None);
    }
}
