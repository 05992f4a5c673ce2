use std::{path::PathBuf, sync::mpsc};

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
};
use tracing::{debug, info, warn};

use crate::api::{Backend, Load, spawn_fetch};
use crate::follow::ScrollFollow;
use crate::models::{Episode, TranscriptSegment};
use crate::player::{Player, PlayerEvent, spawn_audio_fetch};
use crate::progress::draw_progress;
use crate::sync;
use crate::theme::Theme;
use crate::thumbnail::{THUMB_COLS, ThumbPixels, ThumbWidget, spawn_thumb_fetch};
use crate::transcript::{self, TranscriptLayout};
use crate::vocab::{VocabPane, draw_vocab};

const SKIP_SECS: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpisodeTab {
    Transcript,
    Vocabulary,
}

/// Status toggles confirmed by the backend, for the library's sets.
#[derive(Debug, Clone, Copy)]
pub enum StatusChange {
    Favorite(bool),
    Learned(bool),
}

pub enum EpisodeAction {
    Back,
}

/// One episode's view: playback, transcript sync, vocabulary, status.
pub struct EpisodeView {
    pub episode: Episode,
    pub tab: EpisodeTab,
    pub transcripts: Load<Vec<TranscriptSegment>>,
    generation: u64,
    transcript_rx: Option<mpsc::Receiver<(u64, Result<Vec<TranscriptSegment>>)>>,
    pub active: Option<usize>,
    pub cursor: Option<usize>,
    pub follow: ScrollFollow,
    pub layout: TranscriptLayout,
    layout_width: usize,
    view_height: usize,
    pub player: Option<Player>,
    audio_rx: Option<mpsc::Receiver<Result<PathBuf>>>,
    pub audio_error: Option<String>,
    pub is_favorite: bool,
    pub is_learned: bool,
    fav_rx: Option<mpsc::Receiver<Result<bool>>>,
    learn_rx: Option<mpsc::Receiver<Result<bool>>>,
    pub vocab: VocabPane,
    thumb: Option<ThumbPixels>,
    thumb_rx: Option<mpsc::Receiver<ThumbPixels>>,
}

impl EpisodeView {
    pub fn open(
        backend: &Backend,
        episode: Episode,
        is_favorite: bool,
        is_learned: bool,
        vocab_page_size: usize,
    ) -> Self {
        info!(id = %episode.id, title = %episode.title, "opening episode");
        let generation = 1;
        let b = backend.clone();
        let id = episode.id.clone();
        let transcript_rx = Some(spawn_fetch(move || (generation, b.transcripts(&id))));

        let audio_rx = episode.audio_url.clone().map(spawn_audio_fetch);
        let audio_error = if audio_rx.is_none() {
            Some("episode has no audio".to_string())
        } else {
            None
        };
        let thumb_rx = episode.thumbnail_url.clone().map(spawn_thumb_fetch);
        let vocab = VocabPane::for_episode(backend, &episode.id, &episode.title, vocab_page_size);

        EpisodeView {
            tab: EpisodeTab::Transcript,
            transcripts: Load::Loading,
            generation,
            transcript_rx,
            active: None,
            cursor: None,
            follow: ScrollFollow::new(),
            layout: TranscriptLayout::default(),
            layout_width: 0,
            view_height: 0,
            player: None,
            audio_rx,
            audio_error,
            is_favorite,
            is_learned,
            fav_rx: None,
            learn_rx: None,
            vocab,
            thumb: None,
            thumb_rx,
            episode,
        }
    }

    /// Drain worker results and clock events. Returns confirmed status
    /// changes for the library to mirror.
    pub fn pump(&mut self, backend: &Backend) -> Vec<StatusChange> {
        let mut changes = Vec::new();

        if let Some(rx) = &self.transcript_rx {
            if let Ok((generation, result)) = rx.try_recv() {
                self.transcript_rx = None;
                if generation != self.generation {
                    debug!(generation, "dropping stale transcript response");
                } else {
                    match result {
                        Ok(segments) => {
                            let t = self
                                .player
                                .as_ref()
                                .map(|p| p.position().as_secs_f64())
                                .unwrap_or(0.0);
                            self.active = sync::reset_active(&segments, t);
                            self.transcripts = Load::Ready(segments);
                            self.layout_width = 0; // relayout on next draw
                            self.follow = ScrollFollow::new();
                            self.cursor = None;
                        }
                        Err(e) => {
                            warn!(error = %e, "transcript fetch failed");
                            self.transcripts = Load::Failed(e.to_string());
                        }
                    }
                }
            }
        }

        if let Some(rx) = &self.audio_rx {
            if let Ok(result) = rx.try_recv() {
                self.audio_rx = None;
                match result.and_then(Player::load) {
                    Ok(player) => {
                        info!("audio ready");
                        self.player = Some(player);
                    }
                    Err(e) => {
                        warn!(error = %e, "audio load failed");
                        self.audio_error = Some(e.to_string());
                    }
                }
            }
        }

        if let Some(rx) = &self.thumb_rx {
            if let Ok(pixels) = rx.try_recv() {
                self.thumb_rx = None;
                self.thumb = Some(pixels);
            }
        }

        if let Some(rx) = &self.fav_rx {
            if let Ok(result) = rx.try_recv() {
                self.fav_rx = None;
                match result {
                    Ok(on) => {
                        self.is_favorite = on;
                        changes.push(StatusChange::Favorite(on));
                    }
                    Err(e) => {
                        warn!(error = %e, "favorite toggle failed");
                        self.is_favorite = !self.is_favorite;
                    }
                }
            }
        }
        if let Some(rx) = &self.learn_rx {
            if let Ok(result) = rx.try_recv() {
                self.learn_rx = None;
                match result {
                    Ok(on) => {
                        self.is_learned = on;
                        changes.push(StatusChange::Learned(on));
                    }
                    Err(e) => {
                        warn!(error = %e, "learned toggle failed");
                        self.is_learned = !self.is_learned;
                    }
                }
            }
        }

        if let Some(player) = &mut self.player {
            for event in player.poll() {
                match event {
                    PlayerEvent::Time(t) => {
                        let t = t.as_secs_f64();
                        if let Load::Ready(segments) = &self.transcripts {
                            let prev = self.active;
                            self.active = sync::resolve_active(segments, t, prev);
                            if self.active != prev {
                                if let Some(i) = self.active {
                                    self.follow.active_changed(&self.layout, self.view_height, i);
                                }
                            }
                        }
                        self.follow.observe(&self.layout, self.view_height, self.active);
                    }
                    PlayerEvent::DurationKnown(d) => {
                        debug!(secs = d.as_secs_f64(), "duration known");
                    }
                    PlayerEvent::Finished => info!("playback finished"),
                }
            }
        }

        self.vocab.pump(backend);
        changes
    }

    /// Seek to a segment's start and play; the jump implies a recenter.
    pub fn activate_segment(&mut self, i: usize) {
        let Some(start) = self
            .transcripts
            .ready()
            .and_then(|s| s.get(i))
            .map(|s| s.start_time)
        else {
            return;
        };
        let Some(player) = &mut self.player else {
            return;
        };
        if player.duration().is_none() {
            debug!("segment activation ignored: duration unknown");
            return;
        }
        player.seek_to_secs(start);
        player.play();
        self.active = Some(i);
        self.cursor = None;
        self.follow
            .return_to_active(&self.layout, self.view_height, self.active);
    }

    pub fn skip(&mut self, delta: f64) {
        let Some(player) = &mut self.player else {
            return;
        };
        player.skip(delta);
        self.resync_after_jump();
    }

    /// Seek-bar interaction: ratio along the gauge.
    pub fn seek_ratio(&mut self, ratio: f64) {
        let Some(player) = &mut self.player else {
            return;
        };
        let Some(total) = player.duration() else {
            return;
        };
        player.seek_to_secs(ratio * total.as_secs_f64());
        self.resync_after_jump();
    }

    /// After a transport jump the active line follows the new position
    /// immediately and the viewport recenters on it.
    fn resync_after_jump(&mut self) {
        if let (Some(player), Load::Ready(segments)) = (&self.player, &self.transcripts) {
            let t = player.position().as_secs_f64();
            self.active = sync::resolve_active(segments, t, self.active);
        }
        self.follow
            .return_to_active(&self.layout, self.view_height, self.active);
    }

    /// Re-fetch the transcript (after a failed load). Bumping the
    /// generation makes any still-in-flight response stale.
    pub fn reload_transcripts(&mut self, backend: &Backend) {
        self.generation += 1;
        let generation = self.generation;
        self.transcripts = Load::Loading;
        let b = backend.clone();
        let id = self.episode.id.clone();
        self.transcript_rx = Some(spawn_fetch(move || (generation, b.transcripts(&id))));
    }

    pub fn toggle_favorite(&mut self, backend: &Backend) {
        if self.fav_rx.is_some() {
            return;
        }
        self.is_favorite = !self.is_favorite; // optimistic; reconciled on reply
        let b = backend.clone();
        let id = self.episode.id.clone();
        self.fav_rx = Some(spawn_fetch(move || b.toggle_favorite(&id)));
    }

    pub fn toggle_learned(&mut self, backend: &Backend) {
        if self.learn_rx.is_some() {
            return;
        }
        self.is_learned = !self.is_learned;
        let b = backend.clone();
        let id = self.episode.id.clone();
        self.learn_rx = Some(spawn_fetch(move || b.toggle_learned(&id)));
    }

    pub fn input_active(&self) -> bool {
        self.tab == EpisodeTab::Vocabulary && self.vocab.input_active()
    }

    pub fn user_scroll(&mut self, delta: isize) {
        self.follow
            .user_scroll(delta, &self.layout, self.view_height);
    }

    fn move_cursor(&mut self, delta: isize) {
        let Some(count) = self.transcripts.ready().map(|s| s.len()) else {
            return;
        };
        if count == 0 {
            return;
        }
        let base = self.cursor.or(self.active).unwrap_or(0) as isize;
        let next = (base + delta).clamp(0, count as isize - 1) as usize;
        self.cursor = Some(next);
        self.scroll_cursor_into_view(next);
    }

    fn scroll_cursor_into_view(&mut self, i: usize) {
        let Some(seg) = self.layout.segment(i) else {
            return;
        };
        let top = self.follow.offset;
        let bottom = top + self.view_height;
        let delta = if seg.start < top {
            seg.start as isize - top as isize
        } else if seg.start + seg.rows > bottom {
            (seg.start + seg.rows) as isize - bottom as isize
        } else {
            return;
        };
        self.follow
            .user_scroll(delta, &self.layout, self.view_height);
    }

    pub fn handle_key(&mut self, key: KeyEvent, backend: &Backend) -> Option<EpisodeAction> {
        if self.tab == EpisodeTab::Vocabulary {
            if self.vocab.input_active() {
                self.vocab.handle_key(key, backend);
                return None;
            }
            if self.vocab.handle_key(key, backend) {
                return None;
            }
        }

        match key.code {
            KeyCode::Esc => return Some(EpisodeAction::Back),
            KeyCode::Tab => {
                self.tab = match self.tab {
                    EpisodeTab::Transcript => EpisodeTab::Vocabulary,
                    EpisodeTab::Vocabulary => EpisodeTab::Transcript,
                };
            }
            KeyCode::Char(' ') => {
                if let Some(player) = &mut self.player {
                    player.toggle();
                }
            }
            KeyCode::Left => self.skip(-SKIP_SECS),
            KeyCode::Right => self.skip(SKIP_SECS),
            KeyCode::Char('+') | KeyCode::Char('=') => {
                if let Some(player) = &mut self.player {
                    player.volume_up();
                }
            }
            KeyCode::Char('-') => {
                if let Some(player) = &mut self.player {
                    player.volume_down();
                }
            }
            KeyCode::Char('f') => self.toggle_favorite(backend),
            KeyCode::Char('l') => self.toggle_learned(backend),
            _ => {}
        }

        if self.tab == EpisodeTab::Transcript {
            match key.code {
                KeyCode::Char('j') | KeyCode::Down => self.move_cursor(1),
                KeyCode::Char('k') | KeyCode::Up => self.move_cursor(-1),
                KeyCode::Enter => {
                    if let Some(i) = self.cursor {
                        self.activate_segment(i);
                    }
                }
                KeyCode::Char('b') => {
                    self.cursor = None;
                    self.follow
                        .return_to_active(&self.layout, self.view_height, self.active);
                }
                KeyCode::Char('r') => {
                    if matches!(self.transcripts, Load::Failed(_)) {
                        self.reload_transcripts(backend);
                    }
                }
                _ => {}
            }
        }
        None
    }

    /// Recompute row geometry for the pane the transcript is about to be
    /// drawn into, and clamp the viewport to it.
    fn prepare(&mut self, content: Rect) {
        let wrap_width = content.width.saturating_sub(4) as usize;
        self.view_height = content.height.saturating_sub(2) as usize;
        if wrap_width != self.layout_width {
            self.layout_width = wrap_width;
            let segments = self.transcripts.ready().map(|s| s.as_slice()).unwrap_or(&[]);
            self.layout = TranscriptLayout::compute(segments, wrap_width);
            if let Some(i) = self.active {
                self.follow.active_changed(&self.layout, self.view_height, i);
            }
        }
        self.follow.clamp_to(&self.layout, self.view_height);
    }
}

/// Areas the mouse handler needs back from a draw pass.
pub struct EpisodeRects {
    pub transcript: Option<Rect>,
    pub progress: Rect,
}

pub fn draw_episode(
    frame: &mut Frame,
    area: Rect,
    view: &mut EpisodeView,
    theme: &Theme,
) -> EpisodeRects {
    let chunks = Layout::vertical([
        Constraint::Length(6),
        Constraint::Length(1),
        Constraint::Min(4),
        Constraint::Length(3),
    ])
    .split(area);

    draw_header(frame, chunks[0], view, theme);
    draw_tabs(frame, chunks[1], view.tab, theme);

    let content = chunks[2];
    let mut transcript_rect = None;
    match view.tab {
        EpisodeTab::Transcript => {
            view.prepare(content);
            let hint = view.follow.hint(&view.layout, view.view_height, view.active);
            transcript::draw_transcript(
                frame,
                content,
                &view.transcripts,
                &view.layout,
                &view.follow,
                view.active,
                view.cursor,
                hint,
                theme,
            );
            transcript_rect = Some(content);
        }
        EpisodeTab::Vocabulary => draw_vocab(frame, content, &mut view.vocab, theme),
    }

    match &view.player {
        Some(player) => draw_progress(
            frame,
            chunks[3],
            player.position(),
            player.duration(),
            player.volume(),
            theme,
        ),
        None => {
            let (msg, style) = match &view.audio_error {
                Some(err) => (err.clone(), Style::default().fg(theme.negative)),
                None => (
                    "downloading audio...".to_string(),
                    Style::default().fg(theme.dimmed),
                ),
            };
            let placeholder = Paragraph::new(msg).style(style).block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded)
                    .title(" Progress "),
            );
            frame.render_widget(placeholder, chunks[3]);
        }
    }

    EpisodeRects {
        transcript: transcript_rect,
        progress: chunks[3],
    }
}

fn draw_header(frame: &mut Frame, area: Rect, view: &EpisodeView, theme: &Theme) {
    let status = match &view.player {
        Some(p) if !p.is_paused() => "Playing",
        Some(_) => "Paused",
        None => "Loading",
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(Line::from(vec![
            Span::styled(
                format!(" {status} "),
                Style::default().fg(Color::Black).bg(theme.accent),
            ),
        ]));
    let inner = block.inner(area);
    frame.render_widget(block, area);
    if inner.width == 0 || inner.height == 0 {
        return;
    }

    let mut text_area = inner;
    if let Some(pixels) = &view.thumb {
        let art_w = THUMB_COLS.min(inner.width);
        let art = Rect::new(inner.x, inner.y, art_w, inner.height);
        frame.render_widget(ThumbWidget::new(pixels), art);
        text_area = Rect::new(
            inner.x + art_w + 1,
            inner.y,
            inner.width.saturating_sub(art_w + 1),
            inner.height,
        );
    }

    let fav_style = if view.is_favorite {
        Style::default().fg(theme.negative)
    } else {
        Style::default().fg(theme.dimmed)
    };
    let learn_style = if view.is_learned {
        Style::default().fg(theme.positive)
    } else {
        Style::default().fg(theme.dimmed)
    };
    let mut lines = vec![
        Line::styled(
            view.episode.title.clone(),
            Style::default().fg(theme.text).add_modifier(Modifier::BOLD),
        ),
        Line::from(vec![
            Span::styled("♥ favorite (f)", fav_style),
            Span::raw("   "),
            Span::styled("✓ learned (l)", learn_style),
        ]),
    ];
    if let Some(desc) = &view.episode.description {
        for text in transcript::wrap_text(desc, text_area.width as usize)
            .into_iter()
            .take(text_area.height.saturating_sub(2) as usize)
        {
            lines.push(Line::styled(text, Style::default().fg(theme.dimmed)));
        }
    }
    frame.render_widget(Paragraph::new(lines), text_area);
}

fn draw_tabs(frame: &mut Frame, area: Rect, tab: EpisodeTab, theme: &Theme) {
    let mut spans = Vec::new();
    for (t, label) in [
        (EpisodeTab::Transcript, "Transcripts"),
        (EpisodeTab::Vocabulary, "Vocabulary"),
    ] {
        let style = if t == tab {
            Style::default()
                .fg(Color::Black)
                .bg(theme.secondary)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme.dimmed)
        };
        spans.push(Span::styled(format!(" {label} "), style));
        spans.push(Span::raw("  "));
    }
    spans.push(Span::styled(
        "(Tab switches)",
        Style::default().fg(theme.dimmed),
    ));
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
