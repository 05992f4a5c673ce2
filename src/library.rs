use std::{collections::HashSet, sync::mpsc, time::Duration};

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
};
use tracing::{debug, warn};

use crate::api::{Backend, spawn_fetch};
use crate::debounce::Debouncer;
use crate::models::Episode;
use crate::theme::Theme;

const SEARCH_DEBOUNCE: Duration = Duration::from_millis(400);
const CARD_ROWS: usize = 3;
const LOAD_MORE_MARGIN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibraryTab {
    All,
    Favorites,
    Learned,
}

impl LibraryTab {
    pub fn label(self) -> &'static str {
        match self {
            LibraryTab::All => "All Episodes",
            LibraryTab::Favorites => "Favorites",
            LibraryTab::Learned => "Learned",
        }
    }

    pub fn next(self) -> Self {
        match self {
            LibraryTab::All => LibraryTab::Favorites,
            LibraryTab::Favorites => LibraryTab::Learned,
            LibraryTab::Learned => LibraryTab::All,
        }
    }
}

pub enum LibraryAction {
    Open(Episode),
    OpenVocabulary,
}

/// Episode list screen: paged "all" feed, client-side favorite/learned
/// filters, and a debounced title search that swaps in its own result list.
pub struct Library {
    episodes: Vec<Episode>,
    results: Vec<Episode>,
    page: usize,
    page_size: usize,
    pub has_more: bool,
    pub loading: bool,
    pub error: Option<String>,
    page_rx: Option<mpsc::Receiver<Result<Vec<Episode>>>>,
    pub tab: LibraryTab,
    pub cursor: usize,
    offset: usize,
    pub search: String,
    pub search_focus: bool,
    debounce: Debouncer,
    search_rx: Option<mpsc::Receiver<(u64, Result<Vec<Episode>>)>>,
    search_generation: u64,
    pub favorites: HashSet<String>,
    pub learned: HashSet<String>,
    status_rx: Option<mpsc::Receiver<Result<(HashSet<String>, HashSet<String>)>>>,
}

impl Library {
    pub fn new(backend: &Backend, page_size: usize) -> Self {
        let mut lib = Library {
            episodes: Vec::new(),
            results: Vec::new(),
            page: 0,
            page_size,
            has_more: true,
            loading: false,
            error: None,
            page_rx: None,
            tab: LibraryTab::All,
            cursor: 0,
            offset: 0,
            search: String::new(),
            search_focus: false,
            debounce: Debouncer::new(SEARCH_DEBOUNCE),
            search_rx: None,
            search_generation: 0,
            favorites: HashSet::new(),
            learned: HashSet::new(),
            status_rx: None,
        };
        lib.request_page(backend);
        let b = backend.clone();
        lib.status_rx = Some(spawn_fetch(move || b.status_sets()));
        lib
    }

    pub fn is_searching(&self) -> bool {
        !self.search.trim().is_empty()
    }

    fn displayed(&self) -> &[Episode] {
        if self.is_searching() {
            &self.results
        } else {
            &self.episodes
        }
    }

    /// Indices into the displayed list that pass the current tab filter.
    pub fn visible(&self) -> Vec<usize> {
        self.displayed()
            .iter()
            .enumerate()
            .filter(|(_, ep)| match self.tab {
                LibraryTab::All => true,
                LibraryTab::Favorites => self.favorites.contains(&ep.id),
                LibraryTab::Learned => self.learned.contains(&ep.id),
            })
            .map(|(i, _)| i)
            .collect()
    }

    pub fn selected(&self) -> Option<&Episode> {
        let visible = self.visible();
        visible.get(self.cursor).map(|&i| &self.displayed()[i])
    }

    fn request_page(&mut self, backend: &Backend) {
        if self.loading || !self.has_more {
            return;
        }
        self.loading = true;
        self.error = None;
        let b = backend.clone();
        let (page, size) = (self.page, self.page_size);
        self.page_rx = Some(spawn_fetch(move || b.episodes_page(page, size)));
    }

    fn request_search(&mut self, backend: &Backend) {
        let term = self.search.trim().to_string();
        if term.is_empty() {
            return;
        }
        self.search_generation += 1;
        let generation = self.search_generation;
        self.loading = true;
        self.error = None;
        let b = backend.clone();
        self.search_rx = Some(spawn_fetch(move || (generation, b.search_episodes(&term))));
    }

    /// Drain background results and fire the pending debounced search.
    pub fn pump(&mut self, backend: &Backend) {
        if let Some(rx) = &self.page_rx {
            if let Ok(result) = rx.try_recv() {
                self.page_rx = None;
                self.loading = false;
                match result {
                    Ok(batch) => {
                        self.has_more = batch.len() >= self.page_size;
                        self.page += 1;
                        self.episodes.extend(batch);
                    }
                    Err(e) => {
                        warn!(error = %e, "episode page fetch failed");
                        self.error = Some(e.to_string());
                    }
                }
            }
        }
        if let Some(rx) = &self.search_rx {
            if let Ok((generation, result)) = rx.try_recv() {
                self.search_rx = None;
                if generation != self.search_generation {
                    debug!(generation, "dropping stale episode search response");
                } else {
                    self.loading = false;
                    match result {
                        Ok(found) => {
                            self.results = found;
                            self.cursor = 0;
                            self.offset = 0;
                        }
                        Err(e) => {
                            warn!(error = %e, "episode search failed");
                            self.error = Some(e.to_string());
                        }
                    }
                }
            }
        }
        if let Some(rx) = &self.status_rx {
            if let Ok(result) = rx.try_recv() {
                self.status_rx = None;
                match result {
                    Ok((favorites, learned)) => {
                        self.favorites = favorites;
                        self.learned = learned;
                    }
                    Err(e) => warn!(error = %e, "status fetch failed"),
                }
            }
        }
        if self.debounce.ready() {
            if self.is_searching() {
                self.request_search(backend);
            } else {
                // search box emptied: paged list comes back untouched, and
                // any in-flight search result is now stale
                self.search_generation += 1;
                self.results.clear();
                self.cursor = 0;
                self.offset = 0;
                self.loading = self.page_rx.is_some();
            }
        }
    }

    pub fn set_favorite(&mut self, episode_id: &str, on: bool) {
        if on {
            self.favorites.insert(episode_id.to_string());
        } else {
            self.favorites.remove(episode_id);
        }
    }

    pub fn set_learned(&mut self, episode_id: &str, on: bool) {
        if on {
            self.learned.insert(episode_id.to_string());
        } else {
            self.learned.remove(episode_id);
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent, backend: &Backend) -> Option<LibraryAction> {
        if self.search_focus {
            match key.code {
                KeyCode::Char(c) => {
                    self.search.push(c);
                    self.debounce.schedule();
                }
                KeyCode::Backspace => {
                    self.search.pop();
                    self.debounce.schedule();
                }
                KeyCode::Esc => {
                    self.search.clear();
                    self.search_focus = false;
                    self.debounce.cancel();
                    self.results.clear();
                    self.cursor = 0;
                    self.offset = 0;
                }
                KeyCode::Enter => self.search_focus = false,
                _ => {}
            }
            return None;
        }

        match key.code {
            KeyCode::Char('j') | KeyCode::Down => self.move_cursor(1, backend),
            KeyCode::Char('k') | KeyCode::Up => self.move_cursor(-1, backend),
            KeyCode::Char('g') => {
                self.cursor = 0;
                self.offset = 0;
            }
            KeyCode::Tab => {
                self.tab = self.tab.next();
                self.cursor = 0;
                self.offset = 0;
            }
            KeyCode::Char('/') => self.search_focus = true,
            KeyCode::Char('v') => return Some(LibraryAction::OpenVocabulary),
            KeyCode::Enter => {
                if let Some(ep) = self.selected() {
                    return Some(LibraryAction::Open(ep.clone()));
                }
            }
            _ => {}
        }
        None
    }

    pub fn scroll(&mut self, delta: isize, backend: &Backend) {
        self.move_cursor(delta, backend);
    }

    fn move_cursor(&mut self, delta: isize, backend: &Backend) {
        let visible = self.visible();
        if visible.is_empty() {
            self.cursor = 0;
            return;
        }
        let max = visible.len() - 1;
        self.cursor = (self.cursor as isize + delta).clamp(0, max as isize) as usize;
        if !self.is_searching() && self.cursor + LOAD_MORE_MARGIN >= visible.len() {
            self.request_page(backend);
        }
    }

    /// Episode under a mouse click in the list area, if any.
    pub fn episode_at(&self, area: Rect, x: u16, y: u16) -> Option<Episode> {
        let inner_y = area.y + 1;
        let inner_h = area.height.saturating_sub(2);
        if x <= area.x || x >= area.x + area.width.saturating_sub(1) {
            return None;
        }
        if y < inner_y || y >= inner_y + inner_h {
            return None;
        }
        let card = self.offset + ((y - inner_y) as usize) / CARD_ROWS;
        let visible = self.visible();
        let &idx = visible.get(card)?;
        Some(self.displayed()[idx].clone())
    }
}

pub fn draw_library(frame: &mut Frame, area: Rect, lib: &mut Library, theme: &Theme) -> Rect {
    let chunks = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Min(4),
    ])
    .split(area);

    // Title + tabs
    let mut spans = vec![
        Span::styled(
            " LISTENING ",
            Style::default().fg(Color::Black).bg(theme.accent),
        ),
        Span::raw("   "),
    ];
    for tab in [LibraryTab::All, LibraryTab::Favorites, LibraryTab::Learned] {
        let style = if tab == lib.tab {
            Style::default()
                .fg(Color::Black)
                .bg(theme.secondary)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme.dimmed)
        };
        spans.push(Span::styled(format!(" {} ", tab.label()), style));
        spans.push(Span::raw(" "));
    }
    let header = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded),
    );
    frame.render_widget(header, chunks[0]);

    // Search box
    let (search_text, search_style) = if lib.search.is_empty() && !lib.search_focus {
        (
            "press / to search by title".to_string(),
            Style::default().fg(theme.dimmed),
        )
    } else {
        let caret = if lib.search_focus { "▏" } else { "" };
        (
            format!("{}{caret}", lib.search),
            Style::default().fg(theme.text),
        )
    };
    let search_border = if lib.search_focus {
        Style::default().fg(theme.accent)
    } else {
        Style::default().fg(theme.dimmed)
    };
    let search = Paragraph::new(search_text).style(search_style).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(search_border)
            .title(" Search "),
    );
    frame.render_widget(search, chunks[1]);

    // Episode cards
    let list_area = chunks[2];
    let footer = if lib.loading {
        "Loading..."
    } else if let Some(err) = &lib.error {
        err.as_str()
    } else if lib.is_searching() {
        "search results"
    } else if lib.has_more {
        "scroll to load more"
    } else {
        "all loaded"
    };
    let footer_style = if lib.error.is_some() {
        Style::default().fg(theme.negative)
    } else {
        Style::default().fg(theme.dimmed)
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(" Episodes ")
        .title_bottom(Line::styled(format!(" {footer} "), footer_style).alignment(Alignment::Right));
    let inner = block.inner(list_area);
    frame.render_widget(block, list_area);

    let visible = lib.visible();
    if visible.is_empty() {
        let msg = if lib.loading {
            "Loading episodes..."
        } else {
            "No episodes to show."
        };
        frame.render_widget(
            Paragraph::new(msg).style(Style::default().fg(theme.dimmed)),
            inner,
        );
        return list_area;
    }

    let rows_per_screen = (inner.height as usize / CARD_ROWS).max(1);
    if lib.cursor < lib.offset {
        lib.offset = lib.cursor;
    } else if lib.cursor >= lib.offset + rows_per_screen {
        lib.offset = lib.cursor + 1 - rows_per_screen;
    }

    let mut lines: Vec<Line> = Vec::with_capacity(inner.height as usize);
    for (slot, &idx) in visible.iter().enumerate().skip(lib.offset) {
        if lines.len() >= inner.height as usize {
            break;
        }
        let ep = &lib.displayed()[idx];
        let selected = slot == lib.cursor;
        let marker = if selected { "> " } else { "  " };
        let title_style = if selected {
            Style::default().fg(theme.text).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme.text)
        };
        let mut title_spans = vec![
            Span::styled(marker, Style::default().fg(theme.accent)),
            Span::styled(ep.title.clone(), title_style),
        ];
        if lib.favorites.contains(&ep.id) {
            title_spans.push(Span::styled("  ♥", Style::default().fg(theme.negative)));
        }
        if lib.learned.contains(&ep.id) {
            title_spans.push(Span::styled("  ✓", Style::default().fg(theme.positive)));
        }
        lines.push(Line::from(title_spans));
        let desc = ep.description.clone().unwrap_or_default();
        let max = inner.width.saturating_sub(4) as usize;
        let desc: String = if desc.chars().count() > max {
            let mut s: String = desc.chars().take(max.saturating_sub(1)).collect();
            s.push('…');
            s
        } else {
            desc
        };
        lines.push(Line::from(vec![
            Span::raw("  "),
            Span::styled(desc, Style::default().fg(theme.dimmed)),
        ]));
        lines.push(Line::raw(""));
    }
    lines.truncate(inner.height as usize);
    frame.render_widget(Paragraph::new(lines), inner);
    list_area
}
