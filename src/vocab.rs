use std::{sync::mpsc, time::Duration};

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
};
use tracing::{debug, warn};

use crate::api::{Backend, Load, VocabDraft, spawn_fetch};
use crate::debounce::Debouncer;
use crate::models::{UserVocabEntry, VocabEntry};
use crate::theme::Theme;

const SEARCH_DEBOUNCE: Duration = Duration::from_millis(400);
const ENTRY_ROWS: usize = 3;
const FORM_FIELDS: usize = 3;

/// Add/edit popup for a user vocabulary row.
pub struct VocabForm {
    pub word: String,
    pub definition: String,
    pub example: String,
    pub field: usize,
    pub editing: Option<String>,
    pub error: Option<String>,
}

impl VocabForm {
    fn blank() -> Self {
        VocabForm {
            word: String::new(),
            definition: String::new(),
            example: String::new(),
            field: 0,
            editing: None,
            error: None,
        }
    }

    fn for_entry(entry: &UserVocabEntry) -> Self {
        VocabForm {
            word: entry.word.clone(),
            definition: entry.definition.clone(),
            example: entry.example.clone().unwrap_or_default(),
            field: 0,
            editing: Some(entry.id.clone()),
            error: None,
        }
    }

    fn field_mut(&mut self) -> &mut String {
        match self.field {
            0 => &mut self.word,
            1 => &mut self.definition,
            _ => &mut self.example,
        }
    }
}

pub struct ConfirmDelete {
    pub entry: UserVocabEntry,
    pub deleting: bool,
}

/// User + system vocabulary. With an episode scope this is the episode's
/// Vocabulary tab; without one it is the global vocabulary screen with
/// search and paging.
pub struct VocabPane {
    scope: Option<(String, String)>,
    pub user: Load<Vec<UserVocabEntry>>,
    pub system: Load<Vec<VocabEntry>>,
    user_rx: Option<mpsc::Receiver<(u64, Result<Vec<UserVocabEntry>>)>>,
    system_rx: Option<mpsc::Receiver<(u64, Result<Vec<VocabEntry>>)>>,
    generation: u64,
    page: usize,
    page_size: usize,
    has_more: bool,
    appending: bool,
    pub cursor: usize,
    offset: usize,
    pub search: String,
    pub search_focus: bool,
    debounce: Debouncer,
    pub form: Option<VocabForm>,
    pub confirm: Option<ConfirmDelete>,
    pub saving: bool,
    save_rx: Option<mpsc::Receiver<Result<()>>>,
    delete_rx: Option<mpsc::Receiver<Result<()>>>,
}

impl VocabPane {
    /// Vocabulary tab for one episode. Loads the user's rows for it and the
    /// episode's system vocabulary.
    pub fn for_episode(backend: &Backend, episode_id: &str, title: &str, page_size: usize) -> Self {
        let mut pane = Self::bare(Some((episode_id.to_string(), title.to_string())), page_size);
        pane.reload_user(backend);
        let b = backend.clone();
        let id = episode_id.to_string();
        let generation = pane.generation;
        pane.system = Load::Loading;
        pane.system_rx = Some(spawn_fetch(move || (generation, b.episode_vocab(&id))));
        pane
    }

    /// Global vocabulary screen across all episodes.
    pub fn global(backend: &Backend, page_size: usize) -> Self {
        let mut pane = Self::bare(None, page_size);
        pane.reload_user(backend);
        pane
    }

    fn bare(scope: Option<(String, String)>, page_size: usize) -> Self {
        VocabPane {
            scope,
            user: Load::Loading,
            system: Load::Ready(Vec::new()),
            user_rx: None,
            system_rx: None,
            generation: 0,
            page: 0,
            page_size,
            has_more: false,
            appending: false,
            cursor: 0,
            offset: 0,
            search: String::new(),
            search_focus: false,
            debounce: Debouncer::new(SEARCH_DEBOUNCE),
            form: None,
            confirm: None,
            saving: false,
            save_rx: None,
            delete_rx: None,
        }
    }

    pub fn is_global(&self) -> bool {
        self.scope.is_none()
    }

    /// Popup or text input currently swallowing keys (playback shortcuts
    /// must stay inert while one is up).
    pub fn input_active(&self) -> bool {
        self.form.is_some() || self.confirm.is_some() || self.search_focus
    }

    fn reload_user(&mut self, backend: &Backend) {
        self.generation += 1;
        self.page = 0;
        self.appending = false;
        self.user = Load::Loading;
        let generation = self.generation;
        let b = backend.clone();
        let episode = self.scope.as_ref().map(|(id, _)| id.clone());
        let search = self.search.clone();
        let size = self.page_size;
        self.user_rx = Some(spawn_fetch(move || {
            (generation, b.user_vocab_page(episode.as_deref(), &search, 0, size))
        }));
    }

    fn request_next_page(&mut self, backend: &Backend) {
        if !self.has_more || self.user_rx.is_some() {
            return;
        }
        self.appending = true;
        let generation = self.generation;
        let b = backend.clone();
        let episode = self.scope.as_ref().map(|(id, _)| id.clone());
        let search = self.search.clone();
        let (page, size) = (self.page + 1, self.page_size);
        self.user_rx = Some(spawn_fetch(move || {
            (generation, b.user_vocab_page(episode.as_deref(), &search, page, size))
        }));
    }

    pub fn pump(&mut self, backend: &Backend) {
        if let Some(rx) = &self.user_rx {
            if let Ok((generation, result)) = rx.try_recv() {
                self.user_rx = None;
                if generation != self.generation {
                    debug!(generation, "dropping stale vocabulary response");
                } else {
                    match result {
                        Ok(batch) => {
                            self.has_more = batch.len() >= self.page_size;
                            if self.appending {
                                self.page += 1;
                                if let Load::Ready(items) = &mut self.user {
                                    items.extend(batch);
                                }
                            } else {
                                self.user = Load::Ready(batch);
                                self.cursor = 0;
                                self.offset = 0;
                            }
                        }
                        Err(e) => {
                            warn!(error = %e, "vocabulary fetch failed");
                            if !self.appending {
                                self.user = Load::Failed(e.to_string());
                            }
                        }
                    }
                    self.appending = false;
                }
            }
        }
        if let Some(rx) = &self.system_rx {
            if let Ok((generation, result)) = rx.try_recv() {
                self.system_rx = None;
                if generation == self.generation {
                    self.system = match result {
                        Ok(items) => Load::Ready(items),
                        Err(e) => {
                            warn!(error = %e, "system vocabulary fetch failed");
                            Load::Failed(e.to_string())
                        }
                    };
                }
            }
        }
        if let Some(rx) = &self.save_rx {
            if let Ok(result) = rx.try_recv() {
                self.save_rx = None;
                self.saving = false;
                match result {
                    Ok(()) => {
                        self.form = None;
                        self.reload_user(backend);
                    }
                    Err(e) => {
                        warn!(error = %e, "saving vocabulary failed");
                        if let Some(form) = &mut self.form {
                            form.error = Some(e.to_string());
                        }
                    }
                }
            }
        }
        if let Some(rx) = &self.delete_rx {
            if let Ok(result) = rx.try_recv() {
                self.delete_rx = None;
                match result {
                    Ok(()) => {
                        self.confirm = None;
                        self.reload_user(backend);
                    }
                    Err(e) => {
                        warn!(error = %e, "deleting vocabulary failed");
                        self.confirm = None;
                    }
                }
            }
        }
        if self.debounce.ready() {
            self.reload_user(backend);
        }
    }

    fn user_items(&self) -> &[UserVocabEntry] {
        self.user.ready().map(|v| v.as_slice()).unwrap_or(&[])
    }

    fn selected(&self) -> Option<&UserVocabEntry> {
        self.user_items().get(self.cursor)
    }

    fn submit_form(&mut self, backend: &Backend) {
        let Some(form) = &mut self.form else {
            return;
        };
        if form.word.trim().is_empty() || form.definition.trim().is_empty() {
            form.error = Some("word and definition are required".to_string());
            return;
        }
        let draft = VocabDraft {
            word: form.word.clone(),
            definition: form.definition.clone(),
            example: form.example.clone(),
            episode: self.scope.clone(),
        };
        let editing = form.editing.clone();
        self.saving = true;
        let b = backend.clone();
        self.save_rx = Some(spawn_fetch(move || match editing {
            Some(id) => b.update_user_vocab(&id, &draft),
            None => b.insert_user_vocab(&draft),
        }));
    }

    /// Returns true when the key was consumed.
    pub fn handle_key(&mut self, key: KeyEvent, backend: &Backend) -> bool {
        if self.saving {
            return true;
        }
        if self.confirm.is_some() {
            match key.code {
                KeyCode::Char('y') | KeyCode::Enter => {
                    if let Some(confirm) = &mut self.confirm {
                        if !confirm.deleting {
                            confirm.deleting = true;
                            let id = confirm.entry.id.clone();
                            let b = backend.clone();
                            self.delete_rx =
                                Some(spawn_fetch(move || b.delete_user_vocab(&id)));
                        }
                    }
                }
                KeyCode::Char('n') | KeyCode::Esc => self.confirm = None,
                _ => {}
            }
            return true;
        }
        if self.form.is_some() {
            match key.code {
                KeyCode::Esc => self.form = None,
                KeyCode::Enter => self.submit_form(backend),
                code => {
                    if let Some(form) = &mut self.form {
                        match code {
                            KeyCode::Tab | KeyCode::Down => {
                                form.field = (form.field + 1) % FORM_FIELDS
                            }
                            KeyCode::BackTab | KeyCode::Up => {
                                form.field = (form.field + FORM_FIELDS - 1) % FORM_FIELDS
                            }
                            KeyCode::Backspace => {
                                form.field_mut().pop();
                            }
                            KeyCode::Char(c) => form.field_mut().push(c),
                            _ => {}
                        }
                    }
                }
            }
            return true;
        }
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
                    self.reload_user(backend);
                }
                KeyCode::Enter => self.search_focus = false,
                _ => {}
            }
            return true;
        }

        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                let len = self.user_items().len();
                if len > 0 {
                    self.cursor = (self.cursor + 1).min(len - 1);
                    if self.is_global() && self.cursor + 3 >= len {
                        self.request_next_page(backend);
                    }
                }
                true
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.cursor = self.cursor.saturating_sub(1);
                true
            }
            KeyCode::Char('a') => {
                self.form = Some(VocabForm::blank());
                true
            }
            KeyCode::Char('e') => {
                if let Some(entry) = self.selected() {
                    self.form = Some(VocabForm::for_entry(entry));
                }
                true
            }
            KeyCode::Char('d') => {
                if let Some(entry) = self.selected() {
                    self.confirm = Some(ConfirmDelete {
                        entry: entry.clone(),
                        deleting: false,
                    });
                }
                true
            }
            KeyCode::Char('/') if self.is_global() => {
                self.search_focus = true;
                true
            }
            _ => false,
        }
    }
}

fn entry_lines<'a>(
    word: &'a str,
    definition: &'a str,
    example: Option<&'a str>,
    note: Option<&'a str>,
    highlighted: bool,
    theme: &Theme,
) -> Vec<Line<'a>> {
    let word_style = if highlighted {
        Style::default()
            .fg(theme.secondary)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(theme.text).add_modifier(Modifier::BOLD)
    };
    let marker = if highlighted { "> " } else { "  " };
    let mut first = vec![
        Span::styled(marker, Style::default().fg(theme.secondary)),
        Span::styled(word, word_style),
        Span::styled("  —  ", Style::default().fg(theme.dimmed)),
        Span::styled(definition, Style::default().fg(theme.text)),
    ];
    if let Some(note) = note {
        first.push(Span::styled(
            format!("   [{note}]"),
            Style::default().fg(theme.dimmed),
        ));
    }
    let second = match example {
        Some(ex) if !ex.is_empty() => Line::from(vec![
            Span::raw("    "),
            Span::styled(format!("“{ex}”"), Style::default().fg(theme.dimmed)),
        ]),
        _ => Line::raw(""),
    };
    vec![Line::from(first), second, Line::raw("")]
}

/// Composed rows of the pane: optional section headers plus 3 rows per entry.
fn compose_lines<'a>(pane: &'a VocabPane, theme: &Theme) -> Vec<Line<'a>> {
    let mut lines: Vec<Line> = Vec::new();
    let header_style = Style::default()
        .fg(theme.positive)
        .add_modifier(Modifier::BOLD);

    if !pane.is_global() {
        lines.push(Line::styled("Your Vocabulary  (a add, e edit, d delete)", header_style));
    }
    match &pane.user {
        Load::Loading => lines.push(Line::styled(
            "  Loading...",
            Style::default().fg(theme.dimmed),
        )),
        Load::Failed(e) => lines.push(Line::styled(
            format!("  {e}"),
            Style::default().fg(theme.negative),
        )),
        Load::Ready(items) if items.is_empty() => lines.push(Line::styled(
            "  No personal vocabulary yet.",
            Style::default().fg(theme.dimmed),
        )),
        Load::Ready(items) => {
            for (i, entry) in items.iter().enumerate() {
                let note = if pane.is_global() {
                    entry.episode_title.as_deref()
                } else {
                    None
                };
                lines.extend(entry_lines(
                    &entry.word,
                    &entry.definition,
                    entry.example.as_deref(),
                    note,
                    i == pane.cursor,
                    theme,
                ));
            }
        }
    }

    if !pane.is_global() {
        lines.push(Line::styled("Episode's Vocabulary", header_style));
        match &pane.system {
            Load::Loading => lines.push(Line::styled(
                "  Loading...",
                Style::default().fg(theme.dimmed),
            )),
            Load::Failed(e) => lines.push(Line::styled(
                format!("  {e}"),
                Style::default().fg(theme.negative),
            )),
            Load::Ready(items) if items.is_empty() => lines.push(Line::styled(
                "  No system vocabulary available.",
                Style::default().fg(theme.dimmed),
            )),
            Load::Ready(items) => {
                for entry in items {
                    lines.extend(entry_lines(
                        &entry.word,
                        &entry.definition,
                        entry.example.as_deref(),
                        None,
                        false,
                        theme,
                    ));
                }
            }
        }
    }
    lines
}

pub fn draw_vocab(frame: &mut Frame, area: Rect, pane: &mut VocabPane, theme: &Theme) {
    let (search_area, list_area) = if pane.is_global() {
        let chunks =
            Layout::vertical([Constraint::Length(3), Constraint::Min(4)]).split(area);
        (Some(chunks[0]), chunks[1])
    } else {
        (None, area)
    };

    if let Some(search_area) = search_area {
        let text = if pane.search.is_empty() && !pane.search_focus {
            "press / to search your words".to_string()
        } else {
            let caret = if pane.search_focus { "▏" } else { "" };
            format!("{}{caret}", pane.search)
        };
        let style = if pane.search.is_empty() && !pane.search_focus {
            Style::default().fg(theme.dimmed)
        } else {
            Style::default().fg(theme.text)
        };
        let border = if pane.search_focus {
            Style::default().fg(theme.accent)
        } else {
            Style::default().fg(theme.dimmed)
        };
        frame.render_widget(
            Paragraph::new(text).style(style).block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded)
                    .border_style(border)
                    .title(" Search "),
            ),
            search_area,
        );
    }

    let mut block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(" Vocabulary ");
    if pane.is_global() && pane.has_more {
        block = block.title_bottom(
            Line::styled(" scroll to load more ", Style::default().fg(theme.dimmed))
                .alignment(Alignment::Right),
        );
    }
    let inner = block.inner(list_area);
    frame.render_widget(block, list_area);
    if inner.height == 0 {
        return;
    }

    // keep the cursor's entry on screen
    let cursor_row = if pane.is_global() { 0 } else { 1 } + pane.cursor * ENTRY_ROWS;
    let height = inner.height as usize;
    if cursor_row < pane.offset {
        pane.offset = cursor_row;
    } else if cursor_row + ENTRY_ROWS > pane.offset + height {
        pane.offset = cursor_row + ENTRY_ROWS - height;
    }

    let lines = compose_lines(pane, theme);
    let visible: Vec<Line> = lines
        .into_iter()
        .skip(pane.offset)
        .take(height)
        .collect();
    frame.render_widget(Paragraph::new(visible), inner);

    if pane.form.is_some() {
        draw_form(frame, pane, theme);
    }
    if pane.confirm.is_some() {
        draw_confirm(frame, pane, theme);
    }
    if pane.saving {
        draw_saving(frame, theme);
    }
}

fn popup_area(frame: &Frame, width: u16, height: u16) -> Rect {
    let area = frame.area();
    let w = width.min(area.width);
    let h = height.min(area.height);
    Rect::new(
        area.width.saturating_sub(w) / 2,
        area.height.saturating_sub(h) / 2,
        w,
        h,
    )
}

fn draw_form(frame: &mut Frame, pane: &VocabPane, theme: &Theme) {
    let Some(form) = &pane.form else {
        return;
    };
    let popup = popup_area(frame, 48, 11);
    frame.render_widget(Clear, popup);
    let title = if form.editing.is_some() {
        " Edit Word "
    } else {
        " Add Word "
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.accent))
        .title(title)
        .title_bottom(" Tab Next  Enter Save  Esc Cancel ");
    let inner = block.inner(popup);
    frame.render_widget(block, popup);

    let mut lines: Vec<Line> = Vec::new();
    for (i, (label, value)) in [
        ("Word", &form.word),
        ("Definition", &form.definition),
        ("Example", &form.example),
    ]
    .into_iter()
    .enumerate()
    {
        let focused = i == form.field;
        let label_style = if focused {
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme.dimmed)
        };
        let caret = if focused { "▏" } else { "" };
        lines.push(Line::styled(format!("{label}:"), label_style));
        lines.push(Line::styled(
            format!("  {value}{caret}"),
            Style::default().fg(theme.text),
        ));
        lines.push(Line::raw(""));
    }
    if let Some(err) = &form.error {
        lines.push(Line::styled(
            err.as_str(),
            Style::default().fg(theme.negative),
        ));
    }
    frame.render_widget(Paragraph::new(lines), inner);
}

fn draw_confirm(frame: &mut Frame, pane: &VocabPane, theme: &Theme) {
    let Some(confirm) = &pane.confirm else {
        return;
    };
    let popup = popup_area(frame, 44, 5);
    frame.render_widget(Clear, popup);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.negative))
        .title(" Delete Word ");
    let inner = block.inner(popup);
    frame.render_widget(block, popup);
    let lines = if confirm.deleting {
        vec![Line::styled(
            "Deleting...",
            Style::default().fg(theme.dimmed),
        )]
    } else {
        vec![
            Line::from(vec![
                Span::raw("Delete "),
                Span::styled(
                    confirm.entry.word.clone(),
                    Style::default().fg(theme.text).add_modifier(Modifier::BOLD),
                ),
                Span::raw("?"),
            ]),
            Line::raw(""),
            Line::styled("y delete   n keep", Style::default().fg(theme.dimmed)),
        ]
    };
    frame.render_widget(Paragraph::new(lines), inner);
}

fn draw_saving(frame: &mut Frame, theme: &Theme) {
    let popup = popup_area(frame, 16, 3);
    frame.render_widget(Clear, popup);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.accent));
    let inner = block.inner(popup);
    frame.render_widget(block, popup);
    frame.render_widget(
        Paragraph::new("Saving...").style(Style::default().fg(theme.dimmed)),
        inner,
    );
}
