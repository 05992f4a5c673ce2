use std::{io, time::Duration};

use anyhow::Result;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
};
use ratatui::{DefaultTerminal, Frame, layout::Constraint, layout::Layout, layout::Rect};
use tracing::info;

use lingopod::api::Backend;
use lingopod::config::{self, Config};
use lingopod::episode::{self, EpisodeAction, EpisodeView, StatusChange, draw_episode};
use lingopod::library::{Library, LibraryAction, draw_library};
use lingopod::models::Episode;
use lingopod::theme::{THEMES, draw_theme_selector, load_theme, save_theme};
use lingopod::vocab::{VocabPane, draw_vocab};
use lingopod::{controls, progress, transcript};

const TICK: Duration = Duration::from_millis(50);

enum Screen {
    Library,
    Episode(Box<EpisodeView>),
    Vocabulary(VocabPane),
}

enum Nav {
    None,
    ToLibrary,
    ToEpisode(Episode),
    ToVocabulary,
}

/// Last-draw hit-testing areas for the mouse handler.
#[derive(Default)]
struct Rects {
    library_list: Option<Rect>,
    transcript: Option<Rect>,
    progress: Option<Rect>,
}

struct App {
    config: Config,
    backend: Backend,
    library: Library,
    screen: Screen,
    theme_index: usize,
    theme_selector: Option<usize>,
    rects: Rects,
    mouse_press: Option<(u16, u16)>,
    quit: bool,
}

fn main() -> Result<()> {
    let config = Config::load()?;
    config::init_logging()?;
    info!(backend = %config.backend_url, "starting lingopod");

    let backend = Backend::new(&config.backend_url, &config.api_key, &config.user_id);
    let library = Library::new(&backend, config.episode_page_size);
    let mut app = App {
        config,
        backend,
        library,
        screen: Screen::Library,
        theme_index: load_theme(),
        theme_selector: None,
        rects: Rects::default(),
        mouse_press: None,
        quit: false,
    };

    let mut terminal = ratatui::init();
    let _ = execute!(io::stdout(), EnableMouseCapture);
    let result = run(&mut terminal, &mut app);
    let _ = execute!(io::stdout(), DisableMouseCapture);
    ratatui::restore();
    result
}

fn run(terminal: &mut DefaultTerminal, app: &mut App) -> Result<()> {
    loop {
        app.pump();
        terminal.draw(|f| draw(f, app))?;
        if event::poll(TICK)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => app.on_key(key),
                Event::Mouse(mouse) => app.on_mouse(mouse),
                _ => {}
            }
        }
        if app.quit {
            break;
        }
    }
    Ok(())
}

impl App {
    fn pump(&mut self) {
        self.library.pump(&self.backend);
        match &mut self.screen {
            Screen::Library => {}
            Screen::Episode(view) => {
                for change in view.pump(&self.backend) {
                    match change {
                        StatusChange::Favorite(on) => {
                            self.library.set_favorite(&view.episode.id, on)
                        }
                        StatusChange::Learned(on) => self.library.set_learned(&view.episode.id, on),
                    }
                }
            }
            Screen::Vocabulary(pane) => pane.pump(&self.backend),
        }
    }

    /// True while a text input or popup owns the keyboard, which suspends
    /// the global shortcuts (and playback keys with them).
    fn typing(&self) -> bool {
        match &self.screen {
            Screen::Library => self.library.search_focus,
            Screen::Episode(view) => view.input_active(),
            Screen::Vocabulary(pane) => pane.input_active(),
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        if self.theme_selector.is_some() {
            self.on_selector_key(key);
            return;
        }
        if !self.typing() {
            match key.code {
                KeyCode::Char('q') => {
                    self.quit = true;
                    return;
                }
                KeyCode::Char('t') => {
                    self.theme_selector = Some(self.theme_index);
                    return;
                }
                _ => {}
            }
        }

        let nav = match &mut self.screen {
            Screen::Library => match self.library.handle_key(key, &self.backend) {
                Some(LibraryAction::Open(ep)) => Nav::ToEpisode(ep),
                Some(LibraryAction::OpenVocabulary) => Nav::ToVocabulary,
                None => Nav::None,
            },
            Screen::Episode(view) => match view.handle_key(key, &self.backend) {
                Some(EpisodeAction::Back) => Nav::ToLibrary,
                None => Nav::None,
            },
            Screen::Vocabulary(pane) => {
                if pane.handle_key(key, &self.backend) {
                    Nav::None
                } else if key.code == KeyCode::Esc {
                    Nav::ToLibrary
                } else {
                    Nav::None
                }
            }
        };
        self.navigate(nav);
    }

    fn navigate(&mut self, nav: Nav) {
        match nav {
            Nav::None => {}
            Nav::ToLibrary => {
                self.rects = Rects::default();
                self.screen = Screen::Library;
            }
            Nav::ToEpisode(ep) => {
                let is_favorite = self.library.favorites.contains(&ep.id);
                let is_learned = self.library.learned.contains(&ep.id);
                self.rects = Rects::default();
                self.screen = Screen::Episode(Box::new(EpisodeView::open(
                    &self.backend,
                    ep,
                    is_favorite,
                    is_learned,
                    self.config.vocab_page_size,
                )));
            }
            Nav::ToVocabulary => {
                self.rects = Rects::default();
                self.screen = Screen::Vocabulary(VocabPane::global(
                    &self.backend,
                    self.config.vocab_page_size,
                ));
            }
        }
    }

    fn on_selector_key(&mut self, key: KeyEvent) {
        let Some(mut sel) = self.theme_selector else {
            return;
        };
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => sel = sel.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => sel = (sel + 1).min(THEMES.len() - 1),
            KeyCode::Enter => {
                self.theme_index = sel;
                save_theme(sel);
                self.theme_selector = None;
                return;
            }
            KeyCode::Esc => {
                self.theme_selector = None;
                return;
            }
            _ => {}
        }
        self.theme_selector = Some(sel);
    }

    fn on_mouse(&mut self, mouse: MouseEvent) {
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                self.mouse_press = Some((mouse.column, mouse.row));
            }
            MouseEventKind::Up(MouseButton::Left) => {
                let press = self.mouse_press.take();
                self.on_click(press, (mouse.column, mouse.row));
            }
            MouseEventKind::ScrollUp => self.on_scroll(-3),
            MouseEventKind::ScrollDown => self.on_scroll(3),
            _ => {}
        }
    }

    fn on_scroll(&mut self, delta: isize) {
        match &mut self.screen {
            Screen::Library => self.library.scroll(delta.signum(), &self.backend),
            Screen::Episode(view) => view.user_scroll(delta),
            Screen::Vocabulary(_) => {}
        }
    }

    fn on_click(&mut self, press: Option<(u16, u16)>, release: (u16, u16)) {
        let Some(press) = press else {
            return;
        };
        let nav = match &mut self.screen {
            Screen::Library => {
                if press == release {
                    if let Some(area) = self.rects.library_list {
                        if let Some(ep) = self.library.episode_at(area, release.0, release.1) {
                            Nav::ToEpisode(ep)
                        } else {
                            Nav::None
                        }
                    } else {
                        Nav::None
                    }
                } else {
                    Nav::None
                }
            }
            Screen::Episode(view) => {
                if let Some(area) = self.rects.transcript {
                    // a drag is a text selection, not a tap; click_target
                    // rejects it
                    if let Some(i) =
                        transcript::click_target(press, release, area, &view.layout, view.follow.offset)
                    {
                        view.activate_segment(i);
                    }
                }
                if press == release {
                    if let Some(area) = self.rects.progress {
                        if let Some(ratio) = progress::seek_ratio_at(area, release.0, release.1) {
                            view.seek_ratio(ratio);
                        }
                    }
                }
                Nav::None
            }
            Screen::Vocabulary(_) => Nav::None,
        };
        self.navigate(nav);
    }

    fn help_entries(&self) -> Vec<(&'static str, &'static str)> {
        match &self.screen {
            Screen::Library => vec![
                ("↑/↓", "Select"),
                ("Enter", "Open"),
                ("Tab", "Filter"),
                ("/", "Search"),
                ("v", "Vocabulary"),
                ("t", "Theme"),
                ("q", "Quit"),
            ],
            Screen::Episode(view) => match view.tab {
                episode::EpisodeTab::Transcript => vec![
                    ("Space", "Play/Pause"),
                    ("←/→", "Skip ±5s"),
                    ("↑/↓", "Scroll"),
                    ("Enter", "Play line"),
                    ("b", "Back to active"),
                    ("f", "Favorite"),
                    ("l", "Learned"),
                    ("Tab", "Vocabulary"),
                    ("Esc", "Library"),
                ],
                episode::EpisodeTab::Vocabulary => vec![
                    ("↑/↓", "Select"),
                    ("a", "Add"),
                    ("e", "Edit"),
                    ("d", "Delete"),
                    ("Space", "Play/Pause"),
                    ("Tab", "Transcripts"),
                    ("Esc", "Library"),
                ],
            },
            Screen::Vocabulary(_) => vec![
                ("↑/↓", "Select"),
                ("/", "Search"),
                ("a", "Add"),
                ("e", "Edit"),
                ("d", "Delete"),
                ("Esc", "Library"),
                ("q", "Quit"),
            ],
        }
    }
}

fn draw(frame: &mut Frame, app: &mut App) {
    let theme = &THEMES[app.theme_index];
    let area = frame.area();
    let entries = app.help_entries();
    let help_h = controls::controls_height(&entries, area.width, theme);
    let chunks = Layout::vertical([Constraint::Min(8), Constraint::Length(help_h)]).split(area);

    match &mut app.screen {
        Screen::Library => {
            app.rects.library_list = Some(draw_library(frame, chunks[0], &mut app.library, theme));
        }
        Screen::Episode(view) => {
            let rects = draw_episode(frame, chunks[0], view.as_mut(), theme);
            app.rects.transcript = rects.transcript;
            app.rects.progress = Some(rects.progress);
        }
        Screen::Vocabulary(pane) => draw_vocab(frame, chunks[0], pane, theme),
    }
    controls::draw_controls(frame, chunks[1], &entries, theme);

    if let Some(sel) = app.theme_selector {
        draw_theme_selector(frame, sel);
    }
}
