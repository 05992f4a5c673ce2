use std::fs;

use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
};

use crate::config::config_dir;

pub struct Theme {
    pub name: &'static str,
    pub accent: Color,
    pub secondary: Color,
    pub positive: Color,
    pub negative: Color,
    pub text: Color,
    pub dimmed: Color,
}

pub const THEMES: &[Theme] = &[
    Theme {
        name: "Fern",
        accent: Color::Rgb(27, 94, 32),
        secondary: Color::Rgb(251, 192, 45),
        positive: Color::Rgb(104, 159, 56),
        negative: Color::Rgb(211, 47, 47),
        text: Color::White,
        dimmed: Color::DarkGray,
    },
    Theme {
        name: "Dracula",
        accent: Color::Rgb(189, 147, 249),
        secondary: Color::Rgb(255, 121, 198),
        positive: Color::Rgb(80, 250, 123),
        negative: Color::Rgb(255, 85, 85),
        text: Color::White,
        dimmed: Color::DarkGray,
    },
    Theme {
        name: "Nord",
        accent: Color::Rgb(136, 192, 208),
        secondary: Color::Rgb(235, 203, 139),
        positive: Color::Rgb(163, 190, 140),
        negative: Color::Rgb(191, 97, 106),
        text: Color::White,
        dimmed: Color::DarkGray,
    },
    Theme {
        name: "Gruvbox",
        accent: Color::Rgb(214, 153, 62),
        secondary: Color::Rgb(250, 189, 47),
        positive: Color::Rgb(152, 151, 26),
        negative: Color::Rgb(204, 36, 29),
        text: Color::White,
        dimmed: Color::DarkGray,
    },
    Theme {
        name: "Catppuccin",
        accent: Color::Rgb(203, 166, 247),
        secondary: Color::Rgb(249, 226, 175),
        positive: Color::Rgb(166, 227, 161),
        negative: Color::Rgb(243, 139, 168),
        text: Color::White,
        dimmed: Color::DarkGray,
    },
    Theme {
        name: "Solarized",
        accent: Color::Rgb(38, 139, 210),
        secondary: Color::Rgb(181, 137, 0),
        positive: Color::Rgb(133, 153, 0),
        negative: Color::Rgb(220, 50, 47),
        text: Color::White,
        dimmed: Color::DarkGray,
    },
];

pub fn load_theme() -> usize {
    fs::read_to_string(config_dir().join("theme"))
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .filter(|&i: &usize| i < THEMES.len())
        .unwrap_or(0)
}

pub fn save_theme(index: usize) {
    let dir = config_dir();
    let _ = fs::create_dir_all(&dir);
    let _ = fs::write(dir.join("theme"), format!("{index}"));
}

pub fn draw_theme_selector(frame: &mut Frame, selected: usize) {
    let area = frame.area();
    let popup_w = 38u16.min(area.width);
    let popup_h = (THEMES.len() as u16 + 2).min(area.height);
    let popup_x = area.width.saturating_sub(popup_w) / 2;
    let popup_y = area.height.saturating_sub(popup_h) / 2;
    let popup_area = Rect::new(popup_x, popup_y, popup_w, popup_h);

    frame.render_widget(Clear, popup_area);

    let theme = &THEMES[selected];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.accent))
        .title(" Theme ")
        .title_bottom(" ↑/↓ Select  Enter Apply  Esc Close ");

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let mut lines: Vec<Line> = Vec::new();
    for (i, t) in THEMES.iter().enumerate() {
        let is_sel = i == selected;
        let marker = if is_sel { ">> " } else { "   " };
        let name_style = if is_sel {
            Style::default()
                .fg(Color::Black)
                .bg(t.accent)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(t.text)
        };
        lines.push(Line::from(vec![
            Span::styled(marker, Style::default().fg(t.accent)),
            Span::styled(format!("{:<12}", t.name), name_style),
            Span::raw(" "),
            Span::styled("██", Style::default().fg(t.accent)),
            Span::raw(" "),
            Span::styled("██", Style::default().fg(t.secondary)),
            Span::raw(" "),
            Span::styled("██", Style::default().fg(t.positive)),
            Span::raw(" "),
            Span::styled("██", Style::default().fg(t.negative)),
        ]));
    }

    frame.render_widget(Paragraph::new(lines), inner);
}
