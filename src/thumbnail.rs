use std::{fs, path::PathBuf, sync::mpsc};

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Color,
    widgets::Widget,
};

use crate::config::{cache_hash, config_dir};

pub const THUMB_ROWS: u16 = 4;
pub const THUMB_COLS: u16 = THUMB_ROWS * 2; // 2 cols per row for square aspect

/// Thumbnail pixel grid: rows of (R, G, B) tuples, two pixel rows per cell.
pub type ThumbPixels = Vec<Vec<(u8, u8, u8)>>;

fn thumb_cache_path(url: &str) -> PathBuf {
    config_dir().join("cache").join("thumbs").join(cache_hash(url))
}

fn fetch_thumbnail(url: &str, cols: u16, rows: u16) -> Option<ThumbPixels> {
    let cache_path = thumb_cache_path(url);
    let bytes = if let Ok(cached) = fs::read(&cache_path) {
        cached
    } else {
        let downloaded = ureq::get(url).call().ok()?.body_mut().read_to_vec().ok()?;
        if let Some(parent) = cache_path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        let _ = fs::write(&cache_path, &downloaded);
        downloaded
    };
    let img = image::load_from_memory(&bytes).ok()?;
    let px_w = cols as u32;
    let px_h = (rows as u32) * 2; // half-block = 2 pixels per row
    let resized = img.resize_exact(px_w, px_h, image::imageops::FilterType::Lanczos3);
    let rgb = resized.to_rgb8();
    let mut pixels = Vec::with_capacity(px_h as usize);
    for y in 0..px_h {
        let mut row = Vec::with_capacity(px_w as usize);
        for x in 0..px_w {
            let p = rgb.get_pixel(x, y);
            row.push((p[0], p[1], p[2]));
        }
        pixels.push(row);
    }
    Some(pixels)
}

pub fn spawn_thumb_fetch(url: String) -> mpsc::Receiver<ThumbPixels> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        if let Some(pixels) = fetch_thumbnail(&url, THUMB_COLS, THUMB_ROWS) {
            let _ = tx.send(pixels);
        }
    });
    rx
}

/// Half-block episode thumbnail. Each cell renders two vertically stacked
/// pixels via `▀` with fg = top pixel, bg = bottom pixel.
pub struct ThumbWidget<'a> {
    pixels: &'a ThumbPixels,
}

impl<'a> ThumbWidget<'a> {
    pub fn new(pixels: &'a ThumbPixels) -> Self {
        ThumbWidget { pixels }
    }
}

impl Widget for ThumbWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let pixel_rows = self.pixels.len();
        let art_rows = pixel_rows / 2;
        let art_cols = self.pixels.first().map(|r| r.len()).unwrap_or(0);
        let rows = (area.height as usize).min(art_rows);
        let cols = (area.width as usize).min(art_cols);
        for cy in 0..rows {
            let top_y = cy * 2;
            let bot_y = top_y + 1;
            for cx in 0..cols {
                let top = self.pixels[top_y][cx];
                let bot = self.pixels.get(bot_y).map(|r| r[cx]).unwrap_or(top);
                let x = area.x + cx as u16;
                let y = area.y + cy as u16;
                buf[(x, y)]
                    .set_char('▀')
                    .set_fg(Color::Rgb(top.0, top.1, top.2))
                    .set_bg(Color::Rgb(bot.0, bot.1, bot.2));
            }
        }
    }
}
