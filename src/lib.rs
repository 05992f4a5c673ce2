pub mod api;
pub mod config;
pub mod controls;
pub mod debounce;
pub mod episode;
pub mod follow;
pub mod gauge;
pub mod library;
pub mod models;
pub mod player;
pub mod progress;
pub mod sync;
pub mod theme;
pub mod thumbnail;
pub mod transcript;
pub mod vocab;

pub use api::Backend;
pub use config::Config;
