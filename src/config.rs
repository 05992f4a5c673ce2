use std::{fs, path::PathBuf, sync::Mutex};

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

pub fn config_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("lingopod")
}

/// Stable cache key for a URL (FNV-1a, hex).
pub fn cache_hash(s: &str) -> String {
    let mut h: u64 = 0xcbf2_9ce4_8422_2325;
    for b in s.bytes() {
        h ^= b as u64;
        h = h.wrapping_mul(0x0000_0100_0000_01b3);
    }
    format!("{h:016x}")
}

const EXAMPLE_CONFIG: &str = "\
# lingopod configuration
backend_url = \"https://YOUR-PROJECT.supabase.co\"
api_key = \"YOUR-ANON-KEY\"
user_id = \"YOUR-USER-UUID\"
";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub backend_url: String,
    pub api_key: String,
    pub user_id: String,
    #[serde(default = "default_episode_page_size")]
    pub episode_page_size: usize,
    #[serde(default = "default_vocab_page_size")]
    pub vocab_page_size: usize,
}

fn default_episode_page_size() -> usize {
    20
}

fn default_vocab_page_size() -> usize {
    10
}

impl Config {
    pub fn load() -> Result<Config> {
        let path = config_dir().join("config.toml");
        if !path.exists() {
            fs::create_dir_all(config_dir()).ok();
            fs::write(&path, EXAMPLE_CONFIG).ok();
            bail!(
                "no configuration found; wrote a template to {}, fill in your backend credentials",
                path.display()
            );
        }
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Config =
            toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
        if config.backend_url.contains("YOUR-PROJECT") {
            bail!("{} still holds template values", path.display());
        }
        Ok(config)
    }
}

/// The terminal belongs to ratatui, so logs go to a file under the config dir.
/// RUST_LOG is honored; default level is info.
pub fn init_logging() -> Result<()> {
    let dir = config_dir();
    fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
    let file = fs::File::create(dir.join("lingopod.log")).context("opening log file")?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_hash_is_stable_and_hex() {
        let a = cache_hash("https://cdn.example.com/ep001.mp3");
        let b = cache_hash("https://cdn.example.com/ep001.mp3");
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, cache_hash("https://cdn.example.com/ep002.mp3"));
    }

    #[test]
    fn config_defaults_apply() {
        let config: Config = toml::from_str(
            "backend_url = \"https://x.supabase.co\"\napi_key = \"k\"\nuser_id = \"u\"\n",
        )
        .unwrap();
        assert_eq!(config.episode_page_size, 20);
        assert_eq!(config.vocab_page_size, 10);
    }
}
