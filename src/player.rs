use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::mpsc,
    time::Duration,
};

use anyhow::{Context, Result};
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source};
use symphonia::core::{
    formats::FormatOptions, io::MediaSourceStream, meta::MetadataOptions, probe::Hint,
};
use tracing::{debug, warn};

use crate::api::spawn_fetch;
use crate::config::{cache_hash, config_dir};

/// Discrete notifications out of the playback clock, drained by the UI loop
/// and dispatched to the resolver and scroll-follow. Consumers never read
/// the clock directly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlayerEvent {
    Time(Duration),
    /// One-time unknown→known transition once the file has been probed.
    DurationKnown(Duration),
    Finished,
}

/// Clamp a seek target into the playable range.
pub fn clamp_seek(target_secs: f64, duration_secs: f64) -> f64 {
    if !target_secs.is_finite() {
        return 0.0;
    }
    target_secs.clamp(0.0, duration_secs.max(0.0))
}

/// Where a relative skip lands, or `None` while the duration is unknown
/// (skipping into an undefined range is a guarded no-op).
pub fn skip_target(current_secs: f64, delta_secs: f64, duration_secs: Option<f64>) -> Option<f64> {
    let total = duration_secs?;
    if total <= 0.0 {
        return None;
    }
    Some(clamp_seek(current_secs + delta_secs, total))
}

fn probe_duration(path: &Path) -> Option<Duration> {
    let file = fs::File::open(path).ok()?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .ok()?;

    let reader = probed.format;
    let track = reader.default_track()?;
    let time_base = track.codec_params.time_base?;
    let n_frames = track.codec_params.n_frames?;
    let time = time_base.calc_time(n_frames);

    Some(Duration::from_secs_f64(time.seconds as f64 + time.frac))
}

/// Playback engine for one episode's cached audio file.
///
/// Position is `seek_base + sink.get_pos()`: seeking tears the sink down and
/// rebuilds it from a freshly decoded source, so the sink clock restarts at
/// zero each time.
pub struct Player {
    path: PathBuf,
    stream: OutputStream,
    sink: Sink,
    seek_base: Duration,
    paused: bool,
    volume: f32,
    duration: Option<Duration>,
    duration_reported: bool,
    last_time: Duration,
    finished_reported: bool,
}

impl Player {
    /// Open the default output device and queue the file, paused.
    pub fn load(path: PathBuf) -> Result<Self> {
        let duration = probe_duration(&path);
        if duration.is_none() {
            warn!(path = %path.display(), "could not probe audio duration");
        }

        let stream = OutputStreamBuilder::from_default_device()
            .context("no audio output device")?
            .open_stream_or_fallback()
            .context("failed to open audio stream")?;
        let sink = Sink::connect_new(stream.mixer());

        let file = fs::File::open(&path)
            .with_context(|| format!("opening {}", path.display()))?;
        let source = Decoder::new(io::BufReader::new(file)).context("decoding audio file")?;
        sink.append(source);
        sink.pause();

        Ok(Player {
            path,
            stream,
            sink,
            seek_base: Duration::ZERO,
            paused: true,
            volume: 1.0,
            duration,
            duration_reported: false,
            last_time: Duration::ZERO,
            finished_reported: false,
        })
    }

    pub fn position(&self) -> Duration {
        self.seek_base + self.sink.get_pos()
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn toggle(&mut self) {
        if self.paused {
            self.sink.play();
        } else {
            self.sink.pause();
        }
        self.paused = !self.paused;
    }

    pub fn play(&mut self) {
        self.sink.play();
        self.paused = false;
    }

    pub fn volume_up(&mut self) {
        self.volume = ((self.volume * 20.0).round() + 1.0).min(40.0) / 20.0;
        self.sink.set_volume(self.volume);
    }

    pub fn volume_down(&mut self) {
        self.volume = ((self.volume * 20.0).round() - 1.0).max(0.0) / 20.0;
        self.sink.set_volume(self.volume);
    }

    /// Absolute seek. Suppressed while the duration is unknown; otherwise
    /// clamps into `[0, duration]` and updates the reported position
    /// synchronously so dependents don't wait for the next tick.
    pub fn seek_to_secs(&mut self, target_secs: f64) {
        let Some(total) = self.duration else {
            debug!("seek ignored: duration unknown");
            return;
        };
        let clamped = Duration::from_secs_f64(clamp_seek(target_secs, total.as_secs_f64()));

        // Drop the old sink and start a fresh one; rodio's clear() leaves
        // the clock in an awkward state.
        self.sink.stop();
        let sink = Sink::connect_new(self.stream.mixer());
        sink.set_volume(self.volume);

        match fs::File::open(&self.path) {
            Ok(file) => match Decoder::new(io::BufReader::new(file)) {
                Ok(mut source) => {
                    let _ = source.try_seek(clamped);
                    sink.append(source);
                }
                Err(e) => warn!(error = %e, "re-decoding for seek failed"),
            },
            Err(e) => warn!(error = %e, "re-opening audio file for seek failed"),
        }

        if self.paused {
            sink.pause();
        }
        self.sink = sink;
        self.seek_base = clamped;
        self.last_time = clamped;
        self.finished_reported = false;
    }

    /// Relative skip; a no-op until the duration is known.
    pub fn skip(&mut self, delta_secs: f64) {
        let duration = self.duration.map(|d| d.as_secs_f64());
        if let Some(target) = skip_target(self.position().as_secs_f64(), delta_secs, duration) {
            self.seek_to_secs(target);
        }
    }

    /// Drain clock transitions since the last call.
    pub fn poll(&mut self) -> Vec<PlayerEvent> {
        let mut events = Vec::new();
        if !self.duration_reported {
            if let Some(d) = self.duration {
                self.duration_reported = true;
                events.push(PlayerEvent::DurationKnown(d));
            }
        }
        let pos = self.position();
        if pos != self.last_time {
            self.last_time = pos;
            events.push(PlayerEvent::Time(pos));
        }
        if self.sink.empty() && !self.paused && !self.finished_reported {
            self.finished_reported = true;
            self.paused = true;
            events.push(PlayerEvent::Finished);
        }
        events
    }
}

fn audio_cache_path(url: &str) -> PathBuf {
    let ext = url
        .split(['?', '#'])
        .next()
        .and_then(|p| p.rsplit('.').next())
        .filter(|e| e.len() <= 4 && e.chars().all(|c| c.is_ascii_alphanumeric()));
    let mut name = cache_hash(url);
    if let Some(ext) = ext {
        name.push('.');
        name.push_str(&ext.to_ascii_lowercase());
    }
    config_dir().join("cache").join("audio").join(name)
}

fn fetch_audio(url: &str) -> Result<PathBuf> {
    let cache = audio_cache_path(url);
    if cache.exists() {
        debug!(path = %cache.display(), "audio cache hit");
        return Ok(cache);
    }
    if let Some(parent) = cache.parent() {
        fs::create_dir_all(parent).context("creating audio cache dir")?;
    }
    let mut resp = ureq::get(url).call().context("requesting episode audio")?;
    let tmp = cache.with_extension("part");
    let mut file = fs::File::create(&tmp).context("creating audio cache file")?;
    let mut reader = resp.body_mut().as_reader();
    io::copy(&mut reader, &mut file).context("downloading episode audio")?;
    fs::rename(&tmp, &cache).context("committing audio cache file")?;
    Ok(cache)
}

/// Download the episode audio into the on-disk cache on a worker thread.
pub fn spawn_audio_fetch(url: String) -> mpsc::Receiver<Result<PathBuf>> {
    spawn_fetch(move || fetch_audio(&url))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seek_clamps_to_bounds() {
        assert_eq!(clamp_seek(-3.0, 120.0), 0.0);
        assert_eq!(clamp_seek(130.0, 120.0), 120.0);
        assert_eq!(clamp_seek(45.5, 120.0), 45.5);
        assert_eq!(clamp_seek(f64::NAN, 120.0), 0.0);
    }

    #[test]
    fn skip_composes_with_clamped_seek() {
        // skip(delta) == seek(clamp(current + delta))
        assert_eq!(skip_target(10.0, 5.0, Some(120.0)), Some(15.0));
        assert_eq!(skip_target(2.0, -5.0, Some(120.0)), Some(0.0));
        assert_eq!(skip_target(118.0, 5.0, Some(120.0)), Some(120.0));
    }

    #[test]
    fn skip_without_duration_is_a_guarded_noop() {
        assert_eq!(skip_target(10.0, -5.0, None), None);
        assert_eq!(skip_target(10.0, -5.0, Some(0.0)), None);
    }

    #[test]
    fn cache_path_keeps_a_sane_extension() {
        let p = audio_cache_path("https://cdn.example.com/audio/ep001.mp3?token=abc");
        assert_eq!(p.extension().and_then(|e| e.to_str()), Some("mp3"));
        let p = audio_cache_path("https://cdn.example.com/stream/ep001");
        assert!(p.extension().is_none());
    }
}
