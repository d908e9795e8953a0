use std::path::PathBuf;

use serde::Deserialize;

use crate::audio::{EqPreset, GainRange};

/// Top-level application settings loaded from `config.toml`.
///
/// File format: TOML
/// Default path (Linux/XDG): `$XDG_CONFIG_HOME/milonga/config.toml` or `~/.config/milonga/config.toml`
///
/// Precedence (highest wins):
/// 1) Environment variables (prefix `MILONGA__`, `__` as nested separator)
/// 2) Config file (if present)
/// 3) Struct defaults
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub audio: AudioSettings,
    pub playback: PlaybackSettings,
    pub library: LibrarySettings,
    pub persistence: PersistenceSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Number of equalizer bands: 10, 15, 25 or 31.
    pub equalizer_bands: usize,
    /// Bytes read from the file per pipeline iteration.
    pub buffer_size: usize,
    /// Initial volume, 0..=20 (14 is unity gain).
    pub volume: i32,
    /// Initial stereo balance, -10..=10.
    pub balance: i32,
    /// Whether the equalizer starts enabled.
    pub equalizer_enabled: bool,
    /// Optional preset applied to the equalizer at startup.
    pub equalizer_preset: Option<EqPreset>,
    /// Gain of the output line at volume 20 (dB).
    pub max_gain_db: f32,
    /// Gain of the output line at volume 0 (dB). Treated as silence.
    pub min_gain_db: f32,
}

impl AudioSettings {
    pub fn gain_range(&self) -> GainRange {
        GainRange {
            min_db: self.min_gain_db,
            max_db: self.max_gain_db,
        }
    }
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            equalizer_bands: 10,
            buffer_size: 8192,
            volume: 14,
            balance: 0,
            equalizer_enabled: false,
            equalizer_preset: None,
            max_gain_db: 6.0,
            min_gain_db: -80.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Seconds of silence after a track that played to its natural end.
    pub wait_seconds: u64,
    /// Genres that form tandas. Anything else is a cortina.
    pub block_genres: Vec<String>,
    /// `prev` restarts the current track once playback has passed this many seconds.
    pub prev_restart_seconds: u32,
    /// Whether the first track waits for an explicit `play`.
    pub start_paused: bool,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            wait_seconds: 0,
            block_genres: vec!["Tango".into(), "Vals".into(), "Milonga".into()],
            prev_restart_seconds: 4,
            start_paused: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LibrarySettings {
    /// Music directory used when none is given on the command line.
    pub directory: Option<PathBuf>,
    /// File extensions to treat as audio (case-insensitive, without dot).
    pub extensions: Vec<String>,
    /// Whether to follow symlinks during scanning.
    pub follow_links: bool,
    /// Whether to include hidden files/directories (dotfiles).
    pub include_hidden: bool,
    /// Whether to recurse into subdirectories.
    pub recursive: bool,
    /// Optional cap on directory recursion depth.
    pub max_depth: Option<usize>,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            directory: None,
            extensions: vec!["wav".into()],
            follow_links: true,
            include_hidden: false,
            recursive: true,
            max_depth: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PersistenceSettings {
    /// Seconds between background flushes of playlists and tags.
    pub flush_interval_secs: u64,
    /// Where the state file lives. Defaults under `$XDG_DATA_HOME/milonga/`.
    pub state_path: Option<PathBuf>,
}

impl Default for PersistenceSettings {
    fn default() -> Self {
        Self {
            flush_interval_secs: 600,
            state_path: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
