use std::{env, path::PathBuf};

use crate::audio::BAND_COUNTS;

use super::schema::{PersistenceSettings, Settings};

/// Configuration loading helpers.
///
/// `Settings::load` reads an optional config file, then lets environment
/// variables (prefix `MILONGA__`) override it, and falls back to struct defaults.
impl Settings {
    /// Load settings from environment and optional config file.
    pub fn load() -> Result<Self, ::config::ConfigError> {
        let config_path = resolve_config_path();

        let mut builder = ::config::Config::builder();

        if let Some(path) = &config_path {
            builder = builder.add_source(::config::File::from(path.as_path()).required(false));
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix("MILONGA")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("playback.block_genres")
                .with_list_parse_key("library.extensions")
                .try_parsing(true),
        );

        let cfg = builder.build()?;
        let settings: Settings = cfg.try_deserialize()?;
        Ok(settings)
    }

    /// Perform basic validation checks on loaded settings.
    pub fn validate(&self) -> Result<(), String> {
        if !BAND_COUNTS.contains(&self.audio.equalizer_bands) {
            return Err(format!(
                "audio.equalizer_bands must be one of {BAND_COUNTS:?}, got {}",
                self.audio.equalizer_bands
            ));
        }
        if self.audio.buffer_size == 0 {
            return Err("audio.buffer_size must be >= 1".to_string());
        }
        if !(0..=20).contains(&self.audio.volume) {
            return Err("audio.volume must be between 0 and 20".to_string());
        }
        if !(-10..=10).contains(&self.audio.balance) {
            return Err("audio.balance must be between -10 and 10".to_string());
        }
        if self.audio.min_gain_db >= 0.0 || self.audio.max_gain_db < 0.0 {
            return Err("audio.min_gain_db must be < 0 and audio.max_gain_db >= 0".to_string());
        }
        if self.playback.wait_seconds > 10 {
            return Err("playback.wait_seconds must be between 0 and 10".to_string());
        }
        if self.persistence.flush_interval_secs == 0 {
            return Err("persistence.flush_interval_secs must be >= 1".to_string());
        }
        Ok(())
    }
}

impl PersistenceSettings {
    /// The configured state file, or the XDG default.
    pub fn resolve_state_path(&self) -> Option<PathBuf> {
        self.state_path.clone().or_else(default_state_path)
    }
}

/// Resolve the config path from `MILONGA_CONFIG_PATH` or XDG defaults.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Some(p) = env::var_os("MILONGA_CONFIG_PATH") {
        return Some(PathBuf::from(p));
    }
    default_config_path()
}

/// Compute the default config path under `$XDG_CONFIG_HOME/milonga/config.toml`
/// or `~/.config/milonga/config.toml` when `XDG_CONFIG_HOME` is not set.
pub fn default_config_path() -> Option<PathBuf> {
    xdg_dir("XDG_CONFIG_HOME", ".config").map(|d| d.join("milonga").join("config.toml"))
}

/// `$XDG_DATA_HOME/milonga/state.toml`, or `~/.local/share/milonga/state.toml`.
pub fn default_state_path() -> Option<PathBuf> {
    xdg_dir("XDG_DATA_HOME", ".local/share").map(|d| d.join("milonga").join("state.toml"))
}

fn xdg_dir(var: &str, home_fallback: &str) -> Option<PathBuf> {
    if let Some(xdg) = env::var_os(var) {
        Some(PathBuf::from(xdg))
    } else {
        env::var_os("HOME").map(|home| PathBuf::from(home).join(home_fallback))
    }
}
