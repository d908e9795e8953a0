use std::env;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::catalog::Catalog;
use crate::config::Settings;
use crate::library::scan;
use crate::persist::Snapshot;

/// Settings from the config file, falling back to defaults when it cannot
/// be used. Logging is not up yet, so the reason goes to stderr.
pub fn load_settings() -> Settings {
    Settings::load()
        .map_err(|e| format!("failed to load config: {e}"))
        .and_then(|s| {
            s.validate()
                .map(|()| s)
                .map_err(|e| format!("invalid config: {e}"))
        })
        .unwrap_or_else(|msg| {
            eprintln!("milonga: {msg}, using defaults");
            Settings::default()
        })
}

/// Music directory: first CLI argument, then the configured one, then cwd.
pub fn music_dir(arg: Option<String>, settings: &Settings) -> PathBuf {
    arg.map(PathBuf::from)
        .or_else(|| settings.library.directory.clone())
        .or_else(|| env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("Music"))
}

/// Scan `dir` and lay saved edits from `state_path` over the result.
pub fn build_catalog(dir: &Path, settings: &Settings, state_path: Option<&Path>) -> Catalog {
    let mut catalog = Catalog::from_tracks(scan(dir, &settings.library));

    if let Some(path) = state_path.filter(|p| p.exists()) {
        match Snapshot::read_from(path) {
            Ok(snapshot) => {
                snapshot.restore(&mut catalog);
                info!("Restored state from {}", path.display());
            }
            Err(e) => warn!("Ignoring unreadable state file {}: {e}", path.display()),
        }
    }
    catalog
}
