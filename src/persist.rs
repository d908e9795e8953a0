use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::catalog::{Catalog, HISTORY_PLAYLIST, TRACKS_PLAYLIST, TrackId};
use crate::error::PersistError;

/// Titles, tags, checked flags and named playlists, taken under the engine
/// lock and written by a background flusher.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub tracks: Vec<TrackRecord>,
    #[serde(default)]
    pub playlists: Vec<PlaylistRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub filename: PathBuf,
    pub title: String,
    /// Not recorded for missing tracks, so they keep their flag for when the
    /// file comes back.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked: Option<bool>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistRecord {
    pub name: String,
    pub entries: Vec<PathBuf>,
}

impl Snapshot {
    /// Record every track and every operator playlist. "Tracks" is rebuilt
    /// from the scan and "History" starts empty, so neither is saved.
    pub fn capture(catalog: &Catalog) -> Self {
        let tracks = catalog
            .tracks()
            .map(|(_, t)| TrackRecord {
                filename: t.filename().to_path_buf(),
                title: t.title().to_string(),
                checked: (!t.is_missing()).then(|| t.is_checked()),
                tags: t
                    .tags()
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            })
            .collect();

        let playlists = catalog
            .playlists()
            .filter(|(_, p)| p.name() != TRACKS_PLAYLIST && p.name() != HISTORY_PLAYLIST)
            .map(|(_, p)| PlaylistRecord {
                name: p.name().to_string(),
                entries: p
                    .entries()
                    .iter()
                    .filter_map(|&id| catalog.track(id))
                    .map(|t| t.filename().to_path_buf())
                    .collect(),
            })
            .collect();

        Self { tracks, playlists }
    }

    /// Apply saved edits to a freshly scanned catalog. Records for files
    /// that were not scanned are skipped.
    pub fn restore(&self, catalog: &mut Catalog) {
        let mut unknown = 0usize;
        for record in &self.tracks {
            let Some(id) = catalog.track_by_filename(&record.filename) else {
                unknown += 1;
                continue;
            };
            catalog.set_title(id, &record.title);
            let dropped: Vec<String> = catalog
                .track(id)
                .map(|t| {
                    t.tags()
                        .keys()
                        .filter(|name| !record.tags.contains_key(*name))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();
            for name in &dropped {
                catalog.set_tag(id, name, "");
            }
            for (name, value) in &record.tags {
                catalog.set_tag(id, name, value);
            }
            if let Some(checked) = record.checked {
                catalog.set_checked(id, checked);
            }
        }
        if unknown > 0 {
            warn!("{unknown} saved tracks were not found in the library");
        }

        for playlist in &self.playlists {
            if catalog.playlist_by_name(&playlist.name).is_some() {
                warn!("Playlist {:?} already exists, not restoring", playlist.name);
                continue;
            }
            let entries: Vec<TrackId> = playlist
                .entries
                .iter()
                .filter_map(|f| catalog.track_by_filename(f))
                .collect();
            catalog.add_playlist(&playlist.name, entries);
        }
    }

    pub fn read_from(path: &Path) -> Result<Self, PersistError> {
        let text = fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    /// Write atomically: to a sibling temp file, then rename over `path`.
    pub fn write_to(&self, path: &Path) -> Result<(), PersistError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let text = toml::to_string_pretty(self)?;
        let tmp = path.with_extension("toml.tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

/// Handle to the background flush thread. Flushes once more when stopped.
pub struct Flusher {
    tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

/// Write `snapshot()` to `path` every `interval`, skipping unchanged state.
pub fn spawn_flusher<F>(path: PathBuf, interval: Duration, snapshot: F) -> Flusher
where
    F: Fn() -> Snapshot + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<()>();
    let handle = thread::spawn(move || {
        let mut last: Option<Snapshot> = None;
        let flush = |last: &mut Option<Snapshot>| {
            let snap = snapshot();
            if last.as_ref() == Some(&snap) {
                debug!("State unchanged, skipping flush");
                return;
            }
            match snap.write_to(&path) {
                Ok(()) => {
                    info!("Saved state to {}", path.display());
                    *last = Some(snap);
                }
                Err(e) => error!("Failed to save state to {}: {e}", path.display()),
            }
        };

        loop {
            match rx.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => flush(&mut last),
                Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                    flush(&mut last);
                    break;
                }
            }
        }
    });

    Flusher {
        tx: Some(tx),
        handle: Some(handle),
    }
}

impl Flusher {
    /// Flush one last time and wait for the thread to finish.
    pub fn stop(&mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(());
        }
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

impl Drop for Flusher {
    fn drop(&mut self) {
        self.stop();
    }
}
