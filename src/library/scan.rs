use std::path::Path;

use lofty::prelude::*;
use lofty::tag::{ItemKey, Tag};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::audio::probe;
use crate::catalog::{GENRE_TAG, ORCHESTRA_TAG, Track, TrackMedia};
use crate::config::LibrarySettings;

pub const YEAR_TAG: &str = "year";

/// The tag fields the player cares about. Artist is read as the orchestra.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScannedTags {
    pub title: Option<String>,
    pub genre: Option<String>,
    pub orchestra: Option<String>,
    pub year: Option<String>,
}

impl ScannedTags {
    fn from_tag(tag: &Tag) -> Self {
        let year = tag
            .items()
            .find(|item| matches!(item.key(), ItemKey::Year | ItemKey::RecordingDate))
            .and_then(|item| item.value().text())
            .and_then(non_empty);
        Self {
            title: tag.title().as_deref().and_then(non_empty),
            genre: tag.genre().as_deref().and_then(non_empty),
            orchestra: tag.artist().as_deref().and_then(non_empty),
            year,
        }
    }

    /// Tags of the file at `path`. Unreadable or untagged files give nothing.
    pub fn read(path: &Path) -> Self {
        match lofty::read_from_path(path) {
            Ok(tagged) => tagged
                .primary_tag()
                .or_else(|| tagged.first_tag())
                .map(Self::from_tag)
                .unwrap_or_default(),
            Err(e) => {
                debug!("No tags for {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// A track titled by tag, or by file stem when untitled.
    pub fn into_track(self, path: &Path, media: TrackMedia) -> Track {
        let title = self.title.unwrap_or_else(|| {
            path.file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("UNKNOWN")
                .to_string()
        });
        let mut track = Track::new(path, title, media);
        for (name, value) in [
            (GENRE_TAG, self.genre),
            (ORCHESTRA_TAG, self.orchestra),
            (YEAR_TAG, self.year),
        ] {
            if let Some(value) = value {
                track = track.with_tag(name, &value);
            }
        }
        track
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

pub(super) fn is_audio_file(path: &Path, settings: &LibrarySettings) -> bool {
    let exts: Vec<String> = settings
        .extensions
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect();

    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            exts.iter().any(|e| e == &ext)
        })
        .unwrap_or(false)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// Every audio file under `dir`, in walk order. The catalog sorts them.
pub fn scan(dir: &Path, settings: &LibrarySettings) -> Vec<Track> {
    let mut tracks: Vec<Track> = Vec::new();

    let mut walker = WalkDir::new(dir).follow_links(settings.follow_links);

    // Non-recursive = only the root directory.
    let depth_cap = if settings.recursive {
        settings.max_depth
    } else {
        Some(1)
    };
    if let Some(d) = depth_cap {
        walker = walker.max_depth(d);
    }

    for entry in walker
        .into_iter()
        .filter_entry(|e| settings.include_hidden || e.depth() == 0 || !is_hidden(e.path()))
        .filter_map(Result::ok)
    {
        let path = entry.path();
        if !path.is_file() || !is_audio_file(path, settings) {
            continue;
        }

        let media = match probe(path) {
            Ok(meta) => TrackMedia::Present(meta),
            Err(e) => {
                warn!("Marking {} missing: {e}", path.display());
                TrackMedia::Missing
            }
        };
        tracks.push(ScannedTags::read(path).into_track(path, media));
    }

    let missing = tracks.iter().filter(|t| t.is_missing()).count();
    info!(
        "Scanned {}: {} tracks, {missing} missing",
        dir.display(),
        tracks.len()
    );
    tracks
}
