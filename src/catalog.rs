//! In-memory catalog: every track plus the named playlists that reference them.
//!
//! The catalog owns all `Track`s for the lifetime of the process. Playlists
//! hold `TrackId` handles, so one track can appear at several positions.
//! "Tracks" (everything, title order) and "History" (append-only) always exist.

mod model;
mod playlist;

use std::collections::HashMap;
use std::path::Path;

use tracing::warn;

pub use model::{GENRE_TAG, ORCHESTRA_TAG, Track, TrackId, TrackMedia};
pub use playlist::{HISTORY_PLAYLIST, Playlist, PlaylistId, Slot, TRACKS_PLAYLIST};

#[derive(Debug, Clone)]
pub struct Catalog {
    tracks: Vec<Track>,
    playlists: Vec<Playlist>,
    by_filename: HashMap<std::path::PathBuf, TrackId>,
    tracks_playlist: PlaylistId,
    history_playlist: PlaylistId,
}

impl Catalog {
    /// Build a catalog from scanned tracks, sorted by title.
    pub fn from_tracks(mut tracks: Vec<Track>) -> Self {
        tracks.sort();
        Self::new(tracks, Vec::new())
    }

    /// Build a catalog from tracks in their given order plus named playlists.
    ///
    /// A supplied "Tracks" playlist is kept; otherwise one is built from every
    /// track in order. "History" always starts empty. Entries that do not
    /// refer to a track are dropped.
    pub fn new(tracks: Vec<Track>, playlists: Vec<(String, Vec<TrackId>)>) -> Self {
        let by_filename = tracks
            .iter()
            .enumerate()
            .map(|(i, t)| (t.filename().to_path_buf(), TrackId(i)))
            .collect();

        let mut catalog = Self {
            tracks,
            playlists: Vec::new(),
            by_filename,
            tracks_playlist: PlaylistId(0),
            history_playlist: PlaylistId(0),
        };

        let mut tracks_playlist = None;
        for (name, entries) in playlists {
            if name == HISTORY_PLAYLIST {
                continue;
            }
            let id = catalog.add_playlist(&name, entries);
            if name == TRACKS_PLAYLIST && tracks_playlist.is_none() {
                tracks_playlist = Some(id);
            }
        }

        catalog.tracks_playlist = match tracks_playlist {
            Some(id) => id,
            None => {
                let all = (0..catalog.tracks.len()).map(TrackId).collect();
                catalog.add_playlist(TRACKS_PLAYLIST, all)
            }
        };
        catalog.history_playlist = catalog.add_playlist(HISTORY_PLAYLIST, Vec::new());
        catalog
    }

    /// Append a named playlist, dropping dangling entries.
    pub fn add_playlist(&mut self, name: &str, entries: Vec<TrackId>) -> PlaylistId {
        let len = self.tracks.len();
        let before = entries.len();
        let entries: Vec<TrackId> = entries.into_iter().filter(|id| id.0 < len).collect();
        if entries.len() != before {
            warn!(
                "Playlist {name:?}: dropped {} entries that reference no track",
                before - entries.len()
            );
        }
        self.playlists.push(Playlist::new(name, entries));
        PlaylistId(self.playlists.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.get(id.0)
    }

    pub fn tracks(&self) -> impl Iterator<Item = (TrackId, &Track)> {
        self.tracks.iter().enumerate().map(|(i, t)| (TrackId(i), t))
    }

    pub fn track_by_filename(&self, filename: &Path) -> Option<TrackId> {
        self.by_filename.get(filename).copied()
    }

    pub fn playlist(&self, id: PlaylistId) -> Option<&Playlist> {
        self.playlists.get(id.0)
    }

    pub fn playlists(&self) -> impl Iterator<Item = (PlaylistId, &Playlist)> {
        self.playlists
            .iter()
            .enumerate()
            .map(|(i, p)| (PlaylistId(i), p))
    }

    pub fn playlist_by_name(&self, name: &str) -> Option<PlaylistId> {
        self.playlists().find(|(_, p)| p.name() == name).map(|(id, _)| id)
    }

    pub fn tracks_playlist(&self) -> PlaylistId {
        self.tracks_playlist
    }

    pub fn history_playlist(&self) -> PlaylistId {
        self.history_playlist
    }

    /// The track referenced at `slot`, if the slot is still in range.
    pub fn entry(&self, slot: Slot) -> Option<TrackId> {
        self.playlist(slot.playlist)?.get(slot.index)
    }

    pub fn track_at(&self, slot: Slot) -> Option<&Track> {
        self.entry(slot).and_then(|id| self.track(id))
    }

    /// Every index of `playlist` that references `track`, in order.
    pub fn positions_of(&self, playlist: PlaylistId, track: TrackId) -> Vec<usize> {
        self.playlist(playlist)
            .map(|p| {
                p.entries()
                    .iter()
                    .enumerate()
                    .filter(|&(_, id)| *id == track)
                    .map(|(i, _)| i)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn set_title(&mut self, id: TrackId, title: &str) {
        if let Some(t) = self.tracks.get_mut(id.0) {
            t.set_title(title);
        }
    }

    /// Set or (with an empty value) remove a tag.
    pub fn set_tag(&mut self, id: TrackId, name: &str, value: &str) {
        if let Some(t) = self.tracks.get_mut(id.0) {
            t.set_tag(name, value);
        }
    }

    /// Returns the flag actually stored; missing tracks cannot be checked.
    pub fn set_checked(&mut self, id: TrackId, checked: bool) -> bool {
        self.tracks
            .get_mut(id.0)
            .map(|t| t.set_checked(checked))
            .unwrap_or(false)
    }

    pub fn mark_missing(&mut self, id: TrackId) {
        if let Some(t) = self.tracks.get_mut(id.0) {
            t.mark_missing();
        }
    }

    pub(crate) fn append_history(&mut self, id: TrackId) -> Slot {
        let history = self.history_playlist;
        let index = self.playlists[history.0].push(id);
        Slot::new(history, index)
    }
}
