use super::model::TrackId;

pub const TRACKS_PLAYLIST: &str = "Tracks";
pub const HISTORY_PLAYLIST: &str = "History";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaylistId(pub usize);

/// A position in a playlist.
///
/// Ordering decisions are made on positions, not tracks: the same track can
/// sit at several positions of several playlists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Slot {
    pub playlist: PlaylistId,
    pub index: usize,
}

impl Slot {
    pub fn new(playlist: PlaylistId, index: usize) -> Self {
        Self { playlist, index }
    }
}

/// A named, ordered list of catalog references.
#[derive(Debug, Clone)]
pub struct Playlist {
    name: String,
    entries: Vec<TrackId>,
}

impl Playlist {
    pub fn new(name: impl Into<String>, entries: Vec<TrackId>) -> Self {
        Self {
            name: name.into(),
            entries,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<TrackId> {
        self.entries.get(index).copied()
    }

    pub fn entries(&self) -> &[TrackId] {
        &self.entries
    }

    pub(crate) fn push(&mut self, id: TrackId) -> usize {
        self.entries.push(id);
        self.entries.len() - 1
    }
}
