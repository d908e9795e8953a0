use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::audio::AudioMeta;

pub const GENRE_TAG: &str = "genre";
pub const ORCHESTRA_TAG: &str = "orchestra";

/// Handle to a track owned by the [`Catalog`](super::Catalog).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackId(pub usize);

/// Whether a track's audio is available.
///
/// Audio operations only exist on `Present`, so a missing file can never be
/// handed to the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackMedia {
    Present(AudioMeta),
    Missing,
}

#[derive(Debug, Clone)]
pub struct Track {
    filename: PathBuf,
    title: String,
    tags: HashMap<String, String>,
    checked: bool,
    media: TrackMedia,
}

impl Track {
    /// A new track, checked unless its media is missing.
    pub fn new(filename: impl Into<PathBuf>, title: impl Into<String>, media: TrackMedia) -> Self {
        let checked = matches!(media, TrackMedia::Present(_));
        Self {
            filename: filename.into(),
            title: title.into(),
            tags: HashMap::new(),
            checked,
            media,
        }
    }

    /// Builder-style tag setter used by scanners and tests.
    pub fn with_tag(mut self, name: &str, value: &str) -> Self {
        self.set_tag(name, value);
        self
    }

    pub fn filename(&self) -> &Path {
        &self.filename
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags.get(name).map(String::as_str)
    }

    pub fn tags(&self) -> &HashMap<String, String> {
        &self.tags
    }

    pub fn genre(&self) -> Option<&str> {
        self.tag(GENRE_TAG)
    }

    pub fn orchestra(&self) -> Option<&str> {
        self.tag(ORCHESTRA_TAG)
    }

    /// Eligible for selection: checked by the operator and not missing.
    pub fn is_checked(&self) -> bool {
        self.checked && !self.is_missing()
    }

    pub fn is_missing(&self) -> bool {
        matches!(self.media, TrackMedia::Missing)
    }

    pub fn media(&self) -> &TrackMedia {
        &self.media
    }

    pub fn meta(&self) -> Option<&AudioMeta> {
        match &self.media {
            TrackMedia::Present(meta) => Some(meta),
            TrackMedia::Missing => None,
        }
    }

    /// Whole seconds of audio; zero for a missing track.
    pub fn duration(&self) -> u32 {
        self.meta().map_or(0, |m| m.duration)
    }

    pub(crate) fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
    }

    pub(crate) fn set_tag(&mut self, name: &str, value: &str) {
        if value.is_empty() {
            self.tags.remove(name);
        } else {
            self.tags.insert(name.to_string(), value.to_string());
        }
    }

    /// Returns the effective flag: a missing track stays unchecked.
    pub(crate) fn set_checked(&mut self, checked: bool) -> bool {
        self.checked = checked && !self.is_missing();
        self.checked
    }

    pub(crate) fn mark_missing(&mut self) {
        self.media = TrackMedia::Missing;
        self.checked = false;
    }
}

// Catalog order is by title; the filename breaks ties so `Eq` stays consistent.
impl Ord for Track {
    fn cmp(&self, other: &Self) -> Ordering {
        self.title
            .cmp(&other.title)
            .then_with(|| self.filename.cmp(&other.filename))
    }
}

impl PartialOrd for Track {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Track {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Track {}
