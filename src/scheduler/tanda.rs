use std::fmt;

use crate::catalog::{Catalog, PlaylistId, Slot, Track};

/// Genres that form tandas. Everything else, including an absent genre, is
/// a cortina.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockGenres(Vec<String>);

impl BlockGenres {
    pub fn new<I, S>(genres: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(genres.into_iter().map(Into::into).collect())
    }

    pub fn contains(&self, genre: &str) -> bool {
        self.0.iter().any(|g| g == genre)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// The track's genre if it is a block genre.
    pub fn block_genre<'a>(&self, track: &'a Track) -> Option<&'a str> {
        track.genre().filter(|g| self.contains(g))
    }

    pub fn classify(&self, track: &Track) -> Role {
        if self.block_genre(track).is_some() {
            Role::Tanda
        } else {
            Role::Cortina
        }
    }
}

impl Default for BlockGenres {
    fn default() -> Self {
        Self::new(["Tango", "Vals", "Milonga"])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Filler between tandas.
    Cortina,
    /// Can start or continue a tanda.
    Tanda,
}

fn selectable(catalog: &Catalog, playlist: PlaylistId, index: usize) -> bool {
    catalog
        .track_at(Slot::new(playlist, index))
        .is_some_and(Track::is_checked)
}

/// First index after `from` whose track is checked and not missing.
pub fn find_next_checked_track_index(
    catalog: &Catalog,
    playlist: PlaylistId,
    from: usize,
) -> Option<usize> {
    let len = catalog.playlist(playlist)?.len();
    (from.saturating_add(1)..len).find(|&i| selectable(catalog, playlist, i))
}

pub fn find_first_checked_track_index(catalog: &Catalog, playlist: PlaylistId) -> Option<usize> {
    let len = catalog.playlist(playlist)?.len();
    (0..len).find(|&i| selectable(catalog, playlist, i))
}

/// Nearest index before `from` whose track is checked and not missing.
pub fn find_prev_checked_track_index(
    catalog: &Catalog,
    playlist: PlaylistId,
    from: usize,
) -> Option<usize> {
    let len = catalog.playlist(playlist)?.len();
    (0..from.min(len))
        .rev()
        .find(|&i| selectable(catalog, playlist, i))
}

/// Whether `slot` closes a tanda: it and the entry before it share a block
/// genre, and the resolved next track (if any) has another genre.
pub fn is_last_track_in_tanda(
    catalog: &Catalog,
    slot: Slot,
    next: Option<Slot>,
    genres: &BlockGenres,
) -> bool {
    if slot.index == 0 {
        return false;
    }
    let Some(genre) = catalog.track_at(slot).and_then(|t| genres.block_genre(t)) else {
        return false;
    };
    let previous = Slot::new(slot.playlist, slot.index - 1);
    if catalog.track_at(previous).and_then(Track::genre) != Some(genre) {
        return false;
    }
    match next.and_then(|n| catalog.track_at(n)) {
        None => true,
        Some(t) => t.genre() != Some(genre),
    }
}

/// Genre and orchestra of the upcoming tanda.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TandaPreview {
    pub genre: String,
    /// The shared orchestra, or "Mixed".
    pub orchestra: String,
}

pub const MIXED_ORCHESTRA: &str = "Mixed";

/// Tracks of one genre needed after a cortina to call it a tanda.
const TANDA_MIN_TRACKS: usize = 3;

impl fmt::Display for TandaPreview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Next Tanda:  {} ({})", self.orchestra, self.genre)
    }
}

/// Look ahead from `next` for the first run of three checked tracks of one
/// block genre that follows a cortina.
///
/// The current track counts as the leading cortina when it is one.
/// Unchecked and missing tracks are stepped over. Read-only.
pub fn next_tanda(
    catalog: &Catalog,
    current: Option<Slot>,
    next: Option<Slot>,
    genres: &BlockGenres,
) -> Option<TandaPreview> {
    let next = next?;
    let len = catalog.playlist(next.playlist)?.len();

    let mut cortina_found = current
        .and_then(|c| catalog.track_at(c))
        .is_some_and(|t| genres.classify(t) == Role::Cortina);
    let mut run_genre: Option<&str> = None;
    let mut orchestra: Option<&str> = None;
    let mut count = 0;

    for index in next.index..len {
        let Some(track) = catalog.track_at(Slot::new(next.playlist, index)) else {
            continue;
        };
        if !track.is_checked() {
            continue;
        }
        let Some(genre) = genres.block_genre(track) else {
            cortina_found = true;
            run_genre = None;
            orchestra = None;
            count = 0;
            continue;
        };
        if !cortina_found {
            continue;
        }
        match run_genre {
            None => run_genre = Some(genre),
            Some(g) if g != genre => {
                // The run broke before reaching a tanda; wait for the next cortina.
                cortina_found = false;
                run_genre = None;
                orchestra = None;
                count = 0;
                continue;
            }
            Some(_) => {}
        }
        orchestra = match (orchestra, track.orchestra()) {
            (None, Some(o)) if count == 0 => Some(o),
            (Some(prev), Some(o)) if prev == o => Some(o),
            _ => Some(MIXED_ORCHESTRA),
        };
        count += 1;
        if count >= TANDA_MIN_TRACKS {
            return Some(TandaPreview {
                genre: genre.to_string(),
                orchestra: orchestra.unwrap_or(MIXED_ORCHESTRA).to_string(),
            });
        }
    }
    None
}
