//! Decides what plays next.
//!
//! The scheduler holds the current, next, next-cortina and next-tanda
//! selections and resolves `next` from the current position under the
//! default policy and the operator's overrides. It never touches audio; the
//! play loop owns it behind the engine lock.

mod selection;
mod tanda;

use tracing::debug;

use crate::catalog::{Catalog, Slot, TrackId};
use crate::error::ScheduleError;

pub use selection::Selections;
pub use tanda::{
    BlockGenres, MIXED_ORCHESTRA, Role, TandaPreview, find_first_checked_track_index,
    find_next_checked_track_index, find_prev_checked_track_index, is_last_track_in_tanda,
    next_tanda,
};

use selection::{refers_to, still_selectable};

#[derive(Debug, Clone)]
pub struct Scheduler {
    genres: BlockGenres,
    sel: Selections,
    /// `next` was chosen by the operator and survives re-resolution.
    next_pinned: bool,
    /// A tanda override that has become `next`. Re-applied after a cortina
    /// until it plays, so later re-resolution keeps the operator's choice.
    arrived_tanda: Option<Slot>,
}

impl Scheduler {
    pub fn new(genres: BlockGenres) -> Self {
        Self {
            genres,
            sel: Selections::default(),
            next_pinned: false,
            arrived_tanda: None,
        }
    }

    pub fn genres(&self) -> &BlockGenres {
        &self.genres
    }

    pub fn selections(&self) -> Selections {
        self.sel
    }

    pub fn current(&self) -> Option<Slot> {
        self.sel.current
    }

    pub fn next(&self) -> Option<Slot> {
        self.sel.next
    }

    pub fn is_next_pinned(&self) -> bool {
        self.next_pinned
    }

    pub fn role(&self, catalog: &Catalog, slot: Slot) -> Option<Role> {
        catalog.track_at(slot).map(|t| self.genres.classify(t))
    }

    pub fn next_tanda(&self, catalog: &Catalog) -> Option<TandaPreview> {
        next_tanda(catalog, self.sel.current, self.sel.next, &self.genres)
    }

    /// Run the default resolution from the current position.
    ///
    /// Overrides a pinned `next`. With nothing current, `next` is cleared.
    pub fn resolve_next(&mut self, catalog: &Catalog) {
        self.next_pinned = false;
        let Some(current) = self.sel.current else {
            self.sel.next = None;
            return;
        };

        let mut next = find_next_checked_track_index(catalog, current.playlist, current.index)
            .map(|i| Slot::new(current.playlist, i));

        let current_role = self.role(catalog, current);
        if is_last_track_in_tanda(catalog, current, next, &self.genres)
            && let Some(cortina) = self.sel.next_cortina
        {
            next = Some(cortina);
        } else if current_role == Some(Role::Cortina)
            && let Some(tanda) = self.sel.next_tanda.or(self.arrived_tanda)
        {
            next = Some(tanda);
        }

        if next.is_some() && next == self.sel.next_tanda {
            debug!("Next tanda override reached");
            self.arrived_tanda = self.sel.next_tanda.take();
        }
        self.sel.next = next;
    }

    /// Re-resolve unless the operator chose `next`.
    pub fn refresh_next(&mut self, catalog: &Catalog) {
        if !self.next_pinned {
            self.resolve_next(catalog);
        }
    }

    /// The track at `slot`, unless the slot is absent, current or next.
    fn locate(&self, catalog: &Catalog, slot: Slot) -> Result<TrackId, ScheduleError> {
        let playlist = catalog
            .playlist(slot.playlist)
            .ok_or(ScheduleError::UnknownPlaylist)?;
        let id = playlist.get(slot.index).ok_or(ScheduleError::OutOfRange {
            index: slot.index,
            len: playlist.len(),
        })?;
        if self.sel.current == Some(slot) {
            return Err(ScheduleError::AlreadyCurrent);
        }
        if self.sel.next == Some(slot) {
            return Err(ScheduleError::AlreadyNext);
        }
        Ok(id)
    }

    fn validate(&self, catalog: &Catalog, slot: Slot) -> Result<TrackId, ScheduleError> {
        let id = self.locate(catalog, slot)?;
        if !still_selectable(catalog, slot) {
            return Err(ScheduleError::NotSelectable);
        }
        Ok(id)
    }

    /// Operator choice of the next track. It stays until played or unchecked.
    ///
    /// An unchecked target is checked; a missing one is refused.
    pub fn set_next_track(
        &mut self,
        catalog: &mut Catalog,
        slot: Slot,
    ) -> Result<(), ScheduleError> {
        let id = self.locate(catalog, slot)?;
        let (missing, checked) = catalog
            .track(id)
            .map_or((true, false), |t| (t.is_missing(), t.is_checked()));
        if missing {
            return Err(ScheduleError::Missing);
        }
        if !checked {
            debug!("Checking {id:?} to play it next");
            catalog.set_checked(id, true);
        }
        self.sel.next = Some(slot);
        self.next_pinned = true;
        debug!("Next track set to {slot:?}");
        Ok(())
    }

    pub fn set_next_cortina(
        &mut self,
        catalog: &Catalog,
        slot: Slot,
    ) -> Result<(), ScheduleError> {
        self.validate(catalog, slot)?;
        if self.role(catalog, slot) != Some(Role::Cortina) {
            return Err(ScheduleError::NotCortina);
        }
        self.sel.next_cortina = Some(slot);
        debug!("Next cortina set to {slot:?}");
        self.refresh_next(catalog);
        Ok(())
    }

    pub fn set_next_tanda(&mut self, catalog: &Catalog, slot: Slot) -> Result<(), ScheduleError> {
        self.validate(catalog, slot)?;
        if self.role(catalog, slot) != Some(Role::Tanda) {
            return Err(ScheduleError::NotTandaStart);
        }
        self.sel.next_tanda = Some(slot);
        self.arrived_tanda = None;
        debug!("Next tanda set to {slot:?}");
        self.refresh_next(catalog);
        Ok(())
    }

    /// React to a track's checked flag changing. Returns true if any
    /// selection changed.
    pub fn on_checked_changed(&mut self, catalog: &Catalog, track: TrackId, checked: bool) -> bool {
        let before = self.sel;
        if checked {
            self.adopt_newly_checked(catalog, track);
        } else {
            if refers_to(catalog, self.sel.next_cortina, track) {
                self.sel.next_cortina = None;
            }
            if refers_to(catalog, self.sel.next_tanda, track) {
                self.sel.next_tanda = None;
            }
            if refers_to(catalog, self.arrived_tanda, track) {
                self.arrived_tanda = None;
            }
            if refers_to(catalog, self.sel.next, track) {
                self.resolve_next(catalog);
            }
        }
        self.sel != before
    }

    /// A track checked between current and next becomes next.
    fn adopt_newly_checked(&mut self, catalog: &Catalog, track: TrackId) {
        let Some(current) = self.sel.current else {
            return;
        };
        let limit = match self.sel.next {
            None => usize::MAX,
            Some(next) if next.playlist == current.playlist => next.index,
            Some(_) => return,
        };
        let earliest = catalog
            .positions_of(current.playlist, track)
            .into_iter()
            .find(|&i| i > current.index && i < limit);
        if let Some(index) = earliest {
            self.sel.next = Some(Slot::new(current.playlist, index));
            self.next_pinned = false;
        }
    }

    /// Drop selections that no longer point at a selectable track, e.g.
    /// after a track turned out to be missing. `current` is only dropped
    /// when out of range.
    pub fn revalidate(&mut self, catalog: &Catalog) {
        if self.sel.current.is_some_and(|c| catalog.entry(c).is_none()) {
            self.sel.current = None;
        }
        for slot in [
            &mut self.sel.next_cortina,
            &mut self.sel.next_tanda,
            &mut self.arrived_tanda,
        ] {
            if slot.is_some_and(|s| !still_selectable(catalog, s)) {
                *slot = None;
            }
        }
        if self.sel.next.is_some_and(|s| !still_selectable(catalog, s)) {
            self.resolve_next(catalog);
        }
    }

    /// Move current to the previous checked track, or stay put.
    pub fn step_back(&mut self, catalog: &Catalog) {
        if let Some(current) = self.sel.current
            && let Some(index) =
                find_prev_checked_track_index(catalog, current.playlist, current.index)
        {
            self.sel.current = Some(Slot::new(current.playlist, index));
            if !self.next_pinned {
                self.sel.next = None;
            }
        }
    }

    /// Next becomes current. Returns the new current, if any.
    pub fn advance(&mut self) -> Option<Slot> {
        self.sel.current = self.sel.next.take();
        self.next_pinned = false;
        if self.sel.current.is_some() && self.sel.current == self.arrived_tanda {
            self.arrived_tanda = None;
        }
        self.sel.current
    }

    /// With nothing current, take `next` as the track to play.
    pub fn adopt_next(&mut self) -> Option<Slot> {
        if self.sel.current.is_none() && self.sel.next.is_some() {
            self.advance();
        }
        self.sel.current
    }

    /// Arm the first checked track of `Tracks` as current.
    pub fn arm_first(&mut self, catalog: &Catalog) -> Option<Slot> {
        let tracks = catalog.tracks_playlist();
        self.sel.current =
            find_first_checked_track_index(catalog, tracks).map(|i| Slot::new(tracks, i));
        self.resolve_next(catalog);
        self.sel.current
    }

    pub fn clear_all(&mut self) {
        self.sel = Selections::default();
        self.next_pinned = false;
        self.arrived_tanda = None;
    }
}

#[cfg(test)]
mod tests;
