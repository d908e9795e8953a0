use crate::catalog::{Catalog, Slot, TrackId};

/// The four positions the scheduler tracks. `None` means unset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selections {
    pub current: Option<Slot>,
    pub next: Option<Slot>,
    pub next_cortina: Option<Slot>,
    pub next_tanda: Option<Slot>,
}

impl Selections {
    pub fn is_idle(&self) -> bool {
        self.current.is_none()
    }
}

/// Whether `slot` is set and references `track`.
pub(crate) fn refers_to(catalog: &Catalog, slot: Option<Slot>, track: TrackId) -> bool {
    slot.and_then(|s| catalog.entry(s)) == Some(track)
}

/// Whether `slot` is set, in range and points at a checked, present track.
pub(crate) fn still_selectable(catalog: &Catalog, slot: Slot) -> bool {
    catalog.track_at(slot).is_some_and(|t| t.is_checked())
}
