use super::*;
use crate::catalog::{Catalog, PlaylistId, Slot, Track, TrackId};
use crate::testutil::{missing_track, track};

fn catalog_of(tracks: Vec<Track>) -> Catalog {
    Catalog::new(tracks, Vec::new())
}

/// `[CortinaA, T1, T2, T3 (Tango), T4 (Vals)]`
fn scenario(orchestras: [&str; 3]) -> Catalog {
    catalog_of(vec![
        track("CortinaA", None, None),
        track("T1", Some("Tango"), Some(orchestras[0])),
        track("T2", Some("Tango"), Some(orchestras[1])),
        track("T3", Some("Tango"), Some(orchestras[2])),
        track("T4", Some("Vals"), Some("Canaro")),
    ])
}

/// Two tandas separated by cortinas:
/// `C0 T1 T2 T3 C4 V5 V6 V7 C8 T9 T10 T11`
fn milonga() -> Catalog {
    catalog_of(vec![
        track("C0", None, None),
        track("T1", Some("Tango"), Some("Di Sarli")),
        track("T2", Some("Tango"), Some("Di Sarli")),
        track("T3", Some("Tango"), Some("Di Sarli")),
        track("C4", Some("Cortina"), None),
        track("V5", Some("Vals"), Some("Canaro")),
        track("V6", Some("Vals"), Some("Canaro")),
        track("V7", Some("Vals"), Some("Canaro")),
        track("C8", Some("Cortina"), None),
        track("T9", Some("Tango"), Some("Pugliese")),
        track("T10", Some("Tango"), Some("Pugliese")),
        track("T11", Some("Tango"), Some("Pugliese")),
    ])
}

fn slot(catalog: &Catalog, index: usize) -> Slot {
    Slot::new(catalog.tracks_playlist(), index)
}

fn index_of(s: Option<Slot>) -> Option<usize> {
    s.map(|s| s.index)
}

/// Arm the first track and advance until `index` is current.
fn walk_to(catalog: &Catalog, index: usize) -> Scheduler {
    let mut sched = Scheduler::new(BlockGenres::default());
    sched.arm_first(catalog);
    while index_of(sched.current()) != Some(index) {
        assert!(sched.advance().is_some(), "ran out before {index}");
        sched.refresh_next(catalog);
    }
    sched
}

#[test]
fn scenario_cortina_then_three_tangos() {
    let catalog = scenario(["Canaro", "Canaro", "Canaro"]);
    let sched = walk_to(&catalog, 0);

    assert_eq!(index_of(sched.next()), Some(1));
    let preview = sched.next_tanda(&catalog).unwrap();
    assert_eq!(preview.genre, "Tango");
    assert_eq!(preview.orchestra, "Canaro");
    assert_eq!(preview.to_string(), "Next Tanda:  Canaro (Tango)");
}

#[test]
fn scenario_with_disagreeing_orchestras_is_mixed() {
    let catalog = scenario(["Canaro", "D'Arienzo", "Canaro"]);
    let sched = walk_to(&catalog, 0);
    let preview = sched.next_tanda(&catalog).unwrap();
    assert_eq!(preview.genre, "Tango");
    assert_eq!(preview.orchestra, MIXED_ORCHESTRA);
}

#[test]
fn next_tanda_needs_a_leading_cortina_and_three_tracks() {
    let catalog = milonga();
    // Current T1, next T2: the Tango run is not preceded by a cortina, so the
    // preview is the Vals tanda after C4.
    let sched = walk_to(&catalog, 1);
    let preview = sched.next_tanda(&catalog).unwrap();
    assert_eq!((preview.genre.as_str(), preview.orchestra.as_str()), ("Vals", "Canaro"));

    let short = catalog_of(vec![
        track("C", None, None),
        track("T1", Some("Tango"), Some("Canaro")),
        track("T2", Some("Tango"), Some("Canaro")),
        track("V", Some("Vals"), Some("Canaro")),
    ]);
    let sched = walk_to(&short, 0);
    assert_eq!(sched.next_tanda(&short), None);
}

#[test]
fn next_tanda_steps_over_unchecked_tracks_and_does_not_mutate() {
    let mut catalog = milonga();
    catalog.set_checked(TrackId(2), false);
    let sched = walk_to(&catalog, 0);
    let before = sched.selections();
    // T1, T3 and then the cortina C4 break the run: no Tango tanda of three.
    let preview = sched.next_tanda(&catalog).unwrap();
    assert_eq!(preview.genre, "Vals");
    assert_eq!(sched.selections(), before);
}

#[test]
fn find_next_never_goes_backward() {
    let mut catalog = milonga();
    catalog.set_checked(TrackId(5), false);
    catalog.set_checked(TrackId(11), false);
    let pl = catalog.tracks_playlist();
    let len = catalog.playlist(pl).unwrap().len();

    for from in 0..len + 2 {
        let found = find_next_checked_track_index(&catalog, pl, from);
        let later_exists = (from + 1..len).any(|i| catalog.track_at(slot(&catalog, i)).unwrap().is_checked());
        assert_eq!(found.is_some(), later_exists, "from {from}");
        if let Some(i) = found {
            assert!(i > from);
            assert!(catalog.track_at(slot(&catalog, i)).unwrap().is_checked());
            assert!((from + 1..i).all(|j| !catalog.track_at(slot(&catalog, j)).unwrap().is_checked()));
        }
    }
    assert_eq!(find_next_checked_track_index(&catalog, pl, 4), Some(6));
    assert_eq!(find_next_checked_track_index(&catalog, pl, 10), None);
    assert_eq!(find_next_checked_track_index(&catalog, PlaylistId(99), 0), None);
}

#[test]
fn missing_tracks_are_skipped() {
    let catalog = catalog_of(vec![
        track("A", None, None),
        missing_track("B", Some("Tango")),
        track("C", Some("Tango"), None),
    ]);
    let pl = catalog.tracks_playlist();
    assert_eq!(find_next_checked_track_index(&catalog, pl, 0), Some(2));
    assert_eq!(find_prev_checked_track_index(&catalog, pl, 2), Some(0));
    assert_eq!(find_first_checked_track_index(&catalog, pl), Some(0));
}

#[test]
fn find_prev_returns_nearest_earlier_checked() {
    let mut catalog = milonga();
    catalog.set_checked(TrackId(2), false);
    let pl = catalog.tracks_playlist();
    assert_eq!(find_prev_checked_track_index(&catalog, pl, 3), Some(1));
    assert_eq!(find_prev_checked_track_index(&catalog, pl, 0), None);
}

#[test]
fn last_track_in_tanda_only_at_the_genre_boundary() {
    let catalog = milonga();
    let genres = BlockGenres::default();
    let at = |i: usize, next: Option<usize>| {
        is_last_track_in_tanda(
            &catalog,
            slot(&catalog, i),
            next.map(|n| slot(&catalog, n)),
            &genres,
        )
    };
    assert!(at(3, Some(4)));
    assert!(at(3, None));
    assert!(!at(2, Some(3)));
    assert!(!at(1, Some(2)));
    assert!(!at(0, Some(1)));
    assert!(!at(4, Some(5)));
    assert!(at(7, Some(8)));
    // Next has the same genre: the tanda goes on.
    assert!(!at(3, Some(9)));
}

#[test]
fn cortina_override_takes_effect_at_end_of_tanda() {
    let catalog = milonga();
    let mut sched = walk_to(&catalog, 0);
    sched.set_next_cortina(&catalog, slot(&catalog, 8)).unwrap();
    // Not at a tanda boundary yet.
    assert_eq!(index_of(sched.next()), Some(1));

    let mut sched = walk_to(&catalog, 3);
    sched.set_next_cortina(&catalog, slot(&catalog, 8)).unwrap();
    assert_eq!(index_of(sched.next()), Some(8));
    // The override persists until replaced.
    assert_eq!(index_of(sched.selections().next_cortina), Some(8));
}

#[test]
fn tanda_override_follows_a_cortina_and_clears_on_arrival() {
    let catalog = milonga();
    let mut sched = walk_to(&catalog, 0);
    sched.set_next_tanda(&catalog, slot(&catalog, 9)).unwrap();
    assert_eq!(index_of(sched.next()), Some(9));
    assert_eq!(sched.selections().next_tanda, None);
}

#[test]
fn tanda_override_waits_while_a_tanda_plays() {
    let catalog = milonga();
    let mut sched = walk_to(&catalog, 1);
    sched.set_next_tanda(&catalog, slot(&catalog, 9)).unwrap();
    assert_eq!(index_of(sched.next()), Some(2));
    assert_eq!(index_of(sched.selections().next_tanda), Some(9));
}

#[test]
fn arrived_tanda_survives_a_later_cortina_override() {
    let catalog = milonga();
    let mut sched = walk_to(&catalog, 0);
    sched.set_next_tanda(&catalog, slot(&catalog, 9)).unwrap();
    assert_eq!(index_of(sched.next()), Some(9));

    sched.set_next_cortina(&catalog, slot(&catalog, 8)).unwrap();
    assert_eq!(index_of(sched.next()), Some(9));
    assert_eq!(index_of(sched.selections().next_cortina), Some(8));
}

#[test]
fn arrived_tanda_survives_refresh_and_revalidate() {
    let mut catalog = milonga();
    let mut sched = walk_to(&catalog, 0);
    sched.set_next_tanda(&catalog, slot(&catalog, 9)).unwrap();

    sched.refresh_next(&catalog);
    assert_eq!(index_of(sched.next()), Some(9));

    catalog.mark_missing(TrackId(1));
    sched.revalidate(&catalog);
    assert_eq!(index_of(sched.next()), Some(9));

    // Losing the target itself falls back to the default successor.
    catalog.mark_missing(TrackId(9));
    sched.revalidate(&catalog);
    assert_eq!(index_of(sched.next()), Some(2));
    sched.refresh_next(&catalog);
    assert_eq!(index_of(sched.next()), Some(2));
}

#[test]
fn arrived_tanda_is_reapplied_after_stepping_back() {
    let catalog = milonga();
    let mut sched = walk_to(&catalog, 4);
    sched.set_next_tanda(&catalog, slot(&catalog, 9)).unwrap();
    assert_eq!(index_of(sched.next()), Some(9));

    sched.step_back(&catalog);
    sched.refresh_next(&catalog);
    assert_eq!(index_of(sched.current()), Some(3));
    assert_eq!(index_of(sched.next()), Some(4));

    assert_eq!(index_of(sched.advance()), Some(4));
    sched.refresh_next(&catalog);
    assert_eq!(index_of(sched.next()), Some(9));

    assert_eq!(index_of(sched.advance()), Some(9));
    sched.refresh_next(&catalog);
    assert_eq!(index_of(sched.next()), Some(10));
}

#[test]
fn applied_cortina_override_survives_refresh_revalidate_and_step_back() {
    let mut catalog = milonga();
    let mut sched = walk_to(&catalog, 3);
    sched.set_next_cortina(&catalog, slot(&catalog, 8)).unwrap();
    assert_eq!(index_of(sched.next()), Some(8));

    sched.refresh_next(&catalog);
    assert_eq!(index_of(sched.next()), Some(8));

    catalog.mark_missing(TrackId(4));
    sched.revalidate(&catalog);
    assert_eq!(index_of(sched.next()), Some(8));

    sched.step_back(&catalog);
    sched.refresh_next(&catalog);
    assert_eq!(index_of(sched.next()), Some(3));
    sched.advance();
    sched.refresh_next(&catalog);
    assert_eq!(index_of(sched.next()), Some(8));
}

#[test]
fn overrides_check_the_role_of_the_target() {
    let catalog = milonga();
    let mut sched = walk_to(&catalog, 0);
    assert_eq!(
        sched.set_next_cortina(&catalog, slot(&catalog, 5)),
        Err(ScheduleError::NotCortina)
    );
    assert_eq!(
        sched.set_next_tanda(&catalog, slot(&catalog, 4)),
        Err(ScheduleError::NotTandaStart)
    );
}

#[test]
fn overrides_reject_current_next_and_unselectable_rows() {
    let mut catalog = milonga();
    catalog.set_checked(TrackId(6), false);
    catalog.mark_missing(TrackId(7));
    let mut sched = walk_to(&catalog, 0);

    assert_eq!(
        { let s = slot(&catalog, 0); sched.set_next_track(&mut catalog, s) },
        Err(ScheduleError::AlreadyCurrent)
    );
    assert_eq!(
        { let s = slot(&catalog, 1); sched.set_next_track(&mut catalog, s) },
        Err(ScheduleError::AlreadyNext)
    );
    assert_eq!(
        { let s = slot(&catalog, 7); sched.set_next_track(&mut catalog, s) },
        Err(ScheduleError::Missing)
    );
    assert_eq!(
        sched.set_next_tanda(&catalog, slot(&catalog, 6)),
        Err(ScheduleError::NotSelectable)
    );
    assert_eq!(
        { let s = slot(&catalog, 12); sched.set_next_track(&mut catalog, s) },
        Err(ScheduleError::OutOfRange { index: 12, len: 12 })
    );
    assert_eq!(
        sched.set_next_track(&mut catalog, Slot::new(PlaylistId(9), 0)),
        Err(ScheduleError::UnknownPlaylist)
    );
}

#[test]
fn playing_an_unchecked_row_next_checks_it() {
    let mut catalog = milonga();
    catalog.set_checked(TrackId(6), false);
    let mut sched = walk_to(&catalog, 0);

    { let s = slot(&catalog, 6); sched.set_next_track(&mut catalog, s) }.unwrap();
    assert_eq!(index_of(sched.next()), Some(6));
    assert!(sched.is_next_pinned());
    assert!(catalog.track(TrackId(6)).unwrap().is_checked());
    assert!(!catalog.track(TrackId(7)).unwrap().is_missing());
}

#[test]
fn manual_next_survives_override_changes() {
    let mut catalog = milonga();
    let mut sched = walk_to(&catalog, 3);
    { let s = slot(&catalog, 6); sched.set_next_track(&mut catalog, s) }.unwrap();
    assert!(sched.is_next_pinned());
    sched.set_next_cortina(&catalog, slot(&catalog, 8)).unwrap();
    assert_eq!(index_of(sched.next()), Some(6));

    sched.refresh_next(&catalog);
    assert_eq!(index_of(sched.next()), Some(6));

    assert_eq!(index_of(sched.advance()), Some(6));
    assert!(!sched.is_next_pinned());
}

#[test]
fn unchecking_next_re_resolves() {
    let mut catalog = milonga();
    let mut sched = walk_to(&catalog, 0);
    assert!(!catalog.set_checked(TrackId(1), false));
    assert!(sched.on_checked_changed(&catalog, TrackId(1), false));
    assert_eq!(index_of(sched.next()), Some(2));
}

#[test]
fn unchecking_an_override_target_clears_it() {
    let mut catalog = milonga();
    let mut sched = walk_to(&catalog, 1);
    sched.set_next_cortina(&catalog, slot(&catalog, 8)).unwrap();
    sched.set_next_tanda(&catalog, slot(&catalog, 9)).unwrap();

    catalog.set_checked(TrackId(8), false);
    assert!(sched.on_checked_changed(&catalog, TrackId(8), false));
    assert_eq!(sched.selections().next_cortina, None);
    assert_eq!(index_of(sched.selections().next_tanda), Some(9));

    catalog.set_checked(TrackId(9), false);
    assert!(sched.on_checked_changed(&catalog, TrackId(9), false));
    assert_eq!(sched.selections().next_tanda, None);
    assert_eq!(index_of(sched.next()), Some(2));
}

#[test]
fn checking_between_current_and_next_replaces_next() {
    let mut catalog = milonga();
    catalog.set_checked(TrackId(1), false);
    catalog.set_checked(TrackId(2), false);
    let mut sched = walk_to(&catalog, 0);
    assert_eq!(index_of(sched.next()), Some(3));

    catalog.set_checked(TrackId(2), true);
    assert!(sched.on_checked_changed(&catalog, TrackId(2), true));
    assert_eq!(index_of(sched.next()), Some(2));

    // Earlier wins.
    catalog.set_checked(TrackId(1), true);
    assert!(sched.on_checked_changed(&catalog, TrackId(1), true));
    assert_eq!(index_of(sched.next()), Some(1));

    // Checking something after next changes nothing.
    assert!(!sched.on_checked_changed(&catalog, TrackId(7), true));
}

#[test]
fn revalidate_drops_selections_on_missing_tracks() {
    let mut catalog = milonga();
    let mut sched = walk_to(&catalog, 3);
    sched.set_next_tanda(&catalog, slot(&catalog, 9)).unwrap();
    catalog.mark_missing(TrackId(4));
    catalog.mark_missing(TrackId(9));
    sched.revalidate(&catalog);
    assert_eq!(index_of(sched.next()), Some(5));
    assert_eq!(sched.selections().next_tanda, None);
    assert_eq!(index_of(sched.current()), Some(3));
}

#[test]
fn step_back_moves_to_previous_checked_or_stays() {
    let mut catalog = milonga();
    catalog.set_checked(TrackId(2), false);
    let mut sched = walk_to(&catalog, 3);
    sched.step_back(&catalog);
    assert_eq!(index_of(sched.current()), Some(1));
    sched.refresh_next(&catalog);
    assert_eq!(index_of(sched.next()), Some(3));

    let mut sched = walk_to(&catalog, 0);
    sched.step_back(&catalog);
    assert_eq!(index_of(sched.current()), Some(0));
}

#[test]
fn end_of_playlist_resolves_to_nothing() {
    let catalog = milonga();
    let mut sched = walk_to(&catalog, 11);
    assert_eq!(sched.next(), None);
    assert_eq!(sched.advance(), None);
    assert!(sched.selections().is_idle());
}

#[test]
fn idle_scheduler_adopts_a_manual_next() {
    let mut catalog = milonga();
    let mut sched = Scheduler::new(BlockGenres::default());
    { let s = slot(&catalog, 5); sched.set_next_track(&mut catalog, s) }.unwrap();
    assert_eq!(index_of(sched.adopt_next()), Some(5));
    assert_eq!(sched.next(), None);
    sched.refresh_next(&catalog);
    assert_eq!(index_of(sched.next()), Some(6));

    sched.clear_all();
    assert_eq!(sched.selections(), Selections::default());
}

#[test]
fn block_genres_match_exactly() {
    let genres = BlockGenres::new(["Tango", "Vals"]);
    assert!(genres.contains("Tango"));
    assert!(!genres.contains("tango"));
    assert!(!genres.contains("Milonga"));
    assert_eq!(genres.classify(&track("x", Some("Milonga"), None)), Role::Cortina);
    assert_eq!(genres.classify(&track("y", None, None)), Role::Cortina);
    assert_eq!(genres.classify(&track("z", Some("Vals"), None)), Role::Tanda);
}
