//! The play loop and the operator-facing engine handle.
//!
//! One thread owns the [`Pipeline`] and plays whatever the scheduler makes
//! current. Catalog, scheduler and loop flags sit behind a single mutex so a
//! selection is never observed half-updated; audio controls live in the
//! shared [`PlaybackSession`].

mod events;

use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{error, info, warn};

use crate::audio::{
    AudioMeta, AudioOutput, BUFFER_SIZE, EqPreset, POLL_INTERVAL, Pipeline, PlaybackSession,
    UNITY_VOLUME,
};
use crate::catalog::{Catalog, Slot, TrackId, TrackMedia};
use crate::config::Settings;
use crate::error::{AudioError, ScheduleError};
use crate::scheduler::{BlockGenres, Scheduler, Selections, TandaPreview};

pub use events::{EventHub, LoopState, PlayerEvent};

/// Engine parameters, usually taken from [`Settings`].
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub bands: usize,
    pub buffer_size: usize,
    /// Silence after a track that ended naturally.
    pub wait_seconds: u64,
    /// `prev()` before this position goes to the previous track.
    pub prev_restart_seconds: u32,
    pub start_paused: bool,
    pub block_genres: Vec<String>,
    pub volume: i32,
    pub balance: i32,
    pub equalizer_enabled: bool,
    pub equalizer_preset: Option<EqPreset>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            bands: 10,
            buffer_size: BUFFER_SIZE,
            wait_seconds: 0,
            prev_restart_seconds: 4,
            start_paused: true,
            block_genres: BlockGenres::default().as_slice().to_vec(),
            volume: UNITY_VOLUME,
            balance: 0,
            equalizer_enabled: false,
            equalizer_preset: None,
        }
    }
}

impl EngineOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            bands: settings.audio.equalizer_bands,
            buffer_size: settings.audio.buffer_size,
            wait_seconds: settings.playback.wait_seconds,
            prev_restart_seconds: settings.playback.prev_restart_seconds,
            start_paused: settings.playback.start_paused,
            block_genres: settings.playback.block_genres.clone(),
            volume: settings.audio.volume,
            balance: settings.audio.balance,
            equalizer_enabled: settings.audio.equalizer_enabled,
            equalizer_preset: settings.audio.equalizer_preset,
        }
    }
}

struct Deck {
    catalog: Catalog,
    scheduler: Scheduler,
    state: LoopState,
    /// On stop, move on to the resolved next track.
    proceed: bool,
    shutdown: bool,
}

struct Shared {
    deck: Mutex<Deck>,
    /// Wakes the idle play loop when something becomes current.
    wake: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Deck> {
        self.deck.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// What the play loop needs to play the current track without the lock.
struct Job {
    slot: Slot,
    track: TrackId,
    path: PathBuf,
    meta: AudioMeta,
}

pub struct Engine {
    shared: Arc<Shared>,
    session: Arc<PlaybackSession>,
    events: EventHub,
    options: EngineOptions,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl Engine {
    /// Arm the first checked track and start the play loop.
    ///
    /// `make_output` runs on the play loop thread, so device handles that
    /// must stay on one thread can be built there.
    pub fn start<F>(catalog: Catalog, options: EngineOptions, make_output: F) -> Self
    where
        F: FnOnce() -> Box<dyn AudioOutput> + Send + 'static,
    {
        Self::start_with_events(catalog, options, EventHub::new(), make_output)
    }

    /// Like [`Engine::start`], with subscribers attached before the first event.
    pub fn start_with_events<F>(
        catalog: Catalog,
        options: EngineOptions,
        events: EventHub,
        make_output: F,
    ) -> Self
    where
        F: FnOnce() -> Box<dyn AudioOutput> + Send + 'static,
    {
        let session = Arc::new(PlaybackSession::new(options.bands));
        session.set_volume(options.volume);
        session.set_balance(options.balance);
        session.set_equalizer_enabled(options.equalizer_enabled);
        if let Some(preset) = options.equalizer_preset {
            session.apply_preset(preset);
        }
        session.set_paused(options.start_paused);

        let mut scheduler = Scheduler::new(BlockGenres::new(options.block_genres.clone()));
        if scheduler.arm_first(&catalog).is_none() {
            warn!("No checked tracks to play");
        }

        let shared = Arc::new(Shared {
            deck: Mutex::new(Deck {
                catalog,
                scheduler,
                state: LoopState::Idle,
                proceed: true,
                shutdown: false,
            }),
            wake: Condvar::new(),
        });

        let handle = {
            let shared = shared.clone();
            let session = session.clone();
            let events = events.clone();
            let options = options.clone();
            thread::spawn(move || {
                let pipeline = Pipeline::new(
                    session.clone(),
                    make_output(),
                    options.bands,
                    options.buffer_size,
                );
                PlayLoop {
                    shared,
                    session,
                    events,
                    wait: Duration::from_secs(options.wait_seconds),
                    pipeline,
                }
                .run();
            })
        };

        Self {
            shared,
            session,
            events,
            options,
            join: Mutex::new(Some(handle)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Deck> {
        self.shared.lock()
    }

    fn selection_changed(&self, deck: &Deck) {
        self.events
            .emit(PlayerEvent::SelectionChanged(deck.scheduler.selections()));
        self.shared.wake.notify_all();
    }

    pub fn subscribe(&self) -> Receiver<PlayerEvent> {
        self.events.subscribe()
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn session(&self) -> &Arc<PlaybackSession> {
        &self.session
    }

    pub fn selections(&self) -> Selections {
        self.lock().scheduler.selections()
    }

    pub fn next_tanda(&self) -> Option<TandaPreview> {
        let deck = self.lock();
        deck.scheduler.next_tanda(&deck.catalog)
    }

    /// The lookahead line, or an empty string when no tanda is in sight.
    pub fn next_tanda_text(&self) -> String {
        self.next_tanda()
            .map(|p| p.to_string())
            .unwrap_or_default()
    }

    pub fn loop_state(&self) -> LoopState {
        self.lock().state
    }

    pub fn with_catalog<R>(&self, f: impl FnOnce(&Catalog) -> R) -> R {
        f(&self.lock().catalog)
    }

    pub fn position(&self) -> u32 {
        self.session.position()
    }

    pub fn duration(&self) -> u32 {
        self.session.duration()
    }

    pub fn is_paused(&self) -> bool {
        self.session.is_paused()
    }

    pub fn volume(&self) -> i32 {
        self.session.volume()
    }

    pub fn balance(&self) -> i32 {
        self.session.balance()
    }

    pub fn gain_db(&self) -> f32 {
        self.session.gain_db()
    }

    pub fn equalizer(&self) -> Vec<i32> {
        self.session.equalizer()
    }

    pub fn equalizer_enabled(&self) -> bool {
        self.session.equalizer_enabled()
    }

    pub fn set_next_track(&self, slot: Slot) -> Result<(), ScheduleError> {
        let mut deck = self.lock();
        let Deck {
            catalog, scheduler, ..
        } = &mut *deck;
        scheduler.set_next_track(catalog, slot)?;
        self.selection_changed(&deck);
        Ok(())
    }

    pub fn set_next_cortina(&self, slot: Slot) -> Result<(), ScheduleError> {
        let mut deck = self.lock();
        let Deck {
            catalog, scheduler, ..
        } = &mut *deck;
        scheduler.set_next_cortina(catalog, slot)?;
        self.selection_changed(&deck);
        Ok(())
    }

    pub fn set_next_tanda(&self, slot: Slot) -> Result<(), ScheduleError> {
        let mut deck = self.lock();
        let Deck {
            catalog, scheduler, ..
        } = &mut *deck;
        scheduler.set_next_tanda(catalog, slot)?;
        self.selection_changed(&deck);
        Ok(())
    }

    /// Play `slot` now: it becomes next and the current track is stopped.
    pub fn play_now(&self, slot: Slot) -> Result<(), ScheduleError> {
        {
            let mut deck = self.lock();
            let Deck {
                catalog, scheduler, ..
            } = &mut *deck;
            if scheduler.next() != Some(slot) {
                scheduler.set_next_track(catalog, slot)?;
            }
            if scheduler.current().is_none() {
                // Idle: the loop adopts next as current.
                self.selection_changed(&deck);
                drop(deck);
                self.session.set_paused(false);
                return Ok(());
            }
            deck.proceed = true;
            self.selection_changed(&deck);
        }
        self.session.set_paused(false);
        self.session.stop();
        Ok(())
    }

    /// Set a track's checked flag. Returns the flag actually stored.
    pub fn check_track(&self, track: TrackId, checked: bool) -> bool {
        let mut deck = self.lock();
        let Deck {
            catalog, scheduler, ..
        } = &mut *deck;
        let stored = catalog.set_checked(track, checked);
        if scheduler.on_checked_changed(catalog, track, stored) {
            self.selection_changed(&deck);
        }
        stored
    }

    pub fn set_title(&self, track: TrackId, title: &str) {
        self.lock().catalog.set_title(track, title);
    }

    pub fn set_tag(&self, track: TrackId, name: &str, value: &str) {
        self.lock().catalog.set_tag(track, name, value);
    }

    /// Go back: early in a track, to the previous checked track; later, to
    /// the start of the same track.
    pub fn prev(&self) {
        {
            let mut deck = self.lock();
            if deck.scheduler.current().is_none() {
                return;
            }
            if self.session.position() < self.options.prev_restart_seconds {
                let Deck {
                    catalog, scheduler, ..
                } = &mut *deck;
                scheduler.step_back(catalog);
            }
            deck.proceed = false;
        }
        self.session.stop();
    }

    /// Skip to the resolved next track. While idle, re-arm from the top.
    pub fn next(&self) {
        {
            let mut deck = self.lock();
            if self.rearm_if_idle(&mut deck) {
                return;
            }
            deck.proceed = true;
        }
        self.session.stop();
    }

    fn rearm_if_idle(&self, deck: &mut Deck) -> bool {
        let sel = deck.scheduler.selections();
        if sel.current.is_some() || sel.next.is_some() {
            return false;
        }
        let Deck {
            catalog, scheduler, ..
        } = &mut *deck;
        if let Some(slot) = scheduler.arm_first(catalog) {
            info!("Re-armed at {slot:?}");
        }
        self.selection_changed(deck);
        true
    }

    /// Start fading the current track out; it stops when silent.
    pub fn fade(&self) {
        self.session.arm_fade();
    }

    pub fn pause(&self, paused: bool) {
        if !paused {
            let mut deck = self.lock();
            self.rearm_if_idle(&mut deck);
        }
        self.session.set_paused(paused);
    }

    /// Seek within the current track. Past the end this is a stop.
    pub fn set_position(&self, seconds: u32) {
        self.session.request_seek(seconds);
    }

    pub fn set_volume(&self, volume: i32) {
        self.session.set_volume(volume);
    }

    pub fn set_balance(&self, balance: i32) {
        self.session.set_balance(balance);
    }

    pub fn set_equalizer_band(&self, band: usize, value: i32) -> bool {
        self.session.set_equalizer_band(band, value)
    }

    pub fn set_equalizer_enabled(&self, enabled: bool) {
        self.session.set_equalizer_enabled(enabled);
    }

    /// `EqPreset::Custom` brings back the last hand-set bands.
    pub fn apply_equalizer_preset(&self, preset: EqPreset) {
        self.session.apply_preset(preset);
    }

    pub fn custom_equalizer(&self) -> Vec<i32> {
        self.session.custom_equalizer()
    }

    /// Stop playback and wait for the play loop to exit.
    pub fn shutdown(&self) {
        self.lock().shutdown = true;
        self.shared.wake.notify_all();
        self.session.stop();

        let handle = self
            .join
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(h) = handle {
            if h.join().is_err() {
                error!("Play loop panicked");
            }
            info!("Play loop stopped");
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct PlayLoop {
    shared: Arc<Shared>,
    session: Arc<PlaybackSession>,
    events: EventHub,
    wait: Duration,
    pipeline: Pipeline,
}

impl PlayLoop {
    fn run(mut self) {
        info!("Starting play loop");
        while let Some(job) = self.wait_for_current() {
            let events = self.events.clone();
            let result = self.pipeline.play(&job.path, &job.meta, |p| {
                events.emit(PlayerEvent::PositionChanged(p));
            });

            let failure = match result {
                Ok(outcome) => {
                    if outcome.ended_naturally() && !self.wait.is_zero() {
                        self.shared.lock().state = LoopState::WaitingForTail;
                        self.session.sleep_unless_stopped(self.wait);
                    }
                    None
                }
                Err(err) => {
                    error!("Error while playing {}: {err}", job.path.display());
                    self.events.emit(PlayerEvent::PlaybackFailed {
                        track: job.track,
                        error: err.to_string(),
                    });
                    Some(err)
                }
            };
            self.finish_track(job.slot, failure);
        }
    }

    /// Block until something is current, then prepare it for playing.
    ///
    /// Returns `None` on shutdown.
    fn wait_for_current(&self) -> Option<Job> {
        let mut deck = self.shared.lock();
        loop {
            if deck.shutdown {
                return None;
            }
            let Some(slot) = deck.scheduler.adopt_next() else {
                deck.state = LoopState::Idle;
                deck = self
                    .shared
                    .wake
                    .wait_timeout(deck, POLL_INTERVAL)
                    .unwrap_or_else(PoisonError::into_inner)
                    .0;
                continue;
            };

            let found = deck.catalog.entry(slot).and_then(|id| {
                let track = deck.catalog.track(id)?;
                match track.media() {
                    TrackMedia::Present(meta) => {
                        Some((id, track.filename().to_path_buf(), *meta, track.title().to_string()))
                    }
                    TrackMedia::Missing => None,
                }
            });
            let Some((id, path, meta, title)) = found else {
                warn!("Current track at {slot:?} is unavailable, skipping");
                let Deck {
                    catalog, scheduler, ..
                } = &mut *deck;
                scheduler.refresh_next(catalog);
                if scheduler.advance().is_none() {
                    self.go_idle(&mut deck);
                }
                continue;
            };

            let Deck {
                catalog, scheduler, ..
            } = &mut *deck;
            catalog.append_history(id);
            scheduler.refresh_next(catalog);
            let selections = scheduler.selections();
            let lookahead = scheduler.next_tanda(catalog);
            deck.state = LoopState::Playing;
            self.session.begin_track(meta.duration);
            drop(deck);

            info!("Now playing: {title}");
            if let Some(preview) = lookahead {
                info!("{preview}");
            }
            self.events
                .emit(PlayerEvent::TrackStarted { slot, track: id });
            self.events.emit(PlayerEvent::SelectionChanged(selections));
            return Some(Job {
                slot,
                track: id,
                path,
                meta,
            });
        }
    }

    /// Move on after a track: to next when proceeding, or back to the loop
    /// top with current untouched after `prev()`.
    fn finish_track(&self, played: Slot, failure: Option<AudioError>) {
        let mut deck = self.shared.lock();
        let failed = failure.is_some();

        if let Some(err) = &failure
            && err.is_decode()
        {
            let Deck {
                catalog, scheduler, ..
            } = &mut *deck;
            if let Some(id) = catalog.entry(played) {
                warn!("Marking {:?} missing", catalog.track(id).map(|t| t.title()));
                catalog.mark_missing(id);
            }
            scheduler.revalidate(catalog);
        }

        // A failed track is never retried in place.
        let proceed = deck.proceed || (failed && deck.scheduler.current() == Some(played));
        deck.proceed = true;
        if !proceed {
            return;
        }

        if deck.scheduler.advance().is_none() {
            self.go_idle(&mut deck);
        }
    }

    fn go_idle(&self, deck: &mut Deck) {
        info!("No next track, returning to idle");
        deck.scheduler.clear_all();
        deck.state = LoopState::Idle;
        self.session.set_paused(true);
        self.events
            .emit(PlayerEvent::SelectionChanged(deck.scheduler.selections()));
        self.events.emit(PlayerEvent::Idle);
    }
}
