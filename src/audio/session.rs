use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::debug;

use super::eq::{EqPreset, clamp_band};
use super::gain::{UNITY_VOLUME, clamp_balance, clamp_volume};

/// Upper bound on how long a wait goes without re-checking its flags.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

const FADE_STEP: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy)]
struct Fade {
    level: i32,
    elapsed: Duration,
}

#[derive(Debug)]
struct SessionState {
    volume: i32,
    balance: i32,
    equalizer: Vec<i32>,
    /// Last bands the operator set by hand, restored by `EqPreset::Custom`.
    custom_equalizer: Vec<i32>,
    equalizer_enabled: bool,
    paused: bool,
    stopped: bool,
    seek: Option<u32>,
    fade: Option<Fade>,
    position: u32,
    duration: u32,
    gain_db: f32,
    /// Bumped whenever something the pipeline applies changes.
    revision: u64,
}

/// What the pipeline applies to the active line.
#[derive(Debug, Clone, PartialEq)]
pub struct Controls {
    /// Operator volume, or the fade level while fading.
    pub volume: i32,
    pub balance: i32,
    /// Band values in effect: all zero while the equalizer is disabled.
    pub equalizer: Vec<i32>,
    pub revision: u64,
}

/// Result of waiting out a pause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseWait {
    NotPaused,
    Resumed,
    Stopped,
}

/// Controls shared by the control thread and the pipeline, which reads them
/// between buffers and reports position back. The condvar wakes pause and
/// tail waits on `resume()` and `stop()`.
pub struct PlaybackSession {
    state: Mutex<SessionState>,
    wake: Condvar,
}

impl PlaybackSession {
    pub fn new(bands: usize) -> Self {
        Self {
            state: Mutex::new(SessionState {
                volume: UNITY_VOLUME,
                balance: 0,
                equalizer: vec![0; bands],
                custom_equalizer: vec![0; bands],
                equalizer_enabled: false,
                paused: false,
                stopped: false,
                seek: None,
                fade: None,
                position: 0,
                duration: 0,
                gain_db: 0.0,
                revision: 0,
            }),
            wake: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn volume(&self) -> i32 {
        self.lock().volume
    }

    /// Values outside 0..=20 are clamped.
    pub fn set_volume(&self, volume: i32) {
        let mut s = self.lock();
        s.volume = clamp_volume(volume);
        s.revision += 1;
        debug!("Setting volume to {}", s.volume);
    }

    pub fn balance(&self) -> i32 {
        self.lock().balance
    }

    pub fn set_balance(&self, balance: i32) {
        let mut s = self.lock();
        s.balance = clamp_balance(balance);
        s.revision += 1;
        debug!("Setting balance to {}", s.balance);
    }

    pub fn equalizer(&self) -> Vec<i32> {
        self.lock().equalizer.clone()
    }

    pub fn custom_equalizer(&self) -> Vec<i32> {
        self.lock().custom_equalizer.clone()
    }

    /// Returns false when `band` does not exist. The whole active curve,
    /// including this band, becomes the custom curve.
    pub fn set_equalizer_band(&self, band: usize, value: i32) -> bool {
        let mut s = self.lock();
        let Some(slot) = s.equalizer.get_mut(band) else {
            return false;
        };
        *slot = clamp_band(value);
        s.custom_equalizer = s.equalizer.clone();
        s.revision += 1;
        debug!("Setting equalizer band #{band} to {}", clamp_band(value));
        true
    }

    /// Switch the active bands to `preset`. The custom curve is kept.
    pub fn apply_preset(&self, preset: EqPreset) {
        let mut s = self.lock();
        let values = match preset {
            EqPreset::Custom => s.custom_equalizer.clone(),
            other => other.values(s.equalizer.len()),
        };
        for (slot, v) in s.equalizer.iter_mut().zip(values) {
            *slot = clamp_band(v);
        }
        s.revision += 1;
        debug!("Applying equalizer preset {preset:?}");
    }

    pub fn equalizer_enabled(&self) -> bool {
        self.lock().equalizer_enabled
    }

    pub fn set_equalizer_enabled(&self, enabled: bool) {
        let mut s = self.lock();
        s.equalizer_enabled = enabled;
        s.revision += 1;
        debug!("Equalizer {}", if enabled { "enabled" } else { "disabled" });
    }

    pub fn is_paused(&self) -> bool {
        self.lock().paused
    }

    pub fn set_paused(&self, paused: bool) {
        self.lock().paused = paused;
        self.wake.notify_all();
    }

    /// Ask the pipeline (or a tail wait) to stop where it is.
    pub fn stop(&self) {
        self.lock().stopped = true;
        self.wake.notify_all();
    }

    pub fn is_stopped(&self) -> bool {
        self.lock().stopped
    }

    /// Start decaying the volume by one step per second of playback.
    pub fn arm_fade(&self) {
        let mut s = self.lock();
        if s.fade.is_none() {
            s.fade = Some(Fade {
                level: s.volume,
                elapsed: Duration::ZERO,
            });
            s.revision += 1;
            debug!("Fade armed at volume {}", s.volume);
        }
    }

    pub fn is_fading(&self) -> bool {
        self.lock().fade.is_some()
    }

    /// Seek request. Past the end of the track this is a stop.
    pub fn request_seek(&self, position: u32) {
        let mut s = self.lock();
        if position > s.duration {
            debug!("Seek to {position}s beyond {}s, stopping", s.duration);
            s.stopped = true;
            drop(s);
            self.wake.notify_all();
            return;
        }
        s.seek = Some(position);
    }

    pub fn position(&self) -> u32 {
        self.lock().position
    }

    pub fn duration(&self) -> u32 {
        self.lock().duration
    }

    /// Gain currently applied to the line, in dB.
    pub fn gain_db(&self) -> f32 {
        self.lock().gain_db
    }

    /// Reset per-track state before a track plays.
    pub(crate) fn begin_track(&self, duration: u32) {
        let mut s = self.lock();
        s.stopped = false;
        s.seek = None;
        s.fade = None;
        s.position = 0;
        s.duration = duration;
        s.revision += 1;
    }

    pub(crate) fn take_seek(&self) -> Option<u32> {
        self.lock().seek.take()
    }

    pub(crate) fn report_position(&self, position: u32) {
        self.lock().position = position;
    }

    pub(crate) fn report_gain(&self, db: f32) {
        self.lock().gain_db = db;
    }

    pub(crate) fn revision(&self) -> u64 {
        self.lock().revision
    }

    pub(crate) fn controls(&self) -> Controls {
        let s = self.lock();
        Controls {
            volume: s.fade.map_or(s.volume, |f| f.level),
            balance: s.balance,
            equalizer: if s.equalizer_enabled {
                s.equalizer.clone()
            } else {
                vec![0; s.equalizer.len()]
            },
            revision: s.revision,
        }
    }

    /// Add playback time to an armed fade.
    ///
    /// Returns the fade level when it stepped down or has reached zero.
    pub(crate) fn advance_fade(&self, elapsed: Duration) -> Option<i32> {
        let mut s = self.lock();
        let mut fade = s.fade?;
        if fade.level == 0 {
            return Some(0);
        }
        fade.elapsed += elapsed;
        let mut stepped = false;
        while fade.elapsed >= FADE_STEP && fade.level > 0 {
            fade.elapsed -= FADE_STEP;
            fade.level -= 1;
            stepped = true;
        }
        s.fade = Some(fade);
        if stepped {
            s.revision += 1;
            Some(fade.level)
        } else {
            None
        }
    }

    /// Block while paused, waking at least every [`POLL_INTERVAL`].
    pub(crate) fn wait_while_paused(&self) -> PauseWait {
        let mut s = self.lock();
        if s.stopped {
            return PauseWait::Stopped;
        }
        if !s.paused {
            return PauseWait::NotPaused;
        }
        while s.paused && !s.stopped {
            s = self
                .wake
                .wait_timeout(s, POLL_INTERVAL)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        if s.stopped {
            PauseWait::Stopped
        } else {
            PauseWait::Resumed
        }
    }

    /// Sleep for `duration` unless a stop arrives first. Returns true if stopped.
    pub(crate) fn sleep_unless_stopped(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        let mut s = self.lock();
        while !s.stopped {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let wait = (deadline - now).min(POLL_INTERVAL);
            s = self
                .wake
                .wait_timeout(s, wait)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        s.stopped
    }
}
