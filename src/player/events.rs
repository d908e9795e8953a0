use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};

use crate::catalog::{Slot, TrackId};
use crate::scheduler::Selections;

/// What the engine tells whoever owns the display.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// A track was handed to the pipeline. Already appended to History.
    TrackStarted { slot: Slot, track: TrackId },
    /// Whole seconds into the current track. Sent once per second crossed.
    PositionChanged(u32),
    SelectionChanged(Selections),
    /// The track could not be played and was skipped.
    PlaybackFailed { track: TrackId, error: String },
    /// Nothing left to play: all selections cleared and playback paused.
    Idle,
}

/// Where the play loop is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Playing,
    WaitingForTail,
}

/// Fan-out of [`PlayerEvent`]s to any number of channel subscribers.
///
/// Subscribers that hung up are dropped on the next send.
#[derive(Debug, Clone, Default)]
pub struct EventHub {
    subscribers: Arc<Mutex<Vec<Sender<PlayerEvent>>>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Receiver<PlayerEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    pub fn emit(&self, event: PlayerEvent) {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|tx| tx.send(event.clone()).is_ok());
    }
}
