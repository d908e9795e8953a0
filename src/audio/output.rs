//! Output device seam.
//!
//! The pipeline writes processed samples to an [`OutputLine`] opened per
//! track. `RodioOutput` backs it with a `rodio` sink on the default device;
//! tests substitute an in-memory line.

use std::thread;
use std::time::Duration;

use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, OutputStreamBuilder, Sink};
use tracing::debug;

use crate::error::AudioError;

use super::gain::{GainRange, db_to_amplitude};
use super::types::AudioFormat;

/// Opens one line per track.
///
/// Implementations may hold thread-bound device handles, so the play loop
/// builds its output on its own thread.
pub trait AudioOutput {
    fn open_line(&mut self, format: &AudioFormat) -> Result<Box<dyn OutputLine>, AudioError>;
}

pub trait OutputLine {
    fn gain_range(&self) -> GainRange;

    fn set_gain(&mut self, db: f32);

    /// Queue interleaved samples, blocking while the device queue is full.
    fn write(&mut self, samples: &[f32]) -> Result<(), AudioError>;

    /// Drop everything queued but not yet heard.
    fn discard(&mut self);

    /// Block until everything queued has been heard.
    fn drain(&mut self);
}

/// Buffers allowed in the sink before `write` waits.
const MAX_QUEUED_BUFFERS: usize = 4;
const QUEUE_POLL: Duration = Duration::from_millis(5);

pub struct RodioOutput {
    stream: Option<OutputStream>,
    gain_range: GainRange,
}

impl RodioOutput {
    pub fn new(gain_range: GainRange) -> Self {
        Self {
            stream: None,
            gain_range,
        }
    }
}

impl AudioOutput for RodioOutput {
    fn open_line(&mut self, format: &AudioFormat) -> Result<Box<dyn OutputLine>, AudioError> {
        if self.stream.is_none() {
            let mut stream = OutputStreamBuilder::open_default_stream()
                .map_err(|e| AudioError::Device(e.to_string()))?;
            // rodio logs to stderr when the stream is dropped; we log ourselves.
            stream.log_on_drop(false);
            self.stream = Some(stream);
        }
        let Some(stream) = self.stream.as_ref() else {
            return Err(AudioError::Device("no output stream".to_string()));
        };

        let sink = Sink::connect_new(stream.mixer());
        debug!(
            "Opened line: {} ch @ {} Hz",
            format.channels, format.sample_rate
        );
        Ok(Box::new(RodioLine {
            sink,
            channels: format.channels,
            sample_rate: format.sample_rate,
            gain_range: self.gain_range,
        }))
    }
}

struct RodioLine {
    sink: Sink,
    channels: u16,
    sample_rate: u32,
    gain_range: GainRange,
}

impl OutputLine for RodioLine {
    fn gain_range(&self) -> GainRange {
        self.gain_range
    }

    fn set_gain(&mut self, db: f32) {
        self.sink.set_volume(db_to_amplitude(db, self.gain_range));
    }

    fn write(&mut self, samples: &[f32]) -> Result<(), AudioError> {
        while self.sink.len() >= MAX_QUEUED_BUFFERS {
            thread::sleep(QUEUE_POLL);
        }
        self.sink.append(SamplesBuffer::new(
            self.channels,
            self.sample_rate,
            samples.to_vec(),
        ));
        Ok(())
    }

    fn discard(&mut self) {
        // `clear` also pauses the sink.
        self.sink.clear();
        self.sink.play();
    }

    fn drain(&mut self) {
        self.sink.sleep_until_end();
    }
}
