use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::error::AudioError;

use super::eq::Equalizer;
use super::gain::{apply_balance, balance_weights, volume_to_db};
use super::output::AudioOutput;
use super::session::{PauseWait, PlaybackSession};
use super::stream::PcmStream;
use super::types::AudioMeta;

/// Bytes read from the file per iteration.
pub const BUFFER_SIZE: usize = 8192;

/// How a call to [`Pipeline::play`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayOutcome {
    /// Whole seconds played when playback ended.
    pub position: u32,
    pub duration: u32,
    /// A stop (or out-of-range seek) interrupted playback.
    pub stopped: bool,
    /// An armed fade reached volume 0.
    pub faded_out: bool,
}

impl PlayOutcome {
    /// The track played to its end, so the tail wait applies.
    pub fn ended_naturally(&self) -> bool {
        !self.stopped && self.position >= self.duration
    }
}

pub struct Pipeline {
    session: Arc<PlaybackSession>,
    output: Box<dyn AudioOutput>,
    bands: usize,
    buffer_size: usize,
}

impl Pipeline {
    pub fn new(
        session: Arc<PlaybackSession>,
        output: Box<dyn AudioOutput>,
        bands: usize,
        buffer_size: usize,
    ) -> Self {
        Self {
            session,
            output,
            bands,
            buffer_size: buffer_size.max(1),
        }
    }

    pub fn session(&self) -> &Arc<PlaybackSession> {
        &self.session
    }

    /// Play `path` to completion or interruption.
    ///
    /// `on_position` fires once per whole second crossed, including jumps
    /// caused by seeking. Open failures (bad file, no device) are returned
    /// before any audio is written.
    pub fn play(
        &mut self,
        path: &Path,
        meta: &AudioMeta,
        mut on_position: impl FnMut(u32),
    ) -> Result<PlayOutcome, AudioError> {
        let mut stream = PcmStream::open(path)?;
        let format = *stream.format();
        let mut line = self.output.open_line(&format)?;
        let range = line.gain_range();

        let frame_size = format.frame_size().max(1);
        let bytes_per_second = format.bytes_per_second().max(1);
        let frames_per_buffer = (self.buffer_size as u64 / frame_size).max(1) as usize;
        let duration = meta.duration;

        let mut eq = Equalizer::new(self.bands, format.channels, format.sample_rate);
        let mut weights = (1.0, 1.0);
        let mut applied: Option<u64> = None;

        let mut samples = Vec::with_capacity(frames_per_buffer * format.channels as usize);
        let mut total_bytes: u64 = 0;
        let mut position: u32 = 0;
        let mut stopped = false;
        let mut faded_out = false;
        let mut last_tick = Instant::now();

        info!("Playing {} ({duration}s)", path.display());

        loop {
            let frames = stream.read_frames(&mut samples, frames_per_buffer)?;
            if frames == 0 {
                break;
            }
            total_bytes += frames as u64 * frame_size;

            let second = (total_bytes / bytes_per_second) as u32;
            if second != position {
                position = second;
                self.session.report_position(position);
                on_position(position);
            }

            match self.session.wait_while_paused() {
                PauseWait::Stopped => {
                    stopped = true;
                    break;
                }
                PauseWait::Resumed => last_tick = Instant::now(),
                PauseWait::NotPaused => {}
            }

            if let Some(target) = self.session.take_seek().filter(|&t| t != position) {
                let target_frames = target as u64 * format.sample_rate as u64;
                if target > position {
                    debug!("Seeking forward to {target}s");
                    let current_frames = total_bytes / frame_size;
                    let skipped = stream.skip_frames(target_frames.saturating_sub(current_frames))?;
                    total_bytes += skipped * frame_size;
                } else {
                    // PCM streams only move forward: start over from the file.
                    debug!("Seeking backward to {target}s");
                    stream = PcmStream::open(path)?;
                    eq.reset();
                    line.discard();
                    let skipped = stream.skip_frames(target_frames)?;
                    total_bytes = skipped * frame_size;
                }
                position = (total_bytes / bytes_per_second) as u32;
                self.session.report_position(position);
                on_position(position);
                continue;
            }

            let revision = self.session.revision();
            if applied != Some(revision) {
                let controls = self.session.controls();
                let db = volume_to_db(controls.volume, range);
                line.set_gain(db);
                self.session.report_gain(db);
                eq.set_bands(&controls.equalizer);
                weights = balance_weights(controls.balance);
                applied = Some(controls.revision);
            }

            eq.process(&mut samples);
            apply_balance(&mut samples, format.channels, weights);
            line.write(&samples)?;

            let now = Instant::now();
            if let Some(level) = self.session.advance_fade(now - last_tick) {
                debug!("Fade level {level}");
                if level == 0 {
                    faded_out = true;
                    break;
                }
            }
            last_tick = now;
        }

        if stopped || faded_out {
            line.discard();
        } else {
            line.drain();
        }

        debug!(
            "Finished {} at {position}s (stopped: {stopped}, faded: {faded_out})",
            path.display()
        );
        Ok(PlayOutcome {
            position,
            duration,
            stopped,
            faded_out,
        })
    }
}
