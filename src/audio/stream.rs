use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use hound::WavReader;

use crate::error::AudioError;

use super::types::{AudioFormat, AudioMeta, SampleFormat};

/// Read a file's header and compute its duration.
///
/// Runs once per track when the catalog is loaded. The reader is dropped
/// straight away so no file handles stay open.
pub fn probe(path: &Path) -> Result<AudioMeta, AudioError> {
    let reader = WavReader::open(path).map_err(|e| AudioError::decode(path, e))?;
    let format = AudioFormat::from(reader.spec());
    let data_bytes = reader.duration() as u64 * format.frame_size();
    Ok(AudioMeta::new(format, data_bytes))
}

/// Forward-only PCM reader over a WAV file. Seeking backward means opening
/// a new one.
pub struct PcmStream {
    reader: WavReader<BufReader<File>>,
    path: PathBuf,
    format: AudioFormat,
    frames_total: u32,
    frame_pos: u32,
}

impl PcmStream {
    pub fn open(path: &Path) -> Result<Self, AudioError> {
        let reader = WavReader::open(path).map_err(|e| AudioError::decode(path, e))?;
        let format = AudioFormat::from(reader.spec());
        if format.channels == 0 || format.sample_rate == 0 {
            return Err(AudioError::decode(path, hound::Error::Unsupported));
        }
        let frames_total = reader.duration();
        Ok(Self {
            reader,
            path: path.to_path_buf(),
            format,
            frames_total,
            frame_pos: 0,
        })
    }

    pub fn format(&self) -> &AudioFormat {
        &self.format
    }

    /// Read up to `max_frames` frames as interleaved samples in `[-1.0, 1.0]`.
    ///
    /// `out` is cleared first. Returns the number of whole frames read; zero
    /// means the stream is exhausted.
    pub fn read_frames(&mut self, out: &mut Vec<f32>, max_frames: usize) -> Result<usize, AudioError> {
        out.clear();
        let channels = self.format.channels as usize;
        let remaining = (self.frames_total - self.frame_pos) as usize;
        let wanted = max_frames.min(remaining) * channels;

        match self.format.sample_format {
            SampleFormat::Float => {
                for s in self.reader.samples::<f32>().take(wanted) {
                    out.push(s.map_err(|e| AudioError::decode(&self.path, e))?);
                }
            }
            SampleFormat::Int => {
                let scale = 1.0 / (1i64 << (self.format.bits_per_sample - 1)) as f32;
                for s in self.reader.samples::<i32>().take(wanted) {
                    let s = s.map_err(|e| AudioError::decode(&self.path, e))?;
                    out.push(s as f32 * scale);
                }
            }
        }

        let frames = out.len() / channels;
        out.truncate(frames * channels);
        self.frame_pos += frames as u32;
        Ok(frames)
    }

    /// Skip forward by up to `frames`, stopping at the end of the data.
    /// Returns how many frames were actually skipped.
    pub fn skip_frames(&mut self, frames: u64) -> Result<u64, AudioError> {
        let target = (self.frame_pos as u64 + frames).min(self.frames_total as u64) as u32;
        if target == self.frame_pos {
            return Ok(0);
        }
        self.reader.seek(target)?;
        let skipped = (target - self.frame_pos) as u64;
        self.frame_pos = target;
        Ok(skipped)
    }
}
