use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use crate::audio::{
    AudioFormat, AudioMeta, AudioOutput, GainRange, OutputLine, SampleFormat,
};
use crate::catalog::{GENRE_TAG, ORCHESTRA_TAG, Track, TrackMedia};
use crate::error::AudioError;

pub const TEST_RATE: u32 = 1000;

pub fn mono16(sample_rate: u32) -> AudioFormat {
    AudioFormat {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

/// Metadata for a mono 16-bit track of exactly `seconds` at [`TEST_RATE`].
pub fn meta(seconds: u32) -> AudioMeta {
    let format = mono16(TEST_RATE);
    AudioMeta::new(format, seconds as u64 * format.bytes_per_second())
}

/// A present, checked track with optional genre and orchestra tags.
pub fn track(title: &str, genre: Option<&str>, orchestra: Option<&str>) -> Track {
    let mut t = Track::new(
        format!("/music/{title}.wav"),
        title,
        TrackMedia::Present(meta(180)),
    );
    if let Some(g) = genre {
        t = t.with_tag(GENRE_TAG, g);
    }
    if let Some(o) = orchestra {
        t = t.with_tag(ORCHESTRA_TAG, o);
    }
    t
}

pub fn missing_track(title: &str, genre: Option<&str>) -> Track {
    let mut t = Track::new(format!("/music/{title}.wav"), title, TrackMedia::Missing);
    if let Some(g) = genre {
        t = t.with_tag(GENRE_TAG, g);
    }
    t
}

/// Write a mono 16-bit sine of `millis` at [`TEST_RATE`] and return its path.
pub fn write_wav(dir: &Path, name: &str, millis: u32) -> PathBuf {
    write_wav_with(dir, name, millis, 1, TEST_RATE)
}

pub fn write_wav_with(
    dir: &Path,
    name: &str,
    millis: u32,
    channels: u16,
    sample_rate: u32,
) -> PathBuf {
    let path = dir.join(name);
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).expect("create wav");
    let frames = sample_rate as u64 * millis as u64 / 1000;
    for n in 0..frames {
        let t = n as f32 / sample_rate as f32;
        let v = (t * 220.0 * 2.0 * std::f32::consts::PI).sin() * 0.5;
        for _ in 0..channels {
            writer
                .write_sample((v * i16::MAX as f32) as i16)
                .expect("write sample");
        }
    }
    writer.finalize().expect("finalize wav");
    path
}

/// Everything the recording output saw.
#[derive(Debug, Default)]
pub struct LineLog {
    pub opened: usize,
    /// Samples written and not discarded.
    pub queued: Vec<f32>,
    /// Samples that reached the listener through `drain`.
    pub heard: Vec<f32>,
    pub written_samples: usize,
    pub discards: usize,
    pub drains: usize,
    pub gains: Vec<f32>,
}

/// An [`AudioOutput`] that records into a shared [`LineLog`].
#[derive(Debug, Clone, Default)]
pub struct MemoryOutput {
    pub log: Arc<Mutex<LineLog>>,
    pub fail_open: bool,
}

impl MemoryOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_open: true,
            ..Self::default()
        }
    }
}

impl AudioOutput for MemoryOutput {
    fn open_line(&mut self, _format: &AudioFormat) -> Result<Box<dyn OutputLine>, AudioError> {
        if self.fail_open {
            return Err(AudioError::Device("test device unavailable".to_string()));
        }
        self.log.lock().expect("log lock").opened += 1;
        Ok(Box::new(MemoryLine {
            log: self.log.clone(),
        }))
    }
}

struct MemoryLine {
    log: Arc<Mutex<LineLog>>,
}

impl OutputLine for MemoryLine {
    fn gain_range(&self) -> GainRange {
        GainRange::default()
    }

    fn set_gain(&mut self, db: f32) {
        self.log.lock().expect("log lock").gains.push(db);
    }

    fn write(&mut self, samples: &[f32]) -> Result<(), AudioError> {
        let mut log = self.log.lock().expect("log lock");
        log.written_samples += samples.len();
        log.queued.extend_from_slice(samples);
        Ok(())
    }

    fn discard(&mut self) {
        let mut log = self.log.lock().expect("log lock");
        log.queued.clear();
        log.discards += 1;
    }

    fn drain(&mut self) {
        let mut log = self.log.lock().expect("log lock");
        let queued = std::mem::take(&mut log.queued);
        log.heard.extend(queued);
        log.drains += 1;
    }
}

/// Serializes tests that touch process environment variables.
static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

pub fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|e| e.into_inner())
}

/// Sets or removes a variable and puts the old value back on drop.
pub struct EnvGuard {
    key: &'static str,
    old: Option<std::ffi::OsString>,
}

impl EnvGuard {
    pub fn set(key: &'static str, val: &str) -> Self {
        let old = std::env::var_os(key);
        unsafe {
            std::env::set_var(key, val);
        }
        Self { key, old }
    }

    pub fn remove(key: &'static str) -> Self {
        let old = std::env::var_os(key);
        unsafe {
            std::env::remove_var(key);
        }
        Self { key, old }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        match self.old.take() {
            Some(v) => unsafe {
                std::env::set_var(self.key, v);
            },
            None => unsafe {
                std::env::remove_var(self.key);
            },
        }
    }
}
