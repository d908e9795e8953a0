//! Audio format descriptions shared by the probe, the stream and the output.

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SampleFormat {
    Int,
    Float,
}

impl From<hound::SampleFormat> for SampleFormat {
    fn from(f: hound::SampleFormat) -> Self {
        match f {
            hound::SampleFormat::Int => Self::Int,
            hound::SampleFormat::Float => Self::Float,
        }
    }
}

/// PCM layout of an uncompressed file.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AudioFormat {
    pub channels: u16,
    /// Frames per second.
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub sample_format: SampleFormat,
}

impl AudioFormat {
    /// Bytes per frame (one sample for every channel).
    pub fn frame_size(&self) -> u64 {
        self.channels as u64 * (self.bits_per_sample as u64).div_ceil(8)
    }

    pub fn bytes_per_second(&self) -> u64 {
        self.sample_rate as u64 * self.frame_size()
    }
}

impl From<hound::WavSpec> for AudioFormat {
    fn from(spec: hound::WavSpec) -> Self {
        Self {
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            bits_per_sample: spec.bits_per_sample,
            sample_format: spec.sample_format.into(),
        }
    }
}

/// What the catalog learns about a file when it is loaded.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AudioMeta {
    pub format: AudioFormat,
    /// Size of the PCM data.
    pub data_bytes: u64,
    /// Whole seconds: `data_bytes / (frame_rate * frame_size)`, truncated.
    pub duration: u32,
}

impl AudioMeta {
    pub fn new(format: AudioFormat, data_bytes: u64) -> Self {
        let per_second = format.bytes_per_second().max(1);
        Self {
            format,
            data_bytes,
            duration: (data_bytes / per_second) as u32,
        }
    }
}
