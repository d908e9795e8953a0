use std::f32::consts::PI;
use std::str::FromStr;

use serde::Deserialize;

pub const BAND_COUNTS: [usize; 4] = [10, 15, 25, 31];
pub const BAND_MIN: i32 = -10;
pub const BAND_MAX: i32 = 10;

const DB_PER_STEP: f32 = 1.2;

const BANDS_10: [f32; 10] = [
    31.0, 62.0, 125.0, 250.0, 500.0, 1000.0, 2000.0, 4000.0, 8000.0, 16000.0,
];

const BANDS_15: [f32; 15] = [
    25.0, 40.0, 63.0, 100.0, 160.0, 250.0, 400.0, 630.0, 1000.0, 1600.0, 2500.0, 4000.0, 6300.0,
    10000.0, 16000.0,
];

const BANDS_25: [f32; 25] = [
    20.0, 31.5, 40.0, 50.0, 80.0, 100.0, 125.0, 160.0, 250.0, 315.0, 400.0, 500.0, 800.0, 1000.0,
    1250.0, 1600.0, 2500.0, 3150.0, 4000.0, 5000.0, 8000.0, 10000.0, 12500.0, 16000.0, 20000.0,
];

const BANDS_31: [f32; 31] = [
    20.0, 25.0, 31.5, 40.0, 50.0, 63.0, 80.0, 100.0, 125.0, 160.0, 200.0, 250.0, 315.0, 400.0,
    500.0, 630.0, 800.0, 1000.0, 1250.0, 1600.0, 2000.0, 2500.0, 3150.0, 4000.0, 5000.0, 6300.0,
    8000.0, 10000.0, 12500.0, 16000.0, 20000.0,
];

/// Centre frequencies for a supported band count (10 bands otherwise).
pub fn band_frequencies(bands: usize) -> &'static [f32] {
    match bands {
        15 => &BANDS_15,
        25 => &BANDS_25,
        31 => &BANDS_31,
        _ => &BANDS_10,
    }
}

fn band_q(bands: usize) -> f32 {
    match bands {
        15 => 2.15,
        25 | 31 => 4.32,
        _ => 1.41,
    }
}

pub fn clamp_band(value: i32) -> i32 {
    value.clamp(BAND_MIN, BAND_MAX)
}

#[derive(Debug, Clone, Copy)]
struct Coeffs {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
}

impl Coeffs {
    fn passthrough() -> Self {
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
        }
    }

    fn peaking(freq: f32, gain_db: f32, q: f32, sample_rate: f32) -> Self {
        let a = 10.0_f32.powf(gain_db / 40.0);
        let w0 = 2.0 * PI * freq / sample_rate;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * q);

        let a0 = 1.0 + alpha / a;
        Self {
            b0: (1.0 + alpha * a) / a0,
            b1: (-2.0 * cos_w0) / a0,
            b2: (1.0 - alpha * a) / a0,
            a1: (-2.0 * cos_w0) / a0,
            a2: (1.0 - alpha / a) / a0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct History {
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl History {
    fn process(&mut self, x: f32, c: &Coeffs) -> f32 {
        let y = c.b0 * x + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }
}

/// One peaking biquad per band per channel, 1.2 dB per band step. Bands at
/// or above 45% of the sample rate are left flat.
pub struct Equalizer {
    frequencies: &'static [f32],
    q: f32,
    sample_rate: f32,
    channels: usize,
    values: Vec<i32>,
    coeffs: Vec<Coeffs>,
    /// Indexed `band * channels + channel`.
    history: Vec<History>,
    flat: bool,
}

impl Equalizer {
    pub fn new(bands: usize, channels: u16, sample_rate: u32) -> Self {
        let frequencies = band_frequencies(bands);
        let channels = channels.max(1) as usize;
        Self {
            frequencies,
            q: band_q(bands),
            sample_rate: sample_rate as f32,
            channels,
            values: vec![0; frequencies.len()],
            coeffs: vec![Coeffs::passthrough(); frequencies.len()],
            history: vec![History::default(); frequencies.len() * channels],
            flat: true,
        }
    }

    pub fn bands(&self) -> usize {
        self.frequencies.len()
    }

    /// Apply band settings. Extra values are ignored, missing ones are flat.
    pub fn set_bands(&mut self, values: &[i32]) {
        let nyquist_guard = self.sample_rate * 0.45;
        for (band, &freq) in self.frequencies.iter().enumerate() {
            let v = clamp_band(values.get(band).copied().unwrap_or(0));
            if v == self.values[band] {
                continue;
            }
            self.values[band] = v;
            self.coeffs[band] = if v == 0 || freq >= nyquist_guard {
                Coeffs::passthrough()
            } else {
                Coeffs::peaking(freq, v as f32 * DB_PER_STEP, self.q, self.sample_rate)
            };
        }
        self.flat = self.values.iter().all(|&v| v == 0);
    }

    /// Forget filter history, e.g. after reopening the stream.
    pub fn reset(&mut self) {
        self.history.fill(History::default());
    }

    /// Filter interleaved samples in place.
    pub fn process(&mut self, samples: &mut [f32]) {
        if self.flat {
            return;
        }
        let channels = self.channels;
        for frame in samples.chunks_exact_mut(channels) {
            for (ch, sample) in frame.iter_mut().enumerate() {
                let mut x = *sample;
                for (band, c) in self.coeffs.iter().enumerate() {
                    if self.values[band] == 0 {
                        continue;
                    }
                    x = self.history[band * channels + ch].process(x, c);
                }
                *sample = x;
            }
        }
    }
}

/// Named equalizer curves, plus `Custom` for the operator's own bands.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EqPreset {
    None,
    Custom,
    BassPlus,
    BassMinus,
    MidPlus,
    MidMinus,
    TreblePlus,
    TrebleMinus,
}

impl EqPreset {
    /// Band values for this preset at the given band count. `Custom` has no
    /// fixed curve and reads as flat; the session keeps the real values.
    pub fn values(self, bands: usize) -> Vec<i32> {
        let (shape, sign): (fn(f32) -> i32, i32) = match self {
            Self::None | Self::Custom => (flat, 1),
            Self::BassPlus => (bass, 1),
            Self::BassMinus => (bass, -1),
            Self::MidPlus => (mid, 1),
            Self::MidMinus => (mid, -1),
            Self::TreblePlus => (treble, 1),
            Self::TrebleMinus => (treble, -1),
        };
        band_frequencies(bands)
            .iter()
            .map(|&f| sign * shape(f))
            .collect()
    }
}

fn flat(_: f32) -> i32 {
    0
}

fn bass(f: f32) -> i32 {
    if f <= 125.0 {
        5
    } else if f <= 250.0 {
        2
    } else {
        0
    }
}

fn mid(f: f32) -> i32 {
    if (500.0..=2000.0).contains(&f) {
        5
    } else if (250.0..4000.0).contains(&f) {
        2
    } else {
        0
    }
}

fn treble(f: f32) -> i32 {
    if f >= 8000.0 {
        5
    } else if f >= 4000.0 {
        2
    } else {
        0
    }
}

impl FromStr for EqPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "flat" => Ok(Self::None),
            "custom" => Ok(Self::Custom),
            "bass+" | "bass-plus" => Ok(Self::BassPlus),
            "bass-" | "bass-minus" => Ok(Self::BassMinus),
            "mid+" | "mid-plus" => Ok(Self::MidPlus),
            "mid-" | "mid-minus" => Ok(Self::MidMinus),
            "treble+" | "treble-plus" => Ok(Self::TreblePlus),
            "treble-" | "treble-minus" => Ok(Self::TrebleMinus),
            other => Err(format!("unknown equalizer preset {other:?}")),
        }
    }
}
