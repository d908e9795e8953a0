pub const MIN_VOLUME: i32 = 0;
pub const UNITY_VOLUME: i32 = 14;
pub const MAX_VOLUME: i32 = 20;

pub const MIN_BALANCE: i32 = -10;
pub const MAX_BALANCE: i32 = 10;

/// Gain limits of an output line, in dB.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GainRange {
    pub min_db: f32,
    pub max_db: f32,
}

impl Default for GainRange {
    fn default() -> Self {
        Self {
            min_db: -80.0,
            max_db: 6.0,
        }
    }
}

pub fn clamp_volume(volume: i32) -> i32 {
    volume.clamp(MIN_VOLUME, MAX_VOLUME)
}

pub fn clamp_balance(balance: i32) -> i32 {
    balance.clamp(MIN_BALANCE, MAX_BALANCE)
}

/// Volume runs 0..=20 with 14 at 0 dB. Above 14 it climbs linearly to the
/// line's maximum gain, below 14 it falls linearly to the line's minimum.
pub fn volume_to_db(volume: i32, range: GainRange) -> f32 {
    let v = clamp_volume(volume);
    match v.cmp(&UNITY_VOLUME) {
        std::cmp::Ordering::Equal => 0.0,
        std::cmp::Ordering::Greater => {
            (v - UNITY_VOLUME) as f32 / (MAX_VOLUME - UNITY_VOLUME) as f32 * range.max_db
        }
        std::cmp::Ordering::Less => {
            (UNITY_VOLUME - v) as f32 / (UNITY_VOLUME - MIN_VOLUME) as f32 * range.min_db
        }
    }
}

/// Linear amplitude for a gain; the range minimum is silence.
pub fn db_to_amplitude(db: f32, range: GainRange) -> f32 {
    if db <= range.min_db {
        0.0
    } else {
        10f32.powf(db / 20.0)
    }
}

/// Left and right multipliers for a balance in -10..=10.
pub fn balance_weights(balance: i32) -> (f32, f32) {
    let b = clamp_balance(balance) as f32 / MAX_BALANCE as f32;
    let left = if b > 0.0 { 1.0 - b } else { 1.0 };
    let right = if b < 0.0 { 1.0 + b } else { 1.0 };
    (left, right)
}

/// Scale interleaved stereo samples in place. Other layouts pass through.
pub fn apply_balance(samples: &mut [f32], channels: u16, weights: (f32, f32)) {
    if channels != 2 || weights == (1.0, 1.0) {
        return;
    }
    for frame in samples.chunks_exact_mut(2) {
        frame[0] *= weights.0;
        frame[1] *= weights.1;
    }
}
