mod eq;
mod gain;
mod output;
mod pipeline;
mod session;
mod stream;
mod types;

pub use eq::{BAND_COUNTS, BAND_MAX, BAND_MIN, EqPreset, Equalizer, band_frequencies};
pub use gain::{
    GainRange, MAX_BALANCE, MAX_VOLUME, MIN_BALANCE, MIN_VOLUME, UNITY_VOLUME, db_to_amplitude,
    volume_to_db,
};
pub use output::{AudioOutput, OutputLine, RodioOutput};
pub use pipeline::{BUFFER_SIZE, PlayOutcome, Pipeline};
pub use session::{POLL_INTERVAL, PlaybackSession};
pub use stream::{PcmStream, probe};
pub use types::{AudioFormat, AudioMeta, SampleFormat};
