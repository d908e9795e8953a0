use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AudioError {
    /// Unsupported or corrupt file. The track is marked missing.
    #[error("cannot decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },

    /// The output line could not be opened or written to.
    #[error("audio device unavailable: {0}")]
    Device(String),

    #[error("audio I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AudioError {
    pub(crate) fn decode(path: &Path, source: hound::Error) -> Self {
        Self::Decode {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Whether the failure lies in the file itself rather than the device.
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("no such playlist")]
    UnknownPlaylist,

    #[error("index {index} out of range for playlist of {len} tracks")]
    OutOfRange { index: usize, len: usize },

    #[error("track is already playing")]
    AlreadyCurrent,

    #[error("track is already next")]
    AlreadyNext,

    #[error("track is unchecked or missing")]
    NotSelectable,

    #[error("track is missing")]
    Missing,

    #[error("track is not a cortina")]
    NotCortina,

    #[error("track cannot start a tanda")]
    NotTandaStart,
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("state file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot serialize state: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("cannot parse state: {0}")]
    Parse(#[from] toml::de::Error),
}
