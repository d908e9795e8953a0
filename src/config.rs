//! Configuration schema and loader.
//!
//! Settings cover the audio pipeline (equalizer bands, gain range), the
//! scheduler (block genres, inter-track wait), library scanning, the
//! persistence flusher and logging.

mod load;
mod schema;

pub use load::{default_state_path, resolve_config_path};
pub use schema::*;

#[cfg(test)]
mod tests;
