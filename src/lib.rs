pub mod audio;
pub mod catalog;
pub mod config;
pub mod error;
pub mod library;
pub mod logging;
pub mod persist;
pub mod player;
pub mod runtime;
pub mod scheduler;

#[cfg(test)]
mod testutil;
