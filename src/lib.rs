//! Voxline - voice-over localization audio toolkit
//!
//! Batch tooling for game localization voice work: splitting recorded
//! sessions into individual voice-line clips, cleaning them with a
//! configurable effect chain, matching their loudness against the
//! original-language lines, and keeping the clip library's numbering
//! and levels consistent.
//!
//! The library surface is organized around directories of mono WAV
//! clips named `{base}{separator}{ordinal}.wav`; every batch operation
//! takes an explicit [`config::Config`] and is fail-soft per clip.

pub mod audio;
pub mod cli;
pub mod config;
pub mod dsp;
pub mod error;
pub mod library;
pub mod loudness;
pub mod pipeline;
pub mod segment;

pub use config::Config;
pub use error::{Result, VoxlineError};
