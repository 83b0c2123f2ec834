//! Command-line interface for the voice line toolkit

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Voxline - voice-over localization audio toolkit
#[derive(Parser, Debug)]
#[command(name = "voxline")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the JSON configuration file
    #[arg(short, long, global = true, default_value = "voxline.json")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Split recorded tracks into individual voice-line clips
    #[command(name = "split")]
    Split {
        /// Directory of recorded tracks
        input: PathBuf,

        /// Directory the clips are written to
        output: PathBuf,
    },

    /// Apply an effect chain to every clip in a directory, in place
    #[command(name = "process")]
    Process {
        /// Directory of clips
        dir: PathBuf,

        /// Whitespace-separated effect names, applied in order
        /// (noisereduction bandpass compression retrim sinus gain
        /// desaturation fade)
        #[arg(short, long)]
        effects: String,

        /// Intensity scale applied across the whole chain
        #[arg(short, long, default_value_t = 1.0)]
        scale: f32,
    },

    /// Match clip loudness against original-language reference lines
    #[command(name = "match-volume")]
    MatchVolume {
        /// Directory of clips to adjust
        dir: PathBuf,

        /// Directory of reference lines
        reference: PathBuf,
    },

    /// Audit clip numbering per family and optionally repair it
    #[command(name = "check-names")]
    CheckNames {
        /// Directory of clips
        dir: PathBuf,

        /// Apply the planned renames instead of only reporting them
        #[arg(short, long)]
        repair: bool,

        /// Write silence stubs for ordinals that stay missing
        #[arg(long)]
        stub: bool,
    },

    /// Flag clips whose loudness is far outside the library norm
    #[command(name = "check-files")]
    CheckFiles {
        /// Directory of clips
        dir: PathBuf,

        /// Delete flagged clips
        #[arg(long)]
        purge: bool,
    },

    /// Concatenate clips into one review track with audible markers
    #[command(name = "compile")]
    Compile {
        /// Directory of clips
        dir: PathBuf,

        /// Output WAV path
        output: PathBuf,
    },
}
