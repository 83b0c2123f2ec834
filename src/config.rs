//! Typed configuration for Voxline
//!
//! All tunables live in one serde-backed document that is loaded once and
//! passed explicitly into every core call. There is no process-wide
//! configuration state; batch operations can run with varied parameter
//! sets side by side (and tests do exactly that).
//!
//! A missing or structurally broken file is logged as FATAL but degrades
//! to defaults instead of terminating the process.

use std::fs;
use std::path::Path;

use log::{error, info};
use serde::{Deserialize, Serialize};

use crate::error::{Result, VoxlineError};

/// Top-level configuration document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub segmentation: SegmentationConfig,
    pub effects: EffectConfig,
    pub matching: MatchConfig,
    pub library: LibraryConfig,
}

/// Silence/speech boundary detection parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Silence threshold in dB relative to the buffer's own peak
    pub silence_db: f32,
    /// Minimum silence duration treated as a real gap (seconds)
    pub min_silence_secs: f32,
    /// Minimum audible duration kept as a standalone segment (seconds)
    pub min_segment_secs: f32,
    /// Silence padding added around each segment (seconds)
    pub padding_secs: f32,
    /// Scan stride in seconds; `None` means auto (1% of the sample rate)
    pub stride_secs: Option<f32>,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            silence_db: -30.0,
            min_silence_secs: 0.7,
            min_segment_secs: 1.0,
            padding_secs: 0.2,
            stride_secs: None,
        }
    }
}

impl SegmentationConfig {
    /// Scan stride in samples for the given rate.
    ///
    /// Auto mode recomputes from the actual sample rate so a rate change
    /// keeps the default ~10ms resolution.
    pub fn stride_samples(&self, sample_rate: u32) -> usize {
        let stride = match self.stride_secs {
            Some(secs) if secs > 0.0 => (secs * sample_rate as f32) as usize,
            _ => (0.01 * sample_rate as f32) as usize,
        };
        stride.max(1)
    }
}

/// Parameters for every effect stage in the chain
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectConfig {
    /// Base gain multiplier for the `gain` stage
    pub gain: f32,
    /// Number of waveshaping passes for the `sinus` stage
    pub sinus_passes: u32,
    /// Noise reduction base strength (0.0 to 1.0)
    pub noise_reduction: f32,
    /// Treat the noise profile as constant over time
    pub noise_stationary: bool,
    /// Compression threshold in dB
    pub compression_threshold_db: f32,
    /// Compression ratio
    pub compression_ratio: f32,
    /// Envelope follower smoothing coefficient for compression.
    /// Deliberately independent from `fade_secs`; the two are unrelated.
    pub envelope_coeff: f32,
    /// Desaturation detection threshold on the normalized signal
    pub desaturation_threshold: f32,
    /// Desaturation amplitude reduction factor
    pub desaturation_reduction: f32,
    /// Band-pass filter order
    pub bandpass_order: u32,
    /// Band-pass low cutoff in Hz
    pub bandpass_low_hz: f32,
    /// Band-pass high cutoff in Hz
    pub bandpass_high_hz: f32,
    /// Fade-in/fade-out duration in seconds for the `fade` stage
    pub fade_secs: f32,
    /// Padding kept around the audible span by the `retrim` stage (seconds)
    pub retrim_padding_secs: f32,
    /// Silence threshold used by `retrim`, in dB relative to peak
    pub retrim_silence_db: f32,
}

impl Default for EffectConfig {
    fn default() -> Self {
        Self {
            gain: 1.0,
            sinus_passes: 1,
            noise_reduction: 0.6,
            noise_stationary: false,
            compression_threshold_db: -45.0,
            compression_ratio: 4.0,
            envelope_coeff: 0.02,
            desaturation_threshold: 0.8,
            desaturation_reduction: 2.0,
            bandpass_order: 4,
            bandpass_low_hz: 20.0,
            bandpass_high_hz: 20000.0,
            fade_secs: 0.1,
            retrim_padding_secs: 0.2,
            retrim_silence_db: -30.0,
        }
    }
}

/// Reference-relative loudness matching parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Global multiplier applied on top of the solved gain
    pub volume_multiplier: f32,
    /// Restrict RMS to high-amplitude runs (crude voice isolation)
    pub accurate: bool,
    /// Silence threshold used when isolating speech, in dB
    pub isolation_silence_db: f32,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            volume_multiplier: 1.0,
            accurate: true,
            isolation_silence_db: -30.0,
        }
    }
}

/// Naming and persistence conventions for the clip library
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Separator between a base name and its ordinal suffix
    pub name_separator: String,
    /// Audio file extension (without the dot)
    pub extension: String,
    /// Working sample rate in Hz
    pub sample_rate: u32,
    /// Segments shorter than this are not saved (seconds)
    pub min_clip_secs: f32,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            name_separator: "_".to_string(),
            extension: "wav".to_string(),
            sample_rate: 44100,
            min_clip_secs: 0.2,
        }
    }
}

impl Config {
    /// Load the configuration from a JSON file.
    ///
    /// Degrades instead of crashing: a missing or invalid file is logged
    /// as FATAL and the defaults are returned, so a botched edit never
    /// takes the whole tool down.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => {
                info!("Configuration loaded from {}", path.display());
                config
            }
            Err(e) => {
                error!("FATAL: cannot load config {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Load and validate the configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| VoxlineError::FileNotFound {
            path: path.display().to_string(),
            source: Some(e),
        })?;
        let config: Config = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration back to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text)?;
        Ok(())
    }

    /// Validate cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        if self.library.sample_rate == 0 {
            return Err(VoxlineError::ConfigInvalid {
                reason: "library.sample_rate must be positive".to_string(),
            });
        }
        if self.effects.bandpass_low_hz >= self.effects.bandpass_high_hz {
            return Err(VoxlineError::ConfigInvalid {
                reason: format!(
                    "bandpass cutoffs inverted: low {} >= high {}",
                    self.effects.bandpass_low_hz, self.effects.bandpass_high_hz
                ),
            });
        }
        if !(0.0..=1.0).contains(&self.effects.noise_reduction) {
            return Err(VoxlineError::ConfigInvalid {
                reason: format!(
                    "effects.noise_reduction {} out of range 0..=1",
                    self.effects.noise_reduction
                ),
            });
        }
        if self.effects.envelope_coeff <= 0.0 || self.effects.envelope_coeff >= 1.0 {
            return Err(VoxlineError::ConfigInvalid {
                reason: format!(
                    "effects.envelope_coeff {} out of range (0, 1)",
                    self.effects.envelope_coeff
                ),
            });
        }
        if self.library.name_separator.is_empty() {
            return Err(VoxlineError::ConfigInvalid {
                reason: "library.name_separator must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Adopt the sample rate observed in decoded source material.
    ///
    /// The original tool probed the first reference file and rewrote its
    /// config; here the probe just updates the in-memory value.
    pub fn adopt_sample_rate(&mut self, sample_rate: u32) {
        if sample_rate != 0 && sample_rate != self.library.sample_rate {
            info!(
                "Sample rate updated from {} to {} Hz",
                self.library.sample_rate, sample_rate
            );
            self.library.sample_rate = sample_rate;
        }
    }
}
