//! Effect chain engine
//!
//! Effects are applied strictly in the order the caller requested; there
//! is no canonical ordering and no reordering. Each stage is a pure
//! in-place transform over the clip plus a scale factor. A failing stage
//! is caught, logged and skipped; one broken stage never aborts the rest
//! of the chain, and the chain always returns a best-effort clip.

mod bandpass;
mod noise;
mod stages;

pub use bandpass::bandpass_zero_phase;
pub use noise::reduce_noise;

use log::warn;

use crate::audio::buffer::AudioBuffer;
use crate::config::EffectConfig;
use crate::error::Result;

/// The fixed effect vocabulary.
///
/// Parsing is lenient by contract: unknown names in a requested list are
/// silently ignored, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectKind {
    NoiseReduction,
    BandPass,
    Compression,
    Retrim,
    Sinus,
    Gain,
    Desaturation,
    Fade,
}

impl EffectKind {
    /// Parse a single effect name. Unknown names yield `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "noisereduction" => Some(EffectKind::NoiseReduction),
            "bandpass" => Some(EffectKind::BandPass),
            "compression" => Some(EffectKind::Compression),
            "retrim" => Some(EffectKind::Retrim),
            "sinus" => Some(EffectKind::Sinus),
            "gain" => Some(EffectKind::Gain),
            "desaturation" => Some(EffectKind::Desaturation),
            "fade" => Some(EffectKind::Fade),
            _ => None,
        }
    }

    /// Effect name as it appears in configuration and logs
    pub fn name(&self) -> &'static str {
        match self {
            EffectKind::NoiseReduction => "noisereduction",
            EffectKind::BandPass => "bandpass",
            EffectKind::Compression => "compression",
            EffectKind::Retrim => "retrim",
            EffectKind::Sinus => "sinus",
            EffectKind::Gain => "gain",
            EffectKind::Desaturation => "desaturation",
            EffectKind::Fade => "fade",
        }
    }

    /// Parse a whitespace-separated effect list, preserving order and
    /// dropping unknown names.
    pub fn parse_list(list: &str) -> Vec<Self> {
        list.split_whitespace().filter_map(Self::from_name).collect()
    }
}

/// Outcome of one stage in a chain run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    Applied,
    Skipped { reason: String },
}

/// Per-stage results for one clip, in request order.
///
/// Makes the fail-soft policy inspectable: callers and tests can see
/// which stages ran instead of errors being silently swallowed.
#[derive(Debug, Clone, Default)]
pub struct ChainReport {
    pub stages: Vec<(EffectKind, StageOutcome)>,
}

impl ChainReport {
    /// Number of stages that actually transformed the clip
    pub fn applied(&self) -> usize {
        self.stages
            .iter()
            .filter(|(_, outcome)| *outcome == StageOutcome::Applied)
            .count()
    }

    /// Stages that were skipped, with their reasons
    pub fn skipped(&self) -> impl Iterator<Item = (&EffectKind, &str)> {
        self.stages.iter().filter_map(|(kind, outcome)| match outcome {
            StageOutcome::Skipped { reason } => Some((kind, reason.as_str())),
            StageOutcome::Applied => None,
        })
    }
}

/// Apply an ordered list of effects to a clip in place.
///
/// Each stage runs against a snapshot: if it errors or produces
/// non-finite samples the snapshot is restored, a warning is logged and
/// the chain moves on. An empty list is the identity transform.
pub fn apply_effects(
    buffer: &mut AudioBuffer,
    effects: &[EffectKind],
    scale: f32,
    config: &EffectConfig,
) -> ChainReport {
    let mut report = ChainReport::default();

    for &kind in effects {
        let snapshot = buffer.samples.clone();
        let outcome = match run_stage(buffer, kind, scale, config) {
            Ok(()) if buffer.is_finite() => StageOutcome::Applied,
            Ok(()) => {
                buffer.samples = snapshot;
                let reason = "stage produced non-finite samples".to_string();
                warn!("WARN: {} on '{}': {reason}", kind.name(), buffer.name);
                StageOutcome::Skipped { reason }
            }
            Err(e) => {
                buffer.samples = snapshot;
                warn!("WARN: failed to apply {} on '{}': {e}", kind.name(), buffer.name);
                StageOutcome::Skipped {
                    reason: e.to_string(),
                }
            }
        };
        report.stages.push((kind, outcome));
    }

    report
}

fn run_stage(
    buffer: &mut AudioBuffer,
    kind: EffectKind,
    scale: f32,
    config: &EffectConfig,
) -> Result<()> {
    match kind {
        EffectKind::NoiseReduction => reduce_noise(
            &mut buffer.samples,
            config.noise_reduction * scale,
            config.noise_stationary,
        ),
        EffectKind::BandPass => bandpass_zero_phase(
            &mut buffer.samples,
            buffer.sample_rate,
            config.bandpass_order,
            config.bandpass_low_hz,
            config.bandpass_high_hz,
        ),
        EffectKind::Compression => stages::compress(
            &mut buffer.samples,
            config.compression_threshold_db,
            config.compression_ratio,
            config.envelope_coeff,
            scale,
        ),
        EffectKind::Retrim => stages::retrim(
            buffer,
            config.retrim_silence_db,
            config.retrim_padding_secs,
        ),
        EffectKind::Sinus => stages::sinus(&mut buffer.samples, config.sinus_passes),
        EffectKind::Gain => stages::gain(&mut buffer.samples, config.gain, scale),
        EffectKind::Desaturation => stages::desaturate(
            &mut buffer.samples,
            config.desaturation_threshold,
            config.desaturation_reduction,
            scale,
        ),
        EffectKind::Fade => stages::fade(buffer, config.fade_secs),
    }
}
