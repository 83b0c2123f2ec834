//! Loudness and amplitude analysis
//!
//! RMS is the loudness proxy used throughout: for matching a clip against
//! its reference lines, and for flagging statistically abnormal takes.
//! This is not a perceptual loudness model.

use log::warn;

use crate::audio::buffer::{db_to_linear, AudioBuffer};

/// Compute the RMS (root-mean-square) amplitude of a buffer.
///
/// Returns 0.0 for an empty buffer.
pub fn clip_rms(buffer: &AudioBuffer) -> f32 {
    rms_of(&buffer.samples)
}

/// RMS of a raw sample slice
pub fn rms_of(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum_squares / samples.len() as f64).sqrt() as f32
}

/// RMS restricted to high-amplitude runs (crude voice-activity isolation).
///
/// Concatenates every contiguous run where |amplitude| exceeds the linear
/// equivalent of `silence_db` and computes RMS over that subset only. If
/// no sample exceeds the threshold the whole buffer is used instead, with
/// a warning, so a quiet clip still gets a loudness figure.
pub fn isolated_rms(buffer: &AudioBuffer, silence_db: f32) -> f32 {
    let threshold = db_to_linear(silence_db);
    let mut isolated: Vec<f32> = Vec::new();
    let mut run_start: Option<usize> = None;

    for (i, &sample) in buffer.samples.iter().enumerate() {
        if sample.abs() > threshold {
            if run_start.is_none() {
                run_start = Some(i);
            }
        } else if let Some(start) = run_start.take() {
            isolated.extend_from_slice(&buffer.samples[start..i]);
        }
    }
    if let Some(start) = run_start {
        isolated.extend_from_slice(&buffer.samples[start..]);
    }

    if isolated.is_empty() {
        warn!(
            "WARN: no samples above {} dB in '{}', using full-buffer RMS",
            silence_db, buffer.name
        );
        return clip_rms(buffer);
    }
    rms_of(&isolated)
}

/// Amplitude curve in dB relative to the buffer's own peak.
///
/// A silent buffer (zero peak) maps every sample to negative infinity,
/// which keeps threshold comparisons well-defined downstream.
pub fn db_curve_rel_peak(samples: &[f32]) -> Vec<f32> {
    let peak = samples.iter().map(|s| s.abs()).fold(0.0_f32, f32::max);
    if peak <= 0.0 {
        return vec![f32::NEG_INFINITY; samples.len()];
    }
    samples
        .iter()
        .map(|&s| {
            let norm = s.abs() / peak;
            if norm <= 0.0 {
                f32::NEG_INFINITY
            } else {
                20.0 * norm.log10()
            }
        })
        .collect()
}
