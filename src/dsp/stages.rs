//! Stateless effect stages
//!
//! Each stage mutates the clip in place and reports failure through
//! `Result`; the chain in `dsp::mod` decides what a failure means.
//! Compression is the only stage with cross-sample state (a single-pole
//! envelope follower), and even that state lives only for the one call.

use crate::audio::analysis::db_curve_rel_peak;
use crate::audio::buffer::{db_to_linear, AudioBuffer};
use crate::error::{Result, VoxlineError};

fn peak_of(samples: &[f32]) -> f32 {
    samples.iter().map(|s| s.abs()).fold(0.0_f32, f32::max)
}

/// Dynamic range compression with a single-pole envelope follower.
///
/// The clip is normalized to unit peak, scanned sequentially while the
/// envelope tracks `env = (1-coeff)*env + coeff*|x|`, and rescaled back
/// to the original peak afterwards. Above the linear threshold the gain
/// is `threshold + (env - threshold) / (ratio * scale)`, otherwise 1.
pub fn compress(
    samples: &mut [f32],
    threshold_db: f32,
    ratio: f32,
    coeff: f32,
    scale: f32,
) -> Result<()> {
    let peak = peak_of(samples);
    if peak <= 0.0 {
        return Err(VoxlineError::StageFailed {
            stage: "compression".to_string(),
            reason: "clip is silent, cannot normalize".to_string(),
        });
    }
    let effective_ratio = ratio * scale;
    if effective_ratio <= 0.0 {
        return Err(VoxlineError::InvalidParameter {
            param: "compression_ratio * scale".to_string(),
            value: effective_ratio.to_string(),
            expected: "> 0".to_string(),
        });
    }

    let threshold = db_to_linear(threshold_db);
    let inv_peak = 1.0 / peak;
    let mut env = 0.0_f32;
    for sample in samples.iter_mut() {
        let x = *sample * inv_peak;
        env = (1.0 - coeff) * env + coeff * x.abs();
        let gain = if env > threshold {
            threshold + (env - threshold) / effective_ratio
        } else {
            1.0
        };
        *sample = x * gain * peak;
    }
    Ok(())
}

/// Re-trim leading and trailing silence.
///
/// Scans the dB-relative-to-peak curve from both ends inward for the
/// first and last sample at or above the silence threshold, then keeps
/// that span plus the configured padding. If nothing exceeds the
/// threshold the clip is left unchanged.
pub fn retrim(buffer: &mut AudioBuffer, silence_db: f32, padding_secs: f32) -> Result<()> {
    let curve = db_curve_rel_peak(&buffer.samples);

    let start = match curve.iter().position(|&db| db >= silence_db) {
        Some(idx) => idx,
        None => return Ok(()), // nothing audible, leave as-is
    };
    // An audible start guarantees an audible end
    let last = curve.iter().rposition(|&db| db >= silence_db).unwrap_or(start);

    let padding = (padding_secs * buffer.sample_rate as f32) as usize;
    let from = start.saturating_sub(padding);
    let to = (last + 1 + padding).min(buffer.samples.len());
    buffer.samples = buffer.samples[from..to].to_vec();
    Ok(())
}

/// Sine waveshaper: repeated soft clipping via `sin(x / peak * pi/2)`.
///
/// Each pass re-reads the current peak, so the output always lands on
/// unit peak.
pub fn sinus(samples: &mut [f32], passes: u32) -> Result<()> {
    for _ in 0..passes {
        let peak = peak_of(samples);
        if peak <= 0.0 {
            return Err(VoxlineError::StageFailed {
                stage: "sinus".to_string(),
                reason: "clip is silent, cannot normalize".to_string(),
            });
        }
        for sample in samples.iter_mut() {
            *sample = (*sample / peak * std::f32::consts::FRAC_PI_2).sin();
        }
    }
    Ok(())
}

/// Plain multiplicative gain: `scale * base_gain`.
pub fn gain(samples: &mut [f32], base_gain: f32, scale: f32) -> Result<()> {
    let factor = base_gain * scale;
    for sample in samples.iter_mut() {
        *sample *= factor;
    }
    Ok(())
}

/// Corrective desaturation of over-hot samples.
///
/// Detection happens on the peak-normalized signal, but the division is
/// applied to the original, unnormalized samples at those indices. That
/// asymmetry is the binding contract inherited from the source tool:
/// this is a corrective heuristic, not sample-accurate restoration.
pub fn desaturate(samples: &mut [f32], threshold: f32, reduction: f32, scale: f32) -> Result<()> {
    let divisor = reduction * scale;
    if divisor == 0.0 {
        return Err(VoxlineError::InvalidParameter {
            param: "desaturation_reduction * scale".to_string(),
            value: "0".to_string(),
            expected: "non-zero".to_string(),
        });
    }
    let peak = peak_of(samples);
    if peak <= 0.0 {
        return Ok(()); // already silent, nothing saturated
    }
    for sample in samples.iter_mut() {
        if sample.abs() / peak > threshold {
            *sample /= divisor;
        }
    }
    Ok(())
}

/// Linear fade-in over the first N samples and fade-out over the last N,
/// where N is the configured duration at the clip's sample rate.
/// A clip shorter than 2N is left untouched.
pub fn fade(buffer: &mut AudioBuffer, fade_secs: f32) -> Result<()> {
    let n = (fade_secs * buffer.sample_rate as f32) as usize;
    if n == 0 || buffer.samples.len() < 2 * n {
        return Ok(());
    }
    let len = buffer.samples.len();
    for i in 0..n {
        let ramp = i as f32 / n as f32;
        buffer.samples[i] *= ramp;
        buffer.samples[len - 1 - i] *= ramp;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const SR: u32 = 44100;

    fn buffer_of(samples: Vec<f32>) -> AudioBuffer {
        AudioBuffer::from_samples(samples, SR, "test")
    }

    // ------------------------------------------------------------------------
    // Compression
    // ------------------------------------------------------------------------

    #[test]
    fn test_compress_reduces_loud_sustain() {
        // Constant full-scale input drives the envelope well above a
        // -45 dB threshold, so the sustained level must drop.
        let mut samples = vec![0.9_f32; 44100];
        compress(&mut samples, -45.0, 4.0, 0.02, 1.0).unwrap();
        assert!(samples[44099].abs() < 0.9);
    }

    #[test]
    fn test_compress_restores_peak_scale() {
        // Output is rescaled against the pre-normalization peak, so the
        // result stays in the clip's original amplitude regime.
        let mut samples: Vec<f32> = (0..8820)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * 440.0 * i as f32 / SR as f32).sin())
            .collect();
        compress(&mut samples, -45.0, 4.0, 0.02, 1.0).unwrap();
        assert!(peak_of(&samples) <= 0.5 + 1e-4);
    }

    #[test]
    fn test_compress_silent_clip_fails() {
        let mut samples = vec![0.0_f32; 100];
        assert!(compress(&mut samples, -45.0, 4.0, 0.02, 1.0).is_err());
    }

    // ------------------------------------------------------------------------
    // Retrim
    // ------------------------------------------------------------------------

    #[test]
    fn test_retrim_cuts_silence_with_padding() {
        // 1s silence, 1s tone, 1s silence; 0.1s padding retained
        let mut samples = vec![0.0_f32; SR as usize];
        samples.extend((0..SR).map(|i| {
            0.8 * (2.0 * std::f32::consts::PI * 220.0 * i as f32 / SR as f32).sin()
        }));
        samples.extend(vec![0.0_f32; SR as usize]);
        let mut buf = buffer_of(samples);

        retrim(&mut buf, -30.0, 0.1).unwrap();

        let expected = SR as f32 * 1.2; // tone plus padding on both sides
        assert!((buf.len() as f32 - expected).abs() < SR as f32 * 0.02);
    }

    #[test]
    fn test_retrim_all_silence_is_noop() {
        let mut buf = buffer_of(vec![0.0_f32; 1000]);
        retrim(&mut buf, -30.0, 0.1).unwrap();
        assert_eq!(buf.len(), 1000);
    }

    // ------------------------------------------------------------------------
    // Sinus
    // ------------------------------------------------------------------------

    #[test]
    fn test_sinus_lands_on_unit_peak() {
        let mut samples = vec![0.1, -0.4, 0.25];
        sinus(&mut samples, 1).unwrap();
        assert_relative_eq!(peak_of(&samples), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_sinus_silent_fails() {
        let mut samples = vec![0.0_f32; 10];
        assert!(sinus(&mut samples, 1).is_err());
    }

    // ------------------------------------------------------------------------
    // Gain
    // ------------------------------------------------------------------------

    #[test]
    fn test_gain_scales_exactly() {
        let mut samples = vec![0.25, -0.5];
        gain(&mut samples, 1.0, 2.0).unwrap();
        assert_eq!(samples, vec![0.5, -1.0]);
    }

    // ------------------------------------------------------------------------
    // Desaturation
    // ------------------------------------------------------------------------

    #[test]
    fn test_desaturate_normalized_detect_unnormalized_correct() {
        // Peak 0.5 means sample 0 normalizes to 1.0 (above the 0.8
        // threshold) and is divided in its original scale: 0.5 / 2.
        let mut samples = vec![0.5, 0.1];
        desaturate(&mut samples, 0.8, 2.0, 1.0).unwrap();
        assert_relative_eq!(samples[0], 0.25, epsilon = 1e-6);
        assert_relative_eq!(samples[1], 0.1, epsilon = 1e-6);
    }

    #[test]
    fn test_desaturate_silent_is_noop() {
        let mut samples = vec![0.0_f32; 10];
        desaturate(&mut samples, 0.8, 2.0, 1.0).unwrap();
        assert!(samples.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_desaturate_zero_divisor_fails() {
        let mut samples = vec![0.5];
        assert!(desaturate(&mut samples, 0.8, 0.0, 1.0).is_err());
    }

    // ------------------------------------------------------------------------
    // Fade
    // ------------------------------------------------------------------------

    #[test]
    fn test_fade_zeroes_edges() {
        let mut buf = buffer_of(vec![0.5_f32; SR as usize]);
        fade(&mut buf, 0.1).unwrap();
        assert_eq!(buf.samples[0], 0.0);
        let len = buf.len();
        assert!(buf.samples[len - 1].abs() < 1e-3);
        // Middle untouched
        assert_relative_eq!(buf.samples[len / 2], 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_fade_reapplication_never_raises_edges() {
        let mut buf = buffer_of(vec![0.5_f32; SR as usize]);
        fade(&mut buf, 0.1).unwrap();
        let edge_region: Vec<f32> = buf.samples[..4410].to_vec();
        fade(&mut buf, 0.1).unwrap();
        for (before, after) in edge_region.iter().zip(&buf.samples[..4410]) {
            assert!(after.abs() <= before.abs() + 1e-9);
        }
    }

    #[test]
    fn test_fade_short_clip_is_noop() {
        // Shorter than twice the fade window: untouched
        let mut buf = buffer_of(vec![0.5_f32; 1000]);
        fade(&mut buf, 0.1).unwrap();
        assert!(buf.samples.iter().all(|&s| s == 0.5));
    }
}
