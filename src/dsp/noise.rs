//! Spectral gate noise reduction
//!
//! Short-time FFT over Hann windows at 50% overlap. Each frequency bin
//! is compared against an estimated noise floor and attenuated toward a
//! configurable gain floor when it does not rise above that estimate.
//! Stationary mode averages the floor over the whole clip; otherwise the
//! floor tracks the clip with a slow per-bin moving average.
//!
//! `strength` in [0, 1] sets how far gated bins are pulled down: the
//! residual gain is `1 - strength`. Values outside that range clamp.

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

use crate::error::{Result, VoxlineError};

const FFT_SIZE: usize = 1024;
const HOP: usize = FFT_SIZE / 2;
const BINS: usize = FFT_SIZE / 2 + 1;

/// Smoothing factor for the adaptive (non-stationary) floor estimate
const FLOOR_SMOOTHING: f32 = 0.9;

fn hann_window() -> Vec<f32> {
    (0..FFT_SIZE)
        .map(|i| {
            let phase = 2.0 * std::f32::consts::PI * i as f32 / FFT_SIZE as f32;
            0.5 * (1.0 - phase.cos())
        })
        .collect()
}

/// Reduce broadband noise in place.
///
/// Fails on clips shorter than one analysis window; the chain treats
/// that as a skipped stage rather than padding the clip.
pub fn reduce_noise(samples: &mut [f32], strength: f32, stationary: bool) -> Result<()> {
    if samples.len() < FFT_SIZE {
        return Err(VoxlineError::StageFailed {
            stage: "noisereduction".to_string(),
            reason: format!(
                "clip has {} samples, analysis window needs {FFT_SIZE}",
                samples.len()
            ),
        });
    }

    let gain_floor = (1.0 - strength).clamp(0.0, 1.0);
    if gain_floor >= 1.0 {
        return Ok(());
    }

    let window = hann_window();
    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(FFT_SIZE);
    let ifft = planner.plan_fft_inverse(FFT_SIZE);

    // Analysis pass: windowed spectra at 50% overlap
    let mut spectra: Vec<Vec<Complex<f32>>> = Vec::new();
    let mut start = 0;
    while start + FFT_SIZE <= samples.len() {
        let mut frame: Vec<Complex<f32>> = (0..FFT_SIZE)
            .map(|i| Complex::new(samples[start + i] * window[i], 0.0))
            .collect();
        fft.process(&mut frame);
        spectra.push(frame);
        start += HOP;
    }

    let bins = BINS;
    let stationary_floor: Option<Vec<f32>> = stationary.then(|| {
        let mut mean = vec![0.0_f32; bins];
        for spectrum in &spectra {
            for (b, acc) in mean.iter_mut().enumerate() {
                *acc += spectrum[b].norm();
            }
        }
        for acc in &mut mean {
            *acc /= spectra.len() as f32;
        }
        mean
    });
    let mut adaptive_floor = vec![0.0_f32; bins];

    // Gate, invert, overlap-add
    let mut out = vec![0.0_f32; samples.len()];
    let mut window_sum = vec![0.0_f32; samples.len()];
    for (t, spectrum) in spectra.iter_mut().enumerate() {
        for b in 0..bins {
            let mag = spectrum[b].norm();
            let floor = match &stationary_floor {
                Some(mean) => mean[b],
                None => {
                    let previous = adaptive_floor[b];
                    adaptive_floor[b] = if t == 0 {
                        mag
                    } else {
                        FLOOR_SMOOTHING * previous + (1.0 - FLOOR_SMOOTHING) * mag
                    };
                    if t == 0 {
                        mag
                    } else {
                        previous
                    }
                }
            };
            let gain = if mag > 1e-12 {
                ((mag - floor) / mag).clamp(gain_floor, 1.0)
            } else {
                gain_floor
            };
            spectrum[b] *= gain;
            // Mirror onto the conjugate bin to keep the signal real
            if b > 0 && b < FFT_SIZE / 2 {
                spectrum[FFT_SIZE - b] *= gain;
            }
        }

        ifft.process(spectrum);
        let offset = t * HOP;
        for i in 0..FFT_SIZE {
            out[offset + i] += spectrum[i].re / FFT_SIZE as f32 * window[i];
            window_sum[offset + i] += window[i] * window[i];
        }
    }

    // Normalize by the accumulated window energy; the tail past the last
    // full window keeps its original samples.
    for (i, sample) in samples.iter_mut().enumerate() {
        if window_sum[i] > 1e-6 {
            *sample = out[i] / window_sum[i];
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rms(samples: &[f32]) -> f32 {
        let sum: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
        (sum / samples.len() as f64).sqrt() as f32
    }

    /// Deterministic pseudo-noise, roughly uniform in [-0.5, 0.5]
    fn pseudo_noise(len: usize) -> Vec<f32> {
        let mut state: u32 = 0x2545_f491;
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(1664525).wrapping_add(1013904223);
                (state >> 8) as f32 / (1 << 24) as f32 - 0.5
            })
            .collect()
    }

    #[test]
    fn test_zero_strength_is_identity() {
        let mut samples = pseudo_noise(4096);
        let original = samples.clone();
        reduce_noise(&mut samples, 0.0, true).unwrap();
        assert_eq!(samples, original);
    }

    #[test]
    fn test_stationary_gate_attenuates_noise() {
        let mut samples = pseudo_noise(44100);
        let before = rms(&samples);
        reduce_noise(&mut samples, 0.8, true).unwrap();
        let after = rms(&samples);

        assert!(after < before, "noise should drop: {before} -> {after}");
        assert!(after > 0.0);
        assert!(samples.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn test_adaptive_gate_attenuates_noise() {
        let mut samples = pseudo_noise(44100);
        let before = rms(&samples);
        reduce_noise(&mut samples, 0.8, false).unwrap();
        assert!(rms(&samples) < before);
    }

    #[test]
    fn test_residual_respects_gain_floor() {
        // With strength 0.5 no bin drops below half amplitude, so the
        // output keeps a substantial residual.
        let mut samples = pseudo_noise(44100);
        let before = rms(&samples);
        reduce_noise(&mut samples, 0.5, true).unwrap();
        assert!(rms(&samples) > before * 0.3);
    }

    #[test]
    fn test_clip_shorter_than_window_fails() {
        let mut samples = vec![0.1_f32; FFT_SIZE - 1];
        assert!(reduce_noise(&mut samples, 0.8, true).is_err());
    }

    #[test]
    fn test_overstrength_clamps() {
        let mut samples = pseudo_noise(8192);
        reduce_noise(&mut samples, 2.0, true).unwrap();
        assert!(samples.iter().all(|s| s.is_finite()));
    }
}
