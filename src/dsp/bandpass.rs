//! Zero-phase Butterworth band-pass
//!
//! Built as a cascade of RBJ cookbook biquads: a high-pass stack at the
//! low edge and a low-pass stack at the high edge, each run forward and
//! then backward over the clip. The backward pass cancels the phase
//! shift of the forward pass and squares the magnitude response, so the
//! effective attenuation is twice the design order.

use std::f64::consts::PI;

use crate::error::{Result, VoxlineError};

/// Biquad coefficients, normalized by a0.
/// Transfer function: H(z) = (b0 + b1*z^-1 + b2*z^-2) / (1 + a1*z^-1 + a2*z^-2)
#[derive(Debug, Clone, Copy, Default)]
struct BiquadCoeffs {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl BiquadCoeffs {
    /// Cookbook low-pass section.
    /// Reference: https://www.w3.org/2011/audio/audio-eq-cookbook.html
    fn low_pass(sample_rate: f64, frequency: f64, q: f64) -> Self {
        let w0 = 2.0 * PI * frequency / sample_rate;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * q);

        let b0 = (1.0 - cos_w0) / 2.0;
        let b1 = 1.0 - cos_w0;
        let b2 = (1.0 - cos_w0) / 2.0;
        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_w0;
        let a2 = 1.0 - alpha;

        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }

    /// Cookbook high-pass section
    fn high_pass(sample_rate: f64, frequency: f64, q: f64) -> Self {
        let w0 = 2.0 * PI * frequency / sample_rate;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * q);

        let b0 = (1.0 + cos_w0) / 2.0;
        let b1 = -(1.0 + cos_w0);
        let b2 = (1.0 + cos_w0) / 2.0;
        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_w0;
        let a2 = 1.0 - alpha;

        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }
}

/// Biquad delay line, Direct Form I in f64
#[derive(Debug, Clone, Copy, Default)]
struct BiquadState {
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl BiquadState {
    fn process(&mut self, input: f64, coeffs: &BiquadCoeffs) -> f64 {
        let output = coeffs.b0 * input + coeffs.b1 * self.x1 + coeffs.b2 * self.x2
            - coeffs.a1 * self.y1
            - coeffs.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;

        output
    }
}

/// Q factors for the second-order sections of a Butterworth filter.
///
/// For an even order n the cascade needs n/2 sections with
/// Q_k = 1 / (2 cos((2k + 1) pi / (2n))).
fn butterworth_qs(sections: usize) -> Vec<f64> {
    let n = (2 * sections) as f64;
    (0..sections)
        .map(|k| 1.0 / (2.0 * ((2 * k + 1) as f64 * PI / (2.0 * n)).cos()))
        .collect()
}

/// One directional pass of a biquad cascade over the whole clip
fn run_cascade(samples: &mut [f32], cascade: &[BiquadCoeffs]) {
    for coeffs in cascade {
        let mut state = BiquadState::default();
        for sample in samples.iter_mut() {
            *sample = state.process(*sample as f64, coeffs) as f32;
        }
    }
}

/// Apply a zero-phase Butterworth band-pass between `low_hz` and `high_hz`.
///
/// `order` is the design order of each edge filter; odd orders are
/// rounded up to the next even order. Each cascade runs forward and then
/// over the reversed clip, which leaves no net phase shift.
pub fn bandpass_zero_phase(
    samples: &mut [f32],
    sample_rate: u32,
    order: u32,
    low_hz: f32,
    high_hz: f32,
) -> Result<()> {
    let nyquist = sample_rate as f64 / 2.0;
    if low_hz <= 0.0 || (low_hz as f64) >= nyquist {
        return Err(VoxlineError::InvalidParameter {
            param: "bandpass_low_hz".to_string(),
            value: low_hz.to_string(),
            expected: format!("0 < low < {nyquist} Hz"),
        });
    }
    if (high_hz as f64) <= (low_hz as f64) || (high_hz as f64) >= nyquist {
        return Err(VoxlineError::InvalidParameter {
            param: "bandpass_high_hz".to_string(),
            value: high_hz.to_string(),
            expected: format!("{low_hz} < high < {nyquist} Hz"),
        });
    }
    if order == 0 {
        return Err(VoxlineError::InvalidParameter {
            param: "bandpass_order".to_string(),
            value: "0".to_string(),
            expected: ">= 1".to_string(),
        });
    }
    if samples.is_empty() {
        return Ok(());
    }

    let sections = ((order + 1) / 2) as usize;
    let qs = butterworth_qs(sections);

    let sr = sample_rate as f64;
    let high_pass: Vec<BiquadCoeffs> = qs
        .iter()
        .map(|&q| BiquadCoeffs::high_pass(sr, low_hz as f64, q))
        .collect();
    let low_pass: Vec<BiquadCoeffs> = qs
        .iter()
        .map(|&q| BiquadCoeffs::low_pass(sr, high_hz as f64, q))
        .collect();

    run_cascade(samples, &high_pass);
    run_cascade(samples, &low_pass);
    samples.reverse();
    run_cascade(samples, &high_pass);
    run_cascade(samples, &low_pass);
    samples.reverse();

    Ok(())
}
