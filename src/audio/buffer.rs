//! Mono audio buffer
//!
//! Every core operation works on fully loaded mono buffers; there is no
//! streaming path. A buffer keeps its sample rate for its whole lifetime
//! and carries the source name so batch reports can point at the clip
//! that misbehaved.

use crate::segment::Segment;

// ============================================================================
// Unit conversion helpers
// ============================================================================

/// Convert decibels to linear amplitude
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Convert linear amplitude to decibels.
///
/// Returns negative infinity for zero or negative input.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        f32::NEG_INFINITY
    } else {
        20.0 * linear.log10()
    }
}

// ============================================================================
// Audio buffer
// ============================================================================

/// Decoded mono audio owned by exactly one pipeline stage at a time.
///
/// Samples are nominally in [-1, 1] but are not clamped; effect stages
/// may push them outside that range and the desaturation stage exists to
/// pull them back.
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    /// Mono sample data
    pub samples: Vec<f32>,
    /// Sample rate in Hz, constant for the buffer's lifetime
    pub sample_rate: u32,
    /// Source identity (file stem or synthetic label)
    pub name: String,
}

impl AudioBuffer {
    /// Create a buffer from raw mono samples.
    pub fn from_samples(samples: Vec<f32>, sample_rate: u32, name: impl Into<String>) -> Self {
        Self {
            samples,
            sample_rate,
            name: name.into(),
        }
    }

    /// Create a silent buffer of the given duration.
    ///
    /// Used to stub out missing voice lines with a 10ms placeholder.
    pub fn silence(duration_secs: f32, sample_rate: u32, name: impl Into<String>) -> Self {
        let num_samples = (duration_secs * sample_rate as f32) as usize;
        Self {
            samples: vec![0.0; num_samples],
            sample_rate,
            name: name.into(),
        }
    }

    /// Number of samples
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the buffer has no samples
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds
    #[inline]
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.len() as f32 / self.sample_rate as f32
    }

    /// Peak absolute amplitude (linear)
    pub fn peak(&self) -> f32 {
        self.samples.iter().map(|s| s.abs()).fold(0.0_f32, f32::max)
    }

    /// Extract one segment as a new buffer named `{name}{sep}{ordinal}`.
    ///
    /// The segment is clamped to the buffer bounds; a segment entirely
    /// outside the buffer yields an empty clip.
    pub fn slice(&self, segment: Segment, separator: &str, ordinal: usize) -> Self {
        let start = segment.start.min(self.len());
        let end = segment.end.min(self.len());
        Self {
            samples: self.samples[start..end].to_vec(),
            sample_rate: self.sample_rate,
            name: format!("{}{}{}", self.name, separator, ordinal),
        }
    }

    /// Check that all samples are finite (no NaN/Inf from a DSP blowup)
    pub fn is_finite(&self) -> bool {
        self.samples.iter().all(|s| s.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_to_linear() {
        assert!((db_to_linear(0.0) - 1.0).abs() < 1e-6);
        assert!((db_to_linear(-6.0206) - 0.5).abs() < 1e-4);
        assert!((db_to_linear(-20.0) - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_linear_to_db() {
        assert!((linear_to_db(1.0) - 0.0).abs() < 1e-6);
        assert!((linear_to_db(0.1) - (-20.0)).abs() < 1e-4);
        assert!(linear_to_db(0.0).is_infinite() && linear_to_db(0.0).is_sign_negative());
    }

    #[test]
    fn test_silence_buffer() {
        let buf = AudioBuffer::silence(0.01, 44100, "stub");
        assert_eq!(buf.len(), 441);
        assert!((buf.peak() - 0.0).abs() < 1e-9);
        assert!((buf.duration_secs() - 0.01).abs() < 1e-4);
    }

    #[test]
    fn test_peak() {
        let buf = AudioBuffer::from_samples(vec![0.1, -0.8, 0.3], 44100, "t");
        assert!((buf.peak() - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_slice_names_clip() {
        let buf = AudioBuffer::from_samples(vec![0.0, 0.1, 0.2, 0.3], 44100, "judge");
        let clip = buf.slice(Segment::new(1, 3), "_", 0);
        assert_eq!(clip.samples, vec![0.1, 0.2]);
        assert_eq!(clip.name, "judge_0");
        assert_eq!(clip.sample_rate, 44100);
    }

    #[test]
    fn test_slice_clamps_to_bounds() {
        let buf = AudioBuffer::from_samples(vec![0.1, 0.2], 44100, "t");
        let clip = buf.slice(Segment::new(1, 100), "_", 1);
        assert_eq!(clip.samples, vec![0.2]);
    }

    #[test]
    fn test_is_finite() {
        let mut buf = AudioBuffer::from_samples(vec![0.1, 0.2], 44100, "t");
        assert!(buf.is_finite());
        buf.samples[0] = f32::NAN;
        assert!(!buf.is_finite());
    }
}
