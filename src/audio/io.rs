//! WAV file I/O
//!
//! Handles loading and saving clips using the hound crate. Multi-channel
//! files are mixed down to mono on load (the whole pipeline is mono),
//! and everything is resampled to the configured working rate. Saved
//! clips are always 16-bit integer PCM.

use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::debug;

use crate::audio::buffer::AudioBuffer;
use crate::error::{Result, VoxlineError};

/// Read just the sample rate from a WAV header.
///
/// Used to let a batch adopt the rate of its source material without
/// decoding a whole file up front.
pub fn probe_sample_rate(path: &Path) -> Result<u32> {
    let reader = WavReader::open(path).map_err(|e| map_read_error(path, e))?;
    Ok(reader.spec().sample_rate)
}

/// Load a WAV file as a mono clip at the target sample rate.
///
/// The clip name is the file stem; batch reports refer to clips by that
/// name.
pub fn read_clip(path: &Path, target_rate: u32) -> Result<AudioBuffer> {
    let reader = WavReader::open(path).map_err(|e| map_read_error(path, e))?;
    let spec = reader.spec();
    let channels = spec.channels as usize;
    if channels == 0 {
        return Err(VoxlineError::InvalidAudio {
            reason: format!("{}: zero channels", path.display()),
            source: None,
        });
    }

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .map(|s| s.map_err(|e| map_read_error(path, e)))
            .collect::<Result<Vec<f32>>>()?,
        SampleFormat::Int => {
            let bits = spec.bits_per_sample;
            if bits == 0 || bits > 32 {
                return Err(VoxlineError::UnsupportedFormat {
                    format: format!("{bits}-bit integer PCM"),
                });
            }
            let max_val = (1u64 << (bits - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| {
                    s.map(|v| v as f32 / max_val)
                        .map_err(|e| map_read_error(path, e))
                })
                .collect::<Result<Vec<f32>>>()?
        }
    };

    // Mix down to mono by averaging channels per frame
    let samples: Vec<f32> = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    };

    let samples = if spec.sample_rate == target_rate {
        samples
    } else {
        debug!(
            "Resampling {} from {} to {} Hz",
            path.display(),
            spec.sample_rate,
            target_rate
        );
        resample_linear(&samples, spec.sample_rate, target_rate)
    };

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    Ok(AudioBuffer::from_samples(samples, target_rate, name))
}

/// Save a clip as 16-bit integer PCM WAV.
pub fn write_clip(path: &Path, buffer: &AudioBuffer) -> Result<()> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: buffer.sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec).map_err(|e| map_write_error(path, e))?;

    let max_val = (i16::MAX) as f32;
    for &sample in &buffer.samples {
        let int_sample = (sample.clamp(-1.0, 1.0) * max_val) as i16;
        writer
            .write_sample(int_sample)
            .map_err(|e| map_write_error(path, e))?;
    }

    writer.finalize().map_err(|e| map_write_error(path, e))?;
    Ok(())
}

/// Linear interpolation resampler.
///
/// Good enough for rate alignment of speech clips; anything upstream
/// that cares about imaging quality should deliver at the working rate.
fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if samples.is_empty() || from_rate == to_rate {
        return samples.to_vec();
    }
    let ratio = from_rate as f64 / to_rate as f64;
    let out_len = ((samples.len() as f64) / ratio).round() as usize;

    (0..out_len)
        .map(|i| {
            let pos = i as f64 * ratio;
            let idx = pos as usize;
            let frac = (pos - idx as f64) as f32;
            let a = samples[idx.min(samples.len() - 1)];
            let b = samples[(idx + 1).min(samples.len() - 1)];
            a + (b - a) * frac
        })
        .collect()
}

fn map_read_error(path: &Path, e: hound::Error) -> VoxlineError {
    match e {
        hound::Error::IoError(io) if io.kind() == std::io::ErrorKind::NotFound => {
            VoxlineError::FileNotFound {
                path: path.display().to_string(),
                source: Some(io),
            }
        }
        other => VoxlineError::InvalidAudio {
            reason: format!("{}: {other}", path.display()),
            source: Some(Box::new(other)),
        },
    }
}

fn map_write_error(path: &Path, e: hound::Error) -> VoxlineError {
    VoxlineError::InvalidAudio {
        reason: format!("{}: {e}", path.display()),
        source: Some(Box::new(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sine_buffer(frequency: f32, duration_secs: f32, sample_rate: u32) -> AudioBuffer {
        let len = (duration_secs * sample_rate as f32) as usize;
        let samples = (0..len)
            .map(|i| {
                0.5 * (2.0 * std::f32::consts::PI * frequency * i as f32 / sample_rate as f32)
                    .sin()
            })
            .collect();
        AudioBuffer::from_samples(samples, sample_rate, "tone")
    }

    #[test]
    fn test_round_trip_16bit() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tone.wav");

        let original = sine_buffer(440.0, 0.5, 44100);
        write_clip(&path, &original).unwrap();

        let loaded = read_clip(&path, 44100).unwrap();
        assert_eq!(loaded.sample_rate, 44100);
        assert_eq!(loaded.len(), original.len());
        assert_eq!(loaded.name, "tone");

        // 16-bit quantization tolerance
        for (a, b) in original.samples.iter().zip(&loaded.samples) {
            assert!((a - b).abs() < 1e-3);
        }
    }

    #[test]
    fn test_read_resamples_to_target_rate() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tone48k.wav");

        let original = sine_buffer(440.0, 0.5, 48000);
        write_clip(&path, &original).unwrap();

        let loaded = read_clip(&path, 44100).unwrap();
        assert_eq!(loaded.sample_rate, 44100);
        assert!((loaded.duration_secs() - 0.5).abs() < 0.01);
    }

    #[test]
    fn test_probe_sample_rate() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("probe.wav");
        write_clip(&path, &sine_buffer(440.0, 0.1, 22050)).unwrap();

        assert_eq!(probe_sample_rate(&path).unwrap(), 22050);
    }

    #[test]
    fn test_missing_file_is_file_not_found() {
        let result = read_clip(Path::new("does_not_exist.wav"), 44100);
        assert!(matches!(result, Err(VoxlineError::FileNotFound { .. })));
    }

    #[test]
    fn test_resample_preserves_duration() {
        let samples = vec![0.5_f32; 48000];
        let out = resample_linear(&samples, 48000, 44100);
        assert_eq!(out.len(), 44100);
    }
}
