//! Batch pipeline operations
//!
//! Everything here walks a directory of WAV files and applies one core
//! operation per clip: splitting raw tracks into voice lines, running an
//! effect chain, or compiling clips into a single review track. Batch
//! runs are fail-soft per clip and abort only for an empty input
//! directory or an explicit cancellation.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{info, warn};

use crate::audio::buffer::AudioBuffer;
use crate::audio::io::{probe_sample_rate, read_clip, write_clip};
use crate::config::Config;
use crate::dsp::{apply_effects, EffectKind};
use crate::error::{Result, VoxlineError};
use crate::library::sequence::RepairPlan;
use crate::library::{ClipStore, FsClipStore};
use crate::segment::segment;

/// Frequency of the marker tone inserted between clips in a review track
const MARKER_HZ: f32 = 144.0;
/// Marker tone duration in seconds
const MARKER_SECS: f32 = 0.1;
/// Duration of silence stubs written for missing voice lines
const STUB_SECS: f32 = 0.01;

/// Cooperative cancellation handle shared between a batch run and its
/// controller. Checked between clips, never inside a clip, so a
/// cancelled run leaves every finished clip fully written.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Counters for one batch run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Clips fully processed and written
    pub processed: usize,
    /// Clips skipped because of a recoverable error
    pub skipped: usize,
    /// Non-fatal warnings raised along the way (short segments,
    /// skipped effect stages)
    pub warnings: usize,
}

fn listed_names(dir: &Path, config: &Config) -> Result<Vec<String>> {
    let store = FsClipStore::new(dir, config.library.extension.clone());
    let mut names = store.list()?;
    if names.is_empty() {
        return Err(VoxlineError::EmptyBatch {
            path: dir.display().to_string(),
        });
    }
    names.sort();
    Ok(names)
}

fn check_cancel(cancel: &CancelToken, completed: usize) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(VoxlineError::Cancelled { completed });
    }
    Ok(())
}

/// Split every track in `input_dir` into voice-line clips.
///
/// The working sample rate is adopted from the first track, so a 48 kHz
/// delivery is split at 48 kHz regardless of the configured default.
/// Segments shorter than `library.min_clip_secs` are dropped with a
/// warning; an odd track that defeats detection still produces one
/// full-span clip.
pub fn split_tracks(
    input_dir: &Path,
    output_dir: &Path,
    config: &Config,
    cancel: &CancelToken,
) -> Result<BatchReport> {
    let names = listed_names(input_dir, config)?;
    let input_store = FsClipStore::new(input_dir, config.library.extension.clone());
    let output_store = FsClipStore::new(output_dir, config.library.extension.clone());

    let mut config = config.clone();
    if let Ok(rate) = probe_sample_rate(&input_store.path_of(&names[0])) {
        config.adopt_sample_rate(rate);
    }

    let mut report = BatchReport::default();
    for name in &names {
        check_cancel(cancel, report.processed)?;

        let track = match read_clip(&input_store.path_of(name), config.library.sample_rate) {
            Ok(track) => track,
            Err(e) => {
                warn!("WARN: cannot read track '{name}': {e}");
                report.skipped += 1;
                continue;
            }
        };

        let segments = segment(&track, &config.segmentation);
        info!("Track '{name}': {} segment(s)", segments.len());

        let mut saved = 0;
        for (ordinal, &seg) in segments.iter().enumerate() {
            let clip = track.slice(seg, &config.library.name_separator, ordinal);
            if clip.duration_secs() < config.library.min_clip_secs {
                warn!(
                    "WARN: segment {ordinal} of '{name}' is only {:.3}s, not saved",
                    clip.duration_secs()
                );
                report.warnings += 1;
                continue;
            }
            match write_clip(&output_store.path_of(&clip.name), &clip) {
                Ok(()) => saved += 1,
                Err(e) => {
                    warn!("WARN: cannot write clip '{}': {e}", clip.name);
                    report.skipped += 1;
                }
            }
        }
        info!("Track '{name}': saved {saved} clip(s)");
        report.processed += 1;
    }
    Ok(report)
}

/// Run an effect chain over every clip in a directory, in place.
///
/// Each clip is read, chained, and rewritten only if the chain produced
/// a usable result; a clip that cannot be read or written is skipped
/// whole. Stage-level skips within a chain count as warnings.
pub fn process_clips(
    dir: &Path,
    effects: &[EffectKind],
    scale: f32,
    config: &Config,
    cancel: &CancelToken,
) -> Result<BatchReport> {
    let names = listed_names(dir, config)?;
    let store = FsClipStore::new(dir, config.library.extension.clone());

    let mut report = BatchReport::default();
    for name in &names {
        check_cancel(cancel, report.processed)?;

        let mut buffer = match read_clip(&store.path_of(name), config.library.sample_rate) {
            Ok(buffer) => buffer,
            Err(e) => {
                warn!("WARN: cannot read clip '{name}': {e}");
                report.skipped += 1;
                continue;
            }
        };

        let chain = apply_effects(&mut buffer, effects, scale, &config.effects);
        let stage_skips = chain.skipped().count();
        report.warnings += stage_skips;
        info!(
            "Clip '{name}': {} stage(s) applied, {stage_skips} skipped",
            chain.applied()
        );

        if let Err(e) = write_clip(&store.path_of(name), &buffer) {
            warn!("WARN: cannot write clip '{name}': {e}");
            report.skipped += 1;
            continue;
        }
        report.processed += 1;
    }
    Ok(report)
}

/// Marker tone placed between clips in a compiled review track
fn marker_tone(sample_rate: u32) -> Vec<f32> {
    let len = (MARKER_SECS * sample_rate as f32) as usize;
    (0..len)
        .map(|i| {
            0.5 * (2.0 * std::f32::consts::PI * MARKER_HZ * i as f32 / sample_rate as f32).sin()
        })
        .collect()
}

/// Concatenate every clip in a directory into one review track.
///
/// Clips are joined in sorted name order with a short low sine marker
/// between them, so a reviewer can hear the boundaries. Returns the
/// number of clips compiled.
pub fn compile_review_track(dir: &Path, output: &Path, config: &Config) -> Result<usize> {
    let names = listed_names(dir, config)?;
    let store = FsClipStore::new(dir, config.library.extension.clone());

    let sample_rate = config.library.sample_rate;
    let marker = marker_tone(sample_rate);
    let mut samples: Vec<f32> = Vec::new();
    let mut compiled = 0;

    for name in &names {
        match read_clip(&store.path_of(name), sample_rate) {
            Ok(clip) => {
                if compiled > 0 {
                    samples.extend_from_slice(&marker);
                }
                samples.extend_from_slice(&clip.samples);
                compiled += 1;
            }
            Err(e) => warn!("WARN: leaving '{name}' out of the review track: {e}"),
        }
    }
    if compiled == 0 {
        return Err(VoxlineError::EmptyBatch {
            path: dir.display().to_string(),
        });
    }

    let track = AudioBuffer::from_samples(samples, sample_rate, "review");
    write_clip(output, &track)?;
    info!("Compiled {compiled} clip(s) into {}", output.display());
    Ok(compiled)
}

/// Write short silence stubs for ordinals a repair could not fill.
///
/// A stub keeps downstream tooling that expects dense sequences working
/// until the line is re-recorded.
pub fn stub_missing_clips(dir: &Path, plans: &[RepairPlan], config: &Config) -> Result<usize> {
    let store = FsClipStore::new(dir, config.library.extension.clone());
    let mut written = 0;

    for plan in plans {
        for &ordinal in &plan.missing {
            let name = format!("{}{}{}", plan.base, config.library.name_separator, ordinal);
            let stub = AudioBuffer::silence(STUB_SECS, config.library.sample_rate, name.clone());
            write_clip(&store.path_of(&name), &stub)?;
            info!("Wrote silence stub '{name}'");
            written += 1;
        }
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn test_config() -> Config {
        let mut config = Config::default();
        // Tight thresholds so short synthetic tracks split cleanly
        config.segmentation.min_silence_secs = 0.3;
        config.segmentation.min_segment_secs = 0.1;
        config.segmentation.padding_secs = 0.1;
        config
    }

    /// 3 second track with two spoken lines
    fn write_two_line_track(dir: &Path, config: &Config) {
        let sr = config.library.sample_rate;
        let len = 3 * sr as usize;
        let mut samples = vec![0.0_f32; len];
        for &(start, end) in &[(0.5_f32, 1.0_f32), (1.5, 2.2)] {
            let a = (start * sr as f32) as usize;
            let b = (end * sr as f32) as usize;
            for (i, sample) in samples[a..b].iter_mut().enumerate() {
                *sample = 0.8 * (2.0 * std::f32::consts::PI * 220.0 * i as f32 / sr as f32).sin();
            }
        }
        let track = AudioBuffer::from_samples(samples, sr, "scene");
        write_clip(&dir.join("scene.wav"), &track).unwrap();
    }

    #[test]
    fn test_split_produces_ordered_clips() {
        let config = test_config();
        let input = tempdir().unwrap();
        let output = tempdir().unwrap();
        write_two_line_track(input.path(), &config);

        let report =
            split_tracks(input.path(), output.path(), &config, &CancelToken::new()).unwrap();
        assert_eq!(report.processed, 1);

        assert!(output.path().join("scene_0.wav").exists());
        assert!(output.path().join("scene_1.wav").exists());
        assert!(!output.path().join("scene_2.wav").exists());
    }

    #[test]
    fn test_split_unwritable_clip_skips_and_continues() {
        // Output path is a regular file, so every clip write fails;
        // the run still completes and reports the skips.
        let config = test_config();
        let input = tempdir().unwrap();
        write_two_line_track(input.path(), &config);
        let parent = tempdir().unwrap();
        let output = parent.path().join("not_a_dir");
        std::fs::write(&output, b"occupied").unwrap();

        let report =
            split_tracks(input.path(), &output, &config, &CancelToken::new()).unwrap();
        assert_eq!(report.processed, 1);
        assert_eq!(report.skipped, 2);
    }

    #[test]
    fn test_split_empty_dir_aborts() {
        let config = test_config();
        let input = tempdir().unwrap();
        let output = tempdir().unwrap();

        let result = split_tracks(input.path(), output.path(), &config, &CancelToken::new());
        assert!(matches!(result, Err(VoxlineError::EmptyBatch { .. })));
    }

    #[test]
    fn test_cancelled_run_reports_progress() {
        let config = test_config();
        let input = tempdir().unwrap();
        let output = tempdir().unwrap();
        write_two_line_track(input.path(), &config);

        let cancel = CancelToken::new();
        cancel.cancel();
        let result = split_tracks(input.path(), output.path(), &config, &cancel);
        assert!(matches!(
            result,
            Err(VoxlineError::Cancelled { completed: 0 })
        ));
    }

    #[test]
    fn test_process_applies_gain_in_place() {
        let mut config = test_config();
        config.effects.gain = 2.0;
        let dir = tempdir().unwrap();

        let sr = config.library.sample_rate;
        let samples: Vec<f32> = (0..sr / 2)
            .map(|i| 0.2 * (2.0 * std::f32::consts::PI * 220.0 * i as f32 / sr as f32).sin())
            .collect();
        let clip = AudioBuffer::from_samples(samples, sr, "judge_0");
        write_clip(&dir.path().join("judge_0.wav"), &clip).unwrap();

        let report = process_clips(
            dir.path(),
            &[EffectKind::Gain],
            1.0,
            &config,
            &CancelToken::new(),
        )
        .unwrap();
        assert_eq!(report.processed, 1);

        let processed = read_clip(&dir.path().join("judge_0.wav"), sr).unwrap();
        assert!((processed.peak() - 0.4).abs() < 1e-3);
    }

    #[test]
    fn test_compile_inserts_markers() {
        let config = test_config();
        let dir = tempdir().unwrap();
        let sr = config.library.sample_rate;

        for name in ["judge_0", "judge_1"] {
            let clip = AudioBuffer::from_samples(vec![0.3; sr as usize / 10], sr, name);
            write_clip(&dir.path().join(format!("{name}.wav")), &clip).unwrap();
        }

        let output = dir.path().join("review.wav");
        let compiled = compile_review_track(dir.path(), &output, &config).unwrap();
        assert_eq!(compiled, 2);

        let track = read_clip(&output, sr).unwrap();
        let marker_len = (MARKER_SECS * sr as f32) as usize;
        assert_eq!(track.len(), 2 * (sr as usize / 10) + marker_len);
    }

    #[test]
    fn test_stub_missing_clips() {
        let config = test_config();
        let dir = tempdir().unwrap();

        let plans = vec![RepairPlan {
            base: "judge".to_string(),
            renames: vec![],
            missing: vec![1, 2],
        }];
        let written = stub_missing_clips(dir.path(), &plans, &config).unwrap();
        assert_eq!(written, 2);

        let stub = read_clip(&dir.path().join("judge_1.wav"), 44100).unwrap();
        assert!(stub.peak() < 1e-6);
        assert!((stub.duration_secs() - 0.01).abs() < 1e-3);
    }
}
