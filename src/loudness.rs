//! Reference-relative loudness matching
//!
//! Dubbed clips are brought to the level of the original-language lines
//! they replace. For each base name the reference directory contributes
//! a mean RMS; every work clip with that base is scaled by
//! `(reference_rms / clip_rms) * multiplier` and rewritten in place.
//!
//! Per-clip failures (no matching reference family, near-silent clip)
//! are logged and skipped; only an empty work directory aborts the run.

use std::collections::HashMap;
use std::path::Path;

use log::{info, warn};

use crate::audio::analysis::{clip_rms, isolated_rms};
use crate::audio::buffer::AudioBuffer;
use crate::audio::io::{read_clip, write_clip};
use crate::config::Config;
use crate::error::{Result, VoxlineError};
use crate::library::{parse_clip_name, ClipStore, FsClipStore};

/// Near-silence cutoff below which a gain cannot be solved
const RMS_EPSILON: f32 = 1e-8;

/// Counters for one matching run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchReport {
    pub adjusted: usize,
    pub skipped: usize,
}

/// Solve the gain that moves `clip_rms` onto `reference_rms`.
///
/// A near-zero clip RMS has no meaningful solution and is a per-clip
/// error; the multiplier rides on top of the solved ratio.
pub fn solve_gain(clip_rms: f32, reference_rms: f32, multiplier: f32, clip: &str) -> Result<f32> {
    if clip_rms < RMS_EPSILON {
        return Err(VoxlineError::DegenerateRms {
            clip: clip.to_string(),
        });
    }
    Ok((reference_rms / clip_rms) * multiplier)
}

/// RMS under the configured measurement mode
fn measured_rms(buffer: &AudioBuffer, config: &Config) -> f32 {
    if config.matching.accurate {
        isolated_rms(buffer, config.matching.isolation_silence_db)
    } else {
        clip_rms(buffer)
    }
}

/// Mean RMS per base name across a reference directory
fn reference_levels(dir: &Path, config: &Config) -> Result<HashMap<String, f32>> {
    let store = FsClipStore::new(dir, config.library.extension.clone());
    let mut sums: HashMap<String, (f32, usize)> = HashMap::new();

    for name in store.list()? {
        let base = match parse_clip_name(&name, &config.library.name_separator) {
            Ok((base, _)) => base,
            Err(e) => {
                warn!("WARN: skipping reference '{name}': {e}");
                continue;
            }
        };
        match read_clip(&store.path_of(&name), config.library.sample_rate) {
            Ok(buffer) => {
                let entry = sums.entry(base).or_insert((0.0, 0));
                entry.0 += measured_rms(&buffer, config);
                entry.1 += 1;
            }
            Err(e) => warn!("WARN: cannot read reference '{name}': {e}"),
        }
    }

    Ok(sums
        .into_iter()
        .map(|(base, (sum, n))| (base, sum / n as f32))
        .collect())
}

/// Match every clip in `work_dir` against the reference levels.
///
/// Clips are rewritten in place at their solved gain. Clips without a
/// reference family, with malformed names, or too quiet to solve are
/// skipped with a warning.
pub fn match_loudness(work_dir: &Path, reference_dir: &Path, config: &Config) -> Result<MatchReport> {
    let store = FsClipStore::new(work_dir, config.library.extension.clone());
    let names = store.list()?;
    if names.is_empty() {
        return Err(VoxlineError::EmptyBatch {
            path: work_dir.display().to_string(),
        });
    }

    let levels = reference_levels(reference_dir, config)?;
    let mut report = MatchReport::default();

    for name in &names {
        match adjust_clip(&store, name, &levels, config) {
            Ok(gain) => {
                info!("Adjusted '{name}' by {gain:.4}x");
                report.adjusted += 1;
            }
            Err(e) => {
                warn!("WARN: skipping '{name}': {e}");
                report.skipped += 1;
            }
        }
    }
    Ok(report)
}

fn adjust_clip(
    store: &FsClipStore,
    name: &str,
    levels: &HashMap<String, f32>,
    config: &Config,
) -> Result<f32> {
    let (base, _) = parse_clip_name(name, &config.library.name_separator)?;
    let reference_rms = levels
        .get(&base)
        .copied()
        .ok_or(VoxlineError::NoReferenceMatch { base })?;

    let path = store.path_of(name);
    let mut buffer = read_clip(&path, config.library.sample_rate)?;
    let gain = solve_gain(
        measured_rms(&buffer, config),
        reference_rms,
        config.matching.volume_multiplier,
        name,
    )?;

    for sample in &mut buffer.samples {
        *sample *= gain;
    }
    write_clip(&path, &buffer)?;
    Ok(gain)
}
