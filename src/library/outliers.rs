//! Amplitude outlier detection
//!
//! Flags clips whose RMS sits far outside the library's typical level,
//! which usually means a clipped export or a near-silent misfire. The
//! test is a fixed ratio against the arithmetic mean RMS, so one extreme
//! clip in a small library skews the mean; treat hits as candidates for
//! review, not verdicts.

use std::path::Path;

use log::{info, warn};

use crate::audio::analysis::clip_rms;
use crate::audio::io::read_clip;
use crate::config::Config;
use crate::error::{Result, VoxlineError};
use crate::library::{ClipStore, FsClipStore};

/// RMS ratio above the mean that flags a clip as too hot
const HOT_RATIO: f32 = 100.0;
/// RMS ratio below the mean that flags a clip as too quiet
const QUIET_RATIO: f32 = 0.01;

/// One flagged clip
#[derive(Debug, Clone, PartialEq)]
pub struct Outlier {
    pub name: String,
    pub rms: f32,
    /// This clip's RMS over the library mean
    pub ratio: f32,
}

/// Flag clips whose RMS is more than 100x or less than 0.01x the mean.
///
/// Input is (name, rms) pairs; an empty input or an all-silent library
/// yields no outliers.
pub fn detect_outliers(clips: &[(String, f32)]) -> Vec<Outlier> {
    if clips.is_empty() {
        return Vec::new();
    }
    let mean = clips.iter().map(|(_, rms)| rms).sum::<f32>() / clips.len() as f32;
    if mean <= 0.0 {
        return Vec::new();
    }

    clips
        .iter()
        .filter_map(|(name, rms)| {
            let ratio = rms / mean;
            (ratio > HOT_RATIO || ratio < QUIET_RATIO).then(|| Outlier {
                name: name.clone(),
                rms: *rms,
                ratio,
            })
        })
        .collect()
}

/// Scan a directory for amplitude outliers, optionally deleting them.
pub fn scan_outliers(dir: &Path, config: &Config, purge: bool) -> Result<Vec<Outlier>> {
    let mut store = FsClipStore::new(dir, config.library.extension.clone());
    let names = store.list()?;
    if names.is_empty() {
        return Err(VoxlineError::EmptyBatch {
            path: dir.display().to_string(),
        });
    }

    let mut clips = Vec::with_capacity(names.len());
    for name in &names {
        match read_clip(&store.path_of(name), config.library.sample_rate) {
            Ok(buffer) => clips.push((name.clone(), clip_rms(&buffer))),
            Err(e) => warn!("WARN: cannot read '{name}': {e}"),
        }
    }

    let outliers = detect_outliers(&clips);
    for outlier in &outliers {
        info!(
            "Outlier '{}': RMS {:.6} ({:.1}x library mean)",
            outlier.name, outlier.rms, outlier.ratio
        );
        if purge {
            if let Err(e) = store.delete(&outlier.name) {
                warn!("WARN: cannot delete '{}': {e}", outlier.name);
            }
        }
    }
    Ok(outliers)
}
