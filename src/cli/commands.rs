//! CLI command implementations
//!
//! Each command loads the configuration, runs one pipeline operation and
//! prints a short human-readable report. Structured detail goes to the
//! logger; the printed lines are the operator-facing summary.

use std::path::Path;

use log::info;

use crate::config::Config;
use crate::dsp::EffectKind;
use crate::error::Result;
use crate::library::outliers::scan_outliers;
use crate::library::sequence::audit_sequences;
use crate::library::FsClipStore;
use crate::loudness::match_loudness;
use crate::pipeline::{
    compile_review_track, process_clips, split_tracks, stub_missing_clips, CancelToken,
};

/// Split raw tracks into voice-line clips.
pub fn split(input: &Path, output: &Path, config_path: &Path) -> Result<()> {
    info!("Splitting tracks from {}", input.display());
    let config = Config::load_or_default(config_path);

    std::fs::create_dir_all(output)?;
    let report = split_tracks(input, output, &config, &CancelToken::new())?;

    println!(
        "Split {} track(s), {} skipped, {} warning(s)",
        report.processed, report.skipped, report.warnings
    );
    Ok(())
}

/// Apply an effect chain to every clip in a directory.
pub fn process(dir: &Path, effects: &str, scale: f32, config_path: &Path) -> Result<()> {
    info!("Processing clips in {} with chain '{effects}'", dir.display());
    let config = Config::load_or_default(config_path);

    let chain = EffectKind::parse_list(effects);
    if chain.is_empty() {
        println!("No known effects in '{effects}', nothing to do");
        return Ok(());
    }

    let report = process_clips(dir, &chain, scale, &config, &CancelToken::new())?;
    println!(
        "Processed {} clip(s), {} skipped, {} stage warning(s)",
        report.processed, report.skipped, report.warnings
    );
    Ok(())
}

/// Match clip loudness against reference lines.
pub fn match_volume(dir: &Path, reference: &Path, config_path: &Path) -> Result<()> {
    info!(
        "Matching loudness in {} against {}",
        dir.display(),
        reference.display()
    );
    let config = Config::load_or_default(config_path);

    let report = match_loudness(dir, reference, &config)?;
    println!(
        "Adjusted {} clip(s), {} skipped",
        report.adjusted, report.skipped
    );
    Ok(())
}

/// Audit and optionally repair clip numbering.
pub fn check_names(dir: &Path, repair: bool, stub: bool, config_path: &Path) -> Result<()> {
    info!("Checking clip sequences in {}", dir.display());
    let config = Config::load_or_default(config_path);

    let mut store = FsClipStore::new(dir, config.library.extension.clone());
    let plans = audit_sequences(&mut store, &config.library.name_separator, repair)?;

    if plans.is_empty() {
        println!("All clip sequences are dense");
        return Ok(());
    }

    for plan in &plans {
        for &(from, to) in &plan.renames {
            let verb = if repair { "renamed" } else { "would rename" };
            println!("{}: {verb} {from} -> {to}", plan.base);
        }
        for &ordinal in &plan.missing {
            println!("{}: line {ordinal} is missing", plan.base);
        }
    }

    if stub {
        let written = stub_missing_clips(dir, &plans, &config)?;
        println!("Wrote {written} silence stub(s)");
    }
    Ok(())
}

/// Flag amplitude outliers, optionally deleting them.
pub fn check_files(dir: &Path, purge: bool, config_path: &Path) -> Result<()> {
    info!("Scanning {} for amplitude outliers", dir.display());
    let config = Config::load_or_default(config_path);

    let outliers = scan_outliers(dir, &config, purge)?;
    if outliers.is_empty() {
        println!("No amplitude outliers found");
        return Ok(());
    }

    for outlier in &outliers {
        let verb = if purge { "deleted" } else { "flagged" };
        println!(
            "{verb} '{}': RMS {:.6} ({:.1}x library mean)",
            outlier.name, outlier.rms, outlier.ratio
        );
    }
    Ok(())
}

/// Compile clips into one review track.
pub fn compile(dir: &Path, output: &Path, config_path: &Path) -> Result<()> {
    info!("Compiling review track from {}", dir.display());
    let config = Config::load_or_default(config_path);

    let compiled = compile_review_track(dir, output, &config)?;
    println!("Compiled {compiled} clip(s) into {}", output.display());
    Ok(())
}
