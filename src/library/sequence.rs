//! Sequence integrity for clip families
//!
//! A family of N clips should carry ordinals 0..N-1 with no gaps. Gaps
//! usually mean a line was deleted after splitting; strays above the
//! count mean the family was renumbered by hand. The repair moves stray
//! high ordinals down into the open gaps, lowest stray into lowest gap,
//! so a repaired family is always densely numbered from zero.

use std::collections::BTreeSet;

use log::{info, warn};

use crate::error::Result;
use crate::library::{group_families, ClipStore, FileNameFamily};

/// A planned set of repairs for one family.
///
/// Renames are (from, to) ordinal pairs. `missing` lists the ordinals
/// that remain absent even after every rename is applied; those need a
/// re-record or a silence stub, not a rename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairPlan {
    pub base: String,
    pub renames: Vec<(usize, usize)>,
    pub missing: Vec<usize>,
}

impl RepairPlan {
    pub fn is_clean(&self) -> bool {
        self.renames.is_empty() && self.missing.is_empty()
    }
}

/// Ordinals absent from the contiguous range implied by the family.
///
/// The range checked is [0, max(ordinal)], so a family with strays above
/// its count reports the gaps those strays could fill.
pub fn missing_ordinals(family: &FileNameFamily) -> Vec<usize> {
    let Some(&max) = family.ordinals.last() else {
        return Vec::new();
    };
    let present: BTreeSet<usize> = family.ordinals.iter().copied().collect();
    (0..=max).filter(|o| !present.contains(o)).collect()
}

/// Plan the repair for one family without touching storage.
///
/// Every ordinal at or above the family's count is a stray; strays are
/// assigned ascending into the open slots below the count. Example: a
/// family {0, 1, 3, 4} has count 4, slot 2 open and stray 4, so 4 is
/// renamed to 2 and the family becomes {0, 1, 2, 3}.
pub fn repair_plan(family: &FileNameFamily) -> RepairPlan {
    let count = family.ordinals.len();
    let present: BTreeSet<usize> = family.ordinals.iter().copied().collect();

    let open_slots: Vec<usize> = (0..count).filter(|o| !present.contains(o)).collect();
    let strays: Vec<usize> = family
        .ordinals
        .iter()
        .copied()
        .filter(|&o| o >= count)
        .collect();

    // strays.len() == open_slots.len() always: each stray displaces
    // exactly one slot below the count.
    let renames: Vec<(usize, usize)> = strays.into_iter().zip(open_slots).collect();

    // After the renames the family is dense, so nothing is missing
    // unless there were no strays to move.
    let missing = if renames.is_empty() {
        missing_ordinals(family)
    } else {
        let mut repaired = family.clone();
        for ordinal in &mut repaired.ordinals {
            if let Some(&(_, to)) = renames.iter().find(|(from, _)| *from == *ordinal) {
                *ordinal = to;
            }
        }
        repaired.ordinals.sort_unstable();
        missing_ordinals(&repaired)
    };

    RepairPlan {
        base: family.base.clone(),
        renames,
        missing,
    }
}

/// Audit every family in a store and optionally apply the repairs.
///
/// Returns one plan per family that needed attention. With `repair`
/// set, renames are applied through the store; ordinals still missing
/// afterwards are reported for the caller to stub or re-record.
pub fn audit_sequences(
    store: &mut dyn ClipStore,
    separator: &str,
    repair: bool,
) -> Result<Vec<RepairPlan>> {
    let names = store.list()?;
    let families = group_families(&names, separator);

    let mut reports = Vec::new();
    for family in &families {
        let plan = repair_plan(family);
        if plan.is_clean() {
            continue;
        }

        if repair {
            for &(from, to) in &plan.renames {
                let from_name = format!("{}{}{}", family.base, separator, from);
                let to_name = format!("{}{}{}", family.base, separator, to);
                match store.rename(&from_name, &to_name) {
                    Ok(()) => info!("Renamed '{from_name}' to '{to_name}'"),
                    Err(e) => warn!("WARN: rename '{from_name}' failed: {e}"),
                }
            }
        }
        for &ordinal in &plan.missing {
            warn!(
                "WARN: '{}{}{}' is missing from the sequence",
                family.base, separator, ordinal
            );
        }
        reports.push(plan);
    }
    Ok(reports)
}
