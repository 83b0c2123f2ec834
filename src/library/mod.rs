//! Clip library management
//!
//! Voice lines live on disk as `{base}{separator}{ordinal}.{ext}` files,
//! where the base identifies the character or cue and the ordinal is the
//! line number within that family. This module owns the naming
//! convention, the grouping of files into families, and the filesystem
//! seam the integrity checks operate through.

pub mod outliers;
pub mod sequence;

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use log::warn;

use crate::error::{Result, VoxlineError};

/// Split a clip name into its base and ordinal.
///
/// The split happens on the final occurrence of the separator, so bases
/// may themselves contain the separator ("town_guard_3" has base
/// "town_guard"). A missing or non-numeric tail is a malformed name.
pub fn parse_clip_name(name: &str, separator: &str) -> Result<(String, usize)> {
    let (base, tail) = name
        .rsplit_once(separator)
        .ok_or_else(|| VoxlineError::MalformedName {
            name: name.to_string(),
        })?;
    let ordinal = tail.parse::<usize>().map_err(|_| VoxlineError::MalformedName {
        name: name.to_string(),
    })?;
    Ok((base.to_string(), ordinal))
}

/// All ordinals observed for one base name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNameFamily {
    pub base: String,
    /// Ascending, deduplicated
    pub ordinals: Vec<usize>,
}

/// Group clip names into families by base name.
///
/// Malformed names are logged and skipped rather than failing the whole
/// scan. Families come back sorted by base for stable reports.
pub fn group_families(names: &[String], separator: &str) -> Vec<FileNameFamily> {
    let mut map: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for name in names {
        match parse_clip_name(name, separator) {
            Ok((base, ordinal)) => map.entry(base).or_default().push(ordinal),
            Err(e) => warn!("WARN: skipping '{name}': {e}"),
        }
    }
    map.into_iter()
        .map(|(base, mut ordinals)| {
            ordinals.sort_unstable();
            ordinals.dedup();
            FileNameFamily { base, ordinals }
        })
        .collect()
}

/// Storage seam for the integrity checks.
///
/// Operates on clip names without extension; the implementation decides
/// how names map to actual storage. Tests use an in-memory fake.
pub trait ClipStore {
    /// All clip names in the store (no extension), in no defined order
    fn list(&self) -> Result<Vec<String>>;

    /// Rename a clip, failing if the target already exists
    fn rename(&mut self, from: &str, to: &str) -> Result<()>;

    /// Remove a clip
    fn delete(&mut self, name: &str) -> Result<()>;
}

/// Directory-backed clip store
pub struct FsClipStore {
    dir: PathBuf,
    extension: String,
}

impl FsClipStore {
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            extension: extension.into(),
        }
    }

    /// Full path for a clip name
    pub fn path_of(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{}", self.extension))
    }
}

impl ClipStore for FsClipStore {
    fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let matches_ext = path
                .extension()
                .map(|e| e.to_string_lossy().eq_ignore_ascii_case(&self.extension))
                .unwrap_or(false);
            if matches_ext {
                if let Some(stem) = path.file_stem() {
                    names.push(stem.to_string_lossy().into_owned());
                }
            }
        }
        Ok(names)
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        let target = self.path_of(to);
        if target.exists() {
            return Err(VoxlineError::InvalidParameter {
                param: "rename target".to_string(),
                value: to.to_string(),
                expected: "a name not already in the library".to_string(),
            });
        }
        fs::rename(self.path_of(from), target)?;
        Ok(())
    }

    fn delete(&mut self, name: &str) -> Result<()> {
        fs::remove_file(self.path_of(name))?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// In-memory store for exercising the integrity checks
    #[derive(Debug, Default)]
    pub struct MemClipStore {
        pub names: Vec<String>,
    }

    impl MemClipStore {
        pub fn with_names(names: &[&str]) -> Self {
            Self {
                names: names.iter().map(|s| s.to_string()).collect(),
            }
        }
    }

    impl ClipStore for MemClipStore {
        fn list(&self) -> Result<Vec<String>> {
            Ok(self.names.clone())
        }

        fn rename(&mut self, from: &str, to: &str) -> Result<()> {
            if self.names.iter().any(|n| n == to) {
                return Err(VoxlineError::InvalidParameter {
                    param: "rename target".to_string(),
                    value: to.to_string(),
                    expected: "a name not already in the library".to_string(),
                });
            }
            match self.names.iter_mut().find(|n| *n == from) {
                Some(slot) => {
                    *slot = to.to_string();
                    Ok(())
                }
                None => Err(VoxlineError::FileNotFound {
                    path: from.to_string(),
                    source: None,
                }),
            }
        }

        fn delete(&mut self, name: &str) -> Result<()> {
            let before = self.names.len();
            self.names.retain(|n| n != name);
            if self.names.len() == before {
                return Err(VoxlineError::FileNotFound {
                    path: name.to_string(),
                    source: None,
                });
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_clip_name() {
        assert_eq!(
            parse_clip_name("judge_3", "_").unwrap(),
            ("judge".to_string(), 3)
        );
        // Split on the final separator only
        assert_eq!(
            parse_clip_name("town_guard_12", "_").unwrap(),
            ("town_guard".to_string(), 12)
        );
    }

    #[test]
    fn test_parse_rejects_missing_ordinal() {
        assert!(parse_clip_name("judge", "_").is_err());
        assert!(parse_clip_name("judge_final", "_").is_err());
    }

    #[test]
    fn test_group_families() {
        let names: Vec<String> = ["judge_0", "judge_2", "guard_1", "notes.txt_bad", "judge_2"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let families = group_families(&names, "_");

        assert_eq!(families.len(), 2);
        assert_eq!(families[0].base, "guard");
        assert_eq!(families[0].ordinals, vec![1]);
        assert_eq!(families[1].base, "judge");
        assert_eq!(families[1].ordinals, vec![0, 2]);
    }

    #[test]
    fn test_mem_store_rename_collision() {
        use testing::MemClipStore;
        let mut store = MemClipStore::with_names(&["a_0", "a_1"]);
        assert!(store.rename("a_0", "a_1").is_err());
        assert!(store.rename("a_0", "a_2").is_ok());
    }
}
