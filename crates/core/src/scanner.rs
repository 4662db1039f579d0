//! Finding the source modules whose compiled artifact is missing or outdated

use crate::{error::Result, types::WorkItem};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;
use walkdir::WalkDir;

/// Source/artifact naming scheme for one tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceMapping {
    /// Extension of source files, without the dot
    pub source_extension: String,
    /// Extension of the produced artifact, without the dot
    pub target_extension: String,
    /// Folder under the output root that artifacts are written to
    pub target_prefix: PathBuf,
}

impl SourceMapping {
    /// `.rsc` modules compile to `$Name.tpl` files under `rascal/`
    pub fn rascal() -> Self {
        Self {
            source_extension: "rsc".to_string(),
            target_extension: "tpl".to_string(),
            target_prefix: PathBuf::from("rascal"),
        }
    }

    /// Artifact for the source at `relative` (relative to its source root)
    pub fn target_for(&self, bin: &Path, relative: &Path) -> Option<PathBuf> {
        if relative.extension()?.to_str()? != self.source_extension {
            return None;
        }
        let stem = relative.file_stem()?.to_string_lossy();
        let file_name = format!("${stem}.{}", self.target_extension);
        let folder = relative.parent().unwrap_or_else(|| Path::new(""));

        Some(bin.join(&self.target_prefix).join(folder).join(file_name))
    }
}

/// Produces the todo list for a goal
pub trait StalenessScanner {
    fn scan(&self, srcs: &[PathBuf], bin: &Path, ignores: &[PathBuf]) -> Result<Vec<WorkItem>>;
}

/// Walks source roots and compares modification times against artifacts
#[derive(Debug, Clone)]
pub struct StaleSourceScanner {
    mapping: SourceMapping,
}

impl StaleSourceScanner {
    pub fn new(mapping: SourceMapping) -> Self {
        Self { mapping }
    }

    fn is_stale(source: &Path, target: &Path) -> Result<bool> {
        let Ok(target_meta) = std::fs::metadata(target) else {
            return Ok(true);
        };
        let source_modified = std::fs::metadata(source)?.modified()?;
        let target_modified = target_meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);

        Ok(source_modified > target_modified)
    }
}

impl Default for StaleSourceScanner {
    fn default() -> Self {
        Self::new(SourceMapping::rascal())
    }
}

impl StalenessScanner for StaleSourceScanner {
    fn scan(&self, srcs: &[PathBuf], bin: &Path, ignores: &[PathBuf]) -> Result<Vec<WorkItem>> {
        let mut stale = BTreeSet::new();

        for src in srcs {
            if !src.exists() {
                debug!("Source root {} does not exist, nothing to scan", src.display());
                continue;
            }

            for entry in WalkDir::new(src).follow_links(true) {
                let entry = entry.map_err(std::io::Error::from)?;
                if !entry.file_type().is_file() {
                    continue;
                }

                let path = entry.path();
                if ignores.iter().any(|ignore| path.starts_with(ignore)) {
                    continue;
                }

                let Ok(relative) = path.strip_prefix(src) else {
                    continue;
                };
                let Some(target) = self.mapping.target_for(bin, relative) else {
                    continue;
                };

                if Self::is_stale(path, &target)? {
                    stale.insert(WorkItem::new(path));
                }
            }
        }

        Ok(stale.into_iter().collect())
    }
}
