//! Completing the library path with resolved dependency artifacts

use crate::error::Result;
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;

/// Relative location of the manifest that marks a Rascal library
pub const MANIFEST_PATH: &str = "META-INF/RASCAL.MF";

/// Supplies already-downloaded library locations for the library path
pub trait DependencyResolver {
    /// Libraries to append after `existing`, which must not be repeated
    fn resolve(&self, existing: &[PathBuf]) -> Result<Vec<PathBuf>>;
}

/// Resolver that never adds anything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDependencies;

impl DependencyResolver for NoDependencies {
    fn resolve(&self, _existing: &[PathBuf]) -> Result<Vec<PathBuf>> {
        Ok(Vec::new())
    }
}

/// Filters a list of resolved artifacts down to Rascal libraries.
///
/// Unpacked artifacts qualify when they carry a `META-INF/RASCAL.MF`; a
/// project that is already on the library path is not added twice. Archives
/// cannot be inspected here and are passed through.
#[derive(Debug, Clone, Default)]
pub struct ManifestLibraryResolver {
    artifacts: Vec<PathBuf>,
}

impl ManifestLibraryResolver {
    pub fn new(artifacts: Vec<PathBuf>) -> Self {
        Self { artifacts }
    }

    /// The `Project-Name` declared by the manifest under `root`
    pub fn project_name(root: &Path) -> Option<String> {
        static PROJECT_NAME: OnceLock<Option<Regex>> = OnceLock::new();
        let pattern = PROJECT_NAME
            .get_or_init(|| Regex::new(r"(?m)^Project-Name:\s*(\S+)\s*$").ok())
            .as_ref()?;

        let manifest = std::fs::read_to_string(root.join(MANIFEST_PATH)).ok()?;
        pattern
            .captures(&manifest)
            .map(|captures| captures[1].to_string())
    }
}

impl DependencyResolver for ManifestLibraryResolver {
    fn resolve(&self, existing: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let mut projects: HashSet<String> = existing
            .iter()
            .filter_map(|lib| Self::project_name(lib))
            .collect();
        let mut seen: HashSet<&Path> = existing.iter().map(PathBuf::as_path).collect();
        let mut libs = Vec::new();

        for artifact in &self.artifacts {
            if !seen.insert(artifact.as_path()) {
                continue;
            }

            if artifact.is_dir() {
                if !artifact.join(MANIFEST_PATH).exists() {
                    debug!("{} is not a Rascal library, skipping", artifact.display());
                    continue;
                }
                if let Some(name) = Self::project_name(artifact) {
                    if !projects.insert(name.clone()) {
                        debug!("Project {} is already on the library path", name);
                        continue;
                    }
                }
            }

            libs.push(artifact.clone());
        }

        Ok(libs)
    }
}
