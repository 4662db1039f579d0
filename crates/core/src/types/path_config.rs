use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Search and output paths handed to the checker, compiler or tutor.
///
/// One is built per goal invocation; the parallel path derives a private
/// copy per worker that only differs in its output roots and libraries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PathConfig {
    pub srcs: Vec<PathBuf>,
    #[serde(default)]
    pub ignores: Vec<PathBuf>,
    #[serde(default)]
    pub libs: Vec<PathBuf>,
    pub bin: PathBuf,
    pub generated_sources: PathBuf,
    /// Flags forwarded verbatim to the tool as `-<key> <value>`
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

impl PathConfig {
    pub fn new(srcs: Vec<PathBuf>, bin: impl Into<PathBuf>, generated_sources: impl Into<PathBuf>) -> Self {
        Self {
            srcs,
            ignores: Vec::new(),
            libs: Vec::new(),
            bin: bin.into(),
            generated_sources: generated_sources.into(),
            extra: BTreeMap::new(),
        }
    }

    pub fn with_ignores(mut self, ignores: Vec<PathBuf>) -> Self {
        self.ignores = ignores;
        self
    }

    pub fn with_libs(mut self, libs: Vec<PathBuf>) -> Self {
        self.libs = libs;
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Adds a library root unless it is already on the path
    pub fn add_lib(&mut self, lib: impl Into<PathBuf>) {
        let lib = lib.into();
        if !self.libs.contains(&lib) {
            self.libs.push(lib);
        }
    }

    /// Copy of this configuration writing into private output roots
    pub fn with_private_output(&self, bin: &Path, generated_sources: &Path) -> Self {
        Self {
            bin: bin.to_path_buf(),
            generated_sources: generated_sources.to_path_buf(),
            ..self.clone()
        }
    }

    /// The source root that contains `path`, if any
    pub fn source_root_of(&self, path: &Path) -> Option<&Path> {
        self.srcs
            .iter()
            .map(PathBuf::as_path)
            .find(|src| path.starts_with(src))
    }

    pub fn is_ignored(&self, path: &Path) -> bool {
        self.ignores.iter().any(|ignore| path.starts_with(ignore))
    }
}
