use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Component, Path, PathBuf};

/// One compilable source module, identified by its location on disk.
///
/// Two items are equal when their canonical paths are; the path as it was
/// spelled is kept for command lines and messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "PathBuf", into = "PathBuf")]
pub struct WorkItem {
    path: PathBuf,
    canonical: PathBuf,
}

impl WorkItem {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let canonical = canonical_path(&path);
        Self { path, canonical }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The resolved location used for comparisons
    pub fn canonical(&self) -> &Path {
        &self.canonical
    }

    /// File name without directories, used in progress messages
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Resolves symlinks when the file exists, otherwise drops `.` and `..`
/// components lexically
fn canonical_path(path: &Path) -> PathBuf {
    if let Ok(resolved) = std::fs::canonicalize(path) {
        return resolved;
    }

    let mut normal = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normal.components().next_back() {
                Some(Component::Normal(_)) => {
                    normal.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => normal.push(component),
            },
            other => normal.push(other),
        }
    }
    normal
}

impl PartialEq for WorkItem {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl Eq for WorkItem {}

impl PartialOrd for WorkItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for WorkItem {
    fn cmp(&self, other: &Self) -> Ordering {
        self.canonical.cmp(&other.canonical)
    }
}

impl Hash for WorkItem {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical.hash(state);
    }
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

impl From<PathBuf> for WorkItem {
    fn from(path: PathBuf) -> Self {
        Self::new(path)
    }
}

impl From<&Path> for WorkItem {
    fn from(path: &Path) -> Self {
        Self::new(path)
    }
}

impl From<WorkItem> for PathBuf {
    fn from(item: WorkItem) -> Self {
        item.path
    }
}

impl AsRef<Path> for WorkItem {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}

/// The modules assigned to exactly one worker.
///
/// Items keep the order they were inserted in and duplicates are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkSet {
    items: Vec<WorkItem>,
}

impl WorkSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: WorkItem) {
        if !self.items.contains(&item) {
            self.items.push(item);
        }
    }

    pub fn items(&self) -> &[WorkItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, item: &WorkItem) -> bool {
        self.items.contains(item)
    }

    pub fn into_items(self) -> Vec<WorkItem> {
        self.items
    }
}

impl FromIterator<WorkItem> for WorkSet {
    fn from_iter<T: IntoIterator<Item = WorkItem>>(iter: T) -> Self {
        let mut set = WorkSet::new();
        for item in iter {
            set.push(item);
        }
        set
    }
}

impl<'a> IntoIterator for &'a WorkSet {
    type Item = &'a WorkItem;
    type IntoIter = std::slice::Iter<'a, WorkItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
