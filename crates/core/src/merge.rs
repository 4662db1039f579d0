//! Merging private worker output roots back into the shared output root

use crate::error::{Error, Result};
use std::fs;
use std::io;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// What to do when a worker output root is missing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    /// A missing root is an error
    Required,
    /// A missing root is skipped, e.g. generated sources that were never written
    BestEffort,
}

/// Moves the contents of every root in `sources` into `destination`.
///
/// A file that already exists at the destination is left alone: every module
/// is checked by exactly one worker, so two workers never legitimately write
/// the same artifact. Conflicting contents are not detected. Source roots are
/// removed once they have been emptied.
pub fn merge_output_folders<P: AsRef<Path>>(destination: &Path, sources: &[P], mode: MergeMode) -> Result<()> {
    for source in sources {
        let source = source.as_ref();
        if !source.exists() {
            match mode {
                MergeMode::Required => return Err(Error::MissingOutputRoot(source.to_path_buf())),
                MergeMode::BestEffort => {
                    debug!("Skipping missing output root {}", source.display());
                    continue;
                }
            }
        }

        debug!("Copying files from {} to {}", source.display(), destination.display());
        merge_dir(source, destination)?;
    }

    Ok(())
}

/// Walks `source` contents-first, so every directory is removed right after
/// the files below it have been moved out
fn merge_dir(source: &Path, destination: &Path) -> Result<()> {
    fs::create_dir_all(destination)?;

    for entry in WalkDir::new(source).contents_first(true) {
        let entry = entry.map_err(io::Error::from)?;
        let from = entry.path();
        let Ok(relative) = from.strip_prefix(source) else {
            continue;
        };
        let to = destination.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&to)?;
            fs::remove_dir(from)?;
            continue;
        }

        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent)?;
        }
        if to.exists() {
            debug!("{} already exists, keeping it", to.display());
            fs::remove_file(from)?;
        } else {
            move_file(from, &to)?;
        }
    }

    Ok(())
}

/// Rename, falling back to copy-and-delete across file systems
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(_) => {
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_merges_nested_trees_and_removes_sources() {
        let temp = TempDir::new().unwrap();
        let dst = temp.path().join("bin");
        let w1 = temp.path().join("w1");
        let w2 = temp.path().join("w2");
        write(&w1.join("rascal/lang/$A.tpl"), "A");
        write(&w2.join("rascal/lang/$B.tpl"), "B");
        write(&w2.join("rascal/$C.tpl"), "C");
        write(&dst.join("rascal/$Old.tpl"), "old");

        merge_output_folders(&dst, &[w1.clone(), w2.clone()], MergeMode::Required).unwrap();

        assert_eq!(fs::read_to_string(dst.join("rascal/lang/$A.tpl")).unwrap(), "A");
        assert_eq!(fs::read_to_string(dst.join("rascal/lang/$B.tpl")).unwrap(), "B");
        assert_eq!(fs::read_to_string(dst.join("rascal/$C.tpl")).unwrap(), "C");
        assert_eq!(fs::read_to_string(dst.join("rascal/$Old.tpl")).unwrap(), "old");
        assert!(!w1.exists());
        assert!(!w2.exists());
    }

    #[test]
    fn test_existing_files_win_and_conflicts_go_unnoticed() {
        let temp = TempDir::new().unwrap();
        let dst = temp.path().join("bin");
        let w1 = temp.path().join("w1");
        let w2 = temp.path().join("w2");
        write(&w1.join("rascal/$Shared.tpl"), "from worker 1");
        write(&w2.join("rascal/$Shared.tpl"), "from worker 2");

        merge_output_folders(&dst, &[w1, w2], MergeMode::Required).unwrap();

        assert_eq!(
            fs::read_to_string(dst.join("rascal/$Shared.tpl")).unwrap(),
            "from worker 1"
        );
    }

    #[test]
    fn test_missing_roots() {
        let temp = TempDir::new().unwrap();
        let dst = temp.path().join("bin");
        let missing = vec![temp.path().join("never-written")];

        merge_output_folders(&dst, &missing, MergeMode::BestEffort).unwrap();
        assert!(matches!(
            merge_output_folders(&dst, &missing, MergeMode::Required),
            Err(Error::MissingOutputRoot(_))
        ));
    }

    #[test]
    fn test_empty_root_creates_destination() {
        let temp = TempDir::new().unwrap();
        let dst = temp.path().join("gen");
        let empty = temp.path().join("empty");
        fs::create_dir_all(&empty).unwrap();

        merge_output_folders(&dst, &[empty.clone()], MergeMode::Required).unwrap();
        assert!(dst.is_dir());
        assert!(!empty.exists());
    }

    #[test]
    fn test_empty_subdirectories_are_carried_over() {
        let temp = TempDir::new().unwrap();
        let dst = temp.path().join("bin");
        let w1 = temp.path().join("w1");
        fs::create_dir_all(w1.join("rascal/lang/empty")).unwrap();
        write(&w1.join("rascal/lang/deep/$D.tpl"), "D");

        merge_output_folders(&dst, &[w1.clone()], MergeMode::Required).unwrap();

        assert!(dst.join("rascal/lang/empty").is_dir());
        assert_eq!(fs::read_to_string(dst.join("rascal/lang/deep/$D.tpl")).unwrap(), "D");
        assert!(!w1.exists());
    }
}
