//! Stage-then-swap for whole directories.
//!
//! [`StagedDir`] is a scratch directory created next to a target directory.
//! Callers fill it, then [`StagedDir::commit`] replaces the target with it.
//!
//! On Linux the two directories trade places in one
//! `renameat2(RENAME_EXCHANGE)` call, and the old pages are dropped with the
//! scratch directory:
//!
//! ```text
//! individual_pages/                       target, untouched while staging
//! .individual_pages-staging-XXXX/         filled by the caller
//!
//! commit:
//!   exchange individual_pages <-> .individual_pages-staging-XXXX
//!   drop .individual_pages-staging-XXXX   (now the old pages)
//! ```
//!
//! Elsewhere, or when the file system refuses the exchange, commit falls back
//! to two renames:
//!
//! ```text
//!   individual_pages  → .individual_pages-retired-XXXX/previous
//!   .individual_pages-staging-XXXX → individual_pages
//!   drop .individual_pages-retired-XXXX
//! ```
//!
//! Between those renames the target does not exist. A process killed there
//! leaves the original pages in `.individual_pages-retired-XXXX/previous`
//! beside the target; move that directory back to recover. If the second
//! rename fails the original is moved back automatically.
//!
//! Both scratch directories are [`tempfile::TempDir`]s in the target's parent,
//! so the renames stay on one file system and every early return removes
//! them.

use crate::error::BookError;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, error};

/// A scratch directory that can atomically take the place of `target`.
#[derive(Debug)]
pub struct StagedDir {
    target: PathBuf,
    staging: TempDir,
}

impl StagedDir {
    /// Create an empty staging directory beside `target`.
    pub fn new(target: &Path) -> Result<Self, BookError> {
        let staging = scratch_dir(target, "staging").map_err(|source| BookError::StagingFailed {
            path: target.to_path_buf(),
            source,
        })?;
        debug!(
            "Staging {} in {}",
            target.display(),
            staging.path().display()
        );
        Ok(Self {
            target: target.to_path_buf(),
            staging,
        })
    }

    /// Where staged files go.
    pub fn path(&self) -> &Path {
        self.staging.path()
    }

    /// Replace the target directory with the staged one.
    ///
    /// On error the target is left as it was and the staging directory is
    /// removed.
    pub fn commit(self) -> Result<(), BookError> {
        let swap_err = |source: std::io::Error| BookError::SwapFailed {
            path: self.target.clone(),
            source,
        };

        #[cfg(target_os = "linux")]
        match exchange(self.staging.path(), &self.target) {
            Ok(()) => {
                // The staging path now holds the old pages.
                drop(self.staging);
                debug!("Exchanged staged directory into {}", self.target.display());
                return Ok(());
            }
            Err(e) if e == rustix::io::Errno::INVAL || e == rustix::io::Errno::NOSYS => {
                debug!("Atomic exchange unsupported here ({}), using two renames", e);
            }
            Err(e) => return Err(swap_err(e.into())),
        }

        let retired = scratch_dir(&self.target, "retired").map_err(swap_err)?;
        let previous = retired.path().join("previous");

        fs::rename(&self.target, &previous).map_err(swap_err)?;

        if let Err(e) = fs::rename(self.staging.path(), &self.target) {
            if let Err(restore) = fs::rename(&previous, &self.target) {
                let kept = retired.keep();
                error!(
                    "Could not restore {} ({}); the original pages are in {}",
                    self.target.display(),
                    restore,
                    kept.join("previous").display()
                );
            }
            return Err(swap_err(e));
        }

        // The staged directory now lives at `target`; its TempDir guard must
        // not delete it.
        let _ = self.staging.keep();
        drop(retired);
        debug!("Swapped staged directory into {}", self.target.display());
        Ok(())
    }
}

/// Swap two paths in a single `renameat2(RENAME_EXCHANGE)`.
#[cfg(target_os = "linux")]
fn exchange(a: &Path, b: &Path) -> rustix::io::Result<()> {
    use rustix::fs::{renameat_with, RenameFlags, CWD};
    renameat_with(CWD, a, CWD, b, RenameFlags::EXCHANGE)
}

fn scratch_dir(target: &Path, role: &str) -> std::io::Result<TempDir> {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dir".to_string());
    tempfile::Builder::new()
        .prefix(&format!(".{name}-{role}-"))
        .tempdir_in(parent_dir(target))
}

/// Parent of `path`, with `.` for bare relative names.
pub(crate) fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

/// Recursively copy `src` into `dst`, creating `dst`.
pub(crate) fn copy_dir_all(src: &Path, dst: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let to = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_all(&entry.path(), &to)?;
        } else {
            fs::copy(entry.path(), to)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leftovers(parent: &Path) -> Vec<String> {
        fs::read_dir(parent)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n.starts_with('.'))
            .collect()
    }

    #[test]
    fn commit_replaces_target() {
        let root = tempfile::tempdir().unwrap();
        let target = root.path().join("pages");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("old.txt"), b"old").unwrap();

        let staged = StagedDir::new(&target).unwrap();
        fs::write(staged.path().join("new.txt"), b"new").unwrap();
        staged.commit().unwrap();

        assert!(!target.join("old.txt").exists());
        assert_eq!(fs::read(target.join("new.txt")).unwrap(), b"new");
        assert!(leftovers(root.path()).is_empty(), "scratch dirs left behind");
    }

    #[test]
    fn dropping_without_commit_leaves_target_alone() {
        let root = tempfile::tempdir().unwrap();
        let target = root.path().join("pages");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("keep.txt"), b"keep").unwrap();

        {
            let staged = StagedDir::new(&target).unwrap();
            fs::write(staged.path().join("half-done.txt"), b"x").unwrap();
        }

        assert_eq!(fs::read(target.join("keep.txt")).unwrap(), b"keep");
        assert!(leftovers(root.path()).is_empty());
    }

    #[test]
    fn commit_without_target_fails_cleanly() {
        let root = tempfile::tempdir().unwrap();
        let target = root.path().join("missing");
        let staged = StagedDir::new(&target).unwrap();
        let err = staged.commit().unwrap_err();
        assert!(matches!(err, BookError::SwapFailed { .. }));
        assert!(!target.exists());
        assert!(leftovers(root.path()).is_empty());
    }

    #[test]
    fn commit_leaves_no_old_pages_behind() {
        let root = tempfile::tempdir().unwrap();
        let target = root.path().join("pages");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("page_001.png"), b"blank").unwrap();

        let staged = StagedDir::new(&target).unwrap();
        fs::write(staged.path().join("page_001.png"), b"printed").unwrap();
        staged.commit().unwrap();

        assert_eq!(fs::read(target.join("page_001.png")).unwrap(), b"printed");
        let entries: Vec<_> = fs::read_dir(root.path()).unwrap().collect();
        assert_eq!(entries.len(), 1, "only the target should remain");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn exchange_trades_directory_contents() {
        let root = tempfile::tempdir().unwrap();
        let a = root.path().join("a");
        let b = root.path().join("b");
        fs::create_dir(&a).unwrap();
        fs::create_dir(&b).unwrap();
        fs::write(a.join("from_a"), b"a").unwrap();
        fs::write(b.join("from_b"), b"b").unwrap();

        match exchange(&a, &b) {
            Ok(()) => {
                assert!(a.join("from_b").exists());
                assert!(b.join("from_a").exists());
            }
            // tmpfs on very old kernels and some overlay setups refuse it.
            Err(e) => assert!(e == rustix::io::Errno::INVAL || e == rustix::io::Errno::NOSYS),
        }
    }

    #[test]
    fn swap_failure_names_the_recovery_directory() {
        let err = BookError::SwapFailed {
            path: "individual_pages".into(),
            source: std::io::Error::other("interrupted"),
        };
        assert!(err.to_string().contains("-retired-*/previous"), "got: {err}");
    }

    #[test]
    fn parent_of_bare_name_is_cwd() {
        assert_eq!(parent_dir(Path::new("individual_pages")), Path::new("."));
        assert_eq!(parent_dir(Path::new("a/b")), Path::new("a"));
    }

    #[test]
    fn copy_dir_all_copies_nested_files() {
        let root = tempfile::tempdir().unwrap();
        let src = root.path().join("src");
        fs::create_dir_all(src.join("nested")).unwrap();
        fs::write(src.join("a.png"), b"a").unwrap();
        fs::write(src.join("nested/b.png"), b"b").unwrap();

        let dst = root.path().join("dst");
        copy_dir_all(&src, &dst).unwrap();
        assert_eq!(fs::read(dst.join("a.png")).unwrap(), b"a");
        assert_eq!(fs::read(dst.join("nested/b.png")).unwrap(), b"b");
    }
}
