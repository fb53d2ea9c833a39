//! Page renumbering: drop a blank page and close the gap it leaves.
//!
//! ```text
//! START ─▶ candidate exists? ── no ──▶ NothingToRemove
//!                │
//!               yes
//!                │
//!          size < threshold? ── no ──▶ Err(PageNotBlank), nothing touched
//!                │
//!               yes
//!                ▼
//!   stage: cover as-is, pages below the candidate as-is, candidate dropped,
//!          candidate+1.. shifted down by one until the first gap
//!                ▼
//!   swap the staged directory in (see [`crate::staging`])
//! ```
//!
//! The original directory is never edited in place: every file is copied
//! into a staging directory and the whole directory is swapped at the end,
//! so an interrupted run leaves either the old pages or the new ones.

use crate::config::RenumberConfig;
use crate::error::BookError;
use crate::output::{Rename, RenumberOutcome, RenumberReport};
use crate::pages::{scan_pages, PageId};
use crate::staging::{copy_dir_all, StagedDir};
use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, info, warn};

/// Remove the blank page named by `config` and shift later pages down.
///
/// # Returns
/// * `Ok(RenumberOutcome::NothingToRemove)` when the candidate is absent.
/// * `Ok(RenumberOutcome::Renumbered(_))` after a successful swap.
///
/// # Errors
/// * [`BookError::DirectoryNotFound`] when the page directory is missing.
/// * [`BookError::PageNotBlank`] when the candidate is at or above the
///   threshold; the directory is left byte-for-byte unchanged.
/// * [`BookError::StagingFailed`] / [`BookError::SwapFailed`] on I/O failure;
///   the original directory stays in place.
pub fn fix_page_numbering(config: &RenumberConfig) -> Result<RenumberOutcome, BookError> {
    let dir = &config.pages_dir;
    let current = scan_pages(dir)?;
    info!("Current pages in {}: {}", dir.display(), current.len());
    for page in current.iter().take(5) {
        debug!("  {} ({} bytes)", page.path.display(), page.size);
    }

    let candidate = dir.join(PageId::Numbered(config.blank_page).file_name());
    let size = match fs::metadata(&candidate) {
        Ok(meta) if meta.is_file() => meta.len(),
        Ok(_) => return Ok(nothing_to_remove(candidate)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(nothing_to_remove(candidate)),
        Err(e) => return Err(BookError::io(candidate, e)),
    };
    info!("Found {}: {} bytes", candidate.display(), size);

    if size >= config.blank_threshold_bytes {
        warn!(
            "{} is not blank ({} ≥ {} bytes), keeping it",
            candidate.display(),
            size,
            config.blank_threshold_bytes
        );
        return Err(BookError::PageNotBlank {
            path: candidate,
            size,
            threshold: config.blank_threshold_bytes,
        });
    }

    let staged = StagedDir::new(dir)?;
    let staged_run = stage_renumbered(dir, staged.path(), config).map_err(|source| {
        BookError::StagingFailed {
            path: dir.clone(),
            source,
        }
    })?;
    staged.commit()?;
    info!(
        "Removed blank {} and renumbered {} pages",
        candidate.display(),
        staged_run.renames.len()
    );

    let total_pages = scan_pages(dir)?.len();
    Ok(RenumberOutcome::Renumbered(RenumberReport {
        removed: candidate,
        removed_size: size,
        cover_kept: staged_run.cover_kept,
        renames: staged_run.renames,
        carried_over: staged_run.carried_over,
        total_pages,
    }))
}

fn nothing_to_remove(candidate: std::path::PathBuf) -> RenumberOutcome {
    info!("{} not found, nothing to remove", candidate.display());
    RenumberOutcome::NothingToRemove { candidate }
}

struct StagedRun {
    cover_kept: bool,
    renames: Vec<Rename>,
    carried_over: Vec<String>,
}

/// Copy `dir` into `staging` with the candidate dropped and the run of pages
/// after it shifted down by one.
fn stage_renumbered(dir: &Path, staging: &Path, config: &RenumberConfig) -> io::Result<StagedRun> {
    let mut consumed: HashSet<OsString> = HashSet::new();
    let mut copy_as = |from: PageId, to: PageId| -> io::Result<bool> {
        let src = dir.join(from.file_name());
        if !src.is_file() {
            return Ok(false);
        }
        fs::copy(&src, staging.join(to.file_name()))?;
        consumed.insert(from.file_name().into());
        Ok(true)
    };

    let cover_kept = copy_as(PageId::Cover, PageId::Cover)?;
    if cover_kept {
        debug!("Kept cover");
    }
    for n in 1..config.blank_page {
        copy_as(PageId::Numbered(n), PageId::Numbered(n))?;
    }

    let mut renames = Vec::new();
    for old in (config.blank_page + 1)..=config.max_page {
        let (from, to) = (PageId::Numbered(old), PageId::Numbered(old - 1));
        if !copy_as(from, to)? {
            break;
        }
        debug!("Renamed {} -> {}", from.file_name(), to.file_name());
        renames.push(Rename {
            from: from.file_name(),
            to: to.file_name(),
        });
    }

    consumed.insert(PageId::Numbered(config.blank_page).file_name().into());

    let mut carried_over = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        if consumed.contains(&name) {
            continue;
        }
        let to = staging.join(&name);
        if entry.file_type()?.is_dir() {
            copy_dir_all(&entry.path(), &to)?;
        } else {
            fs::copy(entry.path(), &to)?;
        }
        let name = name.to_string_lossy().into_owned();
        warn!("Carried over {} unchanged", name);
        carried_over.push(name);
    }
    carried_over.sort();

    Ok(StagedRun {
        cover_kept,
        renames,
        carried_over,
    })
}
