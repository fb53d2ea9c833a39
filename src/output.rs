//! Reports returned by each stage.
//!
//! Every report is `Serialize` so the CLI can print it as JSON with `--json`.
//! Per-item failures are kept inside the report (see [`ItemError`]) so a
//! caller sees exactly which spread or page went wrong without the batch
//! having been aborted.

use crate::error::ItemError;
use crate::pages::PageId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ── Split ────────────────────────────────────────────────────────────────

/// One page image written by the splitter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrittenPage {
    pub id: PageId,
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// Outcome for a single spread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpreadResult {
    /// 1-based spread number.
    pub spread: u32,
    pub source: PathBuf,
    /// Pages written from this spread: `[cover, page 1]` for the first
    /// spread, `[left, right]` for the others. Empty on error.
    pub pages: Vec<WrittenPage>,
    pub error: Option<ItemError>,
}

/// Result of [`crate::split_spreads`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitReport {
    pub spreads_dir: PathBuf,
    pub output_dir: PathBuf,
    pub spreads: Vec<SpreadResult>,
}

impl SplitReport {
    /// Spreads that were looked for.
    pub fn attempted(&self) -> usize {
        self.spreads.len()
    }

    /// Spreads split into two pages.
    pub fn split(&self) -> usize {
        self.spreads.iter().filter(|s| s.error.is_none()).count()
    }

    /// Spreads whose input file was absent.
    pub fn missing(&self) -> usize {
        self.spreads
            .iter()
            .filter(|s| s.error.as_ref().is_some_and(ItemError::is_missing))
            .count()
    }

    /// Spreads that existed but could not be split.
    pub fn failed(&self) -> usize {
        self.spreads
            .iter()
            .filter(|s| s.error.as_ref().is_some_and(|e| !e.is_missing()))
            .count()
    }

    /// Page files written in total.
    pub fn pages_written(&self) -> usize {
        self.spreads.iter().map(|s| s.pages.len()).sum()
    }
}

// ── Renumber ─────────────────────────────────────────────────────────────

/// A page moved to a new number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rename {
    pub from: String,
    pub to: String,
}

/// Details of a successful renumbering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenumberReport {
    /// The blank page that was dropped.
    pub removed: PathBuf,
    pub removed_size: u64,
    /// Whether a cover was present and carried over.
    pub cover_kept: bool,
    /// Pages shifted down by one, in order.
    pub renames: Vec<Rename>,
    /// Entries that were not part of the renumbered run (unrelated files,
    /// pages past the first gap) and were carried over under their own name.
    pub carried_over: Vec<String>,
    /// Page files (cover included) in the directory afterwards.
    pub total_pages: usize,
}

/// Result of [`crate::fix_page_numbering`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RenumberOutcome {
    /// The blank-page candidate does not exist; nothing needed fixing.
    NothingToRemove { candidate: PathBuf },
    /// The candidate was removed and later pages shifted down.
    Renumbered(RenumberReport),
}

impl RenumberOutcome {
    pub fn is_noop(&self) -> bool {
        matches!(self, RenumberOutcome::NothingToRemove { .. })
    }
}

// ── Compress ─────────────────────────────────────────────────────────────

/// Outcome for a single compressed page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressedFile {
    pub source: PathBuf,
    pub output: PathBuf,
    pub original_size: u64,
    pub original_dims: Option<(u32, u32)>,
    /// Present on success.
    pub compressed_size: Option<u64>,
    pub compressed_dims: Option<(u32, u32)>,
    pub error: Option<ItemError>,
}

/// Result of [`crate::compress_pages`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressReport {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub files: Vec<CompressedFile>,
    /// Bytes of every input, failed ones included.
    pub original_bytes: u64,
    /// Bytes of every JPEG written.
    pub compressed_bytes: u64,
    /// Set when the originals were backed up and replaced.
    pub backup_dir: Option<PathBuf>,
    /// Number of pages swapped into the input directory.
    pub replaced: usize,
}

impl CompressReport {
    pub fn successes(&self) -> usize {
        self.files.iter().filter(|f| f.error.is_none()).count()
    }

    pub fn failures(&self) -> usize {
        self.files.iter().filter(|f| f.error.is_some()).count()
    }

    /// Overall size reduction in percent, `None` when nothing was read.
    pub fn reduction_percent(&self) -> Option<f64> {
        if self.original_bytes == 0 {
            return None;
        }
        Some((1.0 - self.compressed_bytes as f64 / self.original_bytes as f64) * 100.0)
    }
}

// ── Extract ──────────────────────────────────────────────────────────────

/// One embedded image saved by the extractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedImage {
    /// 1-based PDF page.
    pub page: usize,
    /// 1-based image number on that page.
    pub index: usize,
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// Result of [`crate::extract_images`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractReport {
    pub pdf_path: PathBuf,
    pub output_dir: PathBuf,
    pub total_pages: usize,
    pub images: Vec<ExtractedImage>,
    /// Images under the minimum dimension.
    pub skipped_small: usize,
    pub failures: Vec<ItemError>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spread(n: u32, error: Option<ItemError>) -> SpreadResult {
        let pages = if error.is_none() {
            vec![
                WrittenPage {
                    id: PageId::Numbered(2 * n),
                    path: PathBuf::new(),
                    width: 1,
                    height: 1,
                },
                WrittenPage {
                    id: PageId::Numbered(2 * n + 1),
                    path: PathBuf::new(),
                    width: 1,
                    height: 1,
                },
            ]
        } else {
            vec![]
        };
        SpreadResult {
            spread: n,
            source: PathBuf::new(),
            pages,
            error,
        }
    }

    #[test]
    fn split_report_counts() {
        let report = SplitReport {
            spreads_dir: "book_images".into(),
            output_dir: "individual_pages".into(),
            spreads: vec![
                spread(1, None),
                spread(
                    2,
                    Some(ItemError::Missing {
                        path: "a.png".into(),
                    }),
                ),
                spread(
                    3,
                    Some(ItemError::DecodeFailed {
                        path: "b.png".into(),
                        detail: "bad".into(),
                    }),
                ),
                spread(4, None),
            ],
        };
        assert_eq!(report.attempted(), 4);
        assert_eq!(report.split(), 2);
        assert_eq!(report.missing(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.pages_written(), 4);
    }

    #[test]
    fn reduction_percent() {
        let mut report = CompressReport {
            input_dir: "in".into(),
            output_dir: "out".into(),
            files: vec![],
            original_bytes: 0,
            compressed_bytes: 0,
            backup_dir: None,
            replaced: 0,
        };
        assert_eq!(report.reduction_percent(), None);
        report.original_bytes = 1000;
        report.compressed_bytes = 250;
        let pct = report.reduction_percent().unwrap();
        assert!((pct - 75.0).abs() < 1e-9);
    }

    #[test]
    fn renumber_outcome_json_is_tagged() {
        let outcome = RenumberOutcome::NothingToRemove {
            candidate: "individual_pages/page_001.png".into(),
        };
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains(r#""outcome":"nothing_to_remove""#), "got: {json}");
        assert!(outcome.is_noop());
    }
}
