//! Page and spread file naming, plus directory listings.
//!
//! Every stage talks to the next one only through file names, so the naming
//! scheme lives in one place:
//!
//! ```text
//! book_images/page_{p:03}_img_{k:03}.png      extracted image k of PDF page p
//! individual_pages/page_000_cover.png         the cover (index 0)
//! individual_pages/page_{n:03}.png            content page n ≥ 1
//! ```
//!
//! A page directory is healthy when its pages run cover, 1, 2, … with no
//! gap; [`find_gap`] checks exactly that.

use crate::error::BookError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// File name of the cover page.
pub const COVER_FILE_NAME: &str = "page_000_cover.png";

/// Identity of a page file: the cover or a 1-based content page number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PageId {
    Cover,
    Numbered(u32),
}

static RE_PAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^page_(?:(000)_cover|(\d{3,}))\.png$").unwrap());

impl PageId {
    /// Sequence index: 0 for the cover, `n` for page `n`.
    pub fn index(self) -> u32 {
        match self {
            PageId::Cover => 0,
            PageId::Numbered(n) => n,
        }
    }

    /// File name for this page.
    pub fn file_name(self) -> String {
        match self {
            PageId::Cover => COVER_FILE_NAME.to_string(),
            PageId::Numbered(n) => format!("page_{n:03}.png"),
        }
    }

    /// Parse a page file name. `page_000.png` is not a page: index 0 is
    /// reserved for the cover.
    pub fn parse(file_name: &str) -> Option<Self> {
        let caps = RE_PAGE.captures(file_name)?;
        if caps.get(1).is_some() {
            return Some(PageId::Cover);
        }
        let n: u32 = caps.get(2)?.as_str().parse().ok()?;
        (n > 0).then_some(PageId::Numbered(n))
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageId::Cover => write!(f, "cover"),
            PageId::Numbered(n) => write!(f, "page {n}"),
        }
    }
}

/// File name of spread `spread` (1-based) as written by the extractor.
pub fn spread_file_name(spread: u32) -> String {
    extracted_image_name(spread as usize, 1)
}

/// File name for embedded image `image` on PDF page `page` (both 1-based).
pub fn extracted_image_name(page: usize, image: usize) -> String {
    format!("page_{page:03}_img_{image:03}.png")
}

/// A page file found on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageFile {
    pub id: PageId,
    pub path: PathBuf,
    /// Size in bytes.
    pub size: u64,
}

/// List every recognised page file in `dir`, ordered cover first.
///
/// Files whose names do not follow the page scheme are ignored.
pub fn scan_pages(dir: &Path) -> Result<Vec<PageFile>, BookError> {
    if !dir.is_dir() {
        return Err(BookError::DirectoryNotFound {
            path: dir.to_path_buf(),
        });
    }

    let entries = std::fs::read_dir(dir).map_err(|e| BookError::io(dir, e))?;
    let mut pages = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| BookError::io(dir, e))?;
        let name = entry.file_name();
        let Some(id) = name.to_str().and_then(PageId::parse) else {
            continue;
        };
        let meta = entry.metadata().map_err(|e| BookError::io(entry.path(), e))?;
        if !meta.is_file() {
            continue;
        }
        pages.push(PageFile {
            id,
            path: entry.path(),
            size: meta.len(),
        });
    }
    pages.sort_by_key(|p| p.id);
    Ok(pages)
}

/// First index missing from a cover-first sequence, if any.
///
/// `pages` must be sorted (as [`scan_pages`] returns them). An empty slice has
/// no gap. A sequence without a cover has its gap at index 0.
pub fn find_gap(pages: &[PageFile]) -> Option<u32> {
    let mut expected = 0;
    for page in pages {
        let index = page.id.index();
        if index != expected {
            return Some(expected);
        }
        expected += 1;
    }
    None
}

/// Format a byte count in MiB with one decimal, the way summaries print sizes.
pub fn format_mib(bytes: u64) -> String {
    format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_names_round_trip_through_parse() {
        assert_eq!(PageId::Cover.file_name(), "page_000_cover.png");
        assert_eq!(PageId::Numbered(7).file_name(), "page_007.png");
        assert_eq!(PageId::Numbered(1234).file_name(), "page_1234.png");
        assert_eq!(PageId::parse("page_000_cover.png"), Some(PageId::Cover));
        assert_eq!(PageId::parse("page_007.png"), Some(PageId::Numbered(7)));
        assert_eq!(PageId::parse("page_1234.png"), Some(PageId::Numbered(1234)));
    }

    #[test]
    fn parse_rejects_foreign_names() {
        assert_eq!(PageId::parse("page_000.png"), None);
        assert_eq!(PageId::parse("page_7.png"), None);
        assert_eq!(PageId::parse("page_007.jpg"), None);
        assert_eq!(PageId::parse("page_001_img_001.png"), None);
        assert_eq!(PageId::parse("notes.txt"), None);
    }

    #[test]
    fn spread_names_match_extractor_output() {
        assert_eq!(spread_file_name(1), "page_001_img_001.png");
        assert_eq!(spread_file_name(11), "page_011_img_001.png");
        assert_eq!(extracted_image_name(3, 2), "page_003_img_002.png");
    }

    #[test]
    fn index_and_ordering() {
        assert_eq!(PageId::Cover.index(), 0);
        assert_eq!(PageId::Numbered(4).index(), 4);
        assert!(PageId::Cover < PageId::Numbered(1));
        assert_eq!(PageId::Numbered(3).to_string(), "page 3");
    }

    fn page(index: u32) -> PageFile {
        let id = match index {
            0 => PageId::Cover,
            n => PageId::Numbered(n),
        };
        PageFile {
            id,
            path: PathBuf::from(id.file_name()),
            size: 1,
        }
    }

    #[test]
    fn gap_detection() {
        assert_eq!(find_gap(&[]), None);
        assert_eq!(find_gap(&[page(0), page(1), page(2)]), None);
        assert_eq!(find_gap(&[page(0), page(2), page(3)]), Some(1));
        assert_eq!(find_gap(&[page(1), page(2)]), Some(0));
    }

    #[test]
    fn scan_lists_pages_sorted_and_ignores_others() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("page_002.png"), b"22").unwrap();
        std::fs::write(dir.path().join("page_000_cover.png"), b"c").unwrap();
        std::fs::write(dir.path().join("page_001.png"), b"111").unwrap();
        std::fs::write(dir.path().join("README.txt"), b"x").unwrap();

        let pages = scan_pages(dir.path()).unwrap();
        let ids: Vec<_> = pages.iter().map(|p| p.id).collect();
        assert_eq!(
            ids,
            vec![PageId::Cover, PageId::Numbered(1), PageId::Numbered(2)]
        );
        assert_eq!(pages[1].size, 3);
        assert_eq!(find_gap(&pages), None);
    }

    #[test]
    fn scan_missing_dir_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = scan_pages(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, BookError::DirectoryNotFound { .. }));
    }

    #[test]
    fn mib_formatting() {
        assert_eq!(format_mib(0), "0.0 MB");
        assert_eq!(format_mib(1024 * 1024 * 3 / 2), "1.5 MB");
    }
}
