//! # flipbook-prep
//!
//! Turn a scanned book PDF into page images for a web page-turning viewer.
//!
//! Scanners capture a book two facing pages at a time. This crate pulls the
//! spread scans out of the PDF, cuts each one into single pages with the
//! right names, removes a blank page left over from scanning, shrinks the
//! pages for the web and serves the result locally.
//!
//! ## Pipeline Overview
//!
//! ```text
//! book.pdf
//!  │
//!  ├─ 1. Extract   embedded images → book_images/page_NNN_img_001.png
//!  ├─ 2. Split     spreads → individual_pages/page_000_cover.png, page_NNN.png
//!  ├─ 3. Renumber  drop the blank page, shift later pages down (staged swap)
//!  ├─ 4. Compress  PNG → JPEG, ≤ 1200 px wide
//!  └─ 5. Serve     static HTTP with CORS on :8000
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use flipbook_prep::{fix_page_numbering, split_spreads, RenumberConfig, SplitConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let report = split_spreads(&SplitConfig::default())?;
//!     eprintln!("{} pages written", report.pages_written());
//!
//!     let outcome = fix_page_numbering(&RenumberConfig::default())?;
//!     eprintln!("{outcome:?}");
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `flipbook` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! flipbook-prep = { version = "0.1", default-features = false }
//! ```
//!
//! ## pdfium
//!
//! Only [`extract_images`] needs the pdfium shared library. Point
//! `PDFIUM_LIB_PATH` at it, drop it in the working directory, or install it
//! system-wide.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pages;
pub mod pipeline;
pub mod progress;
pub mod serve;
pub mod staging;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    CompressConfig, CompressConfigBuilder, ExtractConfig, RenumberConfig, RenumberConfigBuilder,
    ServeConfig, SplitConfig, SplitConfigBuilder,
};
pub use error::{BookError, ItemError};
pub use output::{
    CompressReport, CompressedFile, ExtractReport, ExtractedImage, Rename, RenumberOutcome,
    RenumberReport, SplitReport, SpreadResult, WrittenPage,
};
pub use pages::{find_gap, scan_pages, PageFile, PageId};
pub use pipeline::compress::compress_pages;
pub use pipeline::extract::extract_images;
pub use pipeline::renumber::fix_page_numbering;
pub use pipeline::split::split_spreads;
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
pub use serve::{serve, serve_sync};
