//! Error types for the flipbook-prep library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`BookError`]: **Fatal**: the stage cannot proceed at all (input
//!   directory missing, blank-page safety check failed, PDF unreadable).
//!   Returned as `Err(BookError)` from every top-level operation.
//!
//! * [`ItemError`]: **Non-fatal**: a single spread, page or embedded image
//!   failed but the rest of the batch is fine. Stored inside the per-item
//!   results of [`crate::output`] so callers can inspect partial success
//!   rather than losing a whole book to one corrupt scan.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the flipbook-prep library.
///
/// Per-item failures use [`ItemError`] and are stored in the stage reports
/// rather than propagated here.
#[derive(Debug, Error)]
pub enum BookError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// A directory a stage reads from does not exist.
    #[error("Directory not found: '{path}'\nRun the previous stage first or point the command at the right directory.")]
    DirectoryNotFound { path: PathBuf },

    /// An input file does not exist.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input directory holds nothing the stage can work on.
    #[error("No {kind} files found in '{dir}'")]
    NoInputImages { dir: PathBuf, kind: &'static str },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' could not be opened: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password.
    #[error("PDF '{path}' is encrypted and requires a password.")]
    PasswordRequired { path: PathBuf },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Image extraction needs the pdfium shared library. You can:\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium (file or containing directory).\n\
  • Place libpdfium next to the working directory.\n\
  • Install pdfium system-wide.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Renumbering errors ────────────────────────────────────────────────
    /// The blank-page candidate is too large to be blank; nothing was touched.
    #[error(
        "Nothing to remove: '{path}' is a real page ({size} bytes, \
the blank-page threshold is {threshold} bytes).\n\
Nothing was renamed. If the blank page was already removed on an earlier run, the directory is done."
    )]
    PageNotBlank {
        path: PathBuf,
        size: u64,
        threshold: u64,
    },

    /// Writing the renumbered copy into the staging directory failed.
    #[error("Failed to stage renumbered pages for '{path}': {source}")]
    StagingFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Replacing the page directory with the staged copy failed.
    #[error(
        "Failed to swap staged pages into '{path}': {source}\n\
If '{path}' is missing, the original pages are in a '.<name>-retired-*/previous' directory beside it; move that back."
    )]
    SwapFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create an output directory.
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Any other file-system failure on a specific path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Server errors ─────────────────────────────────────────────────────
    /// The requested port is already bound by another process.
    #[error("Port {port} is already in use!\nStop the other server or try: --port {}", next_port(.port))]
    PortInUse { port: u16 },

    /// The HTTP server failed to start or crashed.
    #[error("Server error: {0}")]
    Server(String),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

fn next_port(port: &u16) -> u16 {
    port.saturating_add(1)
}

impl BookError {
    /// Wrap an I/O error with the path it happened on.
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BookError::Io {
            path: path.into(),
            source,
        }
    }
}

/// A non-fatal error for a single spread, page or embedded image.
///
/// The stage that produced it carries on with the next item.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum ItemError {
    /// Expected input file is absent; the item was skipped.
    #[error("{path}: not found, skipped")]
    Missing { path: PathBuf },

    /// The image could not be read or decoded.
    #[error("{path}: could not decode image: {detail}")]
    DecodeFailed { path: PathBuf, detail: String },

    /// A spread must be at least two pixels wide to have two halves.
    #[error("{path}: spread is {width}px wide, too narrow to split")]
    TooNarrow { path: PathBuf, width: u32 },

    /// Encoding or writing an output image failed.
    #[error("{path}: could not write image: {detail}")]
    WriteFailed { path: PathBuf, detail: String },

    /// pdfium could not hand over the pixels of an embedded image.
    #[error("PDF page {page}, image {image}: {detail}")]
    ImageObjectFailed {
        page: usize,
        image: usize,
        detail: String,
    },
}

impl ItemError {
    /// True when the item was skipped because its input does not exist.
    pub fn is_missing(&self) -> bool {
        matches!(self, ItemError::Missing { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_not_blank_display() {
        let e = BookError::PageNotBlank {
            path: "individual_pages/page_001.png".into(),
            size: 2_000_000,
            threshold: 104_858,
        };
        let msg = e.to_string();
        assert!(msg.starts_with("Nothing to remove: 'individual_pages/page_001.png' is a real page"), "got: {msg}");
        assert!(msg.contains("page_001.png"), "got: {msg}");
        assert!(msg.contains("2000000"), "got: {msg}");
        assert!(msg.contains("104858"), "got: {msg}");
    }

    #[test]
    fn port_in_use_suggests_next_port() {
        let e = BookError::PortInUse { port: 8000 };
        let msg = e.to_string();
        assert!(msg.contains("8000"));
        assert!(msg.contains("--port 8001"), "got: {msg}");
    }

    #[test]
    fn directory_not_found_display() {
        let e = BookError::DirectoryNotFound {
            path: "book_images".into(),
        };
        assert!(e.to_string().contains("book_images"));
    }

    #[test]
    fn missing_is_distinguished_from_failures() {
        let missing = ItemError::Missing {
            path: "book_images/page_004_img_001.png".into(),
        };
        let failed = ItemError::DecodeFailed {
            path: "book_images/page_005_img_001.png".into(),
            detail: "truncated".into(),
        };
        assert!(missing.is_missing());
        assert!(!failed.is_missing());
        assert!(failed.to_string().contains("truncated"));
    }

    #[test]
    fn item_error_serialises() {
        let e = ItemError::TooNarrow {
            path: "x.png".into(),
            width: 1,
        };
        let json = serde_json::to_string(&e).expect("serialise");
        assert!(json.contains("TooNarrow"));
    }
}
