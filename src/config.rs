//! Configuration types for every stage.
//!
//! Each stage takes one config struct. The three with several interacting
//! knobs ([`SplitConfig`], [`RenumberConfig`], [`CompressConfig`]) are built
//! through a builder whose setters clamp obviously bad values and whose
//! `build()` rejects combinations that cannot work. The defaults reproduce
//! the directory layout the stages hand to each other:
//!
//! ```text
//! book.pdf → book_images/ → individual_pages/ → individual_pages_compressed/
//! ```

use crate::error::BookError;
use crate::progress::ProgressCallback;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

/// Default directory the splitter reads spreads from.
pub const DEFAULT_SPREADS_DIR: &str = "book_images";

/// Default directory of individual page images.
pub const DEFAULT_PAGES_DIR: &str = "individual_pages";

/// Blank-page threshold: one tenth of a MiB, rounded up.
///
/// A page is blank when `size < threshold`, i.e. when its size is under
/// 0.1 MiB. Rounding up keeps a 104 857-byte page on the blank side.
/// A scanned page carrying any print compresses to well over this as PNG; a
/// blank one compresses to a few kilobytes.
pub const DEFAULT_BLANK_THRESHOLD_BYTES: u64 = (1024 * 1024_u64).div_ceil(10);

// ── Split ────────────────────────────────────────────────────────────────

/// Configuration for [`crate::split_spreads`].
///
/// # Example
/// ```rust
/// use flipbook_prep::SplitConfig;
///
/// let config = SplitConfig::builder()
///     .spreads_dir("scans")
///     .spread_count(24)
///     .build()
///     .unwrap();
/// assert_eq!(config.spread_count, 24);
/// ```
#[derive(Clone)]
pub struct SplitConfig {
    /// Directory holding `page_{i:03}_img_001.png` spreads. Default: `book_images`.
    pub spreads_dir: PathBuf,

    /// Directory the pages are written to; created if missing.
    /// Default: `individual_pages`.
    pub output_dir: PathBuf,

    /// Number of spreads to look for, starting at 1. Default: 11.
    ///
    /// Spreads are located by name, not by listing the directory, so a
    /// missing spread shows up as a skipped item instead of silently shifting
    /// every later page number.
    pub spread_count: u32,

    /// Optional per-spread progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            spreads_dir: PathBuf::from(DEFAULT_SPREADS_DIR),
            output_dir: PathBuf::from(DEFAULT_PAGES_DIR),
            spread_count: 11,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for SplitConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SplitConfig")
            .field("spreads_dir", &self.spreads_dir)
            .field("output_dir", &self.output_dir)
            .field("spread_count", &self.spread_count)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn BatchProgressCallback>"),
            )
            .finish()
    }
}

impl SplitConfig {
    /// Create a new builder for `SplitConfig`.
    pub fn builder() -> SplitConfigBuilder {
        SplitConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`SplitConfig`].
#[derive(Debug)]
pub struct SplitConfigBuilder {
    config: SplitConfig,
}

impl SplitConfigBuilder {
    pub fn spreads_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.spreads_dir = dir.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn spread_count(mut self, n: u32) -> Self {
        self.config.spread_count = n;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<SplitConfig, BookError> {
        let c = &self.config;
        if c.spread_count == 0 {
            return Err(BookError::InvalidConfig(
                "Spread count must be ≥ 1".into(),
            ));
        }
        if c.spreads_dir == c.output_dir {
            return Err(BookError::InvalidConfig(format!(
                "Spread and page directories must differ, both are '{}'",
                c.output_dir.display()
            )));
        }
        Ok(self.config)
    }
}

// ── Renumber ─────────────────────────────────────────────────────────────

/// Configuration for [`crate::fix_page_numbering`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenumberConfig {
    /// Page directory to repair. Default: `individual_pages`.
    pub pages_dir: PathBuf,

    /// Number of the page suspected to be blank. Default: 1.
    pub blank_page: u32,

    /// A candidate is only treated as blank when its file is strictly smaller
    /// than this many bytes. Default: [`DEFAULT_BLANK_THRESHOLD_BYTES`].
    ///
    /// A blank scan compresses to almost nothing as PNG. A candidate at or
    /// above the threshold stops the run before anything is touched.
    pub blank_threshold_bytes: u64,

    /// Highest page number scanned when shifting pages down. Default: 49.
    pub max_page: u32,
}

impl Default for RenumberConfig {
    fn default() -> Self {
        Self {
            pages_dir: PathBuf::from(DEFAULT_PAGES_DIR),
            blank_page: 1,
            blank_threshold_bytes: DEFAULT_BLANK_THRESHOLD_BYTES,
            max_page: 49,
        }
    }
}

impl RenumberConfig {
    /// Create a new builder for `RenumberConfig`.
    pub fn builder() -> RenumberConfigBuilder {
        RenumberConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`RenumberConfig`].
#[derive(Debug)]
pub struct RenumberConfigBuilder {
    config: RenumberConfig,
}

impl RenumberConfigBuilder {
    pub fn pages_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.pages_dir = dir.into();
        self
    }

    pub fn blank_page(mut self, page: u32) -> Self {
        self.config.blank_page = page;
        self
    }

    pub fn blank_threshold_bytes(mut self, bytes: u64) -> Self {
        self.config.blank_threshold_bytes = bytes;
        self
    }

    pub fn max_page(mut self, page: u32) -> Self {
        self.config.max_page = page;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<RenumberConfig, BookError> {
        let c = &self.config;
        if c.blank_page == 0 {
            return Err(BookError::InvalidConfig(
                "The cover cannot be removed: blank page must be ≥ 1".into(),
            ));
        }
        if c.max_page <= c.blank_page {
            return Err(BookError::InvalidConfig(format!(
                "Max page ({}) must be above the blank page ({})",
                c.max_page, c.blank_page
            )));
        }
        if c.blank_threshold_bytes == 0 {
            return Err(BookError::InvalidConfig(
                "Blank threshold must be > 0 bytes".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Compress ─────────────────────────────────────────────────────────────

/// Configuration for [`crate::compress_pages`].
#[derive(Clone)]
pub struct CompressConfig {
    /// Directory of PNG pages. Default: `individual_pages`.
    pub input_dir: PathBuf,

    /// Directory the JPEGs are written to. Default: `individual_pages_compressed`.
    pub output_dir: PathBuf,

    /// Pages wider than this are downscaled to it, keeping the aspect ratio.
    /// Default: 1200.
    pub max_width: u32,

    /// JPEG quality, 1–100. Default: 85.
    pub quality: u8,

    /// After compressing, swap the JPEGs into `input_dir` (backing it up
    /// first). Default: false.
    pub replace: bool,

    /// Where `input_dir` is copied before a replace. Default:
    /// `individual_pages_backup`.
    pub backup_dir: PathBuf,

    /// Optional per-file progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for CompressConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from(DEFAULT_PAGES_DIR),
            output_dir: PathBuf::from("individual_pages_compressed"),
            max_width: 1200,
            quality: 85,
            replace: false,
            backup_dir: PathBuf::from("individual_pages_backup"),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for CompressConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompressConfig")
            .field("input_dir", &self.input_dir)
            .field("output_dir", &self.output_dir)
            .field("max_width", &self.max_width)
            .field("quality", &self.quality)
            .field("replace", &self.replace)
            .field("backup_dir", &self.backup_dir)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn BatchProgressCallback>"),
            )
            .finish()
    }
}

impl CompressConfig {
    /// Create a new builder for `CompressConfig`.
    pub fn builder() -> CompressConfigBuilder {
        CompressConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`CompressConfig`].
#[derive(Debug)]
pub struct CompressConfigBuilder {
    config: CompressConfig,
}

impl CompressConfigBuilder {
    pub fn input_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.input_dir = dir.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn max_width(mut self, px: u32) -> Self {
        self.config.max_width = px.max(1);
        self
    }

    pub fn quality(mut self, q: u8) -> Self {
        self.config.quality = q.clamp(1, 100);
        self
    }

    pub fn replace(mut self, v: bool) -> Self {
        self.config.replace = v;
        self
    }

    pub fn backup_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.backup_dir = dir.into();
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<CompressConfig, BookError> {
        let c = &self.config;
        if c.input_dir == c.output_dir {
            return Err(BookError::InvalidConfig(format!(
                "Input and output directories must differ, both are '{}'",
                c.input_dir.display()
            )));
        }
        if c.replace && (c.backup_dir == c.input_dir || c.backup_dir == c.output_dir) {
            return Err(BookError::InvalidConfig(format!(
                "Backup directory '{}' must differ from the input and output directories",
                c.backup_dir.display()
            )));
        }
        Ok(self.config)
    }
}

// ── Extract ──────────────────────────────────────────────────────────────

/// Configuration for [`crate::extract_images`].
#[derive(Clone)]
pub struct ExtractConfig {
    /// The PDF to read.
    pub pdf_path: PathBuf,

    /// Output directory. `None` means `{pdf_stem}_images` in the current
    /// directory, which for `book.pdf` is the splitter's default input.
    pub output_dir: Option<PathBuf>,

    /// Images narrower or shorter than this many pixels are decorative and
    /// skipped. Default: 10.
    pub min_dimension: u32,

    /// Optional per-page progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl fmt::Debug for ExtractConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractConfig")
            .field("pdf_path", &self.pdf_path)
            .field("output_dir", &self.output_dir)
            .field("min_dimension", &self.min_dimension)
            .finish()
    }
}

impl ExtractConfig {
    pub fn new(pdf_path: impl Into<PathBuf>) -> Self {
        Self {
            pdf_path: pdf_path.into(),
            output_dir: None,
            min_dimension: 10,
            progress_callback: None,
        }
    }

    /// The directory images are written to.
    pub fn resolved_output_dir(&self) -> PathBuf {
        match &self.output_dir {
            Some(dir) => dir.clone(),
            None => default_images_dir(&self.pdf_path),
        }
    }
}

/// `{stem}_images` for a PDF path, e.g. `scans/book.pdf` → `book_images`.
pub fn default_images_dir(pdf_path: &Path) -> PathBuf {
    let stem = pdf_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    PathBuf::from(format!("{stem}_images"))
}

// ── Serve ────────────────────────────────────────────────────────────────

/// Configuration for [`crate::serve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServeConfig {
    /// Directory served at `/`. Default: the current directory.
    pub root: PathBuf,
    /// Interface to bind. Default: all interfaces.
    pub host: IpAddr,
    /// Default: 8000.
    pub port: u16,
    /// Open the default browser once listening. Default: true.
    pub open_browser: bool,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8000,
            open_browser: true,
        }
    }
}

impl ServeConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// The URL a local browser should open.
    pub fn local_url(&self) -> String {
        format!("http://localhost:{}", self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_defaults_follow_the_book_layout() {
        let c = SplitConfig::default();
        assert_eq!(c.spreads_dir, PathBuf::from("book_images"));
        assert_eq!(c.output_dir, PathBuf::from("individual_pages"));
        assert_eq!(c.spread_count, 11);
    }

    #[test]
    fn split_builder_rejects_zero_spreads_and_same_dirs() {
        assert!(SplitConfig::builder().spread_count(0).build().is_err());
        let err = SplitConfig::builder()
            .spreads_dir("x")
            .output_dir("x")
            .build()
            .unwrap_err();
        assert!(matches!(err, BookError::InvalidConfig(_)));
    }

    #[test]
    fn renumber_defaults() {
        let c = RenumberConfig::default();
        assert_eq!(c.blank_page, 1);
        assert_eq!(c.blank_threshold_bytes, 104_858);
        assert_eq!(c.max_page, 49);
    }

    #[test]
    fn renumber_builder_validation() {
        assert!(RenumberConfig::builder().blank_page(0).build().is_err());
        assert!(RenumberConfig::builder()
            .blank_page(5)
            .max_page(5)
            .build()
            .is_err());
        assert!(RenumberConfig::builder()
            .blank_threshold_bytes(0)
            .build()
            .is_err());
        let c = RenumberConfig::builder()
            .blank_threshold_bytes(2048)
            .build()
            .unwrap();
        assert_eq!(c.blank_threshold_bytes, 2048);
    }

    #[test]
    fn compress_builder_clamps_quality_and_width() {
        let c = CompressConfig::builder()
            .quality(0)
            .max_width(0)
            .build()
            .unwrap();
        assert_eq!(c.quality, 1);
        assert_eq!(c.max_width, 1);
        let c = CompressConfig::builder().quality(250).build().unwrap();
        assert_eq!(c.quality, 100);
    }

    #[test]
    fn compress_builder_rejects_overlapping_dirs() {
        assert!(CompressConfig::builder()
            .input_dir("a")
            .output_dir("a")
            .build()
            .is_err());
        assert!(CompressConfig::builder()
            .replace(true)
            .backup_dir("individual_pages")
            .build()
            .is_err());
    }

    #[test]
    fn extract_output_dir_defaults_to_stem() {
        let c = ExtractConfig::new("scans/book.pdf");
        assert_eq!(c.resolved_output_dir(), PathBuf::from("book_images"));
        let mut c = ExtractConfig::new("book.pdf");
        c.output_dir = Some(PathBuf::from("out"));
        assert_eq!(c.resolved_output_dir(), PathBuf::from("out"));
    }

    #[test]
    fn serve_urls() {
        let c = ServeConfig::default();
        assert_eq!(c.local_url(), "http://localhost:8000");
        assert_eq!(c.socket_addr().port(), 8000);
    }
}
