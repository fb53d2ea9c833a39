//! CLI binary for flipbook-prep.
//!
//! A thin shim over the library crate: one subcommand per stage, flags
//! mapped onto the stage configs, reports printed as text or JSON.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use flipbook_prep::config::{DEFAULT_BLANK_THRESHOLD_BYTES, DEFAULT_PAGES_DIR, DEFAULT_SPREADS_DIR};
use flipbook_prep::pages::format_mib;
use flipbook_prep::{
    compress_pages, extract_images, find_gap, fix_page_numbering, scan_pages, serve_sync,
    split_spreads, BatchProgressCallback, CompressConfig, CompressReport, ExtractConfig,
    ExtractReport, ProgressCallback, RenumberConfig, RenumberOutcome, ServeConfig, SplitConfig,
    SplitReport,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Live progress bar plus one log line per item.
struct CliProgressCallback {
    bar: ProgressBar,
    /// "spreads", "pages", "images" ...
    noun: &'static str,
    /// Label shown while the stage runs.
    verb: &'static str,
    item_started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    fn new(verb: &'static str, noun: &'static str) -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            noun,
            verb,
            item_started: Mutex::new(None),
        })
    }

    fn elapsed_secs(&self) -> f64 {
        self.item_started
            .lock()
            .ok()
            .and_then(|mut t| t.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total: usize) {
        let style = ProgressStyle::with_template(&format!(
            "{{spinner:.cyan}} {{prefix:.bold}}  [{{bar:42.green/238}}] {{pos:>3}}/{{len}} {}  ⏱ {{elapsed_precise}}",
            self.noun
        ))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);
        self.bar.set_length(total as u64);
        self.bar.set_style(style);
        self.bar.set_prefix(self.verb);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("{} {} {}…", self.verb, total, self.noun))
        ));
    }

    fn on_item_start(&self, item: usize, _total: usize) {
        if let Ok(mut started) = self.item_started.lock() {
            *started = Some(Instant::now());
        }
        self.bar.set_message(format!("#{item}"));
    }

    fn on_item_complete(&self, item: usize, total: usize, detail: &str) {
        let secs = self.elapsed_secs();
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}",
            green("✓"),
            item,
            total,
            detail,
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_item_error(&self, item: usize, total: usize, error: &str) {
        let secs = self.elapsed_secs();
        let first_line = error.lines().next().unwrap_or(error);
        let msg = if first_line.chars().count() > 80 {
            let cut: String = first_line.chars().take(79).collect();
            format!("{cut}\u{2026}")
        } else {
            first_line.to_string()
        };
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}",
            red("✗"),
            item,
            total,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total: usize, success_count: usize) {
        self.bar.finish_and_clear();
        let failed = total.saturating_sub(success_count);
        if failed == 0 {
            eprintln!(
                "{} {} {} done",
                green("✔"),
                bold(&success_count.to_string()),
                self.noun
            );
        } else {
            eprintln!(
                "{} {}/{} {} done  ({} skipped or failed)",
                if failed == total { red("✘") } else { yellow("⚠") },
                bold(&success_count.to_string()),
                total,
                self.noun,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Full pipeline for book.pdf
  flipbook extract book.pdf                 # → book_images/
  flipbook split                            # → individual_pages/
  flipbook fix-pages                        # drop blank page_001.png, shift the rest
  flipbook compress --replace               # JPEGs ≤ 1200 px, originals backed up
  flipbook serve                            # http://localhost:8000

  # Check the page sequence for gaps
  flipbook list --dir individual_pages

  # Machine-readable report
  flipbook --json split --count 24 > split.json

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH     pdfium shared library (file or directory), used by `extract`
  RUST_LOG            Override the log filter (e.g. flipbook_prep=debug)
  FLIPBOOK_*          Every flag has a FLIPBOOK_<FLAG> fallback, see --help of each subcommand
"#;

/// Prepare scanned books for web page-turning viewers.
#[derive(Parser, Debug)]
#[command(
    name = "flipbook",
    version,
    about = "Prepare scanned books for web page-turning viewers",
    long_about = "Extract spread scans from a PDF, split them into single pages, remove a blank \
page left by scanning, compress the pages for the web and serve them locally.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "FLIPBOOK_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "FLIPBOOK_QUIET")]
    quiet: bool,

    /// Print the stage report as JSON on stdout.
    #[arg(long, global = true, env = "FLIPBOOK_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, global = true, env = "FLIPBOOK_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Save every embedded image of a PDF as PNG.
    Extract(ExtractArgs),
    /// Split two-page spreads into individual pages.
    Split(SplitArgs),
    /// Remove a blank page and renumber the pages after it.
    FixPages(FixPagesArgs),
    /// Resize and re-encode pages as JPEG for the web.
    Compress(CompressArgs),
    /// Serve a directory over HTTP with CORS headers.
    Serve(ServeArgs),
    /// List page files with sizes and report gaps.
    List(ListArgs),
}

#[derive(Args, Debug)]
struct ExtractArgs {
    /// The PDF to read.
    pdf: PathBuf,

    /// Output directory. Default: `{pdf stem}_images`.
    #[arg(short, long, env = "FLIPBOOK_EXTRACT_OUTPUT")]
    output: Option<PathBuf>,

    /// Skip images narrower or shorter than this.
    #[arg(long = "min-size", env = "FLIPBOOK_MIN_SIZE", default_value_t = 10)]
    min_size: u32,
}

#[derive(Args, Debug)]
struct SplitArgs {
    /// Directory holding `page_NNN_img_001.png` spreads.
    #[arg(long, env = "FLIPBOOK_SPREADS_DIR", default_value = DEFAULT_SPREADS_DIR)]
    spreads: PathBuf,

    /// Where page files are written.
    #[arg(short, long, env = "FLIPBOOK_PAGES_DIR", default_value = DEFAULT_PAGES_DIR)]
    output: PathBuf,

    /// Number of spreads to process.
    #[arg(long, env = "FLIPBOOK_SPREAD_COUNT", default_value_t = 11,
          value_parser = clap::value_parser!(u32).range(1..))]
    count: u32,
}

#[derive(Args, Debug)]
struct FixPagesArgs {
    /// Page directory to fix.
    #[arg(long, env = "FLIPBOOK_PAGES_DIR", default_value = DEFAULT_PAGES_DIR)]
    dir: PathBuf,

    /// Number of the blank page to remove.
    #[arg(long, env = "FLIPBOOK_BLANK_PAGE", default_value_t = 1,
          value_parser = clap::value_parser!(u32).range(1..))]
    page: u32,

    /// Files at or above this many bytes are never treated as blank.
    #[arg(long, env = "FLIPBOOK_BLANK_THRESHOLD", default_value_t = DEFAULT_BLANK_THRESHOLD_BYTES)]
    threshold: u64,

    /// Highest page number considered for shifting.
    #[arg(long, env = "FLIPBOOK_MAX_PAGE", default_value_t = 49)]
    max_page: u32,
}

#[derive(Args, Debug)]
struct CompressArgs {
    /// Directory of PNG pages.
    #[arg(long, env = "FLIPBOOK_PAGES_DIR", default_value = DEFAULT_PAGES_DIR)]
    input: PathBuf,

    /// Where JPEGs are written.
    #[arg(short, long, env = "FLIPBOOK_COMPRESSED_DIR", default_value = "individual_pages_compressed")]
    output: PathBuf,

    /// Pages wider than this are scaled down.
    #[arg(long, env = "FLIPBOOK_MAX_WIDTH", default_value_t = 1200,
          value_parser = clap::value_parser!(u32).range(1..))]
    max_width: u32,

    /// JPEG quality (1–100).
    #[arg(long, env = "FLIPBOOK_QUALITY", default_value_t = 85,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: u8,

    /// Back up the input directory and swap the JPEGs in for the PNGs.
    #[arg(long, env = "FLIPBOOK_REPLACE")]
    replace: bool,

    /// Backup location used with --replace.
    #[arg(long, env = "FLIPBOOK_BACKUP_DIR", default_value = "individual_pages_backup")]
    backup: PathBuf,
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Directory served at `/`.
    #[arg(long, env = "FLIPBOOK_ROOT", default_value = ".")]
    root: PathBuf,

    /// TCP port.
    #[arg(long, env = "FLIPBOOK_PORT", default_value_t = 8000)]
    port: u16,

    /// Do not open a browser.
    #[arg(long, env = "FLIPBOOK_NO_BROWSER")]
    no_browser: bool,
}

#[derive(Args, Debug)]
struct ListArgs {
    /// Page directory to list.
    #[arg(long, env = "FLIPBOOK_PAGES_DIR", default_value = DEFAULT_PAGES_DIR)]
    dir: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs for the batch stages.
    let batch = matches!(
        cli.command,
        Command::Extract(_) | Command::Split(_) | Command::Compress(_)
    );
    let show_progress = batch && !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress = |verb: &'static str, noun: &'static str| -> Option<ProgressCallback> {
        show_progress.then(|| CliProgressCallback::new(verb, noun) as ProgressCallback)
    };

    match &cli.command {
        Command::Extract(args) => {
            let mut config = ExtractConfig::new(&args.pdf);
            config.output_dir = args.output.clone();
            config.min_dimension = args.min_size;
            config.progress_callback = progress("Extracting", "pages");
            let report = extract_images(&config)
                .with_context(|| format!("Image extraction from {} failed", args.pdf.display()))?;
            emit(&cli, &report, print_extract)?;
        }
        Command::Split(args) => {
            let mut builder = SplitConfig::builder()
                .spreads_dir(&args.spreads)
                .output_dir(&args.output)
                .spread_count(args.count);
            if let Some(cb) = progress("Splitting", "spreads") {
                builder = builder.progress_callback(cb);
            }
            let config = builder.build().context("Invalid configuration")?;
            let report = split_spreads(&config).context("Splitting spreads failed")?;
            emit(&cli, &report, print_split)?;
        }
        Command::FixPages(args) => {
            let config = RenumberConfig::builder()
                .pages_dir(&args.dir)
                .blank_page(args.page)
                .blank_threshold_bytes(args.threshold)
                .max_page(args.max_page)
                .build()
                .context("Invalid configuration")?;
            let outcome = fix_page_numbering(&config).context("Page renumbering aborted")?;
            emit(&cli, &outcome, |o| print_renumber(o, &config))?;
        }
        Command::Compress(args) => {
            let mut builder = CompressConfig::builder()
                .input_dir(&args.input)
                .output_dir(&args.output)
                .max_width(args.max_width)
                .quality(args.quality)
                .replace(args.replace)
                .backup_dir(&args.backup);
            if let Some(cb) = progress("Compressing", "images") {
                builder = builder.progress_callback(cb);
            }
            let config = builder.build().context("Invalid configuration")?;
            let report = compress_pages(&config).context("Compression failed")?;
            emit(&cli, &report, print_compress)?;
        }
        Command::Serve(args) => {
            let config = ServeConfig {
                root: args.root.clone(),
                port: args.port,
                open_browser: !args.no_browser,
                ..ServeConfig::default()
            };
            if !cli.quiet && !cli.json {
                eprintln!("{} Serving {} at {}", cyan("◆"), args.root.display(), bold(&config.local_url()));
                eprintln!("  {}", dim("Press Ctrl+C to stop the server"));
            }
            serve_sync(&config).context("Server failed")?;
        }
        Command::List(args) => {
            let pages = scan_pages(&args.dir)
                .with_context(|| format!("Cannot list {}", args.dir.display()))?;
            let listing = Listing {
                gap: find_gap(&pages),
                pages,
            };
            emit(&cli, &listing, print_listing)?;
        }
    }

    Ok(())
}

#[derive(Serialize)]
struct Listing {
    pages: Vec<flipbook_prep::PageFile>,
    /// First missing index, 0 being the cover.
    gap: Option<u32>,
}

/// JSON on stdout with `--json`, else the human summary unless `--quiet`.
fn emit<T: Serialize>(cli: &Cli, value: &T, human: impl FnOnce(&T)) -> Result<()> {
    if cli.json {
        let json = serde_json::to_string_pretty(value).context("Failed to serialise report")?;
        println!("{json}");
    } else if !cli.quiet {
        human(value);
    }
    Ok(())
}

fn print_extract(report: &ExtractReport) {
    if report.images.is_empty() {
        eprintln!("{} No images found in {}", yellow("⚠"), report.pdf_path.display());
        return;
    }
    eprintln!(
        "{}  {} images from {} pages  →  {}",
        if report.failures.is_empty() { green("✔") } else { yellow("⚠") },
        bold(&report.images.len().to_string()),
        report.total_pages,
        bold(&format!("{}/", report.output_dir.display())),
    );
    if report.skipped_small > 0 {
        eprintln!("   {}", dim(&format!("{} small images skipped", report.skipped_small)));
    }
    for failure in &report.failures {
        eprintln!("   {} {}", red("✗"), failure);
    }
}

fn print_split(report: &SplitReport) {
    eprintln!(
        "{}  {}/{} spreads  →  {} pages in {}",
        if report.split() == report.attempted() { green("✔") } else { yellow("⚠") },
        report.split(),
        report.attempted(),
        bold(&report.pages_written().to_string()),
        bold(&format!("{}/", report.output_dir.display())),
    );
    for spread in report.spreads.iter().filter(|s| s.error.is_some()) {
        if let Some(err) = &spread.error {
            let mark = if err.is_missing() { yellow("-") } else { red("✗") };
            eprintln!("   {} spread {:>2}: {}", mark, spread.spread, err);
        }
    }
}

fn print_renumber(outcome: &RenumberOutcome, config: &RenumberConfig) {
    match outcome {
        RenumberOutcome::NothingToRemove { candidate } => {
            eprintln!(
                "{} {} not found, nothing to remove",
                green("✔"),
                candidate.display()
            );
        }
        RenumberOutcome::Renumbered(report) => {
            eprintln!(
                "{} Removed blank {} ({} bytes, threshold {})",
                green("✔"),
                bold(&report.removed.display().to_string()),
                report.removed_size,
                config.blank_threshold_bytes
            );
            if report.cover_kept {
                eprintln!("   {}", dim("kept page_000_cover.png"));
            }
            for rename in &report.renames {
                eprintln!("   {} → {}", rename.from, rename.to);
            }
            for name in &report.carried_over {
                eprintln!("   {} {} carried over unchanged", yellow("⚠"), name);
            }
            eprintln!("   {} pages now in {}", bold(&report.total_pages.to_string()), config.pages_dir.display());
        }
    }
}

fn print_compress(report: &CompressReport) {
    eprintln!(
        "{}  {}/{} images  {}  →  {}  →  {}",
        if report.failures() == 0 { green("✔") } else { yellow("⚠") },
        report.successes(),
        report.files.len(),
        format_mib(report.original_bytes),
        format_mib(report.compressed_bytes),
        bold(&format!("{}/", report.output_dir.display())),
    );
    if let Some(pct) = report.reduction_percent() {
        eprintln!("   {}", dim(&format!("size reduction: {pct:.1}%")));
    }
    for file in report.files.iter() {
        if let Some(err) = &file.error {
            eprintln!("   {} {}", red("✗"), err);
        }
    }
    if let Some(backup) = &report.backup_dir {
        eprintln!(
            "   replaced {} images in {}, originals in {}",
            report.replaced,
            report.input_dir.display(),
            backup.display()
        );
    }
}

fn print_listing(listing: &Listing) {
    for page in &listing.pages {
        let name = page
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        println!("{:<20} {:>9}  {}", name, format_mib(page.size), dim(&page.id.to_string()));
    }
    match listing.gap {
        None => eprintln!("{} {} pages, no gaps", green("✔"), listing.pages.len()),
        Some(0) => eprintln!("{} cover missing", yellow("⚠")),
        Some(n) => eprintln!("{} gap at page_{:03}.png", yellow("⚠"), n),
    }
}
