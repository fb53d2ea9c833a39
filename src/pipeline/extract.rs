//! Image extraction: pull every embedded raster out of a scanned PDF.
//!
//! A scanned book PDF is one full-page image per page, so the images written
//! here are the spreads the splitter reads (`page_001_img_001.png`, ...).
//! Images smaller than `min_dimension` in either direction are skipped but
//! still count towards the per-page image number, so the numbering matches
//! the order the images appear in the page.
//!
//! pdfium is bound at run time, tried in this order:
//!
//! 1. `PDFIUM_LIB_PATH` (a library file or the directory holding it)
//! 2. the current directory
//! 3. the system library search path

use crate::config::ExtractConfig;
use crate::error::{BookError, ItemError};
use crate::output::{ExtractReport, ExtractedImage};
use crate::pages::extracted_image_name;
use crate::pipeline::split::save_png;
use pdfium_render::prelude::*;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable naming the pdfium library or its directory.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Extract every embedded image of `config.pdf_path` as PNG.
///
/// # Errors
/// Fatal when the PDF is missing, unreadable, not a PDF, encrypted or
/// corrupt, when pdfium cannot be bound, or when the output directory cannot
/// be created. An image pdfium cannot decode is recorded in
/// [`ExtractReport::failures`].
pub fn extract_images(config: &ExtractConfig) -> Result<ExtractReport, BookError> {
    let pdf_path = &config.pdf_path;
    check_pdf_header(pdf_path)?;

    let output_dir = config.resolved_output_dir();
    if output_dir.is_dir() {
        info!("Using existing directory: {}", output_dir.display());
    } else {
        fs::create_dir_all(&output_dir).map_err(|source| BookError::CreateDirFailed {
            path: output_dir.clone(),
            source,
        })?;
        info!("Created directory: {}", output_dir.display());
    }

    let pdfium = bind_pdfium()?;
    let document = pdfium
        .load_pdf_from_file(pdf_path, None)
        .map_err(|e| open_error(pdf_path, e))?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("Processing PDF {}: {} pages", pdf_path.display(), total_pages);

    let cb = config.progress_callback.as_ref();
    if let Some(cb) = cb {
        cb.on_batch_start(total_pages);
    }

    let mut report = ExtractReport {
        pdf_path: pdf_path.clone(),
        output_dir: output_dir.clone(),
        total_pages,
        images: Vec::new(),
        skipped_small: 0,
        failures: Vec::new(),
    };

    for (page_idx, page) in pages.iter().enumerate() {
        let page_no = page_idx + 1;
        if let Some(cb) = cb {
            cb.on_item_start(page_no, total_pages);
        }
        let before = report.images.len();
        let failures_before = report.failures.len();

        let mut image_no = 0;
        for object in page.objects().iter() {
            let Some(image_object) = object.as_image_object() else {
                continue;
            };
            image_no += 1;

            let image = match image_object.get_raw_image() {
                Ok(image) => image,
                Err(e) => {
                    warn!("Page {} image {}: {:?}", page_no, image_no, e);
                    report.failures.push(ItemError::ImageObjectFailed {
                        page: page_no,
                        image: image_no,
                        detail: format!("{e:?}"),
                    });
                    continue;
                }
            };

            let (width, height) = (image.width(), image.height());
            if width < config.min_dimension || height < config.min_dimension {
                debug!("Skipping small image: {}x{}", width, height);
                report.skipped_small += 1;
                continue;
            }

            let path = output_dir.join(extracted_image_name(page_no, image_no));
            if let Err(e) = save_png(&image, &path) {
                warn!("{}", e);
                report.failures.push(e);
                continue;
            }
            debug!("Saved {} ({}x{})", path.display(), width, height);
            report.images.push(ExtractedImage {
                page: page_no,
                index: image_no,
                path,
                width,
                height,
            });
        }

        let found = report.images.len() - before;
        if found > 0 {
            info!("Page {}: saved {} image(s)", page_no, found);
        }
        if let Some(cb) = cb {
            if report.failures.len() > failures_before {
                cb.on_item_error(page_no, total_pages, "one or more images could not be decoded");
            } else {
                cb.on_item_complete(page_no, total_pages, &format!("{found} image(s)"));
            }
        }
    }

    if let Some(cb) = cb {
        cb.on_batch_complete(total_pages, total_pages - failed_pages(&report.failures));
    }
    info!(
        "Extracted {} images to {} ({} small skipped)",
        report.images.len(),
        output_dir.display(),
        report.skipped_small
    );
    Ok(report)
}

/// Existence, permission and `%PDF` magic checks, before pdfium is involved.
fn check_pdf_header(path: &Path) -> Result<(), BookError> {
    let mut file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(BookError::FileNotFound {
                path: path.to_path_buf(),
            })
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(BookError::PermissionDenied {
                path: path.to_path_buf(),
            })
        }
        Err(e) => return Err(BookError::io(path, e)),
    };
    if file.metadata().map(|m| m.is_dir()).unwrap_or(false) {
        return Err(BookError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let mut magic = [0u8; 4];
    // Files shorter than the magic are left for pdfium to reject.
    if file.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
        return Err(BookError::NotAPdf {
            path: path.to_path_buf(),
            magic,
        });
    }
    Ok(())
}

/// Bind to pdfium from `PDFIUM_LIB_PATH`, the current directory, or the system.
pub fn bind_pdfium() -> Result<Pdfium, BookError> {
    let mut attempts = Vec::new();

    if let Ok(configured) = std::env::var(PDFIUM_LIB_PATH_ENV) {
        let configured = PathBuf::from(configured);
        let library = if configured.is_dir() {
            let dir = configured.to_string_lossy().into_owned();
            Pdfium::pdfium_platform_library_name_at_path(&dir)
                .to_string_lossy()
                .into_owned()
        } else {
            configured.to_string_lossy().into_owned()
        };
        match Pdfium::bind_to_library(library.clone()) {
            Ok(bindings) => {
                debug!("Bound pdfium from {}", library);
                return Ok(Pdfium::new(bindings));
            }
            Err(e) => attempts.push(format!("{library}: {e:?}")),
        }
    }

    let here = String::from("./");
    let local = Pdfium::pdfium_platform_library_name_at_path(&here)
        .to_string_lossy()
        .into_owned();
    match Pdfium::bind_to_library(local.clone()) {
        Ok(bindings) => {
            debug!("Bound pdfium from {}", local);
            return Ok(Pdfium::new(bindings));
        }
        Err(e) => attempts.push(format!("{local}: {e:?}")),
    }

    match Pdfium::bind_to_system_library() {
        Ok(bindings) => {
            debug!("Bound system pdfium");
            Ok(Pdfium::new(bindings))
        }
        Err(e) => {
            attempts.push(format!("system library: {e:?}"));
            Err(BookError::PdfiumBindingFailed(attempts.join("; ")))
        }
    }
}

fn open_error(path: &Path, e: PdfiumError) -> BookError {
    let detail = format!("{e:?}");
    if detail.contains("Password") || detail.contains("password") {
        BookError::PasswordRequired {
            path: path.to_path_buf(),
        }
    } else {
        BookError::CorruptPdf {
            path: path.to_path_buf(),
            detail,
        }
    }
}

fn failed_pages(failures: &[ItemError]) -> usize {
    let mut pages: Vec<usize> = failures
        .iter()
        .filter_map(|f| match f {
            ItemError::ImageObjectFailed { page, .. } => Some(*page),
            _ => None,
        })
        .collect();
    pages.sort_unstable();
    pages.dedup();
    pages.len()
}
