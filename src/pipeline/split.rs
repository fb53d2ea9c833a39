//! Spread splitting: cut each two-page scan down the middle.
//!
//! ## Page mapping
//!
//! ```text
//! spread 1:  [ page 1 | cover ]      right half is the cover
//! spread i:  [ 2(i-1) | 2(i-1)+1 ]   i > 1
//! ```
//!
//! The first spread holds the front cover on its right and page 1 on its
//! left. Every later spread reads left to right.
//!
//! The split column is `width / 2`; with an odd width the extra column goes
//! to the right half. Halves are written as PNG at maximum compression
//! effort, so pixels are never altered.

use crate::config::SplitConfig;
use crate::error::{BookError, ItemError};
use crate::output::{SpreadResult, SplitReport, WrittenPage};
use crate::pages::{spread_file_name, PageId};
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::DynamicImage;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::{debug, info, warn};

/// Split every spread named by `config` into page files.
///
/// # Errors
/// Returns `Err(BookError)` only when the spread directory is absent or the
/// output directory cannot be created. Missing or broken spreads are
/// recorded in the report and the run carries on.
pub fn split_spreads(config: &SplitConfig) -> Result<SplitReport, BookError> {
    if !config.spreads_dir.is_dir() {
        return Err(BookError::DirectoryNotFound {
            path: config.spreads_dir.clone(),
        });
    }
    if !config.output_dir.is_dir() {
        std::fs::create_dir_all(&config.output_dir).map_err(|source| {
            BookError::CreateDirFailed {
                path: config.output_dir.clone(),
                source,
            }
        })?;
        info!("Created output directory: {}", config.output_dir.display());
    }

    let total = config.spread_count as usize;
    let cb = config.progress_callback.as_ref();
    if let Some(cb) = cb {
        cb.on_batch_start(total);
    }
    info!(
        "Splitting {} spreads from {} into {}",
        total,
        config.spreads_dir.display(),
        config.output_dir.display()
    );

    let mut spreads = Vec::with_capacity(total);
    for spread in 1..=config.spread_count {
        let item = spread as usize;
        if let Some(cb) = cb {
            cb.on_item_start(item, total);
        }

        let source = config.spreads_dir.join(spread_file_name(spread));
        let result = if source.is_file() {
            split_one(&source, &config.output_dir, spread)
        } else {
            Err(ItemError::Missing {
                path: source.clone(),
            })
        };

        let result = match result {
            Ok(pages) => {
                if let Some(cb) = cb {
                    cb.on_item_complete(item, total, &describe(&pages));
                }
                SpreadResult {
                    spread,
                    source,
                    pages,
                    error: None,
                }
            }
            Err(e) => {
                if e.is_missing() {
                    warn!("Spread {} not found: {}", spread, source.display());
                } else {
                    warn!("Failed to split spread {}: {}", spread, e);
                }
                if let Some(cb) = cb {
                    cb.on_item_error(item, total, &e.to_string());
                }
                SpreadResult {
                    spread,
                    source,
                    pages: Vec::new(),
                    error: Some(e),
                }
            }
        };
        spreads.push(result);
    }

    let report = SplitReport {
        spreads_dir: config.spreads_dir.clone(),
        output_dir: config.output_dir.clone(),
        spreads,
    };
    if let Some(cb) = cb {
        cb.on_batch_complete(total, report.split());
    }
    info!(
        "Split {}/{} spreads into {} pages ({} missing, {} failed)",
        report.split(),
        report.attempted(),
        report.pages_written(),
        report.missing(),
        report.failed()
    );
    Ok(report)
}

/// Page ids for the left and right halves of spread `spread` (1-based).
pub fn page_ids_for_spread(spread: u32) -> (PageId, PageId) {
    if spread == 1 {
        return (PageId::Numbered(1), PageId::Cover);
    }
    let left = 2 * (spread - 1);
    (PageId::Numbered(left), PageId::Numbered(left + 1))
}

/// Cut `img` at `width / 2` into `(left, right)`.
pub fn split_halves(img: &DynamicImage) -> (DynamicImage, DynamicImage) {
    let (width, height) = (img.width(), img.height());
    let split_x = width / 2;
    let left = img.crop_imm(0, 0, split_x, height);
    let right = img.crop_imm(split_x, 0, width - split_x, height);
    (left, right)
}

fn split_one(source: &Path, output_dir: &Path, spread: u32) -> Result<Vec<WrittenPage>, ItemError> {
    let img = image::open(source).map_err(|e| ItemError::DecodeFailed {
        path: source.to_path_buf(),
        detail: e.to_string(),
    })?;
    debug!(
        "Processing spread {}: {}x{}",
        spread,
        img.width(),
        img.height()
    );
    if img.width() < 2 {
        return Err(ItemError::TooNarrow {
            path: source.to_path_buf(),
            width: img.width(),
        });
    }

    let (left, right) = split_halves(&img);
    let (left_id, right_id) = page_ids_for_spread(spread);

    // Cover first so the report lists pages in reading order.
    let halves = if spread == 1 {
        [(right_id, right), (left_id, left)]
    } else {
        [(left_id, left), (right_id, right)]
    };

    let mut pages = Vec::with_capacity(2);
    for (id, half) in halves {
        let path = output_dir.join(id.file_name());
        save_png(&half, &path)?;
        debug!("Saved {}: {}", id, path.display());
        pages.push(WrittenPage {
            id,
            path,
            width: half.width(),
            height: half.height(),
        });
    }
    Ok(pages)
}

/// Lossless PNG at maximum compression effort.
pub(crate) fn save_png(img: &DynamicImage, path: &Path) -> Result<(), ItemError> {
    let write_err = |detail: String| ItemError::WriteFailed {
        path: path.to_path_buf(),
        detail,
    };
    let file = File::create(path).map_err(|e| write_err(e.to_string()))?;
    let encoder = PngEncoder::new_with_quality(
        BufWriter::new(file),
        CompressionType::Best,
        FilterType::Adaptive,
    );
    img.write_with_encoder(encoder)
        .map_err(|e| write_err(e.to_string()))
}

fn describe(pages: &[WrittenPage]) -> String {
    pages
        .iter()
        .map(|p| p.id.to_string())
        .collect::<Vec<_>>()
        .join(" + ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn first_spread_is_inverted() {
        assert_eq!(
            page_ids_for_spread(1),
            (PageId::Numbered(1), PageId::Cover)
        );
    }

    #[test]
    fn later_spreads_read_left_to_right() {
        for spread in 2..=11 {
            let (left, right) = page_ids_for_spread(spread);
            assert_eq!(left, PageId::Numbered(2 * (spread - 1)));
            assert_eq!(right, PageId::Numbered(2 * (spread - 1) + 1));
        }
        assert_eq!(
            page_ids_for_spread(11),
            (PageId::Numbered(20), PageId::Numbered(21))
        );
    }

    #[test]
    fn odd_width_gives_extra_column_to_the_right() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(101, 7));
        let (left, right) = split_halves(&img);
        assert_eq!((left.width(), left.height()), (50, 7));
        assert_eq!((right.width(), right.height()), (51, 7));
    }

    #[test]
    fn halves_keep_their_pixels() {
        let img = RgbImage::from_fn(4, 2, |x, _| {
            if x < 2 {
                Rgb([255, 0, 0])
            } else {
                Rgb([0, 0, 255])
            }
        });
        let (left, right) = split_halves(&DynamicImage::ImageRgb8(img));
        assert!(left.to_rgb8().pixels().all(|p| *p == Rgb([255, 0, 0])));
        assert!(right.to_rgb8().pixels().all(|p| *p == Rgb([0, 0, 255])));
    }

    #[test]
    fn png_output_is_lossless() {
        let dir = tempfile::tempdir().unwrap();
        let img = RgbImage::from_fn(9, 5, |x, y| Rgb([(x * 20) as u8, (y * 40) as u8, 7]));
        let img = DynamicImage::ImageRgb8(img);
        let path = dir.path().join("page_001.png");
        save_png(&img, &path).unwrap();
        let back = image::open(&path).unwrap().to_rgb8();
        assert_eq!(back, img.to_rgb8());
    }

    #[test]
    fn one_pixel_spread_is_too_narrow() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("page_001_img_001.png");
        RgbImage::new(1, 4).save(&source).unwrap();
        let err = split_one(&source, dir.path(), 1).unwrap_err();
        assert!(matches!(err, ItemError::TooNarrow { width: 1, .. }));
    }

    #[test]
    fn corrupt_spread_is_a_decode_failure() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("page_002_img_001.png");
        std::fs::write(&source, b"definitely not a png").unwrap();
        let err = split_one(&source, dir.path(), 2).unwrap_err();
        assert!(matches!(err, ItemError::DecodeFailed { .. }));
    }

    #[test]
    fn missing_spreads_dir_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = SplitConfig::builder()
            .spreads_dir(dir.path().join("book_images"))
            .output_dir(dir.path().join("individual_pages"))
            .build()
            .unwrap();
        let err = split_spreads(&config).unwrap_err();
        assert!(matches!(err, BookError::DirectoryNotFound { .. }));
        assert!(!dir.path().join("individual_pages").exists());
    }
}
