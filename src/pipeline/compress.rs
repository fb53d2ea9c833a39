//! Web compression: PNG pages → web-sized JPEGs.
//!
//! Each page is oriented from its EXIF tag (if the decoder exposes one),
//! flattened onto white, narrowed to `max_width` when wider, and written as
//! `{stem}.jpg` at the configured quality.
//!
//! Output is baseline JPEG: `image`'s encoder has no progressive mode, so
//! viewers show each page once it has fully downloaded.

use crate::config::CompressConfig;
use crate::error::{BookError, ItemError};
use crate::output::{CompressReport, CompressedFile};
use crate::pages::format_mib;
use crate::staging::copy_dir_all;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageReader, Rgb, RgbImage};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Compress every PNG in `config.input_dir` into `config.output_dir`.
///
/// # Errors
/// Fatal when the input directory is absent or holds no PNG files, when the
/// output directory cannot be created, or when a requested replace cannot
/// back up the originals. A page that fails to compress is recorded in the
/// report.
pub fn compress_pages(config: &CompressConfig) -> Result<CompressReport, BookError> {
    let inputs = list_pngs(&config.input_dir)?;
    if inputs.is_empty() {
        return Err(BookError::NoInputImages {
            dir: config.input_dir.clone(),
            kind: "PNG",
        });
    }

    fs::create_dir_all(&config.output_dir).map_err(|source| BookError::CreateDirFailed {
        path: config.output_dir.clone(),
        source,
    })?;
    info!(
        "Compressing {} images: max width {}px, quality {}",
        inputs.len(),
        config.max_width,
        config.quality
    );

    let total = inputs.len();
    let cb = config.progress_callback.as_ref();
    if let Some(cb) = cb {
        cb.on_batch_start(total);
    }

    let mut files = Vec::with_capacity(total);
    let mut original_bytes = 0;
    let mut compressed_bytes = 0;

    for (i, source) in inputs.into_iter().enumerate() {
        let item = i + 1;
        if let Some(cb) = cb {
            cb.on_item_start(item, total);
        }

        let original_size = fs::metadata(&source).map(|m| m.len()).unwrap_or(0);
        original_bytes += original_size;
        let output = config.output_dir.join(jpeg_name(&source));

        let mut file = CompressedFile {
            source,
            output,
            original_size,
            original_dims: None,
            compressed_size: None,
            compressed_dims: None,
            error: None,
        };

        match compress_one(&file.source, &file.output, config.max_width, config.quality) {
            Ok((from, to)) => {
                let size = fs::metadata(&file.output).map(|m| m.len()).unwrap_or(0);
                compressed_bytes += size;
                debug!(
                    "{}: {}x{} ({}) → {}x{} ({})",
                    file.source.display(),
                    from.0,
                    from.1,
                    format_mib(original_size),
                    to.0,
                    to.1,
                    format_mib(size)
                );
                if let Some(cb) = cb {
                    cb.on_item_complete(
                        item,
                        total,
                        &format!("{}x{} {}", to.0, to.1, format_mib(size)),
                    );
                }
                file.original_dims = Some(from);
                file.compressed_dims = Some(to);
                file.compressed_size = Some(size);
            }
            Err(e) => {
                warn!("Error compressing {}: {}", file.source.display(), e);
                if let Some(cb) = cb {
                    cb.on_item_error(item, total, &e.to_string());
                }
                file.error = Some(e);
            }
        }
        files.push(file);
    }

    let mut report = CompressReport {
        input_dir: config.input_dir.clone(),
        output_dir: config.output_dir.clone(),
        files,
        original_bytes,
        compressed_bytes,
        backup_dir: None,
        replaced: 0,
    };
    if let Some(cb) = cb {
        cb.on_batch_complete(total, report.successes());
    }
    info!(
        "Compressed {}/{} images: {} → {}",
        report.successes(),
        total,
        format_mib(report.original_bytes),
        format_mib(report.compressed_bytes)
    );

    if config.replace {
        report.replaced = replace_originals(config, &report.files)?;
        report.backup_dir = Some(config.backup_dir.clone());
    }
    Ok(report)
}

/// Width and height after narrowing to `max_width`, keeping the aspect ratio.
pub fn target_dimensions(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    if width <= max_width {
        return (width, height);
    }
    let new_height = (u64::from(max_width) * u64::from(height) / u64::from(width)) as u32;
    (max_width, new_height.max(1))
}

/// Composite any alpha channel over white and drop it.
pub fn flatten_onto_white(img: &DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }
    let rgba = img.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let p = rgba.get_pixel(x, y);
        let alpha = u32::from(p[3]);
        let blend = |c: u8| ((u32::from(c) * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        Rgb([blend(p[0]), blend(p[1]), blend(p[2])])
    })
}

type Dims = (u32, u32);

fn compress_one(source: &Path, output: &Path, max_width: u32, quality: u8) -> Result<(Dims, Dims), ItemError> {
    let decode_err = |detail: String| ItemError::DecodeFailed {
        path: source.to_path_buf(),
        detail,
    };
    let mut decoder = ImageReader::open(source)
        .map_err(|e| decode_err(e.to_string()))?
        .with_guessed_format()
        .map_err(|e| decode_err(e.to_string()))?
        .into_decoder()
        .map_err(|e| decode_err(e.to_string()))?;
    let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);
    let mut img = DynamicImage::from_decoder(decoder).map_err(|e| decode_err(e.to_string()))?;
    let original = (img.width(), img.height());
    img.apply_orientation(orientation);

    let rgb = flatten_onto_white(&img);
    let (w, h) = target_dimensions(rgb.width(), rgb.height(), max_width);
    let rgb = if (w, h) == (rgb.width(), rgb.height()) {
        rgb
    } else {
        debug!("Resizing {} to {}x{}", source.display(), w, h);
        image::imageops::resize(&rgb, w, h, FilterType::Lanczos3)
    };

    let write_err = |detail: String| ItemError::WriteFailed {
        path: output.to_path_buf(),
        detail,
    };
    let file = File::create(output).map_err(|e| write_err(e.to_string()))?;
    let encoder = JpegEncoder::new_with_quality(BufWriter::new(file), quality);
    rgb.write_with_encoder(encoder)
        .map_err(|e| write_err(e.to_string()))?;
    Ok((original, (rgb.width(), rgb.height())))
}

/// Back up the input directory, then swap each compressed page in for its PNG.
fn replace_originals(config: &CompressConfig, files: &[CompressedFile]) -> Result<usize, BookError> {
    let backup = &config.backup_dir;
    if backup.exists() {
        fs::remove_dir_all(backup).map_err(|e| BookError::io(backup, e))?;
    }
    copy_dir_all(&config.input_dir, backup).map_err(|e| BookError::io(backup, e))?;
    info!("Original images backed up to {}", backup.display());

    let mut replaced = 0;
    for file in files.iter().filter(|f| f.error.is_none()) {
        if file.source.exists() {
            fs::remove_file(&file.source).map_err(|e| BookError::io(&file.source, e))?;
        }
        let Some(name) = file.output.file_name() else {
            continue;
        };
        let target = config.input_dir.join(name);
        fs::copy(&file.output, &target).map_err(|e| BookError::io(&target, e))?;
        replaced += 1;
    }
    info!(
        "Replaced {} images in {} with compressed versions",
        replaced,
        config.input_dir.display()
    );
    Ok(replaced)
}

fn list_pngs(dir: &Path) -> Result<Vec<PathBuf>, BookError> {
    if !dir.is_dir() {
        return Err(BookError::DirectoryNotFound {
            path: dir.to_path_buf(),
        });
    }
    let mut pngs = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| BookError::io(dir, e))? {
        let path = entry.map_err(|e| BookError::io(dir, e))?.path();
        let is_png = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("png"));
        if is_png && path.is_file() {
            pngs.push(path);
        }
    }
    pngs.sort();
    Ok(pngs)
}

fn jpeg_name(source: &Path) -> String {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{stem}.jpg")
}
