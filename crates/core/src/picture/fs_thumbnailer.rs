//! Filesystem-backed thumbnailer.
//!
//! Reads sources below a media root, writes scaled copies into a cache
//! directory and serves them under a base URL. Existing cache files are
//! reused, so repeated derivations are cheap.

use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use image::DynamicImage;

use super::thumbnails::{SourceImage, Thumbnail, ThumbnailError, ThumbnailOptions, Thumbnailer};

/// Local-disk [`Thumbnailer`].
#[derive(Debug, Clone)]
pub struct FsThumbnailer {
    media_root: PathBuf,
    cache_dir: PathBuf,
    base_url: String,
}

impl FsThumbnailer {
    pub fn new(
        media_root: impl Into<PathBuf>,
        cache_dir: impl Into<PathBuf>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            media_root: media_root.into(),
            cache_dir: cache_dir.into(),
            base_url: base_url.into(),
        }
    }
}

impl Thumbnailer for FsThumbnailer {
    fn get_thumbnail(
        &self,
        image: &SourceImage,
        options: &ThumbnailOptions,
    ) -> Result<Thumbnail, ThumbnailError> {
        let (width, height) = options.size;
        if width == 0 || image.width == 0 || image.height == 0 {
            return Err(ThumbnailError::InvalidRequest(format!(
                "cannot scale {}x{} to {width}x{height}",
                image.width, image.height
            )));
        }

        let source_path = self.media_root.join(&image.name);
        if !source_path.is_file() {
            return Err(ThumbnailError::SourceNotFound(
                source_path.to_string_lossy().into_owned(),
            ));
        }

        let focus = options
            .subject_location
            .as_deref()
            .and_then(parse_subject_location);
        let target_height = if height == 0 {
            scaled_height(image.width, image.height, width)
        } else {
            height
        };

        let name = thumbnail_name(&image.name, width, height, focus);
        let target_path = self.cache_dir.join(&name);
        if !target_path.is_file() {
            let source = image::open(&source_path)?;
            let scaled = if height == 0 {
                source.resize_exact(width, target_height, FilterType::Lanczos3)
            } else {
                crop_around(&source, width, height, focus)
            };
            if let Some(parent) = target_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            scaled.save(&target_path)?;
            tracing::debug!(path = %target_path.display(), "Thumbnail written");
        }

        Ok(Thumbnail {
            url: format!("{}/{}", self.base_url.trim_end_matches('/'), name),
            width,
            height: target_height,
            alias: String::new(),
        })
    }
}

fn scaled_height(source_width: u32, source_height: u32, width: u32) -> u32 {
    let height = (f64::from(source_height) * f64::from(width) / f64::from(source_width)).round();
    (height as u32).max(1)
}

/// Parse a `"x,y"` focal point.
fn parse_subject_location(value: &str) -> Option<(f64, f64)> {
    let (x, y) = value.split_once(',')?;
    Some((x.trim().parse().ok()?, y.trim().parse().ok()?))
}

/// Cache file name: `{stem}__{w}x{h}[_{x}-{y}].{ext}` next to the source's
/// relative directory.
fn thumbnail_name(source_name: &str, width: u32, height: u32, focus: Option<(f64, f64)>) -> String {
    let path = Path::new(source_name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    let ext = path
        .extension()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_else(|| "jpg".to_string());
    let crop = match focus {
        Some((x, y)) if height > 0 => format!("_{}-{}", x.round() as i64, y.round() as i64),
        _ => String::new(),
    };
    let file = format!("{stem}__{width}x{height}{crop}.{ext}");
    match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(dir) => format!("{}/{file}", dir.to_string_lossy()),
        None => file,
    }
}

/// Scale `source` to cover `width`x`height`, then cut that window centered
/// on the focal point (image center when unknown), clamped to the edges.
fn crop_around(source: &DynamicImage, width: u32, height: u32, focus: Option<(f64, f64)>) -> DynamicImage {
    let (sw, sh) = (f64::from(source.width()), f64::from(source.height()));
    let factor = (f64::from(width) / sw).max(f64::from(height) / sh);
    let scaled_w = ((sw * factor).round() as u32).max(width);
    let scaled_h = ((sh * factor).round() as u32).max(height);
    let scaled = source.resize_exact(scaled_w, scaled_h, FilterType::Lanczos3);

    let (fx, fy) = focus.unwrap_or((sw / 2.0, sh / 2.0));
    let left = clamp_offset(fx * factor - f64::from(width) / 2.0, scaled_w - width);
    let top = clamp_offset(fy * factor - f64::from(height) / 2.0, scaled_h - height);
    scaled.crop_imm(left, top, width, height)
}

fn clamp_offset(offset: f64, max: u32) -> u32 {
    offset.round().clamp(0.0, f64::from(max)) as u32
}
