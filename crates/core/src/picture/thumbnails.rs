//! Thumbnail generation and `srcset` construction.

use serde::Serialize;

use super::PictureConfig;

/// Alias of the thumbnail generated at the source image's exact size.
pub const ORIGINAL_ALIAS: &str = "original";

/// A generated thumbnail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Thumbnail {
    pub url: String,
    pub width: u32,
    pub height: u32,
    pub alias: String,
}

/// A stored image as known to the media library.
#[derive(Debug, Clone)]
pub struct SourceImage {
    /// Storage name of the image, relative to the media root.
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// Focal point as `"x,y"` in source pixels, if set by an editor.
    pub subject_location: Option<String>,
}

/// Request passed to a [`Thumbnailer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailOptions {
    /// Target `(width, height)`; a zero height keeps the aspect ratio.
    pub size: (u32, u32),
    pub subject_location: Option<String>,
    /// Extra processor options, passed through untouched.
    pub extra: Vec<(String, String)>,
}

#[derive(Debug, thiserror::Error)]
pub enum ThumbnailError {
    #[error("source image not found: {0}")]
    SourceNotFound(String),

    #[error("image processing failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid thumbnail request: {0}")]
    InvalidRequest(String),
}

/// Produces (and caches) a thumbnail of one source image.
pub trait Thumbnailer {
    fn get_thumbnail(
        &self,
        image: &SourceImage,
        options: &ThumbnailOptions,
    ) -> Result<Thumbnail, ThumbnailError>;
}

/// An extra `<source>` type offered alongside the primary format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceType {
    pub mime_type: String,
    /// Suffix appended to each thumbnail URL, e.g. `.avif`.
    pub extension: String,
}

/// Extra output types enabled in the configuration, in render order.
pub fn extra_source_types(config: &PictureConfig) -> Vec<SourceType> {
    let mut types = Vec::new();
    if config.enable_avif {
        types.push(SourceType {
            mime_type: "image/avif".to_string(),
            extension: ".avif".to_string(),
        });
    }
    types
}

/// Build a `srcset` value: `"{url}{extension} {width}w"`, comma-joined.
pub fn get_srcset(extension: &str, thumbnails: &[Thumbnail]) -> String {
    thumbnails
        .iter()
        .map(|t| format!("{}{extension} {}w", t.url, t.width))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Generate thumbnails of `image` for every requested size.
///
/// `sizes` defaults to the configured alias table. With `include_original`
/// an extra `original` entry at the exact source size is requested so the
/// optimizer produces alternate formats for it as well. Targets wider than
/// the source are skipped. Thumbnailer failures are skipped unless
/// `config.debug` is set.
pub fn get_thumbnails<T: Thumbnailer + ?Sized>(
    thumbnailer: &T,
    image: &SourceImage,
    sizes: Option<Vec<(String, (u32, u32))>>,
    include_original: bool,
    extra: &[(String, String)],
    config: &PictureConfig,
) -> Result<Vec<Thumbnail>, ThumbnailError> {
    let mut sizes = sizes.unwrap_or_else(|| config.aliases.clone());
    if include_original {
        sizes.push((ORIGINAL_ALIAS.to_string(), (image.width, image.height)));
    }

    let mut thumbnails = Vec::with_capacity(sizes.len());
    for (alias, size) in sizes {
        if size.0 > image.width {
            continue;
        }
        let options = ThumbnailOptions {
            size,
            subject_location: image.subject_location.clone(),
            extra: extra.to_vec(),
        };
        match thumbnailer.get_thumbnail(image, &options) {
            Ok(thumb) => thumbnails.push(Thumbnail { alias, ..thumb }),
            Err(e) if config.debug => return Err(e),
            Err(e) => {
                tracing::debug!(image = %image.name, alias = %alias, error = %e, "Skipping thumbnail");
            }
        }
    }
    Ok(thumbnails)
}
