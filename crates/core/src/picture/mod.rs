//! Responsive image derivation.
//!
//! Turns a stored image plus layout hints into a [`ResponsiveImage`], the
//! data a template needs to render
//! `<picture><source type srcset>…<img src srcset sizes></picture>`.
//!
//! - [`breakpoints`]: grid breakpoints and the `sizes` expression.
//! - [`columns`]: layout inference from the CMS plugin tree.
//! - [`thumbnails`]: thumbnail generation and `srcset` values.
//! - [`fs_thumbnailer`]: a [`Thumbnailer`] writing to a local directory.

pub mod breakpoints;
pub mod columns;
pub mod fs_thumbnailer;
pub mod thumbnails;

use std::collections::HashMap;

use serde::Serialize;

pub use breakpoints::{fill_colsizes_upward, get_imgsizes, ColumnSizes};
pub use columns::{parse_colsizes, picture_column_sizes, PluginNode};
pub use fs_thumbnailer::FsThumbnailer;
pub use thumbnails::{
    extra_source_types, get_srcset, get_thumbnails, SourceImage, SourceType, Thumbnail,
    ThumbnailError, ThumbnailOptions, Thumbnailer, ORIGINAL_ALIAS,
};

/// Alias used for `<img src>` when present.
pub const DEFAULT_ALIAS: &str = "default";

/// Thumbnail alias table of the media library: `(alias, (width, height))`.
/// A zero height keeps the aspect ratio.
const DEFAULT_ALIASES: &[(&str, (u32, u32))] = &[
    ("colmd4", (260, 0)),
    ("colmd6", (380, 0)),
    // sm container minus padding, 2x small
    ("smcontainer", (520, 0)),
    (DEFAULT_ALIAS, (768, 0)),
    ("lgcontainer", (940, 0)),
    ("xlcontainer", (1140, 0)),
    ("xxlcontainer", (1296, 0)),
    ("lgcontainer@2x", (1872, 0)),
    ("xlcontainer@2x", (2232, 0)),
    ("xxlcontainer@2x", (2592, 0)),
    ("xxxl", (3840, 0)),
];

/// Settings for picture derivation.
#[derive(Debug, Clone)]
pub struct PictureConfig {
    pub aliases: Vec<(String, (u32, u32))>,
    pub default_alias: String,
    /// Re-raise thumbnailer failures instead of skipping them.
    pub debug: bool,
    /// Offer AVIF `<source>` elements.
    pub enable_avif: bool,
}

impl Default for PictureConfig {
    fn default() -> Self {
        Self {
            aliases: DEFAULT_ALIASES
                .iter()
                .map(|(alias, size)| (alias.to_string(), *size))
                .collect(),
            default_alias: DEFAULT_ALIAS.to_string(),
            debug: false,
            enable_avif: false,
        }
    }
}

impl PictureConfig {
    /// Load flags from environment variables; the alias table is fixed.
    ///
    /// | Env Var                     | Default |
    /// |-----------------------------|---------|
    /// | `THUMBNAIL_DEBUG`           | `false` |
    /// | `FDS_THUMBNAIL_ENABLE_AVIF` | `false` |
    pub fn from_env() -> Self {
        Self {
            debug: env_flag("THUMBNAIL_DEBUG"),
            enable_avif: env_flag("FDS_THUMBNAIL_ENABLE_AVIF"),
            ..Self::default()
        }
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

/// An alternate `<source>` of a picture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponsiveImageSource {
    pub mime_type: String,
    pub srcset: String,
}

/// Render-ready picture descriptor. All fields are empty when no picture
/// is available.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResponsiveImage {
    pub src: String,
    pub srcset: String,
    pub sizes: String,
    pub sources: Vec<ResponsiveImageSource>,
}

/// Assemble the picture descriptor from generated thumbnails.
pub fn get_responsive_image(
    thumbnails: &[Thumbnail],
    column_sizes: &ColumnSizes,
    config: &PictureConfig,
) -> ResponsiveImage {
    let by_alias: HashMap<&str, &Thumbnail> =
        thumbnails.iter().map(|t| (t.alias.as_str(), t)).collect();

    let sources = extra_source_types(config)
        .into_iter()
        .map(|source_type| ResponsiveImageSource {
            srcset: get_srcset(&source_type.extension, thumbnails),
            mime_type: source_type.mime_type,
        })
        .collect();

    let src = by_alias
        .get(config.default_alias.as_str())
        .or_else(|| by_alias.get(ORIGINAL_ALIAS))
        .map(|t| t.url.clone())
        .unwrap_or_default();

    ResponsiveImage {
        src,
        srcset: get_srcset("", thumbnails),
        sizes: get_imgsizes(column_sizes),
        sources,
    }
}

/// Derive the picture descriptor for an image plugin in one go.
pub fn responsive_picture<T: Thumbnailer + ?Sized>(
    thumbnailer: &T,
    image: &SourceImage,
    plugin: &PluginNode,
    config: &PictureConfig,
) -> Result<ResponsiveImage, ThumbnailError> {
    let thumbnails = get_thumbnails(thumbnailer, image, None, true, &[], config)?;
    let column_sizes = picture_column_sizes(plugin);
    Ok(get_responsive_image(&thumbnails, &column_sizes, config))
}
