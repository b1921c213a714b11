//! Declared image MIME types and their mapping from file names.
//!
//! Validation is based on the type a file *declares*, not on sniffing its
//! content; the decoder is the one that finds out whether the bytes are real.

use crate::error::{CompressionError, Result};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Image types any profile may accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageMime {
    Jpeg,
    Png,
    Gif,
    Svg,
    WebP,
}

impl ImageMime {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageMime::Jpeg => "image/jpeg",
            ImageMime::Png => "image/png",
            ImageMime::Gif => "image/gif",
            ImageMime::Svg => "image/svg+xml",
            ImageMime::WebP => "image/webp",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ImageMime::Jpeg => "jpg",
            ImageMime::Png => "png",
            ImageMime::Gif => "gif",
            ImageMime::Svg => "svg",
            ImageMime::WebP => "webp",
        }
    }

    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_lowercase().as_str() {
            "jpg" | "jpeg" => Some(ImageMime::Jpeg),
            "png" => Some(ImageMime::Png),
            "gif" => Some(ImageMime::Gif),
            "svg" => Some(ImageMime::Svg),
            "webp" => Some(ImageMime::WebP),
            _ => None,
        }
    }

    /// Decoder hint for the `image` crate. SVG has none: it is a vector
    /// format the raster decoder cannot read.
    pub fn to_image_format(&self) -> Option<image::ImageFormat> {
        match self {
            ImageMime::Jpeg => Some(image::ImageFormat::Jpeg),
            ImageMime::Png => Some(image::ImageFormat::Png),
            ImageMime::Gif => Some(image::ImageFormat::Gif),
            ImageMime::WebP => Some(image::ImageFormat::WebP),
            ImageMime::Svg => None,
        }
    }
}

impl fmt::Display for ImageMime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageMime {
    type Err = CompressionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Ok(ImageMime::Jpeg),
            "image/png" => Ok(ImageMime::Png),
            "image/gif" => Ok(ImageMime::Gif),
            "image/svg+xml" => Ok(ImageMime::Svg),
            "image/webp" => Ok(ImageMime::WebP),
            _ => Err(CompressionError::UnsupportedFormat(s.to_string())),
        }
    }
}

/// The MIME type a local file declares, the way a browser fills in
/// `File.type`: known image extensions map to their type, other extensions
/// declare a generic binary type, and no extension declares nothing.
pub fn declared_mime_for_path(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?;
    let declared = match ext.to_lowercase().as_str() {
        "txt" | "md" => "text/plain",
        "pdf" => "application/pdf",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "avif" => "image/avif",
        other => match ImageMime::from_extension(other) {
            Some(mime) => mime.as_str(),
            None => "application/octet-stream",
        },
    };
    Some(declared.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_mime_from_str() {
        assert_eq!(ImageMime::from_str("image/jpeg").unwrap(), ImageMime::Jpeg);
        assert_eq!(ImageMime::from_str("image/jpg").unwrap(), ImageMime::Jpeg);
        assert_eq!(ImageMime::from_str("IMAGE/PNG").unwrap(), ImageMime::Png);
        assert_eq!(ImageMime::from_str("image/svg+xml").unwrap(), ImageMime::Svg);
        assert!(ImageMime::from_str("text/plain").is_err());
    }

    #[test]
    fn test_image_mime_from_extension() {
        assert_eq!(ImageMime::from_extension("JPG"), Some(ImageMime::Jpeg));
        assert_eq!(ImageMime::from_extension("webp"), Some(ImageMime::WebP));
        assert_eq!(ImageMime::from_extension("bmp"), None);
        assert_eq!(ImageMime::Svg.extension(), "svg");
    }

    #[test]
    fn test_svg_has_no_raster_format() {
        assert!(ImageMime::Svg.to_image_format().is_none());
        assert_eq!(
            ImageMime::Gif.to_image_format(),
            Some(image::ImageFormat::Gif)
        );
    }

    #[test]
    fn test_declared_mime_for_path() {
        assert_eq!(
            declared_mime_for_path(Path::new("a/photo.JPEG")).as_deref(),
            Some("image/jpeg")
        );
        assert_eq!(
            declared_mime_for_path(Path::new("notes.txt")).as_deref(),
            Some("text/plain")
        );
        assert_eq!(
            declared_mime_for_path(Path::new("blob.xyz")).as_deref(),
            Some("application/octet-stream")
        );
        assert_eq!(declared_mime_for_path(Path::new("README")), None);
    }
}
