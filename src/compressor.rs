use crate::constants::{
    MAX_IMAGE_DIMENSION, MIN_QUALITY, SIZE_BUDGET_MAX_ITERATIONS, SIZE_BUDGET_QUALITY_STEP,
    SIZE_BUDGET_SCALE_STEP,
};
use crate::error::{CompressionError, Result};
use crate::mime::ImageMime;
use crate::profile::{CompressionOptions, CompressionProfile};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType, GenericImageView};
use tracing::debug;

/// Re-encodes one image. Implementations are opaque to the workflow: they
/// receive the bytes the user selected and return JPEG bytes or an error.
pub trait Compressor: Send + Sync {
    fn compress(&self, source: &[u8], mime: ImageMime) -> Result<Vec<u8>>;
}

/// In-process compressor backed by the `image` crate.
#[derive(Debug, Clone, Default)]
pub struct ImageCompressor {
    options: CompressionOptions,
}

impl ImageCompressor {
    pub fn new(options: CompressionOptions) -> Self {
        Self { options }
    }

    pub fn for_profile(profile: CompressionProfile) -> Self {
        Self::new(profile.options())
    }

    pub fn options(&self) -> &CompressionOptions {
        &self.options
    }
}

impl Compressor for ImageCompressor {
    fn compress(&self, source: &[u8], mime: ImageMime) -> Result<Vec<u8>> {
        let img = load_image(source, mime)?;
        let img = resize_image(img, &self.options);

        match self.options.max_output_bytes {
            Some(budget) => encode_within_budget(img, self.options.quality, budget),
            None => encode_jpeg(&img, self.options.quality),
        }
    }
}

/// Decodes `source` using the declared type as a hint.
///
/// # Security
/// - Refuses images whose sides exceed `MAX_IMAGE_DIMENSION` so a tiny file
///   cannot expand into an enormous buffer during resize.
pub fn load_image(source: &[u8], mime: ImageMime) -> Result<DynamicImage> {
    let format = mime.to_image_format().ok_or_else(|| {
        CompressionError::UnsupportedFormat(format!("{} cannot be rasterized", mime))
    })?;

    let img = image::load_from_memory_with_format(source, format)?;

    let (width, height) = img.dimensions();
    if width > MAX_IMAGE_DIMENSION || height > MAX_IMAGE_DIMENSION {
        return Err(CompressionError::InvalidDimensions(
            width,
            height,
            MAX_IMAGE_DIMENSION,
        ));
    }

    Ok(img)
}

/// Shrinks the image to fit the configured caps, keeping the aspect ratio.
/// Images already inside the caps are returned untouched.
pub fn resize_image(img: DynamicImage, options: &CompressionOptions) -> DynamicImage {
    let mut img = img;

    if let Some(max_width) = options.max_width.filter(|&w| w > 0 && img.width() > w) {
        let (width, height) = fit_within(img.width(), img.height(), max_width, u32::MAX);
        debug!("Resizing {}x{} to {}x{}", img.width(), img.height(), width, height);
        img = img.resize_exact(width, height, FilterType::Lanczos3);
    }

    if let Some(max_dim) = options
        .max_dimension
        .filter(|&d| d > 0 && img.width().max(img.height()) > d)
    {
        let (width, height) = fit_within(img.width(), img.height(), max_dim, max_dim);
        debug!("Resizing {}x{} to {}x{}", img.width(), img.height(), width, height);
        img = img.resize_exact(width, height, FilterType::Lanczos3);
    }

    img
}

/// Largest size with the same aspect ratio that fits in `max_w` x `max_h`.
fn fit_within(width: u32, height: u32, max_w: u32, max_h: u32) -> (u32, u32) {
    let scale = f64::min(
        max_w as f64 / width as f64,
        max_h as f64 / height as f64,
    )
    .min(1.0);
    let new_w = ((width as f64 * scale).round() as u32).max(1);
    let new_h = ((height as f64 * scale).round() as u32).max(1);
    (new_w, new_h)
}

/// Encodes as baseline JPEG. Alpha is dropped.
pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let rgb = img.to_rgb8();
    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    encoder.encode(
        rgb.as_raw(),
        rgb.width(),
        rgb.height(),
        ExtendedColorType::Rgb8,
    )?;
    Ok(buf)
}

/// Lowers quality, then scale, until the output fits in `budget` bytes.
/// Gives up after a fixed number of attempts and returns the last encoding.
fn encode_within_budget(img: DynamicImage, start_quality: u8, budget: u64) -> Result<Vec<u8>> {
    let mut img = img;
    let mut quality = start_quality;
    let mut encoded = encode_jpeg(&img, quality)?;

    for _ in 0..SIZE_BUDGET_MAX_ITERATIONS {
        if encoded.len() as u64 <= budget {
            break;
        }

        if quality > SIZE_BUDGET_QUALITY_STEP + MIN_QUALITY {
            quality -= SIZE_BUDGET_QUALITY_STEP;
        } else {
            let width = ((img.width() as f32 * SIZE_BUDGET_SCALE_STEP) as u32).max(1);
            let height = ((img.height() as f32 * SIZE_BUDGET_SCALE_STEP) as u32).max(1);
            img = img.resize_exact(width, height, FilterType::Triangle);
        }

        debug!(
            "Output {} bytes over budget {}, retrying at quality {} ({}x{})",
            encoded.len(),
            budget,
            quality,
            img.width(),
            img.height()
        );
        encoded = encode_jpeg(&img, quality)?;
    }

    Ok(encoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        });
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_resize_caps_width_and_keeps_aspect() {
        let img = DynamicImage::new_rgb8(2000, 1500);
        let options = CompressionProfile::Quality.options();

        let img = resize_image(img, &options);

        assert_eq!(img.dimensions(), (800, 600));
    }

    #[test]
    fn test_resize_leaves_small_images_alone() {
        let img = DynamicImage::new_rgb8(640, 480);
        let options = CompressionProfile::Quality.options();

        let img = resize_image(img, &options);

        assert_eq!(img.dimensions(), (640, 480));
    }

    #[test]
    fn test_resize_width_cap_ignores_height() {
        let img = DynamicImage::new_rgb8(600, 3000);
        let options = CompressionProfile::Quality.options();

        let img = resize_image(img, &options);

        assert_eq!(img.dimensions(), (600, 3000));
    }

    #[test]
    fn test_resize_longest_side_cap() {
        let img = DynamicImage::new_rgb8(600, 3000);
        let options = CompressionProfile::SizeBudget.options();

        let img = resize_image(img, &options);

        assert_eq!(img.dimensions(), (160, 800));
    }

    #[test]
    fn test_compress_png_to_jpeg() {
        let source = png_bytes(1200, 900);
        let compressor = ImageCompressor::for_profile(CompressionProfile::Quality);

        let output = compressor.compress(&source, ImageMime::Png).unwrap();

        let decoded = image::load_from_memory(&output).unwrap();
        assert_eq!(image::guess_format(&output).unwrap(), ImageFormat::Jpeg);
        assert_eq!(decoded.dimensions(), (800, 600));
    }

    #[test]
    fn test_compress_rejects_corrupt_input() {
        let compressor = ImageCompressor::default();
        let result = compressor.compress(b"not really a jpeg", ImageMime::Jpeg);
        assert!(matches!(result, Err(CompressionError::ImageProcessing(_))));
    }

    #[test]
    fn test_compress_rejects_svg() {
        let compressor = ImageCompressor::default();
        let result = compressor.compress(b"<svg xmlns=\"http://www.w3.org/2000/svg\"/>", ImageMime::Svg);
        assert!(matches!(result, Err(CompressionError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_size_budget_is_respected() {
        let source = png_bytes(1000, 1000);
        let options = CompressionOptions::new(Some(95), None, Some(800), Some(100 * 1024)).unwrap();
        let compressor = ImageCompressor::new(options);

        let output = compressor.compress(&source, ImageMime::Png).unwrap();

        assert!(output.len() as u64 <= 100 * 1024);
    }

    #[test]
    fn test_fit_within() {
        assert_eq!(fit_within(2000, 1000, 800, 800), (800, 400));
        assert_eq!(fit_within(100, 50, 800, 800), (100, 50));
        assert_eq!(fit_within(10000, 1, 800, u32::MAX), (800, 1));
    }
}
