use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompressionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    ImageProcessing(#[from] image::ImageError),

    #[error("Invalid quality value: {0}. Must be between 1 and 100")]
    InvalidQuality(u8),

    #[error("Invalid image dimensions: {0}x{1}. Maximum allowed: {2}x{2}")]
    InvalidDimensions(u32, u32, u32),

    #[error("File too large: {0} bytes. Maximum allowed: {1} bytes")]
    FileTooLarge(u64, u64),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to create output directory: {0}")]
    DirectoryCreationFailed(PathBuf),

    #[error("No image files found in input path: {0}")]
    NoImageFilesFound(String),

    #[error("Batch has not been fully compressed: {0} of {1} images done")]
    BatchNotCompressed(usize, usize),

    #[error("Remote compression failed: {0}")]
    Remote(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Walkdir error: {0}")]
    WalkdirError(#[from] walkdir::Error),

    #[error("Glob pattern error: {0}")]
    GlobPattern(#[from] glob::PatternError),
}

impl From<reqwest::Error> for CompressionError {
    fn from(err: reqwest::Error) -> Self {
        CompressionError::Remote(err.to_string())
    }
}

impl From<toml::de::Error> for CompressionError {
    fn from(err: toml::de::Error) -> Self {
        CompressionError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CompressionError>;
