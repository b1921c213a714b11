pub const DEFAULT_QUALITY: u8 = 80;
pub const MIN_QUALITY: u8 = 1;
pub const MAX_QUALITY: u8 = 100;

/// Width cap applied by the quality profile, and longest-side cap applied by
/// the size-budget profile.
pub const TARGET_MAX_DIMENSION: u32 = 800;

/// Size-budget profile: largest acceptable output (1 MiB).
pub const SIZE_BUDGET_BYTES: u64 = 1024 * 1024;
pub const SIZE_BUDGET_START_QUALITY: u8 = 90;
pub const SIZE_BUDGET_QUALITY_STEP: u8 = 10;
pub const SIZE_BUDGET_MAX_ITERATIONS: usize = 10;
pub const SIZE_BUDGET_SCALE_STEP: f32 = 0.8;

/// Uploads larger than this are rejected (10 MiB).
pub const MAX_UPLOAD_SIZE: u64 = 10 * 1024 * 1024;

/// Decoded images with a side longer than this are refused.
pub const MAX_IMAGE_DIMENSION: u32 = 16384;

pub const BYTES_PER_KIB: f64 = 1024.0;

pub const DOWNLOAD_NAME_PREFIX: &str = "compressed_image_";
pub const DOWNLOAD_EXTENSION: &str = "jpg";
pub const TEMP_NAME_PREFIX: &str = "compressed_";

pub const UPLOAD_FIELD_NAME: &str = "image";
pub const COMPRESS_ROUTE: &str = "/api/compress";
pub const TEMP_ROUTE_PREFIX: &str = "/temp";

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_TEMP_DIR: &str = "temp";
pub const DEFAULT_TEMP_MAX_AGE_SECS: u64 = 600;
pub const TEMP_SWEEP_INTERVAL_SECS: u64 = 60;

pub const PROGRESS_TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] {msg}";

// Notification texts
pub const MSG_NOTHING_TO_COMPRESS: &str = "Please upload some images to compress!";
pub const MSG_COMPRESSION_COMPLETE: &str = "Compression completed successfully!";
pub const MSG_COMPRESSION_FAILED: &str = "An error occurred while compressing images.";

// HTTP plain-text bodies
pub const MSG_NO_IMAGE: &str = "No image uploaded";
pub const MSG_INVALID_TYPE: &str = "Invalid file type. Only images are allowed.";
pub const MSG_COMPRESS_ERROR: &str = "Error compressing image";
