use crate::constants::{
    DEFAULT_QUALITY, MAX_QUALITY, MIN_QUALITY, SIZE_BUDGET_BYTES, SIZE_BUDGET_START_QUALITY,
    TARGET_MAX_DIMENSION,
};
use crate::error::{CompressionError, Result};
use crate::mime::ImageMime;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

const QUALITY_ALLOW_LIST: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/svg+xml"];
const SIZE_BUDGET_ALLOW_LIST: &[&str] = &["image/jpeg", "image/png", "image/webp", "image/jpg"];

/// Fixed compression policy: which types are accepted and how the
/// compressor is configured. Not user-tunable beyond choosing the profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum CompressionProfile {
    /// Width capped at 800px, JPEG quality 80.
    #[default]
    Quality,
    /// Longest side capped at 800px, output kept under 1 MiB.
    SizeBudget,
}

impl CompressionProfile {
    pub fn allowed_mime_types(&self) -> &'static [&'static str] {
        match self {
            CompressionProfile::Quality => QUALITY_ALLOW_LIST,
            CompressionProfile::SizeBudget => SIZE_BUDGET_ALLOW_LIST,
        }
    }

    /// Returns the parsed type when `declared` is on this profile's allow-list.
    pub fn accepts(&self, declared: &str) -> Option<ImageMime> {
        let declared = declared.trim().to_lowercase();
        if self.allowed_mime_types().contains(&declared.as_str()) {
            ImageMime::from_str(&declared).ok()
        } else {
            None
        }
    }

    pub fn options(&self) -> CompressionOptions {
        match self {
            CompressionProfile::Quality => CompressionOptions {
                quality: DEFAULT_QUALITY,
                max_width: Some(TARGET_MAX_DIMENSION),
                max_dimension: None,
                max_output_bytes: None,
            },
            CompressionProfile::SizeBudget => CompressionOptions {
                quality: SIZE_BUDGET_START_QUALITY,
                max_width: None,
                max_dimension: Some(TARGET_MAX_DIMENSION),
                max_output_bytes: Some(SIZE_BUDGET_BYTES),
            },
        }
    }
}

impl fmt::Display for CompressionProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompressionProfile::Quality => write!(f, "quality"),
            CompressionProfile::SizeBudget => write!(f, "size-budget"),
        }
    }
}

impl FromStr for CompressionProfile {
    type Err = CompressionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "quality" => Ok(CompressionProfile::Quality),
            "size-budget" | "size_budget" => Ok(CompressionProfile::SizeBudget),
            _ => Err(CompressionError::Config(format!("unknown profile: {}", s))),
        }
    }
}

/// Settings handed to the compressor for every image in a run.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressionOptions {
    /// JPEG quality (the starting quality for size-budget runs).
    pub quality: u8,
    /// Cap on width; height follows the aspect ratio.
    pub max_width: Option<u32>,
    /// Cap on the longest side.
    pub max_dimension: Option<u32>,
    /// Encoded output must not exceed this many bytes, if reachable.
    pub max_output_bytes: Option<u64>,
}

impl CompressionOptions {
    pub fn new(
        quality: Option<u8>,
        max_width: Option<u32>,
        max_dimension: Option<u32>,
        max_output_bytes: Option<u64>,
    ) -> Result<Self> {
        let quality = quality.unwrap_or(DEFAULT_QUALITY);
        if !(MIN_QUALITY..=MAX_QUALITY).contains(&quality) {
            return Err(CompressionError::InvalidQuality(quality));
        }

        Ok(Self {
            quality,
            max_width,
            max_dimension,
            max_output_bytes,
        })
    }
}

impl Default for CompressionOptions {
    fn default() -> Self {
        CompressionProfile::default().options()
    }
}
