//! Size accounting for compression results.
//!
//! Sizes are reported in kibibytes (bytes / 1024). The reduction percentage
//! is computed from unrounded KiB values and rounded exactly once.

use crate::constants::BYTES_PER_KIB;

/// Byte length expressed in KiB, unrounded.
pub fn bytes_to_kib(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_KIB
}

/// Rounds to the nearest integer with halves going up (towards +inf).
pub fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

/// KiB rounded once, as reported to clients.
pub fn rounded_kib(bytes: u64) -> i64 {
    round_half_up(bytes_to_kib(bytes))
}

/// `round(((orig_kib - comp_kib) / orig_kib) * 100)`.
///
/// Negative when the output grew. An empty original yields 0.
pub fn size_reduction_percent(original_bytes: u64, compressed_bytes: u64) -> i64 {
    if original_bytes == 0 {
        return 0;
    }
    let original_kib = bytes_to_kib(original_bytes);
    let compressed_kib = bytes_to_kib(compressed_bytes);
    round_half_up(((original_kib - compressed_kib) / original_kib) * 100.0)
}

/// Format file size in human-readable format
///
/// # Arguments
/// * `bytes` - Size in bytes
///
/// # Returns
/// * Human-readable size string (e.g., "1.2 MB", "512 KB")
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: f64 = 1024.0;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= THRESHOLD && unit_index < UNITS.len() - 1 {
        size /= THRESHOLD;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}
