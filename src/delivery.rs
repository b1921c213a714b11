use crate::batch::Batch;
use crate::constants::{DOWNLOAD_EXTENSION, DOWNLOAD_NAME_PREFIX};
use crate::error::{CompressionError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Positional download name for the item at zero-based `index`.
///
/// Always `.jpg`: every compressor re-encodes to JPEG.
pub fn download_name(index: usize) -> String {
    format!("{}{}.{}", DOWNLOAD_NAME_PREFIX, index + 1, DOWNLOAD_EXTENSION)
}

/// Writes every compressed item into `output_dir` under its positional
/// name, in batch order. The batch must be fully compressed.
pub fn export_batch(batch: &Batch, output_dir: &Path) -> Result<Vec<PathBuf>> {
    if !batch.is_complete() {
        return Err(CompressionError::BatchNotCompressed(
            batch.completed_count(),
            batch.len(),
        ));
    }

    fs::create_dir_all(output_dir)
        .map_err(|_| CompressionError::DirectoryCreationFailed(output_dir.to_path_buf()))?;

    let mut written = Vec::with_capacity(batch.len());
    for (index, item) in batch.items().iter().enumerate() {
        if let Some(result) = &item.result {
            let path = output_dir.join(download_name(index));
            fs::write(&path, &result.compressed)?;
            debug!("Saved {} as {:?}", item.name, path);
            written.push(path);
        }
    }

    Ok(written)
}
