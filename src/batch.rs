use crate::accounting::size_reduction_percent;
use crate::error::{CompressionError, Result};
use crate::mime::{declared_mime_for_path, ImageMime};
use crate::notify::{Notification, Notifier};
use crate::profile::CompressionProfile;
use glob::glob;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// A file offered for upload, before validation.
#[derive(Debug, Clone)]
pub struct CandidateFile {
    pub name: String,
    /// Declared MIME type. `None` or empty marks a malformed entry.
    pub mime: Option<String>,
    pub bytes: Vec<u8>,
}

impl CandidateFile {
    pub fn new(name: impl Into<String>, mime: Option<&str>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.map(str::to_string),
            bytes,
        }
    }

    /// Reads a local file, declaring its type from the extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CompressionError::FileNotFound(path.to_path_buf()));
        }
        let bytes = fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());

        Ok(Self {
            name,
            mime: declared_mime_for_path(path),
            bytes,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressionResult {
    pub compressed: Vec<u8>,
    pub compressed_size: u64,
    pub size_reduction: i64,
}

impl CompressionResult {
    pub fn new(original_size: u64, compressed: Vec<u8>) -> Self {
        let compressed_size = compressed.len() as u64;
        Self {
            size_reduction: size_reduction_percent(original_size, compressed_size),
            compressed_size,
            compressed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStatus {
    Pending,
    Done,
}

#[derive(Debug, Clone)]
pub struct ImageItem {
    pub name: String,
    pub mime: ImageMime,
    pub source: Vec<u8>,
    pub original_size: u64,
    pub result: Option<CompressionResult>,
}

impl ImageItem {
    pub fn new(name: impl Into<String>, mime: ImageMime, source: Vec<u8>) -> Self {
        let original_size = source.len() as u64;
        Self {
            name: name.into(),
            mime,
            source,
            original_size,
            result: None,
        }
    }

    pub fn status(&self) -> ItemStatus {
        if self.result.is_some() {
            ItemStatus::Done
        } else {
            ItemStatus::Pending
        }
    }
}

/// Outcome of one upload round.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UploadReport {
    pub accepted: usize,
    pub rejected: Vec<String>,
    pub dropped: usize,
}

/// Ordered, user-selected images. Insertion order is upload order.
#[derive(Debug, Default, Clone)]
pub struct Batch {
    items: Vec<ImageItem>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates each candidate against the profile's allow-list and appends
    /// the accepted ones in presentation order.
    ///
    /// Each rejected file produces its own error notification. Entries with
    /// no declared type are dropped without one.
    pub fn add_files(
        &mut self,
        candidates: impl IntoIterator<Item = CandidateFile>,
        profile: CompressionProfile,
        notifier: &dyn Notifier,
    ) -> UploadReport {
        let mut report = UploadReport::default();

        for candidate in candidates {
            let declared = match candidate.mime.as_deref().map(str::trim) {
                Some(mime) if !mime.is_empty() => mime.to_string(),
                _ => {
                    debug!("Dropping {} with no declared type", candidate.name);
                    report.dropped += 1;
                    continue;
                }
            };

            match profile.accepts(&declared) {
                Some(mime) => {
                    self.items
                        .push(ImageItem::new(candidate.name, mime, candidate.bytes));
                    report.accepted += 1;
                }
                None => {
                    notifier.notify(Notification::error(format!(
                        "The file {} is not a valid image type.",
                        candidate.name
                    )));
                    report.rejected.push(candidate.name);
                }
            }
        }

        report
    }

    /// Removes the item at `index`, returning it. Results on the remaining
    /// items are untouched.
    pub fn remove(&mut self, index: usize) -> Option<ImageItem> {
        if index < self.items.len() {
            Some(self.items.remove(index))
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[ImageItem] {
        &self.items
    }

    pub fn get(&self, index: usize) -> Option<&ImageItem> {
        self.items.get(index)
    }

    pub fn completed_count(&self) -> usize {
        self.items
            .iter()
            .filter(|item| item.status() == ItemStatus::Done)
            .count()
    }

    /// True when the batch is non-empty and every item has a result.
    /// Derived on each call, so emptying the batch always resets it.
    pub fn is_complete(&self) -> bool {
        !self.items.is_empty() && self.completed_count() == self.items.len()
    }

    pub(crate) fn attach_result(&mut self, index: usize, result: CompressionResult) {
        if let Some(item) = self.items.get_mut(index) {
            item.result = Some(result);
        }
    }
}

/// Collects candidate paths from files, directories and glob patterns, in
/// the order the inputs were given. Directory entries are sorted by name.
pub fn collect_input_files(inputs: &[String], recursive: bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for input in inputs {
        let input_path = Path::new(input);

        if input_path.is_file() {
            files.push(input_path.to_path_buf());
        } else if input_path.is_dir() {
            let walker = if recursive {
                WalkDir::new(input_path)
            } else {
                WalkDir::new(input_path).max_depth(1)
            };

            for entry in walker
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'))
            {
                let entry = entry?;
                if entry.file_type().is_file() {
                    files.push(entry.into_path());
                }
            }
        } else {
            let mut matched = false;
            for entry in glob(input)?.flatten() {
                if entry.is_file() {
                    files.push(entry);
                    matched = true;
                }
            }
            if !matched {
                return Err(CompressionError::NoImageFilesFound(input.clone()));
            }
        }
    }

    Ok(files)
}
