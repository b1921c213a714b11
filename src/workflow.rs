use crate::batch::{Batch, CompressionResult, ImageItem};
use crate::compressor::Compressor;
use crate::constants::{MSG_COMPRESSION_COMPLETE, MSG_COMPRESSION_FAILED, MSG_NOTHING_TO_COMPRESS};
use crate::error::CompressionError;
use crate::notify::{Notification, Notifier};
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tracing::{debug, error, info};

/// Terminal status of one run over a batch.
#[derive(Debug)]
pub enum RunOutcome {
    /// The batch was empty; nothing was attempted.
    NothingToCompress,
    /// Every item now carries a result.
    Completed { compressed: usize },
    /// Item `index` failed. Items before it keep their results; no item at
    /// or after it received one.
    Failed {
        index: usize,
        error: CompressionError,
    },
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed { .. })
    }
}

/// Drives a compressor over a batch, one call per item.
pub struct CompressionWorkflow<C: Compressor> {
    compressor: C,
    parallel: bool,
}

impl<C: Compressor> CompressionWorkflow<C> {
    pub fn new(compressor: C) -> Self {
        Self {
            compressor,
            parallel: false,
        }
    }

    /// Compress items on the rayon pool instead of one after another. The
    /// failure contract is unchanged. Items already in flight when an
    /// earlier item fails still finish, but their results are discarded;
    /// items not yet started past a known failure are skipped.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn compressor(&self) -> &C {
        &self.compressor
    }

    /// Compresses every item of `batch` in index order.
    ///
    /// Results are gathered into one slot per index and committed once the
    /// run stops, so a failure at index `k` attaches results to `0..k` only.
    /// Exactly one terminal notification is emitted.
    pub fn run(&self, batch: &mut Batch, notifier: &dyn Notifier) -> RunOutcome {
        if batch.is_empty() {
            notifier.notify(Notification::error(MSG_NOTHING_TO_COMPRESS));
            return RunOutcome::NothingToCompress;
        }

        let start_time = Instant::now();
        info!(
            "Compressing {} images ({})",
            batch.len(),
            if self.parallel { "parallel" } else { "sequential" }
        );

        let (slots, failure) = if self.parallel {
            self.fill_slots_parallel(batch.items())
        } else {
            self.fill_slots_sequential(batch.items())
        };

        let mut committed = 0;
        for (index, slot) in slots.into_iter().enumerate() {
            if let Some(result) = slot {
                batch.attach_result(index, result);
                committed += 1;
            }
        }

        match failure {
            Some((index, error)) => {
                error!(
                    "Compression of {} (index {}) failed: {}",
                    batch.get(index).map(|i| i.name.as_str()).unwrap_or("?"),
                    index,
                    error
                );
                notifier.notify(Notification::error(MSG_COMPRESSION_FAILED));
                RunOutcome::Failed { index, error }
            }
            None => {
                info!(
                    "Compressed {} images in {:?}",
                    committed,
                    start_time.elapsed()
                );
                notifier.notify(Notification::success(MSG_COMPRESSION_COMPLETE));
                RunOutcome::Completed {
                    compressed: committed,
                }
            }
        }
    }

    fn compress_item(&self, index: usize, item: &ImageItem) -> Result<CompressionResult, CompressionError> {
        let compressed = self.compressor.compress(&item.source, item.mime)?;
        let result = CompressionResult::new(item.original_size, compressed);
        debug!(
            "[{}] {}: {} -> {} bytes ({}%)",
            index, item.name, item.original_size, result.compressed_size, result.size_reduction
        );
        Ok(result)
    }

    fn fill_slots_sequential(&self, items: &[ImageItem]) -> SlotFill {
        let mut slots: Vec<Option<CompressionResult>> = vec![None; items.len()];

        for (index, item) in items.iter().enumerate() {
            match self.compress_item(index, item) {
                Ok(result) => slots[index] = Some(result),
                Err(e) => return (slots, Some((index, e))),
            }
        }

        (slots, None)
    }

    fn fill_slots_parallel(&self, items: &[ImageItem]) -> SlotFill {
        let first_failure = AtomicUsize::new(usize::MAX);
        let outcomes: Vec<Option<Result<CompressionResult, CompressionError>>> = items
            .par_iter()
            .enumerate()
            .map(|(index, item)| {
                if index > first_failure.load(Ordering::Relaxed) {
                    return None;
                }
                let outcome = self.compress_item(index, item);
                if outcome.is_err() {
                    first_failure.fetch_min(index, Ordering::Relaxed);
                }
                Some(outcome)
            })
            .collect();

        let mut slots: Vec<Option<CompressionResult>> = vec![None; items.len()];
        for (index, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Some(Ok(result)) => slots[index] = Some(result),
                // Outcomes past the first failure are never written.
                Some(Err(e)) => return (slots, Some((index, e))),
                // Skipped items always follow a failure returned above.
                None => {}
            }
        }

        (slots, None)
    }
}

type SlotFill = (Vec<Option<CompressionResult>>, Option<(usize, CompressionError)>);
