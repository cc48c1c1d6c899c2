//! Batch loader — turns "these rows should be on screen" into deduplicated
//! background metadata fetches.
//!
//! Fetches run on worker threads so the event loop never blocks on the
//! backend.  Each completion is sent back as a [`LoaderUpdate`] tagged with
//! the generation it was issued under; the event loop hands it to
//! [`BatchLoader::apply`], which drops completions from older generations.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::cache::RowCache;
use super::types::{FetchError, ResultIndex, RowMetadata};

/// The backend's metadata host call.
///
/// The response must be positionally aligned with `indices`: element *i*
/// describes `indices[i]`.  Implementations are called from worker threads.
pub trait MetadataSource: Send + Sync + 'static {
    fn fetch_row_metadata(&self, indices: &[ResultIndex]) -> Result<Vec<RowMetadata>, FetchError>;
}

/// Completion of one batch, delivered to the event loop.
#[derive(Debug)]
pub struct LoaderUpdate {
    pub generation: u64,
    pub batch: u64,
    pub indices: Vec<ResultIndex>,
    pub result: Result<Vec<RowMetadata>, FetchError>,
}

/// What [`BatchLoader::apply`] did with a completion.
#[derive(Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Issued under an older generation; ignored.
    Stale,
    /// Rows written into the cache.
    Merged { rows: usize },
    /// The batch failed; its indices were released for retry.
    Failed { error: FetchError },
}

pub struct BatchLoader {
    cache: RowCache,
    source: Arc<dyn MetadataSource>,
    tx: mpsc::UnboundedSender<LoaderUpdate>,
    next_batch: u64,
}

impl BatchLoader {
    pub fn new(source: Arc<dyn MetadataSource>, tx: mpsc::UnboundedSender<LoaderUpdate>) -> Self {
        Self {
            cache: RowCache::new(),
            source,
            tx,
            next_batch: 0,
        }
    }

    pub fn cache(&self) -> &RowCache {
        &self.cache
    }

    pub fn get(&self, index: ResultIndex) -> Option<&RowMetadata> {
        self.cache.get(index)
    }

    pub fn generation(&self) -> u64 {
        self.cache.generation()
    }

    /// Fetch every index that is neither cached nor in flight, as a single
    /// batch.  Returns the batch id, or `None` when nothing was missing.
    pub fn ensure_loaded(&mut self, indices: impl IntoIterator<Item = ResultIndex>) -> Option<u64> {
        let missing: Vec<ResultIndex> = indices
            .into_iter()
            .filter(|&index| self.cache.claim(index))
            .collect();
        if missing.is_empty() {
            return None;
        }

        self.next_batch = self.next_batch.wrapping_add(1);
        let batch = self.next_batch;
        let generation = self.cache.generation();
        debug!(batch, generation, rows = missing.len(), "issuing metadata batch");

        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        std::thread::spawn(move || {
            let result = source.fetch_row_metadata(&missing);
            let _ = tx.send(LoaderUpdate {
                generation,
                batch,
                indices: missing,
                result,
            });
        });

        Some(batch)
    }

    /// Merge a completion into the cache.
    pub fn apply(&mut self, update: LoaderUpdate) -> LoadOutcome {
        let LoaderUpdate {
            generation,
            batch,
            indices,
            result,
        } = update;

        if generation != self.cache.generation() {
            debug!(batch, generation, "dropping metadata batch from an old generation");
            return LoadOutcome::Stale;
        }

        let error = match result {
            Ok(rows) if rows.len() == indices.len() => {
                let count = rows.len();
                self.cache.merge(&indices, rows);
                return LoadOutcome::Merged { rows: count };
            }
            Ok(rows) => FetchError::Misaligned {
                expected: indices.len(),
                got: rows.len(),
            },
            Err(error) => error,
        };

        warn!(batch, rows = indices.len(), %error, "metadata fetch failed");
        self.cache.release(&indices);
        LoadOutcome::Failed { error }
    }

    /// Invalidate everything for a new result set.
    pub fn reset(&mut self, generation: u64) {
        if !self.cache.is_empty() {
            debug!(generation, dropped = self.cache.len(), "row cache reset");
        }
        self.cache.reset(generation);
    }
}
