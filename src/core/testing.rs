//! Test doubles for the engine.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::loader::MetadataSource;
use super::types::{EntryKind, FetchError, ResultIndex, RowMetadata};

/// Default row the stub serves for `index`.
pub fn row_for(index: ResultIndex) -> RowMetadata {
    RowMetadata {
        path: format!("/stub/{}", index.0),
        size: Some(u64::from(index.0)),
        modified: Some(i64::from(index.0)),
        created: None,
        kind: EntryKind::File,
    }
}

/// In-memory [`MetadataSource`] that records every call.
#[derive(Default)]
pub struct StubSource {
    overrides: Mutex<HashMap<ResultIndex, RowMetadata>>,
    calls: Mutex<Vec<Vec<ResultIndex>>>,
    failing: AtomicBool,
    truncating: AtomicBool,
}

impl StubSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: impl IntoIterator<Item = (u32, RowMetadata)>) -> Self {
        let source = Self::new();
        if let Ok(mut overrides) = source.overrides.lock() {
            overrides.extend(rows.into_iter().map(|(i, row)| (ResultIndex(i), row)));
        }
        source
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Drop the last row of every response.
    pub fn set_truncating(&self, truncating: bool) {
        self.truncating.store(truncating, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<Vec<ResultIndex>> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl MetadataSource for StubSource {
    fn fetch_row_metadata(&self, indices: &[ResultIndex]) -> Result<Vec<RowMetadata>, FetchError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(indices.to_vec());
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(FetchError::Unavailable("stub failure".into()));
        }
        let overrides = self.overrides.lock().map_err(|_| FetchError::Unavailable("poisoned".into()))?;
        let mut rows: Vec<RowMetadata> = indices
            .iter()
            .map(|&i| overrides.get(&i).cloned().unwrap_or_else(|| row_for(i)))
            .collect();
        if self.truncating.load(Ordering::SeqCst) {
            rows.pop();
        }
        Ok(rows)
    }
}
