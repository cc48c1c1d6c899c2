//! Shared engine types: result handles, sequences, per-row metadata.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Opaque backend handle identifying one result within the current result
/// set.  Only meaningful together with the generation it was delivered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResultIndex(pub u32);

impl fmt::Display for ResultIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An ordered, immutable result list.  Replaced wholesale, never edited.
pub type ResultSequence = Arc<[ResultIndex]>;

/// Build a [`ResultSequence`] from raw `u32` handles.
#[cfg(test)]
pub fn sequence_of(raw: impl IntoIterator<Item = u32>) -> ResultSequence {
    raw.into_iter().map(ResultIndex).collect()
}

/// What kind of filesystem entry a row refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntryKind {
    File,
    Dir,
    Symlink,
    #[default]
    Unknown,
}

/// Display metadata for one row, fetched lazily from the backend.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RowMetadata {
    pub path: String,
    /// Size in bytes; `None` when the backend could not stat the entry.
    pub size: Option<u64>,
    /// Modification time, unix seconds.
    pub modified: Option<i64>,
    /// Creation time, unix seconds.
    pub created: Option<i64>,
    pub kind: EntryKind,
}

impl RowMetadata {
    /// Final path component, or the whole path when it has none.
    pub fn name(&self) -> &str {
        let trimmed = self.path.trim_end_matches('/');
        match trimmed.rsplit_once('/') {
            Some((_, name)) if !name.is_empty() => name,
            _ => trimmed,
        }
    }
}

/// Failure of a `fetch_row_metadata` host call.  No part of a failed
/// response is trusted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("metadata backend unavailable: {0}")]
    Unavailable(String),
    #[error("backend has no entry for result {0}")]
    UnknownIndex(ResultIndex),
    #[error("metadata response has {got} rows for a request of {expected}")]
    Misaligned { expected: usize, got: usize },
}
