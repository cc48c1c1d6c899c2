//! Sparse per-row metadata cache.
//!
//! Rows are keyed by [`ResultIndex`] and are only valid for the generation
//! they were fetched under.  A generation change wipes everything, because
//! the same integer handle may name a different file in the next result set.

use std::collections::{HashMap, HashSet};

use super::types::{ResultIndex, RowMetadata};

#[derive(Debug, Default)]
pub struct RowCache {
    generation: u64,
    rows: HashMap<ResultIndex, RowMetadata>,
    /// Indices with a fetch outstanding for the current generation.
    in_flight: HashSet<ResultIndex>,
}

impl RowCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn get(&self, index: ResultIndex) -> Option<&RowMetadata> {
        self.rows.get(&index)
    }

    pub fn contains(&self, index: ResultIndex) -> bool {
        self.rows.contains_key(&index)
    }

    pub fn is_in_flight(&self, index: ResultIndex) -> bool {
        self.in_flight.contains(&index)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[cfg(test)]
    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    /// Mark `index` as being fetched.  Returns `false` when it is already
    /// cached or already in flight, i.e. when no fetch should be issued.
    pub(crate) fn claim(&mut self, index: ResultIndex) -> bool {
        if self.rows.contains_key(&index) {
            return false;
        }
        self.in_flight.insert(index)
    }

    /// Write a positionally aligned batch.  Callers guarantee
    /// `indices.len() == rows.len()`.
    pub(crate) fn merge(&mut self, indices: &[ResultIndex], rows: Vec<RowMetadata>) {
        debug_assert_eq!(indices.len(), rows.len());
        for (&index, row) in indices.iter().zip(rows) {
            self.in_flight.remove(&index);
            self.rows.insert(index, row);
        }
    }

    /// Drop the in-flight marks of a failed batch so a later call may retry.
    pub(crate) fn release(&mut self, indices: &[ResultIndex]) {
        for index in indices {
            self.in_flight.remove(index);
        }
    }

    /// Forget every row and in-flight mark and adopt `generation`.
    pub fn reset(&mut self, generation: u64) {
        self.generation = generation;
        self.rows.clear();
        self.in_flight.clear();
    }
}
