//! Growing sequence of [`VectorBatch`]es addressed by local id.
//!
//! Follows a contiguous-buffer vector-store pattern and its sharded-growth
//! counterpart, generalized from a single growable `Vec<f32>` into a
//! sequence of fixed-size aligned batches so growth never invalidates
//! previously handed-out spans.

use tracing::debug;

use crate::batch::VectorBatch;
use crate::error::Result;

/// Owns `Vec<VectorBatch>` plus the geometry needed to translate a local id
/// into `(batch_index, slot_index)`.
#[derive(Debug)]
pub struct BatchedVectorStore {
    batches: Vec<VectorBatch>,
    batch_size: usize,
    vector_byte_size: usize,
}

impl BatchedVectorStore {
    /// Creates an empty store. No batches are materialized until the first
    /// `ensure_space`.
    #[must_use]
    pub fn new(batch_size: usize, vector_byte_size: usize) -> Self {
        Self {
            batches: Vec::new(),
            batch_size,
            vector_byte_size,
        }
    }

    fn coords(&self, lid: u64) -> (usize, usize) {
        let lid = lid as usize;
        (lid / self.batch_size, lid % self.batch_size)
    }

    /// Grows the batch sequence, if needed, until `lid` has backing
    /// storage.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unavailable`] if a new batch fails to allocate.
    pub fn ensure_space(&mut self, lid: u64) -> Result<()> {
        let (batch_index, _) = self.coords(lid);
        while batch_index >= self.batches.len() {
            let batch = VectorBatch::init(self.vector_byte_size, self.batch_size)?;
            self.batches.push(batch);
            debug!(
                batch_count = self.batches.len(),
                batch_size = self.batch_size,
                "vector store grew by one batch"
            );
        }
        Ok(())
    }

    /// Returns the vector span at `lid`, or `None` if no backing batch has
    /// been materialized yet (the caller maps this to `OutOfRange`).
    #[must_use]
    pub fn get(&self, lid: u64) -> Option<&[u8]> {
        let (batch_index, slot_index) = self.coords(lid);
        let batch = self.batches.get(batch_index)?;
        let span = batch.at(slot_index);
        if span.is_empty() {
            None
        } else {
            Some(span)
        }
    }

    /// Copies `bytes` into the slot backing `lid`. No-op if no backing
    /// batch exists yet — callers must `ensure_space` first.
    pub fn set(&mut self, lid: u64, bytes: &[u8]) {
        let (batch_index, slot_index) = self.coords(lid);
        if let Some(batch) = self.batches.get_mut(batch_index) {
            batch.set(slot_index, bytes);
        }
    }

    /// Zero-fills the slot backing `lid`. No-op if no backing batch exists.
    pub fn clear(&mut self, lid: u64) {
        let (batch_index, slot_index) = self.coords(lid);
        if let Some(batch) = self.batches.get_mut(batch_index) {
            batch.clear(slot_index);
        }
    }

    /// Number of materialized batches.
    #[must_use]
    pub fn batch_count(&self) -> usize {
        self.batches.len()
    }

    /// Total bytes currently allocated across all materialized batches.
    #[must_use]
    pub fn allocated_bytes(&self) -> usize {
        self.batches.len() * self.batch_size * self.vector_byte_size
    }

    /// Per-vector byte size this store was constructed with.
    #[must_use]
    pub const fn vector_byte_size(&self) -> usize {
        self.vector_byte_size
    }

    /// Slots per batch this store was constructed with.
    #[must_use]
    pub const fn batch_size(&self) -> usize {
        self.batch_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_space_grows_lazily() {
        let mut store = BatchedVectorStore::new(4, 8);
        assert_eq!(store.batch_count(), 0);
        store.ensure_space(0).unwrap();
        assert_eq!(store.batch_count(), 1);
        store.ensure_space(3).unwrap();
        assert_eq!(store.batch_count(), 1);
        store.ensure_space(4).unwrap();
        assert_eq!(store.batch_count(), 2);
    }

    #[test]
    fn get_without_backing_batch_is_none() {
        let store = BatchedVectorStore::new(4, 8);
        assert!(store.get(0).is_none());
    }

    #[test]
    fn set_then_get_round_trips_across_batch_boundary() {
        let mut store = BatchedVectorStore::new(2, 4);
        store.ensure_space(3).unwrap();
        store.set(3, &[9, 9, 9, 9]);
        assert_eq!(store.get(3), Some(&[9, 9, 9, 9][..]));
        assert!(store.get(2).is_some());
    }

    #[test]
    fn clear_zero_fills_slot() {
        let mut store = BatchedVectorStore::new(2, 4);
        store.ensure_space(0).unwrap();
        store.set(0, &[1, 2, 3, 4]);
        store.clear(0);
        assert_eq!(store.get(0), Some(&[0, 0, 0, 0][..]));
    }
}
