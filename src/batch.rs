//! Fixed-capacity, 64-byte-aligned vector slab.
//!
//! Uses the `Arena`/`ArenaChunk` raw-allocation pattern: manual
//! `std::alloc::{Layout, alloc, dealloc}` plus a `NonNull<u8>` and a `Drop`
//! impl that releases the same layout, rather than a plain `Vec<f32>`,
//! since slots here need an explicit 64-byte alignment guarantee.

use std::alloc::{alloc, dealloc, Layout};
use std::ptr::NonNull;

use tracing::error;

use crate::error::{Error, Result};

/// SIMD alignment boundary in bytes every vector slot is padded to.
pub const ALIGNMENT: usize = 64;

/// A single contiguous, 64-byte-aligned slab of `capacity * vector_byte_size`
/// bytes. Exclusive owner of its allocation: `Clone` is intentionally not
/// implemented, moves are free.
#[derive(Debug)]
pub struct VectorBatch {
    data: NonNull<u8>,
    layout: Layout,
    vector_byte_size: usize,
    capacity: usize,
}

// SAFETY: `VectorBatch` owns its allocation exclusively; no aliasing
// `NonNull<u8>` escapes the type.
unsafe impl Send for VectorBatch {}
unsafe impl Sync for VectorBatch {}

impl VectorBatch {
    /// Allocates a new slab of `capacity` slots, each `vector_byte_size`
    /// bytes, aligned to [`ALIGNMENT`]. Contents are left undefined —
    /// callers must `set` a slot before `at`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unavailable`] on allocation failure.
    pub fn init(vector_byte_size: usize, capacity: usize) -> Result<Self> {
        let size = vector_byte_size
            .checked_mul(capacity)
            .filter(|&s| s > 0)
            .ok_or_else(|| {
                Error::Unavailable(format!(
                    "invalid batch size: {vector_byte_size} * {capacity} overflows or is zero"
                ))
            })?;
        let layout = Layout::from_size_align(size, ALIGNMENT).map_err(|e| {
            Error::Unavailable(format!("invalid layout for batch of {size} bytes: {e}"))
        })?;
        // SAFETY: layout has non-zero size, validated above.
        let ptr = unsafe { alloc(layout) };
        let data = NonNull::new(ptr).ok_or_else(|| {
            error!(size, alignment = ALIGNMENT, "vector batch allocation failed");
            Error::Unavailable(format!("failed to allocate {size} bytes for vector batch"))
        })?;
        Ok(Self {
            data,
            layout,
            vector_byte_size,
            capacity,
        })
    }

    /// Capacity of this batch, in slots.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    fn slot_offset(&self, i: usize) -> Option<usize> {
        if i >= self.capacity {
            return None;
        }
        Some(i * self.vector_byte_size)
    }

    /// Returns the `vector_byte_size`-byte window at slot `i`, or an empty
    /// span if `i >= capacity`. Never panics.
    #[must_use]
    pub fn at(&self, i: usize) -> &[u8] {
        match self.slot_offset(i) {
            Some(offset) => unsafe {
                std::slice::from_raw_parts(self.data.as_ptr().add(offset), self.vector_byte_size)
            },
            None => &[],
        }
    }

    /// Copies exactly `vector_byte_size` bytes of `bytes` into slot `i`.
    /// No-op if `i >= capacity`.
    pub fn set(&mut self, i: usize, bytes: &[u8]) {
        let Some(offset) = self.slot_offset(i) else {
            return;
        };
        let len = self.vector_byte_size;
        unsafe {
            let dst = std::slice::from_raw_parts_mut(self.data.as_ptr().add(offset), len);
            dst.copy_from_slice(&bytes[..len]);
        }
    }

    /// Zero-fills slot `i`. No-op if `i >= capacity`.
    pub fn clear(&mut self, i: usize) {
        let Some(offset) = self.slot_offset(i) else {
            return;
        };
        let len = self.vector_byte_size;
        unsafe {
            std::ptr::write_bytes(self.data.as_ptr().add(offset), 0, len);
        }
    }
}

impl Drop for VectorBatch {
    fn drop(&mut self) {
        unsafe {
            dealloc(self.data.as_ptr(), self.layout);
        }
    }
}
