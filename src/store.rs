//! Memory store facade: composes the identifier manager, the batched
//! vector store, and a vector-space descriptor behind a single
//! multi-reader/single-writer lock.
//!
//! Follows a `Database`/`Collection` composition pattern (a
//! `parking_lot::RwLock` guarding the mutable collection map) paired with
//! an `arc-swap` hot-swap pointer for atomically replacing a rebuilt index
//! without blocking readers.

use std::alloc::{alloc, dealloc, Layout};
use std::fmt;
use std::ops::Deref;
use std::ptr::NonNull;
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::RwLock;
use tracing::debug;

use crate::batch::ALIGNMENT;
use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::id_manager::{IdentifierManager, LabelEntity, TOMBSTONE};
use crate::registry::OperatorRegistry;
use crate::space::VectorSpace;
use crate::vector_store::BatchedVectorStore;

struct Inner {
    id_manager: IdentifierManager,
    vectors: BatchedVectorStore,
    snapshot_id: u64,
}

/// An owned copy of a stored vector, allocated on the same 64-byte
/// alignment boundary as the batch slot it was copied from.
///
/// A plain `Vec<u8>` returned from the global allocator makes no alignment
/// promise, so [`MemoryStore::get_vector_by_label`] and
/// [`MemoryStore::get_vector_by_id`] hand back this type instead —
/// satisfying the same 64-byte-aligned-span guarantee the borrowed view in
/// [`MemoryStoreView::get_vector_by_id`] gets for free from the batch.
pub struct AlignedVec {
    data: NonNull<u8>,
    layout: Layout,
    len: usize,
}

// SAFETY: `AlignedVec` owns its allocation exclusively; no aliasing
// `NonNull<u8>` escapes the type.
unsafe impl Send for AlignedVec {}
unsafe impl Sync for AlignedVec {}

impl AlignedVec {
    fn copy_from(src: &[u8]) -> Self {
        let len = src.len();
        let layout = Layout::from_size_align(len.max(1), ALIGNMENT)
            .expect("vector byte size never overflows isize::MAX");
        // SAFETY: layout has non-zero size.
        let ptr = unsafe { alloc(layout) };
        let data = NonNull::new(ptr).unwrap_or_else(|| std::alloc::handle_alloc_error(layout));
        // SAFETY: `data` points at `layout.size()` freshly allocated bytes,
        // `src` is `len <= layout.size()` bytes, the regions don't overlap.
        unsafe {
            std::ptr::copy_nonoverlapping(src.as_ptr(), data.as_ptr(), len);
        }
        Self { data, layout, len }
    }
}

impl Deref for AlignedVec {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        // SAFETY: `data` points at `len` initialized bytes for the life of `self`.
        unsafe { std::slice::from_raw_parts(self.data.as_ptr(), self.len) }
    }
}

impl Drop for AlignedVec {
    fn drop(&mut self) {
        // SAFETY: `layout` is the exact layout `data` was allocated with.
        unsafe {
            dealloc(self.data.as_ptr(), self.layout);
        }
    }
}

impl fmt::Debug for AlignedVec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

impl PartialEq for AlignedVec {
    fn eq(&self, other: &Self) -> bool {
        **self == **other
    }
}

impl PartialEq<[u8]> for AlignedVec {
    fn eq(&self, other: &[u8]) -> bool {
        **self == *other
    }
}

impl PartialEq<Vec<u8>> for AlignedVec {
    fn eq(&self, other: &Vec<u8>) -> bool {
        **self == other[..]
    }
}

fn encode(space: &VectorSpace, bytes: &[u8]) -> Result<Vec<u8>> {
    let raw = space.raw_vector_byte_size();
    if bytes.len() != raw {
        return Err(Error::InvalidArgument(format!(
            "expected {raw} bytes, got {}",
            bytes.len()
        )));
    }
    let mut buf = vec![0u8; space.aligned_vector_byte_size()];
    buf[..raw].copy_from_slice(bytes);
    if space.need_normalize_vector() {
        space.normalize(&mut buf);
    }
    Ok(buf)
}

fn ensure_in_range(config: &StoreConfig, lid: u64) -> Result<()> {
    if lid >= config.max_elements {
        return Err(Error::OutOfRange(format!(
            "lid {lid} >= max_elements {}",
            config.max_elements
        )));
    }
    Ok(())
}

fn add_locked(
    config: &StoreConfig,
    inner: &mut Inner,
    snapshot_id: u64,
    label: u64,
    encoded: &[u8],
) -> Result<u64> {
    // The id manager's own pool capacity is independent of this store's
    // `max_elements`; it is asked to grow without limit here so that
    // `max_elements` is enforced exactly once, below, as the
    // spec-mandated `OutOfRange` rather than a conflated
    // `ResourceExhausted`.
    let lid = inner.id_manager.alloc_id(label, u64::MAX)?;
    if let Err(e) = ensure_in_range(config, lid) {
        inner.id_manager.free_local_id(lid);
        return Err(e);
    }
    inner.vectors.ensure_space(lid)?;
    inner.vectors.set(lid, encoded);
    inner.snapshot_id = snapshot_id;
    debug!(op = "add", label, lid, snapshot_id, "stored vector");
    Ok(lid)
}

fn set_locked(inner: &mut Inner, snapshot_id: u64, label: u64, encoded: &[u8]) -> Result<()> {
    let lid = inner.id_manager.local_id(label)?;
    inner.vectors.ensure_space(lid)?;
    inner.vectors.set(lid, encoded);
    inner.snapshot_id = snapshot_id;
    debug!(op = "set", label, lid, snapshot_id, "overwrote vector");
    Ok(())
}

fn remove_by_label_locked(inner: &mut Inner, snapshot_id: u64, label: u64) {
    inner.id_manager.free_id(label);
    inner.snapshot_id = snapshot_id;
    debug!(op = "remove_by_label", label, snapshot_id, "removed");
}

fn remove_by_id_locked(inner: &mut Inner, snapshot_id: u64, lid: u64) {
    inner.id_manager.free_local_id(lid);
    inner.snapshot_id = snapshot_id;
    debug!(op = "remove_by_id", lid, snapshot_id, "removed");
}

fn tombstone_by_label_locked(inner: &mut Inner, snapshot_id: u64, label: u64) {
    inner.id_manager.set_label_status(label, TOMBSTONE);
    inner.snapshot_id = snapshot_id;
    debug!(op = "tombstone_by_label", label, snapshot_id, "tombstoned");
}

fn tombstone_by_id_locked(inner: &mut Inner, snapshot_id: u64, lid: u64) {
    inner.id_manager.set_local_id_status(lid, TOMBSTONE);
    inner.snapshot_id = snapshot_id;
    debug!(op = "tombstone_by_id", lid, snapshot_id, "tombstoned");
}

fn get_vector_by_id_locked<'a>(space: &VectorSpace, inner: &'a Inner, lid: u64) -> Result<&'a [u8]> {
    let span = inner
        .vectors
        .get(lid)
        .ok_or_else(|| Error::OutOfRange(format!("lid {lid} has no backing storage")))?;
    Ok(&span[..space.raw_vector_byte_size()])
}

/// The single object the index layer sees: label/lid operations, vector
/// storage, and snapshot bookkeeping composed behind one lock.
pub struct MemoryStore {
    config: StoreConfig,
    space: VectorSpace,
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Builds a store from `config`, resolving its vector space from
    /// `registry`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `config.validate()` fails, or
    /// [`Error::Unavailable`] if the requested kernels cannot be resolved.
    pub fn new(config: StoreConfig, registry: &OperatorRegistry) -> Result<Self> {
        config.validate()?;
        let space = VectorSpace::create(
            registry,
            config.space.dim,
            config.space.metric,
            config.space.element_type,
            config.space.simd_level,
        )?;
        let mut id_manager = IdentifierManager::new();
        id_manager.initialize(Vec::new(), config.reserved, config.reserved)?;
        let vectors = BatchedVectorStore::new(config.batch_size, space.aligned_vector_byte_size());
        Ok(Self {
            config,
            space,
            inner: RwLock::new(Inner {
                id_manager,
                vectors,
                snapshot_id: 0,
            }),
        })
    }

    /// The resolved vector-space descriptor.
    #[must_use]
    pub const fn space(&self) -> &VectorSpace {
        &self.space
    }

    /// Runs `f` with the shared (reader) lock held, allowing a caller to
    /// combine several read-only facade calls into one critical section.
    pub fn with_read<T>(&self, f: impl FnOnce(&MemoryStoreView<'_>) -> T) -> T {
        let guard = self.inner.read();
        f(&MemoryStoreView {
            config: &self.config,
            space: &self.space,
            inner: &guard,
        })
    }

    /// Runs `f` with the exclusive (writer) lock held, allowing a caller to
    /// extend a critical section over several related mutations (e.g.
    /// tombstoning a label and then conditionally removing it) so no other
    /// writer can interleave between them.
    pub fn with_write<T>(&self, f: impl FnOnce(&mut MemoryStoreMut<'_>) -> T) -> T {
        let mut guard = self.inner.write();
        let mut view = MemoryStoreMut {
            config: &self.config,
            space: &self.space,
            inner: &mut guard,
        };
        f(&mut view)
    }

    /// Allocates a lid for `label`, grows storage as needed, and stores
    /// `bytes`. `bytes` must be exactly `raw_vector_byte_size` long.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyExists`] if `label` is already mapped,
    /// [`Error::OutOfRange`] if the allocated lid would exceed
    /// `max_elements`, or [`Error::Unavailable`] if batch growth fails.
    pub fn add(&self, snapshot_id: u64, label: u64, bytes: &[u8]) -> Result<u64> {
        let encoded = encode(&self.space, bytes)?;
        let mut inner = self.inner.write();
        add_locked(&self.config, &mut inner, snapshot_id, label, &encoded)
    }

    /// Overwrites the vector stored for an already-allocated `label`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if `label` is unmapped.
    pub fn set(&self, snapshot_id: u64, label: u64, bytes: &[u8]) -> Result<()> {
        let encoded = encode(&self.space, bytes)?;
        let mut inner = self.inner.write();
        set_locked(&mut inner, snapshot_id, label, &encoded)
    }

    /// Frees the slot owned by `label`.
    pub fn remove_by_label(&self, snapshot_id: u64, label: u64) {
        remove_by_label_locked(&mut self.inner.write(), snapshot_id, label);
    }

    /// Frees the slot at `lid`.
    pub fn remove_by_id(&self, snapshot_id: u64, lid: u64) {
        remove_by_id_locked(&mut self.inner.write(), snapshot_id, lid);
    }

    /// Sets the `TOMBSTONE` status bit for `label` without freeing its lid.
    pub fn tombstone_by_label(&self, snapshot_id: u64, label: u64) {
        tombstone_by_label_locked(&mut self.inner.write(), snapshot_id, label);
    }

    /// Sets the `TOMBSTONE` status bit at `lid` without freeing it.
    pub fn tombstone_by_id(&self, snapshot_id: u64, lid: u64) {
        tombstone_by_id_locked(&mut self.inner.write(), snapshot_id, lid);
    }

    /// Returns the raw (unpadded) vector bytes stored for `label`, copied
    /// into a freshly 64-byte-aligned buffer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if `label` is unmapped, or
    /// [`Error::OutOfRange`] if the lid has no backing batch.
    pub fn get_vector_by_label(&self, label: u64) -> Result<AlignedVec> {
        let inner = self.inner.read();
        let lid = inner.id_manager.local_id(label)?;
        get_vector_by_id_locked(&self.space, &inner, lid).map(AlignedVec::copy_from)
    }

    /// Returns the raw (unpadded) vector bytes stored at `lid`, copied into
    /// a freshly 64-byte-aligned buffer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] if the lid has no backing batch.
    pub fn get_vector_by_id(&self, lid: u64) -> Result<AlignedVec> {
        let inner = self.inner.read();
        get_vector_by_id_locked(&self.space, &inner, lid).map(AlignedVec::copy_from)
    }

    /// Number of occupied lids in the active range.
    #[must_use]
    pub fn size(&self) -> usize {
        self.inner.read().id_manager.ids().count()
    }

    /// `size() * aligned_vector_byte_size`.
    #[must_use]
    pub fn bytes_size(&self) -> usize {
        self.size() * self.space.aligned_vector_byte_size()
    }

    /// Total bytes materialized across all batches.
    #[must_use]
    pub fn allocated_bytes(&self) -> usize {
        self.inner.read().vectors.allocated_bytes()
    }

    /// `allocated_bytes - bytes_size`.
    #[must_use]
    pub fn free_bytes(&self) -> usize {
        self.allocated_bytes().saturating_sub(self.bytes_size())
    }

    /// Number of vector-sized slots materialized across all batches.
    #[must_use]
    pub fn allocated_vector_size(&self) -> usize {
        self.allocated_bytes() / self.space.aligned_vector_byte_size().max(1)
    }

    /// `allocated_vector_size - size`.
    #[must_use]
    pub fn free_vector_size(&self) -> usize {
        self.allocated_vector_size().saturating_sub(self.size())
    }

    /// Number of occupied lids carrying the `TOMBSTONE` status bit.
    #[must_use]
    pub fn tombstones(&self) -> usize {
        let inner = self.inner.read();
        inner
            .id_manager
            .ids()
            .filter(|&lid| {
                inner
                    .id_manager
                    .local_entity(lid)
                    .is_ok_and(|e: LabelEntity| e.is_tombstoned())
            })
            .count()
    }

    /// Lids carrying the `TOMBSTONE` status bit.
    #[must_use]
    pub fn tombstone_local_ids(&self) -> Vec<u64> {
        let inner = self.inner.read();
        inner
            .id_manager
            .ids()
            .filter(|&lid| {
                inner
                    .id_manager
                    .local_entity(lid)
                    .is_ok_and(|e: LabelEntity| e.is_tombstoned())
            })
            .collect()
    }

    /// Labels carrying the `TOMBSTONE` status bit.
    #[must_use]
    pub fn tombstone_labels(&self) -> Vec<u64> {
        let inner = self.inner.read();
        inner
            .id_manager
            .ids()
            .filter_map(|lid| {
                let entity = inner.id_manager.local_entity(lid).ok()?;
                entity.is_tombstoned().then_some(entity.label)
            })
            .collect()
    }

    /// All occupied lids in `[reserved_id, next_id)`.
    #[must_use]
    pub fn ids(&self) -> Vec<u64> {
        self.inner.read().id_manager.ids().collect()
    }

    /// The most recently stamped `snapshot_id`.
    #[must_use]
    pub fn snapshot_id(&self) -> u64 {
        self.inner.read().snapshot_id
    }
}

/// A read-only view of a store's state, for combining several reads into
/// one critical section via [`MemoryStore::with_read`].
pub struct MemoryStoreView<'a> {
    config: &'a StoreConfig,
    space: &'a VectorSpace,
    inner: &'a Inner,
}

impl MemoryStoreView<'_> {
    /// See [`MemoryStore::size`].
    #[must_use]
    pub fn size(&self) -> usize {
        self.inner.id_manager.ids().count()
    }

    /// See [`MemoryStore::get_vector_by_label`]. Unlike the facade method,
    /// this borrows directly into the aligned batch rather than copying.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if `label` is unmapped, or
    /// [`Error::OutOfRange`] if the lid has no backing batch.
    pub fn get_vector_by_label(&self, label: u64) -> Result<&[u8]> {
        let lid = self.inner.id_manager.local_id(label)?;
        self.get_vector_by_id(lid)
    }

    /// See [`MemoryStore::get_vector_by_id`]. Unlike the facade method,
    /// this borrows directly into the aligned batch rather than copying.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] if the lid has no backing batch.
    pub fn get_vector_by_id(&self, lid: u64) -> Result<&[u8]> {
        get_vector_by_id_locked(self.space, self.inner, lid)
    }

    /// The active `config` this view's store was built from.
    #[must_use]
    pub const fn config(&self) -> &StoreConfig {
        self.config
    }
}

/// A mutable view of a store's state, for combining several related
/// mutations into one critical section via [`MemoryStore::with_write`] —
/// e.g. tombstoning a label, then conditionally removing it, without
/// letting another writer interleave.
pub struct MemoryStoreMut<'a> {
    config: &'a StoreConfig,
    space: &'a VectorSpace,
    inner: &'a mut Inner,
}

impl MemoryStoreMut<'_> {
    /// See [`MemoryStore::add`].
    ///
    /// # Errors
    ///
    /// See [`MemoryStore::add`].
    pub fn add(&mut self, snapshot_id: u64, label: u64, bytes: &[u8]) -> Result<u64> {
        let encoded = encode(self.space, bytes)?;
        add_locked(self.config, self.inner, snapshot_id, label, &encoded)
    }

    /// See [`MemoryStore::set`].
    ///
    /// # Errors
    ///
    /// See [`MemoryStore::set`].
    pub fn set(&mut self, snapshot_id: u64, label: u64, bytes: &[u8]) -> Result<()> {
        let encoded = encode(self.space, bytes)?;
        set_locked(self.inner, snapshot_id, label, &encoded)
    }

    /// See [`MemoryStore::remove_by_label`].
    pub fn remove_by_label(&mut self, snapshot_id: u64, label: u64) {
        remove_by_label_locked(self.inner, snapshot_id, label);
    }

    /// See [`MemoryStore::remove_by_id`].
    pub fn remove_by_id(&mut self, snapshot_id: u64, lid: u64) {
        remove_by_id_locked(self.inner, snapshot_id, lid);
    }

    /// See [`MemoryStore::tombstone_by_label`].
    pub fn tombstone_by_label(&mut self, snapshot_id: u64, label: u64) {
        tombstone_by_label_locked(self.inner, snapshot_id, label);
    }

    /// See [`MemoryStore::tombstone_by_id`].
    pub fn tombstone_by_id(&mut self, snapshot_id: u64, lid: u64) {
        tombstone_by_id_locked(self.inner, snapshot_id, lid);
    }

    /// See [`MemoryStoreView::get_vector_by_label`].
    ///
    /// # Errors
    ///
    /// See [`MemoryStoreView::get_vector_by_label`].
    pub fn get_vector_by_label(&self, label: u64) -> Result<&[u8]> {
        let lid = self.inner.id_manager.local_id(label)?;
        self.get_vector_by_id(lid)
    }

    /// See [`MemoryStoreView::get_vector_by_id`].
    ///
    /// # Errors
    ///
    /// See [`MemoryStoreView::get_vector_by_id`].
    pub fn get_vector_by_id(&self, lid: u64) -> Result<&[u8]> {
        get_vector_by_id_locked(self.space, self.inner, lid)
    }

    /// See [`MemoryStore::size`].
    #[must_use]
    pub fn size(&self) -> usize {
        self.inner.id_manager.ids().count()
    }
}

/// Hot-swappable pointer to a `MemoryStore`, used by an external
/// coordinator to atomically replace a store rebuilt from live entries
/// only, without blocking in-flight readers.
#[derive(Clone)]
pub struct MemoryStoreHandle(Arc<ArcSwap<MemoryStore>>);

impl MemoryStoreHandle {
    /// Wraps `store` in a hot-swappable handle.
    #[must_use]
    pub fn new(store: MemoryStore) -> Self {
        Self(Arc::new(ArcSwap::from_pointee(store)))
    }

    /// Returns a snapshot `Arc` to the current store.
    #[must_use]
    pub fn load(&self) -> Arc<MemoryStore> {
        self.0.load_full()
    }

    /// Atomically replaces the current store with `store`.
    pub fn swap(&self, store: MemoryStore) {
        self.0.store(Arc::new(store));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::global_registry;
    use crate::types::{ElementType, Metric, SimdLevel};

    fn test_store(reserved: u64, batch_size: usize) -> MemoryStore {
        let config = StoreConfig {
            reserved,
            batch_size,
            max_elements: 1024,
            space: crate::config::SpaceConfig {
                dim: 8,
                metric: Metric::L2,
                element_type: ElementType::Float32,
                simd_level: SimdLevel::Scalar,
            },
        };
        MemoryStore::new(config, global_registry()).unwrap()
    }

    fn vec_bytes(v: &[f32]) -> Vec<u8> {
        v.iter().flat_map(|x| x.to_le_bytes()).collect()
    }

    #[test]
    fn add_allocates_sequential_lids_past_reserved() {
        let store = test_store(5, 4);
        let a = store.add(100, 1, &vec_bytes(&[1.0; 8])).unwrap();
        let b = store.add(101, 2, &vec_bytes(&[2.0; 8])).unwrap();
        assert_eq!(a, 5);
        assert_eq!(b, 6);
        assert_eq!(store.size(), 2);
        assert_eq!(store.bytes_size(), 2 * 64);
        assert!(store.ids().len() >= 2);
    }

    #[test]
    fn add_then_get_round_trips_byte_for_byte() {
        let store = test_store(0, 4);
        let bytes = vec_bytes(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        let lid = store.add(1, 42, &bytes).unwrap();
        assert_eq!(store.get_vector_by_label(42).unwrap(), bytes);
        assert_eq!(store.get_vector_by_id(lid).unwrap(), bytes);
    }

    #[test]
    fn get_vector_by_label_and_by_id_are_64_byte_aligned() {
        let store = test_store(0, 4);
        let bytes = vec_bytes(&[1.0; 8]);
        let lid = store.add(1, 7, &bytes).unwrap();
        let by_label = store.get_vector_by_label(7).unwrap();
        let by_id = store.get_vector_by_id(lid).unwrap();
        assert_eq!(by_label.as_ptr() as usize % ALIGNMENT, 0);
        assert_eq!(by_id.as_ptr() as usize % ALIGNMENT, 0);
    }

    #[test]
    fn with_read_view_vector_is_also_64_byte_aligned() {
        let store = test_store(0, 4);
        let bytes = vec_bytes(&[1.0; 8]);
        let lid = store.add(1, 7, &bytes).unwrap();
        store.with_read(|view| {
            let span = view.get_vector_by_id(lid).unwrap();
            assert_eq!(span.as_ptr() as usize % ALIGNMENT, 0);
        });
    }

    #[test]
    fn scenario_duplicate_label_leaves_state_unchanged() {
        let store = test_store(0, 4);
        store.add(1, 100, &vec_bytes(&[1.0; 8])).unwrap();
        let err = store.add(2, 100, &vec_bytes(&[9.0; 8])).unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(_)));
        assert_eq!(store.snapshot_id(), 1);
    }

    #[test]
    fn scenario_tombstone_then_reload() {
        let store = test_store(0, 4);
        let bytes = vec_bytes(&[1.0; 8]);
        store.add(1, 200, &bytes).unwrap();
        store.tombstone_by_label(2, 200);
        assert_eq!(store.tombstone_labels(), vec![200]);
        assert_eq!(store.get_vector_by_label(200).unwrap(), bytes);
    }

    #[test]
    fn snapshot_id_is_written_on_every_mutation() {
        let store = test_store(0, 4);
        store.add(7, 1, &vec_bytes(&[1.0; 8])).unwrap();
        assert_eq!(store.snapshot_id(), 7);
        store.set(8, 1, &vec_bytes(&[2.0; 8])).unwrap();
        assert_eq!(store.snapshot_id(), 8);
    }

    #[test]
    fn out_of_range_lid_is_rejected() {
        let config = StoreConfig {
            reserved: 0,
            batch_size: 4,
            max_elements: 1,
            space: crate::config::SpaceConfig {
                dim: 8,
                metric: Metric::L2,
                element_type: ElementType::Float32,
                simd_level: SimdLevel::Scalar,
            },
        };
        let store = MemoryStore::new(config, global_registry()).unwrap();
        store.add(1, 1, &vec_bytes(&[1.0; 8])).unwrap();
        let err = store.add(2, 2, &vec_bytes(&[1.0; 8])).unwrap_err();
        assert!(matches!(err, Error::OutOfRange(_)));
    }

    #[test]
    fn hot_swap_handle_replaces_store_atomically() {
        let handle = MemoryStoreHandle::new(test_store(0, 4));
        handle.load().add(1, 1, &vec_bytes(&[1.0; 8])).unwrap();
        assert_eq!(handle.load().size(), 1);
        handle.swap(test_store(0, 4));
        assert_eq!(handle.load().size(), 0);
    }

    #[test]
    fn with_write_extends_critical_section_across_related_mutations() {
        let store = test_store(0, 4);
        let bytes = vec_bytes(&[1.0; 8]);
        store.with_write(|txn| {
            let lid = txn.add(1, 9, &bytes).unwrap();
            txn.tombstone_by_id(2, lid);
            // A second writer could never observe the label mapped but not
            // yet tombstoned: both mutations happen inside one lock hold.
            assert!(txn.get_vector_by_id(lid).is_ok());
        });
        assert_eq!(store.tombstone_labels(), vec![9]);
        assert_eq!(store.snapshot_id(), 2);
    }
}
