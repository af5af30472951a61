//! Label ↔ local-id bijection: free-list reuse, reserved prefix, trailing
//! compaction, and the logical tombstone layer on top of physical
//! allocation.
//!
//! Built on a bidirectional label/id map idiom generalized with the
//! free-list-first allocation and smallest-lid-reuse policy of a
//! generational entity allocator.

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::error::{Error, Result};

/// Marks a pool slot as physically free.
pub const SENTINEL: u64 = u64::MAX;

/// Status bit: the slot is logically deleted by the outer layer but still
/// physically allocated.
pub const TOMBSTONE: u64 = 1;

/// Slots are grown by this many entries beyond `next_id` on `initialize`.
pub const DEFAULT_GROWTH: u64 = 256;

/// Physical hole ratio crossing this threshold signals rebuild pressure to
/// an external coordinator (the manager itself takes no action).
pub const HOLE_RATIO_THRESHOLD: f64 = 0.3;

/// Logical zombie ratio crossing this threshold signals index-rebuild
/// pressure to an external coordinator.
pub const ZOMBIE_RATIO_THRESHOLD: f64 = 0.2;

/// One physical pool slot: the label occupying it (or [`SENTINEL`]) and an
/// opaque status word owned by the outer layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelEntity {
    /// Label occupying this slot, or `SENTINEL` if physically free.
    pub label: u64,
    /// Opaque status bits; bit 0 is [`TOMBSTONE`].
    pub status: u64,
}

impl LabelEntity {
    const FREE: Self = Self {
        label: SENTINEL,
        status: 0,
    };

    /// True if bit [`TOMBSTONE`] is set.
    #[must_use]
    pub const fn is_tombstoned(&self) -> bool {
        self.status & TOMBSTONE != 0
    }
}

/// Label↔local-id bijection with reserved prefix and free-list reuse.
///
/// Must be [`IdentifierManager::initialize`]d before any other operation;
/// all other operations on an uninitialized manager are a programmer error
/// and panic via `assert!` rather than returning an error, per the fatal
/// lifecycle-violation policy.
#[derive(Debug, Default)]
pub struct IdentifierManager {
    pool: Vec<LabelEntity>,
    label_map: FxHashMap<u64, u64>,
    free_ids: BTreeSet<u64>,
    reserved_id: u64,
    next_id: u64,
    initialized: bool,
}

impl IdentifierManager {
    /// Creates an empty, uninitialized manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn assert_initialized(&self) {
        assert!(
            self.initialized,
            "identifier manager used before initialize()"
        );
    }

    /// Idempotent: the first call adopts `pool`, grows it to at least
    /// `next_id + DEFAULT_GROWTH` slots, and scans `[reserved_id, next_id)`
    /// into the free set or label map. Subsequent calls are no-ops.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] iff `reserved_id > next_id`.
    pub fn initialize(
        &mut self,
        mut pool: Vec<LabelEntity>,
        reserved_id: u64,
        next_id: u64,
    ) -> Result<()> {
        if self.initialized {
            return Ok(());
        }
        if reserved_id > next_id {
            return Err(Error::InvalidArgument(format!(
                "reserved_id {reserved_id} exceeds next_id {next_id}"
            )));
        }
        let target_len = (next_id + DEFAULT_GROWTH) as usize;
        if pool.len() < target_len {
            pool.resize(target_len, LabelEntity::FREE);
        }
        let mut free_ids = BTreeSet::new();
        let mut label_map = FxHashMap::default();
        for lid in reserved_id..next_id {
            let entity = pool[lid as usize];
            if entity.label == SENTINEL {
                free_ids.insert(lid);
            } else {
                label_map.insert(entity.label, lid);
            }
        }
        self.pool = pool;
        self.free_ids = free_ids;
        self.label_map = label_map;
        self.reserved_id = reserved_id;
        self.next_id = next_id;
        self.initialized = true;
        Ok(())
    }

    fn grow_to(&mut self, lid: u64) {
        if lid as usize >= self.pool.len() {
            self.pool
                .resize(lid as usize + 1, LabelEntity::FREE);
        }
    }

    /// Allocates a fresh lid for `label`. `capacity` bounds `next_id` growth
    /// for this pool — it is the identifier manager's own notion of
    /// capacity (see spec §3's `[reserved_id, next_id) ≤ capacity`), not
    /// necessarily the same value as a store's business-level
    /// `max_elements`; callers that need a tighter, separately-reported
    /// bound (like [`crate::store::MemoryStore::add`]'s
    /// [`Error::OutOfRange`]) should pass a generous `capacity` here and
    /// enforce their own ceiling on the returned lid.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyExists`] if `label` is already mapped, or
    /// [`Error::ResourceExhausted`] if the free set is empty and `next_id`
    /// has reached `capacity`.
    pub fn alloc_id(&mut self, label: u64, capacity: u64) -> Result<u64> {
        self.assert_initialized();
        if self.label_map.contains_key(&label) {
            return Err(Error::AlreadyExists(format!(
                "label {label} already allocated"
            )));
        }
        let lid = if let Some(&smallest) = self.free_ids.iter().next() {
            self.free_ids.remove(&smallest);
            smallest
        } else if self.next_id < capacity {
            let lid = self.next_id;
            self.next_id += 1;
            lid
        } else {
            return Err(Error::ResourceExhausted(format!(
                "no free lid and next_id {} reached capacity {capacity}",
                self.next_id
            )));
        };
        self.grow_to(lid);
        self.pool[lid as usize] = LabelEntity { label, status: 0 };
        self.label_map.insert(label, lid);
        self.maybe_log_ratios();
        Ok(lid)
    }

    fn compact_trailing(&mut self) {
        while self.next_id > self.reserved_id && self.free_ids.contains(&(self.next_id - 1)) {
            self.free_ids.remove(&(self.next_id - 1));
            self.next_id -= 1;
        }
    }

    /// Frees the slot owned by `label`. No-op if `label` is absent.
    pub fn free_id(&mut self, label: u64) {
        self.assert_initialized();
        let Some(lid) = self.label_map.remove(&label) else {
            return;
        };
        self.pool[lid as usize] = LabelEntity::FREE;
        self.free_ids.insert(lid);
        self.compact_trailing();
        self.maybe_log_ratios();
    }

    /// Frees the slot at `lid`. No-op if `lid >= capacity`.
    ///
    /// Callers must not pass `lid < reserved_id` — this is undefined by
    /// contract and enforced here with a `debug_assert!` rather than a
    /// returned error, per the fatal-violation policy for reserved-range
    /// corruption.
    pub fn free_local_id(&mut self, lid: u64) {
        self.assert_initialized();
        if lid as usize >= self.pool.len() {
            return;
        }
        debug_assert!(
            lid >= self.reserved_id,
            "free_local_id({lid}) violates reserved range [0, {})",
            self.reserved_id
        );
        let label = self.pool[lid as usize].label;
        if label != SENTINEL {
            self.label_map.remove(&label);
        }
        self.pool[lid as usize] = LabelEntity::FREE;
        self.free_ids.insert(lid);
        self.compact_trailing();
        self.maybe_log_ratios();
    }

    /// Installs `label` at a fixed lid inside the reserved prefix. The only
    /// path that mutates `[0, reserved_id)`.
    ///
    /// # Panics
    ///
    /// Panics if `lid >= reserved_id`: a reserved-range violation is a
    /// programmer error, not a recoverable condition.
    pub fn set_reserved_id(&mut self, lid: u64, label: u64) {
        self.assert_initialized();
        assert!(
            lid < self.reserved_id,
            "set_reserved_id({lid}) outside reserved range [0, {})",
            self.reserved_id
        );
        self.grow_to(lid);
        self.pool[lid as usize].label = label;
        self.label_map.insert(label, lid);
    }

    /// Looks up the lid owning `label`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if `label` is unmapped.
    pub fn local_id(&self, label: u64) -> Result<u64> {
        self.assert_initialized();
        self.label_map
            .get(&label)
            .copied()
            .ok_or_else(|| Error::NotFound(format!("label {label} not found")))
    }

    /// Returns the `(label, status)` pair for `label`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if `label` is unmapped.
    pub fn label_entity(&self, label: u64) -> Result<LabelEntity> {
        let lid = self.local_id(label)?;
        Ok(self.pool[lid as usize])
    }

    /// Returns the `(label, status)` pair stored at `lid`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if `lid` is out of range or physically
    /// free.
    pub fn local_entity(&self, lid: u64) -> Result<LabelEntity> {
        self.assert_initialized();
        let entity = self
            .pool
            .get(lid as usize)
            .copied()
            .ok_or_else(|| Error::NotFound(format!("lid {lid} out of range")))?;
        if entity.label == SENTINEL {
            return Err(Error::NotFound(format!("lid {lid} is physically free")));
        }
        Ok(entity)
    }

    /// Overwrites the status field for `label`. No-op if absent.
    pub fn set_label_status(&mut self, label: u64, status: u64) {
        if let Ok(lid) = self.local_id(label) {
            self.pool[lid as usize].status = status;
        }
    }

    /// Overwrites the status field at `lid`. No-op if out of range or free.
    pub fn set_local_id_status(&mut self, lid: u64, status: u64) {
        if let Some(entity) = self.pool.get_mut(lid as usize) {
            if entity.label != SENTINEL {
                entity.status = status;
            }
        }
    }

    /// Current allocation watermark (exclusive upper bound of the active
    /// range).
    #[must_use]
    pub const fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Reserved-prefix boundary.
    #[must_use]
    pub const fn reserved_id(&self) -> u64 {
        self.reserved_id
    }

    /// Read-only view of the pool.
    #[must_use]
    pub fn pool(&self) -> &[LabelEntity] {
        &self.pool
    }

    /// Read-only view of the label→lid map.
    #[must_use]
    pub fn label_map(&self) -> &FxHashMap<u64, u64> {
        &self.label_map
    }

    /// Read-only view of the free set.
    #[must_use]
    pub fn free_ids(&self) -> &BTreeSet<u64> {
        &self.free_ids
    }

    /// Iterator over every occupied lid in `[reserved_id, next_id)`.
    pub fn ids(&self) -> impl Iterator<Item = u64> + '_ {
        (self.reserved_id..self.next_id).filter(|&lid| self.pool[lid as usize].label != SENTINEL)
    }

    /// Physical hole ratio: `|free_ids| / (next_id - reserved_id)`.
    #[must_use]
    pub fn hole_ratio(&self) -> f64 {
        let active = self.next_id.saturating_sub(self.reserved_id);
        if active == 0 {
            return 0.0;
        }
        self.free_ids.len() as f64 / active as f64
    }

    /// Logical zombie ratio: tombstoned occupied slots over occupied slots.
    #[must_use]
    pub fn zombie_ratio(&self) -> f64 {
        let mut occupied = 0u64;
        let mut tombstoned = 0u64;
        for lid in self.reserved_id..self.next_id {
            let entity = self.pool[lid as usize];
            if entity.label != SENTINEL {
                occupied += 1;
                if entity.is_tombstoned() {
                    tombstoned += 1;
                }
            }
        }
        if occupied == 0 {
            return 0.0;
        }
        tombstoned as f64 / occupied as f64
    }

    fn maybe_log_ratios(&self) {
        let hole = self.hole_ratio();
        let zombie = self.zombie_ratio();
        if hole >= HOLE_RATIO_THRESHOLD {
            debug!(
                hole_ratio = hole,
                free_count = self.free_ids.len(),
                active_count = self.next_id - self.reserved_id,
                "physical hole ratio crossed rebuild threshold"
            );
        }
        if zombie >= ZOMBIE_RATIO_THRESHOLD {
            debug!(
                zombie_ratio = zombie,
                "logical zombie ratio crossed rebuild threshold"
            );
        }
    }
}


// =========================================================================
// Property-based tests: invariants P1-P5 and P7 from the testable-
// properties list, checked after random sequences of alloc/free against a
// fresh manager.
// =========================================================================
#[cfg(test)]
mod proptest_tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone, Copy)]
    enum Op {
        Alloc(u64),
        FreeByLabel(u64),
        FreeByLid(u64),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u64..20).prop_map(Op::Alloc),
            (0u64..20).prop_map(Op::FreeByLabel),
            (0u64..40).prop_map(Op::FreeByLid),
        ]
    }

    fn check_invariants(mgr: &IdentifierManager) {
        // P1: bijection over the active range.
        for (&label, &lid) in mgr.label_map() {
            assert_eq!(mgr.pool()[lid as usize].label, label);
        }
        for lid in mgr.reserved_id()..mgr.next_id() {
            let entity = mgr.pool()[lid as usize];
            if entity.label != SENTINEL {
                assert_eq!(mgr.label_map().get(&entity.label), Some(&lid));
            }
        }
        // P2: every free id is within the active range and physically free.
        for &lid in mgr.free_ids() {
            assert!(mgr.reserved_id() <= lid && lid < mgr.next_id());
            assert_eq!(mgr.pool()[lid as usize].label, SENTINEL);
        }
        // P3: trailing compactness.
        assert!(
            mgr.next_id() == mgr.reserved_id()
                || !mgr.free_ids().contains(&(mgr.next_id() - 1))
        );
        // P7: nothing but `set_reserved_id` touches the reserved prefix;
        // this test never calls it, so the prefix must stay untouched.
        for lid in 0..mgr.reserved_id() {
            assert_eq!(mgr.pool()[lid as usize], LabelEntity::FREE);
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// P1-P3, P5: after any sequence of alloc/free operations against a
        /// fresh manager with a reserved prefix, the bijection, free-set
        /// domain, trailing-compactness, and status-cleanup invariants hold.
        #[test]
        fn invariants_hold_after_random_operations(ops in proptest::collection::vec(op_strategy(), 0..60)) {
            let mut mgr = IdentifierManager::new();
            mgr.initialize(Vec::new(), 3, 3).unwrap();
            for op in ops {
                match op {
                    Op::Alloc(label) => {
                        let _ = mgr.alloc_id(label, 1_000_000);
                    }
                    Op::FreeByLabel(label) => {
                        mgr.free_id(label);
                    }
                    Op::FreeByLid(lid) => {
                        if lid >= mgr.reserved_id() {
                            mgr.free_local_id(lid);
                            prop_assert_eq!(mgr.pool().get(lid as usize).map(|e| e.status), Some(0));
                        }
                    }
                }
                check_invariants(&mgr);
            }
        }

        /// P4: allocating right after at least one free returns the
        /// smallest currently-free lid.
        #[test]
        fn alloc_after_free_is_smallest_first(labels in proptest::collection::vec(0u64..30, 3..10)) {
            let mut mgr = IdentifierManager::new();
            mgr.initialize(Vec::new(), 0, 0).unwrap();
            let mut lids = Vec::new();
            for &label in &labels {
                if let Ok(lid) = mgr.alloc_id(label, 1_000_000) {
                    lids.push(lid);
                }
            }
            prop_assume!(lids.len() >= 2);
            for &lid in &lids[..lids.len() - 1] {
                mgr.free_local_id(lid);
            }
            if let Some(&expected) = mgr.free_ids().iter().next() {
                let got = mgr.alloc_id(9999, 1_000_000).unwrap();
                prop_assert_eq!(got, expected);
            }
        }
    }
}
