//! Per-session asset pool registry.
//!
//! One fixed-capacity pool per asset kind, addressable by stable slot.
//! Slot allocation is the only cross-session shared mutation and is
//! serialized by a per-pool mutex. Growth is permitted only during the
//! initialization phase, before any cross-asset references exist; after
//! the registry is sealed (or a pool has used its one growth), growth is
//! rejected. Pools are never shrunk.
//!
//! Assets are published to their slot only once fully constructed, so a
//! concurrent reader can never observe a half-built asset; an aborted load
//! leaves the registry populated only with complete assets.

use std::sync::{Arc, Mutex};

use hashbrown::HashMap;

use crate::asset::{Asset, AssetKind};
use crate::error::{Result, ZoneError};

/// Stable address of an asset inside its kind's pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId {
    pub kind: AssetKind,
    pub index: u32,
}

/// Per-kind pool capacities, overridable from build configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolCapacities([usize; AssetKind::COUNT]);

impl Default for PoolCapacities {
    fn default() -> Self {
        let mut caps = [0; AssetKind::COUNT];
        for kind in AssetKind::ALL {
            caps[kind.tag() as usize] = kind.default_capacity();
        }
        Self(caps)
    }
}

impl PoolCapacities {
    pub fn get(&self, kind: AssetKind) -> usize {
        self.0[kind.tag() as usize]
    }

    pub fn set(&mut self, kind: AssetKind, capacity: usize) {
        self.0[kind.tag() as usize] = capacity;
    }
}

struct PoolInner {
    entries: Vec<Option<Arc<Asset>>>,
    by_name: HashMap<String, u32>,
    capacity: usize,
    /// Growth window: closed by seal() or by the pool's single grow.
    grown: bool,
    sealed: bool,
}

struct Pool {
    inner: Mutex<PoolInner>,
}

impl Pool {
    fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(PoolInner {
                entries: Vec::with_capacity(capacity),
                by_name: HashMap::new(),
                capacity,
                grown: false,
                sealed: false,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PoolInner> {
        self.inner.lock().expect("asset pool mutex poisoned")
    }
}

/// Registry of per-kind asset pools for one session.
pub struct AssetPools {
    pools: [Pool; AssetKind::COUNT],
}

impl AssetPools {
    /// Registry with the default per-kind capacities.
    pub fn new() -> Self {
        Self::with_capacities(&PoolCapacities::default())
    }

    pub fn with_capacities(caps: &PoolCapacities) -> Self {
        Self {
            pools: AssetKind::ALL.map(|kind| Pool::new(caps.get(kind))),
        }
    }

    fn pool(&self, kind: AssetKind) -> &Pool {
        &self.pools[kind.tag() as usize]
    }

    /// Declared capacity of a kind's pool.
    pub fn capacity(&self, kind: AssetKind) -> usize {
        self.pool(kind).lock().capacity
    }

    /// Number of allocated slots in a kind's pool.
    pub fn live_count(&self, kind: AssetKind) -> usize {
        self.pool(kind).lock().entries.len()
    }

    /// Close the initialization phase: addresses are now considered stable
    /// for the remainder of the session, and growth is rejected.
    pub fn seal(&self) {
        for pool in &self.pools {
            pool.lock().sealed = true;
        }
    }

    /// Grow a pool's backing store. Allowed at most once per kind and only
    /// before the registry is sealed; previously allocated slots keep their
    /// contents.
    pub fn grow(&self, kind: AssetKind, new_capacity: usize) -> Result<()> {
        let mut inner = self.pool(kind).lock();
        if inner.sealed || inner.grown {
            return Err(ZoneError::PoolSealed { kind });
        }
        if new_capacity < inner.capacity {
            // Pools are never shrunk.
            return Err(ZoneError::PoolSealed { kind });
        }
        let additional = new_capacity - inner.entries.len();
        inner.entries.reserve_exact(additional);
        inner.capacity = new_capacity;
        inner.grown = true;
        Ok(())
    }

    /// Look up an asset slot by name.
    pub fn find(&self, kind: AssetKind, name: &str) -> Option<SlotId> {
        let inner = self.pool(kind).lock();
        inner.by_name.get(name).map(|&index| SlotId { kind, index })
    }

    /// Find an existing slot for `name`, or reserve a fresh one.
    ///
    /// Returns the slot and whether it was freshly reserved. A reserved
    /// slot holds no asset until [`AssetPools::commit`]; lookups through
    /// [`AssetPools::get`] answer `None` for it.
    pub fn find_or_reserve(&self, kind: AssetKind, name: &str) -> Result<(SlotId, bool)> {
        let mut inner = self.pool(kind).lock();
        if let Some(&index) = inner.by_name.get(name) {
            return Ok((SlotId { kind, index }, false));
        }
        if inner.entries.len() >= inner.capacity {
            return Err(ZoneError::PoolExhausted {
                kind,
                capacity: inner.capacity,
            });
        }
        let index = inner.entries.len() as u32;
        inner.entries.push(None);
        inner.by_name.insert(name.to_string(), index);
        Ok((SlotId { kind, index }, true))
    }

    /// Publish a fully constructed asset into its reserved slot.
    pub fn commit(&self, slot: SlotId, asset: Asset) {
        debug_assert_eq!(asset.kind(), slot.kind);
        let mut inner = self.pool(slot.kind).lock();
        inner.entries[slot.index as usize] = Some(Arc::new(asset));
    }

    /// Reserve-and-publish in one step. If the name already has a slot, the
    /// existing asset wins and the new one is dropped.
    pub fn insert(&self, asset: Asset) -> Result<SlotId> {
        let (slot, fresh) = self.find_or_reserve(asset.kind(), &asset.name)?;
        if fresh {
            self.commit(slot, asset);
        } else {
            tracing::debug!(kind = %slot.kind, name = %asset.name, "asset already pooled, keeping existing");
        }
        Ok(slot)
    }

    /// Fetch the asset at a slot. `None` for reserved-but-unpublished slots.
    pub fn get(&self, slot: SlotId) -> Option<Arc<Asset>> {
        let inner = self.pool(slot.kind).lock();
        inner.entries.get(slot.index as usize)?.clone()
    }

    pub fn get_by_name(&self, kind: AssetKind, name: &str) -> Option<Arc<Asset>> {
        let slot = self.find(kind, name)?;
        self.get(slot)
    }

    /// Snapshot of every published asset of a kind, in slot order.
    pub fn assets_of(&self, kind: AssetKind) -> Vec<Arc<Asset>> {
        let inner = self.pool(kind).lock();
        inner.entries.iter().flatten().cloned().collect()
    }
}

impl Default for AssetPools {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::AssetPayload;
    use crate::assets::raw_file::RawFile;

    fn raw(name: &str, data: &[u8]) -> Asset {
        Asset::new(
            name,
            AssetPayload::RawFile(RawFile {
                data: data.to_vec(),
            }),
        )
    }

    fn small_pools() -> AssetPools {
        let mut caps = PoolCapacities::default();
        caps.set(AssetKind::RawFile, 3);
        AssetPools::with_capacities(&caps)
    }

    #[test]
    fn test_insert_and_get() {
        let pools = small_pools();
        let slot = pools.insert(raw("a", &[1])).unwrap();
        assert_eq!(pools.get(slot).unwrap().name, "a");
        assert_eq!(pools.live_count(AssetKind::RawFile), 1);
    }

    #[test]
    fn test_insert_dedupes_by_name() {
        let pools = small_pools();
        let first = pools.insert(raw("a", &[1])).unwrap();
        let second = pools.insert(raw("a", &[2])).unwrap();
        assert_eq!(first, second);
        // Existing asset wins.
        match &pools.get(first).unwrap().payload {
            AssetPayload::RawFile(f) => assert_eq!(f.data, vec![1]),
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn test_pool_exhausted() {
        let pools = small_pools();
        for i in 0..3 {
            pools.insert(raw(&format!("r{i}"), &[])).unwrap();
        }
        let err = pools.insert(raw("overflow", &[])).unwrap_err();
        assert!(matches!(
            err,
            ZoneError::PoolExhausted {
                kind: AssetKind::RawFile,
                capacity: 3
            }
        ));
    }

    #[test]
    fn test_grow_preserves_slots() {
        let pools = small_pools();
        let slot = pools.insert(raw("keep", &[42])).unwrap();
        pools.grow(AssetKind::RawFile, 10).unwrap();
        assert_eq!(pools.capacity(AssetKind::RawFile), 10);
        match &pools.get(slot).unwrap().payload {
            AssetPayload::RawFile(f) => assert_eq!(f.data, vec![42]),
            other => panic!("unexpected payload {other:?}"),
        }
        // Capacity is actually usable after growth.
        for i in 0..9 {
            pools.insert(raw(&format!("g{i}"), &[])).unwrap();
        }
    }

    #[test]
    fn test_grow_after_seal_rejected() {
        let pools = small_pools();
        pools.seal();
        let err = pools.grow(AssetKind::RawFile, 10).unwrap_err();
        assert!(matches!(err, ZoneError::PoolSealed { .. }));
    }

    #[test]
    fn test_grow_only_once() {
        let pools = small_pools();
        pools.grow(AssetKind::RawFile, 10).unwrap();
        assert!(pools.grow(AssetKind::RawFile, 20).is_err());
    }

    #[test]
    fn test_shrink_rejected() {
        let pools = small_pools();
        assert!(pools.grow(AssetKind::RawFile, 1).is_err());
    }

    #[test]
    fn test_reserved_slot_invisible_until_commit() {
        let pools = small_pools();
        let (slot, fresh) = pools.find_or_reserve(AssetKind::RawFile, "pending").unwrap();
        assert!(fresh);
        assert!(pools.get(slot).is_none());
        pools.commit(slot, raw("pending", &[7]));
        assert!(pools.get(slot).is_some());
    }

    #[test]
    fn test_concurrent_allocation() {
        let pools = AssetPools::new();
        std::thread::scope(|scope| {
            for t in 0..4 {
                let pools = &pools;
                scope.spawn(move || {
                    for i in 0..50 {
                        pools.insert(raw(&format!("t{t}_{i}"), &[t as u8])).unwrap();
                    }
                });
            }
        });
        assert_eq!(pools.live_count(AssetKind::RawFile), 200);
    }
}
