//! Zone loader: reconstructs an asset graph from a serialized blob into a
//! session's pools.
//!
//! The load runs in three phases so no partially constructed asset is ever
//! visible to another reader:
//!
//! 1. **Read**: every asset is reconstructed into session-local memory
//!    (strings and bulk runs duplicated through the arena), consuming the
//!    blob in the exact order the writer emitted it. Streamed assets claim
//!    their stream-file table entries here.
//! 2. **Reserve + fixup**: each asset gets a pool slot (existing assets of
//!    the same identity win), the registry is sealed, and wire reference
//!    indices are resolved to slots.
//! 3. **Commit**: fully fixed-up assets are published to their slots.
//!
//! An error aborts before the commit phase, so a failed load leaves only
//! complete assets in the pools and the registry safe to discard.

use crate::arena::ZoneArena;
use crate::asset::{Asset, AssetKind, AssetLink, AssetPayload};
use crate::cursor::ZoneCursor;
use crate::dispatch;
use crate::error::{Result, ZoneError};
use crate::pool::{AssetPools, SlotId};
use crate::stream_blocks::StreamBlockIndex;

use zoneforge_shared::STREAM_BLOCK_COUNT;

/// A successfully loaded zone.
#[derive(Debug)]
pub struct LoadedZone {
    pub name: String,
    /// Pool slot per zone asset index; `None` for reference stubs that did
    /// not resolve against already loaded pools.
    pub assets: Vec<Option<SlotId>>,
    /// Lazily materialized stream blocks, keyed by zone asset index.
    pub blocks: StreamBlockIndex,
}

enum ReadEntry {
    Full(Asset),
    Reference { kind: AssetKind, name: String },
}

/// Loads zones into a shared pool registry. Each `load` call is an
/// independent reader session with its own arena and cursor; only slot
/// allocation touches shared state.
pub struct ZoneLoader<'a> {
    pools: &'a AssetPools,
}

impl<'a> ZoneLoader<'a> {
    pub fn new(pools: &'a AssetPools) -> Self {
        Self { pools }
    }

    /// Reconstruct the asset graph serialized in `blob`.
    pub fn load(&self, zone_name: &str, blob: &[u8]) -> Result<LoadedZone> {
        let mut arena = ZoneArena::new();
        let mut cursor = ZoneCursor::open(blob)?;
        let asset_count = cursor.index().asset_count;

        // Phase 1: sequential reconstruction.
        let mut entries: Vec<ReadEntry> = Vec::with_capacity(asset_count as usize);
        let mut blocks = StreamBlockIndex::new();
        for i in 0..asset_count {
            let (tag, referenced) = cursor
                .read_asset_header()
                .map_err(|e| e.in_zone(zone_name, i))?;
            let kind = AssetKind::from_tag(tag).ok_or_else(|| {
                ZoneError::Format(format!("unknown asset kind tag {tag}")).in_zone(zone_name, i)
            })?;
            if referenced {
                let name = cursor
                    .read_string(&mut arena)
                    .map_err(|e| e.in_zone(zone_name, i))?;
                entries.push(ReadEntry::Reference {
                    kind,
                    name: arena.get_str(name).to_string(),
                });
                continue;
            }
            let asset = dispatch::read_asset(kind, &mut cursor, &mut arena)
                .map_err(|e| e.in_zone(zone_name, i))?;
            if let AssetPayload::Image(image) = &asset.payload {
                if image.streamed {
                    for sub in 0..STREAM_BLOCK_COUNT {
                        let entry = cursor
                            .next_stream_file()
                            .map_err(|e| e.in_zone(zone_name, i))?;
                        blocks.insert(i, sub as u8, entry);
                    }
                }
            }
            entries.push(ReadEntry::Full(asset));
        }
        cursor.close();

        // Phase 2: slot reservation, then fixup against the sealed pools.
        let mut slots: Vec<Option<SlotId>> = Vec::with_capacity(entries.len());
        let mut fresh: Vec<bool> = Vec::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            match entry {
                ReadEntry::Full(asset) => {
                    let (slot, is_fresh) = self
                        .pools
                        .find_or_reserve(asset.kind(), &asset.name)
                        .map_err(|e| e.in_zone(zone_name, i as u32))?;
                    if !is_fresh {
                        tracing::debug!(
                            zone = zone_name,
                            asset = %asset.asset_ref(),
                            "already pooled, keeping existing"
                        );
                    }
                    slots.push(Some(slot));
                    fresh.push(is_fresh);
                }
                ReadEntry::Reference { kind, name } => {
                    let slot = self.pools.find(*kind, name);
                    if slot.is_none() {
                        tracing::warn!(
                            zone = zone_name,
                            kind = %kind,
                            name,
                            "referenced asset not present in pools"
                        );
                    }
                    slots.push(slot);
                    fresh.push(false);
                }
            }
        }

        // References are about to be taken: close the growth window.
        self.pools.seal();

        // Phase 3: resolve wire indices to slots, then publish.
        for (i, entry) in entries.iter_mut().enumerate() {
            if !fresh[i] {
                continue;
            }
            let ReadEntry::Full(asset) = entry else {
                continue;
            };
            fixup_links(zone_name, asset, &slots);
            let slot = slots[i].expect("fresh entry always has a slot");
            // Take the asset out of the entry; publish only when complete.
            let done = std::mem::replace(
                asset,
                Asset::new(
                    String::new(),
                    AssetPayload::RawFile(crate::assets::raw_file::RawFile { data: Vec::new() }),
                ),
            );
            self.pools.commit(slot, done);
        }

        tracing::info!(
            zone = zone_name,
            assets = asset_count,
            stream_blocks = blocks.len(),
            "zone loaded"
        );
        Ok(LoadedZone {
            name: zone_name.to_string(),
            assets: slots,
            blocks,
        })
    }
}

/// Resolve an asset's wire reference indices to pool slots.
fn fixup_links(zone_name: &str, asset: &mut Asset, slots: &[Option<SlotId>]) {
    let AssetPayload::Material(material) = &mut asset.payload else {
        return;
    };
    let resolve = |link: &AssetLink| -> AssetLink {
        match link {
            AssetLink::Index(index) => match slots.get(*index as usize).copied().flatten() {
                Some(slot) => AssetLink::Slot(slot),
                None => {
                    tracing::warn!(
                        zone = zone_name,
                        index,
                        "reference index does not resolve to a loaded asset"
                    );
                    AssetLink::None
                }
            },
            other => other.clone(),
        }
    };
    material.images = material.images.iter().map(resolve).collect();
    material.fallback = resolve(&material.fallback);
}
