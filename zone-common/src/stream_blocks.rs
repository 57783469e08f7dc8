//! Out-of-band stream blocks: byte ranges in shared pack files holding
//! large payloads, materialized on demand through the block codec.
//!
//! A streamed asset owns [`zoneforge_shared::STREAM_BLOCK_COUNT`]
//! consecutive entries in the zone's stream-file table. Entries record
//! where the compressed bytes live (`file_index` + byte range) and the
//! decompressed length, so a failed or short read stays local to one
//! block.

use hashbrown::HashMap;

use zoneforge_shared::SELF_PACK_INDEX;

use crate::codec;
use crate::error::{Result, ZoneError};
use crate::wire::{read_u16, read_u32, read_u64};

/// One stream-file table entry (22 bytes on the wire).
///
/// A zeroed entry (`file_index == 0`) marks an absent sub-block; streamed
/// assets always emit all [`STREAM_BLOCK_COUNT`] entries so the table stays
/// positionally aligned with the asset order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamFileEntry {
    /// Pack file number, or [`SELF_PACK_INDEX`] for the zone's own pack.
    pub file_index: u16,
    /// Start of the compressed byte range inside the pack file.
    pub offset: u64,
    /// End (exclusive) of the compressed byte range.
    pub offset_end: u64,
    /// Decompressed length recorded at build time.
    pub raw_len: u32,
}

impl StreamFileEntry {
    pub const SIZE: usize = 22;

    /// Whether this entry points at actual data.
    pub fn is_present(&self) -> bool {
        self.file_index != 0 && self.offset_end > self.offset
    }

    /// Compressed length of the block.
    pub fn compressed_len(&self) -> u64 {
        self.offset_end.saturating_sub(self.offset)
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..2].copy_from_slice(&self.file_index.to_le_bytes());
        bytes[2..10].copy_from_slice(&self.offset.to_le_bytes());
        bytes[10..18].copy_from_slice(&self.offset_end.to_le_bytes());
        bytes[18..22].copy_from_slice(&self.raw_len.to_le_bytes());
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        Some(Self {
            file_index: read_u16(bytes, 0)?,
            offset: read_u64(bytes, 2)?,
            offset_end: read_u64(bytes, 10)?,
            raw_len: read_u32(bytes, 18)?,
        })
    }
}

/// External byte-range reader over numbered pack files.
pub trait PackFileReader {
    /// Read `[offset, offset_end)` from the given pack file. A short read
    /// must be reported as an error, not padded.
    fn read_range(&self, file_index: u16, offset: u64, offset_end: u64)
    -> std::io::Result<Vec<u8>>;
}

/// Maps (asset index, sub-block) to its stream-file entry for one loaded
/// zone, and materializes blocks lazily through the codec.
#[derive(Debug, Default)]
pub struct StreamBlockIndex {
    entries: HashMap<(u32, u8), StreamFileEntry>,
}

impl StreamBlockIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one asset's sub-block entry. Absent entries are skipped so
    /// `locate` answers `None` for them.
    pub fn insert(&mut self, asset_index: u32, sub_index: u8, entry: StreamFileEntry) {
        if entry.is_present() {
            self.entries.insert((asset_index, sub_index), entry);
        }
    }

    /// Look up the pack location of one sub-block.
    pub fn locate(&self, asset_index: u32, sub_index: u8) -> Option<&StreamFileEntry> {
        self.entries.get(&(asset_index, sub_index))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fetch and decompress one sub-block.
    ///
    /// Returns `Ok(None)` when the block is absent. Failures (short read,
    /// codec mismatch) are local: the index is untouched and the call is
    /// safely retryable.
    pub fn materialize(
        &self,
        asset_index: u32,
        sub_index: u8,
        reader: &dyn PackFileReader,
    ) -> Result<Option<Vec<u8>>> {
        let Some(entry) = self.locate(asset_index, sub_index) else {
            return Ok(None);
        };
        let compressed = reader.read_range(entry.file_index, entry.offset, entry.offset_end)?;
        if compressed.len() as u64 != entry.compressed_len() {
            return Err(ZoneError::Codec(format!(
                "pack file {} returned {} bytes for range {}..{}",
                entry.file_index,
                compressed.len(),
                entry.offset,
                entry.offset_end
            )));
        }
        let raw = codec::decompress(&compressed, entry.raw_len as usize)?;
        Ok(Some(raw))
    }
}

/// Accumulates compressed stream blocks for a zone's own companion pack
/// file during a build.
#[derive(Debug)]
pub struct PackBuilder {
    file_index: u16,
    bytes: Vec<u8>,
}

impl PackBuilder {
    /// Pack builder targeting the zone's own companion pack.
    pub fn for_self_pack() -> Self {
        Self {
            file_index: SELF_PACK_INDEX,
            bytes: Vec::new(),
        }
    }

    /// Compress a raw block into the pack and return its table entry.
    pub fn append_block(&mut self, raw: &[u8]) -> StreamFileEntry {
        let offset = self.bytes.len() as u64;
        let compressed = codec::compress(raw);
        self.bytes.extend_from_slice(&compressed);
        StreamFileEntry {
            file_index: self.file_index,
            offset,
            offset_end: self.bytes.len() as u64,
            raw_len: raw.len() as u32,
        }
    }

    /// An absent entry for a missing sub-block.
    pub fn absent_block(&self) -> StreamFileEntry {
        StreamFileEntry::default()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Finished pack-file bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}
