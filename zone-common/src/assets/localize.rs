//! Localized string entries. The asset name is the localization key.

use crate::arena::ZoneArena;
use crate::buffer::ZoneBuffer;
use crate::cursor::ZoneCursor;
use crate::error::{Result, ZoneError};
use crate::wire::{read_u32, MARKER_FOLLOWS, WireRecord};

/// In-memory localized string entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalizeEntry {
    pub value: String,
}

/// Fixed-size localize wire record (8 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalizeRecord {
    pub value_marker: u32,
    pub name_marker: u32,
}

impl WireRecord for LocalizeRecord {
    const SIZE: usize = 8;

    fn serialize(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::SIZE);
        bytes.extend_from_slice(&self.value_marker.to_le_bytes());
        bytes.extend_from_slice(&self.name_marker.to_le_bytes());
        bytes
    }

    fn deserialize(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        Some(Self {
            value_marker: read_u32(bytes, 0)?,
            name_marker: read_u32(bytes, 4)?,
        })
    }
}

/// Write one localize entry: record, name, value.
pub fn write(entry: &LocalizeEntry, name: &str, buf: &mut ZoneBuffer) {
    buf.write_struct(&LocalizeRecord {
        value_marker: MARKER_FOLLOWS,
        name_marker: MARKER_FOLLOWS,
    });
    buf.write_str(name);
    buf.write_str(&entry.value);
}

/// Read one localize entry, mirroring [`write`].
pub fn read(cursor: &mut ZoneCursor<'_>, arena: &mut ZoneArena) -> Result<(String, LocalizeEntry)> {
    let record = cursor.read_single::<LocalizeRecord>()?;
    if record.value_marker != MARKER_FOLLOWS || record.name_marker != MARKER_FOLLOWS {
        return Err(ZoneError::Format(
            "localize record carries bad markers".to_string(),
        ));
    }
    let name = cursor.read_string(arena)?;
    let value = cursor.read_string(arena)?;
    Ok((
        arena.get_str(name).to_string(),
        LocalizeEntry {
            value: arena.get_str(value).to_string(),
        },
    ))
}

/// Serialize the flat canonical form.
pub fn canonical_bytes(name: &str, entry: &LocalizeEntry) -> Vec<u8> {
    let mut buf = ZoneBuffer::new();
    write(entry, name, &mut buf);
    let blob = buf.finish();
    blob[crate::buffer::ZONE_INDEX_SIZE..].to_vec()
}

/// Parse the flat canonical form.
pub fn parse_canonical(bytes: &[u8]) -> Result<(String, LocalizeEntry)> {
    let mut arena = ZoneArena::new();
    let mut cursor = ZoneCursor::open_flat(bytes);
    read(&mut cursor, &mut arena)
}

/// The synthesized safe default: an empty value, so a missing key renders
/// as nothing instead of failing the whole build.
pub fn default_entry() -> LocalizeEntry {
    LocalizeEntry {
        value: String::new(),
    }
}
