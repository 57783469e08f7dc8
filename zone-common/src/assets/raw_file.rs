//! Raw file assets: opaque byte payloads (scripts, configs, shaders).

use crate::arena::ZoneArena;
use crate::buffer::{ZoneBuffer, ZoneStream};
use crate::cursor::ZoneCursor;
use crate::error::{Result, ZoneError};
use crate::wire::{read_u32, MARKER_FOLLOWS, MARKER_NONE, WireRecord};

/// In-memory raw file asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFile {
    pub data: Vec<u8>,
}

/// Fixed-size raw file wire record (12 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawFileRecord {
    pub len: u32,
    pub data_marker: u32,
    pub name_marker: u32,
}

impl WireRecord for RawFileRecord {
    const SIZE: usize = 12;

    fn serialize(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::SIZE);
        bytes.extend_from_slice(&self.len.to_le_bytes());
        bytes.extend_from_slice(&self.data_marker.to_le_bytes());
        bytes.extend_from_slice(&self.name_marker.to_le_bytes());
        bytes
    }

    fn deserialize(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        Some(Self {
            len: read_u32(bytes, 0)?,
            data_marker: read_u32(bytes, 4)?,
            name_marker: read_u32(bytes, 8)?,
        })
    }
}

fn record_for(file: &RawFile) -> RawFileRecord {
    RawFileRecord {
        len: file.data.len() as u32,
        data_marker: if file.data.is_empty() {
            MARKER_NONE
        } else {
            MARKER_FOLLOWS
        },
        name_marker: MARKER_FOLLOWS,
    }
}

/// Write one raw file: record, name, then the payload in the bulk stream.
pub fn write(file: &RawFile, name: &str, buf: &mut ZoneBuffer) {
    buf.write_struct(&record_for(file));
    buf.write_str(name);
    if !file.data.is_empty() {
        buf.push_stream(ZoneStream::Temp);
        buf.align(3);
        buf.write_bytes(&file.data);
        buf.pop_stream();
    }
}

/// Read one raw file, mirroring [`write`].
pub fn read(cursor: &mut ZoneCursor<'_>, arena: &mut ZoneArena) -> Result<(String, RawFile)> {
    let record = cursor.read_single::<RawFileRecord>()?;
    if record.name_marker != MARKER_FOLLOWS {
        return Err(ZoneError::Format(
            "raw file record carries bad name marker".to_string(),
        ));
    }
    let name = cursor.read_string(arena)?;
    let data = match record.data_marker {
        MARKER_NONE => Vec::new(),
        MARKER_FOLLOWS => {
            cursor.temp_align(3);
            let handle = cursor.read_temp_bytes(record.len as usize, arena)?;
            arena.get_bytes(handle).to_vec()
        }
        other => {
            return Err(ZoneError::Format(format!(
                "raw file record carries bad data marker {other:#x}"
            )));
        }
    };
    Ok((arena.get_str(name).to_string(), RawFile { data }))
}

/// Serialize the flat canonical form: record, name, data inline.
pub fn canonical_bytes(name: &str, file: &RawFile) -> Vec<u8> {
    let mut buf = ZoneBuffer::new();
    buf.write_struct(&record_for(file));
    buf.write_str(name);
    buf.write_bytes(&file.data);
    let blob = buf.finish();
    blob[crate::buffer::ZONE_INDEX_SIZE..].to_vec()
}

/// Parse the flat canonical form.
pub fn parse_canonical(bytes: &[u8]) -> Result<(String, RawFile)> {
    let mut arena = ZoneArena::new();
    let mut cursor = ZoneCursor::open_flat(bytes);
    let record = cursor.read_single::<RawFileRecord>()?;
    let name = cursor.read_string(&mut arena)?;
    let handle = cursor.read_virtual_bytes(record.len as usize, &mut arena)?;
    Ok((
        arena.get_str(name).to_string(),
        RawFile {
            data: arena.get_bytes(handle).to_vec(),
        },
    ))
}

/// The synthesized safe default: an empty file.
pub fn default_file() -> RawFile {
    RawFile { data: Vec::new() }
}
