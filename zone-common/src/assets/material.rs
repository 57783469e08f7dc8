//! Material assets.
//!
//! Materials are the reference-bearing kind: they point at images and
//! optionally at a fallback material (which may point back, so reference
//! cycles are legal). On the wire, references are explicit indices into
//! the zone's asset order; dropped references are written as
//! [`REF_NONE`]. The resolved image count is patched into the record after
//! the reference array is written, so a dropped dependency shrinks the
//! array instead of corrupting it.

use serde::{Deserialize, Serialize};

use crate::arena::ZoneArena;
use crate::asset::AssetLink;
use crate::buffer::ZoneBuffer;
use crate::cursor::ZoneCursor;
use crate::dispatch::RefTable;
use crate::error::{Result, ZoneError};
use crate::wire::{read_u32, MARKER_FOLLOWS, MARKER_NONE, REF_NONE, WireRecord};

/// In-memory material asset.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub sort_key: u32,
    pub surface_flags: u32,
    pub state_bits: u32,
    /// Technique set name; empty means none.
    pub technique: String,
    /// Image references, in map order.
    pub images: Vec<AssetLink>,
    /// Optional fallback material.
    pub fallback: AssetLink,
}

/// Fixed-size material wire record (28 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterialRecord {
    pub sort_key: u32,
    pub surface_flags: u32,
    pub state_bits: u32,
    pub image_count: u32,
    pub technique_marker: u32,
    pub fallback_ref: u32,
    pub name_marker: u32,
}

/// Byte offset of `image_count`, patched after the reference array.
const IMAGE_COUNT_OFFSET: usize = 12;

impl WireRecord for MaterialRecord {
    const SIZE: usize = 28;

    fn serialize(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::SIZE);
        bytes.extend_from_slice(&self.sort_key.to_le_bytes());
        bytes.extend_from_slice(&self.surface_flags.to_le_bytes());
        bytes.extend_from_slice(&self.state_bits.to_le_bytes());
        bytes.extend_from_slice(&self.image_count.to_le_bytes());
        bytes.extend_from_slice(&self.technique_marker.to_le_bytes());
        bytes.extend_from_slice(&self.fallback_ref.to_le_bytes());
        bytes.extend_from_slice(&self.name_marker.to_le_bytes());
        bytes
    }

    fn deserialize(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        Some(Self {
            sort_key: read_u32(bytes, 0)?,
            surface_flags: read_u32(bytes, 4)?,
            state_bits: read_u32(bytes, 8)?,
            image_count: read_u32(bytes, IMAGE_COUNT_OFFSET)?,
            technique_marker: read_u32(bytes, 16)?,
            fallback_ref: read_u32(bytes, 20)?,
            name_marker: read_u32(bytes, 24)?,
        })
    }
}

fn link_to_ref(link: &AssetLink, kind: crate::asset::AssetKind, refs: &RefTable) -> u32 {
    match link {
        AssetLink::Name(name) => refs.resolve(kind, name).unwrap_or(REF_NONE),
        AssetLink::Index(index) => *index,
        _ => REF_NONE,
    }
}

/// Write one material: record, name, technique, then the resolved image
/// reference array (count patched post hoc).
pub fn write(material: &Material, name: &str, refs: &RefTable, buf: &mut ZoneBuffer) {
    use crate::asset::AssetKind;

    let record = MaterialRecord {
        sort_key: material.sort_key,
        surface_flags: material.surface_flags,
        state_bits: material.state_bits,
        image_count: 0,
        technique_marker: if material.technique.is_empty() {
            MARKER_NONE
        } else {
            MARKER_FOLLOWS
        },
        fallback_ref: link_to_ref(&material.fallback, AssetKind::Material, refs),
        name_marker: MARKER_FOLLOWS,
    };
    let handle = buf.write_struct(&record);
    buf.write_str(name);
    if !material.technique.is_empty() {
        buf.write_str(&material.technique);
    }
    let mut written = 0u32;
    for link in &material.images {
        let index = link_to_ref(link, AssetKind::Image, refs);
        if index != REF_NONE {
            buf.write_ref(index);
            written += 1;
        }
    }
    buf.patch_u32(handle, IMAGE_COUNT_OFFSET, written);
}

/// Read one material, mirroring [`write`]. References come back as
/// [`AssetLink::Index`]; the loader's fixup pass resolves them to slots.
pub fn read(cursor: &mut ZoneCursor<'_>, arena: &mut ZoneArena) -> Result<(String, Material)> {
    let record = cursor.read_single::<MaterialRecord>()?;
    if record.name_marker != MARKER_FOLLOWS {
        return Err(ZoneError::Format(format!(
            "material record carries bad name marker {:#x}",
            record.name_marker
        )));
    }
    let name = cursor.read_string(arena)?;
    let technique = match record.technique_marker {
        MARKER_NONE => String::new(),
        MARKER_FOLLOWS => {
            let s = cursor.read_string(arena)?;
            arena.get_str(s).to_string()
        }
        other => {
            return Err(ZoneError::Format(format!(
                "material record carries bad technique marker {other:#x}"
            )));
        }
    };
    let mut images = Vec::with_capacity(record.image_count as usize);
    for _ in 0..record.image_count {
        images.push(AssetLink::Index(cursor.read_ref()?));
    }
    let fallback = match record.fallback_ref {
        REF_NONE => AssetLink::None,
        index => AssetLink::Index(index),
    };
    Ok((
        arena.get_str(name).to_string(),
        Material {
            sort_key: record.sort_key,
            surface_flags: record.surface_flags,
            state_bits: record.state_bits,
            technique,
            images,
            fallback,
        },
    ))
}

fn link_name(link: &AssetLink) -> Option<&str> {
    match link {
        AssetLink::Name(name) => Some(name),
        _ => None,
    }
}

/// Serialize the flat canonical form. References are by name here, since
/// zone-order indices only mean something inside one zone.
pub fn canonical_bytes(name: &str, material: &Material) -> Vec<u8> {
    let mut buf = ZoneBuffer::new();
    buf.write_str(name);
    buf.write_str(&material.technique);
    buf.write_struct(&material.sort_key);
    buf.write_struct(&material.surface_flags);
    buf.write_struct(&material.state_bits);
    let names: Vec<&str> = material.images.iter().filter_map(link_name).collect();
    buf.write_struct(&(names.len() as u32));
    for image in names {
        buf.write_str(image);
    }
    buf.write_str(link_name(&material.fallback).unwrap_or(""));
    let blob = buf.finish();
    blob[crate::buffer::ZONE_INDEX_SIZE..].to_vec()
}

/// Parse the flat canonical form.
pub fn parse_canonical(bytes: &[u8]) -> Result<(String, Material)> {
    let mut arena = ZoneArena::new();
    let mut cursor = ZoneCursor::open_flat(bytes);
    let name = cursor.read_string(&mut arena)?;
    let technique = cursor.read_string(&mut arena)?;
    let sort_key = cursor.read_single::<u32>()?;
    let surface_flags = cursor.read_single::<u32>()?;
    let state_bits = cursor.read_single::<u32>()?;
    let image_count = cursor.read_single::<u32>()?;
    let mut images = Vec::with_capacity(image_count as usize);
    for _ in 0..image_count {
        let image = cursor.read_string(&mut arena)?;
        images.push(AssetLink::Name(arena.get_str(image).to_string()));
    }
    let fallback = cursor.read_string(&mut arena)?;
    let fallback = match arena.get_str(fallback) {
        "" => AssetLink::None,
        other => AssetLink::Name(other.to_string()),
    };
    Ok((
        arena.get_str(name).to_string(),
        Material {
            sort_key,
            surface_flags,
            state_bits,
            technique: arena.get_str(technique).to_string(),
            images,
            fallback,
        },
    ))
}

/// Human-authored material source document (JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialSource {
    #[serde(default)]
    pub technique: String,
    #[serde(default)]
    pub sort_key: u32,
    #[serde(default)]
    pub surface_flags: u32,
    #[serde(default)]
    pub state_bits: u32,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub fallback: Option<String>,
}

/// Parse the external JSON source form.
pub fn parse_external(text: &str) -> Result<Material> {
    let source: MaterialSource = serde_json::from_str(text)
        .map_err(|e| ZoneError::Format(format!("bad material source JSON: {e}")))?;
    Ok(Material {
        sort_key: source.sort_key,
        surface_flags: source.surface_flags,
        state_bits: source.state_bits,
        technique: source.technique,
        images: source.images.into_iter().map(AssetLink::Name).collect(),
        fallback: source.fallback.map_or(AssetLink::None, AssetLink::Name),
    })
}

/// Render the external JSON source form. Only name links survive; slot and
/// index links are resolved back to names by the caller before export.
pub fn to_external(material: &Material) -> String {
    let source = MaterialSource {
        technique: material.technique.clone(),
        sort_key: material.sort_key,
        surface_flags: material.surface_flags,
        state_bits: material.state_bits,
        images: material
            .images
            .iter()
            .filter_map(|l| link_name(l).map(str::to_string))
            .collect(),
        fallback: link_name(&material.fallback).map(str::to_string),
    };
    serde_json::to_string_pretty(&source).expect("material source serializes")
}
