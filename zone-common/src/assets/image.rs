//! Image assets.
//!
//! An image either carries its pixel data inline (written to the bulk
//! stream) or is streamed: the pixels live out-of-band as
//! [`zoneforge_shared::STREAM_BLOCK_COUNT`] compressed sub-blocks in a pack
//! file, and the zone only records stream-file table entries for them.
//!
//! Pixel formats are opaque numeric tags; the engine stores and relays
//! them without interpretation.

use zoneforge_shared::STREAM_BLOCK_COUNT;

use crate::arena::ZoneArena;
use crate::buffer::{ZoneBuffer, ZoneStream};
use crate::cursor::ZoneCursor;
use crate::error::{Result, ZoneError};
use crate::source::ExternalImage;
use crate::stream_blocks::{PackBuilder, StreamFileEntry};
use crate::wire::{read_u16, read_u32, MARKER_FOLLOWS, MARKER_NONE, WireRecord};

/// Opaque pixel format tag for 8-bit RGBA, used by the synthesized default.
pub const PIXEL_FORMAT_RGBA8: u32 = 28;

/// Map type tags.
pub const MAP_TYPE_2D: u8 = 2;
pub const MAP_TYPE_3D: u8 = 3;
pub const MAP_TYPE_CUBE: u8 = 4;
pub const MAP_TYPE_ARRAY: u8 = 5;

/// Semantic tags.
pub const SEMANTIC_2D: u8 = 0;
pub const SEMANTIC_COLOR_MAP: u8 = 1;

/// Category tags.
pub const CATEGORY_AUTO_GENERATED: u8 = 1;
pub const CATEGORY_LOAD_FROM_FILE: u8 = 3;

/// Image flag: single mip level.
pub const FLAG_NOMIPMAPS: u8 = 0x01;

/// In-memory image asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    /// Opaque pixel format tag.
    pub format: u32,
    pub map_type: u8,
    pub semantic: u8,
    pub category: u8,
    pub flags: u8,
    pub width: u16,
    pub height: u16,
    pub depth: u16,
    pub elements: u16,
    pub level_count: u8,
    pub streamed: bool,
    /// Inline pixel data; `None` for streamed images.
    pub pixels: Option<Vec<u8>>,
    /// Build-side staging for streamed sub-block payloads, filled by
    /// acquisition from companion stream files. Always `None` after a load;
    /// loaded blocks are materialized through the stream-block index.
    pub stream_levels: [Option<Vec<u8>>; STREAM_BLOCK_COUNT],
}

/// Derive the flags the asset pipeline stamps on loaded images.
pub fn apply_loaded_flags(image: &mut Image) {
    if image.level_count <= 1 {
        image.flags |= FLAG_NOMIPMAPS;
    }
    if image.elements > 1 && image.map_type != MAP_TYPE_CUBE {
        image.map_type = MAP_TYPE_ARRAY;
    }
}

/// Fixed-size image wire record (30 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageRecord {
    pub format: u32,
    pub map_type: u8,
    pub semantic: u8,
    pub category: u8,
    pub flags: u8,
    pub width: u16,
    pub height: u16,
    pub depth: u16,
    pub elements: u16,
    pub level_count: u8,
    pub streamed: u8,
    pub data_len: u32,
    pub pixels_marker: u32,
    pub name_marker: u32,
}

impl WireRecord for ImageRecord {
    const SIZE: usize = 30;

    fn serialize(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::SIZE);
        bytes.extend_from_slice(&self.format.to_le_bytes());
        bytes.push(self.map_type);
        bytes.push(self.semantic);
        bytes.push(self.category);
        bytes.push(self.flags);
        bytes.extend_from_slice(&self.width.to_le_bytes());
        bytes.extend_from_slice(&self.height.to_le_bytes());
        bytes.extend_from_slice(&self.depth.to_le_bytes());
        bytes.extend_from_slice(&self.elements.to_le_bytes());
        bytes.push(self.level_count);
        bytes.push(self.streamed);
        bytes.extend_from_slice(&self.data_len.to_le_bytes());
        bytes.extend_from_slice(&self.pixels_marker.to_le_bytes());
        bytes.extend_from_slice(&self.name_marker.to_le_bytes());
        bytes
    }

    fn deserialize(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        Some(Self {
            format: read_u32(bytes, 0)?,
            map_type: bytes[4],
            semantic: bytes[5],
            category: bytes[6],
            flags: bytes[7],
            width: read_u16(bytes, 8)?,
            height: read_u16(bytes, 10)?,
            depth: read_u16(bytes, 12)?,
            elements: read_u16(bytes, 14)?,
            level_count: bytes[16],
            streamed: bytes[17],
            data_len: read_u32(bytes, 18)?,
            pixels_marker: read_u32(bytes, 22)?,
            name_marker: read_u32(bytes, 26)?,
        })
    }
}

fn record_for(image: &Image) -> ImageRecord {
    ImageRecord {
        format: image.format,
        map_type: image.map_type,
        semantic: image.semantic,
        category: image.category,
        flags: image.flags,
        width: image.width,
        height: image.height,
        depth: image.depth,
        elements: image.elements,
        level_count: image.level_count,
        streamed: image.streamed as u8,
        data_len: image.pixels.as_ref().map_or(0, |p| p.len() as u32),
        pixels_marker: if image.pixels.is_some() {
            MARKER_FOLLOWS
        } else {
            MARKER_NONE
        },
        name_marker: MARKER_FOLLOWS,
    }
}

fn image_from_record(record: &ImageRecord) -> Image {
    Image {
        format: record.format,
        map_type: record.map_type,
        semantic: record.semantic,
        category: record.category,
        flags: record.flags,
        width: record.width,
        height: record.height,
        depth: record.depth,
        elements: record.elements,
        level_count: record.level_count,
        streamed: record.streamed != 0,
        pixels: None,
        stream_levels: Default::default(),
    }
}

/// Write one image into the zone buffer: record, then name, then pixel
/// data in the bulk stream, then stream-file entries for streamed images.
pub fn write(image: &Image, name: &str, pack: &mut PackBuilder, buf: &mut ZoneBuffer) {
    buf.write_struct(&record_for(image));
    buf.write_str(name);
    if let Some(pixels) = &image.pixels {
        buf.push_stream(ZoneStream::Temp);
        buf.align(3);
        buf.write_bytes(pixels);
        buf.pop_stream();
    }
    if image.streamed {
        for level in &image.stream_levels {
            let entry = match level {
                Some(raw) => pack.append_block(raw),
                None => StreamFileEntry::default(),
            };
            buf.write_streamfile(entry);
        }
    }
}

/// Read one image, mirroring [`write`] exactly. Stream-file entries are
/// consumed by the loader, not here.
pub fn read(cursor: &mut ZoneCursor<'_>, arena: &mut ZoneArena) -> Result<(String, Image)> {
    let record = cursor.read_single::<ImageRecord>()?;
    if record.name_marker != MARKER_FOLLOWS {
        return Err(ZoneError::Format(format!(
            "image record carries bad name marker {:#x}",
            record.name_marker
        )));
    }
    let name = cursor.read_string(arena)?;
    let mut image = image_from_record(&record);
    match record.pixels_marker {
        MARKER_NONE => {}
        MARKER_FOLLOWS => {
            cursor.temp_align(3);
            let pixels = cursor.read_temp_bytes(record.data_len as usize, arena)?;
            image.pixels = Some(arena.get_bytes(pixels).to_vec());
        }
        other => {
            return Err(ZoneError::Format(format!(
                "image record carries bad pixel marker {other:#x}"
            )));
        }
    }
    Ok((arena.get_str(name).to_string(), image))
}

/// Serialize the flat canonical form: record, name, then pixels inline.
pub fn canonical_bytes(name: &str, image: &Image) -> Vec<u8> {
    let mut buf = ZoneBuffer::new();
    buf.write_struct(&record_for(image));
    buf.write_str(name);
    if let Some(pixels) = &image.pixels {
        buf.write_bytes(pixels);
    }
    let blob = buf.finish();
    blob[crate::buffer::ZONE_INDEX_SIZE..].to_vec()
}

/// Parse the flat canonical form.
pub fn parse_canonical(bytes: &[u8]) -> Result<(String, Image)> {
    let mut arena = ZoneArena::new();
    let mut cursor = ZoneCursor::open_flat(bytes);
    let record = cursor.read_single::<ImageRecord>()?;
    let name = cursor.read_string(&mut arena)?;
    let mut image = image_from_record(&record);
    match record.pixels_marker {
        MARKER_NONE => {}
        MARKER_FOLLOWS => {
            let pixels = cursor.read_virtual_bytes(record.data_len as usize, &mut arena)?;
            image.pixels = Some(arena.get_bytes(pixels).to_vec());
        }
        other => {
            return Err(ZoneError::Format(format!(
                "image record carries bad pixel marker {other:#x}"
            )));
        }
    }
    Ok((arena.get_str(name).to_string(), image))
}

/// Build an image from externally decoded pixels.
pub fn from_external(ext: ExternalImage) -> Image {
    let mut image = Image {
        format: ext.format,
        map_type: MAP_TYPE_2D,
        semantic: SEMANTIC_COLOR_MAP,
        category: CATEGORY_LOAD_FROM_FILE,
        flags: 0,
        width: ext.width,
        height: ext.height,
        depth: ext.depth,
        elements: ext.elements,
        level_count: ext.level_count,
        streamed: false,
        pixels: Some(ext.pixels),
        stream_levels: Default::default(),
    };
    apply_loaded_flags(&mut image);
    image
}

/// The synthesized safe default: a 1x1 opaque placeholder pixel.
pub fn default_image() -> Image {
    Image {
        format: PIXEL_FORMAT_RGBA8,
        map_type: MAP_TYPE_2D,
        semantic: SEMANTIC_2D,
        category: CATEGORY_AUTO_GENERATED,
        flags: FLAG_NOMIPMAPS,
        width: 1,
        height: 1,
        depth: 1,
        elements: 1,
        level_count: 1,
        streamed: false,
        pixels: Some(vec![255, 0, 0, 255]),
        stream_levels: Default::default(),
    }
}
