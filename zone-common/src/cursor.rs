//! Zone cursor: the sequential reader side of the engine.
//!
//! Reconstructs objects, duplicated strings and arrays in the exact order
//! the writer emitted them. Two read positions advance independently: one
//! over the Virtual stream (records + inline children) and one over the
//! Temp stream (bulk payloads), mirroring the writer's partitioning.
//!
//! A flat mode exists for single-asset canonical files, which carry no zone
//! index and no stream split.

use crate::arena::{ArenaBytes, ArenaStr, ZoneArena};
use crate::buffer::ZONE_INDEX_SIZE;
use crate::error::{Result, ZoneError};
use crate::stream_blocks::StreamFileEntry;
use crate::wire::WireRecord;

/// Parsed zone index (the 16 bytes at the front of a blob).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneIndex {
    pub asset_count: u32,
    pub streamfile_count: u32,
    pub virtual_len: u32,
    pub temp_len: u32,
}

/// Sequential cursor over a serialized zone blob.
pub struct ZoneCursor<'a> {
    blob: &'a [u8],
    index: ZoneIndex,
    stream_files: Vec<StreamFileEntry>,
    next_stream_file: usize,
    virtual_start: usize,
    virtual_end: usize,
    temp_start: usize,
    temp_end: usize,
    vpos: usize,
    tpos: usize,
}

impl<'a> ZoneCursor<'a> {
    /// Position a cursor at the start of a zone blob.
    ///
    /// Fails with a format error if the blob is shorter than the zone index
    /// or its recorded section lengths do not add up to the blob length.
    pub fn open(blob: &'a [u8]) -> Result<Self> {
        if blob.len() < ZONE_INDEX_SIZE {
            return Err(ZoneError::Format(format!(
                "blob too small for zone index: {} bytes",
                blob.len()
            )));
        }
        let index = ZoneIndex {
            asset_count: u32::from_le_bytes(blob[0..4].try_into().unwrap()),
            streamfile_count: u32::from_le_bytes(blob[4..8].try_into().unwrap()),
            virtual_len: u32::from_le_bytes(blob[8..12].try_into().unwrap()),
            temp_len: u32::from_le_bytes(blob[12..16].try_into().unwrap()),
        };
        let table_len = index.streamfile_count as usize * StreamFileEntry::SIZE;
        let expected = ZONE_INDEX_SIZE
            + table_len
            + index.virtual_len as usize
            + index.temp_len as usize;
        if blob.len() != expected {
            return Err(ZoneError::Format(format!(
                "zone index declares {expected} bytes, blob has {}",
                blob.len()
            )));
        }

        let mut stream_files = Vec::with_capacity(index.streamfile_count as usize);
        let mut pos = ZONE_INDEX_SIZE;
        for _ in 0..index.streamfile_count {
            let entry = StreamFileEntry::from_bytes(&blob[pos..pos + StreamFileEntry::SIZE])
                .ok_or_else(|| ZoneError::Format("stream-file table truncated".to_string()))?;
            stream_files.push(entry);
            pos += StreamFileEntry::SIZE;
        }

        let virtual_start = pos;
        let virtual_end = virtual_start + index.virtual_len as usize;
        let temp_start = virtual_end;
        let temp_end = temp_start + index.temp_len as usize;
        Ok(Self {
            blob,
            index,
            stream_files,
            next_stream_file: 0,
            virtual_start,
            virtual_end,
            temp_start,
            temp_end,
            vpos: virtual_start,
            tpos: temp_start,
        })
    }

    /// Cursor over a flat single-asset blob: no zone index, no stream
    /// split. Canonical files inline their bulk data in the single run
    /// (read through [`ZoneCursor::read_virtual_bytes`]).
    pub fn open_flat(blob: &'a [u8]) -> Self {
        Self {
            blob,
            index: ZoneIndex {
                asset_count: 1,
                streamfile_count: 0,
                virtual_len: blob.len() as u32,
                temp_len: 0,
            },
            stream_files: Vec::new(),
            next_stream_file: 0,
            virtual_start: 0,
            virtual_end: blob.len(),
            temp_start: blob.len(),
            temp_end: blob.len(),
            vpos: 0,
            tpos: blob.len(),
        }
    }

    pub fn index(&self) -> &ZoneIndex {
        &self.index
    }

    fn truncated(&self, offset: usize, needed: usize, end: usize) -> ZoneError {
        ZoneError::TruncatedData {
            offset,
            needed,
            available: end.saturating_sub(offset),
        }
    }

    fn take_virtual(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.vpos + len > self.virtual_end {
            return Err(self.truncated(self.vpos, len, self.virtual_end));
        }
        let slice = &self.blob[self.vpos..self.vpos + len];
        self.vpos += len;
        Ok(slice)
    }

    /// Read the per-asset prelude: kind tag and reference disposition.
    pub fn read_asset_header(&mut self) -> Result<(u8, bool)> {
        let bytes = self.take_virtual(2)?;
        Ok((bytes[0], bytes[1] != 0))
    }

    /// Copy a fixed-size record out of the Virtual stream.
    pub fn read_single<T: WireRecord>(&mut self) -> Result<T> {
        let bytes = self.take_virtual(T::SIZE)?;
        T::deserialize(bytes).ok_or_else(|| {
            ZoneError::Format(format!("unreadable record at offset {}", self.vpos - T::SIZE))
        })
    }

    /// Read a nul-terminated byte run and duplicate it into the arena.
    pub fn read_string(&mut self, arena: &mut ZoneArena) -> Result<ArenaStr> {
        let rest = &self.blob[self.vpos..self.virtual_end];
        let nul = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| self.truncated(self.vpos, rest.len() + 1, self.virtual_end))?;
        let s = std::str::from_utf8(&rest[..nul])
            .map_err(|_| ZoneError::Format(format!("invalid UTF-8 string at offset {}", self.vpos)))?;
        let handle = arena.alloc_str(s);
        self.vpos += nul + 1;
        Ok(handle)
    }

    /// Read `count` contiguous records.
    pub fn read_array<T: WireRecord>(&mut self, count: usize) -> Result<Vec<T>> {
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            items.push(self.read_single::<T>()?);
        }
        Ok(items)
    }

    /// Read one cross-asset reference index.
    pub fn read_ref(&mut self) -> Result<u32> {
        self.read_single::<u32>()
    }

    /// Read a raw byte run from the Virtual stream into the arena. Used by
    /// flat canonical files, which inline bulk data instead of splitting it
    /// into the Temp stream.
    pub fn read_virtual_bytes(&mut self, len: usize, arena: &mut ZoneArena) -> Result<ArenaBytes> {
        let bytes = self.take_virtual(len)?;
        Ok(arena.alloc_bytes(bytes))
    }

    /// Advance the Temp position to a `1 << pow2_shift` boundary, mirroring
    /// the writer's padding.
    pub fn temp_align(&mut self, pow2_shift: u32) {
        let boundary = 1usize << pow2_shift;
        let rel = self.tpos - self.temp_start;
        let rem = rel % boundary;
        if rem != 0 {
            self.tpos += boundary - rem;
        }
    }

    /// Read a bulk byte run from the Temp stream into the arena.
    pub fn read_temp_bytes(&mut self, len: usize, arena: &mut ZoneArena) -> Result<ArenaBytes> {
        if self.tpos + len > self.temp_end {
            return Err(self.truncated(self.tpos, len, self.temp_end));
        }
        let handle = arena.alloc_bytes(&self.blob[self.tpos..self.tpos + len]);
        self.tpos += len;
        Ok(handle)
    }

    /// Read `count` little-endian i16 samples from the Temp stream.
    pub fn read_temp_i16(&mut self, count: usize) -> Result<Vec<i16>> {
        let len = count * 2;
        if self.tpos + len > self.temp_end {
            return Err(self.truncated(self.tpos, len, self.temp_end));
        }
        let samples = self.blob[self.tpos..self.tpos + len]
            .chunks_exact(2)
            .map(|c| i16::from_le_bytes([c[0], c[1]]))
            .collect();
        self.tpos += len;
        Ok(samples)
    }

    /// Consume the next stream-file table entry, in emission order.
    pub fn next_stream_file(&mut self) -> Result<StreamFileEntry> {
        let entry = self
            .stream_files
            .get(self.next_stream_file)
            .copied()
            .ok_or_else(|| {
                ZoneError::Format("stream-file table exhausted".to_string())
            })?;
        self.next_stream_file += 1;
        Ok(entry)
    }

    /// Release the open-blob association.
    pub fn close(self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{ZoneBuffer, ZoneStream};

    #[test]
    fn test_open_too_small() {
        let err = ZoneCursor::open(&[0u8; 15]).unwrap_err();
        assert!(matches!(err, ZoneError::Format(_)));
    }

    #[test]
    fn test_open_length_mismatch() {
        let mut buf = ZoneBuffer::new();
        buf.write_bytes(&[1, 2, 3]);
        let mut blob = buf.finish();
        blob.push(0xFF);
        assert!(ZoneCursor::open(&blob).is_err());
    }

    #[test]
    fn test_read_sequence_mirrors_write_sequence() {
        let mut buf = ZoneBuffer::new();
        buf.begin_asset(2, false);
        buf.write_struct(&0x1234_5678u32);
        buf.write_str("payload name");
        buf.write_array(&[10i16, -20, 30]);
        buf.push_stream(ZoneStream::Temp);
        buf.align(3);
        buf.write_bytes(&[0xEE; 10]);
        buf.pop_stream();
        let blob = buf.finish();

        let mut arena = ZoneArena::new();
        let mut cursor = ZoneCursor::open(&blob).unwrap();
        assert_eq!(cursor.index().asset_count, 1);
        assert_eq!(cursor.read_asset_header().unwrap(), (2, false));
        assert_eq!(cursor.read_single::<u32>().unwrap(), 0x1234_5678);
        let name = cursor.read_string(&mut arena).unwrap();
        assert_eq!(arena.get_str(name), "payload name");
        assert_eq!(cursor.read_array::<i16>(3).unwrap(), vec![10, -20, 30]);
        cursor.temp_align(3);
        let bulk = cursor.read_temp_bytes(10, &mut arena).unwrap();
        assert_eq!(arena.get_bytes(bulk), &[0xEE; 10]);
        cursor.close();
    }

    #[test]
    fn test_truncated_read_is_reported() {
        let mut buf = ZoneBuffer::new();
        buf.write_struct(&7u32);
        let blob = buf.finish();
        let mut cursor = ZoneCursor::open(&blob).unwrap();
        cursor.read_single::<u32>().unwrap();
        let err = cursor.read_single::<u32>().unwrap_err();
        assert!(matches!(err, ZoneError::TruncatedData { needed: 4, .. }));
    }

    #[test]
    fn test_unterminated_string_is_truncation() {
        let mut buf = ZoneBuffer::new();
        buf.write_bytes(b"no terminator");
        let blob = buf.finish();
        let mut arena = ZoneArena::new();
        let mut cursor = ZoneCursor::open(&blob).unwrap();
        assert!(matches!(
            cursor.read_string(&mut arena),
            Err(ZoneError::TruncatedData { .. })
        ));
    }

    #[test]
    fn test_flat_cursor() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&99u32.to_le_bytes());
        bytes.extend_from_slice(b"flat\0");
        bytes.extend_from_slice(&[5, 6, 7]);

        let mut arena = ZoneArena::new();
        let mut cursor = ZoneCursor::open_flat(&bytes);
        assert_eq!(cursor.read_single::<u32>().unwrap(), 99);
        let s = cursor.read_string(&mut arena).unwrap();
        assert_eq!(arena.get_str(s), "flat");
        let rest = cursor.read_array::<i16>(1).unwrap();
        assert_eq!(rest, vec![i16::from_le_bytes([5, 6])]);
    }

    #[test]
    fn test_temp_align_tracks_writer_padding() {
        let mut buf = ZoneBuffer::new();
        buf.push_stream(ZoneStream::Temp);
        buf.write_bytes(&[1]);
        buf.align(3);
        buf.write_bytes(&[2, 2]);
        buf.pop_stream();
        let blob = buf.finish();

        let mut arena = ZoneArena::new();
        let mut cursor = ZoneCursor::open(&blob).unwrap();
        let first = cursor.read_temp_bytes(1, &mut arena).unwrap();
        assert_eq!(arena.get_bytes(first), &[1]);
        cursor.temp_align(3);
        let second = cursor.read_temp_bytes(2, &mut arena).unwrap();
        assert_eq!(arena.get_bytes(second), &[2, 2]);
    }

    #[test]
    fn test_stream_file_table_roundtrip() {
        let entry = StreamFileEntry {
            file_index: 2,
            offset: 100,
            offset_end: 164,
            raw_len: 256,
        };
        let mut buf = ZoneBuffer::new();
        buf.write_streamfile(entry);
        let blob = buf.finish();

        let mut cursor = ZoneCursor::open(&blob).unwrap();
        assert_eq!(cursor.next_stream_file().unwrap(), entry);
        assert!(cursor.next_stream_file().is_err());
    }
}
