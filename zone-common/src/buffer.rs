//! Zone buffer: the stream-partitioned writer side of the engine.
//!
//! Output accumulates into named streams; `finish()` concatenates them in a
//! fixed order behind a small zone index. The write sequence for any asset
//! (record first, then each variable-length child in field-declaration
//! order) must exactly match the read sequence in [`crate::cursor`] - the
//! visitation-order contract. Marker fields written into records make order
//! mismatches detectable at read time.
//!
//! # Blob layout
//!
//! ```text
//! 0x00: asset_count       u32
//! 0x04: streamfile_count  u32
//! 0x08: virtual_len       u32
//! 0x0C: temp_len          u32
//! 0x10: stream-file table (streamfile_count x 22 bytes)
//!       Virtual stream   (asset records + inline children)
//!       Temp stream      (bulk payloads, 8-byte aligned)
//! ```
//!
//! No magic bytes, no version field: the layout is positional and format
//! compatibility is tracked out of band.

use crate::stream_blocks::StreamFileEntry;
use crate::wire::WireRecord;

/// Size of the zone index at the front of every blob.
pub const ZONE_INDEX_SIZE: usize = 16;

/// Output partitions of a zone blob, in concatenation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneStream {
    /// Pointer-bearing region: records and inline children.
    Virtual = 0,
    /// Bulk region: large payloads, 8-byte aligned.
    Temp = 1,
}

const STREAM_COUNT: usize = 2;

/// Opaque handle to a completed write, for post-hoc field patching.
#[derive(Debug, Clone, Copy)]
pub struct WriteHandle {
    stream: ZoneStream,
    offset: usize,
}

/// Stream-partitioned zone writer. Entirely buffer-local; no I/O happens
/// until the caller persists the result of [`ZoneBuffer::finish`].
#[derive(Debug)]
pub struct ZoneBuffer {
    streams: [Vec<u8>; STREAM_COUNT],
    stack: Vec<ZoneStream>,
    stream_files: Vec<StreamFileEntry>,
    asset_count: u32,
}

impl ZoneBuffer {
    /// Fresh buffer with the Virtual stream active.
    pub fn new() -> Self {
        Self {
            streams: [Vec::new(), Vec::new()],
            stack: vec![ZoneStream::Virtual],
            stream_files: Vec::new(),
            asset_count: 0,
        }
    }

    /// The stream subsequent writes land in.
    pub fn active(&self) -> ZoneStream {
        *self.stack.last().expect("stream stack underflow")
    }

    /// Make `stream` the target for subsequent writes, nesting on a stack.
    pub fn push_stream(&mut self, stream: ZoneStream) {
        self.stack.push(stream);
    }

    /// Restore the previously active stream.
    ///
    /// # Panics
    ///
    /// Panics if the stack would underflow - an unbalanced push/pop is a
    /// programmer error in an asset's write sequence, not a runtime
    /// condition.
    pub fn pop_stream(&mut self) {
        if self.stack.len() <= 1 {
            panic!("stream stack underflow: pop_stream without matching push_stream");
        }
        self.stack.pop();
    }

    fn active_vec(&mut self) -> &mut Vec<u8> {
        let stream = self.active();
        &mut self.streams[stream as usize]
    }

    /// Current length of a stream's partition.
    pub fn stream_len(&self, stream: ZoneStream) -> usize {
        self.streams[stream as usize].len()
    }

    /// Begin an asset: writes the kind tag and disposition byte to the
    /// Virtual stream and counts the asset in the zone index.
    pub fn begin_asset(&mut self, kind_tag: u8, referenced: bool) {
        self.streams[ZoneStream::Virtual as usize].push(kind_tag);
        self.streams[ZoneStream::Virtual as usize].push(referenced as u8);
        self.asset_count += 1;
    }

    /// Copy a fixed-size record into the active stream.
    pub fn write_struct<T: WireRecord>(&mut self, record: &T) -> WriteHandle {
        let stream = self.active();
        let vec = self.active_vec();
        let offset = vec.len();
        let bytes = record.serialize();
        debug_assert_eq!(bytes.len(), T::SIZE);
        vec.extend_from_slice(&bytes);
        WriteHandle { stream, offset }
    }

    /// Write a nul-terminated copy of `s` into the active stream.
    pub fn write_str(&mut self, s: &str) -> WriteHandle {
        let stream = self.active();
        let vec = self.active_vec();
        let offset = vec.len();
        vec.extend_from_slice(s.as_bytes());
        vec.push(0);
        WriteHandle { stream, offset }
    }

    /// Write a raw byte run into the active stream.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> WriteHandle {
        let stream = self.active();
        let vec = self.active_vec();
        let offset = vec.len();
        vec.extend_from_slice(bytes);
        WriteHandle { stream, offset }
    }

    /// Write `items` contiguously into the active stream.
    pub fn write_array<T: WireRecord>(&mut self, items: &[T]) -> WriteHandle {
        let stream = self.active();
        let vec = self.active_vec();
        let offset = vec.len();
        for item in items {
            vec.extend_from_slice(&item.serialize());
        }
        WriteHandle { stream, offset }
    }

    /// Write one cross-asset reference index into the active stream.
    pub fn write_ref(&mut self, index: u32) -> WriteHandle {
        self.write_struct(&index)
    }

    /// Pad the active stream with zero bytes to a `1 << pow2_shift` byte
    /// boundary. Padding counts toward stream offsets.
    pub fn align(&mut self, pow2_shift: u32) {
        let boundary = 1usize << pow2_shift;
        let vec = self.active_vec();
        let rem = vec.len() % boundary;
        if rem != 0 {
            vec.resize(vec.len() + boundary - rem, 0);
        }
    }

    /// Overwrite a u32 field inside a previously written record.
    pub fn patch_u32(&mut self, handle: WriteHandle, field_offset: usize, value: u32) {
        let vec = &mut self.streams[handle.stream as usize];
        let start = handle.offset + field_offset;
        vec[start..start + 4].copy_from_slice(&value.to_le_bytes());
    }

    /// Append a stream-file reference record instead of inlining payload
    /// bytes. Table order is emission order.
    pub fn write_streamfile(&mut self, entry: StreamFileEntry) {
        self.stream_files.push(entry);
    }

    /// Number of assets begun so far.
    pub fn asset_count(&self) -> u32 {
        self.asset_count
    }

    /// Concatenate streams in the fixed order (zone index, stream-file
    /// table, Virtual, Temp) and return the final byte sequence.
    pub fn finish(self) -> Vec<u8> {
        let [virt, temp] = self.streams;
        let table_len = self.stream_files.len() * StreamFileEntry::SIZE;
        let mut blob = Vec::with_capacity(ZONE_INDEX_SIZE + table_len + virt.len() + temp.len());
        blob.extend_from_slice(&self.asset_count.to_le_bytes());
        blob.extend_from_slice(&(self.stream_files.len() as u32).to_le_bytes());
        blob.extend_from_slice(&(virt.len() as u32).to_le_bytes());
        blob.extend_from_slice(&(temp.len() as u32).to_le_bytes());
        for entry in &self.stream_files {
            blob.extend_from_slice(&entry.to_bytes());
        }
        blob.extend_from_slice(&virt);
        blob.extend_from_slice(&temp);
        blob
    }
}

impl Default for ZoneBuffer {
    fn default() -> Self {
        Self::new()
    }
}
