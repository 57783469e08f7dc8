//! Binary serialization trait for fixed-size wire records.
//!
//! Every asset kind serializes a fixed-size record followed by its
//! variable-length children; the records implement `WireRecord` so the
//! stream writer and reader can handle them generically. All integers are
//! little-endian.

/// Sentinel for a pointer-shaped record field whose payload is absent.
pub const MARKER_NONE: u32 = 0;

/// Sentinel for a pointer-shaped record field whose payload follows later
/// in the asset's write sequence. The reader validates this marker before
/// consuming the payload, which makes a writer/reader order mismatch a
/// detectable format error instead of silent corruption.
pub const MARKER_FOLLOWS: u32 = 0xFFFF_FFFD;

/// Sentinel for a cross-asset reference field with no target (dropped or
/// absent reference). Any other value is an index into the zone's asset
/// order.
pub const REF_NONE: u32 = 0xFFFF_FFFF;

/// Trait for fixed-size binary wire records.
///
/// `deserialize` returns `None` if the byte slice is too short; callers
/// translate that into a truncation error with position context.
pub trait WireRecord: Sized {
    /// Size of the serialized record in bytes.
    const SIZE: usize;

    /// Serialize to little-endian bytes. The result is exactly `SIZE` long.
    fn serialize(&self) -> Vec<u8>;

    /// Deserialize from bytes, reading exactly `SIZE` bytes from the front.
    fn deserialize(bytes: &[u8]) -> Option<Self>;
}

impl WireRecord for u32 {
    const SIZE: usize = 4;

    fn serialize(&self) -> Vec<u8> {
        self.to_le_bytes().to_vec()
    }

    fn deserialize(bytes: &[u8]) -> Option<Self> {
        Some(u32::from_le_bytes(bytes.get(0..4)?.try_into().ok()?))
    }
}

impl WireRecord for i16 {
    const SIZE: usize = 2;

    fn serialize(&self) -> Vec<u8> {
        self.to_le_bytes().to_vec()
    }

    fn deserialize(bytes: &[u8]) -> Option<Self> {
        Some(i16::from_le_bytes(bytes.get(0..2)?.try_into().ok()?))
    }
}

/// Read a little-endian u32 at a fixed offset inside a record slice.
pub(crate) fn read_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    Some(u32::from_le_bytes(
        bytes.get(offset..offset + 4)?.try_into().ok()?,
    ))
}

/// Read a little-endian u16 at a fixed offset inside a record slice.
pub(crate) fn read_u16(bytes: &[u8], offset: usize) -> Option<u16> {
    Some(u16::from_le_bytes(
        bytes.get(offset..offset + 2)?.try_into().ok()?,
    ))
}

/// Read a little-endian u64 at a fixed offset inside a record slice.
pub(crate) fn read_u64(bytes: &[u8], offset: usize) -> Option<u64> {
    Some(u64::from_le_bytes(
        bytes.get(offset..offset + 8)?.try_into().ok()?,
    ))
}
