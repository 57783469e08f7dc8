//! Block codec for streamed payloads.
//!
//! LZ4 block compression with a stored-raw fallback: when LZ4 does not
//! shrink the input, the raw bytes are stored instead, so the output is
//! never larger than the input. "Stored" is signaled by the compressed
//! length equalling the recorded decompressed length; there is no header
//! byte. Round-trip identity holds for every input, including empty.

use crate::error::ZoneError;

/// Compress a byte block. The result is never longer than the input.
pub fn compress(bytes: &[u8]) -> Vec<u8> {
    let packed = lz4_flex::block::compress(bytes);
    if packed.len() < bytes.len() {
        packed
    } else {
        bytes.to_vec()
    }
}

/// Decompress a byte block produced by [`compress`].
///
/// `expected_len` is the recorded decompressed length; any mismatch is a
/// [`ZoneError::Codec`]. The failure is local to the block - callers retry
/// or leave the block unavailable.
pub fn decompress(bytes: &[u8], expected_len: usize) -> Result<Vec<u8>, ZoneError> {
    if bytes.len() == expected_len {
        // Stored raw: compression did not shrink this block.
        return Ok(bytes.to_vec());
    }
    if bytes.len() > expected_len {
        return Err(ZoneError::Codec(format!(
            "compressed block ({} bytes) larger than recorded decompressed size ({} bytes)",
            bytes.len(),
            expected_len
        )));
    }
    let out = lz4_flex::block::decompress(bytes, expected_len)
        .map_err(|e| ZoneError::Codec(e.to_string()))?;
    if out.len() != expected_len {
        return Err(ZoneError::Codec(format!(
            "decompressed {} bytes, expected {}",
            out.len(),
            expected_len
        )));
    }
    Ok(out)
}
