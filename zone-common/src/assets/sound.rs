//! Sound assets: PCM sample data with a small header record.

use crate::arena::ZoneArena;
use crate::buffer::{ZoneBuffer, ZoneStream};
use crate::cursor::ZoneCursor;
use crate::error::{Result, ZoneError};
use crate::source::ExternalSound;
use crate::wire::{read_u32, MARKER_FOLLOWS, WireRecord};

/// In-memory sound asset. Samples are interleaved i16 PCM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sound {
    pub sample_rate: u32,
    pub channels: u8,
    pub looping: bool,
    pub samples: Vec<i16>,
}

/// Fixed-size sound wire record (18 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoundRecord {
    pub sample_rate: u32,
    pub channels: u8,
    pub looping: u8,
    pub sample_count: u32,
    pub samples_marker: u32,
    pub name_marker: u32,
}

impl WireRecord for SoundRecord {
    const SIZE: usize = 18;

    fn serialize(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::SIZE);
        bytes.extend_from_slice(&self.sample_rate.to_le_bytes());
        bytes.push(self.channels);
        bytes.push(self.looping);
        bytes.extend_from_slice(&self.sample_count.to_le_bytes());
        bytes.extend_from_slice(&self.samples_marker.to_le_bytes());
        bytes.extend_from_slice(&self.name_marker.to_le_bytes());
        bytes
    }

    fn deserialize(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        Some(Self {
            sample_rate: read_u32(bytes, 0)?,
            channels: bytes[4],
            looping: bytes[5],
            sample_count: read_u32(bytes, 6)?,
            samples_marker: read_u32(bytes, 10)?,
            name_marker: read_u32(bytes, 14)?,
        })
    }
}

fn record_for(sound: &Sound) -> SoundRecord {
    SoundRecord {
        sample_rate: sound.sample_rate,
        channels: sound.channels,
        looping: sound.looping as u8,
        sample_count: sound.samples.len() as u32,
        samples_marker: MARKER_FOLLOWS,
        name_marker: MARKER_FOLLOWS,
    }
}

/// Write one sound: record, name, then samples in the bulk stream.
pub fn write(sound: &Sound, name: &str, buf: &mut ZoneBuffer) {
    buf.write_struct(&record_for(sound));
    buf.write_str(name);
    buf.push_stream(ZoneStream::Temp);
    buf.align(3);
    buf.write_array(&sound.samples);
    buf.pop_stream();
}

/// Read one sound, mirroring [`write`].
pub fn read(cursor: &mut ZoneCursor<'_>, arena: &mut ZoneArena) -> Result<(String, Sound)> {
    let record = cursor.read_single::<SoundRecord>()?;
    if record.samples_marker != MARKER_FOLLOWS || record.name_marker != MARKER_FOLLOWS {
        return Err(ZoneError::Format(
            "sound record carries bad markers".to_string(),
        ));
    }
    let name = cursor.read_string(arena)?;
    cursor.temp_align(3);
    let samples = cursor.read_temp_i16(record.sample_count as usize)?;
    Ok((
        arena.get_str(name).to_string(),
        Sound {
            sample_rate: record.sample_rate,
            channels: record.channels,
            looping: record.looping != 0,
            samples,
        },
    ))
}

/// Serialize the flat canonical form: record, name, samples inline.
pub fn canonical_bytes(name: &str, sound: &Sound) -> Vec<u8> {
    let mut buf = ZoneBuffer::new();
    buf.write_struct(&record_for(sound));
    buf.write_str(name);
    buf.write_array(&sound.samples);
    let blob = buf.finish();
    blob[crate::buffer::ZONE_INDEX_SIZE..].to_vec()
}

/// Parse the flat canonical form.
pub fn parse_canonical(bytes: &[u8]) -> Result<(String, Sound)> {
    let mut arena = ZoneArena::new();
    let mut cursor = ZoneCursor::open_flat(bytes);
    let record = cursor.read_single::<SoundRecord>()?;
    let name = cursor.read_string(&mut arena)?;
    let samples = cursor.read_array::<i16>(record.sample_count as usize)?;
    Ok((
        arena.get_str(name).to_string(),
        Sound {
            sample_rate: record.sample_rate,
            channels: record.channels,
            looping: record.looping != 0,
            samples,
        },
    ))
}

/// Build a sound from externally decoded samples.
pub fn from_external(ext: ExternalSound) -> Sound {
    Sound {
        sample_rate: ext.sample_rate,
        channels: ext.channels,
        looping: ext.looping,
        samples: ext.samples,
    }
}

/// Hand a sound back to the external decoder's representation.
pub fn to_external(sound: &Sound) -> ExternalSound {
    ExternalSound {
        sample_rate: sound.sample_rate,
        channels: sound.channels,
        looping: sound.looping,
        samples: sound.samples.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_sound() -> Sound {
        Sound {
            sample_rate: 22050,
            channels: 1,
            looping: true,
            samples: (0..441).map(|i| (i * 37 % 1000) as i16 - 500).collect(),
        }
    }

    #[test]
    fn test_record_roundtrip() {
        let record = record_for(&test_sound());
        let parsed = SoundRecord::deserialize(&record.serialize()).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_zone_write_read_roundtrip() {
        let sound = test_sound();
        let mut buf = ZoneBuffer::new();
        write(&sound, "sfx/jump", &mut buf);
        let blob = buf.finish();

        let mut arena = ZoneArena::new();
        let mut cursor = ZoneCursor::open(&blob).unwrap();
        let (name, restored) = read(&mut cursor, &mut arena).unwrap();
        assert_eq!(name, "sfx/jump");
        assert_eq!(restored, sound);
    }

    #[test]
    fn test_canonical_roundtrip() {
        let sound = test_sound();
        let bytes = canonical_bytes("sfx/jump", &sound);
        let (name, restored) = parse_canonical(&bytes).unwrap();
        assert_eq!(name, "sfx/jump");
        assert_eq!(restored, sound);
    }

    #[test]
    fn test_truncated_samples() {
        let sound = test_sound();
        let bytes = canonical_bytes("sfx/jump", &sound);
        let cut = &bytes[..bytes.len() - 10];
        assert!(matches!(
            parse_canonical(cut),
            Err(ZoneError::TruncatedData { .. })
        ));
    }

    #[test]
    fn test_external_roundtrip() {
        let sound = test_sound();
        assert_eq!(from_external(to_external(&sound)), sound);
    }
}
