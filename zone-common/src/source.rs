//! External collaborator seams: asset acquisition sources and export sinks.
//!
//! The engine never decodes external media itself. Decoding an image file
//! to pixels, or persisting pixels back to a tool-consumable file, are
//! opaque operations behind these traits; the CLI ships filesystem
//! implementations, tests use [`MemorySource`].

use hashbrown::HashMap;

use crate::asset::AssetKind;

/// One step of an acquisition fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceForm {
    /// The canonical serialized-blob form (a flat single-asset file).
    Canonical,
    /// A legacy/alternate container form (for images: the streamed
    /// container whose bulk lives in companion stream files).
    Legacy,
    /// A human-authored external source (decoded image, JSON, CSV, text).
    External,
}

impl SourceForm {
    pub fn name(self) -> &'static str {
        match self {
            SourceForm::Canonical => "canonical",
            SourceForm::Legacy => "legacy",
            SourceForm::External => "external",
        }
    }
}

/// Decoded image content handed over by the external decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalImage {
    /// Opaque pixel format tag, stored and relayed untouched.
    pub format: u32,
    pub width: u16,
    pub height: u16,
    pub depth: u16,
    pub elements: u16,
    pub level_count: u8,
    pub pixels: Vec<u8>,
}

/// Decoded audio content handed over by the external decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalSound {
    pub sample_rate: u32,
    pub channels: u8,
    pub looping: bool,
    pub samples: Vec<i16>,
}

/// Content returned by a source, or handed to an export sink. The same
/// shapes flow both ways so an unpacked zone can be rebuilt from its dump.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceData {
    /// Serialized canonical/legacy blob bytes.
    Blob(Vec<u8>),
    /// Decoded pixels plus metadata.
    Image(ExternalImage),
    /// Decoded audio samples plus metadata.
    Samples(ExternalSound),
    /// Human-authored text (JSON, CSV, localized value).
    Text(String),
    /// Raw opaque bytes.
    Bytes(Vec<u8>),
}

/// Acquisition source for asset content.
pub trait SourceProvider {
    /// Fetch one form of one asset. `Ok(None)` means this source does not
    /// have the asset in that form; the chain moves on.
    fn fetch(
        &self,
        kind: AssetKind,
        form: SourceForm,
        name: &str,
    ) -> std::io::Result<Option<SourceData>>;

    /// Fetch one companion stream-level payload for a streamed asset.
    /// Presence is probed per sub-index; absent levels are simply `None`.
    fn fetch_stream_level(&self, name: &str, sub_index: usize) -> std::io::Result<Option<Vec<u8>>> {
        let _ = (name, sub_index);
        Ok(None)
    }
}

/// Export sink persisting assets in human/tool-consumable forms.
pub trait ExportSink {
    fn export(&mut self, kind: AssetKind, name: &str, data: SourceData) -> std::io::Result<()>;

    /// Persist one materialized stream-level payload of a streamed asset.
    fn export_stream_level(
        &mut self,
        name: &str,
        sub_index: usize,
        bytes: &[u8],
    ) -> std::io::Result<()> {
        let _ = (name, sub_index, bytes);
        Ok(())
    }
}

/// In-memory source provider, used by tests and as a cache layer.
#[derive(Debug, Default)]
pub struct MemorySource {
    entries: HashMap<(AssetKind, SourceForm, String), SourceData>,
    stream_levels: HashMap<(String, usize), Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, kind: AssetKind, form: SourceForm, name: &str, data: SourceData) {
        self.entries.insert((kind, form, name.to_string()), data);
    }

    pub fn insert_stream_level(&mut self, name: &str, sub_index: usize, bytes: Vec<u8>) {
        self.stream_levels
            .insert((name.to_string(), sub_index), bytes);
    }
}

impl SourceProvider for MemorySource {
    fn fetch(
        &self,
        kind: AssetKind,
        form: SourceForm,
        name: &str,
    ) -> std::io::Result<Option<SourceData>> {
        Ok(self
            .entries
            .get(&(kind, form, name.to_string()))
            .cloned())
    }

    fn fetch_stream_level(&self, name: &str, sub_index: usize) -> std::io::Result<Option<Vec<u8>>> {
        Ok(self
            .stream_levels
            .get(&(name.to_string(), sub_index))
            .cloned())
    }
}

/// In-memory export sink collecting everything it is handed, for tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub exported: Vec<(AssetKind, String, SourceData)>,
    pub stream_levels: Vec<(String, usize, Vec<u8>)>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ExportSink for MemorySink {
    fn export(&mut self, kind: AssetKind, name: &str, data: SourceData) -> std::io::Result<()> {
        self.exported.push((kind, name.to_string(), data));
        Ok(())
    }

    fn export_stream_level(
        &mut self,
        name: &str,
        sub_index: usize,
        bytes: &[u8],
    ) -> std::io::Result<()> {
        self.stream_levels
            .push((name.to_string(), sub_index, bytes.to_vec()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_source_fetch() {
        let mut source = MemorySource::new();
        source.insert(
            AssetKind::RawFile,
            SourceForm::External,
            "scripts/init.gsc",
            SourceData::Bytes(vec![1, 2, 3]),
        );

        let hit = source
            .fetch(AssetKind::RawFile, SourceForm::External, "scripts/init.gsc")
            .unwrap();
        assert_eq!(hit, Some(SourceData::Bytes(vec![1, 2, 3])));

        let miss = source
            .fetch(AssetKind::RawFile, SourceForm::Canonical, "scripts/init.gsc")
            .unwrap();
        assert!(miss.is_none());
    }

    #[test]
    fn test_memory_source_stream_levels() {
        let mut source = MemorySource::new();
        source.insert_stream_level("brick", 2, vec![9; 16]);
        assert_eq!(
            source.fetch_stream_level("brick", 2).unwrap(),
            Some(vec![9; 16])
        );
        assert!(source.fetch_stream_level("brick", 0).unwrap().is_none());
    }
}
