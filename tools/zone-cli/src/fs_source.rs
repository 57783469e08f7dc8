//! Filesystem implementations of the engine's collaborator seams.
//!
//! The source tree and the unpack output tree use the same layout, so a
//! dumped zone can be rebuilt from its own dump:
//!
//! ```text
//! <root>/
//!   zone_raw/<kind>/<name>        canonical flat blobs
//!   streamed_images/<name>.zimage legacy streamed containers
//!   streamed_images/<name>_stream<i>.pixels
//!   images/<name>.meta.json       decoded image metadata
//!   images/<name>.pixels          decoded image pixels
//!   materials/<name>.json         material source documents
//!   sounds/<name>.meta.json       decoded sound metadata
//!   sounds/<name>.pcm             decoded samples (i16 LE)
//!   localize/<name>.txt           localized values
//!   <name>                        string tables and raw files (by path)
//! ```

use std::fs;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use zone_common::{
    AssetKind, ExportSink, ExternalImage, ExternalSound, PackFileReader, SourceData, SourceForm,
    SourceProvider,
};
use zoneforge_shared::{clean_name, SELF_PACK_INDEX, ZONE_FORMAT};

/// Sidecar metadata for decoded image pixels.
#[derive(Debug, Serialize, Deserialize)]
struct ImageMeta {
    format: u32,
    width: u16,
    height: u16,
    depth: u16,
    elements: u16,
    level_count: u8,
}

/// Sidecar metadata for decoded sound samples.
#[derive(Debug, Serialize, Deserialize)]
struct SoundMeta {
    sample_rate: u32,
    channels: u8,
    looping: bool,
}

fn read_optional(path: &Path) -> std::io::Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

fn read_optional_string(path: &Path) -> std::io::Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

fn write_all(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, bytes)
}

fn pcm_to_samples(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|c| i16::from_le_bytes([c[0], c[1]]))
        .collect()
}

fn samples_to_pcm(samples: &[i16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for sample in samples {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    bytes
}

/// Asset source rooted at a project directory.
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn canonical_path(&self, kind: AssetKind, name: &str) -> PathBuf {
        self.root
            .join("zone_raw")
            .join(kind.name())
            .join(clean_name(name))
    }

    fn legacy_path(&self, name: &str) -> PathBuf {
        self.root
            .join(ZONE_FORMAT.streamed_images_dir)
            .join(format!("{}.zimage", clean_name(name)))
    }

    fn external_base(&self, dir: &str, name: &str) -> PathBuf {
        self.root.join(dir).join(clean_name(name))
    }
}

impl SourceProvider for DirSource {
    fn fetch(
        &self,
        kind: AssetKind,
        form: SourceForm,
        name: &str,
    ) -> std::io::Result<Option<SourceData>> {
        match form {
            SourceForm::Canonical => Ok(read_optional(&self.canonical_path(kind, name))?
                .map(SourceData::Blob)),
            SourceForm::Legacy => {
                if kind != AssetKind::Image {
                    return Ok(None);
                }
                Ok(read_optional(&self.legacy_path(name))?.map(SourceData::Blob))
            }
            SourceForm::External => self.fetch_external(kind, name),
        }
    }

    fn fetch_stream_level(&self, name: &str, sub_index: usize) -> std::io::Result<Option<Vec<u8>>> {
        let path = self
            .root
            .join(ZONE_FORMAT.streamed_images_dir)
            .join(ZONE_FORMAT.stream_file_name(name, sub_index));
        read_optional(&path)
    }
}

impl DirSource {
    fn fetch_external(&self, kind: AssetKind, name: &str) -> std::io::Result<Option<SourceData>> {
        match kind {
            AssetKind::Image => {
                let base = self.external_base(ZONE_FORMAT.images_dir, name);
                let Some(meta) =
                    read_optional_string(&base.with_extension("meta.json"))?
                else {
                    return Ok(None);
                };
                let meta: ImageMeta = serde_json::from_str(&meta)
                    .map_err(|e| std::io::Error::new(ErrorKind::InvalidData, e))?;
                let Some(pixels) = read_optional(&base.with_extension("pixels"))? else {
                    return Ok(None);
                };
                Ok(Some(SourceData::Image(ExternalImage {
                    format: meta.format,
                    width: meta.width,
                    height: meta.height,
                    depth: meta.depth,
                    elements: meta.elements,
                    level_count: meta.level_count,
                    pixels,
                })))
            }
            AssetKind::Material => {
                let path = self
                    .external_base(ZONE_FORMAT.materials_dir, name)
                    .with_extension("json");
                Ok(read_optional_string(&path)?.map(SourceData::Text))
            }
            AssetKind::Sound => {
                let base = self.external_base(ZONE_FORMAT.sounds_dir, name);
                let Some(meta) =
                    read_optional_string(&base.with_extension("meta.json"))?
                else {
                    return Ok(None);
                };
                let meta: SoundMeta = serde_json::from_str(&meta)
                    .map_err(|e| std::io::Error::new(ErrorKind::InvalidData, e))?;
                let Some(pcm) = read_optional(&base.with_extension("pcm"))? else {
                    return Ok(None);
                };
                Ok(Some(SourceData::Samples(ExternalSound {
                    sample_rate: meta.sample_rate,
                    channels: meta.channels,
                    looping: meta.looping,
                    samples: pcm_to_samples(&pcm),
                })))
            }
            AssetKind::StringTable => {
                Ok(read_optional_string(&self.root.join(name))?.map(SourceData::Text))
            }
            AssetKind::Localize => {
                let path = self.external_base("localize", name).with_extension("txt");
                Ok(read_optional_string(&path)?.map(SourceData::Text))
            }
            AssetKind::RawFile => Ok(read_optional(&self.root.join(name))?.map(SourceData::Bytes)),
        }
    }
}

/// Export sink writing the same tree [`DirSource`] reads.
pub struct DirSink {
    root: PathBuf,
}

impl DirSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ExportSink for DirSink {
    fn export(&mut self, kind: AssetKind, name: &str, data: SourceData) -> std::io::Result<()> {
        let clean = clean_name(name);
        match data {
            SourceData::Blob(bytes) => write_all(
                &self.root.join("zone_raw").join(kind.name()).join(&clean),
                &bytes,
            ),
            SourceData::Image(image) => {
                let base = self.root.join(ZONE_FORMAT.images_dir).join(&clean);
                let meta = ImageMeta {
                    format: image.format,
                    width: image.width,
                    height: image.height,
                    depth: image.depth,
                    elements: image.elements,
                    level_count: image.level_count,
                };
                write_all(
                    &base.with_extension("meta.json"),
                    serde_json::to_string_pretty(&meta)
                        .expect("image meta serializes")
                        .as_bytes(),
                )?;
                write_all(&base.with_extension("pixels"), &image.pixels)
            }
            SourceData::Samples(sound) => {
                let base = self.root.join(ZONE_FORMAT.sounds_dir).join(&clean);
                let meta = SoundMeta {
                    sample_rate: sound.sample_rate,
                    channels: sound.channels,
                    looping: sound.looping,
                };
                write_all(
                    &base.with_extension("meta.json"),
                    serde_json::to_string_pretty(&meta)
                        .expect("sound meta serializes")
                        .as_bytes(),
                )?;
                write_all(&base.with_extension("pcm"), &samples_to_pcm(&sound.samples))
            }
            SourceData::Text(text) => {
                let path = match kind {
                    AssetKind::Material => self
                        .root
                        .join(ZONE_FORMAT.materials_dir)
                        .join(&clean)
                        .with_extension("json"),
                    AssetKind::Localize => {
                        self.root.join("localize").join(&clean).with_extension("txt")
                    }
                    // String tables keep their path-shaped names.
                    _ => self.root.join(name),
                };
                write_all(&path, text.as_bytes())
            }
            SourceData::Bytes(bytes) => write_all(&self.root.join(name), &bytes),
        }
    }

    fn export_stream_level(
        &mut self,
        name: &str,
        sub_index: usize,
        bytes: &[u8],
    ) -> std::io::Result<()> {
        let path = self
            .root
            .join(ZONE_FORMAT.streamed_images_dir)
            .join(ZONE_FORMAT.stream_file_name(name, sub_index));
        write_all(&path, bytes)
    }
}

/// Pack-file reader over a zone directory.
pub struct DirPackReader {
    dir: PathBuf,
    zone_name: String,
}

impl DirPackReader {
    pub fn new(dir: impl Into<PathBuf>, zone_name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            zone_name: zone_name.into(),
        }
    }
}

impl PackFileReader for DirPackReader {
    fn read_range(
        &self,
        file_index: u16,
        offset: u64,
        offset_end: u64,
    ) -> std::io::Result<Vec<u8>> {
        let name = if file_index == SELF_PACK_INDEX {
            ZONE_FORMAT.self_pack_name(&self.zone_name)
        } else {
            ZONE_FORMAT.pack_file_name(file_index)
        };
        let mut file = fs::File::open(self.dir.join(name))?;
        file.seek(SeekFrom::Start(offset))?;
        let mut bytes = vec![0u8; (offset_end - offset) as usize];
        file.read_exact(&mut bytes)?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_tree_roundtrip_through_sink() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = DirSink::new(dir.path());

        sink.export(
            AssetKind::RawFile,
            "maps/mp/test.gsc",
            SourceData::Bytes(b"main();".to_vec()),
        )
        .unwrap();
        sink.export(
            AssetKind::Localize,
            "MENU_PLAY",
            SourceData::Text("Play".to_string()),
        )
        .unwrap();
        sink.export(
            AssetKind::Image,
            "brick",
            SourceData::Image(ExternalImage {
                format: 28,
                width: 2,
                height: 2,
                depth: 1,
                elements: 1,
                level_count: 1,
                pixels: vec![1, 2, 3, 4],
            }),
        )
        .unwrap();
        sink.export_stream_level("terrain", 1, &[9, 9, 9]).unwrap();

        let source = DirSource::new(dir.path());
        assert_eq!(
            source
                .fetch(AssetKind::RawFile, SourceForm::External, "maps/mp/test.gsc")
                .unwrap(),
            Some(SourceData::Bytes(b"main();".to_vec()))
        );
        assert_eq!(
            source
                .fetch(AssetKind::Localize, SourceForm::External, "MENU_PLAY")
                .unwrap(),
            Some(SourceData::Text("Play".to_string()))
        );
        match source
            .fetch(AssetKind::Image, SourceForm::External, "brick")
            .unwrap()
        {
            Some(SourceData::Image(image)) => {
                assert_eq!(image.width, 2);
                assert_eq!(image.pixels, vec![1, 2, 3, 4]);
            }
            other => panic!("unexpected fetch result {other:?}"),
        }
        assert_eq!(
            source.fetch_stream_level("terrain", 1).unwrap(),
            Some(vec![9, 9, 9])
        );
        assert!(source.fetch_stream_level("terrain", 0).unwrap().is_none());
    }

    #[test]
    fn test_missing_files_are_none_not_errors() {
        let dir = tempfile::tempdir().unwrap();
        let source = DirSource::new(dir.path());
        for kind in AssetKind::ALL {
            for form in [SourceForm::Canonical, SourceForm::Legacy, SourceForm::External] {
                assert!(source.fetch(kind, form, "ghost").unwrap().is_none());
            }
        }
    }

    #[test]
    fn test_pack_reader_range() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("imagefile3.pak"), [0, 1, 2, 3, 4, 5, 6, 7]).unwrap();
        let reader = DirPackReader::new(dir.path(), "z");
        assert_eq!(reader.read_range(3, 2, 6).unwrap(), vec![2, 3, 4, 5]);
        // A range past the end is a local read failure.
        assert!(reader.read_range(3, 4, 100).is_err());
    }
}
