//! End-to-end zone round trip: build a zone with every asset kind, persist
//! the blob and companion pack to disk, load it back through a shared pool
//! registry, and materialize streamed blocks from the pack file.

use std::fs;
use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;

use zone_common::assets::material::MaterialSource;
use zone_common::{
    AssetKind, AssetLink, AssetPayload, AssetPools, AssetRef, ExternalImage, ExternalSound,
    MemorySource, PackFileReader, SourceData, SourceForm, ZoneBuilder, ZoneLoader,
};
use zoneforge_shared::{SELF_PACK_INDEX, ZONE_FORMAT};

/// Pack-file reader over the zone's companion pack on disk.
struct DirPackReader {
    dir: PathBuf,
    zone_name: String,
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

fn material_json(images: &[&str], fallback: Option<&str>) -> SourceData {
    SourceData::Text(
        serde_json::to_string(&MaterialSource {
            technique: "lit_detail".to_string(),
            sort_key: 7,
            surface_flags: 0x40,
            state_bits: 0x2F,
            images: images.iter().map(|s| s.to_string()).collect(),
            fallback: fallback.map(str::to_string),
        })
        .unwrap(),
    )
}

fn fixture() -> MemorySource {
    let mut source = MemorySource::new();

    source.insert(
        AssetKind::Image,
        SourceForm::External,
        "wood_col",
        SourceData::Image(ExternalImage {
            format: 71,
            width: 8,
            height: 8,
            depth: 1,
            elements: 1,
            level_count: 2,
            pixels: (0..=255).collect(),
        }),
    );

    // Streamed image: canonical blob marked streamed, levels in companion
    // stream files.
    let mut streamed = zone_common::assets::image::default_image();
    streamed.format = 98;
    streamed.width = 1024;
    streamed.height = 1024;
    streamed.streamed = true;
    streamed.pixels = None;
    source.insert(
        AssetKind::Image,
        SourceForm::Legacy,
        "terrain_far",
        SourceData::Blob(zone_common::assets::image::canonical_bytes(
            "terrain_far",
            &streamed,
        )),
    );
    source.insert_stream_level("terrain_far", 0, vec![0x10; 64 * 1024]);
    source.insert_stream_level("terrain_far", 1, vec![0x20; 16 * 1024]);
    source.insert_stream_level("terrain_far", 2, vec![0x30; 4 * 1024]);

    source.insert(
        AssetKind::Material,
        SourceForm::External,
        "mc/wood",
        material_json(&["wood_col", "terrain_far"], Some("mc/fallback")),
    );
    source.insert(
        AssetKind::Material,
        SourceForm::External,
        "mc/fallback",
        material_json(&[], Some("mc/wood")),
    );

    source.insert(
        AssetKind::Sound,
        SourceForm::External,
        "sfx/step_wood",
        SourceData::Samples(ExternalSound {
            sample_rate: 22050,
            channels: 1,
            looping: false,
            samples: (0..2205).map(|i| ((i * 13) % 600) as i16 - 300).collect(),
        }),
    );

    source.insert(
        AssetKind::StringTable,
        SourceForm::External,
        "mp/surfaces.csv",
        SourceData::Text("surface,sound\nwood,sfx/step_wood\n".to_string()),
    );

    source.insert(
        AssetKind::Localize,
        SourceForm::External,
        "SURFACE_WOOD",
        SourceData::Text("Wood".to_string()),
    );

    source.insert(
        AssetKind::RawFile,
        SourceForm::External,
        "maps/wood.cfg",
        SourceData::Bytes(b"set detail 1\n".to_vec()),
    );

    source
}

fn requested() -> Vec<AssetRef> {
    vec![
        AssetRef::new(AssetKind::Material, "mc/wood"),
        AssetRef::new(AssetKind::Sound, "sfx/step_wood"),
        AssetRef::new(AssetKind::StringTable, "mp/surfaces.csv"),
        AssetRef::new(AssetKind::Localize, "SURFACE_WOOD"),
        AssetRef::new(AssetKind::RawFile, "maps/wood.cfg"),
    ]
}

#[test]
fn test_full_zone_roundtrip_through_disk() {
    let source = fixture();
    let build = ZoneBuilder::new(&source).build(&requested()).unwrap();
    assert!(build.report.dropped.is_empty());
    // material, 2 images, fallback material, sound, table, localize, rawfile
    assert_eq!(build.report.included.len(), 8);

    let dir = tempfile::tempdir().unwrap();
    let zone_name = "wood_test";
    fs::write(
        dir.path().join(ZONE_FORMAT.zone_file_name(zone_name)),
        &build.blob,
    )
    .unwrap();
    fs::write(
        dir.path().join(ZONE_FORMAT.self_pack_name(zone_name)),
        &build.pack,
    )
    .unwrap();

    let blob = fs::read(dir.path().join(ZONE_FORMAT.zone_file_name(zone_name))).unwrap();
    let pools = AssetPools::new();
    let loaded = ZoneLoader::new(&pools).load(zone_name, &blob).unwrap();
    assert_eq!(loaded.assets.len(), 8);

    // Material links resolve to slots holding equal assets.
    let material = pools.get_by_name(AssetKind::Material, "mc/wood").unwrap();
    let AssetPayload::Material(material) = &material.payload else {
        panic!("wrong payload");
    };
    assert_eq!(material.technique, "lit_detail");
    assert_eq!(material.images.len(), 2);
    for link in &material.images {
        let AssetLink::Slot(slot) = link else {
            panic!("unresolved link {link:?}");
        };
        assert!(pools.get(*slot).is_some());
    }

    // The fallback cycle resolved both ways.
    let fallback = pools.get_by_name(AssetKind::Material, "mc/fallback").unwrap();
    let AssetPayload::Material(fallback) = &fallback.payload else {
        panic!("wrong payload");
    };
    let AssetLink::Slot(back) = &fallback.fallback else {
        panic!("cycle not resolved");
    };
    assert_eq!(pools.get(*back).unwrap().name, "mc/wood");

    // Inline image pixels survived field for field.
    let image = pools.get_by_name(AssetKind::Image, "wood_col").unwrap();
    let AssetPayload::Image(image) = &image.payload else {
        panic!("wrong payload");
    };
    assert_eq!(image.format, 71);
    assert_eq!(image.level_count, 2);
    assert_eq!(image.pixels.as_ref().unwrap().len(), 256);

    // Sound samples survived.
    let sound = pools.get_by_name(AssetKind::Sound, "sfx/step_wood").unwrap();
    let AssetPayload::Sound(sound) = &sound.payload else {
        panic!("wrong payload");
    };
    assert_eq!(sound.samples.len(), 2205);
    assert_eq!(sound.sample_rate, 22050);

    // String table and localize round-tripped.
    let table = pools
        .get_by_name(AssetKind::StringTable, "mp/surfaces.csv")
        .unwrap();
    let AssetPayload::StringTable(table) = &table.payload else {
        panic!("wrong payload");
    };
    assert_eq!(table.cell(1, 1), Some("sfx/step_wood"));

    let localize = pools.get_by_name(AssetKind::Localize, "SURFACE_WOOD").unwrap();
    let AssetPayload::Localize(localize) = &localize.payload else {
        panic!("wrong payload");
    };
    assert_eq!(localize.value, "Wood");

    // Streamed blocks materialize from the companion pack on disk.
    let streamed_index = loaded
        .assets
        .iter()
        .position(|slot| {
            slot.and_then(|s| pools.get(s))
                .is_some_and(|a| a.name == "terrain_far")
        })
        .expect("streamed image loaded") as u32;
    let reader = DirPackReader {
        dir: dir.path().to_path_buf(),
        zone_name: zone_name.to_string(),
    };
    let level0 = loaded
        .blocks
        .materialize(streamed_index, 0, &reader)
        .unwrap()
        .unwrap();
    assert_eq!(level0, vec![0x10; 64 * 1024]);
    let level2 = loaded
        .blocks
        .materialize(streamed_index, 2, &reader)
        .unwrap()
        .unwrap();
    assert_eq!(level2, vec![0x30; 4 * 1024]);
    // The fourth level was never authored.
    assert!(loaded
        .blocks
        .materialize(streamed_index, 3, &reader)
        .unwrap()
        .is_none());
}

#[test]
fn test_single_asset_zone_boundaries() {
    let mut source = MemorySource::new();
    let payload = b"single asset payload".to_vec();
    source.insert(
        AssetKind::RawFile,
        SourceForm::External,
        "only.cfg",
        SourceData::Bytes(payload.clone()),
    );

    let build = ZoneBuilder::new(&source)
        .build(&[AssetRef::new(AssetKind::RawFile, "only.cfg")])
        .unwrap();

    // Declared stream boundaries match the writer's layout and alignment
    // rule: the bulk payload is the Temp stream's first (8-aligned) write.
    let blob = &build.blob;
    let virtual_len = u32::from_le_bytes(blob[8..12].try_into().unwrap()) as usize;
    let temp_len = u32::from_le_bytes(blob[12..16].try_into().unwrap()) as usize;
    assert_eq!(temp_len, payload.len());
    let prelude = 2;
    let record = 12;
    let name = "only.cfg".len() + 1;
    assert_eq!(virtual_len, prelude + record + name);
    assert_eq!(blob.len(), 16 + virtual_len + temp_len);
    assert_eq!(&blob[16 + virtual_len..], &payload[..]);

    // Reading it back yields one asset with the original name and payload.
    let pools = AssetPools::new();
    let loaded = ZoneLoader::new(&pools).load("single", &build.blob).unwrap();
    assert_eq!(loaded.assets.len(), 1);
    let asset = pools.get(loaded.assets[0].unwrap()).unwrap();
    assert_eq!(asset.name, "only.cfg");
    let AssetPayload::RawFile(file) = &asset.payload else {
        panic!("wrong payload");
    };
    assert_eq!(file.data, payload);
}

#[test]
fn test_builds_are_byte_identical() {
    let source = fixture();
    let a = ZoneBuilder::new(&source).build(&requested()).unwrap();
    let b = ZoneBuilder::new(&source).build(&requested()).unwrap();
    assert_eq!(a.blob, b.blob);
    assert_eq!(a.pack, b.pack);
}

#[test]
fn test_concurrent_zone_loads_share_pools() {
    let source = fixture();
    let build = ZoneBuilder::new(&source).build(&requested()).unwrap();

    let pools = AssetPools::new();
    std::thread::scope(|scope| {
        for i in 0..4 {
            let pools = &pools;
            let blob = &build.blob;
            scope.spawn(move || {
                ZoneLoader::new(pools)
                    .load(&format!("zone{i}"), blob)
                    .unwrap();
            });
        }
    });
    // All loads deduplicated into the same slots.
    assert_eq!(pools.live_count(AssetKind::Image), 2);
    assert_eq!(pools.live_count(AssetKind::Material), 2);
}
