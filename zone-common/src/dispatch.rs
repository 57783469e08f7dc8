//! Type dispatch: one place that fans out to the per-kind serialization
//! sequences, dependency declarations and export forms, plus the generic
//! acquisition fallback chain.
//!
//! The chain-execution discipline is uniform and lives here, once: try
//! each form of [`AssetKind::acquire_chain`] in order, first success wins,
//! exhaustion yields the kind's synthesized default or a hard
//! [`ZoneError::NotFound`]. Every degraded step emits a diagnostic.

use hashbrown::HashMap;

use zoneforge_shared::STREAM_BLOCK_COUNT;

use crate::arena::ZoneArena;
use crate::asset::{Asset, AssetKind, AssetLink, AssetPayload, AssetRef};
use crate::assets::{image, localize, material, raw_file, sound, string_table};
use crate::buffer::ZoneBuffer;
use crate::cursor::ZoneCursor;
use crate::error::{Result, ZoneError};
use crate::pool::AssetPools;
use crate::source::{SourceData, SourceForm, SourceProvider};
use crate::stream_blocks::PackBuilder;

/// Maps asset identities to their index in a zone's asset order, for
/// writing explicit reference indices.
#[derive(Debug, Default)]
pub struct RefTable {
    map: HashMap<AssetRef, u32>,
}

impl RefTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, asset_ref: AssetRef, index: u32) {
        self.map.insert(asset_ref, index);
    }

    pub fn resolve(&self, kind: AssetKind, name: &str) -> Option<u32> {
        self.map
            .get(&AssetRef::new(kind, name))
            .copied()
    }
}

/// Write one asset into the zone buffer through its kind's sequence.
pub fn write_asset(asset: &Asset, refs: &RefTable, pack: &mut PackBuilder, buf: &mut ZoneBuffer) {
    buf.begin_asset(asset.kind().tag(), false);
    match &asset.payload {
        AssetPayload::Image(payload) => image::write(payload, &asset.name, pack, buf),
        AssetPayload::Material(payload) => material::write(payload, &asset.name, refs, buf),
        AssetPayload::Sound(payload) => sound::write(payload, &asset.name, buf),
        AssetPayload::StringTable(payload) => string_table::write(payload, &asset.name, buf),
        AssetPayload::Localize(payload) => localize::write(payload, &asset.name, buf),
        AssetPayload::RawFile(payload) => raw_file::write(payload, &asset.name, buf),
    }
}

/// Write a reference-only stub: the asset is expected to already live in
/// the pools of whoever loads this zone.
pub fn write_reference(kind: AssetKind, name: &str, buf: &mut ZoneBuffer) {
    buf.begin_asset(kind.tag(), true);
    buf.write_str(name);
}

/// Read one asset body (the prelude has already been consumed).
pub fn read_asset(
    kind: AssetKind,
    cursor: &mut ZoneCursor<'_>,
    arena: &mut ZoneArena,
) -> Result<Asset> {
    let (name, payload) = match kind {
        AssetKind::Image => {
            let (name, payload) = image::read(cursor, arena)?;
            (name, AssetPayload::Image(payload))
        }
        AssetKind::Material => {
            let (name, payload) = material::read(cursor, arena)?;
            (name, AssetPayload::Material(payload))
        }
        AssetKind::Sound => {
            let (name, payload) = sound::read(cursor, arena)?;
            (name, AssetPayload::Sound(payload))
        }
        AssetKind::StringTable => {
            let (name, payload) = string_table::read(cursor, arena)?;
            (name, AssetPayload::StringTable(payload))
        }
        AssetKind::Localize => {
            let (name, payload) = localize::read(cursor, arena)?;
            (name, AssetPayload::Localize(payload))
        }
        AssetKind::RawFile => {
            let (name, payload) = raw_file::read(cursor, arena)?;
            (name, AssetPayload::RawFile(payload))
        }
    };
    Ok(Asset::new(name, payload))
}

/// Declare the dependency edges of an asset, by identity.
pub fn dependencies(asset: &Asset) -> Vec<AssetRef> {
    match &asset.payload {
        AssetPayload::Material(material) => {
            let mut deps = Vec::new();
            for link in &material.images {
                if let AssetLink::Name(name) = link {
                    deps.push(AssetRef::new(AssetKind::Image, name));
                }
            }
            if let AssetLink::Name(name) = &material.fallback {
                deps.push(AssetRef::new(AssetKind::Material, name));
            }
            deps
        }
        _ => Vec::new(),
    }
}

/// Convert an asset's external representation for an export sink.
pub fn export_data(asset: &Asset) -> SourceData {
    match &asset.payload {
        AssetPayload::Image(payload) => match &payload.pixels {
            Some(pixels) if !payload.streamed => SourceData::Image(crate::source::ExternalImage {
                format: payload.format,
                width: payload.width,
                height: payload.height,
                depth: payload.depth,
                elements: payload.elements,
                level_count: payload.level_count,
                pixels: pixels.clone(),
            }),
            _ => SourceData::Blob(image::canonical_bytes(&asset.name, payload)),
        },
        AssetPayload::Material(payload) => SourceData::Text(material::to_external(payload)),
        AssetPayload::Sound(payload) => SourceData::Samples(sound::to_external(payload)),
        AssetPayload::StringTable(payload) => SourceData::Text(string_table::to_external(payload)),
        AssetPayload::Localize(payload) => SourceData::Text(payload.value.clone()),
        AssetPayload::RawFile(payload) => SourceData::Bytes(payload.data.clone()),
    }
}

/// Rewrite slot/index links back to name links against the given pools, so
/// an exported material references assets the way source documents do.
pub fn externalize_links(asset: &Asset, pools: &AssetPools) -> Asset {
    let AssetPayload::Material(material) = &asset.payload else {
        return asset.clone();
    };
    let to_name = |link: &AssetLink| -> AssetLink {
        match link {
            AssetLink::Slot(slot) => match pools.get(*slot) {
                Some(target) => AssetLink::Name(target.name.clone()),
                None => AssetLink::None,
            },
            other => other.clone(),
        }
    };
    let mut material = material.clone();
    material.images = material.images.iter().map(to_name).collect();
    material.fallback = to_name(&material.fallback);
    Asset::new(asset.name.clone(), AssetPayload::Material(material))
}

/// Acquire an asset through its kind's fallback chain.
pub fn acquire(kind: AssetKind, name: &str, provider: &dyn SourceProvider) -> Result<Asset> {
    for form in kind.acquire_chain() {
        match provider.fetch(kind, *form, name) {
            Ok(Some(data)) => match parse_source(kind, name, *form, data, provider) {
                Ok(asset) => {
                    if *form != SourceForm::Canonical {
                        tracing::debug!(kind = %kind, name, form = form.name(), "acquired via fallback form");
                    }
                    return Ok(asset);
                }
                Err(error) => {
                    tracing::warn!(kind = %kind, name, form = form.name(), %error, "source form unusable, trying next");
                }
            },
            Ok(None) => {}
            Err(error) => {
                tracing::warn!(kind = %kind, name, form = form.name(), %error, "source fetch failed, trying next");
            }
        }
    }
    match default_asset(kind, name) {
        Some(asset) => {
            tracing::warn!(kind = %kind, name, "not found in any source, using default");
            Ok(asset)
        }
        None => Err(ZoneError::NotFound {
            kind,
            name: name.to_string(),
        }),
    }
}

fn unexpected(kind: AssetKind, form: SourceForm) -> ZoneError {
    ZoneError::Format(format!(
        "source returned unexpected content for {}/{} form",
        kind,
        form.name()
    ))
}

fn parse_source(
    kind: AssetKind,
    name: &str,
    form: SourceForm,
    data: SourceData,
    provider: &dyn SourceProvider,
) -> Result<Asset> {
    let asset = match (kind, form, data) {
        (AssetKind::Image, SourceForm::Canonical | SourceForm::Legacy, SourceData::Blob(bytes)) => {
            let (embedded, mut payload) = image::parse_canonical(&bytes)?;
            if embedded != name {
                tracing::warn!(kind = %kind, name, embedded, "canonical blob carries different name");
            }
            if form == SourceForm::Legacy {
                payload.streamed = true;
                payload.pixels = None;
            }
            if payload.streamed {
                for sub in 0..STREAM_BLOCK_COUNT {
                    payload.stream_levels[sub] = provider.fetch_stream_level(name, sub)?;
                }
            }
            Asset::new(name, AssetPayload::Image(payload))
        }
        (AssetKind::Image, SourceForm::External, SourceData::Image(ext)) => {
            Asset::new(name, AssetPayload::Image(image::from_external(ext)))
        }
        (AssetKind::Material, SourceForm::Canonical, SourceData::Blob(bytes)) => {
            let (_, payload) = material::parse_canonical(&bytes)?;
            Asset::new(name, AssetPayload::Material(payload))
        }
        (AssetKind::Material, SourceForm::External, SourceData::Text(text)) => {
            Asset::new(name, AssetPayload::Material(material::parse_external(&text)?))
        }
        (AssetKind::Sound, SourceForm::Canonical, SourceData::Blob(bytes)) => {
            let (_, payload) = sound::parse_canonical(&bytes)?;
            Asset::new(name, AssetPayload::Sound(payload))
        }
        (AssetKind::Sound, SourceForm::External, SourceData::Samples(ext)) => {
            Asset::new(name, AssetPayload::Sound(sound::from_external(ext)))
        }
        (AssetKind::StringTable, SourceForm::Canonical, SourceData::Blob(bytes)) => {
            let (_, payload) = string_table::parse_canonical(&bytes)?;
            Asset::new(name, AssetPayload::StringTable(payload))
        }
        (AssetKind::StringTable, SourceForm::External, SourceData::Text(text)) => Asset::new(
            name,
            AssetPayload::StringTable(string_table::parse_external(&text)),
        ),
        (AssetKind::Localize, SourceForm::Canonical, SourceData::Blob(bytes)) => {
            let (_, payload) = localize::parse_canonical(&bytes)?;
            Asset::new(name, AssetPayload::Localize(payload))
        }
        (AssetKind::Localize, SourceForm::External, SourceData::Text(value)) => Asset::new(
            name,
            AssetPayload::Localize(crate::assets::localize::LocalizeEntry { value }),
        ),
        (AssetKind::RawFile, SourceForm::Canonical, SourceData::Blob(bytes)) => {
            let (_, payload) = raw_file::parse_canonical(&bytes)?;
            Asset::new(name, AssetPayload::RawFile(payload))
        }
        (AssetKind::RawFile, SourceForm::External, SourceData::Bytes(data)) => {
            Asset::new(name, AssetPayload::RawFile(raw_file::RawFile { data }))
        }
        (kind, form, _) => return Err(unexpected(kind, form)),
    };
    Ok(asset)
}

/// The kind's synthesized default, where a safe one exists.
pub fn default_asset(kind: AssetKind, name: &str) -> Option<Asset> {
    let payload = match kind {
        AssetKind::Image => AssetPayload::Image(image::default_image()),
        AssetKind::StringTable => AssetPayload::StringTable(string_table::default_table()),
        AssetKind::Localize => AssetPayload::Localize(localize::default_entry()),
        AssetKind::RawFile => AssetPayload::RawFile(raw_file::default_file()),
        AssetKind::Material | AssetKind::Sound => return None,
    };
    Some(Asset::new(name, payload))
}
