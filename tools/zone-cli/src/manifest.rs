//! Zone.toml manifest parsing.
//!
//! Shared manifest structures used by the build command.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use zone_common::{AssetKind, AssetRef, PoolCapacities};

/// Zone.toml manifest structure
#[derive(Debug, Deserialize)]
pub struct ZoneManifest {
    pub zone: ZoneSection,
    #[serde(default)]
    pub assets: AssetsSection,
    #[serde(default)]
    pub pools: PoolsSection,
}

/// Zone metadata section
#[derive(Debug, Deserialize)]
pub struct ZoneSection {
    /// Zone name, used for the output file names
    pub name: String,
}

/// Assets section containing the requested top-level asset set.
///
/// A name prefixed with `,` is written as a reference-only stub resolved
/// from already loaded zones at load time.
#[derive(Debug, Default, Deserialize)]
pub struct AssetsSection {
    #[serde(default)]
    pub images: Vec<AssetEntry>,
    #[serde(default)]
    pub materials: Vec<AssetEntry>,
    #[serde(default)]
    pub sounds: Vec<AssetEntry>,
    #[serde(default)]
    pub stringtables: Vec<AssetEntry>,
    #[serde(default)]
    pub localize: Vec<AssetEntry>,
    #[serde(default)]
    pub rawfiles: Vec<AssetEntry>,
}

/// Single asset entry
#[derive(Debug, Deserialize)]
pub struct AssetEntry {
    pub name: String,
}

/// Optional per-kind pool capacity overrides
#[derive(Debug, Default, Deserialize)]
pub struct PoolsSection {
    pub image: Option<usize>,
    pub material: Option<usize>,
    pub sound: Option<usize>,
    pub stringtable: Option<usize>,
    pub localize: Option<usize>,
    pub rawfile: Option<usize>,
}

impl ZoneManifest {
    /// Load manifest from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest: {}", path.display()))?;
        Self::parse(&content)
    }

    /// Parse manifest from string
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse zone.toml")
    }

    /// The requested top-level asset set, in manifest order.
    pub fn requested(&self) -> Vec<AssetRef> {
        let mut requested = Vec::new();
        let sections = [
            (AssetKind::Image, &self.assets.images),
            (AssetKind::Material, &self.assets.materials),
            (AssetKind::Sound, &self.assets.sounds),
            (AssetKind::StringTable, &self.assets.stringtables),
            (AssetKind::Localize, &self.assets.localize),
            (AssetKind::RawFile, &self.assets.rawfiles),
        ];
        for (kind, entries) in sections {
            for entry in entries.iter() {
                requested.push(AssetRef::new(kind, entry.name.clone()));
            }
        }
        requested
    }

    /// Pool capacities with manifest overrides applied.
    pub fn capacities(&self) -> PoolCapacities {
        let mut caps = PoolCapacities::default();
        let overrides = [
            (AssetKind::Image, self.pools.image),
            (AssetKind::Material, self.pools.material),
            (AssetKind::Sound, self.pools.sound),
            (AssetKind::StringTable, self.pools.stringtable),
            (AssetKind::Localize, self.pools.localize),
            (AssetKind::RawFile, self.pools.rawfile),
        ];
        for (kind, capacity) in overrides {
            if let Some(capacity) = capacity {
                caps.set(kind, capacity);
            }
        }
        caps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal() {
        let manifest = ZoneManifest::parse("[zone]\nname = \"mp_dome\"\n").unwrap();
        assert_eq!(manifest.zone.name, "mp_dome");
        assert!(manifest.requested().is_empty());
    }

    #[test]
    fn test_parse_assets_and_pools() {
        let manifest = ZoneManifest::parse(
            r#"
[zone]
name = "mp_dome"

[[assets.materials]]
name = "mc/wood"

[[assets.images]]
name = ",shared_lightmap"

[[assets.rawfiles]]
name = "maps/mp/mp_dome.gsc"

[pools]
image = 123
"#,
        )
        .unwrap();

        let requested = manifest.requested();
        assert_eq!(requested.len(), 3);
        assert_eq!(requested[0], AssetRef::new(AssetKind::Image, ",shared_lightmap"));
        assert_eq!(requested[1], AssetRef::new(AssetKind::Material, "mc/wood"));
        assert_eq!(manifest.capacities().get(AssetKind::Image), 123);
        assert_eq!(
            manifest.capacities().get(AssetKind::Material),
            AssetKind::Material.default_capacity()
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(ZoneManifest::parse("zone = 1").is_err());
    }
}
