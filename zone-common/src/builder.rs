//! Zone builder: dependency-closure discovery and deterministic emission.
//!
//! The closure over `declare_dependencies` is breadth-first by discovery
//! order; that order is THE canonical asset order of the zone and two
//! builds over identical inputs produce byte-identical blobs. Each identity
//! is visited at most once, so reference cycles terminate naturally.
//!
//! Failure policy: a top-level asset that cannot be acquired fails the
//! build with its identity; a transitively discovered dependency that
//! cannot be acquired is logged, recorded in the build report and its
//! reference dropped.
//!
//! A requested name prefixed with `,` becomes a reference-only stub: the
//! zone records the identity and the loader resolves it against already
//! loaded pools.

use std::collections::VecDeque;

use hashbrown::HashSet;

use crate::asset::{Asset, AssetKind, AssetRef};
use crate::buffer::ZoneBuffer;
use crate::dispatch::{self, RefTable};
use crate::error::{Result, ZoneError};
use crate::pool::PoolCapacities;
use crate::source::SourceProvider;
use crate::stream_blocks::PackBuilder;

/// Outcome summary of one build.
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Every asset identity included in the zone, in canonical order.
    pub included: Vec<AssetRef>,
    /// Dropped dependency edges: (owner, missing target).
    pub dropped: Vec<(AssetRef, AssetRef)>,
}

/// A finished build: the zone blob, the companion pack bytes for streamed
/// blocks (empty when nothing is streamed), and the report.
#[derive(Debug)]
pub struct ZoneBuild {
    pub blob: Vec<u8>,
    pub pack: Vec<u8>,
    pub report: BuildReport,
}

enum Node {
    Full(Asset),
    Reference { kind: AssetKind, name: String },
}

/// Builds zones from requested top-level asset sets.
pub struct ZoneBuilder<'a> {
    provider: &'a dyn SourceProvider,
    capacities: PoolCapacities,
}

impl<'a> ZoneBuilder<'a> {
    pub fn new(provider: &'a dyn SourceProvider) -> Self {
        Self {
            provider,
            capacities: PoolCapacities::default(),
        }
    }

    /// Override the per-kind pool capacities the build is validated
    /// against.
    pub fn with_capacities(mut self, capacities: PoolCapacities) -> Self {
        self.capacities = capacities;
        self
    }

    /// Compute the dependency closure of `requested` and emit the zone.
    pub fn build(&self, requested: &[AssetRef]) -> Result<ZoneBuild> {
        let mut report = BuildReport::default();
        let mut visited: HashSet<AssetRef> = HashSet::new();
        let mut queue: VecDeque<(AssetRef, Option<AssetRef>)> = VecDeque::new();
        let mut nodes: Vec<Node> = Vec::new();

        for top in requested {
            if visited.insert(top.clone()) {
                queue.push_back((top.clone(), None));
            }
        }

        while let Some((asset_ref, owner)) = queue.pop_front() {
            if let Some(stub_name) = asset_ref.name.strip_prefix(',') {
                report
                    .included
                    .push(AssetRef::new(asset_ref.kind, stub_name));
                nodes.push(Node::Reference {
                    kind: asset_ref.kind,
                    name: stub_name.to_string(),
                });
                continue;
            }

            match dispatch::acquire(asset_ref.kind, &asset_ref.name, self.provider) {
                Ok(asset) => {
                    for dep in dispatch::dependencies(&asset) {
                        if visited.insert(dep.clone()) {
                            queue.push_back((dep, Some(asset_ref.clone())));
                        }
                    }
                    report.included.push(asset_ref);
                    nodes.push(Node::Full(asset));
                }
                Err(error) => match owner {
                    // Top-level acquisition failure is fatal to the build.
                    None => return Err(error),
                    Some(owner) => {
                        let dropped = ZoneError::DependencyUnresolved {
                            kind: asset_ref.kind,
                            name: asset_ref.name.clone(),
                            owner: owner.to_string(),
                        };
                        tracing::warn!(%dropped, cause = %error, "dropping reference");
                        report.dropped.push((owner, asset_ref));
                    }
                },
            }
        }

        self.check_capacities(&report.included)?;

        // Canonical order is fixed; assign zone indices and emit.
        let mut refs = RefTable::new();
        for (index, asset_ref) in report.included.iter().enumerate() {
            refs.insert(asset_ref.clone(), index as u32);
        }

        let mut buf = ZoneBuffer::new();
        let mut pack = PackBuilder::for_self_pack();
        for node in &nodes {
            match node {
                Node::Full(asset) => dispatch::write_asset(asset, &refs, &mut pack, &mut buf),
                Node::Reference { kind, name } => dispatch::write_reference(*kind, name, &mut buf),
            }
        }

        tracing::info!(
            assets = report.included.len(),
            dropped = report.dropped.len(),
            "zone built"
        );
        Ok(ZoneBuild {
            blob: buf.finish(),
            pack: pack.into_bytes(),
            report,
        })
    }

    fn check_capacities(&self, included: &[AssetRef]) -> Result<()> {
        let mut counts = [0usize; AssetKind::COUNT];
        for asset_ref in included {
            counts[asset_ref.kind.tag() as usize] += 1;
        }
        for kind in AssetKind::ALL {
            let capacity = self.capacities.get(kind);
            if counts[kind.tag() as usize] > capacity {
                return Err(ZoneError::PoolExhausted { kind, capacity });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::AssetLink;
    use crate::assets::material::MaterialSource;
    use crate::source::{MemorySource, SourceData, SourceForm};

    fn material_source(images: &[&str], fallback: Option<&str>) -> SourceData {
        let source = MaterialSource {
            technique: "lit".to_string(),
            sort_key: 0,
            surface_flags: 0,
            state_bits: 0,
            images: images.iter().map(|s| s.to_string()).collect(),
            fallback: fallback.map(str::to_string),
        };
        SourceData::Text(serde_json::to_string(&source).unwrap())
    }

    fn image_source() -> SourceData {
        SourceData::Image(crate::source::ExternalImage {
            format: 28,
            width: 2,
            height: 2,
            depth: 1,
            elements: 1,
            level_count: 1,
            pixels: vec![0xAA; 16],
        })
    }

    fn fixture() -> MemorySource {
        let mut source = MemorySource::new();
        source.insert(
            AssetKind::Material,
            SourceForm::External,
            "mc/a",
            material_source(&["img1", "img2"], Some("mc/b")),
        );
        source.insert(
            AssetKind::Material,
            SourceForm::External,
            "mc/b",
            material_source(&["img2", "img3"], Some("mc/a")),
        );
        for name in ["img1", "img2", "img3"] {
            source.insert(AssetKind::Image, SourceForm::External, name, image_source());
        }
        source
    }

    #[test]
    fn test_closure_is_breadth_first() {
        let source = fixture();
        let builder = ZoneBuilder::new(&source);
        let build = builder
            .build(&[AssetRef::new(AssetKind::Material, "mc/a")])
            .unwrap();
        let names: Vec<String> = build
            .report
            .included
            .iter()
            .map(|r| r.name.clone())
            .collect();
        assert_eq!(names, vec!["mc/a", "img1", "img2", "mc/b", "img3"]);
    }

    #[test]
    fn test_cycle_includes_each_once() {
        let source = fixture();
        let builder = ZoneBuilder::new(&source);
        let build = builder
            .build(&[AssetRef::new(AssetKind::Material, "mc/a")])
            .unwrap();
        let count = build
            .report
            .included
            .iter()
            .filter(|r| r.kind == AssetKind::Material)
            .count();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_closure_deterministic() {
        let source = fixture();
        let builder = ZoneBuilder::new(&source);
        let requested = [AssetRef::new(AssetKind::Material, "mc/a")];
        let first = builder.build(&requested).unwrap();
        let second = builder.build(&requested).unwrap();
        assert_eq!(first.report.included, second.report.included);
        // Byte-identical output is a correctness requirement.
        assert_eq!(first.blob, second.blob);
        assert_eq!(first.pack, second.pack);
    }

    #[test]
    fn test_top_level_failure_is_fatal() {
        let source = MemorySource::new();
        let builder = ZoneBuilder::new(&source);
        let err = builder
            .build(&[AssetRef::new(AssetKind::Sound, "sfx/missing")])
            .unwrap_err();
        match err {
            ZoneError::NotFound { kind, name } => {
                assert_eq!(kind, AssetKind::Sound);
                assert_eq!(name, "sfx/missing");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_transitive_failure_drops_reference() {
        let mut source = MemorySource::new();
        // Material references a sound-less... a missing material: sounds and
        // materials have no default, so the edge must be dropped.
        source.insert(
            AssetKind::Material,
            SourceForm::External,
            "mc/a",
            material_source(&[], Some("mc/ghost")),
        );
        let builder = ZoneBuilder::new(&source);
        let build = builder
            .build(&[AssetRef::new(AssetKind::Material, "mc/a")])
            .unwrap();
        assert_eq!(build.report.included.len(), 1);
        assert_eq!(build.report.dropped.len(), 1);
        assert_eq!(build.report.dropped[0].1.name, "mc/ghost");
    }

    #[test]
    fn test_missing_image_dependency_defaults_not_drops() {
        let mut source = MemorySource::new();
        source.insert(
            AssetKind::Material,
            SourceForm::External,
            "mc/a",
            material_source(&["img_missing"], None),
        );
        let builder = ZoneBuilder::new(&source);
        let build = builder
            .build(&[AssetRef::new(AssetKind::Material, "mc/a")])
            .unwrap();
        // Image kind synthesizes a default instead of failing.
        assert_eq!(build.report.included.len(), 2);
        assert!(build.report.dropped.is_empty());
    }

    #[test]
    fn test_reference_stub() {
        let source = fixture();
        let builder = ZoneBuilder::new(&source);
        let build = builder
            .build(&[
                AssetRef::new(AssetKind::Image, ",img_elsewhere"),
                AssetRef::new(AssetKind::Image, "img1"),
            ])
            .unwrap();
        assert_eq!(build.report.included[0].name, "img_elsewhere");
        assert_eq!(build.report.included.len(), 2);
    }

    #[test]
    fn test_capacity_rejection() {
        let source = fixture();
        let mut caps = PoolCapacities::default();
        caps.set(AssetKind::Image, 2);
        let builder = ZoneBuilder::new(&source).with_capacities(caps);
        let err = builder
            .build(&[AssetRef::new(AssetKind::Material, "mc/a")])
            .unwrap_err();
        assert!(matches!(
            err,
            ZoneError::PoolExhausted {
                kind: AssetKind::Image,
                capacity: 2
            }
        ));
    }

    #[test]
    fn test_dropped_reference_written_as_none() {
        let mut source = MemorySource::new();
        source.insert(
            AssetKind::Material,
            SourceForm::External,
            "mc/a",
            material_source(&[], Some("mc/ghost")),
        );
        let builder = ZoneBuilder::new(&source);
        let build = builder
            .build(&[AssetRef::new(AssetKind::Material, "mc/a")])
            .unwrap();

        // Read the single material back: its fallback must be None.
        let mut arena = crate::arena::ZoneArena::new();
        let mut cursor = crate::cursor::ZoneCursor::open(&build.blob).unwrap();
        let (tag, referenced) = cursor.read_asset_header().unwrap();
        assert_eq!(tag, AssetKind::Material.tag());
        assert!(!referenced);
        let asset = dispatch::read_asset(AssetKind::Material, &mut cursor, &mut arena).unwrap();
        match asset.payload {
            crate::asset::AssetPayload::Material(m) => {
                assert_eq!(m.fallback, AssetLink::None)
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }
}
