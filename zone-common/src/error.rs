//! Error taxonomy for zone builds and loads.
//!
//! Every failure mode carries enough identity to point at the failing asset:
//! build failures name the asset, load failures name the zone and the asset
//! index inside it. Nothing here is ever silently swallowed; degraded paths
//! (fallback acquisition, dropped dependencies) emit `tracing` diagnostics
//! at their call sites.

use crate::asset::AssetKind;

/// Errors produced by the zone engine.
#[derive(Debug, thiserror::Error)]
pub enum ZoneError {
    /// No acquisition source had the asset. Triggers the fallback chain;
    /// only surfaces when the chain is exhausted and the kind has no
    /// synthesized default.
    #[error("asset not found: {kind}/{name}")]
    NotFound { kind: AssetKind, name: String },

    /// Structural corruption while reading a blob (bad marker, impossible
    /// count, malformed index). Aborts that asset's reconstruction.
    #[error("malformed zone data: {0}")]
    Format(String),

    /// The blob ended before a read request could be satisfied.
    #[error("truncated zone data at offset {offset}: needed {needed} bytes, {available} available")]
    TruncatedData {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// A per-type pool ran out of slots. Fatal to the current build or load;
    /// capacities must be sized ahead of time.
    #[error("asset pool exhausted for {kind} (capacity {capacity})")]
    PoolExhausted { kind: AssetKind, capacity: usize },

    /// Pool growth attempted after the growth window closed (registry
    /// sealed, or the kind's single growth already used).
    #[error("pool growth rejected for {kind}: growth window closed")]
    PoolSealed { kind: AssetKind },

    /// Stream-block decompression failed or produced the wrong length.
    /// Asset-local: the block is unavailable, the asset remains usable.
    #[error("stream block codec failure: {0}")]
    Codec(String),

    /// A transitively discovered dependency could not be acquired. The
    /// reference is dropped and the build continues; this variant exists for
    /// build reports, not for aborting.
    #[error("unresolved dependency {kind}/{name} (required by {owner})")]
    DependencyUnresolved {
        kind: AssetKind,
        name: String,
        owner: String,
    },

    /// A load failed on a specific asset inside a zone.
    #[error("zone \"{zone}\" failed at asset index {index}: {source}")]
    LoadFailed {
        zone: String,
        index: u32,
        #[source]
        source: Box<ZoneError>,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ZoneError>;

impl ZoneError {
    /// Wrap an error with the zone / asset-index identity of a failed load.
    pub fn in_zone(self, zone: &str, index: u32) -> Self {
        ZoneError::LoadFailed {
            zone: zone.to_string(),
            index,
            source: Box::new(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_carries_identity() {
        let err = ZoneError::NotFound {
            kind: AssetKind::Material,
            name: "mc/wood".to_string(),
        };
        assert_eq!(err.to_string(), "asset not found: material/mc/wood");
    }

    #[test]
    fn test_load_failed_wraps_source() {
        let inner = ZoneError::TruncatedData {
            offset: 40,
            needed: 8,
            available: 2,
        };
        let err = inner.in_zone("mp_dome", 3);
        let msg = err.to_string();
        assert!(msg.contains("mp_dome"));
        assert!(msg.contains("index 3"));
    }
}
