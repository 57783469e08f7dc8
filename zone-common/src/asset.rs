//! Asset model: the closed set of asset kinds and the in-memory graph
//! nodes the engine builds and loads.

use std::fmt;

use crate::assets::image::{Image, ImageRecord};
use crate::assets::localize::{LocalizeEntry, LocalizeRecord};
use crate::assets::material::{Material, MaterialRecord};
use crate::assets::raw_file::{RawFile, RawFileRecord};
use crate::assets::sound::{Sound, SoundRecord};
use crate::assets::string_table::{StringTable, StringTableRecord};
use crate::pool::SlotId;
use crate::source::SourceForm;
use crate::wire::WireRecord;

/// Closed set of asset kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Image,
    Material,
    Sound,
    StringTable,
    Localize,
    RawFile,
}

impl AssetKind {
    pub const COUNT: usize = 6;

    pub const ALL: [AssetKind; Self::COUNT] = [
        AssetKind::Image,
        AssetKind::Material,
        AssetKind::Sound,
        AssetKind::StringTable,
        AssetKind::Localize,
        AssetKind::RawFile,
    ];

    /// Wire tag for the per-asset prelude.
    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.get(tag as usize).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            AssetKind::Image => "image",
            AssetKind::Material => "material",
            AssetKind::Sound => "sound",
            AssetKind::StringTable => "stringtable",
            AssetKind::Localize => "localize",
            AssetKind::RawFile => "rawfile",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.name() == name)
    }

    /// Size of this kind's fixed wire record.
    pub fn record_size(self) -> usize {
        match self {
            AssetKind::Image => ImageRecord::SIZE,
            AssetKind::Material => MaterialRecord::SIZE,
            AssetKind::Sound => SoundRecord::SIZE,
            AssetKind::StringTable => StringTableRecord::SIZE,
            AssetKind::Localize => LocalizeRecord::SIZE,
            AssetKind::RawFile => RawFileRecord::SIZE,
        }
    }

    /// Default pool capacity, sized from observed content sets.
    pub fn default_capacity(self) -> usize {
        match self {
            AssetKind::Image => 30000,
            AssetKind::Material => 18000,
            AssetKind::Sound => 4000,
            AssetKind::StringTable => 2000,
            AssetKind::Localize => 15000,
            AssetKind::RawFile => 2000,
        }
    }

    /// Ordered acquisition fallback chain for this kind. Executed by the
    /// generic loop in [`crate::dispatch::acquire`]; first success wins.
    pub fn acquire_chain(self) -> &'static [SourceForm] {
        match self {
            AssetKind::Image => &[
                SourceForm::Canonical,
                SourceForm::Legacy,
                SourceForm::External,
            ],
            _ => &[SourceForm::Canonical, SourceForm::External],
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identity of an asset: kind plus name, unique per kind in one session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetRef {
    pub kind: AssetKind,
    pub name: String,
}

impl AssetRef {
    pub fn new(kind: AssetKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.name)
    }
}

/// A reference from one asset to another, in its three lifecycle states:
/// by name while building, by zone-order index on the wire, by pool slot
/// once a load's fixup pass has resolved it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetLink {
    /// Absent or dropped reference.
    None,
    /// Build-side reference by target name.
    Name(String),
    /// Wire-side reference by index into the zone's asset order.
    Index(u32),
    /// Load-side reference resolved to a pool slot.
    Slot(SlotId),
}

impl AssetLink {
    pub fn is_none(&self) -> bool {
        matches!(self, AssetLink::None)
    }
}

/// A typed, named asset.
#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    pub name: String,
    pub payload: AssetPayload,
}

/// Per-kind payload data.
#[derive(Debug, Clone, PartialEq)]
pub enum AssetPayload {
    Image(Image),
    Material(Material),
    Sound(Sound),
    StringTable(StringTable),
    Localize(LocalizeEntry),
    RawFile(RawFile),
}

impl Asset {
    pub fn new(name: impl Into<String>, payload: AssetPayload) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }

    pub fn kind(&self) -> AssetKind {
        match &self.payload {
            AssetPayload::Image(_) => AssetKind::Image,
            AssetPayload::Material(_) => AssetKind::Material,
            AssetPayload::Sound(_) => AssetKind::Sound,
            AssetPayload::StringTable(_) => AssetKind::StringTable,
            AssetPayload::Localize(_) => AssetKind::Localize,
            AssetPayload::RawFile(_) => AssetKind::RawFile,
        }
    }

    pub fn asset_ref(&self) -> AssetRef {
        AssetRef::new(self.kind(), self.name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tag_roundtrip() {
        for kind in AssetKind::ALL {
            assert_eq!(AssetKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(AssetKind::from_tag(200), None);
    }

    #[test]
    fn test_kind_name_roundtrip() {
        for kind in AssetKind::ALL {
            assert_eq!(AssetKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(AssetKind::from_name("renderer"), None);
    }

    #[test]
    fn test_chain_starts_canonical() {
        for kind in AssetKind::ALL {
            assert_eq!(kind.acquire_chain()[0], SourceForm::Canonical);
        }
        // Images additionally probe the legacy streamed container.
        assert_eq!(AssetKind::Image.acquire_chain().len(), 3);
    }

    #[test]
    fn test_asset_ref_display() {
        let r = AssetRef::new(AssetKind::Image, "brick");
        assert_eq!(r.to_string(), "image/brick");
    }
}
