//! Zone serialization engine.
//!
//! A zone is a single relocatable blob holding a closed graph of typed
//! assets (images, materials, sounds, localization strings, ...), plus
//! out-of-band stream blocks for large payloads referenced by byte ranges
//! inside shared pack files.
//!
//! # Architecture
//!
//! ```text
//! build:  sources --acquire--> closure (ZoneBuilder) --write--> ZoneBuffer --> blob + pack
//! load:   blob --> ZoneCursor --read--> fixup --> AssetPools --> live graph
//!                                                   |
//!                               StreamBlockIndex ---+--> lazy block materialization
//! ```
//!
//! The single most safety-critical contract in this crate is the
//! visitation-order contract between [`buffer::ZoneBuffer`] and
//! [`cursor::ZoneCursor`]: for every asset kind, the write sequence
//! (record, then each variable-length child in field-declaration order)
//! must exactly match the read sequence. Marker fields and explicit
//! reference indices make divergence detectable at read time.
//!
//! The build path is single-threaded and deterministic: two builds over
//! identical inputs produce byte-identical zones. Load sessions are
//! independent; concurrent loads share only pool-slot allocation, which is
//! mutex-synchronized.

pub mod arena;
pub mod asset;
pub mod assets;
pub mod buffer;
pub mod builder;
pub mod codec;
pub mod cursor;
pub mod dispatch;
pub mod error;
pub mod loader;
pub mod pool;
pub mod source;
pub mod stream_blocks;
pub mod wire;

pub use arena::ZoneArena;
pub use asset::{Asset, AssetKind, AssetLink, AssetPayload, AssetRef};
pub use buffer::{WriteHandle, ZoneBuffer, ZoneStream};
pub use builder::{BuildReport, ZoneBuild, ZoneBuilder};
pub use cursor::{ZoneCursor, ZoneIndex};
pub use error::{Result, ZoneError};
pub use loader::{LoadedZone, ZoneLoader};
pub use pool::{AssetPools, PoolCapacities, SlotId};
pub use source::{
    ExportSink, ExternalImage, ExternalSound, MemorySink, MemorySource, SourceData, SourceForm,
    SourceProvider,
};
pub use stream_blocks::{PackBuilder, PackFileReader, StreamBlockIndex, StreamFileEntry};
