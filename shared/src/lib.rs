//! Zone format specification for zoneforge.
//!
//! This crate is the single source of truth for all zone-related constants:
//! file extensions, pack-file naming, companion stream-file naming, and the
//! directory layout used for human-authored asset sources.
//!
//! The zone blob itself is positional and carries no magic bytes or version
//! field; format compatibility is tracked out of band by callers. The
//! constants here only describe how files around a zone are named and found.
//!
//! # Example
//!
//! ```
//! use zoneforge_shared::ZONE_FORMAT;
//!
//! assert_eq!(ZONE_FORMAT.extension, "ff");
//! assert_eq!(ZONE_FORMAT.pack_file_name(2), "imagefile2.pak");
//! assert_eq!(
//!     ZONE_FORMAT.stream_file_name("wood_floor", 1),
//!     "wood_floor_stream1.pixels"
//! );
//! ```

/// Zone format specification.
///
/// Defines the file naming constants used for zone files, shared pack files
/// and companion stream files.
#[derive(Debug, Clone, Copy)]
pub struct ZoneFormat {
    /// Zone file extension without dot (e.g. "ff")
    pub extension: &'static str,

    /// Companion pack file extension without dot (e.g. "pak")
    pub pack_extension: &'static str,

    /// Prefix for shared, externally numbered pack files (e.g. "imagefile")
    pub pack_prefix: &'static str,

    /// Suffix for companion loose stream files (e.g. ".pixels")
    pub stream_suffix: &'static str,

    /// Directory holding human-authored image sources
    pub images_dir: &'static str,

    /// Directory holding companion stream files
    pub streamed_images_dir: &'static str,

    /// Directory holding human-authored material sources
    pub materials_dir: &'static str,

    /// Directory holding human-authored sound sources
    pub sounds_dir: &'static str,
}

/// Pack file index meaning "the zone's own companion pack", not a shared
/// numbered pack file.
pub const SELF_PACK_INDEX: u16 = 96;

/// Number of stream sub-blocks owned by one streamed asset.
pub const STREAM_BLOCK_COUNT: usize = 4;

impl ZoneFormat {
    /// Name of the shared pack file with the given index, or the zone's own
    /// companion pack for [`SELF_PACK_INDEX`].
    pub fn pack_file_name(&self, file_index: u16) -> String {
        format!("{}{}.{}", self.pack_prefix, file_index, self.pack_extension)
    }

    /// Name of the companion pack for a specific zone.
    pub fn self_pack_name(&self, zone_name: &str) -> String {
        format!("{}.{}", zone_name, self.pack_extension)
    }

    /// Name of the loose companion stream file for one sub-block of an asset.
    pub fn stream_file_name(&self, asset_name: &str, sub_index: usize) -> String {
        format!(
            "{}_stream{}{}",
            clean_name(asset_name),
            sub_index,
            self.stream_suffix
        )
    }

    /// Zone file name for a zone.
    pub fn zone_file_name(&self, zone_name: &str) -> String {
        format!("{}.{}", zone_name, self.extension)
    }
}

/// The zoneforge zone format.
pub const ZONE_FORMAT: ZoneFormat = ZoneFormat {
    extension: "ff",
    pack_extension: "pak",
    pack_prefix: "imagefile",
    stream_suffix: ".pixels",
    images_dir: "images",
    streamed_images_dir: "streamed_images",
    materials_dir: "materials",
    sounds_dir: "sounds",
};

/// Replace characters that are legal in asset names but not in file names.
///
/// Engine-internal names may start with `*` or `$` (generated images such as
/// lightmaps); on disk those become `_`.
pub fn clean_name(name: &str) -> String {
    name.chars()
        .map(|c| if c == '*' || c == '$' { '_' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_format_extension() {
        assert_eq!(ZONE_FORMAT.extension, "ff");
        assert_eq!(ZONE_FORMAT.zone_file_name("common"), "common.ff");
    }

    #[test]
    fn test_pack_file_name() {
        assert_eq!(ZONE_FORMAT.pack_file_name(1), "imagefile1.pak");
        assert_eq!(ZONE_FORMAT.pack_file_name(96), "imagefile96.pak");
        assert_eq!(ZONE_FORMAT.self_pack_name("mp_dome"), "mp_dome.pak");
    }

    #[test]
    fn test_stream_file_name() {
        assert_eq!(
            ZONE_FORMAT.stream_file_name("brick", 0),
            "brick_stream0.pixels"
        );
        assert_eq!(
            ZONE_FORMAT.stream_file_name("*lightmap0", 3),
            "_lightmap0_stream3.pixels"
        );
    }

    #[test]
    fn test_clean_name() {
        assert_eq!(clean_name("plain"), "plain");
        assert_eq!(clean_name("*reflection_probe1"), "_reflection_probe1");
        assert_eq!(clean_name("$outdoor"), "_outdoor");
    }

    #[test]
    fn test_stream_block_count() {
        assert_eq!(STREAM_BLOCK_COUNT, 4);
    }
}
