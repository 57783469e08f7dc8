//! Unpack command - export a zone's assets back into source files.
//!
//! Accepts a single zone file or a directory of zones; with `--walk` the
//! directory is searched recursively. Per-zone failures in a batch are
//! reported and do not abort the remaining zones.

use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use zone_common::{dispatch, AssetPayload, AssetPools, ExportSink, ZoneLoader};
use zoneforge_shared::{STREAM_BLOCK_COUNT, ZONE_FORMAT};

use crate::fs_source::{DirPackReader, DirSink};

/// Arguments for the unpack command
#[derive(Args)]
pub struct UnpackArgs {
    /// Zone file, or a directory containing zone files
    pub zone: PathBuf,

    /// Output directory
    #[arg(short, long, default_value = "dump")]
    pub output: PathBuf,

    /// Search the directory recursively
    #[arg(long)]
    pub walk: bool,
}

/// Execute the unpack command
pub fn execute(args: UnpackArgs) -> Result<()> {
    if args.zone.is_dir() {
        return execute_batch(&args.zone, &args.output, args.walk);
    }
    unpack_zone(&args.zone, &args.output)
}

fn collect_zones(dir: &Path, walk: bool) -> Vec<PathBuf> {
    let mut zones: Vec<PathBuf> = WalkDir::new(dir)
        .max_depth(if walk { usize::MAX } else { 1 })
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            p.extension()
                .is_some_and(|ext| ext == ZONE_FORMAT.extension)
        })
        .collect();
    // Stable order for reproducible batch runs.
    zones.sort();
    zones
}

fn execute_batch(dir: &Path, output: &Path, walk: bool) -> Result<()> {
    let zones = collect_zones(dir, walk);
    if zones.is_empty() {
        anyhow::bail!("no .{} files in {}", ZONE_FORMAT.extension, dir.display());
    }
    let mut failures = 0usize;
    for zone in &zones {
        println!("Unpacking zone \"{}\"", zone.display());
        if let Err(error) = unpack_zone(zone, output) {
            failures += 1;
            println!("  FAILED: {error:#}");
        }
    }
    println!(
        "Batch unpack complete ({} zones, {} failed)",
        zones.len(),
        failures
    );
    Ok(())
}

fn unpack_zone(zone_path: &Path, output: &Path) -> Result<()> {
    let zone_name = zone_path
        .file_stem()
        .and_then(|s| s.to_str())
        .context("zone path has no usable file name")?
        .to_string();
    let blob = std::fs::read(zone_path)
        .with_context(|| format!("Failed to read zone: {}", zone_path.display()))?;

    // Each unpack is its own load session.
    let pools = AssetPools::new();
    let loaded = ZoneLoader::new(&pools)
        .load(&zone_name, &blob)
        .with_context(|| format!("Failed to load zone: {}", zone_path.display()))?;

    let pack_dir = zone_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    let pack_reader = DirPackReader::new(pack_dir, &zone_name);
    let mut sink = DirSink::new(output);

    let mut exported = 0usize;
    for (index, slot) in loaded.assets.iter().enumerate() {
        let Some(asset) = slot.and_then(|s| pools.get(s)) else {
            continue;
        };
        let externalized = dispatch::externalize_links(&asset, &pools);
        sink.export(
            externalized.kind(),
            &externalized.name,
            dispatch::export_data(&externalized),
        )
        .with_context(|| format!("Failed to export {}", externalized.name))?;
        exported += 1;

        let streamed = matches!(&asset.payload, AssetPayload::Image(image) if image.streamed);
        if streamed {
            for sub in 0..STREAM_BLOCK_COUNT {
                match loaded.blocks.materialize(index as u32, sub as u8, &pack_reader) {
                    Ok(Some(bytes)) => {
                        sink.export_stream_level(&asset.name, sub, &bytes)
                            .with_context(|| {
                                format!("Failed to write stream level {sub} of {}", asset.name)
                            })?;
                    }
                    Ok(None) => {}
                    // Block-local failure: the rest of the asset is intact.
                    Err(error) => {
                        println!("  Stream block {sub} of {} unavailable: {error}", asset.name);
                    }
                }
            }
        }
    }

    println!("  {} assets -> {}", exported, output.display());
    Ok(())
}
