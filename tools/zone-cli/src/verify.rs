//! Verify command - load a zone and report per-asset health, including
//! stream-block availability.

use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};

use zone_common::{AssetPayload, AssetPools, ZoneLoader};
use zoneforge_shared::STREAM_BLOCK_COUNT;

use crate::fs_source::DirPackReader;

/// Arguments for the verify command
#[derive(Args)]
pub struct VerifyArgs {
    /// Zone file
    pub zone: PathBuf,
}

/// Execute the verify command
pub fn execute(args: VerifyArgs) -> Result<()> {
    let zone_name = args
        .zone
        .file_stem()
        .and_then(|s| s.to_str())
        .context("zone path has no usable file name")?
        .to_string();
    let blob = std::fs::read(&args.zone)
        .with_context(|| format!("Failed to read zone: {}", args.zone.display()))?;

    let pools = AssetPools::new();
    let loaded = ZoneLoader::new(&pools)
        .load(&zone_name, &blob)
        .with_context(|| format!("Zone \"{zone_name}\" failed to load"))?;

    let pack_dir = args.zone.parent().unwrap_or_else(|| Path::new("."));
    let pack_reader = DirPackReader::new(pack_dir, &zone_name);

    let mut unresolved = 0usize;
    let mut bad_blocks = 0usize;
    for (index, slot) in loaded.assets.iter().enumerate() {
        let Some(asset) = slot.and_then(|s| pools.get(s)) else {
            println!("  [{index}] UNRESOLVED reference stub");
            unresolved += 1;
            continue;
        };
        let streamed = matches!(&asset.payload, AssetPayload::Image(image) if image.streamed);
        if streamed {
            let mut available = 0usize;
            for sub in 0..STREAM_BLOCK_COUNT {
                match loaded.blocks.materialize(index as u32, sub as u8, &pack_reader) {
                    Ok(Some(_)) => available += 1,
                    Ok(None) => {}
                    Err(error) => {
                        bad_blocks += 1;
                        println!(
                            "  [{index}] {}/{}: stream block {sub} BAD: {error}",
                            asset.kind(),
                            asset.name
                        );
                    }
                }
            }
            println!(
                "  [{index}] {}/{} OK ({available} stream blocks)",
                asset.kind(),
                asset.name
            );
        } else {
            println!("  [{index}] {}/{} OK", asset.kind(), asset.name);
        }
    }

    println!();
    println!(
        "Zone \"{}\": {} assets, {} unresolved stubs, {} bad stream blocks",
        zone_name,
        loaded.assets.len(),
        unresolved,
        bad_blocks
    );
    Ok(())
}
