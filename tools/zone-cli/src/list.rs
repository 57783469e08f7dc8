//! List command - print the assets inside a zone.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use zone_common::{AssetPools, ZoneLoader};

/// Arguments for the list command
#[derive(Args)]
pub struct ListArgs {
    /// Zone file
    pub zone: PathBuf,

    /// Emit an archive-listing JSON document instead of plain lines
    #[arg(long)]
    pub json: bool,
}

/// Execute the list command
pub fn execute(args: ListArgs) -> Result<()> {
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
        .with_context(|| format!("Failed to load zone: {}", args.zone.display()))?;

    let assets: Vec<_> = loaded
        .assets
        .iter()
        .filter_map(|slot| slot.and_then(|s| pools.get(s)))
        .collect();

    if args.json {
        let children: Vec<serde_json::Value> = assets
            .iter()
            .map(|asset| {
                serde_json::json!({
                    "name": asset.name,
                    "path": format!("{}/{}/{}", zone_name, asset.kind(), asset.name),
                })
            })
            .collect();
        let doc = serde_json::json!({
            "zones": [{ "name": zone_name, "children": children }],
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
    } else {
        for asset in &assets {
            println!("{}/{}", asset.kind(), asset.name);
        }
        println!("{} assets in {}", assets.len(), zone_name);
    }

    Ok(())
}
