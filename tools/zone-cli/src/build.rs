//! Build command - create a zone (and companion pack) from a zone.toml
//! manifest.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use zone_common::ZoneBuilder;
use zoneforge_shared::ZONE_FORMAT;

use crate::fs_source::DirSource;
use crate::manifest::ZoneManifest;

/// Arguments for the build command
#[derive(Args)]
pub struct BuildArgs {
    /// Path to zone.toml manifest file
    #[arg(short, long, default_value = "zone.toml")]
    pub manifest: PathBuf,

    /// Output directory (defaults to the manifest's directory)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Asset source root (defaults to the manifest's directory)
    #[arg(long)]
    pub source_root: Option<PathBuf>,
}

/// Execute the build command
pub fn execute(args: BuildArgs) -> Result<()> {
    let manifest = ZoneManifest::load(&args.manifest)?;
    println!("Building zone: {}", manifest.zone.name);

    let project_dir = args
        .manifest
        .parent()
        .unwrap_or_else(|| std::path::Path::new("."))
        .to_path_buf();
    let source_root = args.source_root.unwrap_or_else(|| project_dir.clone());
    let output_dir = args.output.unwrap_or(project_dir);

    let requested = manifest.requested();
    if requested.is_empty() {
        anyhow::bail!("zone.toml declares no assets");
    }

    let source = DirSource::new(&source_root);
    let build = ZoneBuilder::new(&source)
        .with_capacities(manifest.capacities())
        .build(&requested)
        .with_context(|| format!("Failed to build zone \"{}\"", manifest.zone.name))?;

    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create output dir: {}", output_dir.display()))?;

    let zone_path = output_dir.join(ZONE_FORMAT.zone_file_name(&manifest.zone.name));
    std::fs::write(&zone_path, &build.blob)
        .with_context(|| format!("Failed to write zone: {}", zone_path.display()))?;

    if !build.pack.is_empty() {
        let pack_path = output_dir.join(ZONE_FORMAT.self_pack_name(&manifest.zone.name));
        std::fs::write(&pack_path, &build.pack)
            .with_context(|| format!("Failed to write pack: {}", pack_path.display()))?;
        println!("  Pack: {} ({} bytes)", pack_path.display(), build.pack.len());
    }

    for asset_ref in &build.report.included {
        println!("  Asset: {asset_ref}");
    }
    for (owner, missing) in &build.report.dropped {
        println!("  Dropped: {missing} (required by {owner})");
    }

    println!();
    println!(
        "Created: {} ({} bytes, {} assets, {} dropped refs)",
        zone_path.display(),
        build.blob.len(),
        build.report.included.len(),
        build.report.dropped.len()
    );

    Ok(())
}
