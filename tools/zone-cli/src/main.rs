//! Zoneforge CLI - build and unpack zone files
//!
//! # Commands
//!
//! - `zoneforge build` - Build a zone from a zone.toml manifest
//! - `zoneforge unpack` - Unpack a zone (or a directory of zones) into source files
//! - `zoneforge list` - List the assets inside a zone
//! - `zoneforge verify` - Load a zone and report per-asset health
//!
//! # Manifest (zone.toml)
//!
//! ```toml
//! [zone]
//! name = "mp_dome"
//!
//! [[assets.materials]]
//! name = "mc/wood_floor"
//!
//! [[assets.rawfiles]]
//! name = "maps/mp/mp_dome.gsc"
//!
//! # Optional: override per-kind pool capacities
//! [pools]
//! image = 50000
//! ```

mod build;
mod fs_source;
mod list;
mod manifest;
mod unpack;
mod verify;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// Zoneforge CLI - build and unpack zone files
#[derive(Parser)]
#[command(name = "zoneforge")]
#[command(about = "Build and unpack zone files")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a zone from a zone.toml manifest
    Build(build::BuildArgs),

    /// Unpack a zone (or every zone in a directory) into source files
    Unpack(unpack::UnpackArgs),

    /// List the assets inside a zone
    List(list::ListArgs),

    /// Load a zone and report per-asset health
    Verify(verify::VerifyArgs),
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Build(args) => build::execute(args),
        Commands::Unpack(args) => unpack::execute(args),
        Commands::List(args) => list::execute(args),
        Commands::Verify(args) => verify::execute(args),
    }
}
