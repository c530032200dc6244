//! `converge validate` - check manifest and graph wiring

use crate::cli::ManifestArgs;
use crate::config::Manifest;
use crate::Context;
use anyhow::{Context as AnyhowContext, Result};
use colored::Colorize;
use reconcile::Graph;

pub fn run(ctx: &Context, args: &ManifestArgs) -> Result<()> {
    let manifest = Manifest::load(&args.manifest)?;
    let mut bus = manifest.bus()?;
    let graph = Graph::build(manifest.resources(), &mut bus)
        .context("manifest does not form a valid resource graph")?;

    if !ctx.quiet {
        println!(
            "{} {} resources, {} anchors, no cycles",
            "✓".green(),
            graph.len(),
            bus.names().count()
        );
    }
    Ok(())
}
