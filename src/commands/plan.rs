//! `converge plan` - show execution order without running anything

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

    if ctx.quiet {
        return Ok(());
    }

    for (position, index) in graph.topo_order().into_iter().enumerate() {
        let resource = &graph.nodes()[index].resource;
        let mut line = format!("{:3}. {}", position + 1, resource.id);
        if resource.refresh_only {
            line.push_str(&format!(" {}", "(refresh-only)".dimmed()));
        }
        println!("{line}");
        if ctx.verbose > 0 {
            if !resource.subscribe.is_empty() {
                println!("       subscribes: {}", resource.subscribe.join(", ").dimmed());
            }
            if let Some(anchor) = &resource.notify {
                println!("       notifies:   {}", anchor.dimmed());
            }
        }
    }
    Ok(())
}
