//! `converge apply` - run one convergence pass

use crate::cli::ApplyArgs;
use crate::config::Manifest;
use crate::report;
use crate::Context;
use anyhow::{Context as AnyhowContext, Result};
use reconcile::{CommandRunner, ExecuteOptions, Graph, ProcessRunner};
use std::sync::Arc;

/// Build the graph from the manifest and run it. Returns whether the run
/// converged (no resource failed or timed out).
pub fn run(ctx: &Context, args: &ApplyArgs) -> Result<bool> {
    let manifest = Manifest::load(&args.manifest)?;
    let mut bus = manifest.bus()?;
    let graph = Graph::build(manifest.resources(), &mut bus)
        .context("manifest does not form a valid resource graph")?;

    let runner: Arc<dyn CommandRunner> = Arc::new(ProcessRunner);
    let opts = ExecuteOptions {
        jobs: args.jobs.max(1) as usize,
        verbose: ctx.verbose > 0,
    };
    let report = reconcile::run(&graph, &mut bus, runner, &opts)?;

    if args.json {
        println!("{}", report::render_json(&report)?);
    } else if !ctx.quiet {
        report::render(&report);
    }

    Ok(report.is_converged())
}
