use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "converge")]
#[command(version)]
#[command(about = "Dependency-ordered resource reconciler", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run every declared resource to a terminal state
    Apply(ApplyArgs),

    /// Print the execution order without running anything
    Plan(ManifestArgs),

    /// Check the manifest and graph wiring without running anything
    Validate(ManifestArgs),
}

#[derive(Args)]
pub struct ApplyArgs {
    /// Manifest declaring anchors and resources
    #[arg(short = 'f', long = "file")]
    pub manifest: PathBuf,

    /// Worker threads for independent subgraphs
    #[arg(short, long, default_value_t = 4)]
    pub jobs: u32,

    /// Emit the convergence report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct ManifestArgs {
    /// Manifest declaring anchors and resources
    #[arg(short = 'f', long = "file")]
    pub manifest: PathBuf,
}
