mod cli;
mod commands;
mod config;
mod report;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
    };

    let converged = match cli.command {
        Command::Apply(args) => commands::apply::run(&ctx, &args)?,
        Command::Plan(args) => {
            commands::plan::run(&ctx, &args)?;
            true
        }
        Command::Validate(args) => {
            commands::validate::run(&ctx, &args)?;
            true
        }
    };

    // Failed or timed-out resources fail the run; skips never do
    if !converged {
        std::process::exit(1);
    }
    Ok(())
}
