//! Command invocation seam
//!
//! The engine never spawns processes directly; it goes through this trait
//! so tests can substitute mocks with invocation counters and callers can
//! wrap invocation with their own policy.

use crate::resource::Resource;
use crate::types::CommandOutput;
use anyhow::{Context, Result};
use std::process::Command;

/// Invokes one attempt of a resource's command.
pub trait CommandRunner: Send + Sync {
    /// Run the resource's command once and capture its output.
    ///
    /// An `Err` means the command could not be invoked at all (missing
    /// binary, bad principal); a non-success `CommandOutput` means it ran
    /// and failed. The engine treats both as a failed attempt.
    fn run(&self, resource: &Resource) -> Result<CommandOutput>;
}

/// Spawns the command as a real process.
///
/// The command's first token is the program, resolved against the
/// resource's single search-path directory via `PATH`. When the resource
/// names a run-as principal, the process is wrapped in non-interactive
/// `sudo -u`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&self, resource: &Resource) -> Result<CommandOutput> {
        let mut tokens = resource.command.split_whitespace();
        let program = tokens
            .next()
            .with_context(|| format!("resource '{}' has an empty command", resource.id))?;
        let args: Vec<&str> = tokens.collect();

        let mut command = match &resource.user {
            Some(user) => {
                let mut c = Command::new("sudo");
                c.args(["-n", "-u", user, "--", program]);
                c
            }
            None => Command::new(program),
        };

        let output = command
            .args(&args)
            .env("PATH", &resource.path)
            .output()
            .with_context(|| format!("failed to invoke command for resource '{}'", resource.id))?;

        Ok(output.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_runner_captures_success() {
        // `true` lives in /usr/bin on every supported platform here
        let resource = Resource::new("noop", "true").path("/usr/bin");
        let output = ProcessRunner.run(&resource).unwrap();
        assert!(output.success);
    }

    #[test]
    fn test_process_runner_captures_failure() {
        let resource = Resource::new("noop", "false").path("/usr/bin");
        let output = ProcessRunner.run(&resource).unwrap();
        assert!(!output.success);
    }

    #[test]
    fn test_process_runner_missing_binary_is_invocation_error() {
        let resource = Resource::new("ghost", "definitely-not-a-binary").path("/usr/bin");
        assert!(ProcessRunner.run(&resource).is_err());
    }
}
