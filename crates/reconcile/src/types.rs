//! Core types for resource reconciliation

use serde::{Deserialize, Serialize};
use std::process::Output;
use std::time::Duration;

/// Retry policy attached to a resource.
///
/// A pure numeric value object consumed by the execution engine: how many
/// attempts, how long to sleep between them, and a hard ceiling measured
/// from the first attempt's start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of attempts
    pub tries: u32,
    /// Sleep between attempts
    pub try_sleep: Duration,
    /// Overall ceiling measured from the first attempt's start
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            tries: 10,
            try_sleep: Duration::from_secs(5),
            timeout: Duration::from_secs(300),
        }
    }
}

impl RetryPolicy {
    /// Create a policy with custom settings.
    pub fn new(tries: u32, try_sleep: Duration, timeout: Duration) -> Self {
        Self {
            tries,
            try_sleep,
            timeout,
        }
    }

    /// Create a policy that attempts exactly once.
    pub fn no_retry() -> Self {
        Self {
            tries: 1,
            ..Default::default()
        }
    }
}

/// When to emit a resource's captured command output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogPolicy {
    /// Emit output only when the final attempt fails
    #[default]
    OnFailure,
    /// Emit output after every attempt
    Always,
    /// Never emit output
    Never,
}

/// Why a resource was skipped instead of executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Refresh-only resource and none of its subscribed anchors fired
    NotRefreshed,
    /// A predecessor in its dependency chain failed, so it never ran
    UpstreamFailed,
}

impl SkipReason {
    pub fn describe(&self) -> &'static str {
        match self {
            Self::NotRefreshed => "no subscribed anchor fired",
            Self::UpstreamFailed => "upstream resource failed",
        }
    }
}

/// Terminal outcome of one resource within one convergence run.
///
/// Immutable once recorded; discarded when the run's report is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionResult {
    /// Command ran and reported success
    Succeeded,
    /// Command was never invoked
    Skipped { reason: SkipReason },
    /// All attempts exhausted without success
    Failed { reason: String },
    /// The retry ceiling was reached before any attempt succeeded
    TimedOut,
}

impl ExecutionResult {
    /// Whether this outcome counts as fatal for the run's exit status.
    ///
    /// Skipped resources never fail a run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Failed { .. } | Self::TimedOut)
    }

    /// Whether this outcome fires the resource's notify anchor.
    pub fn fires_anchor(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

/// Per-run mapping of resource id to outcome, in declaration order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    entries: Vec<(String, ExecutionResult)>,
}

impl RunReport {
    pub fn new(entries: Vec<(String, ExecutionResult)>) -> Self {
        Self { entries }
    }

    /// Outcomes in declaration order.
    pub fn entries(&self) -> &[(String, ExecutionResult)] {
        &self.entries
    }

    /// Look up the outcome for a resource id.
    pub fn get(&self, id: &str) -> Option<&ExecutionResult> {
        self.entries.iter().find(|(rid, _)| rid == id).map(|(_, r)| r)
    }

    /// True when no resource terminated in `Failed` or `TimedOut`.
    pub fn is_converged(&self) -> bool {
        !self.entries.iter().any(|(_, r)| r.is_fatal())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Count outcomes matching a predicate.
    pub fn count_where<F: Fn(&ExecutionResult) -> bool>(&self, pred: F) -> usize {
        self.entries.iter().filter(|(_, r)| pred(r)).count()
    }
}

/// Options for one convergence run.
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Number of worker threads for independent subgraphs
    pub jobs: usize,
    /// Verbose output
    pub verbose: bool,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            jobs: 4,
            verbose: false,
        }
    }
}

/// Captured output from one command attempt.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub success: bool,
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        Self {
            stdout: output.stdout,
            stderr: output.stderr,
            success: output.status.success(),
        }
    }
}

impl CommandOutput {
    /// Get stdout as a string
    pub fn stdout_str(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    /// Get stderr as a string
    pub fn stderr_str(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_retry_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.tries, 10);
        assert_eq!(policy.try_sleep, Duration::from_secs(5));
        assert_eq!(policy.timeout, Duration::from_secs(300));
    }

    #[test]
    fn test_timeout_override_leaves_other_fields() {
        let policy = RetryPolicy {
            timeout: Duration::from_secs(750),
            ..Default::default()
        };
        assert_eq!(policy.tries, 10);
        assert_eq!(policy.try_sleep, Duration::from_secs(5));
        assert_eq!(policy.timeout, Duration::from_secs(750));
    }

    #[test]
    fn test_skipped_is_not_fatal() {
        assert!(!ExecutionResult::Succeeded.is_fatal());
        assert!(
            !ExecutionResult::Skipped {
                reason: SkipReason::UpstreamFailed
            }
            .is_fatal()
        );
        assert!(
            ExecutionResult::Failed {
                reason: "exit 1".into()
            }
            .is_fatal()
        );
        assert!(ExecutionResult::TimedOut.is_fatal());
    }

    #[test]
    fn test_report_converged() {
        let report = RunReport::new(vec![
            ("a".into(), ExecutionResult::Succeeded),
            (
                "b".into(),
                ExecutionResult::Skipped {
                    reason: SkipReason::NotRefreshed,
                },
            ),
        ]);
        assert!(report.is_converged());
        assert_eq!(report.get("a"), Some(&ExecutionResult::Succeeded));
        assert_eq!(report.get("missing"), None);

        let report = RunReport::new(vec![(
            "a".into(),
            ExecutionResult::Failed {
                reason: "exit 1".into(),
            },
        )]);
        assert!(!report.is_converged());
    }
}
