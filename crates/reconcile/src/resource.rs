//! Resource model - one idempotent, possibly retried unit of work
//!
//! A resource describes a one-shot command together with its retry policy,
//! the anchors it subscribes to, and the anchor it notifies on success.
//! Resources are declared once per convergence run by the manifest layer
//! and consumed read-only by the graph builder.

use crate::error::{Error, Result};
use crate::types::{LogPolicy, RetryPolicy};
use std::path::PathBuf;

/// A declared one-shot operation with dependency wiring.
#[derive(Debug, Clone)]
pub struct Resource {
    /// Unique id within the run
    pub id: String,
    /// Full command string to invoke
    pub command: String,
    /// Single directory the command is resolved against
    pub path: PathBuf,
    /// Principal to run the command as; `None` means the current user
    pub user: Option<String>,
    /// When to emit captured command output
    pub log_policy: LogPolicy,
    /// Run only if a subscribed anchor fired this run
    pub refresh_only: bool,
    /// Attempts, sleep between attempts, overall ceiling
    pub retry: RetryPolicy,
    /// Anchors this resource waits on
    pub subscribe: Vec<String>,
    /// Anchor fired when this resource succeeds
    pub notify: Option<String>,
}

impl Resource {
    /// Create a resource with defaults: current user, `/usr/bin` search
    /// path, `on_failure` logging, default retry policy, no wiring.
    pub fn new(id: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            command: command.into(),
            path: PathBuf::from("/usr/bin"),
            user: None,
            log_policy: LogPolicy::default(),
            refresh_only: false,
            retry: RetryPolicy::default(),
            subscribe: Vec::new(),
            notify: None,
        }
    }

    /// Set the run-as principal.
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Set the search path directory.
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    /// Mark this resource refresh-only.
    pub fn refresh_only(mut self) -> Self {
        self.refresh_only = true;
        self
    }

    /// Replace the retry policy.
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Subscribe to an anchor.
    pub fn subscribe(mut self, anchor: impl Into<String>) -> Self {
        self.subscribe.push(anchor.into());
        self
    }

    /// Set the anchor to fire on success.
    pub fn notify(mut self, anchor: impl Into<String>) -> Self {
        self.notify = Some(anchor.into());
        self
    }

    /// Reject definitions the engine must never see.
    ///
    /// A refresh-only resource with nothing to subscribe to could never
    /// run, so it is a configuration error rather than a permanent skip.
    pub fn validate(&self) -> Result<()> {
        if self.command.trim().is_empty() {
            return Err(Error::Validation {
                id: self.id.clone(),
                reason: "command is empty".into(),
            });
        }
        if self.retry.tries < 1 {
            return Err(Error::Validation {
                id: self.id.clone(),
                reason: "retry count must be at least 1".into(),
            });
        }
        if self.retry.timeout.is_zero() {
            return Err(Error::Validation {
                id: self.id.clone(),
                reason: "timeout must be positive".into(),
            });
        }
        if self.refresh_only && self.subscribe.is_empty() {
            return Err(Error::Validation {
                id: self.id.clone(),
                reason: "refresh-only resource subscribes to no anchors".into(),
            });
        }
        Ok(())
    }
}

/// Compose a command string from a base, optional flags, and extra params.
///
/// Flags are emitted in the caller-supplied order, only when enabled, each
/// separated by a single space. The extra-params string, when present,
/// follows the flags. With no flags and no extra params the result is the
/// base followed by a single trailing space - downstream consumers compare
/// command strings literally, so the trailing space is load-bearing.
pub fn compose_command(base: &str, flags: &[(&str, bool)], extra_params: Option<&str>) -> String {
    let mut parts: Vec<&str> = flags
        .iter()
        .filter(|(_, enabled)| *enabled)
        .map(|(flag, _)| *flag)
        .collect();
    if let Some(extra) = extra_params
        && !extra.is_empty()
    {
        parts.push(extra);
    }

    if parts.is_empty() {
        format!("{base} ")
    } else {
        format!("{base} {}", parts.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_compose_default_keeps_trailing_space() {
        let cmd = compose_command("ceilometer-upgrade", &[], None);
        assert_eq!(cmd, "ceilometer-upgrade ");
    }

    #[test]
    fn test_compose_with_flag_and_extra_params() {
        let cmd = compose_command(
            "ceilometer-upgrade",
            &[("--skip-gnocchi-resource-types", true)],
            Some("--config-file=/etc/ceilometer/ceilometer_01.conf"),
        );
        assert_eq!(
            cmd,
            "ceilometer-upgrade --skip-gnocchi-resource-types \
             --config-file=/etc/ceilometer/ceilometer_01.conf"
        );
    }

    #[test]
    fn test_compose_disabled_flag_not_emitted() {
        let cmd = compose_command(
            "ceilometer-upgrade",
            &[("--skip-gnocchi-resource-types", false)],
            Some("--debug"),
        );
        assert_eq!(cmd, "ceilometer-upgrade --debug");
    }

    #[test]
    fn test_compose_flag_order_is_caller_order() {
        let cmd = compose_command("tool", &[("--b", true), ("--a", true)], None);
        assert_eq!(cmd, "tool --b --a");
    }

    #[test]
    fn test_validate_rejects_empty_command() {
        let res = Resource::new("db-sync", "  ").validate();
        assert!(matches!(res, Err(Error::Validation { .. })));
    }

    #[test]
    fn test_validate_rejects_zero_tries() {
        let resource = Resource::new("db-sync", "ceilometer-upgrade ").retry(RetryPolicy::new(
            0,
            Duration::from_secs(5),
            Duration::from_secs(300),
        ));
        assert!(resource.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let resource = Resource::new("db-sync", "ceilometer-upgrade ").retry(RetryPolicy::new(
            10,
            Duration::from_secs(5),
            Duration::ZERO,
        ));
        assert!(resource.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unsubscribed_refresh_only() {
        let resource = Resource::new("db-sync", "ceilometer-upgrade ").refresh_only();
        let err = resource.validate().unwrap_err();
        assert!(err.to_string().contains("refresh-only"));

        let resource = Resource::new("db-sync", "ceilometer-upgrade ")
            .refresh_only()
            .subscribe("install::end");
        assert!(resource.validate().is_ok());
    }
}
