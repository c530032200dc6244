//! Manifest loading - the declarative input to one convergence run
//!
//! The manifest is the hand-off point from whatever produced the resource
//! declarations (out of scope here): a TOML file declaring defaults,
//! anchors, and resources. This module only deserializes and resolves
//! defaults; structural validation belongs to the graph builder.

use anyhow::{Context, Result};
use reconcile::{compose_command, AnchorBus, LogPolicy, Resource, RetryPolicy};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A declarative convergence manifest.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub defaults: Defaults,
    #[serde(default, rename = "anchor")]
    pub anchors: Vec<AnchorDecl>,
    #[serde(default, rename = "resource")]
    pub resources: Vec<ResourceDecl>,
}

/// Run-wide defaults applied to resources that don't override them.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Defaults {
    /// Run-as principal
    pub user: Option<String>,
    /// Single search-path directory
    pub path: Option<PathBuf>,
}

/// A declared anchor, optionally pre-fired by the external layer.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnchorDecl {
    pub name: String,
    /// Begin-phase anchors with no in-graph notifier are pre-fired to
    /// model an external change signal
    #[serde(default)]
    pub fired: bool,
}

/// One declared resource before defaults are resolved.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceDecl {
    pub id: String,
    /// Base command; flags and extra params are appended at composition
    pub command: String,
    #[serde(default)]
    pub flags: Vec<String>,
    #[serde(default)]
    pub extra_params: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub refresh_only: bool,
    #[serde(default)]
    pub tries: Option<u32>,
    /// Seconds between attempts
    #[serde(default)]
    pub try_sleep: Option<u64>,
    /// Overall ceiling in seconds
    #[serde(default)]
    pub timeout: Option<u64>,
    #[serde(default)]
    pub log_output: Option<LogPolicy>,
    #[serde(default)]
    pub subscribe: Vec<String>,
    #[serde(default)]
    pub notify: Option<String>,
}

impl Manifest {
    /// Load and parse a manifest file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest at {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("failed to parse manifest at {}", path.display()))
    }

    /// Create the run's anchor bus, pre-firing declared begin signals.
    pub fn bus(&self) -> Result<AnchorBus> {
        let mut bus = AnchorBus::new(self.anchors.iter().map(|a| a.name.clone()));
        for anchor in self.anchors.iter().filter(|a| a.fired) {
            bus.fire(&anchor.name)?;
        }
        Ok(bus)
    }

    /// Resolve declarations into engine resources, applying defaults.
    pub fn resources(&self) -> Vec<Resource> {
        self.resources
            .iter()
            .map(|decl| self.resolve(decl))
            .collect()
    }

    fn resolve(&self, decl: &ResourceDecl) -> Resource {
        let flags: Vec<(&str, bool)> = decl.flags.iter().map(|f| (f.as_str(), true)).collect();
        let command = compose_command(&decl.command, &flags, decl.extra_params.as_deref());

        let defaults = RetryPolicy::default();
        let retry = RetryPolicy {
            tries: decl.tries.unwrap_or(defaults.tries),
            try_sleep: decl
                .try_sleep
                .map_or(defaults.try_sleep, Duration::from_secs),
            timeout: decl.timeout.map_or(defaults.timeout, Duration::from_secs),
        };

        let mut resource = Resource::new(decl.id.as_str(), command).retry(retry);
        resource.user = decl.user.clone().or_else(|| self.defaults.user.clone());
        if let Some(path) = decl.path.as_ref().or(self.defaults.path.as_ref()) {
            resource.path = path.clone();
        }
        if let Some(policy) = decl.log_output {
            resource.log_policy = policy;
        }
        resource.refresh_only = decl.refresh_only;
        resource.subscribe = decl.subscribe.clone();
        resource.notify = decl.notify.clone();
        resource
    }
}
