//! # Reconcile
//!
//! An idempotent, dependency-ordered resource reconciler.
//!
//! Declared resources (one-shot commands with retry policy and anchor
//! wiring) are assembled into an acyclic graph and driven to terminal
//! state exactly once per convergence run.
//!
//! ## Core Concepts
//!
//! - **Resource**: one idempotent, possibly retried unit of work
//! - **Anchor**: a named synchronization point between phases; fired on
//!   success, monotonic within a run
//! - **Graph**: resources plus resolved anchor edges, cycle-checked
//! - **Engine**: topological execution with retry/timeout policy,
//!   refresh-only gating, and failure containment
//!
//! ## Example
//!
//! ```ignore
//! use reconcile::{AnchorBus, CommandRunner, ExecuteOptions, Graph, ProcessRunner, Resource};
//! use std::sync::Arc;
//!
//! let mut bus = AnchorBus::new(["install::end", "dbsync::end"]);
//! let graph = Graph::build(
//!     vec![
//!         Resource::new("install", "pkg-install ").notify("install::end"),
//!         Resource::new("db-sync", "db-upgrade ")
//!             .refresh_only()
//!             .subscribe("install::end")
//!             .notify("dbsync::end"),
//!     ],
//!     &mut bus,
//! )?;
//!
//! let runner: Arc<dyn CommandRunner> = Arc::new(ProcessRunner);
//! let report = reconcile::run(&graph, &mut bus, runner, &ExecuteOptions::default())?;
//! assert!(report.is_converged());
//! ```
//!
//! ## Provider Traits
//!
//! Command invocation goes through [`CommandRunner`], so callers can
//! substitute mocks or wrap invocation with their own policy without the
//! engine knowing.

pub mod anchor;
pub mod engine;
pub mod error;
pub mod graph;
pub mod resource;
pub mod runner;
pub mod types;

// Re-export main types at crate root
pub use anchor::AnchorBus;
pub use engine::run;
pub use error::Error;
pub use graph::{Graph, Node};
pub use resource::{compose_command, Resource};
pub use runner::{CommandRunner, ProcessRunner};
pub use types::{
    CommandOutput, ExecuteOptions, ExecutionResult, LogPolicy, RetryPolicy, RunReport, SkipReason,
};
