//! Construction-time errors for resource reconciliation.
//!
//! These cover everything that can go wrong before execution starts:
//! bad resource definitions and broken graph wiring. Execution-time
//! outcomes are data (`ExecutionResult`), not errors - a failed command
//! is recorded and reported, it does not abort graph construction.

use thiserror::Error;

/// Errors raised while validating resources or building the graph.
///
/// Any of these is fatal to the whole run: the engine never starts.
#[derive(Debug, Error)]
pub enum Error {
    /// A resource definition failed validation
    #[error("invalid resource '{id}': {reason}")]
    Validation {
        /// Id of the offending resource
        id: String,
        /// What was wrong with it
        reason: String,
    },

    /// Two resources were declared with the same id
    #[error("duplicate resource id '{id}'")]
    DuplicateResource { id: String },

    /// An anchor was referenced or queried but never declared
    #[error("unknown anchor '{anchor}'{}", .resource.as_ref().map(|r| format!(" (referenced by resource '{r}')")).unwrap_or_default())]
    UnknownAnchor {
        anchor: String,
        /// Referencing resource, when the reference came from one
        resource: Option<String>,
    },

    /// The dependency graph contains a directed cycle
    #[error("dependency cycle involving resources: {}", ids.join(" -> "))]
    CycleDetected {
        /// Resource ids participating in the cycle, in walk order
        ids: Vec<String>,
    },
}

/// Convenience alias for construction-time results.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_display_names_participants() {
        let err = Error::CycleDetected {
            ids: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(
            err.to_string(),
            "dependency cycle involving resources: a -> b -> a"
        );
    }

    #[test]
    fn test_unknown_anchor_display() {
        let err = Error::UnknownAnchor {
            anchor: "install::end".into(),
            resource: Some("db-sync".into()),
        };
        assert!(err.to_string().contains("install::end"));
        assert!(err.to_string().contains("db-sync"));
    }
}
