//! Anchor bus - named synchronization points between phases
//!
//! Anchors let phases (install, config, db-sync) signal completion without
//! hard-coding a linear order. Within one run an anchor is monotonic: once
//! fired it stays fired, and firing again is a no-op. Querying an anchor
//! that was never declared is an error, never a silent `false`.

use crate::error::{Error, Result};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Default, Clone)]
struct AnchorState {
    fired: bool,
    /// Resource ids waiting on this anchor
    subscribers: BTreeSet<String>,
    /// Resource ids that fire this anchor on success
    notifiers: BTreeSet<String>,
}

/// Run-scoped registry of declared anchors and their fired state.
#[derive(Debug, Default, Clone)]
pub struct AnchorBus {
    anchors: BTreeMap<String, AnchorState>,
}

impl AnchorBus {
    /// Create a bus with the given declared anchor names.
    pub fn new<I, S>(declared: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            anchors: declared
                .into_iter()
                .map(|name| (name.into(), AnchorState::default()))
                .collect(),
        }
    }

    /// Whether this anchor name was declared.
    pub fn contains(&self, anchor: &str) -> bool {
        self.anchors.contains_key(anchor)
    }

    /// Declared anchor names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.anchors.keys().map(String::as_str)
    }

    /// Fire an anchor. Idempotent: re-firing a fired anchor is a no-op.
    pub fn fire(&mut self, anchor: &str) -> Result<()> {
        let state = self.state_mut(anchor)?;
        state.fired = true;
        Ok(())
    }

    /// Whether an anchor has fired this run.
    pub fn has_fired(&self, anchor: &str) -> Result<bool> {
        Ok(self.state(anchor)?.fired)
    }

    /// Resource ids subscribed to an anchor.
    pub fn subscribers_of(&self, anchor: &str) -> Result<&BTreeSet<String>> {
        Ok(&self.state(anchor)?.subscribers)
    }

    /// Resource ids that fire an anchor on success.
    pub fn notifiers_of(&self, anchor: &str) -> Result<&BTreeSet<String>> {
        Ok(&self.state(anchor)?.notifiers)
    }

    pub(crate) fn register_subscriber(&mut self, anchor: &str, resource: &str) -> Result<()> {
        self.state_mut(anchor)?.subscribers.insert(resource.into());
        Ok(())
    }

    pub(crate) fn register_notifier(&mut self, anchor: &str, resource: &str) -> Result<()> {
        self.state_mut(anchor)?.notifiers.insert(resource.into());
        Ok(())
    }

    fn state(&self, anchor: &str) -> Result<&AnchorState> {
        self.anchors.get(anchor).ok_or_else(|| Error::UnknownAnchor {
            anchor: anchor.into(),
            resource: None,
        })
    }

    fn state_mut(&mut self, anchor: &str) -> Result<&mut AnchorState> {
        self.anchors
            .get_mut(anchor)
            .ok_or_else(|| Error::UnknownAnchor {
                anchor: anchor.into(),
                resource: None,
            })
    }
}
