//! State framework accessors consumed by the lifecycle orchestrator.
//!
//! The host framework owns desired versus observed state. The orchestrator
//! only needs the narrow surface of [`ResourceData`]: presence-aware reads,
//! per-attribute change detection, write-back of computed fields, and
//! partial commits while a multi-step update is in flight.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::fields::{Fields, is_set};
use crate::projector::FieldSource;

/// Reports which attributes changed since the last observation.
pub trait ChangeSet {
    /// Returns `true` when `name` differs from its persisted value.
    fn has_change(&self, name: &str) -> bool;
}

impl ChangeSet for BTreeSet<String> {
    fn has_change(&self, name: &str) -> bool {
        self.contains(name)
    }
}

impl ChangeSet for [&str] {
    fn has_change(&self, name: &str) -> bool {
        self.contains(&name)
    }
}

/// Per-resource view the state framework hands to each lifecycle hook.
pub trait ResourceData: FieldSource + ChangeSet {
    /// Returns the last persisted value of `name`.
    fn prior(&self, name: &str) -> Option<&Value>;

    /// Persists `value` for `name` (computed attributes, lock state).
    fn set(&mut self, name: &str, value: Value);

    /// Returns the durable identifier, if the resource exists.
    fn id(&self) -> Option<&str>;

    /// Sets or clears the durable identifier.
    fn set_id(&mut self, id: Option<String>);

    /// Enables or disables partial mode.
    ///
    /// While enabled, only attributes committed with
    /// [`ResourceData::set_partial`] are persisted; leaving partial mode
    /// persists every desired attribute.
    fn partial(&mut self, enabled: bool);

    /// Commits the desired value of `name` while in partial mode.
    fn set_partial(&mut self, name: &str);
}

/// In-memory [`ResourceData`] that serialises to a JSON state document.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct MemoryState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(default)]
    desired: Fields,
    #[serde(default)]
    observed: Fields,
    #[serde(skip)]
    partial: bool,
}

impl MemoryState {
    /// Creates a state with the given desired attributes and nothing
    /// persisted yet.
    #[must_use]
    pub fn new(desired: Fields) -> Self {
        Self {
            desired,
            ..Self::default()
        }
    }

    /// Creates a state for an existing resource.
    #[must_use]
    pub fn existing(id: impl Into<String>, desired: Fields, observed: Fields) -> Self {
        Self {
            id: Some(id.into()),
            desired,
            observed,
            partial: false,
        }
    }

    /// Returns the desired attributes.
    #[must_use]
    pub const fn desired(&self) -> &Fields {
        &self.desired
    }

    /// Returns the persisted attributes.
    #[must_use]
    pub const fn observed(&self) -> &Fields {
        &self.observed
    }

    /// Replaces one desired attribute.
    pub fn set_desired(&mut self, name: impl Into<String>, value: Value) {
        self.desired.insert(name.into(), value);
    }

    /// Returns whether partial mode is active.
    #[must_use]
    pub const fn is_partial(&self) -> bool {
        self.partial
    }

    /// Persists every desired attribute.
    pub fn commit(&mut self) {
        for (name, value) in &self.desired {
            self.observed.insert(name.clone(), value.clone());
        }
    }
}

impl FieldSource for MemoryState {
    fn lookup(&self, name: &str) -> Option<&Value> {
        self.desired.get(name).filter(|value| is_set(value))
    }
}

impl ChangeSet for MemoryState {
    fn has_change(&self, name: &str) -> bool {
        let desired = self.desired.get(name).filter(|value| is_set(value));
        let observed = self.observed.get(name).filter(|value| is_set(value));
        desired != observed
    }
}

impl ResourceData for MemoryState {
    fn prior(&self, name: &str) -> Option<&Value> {
        self.observed.get(name).filter(|value| is_set(value))
    }

    fn set(&mut self, name: &str, value: Value) {
        self.observed.insert(name.to_owned(), value);
    }

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: Option<String>) {
        self.id = id.filter(|value| !value.is_empty());
    }

    fn partial(&mut self, enabled: bool) {
        if self.partial && !enabled {
            self.commit();
        }
        self.partial = enabled;
    }

    fn set_partial(&mut self, name: &str) {
        match self.desired.get(name) {
            Some(value) => {
                self.observed.insert(name.to_owned(), value.clone());
            }
            None => {
                self.observed.remove(name);
            }
        }
    }
}
