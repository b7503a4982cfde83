//! Decides whether an update needs a remote attribute write.
//!
//! Lock changes are handled by the orchestrator on their own endpoint and
//! never count as an attribute change here, so toggling `locked` alone does
//! not rewrite the instance.

use crate::projector::ProjectionProfile;
use crate::schema::{CLOUD_SPECIFIC_ATTRIBUTES, INPUTS};
use crate::state::ChangeSet;

/// Outcome of [`ChangeSelector::decide`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum UpdateDecision {
    /// No watched attribute changed; skip the remote update.
    Skip,
    /// At least one watched attribute changed; send one full update.
    Apply {
        /// Watched attributes reported as changed, in allow-list order.
        changed: Vec<&'static str>,
    },
}

impl UpdateDecision {
    /// Returns `true` when a remote update is required.
    #[must_use]
    pub const fn requires_update(&self) -> bool {
        matches!(self, Self::Apply { .. })
    }
}

/// Watches the attributes a profile would send.
#[derive(Clone, Copy, Debug)]
pub struct ChangeSelector<'p> {
    profile: &'p ProjectionProfile,
}

impl<'p> ChangeSelector<'p> {
    /// Creates a selector for `profile`.
    #[must_use]
    pub const fn new(profile: &'p ProjectionProfile) -> Self {
        Self { profile }
    }

    /// Returns every attribute this selector watches.
    pub fn watched(&self) -> impl Iterator<Item = &'static str> + '_ {
        let inputs = self.profile.accepts_inputs.then_some(INPUTS);
        self.profile
            .fields
            .iter()
            .copied()
            .chain(std::iter::once(CLOUD_SPECIFIC_ATTRIBUTES))
            .chain(inputs)
    }

    /// Decides whether `changes` warrant a remote update.
    pub fn decide<C>(&self, changes: &C) -> UpdateDecision
    where
        C: ChangeSet + ?Sized,
    {
        let changed: Vec<&'static str> = self
            .watched()
            .filter(|name| changes.has_change(name))
            .collect();
        if changed.is_empty() {
            UpdateDecision::Skip
        } else {
            UpdateDecision::Apply { changed }
        }
    }
}
