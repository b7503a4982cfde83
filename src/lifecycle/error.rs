//! Errors surfaced by the instance lifecycle hooks.

use thiserror::Error;

use crate::client::RemoteError;
use crate::locator::{Locator, LocatorError};

/// Errors returned by [`super::InstanceOrchestrator`].
#[derive(Debug, Error)]
pub enum LifecycleError<E>
where
    E: RemoteError,
{
    /// Raised when the remote client fails; the error is passed through
    /// without interpretation.
    #[error(transparent)]
    Remote(E),
    /// Raised when deleting a resource whose persisted state is locked.
    #[error("resource {locator} is locked; set locked = false and apply before deleting")]
    Locked {
        /// Locator of the locked resource.
        locator: Locator,
    },
    /// Raised when a hook that needs an existing resource finds no
    /// identifier in state.
    #[error("resource has no identifier in state")]
    MissingIdentifier,
    /// Raised when the stored identifier cannot be parsed.
    #[error("invalid resource identifier '{id}': {source}")]
    InvalidIdentifier {
        /// Identifier read from state.
        id: String,
        /// Parse failure.
        #[source]
        source: LocatorError,
    },
}

impl<E> LifecycleError<E>
where
    E: RemoteError,
{
    /// Returns `true` when the underlying remote error reports the resource
    /// as absent.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Remote(err) if err.is_not_found())
    }
}
