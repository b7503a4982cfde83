//! Remote resource client abstraction.
//!
//! The lifecycle orchestrator only talks to the remote API through
//! [`ResourceClient`], so the same sequencing logic runs against the HTTP
//! client in production and against an in-memory double in tests.

use std::future::Future;
use std::pin::Pin;

use crate::fields::Fields;
use crate::locator::Locator;

/// Future returned by client operations.
pub type ClientFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// Errors surfaced by a [`ResourceClient`].
pub trait RemoteError: std::error::Error + Send + Sync + 'static {
    /// Returns `true` when the remote reports the resource does not exist.
    ///
    /// This is the structured "resource absent" signal; transport failures
    /// must return `false`.
    fn is_not_found(&self) -> bool;
}

/// Result of a successful creation call.
#[derive(Clone, Debug, PartialEq)]
pub struct Created {
    /// Locator of the new resource.
    pub locator: Locator,
    /// Fields reported by the remote, including computed attributes.
    pub fields: Fields,
}

/// Capability set of the remote provisioning API.
///
/// Each method is a single round trip with no retries.
pub trait ResourceClient {
    /// Client specific error type.
    type Error: RemoteError;

    /// Creates a resource in `collection` of `namespace`.
    fn create<'a>(
        &'a self,
        namespace: &'a str,
        collection: &'a str,
        fields: &'a Fields,
    ) -> ClientFuture<'a, Created, Self::Error>;

    /// Updates an existing resource with the given payload.
    fn update<'a>(
        &'a self,
        locator: &'a Locator,
        fields: &'a Fields,
    ) -> ClientFuture<'a, (), Self::Error>;

    /// Deletes the resource.
    fn delete<'a>(&'a self, locator: &'a Locator) -> ClientFuture<'a, (), Self::Error>;

    /// Reads the current remote fields of the resource.
    fn read<'a>(&'a self, locator: &'a Locator) -> ClientFuture<'a, Fields, Self::Error>;

    /// Locks or unlocks the resource through its dedicated operation.
    fn set_lock<'a>(
        &'a self,
        locator: &'a Locator,
        collection: &'a str,
        locked: bool,
    ) -> ClientFuture<'a, (), Self::Error>;
}
