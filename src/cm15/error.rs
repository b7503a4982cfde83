//! Errors raised by the CM 1.5 client.

use thiserror::Error;

use crate::client::RemoteError;

/// Errors surfaced by [`super::Cm15Client`].
#[derive(Debug, Error)]
pub enum Cm15Error {
    /// Raised when the client cannot be built from configuration.
    #[error("client configuration error: {0}")]
    Config(String),
    /// Raised when exchanging the refresh token fails.
    #[error("authentication failed with HTTP {status}: {message}")]
    Auth {
        /// HTTP status returned by the token endpoint.
        status: u16,
        /// Response body or transport error.
        message: String,
    },
    /// Raised when the request could not be sent or the response read.
    #[error("{action} failed: {source}")]
    Http {
        /// Method and URL of the failed request.
        action: String,
        /// Transport error.
        #[source]
        source: reqwest::Error,
    },
    /// Raised when the remote answers with an unexpected status.
    #[error("{action} returned HTTP {status}: {body}")]
    Status {
        /// Method and URL of the failed request.
        action: String,
        /// HTTP status code.
        status: u16,
        /// Response body, trimmed.
        body: String,
    },
    /// Raised when the resource does not exist.
    #[error("resource {href} not found")]
    NotFound {
        /// Href that could not be resolved.
        href: String,
    },
    /// Raised when creating in a namespace other than `rs_cm`.
    #[error("unsupported namespace '{namespace}'")]
    UnsupportedNamespace {
        /// Namespace requested by the caller.
        namespace: String,
    },
    /// Raised when a create request carries no `cloud_href`.
    #[error("cannot create {collection} without cloud_href")]
    MissingCloudHref {
        /// Collection being created.
        collection: String,
    },
    /// Raised when a create response has no usable `Location` header.
    #[error("create response did not include a Location header")]
    MissingLocation,
    /// Raised when a response body is not the expected JSON shape.
    #[error("unexpected response from {action}: {message}")]
    Decode {
        /// Method and URL of the request.
        action: String,
        /// Human-readable description.
        message: String,
    },
}

impl RemoteError for Cm15Error {
    fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
