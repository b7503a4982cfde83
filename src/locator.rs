//! Resource locators returned by the remote API on creation.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Opaque `(namespace, href)` pair that reaches exactly one remote resource.
///
/// The locator is persisted as the resource identifier in its
/// `namespace:href` string form.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Locator {
    /// API namespace that owns the resource (for example `rs_cm`).
    pub namespace: String,
    /// Resource href within the namespace.
    pub href: String,
}

impl Locator {
    /// Builds a locator from its two halves.
    #[must_use]
    pub fn new(namespace: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            href: href.into(),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:{}", self.namespace, self.href)
    }
}

/// Errors raised while parsing a persisted identifier.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum LocatorError {
    /// Raised when the identifier is not of the form `namespace:href`.
    #[error("identifier '{0}' is not of the form namespace:href")]
    Malformed(String),
}

impl FromStr for Locator {
    type Err = LocatorError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        match trimmed.split_once(':') {
            Some((namespace, href)) if !namespace.is_empty() && !href.is_empty() => {
                Ok(Self::new(namespace, href))
            }
            _ => Err(LocatorError::Malformed(trimmed.to_owned())),
        }
    }
}
