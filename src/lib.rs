//! Core library for the Keel RightScale instance manager.
//!
//! The crate turns a desired instance description into CM 1.5 API calls:
//! a pure projector builds request payloads, a change selector decides when
//! an update is needed, and a lifecycle orchestrator sequences create,
//! lock, update, delete, and read against a [`ResourceClient`]. The
//! [`Cm15Client`] talks to the real API; [`test_support::RecordingClient`]
//! stands in for it in tests.

pub mod client;
pub mod cm15;
pub mod config;
pub mod fields;
pub mod lifecycle;
pub mod locator;
pub mod projector;
pub mod schema;
pub mod selector;
pub mod state;
pub mod state_store;
pub mod test_support;

pub use client::{ClientFuture, Created, RemoteError, ResourceClient};
pub use cm15::{Cm15Client, Cm15Error};
pub use config::{ConfigError, RightScaleConfig};
pub use fields::Fields;
pub use lifecycle::{Applied, InstanceOrchestrator, LifecycleError, ReadOutcome};
pub use locator::{Locator, LocatorError};
pub use projector::{
    CREATE_PROFILE, DERIVED_PROFILE, Diagnostic, FieldSource, Projection, ProjectionProfile,
    UPDATE_PROFILE, project,
};
pub use selector::{ChangeSelector, UpdateDecision};
pub use state::{ChangeSet, MemoryState, ResourceData};
pub use state_store::{StateStore, StateStoreError};
