//! Shared fixtures for lifecycle BDD scenarios.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use keel::test_support::RecordingClient;
use keel::{Applied, MemoryState, ReadOutcome};
use rstest::fixture;

pub const HREF: &str = "/api/clouds/1/instances/WEB1";
pub const ID: &str = "rs_cm:/api/clouds/1/instances/WEB1";

#[derive(Clone, Debug)]
pub enum Outcome {
    Applied(Applied),
    Deleted,
    Read(ReadOutcome),
    Failed(String),
}

/// Scenario state shared between steps.
///
/// The client, the stored state, and the last outcome sit behind shared
/// handles so every step observes the writes of the previous one.
#[derive(Clone, Debug, Default)]
pub struct LifecycleContext {
    pub client: RecordingClient,
    state: Arc<Mutex<MemoryState>>,
    outcome: Arc<Mutex<Option<Outcome>>>,
}

impl LifecycleContext {
    pub fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn replace_state(&self, state: MemoryState) {
        *self.state() = state;
    }

    pub fn record(&self, outcome: Outcome) {
        *self.outcome.lock().unwrap_or_else(PoisonError::into_inner) = Some(outcome);
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[fixture]
pub fn lifecycle_context() -> LifecycleContext {
    let context = LifecycleContext::default();
    context.client.with_next_href(HREF);
    context
}
