//! Test support utilities shared across unit and integration tests.

use std::collections::{BTreeMap, BTreeSet};
use std::env;
use std::ffi::OsString;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use thiserror::Error;
use tokio::sync::{Mutex as AsyncMutex, MutexGuard as AsyncMutexGuard};

use crate::client::{ClientFuture, Created, RemoteError, ResourceClient};
use crate::fields::Fields;
use crate::locator::Locator;
use crate::schema::{INSTANCE, LOCKED};

/// Operation a [`RecordingClient`] can be scripted to fail.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FailurePoint {
    /// `create` returns an error.
    Create,
    /// `set_lock` returns an error.
    Lock,
    /// `update` returns an error.
    Update,
    /// `delete` returns an error.
    Delete,
    /// `read` returns a transport error.
    Read,
}

impl FailurePoint {
    const fn flag(self) -> u8 {
        match self {
            Self::Create => 0b00001,
            Self::Lock => 0b00010,
            Self::Update => 0b00100,
            Self::Delete => 0b01000,
            Self::Read => 0b10000,
        }
    }

    const fn label(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Lock => "lock",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Read => "read",
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct Failures(u8);

impl Failures {
    const fn set(&mut self, point: FailurePoint) {
        self.0 |= point.flag();
    }

    const fn contains(self, point: FailurePoint) -> bool {
        self.0 & point.flag() != 0
    }
}

/// Call recorded by a [`RecordingClient`].
#[derive(Clone, Debug, PartialEq)]
pub enum ClientCall {
    /// A `create` call.
    Create {
        /// Namespace passed by the caller.
        namespace: String,
        /// Collection passed by the caller.
        collection: String,
        /// Request payload.
        fields: Fields,
    },
    /// An `update` call.
    Update {
        /// Target resource.
        locator: Locator,
        /// Request payload.
        fields: Fields,
    },
    /// A `delete` call.
    Delete {
        /// Target resource.
        locator: Locator,
    },
    /// A `read` call.
    Read {
        /// Target resource.
        locator: Locator,
    },
    /// A `set_lock` call.
    SetLock {
        /// Target resource.
        locator: Locator,
        /// Collection passed by the caller.
        collection: String,
        /// Requested lock state.
        locked: bool,
    },
}

/// Errors produced by a [`RecordingClient`].
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum FakeClientError {
    /// Raised for scripted failures.
    #[error("simulated {operation} failure")]
    Scripted {
        /// Operation that was scripted to fail.
        operation: &'static str,
    },
    /// Raised when the resource does not exist remotely.
    #[error("resource {href} not found")]
    NotFound {
        /// Href that could not be resolved.
        href: String,
    },
    /// Raised when deleting a resource the remote holds locked.
    #[error("resource {href} is locked")]
    Locked {
        /// Href of the locked resource.
        href: String,
    },
}

impl RemoteError for FakeClientError {
    fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
struct RemoteInstance {
    fields: Fields,
    locked: bool,
}

#[derive(Debug, Default)]
struct State {
    failures: Failures,
    calls: Vec<ClientCall>,
    resources: BTreeMap<String, RemoteInstance>,
    next_href: Option<String>,
    computed: Fields,
    created: u32,
}

/// In-memory remote that honours the [`ResourceClient`] contract and keeps
/// a log of every call.
///
/// Clones share state, so a test can hand one clone to the orchestrator and
/// inspect another.
#[derive(Clone, Debug, Default)]
pub struct RecordingClient {
    state: Arc<Mutex<State>>,
}

impl RecordingClient {
    /// Creates an empty remote.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Scripts `point` to fail from now on.
    pub fn fail(&self, point: FailurePoint) {
        self.lock_state().failures.set(point);
    }

    /// Uses `href` for the next created resource.
    pub fn with_next_href(&self, href: impl Into<String>) {
        self.lock_state().next_href = Some(href.into());
    }

    /// Adds computed fields returned by every create and read.
    pub fn with_computed(&self, name: impl Into<String>, value: Value) {
        self.lock_state().computed.insert(name.into(), value);
    }

    /// Seeds an existing remote resource.
    pub fn insert(&self, href: impl Into<String>, fields: Fields, locked: bool) {
        self.lock_state()
            .resources
            .insert(href.into(), RemoteInstance { fields, locked });
    }

    /// Removes a resource behind the caller's back.
    pub fn forget(&self, href: &str) {
        self.lock_state().resources.remove(href);
    }

    /// Returns every recorded call in order.
    #[must_use]
    pub fn calls(&self) -> Vec<ClientCall> {
        self.lock_state().calls.clone()
    }

    /// Returns the number of `set_lock` calls.
    #[must_use]
    pub fn lock_calls(&self) -> usize {
        self.count(|call| matches!(call, ClientCall::SetLock { .. }))
    }

    /// Returns the number of `update` calls.
    #[must_use]
    pub fn update_calls(&self) -> usize {
        self.count(|call| matches!(call, ClientCall::Update { .. }))
    }

    /// Returns the number of `delete` calls.
    #[must_use]
    pub fn delete_calls(&self) -> usize {
        self.count(|call| matches!(call, ClientCall::Delete { .. }))
    }

    /// Returns the remote fields and lock state of `href`, if it exists.
    #[must_use]
    pub fn remote(&self, href: &str) -> Option<(Fields, bool)> {
        self.lock_state()
            .resources
            .get(href)
            .map(|instance| (instance.fields.clone(), instance.locked))
    }

    fn count(&self, predicate: impl Fn(&ClientCall) -> bool) -> usize {
        self.lock_state()
            .calls
            .iter()
            .filter(|call| predicate(call))
            .count()
    }
}

impl State {
    fn check(&self, point: FailurePoint) -> Result<(), FakeClientError> {
        if self.failures.contains(point) {
            return Err(FakeClientError::Scripted {
                operation: point.label(),
            });
        }
        Ok(())
    }

    fn instance_mut(&mut self, href: &str) -> Result<&mut RemoteInstance, FakeClientError> {
        self.resources
            .get_mut(href)
            .ok_or_else(|| FakeClientError::NotFound {
                href: href.to_owned(),
            })
    }

    fn snapshot(&self, href: &str) -> Result<Fields, FakeClientError> {
        let instance = self
            .resources
            .get(href)
            .ok_or_else(|| FakeClientError::NotFound {
                href: href.to_owned(),
            })?;
        let mut fields = instance.fields.clone();
        fields.extend(self.computed.clone());
        fields.insert(String::from(LOCKED), Value::Bool(instance.locked));
        Ok(fields)
    }
}

fn instance_block(fields: &Fields) -> Fields {
    fields
        .get(INSTANCE)
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}

impl ResourceClient for RecordingClient {
    type Error = FakeClientError;

    fn create<'a>(
        &'a self,
        namespace: &'a str,
        collection: &'a str,
        fields: &'a Fields,
    ) -> ClientFuture<'a, Created, Self::Error> {
        Box::pin(async move {
            let mut state = self.lock_state();
            state.calls.push(ClientCall::Create {
                namespace: namespace.to_owned(),
                collection: collection.to_owned(),
                fields: fields.clone(),
            });
            state.check(FailurePoint::Create)?;

            state.created += 1;
            let href = state
                .next_href
                .take()
                .unwrap_or_else(|| format!("/api/clouds/1/{collection}/FAKE{}", state.created));
            state.resources.insert(
                href.clone(),
                RemoteInstance {
                    fields: instance_block(fields),
                    locked: false,
                },
            );
            let response = state.snapshot(&href)?;
            Ok(Created {
                locator: Locator::new(namespace, href),
                fields: response,
            })
        })
    }

    fn update<'a>(
        &'a self,
        locator: &'a Locator,
        fields: &'a Fields,
    ) -> ClientFuture<'a, (), Self::Error> {
        Box::pin(async move {
            let mut state = self.lock_state();
            state.calls.push(ClientCall::Update {
                locator: locator.clone(),
                fields: fields.clone(),
            });
            state.check(FailurePoint::Update)?;
            let instance = state.instance_mut(&locator.href)?;
            instance.fields.extend(instance_block(fields));
            Ok(())
        })
    }

    fn delete<'a>(&'a self, locator: &'a Locator) -> ClientFuture<'a, (), Self::Error> {
        Box::pin(async move {
            let mut state = self.lock_state();
            state.calls.push(ClientCall::Delete {
                locator: locator.clone(),
            });
            state.check(FailurePoint::Delete)?;
            if state.instance_mut(&locator.href)?.locked {
                return Err(FakeClientError::Locked {
                    href: locator.href.clone(),
                });
            }
            state.resources.remove(&locator.href);
            Ok(())
        })
    }

    fn read<'a>(&'a self, locator: &'a Locator) -> ClientFuture<'a, Fields, Self::Error> {
        Box::pin(async move {
            let mut state = self.lock_state();
            state.calls.push(ClientCall::Read {
                locator: locator.clone(),
            });
            state.check(FailurePoint::Read)?;
            state.snapshot(&locator.href)
        })
    }

    fn set_lock<'a>(
        &'a self,
        locator: &'a Locator,
        collection: &'a str,
        locked: bool,
    ) -> ClientFuture<'a, (), Self::Error> {
        Box::pin(async move {
            let mut state = self.lock_state();
            state.calls.push(ClientCall::SetLock {
                locator: locator.clone(),
                collection: collection.to_owned(),
                locked,
            });
            state.check(FailurePoint::Lock)?;
            state.instance_mut(&locator.href)?.locked = locked;
            Ok(())
        })
    }
}

/// Converts a JSON object literal into [`Fields`].
///
/// # Panics
///
/// Panics when `value` is not an object; intended for test fixtures.
#[must_use]
pub fn fields(value: Value) -> Fields {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

/// Global mutex used to serialise environment mutation in tests.
pub static ENV_LOCK: AsyncMutex<()> = AsyncMutex::const_new(());

/// Guard that holds the env mutex and restores variables on drop.
pub struct EnvGuard {
    previous: Vec<(String, Option<OsString>)>,
    _guard: AsyncMutexGuard<'static, ()>,
}

impl EnvGuard {
    /// Sets multiple environment variables while holding a global mutex.
    pub async fn set_vars(pairs: &[(&str, &str)]) -> Self {
        debug_assert!(
            {
                let mut seen = BTreeSet::new();
                pairs.iter().all(|(key, _)| seen.insert(*key))
            },
            "duplicate environment variable keys passed to EnvGuard::set_vars"
        );

        let guard = ENV_LOCK.lock().await;
        let mut previous = Vec::with_capacity(pairs.len());
        for (key, value) in pairs {
            let old = env::var_os(key);
            // SAFETY: Environment mutation is serialised by `ENV_LOCK`.
            unsafe { env::set_var(key, value) };
            previous.push(((*key).to_owned(), old));
        }

        Self {
            previous,
            _guard: guard,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, old) in &self.previous {
            // SAFETY: Environment mutation is serialised by holding `_guard`.
            unsafe {
                match old {
                    Some(val) => env::set_var(key, val),
                    None => env::remove_var(key),
                }
            }
        }
    }
}
