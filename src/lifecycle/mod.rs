//! Create, update, delete, and read hooks for RightScale instances.
//!
//! The orchestrator sequences remote calls against a [`ResourceClient`] and
//! keeps the state framework consistent with what actually happened:
//!
//! - the identifier is only recorded once creation fully succeeded;
//! - a failed post-create lock triggers one compensating delete;
//! - lock changes travel through their own endpoint, before any attribute
//!   update, and are persisted even when that update later fails.

mod error;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::client::{RemoteError, ResourceClient};
use crate::locator::Locator;
use crate::projector::{CREATE_PROFILE, Diagnostic, UPDATE_PROFILE, project};
use crate::selector::{ChangeSelector, UpdateDecision};
use crate::state::ResourceData;

pub use error::LifecycleError;

/// Namespace of the CM 1.5 API.
pub const NAMESPACE: &str = "rs_cm";

/// Collection instances live in.
pub const COLLECTION: &str = "instances";

const LOCKED: &str = crate::schema::LOCKED;

/// Summary of a successful create or update.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Applied {
    /// Soft failures recorded while projecting the request.
    pub diagnostics: Vec<Diagnostic>,
    /// Whether the lock endpoint was called.
    pub lock_changed: bool,
    /// Whether an attribute write was sent to the remote.
    pub attributes_updated: bool,
}

/// Result of refreshing a resource.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReadOutcome {
    /// The resource exists and its fields were written back.
    Present,
    /// The resource is gone; its identifier was cleared.
    Absent,
}

/// Drives the instance lifecycle against a remote client.
#[derive(Debug)]
pub struct InstanceOrchestrator<C> {
    client: C,
}

impl<C> InstanceOrchestrator<C>
where
    C: ResourceClient,
{
    /// Creates a new orchestrator.
    #[must_use]
    pub const fn new(client: C) -> Self {
        Self { client }
    }

    /// Creates the instance described by `data`.
    ///
    /// Computed fields from the response are written back. When the
    /// desired state asks for a lock, the lock is applied right after
    /// creation; if that fails the new instance is deleted again and the
    /// lock error is returned. The identifier is set last.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Remote`] when creation or locking fails.
    pub async fn create<D>(&self, data: &mut D) -> Result<Applied, LifecycleError<C::Error>>
    where
        D: ResourceData + ?Sized,
    {
        let projection = project(&*data, &CREATE_PROFILE);
        let request = projection.request();
        // Decided before write-back: the response carries its own `locked`.
        let wants_lock = data.lookup(LOCKED).is_some_and(is_true);
        let created = self
            .client
            .create(NAMESPACE, COLLECTION, &request)
            .await
            .map_err(LifecycleError::Remote)?;
        info!(locator = %created.locator, "instance created");

        for (name, value) in created.fields {
            data.set(&name, value);
        }

        if wants_lock {
            if let Err(err) = self.client.set_lock(&created.locator, COLLECTION, true).await {
                self.delete_with_note(&created.locator, &err).await;
                return Err(LifecycleError::Remote(err));
            }
            data.set(LOCKED, Value::Bool(true));
            debug!(locator = %created.locator, "instance locked");
        }

        data.set_id(Some(created.locator.to_string()));
        Ok(Applied {
            diagnostics: projection.diagnostics().to_vec(),
            lock_changed: wants_lock,
            attributes_updated: true,
        })
    }

    /// Applies changed attributes of an existing instance.
    ///
    /// A lock change is sent first and committed on its own. Attribute
    /// changes follow as one full update when the change selector asks
    /// for it. On failure the state stays in partial mode so only the
    /// committed lock survives.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError`] when the identifier is missing or
    /// invalid, or when a remote call fails. A not-found error also clears
    /// the identifier.
    pub async fn update<D>(&self, data: &mut D) -> Result<Applied, LifecycleError<C::Error>>
    where
        D: ResourceData + ?Sized,
    {
        let locator = locator_of(&*data)?;
        data.partial(true);

        let mut applied = Applied::default();
        if data.has_change(LOCKED) {
            let locked = data.lookup(LOCKED).is_some_and(is_true);
            self.client
                .set_lock(&locator, COLLECTION, locked)
                .await
                .map_err(|err| forget_if_gone(data, err))?;
            data.set_partial(LOCKED);
            applied.lock_changed = true;
            debug!(%locator, locked, "lock state changed");
        }

        let decision = ChangeSelector::new(&UPDATE_PROFILE).decide(&*data);
        if let UpdateDecision::Apply { changed } = decision {
            debug!(%locator, ?changed, "attributes changed");
            let projection = project(&*data, &UPDATE_PROFILE);
            self.client
                .update(&locator, &projection.request())
                .await
                .map_err(|err| forget_if_gone(data, err))?;
            applied.attributes_updated = true;
            applied.diagnostics = projection.diagnostics().to_vec();
            info!(%locator, "instance updated");
        }

        data.partial(false);
        Ok(applied)
    }

    /// Deletes the instance.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Locked`] when the persisted state is
    /// locked; no remote call is made in that case. Remote failures are
    /// returned unchanged.
    pub async fn delete<D>(&self, data: &mut D) -> Result<(), LifecycleError<C::Error>>
    where
        D: ResourceData + ?Sized,
    {
        let locator = locator_of(&*data)?;
        if data.prior(LOCKED).is_some_and(is_true) {
            return Err(LifecycleError::Locked { locator });
        }
        self.client
            .delete(&locator)
            .await
            .map_err(LifecycleError::Remote)?;
        data.set_id(None);
        info!(%locator, "instance deleted");
        Ok(())
    }

    /// Refreshes persisted fields from the remote.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError`] for identifier problems and remote
    /// failures other than not-found.
    pub async fn read<D>(&self, data: &mut D) -> Result<ReadOutcome, LifecycleError<C::Error>>
    where
        D: ResourceData + ?Sized,
    {
        let locator = locator_of(&*data)?;
        match self.client.read(&locator).await {
            Ok(fields) => {
                for (name, value) in fields {
                    data.set(&name, value);
                }
                Ok(ReadOutcome::Present)
            }
            Err(err) if err.is_not_found() => {
                info!(%locator, "instance no longer exists");
                data.set_id(None);
                Ok(ReadOutcome::Absent)
            }
            Err(err) => Err(LifecycleError::Remote(err)),
        }
    }

    /// Reports whether the instance still exists remotely.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError`] for identifier problems and remote
    /// failures other than not-found.
    pub async fn exists<D>(&self, data: &D) -> Result<bool, LifecycleError<C::Error>>
    where
        D: ResourceData + ?Sized,
    {
        let locator = locator_of(&*data)?;
        match self.client.read(&locator).await {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(LifecycleError::Remote(err)),
        }
    }

    async fn delete_with_note(&self, locator: &Locator, cause: &C::Error) {
        match self.client.delete(locator).await {
            Ok(()) => warn!(%locator, error = %cause, "lock failed; instance deleted"),
            Err(teardown) => warn!(
                %locator,
                error = %cause,
                teardown_error = %teardown,
                "lock failed and the instance could not be deleted"
            ),
        }
    }
}

fn locator_of<D, E>(data: &D) -> Result<Locator, LifecycleError<E>>
where
    D: ResourceData + ?Sized,
    E: RemoteError,
{
    let id = data.id().ok_or(LifecycleError::MissingIdentifier)?;
    id.parse()
        .map_err(|source| LifecycleError::InvalidIdentifier {
            id: id.to_owned(),
            source,
        })
}

fn forget_if_gone<D, E>(data: &mut D, err: E) -> LifecycleError<E>
where
    D: ResourceData + ?Sized,
    E: RemoteError,
{
    if err.is_not_found() {
        data.set_id(None);
    }
    LifecycleError::Remote(err)
}

fn is_true(value: &Value) -> bool {
    value.as_bool().unwrap_or(false)
}
