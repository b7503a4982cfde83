//! BDD step definitions for the instance lifecycle.

use keel::test_support::{ClientCall, FailurePoint, fields};
use keel::{InstanceOrchestrator, LifecycleError, MemoryState, RemoteError, ResourceData};
use rstest_bdd_macros::{given, then, when};
use serde_json::{Value, json};
use tokio::runtime::Runtime;

use super::test_helpers::{HREF, ID, LifecycleContext, Outcome};

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("assertion failed: {0}")]
    Assertion(String),
    #[error("unknown failure point: {0}")]
    UnknownFailure(String),
}

fn runtime() -> Result<Runtime, StepError> {
    Runtime::new().map_err(|err| StepError::Assertion(err.to_string()))
}

fn failed<E: RemoteError>(err: &LifecycleError<E>) -> Outcome {
    Outcome::Failed(err.to_string())
}

#[given("a desired instance \"{name}\" on cloud \"{cloud}\" with locked \"{locked}\"")]
fn desired_instance(
    lifecycle_context: &LifecycleContext,
    name: String,
    cloud: String,
    locked: bool,
) {
    lifecycle_context.replace_state(MemoryState::new(fields(json!({
        "name": name,
        "image_href": "/img/1",
        "instance_type_href": "/it/1",
        "cloud_href": cloud,
        "locked": locked,
    }))));
}

#[given("an existing instance with deployment \"{deployment}\" and locked \"{locked}\"")]
fn existing_instance(lifecycle_context: &LifecycleContext, deployment: String, locked: bool) {
    let persisted = fields(json!({
        "name": "web-1",
        "deployment_href": deployment,
        "locked": locked,
    }));
    lifecycle_context
        .client
        .insert(HREF, persisted.clone(), locked);
    lifecycle_context.replace_state(MemoryState::existing(ID, persisted.clone(), persisted));
}

#[given("the desired lock is \"{locked}\"")]
fn desired_lock(lifecycle_context: &LifecycleContext, locked: bool) {
    lifecycle_context
        .state()
        .set_desired("locked", Value::Bool(locked));
}

#[given("the desired deployment is \"{deployment}\"")]
fn desired_deployment(lifecycle_context: &LifecycleContext, deployment: String) {
    lifecycle_context
        .state()
        .set_desired("deployment_href", Value::String(deployment));
}

#[given("the remote fails to \"{operation}\"")]
fn remote_fails(lifecycle_context: &LifecycleContext, operation: String) -> Result<(), StepError> {
    let point = match operation.as_str() {
        "create" => FailurePoint::Create,
        "lock" => FailurePoint::Lock,
        "update" => FailurePoint::Update,
        "delete" => FailurePoint::Delete,
        "read" => FailurePoint::Read,
        other => return Err(StepError::UnknownFailure(other.to_owned())),
    };
    lifecycle_context.client.fail(point);
    Ok(())
}

#[given("the instance disappears remotely")]
fn instance_disappears(lifecycle_context: &LifecycleContext) {
    lifecycle_context.client.forget(HREF);
}

#[when("I create the instance")]
fn create_instance(lifecycle_context: &LifecycleContext) -> Result<(), StepError> {
    let orchestrator = InstanceOrchestrator::new(lifecycle_context.client.clone());
    let mut state = lifecycle_context.state();
    let outcome = match runtime()?.block_on(orchestrator.create(&mut *state)) {
        Ok(applied) => Outcome::Applied(applied),
        Err(err) => failed(&err),
    };
    drop(state);
    lifecycle_context.record(outcome);
    Ok(())
}

#[when("I update the instance")]
fn update_instance(lifecycle_context: &LifecycleContext) -> Result<(), StepError> {
    let orchestrator = InstanceOrchestrator::new(lifecycle_context.client.clone());
    let mut state = lifecycle_context.state();
    let outcome = match runtime()?.block_on(orchestrator.update(&mut *state)) {
        Ok(applied) => Outcome::Applied(applied),
        Err(err) => failed(&err),
    };
    drop(state);
    lifecycle_context.record(outcome);
    Ok(())
}

#[when("I delete the instance")]
fn delete_instance(lifecycle_context: &LifecycleContext) -> Result<(), StepError> {
    let orchestrator = InstanceOrchestrator::new(lifecycle_context.client.clone());
    let mut state = lifecycle_context.state();
    let outcome = match runtime()?.block_on(orchestrator.delete(&mut *state)) {
        Ok(()) => Outcome::Deleted,
        Err(err) => failed(&err),
    };
    drop(state);
    lifecycle_context.record(outcome);
    Ok(())
}

#[when("I refresh the instance")]
fn refresh_instance(lifecycle_context: &LifecycleContext) -> Result<(), StepError> {
    let orchestrator = InstanceOrchestrator::new(lifecycle_context.client.clone());
    let mut state = lifecycle_context.state();
    let outcome = match runtime()?.block_on(orchestrator.read(&mut *state)) {
        Ok(read) => Outcome::Read(read),
        Err(err) => failed(&err),
    };
    drop(state);
    lifecycle_context.record(outcome);
    Ok(())
}

#[then("the create request carries the cloud and the web-1 attributes")]
fn create_request_shape(lifecycle_context: &LifecycleContext) -> Result<(), StepError> {
    let calls = lifecycle_context.client.calls();
    let Some(ClientCall::Create { fields: request, .. }) = calls.first() else {
        return Err(StepError::Assertion(format!(
            "expected a create call first, got {calls:?}"
        )));
    };
    let expected = json!({
        "cloud_href": "/cloud/1",
        "instance": {
            "name": "web-1",
            "image_href": "/img/1",
            "instance_type_href": "/it/1",
        },
    });
    if Value::Object(request.clone()) == expected {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "unexpected create request: {request:?}"
        )))
    }
}

fn expect_count(name: &str, actual: usize, expected: usize) -> Result<(), StepError> {
    if actual == expected {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {expected} {name} calls, got {actual}"
        )))
    }
}

#[then("the lock endpoint was called \"{count}\" times")]
fn lock_calls(lifecycle_context: &LifecycleContext, count: usize) -> Result<(), StepError> {
    expect_count("lock", lifecycle_context.client.lock_calls(), count)
}

#[then("the update endpoint was called \"{count}\" times")]
fn update_calls(lifecycle_context: &LifecycleContext, count: usize) -> Result<(), StepError> {
    expect_count("update", lifecycle_context.client.update_calls(), count)
}

#[then("the delete endpoint was called \"{count}\" times")]
fn delete_calls(lifecycle_context: &LifecycleContext, count: usize) -> Result<(), StepError> {
    expect_count("delete", lifecycle_context.client.delete_calls(), count)
}

#[then("no remote call was made")]
fn no_remote_calls(lifecycle_context: &LifecycleContext) -> Result<(), StepError> {
    expect_count("remote", lifecycle_context.client.calls().len(), 0)
}

#[then("the stored identifier is \"{id}\"")]
fn stored_identifier(lifecycle_context: &LifecycleContext, id: String) -> Result<(), StepError> {
    let state = lifecycle_context.state();
    if state.id() == Some(id.as_str()) {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected identifier {id}, got {:?}",
            state.id()
        )))
    }
}

#[then("no identifier is stored")]
fn no_identifier(lifecycle_context: &LifecycleContext) -> Result<(), StepError> {
    match lifecycle_context.state().id() {
        None => Ok(()),
        Some(id) => Err(StepError::Assertion(format!(
            "expected no identifier, got {id}"
        ))),
    }
}

#[then("the operation fails with \"{message}\"")]
fn operation_fails(lifecycle_context: &LifecycleContext, message: String) -> Result<(), StepError> {
    match lifecycle_context.outcome() {
        Some(Outcome::Failed(actual)) if actual.contains(&message) => Ok(()),
        other => Err(StepError::Assertion(format!(
            "expected failure containing '{message}', got {other:?}"
        ))),
    }
}

fn expect_persisted(
    lifecycle_context: &LifecycleContext,
    name: &str,
    expected: &Value,
) -> Result<(), StepError> {
    let state = lifecycle_context.state();
    let actual = state.observed().get(name);
    if actual == Some(expected) {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected persisted {name} = {expected}, got {actual:?}"
        )))
    }
}

#[then("the persisted lock is \"{locked}\"")]
fn persisted_lock(lifecycle_context: &LifecycleContext, locked: bool) -> Result<(), StepError> {
    expect_persisted(lifecycle_context, "locked", &Value::Bool(locked))
}

#[then("the persisted deployment is \"{deployment}\"")]
fn persisted_deployment(
    lifecycle_context: &LifecycleContext,
    deployment: String,
) -> Result<(), StepError> {
    expect_persisted(
        lifecycle_context,
        "deployment_href",
        &Value::String(deployment),
    )
}
