//! BDD scenarios for the instance lifecycle.

use rstest_bdd_macros::scenario;

use super::test_helpers::{LifecycleContext, lifecycle_context};

#[scenario(
    path = "tests/features/lifecycle.feature",
    name = "Create and lock a web server"
)]
fn scenario_create_and_lock(lifecycle_context: LifecycleContext) {
    let _ = lifecycle_context;
}

#[scenario(
    path = "tests/features/lifecycle.feature",
    name = "A failed lock deletes the new instance"
)]
fn scenario_failed_lock_compensates(lifecycle_context: LifecycleContext) {
    let _ = lifecycle_context;
}

#[scenario(
    path = "tests/features/lifecycle.feature",
    name = "Toggling the lock alone does not rewrite attributes"
)]
fn scenario_lock_only_update(lifecycle_context: LifecycleContext) {
    let _ = lifecycle_context;
}

#[scenario(
    path = "tests/features/lifecycle.feature",
    name = "An attribute failure keeps the committed lock"
)]
fn scenario_partial_update(lifecycle_context: LifecycleContext) {
    let _ = lifecycle_context;
}

#[scenario(
    path = "tests/features/lifecycle.feature",
    name = "Locked instances cannot be deleted"
)]
fn scenario_locked_delete(lifecycle_context: LifecycleContext) {
    let _ = lifecycle_context;
}

#[scenario(
    path = "tests/features/lifecycle.feature",
    name = "Refreshing a vanished instance clears its identifier"
)]
fn scenario_vanished_refresh(lifecycle_context: LifecycleContext) {
    let _ = lifecycle_context;
}
