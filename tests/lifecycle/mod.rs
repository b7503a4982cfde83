//! Behaviour-driven coverage for the instance lifecycle.

mod bdd_steps;
mod scenarios;
mod test_helpers;
