//! Command-line interface definitions for the `keel` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use camino::Utf8PathBuf;
use clap::Parser;

/// Top-level CLI for the `keel` binary.
#[derive(Debug, Parser)]
#[command(
    name = "keel",
    about = "Manage RightScale instances from JSON state files",
    arg_required_else_help = true
)]
pub(crate) enum Cli {
    /// Create the instance, or apply changed attributes to it.
    #[command(name = "apply", about = "Create the instance or apply changed attributes")]
    Apply(StateArgs),
    /// Refresh persisted attributes from the remote.
    #[command(name = "refresh", about = "Refresh persisted attributes from the remote")]
    Refresh(StateArgs),
    /// Terminate the instance.
    #[command(name = "destroy", about = "Terminate the instance")]
    Destroy(StateArgs),
}

/// Arguments shared by every subcommand.
#[derive(Debug, Parser)]
pub(crate) struct StateArgs {
    /// Path to the JSON state file describing one instance.
    #[arg(value_name = "STATE")]
    pub(crate) state: Utf8PathBuf,
}
