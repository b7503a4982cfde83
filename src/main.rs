//! Binary entry point for the `keel` CLI.

#[cfg(feature = "test-backdoors")]
use std::env;
use std::io::{self, IsTerminal, Write};
use std::process;

use clap::Parser;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use keel::{
    Cm15Client, InstanceOrchestrator, LifecycleError, MemoryState, ReadOutcome, RemoteError,
    ResourceClient, ResourceData, RightScaleConfig, StateStore, StateStoreError,
};
#[cfg(feature = "test-backdoors")]
use keel::{
    Locator,
    schema::LOCKED,
    test_support::{FailurePoint, RecordingClient},
};
#[cfg(feature = "test-backdoors")]
use serde_json::Value;

mod cli;

use cli::{Cli, StateArgs};

const LOG_ENV: &str = "KEEL_LOG";
#[cfg(feature = "test-backdoors")]
const FAKE_CLIENT_ENV: &str = "KEEL_FAKE_CLIENT";

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("client error: {0}")]
    Client(String),
    #[error(transparent)]
    State(#[from] StateStoreError),
    #[error("{command} failed: {message}")]
    Lifecycle {
        command: &'static str,
        message: String,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Command {
    Apply,
    Refresh,
    Destroy,
}

impl Command {
    const fn name(self) -> &'static str {
        match self {
            Self::Apply => "apply",
            Self::Refresh => "refresh",
            Self::Destroy => "destroy",
        }
    }
}

fn split(cli: Cli) -> (Command, StateArgs) {
    match cli {
        Cli::Apply(args) => (Command::Apply, args),
        Cli::Refresh(args) => (Command::Refresh, args),
        Cli::Destroy(args) => (Command::Destroy, args),
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    let exit_code = match dispatch(cli, &mut io::stdout()).await {
        Ok(()) => 0,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .init();
}

async fn dispatch(cli: Cli, out: &mut impl Write) -> Result<(), CliError> {
    let (command, args) = split(cli);
    let store = StateStore::new(args.state);
    let mut state = store.load()?;

    let outcome = run(command, &mut state, out).await;

    let saved = store.save(&state);
    outcome?;
    saved?;
    Ok(())
}

#[cfg(feature = "test-backdoors")]
async fn run(
    command: Command,
    state: &mut MemoryState,
    out: &mut impl Write,
) -> Result<(), CliError> {
    match fake_client_from_env()? {
        Some(client) => {
            seed_fake_remote(&client, state);
            execute(command, &InstanceOrchestrator::new(client), state, out).await
        }
        None => run_remote(command, state, out).await,
    }
}

#[cfg(not(feature = "test-backdoors"))]
async fn run(
    command: Command,
    state: &mut MemoryState,
    out: &mut impl Write,
) -> Result<(), CliError> {
    run_remote(command, state, out).await
}

async fn run_remote(
    command: Command,
    state: &mut MemoryState,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let config = RightScaleConfig::load_without_cli_args()
        .map_err(|err| CliError::Config(err.to_string()))?;
    let client = Cm15Client::new(&config).map_err(|err| CliError::Client(err.to_string()))?;
    execute(command, &InstanceOrchestrator::new(client), state, out).await
}

async fn execute<C>(
    command: Command,
    orchestrator: &InstanceOrchestrator<C>,
    state: &mut MemoryState,
    out: &mut impl Write,
) -> Result<(), CliError>
where
    C: ResourceClient,
{
    let failed = |err: LifecycleError<C::Error>| lifecycle_error(command, &err);
    match command {
        Command::Apply => {
            let applied = if state.id().is_none() {
                let applied = orchestrator.create(state).await.map_err(failed)?;
                state.commit();
                applied
            } else {
                orchestrator.update(state).await.map_err(failed)?
            };
            let id = state.id().unwrap_or_default();
            if applied.attributes_updated || applied.lock_changed {
                writeln!(out, "{id}: applied").ok();
            } else {
                writeln!(out, "{id}: no changes").ok();
            }
        }
        Command::Refresh => match orchestrator.read(state).await.map_err(failed)? {
            ReadOutcome::Present => {
                writeln!(out, "{}: refreshed", state.id().unwrap_or_default()).ok();
            }
            ReadOutcome::Absent => {
                writeln!(out, "instance no longer exists; identifier cleared").ok();
            }
        },
        Command::Destroy => {
            let id = state.id().map(str::to_owned).unwrap_or_default();
            orchestrator.delete(state).await.map_err(failed)?;
            writeln!(out, "{id}: destroyed").ok();
        }
    }
    Ok(())
}

fn lifecycle_error<E: RemoteError>(command: Command, err: &LifecycleError<E>) -> CliError {
    CliError::Lifecycle {
        command: command.name(),
        message: err.to_string(),
    }
}

#[cfg(feature = "test-backdoors")]
fn fake_client_from_env() -> Result<Option<RecordingClient>, CliError> {
    let Ok(mode) = env::var(FAKE_CLIENT_ENV) else {
        return Ok(None);
    };
    let failure = match mode.as_str() {
        "" | "0" => return Ok(None),
        "1" => None,
        "fail-create" => Some(FailurePoint::Create),
        "fail-lock" => Some(FailurePoint::Lock),
        "fail-update" => Some(FailurePoint::Update),
        "fail-delete" => Some(FailurePoint::Delete),
        "fail-read" => Some(FailurePoint::Read),
        other => {
            return Err(CliError::Config(format!(
                "unknown {FAKE_CLIENT_ENV} mode '{other}'"
            )));
        }
    };
    let client = RecordingClient::new();
    if let Some(point) = failure {
        client.fail(point);
    }
    Ok(Some(client))
}

/// Mirrors the persisted instance into the in-memory remote so follow-up
/// commands see the resource a previous process created.
#[cfg(feature = "test-backdoors")]
fn seed_fake_remote(client: &RecordingClient, state: &MemoryState) {
    let Some(locator) = state.id().and_then(|id| id.parse::<Locator>().ok()) else {
        return;
    };
    let locked = state
        .prior(LOCKED)
        .and_then(Value::as_bool)
        .unwrap_or(false);
    client.insert(locator.href, state.observed().clone(), locked);
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
