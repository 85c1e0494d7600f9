//! Binary entry point for the `bbl` CLI.

use std::io::{self, Write};
use std::process;

use camino::Utf8PathBuf;
use clap::Parser;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use bbl::inventory::ProviderBins;
use bbl::{
    BblConfig, BoshClientProvider, CreateLbsError, DestroyError, DestroyOrchestrator,
    EnvironmentState, FileStateStore, GcpCloudConfigGenerator, GcpCreateLbs, GcpZones, LbRequest,
    ProcessCommandRunner, ProviderGateway, SafetyGate, TerraformExecutor,
};

mod cli;

use cli::{CheckExistsCommand, Cli, CreateLbsCommand};

const LOG_ENV_VAR: &str = "BBL_LOG";

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("state error: {0}")]
    State(String),
    #[error("no bbl state found at {0}")]
    MissingState(Utf8PathBuf),
    #[error(transparent)]
    CreateLbs(#[from] CreateLbsError),
    #[error(transparent)]
    Destroy(#[from] DestroyError),
    #[error("{0}")]
    Safety(String),
    #[error("failed to write output: {0}")]
    Output(String),
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    let exit_code = match dispatch(cli).await {
        Ok(()) => 0,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn dispatch(cli: Cli) -> Result<(), CliError> {
    let config =
        BblConfig::load_without_cli_args().map_err(|err| CliError::Config(err.to_string()))?;
    config
        .validate()
        .map_err(|err| CliError::Config(err.to_string()))?;
    let store = FileStateStore::new(config.state_dir());
    let state = load_state(&store)?;

    match cli {
        Cli::CreateLbs(command) => create_lbs(&config, &store, state, command).await,
        Cli::CheckExists(command) => check_exists(&config, &state, &command),
        Cli::ValidateDelete => Ok(destroyer(&config, &store, &state).validate(&state)?),
        Cli::Destroy => {
            destroyer(&config, &store, &state).execute(state.clone())?;
            Ok(())
        }
    }
}

fn load_state(store: &FileStateStore) -> Result<EnvironmentState, CliError> {
    store
        .get()
        .map_err(|err| CliError::State(err.to_string()))?
        .ok_or_else(|| CliError::MissingState(store.path()))
}

async fn create_lbs(
    config: &BblConfig,
    store: &FileStateStore,
    state: EnvironmentState,
    command: CreateLbsCommand,
) -> Result<(), CliError> {
    let terraform = TerraformExecutor::with_process_runner(&config.terraform_bin);
    let workflow = GcpCreateLbs::new(
        terraform.clone(),
        terraform,
        GcpZones::with_process_runner(&config.gcloud_bin, &state.gcp.project_id),
        GcpCloudConfigGenerator,
        BoshClientProvider,
        store,
    );
    workflow
        .execute(&LbRequest::new(command.lb_type), state)
        .await?;
    Ok(())
}

fn check_exists(
    config: &BblConfig,
    state: &EnvironmentState,
    command: &CheckExistsCommand,
) -> Result<(), CliError> {
    let gate = SafetyGate::new(gateway(config, state));
    let exists = gate
        .check_exists(&command.name)
        .map_err(|err| CliError::Safety(err.to_string()))?;
    write_exists(io::stdout(), exists)
}

fn write_exists(mut target: impl Write, exists: bool) -> Result<(), CliError> {
    writeln!(target, "{exists}").map_err(|err| CliError::Output(err.to_string()))
}

fn destroyer<'a>(
    config: &BblConfig,
    store: &'a FileStateStore,
    state: &EnvironmentState,
) -> DestroyOrchestrator<
    ProviderGateway<ProcessCommandRunner>,
    TerraformExecutor<ProcessCommandRunner>,
    TerraformExecutor<ProcessCommandRunner>,
    &'a FileStateStore,
> {
    let terraform = TerraformExecutor::with_process_runner(&config.terraform_bin);
    DestroyOrchestrator::new(
        SafetyGate::new(gateway(config, state)),
        terraform.clone(),
        terraform,
        store,
    )
}

fn gateway(config: &BblConfig, state: &EnvironmentState) -> ProviderGateway<ProcessCommandRunner> {
    let bins = ProviderBins {
        aws: &config.aws_bin,
        gcloud: &config.gcloud_bin,
        az: &config.az_bin,
    };
    ProviderGateway::for_state(state, bins, ProcessCommandRunner)
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}
