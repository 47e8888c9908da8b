mod config;
mod telemetry;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "repoman", about = "Repository configuration management API")]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Run the repository API
    RepoApi(CliArgs),
    /// Check a config file and exit
    ValidateConfig(CliArgs),
}

#[derive(Args)]
struct CliArgs {
    #[arg(long)]
    config_file_path: PathBuf,
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error("config has no `repo_api` section")]
    MissingRepoApiConfig,
    #[error("invalid repo_api config: {0}")]
    InvalidRepoApiConfig(#[from] repo_api::config::ValidationError),
    #[error(transparent)]
    Telemetry(#[from] telemetry::TelemetryError),
    #[error("could not start runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error(transparent)]
    RepoApi(#[from] repo_api::errors::RepoApiError),
}

fn main() {
    let cli = Cli::parse();

    let result = match &cli.command {
        CliCommand::RepoApi(args) => run_repo_api(args),
        CliCommand::ValidateConfig(args) => validate_config(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn load_repo_api_config(
    args: &CliArgs,
) -> Result<(config::Config, repo_api::config::Config), CliError> {
    let mut config = config::Config::from_file(&args.config_file_path)?;
    let repo_api_config = config
        .repo_api
        .take()
        .ok_or(CliError::MissingRepoApiConfig)?;
    repo_api_config.validate()?;
    Ok((config, repo_api_config))
}

fn validate_config(args: &CliArgs) -> Result<(), CliError> {
    load_repo_api_config(args)?;
    println!("{}: ok", args.config_file_path.display());
    Ok(())
}

fn run_repo_api(args: &CliArgs) -> Result<(), CliError> {
    let (config, repo_api_config) = load_repo_api_config(args)?;

    let _sentry_guard = telemetry::init_logging(config.common.logging.as_ref());
    if let Some(metrics_config) = &config.common.metrics {
        telemetry::init_metrics(metrics_config)?;
    }

    tracing::info!("Starting repo-api");
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    rt.block_on(repo_api::run(repo_api_config))?;

    Ok(())
}
