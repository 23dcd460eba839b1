//! Entry point for AgentKit MCP.
use std::{
    path::{Path, PathBuf},
    process::ExitCode,
};

use agentkit_mcp::{
    cli::{execute_cli_command, CliCommand, LaunchProfile, LaunchProfileArgs, ParsedCommand},
    lib::telemetry,
    server::{
        config::ServerConfig,
        runtime::{self, RuntimeExit},
    },
};
use anyhow::{Context, Error};
use clap::Parser;

const DEFAULT_ENV_FILE: &str = ".env";

#[tokio::main]
async fn main() -> ExitCode {
    match bootstrap().await {
        Ok(_) => ExitCode::SUCCESS,
        Err(exit) => exit.report(),
    }
}

async fn bootstrap() -> Result<(), RuntimeExit> {
    let args = LaunchProfileArgs::parse();
    // Before tracing so that RUST_LOG may come from the file.
    let env_file = load_env_file(args.env_file.as_deref()).map_err(RuntimeExit::from_error)?;
    telemetry::init_tracing().map_err(RuntimeExit::from_error)?;
    if let Some(path) = env_file {
        tracing::info!(
            target: "agentkit_mcp::config",
            path = %path.display(),
            "Loaded environment file"
        );
    }

    let command = args.into_command().map_err(RuntimeExit::from_error)?;
    match command {
        ParsedCommand::RunServer(profile) => run_server(profile).await,
        ParsedCommand::Cli(command) => handle_cli_command(command),
    }
}

/// Load `.env` without overriding variables already set in the process.
fn load_env_file(explicit: Option<&Path>) -> anyhow::Result<Option<PathBuf>> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let default = PathBuf::from(DEFAULT_ENV_FILE);
            if !default.is_file() {
                return Ok(None);
            }
            default
        }
    };
    dotenv::from_path(&path)
        .with_context(|| format!("failed to load environment file {}", path.display()))?;
    Ok(Some(path))
}

async fn run_server(profile: LaunchProfile) -> Result<(), RuntimeExit> {
    let config = ServerConfig::load(profile.config_path.clone(), profile.config_required)
        .map_err(|err| RuntimeExit::from_error(Error::new(err)))?;
    runtime::run_server(profile, config).await
}

fn handle_cli_command(command: CliCommand) -> Result<(), RuntimeExit> {
    let message = execute_cli_command(command).map_err(RuntimeExit::from_error)?;
    println!("{message}");
    Ok(())
}
