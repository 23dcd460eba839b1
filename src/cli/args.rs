//! CLI argument definitions and `LaunchProfile` construction.
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use super::{build_launch_args, resolve_config_path, LaunchProfile, TransportMode};

/// Parsed command intent from CLI.
#[derive(Debug, Clone)]
pub enum ParsedCommand {
    RunServer(LaunchProfile),
    Cli(CliCommand),
}

/// Top-level optional CLI commands.
#[derive(Debug, Clone, Subcommand)]
pub enum CliCommand {
    /// Print the resolved AgentKit credentials as JSON (secrets masked).
    #[command(
        about = "Print the resolved AgentKit credentials as JSON",
        long_about = "Print the resolved AgentKit credentials as JSON.\n\nEach field names the environment variable that supplied it. The secret key and most of the access key are masked."
    )]
    Credentials,
}

/// Command-line arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "agentkit-mcp",
    author,
    version,
    about = "AgentKit MCP server (Runtime lifecycle and agentkit toolkit tools)",
    long_about = None
)]
pub struct LaunchProfileArgs {
    /// Select stdio (default) or streamable-http.
    #[arg(short = 't', long, value_enum, default_value_t = TransportMode::Stdio)]
    pub transport: TransportMode,
    /// Path to config.toml (overrides AGENTKIT_MCP_CONFIG).
    #[arg(long = "config")]
    pub config_override: Option<PathBuf>,
    /// .env file to load; variables already set in the environment win.
    #[arg(long = "env-file")]
    pub env_file: Option<PathBuf>,
    /// Optional CLI command mode.
    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

impl LaunchProfileArgs {
    /// Build a `LaunchProfile` from CLI args and environment variables.
    pub fn build(self) -> Result<LaunchProfile> {
        let (config_path, config_required) = resolve_config_path(self.config_override)?;
        let launch_args = build_launch_args(self.transport, &config_path);

        Ok(LaunchProfile {
            config_path,
            config_required,
            transport: self.transport,
            launch_args,
        })
    }

    /// Parse CLI args into either server launch mode or utility command mode.
    pub fn into_command(self) -> Result<ParsedCommand> {
        match self.command {
            Some(command) => Ok(ParsedCommand::Cli(command)),
            None => Ok(ParsedCommand::RunServer(self.build()?)),
        }
    }
}
