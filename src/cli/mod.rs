//! CLI entrypoint module structure.
use anyhow::Result;
use serde_json::json;

use crate::server::config::{CredentialSource, Credentials, ProcessEnv};

pub mod args;
pub mod profile;

pub use args::{CliCommand, LaunchProfileArgs, ParsedCommand};
pub use profile::{build_launch_args, resolve_config_path, LaunchProfile, TransportMode};

/// Execute CLI command mode and return a user-facing result payload.
pub fn execute_cli_command(command: CliCommand) -> Result<String> {
    match command {
        CliCommand::Credentials => describe_credentials(&ProcessEnv),
    }
}

/// Resolve credentials from `source` and render them as masked JSON.
///
/// A missing credential is reported in the payload rather than as an error.
fn describe_credentials(source: &impl CredentialSource) -> Result<String> {
    let payload = match Credentials::resolve(source) {
        Ok(credentials) => json!({
            "status": "resolved",
            "credentials": credentials.describe(),
        }),
        Err(err) => json!({
            "status": "missing",
            "message": err.to_string(),
        }),
    };
    Ok(serde_json::to_string_pretty(&payload)?)
}
