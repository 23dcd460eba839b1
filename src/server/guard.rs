//! Startup checks performed before serving on stdio.
use std::{io::IsTerminal, process::ExitCode};

use serde_json::json;

use super::runtime::RuntimeExit;
use crate::{
    cli::{LaunchProfile, TransportMode},
    lib::errors::{ErrorOrigin, MCP_CLIENT_REQUIRED_ERROR},
};

pub const MCP_CLIENT_REQUIRED_EXIT: u8 = 44;

/// Refuse to run the stdio transport from an interactive terminal.
pub fn ensure_invoked_via_mcp_client(profile: &LaunchProfile) -> Result<(), RuntimeExit> {
    if profile.transport != TransportMode::Stdio {
        return Ok(());
    }
    check_terminals(
        profile,
        std::io::stdin().is_terminal(),
        std::io::stdout().is_terminal(),
    )
}

fn check_terminals(
    profile: &LaunchProfile,
    stdin_tty: bool,
    stdout_tty: bool,
) -> Result<(), RuntimeExit> {
    if !(stdin_tty || stdout_tty) {
        return Ok(());
    }
    let data = MCP_CLIENT_REQUIRED_ERROR
        .builder()
        .retryable(true)
        .origin(ErrorOrigin::Request)
        .details(json!({
            "transport": profile.transport.as_str(),
            "stdin_is_tty": stdin_tty,
            "stdout_is_tty": stdout_tty,
        }))
        .with_context_field("exit_code", json!(MCP_CLIENT_REQUIRED_EXIT))
        .build()
        .expect("descriptor is valid");
    Err(RuntimeExit::structured(
        data,
        ExitCode::from(MCP_CLIENT_REQUIRED_EXIT),
    ))
}
