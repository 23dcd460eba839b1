//! Shared helpers for building `agentkit` toolkit commands.

use std::path::Path;

use tokio::process::Command;

/// Subcommands of the `agentkit` CLI this server drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentkitSubcommand {
    Init,
    Build,
    Deploy,
    Invoke,
    Status,
    Destroy,
}

impl AgentkitSubcommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentkitSubcommand::Init => "init",
            AgentkitSubcommand::Build => "build",
            AgentkitSubcommand::Deploy => "deploy",
            AgentkitSubcommand::Invoke => "invoke",
            AgentkitSubcommand::Status => "status",
            AgentkitSubcommand::Destroy => "destroy",
        }
    }
}

pub struct AgentkitCommandConfig<'a> {
    pub cli_path: &'a Path,
    pub working_dir: &'a Path,
    pub env: &'a [(&'static str, String)],
}

/// Build an `agentkit <subcommand> <args...>` command.
///
/// The child inherits the parent environment, then the resolved `VOLC_*`
/// credentials are layered on top so every run sees the unified names.
pub fn build_agentkit_command(
    config: AgentkitCommandConfig<'_>,
    subcommand: AgentkitSubcommand,
    args: &[String],
) -> Command {
    let mut command = Command::new(config.cli_path);
    command.kill_on_drop(true);
    command.current_dir(config.working_dir);
    command.env("PYTHONUNBUFFERED", "1");
    command.env("NO_COLOR", "1");
    for (key, value) in config.env {
        command.env(key, value);
    }

    command.arg(subcommand.as_str());
    for arg in args {
        command.arg(arg);
    }
    command
}

/// Merge stdout/stderr and keep at most `limit` characters from the end.
pub fn collect_log_excerpt(stdout: &[u8], stderr: &[u8], limit: usize) -> String {
    let mut combined = Vec::with_capacity(stdout.len() + stderr.len());
    combined.extend_from_slice(stdout);
    combined.extend_from_slice(stderr);
    let text = String::from_utf8_lossy(&combined);
    let total = text.chars().count();
    if total <= limit {
        return text.to_string();
    }
    text.chars().skip(total - limit).collect()
}
