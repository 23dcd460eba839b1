//! LaunchProfile and config path resolution.
use std::{
    env,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::ValueEnum;

use crate::server::config::{CONFIG_ENV_KEY, DEFAULT_CONFIG_PATH};

/// MCP transport mode.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum TransportMode {
    Stdio,
    StreamableHttp,
}

impl TransportMode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            TransportMode::Stdio => "stdio",
            TransportMode::StreamableHttp => "streamable-http",
        }
    }
}

/// Resolved launch profile.
#[derive(Debug, Clone)]
pub struct LaunchProfile {
    pub config_path: PathBuf,
    /// True when the path came from `--config` or the environment.
    pub config_required: bool,
    pub transport: TransportMode,
    pub launch_args: Vec<String>,
}

/// Resolve config path in the order: CLI override → env var → default.
///
/// Returns the absolute path and whether it was requested explicitly.
pub fn resolve_config_path(override_path: Option<PathBuf>) -> Result<(PathBuf, bool)> {
    let explicit = override_path.or_else(|| {
        env::var_os(CONFIG_ENV_KEY)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
    });
    let required = explicit.is_some();
    let path = explicit.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    if path.is_absolute() {
        return Ok((path, required));
    }

    let cwd = env::current_dir().context("failed to obtain current directory")?;
    Ok((cwd.join(path), required))
}

/// Build launch arguments suitable for reproduction/logging.
pub fn build_launch_args(transport: TransportMode, config: &Path) -> Vec<String> {
    vec![
        format!("--transport={}", transport.as_str()),
        format!("--config={}", config.display()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_config_is_required_and_absolute() {
        let (path, required) =
            resolve_config_path(Some(PathBuf::from("conf/agentkit-mcp.toml"))).expect("resolve");
        assert!(required);
        assert!(path.is_absolute());
        assert!(path.ends_with("conf/agentkit-mcp.toml"));
    }

    #[test]
    fn launch_args_name_transport_and_config() {
        let args = build_launch_args(TransportMode::StreamableHttp, Path::new("/etc/a.toml"));
        assert_eq!(
            args,
            ["--transport=streamable-http", "--config=/etc/a.toml"]
        );
    }
}
