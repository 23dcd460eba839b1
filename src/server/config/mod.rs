//! Load and validate server configuration.
//!
//! The file is optional: every section has defaults. It only becomes mandatory
//! when a path is requested explicitly (via `--config` or `AGENTKIT_MCP_CONFIG`).
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{error, info};

use crate::lib::errors::ConfigError;

pub mod agentkit;
pub mod credentials;
pub mod server;
pub mod telemetry;
pub mod toolkit;

pub use agentkit::{
    parse_agentkit_section, AgentKitSection, RawAgentKitSection, DEFAULT_API_VERSION,
    DEFAULT_REQUEST_TIMEOUT_SECS,
};
pub use credentials::{
    CredentialSource, CredentialVariable, Credentials, MapSource, ProcessEnv, Resolved,
    ValueOrigin, CREDENTIAL_VARIABLES,
};
pub use server::{
    parse_server_section, RawServerSection, ServerSection, DEFAULT_HOST, DEFAULT_MCP_PATH,
    DEFAULT_PORT,
};
pub use toolkit::{
    parse_toolkit_section, RawToolkitSection, ToolkitSection, DEFAULT_CLI_PATH,
    DEFAULT_MAX_RUN_MINUTES, DEFAULT_PROJECT_CONFIG_FILE,
};

pub const CONFIG_ENV_KEY: &str = "AGENTKIT_MCP_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Top-level configuration container.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    pub server: ServerSection,
    pub agentkit: AgentKitSection,
    pub toolkit: ToolkitSection,
    /// `None` when running on built-in defaults.
    pub source_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct RawServerConfig {
    server: Option<RawServerSection>,
    agentkit: Option<RawAgentKitSection>,
    toolkit: Option<RawToolkitSection>,
}

impl ServerConfig {
    /// Load `path` when it exists; fall back to defaults when it does not and
    /// the path was not requested explicitly.
    pub fn load(path: PathBuf, required: bool) -> Result<Self, ConfigError> {
        if !required && !path.exists() {
            telemetry::log_defaults(&path);
            return Ok(Self::default());
        }
        Self::load_from_path(path)
    }

    /// Load configuration from a specific path.
    pub fn load_from_path(path: PathBuf) -> Result<Self, ConfigError> {
        info!(
            target: "agentkit_mcp::config",
            path = %path.display(),
            "Starting configuration load"
        );

        if !path.exists() {
            let error = ConfigError::NotFound { path: path.clone() };
            error!(
                target: "agentkit_mcp::config",
                path = %path.display(),
                "Configuration file does not exist"
            );
            return Err(error);
        }

        let builder = config::Config::builder().add_source(config::File::from(path.clone()));
        let document = builder.build().map_err(|err| {
            let error = ConfigError::from_read_error(path.clone(), err);
            error!(
                target: "agentkit_mcp::config",
                path = %path.display(),
                reason = %error,
                "Failed to read configuration file"
            );
            error
        })?;

        let raw: RawServerConfig = document.try_deserialize().map_err(|err| {
            let error = ConfigError::from_parse_error(path.clone(), err);
            error!(
                target: "agentkit_mcp::config",
                path = %path.display(),
                reason = %error,
                "Failed to parse configuration file"
            );
            error
        })?;

        let config = Self::from_raw(raw, &path).map_err(|err| {
            error!(
                target: "agentkit_mcp::config",
                path = %path.display(),
                reason = %err,
                "Failed to validate configuration file"
            );
            err
        })?;

        telemetry::log_loaded(&config);
        Ok(config)
    }

    fn from_raw(raw: RawServerConfig, path: &Path) -> Result<Self, ConfigError> {
        Ok(Self {
            server: parse_server_section(raw.server, path)?,
            agentkit: parse_agentkit_section(raw.agentkit, path)?,
            toolkit: parse_toolkit_section(raw.toolkit, path)?,
            source_path: Some(path.to_path_buf()),
        })
    }

    /// Human-readable origin for logs.
    pub fn source_label(&self) -> String {
        self.source_path
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "<defaults>".to_string())
    }
}
