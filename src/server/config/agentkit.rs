use std::{path::Path, time::Duration};

use serde::Deserialize;

use crate::lib::errors::ConfigError;

pub const DEFAULT_API_VERSION: &str = "2025-10-30";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Settings for the AgentKit OpenAPI client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentKitSection {
    pub api_version: String,
    pub request_timeout_secs: u64,
}

impl AgentKitSection {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for AgentKitSection {
    fn default() -> Self {
        Self {
            api_version: DEFAULT_API_VERSION.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct RawAgentKitSection {
    pub api_version: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

pub fn parse_agentkit_section(
    raw: Option<RawAgentKitSection>,
    path: &Path,
) -> Result<AgentKitSection, ConfigError> {
    let raw = raw.unwrap_or_default();
    let api_version = raw
        .api_version
        .unwrap_or_else(|| DEFAULT_API_VERSION.to_string());
    if api_version.trim().is_empty() {
        return Err(ConfigError::InvalidField {
            path: path.to_path_buf(),
            field: "agentkit.api_version",
            message: "API version cannot be empty".into(),
        });
    }

    let request_timeout_secs = raw
        .request_timeout_secs
        .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
    if !(1..=300).contains(&request_timeout_secs) {
        return Err(ConfigError::InvalidField {
            path: path.to_path_buf(),
            field: "agentkit.request_timeout_secs",
            message: "Specify a value between 1 and 300 seconds".into(),
        });
    }

    Ok(AgentKitSection {
        api_version,
        request_timeout_secs,
    })
}
