use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;

use crate::lib::errors::ConfigError;

pub const DEFAULT_CLI_PATH: &str = "agentkit";
pub const DEFAULT_MAX_RUN_MINUTES: u16 = 30;
pub const DEFAULT_PROJECT_CONFIG_FILE: &str = "agentkit.yaml";

/// Settings for the `agentkit` CLI wrappers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolkitSection {
    pub cli_path: PathBuf,
    pub max_run_minutes: u16,
    pub default_config_file: String,
}

impl ToolkitSection {
    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.max_run_minutes) * 60)
    }
}

impl Default for ToolkitSection {
    fn default() -> Self {
        Self {
            cli_path: PathBuf::from(DEFAULT_CLI_PATH),
            max_run_minutes: DEFAULT_MAX_RUN_MINUTES,
            default_config_file: DEFAULT_PROJECT_CONFIG_FILE.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct RawToolkitSection {
    pub cli_path: Option<PathBuf>,
    pub max_run_minutes: Option<u16>,
    pub default_config_file: Option<String>,
}

pub fn parse_toolkit_section(
    raw: Option<RawToolkitSection>,
    path: &Path,
) -> Result<ToolkitSection, ConfigError> {
    let raw = raw.unwrap_or_default();

    let cli_path = raw
        .cli_path
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CLI_PATH));
    if cli_path.as_os_str().is_empty() {
        return Err(ConfigError::InvalidField {
            path: path.to_path_buf(),
            field: "toolkit.cli_path",
            message: "Provide the agentkit executable name or path".into(),
        });
    }

    let max_run_minutes = raw.max_run_minutes.unwrap_or(DEFAULT_MAX_RUN_MINUTES);
    if !(1..=120).contains(&max_run_minutes) {
        return Err(ConfigError::InvalidField {
            path: path.to_path_buf(),
            field: "toolkit.max_run_minutes",
            message: "Specify a value between 1 and 120 minutes".into(),
        });
    }

    let default_config_file = raw
        .default_config_file
        .unwrap_or_else(|| DEFAULT_PROJECT_CONFIG_FILE.to_string());
    if default_config_file.trim().is_empty() {
        return Err(ConfigError::InvalidField {
            path: path.to_path_buf(),
            field: "toolkit.default_config_file",
            message: "File name cannot be empty".into(),
        });
    }

    Ok(ToolkitSection {
        cli_path,
        max_run_minutes,
        default_config_file,
    })
}
