use std::{collections::BTreeMap, path::PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{lib::errors::ParameterFormatError, tools::runtime::JsonArg};

use super::project::{ConfigEdit, Workflow};

pub const DEFAULT_PROJECT_NAME: &str = "my_agent";
pub const DEFAULT_TEMPLATE: &str = "basic";
pub const AUTO_PLATFORM: &str = "auto";

/// Input for `toolkit_init_project`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct InitProjectParams {
    /// Python module name: lowercase letters, digits and `_`, starting with a letter. Defaults to `my_agent`.
    #[serde(default)]
    pub project_name: Option<String>,
    /// Project template. Defaults to `basic`.
    #[serde(default)]
    pub template: Option<String>,
    /// Target directory; absolute paths are recommended. Defaults to the server's working directory.
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

impl InitProjectParams {
    pub fn project_name(&self) -> Result<&str, ParameterFormatError> {
        let name = self.project_name.as_deref().unwrap_or(DEFAULT_PROJECT_NAME);
        validate_project_name(name)?;
        Ok(name)
    }

    pub fn template(&self) -> Result<&str, ParameterFormatError> {
        match self.template.as_deref() {
            None => Ok(DEFAULT_TEMPLATE),
            Some(template) if template.trim().is_empty() => Err(ParameterFormatError::new(
                "template",
                "must not be blank",
            )),
            Some(template) => Ok(template),
        }
    }
}

/// Input shared by tools that only need the project config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ConfigFileParams {
    /// Path to `agentkit.yaml`; absolute paths are recommended.
    #[serde(default)]
    pub config_file: Option<String>,
}

/// Input for `toolkit_build_image`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BuildImageParams {
    #[serde(default)]
    pub config_file: Option<String>,
    /// Target platform, e.g. `linux/amd64`. `auto` lets the toolkit decide.
    #[serde(default = "default_platform")]
    pub platform: String,
    /// Push the image (local daemon or container registry). Defaults to true.
    #[serde(default = "default_push")]
    pub push: bool,
}

impl Default for BuildImageParams {
    fn default() -> Self {
        Self {
            config_file: None,
            platform: default_platform(),
            push: default_push(),
        }
    }
}

impl BuildImageParams {
    pub fn cli_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        let platform = self.platform.trim();
        if !platform.is_empty() && platform != AUTO_PLATFORM {
            args.push("--platform".to_string());
            args.push(platform.to_string());
        }
        if !self.push {
            args.push("--no-push".to_string());
        }
        args
    }
}

/// Input for `toolkit_invoke_agent`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct InvokeAgentParams {
    /// JSON payload sent to the agent, as a JSON value or JSON-encoded string.
    pub payload: JsonArg<Value>,
    #[serde(default)]
    pub config_file: Option<String>,
    /// API key for the runtime endpoint.
    #[serde(default)]
    pub apikey: Option<String>,
}

impl InvokeAgentParams {
    /// Compact JSON text passed to `--payload`.
    pub fn payload_text(&self) -> Result<String, ParameterFormatError> {
        let payload = self.payload.parse_verbatim("payload")?;
        serde_json::to_string(&payload)
            .map_err(|err| ParameterFormatError::new("payload", err.to_string()))
    }
}

/// Input for `toolkit_destroy_runtime`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct DestroyRuntimeParams {
    #[serde(default)]
    pub config_file: Option<String>,
    /// Must be true. Destroy terminates the running agent and cannot be undone.
    #[serde(default)]
    pub force: bool,
}

/// Environment variables for `toolkit_edit_config`: `{"KEY":"value"}` or `[{"key":"KEY","value":"value"}]`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(untagged)]
pub enum EnvVars {
    Map(BTreeMap<String, Value>),
    List(Vec<EnvEntry>),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct EnvEntry {
    #[serde(alias = "Key")]
    pub key: String,
    #[serde(alias = "Value")]
    pub value: Value,
}

impl EnvVars {
    /// Flatten either form into `NAME -> value`, stringifying scalars.
    pub fn into_map(self) -> Result<BTreeMap<String, String>, ParameterFormatError> {
        let pairs: Vec<(String, Value)> = match self {
            EnvVars::Map(map) => map.into_iter().collect(),
            EnvVars::List(entries) => entries
                .into_iter()
                .map(|entry| (entry.key, entry.value))
                .collect(),
        };
        pairs
            .into_iter()
            .map(|(key, value)| {
                if key.trim().is_empty() {
                    return Err(ParameterFormatError::new("envs", "variable names must not be blank"));
                }
                let value = match value {
                    Value::String(text) => text,
                    Value::Number(_) | Value::Bool(_) => value.to_string(),
                    other => {
                        return Err(ParameterFormatError::new(
                            "envs",
                            format!("value of `{key}` must be a string, number or boolean, got {other}"),
                        ))
                    }
                };
                Ok((key, value))
            })
            .collect()
    }
}

/// Input for `toolkit_edit_config`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct EditConfigParams {
    #[serde(default)]
    pub config_file: Option<String>,
    /// Agent entry file, e.g. `my_agent.py`.
    #[serde(default)]
    pub entry_point: Option<String>,
    /// `local`, `cloud` or `hybrid`.
    #[serde(default)]
    pub workflow_type: Option<String>,
    /// Stored as `common.agent_name`.
    #[serde(default)]
    pub project_name: Option<String>,
    /// Cloud/hybrid runtime name.
    #[serde(default)]
    pub runtime_name: Option<String>,
    /// Cloud/hybrid IAM role name.
    #[serde(default)]
    pub role_name: Option<String>,
    /// Port the agent listens on; local workflows map it as `<port>:8000`.
    #[serde(default)]
    pub entry_port: Option<u16>,
    #[serde(default)]
    pub envs: Option<JsonArg<EnvVars>>,
    #[serde(default)]
    pub ve_cr_instance_name: Option<String>,
    #[serde(default)]
    pub ve_cr_namespace_name: Option<String>,
    /// Recommended for cloud workflows: lowercase letters, digits and hyphens, no leading hyphen.
    #[serde(default)]
    pub ve_cr_repo_name: Option<String>,
}

impl EditConfigParams {
    pub fn into_edit(self) -> Result<ConfigEdit, ParameterFormatError> {
        let workflow = self
            .workflow_type
            .as_deref()
            .map(|raw| {
                Workflow::parse(raw).ok_or_else(|| {
                    ParameterFormatError::new(
                        "workflow_type",
                        format!("`{raw}` is not one of local, cloud, hybrid"),
                    )
                })
            })
            .transpose()?;
        if self.entry_port == Some(0) {
            return Err(ParameterFormatError::new("entry_port", "must be 1-65535"));
        }
        let envs = match self.envs {
            Some(envs) => Some(envs.parse_verbatim("envs")?.into_map()?),
            None => None,
        };
        Ok(ConfigEdit {
            entry_point: self.entry_point,
            workflow,
            agent_name: self.project_name,
            entry_port: self.entry_port,
            envs,
            runtime_name: self.runtime_name,
            role_name: self.role_name,
            cr_instance_name: self.ve_cr_instance_name,
            cr_namespace_name: self.ve_cr_namespace_name,
            cr_repo_name: self.ve_cr_repo_name,
        })
    }
}

/// Result of a toolkit tool.
#[derive(Debug, Clone, Default, Serialize, JsonSchema)]
pub struct ToolkitResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow: Option<String>,
    /// Last stage that ran (`build` or `deploy` for launch).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hints: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_excerpt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// Project configuration after an edit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub updates: Vec<String>,
}

/// `^[a-z][a-z0-9_]*$`
pub fn validate_project_name(name: &str) -> Result<(), ParameterFormatError> {
    let mut chars = name.chars();
    let valid = matches!(chars.next(), Some(first) if first.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ParameterFormatError::new(
            "project_name",
            format!(
                "`{name}` must start with a lowercase letter and contain only lowercase letters, digits and underscores"
            ),
        ))
    }
}

fn default_platform() -> String {
    AUTO_PLATFORM.to_string()
}

fn default_push() -> bool {
    true
}
