//! Native editing of the toolkit's `agentkit.yaml` project file.

use std::{
    collections::BTreeMap,
    fmt, fs,
    path::{Path, PathBuf},
};

use serde_json::Value as JsonValue;
use serde_yaml_ng::{Mapping, Value};

use crate::lib::errors::ToolkitError;

/// Deployment mode stored in `common.current_workflow`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Workflow {
    Local,
    Cloud,
    Hybrid,
}

impl Workflow {
    pub const ALL: [Workflow; 3] = [Workflow::Local, Workflow::Cloud, Workflow::Hybrid];

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "local" => Some(Workflow::Local),
            "cloud" => Some(Workflow::Cloud),
            "hybrid" => Some(Workflow::Hybrid),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Workflow::Local => "local",
            Workflow::Cloud => "cloud",
            Workflow::Hybrid => "hybrid",
        }
    }

    /// Only workflows with a cloud runtime endpoint can be invoked.
    pub fn supports_invoke(&self) -> bool {
        !matches!(self, Workflow::Local)
    }
}

impl fmt::Display for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Changes requested through `toolkit_edit_config`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigEdit {
    pub entry_point: Option<String>,
    pub workflow: Option<Workflow>,
    pub agent_name: Option<String>,
    pub entry_port: Option<u16>,
    pub envs: Option<BTreeMap<String, String>>,
    pub runtime_name: Option<String>,
    pub role_name: Option<String>,
    pub cr_instance_name: Option<String>,
    pub cr_namespace_name: Option<String>,
    pub cr_repo_name: Option<String>,
}

/// Container port every local agent image listens on.
const LOCAL_CONTAINER_PORT: u16 = 8000;

/// A loaded `agentkit.yaml`. Unknown keys are preserved on save.
#[derive(Debug, Clone)]
pub struct ProjectConfig {
    path: PathBuf,
    document: Mapping,
}

impl ProjectConfig {
    pub fn load(path: &Path) -> Result<Self, ToolkitError> {
        if !path.exists() {
            return Err(ToolkitError::ProjectConfig {
                path: path.to_path_buf(),
                message: "file not found; create it with toolkit_edit_config or toolkit_init_project"
                    .into(),
            });
        }
        let text = fs::read_to_string(path).map_err(|source| ToolkitError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let document = match serde_yaml_ng::from_str::<Value>(&text) {
            Ok(Value::Mapping(mapping)) => mapping,
            Ok(Value::Null) => Mapping::new(),
            Ok(_) => {
                return Err(ToolkitError::ProjectConfig {
                    path: path.to_path_buf(),
                    message: "top level must be a mapping".into(),
                })
            }
            Err(err) => {
                return Err(ToolkitError::ProjectConfig {
                    path: path.to_path_buf(),
                    message: format!("invalid YAML: {err}"),
                })
            }
        };
        Ok(Self {
            path: path.to_path_buf(),
            document,
        })
    }

    /// Load `path`, or start a new document seeded from `edit` when it is missing.
    ///
    /// Returns whether the file was created.
    pub fn load_or_new(path: &Path, edit: &ConfigEdit) -> Result<(Self, bool), ToolkitError> {
        if path.exists() {
            return Ok((Self::load(path)?, false));
        }
        let agent_name = edit.agent_name.clone().unwrap_or_else(|| {
            path.parent()
                .and_then(Path::file_name)
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_default()
        });
        let mut config = Self {
            path: path.to_path_buf(),
            document: Mapping::new(),
        };
        let common = config.section_mut(&["common"]);
        common.insert("agent_name".into(), agent_name.into());
        common.insert(
            "entry_point".into(),
            edit.entry_point.clone().unwrap_or_default().into(),
        );
        common.insert(
            "current_workflow".into(),
            edit.workflow.unwrap_or(Workflow::Local).as_str().into(),
        );
        config.section_mut(&["launch_types"]);
        Ok((config, true))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory the toolkit runs in.
    pub fn project_dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    /// `common.entry_point`, if set and non-blank.
    pub fn entry_point(&self) -> Option<&str> {
        self.common_str("entry_point")
            .filter(|value| !value.trim().is_empty())
    }

    pub fn require_entry_point(&self) -> Result<&str, ToolkitError> {
        self.entry_point().ok_or_else(|| ToolkitError::ProjectConfig {
            path: self.path.clone(),
            message: "common.entry_point is not configured; set it with toolkit_edit_config".into(),
        })
    }

    /// `common.current_workflow`, defaulting to `local` when absent.
    pub fn workflow(&self) -> Result<Workflow, ToolkitError> {
        match self.common_str("current_workflow") {
            None => Ok(Workflow::Local),
            Some(raw) => Workflow::parse(raw).ok_or_else(|| ToolkitError::ProjectConfig {
                path: self.path.clone(),
                message: format!(
                    "unknown workflow type `{raw}`; available workflows: {}",
                    Workflow::ALL.map(|w| w.as_str()).join(", ")
                ),
            }),
        }
    }

    /// Apply `edit` and describe every field that changed.
    pub fn apply(&mut self, edit: &ConfigEdit) -> Vec<String> {
        let mut updates = Vec::new();

        let common_fields: [(&str, Option<Value>); 4] = [
            ("entry_point", edit.entry_point.clone().map(Value::from)),
            (
                "current_workflow",
                edit.workflow.map(|workflow| Value::from(workflow.as_str())),
            ),
            ("agent_name", edit.agent_name.clone().map(Value::from)),
            ("entry_port", edit.entry_port.map(Value::from)),
        ];
        let common = self.section_mut(&["common"]);
        for (key, value) in common_fields {
            if let Some(value) = value {
                updates.push(format!("common.{key} -> {}", display(&value)));
                common.insert(key.into(), value);
            }
        }

        let workflow = edit
            .workflow
            .or_else(|| self.workflow().ok())
            .unwrap_or(Workflow::Local);
        match workflow {
            Workflow::Local => self.apply_local(edit, &mut updates),
            Workflow::Cloud | Workflow::Hybrid => self.apply_cloud(workflow, edit, &mut updates),
        }
        updates
    }

    fn apply_local(&mut self, edit: &ConfigEdit, updates: &mut Vec<String>) {
        let local = self.section_mut(&["launch_types", "local"]);
        if let Some(port) = edit.entry_port {
            let mapping = format!("{port}:{LOCAL_CONTAINER_PORT}");
            updates.push(format!("launch_types.local.ports -> [{mapping}]"));
            local.insert("ports".into(), Value::Sequence(vec![mapping.into()]));
        }
        if let Some(envs) = edit.envs.as_ref().filter(|envs| !envs.is_empty()) {
            updates.push(format!(
                "launch_types.local.environment -> {} variables",
                envs.len()
            ));
            local.insert("environment".into(), env_mapping(envs));
        }
    }

    fn apply_cloud(&mut self, workflow: Workflow, edit: &ConfigEdit, updates: &mut Vec<String>) {
        let name = workflow.as_str();
        let section = self.section_mut(&["launch_types", name]);
        let fields = [
            ("ve_runtime_name", &edit.runtime_name),
            ("ve_runtime_role_name", &edit.role_name),
            ("ve_cr_instance_name", &edit.cr_instance_name),
            ("ve_cr_namespace_name", &edit.cr_namespace_name),
            ("ve_cr_repo_name", &edit.cr_repo_name),
        ];
        for (key, value) in fields {
            if let Some(value) = value {
                updates.push(format!("launch_types.{name}.{key} -> {value}"));
                section.insert(key.into(), value.as_str().into());
            }
        }
        if let Some(envs) = edit.envs.as_ref().filter(|envs| !envs.is_empty()) {
            updates.push(format!(
                "launch_types.{name}.ve_runtime_envs -> {} variables",
                envs.len()
            ));
            section.insert("ve_runtime_envs".into(), env_mapping(envs));
        }
    }

    pub fn save(&self) -> Result<(), ToolkitError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| ToolkitError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let text = serde_yaml_ng::to_string(&self.document).map_err(|err| {
            ToolkitError::ProjectConfig {
                path: self.path.clone(),
                message: format!("failed to serialize YAML: {err}"),
            }
        })?;
        fs::write(&self.path, text).map_err(|source| ToolkitError::Io {
            path: self.path.clone(),
            source,
        })
    }

    /// The document as JSON, for tool responses.
    pub fn to_json(&self) -> JsonValue {
        serde_json::to_value(&self.document).unwrap_or(JsonValue::Null)
    }

    fn common_str(&self, key: &str) -> Option<&str> {
        self.document
            .get("common")
            .and_then(|common| common.get(key))
            .and_then(Value::as_str)
    }

    /// Walk (and create) nested mappings. Non-mapping values on the path are replaced.
    fn section_mut(&mut self, keys: &[&str]) -> &mut Mapping {
        let mut current = &mut self.document;
        for key in keys {
            let entry = current
                .entry(Value::from(*key))
                .or_insert_with(|| Value::Mapping(Mapping::new()));
            if !entry.is_mapping() {
                *entry = Value::Mapping(Mapping::new());
            }
            current = match entry {
                Value::Mapping(mapping) => mapping,
                _ => unreachable!("entry was just made a mapping"),
            };
        }
        current
    }
}

fn env_mapping(envs: &BTreeMap<String, String>) -> Value {
    Value::Mapping(
        envs.iter()
            .map(|(key, value)| (Value::from(key.as_str()), Value::from(value.as_str())))
            .collect(),
    )
}

fn display(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        other => serde_yaml_ng::to_string(other)
            .map(|text| text.trim().to_string())
            .unwrap_or_default(),
    }
}
