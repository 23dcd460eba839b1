use rmcp::model::ErrorData;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::{
    lib::errors::{ErrorOrigin, ToolErrorDescriptor, ToolkitError},
    tools::runtime::parameter_error_to_error_data,
};

use super::project::Workflow;

const COMMAND_FAILED_ERROR: ToolErrorDescriptor = ToolErrorDescriptor::new(
    "toolkit_command_failed",
    "The agentkit command exited with an error",
    "Review log_excerpt and hints in details, fix the project, then run the tool again.",
);
const TIMEOUT_ERROR: ToolErrorDescriptor = ToolErrorDescriptor::new(
    "toolkit_timeout",
    "The agentkit command was aborted after exceeding toolkit.max_run_minutes",
    "Retry later or increase toolkit.max_run_minutes in config.toml.",
);
const UNAVAILABLE_ERROR: ToolErrorDescriptor = ToolErrorDescriptor::new(
    "toolkit_unavailable",
    "The agentkit CLI could not be started",
    "Install the agentkit CLI or point toolkit.cli_path in config.toml at the executable.",
);
const PROJECT_CONFIG_ERROR: ToolErrorDescriptor = ToolErrorDescriptor::new(
    "project_config_error",
    "The project configuration file is missing or incomplete",
    "Pass an absolute config_file and complete it with toolkit_edit_config.",
);
const FILESYSTEM_ERROR: ToolErrorDescriptor = ToolErrorDescriptor::new(
    "filesystem_error",
    "A project file or directory could not be read or written",
    "Check that the path exists and the server process may write to it.",
);
const CONFIRMATION_REQUIRED_ERROR: ToolErrorDescriptor = ToolErrorDescriptor::new(
    "confirmation_required",
    "This action is irreversible and was not confirmed",
    "Confirm with the user, then call again with force set to true.",
);
const INVALID_REQUEST_ERROR: ToolErrorDescriptor = ToolErrorDescriptor::new(
    "invalid_request",
    "The toolkit request cannot be carried out",
    "Adjust the arguments as described in the message.",
);

/// Where a toolkit failure happened, carried into the error data.
#[derive(Debug, Clone, Default)]
pub struct FailureContext {
    pub tool: &'static str,
    pub run_id: Option<Uuid>,
    pub workflow: Option<Workflow>,
    pub stage: Option<&'static str>,
    pub hints: Vec<&'static str>,
    /// Destroy runs are never reported as retryable.
    pub irreversible: bool,
}

impl FailureContext {
    pub fn new(tool: &'static str) -> Self {
        Self {
            tool,
            ..Self::default()
        }
    }

    pub fn run(mut self, run_id: Uuid) -> Self {
        self.run_id = Some(run_id);
        self
    }

    pub fn stage(mut self, stage: &'static str) -> Self {
        self.stage = Some(stage);
        self
    }

    pub fn irreversible(mut self) -> Self {
        self.irreversible = true;
        self
    }
}

/// Troubleshooting hints for a failed deploy.
pub fn deploy_hints(workflow: Workflow) -> Vec<&'static str> {
    match workflow {
        Workflow::Local => vec![
            "Check if the image exists (run toolkit_build_image first)",
            "Check if the port is already in use",
            "Check Docker daemon logs for details",
        ],
        Workflow::Cloud | Workflow::Hybrid => vec![
            "Check if the runtime configuration is correct",
            "Check if the IAM role has proper permissions",
        ],
    }
}

pub fn toolkit_error_to_error_data(err: ToolkitError, context: &FailureContext) -> ErrorData {
    let message = err.to_string();
    match err {
        ToolkitError::Parameter(err) => parameter_error_to_error_data(err),
        ToolkitError::CommandFailed {
            subcommand,
            exit_code,
            log_excerpt,
        } => build(
            &COMMAND_FAILED_ERROR,
            message,
            ErrorOrigin::Toolkit,
            false,
            json!({
                "subcommand": subcommand,
                "exit_code": exit_code,
                "log_excerpt": log_excerpt,
            }),
            context,
        ),
        ToolkitError::Timeout {
            subcommand,
            duration_secs,
        } => build(
            &TIMEOUT_ERROR,
            message,
            ErrorOrigin::Toolkit,
            !context.irreversible,
            json!({ "subcommand": subcommand, "duration_secs": duration_secs }),
            context,
        ),
        ToolkitError::Spawn { program, source } => build(
            &UNAVAILABLE_ERROR,
            message,
            ErrorOrigin::Toolkit,
            false,
            json!({ "program": program, "reason": source.to_string() }),
            context,
        ),
        ToolkitError::ProjectConfig { path, message: reason } => build(
            &PROJECT_CONFIG_ERROR,
            message,
            ErrorOrigin::Request,
            false,
            json!({ "path": path.to_string_lossy(), "reason": reason }),
            context,
        ),
        ToolkitError::Io { path, source } => build(
            &FILESYSTEM_ERROR,
            message,
            ErrorOrigin::Toolkit,
            false,
            json!({ "path": path.to_string_lossy(), "reason": source.to_string() }),
            context,
        ),
        ToolkitError::ConfirmationRequired { action } => build(
            &CONFIRMATION_REQUIRED_ERROR,
            message,
            ErrorOrigin::Request,
            false,
            json!({
                "action": action,
                "warning": "This will terminate your running agent!",
            }),
            context,
        ),
        ToolkitError::InvalidRequest { message: reason } => build(
            &INVALID_REQUEST_ERROR,
            message,
            ErrorOrigin::Request,
            false,
            json!({ "reason": reason }),
            context,
        ),
    }
}

fn build(
    descriptor: &'static ToolErrorDescriptor,
    message: String,
    origin: ErrorOrigin,
    retryable: bool,
    details: Value,
    context: &FailureContext,
) -> ErrorData {
    let mut details = match details {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    if let Some(workflow) = context.workflow {
        details.insert("workflow".into(), json!(workflow.as_str()));
    }
    if let Some(stage) = context.stage {
        details.insert("stage".into(), json!(stage));
    }
    if !context.hints.is_empty() {
        details.insert("hints".into(), json!(context.hints));
    }

    let mut builder = descriptor
        .builder()
        .message(message)
        .retryable(retryable)
        .origin(origin)
        .details(Value::Object(details))
        .with_context_field("tool", json!(context.tool));
    if let Some(run_id) = context.run_id {
        builder = builder.with_context_field("run_id", json!(run_id.to_string()));
    }
    builder.build().expect("descriptor is valid")
}
