//! Wrappers around the `agentkit` CLI toolkit.
//!
//! Project-mutating runs (edit, build, deploy, launch, destroy) go through a
//! FIFO queue so two runs never touch the same project concurrently.
pub mod errors;
pub mod executor;
pub mod handlers;
pub mod project;
pub mod queue;
pub mod request;

pub use errors::{deploy_hints, toolkit_error_to_error_data, FailureContext};
pub use executor::{RunOutcome, ToolkitRunner, LOG_EXCERPT_LIMIT};
pub use handlers::{ToolkitResult, ToolkitService};
pub use project::{ConfigEdit, ProjectConfig, Workflow};
pub use queue::{RunGuard, RunTicket, ToolkitJobQueue};
pub use request::{
    BuildImageParams, ConfigFileParams, DestroyRuntimeParams, EditConfigParams, EnvEntry, EnvVars,
    InitProjectParams, InvokeAgentParams, ToolkitResponse,
};

/// Tool names, in registration order.
pub const TOOLKIT_TOOL_IDS: [&str; 8] = [
    handlers::INIT_PROJECT,
    handlers::EDIT_CONFIG,
    handlers::BUILD_IMAGE,
    handlers::DEPLOY_AGENT,
    handlers::LAUNCH_AGENT,
    handlers::INVOKE_AGENT,
    handlers::GET_STATUS,
    handlers::DESTROY_RUNTIME,
];
