use crate::{cli::LaunchProfile, server::config::ServerConfig};

/// Build the `ServerInfo.instructions` string shown to MCP clients.
pub fn build_instructions(profile: &LaunchProfile, config: &ServerConfig) -> String {
    format!(
        "AgentKit MCP ({transport}, config {config}). \
Runtime tools (create_runtime, list_runtimes, get_runtime, update_runtime, delete_runtime, release_runtime, get_runtime_version, list_runtime_versions) call the AgentKit OpenAPI; \
arguments and results use PascalCase and structured arguments may be JSON or a JSON-encoded string. \
Toolkit tools (toolkit_*) drive the agentkit CLI against an agentkit.yaml; pass absolute config_file paths. \
delete_runtime, release_runtime and toolkit_destroy_runtime are irreversible: confirm with the user first.",
        transport = profile.transport.as_str(),
        config = config.source_label(),
    )
}
