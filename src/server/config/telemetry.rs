use std::path::Path;

use tracing::{debug, info};

use super::{ServerConfig, CONFIG_ENV_KEY};

pub fn log_defaults(path: &Path) {
    debug!(
        target: "agentkit_mcp::config",
        path = %path.display(),
        env = CONFIG_ENV_KEY,
        "No configuration file found; using built-in defaults"
    );
}

pub fn log_loaded(config: &ServerConfig) {
    info!(
        target: "agentkit_mcp::config",
        path = %config.source_label(),
        host = %config.server.host,
        port = config.server.port,
        mcp_path = %config.server.path,
        api_version = %config.agentkit.api_version,
        request_timeout_secs = config.agentkit.request_timeout_secs,
        cli_path = %config.toolkit.cli_path.display(),
        max_run_minutes = config.toolkit.max_run_minutes,
        "Configuration file loaded successfully"
    );
}
