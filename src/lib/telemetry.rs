//! Telemetry initialization and toolkit run span helpers.

use std::time::Instant;

use anyhow::Result;
use serde::Serialize;
use tracing::{info, info_span, Span};
use tracing_subscriber::{fmt, EnvFilter};
use uuid::Uuid;

/// Initialize `tracing` and format developer logs on stderr.
pub fn init_tracing() -> Result<()> {
    if tracing::dispatcher::has_been_set() {
        return Ok(());
    }

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!("failed to initialize tracing: {err}"))
}

/// Span recording the start and finish of one `agentkit` toolkit run.
pub struct ToolkitRunSpan {
    span: Span,
    started_at: Instant,
    run_id: Uuid,
    tool: &'static str,
}

impl ToolkitRunSpan {
    pub fn start(tool: &'static str) -> Self {
        let run_id = Uuid::new_v4();
        let span = info_span!(
            target: "agentkit_mcp::toolkit",
            "toolkit_run",
            %run_id,
            tool
        );
        Self {
            span,
            started_at: Instant::now(),
            run_id,
            tool,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Milliseconds since the span started.
    pub fn elapsed_ms(&self) -> u64 {
        self.started_at.elapsed().as_millis() as u64
    }

    /// Close the span while recording status and exit code.
    pub fn finish(self, status: &'static str, exit_code: Option<i32>) {
        let elapsed_ms = self.elapsed_ms();
        let _entered = self.span.enter();
        info!(
            target: "agentkit_mcp::toolkit",
            run_id = %self.run_id,
            tool = self.tool,
            status = status,
            exit_code = exit_code,
            elapsed_ms = elapsed_ms,
            "Completed toolkit run"
        );
    }
}

/// Payload for logging MCP runtime state as structured telemetry.
#[derive(Debug, Serialize)]
pub struct RuntimeModeTelemetry<'a> {
    pub transport: &'a str,
    pub host: Option<&'a str>,
    pub port: Option<u16>,
    pub path: Option<&'a str>,
    pub config_path: &'a str,
    pub tool_count: usize,
    pub launch_args: &'a [String],
}

/// Emit runtime mode to `tracing`.
pub fn emit_runtime_mode(telemetry: &RuntimeModeTelemetry<'_>) {
    info!(
        target: "agentkit_mcp::runtime",
        transport = telemetry.transport,
        host = telemetry.host.unwrap_or(""),
        port = telemetry.port.unwrap_or_default(),
        path = telemetry.path.unwrap_or(""),
        config_path = telemetry.config_path,
        tool_count = telemetry.tool_count,
        launch_args = ?telemetry.launch_args,
        "Started MCP server"
    );
}
