use std::process::ExitCode;

use anyhow::{Context, Error};
use axum::Router;
use rmcp::{
    transport::streamable_http_server::{
        session::local::LocalSessionManager, StreamableHttpService,
    },
    ServiceExt,
};
use tokio::net::TcpListener;

use crate::{
    cli::{LaunchProfile, TransportMode},
    lib::telemetry::{emit_runtime_mode, RuntimeModeTelemetry},
    server::{
        config::{Credentials, ServerConfig},
        guard,
        runtime::{build_instructions, AgentKitServer},
    },
};

/// Bundles a runtime error message with an exit code and optional structured error data.
#[derive(Debug)]
pub struct RuntimeExit {
    message: String,
    exit_code: ExitCode,
    error_data: Option<rmcp::model::ErrorData>,
}

impl RuntimeExit {
    pub fn structured(error: rmcp::model::ErrorData, exit_code: ExitCode) -> Self {
        Self {
            message: error.message.to_string(),
            exit_code,
            error_data: Some(error),
        }
    }

    pub fn from_error(err: impl Into<Error>) -> Self {
        let err = err.into();
        Self {
            message: format!("{err:?}"),
            exit_code: ExitCode::FAILURE,
            error_data: None,
        }
    }

    pub fn report(self) -> ExitCode {
        if let Some(data) = self.error_data {
            if let Ok(serialized) = serde_json::to_string(&data) {
                eprintln!("{serialized}");
            } else {
                eprintln!("{}", data.message);
            }
        } else {
            eprintln!("{}", self.message);
        }
        self.exit_code
    }

    pub fn exit_code(&self) -> ExitCode {
        self.exit_code
    }

    pub fn error_data(&self) -> Option<&rmcp::model::ErrorData> {
        self.error_data.as_ref()
    }
}

/// Start the MCP server on stdio or streamable HTTP based on the launch profile.
pub async fn run_server(profile: LaunchProfile, config: ServerConfig) -> Result<(), RuntimeExit> {
    guard::ensure_invoked_via_mcp_client(&profile)?;
    warn_on_missing_credentials();

    let instructions = build_instructions(&profile, &config);
    let server = AgentKitServer::new(config.clone(), instructions);

    let http = profile.transport == TransportMode::StreamableHttp;
    let config_label = config.source_label();
    emit_runtime_mode(&RuntimeModeTelemetry {
        transport: profile.transport.as_str(),
        host: http.then_some(config.server.host.as_str()),
        port: http.then_some(config.server.port),
        path: http.then_some(config.server.path.as_str()),
        config_path: &config_label,
        tool_count: server.tool_count(),
        launch_args: &profile.launch_args,
    });

    match profile.transport {
        TransportMode::Stdio => run_stdio(server).await,
        TransportMode::StreamableHttp => run_streamable_http(server, &config).await,
    }
}

/// Credentials are only needed on first tool use; a missing one is not fatal.
fn warn_on_missing_credentials() {
    match Credentials::from_env() {
        Ok(credentials) => tracing::info!(
            target: "agentkit_mcp::config",
            access_key = %credentials.access_key_hint(),
            region = %credentials.region.value,
            host = %credentials.host.value,
            "Resolved AgentKit credentials"
        ),
        Err(err) => tracing::warn!(
            target: "agentkit_mcp::config",
            reason = %err,
            "AgentKit credentials are incomplete; runtime tools will fail until they are set"
        ),
    }
}

async fn run_stdio(server: AgentKitServer) -> Result<(), RuntimeExit> {
    let running = server
        .serve(rmcp::transport::stdio())
        .await
        .map_err(RuntimeExit::from_error)?;
    running.waiting().await.map_err(RuntimeExit::from_error)?;
    Ok(())
}

async fn run_streamable_http(
    server: AgentKitServer,
    config: &ServerConfig,
) -> Result<(), RuntimeExit> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind TCP port {addr}"))
        .map_err(RuntimeExit::from_error)?;
    tracing::info!(
        target: "agentkit_mcp::runtime",
        transport = "streamable-http",
        bind_addr = %addr,
        path = %config.server.path,
        "Started listening for MCP clients"
    );

    let router = mcp_router(server, &config.server.path);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .with_context(|| format!("streamable HTTP server on {addr} failed"))
        .map_err(RuntimeExit::from_error)
}

/// Mount the MCP endpoint at `path`. Every session gets a clone of `server`.
pub fn mcp_router(server: AgentKitServer, path: &str) -> Router {
    let service = StreamableHttpService::new(
        move || Ok(server.clone()),
        LocalSessionManager::default().into(),
        Default::default(),
    );
    Router::new().nest_service(path, service)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(
            target: "agentkit_mcp::runtime",
            error = %err,
            "Failed to listen for shutdown signal"
        );
        std::future::pending::<()>().await;
    }
    tracing::info!(target: "agentkit_mcp::runtime", "Shutting down");
}
