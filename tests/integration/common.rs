use std::{io, path::Path, process::Stdio, sync::Arc};

use anyhow::{Context, Result};
use rmcp::{
    model::{CallToolRequestParam, CallToolResult, ClientInfo, ErrorData},
    serve_client,
    service::{RoleClient, RunningService, ServiceError},
    ServiceExt,
};
use serde_json::{Map, Value};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, ReadBuf},
    process::{Child, ChildStdin, ChildStdout, Command},
    task::JoinHandle,
};
use wiremock::MockServer;

use agentkit_mcp::{
    client::{AgentKitClient, ClientAccessor, RuntimeApi},
    lib::errors::ClientError,
    server::{
        config::{
            AgentKitSection, Credentials, MapSource, ServerConfig, CONFIG_ENV_KEY,
            CREDENTIAL_VARIABLES,
        },
        runtime::AgentKitServer,
    },
    tools::toolkit::ToolkitService,
};

pub const BINARY_PATH: &str = env!("CARGO_BIN_EXE_agentkit-mcp");
pub const TEST_ACCESS_KEY: &str = "AKLTintegration";
pub const TEST_SECRET_KEY: &str = "integration-secret";

pub type TestClient = RunningService<RoleClient, ClientInfo>;

/// Spawn the binary on stdio in `workdir` with only test credentials set.
pub async fn spawn_server_process(
    workdir: &Path,
) -> Result<(Child, ChildIoBridge, Option<JoinHandle<()>>)> {
    let mut command = Command::new(BINARY_PATH);
    command.current_dir(workdir).env_remove(CONFIG_ENV_KEY);
    for variable in CREDENTIAL_VARIABLES {
        for name in variable.names() {
            command.env_remove(name);
        }
    }
    command
        .env("VOLC_ACCESSKEY", TEST_ACCESS_KEY)
        .env("VOLC_SECRETKEY", TEST_SECRET_KEY)
        .stdout(Stdio::piped())
        .stdin(Stdio::piped())
        .stderr(Stdio::piped());
    let mut child = command.spawn().context("failed to spawn server process")?;
    let stdout = child.stdout.take().expect("child stdout");
    let stdin = child.stdin.take().expect("child stdin");
    let bridge = ChildIoBridge::new(stdout, stdin);
    let stderr_handle = child.stderr.take().map(|mut stderr| {
        tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = stderr.read_to_end(&mut buf).await;
        })
    });
    Ok((child, bridge, stderr_handle))
}

/// Accessor whose client talks to `mock` with fixed test credentials.
pub fn mock_accessor(mock: &MockServer) -> ClientAccessor {
    let uri = mock.uri();
    ClientAccessor::with_factory(move || {
        let source = MapSource::from_pairs([
            ("VOLC_ACCESSKEY", TEST_ACCESS_KEY),
            ("VOLC_SECRETKEY", TEST_SECRET_KEY),
            ("VOLC_AGENTKIT_HOST", uri.as_str()),
        ]);
        let credentials = Credentials::resolve(&source)?;
        let client = AgentKitClient::new(&credentials, &AgentKitSection::default())?;
        Ok(Arc::new(client) as Arc<dyn RuntimeApi>)
    })
}

pub fn runtime_server(mock: &MockServer) -> AgentKitServer {
    AgentKitServer::with_accessor(
        ServerConfig::default(),
        "integration".into(),
        mock_accessor(mock),
    )
}

/// Server whose runtime tools fail on first use and whose toolkit uses `toolkit`.
pub fn toolkit_server(toolkit: ToolkitService) -> AgentKitServer {
    AgentKitServer::with_parts(
        ServerConfig::default(),
        "integration".into(),
        ClientAccessor::with_factory(|| {
            Err(ClientError::Build {
                message: "runtime API is not available in toolkit tests".into(),
            })
        }),
        toolkit,
    )
}

/// Serve `server` over an in-memory duplex and connect a client to it.
pub async fn connect(server: AgentKitServer) -> Result<(TestClient, JoinHandle<Result<()>>)> {
    let (server_transport, client_transport) = tokio::io::duplex(64 * 1024);
    let server_task = tokio::spawn(async move {
        server.serve(server_transport).await?.waiting().await?;
        Result::<_, anyhow::Error>::Ok(())
    });
    let client = serve_client(ClientInfo::default(), client_transport).await?;
    Ok((client, server_task))
}

pub async fn call(
    client: &TestClient,
    name: &'static str,
    arguments: Value,
) -> Result<CallToolResult, ServiceError> {
    client
        .call_tool(CallToolRequestParam {
            name: name.into(),
            arguments: Some(arguments.as_object().expect("JSON object").clone()),
        })
        .await
}

pub fn expect_mcp_error(result: Result<CallToolResult, ServiceError>) -> ErrorData {
    match result {
        Err(ServiceError::McpError(inner)) => inner,
        other => panic!("expected an MCP error, got {other:?}"),
    }
}

pub fn error_data(error: &ErrorData) -> Map<String, Value> {
    error
        .data
        .as_ref()
        .and_then(Value::as_object)
        .cloned()
        .expect("error data should be an object")
}

pub struct ChildIoBridge {
    stdout: ChildStdout,
    stdin: ChildStdin,
}

impl ChildIoBridge {
    pub fn new(stdout: ChildStdout, stdin: ChildStdin) -> Self {
        Self { stdout, stdin }
    }
}

impl AsyncRead for ChildIoBridge {
    fn poll_read(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> std::task::Poll<io::Result<()>> {
        std::pin::Pin::new(&mut self.stdout).poll_read(cx, buf)
    }
}

impl AsyncWrite for ChildIoBridge {
    fn poll_write(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        data: &[u8],
    ) -> std::task::Poll<io::Result<usize>> {
        std::pin::Pin::new(&mut self.stdin).poll_write(cx, data)
    }

    fn poll_flush(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<io::Result<()>> {
        std::pin::Pin::new(&mut self.stdin).poll_flush(cx)
    }

    fn poll_shutdown(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<io::Result<()>> {
        std::pin::Pin::new(&mut self.stdin).poll_shutdown(cx)
    }
}
