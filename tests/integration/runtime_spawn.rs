use std::{
    process::{Command as StdCommand, Stdio},
    time::Duration,
};

use anyhow::Result;
use rmcp::{model::ClientInfo, serve_client};
use tokio::time::timeout;

use agentkit_mcp::tools::{runtime::RUNTIME_TOOL_IDS, toolkit::TOOLKIT_TOOL_IDS};

use crate::common::{spawn_server_process, BINARY_PATH};

#[tokio::test]
async fn inspector_style_spawn_lists_every_tool() -> Result<()> {
    let workdir = tempfile::tempdir()?;
    let (mut child, transport, stderr_task) = spawn_server_process(workdir.path()).await?;

    let client = serve_client(ClientInfo::default(), transport).await?;
    let info = client.peer_info().cloned();
    let list = client.list_tools(None).await?;
    let names: Vec<&str> = list.tools.iter().map(|tool| tool.name.as_ref()).collect();
    assert_eq!(names.len(), 16, "unexpected tool list: {names:?}");
    for expected in RUNTIME_TOOL_IDS.iter().chain(TOOLKIT_TOOL_IDS.iter()) {
        assert!(names.contains(expected), "list_tools should include {expected}");
    }
    let instructions = info
        .and_then(|info| info.instructions)
        .unwrap_or_default();
    assert!(instructions.contains("delete_runtime"), "{instructions}");

    client.cancel().await?;
    let status = timeout(Duration::from_secs(5), child.wait()).await??;
    assert!(
        status.success(),
        "server should exit cleanly but exit status was {status:?}"
    );
    if let Some(handle) = stderr_task {
        let _ = handle.await;
    }
    Ok(())
}

#[test]
fn direct_execution_requires_mcp_client() {
    use std::io::IsTerminal;
    if !std::io::stdin().is_terminal() || !std::io::stdout().is_terminal() {
        eprintln!("Skipping MCP_CLIENT_REQUIRED test because stdio is not a TTY");
        return;
    }
    let workdir = tempfile::tempdir().expect("tempdir");
    let status = StdCommand::new(BINARY_PATH)
        .current_dir(workdir.path())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .stdin(Stdio::inherit())
        .status()
        .expect("process should start");
    assert_eq!(
        status.code(),
        Some(44),
        "MCP_CLIENT_REQUIRED exit code (44) expected, got {status:?}"
    );
}
