#![cfg(unix)]

use std::{
    fs,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
};

use anyhow::Result;
use rmcp::model::ErrorCode;
use serde_json::json;
use tempfile::TempDir;

use agentkit_mcp::{
    server::config::ToolkitSection,
    tools::toolkit::{ToolkitRunner, ToolkitService},
};

use crate::common::{call, connect, error_data, expect_mcp_error, toolkit_server};

/// Fake `agentkit` that appends its argv to `calls.log` next to itself.
/// Creating `fail-deploy` beside it makes `deploy` exit 1.
const FAKE_AGENTKIT: &str = r#"#!/bin/sh
here=$(dirname "$0")
echo "$@" >> "$here/calls.log"
if [ "$1" = "deploy" ] && [ -f "$here/fail-deploy" ]; then
  echo "deploy: role AgentKitRuntimeRole cannot be assumed" >&2
  exit 1
fi
echo "agentkit $1 finished"
"#;

struct Workspace {
    _root: TempDir,
    bin_dir: PathBuf,
    project_dir: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let root = tempfile::tempdir().expect("tempdir");
        let bin_dir = root.path().join("bin");
        let project_dir = root.path().join("project");
        fs::create_dir_all(&bin_dir).expect("bin dir");
        fs::create_dir_all(&project_dir).expect("project dir");
        let cli = bin_dir.join("agentkit");
        fs::write(&cli, FAKE_AGENTKIT).expect("write fake agentkit");
        fs::set_permissions(&cli, fs::Permissions::from_mode(0o755)).expect("chmod");
        Self {
            _root: root,
            bin_dir,
            project_dir,
        }
    }

    fn service(&self) -> ToolkitService {
        let runner = ToolkitRunner::new(&ToolkitSection {
            cli_path: self.bin_dir.join("agentkit"),
            ..ToolkitSection::default()
        });
        ToolkitService::with_runner(runner, self.config_file())
    }

    fn config_file(&self) -> String {
        self.project_dir
            .join("agentkit.yaml")
            .to_string_lossy()
            .to_string()
    }

    fn calls(&self) -> Vec<String> {
        match fs::read_to_string(self.bin_dir.join("calls.log")) {
            Ok(text) => text.lines().map(str::to_string).collect(),
            Err(_) => Vec::new(),
        }
    }

    fn fail_deploys(&self) {
        fs::write(self.bin_dir.join("fail-deploy"), "").expect("marker");
    }
}

fn read_yaml(path: &Path) -> serde_yaml_ng::Value {
    let text = fs::read_to_string(path).expect("config file exists");
    serde_yaml_ng::from_str(&text).expect("config is YAML")
}

#[tokio::test]
async fn edit_then_launch_runs_build_and_deploy_in_project_dir() -> Result<()> {
    let workspace = Workspace::new();
    let (client, server_task) = connect(toolkit_server(workspace.service())).await?;

    let edited = call(
        &client,
        "toolkit_edit_config",
        json!({
            "config_file": workspace.config_file(),
            "entry_point": "my_agent.py",
            "workflow_type": "cloud",
            "runtime_name": "demo-runtime",
            "envs": "{\"MODEL_NAME\":\"doubao\",\"MAX_TOKENS\":1024}",
        }),
    )
    .await?
    .structured_content
    .expect("structured_content should exist");
    assert_eq!(edited["success"], true);
    assert_eq!(edited["workflow"], "cloud");

    let yaml = read_yaml(Path::new(&workspace.config_file()));
    assert_eq!(yaml["common"]["entry_point"].as_str(), Some("my_agent.py"));
    assert_eq!(yaml["common"]["agent_name"].as_str(), Some("project"));
    let cloud = &yaml["launch_types"]["cloud"];
    assert_eq!(cloud["ve_runtime_name"].as_str(), Some("demo-runtime"));
    assert_eq!(cloud["ve_runtime_envs"]["MODEL_NAME"].as_str(), Some("doubao"));
    assert_eq!(cloud["ve_runtime_envs"]["MAX_TOKENS"].as_str(), Some("1024"));

    let launched = call(&client, "toolkit_launch_agent", json!({}))
        .await?
        .structured_content
        .expect("structured_content should exist");
    let _ = client.cancel().await;
    let _ = server_task.await;

    assert_eq!(launched["success"], true);
    assert_eq!(launched["stage"], "deploy");
    let excerpt = launched["log_excerpt"].as_str().unwrap_or_default();
    assert!(excerpt.contains("agentkit build finished"), "{excerpt}");
    assert!(excerpt.contains("agentkit deploy finished"), "{excerpt}");

    let config_file = workspace.config_file();
    assert_eq!(
        workspace.calls(),
        vec![
            format!("build --config-file {config_file}"),
            format!("deploy --config-file {config_file}"),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn failed_deploy_reports_stage_and_hints() -> Result<()> {
    let workspace = Workspace::new();
    workspace.fail_deploys();
    fs::write(
        workspace.config_file(),
        "common:\n  entry_point: my_agent.py\n  current_workflow: hybrid\n",
    )?;
    let (client, server_task) = connect(toolkit_server(workspace.service())).await?;

    let error = expect_mcp_error(call(&client, "toolkit_deploy_agent", json!({})).await);
    let _ = client.cancel().await;
    let _ = server_task.await;

    assert_eq!(error.code, ErrorCode::INTERNAL_ERROR);
    let data = error_data(&error);
    assert_eq!(data["code"], "toolkit_command_failed");
    assert_eq!(data["tool"], "toolkit_deploy_agent");
    assert!(data["run_id"].is_string());
    let details = &data["details"];
    assert_eq!(details["stage"], "deploy");
    assert_eq!(details["workflow"], "hybrid");
    assert_eq!(details["exit_code"], 1);
    assert!(details["log_excerpt"]
        .as_str()
        .unwrap_or_default()
        .contains("cannot be assumed"));
    assert!(details["hints"]
        .as_array()
        .expect("hints")
        .iter()
        .any(|hint| hint.as_str().unwrap_or_default().contains("IAM role")));
    Ok(())
}

#[tokio::test]
async fn destroy_requires_force_before_touching_anything() -> Result<()> {
    let workspace = Workspace::new();
    let (client, server_task) = connect(toolkit_server(workspace.service())).await?;

    let error = expect_mcp_error(call(&client, "toolkit_destroy_runtime", json!({})).await);
    let _ = client.cancel().await;
    let _ = server_task.await;

    assert_eq!(error.code, ErrorCode::INVALID_PARAMS);
    let data = error_data(&error);
    assert_eq!(data["code"], "confirmation_required");
    assert_eq!(data["retryable"], false);
    assert!(workspace.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn invoke_is_rejected_for_local_workflow() -> Result<()> {
    let workspace = Workspace::new();
    fs::write(
        workspace.config_file(),
        "common:\n  entry_point: my_agent.py\n  current_workflow: local\n",
    )?;
    let (client, server_task) = connect(toolkit_server(workspace.service())).await?;

    let error = expect_mcp_error(
        call(
            &client,
            "toolkit_invoke_agent",
            json!({ "payload": { "prompt": "hello" } }),
        )
        .await,
    );
    let _ = client.cancel().await;
    let _ = server_task.await;

    let data = error_data(&error);
    assert_eq!(data["code"], "invalid_request");
    assert_eq!(data["details"]["workflow"], "local");
    assert!(workspace.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn invoke_passes_payload_keys_through_untouched() -> Result<()> {
    let workspace = Workspace::new();
    fs::write(
        workspace.config_file(),
        "common:\n  entry_point: my_agent.py\n  current_workflow: cloud\n",
    )?;
    let (client, server_task) = connect(toolkit_server(workspace.service())).await?;

    let response = call(
        &client,
        "toolkit_invoke_agent",
        json!({ "payload": "{\"Prompt\":\"hello\"}", "apikey": "key-1" }),
    )
    .await?
    .structured_content
    .expect("structured_content should exist");
    let _ = client.cancel().await;
    let _ = server_task.await;

    assert_eq!(response["success"], true);
    let config_file = workspace.config_file();
    assert_eq!(
        workspace.calls(),
        vec![format!(
            "invoke --config-file {config_file} --payload {{\"Prompt\":\"hello\"}} --apikey key-1"
        )]
    );
    Ok(())
}

#[tokio::test]
async fn init_and_status_run_where_the_project_lives() -> Result<()> {
    let workspace = Workspace::new();
    fs::write(
        workspace.config_file(),
        "common:\n  entry_point: weather_agent.py\n  current_workflow: local\n",
    )?;
    let (client, server_task) = connect(toolkit_server(workspace.service())).await?;

    let created = call(
        &client,
        "toolkit_init_project",
        json!({
            "project_name": "weather_agent",
            "directory": workspace.project_dir.to_string_lossy(),
        }),
    )
    .await?
    .structured_content
    .expect("structured_content should exist");
    let status = call(&client, "toolkit_get_status", json!({}))
        .await?
        .structured_content
        .expect("structured_content should exist");
    let _ = client.cancel().await;
    let _ = server_task.await;

    assert_eq!(created["message"], "Successfully created weather_agent.py");
    assert_eq!(
        created["file_path"].as_str(),
        Some(
            workspace
                .project_dir
                .join("weather_agent.py")
                .to_string_lossy()
                .as_ref()
        )
    );
    assert_eq!(status["workflow"], "local");
    assert!(status["log_excerpt"]
        .as_str()
        .unwrap_or_default()
        .contains("agentkit status finished"));

    let config_file = workspace.config_file();
    assert_eq!(
        workspace.calls(),
        vec![
            "init weather_agent --template basic".to_string(),
            format!("status --config-file {config_file}"),
        ]
    );
    Ok(())
}
