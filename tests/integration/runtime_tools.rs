use anyhow::Result;
use rmcp::model::ErrorCode;
use serde_json::json;
use wiremock::{
    matchers::{body_json, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

use crate::common::{call, connect, error_data, expect_mcp_error, runtime_server};

fn ok(result: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "ResponseMetadata": { "RequestId": "req-it", "Action": "Test" },
        "Result": result,
    }))
}

#[tokio::test]
async fn list_runtimes_forwards_filters_and_returns_pascal_case() -> Result<()> {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/"))
        .and(query_param("Action", "ListAgentKitRuntimes"))
        .and(body_json(json!({
            "Filters": [{ "Name": "Status", "Values": ["Ready"] }],
            "MaxResults": 20,
        })))
        .respond_with(ok(json!({
            "AgentKitRuntimes": [{ "RuntimeId": "r-1", "Name": "demo", "Status": "Ready" }],
            "TotalCount": 1,
        })))
        .expect(1)
        .mount(&mock)
        .await;

    let (client, server_task) = connect(runtime_server(&mock)).await?;
    let result = call(
        &client,
        "list_runtimes",
        json!({ "filters": "[{\"Name\":\"Status\",\"Values\":[\"Ready\"]}]" }),
    )
    .await;
    let _ = client.cancel().await;
    let _ = server_task.await;

    let payload = result?
        .structured_content
        .expect("structured_content should exist");
    assert_eq!(payload["TotalCount"], 1);
    assert_eq!(payload["AgentKitRuntimes"][0]["RuntimeId"], "r-1");
    assert_eq!(payload["AgentKitRuntimes"][0]["Status"], "Ready");
    Ok(())
}

#[tokio::test]
async fn create_runtime_accepts_encoded_and_native_structures() -> Result<()> {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(query_param("Action", "CreateAgentKitRuntime"))
        .and(body_json(json!({
            "Name": "demo",
            "ArtifactType": "image",
            "ArtifactUrl": "cr.example.com/agents/demo:1",
            "RoleName": "AgentKitRuntimeRole",
            "AuthorizerConfiguration": {
                "KeyAuth": {
                    "ApiKeyName": "x-api-key",
                    "ApiKey": "secret",
                    "ApiKeyLocation": "HEADER",
                },
            },
            "Envs": [{ "Key": "MODEL_NAME", "Value": "doubao" }],
        })))
        .respond_with(ok(json!({ "RuntimeId": "r-9" })))
        .expect(1)
        .mount(&mock)
        .await;

    let (client, server_task) = connect(runtime_server(&mock)).await?;
    let result = call(
        &client,
        "create_runtime",
        json!({
            "name": "demo",
            "artifact_type": "image",
            "artifact_url": "cr.example.com/agents/demo:1",
            "role_name": "AgentKitRuntimeRole",
            "authorizer_configuration": "{\"KeyAuth\":{\"ApiKeyName\":\"x-api-key\",\"ApiKey\":\"secret\",\"ApiKeyLocation\":\"HEADER\"}}",
            "envs": [{ "Key": "MODEL_NAME", "Value": "doubao" }],
        }),
    )
    .await;
    let _ = client.cancel().await;
    let _ = server_task.await;

    let payload = result?
        .structured_content
        .expect("structured_content should exist");
    assert_eq!(payload, json!({ "RuntimeId": "r-9" }));
    Ok(())
}

#[tokio::test]
async fn malformed_arguments_never_reach_the_api() -> Result<()> {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ok(json!({})))
        .expect(0)
        .mount(&mock)
        .await;

    let (client, server_task) = connect(runtime_server(&mock)).await?;
    let cases = [
        ("list_runtimes", json!({ "filters": "[{\"Name\":" }), "filters"),
        ("list_runtimes", json!({ "max_results": 500 }), "max_results"),
        (
            "update_runtime",
            json!({ "runtime_id": "r-1", "tags": "not json" }),
            "tags",
        ),
        (
            "create_runtime",
            json!({
                "name": "1demo",
                "artifact_type": "image",
                "artifact_url": "cr.example.com/agents/demo:1",
                "role_name": "role",
                "authorizer_configuration": {},
            }),
            "name",
        ),
    ];
    for (tool, arguments, parameter) in cases {
        let error = expect_mcp_error(call(&client, tool, arguments).await);
        assert_eq!(error.code, ErrorCode::INVALID_PARAMS, "{tool}");
        let data = error_data(&error);
        assert_eq!(data["code"], "parameter_format_error", "{tool}");
        assert_eq!(data["details"]["parameter"], parameter, "{tool}");
    }
    let _ = client.cancel().await;
    let _ = server_task.await;
    Ok(())
}

#[tokio::test]
async fn release_with_version_rolls_back() -> Result<()> {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(query_param("Action", "ReleaseAgentKitRuntime"))
        .and(body_json(json!({ "RuntimeId": "r-1", "VersionNumber": 2 })))
        .respond_with(ok(json!({ "RuntimeId": "r-1" })))
        .expect(1)
        .mount(&mock)
        .await;

    let (client, server_task) = connect(runtime_server(&mock)).await?;
    let result = call(
        &client,
        "release_runtime",
        json!({ "runtime_id": "r-1", "version_number": 2 }),
    )
    .await;
    let _ = client.cancel().await;
    let _ = server_task.await;

    let payload = result?
        .structured_content
        .expect("structured_content should exist");
    assert_eq!(payload["RuntimeId"], "r-1");
    let confirmation = payload["Confirmation"].as_str().unwrap_or_default();
    assert!(
        confirmation.contains("Rolled back runtime r-1 to version 2"),
        "{confirmation}"
    );
    Ok(())
}

#[tokio::test]
async fn upstream_errors_keep_their_code() -> Result<()> {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(query_param("Action", "DeleteAgentKitRuntime"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "ResponseMetadata": {
                "RequestId": "req-404",
                "Error": { "Code": "ResourceNotFound", "Message": "runtime r-x not found" },
            },
        })))
        .expect(1)
        .mount(&mock)
        .await;

    let (client, server_task) = connect(runtime_server(&mock)).await?;
    let error = expect_mcp_error(call(&client, "delete_runtime", json!({ "runtime_id": "r-x" })).await);
    let _ = client.cancel().await;
    let _ = server_task.await;

    assert_eq!(error.code, ErrorCode::INTERNAL_ERROR);
    let data = error_data(&error);
    assert_eq!(data["code"], "upstream_error");
    assert_eq!(data["origin"], "upstream");
    assert_eq!(data["retryable"], false);
    assert_eq!(data["action"], "DeleteAgentKitRuntime");
    assert_eq!(data["details"]["code"], "ResourceNotFound");
    assert_eq!(data["details"]["request_id"], "req-404");
    Ok(())
}

#[tokio::test]
async fn get_and_update_runtime_send_only_what_was_given() -> Result<()> {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(query_param("Action", "GetAgentKitRuntime"))
        .and(body_json(json!({ "RuntimeId": "r-1" })))
        .respond_with(ok(json!({
            "RuntimeId": "r-1",
            "Status": "Ready",
            "CurrentVersionNumber": 3,
        })))
        .expect(1)
        .mount(&mock)
        .await;
    Mock::given(method("POST"))
        .and(query_param("Action", "UpdateAgentKitRuntime"))
        .and(body_json(json!({
            "RuntimeId": "r-1",
            "Description": "nightly build",
            "Tags": [{ "Key": "team", "Value": "agents" }],
            "ReleaseEnable": true,
        })))
        .respond_with(ok(json!({ "RuntimeId": "r-1", "VersionNumber": 4 })))
        .expect(1)
        .mount(&mock)
        .await;

    let (client, server_task) = connect(runtime_server(&mock)).await?;
    let fetched = call(&client, "get_runtime", json!({ "runtime_id": "r-1" })).await;
    let updated = call(
        &client,
        "update_runtime",
        json!({
            "runtime_id": "r-1",
            "description": "nightly build",
            "tags": "[{\"Key\":\"team\",\"Value\":\"agents\"}]",
            "release_enable": true,
        }),
    )
    .await;
    let _ = client.cancel().await;
    let _ = server_task.await;

    let fetched = fetched?
        .structured_content
        .expect("structured_content should exist");
    assert_eq!(fetched["Status"], "Ready");
    assert_eq!(fetched["CurrentVersionNumber"], 3);
    let updated = updated?
        .structured_content
        .expect("structured_content should exist");
    assert_eq!(updated, json!({ "RuntimeId": "r-1", "VersionNumber": 4 }));
    Ok(())
}

#[tokio::test]
async fn runtime_version_lookups_use_their_own_actions() -> Result<()> {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(query_param("Action", "GetAgentKitRuntimeVersion"))
        .and(body_json(json!({ "RuntimeId": "r-1" })))
        .respond_with(ok(json!({ "RuntimeId": "r-1", "VersionNumber": 3 })))
        .expect(1)
        .mount(&mock)
        .await;
    Mock::given(method("POST"))
        .and(query_param("Action", "GetAgentKitRuntimeVersion"))
        .and(body_json(json!({ "RuntimeId": "r-1", "VersionNumber": 2 })))
        .respond_with(ok(json!({ "RuntimeId": "r-1", "VersionNumber": 2 })))
        .expect(1)
        .mount(&mock)
        .await;

    let (client, server_task) = connect(runtime_server(&mock)).await?;
    let current = call(&client, "get_runtime_version", json!({ "runtime_id": "r-1" })).await;
    let pinned = call(
        &client,
        "get_runtime_version",
        json!({ "runtime_id": "r-1", "version_number": 2 }),
    )
    .await;
    let _ = client.cancel().await;
    let _ = server_task.await;

    let current = current?
        .structured_content
        .expect("structured_content should exist");
    assert_eq!(current["VersionNumber"], 3);
    let pinned = pinned?
        .structured_content
        .expect("structured_content should exist");
    assert_eq!(pinned["VersionNumber"], 2);
    Ok(())
}

#[tokio::test]
async fn list_runtime_versions_defaults_page_size_and_forwards_token() -> Result<()> {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(query_param("Action", "ListAgentKitRuntimeVersions"))
        .and(body_json(json!({ "RuntimeId": "r-1", "MaxResults": 20 })))
        .respond_with(ok(json!({
            "AgentKitRuntimeVersions": [{ "VersionNumber": 2 }, { "VersionNumber": 1 }],
            "NextToken": "page-2",
        })))
        .expect(1)
        .mount(&mock)
        .await;
    Mock::given(method("POST"))
        .and(query_param("Action", "ListAgentKitRuntimeVersions"))
        .and(body_json(json!({
            "RuntimeId": "r-1",
            "NextToken": "page-2",
            "MaxResults": 5,
        })))
        .respond_with(ok(json!({ "AgentKitRuntimeVersions": [] })))
        .expect(1)
        .mount(&mock)
        .await;

    let (client, server_task) = connect(runtime_server(&mock)).await?;
    let first = call(&client, "list_runtime_versions", json!({ "runtime_id": "r-1" })).await;
    let second = call(
        &client,
        "list_runtime_versions",
        json!({ "runtime_id": "r-1", "next_token": "page-2", "max_results": 5 }),
    )
    .await;
    let _ = client.cancel().await;
    let _ = server_task.await;

    let first = first?
        .structured_content
        .expect("structured_content should exist");
    assert_eq!(first["NextToken"], "page-2");
    assert_eq!(first["AgentKitRuntimeVersions"][0]["VersionNumber"], 2);
    let second = second?
        .structured_content
        .expect("structured_content should exist");
    assert_eq!(second["AgentKitRuntimeVersions"], json!([]));
    Ok(())
}

#[tokio::test]
async fn release_without_version_publishes_latest() -> Result<()> {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(query_param("Action", "ReleaseAgentKitRuntime"))
        .and(body_json(json!({ "RuntimeId": "r-1" })))
        .respond_with(ok(json!({ "RuntimeId": "r-1" })))
        .expect(1)
        .mount(&mock)
        .await;

    let (client, server_task) = connect(runtime_server(&mock)).await?;
    let result = call(&client, "release_runtime", json!({ "runtime_id": "r-1" })).await;
    let _ = client.cancel().await;
    let _ = server_task.await;

    let payload = result?
        .structured_content
        .expect("structured_content should exist");
    let confirmation = payload["Confirmation"].as_str().unwrap_or_default();
    assert!(
        confirmation.contains("Released the latest version of runtime r-1"),
        "{confirmation}"
    );
    Ok(())
}
