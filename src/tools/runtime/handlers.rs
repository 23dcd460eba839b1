use std::time::Instant;

use rmcp::model::{CallToolResult, ErrorData};
use serde_json::{Map, Value};
use tracing::info;

use crate::{
    client::{ClientAccessor, RuntimeAction},
    lib::convention,
};

use super::{
    errors::{client_error_to_error_data, parameter_error_to_error_data, upstream_error_to_error_data},
    CreateRuntimeParams, ListRuntimeVersionsParams, ListRuntimesParams, ReleaseMode,
    ReleaseRuntimeParams, RuntimeIdParams, RuntimeVersionParams, UpdateRuntimeParams,
};

pub const CONFIRMATION_FIELD: &str = "Confirmation";

/// Forward a validated snake_case request and return the PascalCase result.
///
/// The client is only requested here, after argument validation, so a bad
/// argument never triggers client construction.
pub async fn forward(
    accessor: &ClientAccessor,
    action: RuntimeAction,
    request: Value,
) -> Result<Value, ErrorData> {
    let client = accessor
        .get_client()
        .await
        .map_err(client_error_to_error_data)?;

    let started = Instant::now();
    let result = client
        .call(action, request)
        .await
        .map_err(|err| upstream_error_to_error_data(err, action))?;
    info!(
        target: "agentkit_mcp::runtime",
        action = action.as_str(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Runtime tool call completed"
    );
    Ok(convention::to_pascal(&result))
}

pub async fn create_runtime(
    accessor: &ClientAccessor,
    params: CreateRuntimeParams,
) -> Result<CallToolResult, ErrorData> {
    let request = params.into_request().map_err(parameter_error_to_error_data)?;
    let result = forward(accessor, RuntimeAction::CreateRuntime, request).await?;
    Ok(CallToolResult::structured(result))
}

pub async fn list_runtimes(
    accessor: &ClientAccessor,
    params: ListRuntimesParams,
) -> Result<CallToolResult, ErrorData> {
    let request = params.into_request().map_err(parameter_error_to_error_data)?;
    let result = forward(accessor, RuntimeAction::ListRuntimes, request).await?;
    Ok(CallToolResult::structured(result))
}

pub async fn get_runtime(
    accessor: &ClientAccessor,
    params: RuntimeIdParams,
) -> Result<CallToolResult, ErrorData> {
    let request = params.into_request().map_err(parameter_error_to_error_data)?;
    let result = forward(accessor, RuntimeAction::GetRuntime, request).await?;
    Ok(CallToolResult::structured(result))
}

pub async fn update_runtime(
    accessor: &ClientAccessor,
    params: UpdateRuntimeParams,
) -> Result<CallToolResult, ErrorData> {
    let request = params.into_request().map_err(parameter_error_to_error_data)?;
    let result = forward(accessor, RuntimeAction::UpdateRuntime, request).await?;
    Ok(CallToolResult::structured(result))
}

pub async fn delete_runtime(
    accessor: &ClientAccessor,
    params: RuntimeIdParams,
) -> Result<CallToolResult, ErrorData> {
    let runtime_id = params.runtime_id.clone();
    let request = params.into_request().map_err(parameter_error_to_error_data)?;
    let result = forward(accessor, RuntimeAction::DeleteRuntime, request).await?;
    let confirmation = format!(
        "Runtime {runtime_id} was deleted. This cannot be undone; its endpoint and configuration are gone."
    );
    Ok(CallToolResult::structured(with_confirmation(
        result,
        confirmation,
    )))
}

pub async fn release_runtime(
    accessor: &ClientAccessor,
    params: ReleaseRuntimeParams,
) -> Result<CallToolResult, ErrorData> {
    let runtime_id = params.runtime_id.clone();
    let (mode, request) = params.into_request().map_err(parameter_error_to_error_data)?;
    info!(
        target: "agentkit_mcp::runtime",
        runtime_id = %runtime_id,
        mode = ?mode,
        "Releasing runtime"
    );
    let result = forward(accessor, RuntimeAction::ReleaseRuntime, request).await?;
    Ok(CallToolResult::structured(with_confirmation(
        result,
        release_confirmation(&runtime_id, mode),
    )))
}

pub async fn get_runtime_version(
    accessor: &ClientAccessor,
    params: RuntimeVersionParams,
) -> Result<CallToolResult, ErrorData> {
    let request = params.into_request().map_err(parameter_error_to_error_data)?;
    let result = forward(accessor, RuntimeAction::GetRuntimeVersion, request).await?;
    Ok(CallToolResult::structured(result))
}

pub async fn list_runtime_versions(
    accessor: &ClientAccessor,
    params: ListRuntimeVersionsParams,
) -> Result<CallToolResult, ErrorData> {
    let request = params.into_request().map_err(parameter_error_to_error_data)?;
    let result = forward(accessor, RuntimeAction::ListRuntimeVersions, request).await?;
    Ok(CallToolResult::structured(result))
}

pub fn release_confirmation(runtime_id: &str, mode: ReleaseMode) -> String {
    match mode {
        ReleaseMode::Latest => format!(
            "Released the latest version of runtime {runtime_id}. Live traffic now uses that version."
        ),
        ReleaseMode::Rollback { version } => format!(
            "Rolled back runtime {runtime_id} to version {version}. Live traffic now uses that version."
        ),
    }
}

fn with_confirmation(result: Value, confirmation: String) -> Value {
    let mut object = match result {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert("Result".into(), other);
            map
        }
    };
    object.insert(CONFIRMATION_FIELD.into(), Value::String(confirmation));
    Value::Object(object)
}
