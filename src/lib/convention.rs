//! Bidirectional PascalCase/snake_case key conversion for AgentKit payloads.
//!
//! Tool callers and the AgentKit wire format speak PascalCase; the SDK-facing
//! request and response structures are snake_case. Only object keys listed in
//! [`FIELD_TABLE`] are renamed. Unknown keys pass through verbatim and values
//! are never rewritten.

use std::{collections::HashMap, sync::LazyLock};

use serde_json::{Map, Value};

/// `(PascalCase, snake_case)` pairs. Both columns must stay unique.
pub const FIELD_TABLE: &[(&str, &str)] = &[
    // Runtime request fields
    ("Name", "name"),
    ("ArtifactType", "artifact_type"),
    ("ArtifactUrl", "artifact_url"),
    ("RoleName", "role_name"),
    ("AuthorizerConfiguration", "authorizer_configuration"),
    ("Description", "description"),
    ("Envs", "envs"),
    ("Tags", "tags"),
    ("ApmplusEnable", "apmplus_enable"),
    ("Command", "command"),
    ("ProjectName", "project_name"),
    ("ClientToken", "client_token"),
    ("RuntimeId", "runtime_id"),
    ("ReleaseEnable", "release_enable"),
    ("VersionNumber", "version_number"),
    // Listing and pagination
    ("Filters", "filters"),
    ("Values", "values"),
    ("Operator", "operator"),
    ("Type", "type"),
    ("CreateTimeBefore", "create_time_before"),
    ("CreateTimeAfter", "create_time_after"),
    ("UpdateTimeBefore", "update_time_before"),
    ("UpdateTimeAfter", "update_time_after"),
    ("NextToken", "next_token"),
    ("MaxResults", "max_results"),
    ("TotalCount", "total_count"),
    // Authorizer configuration
    ("KeyAuth", "key_auth"),
    ("ApiKey", "api_key"),
    ("ApiKeyName", "api_key_name"),
    ("ApiKeyLocation", "api_key_location"),
    ("CustomJwtAuthorizer", "custom_jwt_authorizer"),
    ("AllowedClients", "allowed_clients"),
    ("DiscoveryUrl", "discovery_url"),
    // Key/value pairs (envs, tags)
    ("Key", "key"),
    ("Value", "value"),
    // Runtime and version descriptions
    ("AgentKitRuntimes", "agent_kit_runtimes"),
    ("AgentKitRuntimeVersions", "agent_kit_runtime_versions"),
    ("Status", "status"),
    ("StatusMessage", "status_message"),
    ("Endpoint", "endpoint"),
    ("CurrentVersionNumber", "current_version_number"),
    ("LatestVersionNumber", "latest_version_number"),
    ("CreateTime", "create_time"),
    ("UpdateTime", "update_time"),
    ("AccountId", "account_id"),
    // Response envelope
    ("ResponseMetadata", "response_metadata"),
    ("RequestId", "request_id"),
    ("Action", "action"),
    ("Version", "version"),
    ("Service", "service"),
    ("Region", "region"),
    ("Error", "error"),
    ("Code", "code"),
    ("Message", "message"),
];

static PASCAL_TO_SNAKE: LazyLock<HashMap<&'static str, &'static str>> =
    LazyLock::new(|| FIELD_TABLE.iter().copied().collect());

static SNAKE_TO_PASCAL: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    FIELD_TABLE
        .iter()
        .map(|(pascal, snake)| (*snake, *pascal))
        .collect()
});

/// Rename known PascalCase keys to snake_case, recursively.
pub fn to_snake(value: &Value) -> Value {
    rename_keys(value, &PASCAL_TO_SNAKE)
}

/// Rename known snake_case keys to PascalCase, recursively.
pub fn to_pascal(value: &Value) -> Value {
    rename_keys(value, &SNAKE_TO_PASCAL)
}

fn rename_keys(value: &Value, table: &HashMap<&'static str, &'static str>) -> Value {
    match value {
        Value::Object(map) => {
            let renamed = map
                .iter()
                .map(|(key, inner)| {
                    let key = table
                        .get(key.as_str())
                        .map(|mapped| (*mapped).to_string())
                        .unwrap_or_else(|| key.clone());
                    (key, rename_keys(inner, table))
                })
                .collect::<Map<String, Value>>();
            Value::Object(renamed)
        }
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| rename_keys(item, table))
                .collect(),
        ),
        other => other.clone(),
    }
}
