use rmcp::model::ErrorData;
use serde_json::json;

use crate::{
    client::RuntimeAction,
    lib::errors::{
        ClientError, CredentialError, ErrorOrigin, ParameterFormatError, ToolErrorDescriptor,
        UpstreamError,
    },
};

const PARAMETER_FORMAT_ERROR: ToolErrorDescriptor = ToolErrorDescriptor::new(
    "parameter_format_error",
    "A tool argument is malformed",
    "Fix the named parameter. Structured values may be passed as JSON or as a JSON-encoded string.",
);
const MISSING_CREDENTIAL_ERROR: ToolErrorDescriptor = ToolErrorDescriptor::new(
    "missing_credential",
    "AgentKit credentials are not configured",
    "Set VOLC_ACCESSKEY and VOLC_SECRETKEY (or their legacy names) in the server environment or .env, then restart the MCP server.",
);
const CLIENT_CONFIGURATION_ERROR: ToolErrorDescriptor = ToolErrorDescriptor::new(
    "client_configuration_error",
    "The AgentKit client could not be created",
    "Check VOLC_AGENTKIT_HOST and the [agentkit] section of config.toml.",
);
const UPSTREAM_ERROR: ToolErrorDescriptor = ToolErrorDescriptor::new(
    "upstream_error",
    "The AgentKit API rejected the request",
    "Review the upstream code and message in details; fix the request or retry later if the failure is transient.",
);

pub fn parameter_error_to_error_data(err: ParameterFormatError) -> ErrorData {
    PARAMETER_FORMAT_ERROR
        .builder()
        .message(err.to_string())
        .retryable(false)
        .origin(ErrorOrigin::Request)
        .details(json!({ "parameter": err.parameter, "reason": err.message }))
        .build()
        .expect("descriptor is valid")
}

pub fn credential_error_to_error_data(err: CredentialError) -> ErrorData {
    let CredentialError::Missing { field, variables } = &err;
    MISSING_CREDENTIAL_ERROR
        .builder()
        .message(err.to_string())
        .retryable(false)
        .origin(ErrorOrigin::Credentials)
        .details(json!({ "field": field, "variables": variables }))
        .build()
        .expect("descriptor is valid")
}

pub fn client_error_to_error_data(err: ClientError) -> ErrorData {
    match err {
        ClientError::Credentials(err) => credential_error_to_error_data(err),
        ClientError::Build { message } => CLIENT_CONFIGURATION_ERROR
            .builder()
            .message(format!("Failed to construct AgentKit client: {message}"))
            .retryable(false)
            .origin(ErrorOrigin::Credentials)
            .details(json!({ "reason": message }))
            .build()
            .expect("descriptor is valid"),
    }
}

pub fn upstream_error_to_error_data(err: UpstreamError, action: RuntimeAction) -> ErrorData {
    let retryable = err.is_transient() && !action.is_irreversible();
    let details = match &err {
        UpstreamError::Api {
            code,
            message,
            http_status,
            request_id,
        } => json!({
            "code": code,
            "message": message,
            "http_status": http_status,
            "request_id": request_id,
        }),
        UpstreamError::Transport { message } | UpstreamError::Decode { message } => {
            json!({ "message": message })
        }
    };
    UPSTREAM_ERROR
        .builder()
        .message(err.to_string())
        .retryable(retryable)
        .origin(ErrorOrigin::Upstream)
        .details(details)
        .with_context_field("action", json!(action.as_str()))
        .build()
        .expect("descriptor is valid")
}
