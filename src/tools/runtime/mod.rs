//! AgentKit Runtime lifecycle tools.
//!
//! Each tool validates its arguments, converts structured values to
//! snake_case, forwards the call through the shared client and returns the
//! result in PascalCase.
pub mod errors;
pub mod handlers;
pub mod params;

pub use errors::{
    client_error_to_error_data, credential_error_to_error_data, parameter_error_to_error_data,
    upstream_error_to_error_data,
};
pub use handlers::{
    create_runtime, delete_runtime, forward, get_runtime, get_runtime_version, list_runtime_versions,
    list_runtimes, release_confirmation, release_runtime, update_runtime, CONFIRMATION_FIELD,
};
pub use params::{
    ApiKeyLocation, AuthorizerConfiguration, CreateRuntimeParams, CustomJwtAuthorizer, Filter,
    JsonArg, KeyAuth, KeyValue, ListRuntimeVersionsParams, ListRuntimesParams, ReleaseMode,
    ReleaseRuntimeParams, RuntimeIdParams, RuntimeVersionParams, UpdateRuntimeParams,
    DEFAULT_MAX_RESULTS,
};

/// Tool names, in registration order.
pub const RUNTIME_TOOL_IDS: [&str; 8] = [
    "create_runtime",
    "list_runtimes",
    "get_runtime",
    "update_runtime",
    "delete_runtime",
    "release_runtime",
    "get_runtime_version",
    "list_runtime_versions",
];
