//! AgentKit OpenAPI client: request signing, the HTTP transport, and the
//! process-wide accessor that hands out one shared client.

pub mod accessor;
pub mod http;
pub mod signer;

use async_trait::async_trait;
use serde_json::Value;

use crate::lib::errors::UpstreamError;

pub use accessor::ClientAccessor;
pub use http::AgentKitClient;

/// Runtime lifecycle actions exposed by the AgentKit OpenAPI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeAction {
    CreateRuntime,
    ListRuntimes,
    GetRuntime,
    UpdateRuntime,
    DeleteRuntime,
    ReleaseRuntime,
    GetRuntimeVersion,
    ListRuntimeVersions,
}

impl RuntimeAction {
    /// Wire name passed as the `Action` query parameter.
    pub const fn as_str(&self) -> &'static str {
        match self {
            RuntimeAction::CreateRuntime => "CreateAgentKitRuntime",
            RuntimeAction::ListRuntimes => "ListAgentKitRuntimes",
            RuntimeAction::GetRuntime => "GetAgentKitRuntime",
            RuntimeAction::UpdateRuntime => "UpdateAgentKitRuntime",
            RuntimeAction::DeleteRuntime => "DeleteAgentKitRuntime",
            RuntimeAction::ReleaseRuntime => "ReleaseAgentKitRuntime",
            RuntimeAction::GetRuntimeVersion => "GetAgentKitRuntimeVersion",
            RuntimeAction::ListRuntimeVersions => "ListAgentKitRuntimeVersions",
        }
    }

    /// Delete and release cannot be undone and are never retried.
    pub const fn is_irreversible(&self) -> bool {
        matches!(
            self,
            RuntimeAction::DeleteRuntime | RuntimeAction::ReleaseRuntime
        )
    }
}

/// SDK-facing surface of the runtime API. Requests and results are snake_case.
#[async_trait]
pub trait RuntimeApi: Send + Sync {
    async fn call(&self, action: RuntimeAction, request: Value) -> Result<Value, UpstreamError>;
}
