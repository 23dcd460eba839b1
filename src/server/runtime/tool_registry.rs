use std::sync::Arc;

use rmcp::{
    handler::server::{wrapper::Parameters, ServerHandler},
    model::{CallToolResult, ErrorData, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};

use crate::{
    client::ClientAccessor,
    server::config::ServerConfig,
    tools::{
        self,
        runtime::{
            self, CreateRuntimeParams, ListRuntimeVersionsParams, ListRuntimesParams,
            ReleaseRuntimeParams, RuntimeIdParams, RuntimeVersionParams, UpdateRuntimeParams,
        },
        toolkit::{
            BuildImageParams, ConfigFileParams, DestroyRuntimeParams, EditConfigParams,
            InitProjectParams, InvokeAgentParams, ToolkitResult, ToolkitService,
        },
        ServerToolRouter,
    },
};

/// MCP server exposing AgentKit Runtime and toolkit tools.
///
/// Clones share the client accessor and the toolkit queue, so every
/// streamable HTTP session reuses the same client.
#[derive(Clone)]
pub struct AgentKitServer {
    config: Arc<ServerConfig>,
    instructions: Arc<String>,
    tool_router: ServerToolRouter<Self>,
    accessor: Arc<ClientAccessor>,
    toolkit: ToolkitService,
}

impl AgentKitServer {
    pub fn new(config: ServerConfig, instructions: String) -> Self {
        let accessor = ClientAccessor::from_env(config.agentkit.clone());
        Self::with_accessor(config, instructions, accessor)
    }

    /// Build a server around an existing accessor.
    pub fn with_accessor(
        config: ServerConfig,
        instructions: String,
        accessor: ClientAccessor,
    ) -> Self {
        let toolkit = ToolkitService::new(&config.toolkit);
        Self::with_parts(config, instructions, accessor, toolkit)
    }

    pub fn with_parts(
        config: ServerConfig,
        instructions: String,
        accessor: ClientAccessor,
        toolkit: ToolkitService,
    ) -> Self {
        let router = tools::build_router(|| Self::runtime_router() + Self::toolkit_router());
        Self {
            config: Arc::new(config),
            instructions: Arc::new(instructions),
            tool_router: router,
            accessor: Arc::new(accessor),
            toolkit,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn tool_count(&self) -> usize {
        self.tool_router.list_all().len()
    }
}

#[tool_router(router = runtime_router)]
impl AgentKitServer {
    #[tool(
        name = "create_runtime",
        description = "Create an AgentKit Runtime from a container image or TOS code package. Structured arguments (AuthorizerConfiguration, Envs, Tags) accept JSON or a JSON-encoded string; results use PascalCase."
    )]
    async fn create_runtime(
        &self,
        Parameters(params): Parameters<CreateRuntimeParams>,
    ) -> Result<CallToolResult, ErrorData> {
        runtime::create_runtime(&self.accessor, params).await
    }

    #[tool(
        name = "list_runtimes",
        description = "List AgentKit Runtimes with optional filters, time windows and pagination (MaxResults defaults to 20, at most 100)."
    )]
    async fn list_runtimes(
        &self,
        Parameters(params): Parameters<ListRuntimesParams>,
    ) -> Result<CallToolResult, ErrorData> {
        runtime::list_runtimes(&self.accessor, params).await
    }

    #[tool(
        name = "get_runtime",
        description = "Get the details of one AgentKit Runtime, including status and endpoint."
    )]
    async fn get_runtime(
        &self,
        Parameters(params): Parameters<RuntimeIdParams>,
    ) -> Result<CallToolResult, ErrorData> {
        runtime::get_runtime(&self.accessor, params).await
    }

    #[tool(
        name = "update_runtime",
        description = "Update an AgentKit Runtime's artifact, role, authorizer, envs, tags or description. Creates a new version; set ReleaseEnable to publish it."
    )]
    async fn update_runtime(
        &self,
        Parameters(params): Parameters<UpdateRuntimeParams>,
    ) -> Result<CallToolResult, ErrorData> {
        runtime::update_runtime(&self.accessor, params).await
    }

    #[tool(
        name = "delete_runtime",
        description = "WARNING: irreversible. Permanently delete an AgentKit Runtime and its endpoint. Confirm with the user before calling."
    )]
    async fn delete_runtime(
        &self,
        Parameters(params): Parameters<RuntimeIdParams>,
    ) -> Result<CallToolResult, ErrorData> {
        runtime::delete_runtime(&self.accessor, params).await
    }

    #[tool(
        name = "release_runtime",
        description = "WARNING: affects live traffic. Without version_number, release the latest version; with version_number, roll back to that version. Confirm with the user before calling."
    )]
    async fn release_runtime(
        &self,
        Parameters(params): Parameters<ReleaseRuntimeParams>,
    ) -> Result<CallToolResult, ErrorData> {
        runtime::release_runtime(&self.accessor, params).await
    }

    #[tool(
        name = "get_runtime_version",
        description = "Get one version of an AgentKit Runtime; the current version when version_number is omitted."
    )]
    async fn get_runtime_version(
        &self,
        Parameters(params): Parameters<RuntimeVersionParams>,
    ) -> Result<CallToolResult, ErrorData> {
        runtime::get_runtime_version(&self.accessor, params).await
    }

    #[tool(
        name = "list_runtime_versions",
        description = "List the versions of an AgentKit Runtime with pagination."
    )]
    async fn list_runtime_versions(
        &self,
        Parameters(params): Parameters<ListRuntimeVersionsParams>,
    ) -> Result<CallToolResult, ErrorData> {
        runtime::list_runtime_versions(&self.accessor, params).await
    }
}

#[tool_router(router = toolkit_router)]
impl AgentKitServer {
    #[tool(
        name = "toolkit_init_project",
        description = "Create a new agent project (<project_name>.py) from a template with `agentkit init`. Use an absolute directory."
    )]
    async fn toolkit_init_project(
        &self,
        Parameters(params): Parameters<InitProjectParams>,
    ) -> ToolkitResult {
        self.toolkit.init_project(params).await
    }

    #[tool(
        name = "toolkit_edit_config",
        description = "Create or update agentkit.yaml: entry point, workflow (local/cloud/hybrid), agent name, port, envs and cloud runtime/registry names."
    )]
    async fn toolkit_edit_config(
        &self,
        Parameters(params): Parameters<EditConfigParams>,
    ) -> ToolkitResult {
        self.toolkit.edit_config(params).await
    }

    #[tool(
        name = "toolkit_build_image",
        description = "Build the agent image with `agentkit build` in the config file's directory. Requires common.entry_point."
    )]
    async fn toolkit_build_image(
        &self,
        Parameters(params): Parameters<BuildImageParams>,
    ) -> ToolkitResult {
        self.toolkit.build_image(params).await
    }

    #[tool(
        name = "toolkit_deploy_agent",
        description = "Deploy the built image with `agentkit deploy`. Run toolkit_build_image first."
    )]
    async fn toolkit_deploy_agent(
        &self,
        Parameters(params): Parameters<ConfigFileParams>,
    ) -> ToolkitResult {
        self.toolkit.deploy_agent(params).await
    }

    #[tool(
        name = "toolkit_launch_agent",
        description = "Build and then deploy the agent. Reports which stage failed."
    )]
    async fn toolkit_launch_agent(
        &self,
        Parameters(params): Parameters<ConfigFileParams>,
    ) -> ToolkitResult {
        self.toolkit.launch_agent(params).await
    }

    #[tool(
        name = "toolkit_invoke_agent",
        description = "Send a JSON payload to a deployed cloud or hybrid agent with `agentkit invoke`."
    )]
    async fn toolkit_invoke_agent(
        &self,
        Parameters(params): Parameters<InvokeAgentParams>,
    ) -> ToolkitResult {
        self.toolkit.invoke_agent(params).await
    }

    #[tool(
        name = "toolkit_get_status",
        description = "Show the agent's current deployment status with `agentkit status`."
    )]
    async fn toolkit_get_status(
        &self,
        Parameters(params): Parameters<ConfigFileParams>,
    ) -> ToolkitResult {
        self.toolkit.get_status(params).await
    }

    #[tool(
        name = "toolkit_destroy_runtime",
        description = "WARNING: irreversible. Terminate the deployed agent with `agentkit destroy`. Runs only with force=true; confirm with the user first."
    )]
    async fn toolkit_destroy_runtime(
        &self,
        Parameters(params): Parameters<DestroyRuntimeParams>,
    ) -> ToolkitResult {
        self.toolkit.destroy_runtime(params).await
    }
}

#[tool_handler(router = self.tool_router)]
impl ServerHandler for AgentKitServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some((*self.instructions).clone()),
            ..ServerInfo::default()
        }
    }
}
