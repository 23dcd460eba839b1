use std::{
    fs,
    path::{self, Path, PathBuf},
};

use rmcp::{model::ErrorData, Json};
use tracing::info;

use crate::{
    lib::{
        agentkit_cli::{collect_log_excerpt, AgentkitSubcommand},
        errors::ToolkitError,
        telemetry::ToolkitRunSpan,
    },
    server::config::ToolkitSection,
};

use super::{
    errors::{deploy_hints, toolkit_error_to_error_data, FailureContext},
    executor::{RunOutcome, ToolkitRunner, LOG_EXCERPT_LIMIT},
    project::ProjectConfig,
    queue::ToolkitJobQueue,
    request::{
        BuildImageParams, ConfigFileParams, DestroyRuntimeParams, EditConfigParams,
        InitProjectParams, InvokeAgentParams, ToolkitResponse,
    },
};

pub const INIT_PROJECT: &str = "toolkit_init_project";
pub const EDIT_CONFIG: &str = "toolkit_edit_config";
pub const BUILD_IMAGE: &str = "toolkit_build_image";
pub const DEPLOY_AGENT: &str = "toolkit_deploy_agent";
pub const LAUNCH_AGENT: &str = "toolkit_launch_agent";
pub const INVOKE_AGENT: &str = "toolkit_invoke_agent";
pub const GET_STATUS: &str = "toolkit_get_status";
pub const DESTROY_RUNTIME: &str = "toolkit_destroy_runtime";

pub type ToolkitResult = Result<Json<ToolkitResponse>, ErrorData>;

/// Toolkit tools sharing one runner and one project queue.
#[derive(Clone)]
pub struct ToolkitService {
    runner: ToolkitRunner,
    queue: ToolkitJobQueue,
    default_config_file: String,
}

impl ToolkitService {
    pub fn new(section: &ToolkitSection) -> Self {
        Self::with_runner(ToolkitRunner::new(section), section.default_config_file.clone())
    }

    pub fn with_runner(runner: ToolkitRunner, default_config_file: String) -> Self {
        Self {
            runner,
            queue: ToolkitJobQueue::new(),
            default_config_file,
        }
    }

    #[cfg(test)]
    fn queue(&self) -> &ToolkitJobQueue {
        &self.queue
    }

    pub async fn init_project(&self, params: InitProjectParams) -> ToolkitResult {
        let span = ToolkitRunSpan::start(INIT_PROJECT);
        let context = FailureContext::new(INIT_PROJECT).run(span.run_id());
        let result = self.try_init_project(&span, params).await;
        finish(span, result, &context)
    }

    async fn try_init_project(
        &self,
        span: &ToolkitRunSpan,
        params: InitProjectParams,
    ) -> Result<ToolkitResponse, ToolkitError> {
        let name = params.project_name()?;
        let template = params.template()?;
        let directory = match &params.directory {
            Some(directory) => absolute(directory)?,
            None => absolute(Path::new("."))?,
        };
        fs::create_dir_all(&directory).map_err(|source| ToolkitError::Io {
            path: directory.clone(),
            source,
        })?;

        let file_name = format!("{name}.py");
        let agent_file = directory.join(&file_name);
        if agent_file.exists() {
            return Err(ToolkitError::InvalidRequest {
                message: format!("File {file_name} already exists in {}", directory.display()),
            });
        }

        let args = [name.to_string(), "--template".to_string(), template.to_string()];
        let outcome = self
            .runner
            .run(AgentkitSubcommand::Init, &directory, &args)
            .await?;
        Ok(ToolkitResponse {
            message: format!("Successfully created {file_name}"),
            file_path: Some(agent_file.to_string_lossy().to_string()),
            ..completed(span, outcome)
        })
    }

    pub async fn edit_config(&self, params: EditConfigParams) -> ToolkitResult {
        let span = ToolkitRunSpan::start(EDIT_CONFIG);
        let context = FailureContext::new(EDIT_CONFIG).run(span.run_id());
        let result = self.try_edit_config(&span, params).await;
        finish(span, result, &context)
    }

    async fn try_edit_config(
        &self,
        span: &ToolkitRunSpan,
        params: EditConfigParams,
    ) -> Result<ToolkitResponse, ToolkitError> {
        let path = self.config_path(params.config_file.as_deref())?;
        let edit = params.into_edit()?;

        let _slot = self.queue.acquire(span.run_id(), EDIT_CONFIG).await;
        let (mut config, created) = ProjectConfig::load_or_new(&path, &edit)?;
        let updates = config.apply(&edit);
        if updates.is_empty() {
            return Err(ToolkitError::InvalidRequest {
                message: "No updates provided".into(),
            });
        }
        config.save()?;
        info!(
            target: "agentkit_mcp::toolkit",
            path = %path.display(),
            created,
            updates = updates.len(),
            "Updated project configuration"
        );

        Ok(ToolkitResponse {
            success: true,
            message: format!("Configuration updated: {}", updates.join(", ")),
            run_id: Some(span.run_id().to_string()),
            workflow: config.workflow().ok().map(|w| w.to_string()),
            file_path: Some(path.to_string_lossy().to_string()),
            config: Some(config.to_json()),
            updates,
            duration_ms: Some(span.elapsed_ms()),
            ..ToolkitResponse::default()
        })
    }

    pub async fn build_image(&self, params: BuildImageParams) -> ToolkitResult {
        let span = ToolkitRunSpan::start(BUILD_IMAGE);
        let mut context = FailureContext::new(BUILD_IMAGE)
            .run(span.run_id())
            .stage("build");
        let result = self.try_build_image(&span, params, &mut context).await;
        finish(span, result, &context)
    }

    async fn try_build_image(
        &self,
        span: &ToolkitRunSpan,
        params: BuildImageParams,
        context: &mut FailureContext,
    ) -> Result<ToolkitResponse, ToolkitError> {
        let config = self.load_deployable(params.config_file.as_deref())?;
        let workflow = config.workflow()?;
        context.workflow = Some(workflow);

        let mut args = config_file_args(&config);
        args.extend(params.cli_args());
        let _slot = self.queue.acquire(span.run_id(), BUILD_IMAGE).await;
        let outcome = self
            .runner
            .run(AgentkitSubcommand::Build, config.project_dir(), &args)
            .await?;
        Ok(ToolkitResponse {
            message: "Build completed successfully".into(),
            workflow: Some(workflow.to_string()),
            stage: Some("build".into()),
            file_path: Some(config.path().to_string_lossy().to_string()),
            ..completed(span, outcome)
        })
    }

    pub async fn deploy_agent(&self, params: ConfigFileParams) -> ToolkitResult {
        let span = ToolkitRunSpan::start(DEPLOY_AGENT);
        let mut context = FailureContext::new(DEPLOY_AGENT)
            .run(span.run_id())
            .stage("deploy");
        let result = self.try_deploy_agent(&span, params, &mut context).await;
        finish(span, result, &context)
    }

    async fn try_deploy_agent(
        &self,
        span: &ToolkitRunSpan,
        params: ConfigFileParams,
        context: &mut FailureContext,
    ) -> Result<ToolkitResponse, ToolkitError> {
        let config = self.load_deployable(params.config_file.as_deref())?;
        let workflow = config.workflow()?;
        context.workflow = Some(workflow);
        context.hints = deploy_hints(workflow);

        let args = config_file_args(&config);
        let _slot = self.queue.acquire(span.run_id(), DEPLOY_AGENT).await;
        let outcome = self
            .runner
            .run(AgentkitSubcommand::Deploy, config.project_dir(), &args)
            .await?;
        Ok(ToolkitResponse {
            message: "Deploy completed successfully".into(),
            workflow: Some(workflow.to_string()),
            stage: Some("deploy".into()),
            file_path: Some(config.path().to_string_lossy().to_string()),
            ..completed(span, outcome)
        })
    }

    pub async fn launch_agent(&self, params: ConfigFileParams) -> ToolkitResult {
        let span = ToolkitRunSpan::start(LAUNCH_AGENT);
        let mut context = FailureContext::new(LAUNCH_AGENT).run(span.run_id());
        let result = self.try_launch_agent(&span, params, &mut context).await;
        finish(span, result, &context)
    }

    /// Build, then deploy, holding the queue slot across both stages.
    async fn try_launch_agent(
        &self,
        span: &ToolkitRunSpan,
        params: ConfigFileParams,
        context: &mut FailureContext,
    ) -> Result<ToolkitResponse, ToolkitError> {
        let config = self.load_deployable(params.config_file.as_deref())?;
        let workflow = config.workflow()?;
        context.workflow = Some(workflow);

        let args = config_file_args(&config);
        let _slot = self.queue.acquire(span.run_id(), LAUNCH_AGENT).await;

        context.stage = Some("build");
        let build = self
            .runner
            .run(AgentkitSubcommand::Build, config.project_dir(), &args)
            .await?;

        context.stage = Some("deploy");
        context.hints = deploy_hints(workflow);
        let deploy = self
            .runner
            .run(AgentkitSubcommand::Deploy, config.project_dir(), &args)
            .await?;

        let log_excerpt = collect_log_excerpt(
            build.log_excerpt.as_bytes(),
            deploy.log_excerpt.as_bytes(),
            LOG_EXCERPT_LIMIT,
        );
        Ok(ToolkitResponse {
            message: "Launch completed successfully (build + deploy)".into(),
            workflow: Some(workflow.to_string()),
            stage: Some("deploy".into()),
            file_path: Some(config.path().to_string_lossy().to_string()),
            ..completed(
                span,
                RunOutcome {
                    exit_code: deploy.exit_code,
                    log_excerpt,
                    duration_ms: build.duration_ms + deploy.duration_ms,
                },
            )
        })
    }

    pub async fn invoke_agent(&self, params: InvokeAgentParams) -> ToolkitResult {
        let span = ToolkitRunSpan::start(INVOKE_AGENT);
        let mut context = FailureContext::new(INVOKE_AGENT).run(span.run_id());
        let result = self.try_invoke_agent(&span, params, &mut context).await;
        finish(span, result, &context)
    }

    async fn try_invoke_agent(
        &self,
        span: &ToolkitRunSpan,
        params: InvokeAgentParams,
        context: &mut FailureContext,
    ) -> Result<ToolkitResponse, ToolkitError> {
        let payload = params.payload_text()?;
        let config = ProjectConfig::load(&self.config_path(params.config_file.as_deref())?)?;
        let workflow = config.workflow()?;
        context.workflow = Some(workflow);
        if !workflow.supports_invoke() {
            return Err(ToolkitError::InvalidRequest {
                message: format!(
                    "Invoke is not supported for the {workflow} workflow; use cloud or hybrid"
                ),
            });
        }

        let mut args = config_file_args(&config);
        args.push("--payload".into());
        args.push(payload);
        if let Some(apikey) = params.apikey.as_deref().filter(|key| !key.is_empty()) {
            args.push("--apikey".into());
            args.push(apikey.to_string());
        }
        let outcome = self
            .runner
            .run(AgentkitSubcommand::Invoke, config.project_dir(), &args)
            .await?;
        Ok(ToolkitResponse {
            message: "Invoke completed successfully".into(),
            workflow: Some(workflow.to_string()),
            ..completed(span, outcome)
        })
    }

    pub async fn get_status(&self, params: ConfigFileParams) -> ToolkitResult {
        let span = ToolkitRunSpan::start(GET_STATUS);
        let mut context = FailureContext::new(GET_STATUS).run(span.run_id());
        let result = self.try_get_status(&span, params, &mut context).await;
        finish(span, result, &context)
    }

    async fn try_get_status(
        &self,
        span: &ToolkitRunSpan,
        params: ConfigFileParams,
        context: &mut FailureContext,
    ) -> Result<ToolkitResponse, ToolkitError> {
        let config = ProjectConfig::load(&self.config_path(params.config_file.as_deref())?)?;
        let workflow = config.workflow()?;
        context.workflow = Some(workflow);

        let outcome = self
            .runner
            .run(
                AgentkitSubcommand::Status,
                config.project_dir(),
                &config_file_args(&config),
            )
            .await?;
        Ok(ToolkitResponse {
            message: "Status retrieved".into(),
            workflow: Some(workflow.to_string()),
            ..completed(span, outcome)
        })
    }

    pub async fn destroy_runtime(&self, params: DestroyRuntimeParams) -> ToolkitResult {
        let span = ToolkitRunSpan::start(DESTROY_RUNTIME);
        let mut context = FailureContext::new(DESTROY_RUNTIME)
            .run(span.run_id())
            .irreversible();
        let result = self.try_destroy_runtime(&span, params, &mut context).await;
        finish(span, result, &context)
    }

    async fn try_destroy_runtime(
        &self,
        span: &ToolkitRunSpan,
        params: DestroyRuntimeParams,
        context: &mut FailureContext,
    ) -> Result<ToolkitResponse, ToolkitError> {
        if !params.force {
            return Err(ToolkitError::ConfirmationRequired {
                action: DESTROY_RUNTIME,
            });
        }
        let config = ProjectConfig::load(&self.config_path(params.config_file.as_deref())?)?;
        let workflow = config.workflow()?;
        context.workflow = Some(workflow);

        let mut args = config_file_args(&config);
        args.push("--force".into());
        let _slot = self.queue.acquire(span.run_id(), DESTROY_RUNTIME).await;
        let outcome = self
            .runner
            .run(AgentkitSubcommand::Destroy, config.project_dir(), &args)
            .await?;
        Ok(ToolkitResponse {
            message: format!(
                "Destroyed the {workflow} runtime. This cannot be undone; run toolkit_launch_agent to deploy again."
            ),
            workflow: Some(workflow.to_string()),
            ..completed(span, outcome)
        })
    }

    fn config_path(&self, config_file: Option<&str>) -> Result<PathBuf, ToolkitError> {
        let raw = config_file
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(self.default_config_file.as_str());
        absolute(Path::new(raw))
    }

    /// Build and deploy need an entry point and a known workflow.
    fn load_deployable(&self, config_file: Option<&str>) -> Result<ProjectConfig, ToolkitError> {
        let config = ProjectConfig::load(&self.config_path(config_file)?)?;
        config.require_entry_point()?;
        config.workflow()?;
        Ok(config)
    }
}

fn config_file_args(config: &ProjectConfig) -> Vec<String> {
    vec![
        "--config-file".to_string(),
        config.path().to_string_lossy().to_string(),
    ]
}

fn absolute(path: &Path) -> Result<PathBuf, ToolkitError> {
    path::absolute(path).map_err(|source| ToolkitError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn completed(span: &ToolkitRunSpan, outcome: RunOutcome) -> ToolkitResponse {
    ToolkitResponse {
        success: true,
        run_id: Some(span.run_id().to_string()),
        log_excerpt: Some(outcome.log_excerpt),
        exit_code: outcome.exit_code,
        duration_ms: Some(outcome.duration_ms),
        ..ToolkitResponse::default()
    }
}

fn finish(
    span: ToolkitRunSpan,
    result: Result<ToolkitResponse, ToolkitError>,
    context: &FailureContext,
) -> ToolkitResult {
    match result {
        Ok(response) => {
            span.finish("succeeded", response.exit_code);
            Ok(Json(response))
        }
        Err(err) => {
            let (status, exit_code) = match &err {
                ToolkitError::CommandFailed { exit_code, .. } => ("failed", *exit_code),
                ToolkitError::Timeout { .. } => ("timed_out", None),
                _ => ("rejected", None),
            };
            span.finish(status, exit_code);
            Err(toolkit_error_to_error_data(err, context))
        }
    }
}
