use std::{
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use tokio::time;
use tracing::{info, warn};

use crate::{
    lib::{
        agentkit_cli::{
            build_agentkit_command, collect_log_excerpt, AgentkitCommandConfig, AgentkitSubcommand,
        },
        errors::{CredentialError, ToolkitError},
    },
    server::config::{Credentials, ToolkitSection},
};

pub const LOG_EXCERPT_LIMIT: usize = 5_000;

/// Output of a successful toolkit run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub exit_code: Option<i32>,
    pub log_excerpt: String,
    pub duration_ms: u64,
}

/// Spawns `agentkit` subcommands with the configured binary and time limit.
#[derive(Clone)]
pub struct ToolkitRunner {
    cli_path: PathBuf,
    run_timeout: Duration,
    /// Unified `VOLC_*` variables layered onto every child.
    env: Vec<(&'static str, String)>,
}

impl ToolkitRunner {
    /// Runner whose children receive the credentials in the process environment.
    pub fn new(section: &ToolkitSection) -> Self {
        Self::with_credentials(section, Credentials::from_env())
    }

    /// Credentials are resolved once here. When they are missing the CLI
    /// still runs, relying on whatever the inherited environment provides.
    pub fn with_credentials(
        section: &ToolkitSection,
        credentials: Result<Credentials, CredentialError>,
    ) -> Self {
        let env = match credentials {
            Ok(credentials) => credentials.toolkit_env(),
            Err(err) => {
                warn!(
                    target: "agentkit_mcp::toolkit",
                    reason = %err,
                    "agentkit commands will run without injected credentials"
                );
                Vec::new()
            }
        };
        Self {
            cli_path: section.cli_path.clone(),
            run_timeout: section.run_timeout(),
            env,
        }
    }

    /// Override the run time limit.
    pub fn with_timeout(mut self, run_timeout: Duration) -> Self {
        self.run_timeout = run_timeout;
        self
    }

    /// Run `agentkit <subcommand> <args>` in `working_dir` and wait for it.
    ///
    /// A non-zero exit is reported as [`ToolkitError::CommandFailed`] carrying
    /// the log excerpt. On timeout the child is killed.
    pub async fn run(
        &self,
        subcommand: AgentkitSubcommand,
        working_dir: &Path,
        args: &[String],
    ) -> Result<RunOutcome, ToolkitError> {
        let mut command = build_agentkit_command(
            AgentkitCommandConfig {
                cli_path: &self.cli_path,
                working_dir,
                env: &self.env,
            },
            subcommand,
            args,
        );

        info!(
            target: "agentkit_mcp::toolkit",
            subcommand = subcommand.as_str(),
            working_dir = %working_dir.display(),
            args = ?args,
            "Starting agentkit command"
        );

        let start = Instant::now();
        let output = time::timeout(self.run_timeout, command.output())
            .await
            .map_err(|_| ToolkitError::Timeout {
                subcommand: subcommand.as_str(),
                duration_secs: self.run_timeout.as_secs(),
            })?
            .map_err(|source| ToolkitError::Spawn {
                program: self.cli_path.display().to_string(),
                source,
            })?;

        let log_excerpt = collect_log_excerpt(&output.stdout, &output.stderr, LOG_EXCERPT_LIMIT);
        let exit_code = output.status.code();
        if !output.status.success() {
            return Err(ToolkitError::CommandFailed {
                subcommand: subcommand.as_str(),
                exit_code,
                log_excerpt,
            });
        }

        Ok(RunOutcome {
            exit_code,
            log_excerpt,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }
}
