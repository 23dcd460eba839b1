use std::{io, path::PathBuf};

use config::ConfigError as ConfigLoaderError;
use rmcp::model::ErrorData;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors that can occur while loading or validating configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to build (read) the configuration file.
    #[error("Failed to read configuration file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: ConfigLoaderError,
    },
    /// Failed to deserialize TOML into a struct.
    #[error("Failed to parse configuration file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ConfigLoaderError,
    },
    /// Explicitly requested configuration file does not exist.
    #[error("Configuration file {path} does not exist")]
    NotFound { path: PathBuf },
    /// Field failed validation.
    #[error("Configuration file {path} has invalid `{field}`: {message}")]
    InvalidField {
        path: PathBuf,
        field: &'static str,
        message: String,
    },
}

impl ConfigError {
    /// Helper to wrap `config::ConfigError` as a read failure.
    pub fn from_read_error(path: PathBuf, source: ConfigLoaderError) -> Self {
        Self::FileRead { path, source }
    }

    /// Helper to wrap `config::ConfigError` as a parse failure.
    pub fn from_parse_error(path: PathBuf, source: ConfigLoaderError) -> Self {
        Self::Parse { path, source }
    }
}

/// Credential resolution failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CredentialError {
    /// A required field had no value in any of the checked variables.
    #[error("Missing credential `{field}`: set one of {}", variables.join(", "))]
    Missing {
        field: &'static str,
        variables: Vec<&'static str>,
    },
}

/// A string-encoded or structured tool argument could not be parsed.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Parameter `{parameter}` is malformed: {message}")]
pub struct ParameterFormatError {
    pub parameter: &'static str,
    pub message: String,
}

impl ParameterFormatError {
    pub fn new(parameter: &'static str, message: impl Into<String>) -> Self {
        Self {
            parameter,
            message: message.into(),
        }
    }
}

/// Failures reported by (or while reaching) the AgentKit OpenAPI.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The API answered with an error envelope or a non-success status.
    #[error("AgentKit API returned {code}: {message}")]
    Api {
        code: String,
        message: String,
        http_status: u16,
        request_id: Option<String>,
    },
    /// The request never produced a usable response.
    #[error("AgentKit API request failed: {message}")]
    Transport { message: String },
    /// The response body was not the expected envelope.
    #[error("AgentKit API response could not be decoded: {message}")]
    Decode { message: String },
}

impl UpstreamError {
    /// Throttling and server-side failures may succeed on a later attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            UpstreamError::Api {
                code, http_status, ..
            } => *http_status >= 500 || *http_status == 429 || code.contains("Throttl"),
            UpstreamError::Transport { .. } => true,
            UpstreamError::Decode { .. } => false,
        }
    }
}

/// Errors produced while obtaining the shared API client.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Credentials(#[from] CredentialError),
    #[error("Failed to construct AgentKit client: {message}")]
    Build { message: String },
}

/// Failures of the `agentkit` toolkit subprocess wrappers.
#[derive(Debug, Error)]
pub enum ToolkitError {
    #[error("Failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("agentkit {subcommand} exited abnormally (exit={exit_code:?})")]
    CommandFailed {
        subcommand: &'static str,
        exit_code: Option<i32>,
        log_excerpt: String,
    },
    #[error("agentkit {subcommand} timed out after {duration_secs} seconds")]
    Timeout {
        subcommand: &'static str,
        duration_secs: u64,
    },
    #[error("Project configuration {path} is unusable: {message}")]
    ProjectConfig { path: PathBuf, message: String },
    #[error("I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{action} is irreversible and requires explicit confirmation")]
    ConfirmationRequired { action: &'static str },
    #[error("{message}")]
    InvalidRequest { message: String },
    #[error(transparent)]
    Parameter(#[from] ParameterFormatError),
}

/// Structured error metadata returned by MCP tools.
#[derive(Debug, Clone, Serialize)]
pub struct ToolErrorDescriptor {
    /// Error code.
    pub code: &'static str,
    /// User-facing message.
    pub message: &'static str,
    /// Recommended remediation.
    pub remediation: &'static str,
}

impl ToolErrorDescriptor {
    /// Simple constructor.
    pub const fn new(code: &'static str, message: &'static str, remediation: &'static str) -> Self {
        Self {
            code,
            message,
            remediation,
        }
    }

    /// Create a builder.
    pub fn builder(&self) -> ToolErrorDescriptorBuilder<'_> {
        ToolErrorDescriptorBuilder::new(self)
    }
}

/// Where a tool failure originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorOrigin {
    Request,
    Credentials,
    Upstream,
    Toolkit,
}

impl ErrorOrigin {
    fn as_str(&self) -> &'static str {
        match self {
            ErrorOrigin::Request => "request",
            ErrorOrigin::Credentials => "credentials",
            ErrorOrigin::Upstream => "upstream",
            ErrorOrigin::Toolkit => "toolkit",
        }
    }
}

/// Builder for error data that fails if required fields are missing.
pub struct ToolErrorDescriptorBuilder<'a> {
    descriptor: &'a ToolErrorDescriptor,
    retryable: Option<bool>,
    origin: Option<ErrorOrigin>,
    message: Option<String>,
    details: Option<Value>,
    extra_fields: Map<String, Value>,
}

impl<'a> ToolErrorDescriptorBuilder<'a> {
    pub fn new(descriptor: &'a ToolErrorDescriptor) -> Self {
        Self {
            descriptor,
            retryable: None,
            origin: None,
            message: None,
            details: None,
            extra_fields: Map::new(),
        }
    }

    pub fn retryable(mut self, retryable: bool) -> Self {
        self.retryable = Some(retryable);
        self
    }

    pub fn origin(mut self, origin: ErrorOrigin) -> Self {
        self.origin = Some(origin);
        self
    }

    /// Replace the descriptor's static message (e.g. with the upstream message).
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_context_field(mut self, key: &str, value: Value) -> Self {
        self.extra_fields.insert(key.to_string(), value);
        self
    }

    pub fn build(self) -> Result<ErrorData, ToolErrorBuilderError> {
        if self.descriptor.remediation.trim().is_empty() {
            return Err(ToolErrorBuilderError::MissingRemediation {
                code: self.descriptor.code,
            });
        }
        let retryable = self
            .retryable
            .ok_or(ToolErrorBuilderError::MissingRetryable {
                code: self.descriptor.code,
            })?;
        let origin = self.origin.ok_or(ToolErrorBuilderError::MissingOrigin {
            code: self.descriptor.code,
        })?;

        let mut data = Map::new();
        data.insert("code".into(), Value::String(self.descriptor.code.into()));
        data.insert(
            "remediation".into(),
            Value::String(self.descriptor.remediation.into()),
        );
        data.insert("retryable".into(), Value::Bool(retryable));
        data.insert("origin".into(), Value::String(origin.as_str().into()));
        if let Some(details) = self.details {
            data.insert("details".into(), details);
        }
        for (key, value) in self.extra_fields {
            data.insert(key, value);
        }

        let message = self
            .message
            .unwrap_or_else(|| self.descriptor.message.to_string());
        let data = Some(Value::Object(data));
        Ok(match origin {
            ErrorOrigin::Request => ErrorData::invalid_params(message, data),
            _ => ErrorData::internal_error(message, data),
        })
    }
}

/// Errors when required builder fields are missing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ToolErrorBuilderError {
    #[error("retryable is missing (code={code})")]
    MissingRetryable { code: &'static str },
    #[error("origin is missing (code={code})")]
    MissingOrigin { code: &'static str },
    #[error("remediation is empty (code={code})")]
    MissingRemediation { code: &'static str },
}

/// Standard error when executed without an MCP client.
pub const MCP_CLIENT_REQUIRED_ERROR: ToolErrorDescriptor = ToolErrorDescriptor::new(
    "MCP_CLIENT_REQUIRED",
    "This binary can only be executed via an MCP client in stdio mode",
    "Launch through an MCP client such as `npx @modelcontextprotocol/inspector target/release/agentkit-mcp`, or use `--transport streamable-http`.",
);
