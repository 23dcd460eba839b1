use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{
    header::{AUTHORIZATION, CONTENT_TYPE, HOST},
    StatusCode, Url,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::{
    lib::{
        convention,
        errors::{ClientError, UpstreamError},
    },
    server::config::{AgentKitSection, Credentials},
};

use super::{
    signer::{self, SignableRequest, SigningCredentials},
    RuntimeAction, RuntimeApi,
};

const JSON_CONTENT_TYPE: &str = "application/json";
const ERROR_BODY_LIMIT: usize = 512;

/// Signed HTTPS client for the AgentKit OpenAPI.
pub struct AgentKitClient {
    http: reqwest::Client,
    base_url: Url,
    /// Path every action is posted to, also the canonical path in the signature.
    endpoint_path: String,
    host_header: String,
    api_version: String,
    signing: SigningCredentials,
}

impl AgentKitClient {
    pub fn new(credentials: &Credentials, settings: &AgentKitSection) -> Result<Self, ClientError> {
        let base_url = parse_base_url(&credentials.host.value)?;
        let host_header = host_header(&base_url)?;
        let endpoint_path = endpoint_path(&base_url);
        let http = reqwest::Client::builder()
            .timeout(settings.request_timeout())
            .user_agent(concat!("agentkit-mcp/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| ClientError::Build {
                message: err.to_string(),
            })?;

        Ok(Self {
            http,
            base_url,
            endpoint_path,
            host_header,
            api_version: settings.api_version.clone(),
            signing: SigningCredentials {
                access_key: credentials.access_key.value.clone(),
                secret_key: credentials.secret_key.value.clone(),
                region: credentials.region.value.clone(),
                service: credentials.service.value.clone(),
            },
        })
    }
}

#[async_trait]
impl RuntimeApi for AgentKitClient {
    async fn call(&self, action: RuntimeAction, request: Value) -> Result<Value, UpstreamError> {
        let body = serde_json::to_vec(&convention::to_pascal(&request)).map_err(|err| {
            UpstreamError::Decode {
                message: format!("request body could not be serialized: {err}"),
            }
        })?;
        let query = [
            ("Action", action.as_str()),
            ("Version", self.api_version.as_str()),
        ];
        let signed = signer::sign(
            &self.signing,
            &SignableRequest {
                method: "POST",
                host: &self.host_header,
                path: &self.endpoint_path,
                query: &query,
                content_type: JSON_CONTENT_TYPE,
                body: &body,
            },
            Utc::now(),
        );

        let mut url = self.base_url.clone();
        url.set_path(&self.endpoint_path);
        url.set_query(Some(&signer::canonical_query(&query)));

        let started = Instant::now();
        let response = self
            .http
            .post(url)
            .header(HOST, &self.host_header)
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .header("X-Date", &signed.x_date)
            .header("X-Content-Sha256", &signed.content_sha256)
            .header(AUTHORIZATION, &signed.authorization)
            .body(body)
            .send()
            .await
            .map_err(|err| {
                warn!(
                    target: "agentkit_mcp::client",
                    action = action.as_str(),
                    reason = %err,
                    "AgentKit request failed before a response arrived"
                );
                UpstreamError::Transport {
                    message: err.to_string(),
                }
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| UpstreamError::Transport {
                message: err.to_string(),
            })?;
        let outcome = decode_envelope(status, &text);

        match &outcome {
            Ok(_) => debug!(
                target: "agentkit_mcp::client",
                action = action.as_str(),
                status = status.as_u16(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "AgentKit request succeeded"
            ),
            Err(err) => warn!(
                target: "agentkit_mcp::client",
                action = action.as_str(),
                status = status.as_u16(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                reason = %err,
                "AgentKit request returned an error"
            ),
        }
        outcome.map(|result| convention::to_snake(&result))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Envelope {
    response_metadata: Option<ResponseMetadata>,
    result: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ResponseMetadata {
    request_id: Option<String>,
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApiErrorBody {
    code: Option<String>,
    message: Option<String>,
}

/// Split the `{ResponseMetadata, Result}` envelope into a result or an error.
fn decode_envelope(status: StatusCode, text: &str) -> Result<Value, UpstreamError> {
    let envelope = match serde_json::from_str::<Envelope>(text) {
        Ok(envelope) => envelope,
        Err(err) if status.is_success() => {
            return Err(UpstreamError::Decode {
                message: err.to_string(),
            })
        }
        Err(_) => {
            return Err(UpstreamError::Api {
                code: format!("HTTP{}", status.as_u16()),
                message: truncate(text, ERROR_BODY_LIMIT),
                http_status: status.as_u16(),
                request_id: None,
            })
        }
    };

    let (request_id, api_error) = match envelope.response_metadata {
        Some(metadata) => (metadata.request_id, metadata.error),
        None => (None, None),
    };

    if let Some(api_error) = api_error {
        return Err(UpstreamError::Api {
            code: api_error.code.unwrap_or_else(|| "Unknown".into()),
            message: api_error.message.unwrap_or_default(),
            http_status: status.as_u16(),
            request_id,
        });
    }
    if !status.is_success() {
        return Err(UpstreamError::Api {
            code: format!("HTTP{}", status.as_u16()),
            message: truncate(text, ERROR_BODY_LIMIT),
            http_status: status.as_u16(),
            request_id,
        });
    }

    Ok(envelope
        .result
        .filter(|result| !result.is_null())
        .unwrap_or_else(|| Value::Object(Map::new())))
}

/// Accept a bare host name (HTTPS assumed) or a full base URL, optionally
/// with a gateway path prefix. Query strings and fragments are rejected.
fn parse_base_url(host: &str) -> Result<Url, ClientError> {
    let trimmed = host.trim().trim_end_matches('/');
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };
    let url = Url::parse(&candidate).map_err(|err| ClientError::Build {
        message: format!("invalid AgentKit host `{host}`: {err}"),
    })?;
    if url.query().is_some() || url.fragment().is_some() {
        return Err(ClientError::Build {
            message: format!("AgentKit host `{host}` must not carry a query or fragment"),
        });
    }
    Ok(url)
}

/// `/` for a bare host, `/prefix/` when the base URL carries a path.
fn endpoint_path(url: &Url) -> String {
    let path = url.path();
    if path.ends_with('/') {
        path.to_string()
    } else {
        format!("{path}/")
    }
}

fn host_header(url: &Url) -> Result<String, ClientError> {
    let host = url.host_str().ok_or_else(|| ClientError::Build {
        message: format!("AgentKit endpoint {url} has no host"),
    })?;
    Ok(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

fn truncate(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}
