use std::{borrow::Cow, marker::PhantomData};

use chrono::DateTime;
use schemars::{json_schema, JsonSchema, Schema, SchemaGenerator};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::lib::{convention, errors::ParameterFormatError};

const MAX_NAME_LEN: usize = 128;
const MAX_CLIENT_TOKEN_LEN: usize = 64;
pub const DEFAULT_MAX_RESULTS: u32 = 20;
const MAX_RESULTS_LIMIT: u32 = 100;

/// Structured argument that may also arrive as a JSON-encoded string.
///
/// The raw value is kept until [`JsonArg::parse`] runs, so malformed input is
/// reported against the parameter name instead of failing the whole call.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(transparent)]
pub struct JsonArg<T> {
    raw: Value,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T> JsonArg<T> {
    pub fn new(raw: Value) -> Self {
        Self {
            raw,
            _marker: PhantomData,
        }
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

impl<T: DeserializeOwned> JsonArg<T> {
    /// Decode the string form if needed, convert keys to snake_case, then type-check.
    pub fn parse(&self, parameter: &'static str) -> Result<T, ParameterFormatError> {
        let document = self.document(parameter)?;
        serde_json::from_value(convention::to_snake(&document)).map_err(|err| {
            ParameterFormatError::new(parameter, format!("unexpected structure: {err}"))
        })
    }

    /// Like [`JsonArg::parse`] but keeps caller keys untouched (user payloads, env names).
    pub fn parse_verbatim(&self, parameter: &'static str) -> Result<T, ParameterFormatError> {
        let document = self.document(parameter)?;
        serde_json::from_value(document).map_err(|err| {
            ParameterFormatError::new(parameter, format!("unexpected structure: {err}"))
        })
    }

    fn document(&self, parameter: &'static str) -> Result<Value, ParameterFormatError> {
        match &self.raw {
            Value::String(encoded) => serde_json::from_str::<Value>(encoded).map_err(|err| {
                ParameterFormatError::new(parameter, format!("invalid JSON: {err}"))
            }),
            other => Ok(other.clone()),
        }
    }
}

impl<T: JsonSchema> JsonSchema for JsonArg<T> {
    fn schema_name() -> Cow<'static, str> {
        format!("JsonArg_{}", T::schema_name()).into()
    }

    fn json_schema(generator: &mut SchemaGenerator) -> Schema {
        let native = generator.subschema_for::<T>();
        json_schema!({
            "anyOf": [
                native,
                { "type": "string", "description": "The same value as a JSON-encoded string" }
            ]
        })
    }
}

/// `{Key, Value}` pair used by runtime envs and tags.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum ApiKeyLocation {
    #[serde(rename = "HEADER")]
    Header,
    #[serde(rename = "QUERY")]
    Query,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct KeyAuth {
    pub api_key_name: String,
    pub api_key: String,
    pub api_key_location: ApiKeyLocation,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct CustomJwtAuthorizer {
    #[serde(default)]
    pub allowed_clients: Vec<String>,
    pub discovery_url: String,
}

/// Inbound authentication for a runtime: an API key or a custom JWT authorizer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct AuthorizerConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_auth: Option<KeyAuth>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_jwt_authorizer: Option<CustomJwtAuthorizer>,
}

/// Runtime list filter, e.g. `{"Name":"Status","Values":["Ready"]}`.
pub type Filter = Map<String, Value>;

/// Artifact kinds accepted by `create_runtime`.
pub const ARTIFACT_TYPES: &[&str] = &["image", "tos"];

/// Input for `create_runtime`.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct CreateRuntimeParams {
    /// 1-128 characters; must not start with a digit, `-` or `_`.
    pub name: String,
    /// `image` (container image) or `tos` (code package in object storage).
    pub artifact_type: String,
    /// Image URL with tag, or TOS path.
    pub artifact_url: String,
    /// IAM role the runtime assumes.
    pub role_name: String,
    /// `{"KeyAuth":{"ApiKeyName":..,"ApiKey":..,"ApiKeyLocation":"HEADER"}}` or `{"CustomJwtAuthorizer":{"AllowedClients":[..],"DiscoveryUrl":..}}`.
    pub authorizer_configuration: JsonArg<AuthorizerConfiguration>,
    #[serde(default)]
    pub description: Option<String>,
    /// `[{"Key":"NAME","Value":"value"}]`
    #[serde(default)]
    pub envs: Option<JsonArg<Vec<KeyValue>>>,
    /// `[{"Key":"key","Value":"value"}]`
    #[serde(default)]
    pub tags: Option<JsonArg<Vec<KeyValue>>>,
    #[serde(default)]
    pub apmplus_enable: Option<bool>,
    /// Overrides the image CMD/ENTRYPOINT.
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub project_name: Option<String>,
    /// Idempotency token, at most 64 ASCII characters.
    #[serde(default)]
    pub client_token: Option<String>,
}

impl CreateRuntimeParams {
    pub fn into_request(self) -> Result<Value, ParameterFormatError> {
        validate_runtime_name(&self.name)?;
        if !ARTIFACT_TYPES.contains(&self.artifact_type.as_str()) {
            return Err(ParameterFormatError::new(
                "artifact_type",
                format!("expected one of image, tos (got `{}`)", self.artifact_type),
            ));
        }
        require_non_blank("artifact_url", &self.artifact_url)?;
        require_non_blank("role_name", &self.role_name)?;
        let authorizer = parse_authorizer(&self.authorizer_configuration)?;
        let envs = parse_key_values("envs", self.envs.as_ref())?;
        let tags = parse_key_values("tags", self.tags.as_ref())?;
        validate_client_token(self.client_token.as_deref())?;

        let mut request = RequestBody::default();
        request
            .set("name", self.name)
            .set("artifact_type", self.artifact_type)
            .set("artifact_url", self.artifact_url)
            .set("role_name", self.role_name)
            .set("authorizer_configuration", to_value(&authorizer))
            .set_opt("description", self.description)
            .set_opt("envs", envs.map(|items| to_value(&items)))
            .set_opt("tags", tags.map(|items| to_value(&items)))
            .set_opt("apmplus_enable", self.apmplus_enable)
            .set_opt("command", self.command)
            .set_opt("project_name", self.project_name)
            .set_opt("client_token", self.client_token);
        Ok(request.into_value())
    }
}

/// Input for `list_runtimes`.
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
pub struct ListRuntimesParams {
    /// `[{"Name":"Status","Values":["Ready"]}]`
    #[serde(default)]
    pub filters: Option<JsonArg<Vec<Filter>>>,
    /// RFC 3339 timestamp.
    #[serde(default)]
    pub create_time_before: Option<String>,
    #[serde(default)]
    pub create_time_after: Option<String>,
    #[serde(default)]
    pub update_time_before: Option<String>,
    #[serde(default)]
    pub update_time_after: Option<String>,
    #[serde(default)]
    pub next_token: Option<String>,
    /// 1-100, default 20.
    #[serde(default)]
    pub max_results: Option<u32>,
}

impl ListRuntimesParams {
    pub fn into_request(self) -> Result<Value, ParameterFormatError> {
        let filters = match &self.filters {
            Some(filters) => Some(filters.parse("filters")?),
            None => None,
        };
        let max_results = validate_max_results(self.max_results)?;

        let mut request = RequestBody::default();
        request
            .set_opt("filters", filters.map(Value::from))
            .set_opt(
                "create_time_before",
                validate_timestamp("create_time_before", self.create_time_before)?,
            )
            .set_opt(
                "create_time_after",
                validate_timestamp("create_time_after", self.create_time_after)?,
            )
            .set_opt(
                "update_time_before",
                validate_timestamp("update_time_before", self.update_time_before)?,
            )
            .set_opt(
                "update_time_after",
                validate_timestamp("update_time_after", self.update_time_after)?,
            )
            .set_opt("next_token", self.next_token)
            .set("max_results", max_results);
        Ok(request.into_value())
    }
}

/// Input for tools addressed by runtime ID only.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct RuntimeIdParams {
    pub runtime_id: String,
}

impl RuntimeIdParams {
    pub fn into_request(self) -> Result<Value, ParameterFormatError> {
        require_non_blank("runtime_id", &self.runtime_id)?;
        let mut request = RequestBody::default();
        request.set("runtime_id", self.runtime_id);
        Ok(request.into_value())
    }
}

/// Input for `update_runtime`. Omitted fields stay unchanged.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct UpdateRuntimeParams {
    pub runtime_id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub artifact_url: Option<String>,
    #[serde(default)]
    pub role_name: Option<String>,
    #[serde(default)]
    pub authorizer_configuration: Option<JsonArg<AuthorizerConfiguration>>,
    #[serde(default)]
    pub envs: Option<JsonArg<Vec<KeyValue>>>,
    #[serde(default)]
    pub tags: Option<JsonArg<Vec<KeyValue>>>,
    /// Release the new version right after the update.
    #[serde(default)]
    pub release_enable: Option<bool>,
    #[serde(default)]
    pub client_token: Option<String>,
}

impl UpdateRuntimeParams {
    pub fn into_request(self) -> Result<Value, ParameterFormatError> {
        require_non_blank("runtime_id", &self.runtime_id)?;
        let authorizer = match &self.authorizer_configuration {
            Some(arg) => Some(parse_authorizer(arg)?),
            None => None,
        };
        let envs = parse_key_values("envs", self.envs.as_ref())?;
        let tags = parse_key_values("tags", self.tags.as_ref())?;
        validate_client_token(self.client_token.as_deref())?;

        let mut request = RequestBody::default();
        request
            .set("runtime_id", self.runtime_id)
            .set_opt("description", self.description)
            .set_opt("artifact_url", self.artifact_url)
            .set_opt("role_name", self.role_name)
            .set_opt("authorizer_configuration", authorizer.map(|a| to_value(&a)))
            .set_opt("envs", envs.map(|items| to_value(&items)))
            .set_opt("tags", tags.map(|items| to_value(&items)))
            .set_opt("release_enable", self.release_enable)
            .set_opt("client_token", self.client_token);
        Ok(request.into_value())
    }
}

/// What `release_runtime` will do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseMode {
    Latest,
    Rollback { version: u32 },
}

/// Input for `release_runtime`.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct ReleaseRuntimeParams {
    pub runtime_id: String,
    /// Omit to release the latest version; set to roll back to that version.
    #[serde(default)]
    pub version_number: Option<u32>,
}

impl ReleaseRuntimeParams {
    pub fn mode(&self) -> ReleaseMode {
        match self.version_number {
            Some(version) => ReleaseMode::Rollback { version },
            None => ReleaseMode::Latest,
        }
    }

    pub fn into_request(self) -> Result<(ReleaseMode, Value), ParameterFormatError> {
        require_non_blank("runtime_id", &self.runtime_id)?;
        let mode = self.mode();
        let mut request = RequestBody::default();
        request.set("runtime_id", self.runtime_id);
        if let ReleaseMode::Rollback { version } = mode {
            validate_version_number(version)?;
            request.set("version_number", version);
        }
        Ok((mode, request.into_value()))
    }
}

/// Input for `get_runtime_version`.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct RuntimeVersionParams {
    pub runtime_id: String,
    /// Omit for the current version.
    #[serde(default)]
    pub version_number: Option<u32>,
}

impl RuntimeVersionParams {
    pub fn into_request(self) -> Result<Value, ParameterFormatError> {
        require_non_blank("runtime_id", &self.runtime_id)?;
        if let Some(version) = self.version_number {
            validate_version_number(version)?;
        }
        let mut request = RequestBody::default();
        request
            .set("runtime_id", self.runtime_id)
            .set_opt("version_number", self.version_number);
        Ok(request.into_value())
    }
}

/// Input for `list_runtime_versions`.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct ListRuntimeVersionsParams {
    pub runtime_id: String,
    #[serde(default)]
    pub next_token: Option<String>,
    /// 1-100, default 20.
    #[serde(default)]
    pub max_results: Option<u32>,
}

impl ListRuntimeVersionsParams {
    pub fn into_request(self) -> Result<Value, ParameterFormatError> {
        require_non_blank("runtime_id", &self.runtime_id)?;
        let max_results = validate_max_results(self.max_results)?;
        let mut request = RequestBody::default();
        request
            .set("runtime_id", self.runtime_id)
            .set_opt("next_token", self.next_token)
            .set("max_results", max_results);
        Ok(request.into_value())
    }
}

/// snake_case request object; absent optionals are never written.
#[derive(Default)]
struct RequestBody(Map<String, Value>);

impl RequestBody {
    fn set(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    fn set_opt<V: Into<Value>>(&mut self, key: &str, value: Option<V>) -> &mut Self {
        if let Some(value) = value {
            self.0.insert(key.to_string(), value.into());
        }
        self
    }

    fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

fn to_value<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

pub fn validate_runtime_name(name: &str) -> Result<(), ParameterFormatError> {
    let length = name.chars().count();
    if length == 0 || length > MAX_NAME_LEN {
        return Err(ParameterFormatError::new(
            "name",
            format!("must be 1-{MAX_NAME_LEN} characters (got {length})"),
        ));
    }
    if name
        .chars()
        .next()
        .is_some_and(|first| first.is_ascii_digit() || first == '-' || first == '_')
    {
        return Err(ParameterFormatError::new(
            "name",
            "must not start with a digit, `-` or `_`",
        ));
    }
    Ok(())
}

fn require_non_blank(parameter: &'static str, value: &str) -> Result<(), ParameterFormatError> {
    if value.trim().is_empty() {
        return Err(ParameterFormatError::new(parameter, "must not be blank"));
    }
    Ok(())
}

fn parse_authorizer(
    arg: &JsonArg<AuthorizerConfiguration>,
) -> Result<AuthorizerConfiguration, ParameterFormatError> {
    let authorizer = arg.parse("authorizer_configuration")?;
    if authorizer.key_auth.is_none() && authorizer.custom_jwt_authorizer.is_none() {
        return Err(ParameterFormatError::new(
            "authorizer_configuration",
            "provide KeyAuth or CustomJwtAuthorizer",
        ));
    }
    Ok(authorizer)
}

fn parse_key_values(
    parameter: &'static str,
    arg: Option<&JsonArg<Vec<KeyValue>>>,
) -> Result<Option<Vec<KeyValue>>, ParameterFormatError> {
    let Some(arg) = arg else {
        return Ok(None);
    };
    let items = arg.parse(parameter)?;
    if let Some(blank) = items.iter().position(|item| item.key.trim().is_empty()) {
        return Err(ParameterFormatError::new(
            parameter,
            format!("item {blank} has an empty Key"),
        ));
    }
    Ok(Some(items))
}

fn validate_client_token(token: Option<&str>) -> Result<(), ParameterFormatError> {
    match token {
        Some(token) if token.len() > MAX_CLIENT_TOKEN_LEN || !token.is_ascii() => {
            Err(ParameterFormatError::new(
                "client_token",
                format!("must be at most {MAX_CLIENT_TOKEN_LEN} ASCII characters"),
            ))
        }
        _ => Ok(()),
    }
}

fn validate_max_results(max_results: Option<u32>) -> Result<u32, ParameterFormatError> {
    let value = max_results.unwrap_or(DEFAULT_MAX_RESULTS);
    if !(1..=MAX_RESULTS_LIMIT).contains(&value) {
        return Err(ParameterFormatError::new(
            "max_results",
            format!("must be between 1 and {MAX_RESULTS_LIMIT} (got {value})"),
        ));
    }
    Ok(value)
}

fn validate_version_number(version: u32) -> Result<(), ParameterFormatError> {
    if version == 0 {
        return Err(ParameterFormatError::new(
            "version_number",
            "versions start at 1",
        ));
    }
    Ok(())
}

fn validate_timestamp(
    parameter: &'static str,
    value: Option<String>,
) -> Result<Option<String>, ParameterFormatError> {
    match value {
        Some(value) => {
            DateTime::parse_from_rfc3339(&value).map_err(|err| {
                ParameterFormatError::new(parameter, format!("expected RFC 3339 timestamp: {err}"))
            })?;
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn create_params(authorizer: Value) -> CreateRuntimeParams {
        serde_json::from_value(json!({
            "name": "agent-prod",
            "artifact_type": "image",
            "artifact_url": "agentkit-cn.cr.volces.com/ns/agent:v1",
            "role_name": "TestRoleForAgentKit",
            "authorizer_configuration": authorizer,
        }))
        .expect("params deserialize")
    }

    #[test]
    fn json_arg_accepts_native_and_encoded_forms() {
        let native: JsonArg<Vec<KeyValue>> = JsonArg::new(json!([{ "Key": "A", "Value": "1" }]));
        let encoded: JsonArg<Vec<KeyValue>> =
            JsonArg::new(json!(r#"[{"Key":"A","Value":"1"}]"#));
        let expected = vec![KeyValue {
            key: "A".into(),
            value: "1".into(),
        }];
        assert_eq!(native.parse("envs").expect("native"), expected);
        assert_eq!(encoded.parse("envs").expect("encoded"), expected);
    }

    #[test]
    fn verbatim_parse_keeps_caller_keys() {
        let payload: JsonArg<Value> = JsonArg::new(json!(r#"{"Name":"hi","Status":1}"#));
        assert_eq!(
            payload.parse_verbatim("payload").expect("payload"),
            json!({ "Name": "hi", "Status": 1 })
        );
        assert_eq!(
            payload.parse("payload").expect("payload"),
            json!({ "name": "hi", "status": 1 })
        );
    }

    #[test]
    fn json_arg_reports_parameter_on_bad_json_and_bad_shape() {
        let broken: JsonArg<Vec<KeyValue>> = JsonArg::new(json!("[{\"Key\":"));
        let error = broken.parse("tags").expect_err("broken JSON");
        assert_eq!(error.parameter, "tags");
        assert!(error.message.starts_with("invalid JSON"), "{}", error.message);

        let wrong_shape: JsonArg<Vec<KeyValue>> = JsonArg::new(json!({ "Key": "A" }));
        let error = wrong_shape.parse("envs").expect_err("object is not an array");
        assert_eq!(error.parameter, "envs");
        assert!(error.message.starts_with("unexpected structure"));
    }

    #[test]
    fn create_request_is_snake_case_and_omits_absent_fields() {
        let params = create_params(json!(
            r#"{"KeyAuth":{"ApiKeyName":"x-api-key","ApiKey":"s3cret","ApiKeyLocation":"HEADER"}}"#
        ));
        let request = params.into_request().expect("valid request");
        assert_eq!(
            request,
            json!({
                "name": "agent-prod",
                "artifact_type": "image",
                "artifact_url": "agentkit-cn.cr.volces.com/ns/agent:v1",
                "role_name": "TestRoleForAgentKit",
                "authorizer_configuration": {
                    "key_auth": {
                        "api_key_name": "x-api-key",
                        "api_key": "s3cret",
                        "api_key_location": "HEADER"
                    }
                }
            })
        );
    }

    #[test]
    fn authorizer_accepts_snake_case_spelling() {
        let params = create_params(json!({
            "custom_jwt_authorizer": {
                "allowed_clients": ["c1"],
                "discovery_url": "https://idp.example.com/.well-known/openid-configuration"
            }
        }));
        let request = params.into_request().expect("valid request");
        assert_eq!(
            request["authorizer_configuration"]["custom_jwt_authorizer"]["allowed_clients"],
            json!(["c1"])
        );
    }

    #[test]
    fn authorizer_requires_a_known_mode_and_location() {
        let error = create_params(json!({}))
            .into_request()
            .expect_err("empty authorizer");
        assert_eq!(error.parameter, "authorizer_configuration");

        let error = create_params(json!({
            "KeyAuth": { "ApiKeyName": "k", "ApiKey": "v", "ApiKeyLocation": "COOKIE" }
        }))
        .into_request()
        .expect_err("unknown location");
        assert_eq!(error.parameter, "authorizer_configuration");
    }

    #[test]
    fn runtime_name_rules() {
        assert!(validate_runtime_name("myagent").is_ok());
        assert!(validate_runtime_name("agent-prod").is_ok());
        for bad in ["", "123agent", "-agent", "_agent"] {
            let error = validate_runtime_name(bad).expect_err(bad);
            assert_eq!(error.parameter, "name");
        }
        assert!(validate_runtime_name(&"a".repeat(129)).is_err());
    }

    #[test]
    fn list_defaults_max_results_and_checks_range() {
        let request = ListRuntimesParams::default()
            .into_request()
            .expect("defaults are valid");
        assert_eq!(request, json!({ "max_results": 20 }));

        let params = ListRuntimesParams {
            max_results: Some(101),
            ..Default::default()
        };
        assert_eq!(
            params.into_request().expect_err("too many").parameter,
            "max_results"
        );
    }

    #[test]
    fn list_rejects_non_rfc3339_timestamps() {
        let params = ListRuntimesParams {
            create_time_after: Some("yesterday".into()),
            ..Default::default()
        };
        assert_eq!(
            params.into_request().expect_err("bad time").parameter,
            "create_time_after"
        );
    }

    #[test]
    fn update_sends_only_provided_fields() {
        let params: UpdateRuntimeParams = serde_json::from_value(json!({
            "runtime_id": "r-1",
            "description": "new",
            "release_enable": true
        }))
        .expect("params");
        assert_eq!(
            params.into_request().expect("valid"),
            json!({ "runtime_id": "r-1", "description": "new", "release_enable": true })
        );
    }

    #[test]
    fn release_mode_follows_version_number() {
        let latest = ReleaseRuntimeParams {
            runtime_id: "r-1".into(),
            version_number: None,
        };
        let (mode, request) = latest.into_request().expect("valid");
        assert_eq!(mode, ReleaseMode::Latest);
        assert_eq!(request, json!({ "runtime_id": "r-1" }));

        let rollback = ReleaseRuntimeParams {
            runtime_id: "r-1".into(),
            version_number: Some(3),
        };
        let (mode, request) = rollback.into_request().expect("valid");
        assert_eq!(mode, ReleaseMode::Rollback { version: 3 });
        assert_eq!(request, json!({ "runtime_id": "r-1", "version_number": 3 }));
    }

    #[test]
    fn client_token_must_be_short_ascii() {
        assert!(validate_client_token(Some("abc-123")).is_ok());
        assert!(validate_client_token(Some(&"x".repeat(65))).is_err());
        assert!(validate_client_token(Some("トークン")).is_err());
    }
}
