//! Resolve AgentKit credentials from environment variables.
//!
//! Every field is looked up in a fixed order: the unified `VOLC_*` name first,
//! then each legacy name, then the built-in default. The first non-blank value
//! wins; later names are never consulted once a value is found.
use std::{collections::BTreeMap, env, fmt};

use serde::Serialize;

use crate::lib::errors::CredentialError;

pub const DEFAULT_REGION: &str = "cn-beijing";
pub const DEFAULT_HOST: &str = "open.volcengineapi.com";
pub const DEFAULT_SERVICE: &str = "agentkit";

const SECRET_PLACEHOLDER: &str = "****";

/// Lookup order for one credential field.
#[derive(Debug, Clone, Copy)]
pub struct CredentialVariable {
    pub field: &'static str,
    pub current: &'static str,
    pub legacy: &'static [&'static str],
    pub default: Option<&'static str>,
}

impl CredentialVariable {
    /// All names checked for this field, in precedence order.
    pub fn names(&self) -> Vec<&'static str> {
        std::iter::once(self.current)
            .chain(self.legacy.iter().copied())
            .collect()
    }
}

pub const ACCESS_KEY: CredentialVariable = CredentialVariable {
    field: "access_key",
    current: "VOLC_ACCESSKEY",
    legacy: &["AGENTKIT_ACCESS_KEY", "VOLCENGINE_ACCESS_KEY"],
    default: None,
};
pub const SECRET_KEY: CredentialVariable = CredentialVariable {
    field: "secret_key",
    current: "VOLC_SECRETKEY",
    legacy: &["AGENTKIT_SECRET_KEY", "VOLCENGINE_SECRET_KEY"],
    default: None,
};
pub const REGION: CredentialVariable = CredentialVariable {
    field: "region",
    current: "VOLC_REGION",
    legacy: &["AGENTKIT_REGION"],
    default: Some(DEFAULT_REGION),
};
pub const HOST: CredentialVariable = CredentialVariable {
    field: "host",
    current: "VOLC_AGENTKIT_HOST",
    legacy: &["AGENTKIT_BASE_URL"],
    default: Some(DEFAULT_HOST),
};
pub const SERVICE: CredentialVariable = CredentialVariable {
    field: "service",
    current: "VOLC_AGENTKIT_SERVICE",
    legacy: &["AGENTKIT_SERVICE"],
    default: Some(DEFAULT_SERVICE),
};

pub const CREDENTIAL_VARIABLES: [CredentialVariable; 5] =
    [ACCESS_KEY, SECRET_KEY, REGION, HOST, SERVICE];

/// Abstraction over where variables are read from.
pub trait CredentialSource {
    fn lookup(&self, name: &str) -> Option<String>;
}

/// Reads the real process environment.
pub struct ProcessEnv;

impl CredentialSource for ProcessEnv {
    fn lookup(&self, name: &str) -> Option<String> {
        env::var(name).ok()
    }
}

/// Fixed variable set (tests, CLI inspection).
#[derive(Debug, Clone, Default)]
pub struct MapSource(pub BTreeMap<String, String>);

impl MapSource {
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

impl CredentialSource for MapSource {
    fn lookup(&self, name: &str) -> Option<String> {
        self.0.get(name).cloned()
    }
}

/// Where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "variable", rename_all = "snake_case")]
pub enum ValueOrigin {
    Current(&'static str),
    Legacy(&'static str),
    Default,
}

/// A resolved value together with its origin.
#[derive(Clone, PartialEq, Eq)]
pub struct Resolved {
    pub value: String,
    pub origin: ValueOrigin,
}

/// Immutable credential/region/host set used to build the API client.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key: Resolved,
    pub secret_key: Resolved,
    pub region: Resolved,
    pub host: Resolved,
    pub service: Resolved,
}

impl Credentials {
    /// Resolve every field from `source`.
    pub fn resolve(source: &impl CredentialSource) -> Result<Self, CredentialError> {
        Ok(Self {
            access_key: resolve_variable(source, &ACCESS_KEY)?,
            secret_key: resolve_variable(source, &SECRET_KEY)?,
            region: resolve_variable(source, &REGION)?,
            host: resolve_variable(source, &HOST)?,
            service: resolve_variable(source, &SERVICE)?,
        })
    }

    /// Resolve from the process environment.
    pub fn from_env() -> Result<Self, CredentialError> {
        Self::resolve(&ProcessEnv)
    }

    /// Unified `VOLC_*` variables handed to toolkit subprocesses.
    pub fn toolkit_env(&self) -> Vec<(&'static str, String)> {
        vec![
            (ACCESS_KEY.current, self.access_key.value.clone()),
            (SECRET_KEY.current, self.secret_key.value.clone()),
            (REGION.current, self.region.value.clone()),
            (HOST.current, self.host.value.clone()),
            (SERVICE.current, self.service.value.clone()),
        ]
    }

    /// Access key reduced to its last four characters for logs.
    pub fn access_key_hint(&self) -> String {
        mask(&self.access_key.value)
    }

    /// Secret-free JSON summary including the variable each value came from.
    pub fn describe(&self) -> serde_json::Value {
        let entry = |resolved: &Resolved, value: String| {
            serde_json::json!({
                "value": value,
                "source": resolved.origin,
            })
        };
        serde_json::json!({
            "access_key": entry(&self.access_key, self.access_key_hint()),
            "secret_key": entry(&self.secret_key, SECRET_PLACEHOLDER.to_string()),
            "region": entry(&self.region, self.region.value.clone()),
            "host": entry(&self.host, self.host.value.clone()),
            "service": entry(&self.service, self.service.value.clone()),
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key_hint())
            .field("secret_key", &SECRET_PLACEHOLDER)
            .field("region", &self.region.value)
            .field("host", &self.host.value)
            .field("service", &self.service.value)
            .finish()
    }
}

fn resolve_variable(
    source: &impl CredentialSource,
    variable: &CredentialVariable,
) -> Result<Resolved, CredentialError> {
    let non_blank = |name: &str| source.lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(value) = non_blank(variable.current) {
        return Ok(Resolved {
            value: value.trim().to_string(),
            origin: ValueOrigin::Current(variable.current),
        });
    }
    for legacy in variable.legacy {
        if let Some(value) = non_blank(legacy) {
            return Ok(Resolved {
                value: value.trim().to_string(),
                origin: ValueOrigin::Legacy(legacy),
            });
        }
    }
    match variable.default {
        Some(default) => Ok(Resolved {
            value: default.to_string(),
            origin: ValueOrigin::Default,
        }),
        None => Err(CredentialError::Missing {
            field: variable.field,
            variables: variable.names(),
        }),
    }
}

fn mask(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 4 {
        return SECRET_PLACEHOLDER.into();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{tail}")
}
