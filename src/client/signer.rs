//! Volcengine V4 (HMAC-SHA256) request signing.
//!
//! Signed headers are fixed: `content-type`, `host`, `x-content-sha256` and
//! `x-date`. The credential scope is `{date}/{region}/{service}/request`.
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNING_ALGORITHM: &str = "HMAC-SHA256";
const SIGNED_HEADERS: &str = "content-type;host;x-content-sha256;x-date";

/// Key material used to sign one request.
#[derive(Clone)]
pub struct SigningCredentials {
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    pub service: String,
}

/// Request fields covered by the signature.
pub struct SignableRequest<'a> {
    pub method: &'a str,
    pub host: &'a str,
    pub path: &'a str,
    pub query: &'a [(&'a str, &'a str)],
    pub content_type: &'a str,
    pub body: &'a [u8],
}

/// Header values to attach to the outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    pub x_date: String,
    pub content_sha256: String,
    pub authorization: String,
}

/// Sign `request` at instant `now`.
pub fn sign(
    credentials: &SigningCredentials,
    request: &SignableRequest<'_>,
    now: DateTime<Utc>,
) -> SignedHeaders {
    let x_date = now.format("%Y%m%dT%H%M%SZ").to_string();
    let short_date = &x_date[..8];
    let content_sha256 = hex::encode(Sha256::digest(request.body));

    let canonical_headers = format!(
        "content-type:{}\nhost:{}\nx-content-sha256:{}\nx-date:{}\n",
        request.content_type.trim(),
        request.host.trim(),
        content_sha256,
        x_date
    );
    let query = canonical_query(request.query);
    let canonical_request = [
        request.method,
        request.path,
        query.as_str(),
        canonical_headers.as_str(),
        SIGNED_HEADERS,
        content_sha256.as_str(),
    ]
    .join("\n");

    let scope = format!(
        "{short_date}/{}/{}/request",
        credentials.region, credentials.service
    );
    let canonical_hash = hex::encode(Sha256::digest(canonical_request.as_bytes()));
    let string_to_sign = [
        SIGNING_ALGORITHM,
        x_date.as_str(),
        scope.as_str(),
        canonical_hash.as_str(),
    ]
    .join("\n");

    let k_date = hmac_sha256(credentials.secret_key.as_bytes(), short_date.as_bytes());
    let k_region = hmac_sha256(&k_date, credentials.region.as_bytes());
    let k_service = hmac_sha256(&k_region, credentials.service.as_bytes());
    let k_signing = hmac_sha256(&k_service, b"request");
    let signature = hex::encode(hmac_sha256(&k_signing, string_to_sign.as_bytes()));

    SignedHeaders {
        authorization: format!(
            "{SIGNING_ALGORITHM} Credential={}/{scope}, SignedHeaders={SIGNED_HEADERS}, Signature={signature}",
            credentials.access_key
        ),
        x_date,
        content_sha256,
    }
}

/// Sorted, percent-encoded query string. Also used verbatim in the request URL.
pub fn canonical_query(query: &[(&str, &str)]) -> String {
    let mut pairs: Vec<(String, String)> = query
        .iter()
        .map(|(key, value)| {
            (
                urlencoding::encode(key).into_owned(),
                urlencoding::encode(value).into_owned(),
            )
        })
        .collect();
    pairs.sort();
    pairs
        .into_iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}
