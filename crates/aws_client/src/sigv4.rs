//! AWS Signature Version 4 request signing.
//!
//! Only what the JSON protocol clients need is supported: a fixed canonical
//! URI, an optional pre-encoded query string and a set of headers to sign.

use crate::{credentials::AwsCredentials, Error};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

#[cfg(test)]
#[path = "sigv4_tests.rs"]
mod tests;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNING_ALGORITHM: &str = "AWS4-HMAC-SHA256";
pub const AMZ_DATE_HEADER: &str = "x-amz-date";
pub const SECURITY_TOKEN_HEADER: &str = "x-amz-security-token";

const AMZ_DATE_FORMAT: &str = "%Y%m%dT%H%M%SZ";
const SCOPE_DATE_FORMAT: &str = "%Y%m%d";
const SCOPE_TERMINATOR: &str = "aws4_request";

/// Request parts that take part in the signature.
#[derive(Debug, Clone)]
pub struct SigningRequest<'a> {
    pub method: &'a str,
    pub canonical_uri: &'a str,
    pub canonical_query: &'a str,

    /// Headers to sign. Names are lowercased and values trimmed before use.
    pub headers: BTreeMap<String, String>,
    pub payload: &'a [u8],
}

/// Scope of a signature: who signs, where, and when.
#[derive(Debug, Clone, Copy)]
pub struct SigningScope<'a> {
    pub region: &'a str,
    pub service: &'a str,
    pub time: DateTime<Utc>,
}

impl SigningScope<'_> {
    pub fn amz_date(&self) -> String {
        self.time.format(AMZ_DATE_FORMAT).to_string()
    }

    fn date(&self) -> String {
        self.time.format(SCOPE_DATE_FORMAT).to_string()
    }

    fn credential_scope(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            self.date(),
            self.region,
            self.service,
            SCOPE_TERMINATOR
        )
    }
}

/// Lowercase hex SHA-256 of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, Error> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|e| Error::Signing(e.to_string()))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn normalized_headers(headers: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    headers
        .iter()
        .map(|(name, value)| {
            let value = value.split_whitespace().collect::<Vec<_>>().join(" ");
            (name.to_ascii_lowercase(), value)
        })
        .collect()
}

/// Builds the canonical request and the list of signed header names.
pub fn canonical_request(request: &SigningRequest<'_>) -> (String, String) {
    let headers = normalized_headers(&request.headers);

    let canonical_headers: String = headers
        .iter()
        .map(|(name, value)| format!("{name}:{value}\n"))
        .collect();
    let signed_headers = headers.keys().cloned().collect::<Vec<_>>().join(";");

    let canonical = format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        request.method,
        request.canonical_uri,
        request.canonical_query,
        canonical_headers,
        signed_headers,
        sha256_hex(request.payload)
    );

    (canonical, signed_headers)
}

pub fn string_to_sign(scope: &SigningScope<'_>, canonical_request: &str) -> String {
    format!(
        "{}\n{}\n{}\n{}",
        SIGNING_ALGORITHM,
        scope.amz_date(),
        scope.credential_scope(),
        sha256_hex(canonical_request.as_bytes())
    )
}

/// Derives the signing key for one day, region and service.
pub fn signing_key(
    secret_access_key: &str,
    date: &str,
    region: &str,
    service: &str,
) -> Result<Vec<u8>, Error> {
    let k_date = hmac_sha256(format!("AWS4{secret_access_key}").as_bytes(), date.as_bytes())?;
    let k_region = hmac_sha256(&k_date, region.as_bytes())?;
    let k_service = hmac_sha256(&k_region, service.as_bytes())?;
    hmac_sha256(&k_service, SCOPE_TERMINATOR.as_bytes())
}

/// Computes the `Authorization` header value for a request.
///
/// The caller is responsible for including `host` and `x-amz-date` (and the
/// session token header when there is one) in `request.headers`.
pub fn authorization_header(
    credentials: &AwsCredentials,
    scope: &SigningScope<'_>,
    request: &SigningRequest<'_>,
) -> Result<String, Error> {
    let (canonical, signed_headers) = canonical_request(request);
    let to_sign = string_to_sign(scope, &canonical);

    let key = signing_key(
        credentials.secret_access_key(),
        &scope.date(),
        scope.region,
        scope.service,
    )?;
    let signature = hex::encode(hmac_sha256(&key, to_sign.as_bytes())?);

    Ok(format!(
        "{} Credential={}/{}, SignedHeaders={}, Signature={}",
        SIGNING_ALGORITHM,
        credentials.access_key_id(),
        scope.credential_scope(),
        signed_headers,
        signature
    ))
}
