//! Presigned upload targets for S3-compatible object storage
//!
//! Uses AWS Signature Version 4 query-string signing. Only the `host` header
//! is signed and the payload is `UNSIGNED-PAYLOAD`, so the client may PUT
//! the bytes directly with any content type.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use mundo_common::{Error, Result};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const SERVICE: &str = "s3";

/// Issues write-scoped upload URLs
pub trait UploadSigner: Send + Sync {
    /// URL accepting a single `PUT` of `key` until `expires_in` seconds after `now`
    fn presign_put(&self, key: &str, now: DateTime<Utc>, expires_in: u64) -> Result<String>;

    /// Where the object can be read once uploaded
    fn public_url(&self, key: &str) -> String;
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

/// Signs against AWS S3, or any S3-compatible endpoint (path-style)
#[derive(Debug, Clone)]
pub struct S3UploadSigner {
    bucket: String,
    region: String,
    credentials: Credentials,
    /// `(scheme, host)` of a custom endpoint
    endpoint: Option<(String, String)>,
}

impl S3UploadSigner {
    pub fn new(bucket: impl Into<String>, region: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            bucket: bucket.into(),
            region: region.into(),
            credentials,
            endpoint: None,
        }
    }

    /// Use a custom endpoint such as `http://localhost:9000`
    pub fn with_endpoint(mut self, endpoint: &str) -> Result<Self> {
        let (scheme, rest) = endpoint
            .split_once("://")
            .ok_or_else(|| Error::Signing(format!("endpoint '{}' has no scheme", endpoint)))?;
        let host = rest.trim_end_matches('/');
        if host.is_empty() || host.contains('/') {
            return Err(Error::Signing(format!("endpoint '{}' is not a host", endpoint)));
        }

        self.endpoint = Some((scheme.to_string(), host.to_string()));
        Ok(self)
    }

    /// Scheme, host and canonical (encoded) path for `key`
    fn locate(&self, key: &str) -> (&str, String, String) {
        let encoded_key = uri_encode(key, false);
        match &self.endpoint {
            Some((scheme, host)) => (
                scheme.as_str(),
                host.clone(),
                format!("/{}/{}", uri_encode(&self.bucket, true), encoded_key),
            ),
            None => {
                let host = if self.region == "us-east-1" {
                    format!("{}.s3.amazonaws.com", self.bucket)
                } else {
                    format!("{}.s3.{}.amazonaws.com", self.bucket, self.region)
                };
                ("https", host, format!("/{}", encoded_key))
            }
        }
    }

    /// Build a presigned URL for `method` on `key`
    pub fn presign(
        &self,
        method: &str,
        key: &str,
        now: DateTime<Utc>,
        expires_in: u64,
    ) -> Result<String> {
        let (scheme, host, path) = self.locate(key);
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date = now.format("%Y%m%d").to_string();
        let scope = format!("{}/{}/{}/aws4_request", date, self.region, SERVICE);

        let mut params = BTreeMap::new();
        params.insert("X-Amz-Algorithm", ALGORITHM.to_string());
        params.insert(
            "X-Amz-Credential",
            format!("{}/{}", self.credentials.access_key_id, scope),
        );
        params.insert("X-Amz-Date", amz_date.clone());
        params.insert("X-Amz-Expires", expires_in.to_string());
        if let Some(token) = &self.credentials.session_token {
            params.insert("X-Amz-Security-Token", token.clone());
        }
        params.insert("X-Amz-SignedHeaders", "host".to_string());

        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", uri_encode(k, true), uri_encode(v, true)))
            .collect::<Vec<_>>()
            .join("&");

        let canonical_request = format!(
            "{}\n{}\n{}\nhost:{}\n\nhost\nUNSIGNED-PAYLOAD",
            method, path, query, host
        );

        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            ALGORITHM,
            amz_date,
            scope,
            hex::encode(Sha256::digest(canonical_request.as_bytes()))
        );

        let signing_key = self.signing_key(&date)?;
        let signature = hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes())?);

        Ok(format!(
            "{}://{}{}?{}&X-Amz-Signature={}",
            scheme, host, path, query, signature
        ))
    }

    fn signing_key(&self, date: &str) -> Result<Vec<u8>> {
        let secret = format!("AWS4{}", self.credentials.secret_access_key);
        let k_date = hmac_sha256(secret.as_bytes(), date.as_bytes())?;
        let k_region = hmac_sha256(&k_date, self.region.as_bytes())?;
        let k_service = hmac_sha256(&k_region, SERVICE.as_bytes())?;
        hmac_sha256(&k_service, b"aws4_request")
    }
}

impl UploadSigner for S3UploadSigner {
    fn presign_put(&self, key: &str, now: DateTime<Utc>, expires_in: u64) -> Result<String> {
        self.presign("PUT", key, now, expires_in)
    }

    fn public_url(&self, key: &str) -> String {
        let (scheme, host, path) = self.locate(key);
        format!("{}://{}{}", scheme, host, path)
    }
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut mac =
        HmacSha256::new_from_slice(key).map_err(|e| Error::Signing(e.to_string()))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// RFC 3986 encoding as SigV4 expects; `/` is kept unless `encode_slash`
fn uri_encode(input: &str, encode_slash: bool) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            b'/' if !encode_slash => out.push('/'),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}
