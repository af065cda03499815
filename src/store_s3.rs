//! S3-compatible object store client.
//!
//! Implements [`ObjectStore`](crate::store::ObjectStore) against the S3
//! REST API: `ListObjectsV2` (draining the full listing via continuation
//! tokens) and `GetObject`. Supports custom endpoints for S3-compatible
//! services (MinIO, LocalStack) via `storage.endpoint_url`.
//!
//! Requests are signed with
//! [AWS Signature Version 4](https://docs.aws.amazon.com/AmazonS3/latest/API/sigv4-auth-using-authorization-header.html)
//! using pure-Rust primitives (`hmac`, `sha2`). Credentials come from the
//! environment:
//!
//! - `AWS_ACCESS_KEY_ID`
//! - `AWS_SECRET_ACCESS_KEY`
//! - `AWS_SESSION_TOKEN` (optional, for temporary credentials)
//!
//! When no credentials are set the client sends unsigned requests, which
//! is sufficient for public corpora like the reference deployment's
//! bucket.

use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::config::StorageConfig;
use crate::store::{ObjectStore, StoreError};

type HmacSha256 = Hmac<Sha256>;

/// AWS credentials read from the environment, if present.
struct AwsCredentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
}

impl AwsCredentials {
    /// Returns `None` when no access key is configured; the store then
    /// operates anonymously.
    fn from_env() -> Option<Self> {
        let access_key_id = std::env::var("AWS_ACCESS_KEY_ID").ok()?;
        let secret_access_key = std::env::var("AWS_SECRET_ACCESS_KEY").ok()?;
        Some(Self {
            access_key_id,
            secret_access_key,
            session_token: std::env::var("AWS_SESSION_TOKEN").ok(),
        })
    }
}

/// Object store client for S3 and S3-compatible services.
pub struct S3Store {
    bucket: String,
    region: String,
    endpoint_url: Option<String>,
    credentials: Option<AwsCredentials>,
    client: reqwest::Client,
}

impl S3Store {
    /// Build a store client from storage configuration, picking up
    /// credentials from the environment.
    pub fn from_config(config: &StorageConfig) -> Self {
        Self {
            bucket: config.bucket.clone(),
            region: config.region.clone(),
            endpoint_url: config.endpoint_url.clone(),
            credentials: AwsCredentials::from_env(),
            client: reqwest::Client::new(),
        }
    }

    /// Hostname for the configured bucket, honoring a custom endpoint.
    fn host(&self) -> String {
        match &self.endpoint_url {
            Some(endpoint) => endpoint
                .trim_start_matches("https://")
                .trim_start_matches("http://")
                .trim_end_matches('/')
                .to_string(),
            None => format!("{}.s3.{}.amazonaws.com", self.bucket, self.region),
        }
    }

    /// URL scheme: custom endpoints may be plain HTTP, AWS never is.
    fn scheme(&self) -> &'static str {
        match &self.endpoint_url {
            Some(endpoint) if endpoint.starts_with("http://") => "http",
            _ => "https",
        }
    }

    /// Issue a GET for `canonical_uri` with `query_params`, signing the
    /// request when credentials are available.
    async fn get(
        &self,
        canonical_uri: &str,
        query_params: &[(String, String)],
    ) -> Result<reqwest::Response, reqwest::Error> {
        let host = self.host();

        // Canonical query string must be sorted for signing; reuse it
        // for the actual request URL so both always agree.
        let mut sorted_params = query_params.to_vec();
        sorted_params.sort_by(|a, b| a.0.cmp(&b.0));
        let canonical_querystring: String = sorted_params
            .iter()
            .map(|(k, v)| format!("{}={}", uri_encode(k), uri_encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        let url = if canonical_querystring.is_empty() {
            format!("{}://{}{}", self.scheme(), host, canonical_uri)
        } else {
            format!(
                "{}://{}{}?{}",
                self.scheme(),
                host,
                canonical_uri,
                canonical_querystring
            )
        };

        let mut request = self.client.get(&url);

        if let Some(creds) = &self.credentials {
            let now = Utc::now();
            let date_stamp = now.format("%Y%m%d").to_string();
            let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
            let payload_hash = hex_sha256(b"");

            let mut headers = vec![
                ("host".to_string(), host.clone()),
                ("x-amz-content-sha256".to_string(), payload_hash.clone()),
                ("x-amz-date".to_string(), amz_date.clone()),
            ];
            if let Some(token) = &creds.session_token {
                headers.push(("x-amz-security-token".to_string(), token.clone()));
            }
            headers.sort_by(|a, b| a.0.cmp(&b.0));

            let signed_headers: String = headers
                .iter()
                .map(|(k, _)| k.as_str())
                .collect::<Vec<_>>()
                .join(";");
            let canonical_headers: String = headers
                .iter()
                .map(|(k, v)| format!("{}:{}\n", k, v))
                .collect();

            let canonical_request = format!(
                "GET\n{}\n{}\n{}\n{}\n{}",
                canonical_uri, canonical_querystring, canonical_headers, signed_headers,
                payload_hash
            );

            let credential_scope = format!("{}/{}/s3/aws4_request", date_stamp, self.region);
            let string_to_sign = format!(
                "AWS4-HMAC-SHA256\n{}\n{}\n{}",
                amz_date,
                credential_scope,
                hex_sha256(canonical_request.as_bytes())
            );

            let signing_key =
                derive_signing_key(&creds.secret_access_key, &date_stamp, &self.region, "s3");
            let signature = hex_hmac_sha256(&signing_key, string_to_sign.as_bytes());

            let authorization = format!(
                "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
                creds.access_key_id, credential_scope, signed_headers, signature
            );

            request = request
                .header("Authorization", &authorization)
                .header("x-amz-content-sha256", &payload_hash)
                .header("x-amz-date", &amz_date);
            if let Some(token) = &creds.session_token {
                request = request.header("x-amz-security-token", token);
            }
        }

        request.send().await
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let list_err = |message: String| StoreError::List {
            prefix: prefix.to_string(),
            message,
        };

        let mut keys = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut query_params = vec![
                ("list-type".to_string(), "2".to_string()),
                ("max-keys".to_string(), "1000".to_string()),
            ];
            if !prefix.is_empty() {
                query_params.push(("prefix".to_string(), prefix.to_string()));
            }
            if let Some(token) = &continuation_token {
                query_params.push(("continuation-token".to_string(), token.clone()));
            }

            let resp = self
                .get("/", &query_params)
                .await
                .map_err(|e| list_err(e.to_string()))?;

            if !resp.status().is_success() {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                return Err(list_err(format!(
                    "ListObjectsV2 returned HTTP {}: {}",
                    status,
                    body.chars().take(200).collect::<String>()
                )));
            }

            let xml = resp.text().await.map_err(|e| list_err(e.to_string()))?;
            let page = parse_listing(&xml);
            keys.extend(page.keys);

            match page.next_token {
                Some(token) => continuation_token = Some(token),
                None => break,
            }
        }

        Ok(keys)
    }

    async fn download(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let download_err = |message: String| StoreError::Download {
            key: key.to_string(),
            message,
        };

        let canonical_uri = format!(
            "/{}",
            key.split('/').map(uri_encode).collect::<Vec<_>>().join("/")
        );

        let resp = self
            .get(&canonical_uri, &[])
            .await
            .map_err(|e| download_err(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(download_err(format!(
                "GetObject returned HTTP {}",
                resp.status()
            )));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| download_err(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

// ============ SigV4 helpers ============

fn hex_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn hex_hmac_sha256(key: &[u8], data: &[u8]) -> String {
    hex::encode(hmac_sha256(key, data))
}

/// Derive the SigV4 signing key:
///
/// ```text
/// kDate    = HMAC("AWS4" + secret, dateStamp)
/// kRegion  = HMAC(kDate, region)
/// kService = HMAC(kRegion, service)
/// kSigning = HMAC(kService, "aws4_request")
/// ```
fn derive_signing_key(secret_key: &str, date_stamp: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac_sha256(
        format!("AWS4{}", secret_key).as_bytes(),
        date_stamp.as_bytes(),
    );
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

/// RFC 3986 URI encoding as required by SigV4 canonical requests.
/// Everything but unreserved characters (`A-Z a-z 0-9 - _ . ~`) is
/// percent-encoded.
fn uri_encode(s: &str) -> String {
    let mut result = String::new();
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(byte as char);
            }
            _ => result.push_str(&format!("%{:02X}", byte)),
        }
    }
    result
}

// ============ ListObjectsV2 XML parsing ============

/// One page of a bucket listing.
struct ListingPage {
    keys: Vec<String>,
    /// Continuation token when the listing is truncated.
    next_token: Option<String>,
}

/// Parse a `ListObjectsV2` response. Directory placeholder keys (ending
/// in `/`) are skipped; they carry no content.
fn parse_listing(xml: &str) -> ListingPage {
    let is_truncated = extract_xml_value(xml, "IsTruncated")
        .map(|v| v == "true")
        .unwrap_or(false);
    let next_token = if is_truncated {
        extract_xml_value(xml, "NextContinuationToken")
    } else {
        None
    };

    let mut keys = Vec::new();
    let mut remaining = xml;
    while let Some(start) = remaining.find("<Contents>") {
        let block_start = start + "<Contents>".len();
        let Some(end) = remaining[block_start..].find("</Contents>") else {
            break;
        };
        let block = &remaining[block_start..block_start + end];

        if let Some(key) = extract_xml_value(block, "Key") {
            if !key.is_empty() && !key.ends_with('/') {
                keys.push(key);
            }
        }

        remaining = &remaining[block_start + end + "</Contents>".len()..];
    }

    ListingPage { keys, next_token }
}

/// Extract the text content of a simple (non-nested) XML tag.
fn extract_xml_value(xml: &str, tag: &str) -> Option<String> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let start = xml.find(&open)? + open.len();
    let end = xml[start..].find(&close)?;
    Some(xml[start..start + end].to_string())
}
