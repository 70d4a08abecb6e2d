//! AWS Signature Version 4 request signing.
//!
//! Pure-Rust implementation on top of `hmac` + `sha2`. The signer only
//! computes headers; attaching them (and making sure nothing changes
//! afterwards) is the job of [`WriteRequest::sign`](crate::writer::WriteRequest::sign).
//!
//! # Credentials
//!
//! Credentials are resolved per invocation through a [`CredentialProvider`].
//! [`EnvCredentialProvider`] reads the variables the execution environment
//! injects:
//! - `AWS_ACCESS_KEY_ID` — required
//! - `AWS_SECRET_ACCESS_KEY` — required
//! - `AWS_SESSION_TOKEN` — optional (temporary credentials / IAM roles)
//!
//! # Algorithm
//!
//! ```text
//! CanonicalRequest = METHOD \n URI \n QUERY \n HEADERS \n SIGNED_HEADERS \n hex(sha256(body))
//! StringToSign     = "AWS4-HMAC-SHA256" \n amzDate \n scope \n hex(sha256(CanonicalRequest))
//! scope            = date/region/service/aws4_request
//! Signature        = hex(HMAC(kSigning, StringToSign))
//! ```

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

// ============ Credentials ============

/// Time-scoped AWS credentials.
#[derive(Clone)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Credentials {
    /// Load credentials from `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`,
    /// and optionally `AWS_SESSION_TOKEN`.
    pub fn from_env() -> Result<Self> {
        let access_key_id = std::env::var("AWS_ACCESS_KEY_ID")
            .context("AWS_ACCESS_KEY_ID environment variable not set")?;
        let secret_access_key = std::env::var("AWS_SECRET_ACCESS_KEY")
            .context("AWS_SECRET_ACCESS_KEY environment variable not set")?;
        let session_token = std::env::var("AWS_SESSION_TOKEN").ok();

        Ok(Self {
            access_key_id,
            secret_access_key,
            session_token,
        })
    }
}

/// Source of signing credentials.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn credentials(&self) -> Result<Credentials>;
}

/// Reads credentials from the process environment on every call, so
/// rotated session credentials are picked up.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvCredentialProvider;

#[async_trait]
impl CredentialProvider for EnvCredentialProvider {
    async fn credentials(&self) -> Result<Credentials> {
        Credentials::from_env()
    }
}

/// Always hands out the same credentials.
#[derive(Debug, Clone)]
pub struct StaticCredentialProvider(pub Credentials);

#[async_trait]
impl CredentialProvider for StaticCredentialProvider {
    async fn credentials(&self) -> Result<Credentials> {
        Ok(self.0.clone())
    }
}

// ============ Signing ============

/// Everything the signature covers.
#[derive(Debug)]
pub struct SigningInput<'a> {
    pub method: &'a str,
    pub host: &'a str,
    /// Request path, already percent-encoded for the wire.
    pub path: &'a str,
    pub headers: &'a [(String, String)],
    pub body: &'a [u8],
}

/// Region and service the credential scope is bound to.
#[derive(Debug, Clone, Copy)]
pub struct SigningScope<'a> {
    pub region: &'a str,
    pub service: &'a str,
}

/// Compute the authentication headers for `input`.
///
/// Returns `x-amz-date`, `x-amz-security-token` (if the credentials carry
/// a session token) and `Authorization`, in that order.
pub fn sign(
    input: &SigningInput<'_>,
    creds: &Credentials,
    scope: SigningScope<'_>,
    now: DateTime<Utc>,
) -> Vec<(String, String)> {
    let date_stamp = now.format("%Y%m%d").to_string();
    let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();

    let mut added = vec![("x-amz-date".to_string(), amz_date.clone())];
    if let Some(ref token) = creds.session_token {
        added.push(("x-amz-security-token".to_string(), token.clone()));
    }

    let mut headers: Vec<(String, String)> = input
        .headers
        .iter()
        .chain(added.iter())
        .map(|(k, v)| (k.to_ascii_lowercase(), v.trim().to_string()))
        .filter(|(k, _)| k != "host")
        .collect();
    headers.push(("host".to_string(), input.host.to_string()));
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
        "{}\n{}\n\n{}\n{}\n{}",
        input.method,
        canonical_uri(input.path, scope.service),
        canonical_headers,
        signed_headers,
        hex_sha256(input.body)
    );

    let credential_scope = format!(
        "{}/{}/{}/aws4_request",
        date_stamp, scope.region, scope.service
    );
    let string_to_sign = format!(
        "{}\n{}\n{}\n{}",
        ALGORITHM,
        amz_date,
        credential_scope,
        hex_sha256(canonical_request.as_bytes())
    );

    let signing_key = derive_signing_key(
        &creds.secret_access_key,
        &date_stamp,
        scope.region,
        scope.service,
    );
    let signature = hex_hmac_sha256(&signing_key, string_to_sign.as_bytes());

    added.push((
        "authorization".to_string(),
        format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            ALGORITHM, creds.access_key_id, credential_scope, signed_headers, signature
        ),
    ));
    added
}

/// Canonical URI of an already-encoded path.
///
/// S3 signs the path as sent; every other service expects each segment to
/// be encoded a second time.
fn canonical_uri(path: &str, service: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }
    if service == "s3" {
        return path.to_string();
    }
    path.split('/').map(uri_encode).collect::<Vec<_>>().join("/")
}

/// Lowercase hex digest, as used for the payload hash and the hashed
/// canonical request.
pub fn hex_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// One link of the signing-key chain.
fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn hex_hmac_sha256(key: &[u8], data: &[u8]) -> String {
    hex::encode(hmac_sha256(key, data))
}

/// Key that signs every request for one credential scope day.
///
/// The secret is folded through `YYYYMMDD`, region, service and the literal
/// `aws4_request`, each step keyed by the previous digest.
pub fn derive_signing_key(
    secret_key: &str,
    date_stamp: &str,
    region: &str,
    service: &str,
) -> Vec<u8> {
    let k_date = hmac_sha256(
        format!("AWS4{}", secret_key).as_bytes(),
        date_stamp.as_bytes(),
    );
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

/// Percent-encodes one path segment (or a whole value). Only ASCII
/// letters, digits and `-_.~` pass through; `/` is encoded too.
pub fn uri_encode(s: &str) -> String {
    let mut result = String::new();
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(byte as char);
            }
            _ => {
                result.push_str(&format!("%{:02X}", byte));
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SECRET: &str = "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY";

    fn creds(token: Option<&str>) -> Credentials {
        Credentials {
            access_key_id: "AKIDEXAMPLE".to_string(),
            secret_access_key: SECRET.to_string(),
            session_token: token.map(str::to_string),
        }
    }

    fn header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
        headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn signing_key_matches_aws_example() {
        let key = derive_signing_key(SECRET, "20120215", "us-east-1", "iam");
        assert_eq!(
            hex::encode(key),
            "f4780e2d9f65fa895f9c67b32ce1baf0b0d8a43505a000a1a9e090d414db404d"
        );
    }

    #[test]
    fn empty_body_hash() {
        assert_eq!(
            hex_sha256(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn uri_encode_keeps_unreserved() {
        assert_eq!(uri_encode("abc-1_2.3~"), "abc-1_2.3~");
        assert_eq!(uri_encode("a b/c"), "a%20b%2Fc");
    }

    #[test]
    fn canonical_uri_double_encodes_outside_s3() {
        assert_eq!(canonical_uri("/idx/_doc/a%20b", "es"), "/idx/_doc/a%2520b");
        assert_eq!(canonical_uri("/idx/_doc/a%20b", "s3"), "/idx/_doc/a%20b");
        assert_eq!(canonical_uri("", "es"), "/");
    }

    #[test]
    fn signs_put_request() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 15, 2).unwrap();
        let headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        let input = SigningInput {
            method: "PUT",
            host: "search.example.com",
            path: "/sns-2026.03.01/_doc/abc-1",
            headers: &headers,
            body: br#"{"a":1}"#,
        };
        let scope = SigningScope {
            region: "eu-west-1",
            service: "es",
        };

        let added = sign(&input, &creds(None), scope, now);

        assert_eq!(header(&added, "x-amz-date"), Some("20260301T091502Z"));
        assert_eq!(header(&added, "x-amz-security-token"), None);
        assert_eq!(
            header(&added, "authorization"),
            Some(
                "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20260301/eu-west-1/es/aws4_request, \
                 SignedHeaders=content-type;host;x-amz-date, \
                 Signature=87c1f0a45495b6c55dfb66cbd6bf90cd83c4fb4c8b0a6a2963e68441936ccadf"
            )
        );
    }

    #[test]
    fn get_vanilla_matches_aws_suite() {
        let now = Utc.with_ymd_and_hms(2015, 8, 30, 12, 36, 0).unwrap();
        let input = SigningInput {
            method: "GET",
            host: "example.amazonaws.com",
            path: "/",
            headers: &[],
            body: b"",
        };
        let scope = SigningScope {
            region: "us-east-1",
            service: "service",
        };

        let added = sign(&input, &creds(None), scope, now);

        assert_eq!(header(&added, "x-amz-date"), Some("20150830T123600Z"));
        assert_eq!(
            header(&added, "authorization"),
            Some(
                "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20150830/us-east-1/service/aws4_request, \
                 SignedHeaders=host;x-amz-date, \
                 Signature=5fa00fa31553b73ebf1942676e86291e8372ff2a2260956d9b8aae1d763fbf31"
            )
        );
    }

    #[test]
    fn session_token_is_signed() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 15, 2).unwrap();
        let input = SigningInput {
            method: "PUT",
            host: "search.example.com",
            path: "/sns-2026.03.01/_doc/abc-1",
            headers: &[],
            body: b"{}",
        };
        let scope = SigningScope {
            region: "eu-west-1",
            service: "es",
        };

        let added = sign(&input, &creds(Some("TOKEN")), scope, now);
        assert_eq!(header(&added, "x-amz-security-token"), Some("TOKEN"));
        let auth = header(&added, "authorization").unwrap();
        assert!(auth.contains("SignedHeaders=host;x-amz-date;x-amz-security-token,"));
    }

    #[test]
    fn signature_covers_body() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 15, 2).unwrap();
        let scope = SigningScope {
            region: "eu-west-1",
            service: "es",
        };
        let sign_body = |body: &[u8]| {
            let input = SigningInput {
                method: "PUT",
                host: "search.example.com",
                path: "/idx/_doc/1",
                headers: &[],
                body,
            };
            sign(&input, &creds(None), scope, now)
        };

        assert_ne!(
            header(&sign_body(b"{\"a\":1}"), "authorization"),
            header(&sign_body(b"{\"a\":2}"), "authorization")
        );
    }

    #[test]
    fn credentials_debug_redacts_secret() {
        let debug = format!("{:?}", creds(Some("TOKEN")));
        assert!(debug.contains("AKIDEXAMPLE"));
        assert!(!debug.contains(SECRET));
        assert!(!debug.contains("TOKEN"));
    }
}
