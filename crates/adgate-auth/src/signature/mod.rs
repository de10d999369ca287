//! HMAC signed-request verification
//!
//! Signed requests carry a header of the form
//!
//! ```text
//! authorization: APP 1573504737300:76251c6323fbf6355f23816a4c2e12edfd10672517104763ab1b10f078277f86
//! ```
//!
//! where the digest is the HMAC of the timestamp, the HTTP method, the path
//! with query string, and (for non-empty JSON bodies) the hex MD5 of the
//! compact JSON body.

use adgate_core::config::AuthConfig;
use adgate_core::{Error, Result};
use adgate_crypto::{hmac_hex, hmac_verify, md5_hash, HashAlgorithm};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Reasons a request fails verification; `Display` is the client-facing diagnostic
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Signature header '{0}' is missing")]
    MissingHeader(String),

    #[error("Signature header does not start with identifier '{0}'")]
    WrongIdentifier(String),

    #[error("No unix timestamp in signature header")]
    MissingTimestamp,

    #[error("Signature timestamp is outside the allowed window of {0} seconds")]
    Expired(u64),

    #[error("No digest in signature header")]
    MissingDigest,

    #[error("Signature digest is not valid hex")]
    MalformedDigest,

    #[error("Signature does not match")]
    Mismatch,
}

/// The parts of an HTTP request covered by the signature
#[derive(Debug, Clone, Copy)]
pub struct SignedRequest<'a> {
    pub header: Option<&'a str>,
    pub method: &'a str,
    pub path_and_query: &'a str,
    pub body: Option<&'a Value>,
}

/// Parsed signature header
#[derive(Debug, Clone, PartialEq, Eq)]
struct SignatureHeader<'a> {
    timestamp: &'a str,
    timestamp_ms: i64,
    digest: Vec<u8>,
}

/// Verifier for signed requests
#[derive(Debug, Clone)]
pub struct HmacAuth {
    secret: String,
    algorithm: HashAlgorithm,
    header: String,
    identifier: String,
    max_interval_secs: u64,
}

impl HmacAuth {
    pub fn new(secret: impl Into<String>, algorithm: HashAlgorithm) -> Self {
        let defaults = AuthConfig::default();
        Self {
            secret: secret.into(),
            algorithm,
            header: defaults.header,
            identifier: defaults.identifier,
            max_interval_secs: defaults.max_interval_secs,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Result<Self> {
        config.validate()?;

        let algorithm = config
            .algorithm
            .parse::<HashAlgorithm>()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;

        Ok(Self {
            secret: config.secret.clone(),
            algorithm,
            header: config.header.to_ascii_lowercase(),
            identifier: config.identifier.clone(),
            max_interval_secs: config.max_interval_secs,
        })
    }

    pub fn with_max_interval(mut self, secs: u64) -> Self {
        self.max_interval_secs = secs;
        self
    }

    /// Name of the header carrying the signature
    pub fn header_name(&self) -> &str {
        &self.header
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Verify against the current wall clock
    pub fn verify(&self, request: &SignedRequest<'_>) -> std::result::Result<(), AuthError> {
        self.verify_at(request, chrono::Utc::now().timestamp_millis())
    }

    pub fn verify_at(
        &self,
        request: &SignedRequest<'_>,
        now_ms: i64,
    ) -> std::result::Result<(), AuthError> {
        let header = request
            .header
            .ok_or_else(|| AuthError::MissingHeader(self.header.clone()))?;

        let parsed = self.parse_header(header)?;

        let max_ms = (self.max_interval_secs as i64).saturating_mul(1000);
        if now_ms.saturating_sub(parsed.timestamp_ms).abs() > max_ms {
            return Err(AuthError::Expired(self.max_interval_secs));
        }

        let body_hash = request.body.and_then(content_hash);
        let mut parts: Vec<&[u8]> = vec![
            parsed.timestamp.as_bytes(),
            request.method.as_bytes(),
            request.path_and_query.as_bytes(),
        ];
        if let Some(hash) = &body_hash {
            parts.push(hash.as_bytes());
        }

        debug!(
            method = request.method,
            path = request.path_and_query,
            body_hashed = body_hash.is_some(),
            "Verifying request signature"
        );

        if !hmac_verify(self.algorithm, self.secret.as_bytes(), &parts, &parsed.digest) {
            return Err(AuthError::Mismatch);
        }

        Ok(())
    }

    /// Header value a client would send for this request
    pub fn sign(&self, timestamp_ms: i64, method: &str, path_and_query: &str, body: Option<&Value>) -> String {
        let timestamp = timestamp_ms.to_string();
        let body_hash = body.and_then(content_hash);

        let mut parts: Vec<&[u8]> = vec![
            timestamp.as_bytes(),
            method.as_bytes(),
            path_and_query.as_bytes(),
        ];
        if let Some(hash) = &body_hash {
            parts.push(hash.as_bytes());
        }

        format!(
            "{} {}:{}",
            self.identifier,
            timestamp,
            hmac_hex(self.algorithm, self.secret.as_bytes(), &parts)
        )
    }

    fn parse_header<'a>(&self, header: &'a str) -> std::result::Result<SignatureHeader<'a>, AuthError> {
        let rest = header
            .strip_prefix(self.identifier.as_str())
            .ok_or_else(|| AuthError::WrongIdentifier(self.identifier.clone()))?;

        let (timestamp, digest) = rest.split_once(':').ok_or(AuthError::MissingTimestamp)?;

        let timestamp = timestamp.trim();
        if timestamp.is_empty()
            || timestamp.len() > 13
            || !timestamp.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(AuthError::MissingTimestamp);
        }
        let timestamp_ms = timestamp
            .parse::<i64>()
            .map_err(|_| AuthError::MissingTimestamp)?;

        let digest = digest.trim();
        if digest.is_empty() {
            return Err(AuthError::MissingDigest);
        }
        let digest = hex::decode(digest).map_err(|_| AuthError::MalformedDigest)?;

        Ok(SignatureHeader {
            timestamp,
            timestamp_ms,
            digest,
        })
    }
}

/// MD5 of the compact JSON body, for non-empty objects and arrays only
pub fn content_hash(body: &Value) -> Option<String> {
    let non_empty = match body {
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => false,
    };

    non_empty.then(|| md5_hash(body.to_string().as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const NOW: i64 = 1_700_000_000_000;

    fn auth() -> HmacAuth {
        HmacAuth::new("s3cret", HashAlgorithm::Sha512)
    }

    fn request<'a>(header: Option<&'a str>, body: Option<&'a Value>) -> SignedRequest<'a> {
        SignedRequest {
            header,
            method: "GET",
            path_and_query: "/users?fields=cn",
            body,
        }
    }

    #[test]
    fn test_sign_and_verify() {
        let auth = auth();
        let header = auth.sign(NOW, "GET", "/users?fields=cn", None);
        assert!(header.starts_with("APP 1700000000000:"));

        assert_eq!(auth.verify_at(&request(Some(&header), None), NOW), Ok(()));
    }

    #[test]
    fn test_verify_with_body() {
        let auth = auth();
        let body = json!({ "userName": "jdoe", "enabled": true });
        let header = auth.sign(NOW, "GET", "/users?fields=cn", Some(&body));

        assert_eq!(auth.verify_at(&request(Some(&header), Some(&body)), NOW), Ok(()));

        let tampered = json!({ "userName": "root", "enabled": true });
        assert_eq!(
            auth.verify_at(&request(Some(&header), Some(&tampered)), NOW),
            Err(AuthError::Mismatch)
        );
    }

    #[test]
    fn test_empty_body_is_not_hashed() {
        let auth = auth();
        let header = auth.sign(NOW, "GET", "/users?fields=cn", None);
        let empty = json!({});

        assert_eq!(auth.verify_at(&request(Some(&header), Some(&empty)), NOW), Ok(()));
        assert_eq!(content_hash(&json!([])), None);
        assert_eq!(content_hash(&Value::Null), None);
        assert_eq!(content_hash(&json!("text")), None);
    }

    #[test]
    fn test_content_hash_is_md5_of_compact_json() {
        assert_eq!(
            content_hash(&json!({ "a": 1 })),
            Some(md5_hash(br#"{"a":1}"#))
        );
    }

    #[test]
    fn test_path_and_method_are_covered() {
        let auth = auth();
        let header = auth.sign(NOW, "GET", "/users", None);

        let other_path = SignedRequest {
            header: Some(&header),
            method: "GET",
            path_and_query: "/users?fields=cn",
            body: None,
        };
        assert_eq!(auth.verify_at(&other_path, NOW), Err(AuthError::Mismatch));

        let other_method = SignedRequest {
            header: Some(&header),
            method: "DELETE",
            path_and_query: "/users",
            body: None,
        };
        assert_eq!(auth.verify_at(&other_method, NOW), Err(AuthError::Mismatch));
    }

    #[test]
    fn test_stale_and_future_timestamps() {
        let auth = auth();
        let header = auth.sign(NOW, "GET", "/users?fields=cn", None);

        let within = NOW + 600_000;
        assert_eq!(auth.verify_at(&request(Some(&header), None), within), Ok(()));

        let stale = NOW + 600_001;
        assert_eq!(
            auth.verify_at(&request(Some(&header), None), stale),
            Err(AuthError::Expired(600))
        );

        let early = NOW - 600_001;
        assert_eq!(
            auth.verify_at(&request(Some(&header), None), early),
            Err(AuthError::Expired(600))
        );
    }

    #[test]
    fn test_custom_max_interval() {
        let auth = auth().with_max_interval(60);
        let header = auth.sign(NOW, "GET", "/users?fields=cn", None);

        assert_eq!(auth.verify_at(&request(Some(&header), None), NOW + 60_000), Ok(()));
        assert_eq!(
            auth.verify_at(&request(Some(&header), None), NOW + 60_001),
            Err(AuthError::Expired(60))
        );
        assert_eq!(
            auth.verify_at(&request(Some(&header), None), NOW - 120_000),
            Err(AuthError::Expired(60))
        );
    }

    #[test]
    fn test_wrong_secret() {
        let header = HmacAuth::new("other", HashAlgorithm::Sha512).sign(NOW, "GET", "/users?fields=cn", None);
        assert_eq!(
            auth().verify_at(&request(Some(&header), None), NOW),
            Err(AuthError::Mismatch)
        );
    }

    #[test]
    fn test_malformed_headers() {
        let auth = auth();
        let cases = [
            (None, AuthError::MissingHeader("authorization".into())),
            (Some("HMAC 1700000000000:abcd"), AuthError::WrongIdentifier("APP".into())),
            (Some("APP abcd"), AuthError::MissingTimestamp),
            (Some("APP :abcd"), AuthError::MissingTimestamp),
            (Some("APP 12345678901234:abcd"), AuthError::MissingTimestamp),
            (Some("APP 1700000000000:"), AuthError::MissingDigest),
            (Some("APP 1700000000000:zz"), AuthError::MalformedDigest),
            (Some("APP 1700000000000:abcd"), AuthError::Mismatch),
        ];

        for (header, expected) in cases {
            assert_eq!(auth.verify_at(&request(header, None), NOW), Err(expected), "{:?}", header);
        }
    }

    #[test]
    fn test_from_config() {
        let config = AuthConfig {
            secret: "s3cret".to_string(),
            algorithm: "sha256".to_string(),
            header: "X-Signature".to_string(),
            ..Default::default()
        };

        let auth = HmacAuth::from_config(&config).unwrap();
        assert_eq!(auth.algorithm(), HashAlgorithm::Sha256);
        assert_eq!(auth.header_name(), "x-signature");

        let bad = AuthConfig {
            secret: String::new(),
            ..Default::default()
        };
        assert!(HmacAuth::from_config(&bad).is_err());
    }
}
