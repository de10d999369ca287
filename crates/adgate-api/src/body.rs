//! Request body reading and coercion

use axum::{
    extract::{FromRequest, Request},
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::respond::Failure;

/// Fields of an endpoint that carry boolean semantics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodySchema {
    pub booleans: &'static [&'static str],
}

impl BodySchema {
    /// User writes: `enabled` and `passwordExpires` accept "true"/"false"
    pub const USER: BodySchema = BodySchema {
        booleans: &["enabled", "passwordExpires"],
    };

    /// No coercion
    pub const PLAIN: BodySchema = BodySchema { booleans: &[] };
}

/// Parse string bodies as JSON and turn "true"/"false" into booleans for the
/// schema's fields. Never fails; anything it cannot handle passes through.
pub fn coerce_body(body: Value, schema: &BodySchema) -> Value {
    match body {
        Value::String(raw) => serde_json::from_str(&raw).unwrap_or(Value::String(raw)),
        Value::Object(mut map) => {
            for name in schema.booleans {
                if let Some(value) = map.get_mut(*name) {
                    match value.as_str() {
                        Some("true") => *value = Value::Bool(true),
                        Some("false") => *value = Value::Bool(false),
                        _ => {}
                    }
                }
            }
            Value::Object(map)
        }
        other => other,
    }
}

/// Interpret raw body bytes according to the content type
pub fn read_body(content_type: Option<&str>, bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }

    let mime = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|m| m.trim().to_ascii_lowercase())
        .unwrap_or_default();

    if mime == "application/json" || mime.ends_with("+json") {
        if let Ok(value) = serde_json::from_slice(bytes) {
            return value;
        }
    } else if mime == "application/x-www-form-urlencoded" {
        if let Ok(pairs) = serde_urlencoded::from_bytes::<Vec<(String, String)>>(bytes) {
            return Value::Object(
                pairs
                    .into_iter()
                    .map(|(k, v)| (k, Value::String(v)))
                    .collect(),
            );
        }
    }

    Value::String(String::from_utf8_lossy(bytes).into_owned())
}

/// Coerce and deserialize a body into a typed input
pub fn decode<T: DeserializeOwned>(body: Value, schema: &BodySchema) -> Result<T, Failure> {
    let body = match coerce_body(body, schema) {
        Value::Null => Value::Object(Map::new()),
        other => other,
    };

    serde_json::from_value(body)
        .map_err(|e| Failure::bad_request(format!("Invalid request body: {}", e)))
}

/// Extractor yielding the request body as JSON
#[derive(Debug, Clone)]
pub struct Input(pub Value);

impl<S> FromRequest<S> for Input
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(IntoResponse::into_response)?;

        Ok(Input(read_body(content_type.as_deref(), &bytes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adgate_core::types::{NewUser, UserUpdate};
    use serde_json::json;

    #[test]
    fn test_coerce_booleans() {
        assert_eq!(
            coerce_body(json!({ "enabled": "true" }), &BodySchema::USER),
            json!({ "enabled": true })
        );
        assert_eq!(
            coerce_body(json!({ "passwordExpires": "false", "title": "true" }), &BodySchema::USER),
            json!({ "passwordExpires": false, "title": "true" })
        );
        assert_eq!(
            coerce_body(json!({ "enabled": "maybe" }), &BodySchema::USER),
            json!({ "enabled": "maybe" })
        );
    }

    #[test]
    fn test_plain_schema_leaves_strings() {
        assert_eq!(
            coerce_body(json!({ "enabled": "true" }), &BodySchema::PLAIN),
            json!({ "enabled": "true" })
        );
    }

    #[test]
    fn test_coerce_string_bodies() {
        assert_eq!(
            coerce_body(json!(r#"{"userName":"jdoe"}"#), &BodySchema::USER),
            json!({ "userName": "jdoe" })
        );
        assert_eq!(
            coerce_body(json!("not valid json{"), &BodySchema::USER),
            json!("not valid json{")
        );
        assert_eq!(coerce_body(json!(42), &BodySchema::USER), json!(42));
    }

    #[test]
    fn test_read_body() {
        assert_eq!(read_body(Some("application/json"), b""), Value::Null);
        assert_eq!(
            read_body(Some("application/json; charset=utf-8"), br#"{"a":1}"#),
            json!({ "a": 1 })
        );
        assert_eq!(
            read_body(
                Some("application/x-www-form-urlencoded"),
                b"userName=jdoe&enabled=true"
            ),
            json!({ "userName": "jdoe", "enabled": "true" })
        );
        assert_eq!(read_body(Some("text/plain"), b"hello"), json!("hello"));
        assert_eq!(read_body(None, br#"{"a":1}"#), json!(r#"{"a":1}"#));
    }

    #[test]
    fn test_decode_form_user() {
        let body = read_body(
            Some("application/x-www-form-urlencoded"),
            b"userName=jdoe&enabled=false&passwordExpires=true",
        );
        let user: NewUser = decode(body, &BodySchema::USER).unwrap();
        assert_eq!(user.user_name, "jdoe");
        assert_eq!(user.enabled, Some(false));
        assert_eq!(user.password_expires, Some(true));
    }

    #[test]
    fn test_decode_user_with_both_password_keys() {
        let body = json!({ "userName": "jdoe", "pass": "a", "password": "a" });
        let user: NewUser = decode(body, &BodySchema::USER).unwrap();
        assert_eq!(user.initial_password(), Some("a"));
    }

    #[test]
    fn test_decode_failures() {
        let err = decode::<NewUser>(json!({ "firstName": "Jane" }), &BodySchema::USER).unwrap_err();
        assert_eq!(err.status, Some(400));

        let err = decode::<UserUpdate>(json!({ "enabled": "maybe" }), &BodySchema::USER).unwrap_err();
        assert_eq!(err.status, Some(400));

        let update: UserUpdate = decode(Value::Null, &BodySchema::USER).unwrap();
        assert!(update.is_empty());
    }
}
