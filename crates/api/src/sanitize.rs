//! Request body sanitization.
//!
//! JSON bodies lose every object key that starts with `$` or contains `.`
//! (operator injection), and `<` / `>` inside strings are escaped.

use axum::{
    Json,
    async_trait,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::app::errors::ApiError;

/// Recursively strip unsafe keys and escape markup in string values.
pub fn sanitize_value(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(key, _)| !key.starts_with('$') && !key.contains('.'))
                .map(|(key, v)| (key, sanitize_value(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize_value).collect()),
        Value::String(s) => Value::String(escape_markup(&s)),
        other => other,
    }
}

fn escape_markup(s: &str) -> String {
    if !s.contains(['<', '>']) {
        return s.to_string();
    }
    s.replace('<', "&lt;").replace('>', "&gt;")
}

/// `Json<T>` that runs [`sanitize_value`] before deserializing and reports
/// failures in the API error envelope.
#[derive(Debug, Clone, Copy, Default)]
pub struct SanitizedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for SanitizedJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(raw) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::Validation(rejection.body_text()))?;

        serde_json::from_value(sanitize_value(raw))
            .map(SanitizedJson)
            .map_err(|e| ApiError::Validation(format!("Invalid request body: {e}")))
    }
}
