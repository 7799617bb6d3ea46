//! Strips store-operator keys from JSON request bodies.

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::AppError;

/// Removes, at any depth, object keys that start with `$` or contain `.`.
/// Returns how many keys were dropped.
pub fn sanitize(value: &mut Value) -> usize {
    match value {
        Value::Object(map) => {
            let before = map.len();
            map.retain(|key, _| !key.starts_with('$') && !key.contains('.'));
            let mut removed = before - map.len();
            for nested in map.values_mut() {
                removed += sanitize(nested);
            }
            removed
        }
        Value::Array(items) => items.iter_mut().map(sanitize).sum(),
        _ => 0,
    }
}

/// JSON body extractor that sanitizes before deserializing into `T`.
pub struct SanitizedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for SanitizedJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(mut value) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;

        let removed = sanitize(&mut value);
        if removed > 0 {
            tracing::warn!(removed, "Stripped operator keys from request body");
        }

        let parsed = serde_json::from_value(value)
            .map_err(|e| AppError::BadRequest(format!("Invalid request body: {}", e)))?;
        Ok(Self(parsed))
    }
}
