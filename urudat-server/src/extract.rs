//! Request extractors whose rejections render as the JSON failure envelope.

use axum::{
    async_trait,
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::ProxyError;

/// Query string deserialized into `T`, taking the first value of a key
/// that appears more than once.
#[derive(Debug, Clone)]
pub struct FirstQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for FirstQuery<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ProxyError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(pairs) = Query::<Vec<(String, String)>>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| ProxyError::Validation(rejection.body_text()))?;

        let mut first = Map::new();
        for (key, value) in pairs {
            first.entry(key).or_insert(Value::String(value));
        }

        serde_json::from_value(Value::Object(first))
            .map(FirstQuery)
            .map_err(|e| ProxyError::Validation(format!("Invalid query string: {}", e)))
    }
}
