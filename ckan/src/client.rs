//! HTTP client for the CKAN action API.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde_json::Value;
use tracing::instrument;

use crate::error::CatalogError;

pub const DEFAULT_CATALOG_URL: &str = "https://catalogodatos.gub.uy/api/3";

/// Bound applied to every proxy-initiated catalog call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Query parameters of an action call. Ordered so that equal parameter sets
/// always encode the same way.
pub type Params = BTreeMap<String, String>;

/// The subset of CKAN actions this crate talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    PackageSearch,
    PackageShow,
    DatastoreSearch,
    DatastoreSearchSql,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::PackageSearch => "package_search",
            Action::PackageShow => "package_show",
            Action::DatastoreSearch => "datastore_search",
            Action::DatastoreSearchSql => "datastore_search_sql",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single outbound call to the catalog. Implementations never retry;
/// retry and fallback policy belongs to the caller.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Invoke `action` and return the decoded body, which is guaranteed to
    /// carry `success: true` and a `result`.
    async fn call(&self, action: Action, params: &Params) -> Result<Value, CatalogError>;
}

#[derive(Debug, Clone)]
pub struct CatalogClientConfig {
    /// Base URL of the API, e.g. `https://catalogodatos.gub.uy/api/3`.
    pub base_url: String,
    pub timeout: Duration,
    pub user_agent: Option<String>,
}

impl Default for CatalogClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_CATALOG_URL.to_owned(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: None,
        }
    }
}

/// reqwest-backed [CatalogApi].
pub struct CatalogClient {
    http: reqwest::Client,
    config: CatalogClientConfig,
}

impl fmt::Debug for CatalogClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogClient")
            .field("base_url", &self.config.base_url)
            .field("timeout", &self.config.timeout)
            .finish_non_exhaustive()
    }
}

impl CatalogClient {
    pub fn new(config: CatalogClientConfig) -> Result<Self, CatalogError> {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout);
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent);
        }
        let http = builder
            .build()
            .map_err(|e| CatalogError::Transport(e.to_string()))?;

        log::debug!(
            "built catalog client base_url={} timeout={:?}",
            &config.base_url,
            config.timeout
        );
        Ok(Self { http, config })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn action_url(&self, action: Action) -> String {
        format!(
            "{}/action/{}",
            self.config.base_url.trim_end_matches('/'),
            action
        )
    }
}

#[async_trait]
impl CatalogApi for CatalogClient {
    #[instrument(skip(self, params), fields(action = %action))]
    async fn call(&self, action: Action, params: &Params) -> Result<Value, CatalogError> {
        let response = self
            .http
            .get(self.action_url(action))
            .query(params)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;
        decode_envelope(status.as_u16(), &body)
    }
}

/// Decode a `{success, result}` / `{success: false, error}` response body.
///
/// Non-2xx statuses become [CatalogError::Remote], carrying `error.message`
/// when the body has one.
pub fn decode_envelope(status: u16, body: &[u8]) -> Result<Value, CatalogError> {
    let payload = serde_json::from_slice::<Value>(body).ok();

    if !(200..300).contains(&status) {
        let message = payload
            .as_ref()
            .and_then(upstream_message)
            .unwrap_or_else(|| format!("Request failed with status code {}", status));
        return Err(CatalogError::Remote { status, message });
    }

    let payload = payload.ok_or_else(|| CatalogError::shape("response body is not JSON"))?;
    check_envelope(status, payload)
}

/// Validate the `{success, result}` envelope of a 2xx response.
fn check_envelope(status: u16, payload: Value) -> Result<Value, CatalogError> {
    match payload.get("success").and_then(Value::as_bool) {
        Some(true) if payload.get("result").is_some() => Ok(payload),
        Some(true) => Err(CatalogError::shape("response has no result")),
        Some(false) => Err(CatalogError::Remote {
            status,
            message: upstream_message(&payload)
                .unwrap_or_else(|| "CKAN API request failed".to_owned()),
        }),
        None => Err(CatalogError::shape("response has no success flag")),
    }
}

/// `error.message` of a CKAN error envelope, when present.
pub fn upstream_message(payload: &Value) -> Option<String> {
    payload
        .get("error")?
        .get("message")?
        .as_str()
        .map(str::to_owned)
}
