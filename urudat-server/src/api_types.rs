//! Types needed by the HTTP surface of the proxy.

use ckan::{DatastoreSearch, PackageSearch};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProxyError;

pub const DEFAULT_QUERY: &str = "*:*";
pub const DEFAULT_SORT: &str = "metadata_modified desc";
pub const DEFAULT_SEARCH_LIMIT: u64 = 10;
pub const DEFAULT_DATASTORE_LIMIT: u64 = 100;

/// Body of every failure response.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorBody {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FailureEnvelope {
    pub success: bool,
    pub error: ErrorBody,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SuccessEnvelope<T> {
    pub success: bool,
    pub result: T,
}

impl<T> SuccessEnvelope<T> {
    pub fn new(result: T) -> Self {
        Self {
            success: true,
            result,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: String,
    /// SQL-path attempts that failed and were recovered or surfaced via the
    /// generic search.
    pub sql_failures: u64,
    /// Requests answered by the generic search after a SQL-path failure.
    pub sql_fallbacks: u64,
}

/// Raw query string of `GET /api/datasets`.
#[derive(Deserialize, Debug, Default, Clone)]
pub struct DatasetSearchParams {
    pub q: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub sort: Option<String>,
}

impl DatasetSearchParams {
    pub fn validate(self) -> Result<PackageSearch, ProxyError> {
        let rows = parse_count("limit", self.limit.as_deref(), DEFAULT_SEARCH_LIMIT)?;
        let start = parse_count("offset", self.offset.as_deref(), 0)?;

        Ok(PackageSearch {
            q: non_empty(self.q).unwrap_or_else(|| DEFAULT_QUERY.to_owned()),
            rows,
            start,
            sort: non_empty(self.sort).unwrap_or_else(|| DEFAULT_SORT.to_owned()),
        })
    }
}

/// Raw query string of `GET /api/datastore`.
#[derive(Deserialize, Debug, Default, Clone)]
pub struct DatastoreParams {
    pub resource_id: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
    /// Comma-separated column list.
    pub fields: Option<String>,
    /// JSON-encoded filter object.
    pub filters: Option<String>,
}

impl DatastoreParams {
    pub fn validate(self) -> Result<DatastoreSearch, ProxyError> {
        let resource_id = non_empty(self.resource_id)
            .ok_or_else(|| ProxyError::Validation("Resource ID is required".to_owned()))?;
        let limit = parse_count("limit", self.limit.as_deref(), DEFAULT_DATASTORE_LIMIT)?;
        let offset = parse_count("offset", self.offset.as_deref(), 0)?;

        let fields = self
            .fields
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|f| !f.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();

        let filters = match non_empty(self.filters) {
            None => None,
            Some(raw) => match serde_json::from_str::<Value>(&raw) {
                Ok(Value::Object(map)) => Some(map),
                _ => {
                    return Err(ProxyError::Validation(
                        "Invalid filters parameter".to_owned(),
                    ))
                }
            },
        };

        Ok(DatastoreSearch {
            resource_id,
            limit,
            offset,
            fields,
            filters,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Parse a paging parameter as a non-negative integer. Absent or blank
/// values take `default`.
pub fn parse_count(name: &str, raw: Option<&str>, default: u64) -> Result<u64, ProxyError> {
    match raw.map(str::trim).filter(|r| !r.is_empty()) {
        None => Ok(default),
        Some(raw) => raw
            .parse::<u64>()
            .map_err(|_| ProxyError::Validation(format!("Invalid {} parameter", name))),
    }
}
