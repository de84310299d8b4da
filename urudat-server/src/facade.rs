//! Data access used by the UI layer.
//!
//! Wraps the two proxy routes plus direct catalog calls for dataset detail
//! and field introspection. Every operation goes through the response cache,
//! and every response is shape-checked before it is handed to rendering code.

use std::sync::Arc;

use ckan::{
    cache_key, decode_envelope, Cache, CatalogActions, CatalogApi, CatalogError, Dataset,
    DatastoreRecords, DatastoreSearch, ErrorKind, Field, Params, Resource, ResponseCache,
    SearchResult,
};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::api_types::{DEFAULT_DATASTORE_LIMIT, DEFAULT_QUERY, DEFAULT_SEARCH_LIMIT, DEFAULT_SORT};

/// Uniform error raised by every facade operation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct AppError {
    /// Human-readable message to show inline.
    pub message: String,
    #[source]
    pub detail: CatalogError,
}

impl AppError {
    fn new(fallback_message: &str, detail: CatalogError) -> Self {
        let message = match &detail {
            CatalogError::Remote { message, .. } => message.clone(),
            CatalogError::Shape(_) => "Invalid response format".to_owned(),
            CatalogError::Timeout => "Request timeout".to_owned(),
            CatalogError::Transport(_) => fallback_message.to_owned(),
        };
        log::error!("{}: {}", fallback_message, &detail);
        Self { message, detail }
    }

    pub fn kind(&self) -> ErrorKind {
        self.detail.kind()
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SearchPage {
    pub datasets: Vec<Dataset>,
    pub total: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOptions {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub sort: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordOptions {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub fields: Vec<String>,
    pub filters: Option<Map<String, Value>>,
}

/// Values kept in the facade's cache.
#[derive(Debug, Clone, PartialEq)]
pub enum Cached {
    Search(SearchPage),
    Dataset(Dataset),
    Records(DatastoreRecords),
    Fields(Vec<Field>),
}

/// Outcome of probing a resource's datastore for fields. Independent of the
/// [Resource] it was computed for, which is never modified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreshnessCheck {
    pub resource_id: String,
    pub datastore_live: bool,
    pub message: Option<String>,
}

pub type CacheHandle = Arc<dyn Cache<Cached>>;

/// Records served by the proxy always carry a `records` list, and a `total`
/// that is either left out or numeric.
fn checked_records(result: &Value) -> Result<DatastoreRecords, CatalogError> {
    if !result.get("records").map_or(false, Value::is_array) {
        return Err(CatalogError::Shape("records is not a list".to_owned()));
    }
    if matches!(result.get("total"), Some(total) if !total.is_number()) {
        return Err(CatalogError::Shape("total is not a number".to_owned()));
    }
    DatastoreRecords::from_result(result)
}

pub struct ExplorerClient {
    http: reqwest::Client,
    proxy_url: String,
    catalog: Arc<dyn CatalogApi>,
    cache: CacheHandle,
}

impl ExplorerClient {
    /// `proxy_url` is the origin serving `/api/datasets` and `/api/datastore`.
    pub fn new(proxy_url: impl Into<String>, catalog: Arc<dyn CatalogApi>) -> Self {
        Self::with_cache(
            proxy_url,
            catalog,
            Arc::new(ResponseCache::<Cached>::default()),
        )
    }

    pub fn with_cache(
        proxy_url: impl Into<String>,
        catalog: Arc<dyn CatalogApi>,
        cache: CacheHandle,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            proxy_url: proxy_url.into(),
            catalog,
            cache,
        }
    }

    async fn get_proxy(&self, path: &str, params: &Params) -> Result<Value, CatalogError> {
        let url = format!("{}{}", self.proxy_url.trim_end_matches('/'), path);
        let response = self.http.get(url).query(params).send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        decode_envelope(status, &body)
    }

    pub async fn search_datasets(
        &self,
        query: Option<&str>,
        options: &SearchOptions,
    ) -> Result<SearchPage, AppError> {
        let params = Params::from([
            (
                "q".to_owned(),
                query
                    .filter(|q| !q.trim().is_empty())
                    .unwrap_or(DEFAULT_QUERY)
                    .to_owned(),
            ),
            (
                "limit".to_owned(),
                options.limit.unwrap_or(DEFAULT_SEARCH_LIMIT).to_string(),
            ),
            ("offset".to_owned(), options.offset.unwrap_or(0).to_string()),
            (
                "sort".to_owned(),
                options.sort.as_deref().unwrap_or(DEFAULT_SORT).to_owned(),
            ),
        ]);
        let key = cache_key("datasets", &params);
        if let Some(Cached::Search(page)) = self.cache.get(&key) {
            log::debug!("Returning cached datasets");
            return Ok(page);
        }

        let page = async {
            let payload = self.get_proxy("/api/datasets", &params).await?;
            let result: SearchResult = serde_json::from_value(payload["result"].clone())
                .map_err(|e| CatalogError::Shape(e.to_string()))?;
            Ok::<_, CatalogError>(SearchPage {
                datasets: result.results,
                total: result.count,
            })
        }
        .await
        .map_err(|e| AppError::new("Failed to search datasets", e))?;

        self.cache.put(key, Cached::Search(page.clone()));
        Ok(page)
    }

    pub async fn dataset_details(&self, id: &str) -> Result<Dataset, AppError> {
        let key = cache_key("dataset", &Params::from([("id".to_owned(), id.to_owned())]));
        if let Some(Cached::Dataset(dataset)) = self.cache.get(&key) {
            return Ok(dataset);
        }

        let dataset = self
            .catalog
            .package_show(id)
            .await
            .map_err(|e| AppError::new("Failed to get dataset details", e))?;

        self.cache.put(key, Cached::Dataset(dataset.clone()));
        Ok(dataset)
    }

    pub async fn resource_data(
        &self,
        resource_id: &str,
        options: &RecordOptions,
    ) -> Result<DatastoreRecords, AppError> {
        let params = DatastoreSearch {
            resource_id: resource_id.to_owned(),
            limit: options.limit.unwrap_or(DEFAULT_DATASTORE_LIMIT),
            offset: options.offset.unwrap_or(0),
            fields: options.fields.clone(),
            filters: options.filters.clone(),
        }
        .to_params();
        let key = cache_key("resource", &params);
        if let Some(Cached::Records(records)) = self.cache.get(&key) {
            log::debug!("Returning cached resource data");
            return Ok(records);
        }

        let records = async {
            let payload = self.get_proxy("/api/datastore", &params).await?;
            checked_records(&payload["result"])
        }
        .await
        .map_err(|e| AppError::new("Failed to get resource data", e))?;

        self.cache.put(key, Cached::Records(records.clone()));
        Ok(records)
    }

    /// Columns of the resource's datastore table, probed with `limit=0`.
    pub async fn resource_fields(&self, resource_id: &str) -> Result<Vec<Field>, AppError> {
        let key = cache_key(
            "fields",
            &Params::from([("resource_id".to_owned(), resource_id.to_owned())]),
        );
        if let Some(Cached::Fields(fields)) = self.cache.get(&key) {
            log::debug!("Returning cached fields");
            return Ok(fields);
        }

        let probe = DatastoreSearch {
            resource_id: resource_id.to_owned(),
            limit: 0,
            ..Default::default()
        };
        let fields = self
            .catalog
            .datastore_search(&probe)
            .await
            .map(|records| records.fields)
            .map_err(|e| AppError::new("Failed to get resource fields", e))?;

        self.cache.put(key, Cached::Fields(fields.clone()));
        Ok(fields)
    }

    /// Verify against the live datastore that the resource really has
    /// queryable columns.
    pub async fn check_resource(&self, resource: &Resource) -> FreshnessCheck {
        let outcome = if !resource.datastore_active {
            Err("resource has no active datastore".to_owned())
        } else {
            match self.resource_fields(&resource.id).await {
                Ok(fields) if fields.iter().any(|f| !f.is_internal()) => Ok(()),
                Ok(_) => Err("no fields found for resource".to_owned()),
                Err(err) => Err(err.message),
            }
        };

        FreshnessCheck {
            resource_id: resource.id.clone(),
            datastore_live: outcome.is_ok(),
            message: outcome.err(),
        }
    }
}
