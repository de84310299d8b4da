//! Typed wrappers over the raw action calls.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::client::{Action, CatalogApi, Params};
use crate::error::CatalogError;
use crate::types::{Dataset, DatastoreRecords};

/// Parameters of a `package_search` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSearch {
    pub q: String,
    pub rows: u64,
    pub start: u64,
    pub sort: String,
}

impl PackageSearch {
    pub fn to_params(&self) -> Params {
        Params::from([
            ("q".to_owned(), self.q.clone()),
            ("rows".to_owned(), self.rows.to_string()),
            ("start".to_owned(), self.start.to_string()),
            ("sort".to_owned(), self.sort.clone()),
        ])
    }
}

/// Parameters of a `datastore_search` call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DatastoreSearch {
    pub resource_id: String,
    pub limit: u64,
    pub offset: u64,
    /// Columns to project; empty means all of them.
    pub fields: Vec<String>,
    /// Equality filters, sent JSON-encoded.
    pub filters: Option<Map<String, Value>>,
}

impl DatastoreSearch {
    pub fn to_params(&self) -> Params {
        let mut params = Params::from([
            ("resource_id".to_owned(), self.resource_id.clone()),
            ("limit".to_owned(), self.limit.to_string()),
            ("offset".to_owned(), self.offset.to_string()),
        ]);
        if !self.fields.is_empty() {
            params.insert("fields".to_owned(), self.fields.join(","));
        }
        if let Some(filters) = &self.filters {
            params.insert(
                "filters".to_owned(),
                Value::Object(filters.clone()).to_string(),
            );
        }
        params
    }
}

fn take_result(mut payload: Value) -> Value {
    payload
        .get_mut("result")
        .map(Value::take)
        .unwrap_or(Value::Null)
}

/// Typed action helpers available on every [CatalogApi].
#[async_trait]
pub trait CatalogActions {
    /// Raw `package_search` payload, envelope included.
    async fn package_search(&self, search: &PackageSearch) -> Result<Value, CatalogError>;

    async fn package_show(&self, id: &str) -> Result<Dataset, CatalogError>;

    async fn datastore_search(
        &self,
        search: &DatastoreSearch,
    ) -> Result<DatastoreRecords, CatalogError>;

    async fn datastore_search_sql(&self, sql: &str) -> Result<DatastoreRecords, CatalogError>;
}

#[async_trait]
impl<T> CatalogActions for T
where
    T: CatalogApi + ?Sized,
{
    async fn package_search(&self, search: &PackageSearch) -> Result<Value, CatalogError> {
        self.call(Action::PackageSearch, &search.to_params()).await
    }

    async fn package_show(&self, id: &str) -> Result<Dataset, CatalogError> {
        let params = Params::from([("id".to_owned(), id.to_owned())]);
        let payload = self.call(Action::PackageShow, &params).await?;
        serde_json::from_value(take_result(payload))
            .map_err(|e| CatalogError::Shape(e.to_string()))
    }

    async fn datastore_search(
        &self,
        search: &DatastoreSearch,
    ) -> Result<DatastoreRecords, CatalogError> {
        let payload = self
            .call(Action::DatastoreSearch, &search.to_params())
            .await?;
        DatastoreRecords::from_result(&take_result(payload))
    }

    async fn datastore_search_sql(&self, sql: &str) -> Result<DatastoreRecords, CatalogError> {
        let params = Params::from([("sql".to_owned(), sql.to_owned())]);
        let payload = self.call(Action::DatastoreSearchSql, &params).await?;
        DatastoreRecords::from_result(&take_result(payload))
    }
}
