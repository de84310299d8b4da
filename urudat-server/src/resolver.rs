//! Resolution of datastore reads: SQL first, generic search as fallback.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use ckan::{CatalogActions, CatalogError, DatastoreRecords, DatastoreSearch};
use thiserror::Error;
use tracing::instrument;

use crate::sql::{select_statement, SqlError};
use crate::state::CatalogHandle;

/// Value produced by [with_fallback], along with the primary stage's error
/// when the fallback had to run.
#[derive(Debug)]
pub struct Resolved<T, E> {
    pub value: T,
    pub primary_error: Option<E>,
}

#[derive(Debug)]
pub struct FallbackFailed<E1, E2> {
    pub primary: E1,
    pub fallback: E2,
}

/// Run `primary`; only if it fails, run `fallback`. The stages never overlap.
pub async fn with_fallback<T, E1, E2, P, F, Fut>(
    primary: P,
    fallback: F,
) -> Result<Resolved<T, E1>, FallbackFailed<E1, E2>>
where
    P: Future<Output = Result<T, E1>>,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E2>>,
{
    let primary_error = match primary.await {
        Ok(value) => {
            return Ok(Resolved {
                value,
                primary_error: None,
            })
        }
        Err(err) => err,
    };

    match fallback().await {
        Ok(value) => Ok(Resolved {
            value,
            primary_error: Some(primary_error),
        }),
        Err(fallback) => Err(FallbackFailed {
            primary: primary_error,
            fallback,
        }),
    }
}

/// Why the SQL stage did not produce records.
#[derive(Debug, Error)]
pub enum SqlStageError {
    #[error(transparent)]
    Statement(#[from] SqlError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

#[derive(Debug, Default)]
pub struct ResolverStats {
    sql_failures: AtomicU64,
    sql_fallbacks: AtomicU64,
}

impl ResolverStats {
    pub fn sql_failures(&self) -> u64 {
        self.sql_failures.load(Ordering::Relaxed)
    }

    pub fn sql_fallbacks(&self) -> u64 {
        self.sql_fallbacks.load(Ordering::Relaxed)
    }
}

pub struct DatastoreResolver {
    catalog: CatalogHandle,
    stats: ResolverStats,
}

impl fmt::Debug for DatastoreResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatastoreResolver")
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl DatastoreResolver {
    pub fn new(catalog: CatalogHandle) -> Self {
        Self {
            catalog,
            stats: ResolverStats::default(),
        }
    }

    pub fn stats(&self) -> &ResolverStats {
        &self.stats
    }

    async fn query_sql(&self, search: &DatastoreSearch) -> Result<DatastoreRecords, SqlStageError> {
        let sql = select_statement(search)?;
        log::debug!("datastore_search_sql: {}", &sql);
        Ok(self.catalog.datastore_search_sql(&sql).await?)
    }

    /// Records `offset..offset + limit` of the resource. A failing SQL stage
    /// is logged and counted, never surfaced; if the generic search fails
    /// too, its error is returned.
    #[instrument(skip_all, fields(resource_id = %search.resource_id, limit = search.limit, offset = search.offset))]
    pub async fn resolve(&self, search: &DatastoreSearch) -> Result<DatastoreRecords, CatalogError> {
        let outcome = with_fallback(self.query_sql(search), || {
            self.catalog.datastore_search(search)
        })
        .await;

        match outcome {
            Ok(Resolved {
                value,
                primary_error: None,
            }) => Ok(value),
            Ok(Resolved {
                value,
                primary_error: Some(sql_error),
            }) => {
                self.note_sql_failure(search, &sql_error);
                self.stats.sql_fallbacks.fetch_add(1, Ordering::Relaxed);
                Ok(value)
            }
            Err(FallbackFailed { primary, fallback }) => {
                self.note_sql_failure(search, &primary);
                Err(fallback)
            }
        }
    }

    fn note_sql_failure(&self, search: &DatastoreSearch, err: &SqlStageError) {
        let failures = self.stats.sql_failures.fetch_add(1, Ordering::Relaxed) + 1;
        log::warn!(
            "SQL endpoint failed for resource {}, falling back to datastore_search: {} (failures so far: {})",
            &search.resource_id,
            err,
            failures
        );
    }
}
