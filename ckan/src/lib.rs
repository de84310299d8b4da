//! Client and domain types for CKAN-compatible open-data catalogs.

pub mod actions;
pub mod cache;
pub mod client;
pub mod error;
pub mod types;

pub use actions::{CatalogActions, DatastoreSearch, PackageSearch};
pub use cache::{cache_key, Cache, Clock, ManualClock, NoCache, ResponseCache, SystemClock};
pub use client::{
    decode_envelope, Action, CatalogApi, CatalogClient, CatalogClientConfig, Params, DEFAULT_CATALOG_URL,
    DEFAULT_TIMEOUT,
};
pub use error::{CatalogError, ErrorKind};
pub use types::{Dataset, DatastoreRecords, Field, Organization, Record, Resource, SearchResult};
