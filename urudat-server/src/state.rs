use std::sync::Arc;

use ckan::CatalogApi;

use crate::resolver::DatastoreResolver;

pub type CatalogHandle = Arc<dyn CatalogApi>;
type ResolverHandle = Arc<DatastoreResolver>;

#[derive(Clone)]
pub struct AppState {
    pub catalog: CatalogHandle,
    pub resolver: ResolverHandle,
}

impl AppState {
    pub fn new(catalog: CatalogHandle) -> Self {
        let resolver = Arc::new(DatastoreResolver::new(Arc::clone(&catalog)));
        Self { catalog, resolver }
    }
}
