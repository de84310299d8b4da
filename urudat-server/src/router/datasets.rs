use crate::{
    api_types::DatasetSearchParams, error::ProxyError, extract::FirstQuery, state::AppState,
};

use axum::{extract::State, Json};
use ckan::CatalogActions;
use serde_json::Value;

/// Proxy for `package_search`. The upstream payload is passed through as is.
#[axum::debug_handler]
pub async fn search_datasets(
    State(app_state): State<AppState>,
    FirstQuery(params): FirstQuery<DatasetSearchParams>,
) -> Result<Json<Value>, ProxyError> {
    let search = params.validate()?;
    log::info!(
        "Proxying dataset search q={:?} rows={} start={} sort={:?}",
        &search.q,
        search.rows,
        search.start,
        &search.sort
    );

    let payload = app_state.catalog.package_search(&search).await?;
    Ok(Json(payload))
}
