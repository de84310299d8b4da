use crate::{
    api_types::{DatastoreParams, SuccessEnvelope},
    error::ProxyError,
    extract::FirstQuery,
    state::AppState,
};

use axum::{extract::State, Json};
use ckan::DatastoreRecords;

/// Records of a datastore-backed resource, normalized to `{fields, records, total}`.
#[axum::debug_handler]
pub async fn read_datastore(
    State(app_state): State<AppState>,
    FirstQuery(params): FirstQuery<DatastoreParams>,
) -> Result<Json<SuccessEnvelope<DatastoreRecords>>, ProxyError> {
    let search = params.validate()?;
    let records = app_state.resolver.resolve(&search).await?;

    log::debug!(
        "datastore read resource={} fields={} records={} total={}",
        &search.resource_id,
        records.fields.len(),
        records.records.len(),
        records.total
    );
    Ok(Json(SuccessEnvelope::new(records)))
}
