use axum::{extract::State, routing::get, Json, Router};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{api_types::HealthResponse, state::AppState};

pub mod datasets;
pub mod datastore;

async fn healthz(State(app_state): State<AppState>) -> Json<HealthResponse> {
    let stats = app_state.resolver.stats();
    Json(HealthResponse {
        status: "healthy".to_string(),
        sql_failures: stats.sql_failures(),
        sql_fallbacks: stats.sql_fallbacks(),
    })
}

/// Main router for the application, with the proxy and health endpoints attached
pub fn app_router() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(healthz))
        //
        // Catalog proxy
        //
        .route("/api/datasets", get(datasets::search_datasets))
        .route("/api/datastore", get(datastore::read_datastore))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                //
                // Enable all of the CORS flags
                //
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_headers(Any)
                        .allow_methods(Any),
                ),
        )
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use ckan::{Action, CatalogClient, CatalogClientConfig, CatalogError};
    use httpmock::MockServer;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::fake_catalog::FakeCatalog;

    async fn get_json(catalog: Arc<FakeCatalog>, uri: &str) -> (StatusCode, Value) {
        let app = app_router().with_state(AppState::new(catalog));
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn search_payload() -> Value {
        json!({
            "help": "https://catalogodatos.gub.uy/api/3/action/help_show?name=package_search",
            "success": true,
            "result": {"count": 1, "results": [{"id": "d1", "name": "agua"}]}
        })
    }

    #[tokio::test]
    async fn datasets_pass_through_upstream_payload() {
        let catalog =
            Arc::new(FakeCatalog::new().respond(Action::PackageSearch, Ok(search_payload())));
        let (status, body) = get_json(catalog.clone(), "/api/datasets?q=agua&limit=5&offset=15").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, search_payload());

        let calls = catalog.calls();
        assert_eq!(calls.len(), 1);
        let params = &calls[0].1;
        assert_eq!(params["q"], "agua");
        assert_eq!(params["rows"], "5");
        assert_eq!(params["start"], "15");
        assert_eq!(params["sort"], "metadata_modified desc");
    }

    #[tokio::test]
    async fn datasets_forward_defaults() {
        let catalog =
            Arc::new(FakeCatalog::new().respond(Action::PackageSearch, Ok(search_payload())));
        get_json(catalog.clone(), "/api/datasets").await;

        let params = &catalog.calls()[0].1;
        assert_eq!(params["q"], "*:*");
        assert_eq!(params["rows"], "10");
        assert_eq!(params["start"], "0");
    }

    #[tokio::test]
    async fn datasets_reject_negative_limit_without_calling_upstream() {
        let catalog = Arc::new(FakeCatalog::new());
        let (status, body) = get_json(catalog.clone(), "/api/datasets?limit=-1").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({"success": false, "error": {"message": "Invalid limit parameter"}})
        );
        assert!(catalog.calls().is_empty());
    }

    #[tokio::test]
    async fn datasets_reject_non_numeric_offset() {
        let catalog = Arc::new(FakeCatalog::new());
        let (status, body) = get_json(catalog.clone(), "/api/datasets?offset=abc").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "Invalid offset parameter");
        assert!(catalog.calls().is_empty());
    }

    #[tokio::test]
    async fn datasets_map_upstream_failures() {
        let catalog = Arc::new(FakeCatalog::new().respond(
            Action::PackageSearch,
            Err(CatalogError::Remote {
                status: 409,
                message: "Search error: bad query".to_owned(),
            }),
        ));
        let (status, body) = get_json(catalog, "/api/datasets?q=((").await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(
            body,
            json!({
                "success": false,
                "error": {"message": "Search error: bad query", "status": 409}
            })
        );

        let catalog =
            Arc::new(FakeCatalog::new().respond(Action::PackageSearch, Err(CatalogError::Timeout)));
        let (status, body) = get_json(catalog, "/api/datasets").await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body["error"]["message"], "Request timeout");

        let catalog = Arc::new(FakeCatalog::new().respond(
            Action::PackageSearch,
            Err(CatalogError::Transport("dns error".to_owned())),
        ));
        let (status, body) = get_json(catalog, "/api/datasets").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["message"], "Internal server error");
    }

    #[tokio::test]
    async fn repeated_query_keys_take_the_first_value() {
        let catalog =
            Arc::new(FakeCatalog::new().respond(Action::PackageSearch, Ok(search_payload())));
        let (status, _) = get_json(catalog.clone(), "/api/datasets?limit=1&limit=2&q=a&q=b").await;

        assert_eq!(status, StatusCode::OK);
        let params = &catalog.calls()[0].1;
        assert_eq!(params["rows"], "1");
        assert_eq!(params["q"], "a");

        let catalog = Arc::new(FakeCatalog::new());
        let (status, body) =
            get_json(catalog.clone(), "/api/datastore?resource_id=abc&limit=-1&limit=5").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({"success": false, "error": {"message": "Invalid limit parameter"}})
        );
        assert!(catalog.calls().is_empty());
    }

    #[tokio::test]
    async fn unsuccessful_upstream_body_maps_to_bad_gateway() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.path("/api/3/action/package_search");
            then.status(200).json_body(json!({
                "success": false,
                "error": {"message": "Access denied", "__type": "Authorization Error"}
            }));
        });
        let catalog = CatalogClient::new(CatalogClientConfig {
            base_url: server.url("/api/3"),
            ..Default::default()
        })
        .unwrap();
        let app = app_router().with_state(AppState::new(Arc::new(catalog)));

        let response = app
            .oneshot(Request::builder().uri("/api/datasets").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            body,
            json!({"success": false, "error": {"message": "Access denied"}})
        );
        mock.assert();
    }

    #[tokio::test]
    async fn unsuccessful_upstream_body_without_message() {
        let catalog = Arc::new(FakeCatalog::new().respond(
            Action::DatastoreSearch,
            Err(CatalogError::Remote {
                status: 200,
                message: "CKAN API request failed".to_owned(),
            }),
        ));
        let (status, body) = get_json(catalog, "/api/datastore?resource_id=abc").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"]["message"], "CKAN API request failed");
        assert!(body["error"].get("status").is_none());
    }

    #[tokio::test]
    async fn datastore_requires_resource_id() {
        let catalog = Arc::new(FakeCatalog::new());
        let (status, body) = get_json(catalog.clone(), "/api/datastore?limit=10").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({"success": false, "error": {"message": "Resource ID is required"}})
        );
        assert!(catalog.calls().is_empty());
    }

    #[tokio::test]
    async fn datastore_rejects_bad_paging_without_calling_upstream() {
        for uri in [
            "/api/datastore?resource_id=abc&limit=-5",
            "/api/datastore?resource_id=abc&offset=x",
            "/api/datastore?resource_id=abc&filters=notjson",
        ] {
            let catalog = Arc::new(FakeCatalog::new());
            let (status, _) = get_json(catalog.clone(), uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert!(catalog.calls().is_empty(), "{uri}");
        }
    }

    #[tokio::test]
    async fn datastore_falls_back_when_sql_fails() {
        let catalog = Arc::new(
            FakeCatalog::new()
                .respond(
                    Action::DatastoreSearchSql,
                    Err(CatalogError::Remote {
                        status: 500,
                        message: "Internal Server Error".to_owned(),
                    }),
                )
                .respond(
                    Action::DatastoreSearch,
                    Ok(json!({
                        "success": true,
                        "result": {
                            "fields": [{"id": "a", "type": "text"}],
                            "records": [{"a": "x"}],
                            "total": 1
                        }
                    })),
                ),
        );
        let (status, body) = get_json(
            catalog.clone(),
            "/api/datastore?resource_id=abc&limit=10&offset=0",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "success": true,
                "result": {
                    "fields": [{"id": "a", "type": "text"}],
                    "records": [{"a": "x"}],
                    "total": 1
                }
            })
        );

        let calls = catalog.calls();
        assert_eq!(calls[1].0, Action::DatastoreSearch);
        assert_eq!(calls[1].1["resource_id"], "abc");
        assert_eq!(calls[1].1["limit"], "10");
        assert_eq!(calls[1].1["offset"], "0");
    }

    #[tokio::test]
    async fn datastore_defaults_total_and_paging() {
        let catalog = Arc::new(FakeCatalog::new().respond(
            Action::DatastoreSearchSql,
            Ok(json!({
                "success": true,
                "result": {
                    "fields": [{"id": "a", "type": "text"}],
                    "records": [{"a": "x"}, {"a": "y"}, {"a": "z"}]
                }
            })),
        ));
        let (status, body) = get_json(catalog.clone(), "/api/datastore?resource_id=abc").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"]["total"], 3);
        assert_eq!(
            catalog.calls()[0].1["sql"],
            r#"SELECT * FROM "abc" LIMIT 100 OFFSET 0"#
        );
    }

    #[tokio::test]
    async fn datastore_surfaces_fallback_error() {
        let catalog = Arc::new(
            FakeCatalog::new()
                .respond(Action::DatastoreSearchSql, Err(CatalogError::Timeout))
                .respond(Action::DatastoreSearch, Err(CatalogError::Timeout)),
        );
        let (status, body) = get_json(catalog, "/api/datastore?resource_id=abc").await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn healthz_reports_sql_fallbacks() {
        let catalog = Arc::new(
            FakeCatalog::new().respond(
                Action::DatastoreSearch,
                Ok(json!({"success": true, "result": {"fields": [], "records": []}})),
            ),
        );
        let app = app_router().with_state(AppState::new(catalog));

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/datastore?resource_id=abc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
        let health: HealthResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            health,
            HealthResponse {
                status: "healthy".to_owned(),
                sql_failures: 1,
                sql_fallbacks: 1,
            }
        );
    }
}
