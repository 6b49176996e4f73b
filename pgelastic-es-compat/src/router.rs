//! ES-compatible API router

use crate::endpoints::{
    bulk_handler, bulk_index_handler, bulk_type_handler, cluster_health_handler,
    delete_document_handler, get_document_handler, get_mapping_handler, head_index_handler,
    put_document_handler, put_document_with_id_handler, put_index_handler, put_mapping_handler,
    root_handler, search_all_handler, search_index_handler, search_type_handler, EsCompatState,
};
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use axum::Router;
use pgelastic::DocumentStore;
use std::sync::Arc;
use uuid::Uuid;

/// Create the ES-compatible router
///
/// # Endpoints
///
/// - `GET /` - Cluster info
/// - `GET /_cluster/health` - Cluster health
/// - `GET|POST|PUT /_bulk`, `/{index}/_bulk`, `/{index}/{type}/_bulk` - Bulk operations
/// - `GET|POST /_search`, `/{index}/_search`, `/{index}/{type}/_search` - Search
/// - `PUT|HEAD /{index}` - Create index / existence check
/// - `PUT|GET /{index}/_mapping/{type}` - Type mapping
/// - `PUT|POST /{index}/{type}` - Create document with generated id
/// - `PUT|POST|GET|DELETE /{index}/{type}/{id}` - Document CRUD
///
/// `max_body_size` bounds every request body in bytes.
pub fn es_compat_router(store: Arc<DocumentStore>, max_body_size: usize) -> Router {
    let state = EsCompatState {
        store,
        cluster_uuid: Uuid::new_v4().to_string(),
    };

    Router::new()
        // Cluster endpoints
        .route("/", get(root_handler))
        .route("/_cluster/health", get(cluster_health_handler))
        // Bulk endpoints
        .route(
            "/_bulk",
            get(bulk_handler).post(bulk_handler).put(bulk_handler),
        )
        .route("/:index/_bulk", post(bulk_index_handler).put(bulk_index_handler))
        .route(
            "/:index/:type/_bulk",
            post(bulk_type_handler).put(bulk_type_handler),
        )
        // Search endpoints
        .route("/_search", get(search_all_handler).post(search_all_handler))
        .route(
            "/:index/_search",
            get(search_index_handler).post(search_index_handler),
        )
        .route(
            "/:index/:type/_search",
            get(search_type_handler).post(search_type_handler),
        )
        // Catalog endpoints
        .route("/:index", put(put_index_handler).head(head_index_handler))
        .route(
            "/:index/_mapping/:type",
            put(put_mapping_handler).get(get_mapping_handler),
        )
        // Document endpoints
        .route(
            "/:index/:type",
            put(put_document_handler).post(put_document_handler),
        )
        .route(
            "/:index/:type/:id",
            put(put_document_with_id_handler)
                .post(put_document_with_id_handler)
                .get(get_document_handler)
                .delete(delete_document_handler),
        )
        .layer(DefaultBodyLimit::max(max_body_size))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    /// Static segments win over parameters at the same position
    #[tokio::test]
    async fn test_routes_dispatch() {
        let router = es_compat_router(Arc::new(DocumentStore::in_memory()), 1024);

        let cases = vec![
            ("GET", "/", StatusCode::OK),
            ("GET", "/_cluster/health", StatusCode::OK),
            ("HEAD", "/missing", StatusCode::NOT_FOUND),
            ("GET", "/twitter/tweet/1", StatusCode::NOT_FOUND),
            ("DELETE", "/twitter/tweet/1", StatusCode::NOT_FOUND),
            ("GET", "/twitter/_mapping/tweet", StatusCode::NOT_FOUND),
            ("POST", "/twitter/_search", StatusCode::BAD_REQUEST),
            ("POST", "/_bulk", StatusCode::OK),
        ];

        for (method, path, expected) in cases {
            let req = Request::builder()
                .method(method)
                .uri(path)
                .body(Body::empty())
                .unwrap();

            let resp = router.clone().oneshot(req).await.unwrap();
            assert_eq!(resp.status(), expected, "{method} {path}");
        }
    }
}
