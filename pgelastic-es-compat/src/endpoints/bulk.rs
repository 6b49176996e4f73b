//! `_bulk` endpoints

use crate::endpoints::{body_text, EsCompatState};
use crate::error::EsCompatError;
use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{Path, State};
use axum::Json;
use pgelastic::bulk::BulkProcessor;
use pgelastic::response::BulkResponse;

async fn run(
    state: &EsCompatState,
    default_index: Option<&str>,
    default_type: Option<&str>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<BulkResponse>, EsCompatError> {
    let text = body_text(body)?;
    let response = BulkProcessor::process(&state.store, &text, default_index, default_type).await?;
    Ok(Json(response))
}

/// GET|POST|PUT /_bulk
pub async fn bulk_handler(
    State(state): State<EsCompatState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<BulkResponse>, EsCompatError> {
    run(&state, None, None, body).await
}

/// POST|PUT /{index}/_bulk - Bulk with default index
pub async fn bulk_index_handler(
    State(state): State<EsCompatState>,
    Path(index): Path<String>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<BulkResponse>, EsCompatError> {
    run(&state, Some(&index), None, body).await
}

/// POST|PUT /{index}/{type}/_bulk - Bulk with default index and type
pub async fn bulk_type_handler(
    State(state): State<EsCompatState>,
    Path((index, type_name)): Path<(String, String)>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<BulkResponse>, EsCompatError> {
    run(&state, Some(&index), Some(&type_name), body).await
}
