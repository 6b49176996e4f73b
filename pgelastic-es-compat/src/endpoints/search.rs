//! Search endpoints

use crate::endpoints::{body_text, EsCompatState};
use crate::error::EsCompatError;
use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{Path, State};
use axum::Json;
use pgelastic::query::EsSearchRequest;
use pgelastic::response::SearchResponse;
use pgelastic::Error;

fn parse_request(body: Result<Bytes, BytesRejection>) -> Result<EsSearchRequest, EsCompatError> {
    let text = body_text(body)?;
    if text.trim().is_empty() {
        return Ok(EsSearchRequest::default());
    }
    Ok(serde_json::from_str(&text).map_err(Error::from)?)
}

async fn run(
    state: &EsCompatState,
    index: &str,
    type_name: &str,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<SearchResponse>, EsCompatError> {
    let request = parse_request(body)?;
    let response = pgelastic::search::search(&state.store, index, type_name, &request).await?;
    Ok(Json(response))
}

/// GET|POST /_search - Search every index and type
pub async fn search_all_handler(
    State(state): State<EsCompatState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<SearchResponse>, EsCompatError> {
    run(&state, "*", "*", body).await
}

/// GET|POST /{index}/_search - Search every type of the matching indices
pub async fn search_index_handler(
    State(state): State<EsCompatState>,
    Path(index): Path<String>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<SearchResponse>, EsCompatError> {
    run(&state, &index, "*", body).await
}

/// GET|POST /{index}/{type}/_search
pub async fn search_type_handler(
    State(state): State<EsCompatState>,
    Path((index, type_name)): Path<(String, String)>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<SearchResponse>, EsCompatError> {
    run(&state, &index, &type_name, body).await
}
