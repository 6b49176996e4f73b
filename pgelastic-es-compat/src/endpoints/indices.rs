//! Index and mapping endpoints

use crate::endpoints::{body_text, EsCompatState};
use crate::error::EsCompatError;
use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use pgelastic::response::{AcknowledgedResponse, IndexPutResponse};
use pgelastic::Error;
use serde_json::{json, Value};

/// Parse an optional JSON body; blank bodies yield `None`
fn optional_json(text: &str) -> Result<Option<Value>, EsCompatError> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    let value = serde_json::from_str(text).map_err(Error::from)?;
    Ok(Some(value))
}

/// PUT /{index} - Create an index, plus any types declared under `mappings`
pub async fn put_index_handler(
    State(state): State<EsCompatState>,
    Path(index): Path<String>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<IndexPutResponse>, EsCompatError> {
    let options = body_text(body)?;
    let parsed = optional_json(&options)?;

    state.store.create_index(&index, &options).await?;

    if let Some(mappings) = parsed
        .as_ref()
        .and_then(|v| v.get("mappings"))
        .and_then(Value::as_object)
    {
        for (type_name, mapping) in mappings {
            state
                .store
                .create_type(&index, type_name, &mapping.to_string())
                .await?;
        }
    }

    Ok(Json(IndexPutResponse {
        acknowledged: true,
        shards_acknowledged: true,
        index,
    }))
}

/// HEAD /{index} - 200 when the index exists, 404 otherwise
pub async fn head_index_handler(
    State(state): State<EsCompatState>,
    Path(index): Path<String>,
) -> Result<StatusCode, EsCompatError> {
    match state.store.get_index(&index).await? {
        Some(_) => Ok(StatusCode::OK),
        None => Ok(StatusCode::NOT_FOUND),
    }
}

/// PUT /{index}/_mapping/{type} - Create a type or replace its mapping
pub async fn put_mapping_handler(
    State(state): State<EsCompatState>,
    Path((index, type_name)): Path<(String, String)>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<AcknowledgedResponse>, EsCompatError> {
    let options = body_text(body)?;
    optional_json(&options)?;

    if state.store.get_type(&index, &type_name).await?.is_some() {
        state
            .store
            .update_type_options(&index, &type_name, &options)
            .await?;
    } else {
        state.store.create_type(&index, &type_name, &options).await?;
    }

    Ok(Json(AcknowledgedResponse { acknowledged: true }))
}

/// GET /{index}/_mapping/{type} - Stored mapping of one type
pub async fn get_mapping_handler(
    State(state): State<EsCompatState>,
    Path((index, type_name)): Path<(String, String)>,
) -> Result<Json<Value>, EsCompatError> {
    let record = state
        .store
        .get_type(&index, &type_name)
        .await?
        .ok_or_else(|| EsCompatError::NotFound(format!("no such type [{}/{}]", index, type_name)))?;

    let mapping = optional_json(&record.options)
        .ok()
        .flatten()
        .unwrap_or_else(|| json!({}));

    Ok(Json(json!({
        index: {
            "mappings": {
                type_name: mapping
            }
        }
    })))
}
