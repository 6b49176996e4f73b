//! Single-document endpoints

use crate::endpoints::{body_text, EsCompatState};
use crate::error::EsCompatError;
use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use pgelastic::response::{DocumentGetResponse, DocumentPutResponse};
use pgelastic::Error;
use serde_json::Value;

fn parse_source(body: Result<Bytes, BytesRejection>) -> Result<Value, EsCompatError> {
    let text = body_text(body)?;
    if text.trim().is_empty() {
        return Err(Error::MalformedInput("Document body is empty".to_string()).into());
    }
    Ok(serde_json::from_str(&text).map_err(Error::from)?)
}

fn put_status(response: &DocumentPutResponse) -> StatusCode {
    if response.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    }
}

/// PUT|POST /{index}/{type} - Create with a generated id
pub async fn put_document_handler(
    State(state): State<EsCompatState>,
    Path((index, type_name)): Path<(String, String)>,
    body: Result<Bytes, BytesRejection>,
) -> Result<(StatusCode, Json<DocumentPutResponse>), EsCompatError> {
    let source = parse_source(body)?;
    let doc = state
        .store
        .create_document(&index, &type_name, source, None)
        .await?;

    let response = DocumentPutResponse::new(&index, &type_name, &doc);
    Ok((put_status(&response), Json(response)))
}

/// PUT|POST /{index}/{type}/{id} - Update when present, create otherwise
pub async fn put_document_with_id_handler(
    State(state): State<EsCompatState>,
    Path((index, type_name, id)): Path<(String, String, String)>,
    body: Result<Bytes, BytesRejection>,
) -> Result<(StatusCode, Json<DocumentPutResponse>), EsCompatError> {
    let source = parse_source(body)?;
    let store = &state.store;

    let doc = if store.is_document_exists(&index, &type_name, &id).await? {
        store.update_document(&index, &type_name, source, &id).await?
    } else {
        store
            .create_document(&index, &type_name, source, Some(&id))
            .await?
    };

    let response = DocumentPutResponse::new(&index, &type_name, &doc);
    Ok((put_status(&response), Json(response)))
}

/// GET /{index}/{type}/{id}
pub async fn get_document_handler(
    State(state): State<EsCompatState>,
    Path((index, type_name, id)): Path<(String, String, String)>,
) -> Result<(StatusCode, Json<DocumentGetResponse>), EsCompatError> {
    let doc = state.store.get_document(&index, &type_name, &id).await?;
    let status = if doc.is_some() {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    };
    Ok((
        status,
        Json(DocumentGetResponse::new(&index, &type_name, &id, doc)),
    ))
}

/// DELETE /{index}/{type}/{id} - Deleting a missing document is not an error
pub async fn delete_document_handler(
    State(state): State<EsCompatState>,
    Path((index, type_name, id)): Path<(String, String, String)>,
) -> Result<(StatusCode, Json<DocumentGetResponse>), EsCompatError> {
    let removed = state.store.delete_document(&index, &type_name, &id).await?;
    let status = if removed.is_some() {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    };
    Ok((
        status,
        Json(DocumentGetResponse::new(&index, &type_name, &id, removed)),
    ))
}
