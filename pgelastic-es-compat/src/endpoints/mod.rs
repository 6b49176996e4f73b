//! Elasticsearch-compatible endpoint handlers

pub mod bulk;
pub mod cluster;
pub mod documents;
pub mod indices;
pub mod search;

pub use bulk::{bulk_handler, bulk_index_handler, bulk_type_handler};
pub use cluster::{cluster_health_handler, root_handler};
pub use documents::{
    delete_document_handler, get_document_handler, put_document_handler,
    put_document_with_id_handler,
};
pub use indices::{get_mapping_handler, head_index_handler, put_index_handler, put_mapping_handler};
pub use search::{search_all_handler, search_index_handler, search_type_handler};

use crate::error::EsCompatError;
use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use pgelastic::DocumentStore;
use std::sync::Arc;

/// Shared state of every handler
#[derive(Clone)]
pub struct EsCompatState {
    pub store: Arc<DocumentStore>,
    pub cluster_uuid: String,
}

/// Read a request body as UTF-8 text
pub(crate) fn body_text(body: Result<Bytes, BytesRejection>) -> Result<String, EsCompatError> {
    let bytes = body?;
    String::from_utf8(bytes.to_vec()).map_err(|e| {
        EsCompatError::Store(pgelastic::Error::MalformedInput(format!(
            "Request body is not valid UTF-8: {}",
            e
        )))
    })
}
