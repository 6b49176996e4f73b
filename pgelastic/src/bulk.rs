//! Line-oriented `_bulk` protocol
//!
//! The body is parsed completely before anything runs, so a malformed batch
//! fails without side effects. Execution is sequential and in input order.

use crate::response::{
    BulkItem, BulkItemBody, BulkItemError, BulkItemOutcome, BulkResponse, DocumentGetResponse,
    DocumentPutResponse,
};
use crate::store::{validate_id, Document, DocumentStore, Relation};
use crate::{Error, Result};
use serde::Deserialize;
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkKind {
    Index,
    Create,
    Update,
    Delete,
}

impl BulkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BulkKind::Index => "index",
            BulkKind::Create => "create",
            BulkKind::Update => "update",
            BulkKind::Delete => "delete",
        }
    }

    fn has_source(&self) -> bool {
        !matches!(self, BulkKind::Delete)
    }

    fn wrap(&self, body: BulkItemBody) -> BulkItem {
        match self {
            BulkKind::Index => BulkItem::Index(body),
            BulkKind::Create => BulkItem::Create(body),
            BulkKind::Update => BulkItem::Update(body),
            BulkKind::Delete => BulkItem::Delete(body),
        }
    }
}

/// One parsed action with its payload
#[derive(Debug, Clone, PartialEq)]
pub struct BulkAction {
    pub kind: BulkKind,
    pub index: String,
    pub type_name: String,
    pub id: Option<String>,
    pub source: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ActionLine {
    Index(BulkMeta),
    Create(BulkMeta),
    Update(BulkMeta),
    Delete(BulkMeta),
}

#[derive(Debug, Deserialize)]
struct BulkMeta {
    #[serde(rename = "_index", default)]
    index: Option<String>,
    #[serde(rename = "_type", default)]
    type_name: Option<String>,
    #[serde(rename = "_id", default)]
    id: Option<BulkId>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BulkId {
    Text(String),
    Number(serde_json::Number),
}

impl BulkId {
    fn into_string(self) -> String {
        match self {
            BulkId::Text(s) => s,
            BulkId::Number(n) => n.to_string(),
        }
    }
}

/// Executes `_bulk` bodies against a [`DocumentStore`]
pub struct BulkProcessor;

impl BulkProcessor {
    /// Parse a bulk body. `default_index`/`default_type` come from the URL and
    /// fill in missing `_index`/`_type`.
    pub fn parse(
        body: &str,
        default_index: Option<&str>,
        default_type: Option<&str>,
    ) -> Result<Vec<BulkAction>> {
        let mut lines = body
            .split('\n')
            .map(str::trim)
            .enumerate()
            .filter(|(_, l)| !l.is_empty());

        let mut actions = Vec::new();
        while let Some((n, line)) = lines.next() {
            let action_line: ActionLine = serde_json::from_str(line).map_err(|e| {
                Error::MalformedInput(format!("Invalid bulk action on line {}: {}", n + 1, e))
            })?;

            let (kind, meta) = match action_line {
                ActionLine::Index(m) => (BulkKind::Index, m),
                ActionLine::Create(m) => (BulkKind::Create, m),
                ActionLine::Update(m) => (BulkKind::Update, m),
                ActionLine::Delete(m) => (BulkKind::Delete, m),
            };

            let index = meta
                .index
                .or_else(|| default_index.map(String::from))
                .ok_or_else(|| missing_field("_index", kind))?;
            let type_name = meta
                .type_name
                .or_else(|| default_type.map(String::from))
                .ok_or_else(|| missing_field("_type", kind))?;
            let id = meta
                .id
                .map(BulkId::into_string)
                .filter(|id| !id.is_empty());
            if id.is_none() && matches!(kind, BulkKind::Update | BulkKind::Delete) {
                return Err(missing_field("_id", kind));
            }
            Relation::new(&index, &type_name)?;
            if let Some(id) = &id {
                validate_id(id)?;
            }

            let source = if kind.has_source() {
                let (source_n, source_line) = lines.next().ok_or_else(|| {
                    Error::MalformedInput(format!(
                        "Missing source line for {} action on line {}",
                        kind.as_str(),
                        n + 1
                    ))
                })?;
                let source: Value = serde_json::from_str(source_line).map_err(|e| {
                    Error::MalformedInput(format!(
                        "Invalid bulk source on line {}: {}",
                        source_n + 1,
                        e
                    ))
                })?;
                Some(source)
            } else {
                None
            };

            actions.push(BulkAction {
                kind,
                index,
                type_name,
                id,
                source,
            });
        }

        Ok(actions)
    }

    /// Parse and execute a bulk body, aggregating one multi-status response
    pub async fn process(
        store: &DocumentStore,
        body: &str,
        default_index: Option<&str>,
        default_type: Option<&str>,
    ) -> Result<BulkResponse> {
        let start = Instant::now();
        let actions = Self::parse(body, default_index, default_type)?;
        debug!("bulk request with {} actions", actions.len());

        let mut items = Vec::with_capacity(actions.len());
        let mut errors = false;

        for action in actions {
            let body = match Self::execute(store, &action).await {
                Ok(body) => body,
                Err(e) if e.is_item_recoverable() => {
                    warn!(
                        "bulk {} {}/{}/{:?} failed: {}",
                        action.kind.as_str(),
                        action.index,
                        action.type_name,
                        action.id,
                        e
                    );
                    errors = true;
                    BulkItemBody {
                        outcome: BulkItemOutcome::Failed {
                            error: BulkItemError::new(&e, &action.index),
                        },
                        status: e.status_code(),
                    }
                }
                Err(e) => return Err(e),
            };
            crate::metrics::record_bulk_item(action.kind.as_str(), body.status);
            items.push(action.kind.wrap(body));
        }

        Ok(BulkResponse {
            took: start.elapsed().as_millis() as u64,
            errors,
            items,
        })
    }

    async fn execute(store: &DocumentStore, action: &BulkAction) -> Result<BulkItemBody> {
        let index = action.index.as_str();
        let type_name = action.type_name.as_str();
        let id = action.id.as_deref().unwrap_or("");
        let source = action.source.clone().unwrap_or(Value::Null);

        let written: Document = match action.kind {
            BulkKind::Index => {
                if store.is_document_exists(index, type_name, id).await? {
                    store.update_document(index, type_name, source, id).await?
                } else {
                    store
                        .create_document(index, type_name, source, action.id.as_deref())
                        .await?
                }
            }
            BulkKind::Create => {
                store
                    .create_document(index, type_name, source, action.id.as_deref())
                    .await?
            }
            BulkKind::Update => store.update_document(index, type_name, source, id).await?,
            BulkKind::Delete => {
                let removed = store.delete_document(index, type_name, id).await?;
                let status = if removed.is_some() { 200 } else { 404 };
                return Ok(BulkItemBody {
                    outcome: BulkItemOutcome::Get(DocumentGetResponse::new(
                        index, type_name, id, removed,
                    )),
                    status,
                });
            }
        };

        let put = DocumentPutResponse::new(index, type_name, &written);
        let status = if put.created { 201 } else { 200 };
        Ok(BulkItemBody {
            outcome: BulkItemOutcome::Put(put),
            status,
        })
    }
}

fn missing_field(field: &str, kind: BulkKind) -> Error {
    Error::MalformedInput(format!(
        "Bulk {} action is missing {}",
        kind.as_str(),
        field
    ))
}
