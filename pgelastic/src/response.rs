//! Elasticsearch-shaped response envelopes

use crate::store::Document;
use crate::Error;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const CLUSTER_NAME: &str = "pg_elastic_cluster";

/// Constant score reported for every hit
pub const HIT_SCORE: f32 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShardInfo {
    pub total: u32,
    pub failed: u32,
    pub successful: u32,
}

impl Default for ShardInfo {
    fn default() -> Self {
        Self {
            total: 1,
            failed: 0,
            successful: 1,
        }
    }
}

/// Put-style envelope for document creates and updates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentPutResponse {
    #[serde(rename = "_shards")]
    pub shards: ShardInfo,
    #[serde(rename = "_index")]
    pub index: String,
    #[serde(rename = "_type")]
    pub type_name: String,
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_version")]
    pub version: i64,
    pub created: bool,
    pub result: String,
}

impl DocumentPutResponse {
    /// `created`/`result` follow the stored version: version 1 means created
    pub fn new(index: &str, type_name: &str, doc: &Document) -> Self {
        let created = doc.version == 1;
        Self {
            shards: ShardInfo::default(),
            index: index.to_string(),
            type_name: type_name.to_string(),
            id: doc.id.clone(),
            version: doc.version,
            created,
            result: if created { "created" } else { "updated" }.to_string(),
        }
    }
}

/// Get-style envelope used by document get and delete
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentGetResponse {
    #[serde(rename = "_index")]
    pub index: String,
    #[serde(rename = "_type")]
    pub type_name: String,
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_version", skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
    pub found: bool,
    #[serde(rename = "_source", skip_serializing_if = "Option::is_none")]
    pub source: Option<Value>,
}

impl DocumentGetResponse {
    pub fn new(index: &str, type_name: &str, id: &str, doc: Option<Document>) -> Self {
        match doc {
            Some(doc) => Self {
                index: index.to_string(),
                type_name: type_name.to_string(),
                id: doc.id,
                version: Some(doc.version),
                found: true,
                source: Some(doc.source),
            },
            None => Self {
                index: index.to_string(),
                type_name: type_name.to_string(),
                id: id.to_string(),
                version: None,
                found: false,
                source: None,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub took: u64,
    pub timed_out: bool,
    #[serde(rename = "_shards")]
    pub shards: ShardInfo,
    pub hits: SearchHits,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHits {
    pub max_score: f32,
    pub total: u64,
    pub hits: Vec<SearchHit>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(rename = "_index")]
    pub index: String,
    #[serde(rename = "_type")]
    pub type_name: String,
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_score")]
    pub score: f32,
    #[serde(rename = "_source")]
    pub source: Value,
}

impl SearchHit {
    pub fn new(index: &str, type_name: &str, doc: Document) -> Self {
        Self {
            index: index.to_string(),
            type_name: type_name.to_string(),
            id: doc.id,
            score: HIT_SCORE,
            source: doc.source,
        }
    }
}

impl SearchResponse {
    /// Page `hits` with `from`/`size`; `total` counts every match
    pub fn new(hits: Vec<SearchHit>, from: usize, size: usize, took_ms: u64) -> Self {
        let total = hits.len() as u64;
        let page: Vec<SearchHit> = hits.into_iter().skip(from).take(size).collect();
        let max_score = page.iter().map(|h| h.score).fold(0.0, f32::max);
        Self {
            took: took_ms,
            timed_out: false,
            shards: ShardInfo::default(),
            hits: SearchHits {
                max_score,
                total,
                hits: page,
            },
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootCause {
    #[serde(rename = "type")]
    pub error_type: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    #[serde(rename = "type")]
    pub error_type: String,
    pub reason: String,
    pub root_cause: Vec<RootCause>,
}

/// Top-level error envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
    pub status: u16,
}

impl ErrorResponse {
    /// Envelope whose single root cause repeats the top-level error
    pub fn new(error_type: impl Into<String>, reason: impl Into<String>, status: u16) -> Self {
        let error_type = error_type.into();
        let reason = reason.into();
        Self {
            error: ErrorDetail {
                root_cause: vec![RootCause {
                    error_type: error_type.clone(),
                    reason: reason.clone(),
                }],
                error_type,
                reason,
            },
            status,
        }
    }
}

impl From<&Error> for ErrorResponse {
    fn from(err: &Error) -> Self {
        Self::new(err.error_type(), err.reason(), err.status_code())
    }
}

/// Error entry of a failed bulk item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkItemError {
    #[serde(rename = "type")]
    pub error_type: String,
    pub reason: String,
    pub index: String,
    pub shard: String,
    pub index_uuid: String,
}

impl BulkItemError {
    pub fn new(err: &Error, index: &str) -> Self {
        Self {
            error_type: err.error_type().to_string(),
            reason: err.reason().to_string(),
            index: index.to_string(),
            shard: "1".to_string(),
            index_uuid: "1".to_string(),
        }
    }
}

// ============================================================================
// Bulk
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BulkItemOutcome {
    Put(DocumentPutResponse),
    Get(DocumentGetResponse),
    Failed { error: BulkItemError },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkItemBody {
    #[serde(flatten)]
    pub outcome: BulkItemOutcome,
    pub status: u16,
}

impl BulkItemBody {
    pub fn is_error(&self) -> bool {
        matches!(self.outcome, BulkItemOutcome::Failed { .. })
    }
}

/// One bulk result, keyed by the action that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkItem {
    Index(BulkItemBody),
    Create(BulkItemBody),
    Update(BulkItemBody),
    Delete(BulkItemBody),
}

impl BulkItem {
    pub fn body(&self) -> &BulkItemBody {
        match self {
            BulkItem::Index(b) | BulkItem::Create(b) | BulkItem::Update(b) | BulkItem::Delete(b) => b,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkResponse {
    pub took: u64,
    pub errors: bool,
    pub items: Vec<BulkItem>,
}

// ============================================================================
// Catalog and cluster
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexPutResponse {
    pub acknowledged: bool,
    pub shards_acknowledged: bool,
    pub index: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcknowledgedResponse {
    pub acknowledged: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterHealth {
    pub cluster_name: String,
    pub status: String,
    pub timed_out: bool,
    pub number_of_nodes: u32,
    pub number_of_data_nodes: u32,
    pub active_primary_shards: u32,
    pub active_shards: u32,
    pub relocating_shards: u32,
    pub initializing_shards: u32,
    pub unassigned_shards: u32,
    pub delayed_unassigned_shards: u32,
    pub number_of_pending_tasks: u32,
    pub number_of_in_flight_fetch: u32,
    pub task_max_waiting_in_queue_millis: u64,
    pub active_shards_percent_as_number: f64,
}

impl Default for ClusterHealth {
    fn default() -> Self {
        Self {
            cluster_name: CLUSTER_NAME.to_string(),
            status: "yellow".to_string(),
            timed_out: false,
            number_of_nodes: 1,
            number_of_data_nodes: 1,
            active_primary_shards: 0,
            active_shards: 0,
            relocating_shards: 0,
            initializing_shards: 0,
            unassigned_shards: 0,
            delayed_unassigned_shards: 0,
            number_of_pending_tasks: 0,
            number_of_in_flight_fetch: 0,
            task_max_waiting_in_queue_millis: 0,
            active_shards_percent_as_number: 0.0,
        }
    }
}
