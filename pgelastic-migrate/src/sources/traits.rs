use crate::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

/// One document as the source cluster returns it in a search hit
#[derive(Debug, Clone, Deserialize)]
pub struct SourceHit {
    #[serde(rename = "_index")]
    pub index: String,
    #[serde(rename = "_type", default = "default_hit_type")]
    pub type_name: String,
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_source", default)]
    pub source: Value,
}

fn default_hit_type() -> String {
    "_doc".to_string()
}

/// A batch of hits plus the cursor to fetch the next one
#[derive(Debug, Clone, Default)]
pub struct SourcePage {
    pub scroll_id: Option<String>,
    /// Documents in the whole index, for progress reporting
    pub total: u64,
    pub hits: Vec<SourceHit>,
}

/// A cluster documents can be copied out of
#[async_trait]
pub trait MigrationSource: Send + Sync {
    /// Names of the user indices to migrate
    async fn index_names(&self) -> Result<Vec<String>>;

    /// `(type, mapping)` pairs defined on an index
    async fn type_mappings(&self, index: &str) -> Result<Vec<(String, Value)>>;

    /// First page of every document in an index
    async fn open_scroll(&self, index: &str) -> Result<SourcePage>;

    /// The page after `scroll_id`; an empty page ends the scroll
    async fn next_page(&self, scroll_id: &str) -> Result<SourcePage>;

    /// Release the server-side cursor
    async fn close_scroll(&self, scroll_id: &str) -> Result<()>;

    /// Human-readable source name
    fn source_name(&self) -> &str;
}
