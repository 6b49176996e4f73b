use crate::query::Predicate;
use crate::store::{Document, IndexRecord, LikePattern, Relation, TypeRecord};
use crate::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Physical storage behind the [`DocumentStore`](crate::store::DocumentStore).
///
/// Methods returning `Option` report `None` when a uniqueness constraint or a
/// missing row prevented the write; the store decides which error that becomes.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Create the catalog relations if they do not exist yet
    async fn initialize(&self) -> Result<()>;

    /// Insert an index row; `None` if the name is taken
    async fn insert_index(&self, name: &str, options: &str) -> Result<Option<IndexRecord>>;

    async fn fetch_index(&self, name: &str) -> Result<Option<IndexRecord>>;

    /// Index names matching the pattern, sorted by name
    async fn list_indices(&self, pattern: &LikePattern) -> Result<Vec<String>>;

    /// Insert a type row and provision its backing relation atomically;
    /// `None` if the `(index, name)` pair is taken
    async fn insert_type(&self, relation: &Relation, options: &str) -> Result<Option<TypeRecord>>;

    async fn fetch_type(&self, index: &str, name: &str) -> Result<Option<TypeRecord>>;

    /// Overwrite the options blob; `None` if the type does not exist
    async fn store_type_options(
        &self,
        index: &str,
        name: &str,
        options: &str,
    ) -> Result<Option<TypeRecord>>;

    /// Type names of one index matching the pattern, sorted by name
    async fn list_types(&self, index: &str, pattern: &LikePattern) -> Result<Vec<String>>;

    /// Insert with version 1. A `None` id draws one from the relation's
    /// generator. Returns `None` if the id is taken.
    async fn insert_document(
        &self,
        relation: &Relation,
        id: Option<&str>,
        source: &Value,
    ) -> Result<Option<Document>>;

    async fn fetch_document(&self, relation: &Relation, id: &str) -> Result<Option<Document>>;

    /// Replace the payload and bump the version by one; `None` if absent
    async fn replace_document(
        &self,
        relation: &Relation,
        id: &str,
        source: &Value,
    ) -> Result<Option<Document>>;

    /// Delete and return the pre-deletion snapshot; `None` if absent
    async fn remove_document(&self, relation: &Relation, id: &str) -> Result<Option<Document>>;

    async fn select_documents(
        &self,
        relation: &Relation,
        predicate: &Predicate,
    ) -> Result<Vec<Document>>;

    /// Short backend name for logs
    fn name(&self) -> &'static str;
}
