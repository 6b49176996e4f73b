//! Catalog and document store
//!
//! [`DocumentStore`] implements index/type lifecycle and versioned document
//! CRUD on top of a [`StorageBackend`]. Indices and types are provisioned
//! lazily on first write.

mod backend;
mod memory;
mod postgres;
mod registry;
mod wildcard;

pub use backend::StorageBackend;
pub use memory::MemoryBackend;
pub use postgres::PostgresBackend;
pub use registry::{validate_index_name, validate_name, Provisioned, Relation, SchemaRegistry};
pub use wildcard::LikePattern;

use crate::query::Predicate;
use crate::{Error, Result};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Maximum document id length (`VARCHAR(128)`)
pub const MAX_ID_LEN: usize = 128;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexRecord {
    pub name: String,
    pub options: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeRecord {
    pub name: String,
    pub index_name: String,
    pub options: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub id: String,
    pub source: Value,
    pub version: i64,
}

pub struct DocumentStore {
    backend: Arc<dyn StorageBackend>,
    registry: SchemaRegistry,
}

impl DocumentStore {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            backend,
            registry: SchemaRegistry::new(),
        }
    }

    /// Store over a fresh [`MemoryBackend`]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    /// Create the catalog relations; existing ones are left untouched
    pub async fn initialize(&self) -> Result<()> {
        self.backend.initialize().await?;
        tracing::info!("Catalog initialized on {} backend", self.backend.name());
        Ok(())
    }

    // ========================================================================
    // Indices
    // ========================================================================

    pub async fn create_index(&self, name: &str, options: &str) -> Result<IndexRecord> {
        validate_index_name(name)?;
        debug!("create_index {}", name);
        self.backend
            .insert_index(name, options)
            .await?
            .ok_or_else(|| Error::IllegalOperation("Index already exists".to_string()))
    }

    pub async fn get_index(&self, name: &str) -> Result<Option<IndexRecord>> {
        self.backend.fetch_index(name).await
    }

    /// Index names matching an Elasticsearch wildcard pattern
    pub async fn find_indices(&self, pattern: &str) -> Result<Vec<String>> {
        self.backend
            .list_indices(&LikePattern::from_wildcard(pattern))
            .await
    }

    // ========================================================================
    // Types
    // ========================================================================

    /// Create a type and its backing relation. The owning index is created
    /// with empty options if it does not exist yet.
    pub async fn create_type(&self, index: &str, name: &str, options: &str) -> Result<TypeRecord> {
        debug!("create_type {}/{}", index, name);
        let (_, provisioned) = self
            .registry
            .provision(self.backend.as_ref(), index, name, options)
            .await?;
        if !provisioned.is_created() {
            return Err(Error::IllegalOperation("Type already exists".to_string()));
        }
        Ok(provisioned.record().clone())
    }

    pub async fn get_type(&self, index: &str, name: &str) -> Result<Option<TypeRecord>> {
        self.backend.fetch_type(index, name).await
    }

    /// Replace the type's options blob (overwrite, not merge)
    pub async fn update_type_options(
        &self,
        index: &str,
        name: &str,
        options: &str,
    ) -> Result<TypeRecord> {
        debug!("update_type_options {}/{}", index, name);
        self.backend
            .store_type_options(index, name, options)
            .await?
            .ok_or_else(|| Error::IllegalOperation("Type doesn't exist".to_string()))
    }

    /// Type names of `index` matching an Elasticsearch wildcard pattern
    pub async fn find_types(&self, index: &str, pattern: &str) -> Result<Vec<String>> {
        self.backend
            .list_types(index, &LikePattern::from_wildcard(pattern))
            .await
    }

    // ========================================================================
    // Documents
    // ========================================================================

    /// Create a document with version 1. A missing or empty id is generated
    /// by the backend; a supplied id that already exists is rejected.
    pub async fn create_document(
        &self,
        index: &str,
        type_name: &str,
        source: Value,
        id: Option<&str>,
    ) -> Result<Document> {
        let id = id.filter(|id| !id.is_empty());
        if let Some(id) = id {
            validate_id(id)?;
        }
        let relation = self
            .registry
            .ensure(self.backend.as_ref(), index, type_name)
            .await?;

        debug!("create_document {}/{}/{:?}", index, type_name, id);
        let document = self
            .backend
            .insert_document(&relation, id, &source)
            .await?
            .ok_or_else(|| match id {
                Some(id) => {
                    Error::IllegalOperation(format!("Document with ID {} already exists", id))
                }
                None => Error::Internal("Insert succeeded but returned no document".to_string()),
            })?;

        crate::metrics::record_document_write("create");
        Ok(document)
    }

    pub async fn get_document(
        &self,
        index: &str,
        type_name: &str,
        id: &str,
    ) -> Result<Option<Document>> {
        if id.is_empty() {
            return Ok(None);
        }
        match self.relation(index, type_name).await? {
            Some(relation) => self.backend.fetch_document(&relation, id).await,
            None => Ok(None),
        }
    }

    /// Empty ids never exist
    pub async fn is_document_exists(&self, index: &str, type_name: &str, id: &str) -> Result<bool> {
        Ok(self.get_document(index, type_name, id).await?.is_some())
    }

    /// Replace the payload of an existing document and bump its version by one
    pub async fn update_document(
        &self,
        index: &str,
        type_name: &str,
        source: Value,
        id: &str,
    ) -> Result<Document> {
        let missing = || Error::IllegalOperation(format!("Document with ID {} doesn't exist", id));
        if id.is_empty() {
            return Err(missing());
        }
        let relation = self.relation(index, type_name).await?.ok_or_else(missing)?;

        debug!("update_document {}/{}/{}", index, type_name, id);
        let document = self
            .backend
            .replace_document(&relation, id, &source)
            .await?
            .ok_or_else(missing)?;

        crate::metrics::record_document_write("update");
        Ok(document)
    }

    /// Delete a document, returning its last state. Deleting an absent id is
    /// not an error.
    pub async fn delete_document(
        &self,
        index: &str,
        type_name: &str,
        id: &str,
    ) -> Result<Option<Document>> {
        if id.is_empty() {
            return Ok(None);
        }
        let Some(relation) = self.relation(index, type_name).await? else {
            return Ok(None);
        };

        debug!("delete_document {}/{}/{}", index, type_name, id);
        let removed = self.backend.remove_document(&relation, id).await?;
        if removed.is_some() {
            crate::metrics::record_document_write("delete");
        }
        Ok(removed)
    }

    /// Run a compiled predicate against one `(index, type)`; empty when the
    /// pair was never provisioned or nothing matches.
    pub async fn process_search_query(
        &self,
        index: &str,
        type_name: &str,
        predicate: &Predicate,
    ) -> Result<Vec<Document>> {
        let Some(relation) = self.relation(index, type_name).await? else {
            return Ok(Vec::new());
        };

        let start = Instant::now();
        let documents = self.backend.select_documents(&relation, predicate).await?;
        crate::metrics::record_search_duration(start.elapsed());
        debug!(
            "search {}/{} matched {} documents",
            index,
            type_name,
            documents.len()
        );
        Ok(documents)
    }

    async fn relation(&self, index: &str, type_name: &str) -> Result<Option<Arc<Relation>>> {
        if Relation::new(index, type_name).is_err() {
            // Names that could never have been provisioned
            return Ok(None);
        }
        self.registry
            .resolve(self.backend.as_ref(), index, type_name)
            .await
    }
}

/// Reject ids that do not fit the id column
pub fn validate_id(id: &str) -> Result<()> {
    if id.len() > MAX_ID_LEN {
        return Err(Error::MalformedInput(format!(
            "Document id is longer than {} bytes",
            MAX_ID_LEN
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    #[tokio::test]
    async fn test_generated_ids_are_unique_and_start_at_version_one() {
        let store = DocumentStore::in_memory();
        store.create_type("twitter", "tweet", "").await.unwrap();

        let mut ids = HashSet::new();
        for n in 0..20 {
            let doc = store
                .create_document("twitter", "tweet", json!({"n": n}), None)
                .await
                .unwrap();
            assert_eq!(doc.version, 1);
            assert!(ids.insert(doc.id));
        }

        // Ids are not reused after a delete
        let victim = ids.iter().next().unwrap().clone();
        store.delete_document("twitter", "tweet", &victim).await.unwrap();
        let doc = store
            .create_document("twitter", "tweet", json!({}), Some(""))
            .await
            .unwrap();
        assert!(!ids.contains(&doc.id));
    }

    #[tokio::test]
    async fn test_create_document_provisions_index_and_type() {
        let store = DocumentStore::in_memory();
        assert!(store.get_index("blog").await.unwrap().is_none());

        store
            .create_document("blog", "post", json!({"title": "hi"}), Some("1"))
            .await
            .unwrap();

        let index = store.get_index("blog").await.unwrap().unwrap();
        assert_eq!(index.options, "");
        let post = store.get_type("blog", "post").await.unwrap().unwrap();
        assert_eq!(post.index_name, "blog");
        assert_eq!(post.options, "");
    }

    #[tokio::test]
    async fn test_update_increments_version_and_replaces_payload() {
        let store = DocumentStore::in_memory();
        store
            .create_document("i", "t", json!({"a": 1, "b": 2}), Some("doc"))
            .await
            .unwrap();

        for expected in 2..5 {
            let doc = store
                .update_document("i", "t", json!({"a": expected}), "doc")
                .await
                .unwrap();
            assert_eq!(doc.version, expected);
        }

        let doc = store.get_document("i", "t", "doc").await.unwrap().unwrap();
        assert_eq!(doc.version, 4);
        assert_eq!(doc.source, json!({"a": 4}));
    }

    #[tokio::test]
    async fn test_update_missing_document_fails() {
        let store = DocumentStore::in_memory();
        let err = store
            .update_document("i", "t", json!({}), "nope")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::IllegalOperation(_)));

        store.create_type("i", "t", "").await.unwrap();
        let err = store
            .update_document("i", "t", json!({}), "nope")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::IllegalOperation(_)));

        let err = store.update_document("i", "t", json!({}), "").await.unwrap_err();
        assert!(matches!(err, Error::IllegalOperation(_)));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = DocumentStore::in_memory();
        assert!(store.delete_document("i", "t", "1").await.unwrap().is_none());

        store
            .create_document("i", "t", json!({"x": true}), Some("1"))
            .await
            .unwrap();

        let snapshot = store.delete_document("i", "t", "1").await.unwrap().unwrap();
        assert_eq!(snapshot.id, "1");
        assert_eq!(snapshot.version, 1);
        assert_eq!(snapshot.source, json!({"x": true}));

        assert!(store.delete_document("i", "t", "1").await.unwrap().is_none());
        assert!(!store.is_document_exists("i", "t", "1").await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_create_fails_and_keeps_version() {
        let store = DocumentStore::in_memory();
        store
            .create_document("i", "t", json!({"v": 1}), Some("1"))
            .await
            .unwrap();
        store
            .update_document("i", "t", json!({"v": 2}), "1")
            .await
            .unwrap();

        let err = store
            .create_document("i", "t", json!({"v": 3}), Some("1"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::IllegalOperation(_)));

        let doc = store.get_document("i", "t", "1").await.unwrap().unwrap();
        assert_eq!(doc.version, 2);
        assert_eq!(doc.source, json!({"v": 2}));
    }

    #[tokio::test]
    async fn test_empty_id_never_exists() {
        let store = DocumentStore::in_memory();
        store.create_type("i", "t", "").await.unwrap();
        assert!(!store.is_document_exists("i", "t", "").await.unwrap());
        assert!(store.get_document("i", "t", "").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_overlong_id_is_rejected() {
        let store = DocumentStore::in_memory();
        let id = "x".repeat(MAX_ID_LEN + 1);
        let err = store
            .create_document("i", "t", json!({}), Some(&id))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MalformedInput(_)));
    }

    #[tokio::test]
    async fn test_index_and_type_catalog() {
        let store = DocumentStore::in_memory();
        store.create_index("logs", "{\"settings\":{}}").await.unwrap();
        let err = store.create_index("logs", "").await.unwrap_err();
        assert_eq!(err, Error::IllegalOperation("Index already exists".to_string()));

        store.create_type("logs", "app", "{}").await.unwrap();
        let err = store.create_type("logs", "app", "{}").await.unwrap_err();
        assert_eq!(err, Error::IllegalOperation("Type already exists".to_string()));

        let updated = store
            .update_type_options("logs", "app", "{\"properties\":{}}")
            .await
            .unwrap();
        assert_eq!(updated.options, "{\"properties\":{}}");

        let err = store
            .update_type_options("logs", "missing", "{}")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::IllegalOperation(_)));
    }

    #[tokio::test]
    async fn test_create_index_rejects_leading_underscore() {
        let store = DocumentStore::in_memory();
        let err = store.create_index("_hidden", "").await.unwrap_err();
        assert!(matches!(err, Error::MalformedInput(_)));
        assert!(store.get_index("_hidden").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_type_creates_missing_index() {
        let store = DocumentStore::in_memory();
        store.create_type("fresh", "t", "{}").await.unwrap();
        assert_eq!(store.find_indices("fresh").await.unwrap(), vec!["fresh"]);
    }

    #[tokio::test]
    async fn test_find_indices_and_types() {
        let store = DocumentStore::in_memory();
        for name in ["a", "ab", "azzz", "ba", "abc", "ac", "abbc"] {
            store.create_index(name, "").await.unwrap();
        }
        assert_eq!(
            store.find_indices("a*").await.unwrap(),
            vec!["a", "ab", "abbc", "abc", "ac", "azzz"]
        );
        assert_eq!(store.find_indices("a?c").await.unwrap(), vec!["abc"]);

        store.create_type("a", "tweet", "").await.unwrap();
        store.create_type("a", "user", "").await.unwrap();
        store.create_type("ab", "tweet", "").await.unwrap();
        assert_eq!(store.find_types("a", "*").await.unwrap(), vec!["tweet", "user"]);
        assert_eq!(store.find_types("a", "u*").await.unwrap(), vec!["user"]);
        assert!(store.find_types("ba", "*").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_unknown_relation_is_empty() {
        let store = DocumentStore::in_memory();
        let docs = store
            .process_search_query("nope", "nope", &Predicate::match_all())
            .await
            .unwrap();
        assert!(docs.is_empty());
    }
}
