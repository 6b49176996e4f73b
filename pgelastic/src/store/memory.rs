//! In-process storage backend
//!
//! Mirrors the PostgreSQL backend's observable behaviour closely enough for
//! tests and for running the server without a database. Text matching uses a
//! lowercase word tokenizer; configured analyzers are ignored.

use crate::query::{Condition, MatchMode, Predicate, TextMatch};
use crate::store::{
    Document, IndexRecord, LikePattern, Relation, StorageBackend, TypeRecord,
};
use crate::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Default)]
struct Table {
    /// Next generated id
    next_id: u64,
    /// Stored rows in insertion order
    rows: Vec<Document>,
}

impl Table {
    fn position(&self, id: &str) -> Option<usize> {
        self.rows.iter().position(|d| d.id == id)
    }

    fn generate_id(&mut self) -> String {
        self.next_id += 1;
        self.next_id.to_string()
    }
}

#[derive(Default)]
struct State {
    indices: BTreeMap<String, IndexRecord>,
    types: BTreeMap<(String, String), TypeRecord>,
    tables: BTreeMap<String, Table>,
}

/// Storage kept entirely in process memory
#[derive(Default)]
pub struct MemoryBackend {
    state: RwLock<State>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    async fn insert_index(&self, name: &str, options: &str) -> Result<Option<IndexRecord>> {
        let mut state = self.state.write();
        if state.indices.contains_key(name) {
            return Ok(None);
        }
        let record = IndexRecord {
            name: name.to_string(),
            options: options.to_string(),
        };
        state.indices.insert(name.to_string(), record.clone());
        Ok(Some(record))
    }

    async fn fetch_index(&self, name: &str) -> Result<Option<IndexRecord>> {
        Ok(self.state.read().indices.get(name).cloned())
    }

    async fn list_indices(&self, pattern: &LikePattern) -> Result<Vec<String>> {
        Ok(self
            .state
            .read()
            .indices
            .keys()
            .filter(|name| pattern.matches(name))
            .cloned()
            .collect())
    }

    async fn insert_type(&self, relation: &Relation, options: &str) -> Result<Option<TypeRecord>> {
        let mut state = self.state.write();
        let key = (relation.index.clone(), relation.type_name.clone());
        if state.types.contains_key(&key) {
            return Ok(None);
        }
        let record = TypeRecord {
            name: relation.type_name.clone(),
            index_name: relation.index.clone(),
            options: options.to_string(),
        };
        state.types.insert(key, record.clone());
        state
            .tables
            .entry(relation.table().to_string())
            .or_default();
        Ok(Some(record))
    }

    async fn fetch_type(&self, index: &str, name: &str) -> Result<Option<TypeRecord>> {
        Ok(self
            .state
            .read()
            .types
            .get(&(index.to_string(), name.to_string()))
            .cloned())
    }

    async fn store_type_options(
        &self,
        index: &str,
        name: &str,
        options: &str,
    ) -> Result<Option<TypeRecord>> {
        let mut state = self.state.write();
        Ok(state
            .types
            .get_mut(&(index.to_string(), name.to_string()))
            .map(|record| {
                record.options = options.to_string();
                record.clone()
            }))
    }

    async fn list_types(&self, index: &str, pattern: &LikePattern) -> Result<Vec<String>> {
        Ok(self
            .state
            .read()
            .types
            .values()
            .filter(|t| t.index_name == index && pattern.matches(&t.name))
            .map(|t| t.name.clone())
            .collect())
    }

    async fn insert_document(
        &self,
        relation: &Relation,
        id: Option<&str>,
        source: &Value,
    ) -> Result<Option<Document>> {
        let mut state = self.state.write();
        let table = state.tables.entry(relation.table().to_string()).or_default();

        let id = match id {
            Some(id) => {
                if table.position(id).is_some() {
                    return Ok(None);
                }
                id.to_string()
            }
            None => loop {
                // Skip generated ids already taken by caller-supplied ones
                let candidate = table.generate_id();
                if table.position(&candidate).is_none() {
                    break candidate;
                }
            },
        };

        let document = Document {
            id,
            source: source.clone(),
            version: 1,
        };
        table.rows.push(document.clone());
        Ok(Some(document))
    }

    async fn fetch_document(&self, relation: &Relation, id: &str) -> Result<Option<Document>> {
        let state = self.state.read();
        Ok(state
            .tables
            .get(relation.table())
            .and_then(|t| t.rows.iter().find(|d| d.id == id))
            .cloned())
    }

    async fn replace_document(
        &self,
        relation: &Relation,
        id: &str,
        source: &Value,
    ) -> Result<Option<Document>> {
        let mut state = self.state.write();
        let Some(table) = state.tables.get_mut(relation.table()) else {
            return Ok(None);
        };
        Ok(table.rows.iter_mut().find(|d| d.id == id).map(|doc| {
            doc.source = source.clone();
            doc.version += 1;
            doc.clone()
        }))
    }

    async fn remove_document(&self, relation: &Relation, id: &str) -> Result<Option<Document>> {
        let mut state = self.state.write();
        let Some(table) = state.tables.get_mut(relation.table()) else {
            return Ok(None);
        };
        Ok(table.position(id).map(|pos| table.rows.remove(pos)))
    }

    async fn select_documents(
        &self,
        relation: &Relation,
        predicate: &Predicate,
    ) -> Result<Vec<Document>> {
        let state = self.state.read();
        Ok(state
            .tables
            .get(relation.table())
            .map(|t| {
                t.rows
                    .iter()
                    .filter(|d| evaluate(predicate, &d.source))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

fn evaluate(predicate: &Predicate, source: &Value) -> bool {
    match predicate {
        Predicate::Leaf(Condition::MatchAll) => true,
        Predicate::Leaf(Condition::Text(m)) => text_matches(m, source),
        Predicate::And(children) => children.iter().all(|p| evaluate(p, source)),
        Predicate::Or(children) => children.iter().any(|p| evaluate(p, source)),
    }
}

fn text_matches(m: &TextMatch, source: &Value) -> bool {
    let Some(value) = source.get(&m.field) else {
        return false;
    };
    let query = tokenize(&m.query);
    if query.is_empty() {
        return false;
    }

    let mut text = Vec::new();
    collect_strings(value, &mut text);
    let words: Vec<String> = text.iter().flat_map(|s| tokenize(s)).collect();

    match m.mode {
        MatchMode::Terms => query.iter().all(|q| words.contains(q)),
        MatchMode::Phrase => words.windows(query.len()).any(|w| w == query.as_slice()),
    }
}

fn collect_strings<'a>(value: &'a Value, out: &mut Vec<&'a str>) {
    match value {
        Value::String(s) => out.push(s),
        Value::Array(items) => items.iter().for_each(|v| collect_strings(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_strings(v, out)),
        _ => {}
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn relation() -> Relation {
        Relation::new("i", "t").unwrap()
    }

    async fn seeded() -> MemoryBackend {
        let backend = MemoryBackend::new();
        backend.insert_type(&relation(), "").await.unwrap();
        for (id, msg) in [
            ("1", "the quick brown fox"),
            ("2", "Quick thinking"),
            ("3", "brown quick fox"),
        ] {
            backend
                .insert_document(&relation(), Some(id), &json!({ "message": msg }))
                .await
                .unwrap();
        }
        backend
    }

    fn ids(docs: &[Document]) -> Vec<&str> {
        docs.iter().map(|d| d.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_terms_match_is_case_insensitive_and_unordered() {
        let backend = seeded().await;
        let p = Predicate::text("message", "fox QUICK", MatchMode::Terms, None);
        let docs = backend.select_documents(&relation(), &p).await.unwrap();
        assert_eq!(ids(&docs), vec!["1", "3"]);
    }

    #[tokio::test]
    async fn test_phrase_match_requires_adjacency() {
        let backend = seeded().await;
        let p = Predicate::text("message", "quick brown", MatchMode::Phrase, None);
        let docs = backend.select_documents(&relation(), &p).await.unwrap();
        assert_eq!(ids(&docs), vec!["1"]);

        // "1" holds both words, but not next to each other
        let p = Predicate::text("message", "quick fox", MatchMode::Phrase, None);
        let docs = backend.select_documents(&relation(), &p).await.unwrap();
        assert_eq!(ids(&docs), vec!["3"]);

        let p = Predicate::text("message", "fox brown", MatchMode::Phrase, None);
        let docs = backend.select_documents(&relation(), &p).await.unwrap();
        assert!(docs.is_empty());

        let p = Predicate::text("message", "brown quick", MatchMode::Phrase, None);
        let docs = backend.select_documents(&relation(), &p).await.unwrap();
        assert_eq!(ids(&docs), vec!["3"]);
    }

    #[tokio::test]
    async fn test_missing_field_never_matches() {
        let backend = seeded().await;
        let p = Predicate::text("title", "quick", MatchMode::Terms, None);
        assert!(backend
            .select_documents(&relation(), &p)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_empty_groups() {
        let backend = seeded().await;
        let all = backend
            .select_documents(&relation(), &Predicate::And(vec![]))
            .await
            .unwrap();
        assert_eq!(all.len(), 3);
        let none = backend
            .select_documents(&relation(), &Predicate::Or(vec![]))
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_generated_ids_skip_taken_ones() {
        let backend = MemoryBackend::new();
        backend.insert_type(&relation(), "").await.unwrap();
        backend
            .insert_document(&relation(), Some("1"), &json!({}))
            .await
            .unwrap();
        let doc = backend
            .insert_document(&relation(), None, &json!({}))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc.id, "2");
    }

    #[tokio::test]
    async fn test_duplicate_type_insert_reports_none() {
        let backend = MemoryBackend::new();
        assert!(backend.insert_type(&relation(), "").await.unwrap().is_some());
        assert!(backend.insert_type(&relation(), "x").await.unwrap().is_none());
        let t = backend.fetch_type("i", "t").await.unwrap().unwrap();
        assert_eq!(t.options, "");
    }
}
