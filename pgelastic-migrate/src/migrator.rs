//! Copies every index of a [`MigrationSource`] into a [`DocumentStore`]

use crate::progress::MigrateProgress;
use crate::sources::{MigrationSource, SourceHit};
use crate::Result;
use pgelastic::DocumentStore;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Totals of a finished run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MigrationSummary {
    pub indices: usize,
    pub types: usize,
    pub documents: u64,
    pub failed: u64,
}

pub struct Migrator<S> {
    source: S,
    store: Arc<DocumentStore>,
    progress: MigrateProgress,
}

impl<S: MigrationSource> Migrator<S> {
    pub fn new(source: S, store: Arc<DocumentStore>) -> Self {
        Self {
            source,
            store,
            progress: MigrateProgress::new(),
        }
    }

    pub fn with_progress(mut self, progress: MigrateProgress) -> Self {
        self.progress = progress;
        self
    }

    /// Migrate mappings first, then documents, index by index.
    ///
    /// Source and catalog failures abort the run. A document the store
    /// rejects is counted as failed and skipped.
    pub async fn run(&self) -> Result<MigrationSummary> {
        info!("Migrating from {}", self.source.source_name());

        let mut summary = MigrationSummary::default();
        for index in self.source.index_names().await? {
            summary.types += self.migrate_mappings(&index).await?;
            self.migrate_documents(&index).await?;
            summary.indices += 1;
        }

        self.progress.finish();
        summary.documents = self.progress.migrated();
        summary.failed = self.progress.failed();

        info!(
            "Migrated {} indices, {} types, {} documents ({} failed)",
            summary.indices, summary.types, summary.documents, summary.failed
        );
        Ok(summary)
    }

    async fn migrate_mappings(&self, index: &str) -> Result<usize> {
        let mappings = self.source.type_mappings(index).await?;
        for (type_name, mapping) in &mappings {
            info!("Processing mapping for index {}, type {}", index, type_name);
            let options = serde_json::to_string_pretty(&json!({
                "mappings": { type_name.as_str(): mapping }
            }))?;

            if self.store.get_type(index, type_name).await?.is_some() {
                self.store
                    .update_type_options(index, type_name, &options)
                    .await?;
            } else {
                self.store.create_type(index, type_name, &options).await?;
            }
        }
        Ok(mappings.len())
    }

    async fn migrate_documents(&self, index: &str) -> Result<()> {
        let mut page = self.source.open_scroll(index).await?;
        self.progress.start_index(index, page.total);

        let outcome = loop {
            if page.hits.is_empty() {
                break Ok(());
            }
            for hit in std::mem::take(&mut page.hits) {
                self.migrate_document(hit).await;
            }
            let Some(scroll_id) = page.scroll_id.clone() else {
                break Ok(());
            };
            match self.source.next_page(&scroll_id).await {
                Ok(next) => page = next,
                Err(e) => break Err(e),
            }
        };

        if let Some(scroll_id) = page.scroll_id.as_deref() {
            if let Err(e) = self.source.close_scroll(scroll_id).await {
                warn!("Failed to release scroll for index {}: {}", index, e);
            }
        }
        outcome
    }

    async fn migrate_document(&self, hit: SourceHit) {
        debug!("Processing document {}/{}/{}", hit.index, hit.type_name, hit.id);
        let SourceHit {
            index,
            type_name,
            id,
            source,
        } = hit;

        match self
            .store
            .create_document(&index, &type_name, source_object(source), Some(&id))
            .await
        {
            Ok(_) => self.progress.inc(1),
            Err(e) => {
                warn!("Skipping document {}/{}/{}: {}", index, type_name, id, e);
                self.progress.inc_failed(1);
            }
        }
    }
}

/// Hits fetched with `_source` disabled carry no payload
fn source_object(source: Value) -> Value {
    if source.is_null() {
        json!({})
    } else {
        source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::SourcePage;
    use crate::MigrateError;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use pgelastic::query::Predicate;

    /// Serves a fixed set of indices, two hits per page
    struct FakeSource {
        mappings: Vec<(String, Vec<(String, Value)>)>,
        hits: Vec<SourceHit>,
        fail_after_first_page: bool,
        closed: Mutex<Vec<String>>,
    }

    impl FakeSource {
        fn new() -> Self {
            Self {
                mappings: Vec::new(),
                hits: Vec::new(),
                fail_after_first_page: false,
                closed: Mutex::new(Vec::new()),
            }
        }

        fn with_index(mut self, index: &str, types: &[(&str, Value)]) -> Self {
            self.mappings.push((
                index.to_string(),
                types
                    .iter()
                    .map(|(t, m)| (t.to_string(), m.clone()))
                    .collect(),
            ));
            self
        }

        fn with_hit(mut self, index: &str, type_name: &str, id: &str, source: Value) -> Self {
            self.hits.push(SourceHit {
                index: index.to_string(),
                type_name: type_name.to_string(),
                id: id.to_string(),
                source,
            });
            self
        }

        fn page(&self, index: &str, offset: usize) -> SourcePage {
            let all: Vec<SourceHit> = self.hits.iter().filter(|h| h.index == index).cloned().collect();
            SourcePage {
                scroll_id: Some(format!("{}:{}", index, offset + 2)),
                total: all.len() as u64,
                hits: all.into_iter().skip(offset).take(2).collect(),
            }
        }
    }

    #[async_trait]
    impl MigrationSource for FakeSource {
        async fn index_names(&self) -> crate::Result<Vec<String>> {
            Ok(self.mappings.iter().map(|(i, _)| i.clone()).collect())
        }

        async fn type_mappings(&self, index: &str) -> crate::Result<Vec<(String, Value)>> {
            Ok(self
                .mappings
                .iter()
                .find(|(i, _)| i == index)
                .map(|(_, types)| types.clone())
                .unwrap_or_default())
        }

        async fn open_scroll(&self, index: &str) -> crate::Result<SourcePage> {
            Ok(self.page(index, 0))
        }

        async fn next_page(&self, scroll_id: &str) -> crate::Result<SourcePage> {
            if self.fail_after_first_page {
                return Err(MigrateError::Status {
                    status: 503,
                    url: "http://source/_search/scroll".to_string(),
                });
            }
            let (index, offset) = scroll_id.split_once(':').unwrap();
            Ok(self.page(index, offset.parse().unwrap()))
        }

        async fn close_scroll(&self, scroll_id: &str) -> crate::Result<()> {
            self.closed.lock().push(scroll_id.to_string());
            Ok(())
        }

        fn source_name(&self) -> &str {
            "fake"
        }
    }

    fn migrator(source: FakeSource) -> (Migrator<FakeSource>, Arc<DocumentStore>) {
        let store = Arc::new(DocumentStore::in_memory());
        let migrator =
            Migrator::new(source, store.clone()).with_progress(MigrateProgress::hidden());
        (migrator, store)
    }

    #[tokio::test]
    async fn test_migrates_mappings_and_documents() {
        let source = FakeSource::new()
            .with_index(
                "twitter",
                &[
                    ("tweet", json!({"properties": {"message": {"type": "text"}}})),
                    ("user", json!({"properties": {"name": {"type": "keyword"}}})),
                ],
            )
            .with_hit("twitter", "tweet", "1", json!({"message": "trying out pgelastic"}))
            .with_hit("twitter", "tweet", "2", json!({"message": "second"}))
            .with_hit("twitter", "tweet", "3", json!({"message": "third"}))
            .with_hit("twitter", "user", "kimchy", json!({"name": "kimchy"}));

        let (migrator, store) = migrator(source);
        let summary = migrator.run().await.unwrap();

        assert_eq!(
            summary,
            MigrationSummary {
                indices: 1,
                types: 2,
                documents: 4,
                failed: 0,
            }
        );

        let tweet = store.get_type("twitter", "tweet").await.unwrap().unwrap();
        let options: Value = serde_json::from_str(&tweet.options).unwrap();
        assert_eq!(
            options["mappings"]["tweet"]["properties"]["message"]["type"],
            "text"
        );

        let doc = store.get_document("twitter", "tweet", "3").await.unwrap().unwrap();
        assert_eq!(doc.source["message"], "third");
        assert_eq!(doc.version, 1);

        let all = store
            .process_search_query("twitter", "tweet", &Predicate::match_all())
            .await
            .unwrap();
        assert_eq!(all.len(), 3);

        assert_eq!(migrator.source.closed.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_existing_type_gets_options_replaced() {
        let source = FakeSource::new().with_index(
            "shop",
            &[("item", json!({"properties": {"sku": {"type": "keyword"}}}))],
        );
        let (migrator, store) = migrator(source);
        store
            .create_type("shop", "item", r#"{"properties":{"old":{"type":"text"}}}"#)
            .await
            .unwrap();

        migrator.run().await.unwrap();

        let item = store.get_type("shop", "item").await.unwrap().unwrap();
        let options: Value = serde_json::from_str(&item.options).unwrap();
        assert!(options.get("properties").is_none());
        assert_eq!(
            options["mappings"]["item"]["properties"]["sku"]["type"],
            "keyword"
        );
    }

    #[tokio::test]
    async fn test_rejected_documents_are_counted_not_fatal() {
        let source = FakeSource::new()
            .with_index("logs", &[("app", json!({}))])
            .with_hit("logs", "app", "1", json!({"msg": "a"}))
            .with_hit("logs", "app", "2", json!({"msg": "b"}))
            .with_hit("logs", "app", &"x".repeat(200), json!({"msg": "c"}))
            .with_hit("logs", "app", "3", Value::Null);

        let (migrator, store) = migrator(source);
        store
            .create_document("logs", "app", json!({"msg": "old"}), Some("1"))
            .await
            .unwrap();

        let summary = migrator.run().await.unwrap();
        assert_eq!(summary.documents, 2);
        assert_eq!(summary.failed, 2);

        let kept = store.get_document("logs", "app", "1").await.unwrap().unwrap();
        assert_eq!(kept.source["msg"], "old");

        let empty = store.get_document("logs", "app", "3").await.unwrap().unwrap();
        assert_eq!(empty.source, json!({}));
    }

    #[tokio::test]
    async fn test_source_failure_aborts_and_releases_scroll() {
        let mut source = FakeSource::new()
            .with_index("logs", &[("app", json!({}))])
            .with_hit("logs", "app", "1", json!({}))
            .with_hit("logs", "app", "2", json!({}))
            .with_hit("logs", "app", "3", json!({}));
        source.fail_after_first_page = true;

        let (migrator, store) = migrator(source);
        let err = migrator.run().await.unwrap_err();
        assert!(matches!(err, MigrateError::Status { status: 503, .. }));

        assert!(store.is_document_exists("logs", "app", "2").await.unwrap());
        assert!(!store.is_document_exists("logs", "app", "3").await.unwrap());
        assert_eq!(*migrator.source.closed.lock(), vec!["logs:2".to_string()]);
    }
}
