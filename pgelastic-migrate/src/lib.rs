//! Migration of an Elasticsearch cluster into pgelastic
//!
//! Walks every index of a source cluster, recreates its mapping types and
//! copies every document with its original id.

pub mod error;
pub mod migrator;
pub mod progress;
pub mod sources;

pub use error::{MigrateError, Result};
pub use migrator::{MigrationSummary, Migrator};
pub use progress::MigrateProgress;
pub use sources::{ElasticsearchSource, MigrationSource, SourceHit, SourcePage};
