//! pgelastic: an Elasticsearch-shaped document and search layer over PostgreSQL
//!
//! Indices and types live in two catalog relations; every `(index, type)` pair
//! is backed by its own relation holding `(id, document jsonb, version)` rows.
//!
//! # Components
//!
//! - [`store`] - catalog and document store with per-document versioning
//! - [`query`] - Query DSL types and the compiler producing a [`query::Predicate`] tree
//! - [`bulk`] - line-oriented `_bulk` protocol processor
//! - [`search`] - wildcard search across matching indices and types
//! - [`response`] - Elasticsearch response envelopes
//!
//! # Query DSL Support
//!
//! - `match_all`
//! - `match` / `match_phrase` (honouring per-field analyzers from the type mapping)
//! - `bool` (must, filter, should, must_not)

pub mod bulk;
pub mod config;
pub mod error;
pub mod metrics;
pub mod query;
pub mod response;
pub mod search;
pub mod store;

pub use config::Config;
pub use error::{Error, Result};
pub use store::DocumentStore;
