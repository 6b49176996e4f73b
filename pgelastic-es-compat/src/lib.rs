//! Elasticsearch REST surface for pgelastic
//!
//! Serves the Elasticsearch 5.x style API (with mapping types) on top of a
//! [`pgelastic::DocumentStore`].
//!
//! # Endpoints
//!
//! - `/_cluster/health` - Cluster health
//! - `/_bulk` - Bulk indexing
//! - `/{index}` - Index creation and existence checks
//! - `/{index}/_mapping/{type}` - Type mappings
//! - `/{index}/{type}/_search` - Search with the Query DSL
//! - `/{index}/{type}/{id}` - Document CRUD
//!
//! Errors render as the Elasticsearch error envelope; see [`EsCompatError`].

pub mod error;
pub mod router;

mod endpoints;

pub use endpoints::EsCompatState;
pub use error::EsCompatError;
pub use router::es_compat_router;
