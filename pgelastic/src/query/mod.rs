//! Elasticsearch query DSL support
//!
//! Parses `match_all`, `match`, `match_phrase` and `bool` trees and compiles
//! them into a backend-neutral [`Predicate`].

pub mod compiler;
pub mod mapping;
pub mod predicate;
pub mod types;

pub use compiler::QueryCompiler;
pub use mapping::{FieldMapping, TypeMapping};
pub use predicate::{Condition, MatchMode, Predicate, TextMatch};
pub use types::{EsQuery, EsSearchRequest};
