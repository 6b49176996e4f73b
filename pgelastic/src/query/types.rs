//! Elasticsearch Query DSL types
//!
//! These types represent the subset of the ES Query DSL that pgelastic supports.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Maximum allowed search result limit
pub const MAX_SEARCH_SIZE: usize = 10_000;

/// Default number of hits returned by a search
pub const DEFAULT_SEARCH_SIZE: usize = 10;

/// Root ES search request body
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EsSearchRequest {
    /// The query to execute, compiled later against each type's mapping
    #[serde(default)]
    pub query: Option<Value>,

    /// Starting offset (default 0)
    #[serde(default)]
    pub from: Option<usize>,

    /// Maximum number of results (default 10)
    #[serde(default)]
    pub size: Option<usize>,
}

impl EsSearchRequest {
    pub fn offset(&self) -> usize {
        self.from.unwrap_or(0)
    }

    pub fn limit(&self) -> usize {
        self.size.unwrap_or(DEFAULT_SEARCH_SIZE).min(MAX_SEARCH_SIZE)
    }
}

/// ES Query types
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EsQuery {
    /// Match all documents
    MatchAll(MatchAllQuery),

    /// Match query (analyzed full-text)
    Match(BTreeMap<String, MatchQuery>),

    /// Match phrase query
    MatchPhrase(BTreeMap<String, MatchQuery>),

    /// Bool query (must, should, must_not, filter)
    Bool(BoolQuery),
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MatchAllQuery {
    #[serde(default)]
    pub boost: Option<f32>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum MatchQuery {
    Simple(#[serde(deserialize_with = "scalar_text")] String),
    Object {
        #[serde(deserialize_with = "scalar_text")]
        query: String,
        /// Accepted for compatibility; has no effect on matching
        #[serde(default)]
        operator: Option<String>,
        #[serde(default)]
        boost: Option<f32>,
    },
}

impl MatchQuery {
    pub fn query(&self) -> &str {
        match self {
            MatchQuery::Simple(s) => s,
            MatchQuery::Object { query, .. } => query,
        }
    }
}

/// Match text given as a string, number or boolean, e.g. `{"match": {"age": 5}}`
fn scalar_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(D::Error::custom(format!(
            "match query must be a string, number or boolean, got {}",
            other
        ))),
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BoolQuery {
    #[serde(default)]
    pub must: Option<QueryList>,
    #[serde(default)]
    pub filter: Option<QueryList>,
    #[serde(default)]
    pub must_not: Option<QueryList>,
    #[serde(default)]
    pub should: Option<QueryList>,
    #[serde(default)]
    pub minimum_should_match: Option<Value>,
    #[serde(default)]
    pub boost: Option<f32>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum QueryList {
    Single(Box<EsQuery>),
    Multiple(Vec<EsQuery>),
}

impl QueryList {
    pub fn as_slice(&self) -> &[EsQuery] {
        match self {
            QueryList::Single(q) => std::slice::from_ref(q.as_ref()),
            QueryList::Multiple(v) => v,
        }
    }
}
