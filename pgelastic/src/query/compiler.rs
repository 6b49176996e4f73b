//! Query DSL compiler from Elasticsearch format to a [`Predicate`] tree

use crate::query::mapping::TypeMapping;
use crate::query::predicate::{MatchMode, Predicate};
use crate::query::types::{BoolQuery, EsQuery, MatchQuery, QueryList};
use crate::{Error, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

/// Compiles Elasticsearch query trees against one type's field mapping
pub struct QueryCompiler;

impl QueryCompiler {
    /// Parse and compile a raw query object
    pub fn compile(query: &Value, mapping: &TypeMapping) -> Result<Predicate> {
        let parsed = EsQuery::deserialize(query)
            .map_err(|e| Error::MalformedInput(format!("Failed to parse query: {}", e)))?;
        Self::compile_query(&parsed, mapping)
    }

    pub fn compile_query(query: &EsQuery, mapping: &TypeMapping) -> Result<Predicate> {
        match query {
            EsQuery::MatchAll(_) => Ok(Predicate::match_all()),
            EsQuery::Match(fields) => Self::compile_match(fields, MatchMode::Terms, mapping),
            EsQuery::MatchPhrase(fields) => Self::compile_match(fields, MatchMode::Phrase, mapping),
            EsQuery::Bool(bool_query) => Self::compile_bool(bool_query, mapping),
        }
    }

    fn compile_match(
        fields: &BTreeMap<String, MatchQuery>,
        mode: MatchMode,
        mapping: &TypeMapping,
    ) -> Result<Predicate> {
        let mut leaves: Vec<Predicate> = fields
            .iter()
            .map(|(field, match_query)| {
                Predicate::text(
                    field,
                    match_query.query(),
                    mode,
                    mapping.analyzer(field).map(String::from),
                )
            })
            .collect();

        match leaves.len() {
            0 => Err(Error::MalformedInput(
                "Match query requires at least one field".to_string(),
            )),
            1 => Ok(leaves.remove(0)),
            _ => Ok(Predicate::And(leaves)),
        }
    }

    fn compile_bool(query: &BoolQuery, mapping: &TypeMapping) -> Result<Predicate> {
        if query.must_not.is_some() {
            warn!("bool.must_not is evaluated as a positive match; results are not excluded");
        }

        let mut groups = Vec::new();
        for (list, is_or) in [
            (&query.must, false),
            (&query.filter, false),
            (&query.must_not, false),
            (&query.should, true),
        ] {
            let Some(list) = list else { continue };
            let children = Self::compile_list(list, mapping)?;
            if children.is_empty() {
                continue;
            }
            groups.push(if is_or {
                Predicate::Or(children)
            } else {
                Predicate::And(children)
            });
        }

        Ok(Predicate::And(groups))
    }

    fn compile_list(list: &QueryList, mapping: &TypeMapping) -> Result<Vec<Predicate>> {
        list.as_slice()
            .iter()
            .map(|q| Self::compile_query(q, mapping))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn compile(query: Value) -> Result<Predicate> {
        QueryCompiler::compile(&query, &TypeMapping::default())
    }

    #[test]
    fn test_match_all() {
        let p = compile(json!({"match_all": {}})).unwrap();
        assert!(p.is_match_all());
    }

    #[test]
    fn test_bool_group_structure() {
        let p = compile(json!({
            "bool": {
                "must": [{"match": {"f": "x"}}],
                "should": [{"match": {"f": "y"}}]
            }
        }))
        .unwrap();

        assert_eq!(
            p,
            Predicate::And(vec![
                Predicate::And(vec![Predicate::text("f", "x", MatchMode::Terms, None)]),
                Predicate::Or(vec![Predicate::text("f", "y", MatchMode::Terms, None)]),
            ])
        );
    }

    #[test]
    fn test_must_not_is_not_negated() {
        let p = compile(json!({"bool": {"must_not": {"match": {"f": "x"}}}})).unwrap();
        assert_eq!(
            p,
            Predicate::And(vec![Predicate::And(vec![Predicate::text(
                "f",
                "x",
                MatchMode::Terms,
                None
            )])])
        );
    }

    #[test]
    fn test_analyzer_from_mapping() {
        let mapping = TypeMapping::from_options(
            "tweet",
            r#"{"properties":{"message":{"type":"text","analyzer":"english"}}}"#,
        );
        let p = QueryCompiler::compile(
            &json!({"match_phrase": {"message": {"query": "trying out"}}}),
            &mapping,
        )
        .unwrap();
        assert_eq!(
            p,
            Predicate::text(
                "message",
                "trying out",
                MatchMode::Phrase,
                Some("english".to_string())
            )
        );
    }

    #[test]
    fn test_operator_is_accepted_and_ignored() {
        let with = compile(json!({"match": {"f": {"query": "a b", "operator": "or"}}})).unwrap();
        let without = compile(json!({"match": {"f": "a b"}})).unwrap();
        assert_eq!(with, without);
    }

    #[test]
    fn test_multi_field_match_is_and() {
        let p = compile(json!({"match": {"b": "2", "a": "1"}})).unwrap();
        assert_eq!(
            p,
            Predicate::And(vec![
                Predicate::text("a", "1", MatchMode::Terms, None),
                Predicate::text("b", "2", MatchMode::Terms, None),
            ])
        );
    }

    #[test]
    fn test_nested_bool_and_empty_groups() {
        let p = compile(json!({
            "bool": {
                "must": [],
                "filter": {"bool": {"should": [{"match_all": {}}]}}
            }
        }))
        .unwrap();
        assert_eq!(
            p,
            Predicate::And(vec![Predicate::And(vec![Predicate::And(vec![
                Predicate::Or(vec![Predicate::match_all()])
            ])])])
        );
        assert_eq!(p.leaf_count(), 1);

        assert_eq!(compile(json!({"bool": {}})).unwrap(), Predicate::And(vec![]));
    }

    #[test]
    fn test_strict_parsing() {
        for bad in [
            json!({"term": {"f": "x"}}),
            json!({"match_all": {}, "match": {"f": "x"}}),
            json!({"match": {}}),
            json!({"bool": {"must": [{"regexp": {"f": "x"}}]}}),
            json!("match_all"),
        ] {
            let err = compile(bad.clone()).unwrap_err();
            assert!(
                matches!(err, Error::MalformedInput(_)),
                "expected MalformedInput for {}",
                bad
            );
        }
    }

    #[test]
    fn test_compilation_is_deterministic() {
        let q = json!({"bool": {"should": [{"match": {"z": "1", "a": "2", "m": "3"}}]}});
        assert_eq!(compile(q.clone()).unwrap(), compile(q).unwrap());
    }
}
