//! Search across every `(index, type)` matched by a pair of wildcard patterns

use crate::query::{EsSearchRequest, Predicate, QueryCompiler, TypeMapping};
use crate::response::{SearchHit, SearchResponse};
use crate::store::DocumentStore;
use crate::{Error, Result};
use std::time::Instant;
use tracing::debug;

/// Run `request` against all matching types. Hits are concatenated in
/// index then type name order before `from`/`size` paging.
pub async fn search(
    store: &DocumentStore,
    index_pattern: &str,
    type_pattern: &str,
    request: &EsSearchRequest,
) -> Result<SearchResponse> {
    let start = Instant::now();
    let mut hits = Vec::new();
    let mut searched = 0usize;

    for index in store.find_indices(index_pattern).await? {
        for type_name in store.find_types(&index, type_pattern).await? {
            let predicate = match &request.query {
                Some(query) => {
                    let options = store
                        .get_type(&index, &type_name)
                        .await?
                        .map(|t| t.options)
                        .unwrap_or_default();
                    let mapping = TypeMapping::from_options(&type_name, &options);
                    QueryCompiler::compile(query, &mapping)?
                }
                None => Predicate::match_all(),
            };

            let docs = store
                .process_search_query(&index, &type_name, &predicate)
                .await?;
            hits.extend(docs.into_iter().map(|d| SearchHit::new(&index, &type_name, d)));
            searched += 1;
        }
    }

    if searched == 0 {
        return Err(Error::IllegalOperation("Illegal search query".to_string()));
    }

    debug!(
        "search {}/{} over {} types: {} hits",
        index_pattern,
        type_pattern,
        searched,
        hits.len()
    );

    Ok(SearchResponse::new(
        hits,
        request.offset(),
        request.limit(),
        start.elapsed().as_millis() as u64,
    ))
}
