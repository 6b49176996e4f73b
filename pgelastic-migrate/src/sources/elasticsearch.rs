use super::traits::{MigrationSource, SourceHit, SourcePage};
use crate::{MigrateError, Result};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

/// How long the source keeps a scroll cursor alive between pages
const SCROLL_KEEP_ALIVE: &str = "1m";

/// Reads indices, mappings and documents from an Elasticsearch cluster over
/// its REST API
pub struct ElasticsearchSource {
    client: Client,
    base_url: Url,
    batch_size: usize,
}

#[derive(Debug, Deserialize)]
struct CatIndex {
    index: String,
}

#[derive(Debug, Deserialize)]
struct ScrollResponse {
    #[serde(rename = "_scroll_id")]
    scroll_id: Option<String>,
    hits: ScrollHits,
}

#[derive(Debug, Deserialize)]
struct ScrollHits {
    #[serde(default)]
    total: Option<HitsTotal>,
    #[serde(default)]
    hits: Vec<SourceHit>,
}

/// 5.x/6.x report a bare count, 7.x an object
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HitsTotal {
    Count(u64),
    Object { value: u64 },
}

impl HitsTotal {
    fn value(&self) -> u64 {
        match self {
            Self::Count(n) => *n,
            Self::Object { value } => *value,
        }
    }
}

impl ElasticsearchSource {
    /// `host` is either `host:port` or a full URL
    pub fn new(host: &str, batch_size: usize) -> Result<Self> {
        let base_url = if host.contains("://") {
            Url::parse(host)?
        } else {
            Url::parse(&format!("http://{}", host))?
        };

        Ok(Self {
            client: Client::new(),
            base_url,
            batch_size: batch_size.max(1),
        })
    }

    fn url(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(MigrateError::Status {
                status: status.as_u16(),
                url: response.url().to_string(),
            })
        }
    }
}

#[async_trait]
impl MigrationSource for ElasticsearchSource {
    async fn index_names(&self) -> Result<Vec<String>> {
        let url = self.url("_cat/indices?format=json")?;
        let response = Self::check(self.client.get(url).send().await?).await?;
        let indices: Vec<CatIndex> = response.json().await?;
        Ok(user_indices(indices))
    }

    async fn type_mappings(&self, index: &str) -> Result<Vec<(String, Value)>> {
        let url = self.url(&format!("{}/_mapping", index))?;
        let response = Self::check(self.client.get(url).send().await?).await?;
        let body: Value = response.json().await?;
        parse_mappings(index, &body)
    }

    async fn open_scroll(&self, index: &str) -> Result<SourcePage> {
        let mut url = self.url(&format!("{}/_search", index))?;
        url.query_pairs_mut().append_pair("scroll", SCROLL_KEEP_ALIVE);

        let body = json!({ "size": self.batch_size, "sort": ["_doc"] });
        let response = Self::check(self.client.post(url).json(&body).send().await?).await?;
        let page: ScrollResponse = response.json().await?;
        Ok(page.into())
    }

    async fn next_page(&self, scroll_id: &str) -> Result<SourcePage> {
        let url = self.url("_search/scroll")?;
        let body = json!({ "scroll": SCROLL_KEEP_ALIVE, "scroll_id": scroll_id });
        let response = Self::check(self.client.post(url).json(&body).send().await?).await?;
        let page: ScrollResponse = response.json().await?;
        Ok(page.into())
    }

    async fn close_scroll(&self, scroll_id: &str) -> Result<()> {
        let url = self.url("_search/scroll")?;
        let body = json!({ "scroll_id": [scroll_id] });
        Self::check(self.client.delete(url).json(&body).send().await?).await?;
        Ok(())
    }

    fn source_name(&self) -> &str {
        self.base_url.as_str()
    }
}

impl From<ScrollResponse> for SourcePage {
    fn from(response: ScrollResponse) -> Self {
        SourcePage {
            scroll_id: response.scroll_id,
            total: response.hits.total.map(|t| t.value()).unwrap_or(0),
            hits: response.hits.hits,
        }
    }
}

/// Drop system indices (dot-prefixed) and sort by name
fn user_indices(indices: Vec<CatIndex>) -> Vec<String> {
    let mut names: Vec<String> = indices
        .into_iter()
        .map(|i| i.index)
        .filter(|name| !name.starts_with('.'))
        .collect();
    names.sort();
    names
}

/// Extract `(type, mapping)` pairs from a `GET /{index}/_mapping` body.
///
/// Typed clusters answer `{index: {mappings: {type: {...}}}}`. Typeless
/// clusters put `properties` straight under `mappings`; that mapping is
/// reported as type `_doc`.
fn parse_mappings(index: &str, body: &Value) -> Result<Vec<(String, Value)>> {
    let mappings = body
        .get(index)
        .and_then(|i| i.get("mappings"))
        .and_then(Value::as_object)
        .ok_or_else(|| MigrateError::Other(format!("No mappings returned for index {}", index)))?;

    if mappings.contains_key("properties") {
        return Ok(vec![("_doc".to_string(), Value::Object(mappings.clone()))]);
    }

    Ok(mappings
        .iter()
        .map(|(type_name, mapping)| (type_name.clone(), mapping.clone()))
        .collect())
}
