//! Search enrichment client (SPEC_FULL §4.6b).
//!
//! Grounded on the teacher's `task_http_content.rs` reqwest usage (shared
//! client, per-request timeout) repurposed for a JSON search API instead
//! of a content-regex probe. No teacher equivalent for the endpoint shape
//! itself — `SEARCH_API_URL` is treated as opaque per spec.md §1's scope
//! note ("the search-enrichment provider ... specified only at their
//! interface"), defaulting to a SerpAPI-shaped contract.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

const DEFAULT_SEARCH_API_URL: &str = "https://serpapi.com/search";

/// One search result folded into the LLM prompt as context, and into the
/// cover-image sub-step as a source candidate (spec.md §4.6, §4.6 cover
/// image step).
#[derive(Debug, Clone)]
pub struct SearchSnippet {
    pub text: String,
    pub source_url: String,
    pub site_name: Option<String>,
}

/// Fetches up to `limit` snippets for a keyword. Injected into the
/// article and trending-watch handlers so tests can supply a fake
/// (spec.md §9).
#[async_trait]
pub trait SearchClient: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchSnippet>>;
}

/// Real implementation: a generic JSON search endpoint, queried with the
/// configured API key (SPEC_FULL §4.6b).
pub struct HttpSearchClient {
    client: Client,
    api_url: String,
    api_key: String,
}

impl HttpSearchClient {
    pub fn new(client: Client, api_url: Option<String>, api_key: String) -> Self {
        Self {
            client,
            api_url: api_url.unwrap_or_else(|| DEFAULT_SEARCH_API_URL.to_string()),
            api_key,
        }
    }
}

#[derive(serde::Deserialize)]
struct SearchResponse {
    #[serde(default)]
    organic_results: Vec<OrganicResult>,
}

#[derive(serde::Deserialize)]
struct OrganicResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    source: Option<String>,
}

#[async_trait]
impl SearchClient for HttpSearchClient {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchSnippet>> {
        let response = self
            .client
            .get(&self.api_url)
            .query(&[("q", query), ("api_key", self.api_key.as_str())])
            .timeout(Duration::from_secs(15))
            .send()
            .await
            .context("search enrichment request failed")?
            .error_for_status()
            .context("search enrichment endpoint returned an error status")?
            .json::<SearchResponse>()
            .await
            .context("malformed search enrichment response")?;

        Ok(response
            .organic_results
            .into_iter()
            .take(limit)
            .map(|r| SearchSnippet {
                text: if r.snippet.is_empty() { r.title } else { r.snippet },
                source_url: r.link,
                site_name: r.source,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn parses_organic_results_into_snippets() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "organic_results": [
                    {"title": "A", "snippet": "About A", "link": "https://a.example/", "source": "A Site"},
                    {"title": "B", "snippet": "", "link": "https://b.example/"},
                ]
            })))
            .mount(&server)
            .await;

        let client = HttpSearchClient::new(
            Client::new(),
            Some(format!("{}/search", server.uri())),
            "key".into(),
        );
        let snippets = client.search("rust", 5).await.unwrap();
        assert_eq!(snippets.len(), 2);
        assert_eq!(snippets[0].text, "About A");
        assert_eq!(snippets[0].site_name.as_deref(), Some("A Site"));
        assert_eq!(snippets[1].text, "B");
    }

    #[tokio::test]
    async fn respects_the_requested_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "organic_results": (0..10).map(|i| serde_json::json!({
                    "title": format!("T{i}"), "snippet": format!("S{i}"), "link": "https://x.example/"
                })).collect::<Vec<_>>()
            })))
            .mount(&server)
            .await;

        let client = HttpSearchClient::new(
            Client::new(),
            Some(format!("{}/search", server.uri())),
            "key".into(),
        );
        let snippets = client.search("rust", 3).await.unwrap();
        assert_eq!(snippets.len(), 3);
    }

    #[tokio::test]
    async fn http_error_status_is_surfaced_as_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = HttpSearchClient::new(
            Client::new(),
            Some(format!("{}/search", server.uri())),
            "key".into(),
        );
        assert!(client.search("rust", 3).await.is_err());
    }
}
