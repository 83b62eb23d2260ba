//! General-purpose capabilities: web search and read-only external API calls.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::error::{Result, SwitchyardError};
use crate::provider::http::{endpoint, shared_client, status_to_error};
use crate::util::text::take_chars;

pub const MAX_SEARCH_RESULTS: usize = 5;
pub const API_TIMEOUT: Duration = Duration::from_secs(10);

const SNIPPET_CHARS: usize = 200;
const TEXT_BODY_CHARS: usize = 500;

/// One web search hit.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub content: String,
}

/// Web search engine behind `search_web`.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>>;
}

/// [`SearchBackend`] over the Tavily search API.
pub struct TavilySearch {
    api_key: String,
    base_url: String,
}

impl TavilySearch {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.tavily.com";

    pub fn new(api_key: String, base_url: Option<String>) -> Self {
        Self {
            api_key,
            base_url: base_url.unwrap_or_else(|| Self::DEFAULT_BASE_URL.to_string()),
        }
    }
}

#[derive(Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[async_trait]
impl SearchBackend for TavilySearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        let body = json!({
            "api_key": self.api_key,
            "query": query,
            "max_results": max_results,
            "search_depth": "basic",
            "include_answer": true,
            "include_raw_content": false,
        });

        tracing::debug!(query, "tavily search");

        let resp = shared_client()
            .post(endpoint(&self.base_url, "search"))
            .json(&body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(status_to_error(status, &text));
        }

        let data: TavilyResponse = resp.json().await?;
        Ok(data.results)
    }
}

pub async fn search_web(backend: &dyn SearchBackend, query: &str) -> String {
    let hits = match backend.search(query, MAX_SEARCH_RESULTS).await {
        Ok(hits) => hits,
        Err(e) => return format!("Web search error: {e}. Please try rephrasing your query."),
    };
    if hits.is_empty() {
        return "No search results found.".to_string();
    }

    let mut out = format!("Found {} results for '{query}':\n\n", hits.len());
    for (i, hit) in hits.iter().enumerate() {
        let title = if hit.title.is_empty() { "No title" } else { &hit.title };
        out.push_str(&format!("{}. **{title}**\n", i + 1));
        if !hit.url.is_empty() {
            out.push_str(&format!("   URL: {}\n", hit.url));
        }
        if !hit.content.is_empty() {
            out.push_str(&format!("   {}...\n\n", take_chars(&hit.content, SNIPPET_CHARS)));
        }
    }
    out
}

/// Fetch a URL with GET and render the body as JSON or leading text.
pub async fn call_external_api(url: &str, method: &str) -> String {
    if !method.eq_ignore_ascii_case("GET") {
        return format!("Error: Only GET method is currently supported, got {method}");
    }

    match fetch(url).await {
        Ok(body) => match serde_json::from_str::<serde_json::Value>(&body) {
            Ok(data) => format!("API Response: {data}"),
            Err(_) => format!("API Response (text): {}", take_chars(&body, TEXT_BODY_CHARS)),
        },
        Err(SwitchyardError::Timeout(_)) => {
            format!("API error: Request timed out after {} seconds", API_TIMEOUT.as_secs())
        }
        Err(e) => format!("API error: {e}"),
    }
}

async fn fetch(url: &str) -> Result<String> {
    let resp = shared_client()
        .get(url)
        .timeout(API_TIMEOUT)
        .send()
        .await
        .map_err(timeout_aware)?;
    let status = resp.status().as_u16();
    if !resp.status().is_success() {
        let text = resp.text().await.unwrap_or_default();
        return Err(SwitchyardError::api(status, text));
    }
    resp.text().await.map_err(timeout_aware)
}

fn timeout_aware(e: reqwest::Error) -> SwitchyardError {
    if e.is_timeout() {
        SwitchyardError::Timeout(API_TIMEOUT.as_millis() as u64)
    } else {
        SwitchyardError::Network(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSearch(Vec<SearchHit>);

    #[async_trait]
    impl SearchBackend for FixedSearch {
        async fn search(&self, _query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
            assert_eq!(max_results, MAX_SEARCH_RESULTS);
            Ok(self.0.clone())
        }
    }

    struct FailingSearch;

    #[async_trait]
    impl SearchBackend for FailingSearch {
        async fn search(&self, _query: &str, _max_results: usize) -> Result<Vec<SearchHit>> {
            Err(SwitchyardError::api(500, "upstream down"))
        }
    }

    #[tokio::test]
    async fn search_results_are_numbered_with_snippets() {
        let backend = FixedSearch(vec![
            SearchHit {
                title: "Paris".into(),
                url: "https://en.wikipedia.org/wiki/Paris".into(),
                content: "p".repeat(250),
            },
            SearchHit {
                title: String::new(),
                url: String::new(),
                content: "short".into(),
            },
        ]);
        let out = search_web(&backend, "capital of France").await;
        assert!(out.starts_with("Found 2 results for 'capital of France':\n\n"));
        assert!(out.contains("1. **Paris**\n   URL: https://en.wikipedia.org/wiki/Paris\n"));
        assert!(out.contains(&format!("   {}...\n\n", "p".repeat(200))));
        assert!(out.contains("2. **No title**\n   short...\n\n"));
    }

    #[tokio::test]
    async fn empty_and_failed_searches_render_messages() {
        assert_eq!(search_web(&FixedSearch(vec![]), "x").await, "No search results found.");
        let out = search_web(&FailingSearch, "x").await;
        assert!(out.starts_with("Web search error: API error (status 500)"));
        assert!(out.ends_with("Please try rephrasing your query."));
    }

    #[tokio::test]
    async fn only_get_is_supported() {
        let out = call_external_api("https://example.com", "POST").await;
        assert_eq!(out, "Error: Only GET method is currently supported, got POST");
    }
}
