//! Trending-keyword watch handler (SPEC_FULL §4.7).
//!
//! A scaled-down sibling of the article handler's search-enrichment
//! step: no LLM call, no artifact on disk, just a snippet count per
//! keyword folded into the summary. Grounded on the same
//! [`crate::search::SearchClient`] seam the article handler uses, reused
//! here rather than duplicated (spec.md §9's injected-dependency shape).

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use shared::task::TaskDefinition;
use shared::TaskResult;

use crate::registry::TaskHandler;
use crate::search::SearchClient;

#[derive(Debug, Deserialize)]
struct TrendingWatchParams {
    #[serde(default)]
    keywords: Vec<String>,
}

pub struct TrendingWatchHandler {
    search_client: Arc<dyn SearchClient>,
    search_snippet_count: usize,
    /// Caps how many watched topics are queried per run (spec.md §6
    /// `TOP_N`: "topic selection cap for content-batch handler").
    top_n: usize,
}

impl TrendingWatchHandler {
    pub fn new(search_client: Arc<dyn SearchClient>, search_snippet_count: usize, top_n: usize) -> Self {
        Self { search_client, search_snippet_count, top_n }
    }
}

#[async_trait]
impl TaskHandler for TrendingWatchHandler {
    async fn run(&self, definition: &TaskDefinition, _prior_metrics: &serde_json::Value) -> TaskResult {
        let params: TrendingWatchParams = match serde_json::from_value(definition.params.clone()) {
            Ok(p) => p,
            Err(e) => return TaskResult::failed("malformed trending_watch params", format!("invalid params: {e}")),
        };

        if params.keywords.is_empty() {
            return TaskResult::skipped("no keywords configured");
        }

        let selected: Vec<&String> = params.keywords.iter().take(self.top_n).collect();
        let mut counts = Vec::with_capacity(selected.len());
        let mut any_error = None;
        for keyword in selected.iter().copied() {
            match self.search_client.search(keyword, self.search_snippet_count).await {
                Ok(snippets) => counts.push(format!("{keyword}={}", snippets.len())),
                Err(e) => {
                    any_error = Some(e.to_string());
                    counts.push(format!("{keyword}=error"));
                }
            }
        }

        let summary = format!("trending snippet counts: {}", counts.join(", "));
        match any_error {
            Some(e) => TaskResult::failed(summary, e).retriable(),
            None => TaskResult::ok(summary)
                .with_metrics(serde_json::json!({ "keywords": selected })),
        }
    }
}
