//! RSS/Atom watch handler (SPEC_FULL §4.7).
//!
//! Grounded on the teacher's `task_http_content.rs` reqwest-fetch shape,
//! generalized from a regex content probe to a feed parse, plus the
//! pack's use of `feed-rs` for this exact job. There is no teacher
//! equivalent for the "diff against what I saw last time" behavior
//! itself — that comes straight from spec.md's requirement that a
//! handler's `metrics` round-trip as opaque, handler-private state.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

use shared::task::TaskDefinition;
use shared::TaskResult;

use crate::registry::TaskHandler;

#[derive(Debug, Deserialize)]
struct RssWatchParams {
    feed_url: String,
    #[serde(default = "default_timeout_secs")]
    timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    15
}

/// What gets persisted into `TaskState.last_metrics` and read back as
/// `prior_metrics` on the next run.
#[derive(Debug, Default, Serialize, Deserialize)]
struct SeenState {
    #[serde(default)]
    seen_guids: BTreeSet<String>,
}

pub struct RssWatchHandler {
    client: reqwest::Client,
}

impl RssWatchHandler {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TaskHandler for RssWatchHandler {
    async fn run(&self, definition: &TaskDefinition, prior_metrics: &serde_json::Value) -> TaskResult {
        let params: RssWatchParams = match serde_json::from_value(definition.params.clone()) {
            Ok(p) => p,
            Err(e) => return TaskResult::failed("malformed rss_watch params", format!("invalid params: {e}")),
        };

        let prior: SeenState = serde_json::from_value(prior_metrics.clone()).unwrap_or_default();

        let bytes = match self
            .client
            .get(&params.feed_url)
            .timeout(Duration::from_secs(params.timeout_secs))
            .send()
            .await
        {
            Ok(resp) => match resp.error_for_status() {
                Ok(resp) => match resp.bytes().await {
                    Ok(b) => b,
                    Err(e) => return TaskResult::failed("feed body read failed", e.to_string()).retriable(),
                },
                Err(e) => return TaskResult::failed("feed endpoint returned an error status", e.to_string()).retriable(),
            },
            Err(e) => return TaskResult::failed("feed fetch failed", e.to_string()).retriable(),
        };

        let feed = match feed_rs::parser::parse(&bytes[..]) {
            Ok(feed) => feed,
            Err(e) => return TaskResult::failed("malformed feed", e.to_string()),
        };

        let current_guids: BTreeSet<String> = feed.entries.iter().map(|e| e.id.clone()).collect();
        let new_guids: Vec<&String> = current_guids.difference(&prior.seen_guids).collect();

        let next_state = SeenState { seen_guids: current_guids.clone() };
        let metrics = serde_json::to_value(&next_state).unwrap_or(serde_json::Value::Null);

        if new_guids.is_empty() && !prior.seen_guids.is_empty() {
            return TaskResult::skipped(format!("{}: no_new_items", params.feed_url)).with_metrics(metrics);
        }

        TaskResult::ok(format!("{} new item(s) in {}", new_guids.len(), params.feed_url)).with_metrics(metrics)
    }
}
