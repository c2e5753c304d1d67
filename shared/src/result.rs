//! In-memory handler output, serialized into `TaskState` by the executor.
//!
//! Grounded on `shared/src/metrics.rs`'s `MetricData`/`RawMetricData` split
//! in the teacher: a result type distinct from, but convertible into, the
//! wire-level state record. Here the distinction is sharper — `TaskResult`
//! never round-trips to disk directly, `TaskState` does.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::task::TaskStatus;

/// What a handler hands back to the executor after one invocation.
///
/// `metrics` is an opaque `serde_json::Value` as far as the kernel is
/// concerned (spec.md §3); handlers that produce structured sub-item
/// outcomes (the article handler) populate it with an `ArticleMetrics`
/// value serialized through the same `Value` seam.
#[derive(Debug, Clone)]
pub struct TaskResult {
    pub status: TaskStatus,
    pub summary: String,
    pub error: Option<String>,
    pub metrics: serde_json::Value,
    pub duration: Duration,
    /// Only meaningful when `status == Failed`: whether the executor's
    /// in-worker retry policy applies (spec.md §4.4, §7). Handlers that
    /// already exhausted their own internal retry/fallback (the article
    /// handler's provider chain) should report `false` — re-running the
    /// whole handler immediately would just repeat the same failure.
    pub retriable: bool,
}

impl TaskResult {
    pub fn ok(summary: impl Into<String>) -> Self {
        Self {
            status: TaskStatus::Ok,
            summary: summary.into(),
            error: None,
            metrics: serde_json::Value::Null,
            duration: Duration::ZERO,
            retriable: false,
        }
    }

    pub fn failed(summary: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            status: TaskStatus::Failed,
            summary: summary.into(),
            error: Some(error.into()),
            metrics: serde_json::Value::Null,
            duration: Duration::ZERO,
            retriable: false,
        }
    }

    pub fn skipped(summary: impl Into<String>) -> Self {
        Self {
            status: TaskStatus::Skipped,
            summary: summary.into(),
            error: None,
            metrics: serde_json::Value::Null,
            duration: Duration::ZERO,
            retriable: false,
        }
    }

    pub fn with_metrics(mut self, metrics: serde_json::Value) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Mark a `failed` result as retriable by the executor's in-worker
    /// backoff policy (spec.md §4.4).
    pub fn retriable(mut self) -> Self {
        self.retriable = true;
        self
    }
}

/// One successfully produced article (metrics sub-item, spec.md §3/§4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessfulItem {
    pub keyword: String,
    pub title: String,
    pub path: String,
    pub word_count: usize,
    pub provider: String,
    pub model: String,
}

/// One keyword that exhausted retries against every provider in the chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedItem {
    pub keyword: String,
    pub error_kind: String,
    pub message: String,
}

/// One keyword skipped for a non-retriable reason (missing credential,
/// quota exhaustion) before any article was produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedItem {
    pub keyword: String,
    pub reason: String,
}

/// Ordered per-keyword outcomes for the article generation handler,
/// carried inside `TaskResult::metrics` (spec.md §4.6).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArticleMetrics {
    pub successful_items: Vec<SuccessfulItem>,
    pub failed_items: Vec<FailedItem>,
    pub skipped_items: Vec<SkippedItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_constructor_has_no_error() {
        let r = TaskResult::ok("fine");
        assert_eq!(r.status, TaskStatus::Ok);
        assert!(r.error.is_none());
    }

    #[test]
    fn failed_constructor_carries_error() {
        let r = TaskResult::failed("boom summary", "boom");
        assert_eq!(r.status, TaskStatus::Failed);
        assert_eq!(r.error.as_deref(), Some("boom"));
    }

    #[test]
    fn article_metrics_round_trips_through_json_value() {
        let mut m = ArticleMetrics::default();
        m.successful_items.push(SuccessfulItem {
            keyword: "ai".into(),
            title: "AI".into(),
            path: "outputs/articles/2026-07-28/ai.md".into(),
            word_count: 120,
            provider: "dry_run".into(),
            model: "dry-run-v1".into(),
        });
        let value = serde_json::to_value(&m).unwrap();
        let back: ArticleMetrics = serde_json::from_value(value).unwrap();
        assert_eq!(back.successful_items.len(), 1);
    }
}
