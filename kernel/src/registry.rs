//! Task registry and handler contract (spec.md §4.3).
//!
//! Grounded on the teacher's `agent/src/tasks.rs::TaskExecutor`'s
//! `match task_config.task_type { ... }` dispatch, generalized from a
//! closed enum match to an open map per spec.md §4.3's "pluggable
//! handler" requirement. `async-trait` is used for this exact seam the
//! same way the rest of the pack reaches for it when a trait needs async
//! methods behind a trait object.

use async_trait::async_trait;
use shared::task::TaskDefinition;
use shared::TaskResult;
use std::collections::HashMap;

/// A handler performs one task's work and returns a [`TaskResult`].
/// Contract (spec.md §4.3):
/// - must not raise; an uncaught panic or error is translated by the
///   executor's outer guard into `status=failed`.
/// - may run concurrently with other handlers and with itself on other
///   definitions; must not mutate the definition or another task's state.
/// - should respect the soft per-task deadline enforced by the executor.
/// - receives the `metrics` map this same task id persisted on its prior
///   run, read-only, so handlers that track their own state across runs
///   (e.g. "which feed items have I already seen") don't need a second
///   storage channel — the opaque `metrics` field already round-trips.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn run(&self, definition: &TaskDefinition, prior_metrics: &serde_json::Value) -> TaskResult;
}

/// Static `id → handler` mapping populated once at startup (spec.md
/// §4.3). Unknown ids are handled by the executor, not the registry
/// itself — `get` simply returns `None`.
#[derive(Default)]
pub struct Registry {
    handlers: HashMap<String, Box<dyn TaskHandler>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, handler: Box<dyn TaskHandler>) -> &mut Self {
        self.handlers.insert(id.into(), handler);
        self
    }

    pub fn get(&self, id: &str) -> Option<&dyn TaskHandler> {
        self.handlers.get(id).map(|b| b.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::task::{Frequency, TaskDefinition};

    struct AlwaysOk;

    #[async_trait]
    impl TaskHandler for AlwaysOk {
        async fn run(&self, _definition: &TaskDefinition, _prior_metrics: &serde_json::Value) -> TaskResult {
            TaskResult::ok("done")
        }
    }

    fn def() -> TaskDefinition {
        TaskDefinition {
            id: "t1".into(),
            title: "T".into(),
            enabled: true,
            frequency: Frequency::Hourly,
            timezone: "UTC".into(),
            params: serde_json::json!({}),
        }
    }

    #[tokio::test]
    async fn registered_handler_is_dispatched() {
        let mut registry = Registry::new();
        registry.insert("heartbeat", Box::new(AlwaysOk));
        let handler = registry.get("heartbeat").expect("handler registered");
        let result = handler.run(&def(), &serde_json::Value::Null).await;
        assert_eq!(result.summary, "done");
    }

    #[test]
    fn unknown_id_returns_none() {
        let registry = Registry::new();
        assert!(registry.get("missing").is_none());
    }
}
