//! Heartbeat handler (SPEC_FULL §4.7): no params, always `ok`. Exists
//! purely so operators have a cheap end-to-end signal that the kernel
//! actually ran this minute. No teacher equivalent needed — this is a
//! one-line handler.

use async_trait::async_trait;
use shared::task::TaskDefinition;
use shared::TaskResult;

use crate::registry::TaskHandler;

pub struct HeartbeatHandler;

#[async_trait]
impl TaskHandler for HeartbeatHandler {
    async fn run(&self, _definition: &TaskDefinition, _prior_metrics: &serde_json::Value) -> TaskResult {
        TaskResult::ok("alive")
    }
}
