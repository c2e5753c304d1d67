//! Notification wire contract between the kernel and the chat webhook.
//!
//! Grounded on `shared/src/api.rs` (the teacher's agent↔server request/
//! response pair): the same architectural seam — a typed payload for an
//! external HTTP collaborator — repurposed for a different destination.
//! Card *assembly* lives in `kernel::notifier`; these types are only the
//! wire shape that assembly produces.

use serde::{Deserialize, Serialize};

/// Summary cap shared with `TaskState::last_result_summary` /
/// `last_error` (spec.md §3 and §4.5: "length caps match the state
/// truncation").
pub const FIELD_CHAR_CAP: usize = 400;

/// One row in the consolidated card, one per non-trivial outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRow {
    pub id: String,
    /// Never null in the rendered payload; defaults to "Untitled" at
    /// assembly time per spec.md §4.5.
    pub title: String,
    pub status: String,
    pub summary: String,
    pub duration_sec: f64,
}

/// The single per-run summary card.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryCard {
    pub ok_count: usize,
    pub failed_count: usize,
    pub skipped_count: usize,
    pub total_duration_sec: f64,
    pub rows: Vec<TaskRow>,
    /// Provider-specific extension point (spec.md §4.5): the LLM provider
    /// actually used by the article handler this run, if it ran.
    pub llm_provider_used: Option<String>,
}

/// One immediate alert for a single failed task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureAlert {
    pub id: String,
    pub title: String,
    pub error: String,
    /// User id to `@mention` in the alert; empty string if `MENTION` is
    /// unset (spec.md §6).
    pub mention: String,
}
