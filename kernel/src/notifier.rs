//! Card assembly and webhook transport (spec.md §4.5).
//!
//! Grounded on the teacher's `agent/src/main.rs::send_metrics_to_server`/
//! `send_metrics_batch` (reqwest POST + JSON body, logged-not-fatal
//! failure handling) — the same transport shape, repurposed for a chat
//! webhook destination instead of the central metrics server. Card
//! *assembly* is pure and deliberately separated from transport so it can
//! be unit-tested without a network fake.

use reqwest::Client;
use shared::task::TaskStatus;
use shared::webhook::{FailureAlert, SummaryCard, TaskRow, FIELD_CHAR_CAP};
use shared::utils::truncate_string;
use tracing::{debug, warn};

use crate::executor::ExecutedTask;

pub struct Notifier {
    client: Client,
    webhook_url: Option<String>,
    mention: String,
}

impl Notifier {
    pub fn new(webhook_url: Option<String>, mention: String) -> Self {
        Self {
            client: Client::new(),
            webhook_url,
            mention,
        }
    }

    /// Dispatch one alert per `failed` task, then the single consolidated
    /// card (spec.md §4.5). Transport failures are logged and never
    /// propagate as errors — but spec.md §6 ties the process exit code to
    /// transport success too, so the caller gets a `bool` back rather
    /// than nothing.
    pub async fn notify(&self, executed: &[ExecutedTask], llm_provider_used: Option<String>) -> bool {
        let mut transport_ok = true;

        for task in executed {
            if task.state.status == TaskStatus::Failed {
                let alert = FailureAlert {
                    id: task.definition.id.clone(),
                    title: nonblank(&task.definition.title, "Untitled"),
                    error: truncate_string(
                        task.state.last_error.as_deref().unwrap_or("unknown"),
                        FIELD_CHAR_CAP,
                    ),
                    mention: self.mention.clone(),
                };
                transport_ok &= self.send_alert(&alert).await;
            }
        }

        let card = build_card(executed, llm_provider_used);
        transport_ok &= self.send_card(&card).await;
        transport_ok
    }

    async fn send_alert(&self, alert: &FailureAlert) -> bool {
        let Some(url) = &self.webhook_url else {
            debug!("WEBHOOK_URL unset, skipping failure alert for {}", alert.id);
            return true;
        };
        match self.client.post(url).json(alert).send().await {
            Ok(_) => true,
            Err(e) => {
                warn!("failed to send failure alert for {}: {e}", alert.id);
                false
            }
        }
    }

    async fn send_card(&self, card: &SummaryCard) -> bool {
        let Some(url) = &self.webhook_url else {
            debug!("WEBHOOK_URL unset, skipping summary card");
            return true;
        };
        match self.client.post(url).json(card).send().await {
            Ok(_) => true,
            Err(e) => {
                warn!("failed to send summary card: {e}");
                false
            }
        }
    }
}

fn nonblank(value: &str, default: &str) -> String {
    if value.trim().is_empty() {
        default.to_string()
    } else {
        value.to_string()
    }
}

/// Pure card assembly, testable without a network fake. Every field is
/// defaulted rather than left null (spec.md §4.5: "Untitled", "unknown").
pub fn build_card(executed: &[ExecutedTask], llm_provider_used: Option<String>) -> SummaryCard {
    let mut ok_count = 0;
    let mut failed_count = 0;
    let mut skipped_count = 0;
    let mut total_duration_sec = 0.0;
    let mut rows = Vec::new();

    for task in executed {
        match task.state.status {
            TaskStatus::Ok => ok_count += 1,
            TaskStatus::Failed => failed_count += 1,
            TaskStatus::Skipped => skipped_count += 1,
            _ => {}
        }
        total_duration_sec += task.duration.as_secs_f64();

        rows.push(TaskRow {
            id: task.definition.id.clone(),
            title: nonblank(&task.definition.title, "Untitled"),
            status: status_label(task.state.status),
            summary: truncate_string(
                task.state
                    .last_result_summary
                    .as_deref()
                    .unwrap_or("unknown"),
                FIELD_CHAR_CAP,
            ),
            duration_sec: task.duration.as_secs_f64(),
        });
    }

    SummaryCard {
        ok_count,
        failed_count,
        skipped_count,
        total_duration_sec,
        rows,
        llm_provider_used,
    }
}

fn status_label(status: TaskStatus) -> String {
    match status {
        TaskStatus::Scheduled => "scheduled",
        TaskStatus::Running => "running",
        TaskStatus::Ok => "ok",
        TaskStatus::Failed => "failed",
        TaskStatus::Skipped => "skipped",
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::task::{Frequency, TaskDefinition, TaskState};
    use std::time::Duration;

    fn executed(id: &str, title: &str, status: TaskStatus, summary: Option<&str>, error: Option<&str>) -> ExecutedTask {
        ExecutedTask {
            definition: TaskDefinition {
                id: id.into(),
                title: title.into(),
                enabled: true,
                frequency: Frequency::Hourly,
                timezone: "UTC".into(),
                params: serde_json::json!({}),
            },
            state: TaskState {
                id: id.into(),
                status,
                last_run_at: Some(0),
                next_run_at: Some(3600),
                last_result_summary: summary.map(String::from),
                last_error: error.map(String::from),
                last_metrics: serde_json::Value::Null,
                extra: Default::default(),
            },
            duration: Duration::from_secs(2),
            state_changed: true,
        }
    }

    #[test]
    fn counts_match_statuses() {
        let tasks = vec![
            executed("a", "A", TaskStatus::Ok, Some("fine"), None),
            executed("b", "B", TaskStatus::Failed, Some("boom summary"), Some("boom")),
            executed("c", "C", TaskStatus::Skipped, Some("skipped all"), None),
        ];
        let card = build_card(&tasks, Some("groq".into()));
        assert_eq!(card.ok_count, 1);
        assert_eq!(card.failed_count, 1);
        assert_eq!(card.skipped_count, 1);
        assert_eq!(card.rows.len(), 3);
        assert_eq!(card.llm_provider_used.as_deref(), Some("groq"));
    }

    #[test]
    fn blank_title_defaults_to_untitled() {
        let tasks = vec![executed("a", "  ", TaskStatus::Ok, Some("fine"), None)];
        let card = build_card(&tasks, None);
        assert_eq!(card.rows[0].title, "Untitled");
    }

    #[test]
    fn missing_summary_defaults_to_unknown() {
        let tasks = vec![executed("a", "A", TaskStatus::Ok, None, None)];
        let card = build_card(&tasks, None);
        assert_eq!(card.rows[0].summary, "unknown");
    }

    #[test]
    fn empty_batch_produces_zero_row_card() {
        let card = build_card(&[], None);
        assert_eq!(card.ok_count, 0);
        assert!(card.rows.is_empty());
    }
}
