//! Task definitions and runtime state shared by the catalog, the kernel,
//! and every handler.
//!
//! A `TaskDefinition` is immutable, human-edited configuration loaded fresh
//! on every invocation. A `TaskState` is the mutable runtime record paired
//! with a definition by `id`. The two are split into separate top-level
//! documents (`tasks.json` / `state.json`) so the former can be commit-
//! tracked while the latter changes every run.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How often a task's frequency window recurs.
///
/// `daily` and `once_per_day` are accepted as aliases for the same
/// canonical interval — both describe "run at most once per 24h period".
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    EveryMinute,
    #[serde(rename = "every_5_min")]
    Every5Min,
    Hourly,
    #[serde(alias = "daily")]
    OncePerDay,
    Weekly,
}

impl Frequency {
    /// Canonical interval in seconds (spec.md §4.1).
    pub fn interval_secs(self) -> u64 {
        match self {
            Frequency::EveryMinute => 60,
            Frequency::Every5Min => 300,
            Frequency::Hourly => 3_600,
            Frequency::OncePerDay => 86_400,
            Frequency::Weekly => 7 * 86_400,
        }
    }
}

/// Immutable configuration for one scheduled unit, loaded verbatim from
/// the task catalog on every invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskDefinition {
    /// Unique string key used for registry lookup and state pairing.
    pub id: String,
    /// Human label shown on the notification card.
    pub title: String,
    /// Disabled tasks are always skipped, regardless of due status.
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub frequency: Frequency,
    /// IANA timezone name. UTC is the only behavior required; others are
    /// accepted and stored but not yet interpreted.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Opaque key-value map passed verbatim to the handler. Each handler
    /// parses its own expected shape out of this on entry.
    #[serde(default)]
    pub params: serde_json::Value,
}

fn default_true() -> bool {
    true
}

fn default_timezone() -> String {
    "UTC".to_string()
}

/// Current lifecycle status of a task's most recent (or in-flight) run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Scheduled,
    Running,
    Ok,
    Failed,
    Skipped,
}

/// Mutable per-task runtime record, paired with its definition by `id`.
///
/// Invariants (spec.md §3): `status ∈ {ok, skipped} ⇒ last_error == null`;
/// `status == failed ⇒ last_error` is non-empty; after a successful run
/// `last_run_at ≤ next_run_at` and the gap equals the frequency's
/// canonical interval.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskState {
    pub id: String,
    #[serde(default = "default_status")]
    pub status: TaskStatus,
    #[serde(default)]
    pub last_run_at: Option<i64>,
    #[serde(default)]
    pub next_run_at: Option<i64>,
    /// Truncated to 400 characters (see `crate::utils::truncate_string`).
    #[serde(default)]
    pub last_result_summary: Option<String>,
    /// Truncated to 400 characters; non-null iff `status == failed`.
    #[serde(default)]
    pub last_error: Option<String>,
    /// Opaque handler-specific telemetry, round-tripped without
    /// interpretation by the kernel.
    #[serde(default)]
    pub last_metrics: serde_json::Value,
    /// Unknown fields preserved verbatim for forward compatibility
    /// (spec.md §6: "Extra unknown fields must be preserved on round-trip").
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

fn default_status() -> TaskStatus {
    TaskStatus::Scheduled
}

impl TaskState {
    /// The default state for a definition observed for the first time:
    /// `status=scheduled`, all timestamps null.
    pub fn scheduled(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: TaskStatus::Scheduled,
            last_run_at: None,
            next_run_at: None,
            last_result_summary: None,
            last_error: None,
            last_metrics: serde_json::Value::Null,
            extra: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn daily_and_once_per_day_are_the_same_variant() {
        let daily: Frequency = serde_json::from_str("\"daily\"").unwrap();
        let once: Frequency = serde_json::from_str("\"once_per_day\"").unwrap();
        assert_eq!(daily, once);
        assert_eq!(daily.interval_secs(), 86_400);
    }

    #[test]
    fn weekly_interval_is_seven_days() {
        assert_eq!(Frequency::Weekly.interval_secs(), 604_800);
    }

    #[test]
    fn frequency_wire_strings_match_the_catalog_format() {
        for (raw, expected) in [
            ("\"every_minute\"", Frequency::EveryMinute),
            ("\"every_5_min\"", Frequency::Every5Min),
            ("\"hourly\"", Frequency::Hourly),
            ("\"once_per_day\"", Frequency::OncePerDay),
            ("\"weekly\"", Frequency::Weekly),
        ] {
            let parsed: Frequency = serde_json::from_str(raw).unwrap();
            assert_eq!(parsed, expected, "wire string {raw}");
        }
    }

    #[test]
    fn definition_defaults_enabled_and_utc() {
        let def: TaskDefinition = serde_json::from_str(
            r#"{"id":"t1","title":"Task One","frequency":"hourly"}"#,
        )
        .unwrap();
        assert!(def.enabled);
        assert_eq!(def.timezone, "UTC");
    }

    #[test]
    fn state_round_trips_unknown_fields() {
        let raw = r#"{"id":"t1","status":"ok","future_field":"kept"}"#;
        let state: TaskState = serde_json::from_str(raw).unwrap();
        assert_eq!(
            state.extra.get("future_field").and_then(|v| v.as_str()),
            Some("kept")
        );
        let back = serde_json::to_value(&state).unwrap();
        assert_eq!(back.get("future_field").and_then(|v| v.as_str()), Some("kept"));
    }

    #[test]
    fn scheduled_default_has_null_timestamps() {
        let s = TaskState::scheduled("t1");
        assert_eq!(s.status, TaskStatus::Scheduled);
        assert!(s.last_run_at.is_none());
        assert!(s.next_run_at.is_none());
        assert!(s.last_error.is_none());
    }
}
