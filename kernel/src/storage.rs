//! Catalog and state persistence (spec.md §4.2).
//!
//! Definitions are read-only from the kernel's perspective; only state is
//! written, and writes are atomic (write-temp-then-rename). Grounded on the
//! teacher's `agent/src/config.rs`'s load/validate shape for the read side;
//! the atomic write side is grounded on the pack's use of
//! `tempfile::NamedTempFile` (seen in the teacher's own `server` crate
//! tests and elsewhere in the pack), promoted here from a test-only
//! dependency to the runtime atomic-save implementation.

use anyhow::{Context, Result};
use async_trait::async_trait;
use shared::task::{TaskDefinition, TaskState};
use shared::MonitoringError;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// The two-operation interface every storage backend satisfies (spec.md
/// §4.2): load the full catalog, save the updated state document.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn load(&self) -> Result<(Vec<TaskDefinition>, Vec<TaskState>)>;
    async fn save(&self, states: &[TaskState]) -> Result<()>;
}

/// Default backend: two sibling JSON files on local disk. Definitions are
/// human-edited and commit-tracked; state changes every invocation and
/// (by default) is not committed — the split is deliberate (spec.md §4.2).
pub struct JsonFileStorage {
    pub tasks_file: PathBuf,
    pub state_file: PathBuf,
}

impl JsonFileStorage {
    pub fn new(tasks_file: impl Into<PathBuf>, state_file: impl Into<PathBuf>) -> Self {
        Self {
            tasks_file: tasks_file.into(),
            state_file: state_file.into(),
        }
    }
}

#[async_trait]
impl Storage for JsonFileStorage {
    async fn load(&self) -> Result<(Vec<TaskDefinition>, Vec<TaskState>)> {
        let defs_raw = std::fs::read_to_string(&self.tasks_file).map_err(|e| {
            MonitoringError::Config(format!(
                "failed to read definitions file {}: {e}",
                self.tasks_file.display()
            ))
        })?;
        let definitions: Vec<TaskDefinition> = serde_json::from_str(&defs_raw).map_err(|e| {
            MonitoringError::Config(format!(
                "malformed definitions JSON in {}: {e}",
                self.tasks_file.display()
            ))
        })?;

        let states = match std::fs::read_to_string(&self.state_file) {
            Ok(raw) => serde_json::from_str::<Vec<TaskState>>(&raw).map_err(|e| {
                MonitoringError::Config(format!(
                    "malformed state JSON in {}: {e}",
                    self.state_file.display()
                ))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("state file missing, defaulting every task to scheduled");
                Vec::new()
            }
            Err(e) => {
                return Err(MonitoringError::Config(format!(
                    "failed to read state file {}: {e}",
                    self.state_file.display()
                ))
                .into())
            }
        };

        // Pair every definition with its state row, defaulting unseen ones
        // to `scheduled` (spec.md §3 lifecycle).
        let mut paired = Vec::with_capacity(definitions.len());
        for def in &definitions {
            let existing = states.iter().find(|s| s.id == def.id);
            paired.push(existing.cloned().unwrap_or_else(|| TaskState::scheduled(&def.id)));
        }

        Ok((definitions, paired))
    }

    async fn save(&self, states: &[TaskState]) -> Result<()> {
        atomic_write_json(&self.state_file, states)
            .with_context(|| format!("failed to save state to {}", self.state_file.display()))
    }
}

/// Serialize `value` and write it to `path` atomically: a sibling temp
/// file in the same directory, `fsync`, then `rename` over the target
/// (spec.md §4.2). A crash at any point during this sequence leaves
/// either the prior or the new document fully intact — never a torn
/// write, because `rename` within one filesystem is atomic.
fn atomic_write_json<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .context("failed to create temp file for atomic state write")?;
    let json = serde_json::to_string_pretty(value).context("failed to serialize state")?;
    tmp.write_all(json.as_bytes())
        .context("failed to write temp state file")?;
    tmp.as_file().sync_all().context("failed to fsync temp state file")?;
    tmp.persist(path)
        .map_err(|e| anyhow::anyhow!("failed to rename temp state file into place: {e}"))?;
    Ok(())
}

/// Auto-selected in place of [`JsonFileStorage`] when `TABLE_API_URL`,
/// `TABLE_API_KEY`, `TABLE_DEFINITIONS_ID`, and `TABLE_STATE_ID` are all
/// configured (spec.md §4.2). Satisfies the same two-operation interface
/// against a generic key-value table API; the exact table schema is an
/// opaque collaborator per spec.md §1's scope note.
pub struct RemoteTableStorage {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    definitions_id: String,
    state_id: String,
}

impl RemoteTableStorage {
    pub fn new(api_url: String, api_key: String, definitions_id: String, state_id: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
            api_key,
            definitions_id,
            state_id,
        }
    }

    fn row_url(&self, table_id: &str) -> String {
        format!("{}/tables/{}/rows", self.api_url.trim_end_matches('/'), table_id)
    }
}

#[async_trait]
impl Storage for RemoteTableStorage {
    async fn load(&self) -> Result<(Vec<TaskDefinition>, Vec<TaskState>)> {
        let definitions: Vec<TaskDefinition> = self
            .client
            .get(self.row_url(&self.definitions_id))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| MonitoringError::Config(format!("remote definitions fetch failed: {e}")))?
            .json()
            .await
            .map_err(|e| MonitoringError::Config(format!("malformed remote definitions payload: {e}")))?;

        let states: Vec<TaskState> = match self
            .client
            .get(self.row_url(&self.state_id))
            .bearer_auth(&self.api_key)
            .send()
            .await
        {
            Ok(resp) => resp
                .json()
                .await
                .map_err(|e| MonitoringError::Config(format!("malformed remote state payload: {e}")))?,
            Err(e) => {
                warn!("remote state fetch failed, defaulting all tasks to scheduled: {e}");
                Vec::new()
            }
        };

        let mut paired = Vec::with_capacity(definitions.len());
        for def in &definitions {
            let existing = states.iter().find(|s| s.id == def.id);
            paired.push(existing.cloned().unwrap_or_else(|| TaskState::scheduled(&def.id)));
        }
        Ok((definitions, paired))
    }

    async fn save(&self, states: &[TaskState]) -> Result<()> {
        self.client
            .put(self.row_url(&self.state_id))
            .bearer_auth(&self.api_key)
            .json(states)
            .send()
            .await
            .map_err(|e| MonitoringError::Config(format!("remote state save failed: {e}")))?
            .error_for_status()
            .map_err(|e| MonitoringError::Config(format!("remote state save rejected: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::task::{Frequency, TaskStatus};

    fn sample_def(id: &str) -> TaskDefinition {
        TaskDefinition {
            id: id.into(),
            title: "Title".into(),
            enabled: true,
            frequency: Frequency::Hourly,
            timezone: "UTC".into(),
            params: serde_json::json!({}),
        }
    }

    #[tokio::test]
    async fn load_defaults_missing_state_to_scheduled() {
        let dir = tempfile::tempdir().unwrap();
        let tasks_path = dir.path().join("tasks.json");
        std::fs::write(&tasks_path, serde_json::to_string(&vec![sample_def("a")]).unwrap()).unwrap();
        let storage = JsonFileStorage::new(tasks_path, dir.path().join("state.json"));
        let (defs, states) = storage.load().await.unwrap();
        assert_eq!(defs.len(), 1);
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].status, TaskStatus::Scheduled);
        assert!(states[0].last_run_at.is_none());
    }

    #[tokio::test]
    async fn missing_definitions_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("missing.json"), dir.path().join("state.json"));
        let err = storage.load().await.unwrap_err();
        assert!(err.to_string().contains("failed to read definitions file"));
    }

    #[tokio::test]
    async fn malformed_definitions_json_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let tasks_path = dir.path().join("tasks.json");
        std::fs::write(&tasks_path, "{not valid json").unwrap();
        let storage = JsonFileStorage::new(tasks_path, dir.path().join("state.json"));
        let err = storage.load().await.unwrap_err();
        assert!(err.to_string().contains("malformed definitions JSON"));
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let tasks_path = dir.path().join("tasks.json");
        std::fs::write(&tasks_path, serde_json::to_string(&vec![sample_def("a")]).unwrap()).unwrap();
        let state_path = dir.path().join("state.json");
        let storage = JsonFileStorage::new(tasks_path.clone(), state_path.clone());

        let mut state = TaskState::scheduled("a");
        state.status = TaskStatus::Ok;
        state.last_run_at = Some(100);
        storage.save(&[state]).await.unwrap();

        let (_, states) = storage.load().await.unwrap();
        assert_eq!(states[0].status, TaskStatus::Ok);
        assert_eq!(states[0].last_run_at, Some(100));

        // No temp file left behind.
        let leftover: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path() != tasks_path && e.path() != state_path)
            .collect();
        assert!(leftover.is_empty(), "leftover files: {leftover:?}");
    }

    #[tokio::test]
    async fn unknown_state_fields_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let state_path = dir.path().join("state.json");
        std::fs::write(
            &state_path,
            r#"[{"id":"a","status":"ok","future_field":"kept"}]"#,
        )
        .unwrap();
        let tasks_path = dir.path().join("tasks.json");
        std::fs::write(&tasks_path, serde_json::to_string(&vec![sample_def("a")]).unwrap()).unwrap();
        let storage = JsonFileStorage::new(tasks_path, state_path);
        let (_, states) = storage.load().await.unwrap();
        assert_eq!(
            states[0].extra.get("future_field").and_then(|v| v.as_str()),
            Some("kept")
        );
    }
}
