//! Bounded worker pool over eligible tasks (spec.md §4.4).
//!
//! Grounded on the teacher's `agent/src/scheduler.rs` spawn-per-task-and-
//! collect shape, adapted from "ticker loop" to "bounded one-shot batch":
//! a `tokio::sync::Semaphore` bounds concurrency and a `tokio::task::
//! JoinSet` replaces the teacher's per-task `mpsc` result channel, since
//! the cron model has no persistent loop to collect results into.

use shared::task::{TaskDefinition, TaskState, TaskStatus};
use shared::TaskResult;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::clock;
use crate::registry::Registry;

/// One task's outcome for this run: the state row to persist and the
/// fields the notifier needs for its card row. `executed` is `false` for
/// tasks synthesized by the global run-deadline (spec.md §5: "still-
/// running tasks have their state left unchanged").
pub struct ExecutedTask {
    pub definition: TaskDefinition,
    pub state: TaskState,
    pub duration: Duration,
    pub state_changed: bool,
}

pub struct Executor {
    pub max_concurrency: usize,
    pub retry_backoff: Vec<u64>,
    pub task_timeout: Duration,
    pub run_timeout: Duration,
}

impl Executor {
    pub fn new(
        max_concurrency: usize,
        retry_backoff: Vec<u64>,
        task_timeout: Duration,
        run_timeout: Duration,
    ) -> Self {
        Self {
            max_concurrency: max_concurrency.max(1),
            retry_backoff,
            task_timeout,
            run_timeout,
        }
    }

    /// Run every eligible task concurrently and merge results back into
    /// per-task state (spec.md §4.4 steps 1–5). Definitions that aren't
    /// due, or are disabled, are left entirely untouched and absent from
    /// the returned list.
    pub async fn run(
        &self,
        registry: Arc<Registry>,
        definitions: &[TaskDefinition],
        states: &[TaskState],
        now: i64,
    ) -> Vec<ExecutedTask> {
        let eligible: Vec<(TaskDefinition, TaskState)> = definitions
            .iter()
            .filter_map(|def| {
                let state = states.iter().find(|s| s.id == def.id)?.clone();
                let due = def.enabled && clock::is_due(&state, def.frequency, now);
                due.then(|| (def.clone(), state))
            })
            .collect();

        if eligible.is_empty() {
            debug!("no eligible tasks this run");
            return Vec::new();
        }

        debug!(count = eligible.len(), "dispatching eligible tasks");

        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut join_set: JoinSet<(TaskDefinition, TaskState, TaskResult, Duration)> = JoinSet::new();

        for (def, state) in eligible {
            let semaphore = semaphore.clone();
            let registry = registry.clone();
            let backoff = self.retry_backoff.clone();
            let task_timeout = self.task_timeout;

            join_set.spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore never closed");
                let start = Instant::now();
                let prior_metrics = state.last_metrics.clone();
                let result = invoke_with_retry(&registry, &def, &prior_metrics, &backoff, task_timeout).await;
                (def, state, result, start.elapsed())
            });
        }

        let mut executed = Vec::new();
        let batch = tokio::time::timeout(self.run_timeout, async {
            while let Some(joined) = join_set.join_next().await {
                match joined {
                    Ok((def, prior_state, result, duration)) => {
                        let new_state = merge_result(&def, &prior_state, &result, now);
                        executed.push(ExecutedTask {
                            definition: def,
                            state: new_state,
                            duration,
                            state_changed: true,
                        });
                    }
                    Err(join_err) => {
                        warn!("a task worker panicked: {join_err}");
                    }
                }
            }
        })
        .await;

        if batch.is_err() {
            warn!(
                timeout_secs = self.run_timeout.as_secs(),
                "global run deadline exceeded; synthesizing failed rows for unfinished tasks"
            );
            join_set.abort_all();
            let done_ids: std::collections::HashSet<_> =
                executed.iter().map(|e| e.definition.id.clone()).collect();
            for def in definitions {
                if !done_ids.contains(&def.id) {
                    if let Some(prior_state) = states.iter().find(|s| s.id == def.id) {
                        let due = def.enabled && clock::is_due(prior_state, def.frequency, now);
                        if due {
                            // spec.md §5/§7: the persisted row is left untouched
                            // (`state_changed: false` skips this at save time) but
                            // the notifier/exit-code path still needs to see a
                            // `failed` outcome for this run's batch.
                            let mut synthesized = prior_state.clone();
                            synthesized.status = TaskStatus::Failed;
                            synthesized.last_error = Some("run_deadline_exceeded".to_string());
                            executed.push(ExecutedTask {
                                definition: def.clone(),
                                state: synthesized,
                                duration: self.run_timeout,
                                state_changed: false,
                            });
                        }
                    }
                }
            }
        }

        executed
    }
}

/// Invoke a handler, applying the unknown-id fallback, the outer panic
/// guard, the per-task soft deadline, and in-worker retry for errors the
/// handler flagged retriable (spec.md §4.3, §4.4).
async fn invoke_with_retry(
    registry: &Registry,
    definition: &TaskDefinition,
    prior_metrics: &serde_json::Value,
    backoff: &[u64],
    task_timeout: Duration,
) -> TaskResult {
    let Some(handler) = registry.get(&definition.id) else {
        return TaskResult::failed(
            "unknown task id",
            format!("unknown_task_id:{}", definition.id),
        );
    };

    let mut attempt = 0usize;
    loop {
        let outcome = match tokio::time::timeout(task_timeout, handler.run(definition, prior_metrics)).await {
            Ok(result) => result,
            Err(_) => TaskResult::failed(
                format!("exceeded soft deadline of {}s", task_timeout.as_secs()),
                "task_timeout_exceeded",
            )
            .retriable(),
        };

        if outcome.status != TaskStatus::Failed || !outcome.retriable || attempt >= backoff.len() {
            return outcome;
        }

        let delay = Duration::from_secs(backoff[attempt]);
        debug!(
            id = %definition.id,
            attempt,
            delay_secs = delay.as_secs(),
            "retrying retriable failure"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

/// Fold a handler's result into the task's persisted state (spec.md
/// §4.4 step 5): `last_run_at=now`, `next_run_at` computed from the
/// frequency, and status/summary/error/metrics copied from the result.
fn merge_result(
    definition: &TaskDefinition,
    _prior_state: &TaskState,
    result: &TaskResult,
    now: i64,
) -> TaskState {
    let cap = shared::defaults::default_field_char_cap();
    TaskState {
        id: definition.id.clone(),
        status: result.status,
        last_run_at: Some(now),
        next_run_at: Some(clock::compute_next_run(now, definition.frequency)),
        last_result_summary: Some(shared::utils::truncate_string(&result.summary, cap)),
        last_error: result
            .error
            .as_ref()
            .map(|e| shared::utils::truncate_string(e, cap)),
        last_metrics: result.metrics.clone(),
        extra: Default::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TaskHandler;
    use async_trait::async_trait;
    use shared::task::Frequency;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn def(id: &str, frequency: Frequency) -> TaskDefinition {
        TaskDefinition {
            id: id.into(),
            title: format!("Task {id}"),
            enabled: true,
            frequency,
            timezone: "UTC".into(),
            params: serde_json::json!({}),
        }
    }

    struct Scripted(fn() -> TaskResult);

    #[async_trait]
    impl TaskHandler for Scripted {
        async fn run(&self, _definition: &TaskDefinition, _prior_metrics: &serde_json::Value) -> TaskResult {
            (self.0)()
        }
    }

    struct CountingFlaky {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TaskHandler for CountingFlaky {
        async fn run(&self, _definition: &TaskDefinition, _prior_metrics: &serde_json::Value) -> TaskResult {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                TaskResult::failed("transient", "network blip").retriable()
            } else {
                TaskResult::ok("recovered")
            }
        }
    }

    #[tokio::test]
    async fn not_due_task_is_left_out_of_batch() {
        let mut registry = Registry::new();
        registry.insert("a", Box::new(Scripted(|| TaskResult::ok("fine"))));
        let executor = Executor::new(5, vec![], Duration::from_secs(5), Duration::from_secs(30));

        let def_a = def("a", Frequency::Hourly);
        let mut state_a = TaskState::scheduled("a");
        state_a.last_run_at = Some(0); // just ran, an hour not yet elapsed

        let executed = executor
            .run(Arc::new(registry), &[def_a], &[state_a], 60)
            .await;
        assert!(executed.is_empty());
    }

    #[tokio::test]
    async fn unknown_handler_produces_failed_with_prefixed_error() {
        let registry = Registry::new();
        let executor = Executor::new(5, vec![], Duration::from_secs(5), Duration::from_secs(30));
        let def_a = def("ghost", Frequency::Hourly);
        let state_a = TaskState::scheduled("ghost");

        let executed = executor
            .run(Arc::new(registry), &[def_a], &[state_a], 1000)
            .await;
        assert_eq!(executed.len(), 1);
        assert_eq!(executed[0].state.status, TaskStatus::Failed);
        assert_eq!(
            executed[0].state.last_error.as_deref(),
            Some("unknown_task_id:ghost")
        );
    }

    #[tokio::test]
    async fn one_handler_failing_does_not_block_another_succeeding() {
        let mut registry = Registry::new();
        registry.insert("a", Box::new(Scripted(|| TaskResult::failed("boom summary", "boom"))));
        registry.insert("b", Box::new(Scripted(|| TaskResult::ok("fine"))));
        let executor = Executor::new(5, vec![], Duration::from_secs(5), Duration::from_secs(30));

        let defs = vec![def("a", Frequency::Hourly), def("b", Frequency::Hourly)];
        let states = vec![TaskState::scheduled("a"), TaskState::scheduled("b")];

        let mut executed = executor.run(Arc::new(registry), &defs, &states, 1000).await;
        executed.sort_by(|a, b| a.definition.id.cmp(&b.definition.id));

        assert_eq!(executed[0].state.status, TaskStatus::Failed);
        assert_eq!(executed[0].state.last_error.as_deref(), Some("boom"));
        assert_eq!(executed[1].state.status, TaskStatus::Ok);
        assert!(executed[1].state.last_error.is_none());
    }

    #[tokio::test]
    async fn retriable_failure_is_retried_until_it_recovers() {
        let mut registry = Registry::new();
        registry.insert(
            "a",
            Box::new(CountingFlaky { calls: AtomicUsize::new(0) }),
        );
        let executor = Executor::new(
            5,
            vec![0, 0, 0], // near-instant backoff so the test stays fast
            Duration::from_secs(5),
            Duration::from_secs(30),
        );

        let executed = executor
            .run(
                Arc::new(registry),
                &[def("a", Frequency::Hourly)],
                &[TaskState::scheduled("a")],
                1000,
            )
            .await;
        assert_eq!(executed[0].state.status, TaskStatus::Ok);
    }

    #[tokio::test]
    async fn non_retriable_failure_is_not_retried() {
        struct CountingFailer(AtomicUsize);
        #[async_trait]
        impl TaskHandler for CountingFailer {
            async fn run(&self, _definition: &TaskDefinition, _prior_metrics: &serde_json::Value) -> TaskResult {
                self.0.fetch_add(1, Ordering::SeqCst);
                TaskResult::failed("nope", "non_retriable")
            }
        }
        let mut registry = Registry::new();
        registry.insert("a", Box::new(CountingFailer(AtomicUsize::new(0))));
        let executor = Executor::new(5, vec![1, 1, 1], Duration::from_secs(5), Duration::from_secs(30));

        let executed = executor
            .run(
                Arc::new(registry),
                &[def("a", Frequency::Hourly)],
                &[TaskState::scheduled("a")],
                1000,
            )
            .await;
        assert_eq!(executed[0].state.status, TaskStatus::Failed);
    }

    #[tokio::test]
    async fn max_concurrency_one_executes_serially_with_same_outcomes() {
        let mut registry = Registry::new();
        registry.insert("a", Box::new(Scripted(|| TaskResult::ok("a done"))));
        registry.insert("b", Box::new(Scripted(|| TaskResult::ok("b done"))));
        let executor = Executor::new(1, vec![], Duration::from_secs(5), Duration::from_secs(30));

        let defs = vec![def("a", Frequency::Hourly), def("b", Frequency::Hourly)];
        let states = vec![TaskState::scheduled("a"), TaskState::scheduled("b")];
        let executed = executor.run(Arc::new(registry), &defs, &states, 1000).await;
        assert_eq!(executed.len(), 2);
        assert!(executed.iter().all(|e| e.state.status == TaskStatus::Ok));
    }

    #[tokio::test]
    async fn empty_eligible_set_still_returns_empty_without_panicking() {
        let registry = Registry::new();
        let executor = Executor::new(5, vec![], Duration::from_secs(5), Duration::from_secs(30));
        let executed = executor.run(Arc::new(registry), &[], &[], 1000).await;
        assert!(executed.is_empty());
    }

    struct NeverReturns;

    #[async_trait]
    impl TaskHandler for NeverReturns {
        async fn run(&self, _definition: &TaskDefinition, _prior_metrics: &serde_json::Value) -> TaskResult {
            std::future::pending::<()>().await;
            unreachable!()
        }
    }

    #[tokio::test]
    async fn run_deadline_synthesizes_a_failed_row_without_touching_persisted_state() {
        let mut registry = Registry::new();
        registry.insert("a", Box::new(NeverReturns));
        // Per-task timeout longer than the run timeout so the global
        // deadline fires first, the scenario spec.md §5 describes.
        let executor = Executor::new(5, vec![], Duration::from_secs(10), Duration::from_millis(50));

        let mut prior_state = TaskState::scheduled("a");
        prior_state.status = TaskStatus::Ok;
        let executed = executor
            .run(Arc::new(registry), &[def("a", Frequency::Hourly)], &[prior_state], 1000)
            .await;

        assert_eq!(executed.len(), 1);
        assert_eq!(executed[0].state.status, TaskStatus::Failed);
        assert_eq!(executed[0].state.last_error.as_deref(), Some("run_deadline_exceeded"));
        assert!(!executed[0].state_changed, "deadline-exceeded rows must not overwrite persisted state");
    }
}
