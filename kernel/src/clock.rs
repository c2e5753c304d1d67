//! Pure functions mapping `(frequency, last_run_at, now)` to a due
//! predicate and a computed `next_run_at` (spec.md §4.1).
//!
//! No teacher equivalent: the teacher ticks each task on its own
//! `tokio::time::Interval` inside a persistent daemon loop
//! (`agent/src/scheduler.rs::TaskHandle`). A cron-invoked batch process has
//! no persistent loop to tick, so eligibility here is instead recomputed
//! fresh from elapsed wall-clock time on every invocation. This is the one
//! place the cron-invocation model genuinely diverges from the teacher's
//! always-on daemon model (recorded as an Open Question resolution in
//! DESIGN.md).

use shared::task::{Frequency, TaskState};

/// Grace margin absorbed into every frequency's due predicate. The
/// external timer fires at ~60s cadence; without this margin a task could
/// slip one full period whenever cron jitter pushes an invocation a few
/// seconds late (spec.md §4.1, §9). Sourced from `shared::defaults` so the
/// documented design constant lives in exactly one place.
pub fn grace_secs() -> i64 {
    shared::defaults::default_grace_secs() as i64
}

/// `compute_next_run(now, frequency) = now + canonical_interval(frequency)`
/// (spec.md §4.1). Advisory only — the due predicate is the sole
/// execution gate, this value is for display on the notification card.
pub fn compute_next_run(now: i64, frequency: Frequency) -> i64 {
    now + frequency.interval_secs() as i64
}

/// Is this task due to run at `now`, given its last state?
///
/// `last_run_at == None` is always due (never run before). Otherwise due
/// iff `now - last_run_at >= interval - grace_secs()`.
pub fn is_due(state: &TaskState, frequency: Frequency, now: i64) -> bool {
    match state.last_run_at {
        None => true,
        Some(last_run_at) => {
            let threshold = frequency.interval_secs() as i64 - grace_secs();
            now - last_run_at >= threshold
        }
    }
}
