//! Default values consumed via `#[serde(default = "...")]` and by
//! `Config::from_env` (one function per default, grounded on the
//! teacher's `shared/src/defaults.rs` pattern).

/// Grace margin absorbed into every frequency's "due" predicate
/// (spec.md §4.1, §9 — the margin is a deliberate design choice, recorded
/// here rather than left implicit).
pub fn default_grace_secs() -> u64 {
    5
}

/// Bounded worker pool size (spec.md §6 `MAX_CONCURRENCY`).
pub fn default_max_concurrency() -> usize {
    5
}

/// Retry backoff sequence in seconds (spec.md §4.4 / §6 `RETRY_BACKOFF`).
pub fn default_retry_backoff() -> Vec<u64> {
    vec![1, 3, 7]
}

/// Per-task soft deadline in seconds (spec.md §5 / SPEC_FULL §6
/// `TASK_TIMEOUT_SECS`).
pub fn default_task_timeout_secs() -> u64 {
    120
}

/// Global run-level timeout in seconds (spec.md §5 / SPEC_FULL §6
/// `RUN_TIMEOUT_SECS`).
pub fn default_run_timeout_secs() -> u64 {
    600
}

/// Default state document path (spec.md §6 `STATE_FILE`).
pub fn default_state_file() -> String {
    "state.json".to_string()
}

/// Default task catalog path (SPEC_FULL §6 `TASKS_FILE`).
pub fn default_tasks_file() -> String {
    "tasks.json".to_string()
}

/// Default artifact output root (SPEC_FULL §6 `OUTPUT_ROOT`).
pub fn default_output_root() -> String {
    "outputs".to_string()
}

/// Default primary LLM provider id (spec.md §6 `LLM_PROVIDER`).
pub fn default_llm_provider() -> String {
    "groq".to_string()
}

/// Default provider fallback chain (spec.md §4.6).
pub fn default_provider_priority() -> Vec<String> {
    vec!["groq".into(), "openai".into(), "dry_run".into()]
}

/// Default Groq model id (spec.md §6).
pub fn default_groq_model() -> String {
    "llama-3.1-8b-instant".to_string()
}

/// Default OpenAI model id (spec.md §6).
pub fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

/// Default search-enrichment snippet count per keyword (SPEC_FULL §4.6b).
pub fn default_search_snippet_count() -> usize {
    3
}

/// Default topic selection cap for the trending-watch handler (spec.md
/// §6 `TOP_N`).
pub fn default_top_n() -> usize {
    3
}

/// Truncation cap shared by summaries/errors and webhook card fields
/// (spec.md §3, §4.5).
pub fn default_field_char_cap() -> usize {
    400
}
