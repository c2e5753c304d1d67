//! Immutable runtime configuration, built once from the environment at
//! process start.
//!
//! Grounded on the teacher's `agent/src/config.rs::ConfigManager` (load,
//! validate, fail fast with `with_context`), adapted from TOML-file loading
//! to env-var loading since spec.md §6 specifies an environment contract,
//! not a config file. Unlike the teacher's `ConfigManager` there is no
//! mutable state and no reconfiguration check interval — the kernel is a
//! short-lived batch process, so config is read exactly once per run and
//! threaded by reference to every component that needs it (SPEC_FULL §2).

use anyhow::{Context, Result};
use shared::defaults;
use std::env;

/// Everything the kernel and its handlers need from the environment
/// (spec.md §6, supplemented by SPEC_FULL §6). Built once via
/// [`Config::from_env`] and shared by reference for the remainder of the
/// run.
#[derive(Debug, Clone)]
pub struct Config {
    pub webhook_url: Option<String>,
    pub mention: String,

    pub llm_provider: String,
    pub provider_priority: Vec<String>,
    pub groq_api_key: Option<String>,
    pub groq_model: String,
    pub openai_api_key: Option<String>,
    pub openai_model: String,

    pub search_api_key: Option<String>,
    pub search_api_url: Option<String>,
    pub search_snippet_count: usize,

    pub tasks_file: String,
    pub state_file: String,
    pub output_root: String,

    pub max_concurrency: usize,
    pub retry_backoff: Vec<u64>,
    pub task_timeout_secs: u64,
    pub run_timeout_secs: u64,

    pub top_n: usize,

    pub table_api_url: Option<String>,
    pub table_api_key: Option<String>,
    pub table_definitions_id: Option<String>,
    pub table_state_id: Option<String>,
}

impl Config {
    /// Build configuration from process environment variables, applying
    /// the defaults in `shared::defaults` for anything unset. Fails fast
    /// (via `anyhow::Context`) on malformed numeric/list values so a typo
    /// in an environment variable surfaces immediately rather than as a
    /// confusing downstream panic.
    pub fn from_env() -> Result<Self> {
        let max_concurrency = parse_env_or("MAX_CONCURRENCY", defaults::default_max_concurrency())
            .context("MAX_CONCURRENCY must be a positive integer")?
            .max(1);

        let retry_backoff = match env::var("RETRY_BACKOFF") {
            Ok(raw) => parse_backoff(&raw).context("RETRY_BACKOFF must be comma-separated seconds, e.g. \"1,3,7\"")?,
            Err(_) => defaults::default_retry_backoff(),
        };

        let llm_provider = env::var("LLM_PROVIDER").unwrap_or_else(|_| defaults::default_llm_provider());

        // LLM_PROVIDER_PRIORITY (supplement, SPEC_FULL §6) is an explicit
        // override of the whole chain. Absent that, LLM_PROVIDER (spec.md
        // §6's "primary provider id") is promoted to the front of the
        // default chain rather than silently ignored.
        let provider_priority = match env::var("LLM_PROVIDER_PRIORITY") {
            Ok(raw) => raw.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect(),
            Err(_) => {
                let mut priority = vec![llm_provider.clone()];
                for candidate in defaults::default_provider_priority() {
                    if !priority.contains(&candidate) {
                        priority.push(candidate);
                    }
                }
                priority
            }
        };

        Ok(Self {
            webhook_url: env::var("WEBHOOK_URL").ok(),
            mention: env::var("MENTION").unwrap_or_default(),

            llm_provider,
            provider_priority,
            groq_api_key: env::var("GROQ_API_KEY").ok(),
            groq_model: env::var("GROQ_MODEL").unwrap_or_else(|_| defaults::default_groq_model()),
            openai_api_key: env::var("OPENAI_API_KEY").ok(),
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| defaults::default_openai_model()),

            search_api_key: env::var("SEARCH_API_KEY").ok(),
            search_api_url: env::var("SEARCH_API_URL").ok(),
            search_snippet_count: parse_env_or(
                "SEARCH_SNIPPET_COUNT",
                defaults::default_search_snippet_count(),
            )
            .context("SEARCH_SNIPPET_COUNT must be a positive integer")?,

            tasks_file: env::var("TASKS_FILE").unwrap_or_else(|_| defaults::default_tasks_file()),
            state_file: env::var("STATE_FILE").unwrap_or_else(|_| defaults::default_state_file()),
            output_root: env::var("OUTPUT_ROOT").unwrap_or_else(|_| defaults::default_output_root()),

            max_concurrency,
            retry_backoff,
            task_timeout_secs: parse_env_or(
                "TASK_TIMEOUT_SECS",
                defaults::default_task_timeout_secs(),
            )
            .context("TASK_TIMEOUT_SECS must be a positive integer")?,
            run_timeout_secs: parse_env_or("RUN_TIMEOUT_SECS", defaults::default_run_timeout_secs())
                .context("RUN_TIMEOUT_SECS must be a positive integer")?,

            top_n: parse_env_or("TOP_N", defaults::default_top_n())
                .context("TOP_N must be a positive integer")?,

            table_api_url: env::var("TABLE_API_URL").ok(),
            table_api_key: env::var("TABLE_API_KEY").ok(),
            table_definitions_id: env::var("TABLE_DEFINITIONS_ID").ok(),
            table_state_id: env::var("TABLE_STATE_ID").ok(),
        })
    }

    /// The remote-table storage backend is selected iff all four of its
    /// configuration fields are present (spec.md §4.2).
    pub fn uses_remote_table_storage(&self) -> bool {
        self.table_api_url.is_some()
            && self.table_api_key.is_some()
            && self.table_definitions_id.is_some()
            && self.table_state_id.is_some()
    }
}

fn parse_env_or<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        Err(_) => Ok(default),
    }
}

fn parse_backoff(raw: &str) -> Result<Vec<u64>> {
    raw.split(',')
        .map(|part| part.trim().parse::<u64>().map_err(anyhow::Error::from))
        .collect()
}
