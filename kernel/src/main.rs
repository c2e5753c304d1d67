//! Cron-driven task orchestrator.
//!
//! Invoked once per minute by an external cron (spec.md §1): loads the
//! catalog, runs every due task concurrently, persists state atomically,
//! and notifies a chat webhook, then exits. There is no resident process
//! and no internal scheduler loop — the teacher's `agent/src/main.rs`
//! ran as a long-lived daemon with its own tick interval; this binary is
//! a single batch invocation, structured the same way end to end
//! (logging setup, config load, fatal-error reporting) but without the
//! outer loop.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

mod clock;
mod config;
mod executor;
mod handlers;
mod notifier;
mod providers;
mod registry;
mod search;
mod storage;

use config::Config;
use executor::Executor;
use handlers::article::ArticleHandler;
use handlers::heartbeat::HeartbeatHandler;
use handlers::http_check::HttpCheckHandler;
use handlers::rss_watch::RssWatchHandler;
use handlers::trending_watch::TrendingWatchHandler;
use notifier::Notifier;
use providers::DefaultProviderFactory;
use registry::Registry;
use search::HttpSearchClient;
use storage::{JsonFileStorage, RemoteTableStorage, Storage};

#[tokio::main]
async fn main() -> Result<()> {
    let _logging_guard = init_logging();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("FATAL: failed to load configuration: {e:#}");
            std::process::exit(1);
        }
    };

    info!("kernel starting up, run_timeout_secs={}", config.run_timeout_secs);

    match run(&config).await {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            error!("FATAL: {e:#}");
            std::process::exit(1);
        }
    }
}

fn init_logging() -> tracing_appender::non_blocking::WorkerGuard {
    let file_appender = tracing_appender::rolling::daily("./logs", "kernel.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("kernel=info,shared=info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .json()
        .with_current_span(false)
        .with_span_list(false)
        .with_writer(non_blocking)
        .init();

    guard
}

/// One batch run: load, execute, persist, notify. Returns the process
/// exit code per spec.md §6 rather than calling `std::process::exit`
/// directly, so the success/failure path stays testable in principle.
async fn run(config: &Config) -> Result<i32> {
    let storage = build_storage(config);
    let (definitions, states) = storage
        .load()
        .await
        .context("failed to load task catalog/state")?;

    let registry = Arc::new(build_registry(config));
    let executor = Executor::new(
        config.max_concurrency,
        config.retry_backoff.clone(),
        Duration::from_secs(config.task_timeout_secs),
        Duration::from_secs(config.run_timeout_secs),
    );

    let now = shared::utils::current_timestamp();
    let executed = executor.run(registry, &definitions, &states, now).await;

    let mut new_states: Vec<shared::task::TaskState> = states.clone();
    for task in &executed {
        if !task.state_changed {
            continue;
        }
        if let Some(slot) = new_states.iter_mut().find(|s| s.id == task.state.id) {
            *slot = task.state.clone();
        } else {
            new_states.push(task.state.clone());
        }
    }

    storage
        .save(&new_states)
        .await
        .context("failed to persist task state")?;

    let any_failed = executed
        .iter()
        .any(|t| t.state.status == shared::task::TaskStatus::Failed);

    let notifier = Notifier::new(config.webhook_url.clone(), config.mention.clone());
    let llm_provider_used = executed
        .iter()
        .find(|t| t.definition.id == "article_generation")
        .map(|_| config.llm_provider.clone());
    // Transport failures are logged inside `notify` but never affect the
    // exit code (spec.md §4.5, §7): the process reports handler outcomes,
    // the notifier is best-effort.
    let _transport_ok = notifier.notify(&executed, llm_provider_used).await;

    if any_failed {
        warn!(count = executed.len(), "run completed with at least one failed task");
    } else {
        info!(count = executed.len(), "run completed, no failures");
    }

    Ok(if any_failed { 1 } else { 0 })
}

fn build_storage(config: &Config) -> Box<dyn Storage> {
    if config.uses_remote_table_storage() {
        info!("using remote table storage backend");
        Box::new(RemoteTableStorage::new(
            config.table_api_url.clone().expect("checked by uses_remote_table_storage"),
            config.table_api_key.clone().expect("checked by uses_remote_table_storage"),
            config.table_definitions_id.clone().expect("checked by uses_remote_table_storage"),
            config.table_state_id.clone().expect("checked by uses_remote_table_storage"),
        ))
    } else {
        Box::new(JsonFileStorage::new(config.tasks_file.clone(), config.state_file.clone()))
    }
}

/// Bind the fixed set of built-in handler ids (spec.md §4.3's "id →
/// handler" map) at startup. A definition's `id` is itself the dispatch
/// key, so deployments that want two independently scheduled instances
/// of the same built-in (e.g. two `http_check`s) give each its own id
/// in `tasks.json` and extend this map accordingly.
fn build_registry(config: &Config) -> Registry {
    let mut registry = Registry::new();

    registry.insert("heartbeat", Box::new(HeartbeatHandler));
    registry.insert("http_check", Box::new(HttpCheckHandler::new(reqwest::Client::new())));
    registry.insert("rss_watch", Box::new(RssWatchHandler::new(reqwest::Client::new())));

    let search_client: Option<Arc<dyn search::SearchClient>> = config.search_api_key.clone().map(|key| {
        Arc::new(HttpSearchClient::new(reqwest::Client::new(), config.search_api_url.clone(), key))
            as Arc<dyn search::SearchClient>
    });

    let provider_factory = Arc::new(DefaultProviderFactory::new(
        config.provider_priority.clone(),
        config.groq_api_key.clone(),
        config.groq_model.clone(),
        config.openai_api_key.clone(),
        config.openai_model.clone(),
    ));

    registry.insert(
        "article_generation",
        Box::new(ArticleHandler::new(
            provider_factory,
            search_client.clone(),
            config.search_snippet_count,
            config.output_root.clone(),
            config.retry_backoff.clone(),
        )),
    );

    // trending_watch has nothing to do without search enrichment, so it's
    // only registered once SEARCH_API_KEY is actually configured.
    if let Some(search_client) = search_client {
        registry.insert(
            "trending_watch",
            Box::new(TrendingWatchHandler::new(search_client, config.search_snippet_count, config.top_n)),
        );
    } else {
        warn!("SEARCH_API_KEY not set, trending_watch handler not registered");
    }

    registry
}
