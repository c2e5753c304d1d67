//! LLM article generation pipeline — the exemplar handler (spec.md §4.6).
//!
//! No teacher equivalent; grounded directly on spec.md §4.6 and
//! SPEC_FULL §4.6a–c. Provider selection and search enrichment are
//! injected dependencies (`Arc<dyn ProviderFactory>`, `Arc<dyn
//! SearchClient>`) rather than module-level lookups, per spec.md §9's
//! redesign note — tests construct this handler with fakes.

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use shared::result::{ArticleMetrics, FailedItem, SkippedItem, SuccessfulItem};
use shared::task::TaskDefinition;
use shared::utils::{slugify, word_count};
use shared::TaskResult;

use crate::handlers::cover_image::{self, CoverMaterial, SourceRef};
use crate::providers::{ArticlePrompt, ProviderErrorKind, ProviderFactory};
use crate::registry::TaskHandler;
use crate::search::SearchClient;

const SLUG_MAX_LEN: usize = 80;

#[derive(Debug, Deserialize)]
struct ArticleParams {
    keywords: Vec<String>,
    #[serde(default = "default_language")]
    language: String,
    #[serde(default)]
    styles: Option<Vec<String>>,
}

fn default_language() -> String {
    "en-US".to_string()
}

pub struct ArticleHandler {
    provider_factory: Arc<dyn ProviderFactory>,
    search_client: Option<Arc<dyn SearchClient>>,
    search_snippet_count: usize,
    output_root: PathBuf,
    retry_backoff: Vec<u64>,
}

impl ArticleHandler {
    pub fn new(
        provider_factory: Arc<dyn ProviderFactory>,
        search_client: Option<Arc<dyn SearchClient>>,
        search_snippet_count: usize,
        output_root: impl Into<PathBuf>,
        retry_backoff: Vec<u64>,
    ) -> Self {
        Self {
            provider_factory,
            search_client,
            search_snippet_count,
            output_root: output_root.into(),
            retry_backoff,
        }
    }

    async fn context_for(&self, keyword: &str) -> (Vec<String>, Vec<SourceRef>) {
        let Some(client) = &self.search_client else {
            return (Vec::new(), Vec::new());
        };
        match client.search(keyword, self.search_snippet_count).await {
            Ok(snippets) => {
                let texts = snippets.iter().map(|s| s.text.clone()).collect();
                let sources = snippets
                    .iter()
                    .map(|s| SourceRef { url: s.source_url.clone(), site_name: s.site_name.clone() })
                    .collect();
                (texts, sources)
            }
            Err(e) => {
                tracing::warn!("search enrichment failed, proceeding without context: {e}");
                (Vec::new(), Vec::new())
            }
        }
    }

    /// Try every provider in priority order for one keyword/style prompt.
    /// Returns the generated article plus which provider produced it, or
    /// the classification of the last error seen once every provider is
    /// exhausted (spec.md §4.6 step 2, taxonomy table).
    async fn generate_with_fallback(
        &self,
        prompt: &ArticlePrompt,
    ) -> Result<(crate::providers::GeneratedArticle, String, String), (ProviderErrorKind, String)> {
        let mut last_error: Option<(ProviderErrorKind, String)> = None;

        for provider_id in self.provider_factory.priority() {
            let provider = match self.provider_factory.create(provider_id) {
                Ok(p) => p,
                Err(e) => {
                    last_error = Some((e.kind, e.message));
                    continue;
                }
            };

            let mut attempt = 0usize;
            loop {
                match provider.generate(prompt).await {
                    Ok(article) => {
                        return Ok((article, provider.id().to_string(), provider.model().to_string()))
                    }
                    Err(e) => {
                        let retriable = e.retriable();
                        last_error = Some((e.kind.clone(), e.message.clone()));
                        if !retriable || attempt >= self.retry_backoff.len() {
                            break;
                        }
                        tokio::time::sleep(std::time::Duration::from_secs(self.retry_backoff[attempt]))
                            .await;
                        attempt += 1;
                    }
                }
            }
        }

        Err(last_error.unwrap_or((ProviderErrorKind::Other, "no providers configured".to_string())))
    }
}

#[async_trait]
impl TaskHandler for ArticleHandler {
    async fn run(&self, definition: &TaskDefinition, _prior_metrics: &serde_json::Value) -> TaskResult {
        let start = Instant::now();
        let params: ArticleParams = match serde_json::from_value(definition.params.clone()) {
            Ok(p) => p,
            Err(e) => {
                return TaskResult::failed(
                    "malformed article task params",
                    format!("invalid params: {e}"),
                )
            }
        };

        if params.keywords.is_empty() {
            return TaskResult::ok("no keywords configured, nothing to generate");
        }

        let today = Utc::now().format("%Y-%m-%d").to_string();
        let output_dir = self.output_root.join("articles").join(&today);
        if let Err(e) = std::fs::create_dir_all(&output_dir) {
            return TaskResult::failed(
                "failed to prepare output directory",
                format!("could not create {}: {e}", output_dir.display()),
            );
        }

        let styles: Vec<Option<String>> = match &params.styles {
            Some(list) if !list.is_empty() => list.iter().cloned().map(Some).collect(),
            _ => vec![None],
        };

        let mut metrics = ArticleMetrics::default();
        let mut used_slugs: HashSet<String> = HashSet::new();
        let http_client = reqwest::Client::new();

        for keyword in &params.keywords {
            let (context_snippets, sources) = self.context_for(keyword).await;

            for style in &styles {
                let prompt = ArticlePrompt {
                    keyword: keyword.clone(),
                    language: params.language.clone(),
                    style: style.clone(),
                    context_snippets: context_snippets.clone(),
                };

                match self.generate_with_fallback(&prompt).await {
                    Ok((article, provider_id, model)) => {
                        let slug = unique_slug(&article.title, &mut used_slugs);
                        let wc = word_count(&article.body, &params.language);

                        if let Err(e) = write_article(
                            &output_dir, &slug, &article, &params, keyword, &provider_id, &model, wc, &sources,
                        ) {
                            metrics.failed_items.push(FailedItem {
                                keyword: keyword.clone(),
                                error_kind: "io_error".to_string(),
                                message: e.to_string(),
                            });
                            continue;
                        }

                        let material = CoverMaterial { sources: Some(sources.clone()) };
                        let _cover =
                            cover_image::fetch_cover_image(Some(material), &http_client, &slug, &output_dir).await;

                        metrics.successful_items.push(SuccessfulItem {
                            keyword: keyword.clone(),
                            title: article.title,
                            path: output_dir.join(format!("{slug}.md")).display().to_string(),
                            word_count: wc,
                            provider: provider_id,
                            model,
                        });
                    }
                    Err((kind, message)) => match kind {
                        ProviderErrorKind::MissingApiKey => metrics.skipped_items.push(SkippedItem {
                            keyword: keyword.clone(),
                            reason: "missing_api_key".to_string(),
                        }),
                        ProviderErrorKind::InsufficientQuota => metrics.skipped_items.push(SkippedItem {
                            keyword: keyword.clone(),
                            reason: "quota_exhausted".to_string(),
                        }),
                        _ => metrics.failed_items.push(FailedItem {
                            keyword: keyword.clone(),
                            error_kind: format!("{kind:?}"),
                            message,
                        }),
                    },
                }
            }
        }

        let duration = start.elapsed();
        let summary = format!(
            "{} succeeded, {} failed, {} skipped in {:.1}s",
            metrics.successful_items.len(),
            metrics.failed_items.len(),
            metrics.skipped_items.len(),
            duration.as_secs_f64()
        );
        let metrics_value = serde_json::to_value(&metrics).unwrap_or(serde_json::Value::Null);

        // Aggregation (spec.md §4.6, §9 Open Question resolution): success
        // if anything was produced; failed wins over skipped whenever a
        // retriable-exhausted failure occurred, since a rerun may recover.
        let result = if !metrics.successful_items.is_empty() {
            TaskResult::ok(summary)
        } else if !metrics.failed_items.is_empty() {
            TaskResult::failed(summary, "one or more keywords exhausted retriable providers")
        } else {
            TaskResult::skipped(summary)
        };

        result.with_metrics(metrics_value).with_duration(duration)
    }
}

#[allow(clippy::too_many_arguments)]
fn write_article(
    output_dir: &Path,
    slug: &str,
    article: &crate::providers::GeneratedArticle,
    params: &ArticleParams,
    keyword: &str,
    provider: &str,
    model: &str,
    word_count: usize,
    sources: &[SourceRef],
) -> std::io::Result<()> {
    let md_path = output_dir.join(format!("{slug}.md"));
    std::fs::write(&md_path, format!("# {}\n\n{}\n", article.title, article.body))?;

    let source_urls: Vec<&str> = sources.iter().map(|s| s.url.as_str()).collect();
    let metadata = serde_json::json!({
        "title": article.title,
        "keyword": keyword,
        "language": params.language,
        "word_count": word_count,
        "provider": provider,
        "model": model,
        "sources": source_urls,
        "created_at": Utc::now().to_rfc3339(),
    });
    let json_path = output_dir.join(format!("{slug}.json"));
    std::fs::write(&json_path, serde_json::to_string_pretty(&metadata)?)?;
    Ok(())
}

/// Derive a slug for `title`, disambiguating collisions within this run
/// with a numeric suffix (DESIGN.md Open Question decision — a strict
/// improvement over last-writer-wins since every keyword's output is
/// already in memory before anything is written).
fn unique_slug(title: &str, used: &mut HashSet<String>) -> String {
    let base = slugify(title, SLUG_MAX_LEN);
    if used.insert(base.clone()) {
        return base;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{base}-{n}");
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}
