//! Multi-provider LLM client contract for the article generation handler
//! (spec.md §4.6, SPEC_FULL §4.6a).
//!
//! No teacher equivalent — the teacher has no LLM pipeline. The error
//! taxonomy is grounded directly on spec.md §4.6's table; the OpenAI-
//! compatible client wrapper is grounded on `mofa-foundation`'s
//! `llm::openai::OpenAIProvider`, the pack's one real example of wrapping
//! `async-openai` behind a small provider trait.
//!
//! The factory is an injected dependency (constructor argument), not a
//! module-level lookup, per spec.md §9's redesign note: tests supply a
//! fake factory instead of monkey-patching a global.

mod dry_run;
mod groq;
mod openai;

pub use dry_run::DryRunProvider;
pub use groq::GroqProvider;
pub use openai::OpenAiProvider;

use async_trait::async_trait;
use std::sync::Arc;

/// Classification of a provider call's outcome (spec.md §4.6 taxonomy).
/// `retriable()` decides in-provider backoff; the handler also uses the
/// variant itself to decide whether a keyword is ultimately `skipped` or
/// `failed` once every provider in the chain is exhausted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderErrorKind {
    MissingApiKey,
    InsufficientQuota,
    RateLimit,
    Transient,
    Other,
}

impl ProviderErrorKind {
    pub fn retriable(&self) -> bool {
        !matches!(self, ProviderErrorKind::MissingApiKey | ProviderErrorKind::InsufficientQuota)
    }
}

#[derive(Debug, Clone)]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
}

impl ProviderError {
    pub fn missing_api_key(provider: &str) -> Self {
        Self {
            kind: ProviderErrorKind::MissingApiKey,
            message: format!("{provider}: required API key is not configured"),
        }
    }

    pub fn quota(message: impl Into<String>) -> Self {
        Self { kind: ProviderErrorKind::InsufficientQuota, message: message.into() }
    }

    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self { kind: ProviderErrorKind::RateLimit, message: message.into() }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self { kind: ProviderErrorKind::Transient, message: message.into() }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self { kind: ProviderErrorKind::Other, message: message.into() }
    }

    pub fn retriable(&self) -> bool {
        self.kind.retriable()
    }
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

/// What one keyword/style pairing asks a provider to write.
#[derive(Debug, Clone)]
pub struct ArticlePrompt {
    pub keyword: String,
    pub language: String,
    pub style: Option<String>,
    pub context_snippets: Vec<String>,
}

/// What a successful provider call hands back, before slugging/word-count.
#[derive(Debug, Clone)]
pub struct GeneratedArticle {
    pub title: String,
    pub body: String,
}

/// One LLM backend in the fallback chain (spec.md §4.6, glossary
/// "provider chain"). `model()` is surfaced into article metadata and the
/// summary card extension (spec.md §4.5).
#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn id(&self) -> &str;
    fn model(&self) -> &str;
    async fn generate(&self, prompt: &ArticlePrompt) -> Result<GeneratedArticle, ProviderError>;
}

/// Builds providers by id on demand, returning `MissingApiKey` when a
/// provider's credential is not configured (spec.md §4.6 step 2).
/// Injected into [`crate::handlers::article::ArticleHandler`] so tests can
/// supply a fake without touching the real environment (spec.md §9).
pub trait ProviderFactory: Send + Sync {
    /// The fallback order to try, e.g. `["groq", "openai", "dry_run"]`.
    fn priority(&self) -> &[String];
    fn create(&self, provider_id: &str) -> Result<Arc<dyn LlmProvider>, ProviderError>;
}

/// Builds the real providers from configuration (spec.md §6 env vars).
pub struct DefaultProviderFactory {
    priority: Vec<String>,
    groq_api_key: Option<String>,
    groq_model: String,
    openai_api_key: Option<String>,
    openai_model: String,
}

impl DefaultProviderFactory {
    pub fn new(
        priority: Vec<String>,
        groq_api_key: Option<String>,
        groq_model: String,
        openai_api_key: Option<String>,
        openai_model: String,
    ) -> Self {
        Self { priority, groq_api_key, groq_model, openai_api_key, openai_model }
    }
}

impl ProviderFactory for DefaultProviderFactory {
    fn priority(&self) -> &[String] {
        &self.priority
    }

    fn create(&self, provider_id: &str) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        match provider_id {
            "groq" => match &self.groq_api_key {
                Some(key) => Ok(Arc::new(GroqProvider::new(key.clone(), self.groq_model.clone()))),
                None => Err(ProviderError::missing_api_key("groq")),
            },
            "openai" => match &self.openai_api_key {
                Some(key) => Ok(Arc::new(OpenAiProvider::new(key.clone(), self.openai_model.clone()))),
                None => Err(ProviderError::missing_api_key("openai")),
            },
            "dry_run" => Ok(Arc::new(DryRunProvider::default())),
            other => Err(ProviderError::other(format!("unknown provider id: {other}"))),
        }
    }
}
