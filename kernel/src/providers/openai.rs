//! OpenAI provider: a thin wrapper over `async-openai`'s chat-completions
//! client (SPEC_FULL §4.6a).
//!
//! Grounded on `mofa-foundation`'s `llm::openai::OpenAIProvider` — the
//! pack's one real example of this exact seam (an `async-openai::Client`
//! behind a small provider trait), including its approach to classifying
//! `OpenAIError` variants by inspecting the returned message.

use async_openai::config::OpenAIConfig as AsyncOpenAiConfig;
use async_openai::types::{
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;

use super::{ArticlePrompt, GeneratedArticle, LlmProvider, ProviderError};

pub struct OpenAiProvider {
    client: Client<AsyncOpenAiConfig>,
    model: String,
}

impl OpenAiProvider {
    pub fn new(api_key: String, model: String) -> Self {
        let config = AsyncOpenAiConfig::new().with_api_key(api_key);
        Self { client: Client::with_config(config), model }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn id(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &ArticlePrompt) -> Result<GeneratedArticle, ProviderError> {
        generate_chat_completion(&self.client, &self.model, prompt).await
    }
}

/// Shared by [`OpenAiProvider`] and [`super::groq::GroqProvider`]: both are
/// OpenAI-compatible chat-completions APIs, differing only in base URL and
/// credential.
pub(super) async fn generate_chat_completion(
    client: &Client<AsyncOpenAiConfig>,
    model: &str,
    prompt: &ArticlePrompt,
) -> Result<GeneratedArticle, ProviderError> {
    let system = ChatCompletionRequestSystemMessageArgs::default()
        .content(
            "You write concise articles. Respond with a JSON object of the shape \
             {\"title\": string, \"body\": string} and nothing else.",
        )
        .build()
        .map_err(|e| ProviderError::other(e.to_string()))?;

    let user_prompt = build_user_prompt(prompt);
    let user = ChatCompletionRequestUserMessageArgs::default()
        .content(user_prompt)
        .build()
        .map_err(|e| ProviderError::other(e.to_string()))?;

    let request = CreateChatCompletionRequestArgs::default()
        .model(model)
        .messages(vec![system.into(), user.into()])
        .temperature(0.7f32)
        .build()
        .map_err(|e| ProviderError::other(e.to_string()))?;

    let response = client.chat().create(request).await.map_err(classify_error)?;

    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| ProviderError::other("provider returned no message content"))?;

    parse_article_json(&content)
}

fn build_user_prompt(prompt: &ArticlePrompt) -> String {
    let style = prompt.style.as_deref().unwrap_or("overview");
    let mut text = format!(
        "Write a {style} article about \"{}\" in {}.",
        prompt.keyword, prompt.language
    );
    if !prompt.context_snippets.is_empty() {
        text.push_str("\n\nUse this context where relevant:\n");
        for snippet in &prompt.context_snippets {
            text.push_str("- ");
            text.push_str(snippet);
            text.push('\n');
        }
    }
    text
}

fn parse_article_json(content: &str) -> Result<GeneratedArticle, ProviderError> {
    let value: serde_json::Value = serde_json::from_str(content.trim())
        .map_err(|e| ProviderError::other(format!("malformed provider response: {e}")))?;
    let title = value
        .get("title")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ProviderError::other("provider response missing \"title\""))?
        .to_string();
    let body = value
        .get("body")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ProviderError::other("provider response missing \"body\""))?
        .to_string();
    Ok(GeneratedArticle { title, body })
}

/// Classify an `async-openai` error the way `mofa-foundation` does: the
/// structured `ApiError` variant is inspected by message for rate-limit
/// and quota phrasing (the API does not expose a stable machine-readable
/// code for either), network/timeout errors become `Transient`.
pub(super) fn classify_error(err: async_openai::error::OpenAIError) -> ProviderError {
    use async_openai::error::OpenAIError;
    match err {
        OpenAIError::ApiError(api_err) => {
            let message = api_err.message.clone();
            let lower = message.to_lowercase();
            if lower.contains("rate limit") {
                ProviderError::rate_limit(message)
            } else if lower.contains("quota") || lower.contains("billing") {
                ProviderError::quota(message)
            } else {
                ProviderError::other(message)
            }
        }
        OpenAIError::Reqwest(e) => ProviderError::transient(e.to_string()),
        other => ProviderError::other(other.to_string()),
    }
}
