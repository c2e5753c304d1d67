//! Groq provider: Groq exposes an OpenAI-compatible chat-completions
//! endpoint, so this is the same `async-openai` client as
//! [`super::openai::OpenAiProvider`] pointed at a different base URL
//! (SPEC_FULL §4.6a). Groq is the default primary provider (spec.md §6
//! `LLM_PROVIDER`).

use async_openai::config::OpenAIConfig as AsyncOpenAiConfig;
use async_openai::Client;
use async_trait::async_trait;

use super::openai::generate_chat_completion;
use super::{ArticlePrompt, GeneratedArticle, LlmProvider, ProviderError};

const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

pub struct GroqProvider {
    client: Client<AsyncOpenAiConfig>,
    model: String,
}

impl GroqProvider {
    pub fn new(api_key: String, model: String) -> Self {
        let config = AsyncOpenAiConfig::new().with_api_key(api_key).with_api_base(GROQ_BASE_URL);
        Self { client: Client::with_config(config), model }
    }
}

#[async_trait]
impl LlmProvider for GroqProvider {
    fn id(&self) -> &str {
        "groq"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &ArticlePrompt) -> Result<GeneratedArticle, ProviderError> {
        generate_chat_completion(&self.client, &self.model, prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_and_model_are_reported_for_the_summary_card() {
        let provider = GroqProvider::new("key".into(), "llama-3.1-8b-instant".into());
        assert_eq!(provider.id(), "groq");
        assert_eq!(provider.model(), "llama-3.1-8b-instant");
    }
}
