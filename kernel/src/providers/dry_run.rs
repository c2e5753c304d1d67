//! `dry_run` provider: synthesizes deterministic placeholder content
//! without any network call, so the pipeline (and its tests) run with no
//! credentials configured (spec.md §4.6 step 2, scenario 4).
//!
//! Grounded on spec.md §8's round-trip property: "given identical inputs
//! and the `dry_run` provider, produces identical `.md`/`.json` pairs —
//! timestamps MUST be the only source of variance." The body below has no
//! clock or randomness in it at all, which trivially satisfies that.

use async_trait::async_trait;

use super::{ArticlePrompt, GeneratedArticle, LlmProvider, ProviderError};

pub struct DryRunProvider {
    model: String,
}

impl Default for DryRunProvider {
    fn default() -> Self {
        Self { model: "dry-run-v1".to_string() }
    }
}

#[async_trait]
impl LlmProvider for DryRunProvider {
    fn id(&self) -> &str {
        "dry_run"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &ArticlePrompt) -> Result<GeneratedArticle, ProviderError> {
        let style = prompt.style.as_deref().unwrap_or("overview");
        let title = if prompt.language.eq_ignore_ascii_case("zh-CN") {
            format!("{}：{}导读", prompt.keyword, style)
        } else {
            format!("{} — a {style}", titlecase(&prompt.keyword))
        };

        let mut paragraphs = Vec::new();
        if prompt.language.eq_ignore_ascii_case("zh-CN") {
            paragraphs.push(format!(
                "本文从{}的角度介绍{}的背景、现状与未来趋势。",
                style, prompt.keyword
            ));
            paragraphs.push(format!("{}仍然是一个值得持续关注的主题。", prompt.keyword));
        } else {
            paragraphs.push(format!(
                "This {style} introduces {} by surveying its background, current state, and outlook.",
                prompt.keyword
            ));
            paragraphs.push(format!(
                "{} remains a subject worth tracking as the landscape evolves.",
                titlecase(&prompt.keyword)
            ));
        }
        for snippet in &prompt.context_snippets {
            paragraphs.push(format!("Context: {snippet}"));
        }

        Ok(GeneratedArticle { title, body: paragraphs.join("\n\n") })
    }
}

fn titlecase(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn identical_prompts_produce_identical_output() {
        let provider = DryRunProvider::default();
        let prompt = ArticlePrompt {
            keyword: "rust".into(),
            language: "en-US".into(),
            style: Some("guide".into()),
            context_snippets: vec![],
        };
        let a = provider.generate(&prompt).await.unwrap();
        let b = provider.generate(&prompt).await.unwrap();
        assert_eq!(a.title, b.title);
        assert_eq!(a.body, b.body);
    }

    #[tokio::test]
    async fn never_fails_and_never_calls_network() {
        let provider = DryRunProvider::default();
        let prompt = ArticlePrompt {
            keyword: "cloud".into(),
            language: "en-US".into(),
            style: None,
            context_snippets: vec!["a snippet".into()],
        };
        let article = provider.generate(&prompt).await.unwrap();
        assert!(article.body.contains("cloud") || article.body.contains("Cloud"));
    }
}
