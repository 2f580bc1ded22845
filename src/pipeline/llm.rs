//! Language-model interaction: build chat messages and call the provider.
//!
//! This module turns an assembled prompt into one model call. It is
//! intentionally thin: prompt wording lives in [`crate::prompts`], while
//! retries, timeouts and policy live in [`crate::generate`], so neither can
//! drift when the provider changes.
//!
//! ## Why a trait?
//!
//! [`ReportBackend`] is the seam between the generator and the network.
//! [`ProviderBackend`] adapts any `edgequake-llm` provider; tests plug in a
//! stub that fails on demand or counts calls.

use crate::config::ReportConfig;
use crate::error::BackendError;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use std::sync::Arc;
use tracing::debug;

/// Sampling parameters for one call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub max_tokens: usize,
}

impl GenerationOptions {
    pub fn from_config(config: &ReportConfig) -> Self {
        Self {
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

/// One model answer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    pub content: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

/// Something that can turn a system + user prompt into text.
#[async_trait]
pub trait ReportBackend: Send + Sync {
    /// Name used in logs, e.g. `"openai/gpt-4.1-nano"`.
    fn name(&self) -> String {
        "backend".to_string()
    }

    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: &GenerationOptions,
    ) -> Result<Completion, BackendError>;
}

/// [`ReportBackend`] over an `edgequake-llm` provider.
#[derive(Clone)]
pub struct ProviderBackend {
    provider: Arc<dyn LLMProvider>,
    label: String,
}

impl ProviderBackend {
    /// `label` identifies the provider in logs, e.g. `"gemini/gemini-1.5-flash"`.
    pub fn new(provider: Arc<dyn LLMProvider>, label: impl Into<String>) -> Self {
        Self {
            provider,
            label: label.into(),
        }
    }
}

impl std::fmt::Debug for ProviderBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderBackend")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ReportBackend for ProviderBackend {
    fn name(&self) -> String {
        self.label.clone()
    }

    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: &GenerationOptions,
    ) -> Result<Completion, BackendError> {
        let messages = vec![
            ChatMessage::system(system_prompt),
            ChatMessage::user(user_prompt),
        ];
        let opts = build_options(options);

        let response = self
            .provider
            .chat(&messages, Some(&opts))
            .await
            .map_err(|e| BackendError::Provider {
                detail: e.to_string(),
            })?;

        debug!(
            "{}: {} input tokens, {} output tokens",
            self.label,
            response.prompt_tokens,
            response.completion_tokens
        );

        Ok(Completion {
            content: response.content,
            input_tokens: response.prompt_tokens,
            output_tokens: response.completion_tokens,
        })
    }
}

/// Build `CompletionOptions` from the generation options.
fn build_options(options: &GenerationOptions) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(options.temperature),
        max_tokens: Some(options.max_tokens),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_options_defaults() {
        let config = ReportConfig::default();
        let opts = build_options(&GenerationOptions::from_config(&config));
        assert_eq!(opts.temperature, Some(0.7));
        assert_eq!(opts.max_tokens, Some(3000));
    }

    #[test]
    fn generation_options_follow_builder() {
        let config = ReportConfig::builder()
            .temperature(0.2)
            .max_tokens(512)
            .build()
            .unwrap();
        let opts = GenerationOptions::from_config(&config);
        assert_eq!(opts.temperature, 0.2);
        assert_eq!(opts.max_tokens, 512);
    }
}
