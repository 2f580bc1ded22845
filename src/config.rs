//! Configuration types for report generation and PDF rendering.
//!
//! Two structs, one per capability:
//!
//! * [`ReportConfig`] — everything the report generator needs: model
//!   provider, sampling, retries, timeouts, and the threat-intel search.
//! * [`RenderConfig`] — page geometry and branding for the PDF renderer.
//!
//! The renderer never receives a `ReportConfig`, so it never sees a model
//! credential. Both are built via builders that clamp or reject out-of-range
//! values at construction time.

use crate::error::ReportError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Public web-search endpoint queried for enrichment snippets.
pub const DEFAULT_SEARCH_ENDPOINT: &str = "https://www.google.com/search";

/// Browser-like identification header sent with search requests.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Label prefixed to the keyword list when building the search query.
pub const DEFAULT_QUERY_LABEL: &str = "cybersecurity threats";

/// Configuration for report generation.
///
/// Built via [`ReportConfig::builder()`] or using [`ReportConfig::default()`].
///
/// # Example
/// ```rust
/// use cypherdeck::{EnrichmentPolicy, ReportConfig};
///
/// let config = ReportConfig::builder()
///     .provider_name("gemini")
///     .model("gemini-1.5-flash")
///     .temperature(0.7)
///     .enrichment_policy(EnrichmentPolicy::Degrade)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ReportConfig {
    /// LLM model identifier, e.g. "gemini-1.5-flash", "gpt-4.1-mini".
    /// If None, a per-provider default is used.
    pub model: Option<String>,

    /// LLM provider name (e.g. "gemini", "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.7.
    ///
    /// Reports are narrative prose; moderate temperature keeps the wording
    /// varied while the template pins the structure.
    pub temperature: f32,

    /// Maximum tokens the model may generate. Default: 3000.
    pub max_tokens: usize,

    /// Retry attempts after a failed model call. Default: 2.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-call timeout for the model in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// Custom system prompt. If None, uses [`crate::prompts::DEFAULT_SYSTEM_PROMPT`].
    pub system_prompt: Option<String>,

    /// What to do when the threat-intel search fails. Default: [`EnrichmentPolicy::Abort`].
    pub enrichment_policy: EnrichmentPolicy,

    /// Search endpoint URL. Default: [`DEFAULT_SEARCH_ENDPOINT`].
    pub search_endpoint: String,

    /// User-Agent header for search requests. Default: [`DEFAULT_USER_AGENT`].
    pub search_user_agent: String,

    /// Search request timeout in seconds. Default: 15.
    pub search_timeout_secs: u64,

    /// Maximum snippets kept from the search response. Default: 3.
    pub max_snippets: usize,

    /// Label placed before the keywords in the search query.
    pub query_label: String,

    /// Maximum keywords joined into the search query. Default: 20.
    pub max_query_keywords: usize,

    /// Optional per-stage progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.7,
            max_tokens: 3000,
            max_retries: 2,
            retry_backoff_ms: 500,
            api_timeout_secs: 120,
            system_prompt: None,
            enrichment_policy: EnrichmentPolicy::default(),
            search_endpoint: DEFAULT_SEARCH_ENDPOINT.to_string(),
            search_user_agent: DEFAULT_USER_AGENT.to_string(),
            search_timeout_secs: 15,
            max_snippets: 3,
            query_label: DEFAULT_QUERY_LABEL.to_string(),
            max_query_keywords: 20,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ReportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReportConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("enrichment_policy", &self.enrichment_policy)
            .field("search_endpoint", &self.search_endpoint)
            .field("search_timeout_secs", &self.search_timeout_secs)
            .field("max_snippets", &self.max_snippets)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn PipelineProgressCallback>"),
            )
            .finish()
    }
}

impl ReportConfig {
    /// Create a new builder for `ReportConfig`.
    pub fn builder() -> ReportConfigBuilder {
        ReportConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ReportConfig`].
pub struct ReportConfigBuilder {
    config: ReportConfig,
}

impl fmt::Debug for ReportConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReportConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl ReportConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn enrichment_policy(mut self, policy: EnrichmentPolicy) -> Self {
        self.config.enrichment_policy = policy;
        self
    }

    pub fn search_endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.search_endpoint = url.into();
        self
    }

    pub fn search_user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.search_user_agent = ua.into();
        self
    }

    pub fn search_timeout_secs(mut self, secs: u64) -> Self {
        self.config.search_timeout_secs = secs;
        self
    }

    pub fn max_snippets(mut self, n: usize) -> Self {
        self.config.max_snippets = n;
        self
    }

    pub fn query_label(mut self, label: impl Into<String>) -> Self {
        self.config.query_label = label.into();
        self
    }

    pub fn max_query_keywords(mut self, n: usize) -> Self {
        self.config.max_query_keywords = n.max(1);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ReportConfig, ReportError> {
        let c = &self.config;
        if c.max_tokens == 0 {
            return Err(ReportError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if c.api_timeout_secs == 0 || c.search_timeout_secs == 0 {
            return Err(ReportError::InvalidConfig(
                "timeouts must be ≥ 1 second".into(),
            ));
        }
        if c.max_snippets == 0 {
            return Err(ReportError::InvalidConfig(
                "max_snippets must be ≥ 1".into(),
            ));
        }
        if c.enrichment_policy != EnrichmentPolicy::Disabled
            && !(c.search_endpoint.starts_with("http://")
                || c.search_endpoint.starts_with("https://"))
        {
            return Err(ReportError::InvalidConfig(format!(
                "search endpoint must be an HTTP/HTTPS URL, got '{}'",
                c.search_endpoint
            )));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// What report generation does when the threat-intel search fails.
///
/// | Policy | On search failure |
/// |--------|-------------------|
/// | `Abort` | the whole generation call fails with [`ReportError::Enrichment`] (default) |
/// | `Degrade` | a warning is logged and the prompt carries an empty digest |
/// | `Disabled` | no search is ever issued |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentPolicy {
    #[default]
    Abort,
    Degrade,
    Disabled,
}

/// Physical page size of the rendered report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageSize {
    /// 8.5 × 11 in (612 × 792 pt). (default)
    #[default]
    Letter,
    /// 210 × 297 mm (595 × 842 pt).
    A4,
}

impl PageSize {
    /// Width and height in PDF points.
    pub fn dimensions(self) -> (f32, f32) {
        match self {
            PageSize::Letter => (612.0, 792.0),
            PageSize::A4 => (595.0, 842.0),
        }
    }
}

/// Configuration for PDF rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Page size. Default: Letter.
    pub page_size: PageSize,

    /// Confidentiality notice drawn in the footer of every non-cover page.
    pub footer_notice: String,

    /// Text drawn inside the cover-page logo placeholder.
    pub brand_mark: String,

    /// Author recorded in the PDF Info dictionary.
    pub author: Option<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            page_size: PageSize::default(),
            footer_notice: "Confidential - Created by CypherDeck (OxSecure Intelligence)".into(),
            brand_mark: "CYPHERDECK".into(),
            author: None,
        }
    }
}

impl RenderConfig {
    /// Create a new builder for `RenderConfig`.
    pub fn builder() -> RenderConfigBuilder {
        RenderConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`RenderConfig`].
#[derive(Debug)]
pub struct RenderConfigBuilder {
    config: RenderConfig,
}

impl RenderConfigBuilder {
    pub fn page_size(mut self, size: PageSize) -> Self {
        self.config.page_size = size;
        self
    }

    pub fn footer_notice(mut self, notice: impl Into<String>) -> Self {
        self.config.footer_notice = notice.into();
        self
    }

    pub fn brand_mark(mut self, mark: impl Into<String>) -> Self {
        self.config.brand_mark = mark.into();
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.config.author = Some(author.into());
        self
    }

    pub fn build(self) -> RenderConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = ReportConfig::default();
        assert_eq!(c.temperature, 0.7);
        assert_eq!(c.max_tokens, 3000);
        assert_eq!(c.max_snippets, 3);
        assert_eq!(c.enrichment_policy, EnrichmentPolicy::Abort);
    }

    #[test]
    fn temperature_is_clamped() {
        let c = ReportConfig::builder().temperature(9.0).build().unwrap();
        assert_eq!(c.temperature, 2.0);
    }

    #[test]
    fn zero_max_tokens_rejected() {
        let err = ReportConfig::builder().max_tokens(0).build().unwrap_err();
        assert!(matches!(err, ReportError::InvalidConfig(_)));
    }

    #[test]
    fn bad_endpoint_rejected_unless_disabled() {
        let err = ReportConfig::builder()
            .search_endpoint("ftp://search")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("ftp://search"));

        let ok = ReportConfig::builder()
            .search_endpoint("ftp://search")
            .enrichment_policy(EnrichmentPolicy::Disabled)
            .build();
        assert!(ok.is_ok());
    }

    #[test]
    fn page_size_dimensions() {
        assert_eq!(PageSize::Letter.dimensions(), (612.0, 792.0));
        assert_eq!(PageSize::A4.dimensions(), (595.0, 842.0));
    }

    #[test]
    fn render_config_builder() {
        let c = RenderConfig::builder()
            .page_size(PageSize::A4)
            .footer_notice("Internal use only")
            .author("Blue Team")
            .build();
        assert_eq!(c.page_size, PageSize::A4);
        assert_eq!(c.footer_notice, "Internal use only");
        assert_eq!(c.author.as_deref(), Some("Blue Team"));
    }
}
