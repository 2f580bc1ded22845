//! Threat-intel enrichment: one web search, a few result headings.
//!
//! The query is the configured label followed by the comma-joined keyword
//! list. The response page is scanned for level-3 headings (result titles on
//! the default endpoint); their text, stripped of markup and entity-decoded,
//! becomes the enrichment digest handed to the prompt.
//!
//! ## Why a trait?
//!
//! The generator talks to [`SearchProvider`], not to `reqwest` directly, so
//! tests and offline deployments can plug in a canned or disabled source
//! without touching retry, timeout, or policy handling in
//! [`crate::generate`].

use crate::config::ReportConfig;
use crate::error::EnrichmentError;
use crate::pipeline::signals::SignalSet;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

static RE_H3: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<h3[^>]*>(.*?)</h3>").unwrap());

static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Short text snippets gathered from a search, in result order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentDigest {
    pub snippets: Vec<String>,
}

impl EnrichmentDigest {
    pub fn is_empty(&self) -> bool {
        self.snippets.is_empty()
    }

    /// Render the digest for the prompt: one `- snippet` line per entry,
    /// or a fixed placeholder when nothing was found.
    pub fn to_prompt_block(&self) -> String {
        if self.snippets.is_empty() {
            return "No external threat intelligence was retrieved.".to_string();
        }
        self.snippets
            .iter()
            .map(|s| format!("- {s}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A source of threat-intel snippets for a search query.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str) -> Result<EnrichmentDigest, EnrichmentError>;
}

/// Build the search query for a signal set.
///
/// `"<label> <kw1>, <kw2>, …"` with at most `max_keywords` keywords in
/// sorted order. Returns `None` when there are no keywords; callers skip
/// the search entirely in that case.
pub fn build_query(label: &str, signals: &SignalSet, max_keywords: usize) -> Option<String> {
    if signals.keywords.is_empty() {
        return None;
    }
    let keywords = signals.keyword_list(max_keywords);
    let label = label.trim();
    if label.is_empty() {
        Some(keywords)
    } else {
        Some(format!("{label} {keywords}"))
    }
}

/// Pull up to `limit` heading snippets out of a search result page.
///
/// Each heading is parsed as an HTML fragment, so nested markup is dropped
/// and character references are decoded. Headings that are empty after that
/// are skipped and do not count towards the limit.
pub fn parse_snippets(html: &str, limit: usize) -> Vec<String> {
    RE_H3
        .captures_iter(html)
        .filter_map(|caps| {
            let fragment = Html::parse_fragment(caps.get(1)?.as_str());
            let text: String = fragment.root_element().text().collect();
            let text = RE_WS.replace_all(text.trim(), " ").into_owned();
            (!text.is_empty()).then_some(text)
        })
        .take(limit)
        .collect()
}

/// [`SearchProvider`] backed by an HTTP GET against a public search page.
#[derive(Debug, Clone)]
pub struct WebSearch {
    client: reqwest::Client,
    endpoint: String,
    timeout_secs: u64,
    max_snippets: usize,
}

impl WebSearch {
    pub fn new(config: &ReportConfig) -> Result<Self, EnrichmentError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.search_timeout_secs))
            .user_agent(config.search_user_agent.clone())
            .build()
            .map_err(|e| EnrichmentError::Transport {
                detail: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            endpoint: config.search_endpoint.clone(),
            timeout_secs: config.search_timeout_secs,
            max_snippets: config.max_snippets,
        })
    }

    fn classify(&self, e: reqwest::Error) -> EnrichmentError {
        if e.is_timeout() {
            EnrichmentError::Timeout {
                secs: self.timeout_secs,
            }
        } else {
            EnrichmentError::Transport {
                detail: e.to_string(),
            }
        }
    }
}

#[async_trait]
impl SearchProvider for WebSearch {
    async fn search(&self, query: &str) -> Result<EnrichmentDigest, EnrichmentError> {
        debug!("Searching {} for '{}'", self.endpoint, query);

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query)])
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EnrichmentError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| self.classify(e))?;
        let snippets = parse_snippets(&body, self.max_snippets);
        debug!("Search returned {} snippet(s)", snippets.len());

        Ok(EnrichmentDigest { snippets })
    }
}
