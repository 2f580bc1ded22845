//! Signal extraction: keywords and numeric indicators from plain text.
//!
//! All matching runs on the lower-cased text, so results are
//! case-insensitive by construction. Extraction is a pure function of its
//! input: running it twice on the same text yields identical results.
//!
//! ## Patterns
//!
//! | Signal | Pattern | Kept |
//! |--------|---------|------|
//! | keyword | maximal run of ≥ 3 alphabetic chars | set (deduplicated) |
//! | ip | four dot-separated groups of 1–3 digits | first match |
//! | version | ≥ 2 dot-separated digit groups, not dotted-quad shaped | first match |
//! | numeric | standalone integer token | all, in order |
//!
//! The IPv4 pattern does not range-check octets: `999.1.1.1` counts as an
//! IP. The version pattern would also match every dotted quad, so dotted-quad
//! shaped matches are skipped when picking the version; this keeps
//! `"192.168.1.10 running 2.4.49"` → ip `192.168.1.10`, version `2.4.49`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

static RE_KEYWORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\p{Alphabetic}{3,}").unwrap());

static RE_IP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:\d{1,3}\.){3}\d{1,3}\b").unwrap());

static RE_DOTTED_QUAD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\d{1,3}\.){3}\d{1,3}$").unwrap());

static RE_VERSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+(?:\.\d+)+").unwrap());

static RE_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d+\b").unwrap());

/// Typed numeric findings. A field is set only if its pattern matched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumericFindings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Every bare integer, duplicates included, in encounter order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub numeric: Vec<String>,
}

impl NumericFindings {
    pub fn is_empty(&self) -> bool {
        self.ip.is_none() && self.version.is_none() && self.numeric.is_empty()
    }

    /// Compact JSON object; absent categories are omitted.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Keywords plus numeric findings derived from one text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalSet {
    /// Sorted so prompts and search queries are reproducible.
    pub keywords: BTreeSet<String>,
    pub numeric: NumericFindings,
}

impl SignalSet {
    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty() && self.numeric.is_empty()
    }

    /// Keywords joined with `", "`, at most `limit` of them.
    pub fn keyword_list(&self, limit: usize) -> String {
        self.keywords
            .iter()
            .take(limit)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Derive keywords and numeric findings from `text`.
///
/// Empty or whitespace-only input yields an empty [`SignalSet`].
pub fn extract_signals(text: &str) -> SignalSet {
    if text.trim().is_empty() {
        return SignalSet::default();
    }

    let lowered = text.to_lowercase();

    let keywords = RE_KEYWORD
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect();

    let ip = RE_IP.find(&lowered).map(|m| m.as_str().to_string());

    let version = RE_VERSION
        .find_iter(&lowered)
        .map(|m| m.as_str())
        .find(|candidate| !RE_DOTTED_QUAD.is_match(candidate))
        .map(str::to_string);

    let numeric = RE_NUMBER
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect();

    SignalSet {
        keywords,
        numeric: NumericFindings {
            ip,
            version,
            numeric,
        },
    }
}
