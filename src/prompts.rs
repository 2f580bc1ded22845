//! Prompts for cybersecurity report generation.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth** — changing the report skeleton (e.g. adding
//!    a section or tweaking the findings table) requires editing exactly one
//!    place.
//!
//! 2. **Testability** — unit tests can build and inspect the assembled
//!    prompt without a real model, so template regressions are easy to catch.
//!
//! ## Why the skeleton is pinned
//!
//! The PDF renderer recognises heading levels, tables and lists, not prose.
//! The template therefore fixes which sections use `##`, that recommendations
//! are `###` headings, and that key findings are a table with a
//! High/Medium/Low threat-level column (the cells the renderer turns into
//! severity badges).
//!
//! Callers can override the system prompt via
//! [`crate::config::ReportConfig::system_prompt`]; the report template itself
//! is not configurable.

use crate::pipeline::enrich::EnrichmentDigest;
use crate::pipeline::signals::SignalSet;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static RE_PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{(data|intel|keywords|numeric)\}").unwrap());

/// Default system prompt for the report writer.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are a senior cybersecurity analyst writing reports for executives and engineering teams.

Follow these rules precisely:

1. Base every statement on the supplied data, keywords, numeric findings and threat intelligence.
2. Do not invent IP addresses, software versions, CVE identifiers or dates that are not present in the input.
3. Write in clear, professional English. Be specific and actionable.
4. Output ONLY the Markdown report. Do NOT wrap it in ```markdown fences and do NOT add commentary before or after it."#;

/// Report template. `{data}`, `{intel}`, `{keywords}` and `{numeric}` are
/// substituted by [`build_report_prompt`].
pub const REPORT_TEMPLATE: &str = r#"Generate a professional cybersecurity report based on the following data.

## Input Data
"""
{data}
"""

## Threat Intelligence (web search)
{intel}

## Extracted Keywords
{keywords}

## Numeric Findings (JSON)
{numeric}

The report MUST use exactly this Markdown structure:

# Executive Summary
A short overview of the situation, overall risk level and the most urgent action.

# Detailed Analysis
## Technical Layer
Affected systems, software versions and network indicators.
## Threat Layer
Likely attackers, techniques and how the threat intelligence above relates to the findings.
## Business Impact
Consequences for operations, data and compliance.

# Key Findings
A Markdown table with the columns | Finding | Description | Threat Level |.
Every Threat Level cell contains exactly one word: High, Medium or Low.

# Recommendations
One `### ` heading per recommendation, ordered by priority (most urgent first),
each followed by a short paragraph and a bullet list of concrete steps.

# Conclusion
A closing paragraph summarising residual risk and next steps.

# References
A bullet list of the standards, advisories and sources referred to."#;

/// Assemble the user prompt for one report.
///
/// `data` is the report input already flattened to text (see
/// [`crate::output::ReportInput::to_prompt_data`]).
pub fn build_report_prompt(data: &str, digest: &EnrichmentDigest, signals: &SignalSet) -> String {
    let keywords = if signals.keywords.is_empty() {
        "(none)".to_string()
    } else {
        signals.keyword_list(usize::MAX)
    };

    let intel = digest.to_prompt_block();
    let numeric = signals.numeric.to_json();

    // One pass over the template, so substituted text is never rescanned.
    RE_PLACEHOLDER
        .replace_all(REPORT_TEMPLATE, |caps: &Captures<'_>| match &caps[1] {
            "data" => data.trim(),
            "intel" => intel.as_str(),
            "keywords" => keywords.as_str(),
            _ => numeric.as_str(),
        })
        .into_owned()
}
