//! Report input and output types.

use crate::error::ReportError;
use crate::pipeline::enrich::EnrichmentDigest;
use crate::pipeline::signals::SignalSet;
use serde::{Deserialize, Serialize};

/// What a report is generated from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ReportInput {
    /// Plain text, typically the output of text extraction.
    FreeText(String),
    /// A filled-in assessment form.
    StructuredForm(StructuredReport),
}

/// Structured assessment form.
///
/// Only [`StructuredReport::findings`] is scanned for signals; the other
/// fields are context for the model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredReport {
    /// e.g. "Penetration Test", "Incident Response".
    pub report_type: String,
    #[serde(default)]
    pub project_name: String,
    #[serde(default)]
    pub client_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assessment_period: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    pub findings: Vec<String>,
    #[serde(default)]
    pub risk_analysis: String,
    #[serde(default)]
    pub recommendations: String,
}

impl StructuredReport {
    fn non_blank_findings(&self) -> impl Iterator<Item = &str> {
        self.findings
            .iter()
            .map(|f| f.trim())
            .filter(|f| !f.is_empty())
    }
}

impl From<String> for ReportInput {
    fn from(text: String) -> Self {
        ReportInput::FreeText(text)
    }
}

impl From<&str> for ReportInput {
    fn from(text: &str) -> Self {
        ReportInput::FreeText(text.to_string())
    }
}

impl From<StructuredReport> for ReportInput {
    fn from(form: StructuredReport) -> Self {
        ReportInput::StructuredForm(form)
    }
}

impl ReportInput {
    /// Reject input that cannot yield a meaningful report.
    pub fn validate(&self) -> Result<(), ReportError> {
        match self {
            ReportInput::FreeText(text) if text.trim().is_empty() => {
                Err(ReportError::InvalidInput {
                    reason: "report text is empty".into(),
                })
            }
            ReportInput::FreeText(_) => Ok(()),
            ReportInput::StructuredForm(form) => {
                if form.report_type.trim().is_empty() {
                    return Err(ReportError::InvalidInput {
                        reason: "structured report is missing a report type".into(),
                    });
                }
                if form.non_blank_findings().next().is_none() {
                    return Err(ReportError::InvalidInput {
                        reason: "structured report has no findings".into(),
                    });
                }
                Ok(())
            }
        }
    }

    /// The text that signal extraction runs on.
    ///
    /// For a form this is the findings joined by newlines; metadata fields
    /// are deliberately left out.
    pub fn signal_source(&self) -> String {
        match self {
            ReportInput::FreeText(text) => text.clone(),
            ReportInput::StructuredForm(form) => {
                form.non_blank_findings().collect::<Vec<_>>().join("\n")
            }
        }
    }

    /// The input flattened into the text embedded in the prompt.
    pub fn to_prompt_data(&self) -> String {
        let form = match self {
            ReportInput::FreeText(text) => return text.trim().to_string(),
            ReportInput::StructuredForm(form) => form,
        };

        let mut lines = vec![format!("Report Type: {}", form.report_type.trim())];
        let mut field = |label: &str, value: &str| {
            if !value.trim().is_empty() {
                lines.push(format!("{label}: {}", value.trim()));
            }
        };
        field("Project Name", &form.project_name);
        field("Client Name", &form.client_name);
        field("Assessment Period", form.assessment_period.as_deref().unwrap_or(""));
        field("Scope", form.scope.as_deref().unwrap_or(""));

        lines.push("Findings:".to_string());
        for finding in form.non_blank_findings() {
            lines.push(format!("- {finding}"));
        }

        if !form.risk_analysis.trim().is_empty() {
            lines.push(format!("Risk Analysis: {}", form.risk_analysis.trim()));
        }
        if !form.recommendations.trim().is_empty() {
            lines.push(format!("Recommendations: {}", form.recommendations.trim()));
        }
        lines.join("\n")
    }
}

/// A generated report and what went into it.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedReport {
    /// The model's Markdown output, verbatim.
    pub markdown: String,
    pub signals: SignalSet,
    pub digest: EnrichmentDigest,
    pub stats: ReportStats,
}

/// Timing and usage for one generation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReportStats {
    pub input_tokens: u64,
    pub output_tokens: u64,
    /// Model calls made, retries included.
    pub attempts: u32,
    /// Whether a search was attempted and succeeded.
    pub enriched: bool,
    pub enrich_duration_ms: u64,
    pub llm_duration_ms: u64,
    pub total_duration_ms: u64,
}
