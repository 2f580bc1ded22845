//! Error types for the cypherdeck library.
//!
//! The pipeline has one fatal error type and three stage-local ones:
//!
//! * [`ReportError`] — **Fatal**: report generation or rendering cannot
//!   produce a complete result (empty input, provider not configured, model
//!   call failed). Returned as `Err(ReportError)` from the public entry points.
//!
//! * [`ExtractionError`] — **Recovered**: an upload could not be turned into
//!   text. [`crate::pipeline::extract::ExtractorRegistry::extract`] logs it and
//!   returns empty text; `try_extract` hands it to callers that need to tell
//!   "empty file" apart from "unparseable file".
//!
//! * [`EnrichmentError`] — the threat-intel search failed. Whether that aborts
//!   the report is decided by [`crate::config::EnrichmentPolicy`].
//!
//! * [`BackendError`] — the language model call failed. Always wrapped as the
//!   `#[source]` of [`ReportError::Generation`] so the cause survives for
//!   diagnostics.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the cypherdeck library.
#[derive(Debug, Error)]
pub enum ReportError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Report input was empty, whitespace-only, or missing a required field.
    #[error("Invalid report input: {reason}")]
    InvalidInput { reason: String },

    /// Input file could not be read from disk.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Text extraction produced nothing usable for report generation.
    #[error("No text could be extracted from '{filename}'\nCheck the file is a supported, non-empty document.")]
    NothingExtracted { filename: String },

    // ── Enrichment errors ─────────────────────────────────────────────────
    /// The threat-intel search failed and the policy is to abort.
    #[error("Threat-intel search failed for query '{query}': {source}")]
    Enrichment {
        query: String,
        #[source]
        source: EnrichmentError,
    },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The model call failed after all retries.
    #[error("Report generation failed after {attempts} attempt(s): {source}")]
    Generation {
        attempts: u32,
        #[source]
        source: BackendError,
    },

    // ── Render errors ─────────────────────────────────────────────────────
    /// The PDF document could not be assembled or serialised.
    #[error("PDF rendering failed: {detail}")]
    Render { detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse failure category, one per row of the pipeline's error taxonomy.
///
/// UI layers switch on this instead of matching every [`ReportError`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Extraction,
    Validation,
    Enrichment,
    Generation,
    Configuration,
    Render,
    Io,
    Internal,
}

impl FailureKind {
    /// A short, user-facing message distinct for every kind.
    pub fn user_message(self) -> &'static str {
        match self {
            FailureKind::Extraction => {
                "The uploaded file could not be read. Upload a supported, non-empty document."
            }
            FailureKind::Validation => {
                "The report input is empty or incomplete. Provide findings to analyse."
            }
            FailureKind::Enrichment => {
                "Threat-intelligence lookup failed. Try again later or disable web enrichment."
            }
            FailureKind::Generation => {
                "The language model could not generate the report. Check the API key, quota and network."
            }
            FailureKind::Configuration => {
                "The report generator is misconfigured. Check the model provider settings."
            }
            FailureKind::Render => "The report could not be rendered as a PDF.",
            FailureKind::Io => "A file could not be read or written.",
            FailureKind::Internal => "An unexpected internal error occurred.",
        }
    }
}

impl ReportError {
    /// Classify this error for user-facing feedback.
    pub fn kind(&self) -> FailureKind {
        match self {
            ReportError::InvalidInput { .. } => FailureKind::Validation,
            ReportError::NothingExtracted { .. } => FailureKind::Extraction,
            ReportError::ReadFailed { .. } | ReportError::OutputWriteFailed { .. } => {
                FailureKind::Io
            }
            ReportError::Enrichment { .. } => FailureKind::Enrichment,
            ReportError::Generation { .. } => FailureKind::Generation,
            ReportError::ProviderNotConfigured { .. } | ReportError::InvalidConfig(_) => {
                FailureKind::Configuration
            }
            ReportError::Render { .. } => FailureKind::Render,
            ReportError::Internal(_) => FailureKind::Internal,
        }
    }
}

/// Why an upload could not be turned into text.
///
/// Never fatal to the pipeline: the registry logs it and yields empty text.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractionError {
    /// The filename's extension is not registered.
    #[error("Unsupported file type '{extension}'")]
    UnsupportedType { extension: String },

    /// A plain-text upload was not valid UTF-8.
    #[error("File is not valid UTF-8: {detail}")]
    InvalidUtf8 { detail: String },

    /// The PDF could not be parsed or a page's text could not be decoded.
    #[error("PDF could not be parsed: {detail}")]
    Pdf { detail: String },

    /// The Word document is not a readable DOCX package.
    #[error("Word document could not be parsed: {detail}")]
    Word { detail: String },

    /// The byte source could not be read or rewound.
    #[error("I/O error while reading upload: {detail}")]
    Io { detail: String },
}

/// Failure of the threat-intel search.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EnrichmentError {
    /// The search endpoint answered with a non-success status.
    #[error("search endpoint returned HTTP {status}")]
    Status { status: u16 },

    /// Connection, TLS, or body-read failure.
    #[error("search request failed: {detail}")]
    Transport { detail: String },

    /// The request did not complete within the configured timeout.
    #[error("search timed out after {secs}s")]
    Timeout { secs: u64 },
}

/// Failure of a single language-model call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    /// The provider rejected or failed the request (auth, quota, network, …).
    #[error("provider error: {detail}")]
    Provider { detail: String },

    /// The call did not complete within the configured timeout.
    #[error("model call timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The provider answered, but with no usable text.
    #[error("model returned an empty response")]
    EmptyResponse,
}
