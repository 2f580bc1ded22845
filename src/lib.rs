//! # cypherdeck
//!
//! Turn uploaded security artefacts or analyst notes into a cybersecurity
//! report written by a Large Language Model, then render it as a styled PDF.
//!
//! ## Why this crate?
//!
//! Security assessments end in a document that follows the same skeleton
//! every time: an executive summary, a layered analysis, a findings table
//! with threat levels, concrete recommendations. Writing that skeleton by
//! hand is slow. This crate pulls the technical signal out of whatever the
//! analyst has (a PDF scan export, a Word write-up, an HTML dashboard dump,
//! a plain log), adds a little public threat-intel context, and asks a model
//! to fill the skeleton in. The renderer then lays the Markdown out as a
//! branded PDF with severity badges.
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload / form / free text
//!  │
//!  ├─ 1. Extract   PDF, DOCX, HTML/XML, plain text → UTF-8 text
//!  ├─ 2. Signals   keywords, IPv4, version strings, other numbers
//!  ├─ 3. Enrich    one web search → up to 3 snippets (policy-controlled)
//!  ├─ 4. Generate  prompt template → LLM (retry + backoff + timeout)
//!  └─ 5. Render    Markdown → cover page, headings, lists, badge tables
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cypherdeck::{generate_report, render, RenderConfig, ReportConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let config = ReportConfig::default();
//!     let report = generate_report("Port scan from 203.0.113.7 hit OpenSSH 8.2", &config).await?;
//!     let pdf = render(
//!         "Perimeter Review",
//!         &report.markdown,
//!         &cypherdeck::render::timestamp_now(),
//!         &RenderConfig::default(),
//!     )?;
//!     std::fs::write("Perimeter Review.pdf", pdf.as_bytes())?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `cypherdeck` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! cypherdeck = { version = "0.3", default-features = false }
//! ```
//!
//! ## Enrichment Policy
//!
//! | Policy | Search fails | Use when |
//! |--------|--------------|----------|
//! | `Abort` (default) | the report fails | intel context is mandatory |
//! | `Degrade` | report generated without intel | best-effort deployments |
//! | `Disabled` | no search is made | offline / air-gapped |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod generate;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod render;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{EnrichmentPolicy, PageSize, RenderConfig, ReportConfig, ReportConfigBuilder};
pub use error::{BackendError, EnrichmentError, ExtractionError, FailureKind, ReportError};
pub use generate::{generate_report, ReportGenerator};
pub use output::{GeneratedReport, ReportInput, ReportStats, StructuredReport};
pub use pipeline::enrich::{EnrichmentDigest, SearchProvider, WebSearch};
pub use pipeline::extract::{extract_text, ExtractorRegistry, TextExtractor, UploadedDocument};
pub use pipeline::llm::{Completion, GenerationOptions, ProviderBackend, ReportBackend};
pub use pipeline::signals::{extract_signals, NumericFindings, SignalSet};
pub use progress::{NoopProgressCallback, PipelineProgressCallback, PipelineStage, ProgressCallback};
pub use render::{attachment_file_name, render, render_to_file, RenderedPdf, PDF_CONTENT_TYPE};
