//! Progress-callback trait for per-stage pipeline events.
//!
//! Inject an [`Arc<dyn PipelineProgressCallback>`] via
//! [`crate::config::ReportConfigBuilder::progress_callback`] to receive events
//! as a report moves through extraction, signal extraction, enrichment,
//! generation and rendering.
//!
//! # Example
//!
//! ```rust
//! use cypherdeck::{PipelineProgressCallback, PipelineStage, ReportConfig};
//! use std::sync::Arc;
//!
//! struct StderrProgress;
//!
//! impl PipelineProgressCallback for StderrProgress {
//!     fn on_stage_complete(&self, stage: PipelineStage, elapsed_ms: u64) {
//!         eprintln!("{stage} done in {elapsed_ms}ms");
//!     }
//! }
//!
//! let config = ReportConfig::builder()
//!     .progress_callback(Arc::new(StderrProgress) as Arc<dyn PipelineProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// One step of the document → report → PDF pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Extract,
    Signals,
    Enrich,
    Generate,
    Render,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Extract => "extract",
            PipelineStage::Signals => "signals",
            PipelineStage::Enrich => "enrich",
            PipelineStage::Generate => "generate",
            PipelineStage::Render => "render",
        };
        f.write_str(name)
    }
}

/// Called by the pipeline as it enters and leaves each stage.
///
/// Implementations must be `Send + Sync`: one generator may serve several
/// concurrent requests. All methods default to no-ops.
pub trait PipelineProgressCallback: Send + Sync {
    /// Called when a stage begins.
    fn on_stage_start(&self, stage: PipelineStage) {
        let _ = stage;
    }

    /// Called when a stage finishes successfully.
    fn on_stage_complete(&self, stage: PipelineStage, elapsed_ms: u64) {
        let _ = (stage, elapsed_ms);
    }

    /// Called when a stage fails (or degrades, for enrichment).
    fn on_stage_error(&self, stage: PipelineStage, error: &str) {
        let _ = (stage, error);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl PipelineProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ReportConfig`].
pub type ProgressCallback = Arc<dyn PipelineProgressCallback>;
