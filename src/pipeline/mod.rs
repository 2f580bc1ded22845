//! Pipeline stages for document-to-report generation.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! swap implementations (e.g. a stable search API instead of page scraping)
//! without touching other stages.
//!
//! ## Data Flow
//!
//! ```text
//! extract ──▶ signals ──▶ enrich ──▶ llm ──▶ (render)
//! (bytes)     (regex)     (search)   (model)
//! ```
//!
//! 1. [`extract`] — turn an uploaded file into plain text, dispatched by
//!    extension through a registry of strategies
//! 2. [`signals`] — keywords, IP, version and integer tokens; pure and
//!    deterministic
//! 3. [`enrich`]  — one best-effort web search; the first network stage
//! 4. [`llm`]     — drive the model call; the second and last network stage
//!
//! Prompt assembly sits between 3 and 4 in [`crate::prompts`]; orchestration,
//! retries and policy live in [`crate::generate`]. Rendering is a separate
//! capability in [`crate::render`].

pub mod enrich;
pub mod extract;
pub mod llm;
pub mod signals;
