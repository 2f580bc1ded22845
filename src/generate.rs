//! Report generation entry points.
//!
//! [`ReportGenerator`] drives one input through signal extraction,
//! enrichment, prompt assembly and the model call. It holds no per-report
//! state: one generator can serve concurrent requests, and every call is
//! independent of the ones before it.
//!
//! ## Ordering
//!
//! Enrichment completes before the prompt is assembled, and the prompt is
//! complete before the model is called. The two network calls are the only
//! suspension points. Each is bounded by a timeout; expiry fails that one
//! report, never the process.

use crate::config::{EnrichmentPolicy, ReportConfig};
use crate::error::{BackendError, ReportError};
use crate::output::{GeneratedReport, ReportInput, ReportStats};
use crate::pipeline::enrich::{build_query, EnrichmentDigest, SearchProvider, WebSearch};
use crate::pipeline::extract::{ExtractorRegistry, UploadedDocument};
use crate::pipeline::llm::{GenerationOptions, ProviderBackend, ReportBackend};
use crate::pipeline::signals::{extract_signals, SignalSet};
use crate::progress::PipelineStage;
use crate::prompts::{build_report_prompt, DEFAULT_SYSTEM_PROMPT};
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, info, warn};

/// Generates Markdown cybersecurity reports.
///
/// # Example
/// ```rust,no_run
/// use cypherdeck::{ReportConfig, ReportGenerator, ReportInput};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ReportConfig::builder().provider_name("gemini").build()?;
/// let generator = ReportGenerator::new(config)?;
/// let report = generator
///     .generate(&ReportInput::from("Brute-force attempts against 10.0.0.5 (OpenSSH 8.2)"))
///     .await?;
/// println!("{}", report.markdown);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ReportGenerator {
    config: ReportConfig,
    backend: Arc<dyn ReportBackend>,
    search: Option<Arc<dyn SearchProvider>>,
    registry: ExtractorRegistry,
}

impl fmt::Debug for ReportGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReportGenerator")
            .field("config", &self.config)
            .field("backend", &self.backend.name())
            .field("search", &self.search.as_ref().map(|_| "<dyn SearchProvider>"))
            .field("registry", &self.registry)
            .finish()
    }
}

impl ReportGenerator {
    /// Build a generator, resolving the model provider now.
    ///
    /// Missing credentials surface here as
    /// [`ReportError::ProviderNotConfigured`], before any report is attempted.
    pub fn new(config: ReportConfig) -> Result<Self, ReportError> {
        let (provider, label) = resolve_provider(&config)?;
        info!("Using model backend {}", label);
        let backend: Arc<dyn ReportBackend> = Arc::new(ProviderBackend::new(provider, label));

        let search: Option<Arc<dyn SearchProvider>> = match config.enrichment_policy {
            EnrichmentPolicy::Disabled => None,
            _ => Some(Arc::new(WebSearch::new(&config).map_err(|e| {
                ReportError::InvalidConfig(format!("search client: {e}"))
            })?)),
        };

        Ok(Self {
            config,
            backend,
            search,
            registry: ExtractorRegistry::default(),
        })
    }

    /// Build a generator around caller-supplied backends.
    ///
    /// The search provider is ignored when the policy is
    /// [`EnrichmentPolicy::Disabled`].
    pub fn with_backends(
        config: ReportConfig,
        backend: Arc<dyn ReportBackend>,
        search: Arc<dyn SearchProvider>,
    ) -> Self {
        let search = match config.enrichment_policy {
            EnrichmentPolicy::Disabled => None,
            _ => Some(search),
        };
        Self {
            config,
            backend,
            search,
            registry: ExtractorRegistry::default(),
        }
    }

    /// Replace the extractor registry used by [`Self::generate_from_document`].
    pub fn with_registry(mut self, registry: ExtractorRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Generate a report.
    ///
    /// # Errors
    /// - [`ReportError::InvalidInput`]: blank text or an incomplete form;
    ///   nothing is sent over the network.
    /// - [`ReportError::Enrichment`]: the search failed under
    ///   [`EnrichmentPolicy::Abort`].
    /// - [`ReportError::Generation`]: every model attempt failed, timed out
    ///   or came back empty.
    pub async fn generate(&self, input: &ReportInput) -> Result<GeneratedReport, ReportError> {
        let total_start = Instant::now();
        input.validate()?;

        // ── Step 1: Signals ──────────────────────────────────────────────
        self.stage_start(PipelineStage::Signals);
        let signal_start = Instant::now();
        let signals = extract_signals(&input.signal_source());
        debug!(
            "Signals: {} keywords, numeric findings {}",
            signals.keywords.len(),
            signals.numeric.to_json()
        );
        self.stage_complete(PipelineStage::Signals, signal_start);

        // ── Step 2: Enrichment ───────────────────────────────────────────
        let enrich_start = Instant::now();
        let (digest, enriched) = self.enrich(&signals).await?;
        let enrich_duration_ms = enrich_start.elapsed().as_millis() as u64;

        // ── Step 3: Prompt ───────────────────────────────────────────────
        let prompt = build_report_prompt(&input.to_prompt_data(), &digest, &signals);
        let system_prompt = self
            .config
            .system_prompt
            .as_deref()
            .unwrap_or(DEFAULT_SYSTEM_PROMPT);

        // ── Step 4: Model ────────────────────────────────────────────────
        self.stage_start(PipelineStage::Generate);
        let llm_start = Instant::now();
        let (completion, attempts) = match self.complete_with_retry(system_prompt, &prompt).await {
            Ok(done) => done,
            Err(e) => {
                self.stage_error(PipelineStage::Generate, &e.to_string());
                return Err(e);
            }
        };
        self.stage_complete(PipelineStage::Generate, llm_start);
        let llm_duration_ms = llm_start.elapsed().as_millis() as u64;

        let stats = ReportStats {
            input_tokens: completion.input_tokens as u64,
            output_tokens: completion.output_tokens as u64,
            attempts,
            enriched,
            enrich_duration_ms,
            llm_duration_ms,
            total_duration_ms: total_start.elapsed().as_millis() as u64,
        };
        info!(
            "Report generated: {} chars, {} attempt(s), {}ms total",
            completion.content.len(),
            attempts,
            stats.total_duration_ms
        );

        Ok(GeneratedReport {
            markdown: completion.content,
            signals,
            digest,
            stats,
        })
    }

    /// Extract text from an upload, then generate a report from it.
    ///
    /// Fails with [`ReportError::NothingExtracted`] when the upload yields no
    /// text (unsupported, unparseable, or empty).
    pub async fn generate_from_document(
        &self,
        doc: &UploadedDocument<'_>,
    ) -> Result<GeneratedReport, ReportError> {
        self.stage_start(PipelineStage::Extract);
        let start = Instant::now();
        let text = self.registry.extract(doc);
        if text.trim().is_empty() {
            let err = ReportError::NothingExtracted {
                filename: doc.filename.to_string(),
            };
            self.stage_error(PipelineStage::Extract, &err.to_string());
            return Err(err);
        }
        self.stage_complete(PipelineStage::Extract, start);

        self.generate(&ReportInput::FreeText(text)).await
    }

    /// Synchronous wrapper around [`Self::generate`].
    ///
    /// Creates a temporary tokio runtime internally; do not call from
    /// inside an async context.
    pub fn generate_sync(&self, input: &ReportInput) -> Result<GeneratedReport, ReportError> {
        tokio::runtime::Runtime::new()
            .map_err(|e| ReportError::Internal(format!("Failed to create tokio runtime: {}", e)))?
            .block_on(self.generate(input))
    }

    // ── Internal helpers ─────────────────────────────────────────────────

    /// Run the search according to the enrichment policy.
    ///
    /// Returns the digest and whether a search succeeded.
    async fn enrich(&self, signals: &SignalSet) -> Result<(EnrichmentDigest, bool), ReportError> {
        let search = match &self.search {
            Some(search) => search,
            None => {
                debug!("Enrichment disabled");
                return Ok((EnrichmentDigest::default(), false));
            }
        };

        let query = match build_query(
            &self.config.query_label,
            signals,
            self.config.max_query_keywords,
        ) {
            Some(q) => q,
            None => {
                debug!("No keywords; skipping enrichment");
                return Ok((EnrichmentDigest::default(), false));
            }
        };

        self.stage_start(PipelineStage::Enrich);
        let start = Instant::now();
        match search.search(&query).await {
            Ok(digest) => {
                self.stage_complete(PipelineStage::Enrich, start);
                Ok((digest, true))
            }
            Err(e) => {
                self.stage_error(PipelineStage::Enrich, &e.to_string());
                match self.config.enrichment_policy {
                    EnrichmentPolicy::Degrade => {
                        warn!("Enrichment failed, continuing without it: {}", e);
                        Ok((EnrichmentDigest::default(), false))
                    }
                    _ => Err(ReportError::Enrichment { query, source: e }),
                }
            }
        }
    }

    /// Call the backend with timeout and exponential backoff.
    ///
    /// Returns the completion and the number of attempts made.
    async fn complete_with_retry(
        &self,
        system_prompt: &str,
        prompt: &str,
    ) -> Result<(crate::pipeline::llm::Completion, u32), ReportError> {
        let options = GenerationOptions::from_config(&self.config);
        let limit = Duration::from_secs(self.config.api_timeout_secs);
        let mut last_err = BackendError::EmptyResponse;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let backoff = backoff_delay_ms(self.config.retry_backoff_ms, attempt);
                warn!(
                    "{}: retry {}/{} after {}ms",
                    self.backend.name(),
                    attempt,
                    self.config.max_retries,
                    backoff
                );
                sleep(Duration::from_millis(backoff)).await;
            }

            let outcome = match timeout(limit, self.backend.complete(system_prompt, prompt, &options)).await
            {
                Ok(Ok(c)) if c.content.trim().is_empty() => Err(BackendError::EmptyResponse),
                Ok(result) => result,
                Err(_) => Err(BackendError::Timeout {
                    secs: self.config.api_timeout_secs,
                }),
            };

            match outcome {
                Ok(completion) => return Ok((completion, attempt + 1)),
                Err(e) => {
                    warn!(
                        "{}: attempt {} failed: {}",
                        self.backend.name(),
                        attempt + 1,
                        e
                    );
                    last_err = e;
                }
            }
        }

        Err(ReportError::Generation {
            attempts: self.config.max_retries + 1,
            source: last_err,
        })
    }

    fn stage_start(&self, stage: PipelineStage) {
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_stage_start(stage);
        }
    }

    fn stage_complete(&self, stage: PipelineStage, started: Instant) {
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_stage_complete(stage, started.elapsed().as_millis() as u64);
        }
    }

    fn stage_error(&self, stage: PipelineStage, error: &str) {
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_stage_error(stage, error);
        }
    }
}

/// Generate one report with a fresh generator.
///
/// Convenience for one-shot callers; services should build a
/// [`ReportGenerator`] once and reuse it.
pub async fn generate_report(
    input: impl Into<ReportInput>,
    config: &ReportConfig,
) -> Result<GeneratedReport, ReportError> {
    let generator = ReportGenerator::new(config.clone())?;
    generator.generate(&input.into()).await
}

/// Delay before retry `attempt` (1-based): `base * 2^(attempt-1)`, saturating.
fn backoff_delay_ms(base_ms: u64, attempt: u32) -> u64 {
    base_ms.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
}

/// Model used when a provider is named without one.
pub fn default_model_for(provider_name: &str) -> &'static str {
    match provider_name.to_ascii_lowercase().as_str() {
        "gemini" | "google" => "gemini-1.5-flash",
        "anthropic" => "claude-3-5-haiku-latest",
        _ => "gpt-4.1-nano",
    }
}

fn create_provider(
    provider_name: &str,
    model: &str,
) -> Result<(Arc<dyn LLMProvider>, String), ReportError> {
    let provider = ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        ReportError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })?;
    Ok((provider, format!("{provider_name}/{model}")))
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider** (`config.provider_name`) with `config.model` or the
///    provider's default model.
/// 3. **Environment pair** `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`.
/// 4. **Gemini key** (`GEMINI_API_KEY` or `GOOGLE_API_KEY`) present.
/// 5. **Full auto-detection** via `ProviderFactory::from_env`.
fn resolve_provider(config: &ReportConfig) -> Result<(Arc<dyn LLMProvider>, String), ReportError> {
    if let Some(ref provider) = config.provider {
        let label = config.model.clone().unwrap_or_else(|| "custom".to_string());
        return Ok((Arc::clone(provider), label));
    }

    if let Some(ref name) = config.provider_name {
        let model = config
            .model
            .as_deref()
            .unwrap_or_else(|| default_model_for(name));
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    let has_gemini_key = ["GEMINI_API_KEY", "GOOGLE_API_KEY"]
        .iter()
        .any(|var| std::env::var(var).map(|v| !v.is_empty()).unwrap_or(false));
    if has_gemini_key {
        let model = config
            .model
            .as_deref()
            .unwrap_or_else(|| default_model_for("gemini"));
        return create_provider("gemini", model);
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| ReportError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set GEMINI_API_KEY, OPENAI_API_KEY, or ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok((llm_provider, "auto".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EnrichmentError;
    use crate::pipeline::llm::Completion;
    use crate::progress::PipelineProgressCallback;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Backend that replays a script of results and records prompts.
    struct ScriptedBackend {
        script: Mutex<Vec<Result<String, BackendError>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedBackend {
        fn new(script: Vec<Result<String, BackendError>>) -> Self {
            Self {
                script: Mutex::new(script),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ReportBackend for ScriptedBackend {
        async fn complete(
            &self,
            _system_prompt: &str,
            user_prompt: &str,
            _options: &GenerationOptions,
        ) -> Result<Completion, BackendError> {
            self.prompts.lock().unwrap().push(user_prompt.to_string());
            let mut script = self.script.lock().unwrap();
            let next = if script.is_empty() {
                Err(BackendError::Provider {
                    detail: "script exhausted".into(),
                })
            } else {
                script.remove(0)
            };
            next.map(|content| Completion {
                content,
                input_tokens: 10,
                output_tokens: 20,
            })
        }
    }

    struct StubSearch {
        result: Result<Vec<String>, EnrichmentError>,
        queries: Mutex<Vec<String>>,
    }

    impl StubSearch {
        fn ok(snippets: &[&str]) -> Self {
            Self {
                result: Ok(snippets.iter().map(|s| s.to_string()).collect()),
                queries: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                result: Err(EnrichmentError::Status { status: 503 }),
                queries: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl SearchProvider for StubSearch {
        async fn search(&self, query: &str) -> Result<EnrichmentDigest, EnrichmentError> {
            self.queries.lock().unwrap().push(query.to_string());
            self.result.clone().map(|snippets| EnrichmentDigest { snippets })
        }
    }

    #[derive(Default)]
    struct CountingProgress {
        errors: AtomicUsize,
        events: Mutex<Vec<String>>,
    }

    impl PipelineProgressCallback for CountingProgress {
        fn on_stage_start(&self, stage: PipelineStage) {
            self.events.lock().unwrap().push(format!("start:{stage}"));
        }
        fn on_stage_complete(&self, stage: PipelineStage, _elapsed_ms: u64) {
            self.events.lock().unwrap().push(format!("done:{stage}"));
        }
        fn on_stage_error(&self, stage: PipelineStage, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
            self.events.lock().unwrap().push(format!("error:{stage}"));
        }
    }

    fn config(policy: EnrichmentPolicy) -> ReportConfig {
        ReportConfig::builder()
            .enrichment_policy(policy)
            .max_retries(2)
            .retry_backoff_ms(1)
            .build()
            .unwrap()
    }

    fn generator(
        config: ReportConfig,
        backend: &Arc<ScriptedBackend>,
        search: &Arc<StubSearch>,
    ) -> ReportGenerator {
        ReportGenerator::with_backends(
            config,
            Arc::clone(backend) as Arc<dyn ReportBackend>,
            Arc::clone(search) as Arc<dyn SearchProvider>,
        )
    }

    #[test]
    fn blank_input_fails_without_network() {
        let backend = Arc::new(ScriptedBackend::new(vec![Ok("# Report".into())]));
        let search = Arc::new(StubSearch::ok(&["x"]));
        let g = generator(config(EnrichmentPolicy::Abort), &backend, &search);

        let err = tokio_test::block_on(g.generate(&ReportInput::from("   "))).unwrap_err();
        assert!(matches!(err, ReportError::InvalidInput { .. }));
        assert_eq!(backend.calls(), 0);
        assert!(search.queries.lock().unwrap().is_empty());
    }

    #[test]
    fn report_is_model_output_verbatim() {
        let raw = "# Executive Summary\n\nAll good.  \n";
        let backend = Arc::new(ScriptedBackend::new(vec![Ok(raw.into())]));
        let search = Arc::new(StubSearch::ok(&["Apache CVE-2021-41773"]));
        let g = generator(config(EnrichmentPolicy::Abort), &backend, &search);

        let report = tokio_test::block_on(
            g.generate(&ReportInput::from("server at 192.168.1.10 running Apache 2.4.49")),
        )
        .unwrap();

        assert_eq!(report.markdown, raw);
        assert_eq!(report.stats.attempts, 1);
        assert!(report.stats.enriched);
        assert_eq!(report.digest.snippets, vec!["Apache CVE-2021-41773"]);
        assert_eq!(report.signals.numeric.ip.as_deref(), Some("192.168.1.10"));

        let queries = search.queries.lock().unwrap();
        assert_eq!(
            queries.as_slice(),
            ["cybersecurity threats apache, running, server"]
        );

        let prompts = backend.prompts.lock().unwrap();
        assert!(prompts[0].contains("- Apache CVE-2021-41773"));
        assert!(prompts[0].contains(r#""version":"2.4.49""#));
    }

    #[test]
    fn backend_failure_is_wrapped_after_retries() {
        let fail = || {
            Err(BackendError::Provider {
                detail: "429 quota exceeded".into(),
            })
        };
        let backend = Arc::new(ScriptedBackend::new(vec![fail(), fail(), fail()]));
        let search = Arc::new(StubSearch::ok(&[]));
        let g = generator(config(EnrichmentPolicy::Abort), &backend, &search);

        let err = tokio_test::block_on(g.generate(&ReportInput::from("phishing campaign")))
            .unwrap_err();
        match err {
            ReportError::Generation { attempts, source } => {
                assert_eq!(attempts, 3);
                assert!(source.to_string().contains("429 quota exceeded"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(backend.calls(), 3);
    }

    #[test]
    fn transient_failure_then_success() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Err(BackendError::Provider {
                detail: "503".into(),
            }),
            Ok("# Report".into()),
        ]));
        let search = Arc::new(StubSearch::ok(&[]));
        let g = generator(config(EnrichmentPolicy::Abort), &backend, &search);

        let report = tokio_test::block_on(g.generate(&ReportInput::from("malware found")))
            .unwrap();
        assert_eq!(report.stats.attempts, 2);
        assert_eq!(report.markdown, "# Report");
    }

    #[test]
    fn empty_model_output_is_an_error() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Ok("  \n".into()),
            Ok(String::new()),
            Ok("\t".into()),
        ]));
        let search = Arc::new(StubSearch::ok(&[]));
        let g = generator(config(EnrichmentPolicy::Abort), &backend, &search);

        let err = tokio_test::block_on(g.generate(&ReportInput::from("ransomware")))
            .unwrap_err();
        assert!(matches!(
            err,
            ReportError::Generation {
                source: BackendError::EmptyResponse,
                ..
            }
        ));
    }

    #[test]
    fn enrichment_failure_aborts_by_default() {
        let backend = Arc::new(ScriptedBackend::new(vec![Ok("# Report".into())]));
        let search = Arc::new(StubSearch::failing());
        let g = generator(ReportConfig::default(), &backend, &search);

        let err = tokio_test::block_on(g.generate(&ReportInput::from("ddos attack")))
            .unwrap_err();
        assert!(matches!(
            err,
            ReportError::Enrichment {
                source: EnrichmentError::Status { status: 503 },
                ..
            }
        ));
        assert_eq!(backend.calls(), 0);
    }

    #[test]
    fn enrichment_failure_degrades_when_configured() {
        let backend = Arc::new(ScriptedBackend::new(vec![Ok("# Report".into())]));
        let search = Arc::new(StubSearch::failing());
        let progress = Arc::new(CountingProgress::default());
        let config = ReportConfig::builder()
            .enrichment_policy(EnrichmentPolicy::Degrade)
            .progress_callback(Arc::clone(&progress) as Arc<dyn PipelineProgressCallback>)
            .build()
            .unwrap();
        let g = generator(config, &backend, &search);

        let report = tokio_test::block_on(g.generate(&ReportInput::from("ddos attack")))
            .unwrap();
        assert!(!report.stats.enriched);
        assert!(report.digest.is_empty());
        assert_eq!(progress.errors.load(Ordering::SeqCst), 1);
        assert!(backend.prompts.lock().unwrap()[0].contains("No external threat intelligence"));
    }

    #[test]
    fn disabled_policy_never_searches() {
        let backend = Arc::new(ScriptedBackend::new(vec![Ok("# Report".into())]));
        let search = Arc::new(StubSearch::failing());
        let g = generator(config(EnrichmentPolicy::Disabled), &backend, &search);

        tokio_test::block_on(g.generate(&ReportInput::from("ddos attack"))).unwrap();
        assert!(search.queries.lock().unwrap().is_empty());
    }

    #[test]
    fn no_keywords_skips_search() {
        let backend = Arc::new(ScriptedBackend::new(vec![Ok("# Report".into())]));
        let search = Arc::new(StubSearch::failing());
        let g = generator(config(EnrichmentPolicy::Abort), &backend, &search);

        tokio_test::block_on(g.generate(&ReportInput::from("10.0.0.1 22"))).unwrap();
        assert!(search.queries.lock().unwrap().is_empty());
    }

    #[test]
    fn nothing_extracted_is_reported() {
        let backend = Arc::new(ScriptedBackend::new(vec![Ok("# Report".into())]));
        let search = Arc::new(StubSearch::ok(&[]));
        let g = generator(config(EnrichmentPolicy::Abort), &backend, &search);

        let doc = UploadedDocument::new("payload.exe", b"MZ\x90\x00");
        let err = tokio_test::block_on(g.generate_from_document(&doc)).unwrap_err();
        assert!(matches!(err, ReportError::NothingExtracted { .. }));
        assert_eq!(err.kind(), crate::error::FailureKind::Extraction);
        assert_eq!(backend.calls(), 0);
    }

    #[test]
    fn document_flow_emits_stage_events_in_order() {
        let backend = Arc::new(ScriptedBackend::new(vec![Ok("# Report".into())]));
        let search = Arc::new(StubSearch::ok(&["snippet"]));
        let progress = Arc::new(CountingProgress::default());
        let config = ReportConfig::builder()
            .progress_callback(Arc::clone(&progress) as Arc<dyn PipelineProgressCallback>)
            .build()
            .unwrap();
        let g = generator(config, &backend, &search);

        let doc = UploadedDocument::new("incident.LOG", b"failed login from 10.9.8.7");
        tokio_test::block_on(g.generate_from_document(&doc)).unwrap();

        let events = progress.events.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                "start:extract",
                "done:extract",
                "start:signals",
                "done:signals",
                "start:enrich",
                "done:enrich",
                "start:generate",
                "done:generate",
            ]
        );
    }

    #[test]
    fn structured_form_signals_use_findings_only() {
        let backend = Arc::new(ScriptedBackend::new(vec![Ok("# Report".into())]));
        let search = Arc::new(StubSearch::ok(&[]));
        let g = generator(config(EnrichmentPolicy::Abort), &backend, &search);

        let form = crate::output::StructuredReport {
            report_type: "Vulnerability Assessment".into(),
            client_name: "Globex".into(),
            findings: vec!["Exposed RDP".into()],
            ..Default::default()
        };
        let report = tokio_test::block_on(g.generate(&ReportInput::from(form))).unwrap();

        let kws: Vec<&str> = report.signals.keywords.iter().map(String::as_str).collect();
        assert_eq!(kws, vec!["exposed", "rdp"]);
        assert!(backend.prompts.lock().unwrap()[0].contains("Client Name: Globex"));
    }

    #[tokio::test]
    async fn slow_backend_times_out() {
        struct Slow;

        #[async_trait]
        impl ReportBackend for Slow {
            async fn complete(
                &self,
                _s: &str,
                _u: &str,
                _o: &GenerationOptions,
            ) -> Result<Completion, BackendError> {
                sleep(Duration::from_secs(5)).await;
                Ok(Completion::default())
            }
        }

        let config = ReportConfig::builder()
            .enrichment_policy(EnrichmentPolicy::Disabled)
            .api_timeout_secs(1)
            .max_retries(0)
            .build()
            .unwrap();
        let g = ReportGenerator::with_backends(
            config,
            Arc::new(Slow),
            Arc::new(StubSearch::ok(&[])),
        );

        let err = g.generate(&ReportInput::from("worm")).await.unwrap_err();
        assert!(matches!(
            err,
            ReportError::Generation {
                attempts: 1,
                source: BackendError::Timeout { secs: 1 }
            }
        ));
    }

    #[test]
    fn backoff_doubles_and_saturates() {
        assert_eq!(backoff_delay_ms(500, 1), 500);
        assert_eq!(backoff_delay_ms(500, 3), 2000);
        assert_eq!(backoff_delay_ms(500, 64), u64::MAX);
        assert_eq!(backoff_delay_ms(500, u32::MAX), u64::MAX);
        assert_eq!(backoff_delay_ms(0, 100), 0);
    }

    #[test]
    fn default_models() {
        assert_eq!(default_model_for("Gemini"), "gemini-1.5-flash");
        assert_eq!(default_model_for("anthropic"), "claude-3-5-haiku-latest");
        assert_eq!(default_model_for("openai"), "gpt-4.1-nano");
    }
}
