//! CLI binary for cypherdeck.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ReportConfig` / `RenderConfig` and prints results.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use cypherdeck::render::timestamp_now;
use cypherdeck::{
    attachment_file_name, extract_signals, EnrichmentPolicy, ExtractorRegistry, PageSize,
    PipelineProgressCallback, PipelineStage, ProgressCallback, RenderConfig, ReportConfig,
    ReportError, ReportGenerator, ReportInput, StructuredReport, UploadedDocument,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner plus one log line per finished stage.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Report");
        bar.set_message("starting…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

fn stage_label(stage: PipelineStage) -> &'static str {
    match stage {
        PipelineStage::Extract => "Extracting text",
        PipelineStage::Signals => "Extracting signals",
        PipelineStage::Enrich => "Searching threat intel",
        PipelineStage::Generate => "Writing report",
        PipelineStage::Render => "Rendering PDF",
    }
}

impl PipelineProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: PipelineStage) {
        self.bar.set_message(format!("{}…", stage_label(stage)));
    }

    fn on_stage_complete(&self, stage: PipelineStage, elapsed_ms: u64) {
        self.bar.println(format!(
            "  {} {:<24} {}",
            green("✓"),
            stage_label(stage),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
    }

    fn on_stage_error(&self, stage: PipelineStage, error: &str) {
        // Keep the line short; the full error is printed on exit.
        let msg: String = if error.chars().count() > 80 {
            let head: String = error.chars().take(79).collect();
            format!("{head}\u{2026}")
        } else {
            error.to_string()
        };
        self.bar
            .println(format!("  {} {:<24} {}", red("✗"), stage_label(stage), red(&msg)));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Show the text and signals pulled from an upload (no network, no API key)
  cypherdeck extract scan-results.pdf
  cypherdeck extract incident.docx --json

  # Render an existing Markdown report (no API key needed)
  cypherdeck render report.md --title "Q2 Perimeter Review" -o review.pdf

  # Full pipeline from an uploaded artefact
  cypherdeck report nmap.txt --title "External Exposure" -o exposure.pdf

  # Full pipeline from a structured assessment form, keep the Markdown too
  cypherdeck report --form assessment.json --markdown report.md

  # Offline: never query the search engine
  cypherdeck report notes.txt --enrichment disabled

SUPPORTED UPLOADS:
  .pdf  .docx  .doc  .html  .xml  .txt  .log  .csv  .json

FORM FILE (JSON):
  {
    "report_type": "Penetration Test",
    "project_name": "Acme Portal",
    "client_name": "Acme Corp",
    "findings": ["SQL injection in /login", "TLS 1.0 enabled on 10.0.0.5"],
    "risk_analysis": "…",
    "recommendations": "…"
  }

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini API key
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (gemini, openai, anthropic, ollama)
  EDGEQUAKE_MODEL         Override model ID
  RUST_LOG                Log filter (e.g. cypherdeck=debug)
"#;

/// Generate cybersecurity reports with an LLM and render them as PDFs.
#[derive(Parser, Debug)]
#[command(
    name = "cypherdeck",
    version,
    about = "Generate cybersecurity reports with an LLM and render them as PDFs",
    long_about = "Extract text from security artefacts (PDF, DOCX, HTML, XML, plain text), \
enrich the detected signals with a web search, ask an LLM to write a structured \
cybersecurity report, and render it as a branded PDF with severity badges.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "CYPHERDECK_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "CYPHERDECK_QUIET")]
    quiet: bool,

    /// Disable the progress spinner.
    #[arg(long, global = true, env = "CYPHERDECK_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the text and signals extracted from a file.
    Extract {
        /// Uploaded file (.pdf, .docx, .doc, .html, .xml, .txt, .log, .csv, .json).
        file: PathBuf,

        /// Emit text and signals as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Render a Markdown report to PDF.
    Render {
        /// Markdown file.
        markdown: PathBuf,

        /// Report title shown on the cover page.
        #[arg(long, env = "CYPHERDECK_TITLE")]
        title: String,

        /// Output PDF path. Default: "<title>.pdf".
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        render: RenderArgs,
    },

    /// Run the full pipeline: extract → signals → enrich → generate → render.
    Report(ReportArgs),
}

#[derive(Args, Debug)]
struct RenderArgs {
    /// Page size: letter or a4.
    #[arg(long, env = "CYPHERDECK_PAGE_SIZE", value_enum, default_value = "letter")]
    page_size: PageSizeArg,

    /// Footer text on every page after the cover.
    #[arg(long, env = "CYPHERDECK_FOOTER")]
    footer: Option<String>,

    /// Text inside the cover logo placeholder.
    #[arg(long, env = "CYPHERDECK_BRAND")]
    brand: Option<String>,

    /// Author recorded in the PDF metadata.
    #[arg(long, env = "CYPHERDECK_AUTHOR")]
    author: Option<String>,
}

#[derive(Args, Debug)]
struct ReportArgs {
    /// Uploaded file to report on. Not needed with --form.
    #[arg(required_unless_present = "form")]
    file: Option<PathBuf>,

    /// JSON file with a structured assessment form.
    #[arg(long, conflicts_with = "file")]
    form: Option<PathBuf>,

    /// Output PDF path. Default: "<title>.pdf".
    #[arg(short, long, env = "CYPHERDECK_OUTPUT")]
    output: Option<PathBuf>,

    /// Also write the generated Markdown here.
    #[arg(long)]
    markdown: Option<PathBuf>,

    /// Report title. Default: form project name, file stem, or "Cybersecurity Report".
    #[arg(long, env = "CYPHERDECK_TITLE")]
    title: Option<String>,

    /// LLM model ID (e.g. gemini-1.5-flash, gpt-4.1-mini).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: gemini, openai, anthropic, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "CYPHERDECK_TEMPERATURE", default_value_t = 0.7)]
    temperature: f32,

    /// Max LLM output tokens.
    #[arg(long, env = "CYPHERDECK_MAX_TOKENS", default_value_t = 3000)]
    max_tokens: usize,

    /// Retries on LLM failure.
    #[arg(long, env = "CYPHERDECK_MAX_RETRIES", default_value_t = 2)]
    max_retries: u32,

    /// LLM call timeout in seconds.
    #[arg(long, env = "CYPHERDECK_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// What to do when the threat-intel search fails.
    #[arg(long, env = "CYPHERDECK_ENRICHMENT", value_enum, default_value = "abort")]
    enrichment: EnrichmentArg,

    /// Search request timeout in seconds.
    #[arg(long, env = "CYPHERDECK_SEARCH_TIMEOUT", default_value_t = 15)]
    search_timeout: u64,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "CYPHERDECK_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    #[command(flatten)]
    render: RenderArgs,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum PageSizeArg {
    Letter,
    A4,
}

impl From<PageSizeArg> for PageSize {
    fn from(v: PageSizeArg) -> Self {
        match v {
            PageSizeArg::Letter => PageSize::Letter,
            PageSizeArg::A4 => PageSize::A4,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum EnrichmentArg {
    Abort,
    Degrade,
    Disabled,
}

impl From<EnrichmentArg> for EnrichmentPolicy {
    fn from(v: EnrichmentArg) -> Self {
        match v {
            EnrichmentArg::Abort => EnrichmentPolicy::Abort,
            EnrichmentArg::Degrade => EnrichmentPolicy::Degrade,
            EnrichmentArg::Disabled => EnrichmentPolicy::Disabled,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner gives all the feedback that matters, so library INFO logs
    // are muted while it is shown.
    let is_json = matches!(cli.command, Command::Extract { json: true, .. });
    let show_progress = !cli.quiet && !cli.no_progress && matches!(cli.command, Command::Report(_));
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress || is_json {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match &cli.command {
        Command::Extract { file, json } => run_extract(file, *json).await,
        Command::Render {
            markdown,
            title,
            output,
            render,
        } => run_render(&cli, markdown, title, output.as_deref(), render).await,
        Command::Report(args) => run_report(&cli, args, show_progress).await,
    }
}

// ── extract ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ExtractOutput<'a> {
    file: String,
    chars: usize,
    text: &'a str,
    signals: cypherdeck::SignalSet,
}

async fn run_extract(file: &Path, json: bool) -> Result<()> {
    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let filename = file_name(file);

    let registry = ExtractorRegistry::default();
    let text = registry
        .try_extract(&UploadedDocument::new(&filename, &bytes))
        .with_context(|| format!("Could not extract text from {filename}"))?;
    let signals = extract_signals(&text);

    if json {
        let out = ExtractOutput {
            file: filename,
            chars: text.chars().count(),
            text: &text,
            signals,
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&out).context("Failed to serialise output")?
        );
        return Ok(());
    }

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(text.as_bytes())
        .context("Failed to write to stdout")?;
    if !text.ends_with('\n') {
        handle.write_all(b"\n").ok();
    }

    eprintln!();
    eprintln!("{} {}", cyan("◆"), bold("Signals"));
    eprintln!("  Keywords:  {}", dim(&signals.keyword_list(40)));
    eprintln!("  Numeric:   {}", dim(&signals.numeric.to_json()));
    Ok(())
}

// ── render ───────────────────────────────────────────────────────────────

async fn run_render(
    cli: &Cli,
    markdown: &Path,
    title: &str,
    output: Option<&Path>,
    args: &RenderArgs,
) -> Result<()> {
    let md = tokio::fs::read_to_string(markdown)
        .await
        .with_context(|| format!("Failed to read {}", markdown.display()))?;
    let config = build_render_config(args);
    let path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(attachment_file_name(title)));

    let pdf = cypherdeck::render_to_file(&path, title, &md, &timestamp_now(), &config)
        .await
        .map_err(explain)?;

    if !cli.quiet {
        eprintln!(
            "{}  {} pages  →  {}",
            green("✔"),
            pdf.page_count(),
            bold(&path.display().to_string())
        );
    }
    Ok(())
}

// ── report ───────────────────────────────────────────────────────────────

async fn run_report(cli: &Cli, args: &ReportArgs, show_progress: bool) -> Result<()> {
    let progress = show_progress.then(CliProgressCallback::new);
    let progress_cb: Option<ProgressCallback> = progress
        .clone()
        .map(|cb| cb as Arc<dyn PipelineProgressCallback>);

    let config = build_report_config(args, progress_cb.clone()).await?;
    let generator = ReportGenerator::new(config).map_err(explain)?;

    let (report, default_title) = if let Some(form_path) = &args.form {
        let raw = tokio::fs::read_to_string(form_path)
            .await
            .with_context(|| format!("Failed to read form {}", form_path.display()))?;
        let form: StructuredReport =
            serde_json::from_str(&raw).context("Form file is not a valid assessment form")?;
        let title = non_blank(&form.project_name);
        let report = generator
            .generate(&ReportInput::StructuredForm(form))
            .await;
        (report, title)
    } else {
        let file = args
            .file
            .as_deref()
            .context("Either FILE or --form is required")?;
        let bytes = tokio::fs::read(file)
            .await
            .with_context(|| format!("Failed to read {}", file.display()))?;
        let filename = file_name(file);
        let report = generator
            .generate_from_document(&UploadedDocument::new(&filename, &bytes))
            .await;
        let stem = file.file_stem().and_then(|s| s.to_str()).and_then(non_blank);
        (report, stem)
    };

    let report = match report {
        Ok(r) => r,
        Err(e) => {
            if let Some(p) = &progress {
                p.finish();
            }
            return Err(explain(e));
        }
    };

    let title = args
        .title
        .clone()
        .or(default_title)
        .unwrap_or_else(|| "Cybersecurity Report".to_string());

    if let Some(md_path) = &args.markdown {
        tokio::fs::write(md_path, &report.markdown)
            .await
            .with_context(|| format!("Failed to write {}", md_path.display()))?;
    }

    // ── Render ───────────────────────────────────────────────────────────
    let out_path = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(attachment_file_name(&title)));
    if let Some(cb) = &progress_cb {
        cb.on_stage_start(PipelineStage::Render);
    }
    let render_start = Instant::now();
    let rendered = cypherdeck::render_to_file(
        &out_path,
        &title,
        &report.markdown,
        &timestamp_now(),
        &build_render_config(&args.render),
    )
    .await;
    match (&rendered, &progress_cb) {
        (Ok(_), Some(cb)) => cb.on_stage_complete(
            PipelineStage::Render,
            render_start.elapsed().as_millis() as u64,
        ),
        (Err(e), Some(cb)) => cb.on_stage_error(PipelineStage::Render, &e.to_string()),
        _ => {}
    }
    if let Some(p) = &progress {
        p.finish();
    }
    let pdf = rendered.map_err(explain)?;

    if !cli.quiet {
        let stats = &report.stats;
        eprintln!(
            "{}  {} pages  {}ms  →  {}",
            green("✔"),
            pdf.page_count(),
            stats.total_duration_ms,
            bold(&out_path.display().to_string()),
        );
        eprintln!(
            "   {} tokens in  /  {} tokens out  /  intel: {}",
            dim(&stats.input_tokens.to_string()),
            dim(&stats.output_tokens.to_string()),
            if stats.enriched {
                dim(&format!("{} snippets", report.digest.snippets.len()))
            } else {
                dim("none")
            },
        );
    }
    Ok(())
}

/// Map CLI args to `ReportConfig`.
async fn build_report_config(
    args: &ReportArgs,
    progress: Option<ProgressCallback>,
) -> Result<ReportConfig> {
    let mut builder = ReportConfig::builder()
        .temperature(args.temperature)
        .max_tokens(args.max_tokens)
        .max_retries(args.max_retries)
        .api_timeout_secs(args.api_timeout)
        .enrichment_policy(args.enrichment.into())
        .search_timeout_secs(args.search_timeout);

    if let Some(path) = &args.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(model) = &args.model {
        builder = builder.model(model);
    }
    if let Some(provider) = &args.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Map CLI args to `RenderConfig`.
fn build_render_config(args: &RenderArgs) -> RenderConfig {
    let mut builder = RenderConfig::builder().page_size(args.page_size.into());
    if let Some(footer) = &args.footer {
        builder = builder.footer_notice(footer);
    }
    if let Some(brand) = &args.brand {
        builder = builder.brand_mark(brand);
    }
    if let Some(author) = &args.author {
        builder = builder.author(author);
    }
    builder.build()
}

/// Attach the user-facing message for the failure kind.
fn explain(e: ReportError) -> anyhow::Error {
    let message = e.kind().user_message();
    anyhow::Error::new(e).context(message)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn non_blank(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn help_lists_exactly_the_registered_uploads() {
        let section = AFTER_HELP
            .split("SUPPORTED UPLOADS:")
            .nth(1)
            .and_then(|rest| rest.lines().nth(1))
            .unwrap();
        let mut listed: Vec<&str> = section
            .split_whitespace()
            .map(|ext| ext.trim_start_matches('.'))
            .collect();
        listed.sort_unstable();
        assert_eq!(listed, ExtractorRegistry::default().extensions());
    }
}
