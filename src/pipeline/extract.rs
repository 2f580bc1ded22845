//! Text extraction: uploaded bytes + filename → plain text.
//!
//! The file extension (lower-cased) is the only type signal. Each extension
//! maps to a [`TextExtractor`] strategy in an [`ExtractorRegistry`], so a new
//! format is one `register` call rather than another branch in a dispatcher.
//!
//! | Extensions | Strategy |
//! |------------|----------|
//! | txt, log, csv, json | UTF-8 decode |
//! | pdf | per-page text via lopdf, concatenated in page order |
//! | doc, docx | WordprocessingML paragraphs, one per line |
//! | html, xml | visible text nodes (scripts and styles dropped) |
//!
//! ## Failure contract
//!
//! [`ExtractorRegistry::extract`] never fails: unsupported types and parse
//! errors are logged at `warn` and collapse to an empty string. Callers must
//! therefore read empty text as "empty *or* unparseable". Use
//! [`ExtractorRegistry::try_extract`] to see the [`ExtractionError`].

use crate::error::ExtractionError;
use once_cell::sync::Lazy;
use quick_xml::events::Event;
use quick_xml::Reader;
use scraper::Html;
use std::collections::HashMap;
use std::fmt;
use std::io::{Cursor, Read, Seek, SeekFrom};
use std::sync::Arc;
use tracing::{debug, warn};

/// An upload as handed over by the caller: raw bytes plus the declared filename.
#[derive(Debug, Clone, Copy)]
pub struct UploadedDocument<'a> {
    pub filename: &'a str,
    pub bytes: &'a [u8],
}

impl<'a> UploadedDocument<'a> {
    pub fn new(filename: &'a str, bytes: &'a [u8]) -> Self {
        Self { filename, bytes }
    }

    /// Lower-cased extension used for dispatch.
    pub fn extension(&self) -> String {
        file_extension(self.filename)
    }
}

/// Lower-cased text after the last `.` of `filename`; empty when there is none.
pub fn file_extension(filename: &str) -> String {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default()
}

/// One extraction strategy.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError>;
}

/// Maps lower-cased extensions to extraction strategies.
#[derive(Clone)]
pub struct ExtractorRegistry {
    extractors: HashMap<String, Arc<dyn TextExtractor>>,
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::with_builtin_formats()
    }
}

impl fmt::Debug for ExtractorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractorRegistry")
            .field("extensions", &self.extensions())
            .finish()
    }
}

impl ExtractorRegistry {
    /// A registry with no formats at all.
    pub fn empty() -> Self {
        Self {
            extractors: HashMap::new(),
        }
    }

    /// A registry with txt, log, csv, json, pdf, doc, docx, html and xml.
    pub fn with_builtin_formats() -> Self {
        let mut registry = Self::empty();

        let plain: Arc<dyn TextExtractor> = Arc::new(PlainTextExtractor);
        for ext in ["txt", "log", "csv", "json"] {
            registry.register(ext, Arc::clone(&plain));
        }

        registry.register("pdf", Arc::new(PdfExtractor));

        let word: Arc<dyn TextExtractor> = Arc::new(WordExtractor);
        registry.register("doc", Arc::clone(&word));
        registry.register("docx", word);

        let markup: Arc<dyn TextExtractor> = Arc::new(MarkupExtractor);
        registry.register("html", Arc::clone(&markup));
        registry.register("xml", markup);

        registry
    }

    /// Register (or replace) the strategy for `extension`.
    ///
    /// Returns the strategy previously registered for it, if any.
    pub fn register(
        &mut self,
        extension: &str,
        extractor: Arc<dyn TextExtractor>,
    ) -> Option<Arc<dyn TextExtractor>> {
        let key = extension.trim_start_matches('.').to_ascii_lowercase();
        self.extractors.insert(key, extractor)
    }

    /// Whether `filename`'s extension has a registered strategy.
    pub fn supports(&self, filename: &str) -> bool {
        self.extractors.contains_key(&file_extension(filename))
    }

    /// Registered extensions, sorted.
    pub fn extensions(&self) -> Vec<&str> {
        let mut exts: Vec<&str> = self.extractors.keys().map(String::as_str).collect();
        exts.sort_unstable();
        exts
    }

    /// Extract text, surfacing the reason when extraction is impossible.
    pub fn try_extract(&self, doc: &UploadedDocument<'_>) -> Result<String, ExtractionError> {
        let extension = doc.extension();
        let extractor = self
            .extractors
            .get(&extension)
            .ok_or(ExtractionError::UnsupportedType { extension })?;
        let text = extractor.extract(doc.bytes)?;
        debug!("Extracted {} chars from {}", text.len(), doc.filename);
        Ok(text)
    }

    /// Extract text; any failure is logged and yields an empty string.
    pub fn extract(&self, doc: &UploadedDocument<'_>) -> String {
        match self.try_extract(doc) {
            Ok(text) => text,
            Err(e @ ExtractionError::UnsupportedType { .. }) => {
                warn!("{} for {}", e, doc.filename);
                String::new()
            }
            Err(e) => {
                warn!("Error extracting text from {}: {}", doc.filename, e);
                String::new()
            }
        }
    }

    /// Extract from a seekable byte source, leaving its position where it was.
    pub fn extract_reader<R: Read + Seek>(&self, reader: &mut R, filename: &str) -> String {
        match read_and_rewind(reader) {
            Ok(bytes) => self.extract(&UploadedDocument::new(filename, &bytes)),
            Err(e) => {
                warn!("Error reading {}: {}", filename, e);
                String::new()
            }
        }
    }
}

fn read_and_rewind<R: Read + Seek>(reader: &mut R) -> Result<Vec<u8>, ExtractionError> {
    let io_err = |e: std::io::Error| ExtractionError::Io {
        detail: e.to_string(),
    };
    let start = reader.stream_position().map_err(io_err)?;
    let mut bytes = Vec::new();
    let read = reader.read_to_end(&mut bytes);
    reader.seek(SeekFrom::Start(start)).map_err(io_err)?;
    read.map_err(io_err)?;
    Ok(bytes)
}

static DEFAULT_REGISTRY: Lazy<ExtractorRegistry> = Lazy::new(ExtractorRegistry::default);

/// Extract text from `bytes` using the built-in formats.
///
/// Unsupported or unparseable files yield an empty string (see module docs).
pub fn extract_text(bytes: &[u8], filename: &str) -> String {
    DEFAULT_REGISTRY.extract(&UploadedDocument::new(filename, bytes))
}

// ── Strategies ───────────────────────────────────────────────────────────

/// txt / log / csv / json: the bytes are the text.
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        let text = std::str::from_utf8(bytes).map_err(|e| ExtractionError::InvalidUtf8 {
            detail: e.to_string(),
        })?;
        Ok(text.strip_prefix('\u{FEFF}').unwrap_or(text).to_string())
    }
}

/// PDF: every page's text, in page order.
pub struct PdfExtractor;

impl TextExtractor for PdfExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        let pdf_err = |e: lopdf::Error| ExtractionError::Pdf {
            detail: e.to_string(),
        };
        let document = lopdf::Document::load_mem(bytes).map_err(pdf_err)?;

        // get_pages() is a BTreeMap keyed by 1-based page number.
        let mut text = String::new();
        for page_number in document.get_pages().keys() {
            let page_text = document.extract_text(&[*page_number]).map_err(pdf_err)?;
            text.push_str(&page_text);
        }
        Ok(text)
    }
}

/// DOCX: paragraph text from `word/document.xml`, each followed by a newline.
///
/// Legacy binary `.doc` files are not zip packages and fail here, which the
/// registry reports as an empty result.
pub struct WordExtractor;

impl TextExtractor for WordExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(word_err)?;
        let mut xml = String::new();
        archive
            .by_name("word/document.xml")
            .map_err(word_err)?
            .read_to_string(&mut xml)
            .map_err(word_err)?;
        paragraphs_from_document_xml(&xml)
    }
}

fn word_err(e: impl fmt::Display) -> ExtractionError {
    ExtractionError::Word {
        detail: e.to_string(),
    }
}

/// Walk WordprocessingML, emitting the text runs of each `<w:p>` then `\n`.
fn paragraphs_from_document_xml(xml: &str) -> Result<String, ExtractionError> {
    let mut reader = Reader::from_str(xml);
    let mut out = String::new();
    let mut paragraph = String::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event().map_err(word_err)? {
            Event::Start(e) => {
                if e.local_name().as_ref() == b"t" {
                    in_text_run = true;
                }
            }
            Event::Empty(e) => match e.local_name().as_ref() {
                b"tab" => paragraph.push('\t'),
                b"br" | b"cr" => paragraph.push('\n'),
                b"p" => out.push('\n'),
                _ => {}
            },
            Event::Text(t) if in_text_run => {
                paragraph.push_str(&t.unescape().map_err(word_err)?);
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text_run = false,
                b"p" => {
                    out.push_str(&paragraph);
                    out.push('\n');
                    paragraph.clear();
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(out)
}

/// HTML / XML: the concatenated text nodes, minus script-like content.
pub struct MarkupExtractor;

const HIDDEN_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

impl TextExtractor for MarkupExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        let source = String::from_utf8_lossy(bytes);
        let html = Html::parse_document(&source);

        let mut text = String::new();
        for node in html.tree.root().descendants() {
            let Some(t) = node.value().as_text() else {
                continue;
            };
            let hidden = node.ancestors().any(|a| {
                a.value()
                    .as_element()
                    .is_some_and(|el| HIDDEN_ELEMENTS.contains(&el.name()))
            });
            if !hidden {
                text.push_str(t);
            }
        }
        Ok(text)
    }
}
