//! Markdown → styled PDF.
//!
//! ## Stages
//!
//! ```text
//! Markdown
//!  │
//!  ├─ normalize  deterministic cleanup (fences, tables, line endings)
//!  ├─ markdown   pulldown-cmark events → headings / paragraphs / lists / tables
//!  ├─ layout     line breaking, pagination, cover, header rule, footer
//!  └─ assemble   lopdf object graph → bytes
//! ```
//!
//! The output uses only the base-14 Helvetica faces, so nothing is embedded
//! and the same input always lays out the same way. Only the Info
//! dictionary's `CreationDate` differs between two renders.

pub mod fonts;
pub mod layout;
pub mod markdown;
pub mod normalize;
pub mod style;

use crate::config::RenderConfig;
use crate::error::ReportError;
use crate::render::layout::Composer;
use crate::render::style::FontStyle;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, Stream, StringFormat};
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// MIME type of the rendered report.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// A finished PDF held in memory.
#[derive(Debug, Clone)]
pub struct RenderedPdf {
    bytes: Vec<u8>,
    page_count: usize,
}

impl RenderedPdf {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// A readable stream positioned at the start of the document.
    pub fn into_reader(self) -> Cursor<Vec<u8>> {
        Cursor::new(self.bytes)
    }

    /// Number of pages, cover included.
    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Render a report to PDF.
///
/// `created_at` is printed verbatim after "Report Generated:" on the first
/// content page. Malformed Markdown never fails: anything the parser cannot
/// place is dropped. Errors only come from serialising the document.
pub fn render(
    title: &str,
    markdown: &str,
    created_at: &str,
    config: &RenderConfig,
) -> Result<RenderedPdf, ReportError> {
    let normalized = normalize::normalize_markdown(markdown);
    let blocks = markdown::parse_blocks(&normalized);
    debug!("Rendering {} blocks", blocks.len());

    let mut composer = Composer::new(config);
    composer.cover(title);
    composer.metadata_line(created_at);
    for block in &blocks {
        composer.block(block);
    }
    let pages = composer.finish();
    let page_count = pages.len();

    let bytes = assemble(pages, title, config)?;
    debug!("Rendered {} pages ({} bytes)", page_count, bytes.len());
    Ok(RenderedPdf { bytes, page_count })
}

/// Local time formatted the way the report header shows it.
pub fn timestamp_now() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Download name for a report: `<title>.pdf`, with path separators and
/// control characters replaced.
pub fn attachment_file_name(title: &str) -> String {
    let cleaned: String = title
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '"' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let stem = cleaned.trim();
    if stem.is_empty() {
        "report.pdf".to_string()
    } else {
        format!("{stem}.pdf")
    }
}

/// Render and write the PDF to `path`.
///
/// The file is written to a temporary sibling first and renamed into place.
pub async fn render_to_file(
    path: impl AsRef<Path>,
    title: &str,
    markdown: &str,
    created_at: &str,
    config: &RenderConfig,
) -> Result<RenderedPdf, ReportError> {
    let pdf = render(title, markdown, created_at, config)?;
    let path = path.as_ref();
    let write_err = |e: std::io::Error| ReportError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }
    let tmp_path = path.with_extension("pdf.tmp");
    tokio::fs::write(&tmp_path, pdf.as_bytes())
        .await
        .map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;

    Ok(pdf)
}

// ── Document assembly ────────────────────────────────────────────────────

fn render_err(e: impl std::fmt::Display) -> ReportError {
    ReportError::Render {
        detail: e.to_string(),
    }
}

fn assemble(
    pages: Vec<Vec<Operation>>,
    title: &str,
    config: &RenderConfig,
) -> Result<Vec<u8>, ReportError> {
    let (width, height) = config.page_size.dimensions();
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut fonts = Dictionary::new();
    for face in FontStyle::ALL {
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => face.base_font(),
            "Encoding" => "WinAnsiEncoding",
        });
        fonts.set(face.resource(), Object::Reference(font_id));
    }
    let resources = dictionary! { "Font" => fonts };

    let mut kids = Vec::with_capacity(pages.len());
    for operations in pages {
        let content = Content { operations }.encode().map_err(render_err)?;
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(width),
                Object::Real(height),
            ],
            "Contents" => Object::Reference(content_id),
            "Resources" => resources.clone(),
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));
    let info_id = doc.add_object(info_dictionary(title, config));
    doc.trailer.set("Info", Object::Reference(info_id));

    doc.compress();
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).map_err(render_err)?;
    Ok(bytes)
}

fn info_dictionary(title: &str, config: &RenderConfig) -> Dictionary {
    let created = chrono::Utc::now().format("D:%Y%m%d%H%M%SZ").to_string();
    let mut info = dictionary! {
        "Title" => text_string(title),
        "Creator" => text_string("CypherDeck"),
        "Producer" => text_string(concat!("cypherdeck ", env!("CARGO_PKG_VERSION"))),
        "CreationDate" => Object::String(created.into_bytes(), StringFormat::Literal),
    };
    if let Some(author) = &config.author {
        info.set("Author", text_string(author));
    }
    info
}

/// PDF text string: literal for ASCII, UTF-16BE with BOM otherwise.
fn text_string(s: &str) -> Object {
    if s.is_ascii() {
        return Object::String(s.as_bytes().to_vec(), StringFormat::Literal);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in s.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PageSize;

    const REPORT: &str = "# Executive Summary\n\nThe assessment found **two** issues.\n\n\
        ## Key Findings\n\n\
        | Finding | Description | Threat Level |\n\
        | --- | --- | --- |\n\
        | SQL injection | Login form concatenates input | High |\n\
        | Legacy TLS | TLS 1.0 still enabled | Critical |\n\n\
        # Recommendations\n\n### Patch the login form\n\n- Use bound parameters\n- Add a WAF rule\n";

    fn pages(pdf: &RenderedPdf) -> Vec<Vec<Operation>> {
        let doc = Document::load_mem(pdf.as_bytes()).unwrap();
        doc.get_pages()
            .values()
            .map(|&id| {
                let raw = doc.get_page_content(id).unwrap();
                Content::decode(&raw).unwrap().operations
            })
            .collect()
    }

    fn num(obj: &Object) -> f32 {
        match obj {
            Object::Integer(i) => *i as f32,
            Object::Real(r) => *r as f32,
            other => panic!("not a number: {other:?}"),
        }
    }

    fn shown(op: &Operation) -> Option<&[u8]> {
        match (op.operator.as_str(), op.operands.first()) {
            ("Tj", Some(Object::String(bytes, _))) => Some(bytes.as_slice()),
            _ => None,
        }
    }

    fn all_text(ops: &[Operation]) -> Vec<Vec<u8>> {
        ops.iter().filter_map(shown).map(<[u8]>::to_vec).collect()
    }

    fn default_render(md: &str) -> RenderedPdf {
        render("Acme Pentest", md, "2024-05-01 10:00:00", &RenderConfig::default()).unwrap()
    }

    #[test]
    fn produces_a_loadable_pdf_with_cover() {
        let pdf = default_render(REPORT);
        assert!(pdf.as_bytes().starts_with(b"%PDF-"));
        assert!(pdf.page_count() >= 2);
        assert_eq!(pages(&pdf).len(), pdf.page_count());
        let cover = all_text(&pages(&pdf)[0]);
        assert!(cover.contains(&b"Acme Pentest".to_vec()));
        assert!(cover.contains(&b"CYPHERDECK".to_vec()));
    }

    #[test]
    fn subsection_heading_uses_bold_14pt() {
        let pdf = default_render(REPORT);
        let ops: Vec<Operation> = pages(&pdf).into_iter().flatten().collect();
        let idx = ops
            .iter()
            .position(|o| shown(o) == Some(b"Key Findings".as_slice()))
            .expect("heading drawn");
        let tf = ops[..idx]
            .iter()
            .rev()
            .find(|o| o.operator == "Tf")
            .expect("font set before heading");
        assert_eq!(tf.operands[0], Object::Name(b"F2".to_vec()));
        assert_eq!(num(&tf.operands[1]), 14.0);
    }

    #[test]
    fn high_cell_becomes_orange_badge_and_critical_stays_text() {
        let pdf = default_render(REPORT);
        let ops: Vec<Operation> = pages(&pdf).into_iter().flatten().collect();
        let text = all_text(&ops);
        assert!(text.contains(&b"HIGH".to_vec()));
        assert!(!text.contains(&b"High".to_vec()));
        assert!(text.contains(&b"Critical".to_vec()));
        assert!(!text.contains(&b"CRITICAL".to_vec()));

        let orange = ops.windows(3).any(|w| {
            w[0].operator == "rg"
                && (num(&w[0].operands[0]) - 0.902).abs() < 0.01
                && (num(&w[0].operands[1]) - 0.494).abs() < 0.01
                && (num(&w[0].operands[2]) - 0.133).abs() < 0.01
                && w[1].operator == "re"
                && w[2].operator == "f"
        });
        assert!(orange, "badge fill not found");
    }

    #[test]
    fn bullets_use_winansi_bullet_glyph() {
        let pdf = default_render(REPORT);
        let ops: Vec<Operation> = pages(&pdf).into_iter().flatten().collect();
        assert!(all_text(&ops).contains(&vec![fonts::BULLET]));
    }

    #[test]
    fn cover_has_no_footer_and_content_pages_do() {
        let pdf = default_render(REPORT);
        let pages = pages(&pdf);
        let uses_italic = |ops: &[Operation]| {
            ops.iter()
                .any(|o| o.operator == "Tf" && o.operands[0] == Object::Name(b"F3".to_vec()))
        };
        assert!(!uses_italic(&pages[0]));
        let second = all_text(&pages[1]);
        assert!(second.contains(&b"Page 2".to_vec()));
        assert!(second
            .iter()
            .any(|t| t.starts_with(b"Confidential")));
        assert!(second.contains(&b"Report Generated: ".to_vec()));
        assert!(second.contains(&b"2024-05-01 10:00:00".to_vec()));
    }

    #[test]
    fn layout_is_deterministic() {
        let a = pages(&default_render(REPORT));
        let b = pages(&default_render(REPORT));
        assert_eq!(a.len(), b.len());
        for (pa, pb) in a.iter().zip(&b) {
            let ea = Content { operations: pa.clone() }.encode().unwrap();
            let eb = Content { operations: pb.clone() }.encode().unwrap();
            assert_eq!(ea, eb);
        }
    }

    #[test]
    fn long_tables_repeat_their_header() {
        let mut md = String::from("| Finding | Threat Level |\n| --- | --- |\n");
        for i in 0..70 {
            md.push_str(&format!("| Issue number {i} | Low |\n"));
        }
        let pdf = default_render(&md);
        assert!(pdf.page_count() >= 3);
        let content_pages = &pages(&pdf)[1..];
        for page in content_pages {
            assert!(all_text(page).contains(&b"Threat Level".to_vec()));
        }
    }

    #[test]
    fn malformed_markdown_still_renders() {
        let inputs = [
            "",
            "```markdown\n# Only a fence",
            "| a |\n| b |\n|---|\n| c | d | e |",
            "**unclosed bold\n\n- \n\n#",
            "<script>alert(1)</script>\n\n![img](x.png)",
        ];
        for md in inputs {
            let pdf = default_render(md);
            assert!(pdf.page_count() >= 2, "input: {md:?}");
        }
    }

    #[test]
    fn a4_media_box_and_info_dictionary() {
        let config = RenderConfig::builder()
            .page_size(PageSize::A4)
            .author("Blue Team")
            .build();
        let pdf = render("Café audit", "text", "now", &config).unwrap();
        let doc = Document::load_mem(pdf.as_bytes()).unwrap();

        let first = *doc.get_pages().values().next().unwrap();
        let page = doc.get_dictionary(first).unwrap();
        let media = page.get(b"MediaBox").unwrap().as_array().unwrap();
        assert!((num(&media[2]) - 595.0).abs() < 1.0);
        assert!((num(&media[3]) - 842.0).abs() < 1.0);

        let info_id = doc.trailer.get(b"Info").unwrap().as_reference().unwrap();
        let info = doc.get_dictionary(info_id).unwrap();
        let Object::String(title, _) = info.get(b"Title").unwrap() else {
            panic!("title is not a string");
        };
        assert_eq!(&title[..2], &[0xFE, 0xFF]);
        let Object::String(author, _) = info.get(b"Author").unwrap() else {
            panic!("author is not a string");
        };
        assert_eq!(author.as_slice(), b"Blue Team");
    }

    #[test]
    fn attachment_names() {
        assert_eq!(attachment_file_name("Q1 Review"), "Q1 Review.pdf");
        assert_eq!(attachment_file_name("a/b\\c"), "a_b_c.pdf");
        assert_eq!(attachment_file_name("   "), "report.pdf");
    }

    #[test]
    fn reader_starts_at_beginning() {
        use std::io::Read;
        let mut reader = default_render("hi").into_reader();
        let mut head = [0u8; 5];
        reader.read_exact(&mut head).unwrap();
        assert_eq!(&head, b"%PDF-");
    }

    #[tokio::test]
    async fn render_to_file_writes_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("report.pdf");
        let pdf = render_to_file(&path, "T", "# Hi", "now", &RenderConfig::default())
            .await
            .unwrap();
        let written = std::fs::read(&path).unwrap();
        assert_eq!(written, pdf.as_bytes());
        assert!(!path.with_extension("pdf.tmp").exists());
    }
}
