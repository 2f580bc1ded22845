//! Semantic parse: Markdown → a flat list of renderable [`Block`]s.
//!
//! The renderer knows a fixed set of element kinds (headings 1–3,
//! paragraphs, lists, tables). Everything else the parser reports (code
//! blocks, deeper headings, rules, raw HTML, images) is dropped here, so the
//! layout stage never sees it. Inline emphasis survives as styled [`Span`]s.

use crate::render::style::FontStyle;
use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};

/// A run of text in one face.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub style: FontStyle,
}

impl Span {
    pub fn new(text: impl Into<String>, style: FontStyle) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }
}

/// Plain text of a span sequence.
pub fn plain_text(spans: &[Span]) -> String {
    spans.iter().map(|s| s.text.as_str()).collect()
}

/// List item marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Bullet,
    Number(u64),
}

/// One list item; nesting is expressed by `depth` (0 = outermost).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    pub depth: usize,
    pub marker: Marker,
    pub spans: Vec<Span>,
}

pub type Cell = Vec<Span>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// Level 1..=3.
    Heading { level: u8, spans: Vec<Span> },
    Paragraph(Vec<Span>),
    List(Vec<ListEntry>),
    Table { header: Vec<Cell>, rows: Vec<Vec<Cell>> },
}

/// Parse Markdown into blocks. Never fails; unknown constructs are skipped.
pub fn parse_blocks(markdown: &str) -> Vec<Block> {
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
    let mut builder = BlockBuilder::default();
    for event in Parser::new_ext(markdown, options) {
        builder.push(event);
    }
    builder.blocks
}

#[derive(Default)]
struct TableState {
    header: Vec<Cell>,
    rows: Vec<Vec<Cell>>,
    row: Vec<Cell>,
}

#[derive(Default)]
struct BlockBuilder {
    blocks: Vec<Block>,
    spans: Vec<Span>,
    bold: usize,
    italic: usize,
    /// Nesting depth of constructs whose text is dropped.
    skip: usize,
    heading: Option<u8>,
    /// Next number per open list; `None` for bullet lists.
    lists: Vec<Option<u64>>,
    entries: Vec<ListEntry>,
    open_items: Vec<usize>,
    table: Option<TableState>,
}

impl BlockBuilder {
    fn push(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) | Event::Code(text) => self.text(&text),
            Event::SoftBreak | Event::HardBreak => self.text(" "),
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::CodeBlock(_) | Tag::Image { .. } => self.skip += 1,
            Tag::Heading { level, .. } => match heading_level(level) {
                Some(n) => {
                    // Tight list items keep their text buffered until the item ends.
                    self.flush_into_item();
                    self.spans.clear();
                    self.heading = Some(n);
                }
                None => self.skip += 1,
            },
            Tag::Strong => self.bold += 1,
            Tag::Emphasis => self.italic += 1,
            Tag::List(start) => {
                self.flush_into_item();
                self.lists.push(start);
            }
            Tag::Item => {
                self.flush_into_item();
                let depth = self.lists.len().saturating_sub(1);
                let marker = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let m = Marker::Number(*n);
                        *n += 1;
                        m
                    }
                    _ => Marker::Bullet,
                };
                self.entries.push(ListEntry {
                    depth,
                    marker,
                    spans: Vec::new(),
                });
                self.open_items.push(self.entries.len() - 1);
            }
            Tag::Table(_) => self.table = Some(TableState::default()),
            Tag::TableCell => self.spans.clear(),
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::CodeBlock | TagEnd::Image => self.skip = self.skip.saturating_sub(1),
            TagEnd::Heading(level) => {
                if heading_level(level).is_none() {
                    self.skip = self.skip.saturating_sub(1);
                } else if let Some(level) = self.heading.take() {
                    if !self.open_items.is_empty() {
                        self.flush_into_item();
                        return;
                    }
                    let spans = self.take_spans();
                    if !spans.is_empty() {
                        self.blocks.push(Block::Heading { level, spans });
                    }
                }
            }
            TagEnd::Strong => self.bold = self.bold.saturating_sub(1),
            TagEnd::Emphasis => self.italic = self.italic.saturating_sub(1),
            TagEnd::Paragraph => {
                if !self.open_items.is_empty() {
                    self.flush_into_item();
                } else if self.table.is_none() {
                    let spans = self.take_spans();
                    if !spans.is_empty() {
                        self.blocks.push(Block::Paragraph(spans));
                    }
                }
            }
            TagEnd::Item => {
                self.flush_into_item();
                self.open_items.pop();
            }
            TagEnd::List(_) => {
                self.lists.pop();
                if self.lists.is_empty() {
                    let entries: Vec<ListEntry> = std::mem::take(&mut self.entries)
                        .into_iter()
                        .filter(|e| !e.spans.is_empty())
                        .collect();
                    if !entries.is_empty() {
                        self.blocks.push(Block::List(entries));
                    }
                }
            }
            TagEnd::TableCell => {
                let cell = self.take_spans();
                if let Some(table) = self.table.as_mut() {
                    table.row.push(cell);
                }
            }
            TagEnd::TableHead => {
                if let Some(table) = self.table.as_mut() {
                    table.header = std::mem::take(&mut table.row);
                }
            }
            TagEnd::TableRow => {
                if let Some(table) = self.table.as_mut() {
                    let row = std::mem::take(&mut table.row);
                    table.rows.push(row);
                }
            }
            TagEnd::Table => {
                if let Some(table) = self.table.take() {
                    if !table.header.is_empty() || !table.rows.is_empty() {
                        self.blocks.push(Block::Table {
                            header: table.header,
                            rows: table.rows,
                        });
                    }
                }
            }
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        if self.skip > 0 {
            return;
        }
        let style = if self.bold > 0 {
            FontStyle::Bold
        } else if self.italic > 0 {
            FontStyle::Italic
        } else {
            FontStyle::Regular
        };
        match self.spans.last_mut() {
            Some(last) if last.style == style => last.text.push_str(text),
            _ => self.spans.push(Span::new(text, style)),
        }
    }

    /// Drain the inline buffer, dropping it entirely if it is only whitespace.
    fn take_spans(&mut self) -> Vec<Span> {
        let spans = std::mem::take(&mut self.spans);
        if spans.iter().all(|s| s.text.trim().is_empty()) {
            Vec::new()
        } else {
            spans
        }
    }

    /// Append buffered text to the innermost open list item.
    fn flush_into_item(&mut self) {
        let Some(&idx) = self.open_items.last() else {
            return;
        };
        let spans = self.take_spans();
        if spans.is_empty() {
            return;
        }
        let entry = &mut self.entries[idx];
        if !entry.spans.is_empty() {
            entry.spans.push(Span::new(" ", FontStyle::Regular));
        }
        entry.spans.extend(spans);
    }
}

fn heading_level(level: HeadingLevel) -> Option<u8> {
    match level {
        HeadingLevel::H1 => Some(1),
        HeadingLevel::H2 => Some(2),
        HeadingLevel::H3 => Some(3),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_of(block: &Block) -> String {
        match block {
            Block::Heading { spans, .. } | Block::Paragraph(spans) => plain_text(spans),
            other => panic!("not a text block: {other:?}"),
        }
    }

    #[test]
    fn headings_one_to_three_only() {
        let blocks = parse_blocks("# A\n\n## B\n\n### C\n\n#### D\n\nbody");
        assert_eq!(blocks.len(), 4);
        assert!(matches!(&blocks[0], Block::Heading { level: 1, .. }));
        assert!(matches!(&blocks[1], Block::Heading { level: 2, .. }));
        assert!(matches!(&blocks[2], Block::Heading { level: 3, .. }));
        assert_eq!(text_of(&blocks[3]), "body");
    }

    #[test]
    fn emphasis_becomes_styled_spans() {
        let blocks = parse_blocks("Patch **now** or *soon*.");
        let Block::Paragraph(spans) = &blocks[0] else {
            panic!("expected paragraph");
        };
        assert_eq!(
            spans,
            &vec![
                Span::new("Patch ", FontStyle::Regular),
                Span::new("now", FontStyle::Bold),
                Span::new(" or ", FontStyle::Regular),
                Span::new("soon", FontStyle::Italic),
                Span::new(".", FontStyle::Regular),
            ]
        );
    }

    #[test]
    fn unrecognised_blocks_are_dropped() {
        let md = "```\nrm -rf /\n```\n\n---\n\n<div>raw</div>\n\n![x](y.png)\n\nkept";
        let blocks = parse_blocks(md);
        assert_eq!(blocks.len(), 1);
        assert_eq!(text_of(&blocks[0]), "kept");
    }

    #[test]
    fn nested_and_numbered_lists() {
        let md = "3. first\n4. second\n   - inner\n\n- solo";
        let blocks = parse_blocks(md);
        assert_eq!(blocks.len(), 2);

        let Block::List(entries) = &blocks[0] else {
            panic!("expected list");
        };
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].marker, Marker::Number(3));
        assert_eq!(entries[1].marker, Marker::Number(4));
        assert_eq!(plain_text(&entries[1].spans), "second");
        assert_eq!(entries[2].depth, 1);
        assert_eq!(entries[2].marker, Marker::Bullet);
        assert_eq!(plain_text(&entries[2].spans), "inner");

        let Block::List(entries) = &blocks[1] else {
            panic!("expected list");
        };
        assert_eq!(entries[0].marker, Marker::Bullet);
    }

    #[test]
    fn loose_list_items_join_paragraphs() {
        let blocks = parse_blocks("- one\n\n  more\n\n- two");
        let Block::List(entries) = &blocks[0] else {
            panic!("expected list");
        };
        assert_eq!(plain_text(&entries[0].spans), "one more");
        assert_eq!(plain_text(&entries[1].spans), "two");
    }

    #[test]
    fn heading_inside_tight_list_stays_with_its_item() {
        let blocks = parse_blocks("- item one\n  ### Nested heading\n- item two\n");
        assert_eq!(blocks.len(), 1, "got {blocks:?}");
        let Block::List(entries) = &blocks[0] else {
            panic!("expected list");
        };
        assert_eq!(entries.len(), 2);
        assert_eq!(plain_text(&entries[0].spans), "item one Nested heading");
        assert_eq!(plain_text(&entries[1].spans), "item two");
    }

    #[test]
    fn table_header_and_rows() {
        let md = "| Finding | Threat Level |\n|---|---|\n| SQLi | **High** |\n| XSS | Low |";
        let blocks = parse_blocks(md);
        let Block::Table { header, rows } = &blocks[0] else {
            panic!("expected table");
        };
        assert_eq!(header.len(), 2);
        assert_eq!(plain_text(&header[1]), "Threat Level");
        assert_eq!(rows.len(), 2);
        assert_eq!(plain_text(&rows[0][1]), "High");
        assert_eq!(rows[0][1][0].style, FontStyle::Bold);
    }

    #[test]
    fn blockquote_paragraphs_survive() {
        let blocks = parse_blocks("> quoted advice");
        assert_eq!(text_of(&blocks[0]), "quoted advice");
    }

    #[test]
    fn empty_input() {
        assert!(parse_blocks("").is_empty());
        assert!(parse_blocks("   \n\n").is_empty());
    }
}
