//! Flowable layout: blocks → per-page content-stream operations.
//!
//! The composer keeps a single cursor `y` (top of the free space on the
//! current page) and moves it down as blocks are placed. A block that does
//! not fit starts a new page. Nothing here touches the PDF object graph;
//! [`crate::render`] wraps the finished operation lists into pages.
//!
//! ## Text
//!
//! Every line is its own `BT … ET` object. Runs inside a line switch font
//! with `Tf` when emphasis changes. Justified lines stretch the gaps between
//! words with `Tw`; since words never contain a space byte, `Tw` only
//! widens the separators. The last line of a paragraph is set ragged.
//!
//! ## Page furniture
//!
//! The cover is page 1 and carries no header rule or footer. All following
//! pages get both, added in [`Composer::finish`] once the page count is known.

use crate::config::RenderConfig;
use crate::render::fonts;
use crate::render::markdown::{plain_text, Block, Cell, ListEntry, Marker, Span};
use crate::render::style::{
    self, Color, FontStyle, Severity, TextStyle, ACCENT, BADGE_HEIGHT, BADGE_TEXT_SIZE,
    BADGE_WIDTH, BLACK, BODY_TEXT, CELL_PADDING, FOOTER_GRAY, GRID, MIN_COLUMN_WIDTH, ROW_ALT,
    SECONDARY, TABLE_TEXT, WHITE,
};
use lopdf::content::Operation;
use lopdf::{Object, StringFormat};

pub(crate) const MARGIN_LEFT: f32 = 50.0;
pub(crate) const MARGIN_RIGHT: f32 = 50.0;
pub(crate) const MARGIN_TOP: f32 = 70.0;
pub(crate) const MARGIN_BOTTOM: f32 = 60.0;

const INCH: f32 = 72.0;
const HEADER_RULE_FROM_TOP: f32 = 42.0;
const FOOTER_BASELINE: f32 = 40.0;
const FOOTER_SIZE: f32 = 9.0;
const TITLE_SIZE: f32 = 32.0;
const TITLE_LEADING: f32 = 38.0;
const BRAND_SIZE: f32 = 24.0;
const META_SIZE: f32 = 11.0;

// ── Operation helpers ────────────────────────────────────────────────────

/// Numbers are rounded to 1/1000 so identical input gives identical streams.
fn real(v: f32) -> Object {
    Object::Real((v * 1000.0).round() / 1000.0)
}

fn op(operator: &str, operands: Vec<Object>) -> Operation {
    Operation::new(operator, operands)
}

fn rgb(c: Color) -> Vec<Object> {
    vec![real(c.r), real(c.g), real(c.b)]
}

fn fill_rect(ops: &mut Vec<Operation>, x: f32, y: f32, w: f32, h: f32, color: Color) {
    ops.push(op("q", vec![]));
    ops.push(op("rg", rgb(color)));
    ops.push(op("re", vec![real(x), real(y), real(w), real(h)]));
    ops.push(op("f", vec![]));
    ops.push(op("Q", vec![]));
}

fn stroke_rect(ops: &mut Vec<Operation>, x: f32, y: f32, w: f32, h: f32, color: Color, width: f32) {
    ops.push(op("q", vec![]));
    ops.push(op("RG", rgb(color)));
    ops.push(op("w", vec![real(width)]));
    ops.push(op("re", vec![real(x), real(y), real(w), real(h)]));
    ops.push(op("S", vec![]));
    ops.push(op("Q", vec![]));
}

fn stroke_line(
    ops: &mut Vec<Operation>,
    (x1, y1): (f32, f32),
    (x2, y2): (f32, f32),
    color: Color,
    width: f32,
) {
    ops.push(op("q", vec![]));
    ops.push(op("RG", rgb(color)));
    ops.push(op("w", vec![real(width)]));
    ops.push(op("m", vec![real(x1), real(y1)]));
    ops.push(op("l", vec![real(x2), real(y2)]));
    ops.push(op("S", vec![]));
    ops.push(op("Q", vec![]));
}

/// A stretch of one line set in one face and colour.
#[derive(Debug, Clone)]
struct Run {
    text: String,
    font: FontStyle,
    color: Color,
}

impl Run {
    fn new(text: impl Into<String>, font: FontStyle, color: Color) -> Self {
        Self {
            text: text.into(),
            font,
            color,
        }
    }
}

fn draw_text(
    ops: &mut Vec<Operation>,
    x: f32,
    baseline: f32,
    size: f32,
    runs: &[Run],
    word_spacing: f32,
) {
    ops.push(op("BT", vec![]));
    ops.push(op("Tw", vec![real(word_spacing)]));
    ops.push(op("Td", vec![real(x), real(baseline)]));
    let mut font = None;
    let mut color = None;
    for run in runs {
        if font != Some(run.font) {
            ops.push(op(
                "Tf",
                vec![Object::Name(run.font.resource().as_bytes().to_vec()), real(size)],
            ));
            font = Some(run.font);
        }
        if color != Some(run.color) {
            ops.push(op("rg", rgb(run.color)));
            color = Some(run.color);
        }
        ops.push(op(
            "Tj",
            vec![Object::String(fonts::encode(&run.text), StringFormat::Literal)],
        ));
    }
    ops.push(op("ET", vec![]));
}

// ── Line breaking ────────────────────────────────────────────────────────

/// A whitespace-free token; may mix faces (`**bold**,` is one word).
#[derive(Debug, Clone)]
struct Word {
    pieces: Vec<(FontStyle, String)>,
    width: f32,
}

fn space_width(size: f32) -> f32 {
    fonts::text_width(" ", FontStyle::Regular, size)
}

/// Plain runs take the block's base face; emphasis overrides it.
fn effective_font(style: FontStyle, base: FontStyle) -> FontStyle {
    if style == FontStyle::Regular {
        base
    } else {
        style
    }
}

fn split_words(spans: &[Span], base: FontStyle, size: f32) -> Vec<Word> {
    fn finish(pieces: Vec<(FontStyle, String)>, size: f32) -> Word {
        let width = pieces
            .iter()
            .map(|(font, text)| fonts::text_width(text, *font, size))
            .sum();
        Word { pieces, width }
    }

    let mut words = Vec::new();
    let mut current: Vec<(FontStyle, String)> = Vec::new();
    for span in spans {
        let font = effective_font(span.style, base);
        for ch in span.text.chars() {
            if ch.is_whitespace() {
                if !current.is_empty() {
                    words.push(finish(std::mem::take(&mut current), size));
                }
                continue;
            }
            match current.last_mut() {
                Some((f, text)) if *f == font => text.push(ch),
                _ => current.push((font, ch.to_string())),
            }
        }
    }
    if !current.is_empty() {
        words.push(finish(current, size));
    }
    words
}

/// Greedy fill. A word wider than `max_width` gets a line of its own.
fn break_lines(words: Vec<Word>, max_width: f32, size: f32) -> Vec<Vec<Word>> {
    let space = space_width(size);
    let mut lines = Vec::new();
    let mut line: Vec<Word> = Vec::new();
    let mut width = 0.0;

    for word in words {
        let needed = if line.is_empty() {
            word.width
        } else {
            width + space + word.width
        };
        if !line.is_empty() && needed > max_width {
            lines.push(std::mem::take(&mut line));
            width = word.width;
        } else {
            width = needed;
        }
        line.push(word);
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

/// Runs for one line plus its natural (unjustified) width.
fn line_runs(line: &[Word], color: Color, size: f32) -> (Vec<Run>, f32) {
    let mut runs: Vec<Run> = Vec::new();
    for (i, word) in line.iter().enumerate() {
        if i > 0 {
            if let Some(last) = runs.last_mut() {
                last.text.push(' ');
            }
        }
        for (font, text) in &word.pieces {
            match runs.last_mut() {
                Some(run) if run.font == *font => run.text.push_str(text),
                _ => runs.push(Run::new(text.clone(), *font, color)),
            }
        }
    }
    let gaps = line.len().saturating_sub(1) as f32;
    let natural = line.iter().map(|w| w.width).sum::<f32>() + gaps * space_width(size);
    (runs, natural)
}

// ── Tables ───────────────────────────────────────────────────────────────

enum CellContent {
    Lines(Vec<Vec<Word>>),
    Badge(Severity),
}

struct RowLayout {
    cells: Vec<CellContent>,
    height: f32,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum RowKind {
    Header,
    Plain,
    Alternate,
}

fn layout_row(cells: &[Cell], widths: &[f32], header: bool) -> RowLayout {
    let size = TABLE_TEXT.size;
    let base = if header {
        FontStyle::Bold
    } else {
        FontStyle::Regular
    };
    let mut height = TABLE_TEXT.leading + 2.0 * CELL_PADDING;
    let mut out = Vec::with_capacity(widths.len());

    for (c, width) in widths.iter().enumerate() {
        let spans: &[Span] = cells.get(c).map(Vec::as_slice).unwrap_or(&[]);
        let badge = if header {
            None
        } else {
            Severity::from_table_cell(&plain_text(spans))
        };
        let content = match badge {
            Some(level) => {
                height = height.max(BADGE_HEIGHT + 2.0 * CELL_PADDING);
                CellContent::Badge(level)
            }
            None => {
                let lines = break_lines(
                    split_words(spans, base, size),
                    width - 2.0 * CELL_PADDING,
                    size,
                );
                height = height.max(lines.len() as f32 * TABLE_TEXT.leading + 2.0 * CELL_PADDING);
                CellContent::Lines(lines)
            }
        };
        out.push(content);
    }

    RowLayout { cells: out, height }
}

/// Scale natural column widths to `avail`, shrinking only the part above
/// each column's minimum when the table is too wide.
fn fit_widths(natural: &[f32], minimum: &[f32], avail: f32) -> Vec<f32> {
    let nat_sum: f32 = natural.iter().sum();
    if nat_sum <= avail {
        return natural.iter().map(|w| w * avail / nat_sum).collect();
    }
    let min_sum: f32 = minimum.iter().sum();
    if min_sum >= avail {
        return minimum.iter().map(|w| w * avail / min_sum).collect();
    }
    let k = (avail - min_sum) / (nat_sum - min_sum);
    natural
        .iter()
        .zip(minimum)
        .map(|(n, m)| m + (n - m).max(0.0) * k)
        .collect()
}

// ── Composer ─────────────────────────────────────────────────────────────

/// Places blocks onto pages.
pub(crate) struct Composer<'a> {
    config: &'a RenderConfig,
    width: f32,
    height: f32,
    pages: Vec<Vec<Operation>>,
    ops: Vec<Operation>,
    y: f32,
}

impl<'a> Composer<'a> {
    pub(crate) fn new(config: &'a RenderConfig) -> Self {
        let (width, height) = config.page_size.dimensions();
        Self {
            config,
            width,
            height,
            pages: Vec::new(),
            ops: Vec::new(),
            y: height - MARGIN_TOP,
        }
    }

    fn top(&self) -> f32 {
        self.height - MARGIN_TOP
    }

    fn content_width(&self) -> f32 {
        self.width - MARGIN_LEFT - MARGIN_RIGHT
    }

    fn at_page_top(&self) -> bool {
        self.y >= self.top()
    }

    fn new_page(&mut self) {
        self.pages.push(std::mem::take(&mut self.ops));
        self.y = self.top();
    }

    /// Break the page unless `height` still fits (or we are already at the top).
    fn ensure_space(&mut self, height: f32) {
        if self.y - height < MARGIN_BOTTOM && !self.at_page_top() {
            self.new_page();
        }
    }

    /// Vertical gap, swallowed at the top of a page.
    fn gap(&mut self, amount: f32) {
        if !self.at_page_top() {
            self.y -= amount;
        }
    }

    /// Cover page: logo placeholder, title, decorative rule. Ends the page.
    pub(crate) fn cover(&mut self, title: &str) {
        let cx = self.width / 2.0;
        let mut y = self.top() - 1.2 * INCH;

        let logo_w = 3.5 * INCH;
        let logo_h = 1.5 * INCH;
        y -= logo_h;
        stroke_rect(&mut self.ops, cx - logo_w / 2.0, y, logo_w, logo_h, ACCENT, 2.0);
        let mark = self.config.brand_mark.as_str();
        if !mark.trim().is_empty() {
            let mark_w = fonts::text_width(mark, FontStyle::Bold, BRAND_SIZE);
            draw_text(
                &mut self.ops,
                cx - mark_w / 2.0,
                y + logo_h / 2.0 - BRAND_SIZE * 0.35,
                BRAND_SIZE,
                &[Run::new(mark, FontStyle::Bold, ACCENT)],
                0.0,
            );
        }

        y -= 0.4 * INCH;
        let title_words = split_words(
            &[Span::new(title, FontStyle::Bold)],
            FontStyle::Bold,
            TITLE_SIZE,
        );
        for line in break_lines(title_words, self.content_width(), TITLE_SIZE) {
            let (runs, natural) = line_runs(&line, ACCENT, TITLE_SIZE);
            y -= TITLE_SIZE;
            draw_text(&mut self.ops, cx - natural / 2.0, y, TITLE_SIZE, &runs, 0.0);
            y -= TITLE_LEADING - TITLE_SIZE;
        }

        y -= 0.3 * INCH;
        let half_rule = 2.5 * INCH;
        stroke_line(
            &mut self.ops,
            (cx - half_rule, y),
            (cx + half_rule, y),
            SECONDARY,
            2.0,
        );

        self.new_page();
    }

    /// "Report Generated: <timestamp>" followed by a spacer.
    pub(crate) fn metadata_line(&mut self, created_at: &str) {
        self.ensure_space(META_SIZE * 1.4);
        let runs = [
            Run::new("Report Generated: ", FontStyle::Bold, BODY_TEXT),
            Run::new(created_at, FontStyle::Regular, BODY_TEXT),
        ];
        draw_text(&mut self.ops, MARGIN_LEFT, self.y - META_SIZE, META_SIZE, &runs, 0.0);
        self.y -= META_SIZE * 1.4 + 0.3 * INCH;
    }

    pub(crate) fn block(&mut self, block: &Block) {
        match block {
            Block::Heading { level, spans } => self.heading(*level, spans),
            Block::Paragraph(spans) => self.paragraph(spans),
            Block::List(entries) => self.list(entries),
            Block::Table { header, rows } => self.table(header, rows),
        }
    }

    fn heading(&mut self, level: u8, spans: &[Span]) {
        let style = match level {
            1 => &style::SECTION_HEADER,
            2 => &style::SUBSECTION_HEADER,
            _ => &style::RECOMMENDATION_HEADER,
        };
        let lines = break_lines(
            split_words(spans, style.font, style.size),
            self.content_width(),
            style.size,
        );
        self.gap(style.space_before);
        // Keep the heading with at least two lines of what follows.
        self.ensure_space(lines.len() as f32 * style.leading + 2.0 * style::BODY.leading);
        self.draw_lines(&lines, MARGIN_LEFT, self.content_width(), style);
        self.y -= style.space_after;
    }

    fn paragraph(&mut self, spans: &[Span]) {
        let style = &style::BODY;
        let words = split_words(spans, style.font, style.size);
        if words.is_empty() {
            return;
        }
        let lines = break_lines(words, self.content_width(), style.size);
        self.gap(style.space_before);
        self.draw_lines(&lines, MARGIN_LEFT, self.content_width(), style);
        self.y -= style.space_after;
    }

    fn draw_lines(&mut self, lines: &[Vec<Word>], x: f32, max_width: f32, style: &TextStyle) {
        let last = lines.len().saturating_sub(1);
        for (i, line) in lines.iter().enumerate() {
            self.ensure_space(style.leading);
            let (runs, natural) = line_runs(line, style.color, style.size);
            let word_spacing = if style.justify && i < last && line.len() > 1 {
                ((max_width - natural) / (line.len() - 1) as f32).max(0.0)
            } else {
                0.0
            };
            draw_text(
                &mut self.ops,
                x,
                self.y - style.size,
                style.size,
                &runs,
                word_spacing,
            );
            self.y -= style.leading;
        }
    }

    fn list(&mut self, entries: &[ListEntry]) {
        let style = &style::LIST_ITEM;
        for entry in entries {
            let text_x = MARGIN_LEFT + style::LIST_INDENT + entry.depth as f32 * style::NESTED_INDENT;
            let width = self.width - MARGIN_RIGHT - text_x;
            let lines = break_lines(
                split_words(&entry.spans, style.font, style.size),
                width,
                style.size,
            );
            if lines.is_empty() {
                continue;
            }
            self.ensure_space(style.leading);
            self.marker(entry.marker, text_x, self.y - style.size);
            self.draw_lines(&lines, text_x, width, style);
            self.y -= style.space_after;
        }
        self.y -= style::BODY.space_after - style.space_after;
    }

    fn marker(&mut self, marker: Marker, text_x: f32, baseline: f32) {
        match marker {
            Marker::Bullet => draw_text(
                &mut self.ops,
                text_x - 12.0,
                baseline,
                style::BULLET_SIZE,
                &[Run::new("\u{2022}", FontStyle::Regular, SECONDARY)],
                0.0,
            ),
            Marker::Number(n) => {
                let label = format!("{n}.");
                let size = style::LIST_ITEM.size;
                let w = fonts::text_width(&label, FontStyle::Bold, size);
                draw_text(
                    &mut self.ops,
                    text_x - 5.0 - w,
                    baseline,
                    size,
                    &[Run::new(label, FontStyle::Bold, SECONDARY)],
                    0.0,
                );
            }
        }
    }

    fn column_widths(&self, header: &[Cell], rows: &[Vec<Cell>], ncols: usize) -> Vec<f32> {
        let avail = self.content_width();
        let pad2 = 2.0 * CELL_PADDING;
        let size = TABLE_TEXT.size;
        let space = space_width(size);
        let word_cap = avail / ncols as f32;
        let mut natural = vec![MIN_COLUMN_WIDTH; ncols];
        let mut minimum = vec![MIN_COLUMN_WIDTH; ncols];

        let mut measure = |cells: &[Cell], base: FontStyle, badges: bool| {
            for (c, spans) in cells.iter().enumerate().take(ncols) {
                if badges && Severity::from_table_cell(&plain_text(spans)).is_some() {
                    natural[c] = natural[c].max(BADGE_WIDTH + pad2);
                    minimum[c] = minimum[c].max(BADGE_WIDTH + pad2);
                    continue;
                }
                let words = split_words(spans, base, size);
                let gaps = words.len().saturating_sub(1) as f32;
                let full = words.iter().map(|w| w.width).sum::<f32>() + gaps * space;
                let longest = words.iter().map(|w| w.width).fold(0.0_f32, f32::max);
                natural[c] = natural[c].max(full + pad2);
                minimum[c] = minimum[c].max((longest + pad2).min(word_cap));
            }
        };
        measure(header, FontStyle::Bold, false);
        for row in rows {
            measure(row, FontStyle::Regular, true);
        }

        fit_widths(&natural, &minimum, avail)
    }

    /// Bordered grid; the header row repeats on every page the table spans.
    fn table(&mut self, header: &[Cell], rows: &[Vec<Cell>]) {
        let ncols = rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(header.len()))
            .max()
            .unwrap_or(0);
        if ncols == 0 {
            return;
        }

        let widths = self.column_widths(header, rows, ncols);
        let header_row = (!header.is_empty()).then(|| layout_row(header, &widths, true));
        let body: Vec<RowLayout> = rows.iter().map(|r| layout_row(r, &widths, false)).collect();

        self.gap(TABLE_TEXT.space_before);
        let header_h = header_row.as_ref().map_or(0.0, |r| r.height);
        let first_h = body.first().map_or(0.0, |r| r.height);
        self.ensure_space(header_h + first_h);

        let mut segment_top = self.y;
        let mut rows_on_segment = 0usize;
        if let Some(h) = &header_row {
            self.draw_row(h, &widths, RowKind::Header);
        }
        for (i, row) in body.iter().enumerate() {
            if self.y - row.height < MARGIN_BOTTOM && rows_on_segment > 0 {
                self.close_segment(segment_top);
                self.new_page();
                segment_top = self.y;
                rows_on_segment = 0;
                if let Some(h) = &header_row {
                    self.draw_row(h, &widths, RowKind::Header);
                }
            }
            let kind = if i % 2 == 1 {
                RowKind::Alternate
            } else {
                RowKind::Plain
            };
            self.draw_row(row, &widths, kind);
            rows_on_segment += 1;
        }
        self.close_segment(segment_top);
        self.y -= TABLE_TEXT.space_after;
    }

    fn close_segment(&mut self, segment_top: f32) {
        if segment_top > self.y {
            let width = self.content_width();
            stroke_rect(
                &mut self.ops,
                MARGIN_LEFT,
                self.y,
                width,
                segment_top - self.y,
                ACCENT,
                2.0,
            );
        }
    }

    fn draw_row(&mut self, row: &RowLayout, widths: &[f32], kind: RowKind) {
        let top = self.y;
        let bottom = top - row.height;
        let total: f32 = widths.iter().sum();
        match kind {
            RowKind::Header => fill_rect(&mut self.ops, MARGIN_LEFT, bottom, total, row.height, ACCENT),
            RowKind::Alternate => {
                fill_rect(&mut self.ops, MARGIN_LEFT, bottom, total, row.height, ROW_ALT)
            }
            RowKind::Plain => {}
        }
        let text_color = if kind == RowKind::Header {
            WHITE
        } else {
            BODY_TEXT
        };

        let size = TABLE_TEXT.size;
        let mut x = MARGIN_LEFT;
        for (cell, width) in row.cells.iter().zip(widths) {
            match cell {
                CellContent::Lines(lines) => {
                    for (k, line) in lines.iter().enumerate() {
                        let (runs, _) = line_runs(line, text_color, size);
                        let baseline = top - CELL_PADDING - size + 1.0 - k as f32 * TABLE_TEXT.leading;
                        draw_text(&mut self.ops, x + CELL_PADDING, baseline, size, &runs, 0.0);
                    }
                }
                CellContent::Badge(level) => {
                    badge(
                        &mut self.ops,
                        *level,
                        x + CELL_PADDING,
                        top - CELL_PADDING - BADGE_HEIGHT,
                    );
                }
            }
            if kind != RowKind::Header {
                stroke_rect(&mut self.ops, x, bottom, *width, row.height, GRID, 1.0);
            }
            x += width;
        }
        self.y = bottom;
    }

    /// Flush the last page and add header rule and footer to every page
    /// after the cover.
    pub(crate) fn finish(mut self) -> Vec<Vec<Operation>> {
        if !self.ops.is_empty() || self.pages.len() < 2 {
            self.pages.push(std::mem::take(&mut self.ops));
        }
        let (width, height) = (self.width, self.height);
        let notice = self.config.footer_notice.as_str();
        for (i, ops) in self.pages.iter_mut().enumerate().skip(1) {
            decorate(ops, i + 1, width, height, notice);
        }
        self.pages
    }
}

fn badge(ops: &mut Vec<Operation>, level: Severity, x: f32, y: f32) {
    fill_rect(ops, x, y, BADGE_WIDTH, BADGE_HEIGHT, level.color());
    stroke_rect(ops, x, y, BADGE_WIDTH, BADGE_HEIGHT, BLACK, 0.5);
    let label = level.label();
    let w = fonts::text_width(label, FontStyle::Bold, BADGE_TEXT_SIZE);
    draw_text(
        ops,
        x + (BADGE_WIDTH - w) / 2.0,
        y + (BADGE_HEIGHT - BADGE_TEXT_SIZE) / 2.0 + 1.5,
        BADGE_TEXT_SIZE,
        &[Run::new(label, FontStyle::Bold, WHITE)],
        0.0,
    );
}

fn decorate(ops: &mut Vec<Operation>, page_number: usize, width: f32, height: f32, notice: &str) {
    let rule_y = height - HEADER_RULE_FROM_TOP;
    stroke_line(
        ops,
        (MARGIN_LEFT, rule_y),
        (width - MARGIN_RIGHT, rule_y),
        ACCENT,
        1.0,
    );
    draw_text(
        ops,
        MARGIN_LEFT,
        FOOTER_BASELINE,
        FOOTER_SIZE,
        &[Run::new(notice, FontStyle::Italic, FOOTER_GRAY)],
        0.0,
    );
    let label = format!("Page {page_number}");
    let label_w = fonts::text_width(&label, FontStyle::Italic, FOOTER_SIZE);
    draw_text(
        ops,
        width - MARGIN_RIGHT - label_w,
        FOOTER_BASELINE,
        FOOTER_SIZE,
        &[Run::new(label, FontStyle::Italic, FOOTER_GRAY)],
        0.0,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(text: &str, size: f32) -> Vec<Word> {
        split_words(&[Span::new(text, FontStyle::Regular)], FontStyle::Regular, size)
    }

    #[test]
    fn split_keeps_mixed_faces_in_one_word() {
        let spans = vec![
            Span::new("Patch ", FontStyle::Regular),
            Span::new("now", FontStyle::Bold),
            Span::new(", please", FontStyle::Regular),
        ];
        let ws = split_words(&spans, FontStyle::Regular, 11.0);
        assert_eq!(ws.len(), 3);
        assert_eq!(ws[1].pieces.len(), 2);
        assert_eq!(ws[1].pieces[0], (FontStyle::Bold, "now".to_string()));
        assert_eq!(ws[1].pieces[1], (FontStyle::Regular, ",".to_string()));
    }

    #[test]
    fn base_font_applies_to_plain_runs() {
        let ws = split_words(&[Span::new("Title", FontStyle::Regular)], FontStyle::Bold, 14.0);
        assert_eq!(ws[0].pieces[0].0, FontStyle::Bold);
    }

    #[test]
    fn lines_never_exceed_width_unless_single_word() {
        let text = "Attackers exploited a path traversal flaw to read configuration files and \
                    then escalated privileges on the web tier before moving laterally";
        let lines = break_lines(words(text, 11.0), 200.0, 11.0);
        assert!(lines.len() > 1);
        for line in &lines {
            let (_, natural) = line_runs(line, BODY_TEXT, 11.0);
            assert!(natural <= 200.0 || line.len() == 1, "line too wide: {natural}");
        }
        let total: usize = lines.iter().map(Vec::len).sum();
        assert_eq!(total, text.split_whitespace().count());
    }

    #[test]
    fn runs_merge_same_face_and_carry_spaces() {
        let line = words("one two three", 11.0);
        let (runs, _) = line_runs(&line, BODY_TEXT, 11.0);
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].text, "one two three");
    }

    #[test]
    fn fit_widths_fills_available_space() {
        let w = fit_widths(&[100.0, 50.0], &[40.0, 40.0], 300.0);
        assert!((w.iter().sum::<f32>() - 300.0).abs() < 0.01);
        assert!((w[0] - 200.0).abs() < 0.01);
    }

    #[test]
    fn fit_widths_shrinks_flexible_columns_first() {
        let w = fit_widths(&[92.0, 900.0], &[92.0, 60.0], 512.0);
        assert!((w[0] - 92.0).abs() < 0.01, "badge column kept: {w:?}");
        assert!((w.iter().sum::<f32>() - 512.0).abs() < 0.01);
    }

    #[test]
    fn justified_paragraph_sets_word_spacing_except_last_line() {
        let config = RenderConfig::default();
        let mut composer = Composer::new(&config);
        let text = "word ".repeat(120);
        composer.paragraph(&[Span::new(text, FontStyle::Regular)]);
        let tws: Vec<f32> = composer
            .ops
            .iter()
            .filter(|o| o.operator == "Tw")
            .map(|o| match &o.operands[0] {
                Object::Real(v) => *v as f32,
                Object::Integer(i) => *i as f32,
                other => panic!("unexpected operand {other:?}"),
            })
            .collect();
        assert!(tws.len() > 1);
        assert_eq!(*tws.last().unwrap(), 0.0);
        assert!(tws[0] > 0.0);
    }

    #[test]
    fn long_table_breaks_pages_and_repeats_header() {
        let config = RenderConfig::default();
        let mut composer = Composer::new(&config);
        let header = vec![vec![Span::new("Finding", FontStyle::Regular)]];
        let rows: Vec<Vec<Cell>> = (0..80)
            .map(|i| vec![vec![Span::new(format!("row {i}"), FontStyle::Regular)]])
            .collect();
        composer.table(&header, &rows);
        let pages = composer.finish();
        assert!(pages.len() >= 2);

        let header_draws = pages
            .iter()
            .flatten()
            .filter(|o| {
                o.operator == "Tj"
                    && matches!(&o.operands[0], Object::String(b, _) if b.as_slice() == b"Finding")
            })
            .count();
        assert_eq!(header_draws, pages.len());
    }
}
