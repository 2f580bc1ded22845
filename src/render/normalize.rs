//! Deterministic cleanup of model-written Markdown before it is parsed.
//!
//! ## Why normalise?
//!
//! Even well-prompted models occasionally emit Markdown that is
//! *semantically* what they meant but *structurally* not what a parser
//! expects:
//!
//! - the whole report wrapped in a ` ```markdown ... ``` ` fence, which a
//!   parser would treat as one code block (and the renderer would drop)
//! - Windows-style `\r\n` line endings
//! - a table that starts directly under a paragraph line, or that lacks its
//!   `| --- |` separator row, so it parses as plain text
//! - separator rows repeated inside the table body
//!
//! The rules here fix those quirks for rendering only. The stored report
//! stays exactly what the model returned.
//!
//! ## Rule Order
//!
//! Fences are stripped before anything else so the remaining rules see the
//! real document. Line endings are normalised before any line-based rule.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply every normalisation rule, in order.
///
/// 1. Strip an outer ```` ```markdown ```` fence
/// 2. CRLF / CR → LF
/// 3. Remove invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 4. Trim trailing whitespace per line
/// 5. Blank line before a table that follows a text line
/// 6. Insert a missing separator row after a table's header row
/// 7. Drop separator rows anywhere but directly under the header
pub fn normalize_markdown(input: &str) -> String {
    let s = strip_markdown_fences(input);
    let s = normalise_line_endings(&s);
    let s = remove_invisible_chars(&s);
    let s = trim_trailing_whitespace(&s);
    let s = separate_tables(&s);
    let s = fix_missing_separators(&s);
    remove_mid_table_separators(&s)
}

// ── Rule 1: Strip outer markdown fences ──────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:markdown|md)?[ \t]*\r?\n(.*)\r?\n```\s*$").unwrap());

fn strip_markdown_fences(input: &str) -> String {
    match RE_OUTER_FENCES.captures(input.trim()) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    }
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Remove invisible Unicode characters ──────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 4: Trim trailing whitespace per line ────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 5: Tables never continue a paragraph ────────────────────────────

fn separate_tables(input: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    let mut prev = "";
    for line in input.lines() {
        if is_table_row(line) && !prev.trim().is_empty() && !is_table_row(prev) {
            out.push("");
        }
        out.push(line);
        prev = line;
    }
    out.join("\n")
}

// ── Rule 6: Insert missing header separator ──────────────────────────────

/// A table whose second row is not a separator gets one, sized to the
/// header's column count. Body rows are never touched.
fn fix_missing_separators(input: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut prev_is_row = false;
    let lines: Vec<&str> = input.lines().collect();

    for (i, line) in lines.iter().enumerate() {
        let is_row = is_table_row(line);
        out.push((*line).to_string());

        let starts_table = is_row && !prev_is_row && !is_separator_row(line);
        if starts_table {
            let next = lines.get(i + 1).copied().unwrap_or("");
            if !is_separator_row(next) {
                out.push(separator_for(line));
            }
        }
        prev_is_row = is_row;
    }

    out.join("\n")
}

fn separator_for(header: &str) -> String {
    let cols = header.trim().matches('|').count().saturating_sub(1).max(1);
    std::iter::once("|")
        .chain(std::iter::repeat(" --- |").take(cols))
        .collect()
}

// ── Rule 7: Remove spurious mid-table separator rows ─────────────────────

fn remove_mid_table_separators(input: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    let mut row_in_table = 0usize;

    for line in input.lines() {
        if is_table_row(line) {
            row_in_table += 1;
            if is_separator_row(line) && row_in_table != 2 {
                continue;
            }
        } else {
            row_in_table = 0;
        }
        out.push(line);
    }

    out.join("\n")
}

fn is_table_row(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.starts_with('|') && trimmed.ends_with('|') && trimmed.len() > 2
}

fn is_separator_row(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.starts_with('|')
        && trimmed.contains('-')
        && trimmed
            .chars()
            .all(|c| matches!(c, '|' | '-' | ':' | ' '))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_outer_fence() {
        assert_eq!(strip_markdown_fences("```markdown\n# Hi\nthere\n```"), "# Hi\nthere");
        assert_eq!(strip_markdown_fences("```\n# Hi\n```\n"), "# Hi");
    }

    #[test]
    fn inner_code_block_is_kept() {
        let input = "# Report\n\n```\ncode\n```\n\nText";
        assert_eq!(strip_markdown_fences(input), input);
    }

    #[test]
    fn line_endings_and_invisibles() {
        assert_eq!(normalise_line_endings("a\r\nb\rc"), "a\nb\nc");
        assert_eq!(remove_invisible_chars("hi\u{200B}gh\u{FEFF}"), "high");
    }

    #[test]
    fn table_under_paragraph_gets_blank_line() {
        let out = separate_tables("Findings below:\n| A | B |\n| --- | --- |");
        assert_eq!(out, "Findings below:\n\n| A | B |\n| --- | --- |");
    }

    #[test]
    fn missing_separator_inserted_once() {
        let out = fix_missing_separators("| A | B |\n| 1 | 2 |\n| 3 | 4 |");
        assert_eq!(out, "| A | B |\n| --- | --- |\n| 1 | 2 |\n| 3 | 4 |");
    }

    #[test]
    fn well_formed_table_unchanged() {
        let input = "| A | B |\n|:---|---:|\n| 1 | 2 |";
        assert_eq!(fix_missing_separators(input), input);
        assert_eq!(remove_mid_table_separators(input), input);
    }

    #[test]
    fn mid_table_separator_removed() {
        let input = "| A | B |\n| --- | --- |\n| 1 | 2 |\n| --- | --- |\n| 3 | 4 |";
        let out = remove_mid_table_separators(input);
        assert_eq!(out, "| A | B |\n| --- | --- |\n| 1 | 2 |\n| 3 | 4 |");
    }

    #[test]
    fn full_pass() {
        let input = "```markdown\r\n## Key Findings\r\nSummary:\r\n| Finding | Threat Level |\r\n| SQLi | High |\r\n```";
        let out = normalize_markdown(input);
        assert_eq!(
            out,
            "## Key Findings\nSummary:\n\n| Finding | Threat Level |\n| --- | --- |\n| SQLi | High |"
        );
    }
}
