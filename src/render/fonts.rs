//! Base-14 Helvetica metrics and WinAnsi text encoding.
//!
//! The renderer only uses the three Helvetica faces every PDF viewer ships
//! with, so no font files are embedded. Line breaking and justification need
//! glyph advances; the tables below are the printable-ASCII widths from the
//! Adobe AFM files, in 1/1000 em. Helvetica-Oblique shares Helvetica's
//! widths.

use crate::render::style::FontStyle;

/// Advance widths for codes 32..=126, Helvetica.
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // 32-47
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 48-63
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // 64-79
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 80-95
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // 96-111
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 112-126
];

/// Advance widths for codes 32..=126, Helvetica-Bold.
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // 32-47
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, // 48-63
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, // 64-79
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556, // 80-95
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, // 96-111
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584, // 112-126
];

/// WinAnsi code of the bullet glyph.
pub const BULLET: u8 = 0x95;

/// Encode `text` as WinAnsi bytes. Characters outside the encoding become `?`.
pub fn encode(text: &str) -> Vec<u8> {
    text.chars().map(encode_char).collect()
}

fn encode_char(c: char) -> u8 {
    match c {
        ' '..='~' => c as u8,
        '\t' | '\n' | '\u{00A0}' => b' ',
        '\u{00A1}'..='\u{00FF}' => c as u32 as u8,
        '\u{20AC}' => 0x80,
        '\u{2026}' => 0x85,
        '\u{2018}' => 0x91,
        '\u{2019}' => 0x92,
        '\u{201C}' => 0x93,
        '\u{201D}' => 0x94,
        '\u{2022}' => BULLET,
        '\u{2013}' => 0x96,
        '\u{2014}' => 0x97,
        '\u{2122}' => 0x99,
        _ => b'?',
    }
}

/// Advance of one encoded byte, in 1/1000 em.
fn glyph_width(byte: u8, style: FontStyle) -> u16 {
    let table = match style {
        FontStyle::Bold => &HELVETICA_BOLD,
        FontStyle::Regular | FontStyle::Italic => &HELVETICA,
    };
    let bold = style == FontStyle::Bold;
    match byte {
        32..=126 => table[(byte - 32) as usize],
        0x85 | 0x97 => 1000,
        0x91 | 0x92 => {
            if bold {
                278
            } else {
                222
            }
        }
        0x93 | 0x94 => {
            if bold {
                500
            } else {
                333
            }
        }
        BULLET => 350,
        0x96 => 556,
        0x99 => 1000,
        _ => 556,
    }
}

/// Width of `text` in points when set in `style` at `size`.
pub fn text_width(text: &str, style: FontStyle, size: f32) -> f32 {
    encoded_width(&encode(text), style, size)
}

/// Width of already-encoded bytes in points.
pub fn encoded_width(bytes: &[u8], style: FontStyle, size: f32) -> f32 {
    let units: u32 = bytes.iter().map(|&b| glyph_width(b, style) as u32).sum();
    units as f32 * size / 1000.0
}
