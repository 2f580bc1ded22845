//! Palette, paragraph styles and severity badges.

use serde::Serialize;

/// An RGB colour with components in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
        }
    }
}

pub const ACCENT: Color = Color::rgb(0x2c, 0x3e, 0x50);
pub const SECONDARY: Color = Color::rgb(0xe7, 0x4c, 0x3c);
pub const BODY_TEXT: Color = Color::rgb(0x33, 0x33, 0x33);
pub const FOOTER_GRAY: Color = Color::rgb(0x66, 0x66, 0x66);
pub const ROW_ALT: Color = Color::rgb(0xf8, 0xf9, 0xfa);
pub const GRID: Color = Color::rgb(0xec, 0xf0, 0xf1);
pub const WHITE: Color = Color::rgb(0xff, 0xff, 0xff);
pub const BLACK: Color = Color::rgb(0, 0, 0);

/// Typeface variant, one per embedded base-14 font.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontStyle {
    Regular,
    Bold,
    Italic,
}

impl FontStyle {
    /// Resource name used in content streams.
    pub fn resource(self) -> &'static str {
        match self {
            FontStyle::Regular => "F1",
            FontStyle::Bold => "F2",
            FontStyle::Italic => "F3",
        }
    }

    pub fn base_font(self) -> &'static str {
        match self {
            FontStyle::Regular => "Helvetica",
            FontStyle::Bold => "Helvetica-Bold",
            FontStyle::Italic => "Helvetica-Oblique",
        }
    }

    pub const ALL: [FontStyle; 3] = [FontStyle::Regular, FontStyle::Bold, FontStyle::Italic];
}

/// How a block of text is set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub size: f32,
    pub leading: f32,
    pub color: Color,
    pub space_before: f32,
    pub space_after: f32,
    /// Weight used for plain runs; emphasis inside the text still applies.
    pub font: FontStyle,
    pub justify: bool,
}

/// `#` headings.
pub const SECTION_HEADER: TextStyle = TextStyle {
    size: 18.0,
    leading: 22.0,
    color: SECONDARY,
    space_before: 14.0,
    space_after: 6.0,
    font: FontStyle::Bold,
    justify: false,
};

/// `##` headings.
pub const SUBSECTION_HEADER: TextStyle = TextStyle {
    size: 14.0,
    leading: 18.0,
    color: ACCENT,
    space_before: 10.0,
    space_after: 4.0,
    font: FontStyle::Bold,
    justify: false,
};

/// `###` headings, used by the report template for individual recommendations.
pub const RECOMMENDATION_HEADER: TextStyle = TextStyle {
    size: 13.0,
    leading: 16.0,
    color: ACCENT,
    space_before: 8.0,
    space_after: 4.0,
    font: FontStyle::Bold,
    justify: false,
};

pub const BODY: TextStyle = TextStyle {
    size: 11.0,
    leading: 15.0,
    color: BODY_TEXT,
    space_before: 0.0,
    space_after: 8.0,
    font: FontStyle::Regular,
    justify: true,
};

pub const LIST_ITEM: TextStyle = TextStyle {
    size: 11.0,
    leading: 15.0,
    color: BODY_TEXT,
    space_before: 0.0,
    space_after: 3.0,
    font: FontStyle::Regular,
    justify: false,
};

pub const BULLET_SIZE: f32 = 12.0;
pub const LIST_INDENT: f32 = 25.0;
pub const NESTED_INDENT: f32 = 20.0;

pub const TABLE_TEXT: TextStyle = TextStyle {
    size: 10.0,
    leading: 13.0,
    color: BODY_TEXT,
    space_before: 6.0,
    space_after: 12.0,
    font: FontStyle::Regular,
    justify: false,
};
pub const CELL_PADDING: f32 = 6.0;
pub const MIN_COLUMN_WIDTH: f32 = 40.0;
pub const BADGE_WIDTH: f32 = 80.0;
pub const BADGE_HEIGHT: f32 = 20.0;
pub const BADGE_TEXT_SIZE: f32 = 9.0;

/// Threat level shown as a coloured badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    /// Parse any of the four levels, case-insensitively.
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "critical" => Some(Severity::Critical),
            "high" => Some(Severity::High),
            "medium" => Some(Severity::Medium),
            "low" => Some(Severity::Low),
            _ => None,
        }
    }

    /// The levels a table cell is turned into a badge for.
    ///
    /// Only high, medium and low: a "Critical" cell stays text even though
    /// [`Severity::Critical`] has a colour.
    pub fn from_table_cell(text: &str) -> Option<Self> {
        match Self::parse(text)? {
            Severity::Critical => None,
            level => Some(level),
        }
    }

    pub fn color(self) -> Color {
        match self {
            Severity::Critical => Color::rgb(0xe7, 0x4c, 0x3c),
            Severity::High => Color::rgb(0xe6, 0x7e, 0x22),
            Severity::Medium => Color::rgb(0xf1, 0xc4, 0x0f),
            Severity::Low => Color::rgb(0x2e, 0xcc, 0x71),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Severity::Critical => "CRITICAL",
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
            Severity::Low => "LOW",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive_and_trims() {
        assert_eq!(Severity::parse(" HIGH "), Some(Severity::High));
        assert_eq!(Severity::parse("Critical"), Some(Severity::Critical));
        assert_eq!(Severity::parse("severe"), None);
    }

    #[test]
    fn critical_has_a_colour_but_no_cell_badge() {
        assert_eq!(Severity::from_table_cell("critical"), None);
        assert_eq!(Severity::Critical.color(), SECONDARY);
        assert_eq!(Severity::from_table_cell("Medium"), Some(Severity::Medium));
        assert_eq!(Severity::from_table_cell("low"), Some(Severity::Low));
    }

    #[test]
    fn cell_must_match_exactly() {
        assert_eq!(Severity::from_table_cell("High risk"), None);
        assert_eq!(Severity::from_table_cell(""), None);
    }

    #[test]
    fn palette_values() {
        let high = Severity::High.color();
        assert!((high.r - 0.902).abs() < 0.001);
        assert!((high.g - 0.494).abs() < 0.001);
        assert!((high.b - 0.133).abs() < 0.001);
    }

    #[test]
    fn font_resources_are_distinct() {
        let names: Vec<_> = FontStyle::ALL.iter().map(|f| f.resource()).collect();
        assert_eq!(names, vec!["F1", "F2", "F3"]);
    }
}
