use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse vertical position of a line on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    Header,
    Body,
    Footer,
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Zone::Header => write!(f, "header"),
            Zone::Body => write!(f, "body"),
            Zone::Footer => write!(f, "footer"),
        }
    }
}

const MAX_ZONE_LINES: usize = 8;

/// Normalized lines of one document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    lines: Vec<String>,
}

impl Document {
    /// Split OCR text into trimmed, whitespace-collapsed, non-empty lines.
    pub fn from_text(text: &str) -> Self {
        let lines = text
            .lines()
            .map(normalize_line)
            .filter(|l| !l.is_empty())
            .collect();
        Self { lines }
    }

    pub fn from_lines<S: AsRef<str>>(lines: &[S]) -> Self {
        Self {
            lines: lines
                .iter()
                .map(|l| normalize_line(l.as_ref()))
                .filter(|l| !l.is_empty())
                .collect(),
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.lines.iter().enumerate().map(|(i, l)| (i, l.as_str()))
    }

    /// Header is the first quarter (at least one line), footer the last
    /// quarter, each capped at a handful of lines.
    pub fn zone(&self, index: usize) -> Zone {
        let n = self.lines.len();
        let header_end = (n / 4).clamp(1, MAX_ZONE_LINES);
        let footer_len = (n / 4).min(MAX_ZONE_LINES);
        if index < header_end {
            Zone::Header
        } else if index >= n.saturating_sub(footer_len) {
            Zone::Footer
        } else {
            Zone::Body
        }
    }

    /// 0.0 at the top of the page, 1.0 at the bottom.
    pub fn relative_position(&self, index: usize) -> f32 {
        let n = self.lines.len();
        if n <= 1 {
            return 0.0;
        }
        index as f32 / (n - 1) as f32
    }
}

fn normalize_line(line: &str) -> String {
    line.chars()
        .filter(|c| !c.is_control() || *c == '\t')
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_whitespace_and_drops_blank_lines() {
        let doc = Document::from_text("  STORE   NAME \n\n\t\nTotal\t $5.00\r\n\0");
        assert_eq!(doc.lines(), &["STORE NAME".to_string(), "Total $5.00".to_string()]);
    }

    #[test]
    fn zones_cover_the_page() {
        let doc = Document::from_lines(&["a", "b", "c", "d", "e", "f", "g", "h"]);
        assert_eq!(doc.zone(0), Zone::Header);
        assert_eq!(doc.zone(1), Zone::Header);
        assert_eq!(doc.zone(2), Zone::Body);
        assert_eq!(doc.zone(5), Zone::Body);
        assert_eq!(doc.zone(6), Zone::Footer);
        assert_eq!(doc.zone(7), Zone::Footer);
    }

    #[test]
    fn short_documents_still_have_a_header() {
        let doc = Document::from_lines(&["STORE", "Total 5.00"]);
        assert_eq!(doc.zone(0), Zone::Header);
        assert_eq!(doc.zone(1), Zone::Body);
    }

    #[test]
    fn relative_position_spans_zero_to_one() {
        let doc = Document::from_lines(&["a", "b", "c"]);
        assert_eq!(doc.relative_position(0), 0.0);
        assert_eq!(doc.relative_position(2), 1.0);
        assert_eq!(Document::default().relative_position(0), 0.0);
    }
}
