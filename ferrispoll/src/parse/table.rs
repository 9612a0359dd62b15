//! Column-aligned table parsing.
//!
//! Device listings are whitespace-aligned, not delimited. A [`TableLayout`]
//! names the columns by position and says which column must hold a dotted
//! quad for a line to count as a row. Anything else (headers, separators,
//! footers, wrapped lines) is skipped.

use std::sync::LazyLock;

use regex::Regex;

use super::record::TableRow;
use super::value::FieldValue;

static DOTTED_QUAD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}$").expect("valid regex"));

/// Fixed column layout of one listing.
#[derive(Debug, Clone, Copy)]
pub struct TableLayout {
    /// Text that identifies the header line.
    pub header_marker: &'static str,

    /// Column that must hold an IPv4 address.
    pub key_column: usize,

    /// Rows with fewer tokens are skipped.
    pub min_columns: usize,

    /// Column names, by position.
    pub columns: &'static [&'static str],
}

impl TableLayout {
    /// Parse every qualifying row of `text`.
    ///
    /// Rows start after the first `---` separator following the header. If
    /// no header is found the whole text is scanned; the key-column check
    /// still keeps non-rows out.
    pub fn parse(&self, text: &str) -> Vec<TableRow> {
        let lines: Vec<&str> = text.lines().collect();
        let start = self.body_start(&lines);

        lines[start..]
            .iter()
            .filter_map(|line| self.row(line))
            .collect()
    }

    fn body_start(&self, lines: &[&str]) -> usize {
        let Some(header) = lines.iter().position(|l| l.contains(self.header_marker)) else {
            return 0;
        };
        lines[header + 1..]
            .iter()
            .position(|l| l.trim_start().starts_with("---"))
            .map(|offset| header + offset + 2)
            .unwrap_or(header + 1)
    }

    fn row(&self, line: &str) -> Option<TableRow> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() < self.min_columns {
            return None;
        }
        if !tokens
            .get(self.key_column)
            .is_some_and(|key| DOTTED_QUAD.is_match(key))
        {
            return None;
        }

        Some(
            self.columns
                .iter()
                .enumerate()
                .map(|(i, name)| {
                    let value = tokens
                        .get(i)
                        .map(|t| FieldValue::Text(t.to_string()))
                        .unwrap_or(FieldValue::Absent);
                    (name.to_string(), value)
                })
                .collect(),
        )
    }
}
