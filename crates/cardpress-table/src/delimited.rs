//! Delimited-text backend.
//!
//! Card data files are semicolon-separated so that commas can appear freely
//! in card text. Quoting follows the usual CSV rules (a field starting with
//! `"` may contain delimiters and doubled quotes). Rows whose first field
//! begins with `//` are comments. Blank lines and rows of empty fields
//! (`;;;`) are ignored, as the spreadsheet backends ignore blank rows.

use std::path::Path;

use crate::error::Result;
use crate::sheet::Sheet;

/// Field delimiter for card data files.
pub const DELIMITER: u8 = b';';

/// Rows starting with this marker are skipped.
pub const COMMENT_PREFIX: &str = "//";

/// A delimited-text document. Always exactly one sheet, named after the file stem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvDocument {
    sheet: Sheet,
}

impl CsvDocument {
    /// Reads and parses a delimited-text file.
    pub fn open(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::parse(name, &text)
    }

    /// Parses delimited text held in memory.
    pub fn parse(name: impl Into<String>, text: &str) -> Result<Self> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(DELIMITER)
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes());

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            if is_skipped(&record) {
                continue;
            }
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self {
            sheet: Sheet::new(name, rows),
        })
    }

    /// The single sheet of this document.
    pub fn sheet(&self) -> &Sheet {
        &self.sheet
    }

    pub(crate) fn sheets(&self) -> &[Sheet] {
        std::slice::from_ref(&self.sheet)
    }
}

fn is_skipped(record: &csv::StringRecord) -> bool {
    match record.get(0) {
        None => true,
        Some(first) if first.starts_with(COMMENT_PREFIX) => true,
        Some(_) => record.iter().all(str::is_empty),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_semicolon_rows() {
        let doc = CsvDocument::parse("actions", "Name;Cost\nDo it;1\nRest;0\n").unwrap();
        assert_eq!(doc.sheet().name(), "actions");
        assert_eq!(doc.sheet().rows().len(), 3);
        assert_eq!(doc.sheet().rows()[1], vec!["Do it", "1"]);
    }

    #[test]
    fn skips_comments_and_blank_lines() {
        let text = "// leading comment\nName;Cost\n\n// Hidden;9\nShown;1\n";
        let doc = CsvDocument::parse("t", text).unwrap();
        let records = doc.sheet().records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Shown");
    }

    #[test]
    fn rows_of_empty_fields_are_skipped() {
        let doc = CsvDocument::parse("t", "Name;Cost\n;;\nShown;1\n;\n").unwrap();
        let titles: Vec<_> = doc.sheet().records().into_iter().map(|r| r.title).collect();
        assert_eq!(titles, vec!["Shown"]);
    }

    #[test]
    fn quoted_fields_may_contain_delimiters() {
        let doc = CsvDocument::parse("t", "A;B\n\"x;y\";\"say \"\"hi\"\"\"\n").unwrap();
        let record = &doc.sheet().records()[0];
        assert_eq!(record.get("A"), Some("x;y"));
        assert_eq!(record.get("B"), Some("say \"hi\""));
    }

    #[test]
    fn macro_braces_survive() {
        let doc = CsvDocument::parse("t", "Effect;Image\n{tap}: go;{{strong}}\n").unwrap();
        let record = &doc.sheet().records()[0];
        assert_eq!(record.get("Effect"), Some("{tap}: go"));
        assert_eq!(record.get("Image"), Some("{{strong}}"));
    }

    #[test]
    fn strips_byte_order_mark_and_crlf() {
        let doc = CsvDocument::parse("t", "\u{feff}Name;Cost\r\nCard 1;1\r\n").unwrap();
        assert_eq!(doc.sheet().header().unwrap()[0], "Name");
        assert_eq!(doc.sheet().records()[0].get("Cost"), Some("1"));
    }

    #[test]
    fn ragged_rows_are_accepted() {
        let doc = CsvDocument::parse("t", "A;B;C\n1\n1;2;3;4\n").unwrap();
        let records = doc.sheet().records();
        assert_eq!(records[0].get("C"), Some(""));
        assert_eq!(records[1].fields.len(), 3);
    }
}
