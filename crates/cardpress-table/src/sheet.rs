//! Sheets and the records derived from them.
//!
//! Every backend produces the same shape: a named [`Sheet`] holding rows of
//! cell strings, where row 0 is the header. [`Sheet::records`] zips each data
//! row against that header to build [`Record`]s, the unit the rest of the
//! pipeline consumes.
//!
//! # Zipping Rules
//!
//! | Situation | Result |
//! |-----------|--------|
//! | data row shorter than header | missing fields are `""` |
//! | data row longer than header | extra cells are dropped |
//! | empty first cell | title is `""` |
//!
//! Header names are expected to be unique within a sheet. This is not
//! enforced here; lookups through [`Record::get`] return the first match.

/// A single table of rows. Row 0 is the header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sheet {
    name: String,
    rows: Vec<Vec<String>>,
}

impl Sheet {
    /// Creates a sheet from already-parsed rows.
    pub fn new(name: impl Into<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    /// The sheet name (file stem for delimited text).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All rows including the header.
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// The header row, if the sheet has any rows.
    pub fn header(&self) -> Option<&[String]> {
        self.rows.first().map(Vec::as_slice)
    }

    /// Number of data rows (excluding the header).
    pub fn data_len(&self) -> usize {
        self.rows.len().saturating_sub(1)
    }

    /// Zips every data row with the header row.
    pub fn records(&self) -> Vec<Record> {
        let Some((header, data)) = self.rows.split_first() else {
            return Vec::new();
        };
        data.iter().map(|row| Record::from_row(header, row)).collect()
    }
}

/// One data row bound to its header names.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Record {
    /// Raw value of the first column.
    pub title: String,
    /// Header name to raw cell value, in header order.
    pub fields: Vec<(String, String)>,
}

impl Record {
    /// Builds a record by zipping `row` against `header`.
    pub fn from_row(header: &[String], row: &[String]) -> Self {
        let fields = header
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), row.get(i).cloned().unwrap_or_default()))
            .collect();
        Self {
            title: row.first().cloned().unwrap_or_default(),
            fields,
        }
    }

    /// Looks up a field by header name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Iterates over `(name, value)` pairs in header order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn records_zip_with_header() {
        let sheet = Sheet::new(
            "t",
            vec![row(&["Name", "Cost"]), row(&["Do it", "1"]), row(&["Rest", "0"])],
        );
        let records = sheet.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].title, "Do it");
        assert_eq!(records[0].get("Cost"), Some("1"));
        assert_eq!(records[1].get("Name"), Some("Rest"));
    }

    #[test]
    fn short_row_defaults_to_empty() {
        let sheet = Sheet::new("t", vec![row(&["A", "B", "C"]), row(&["x"])]);
        let record = &sheet.records()[0];
        assert_eq!(
            record.fields,
            vec![
                ("A".to_string(), "x".to_string()),
                ("B".to_string(), String::new()),
                ("C".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn long_row_is_truncated() {
        let sheet = Sheet::new("t", vec![row(&["A"]), row(&["x", "y", "z"])]);
        let record = &sheet.records()[0];
        assert_eq!(record.fields.len(), 1);
        assert_eq!(record.get("A"), Some("x"));
    }

    #[test]
    fn empty_row_has_empty_title() {
        let sheet = Sheet::new("t", vec![row(&["A", "B"]), vec![]]);
        let record = &sheet.records()[0];
        assert_eq!(record.title, "");
        assert_eq!(record.get("B"), Some(""));
    }

    #[test]
    fn header_only_sheet_has_no_records() {
        let sheet = Sheet::new("t", vec![row(&["A"])]);
        assert!(sheet.records().is_empty());
        assert_eq!(sheet.data_len(), 0);
        assert!(Sheet::new("empty", vec![]).records().is_empty());
    }
}
