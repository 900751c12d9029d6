//! Backend dispatch.
//!
//! [`TableDocument`] is a closed set of backends chosen by file extension.
//! Each variant exposes the same sheet model, so callers never need to know
//! which format a card type was authored in.
//!
//! # Example
//!
//! ```rust,no_run
//! use cardpress_table::TableDocument;
//! use std::path::Path;
//!
//! let doc = TableDocument::load(Path::new("cards/data.ods"))?;
//! if let Some(sheet) = doc.get_sheet("actions") {
//!     for record in sheet.records() {
//!         println!("{}", record.title);
//!     }
//! }
//! # Ok::<(), cardpress_table::TableError>(())
//! ```

use std::path::Path;

use crate::delimited::CsvDocument;
use crate::error::{Result, TableError};
use crate::ods::OdsDocument;
use crate::sheet::Sheet;
use crate::xlsx::XlsxDocument;

/// Supported source formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableFormat {
    /// `;`-separated text.
    Csv,
    /// OpenDocument spreadsheet.
    Ods,
    /// Office Open XML workbook.
    Xlsx,
}

impl TableFormat {
    /// Every format, in source-selection priority order.
    pub const ALL: [TableFormat; 3] = [TableFormat::Csv, TableFormat::Ods, TableFormat::Xlsx];

    /// Determines the format from a path's extension (case-insensitive).
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "csv" => Ok(Self::Csv),
            "ods" => Ok(Self::Ods),
            "xlsx" => Ok(Self::Xlsx),
            _ => Err(TableError::UnsupportedFormat(path.display().to_string())),
        }
    }

    /// The canonical file extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Ods => "ods",
            Self::Xlsx => "xlsx",
        }
    }

    /// Whether the format can hold more than one named sheet.
    pub fn is_multi_sheet(self) -> bool {
        !matches!(self, Self::Csv)
    }
}

/// A loaded tabular document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableDocument {
    Csv(CsvDocument),
    Ods(OdsDocument),
    Xlsx(XlsxDocument),
}

impl TableDocument {
    /// Loads a document, selecting the backend by extension.
    pub fn load(path: &Path) -> Result<Self> {
        let doc = match TableFormat::from_path(path)? {
            TableFormat::Csv => Self::Csv(CsvDocument::open(path)?),
            TableFormat::Ods => Self::Ods(OdsDocument::open(path)?),
            TableFormat::Xlsx => Self::Xlsx(XlsxDocument::open(path)?),
        };
        tracing::debug!(
            path = %path.display(),
            sheets = doc.sheets().len(),
            "loaded table document"
        );
        Ok(doc)
    }

    /// The backend format of this document.
    pub fn format(&self) -> TableFormat {
        match self {
            Self::Csv(_) => TableFormat::Csv,
            Self::Ods(_) => TableFormat::Ods,
            Self::Xlsx(_) => TableFormat::Xlsx,
        }
    }

    /// All sheets in document order.
    pub fn sheets(&self) -> &[Sheet] {
        match self {
            Self::Csv(doc) => doc.sheets(),
            Self::Ods(doc) => doc.sheets(),
            Self::Xlsx(doc) => doc.sheets(),
        }
    }

    /// Finds a sheet by exact name.
    pub fn get_sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets().iter().find(|sheet| sheet.name() == name)
    }
}
