//! Error types for table loading.

use std::path::PathBuf;

/// Errors that can occur while loading a spreadsheet-like document.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    /// Reading the source file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The delimited-text reader rejected the input.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The source is not a readable archive.
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// An XML part of the archive is malformed.
    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// A required archive entry is absent (e.g. `content.xml`).
    #[error("archive does not contain a {0} entry")]
    MissingEntry(String),

    /// The workbook structure is inconsistent.
    #[error("invalid workbook: {0}")]
    InvalidWorkbook(String),

    /// The file extension does not map to a known backend.
    #[error("unsupported table format: {0}")]
    UnsupportedFormat(String),

    /// A named sheet was requested but the document has none by that name.
    #[error("sheet '{sheet}' not found in {}", path.display())]
    SheetNotFound { sheet: String, path: PathBuf },
}

impl TableError {
    /// Create an invalid workbook error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidWorkbook(msg.into())
    }
}

/// Result alias for table operations.
pub type Result<T> = std::result::Result<T, TableError>;
