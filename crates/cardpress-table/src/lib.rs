//! Spreadsheet ingestion for card definitions.
//!
//! `cardpress-table` turns the tabular files that describe cards into a
//! uniform model: named [`Sheet`]s of string cells, where row 0 is the header
//! and every later row becomes a [`Record`].
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use cardpress_table::{find_source, TableCache};
//! use std::path::Path;
//!
//! let mut cache = TableCache::new();
//! if let Some(source) = find_source(Path::new("cards"), "actions") {
//!     for record in source.records(&mut cache)? {
//!         println!("{} has {} fields", record.title, record.fields.len());
//!     }
//! }
//! # Ok::<(), cardpress_table::TableError>(())
//! ```
//!
//! # Formats
//!
//! | Extension | Backend | Sheets |
//! |-----------|---------|--------|
//! | `.csv` | [`CsvDocument`] (`;`-separated, `//` comments) | one, named after the file stem |
//! | `.ods` | [`OdsDocument`] | every `table:table` |
//! | `.xlsx` | [`XlsxDocument`] | workbook order |
//!
//! All three produce identical records for equivalent content, so card
//! authors can switch formats without touching templates.

mod cache;
mod delimited;
mod document;
mod error;
mod ods;
mod sheet;
mod source;
mod xlsx;
mod xml;

pub use cache::TableCache;
pub use delimited::{CsvDocument, COMMENT_PREFIX, DELIMITER};
pub use document::{TableDocument, TableFormat};
pub use error::{Result, TableError};
pub use ods::OdsDocument;
pub use sheet::{Record, Sheet};
pub use source::{find_source, DataSource, SheetSelection, SHARED_SOURCE_STEM};
pub use xlsx::XlsxDocument;
