//! Locating the data behind a card type.
//!
//! A card type `N` is defined by `cards/N.html` plus rows from one of the
//! following sources, checked in order. The first file that exists wins.
//!
//! | Priority | File | Rows taken from |
//! |----------|------|-----------------|
//! | 1 | `N.csv` | the whole file |
//! | 2 | `N.ods` | every sheet, concatenated |
//! | 3 | `N.xlsx` | every sheet, concatenated |
//! | 4 | `data.ods` | sheet `N` only |
//! | 5 | `data.xlsx` | sheet `N` only |
//!
//! Selection only looks at which files exist. If `data.ods` exists but has no
//! sheet `N`, loading reports [`TableError::SheetNotFound`] rather than
//! falling through to `data.xlsx`.

use std::path::{Path, PathBuf};

use crate::cache::TableCache;
use crate::document::TableFormat;
use crate::error::{Result, TableError};
use crate::sheet::Record;

/// File stem of the shared multi-sheet workbook.
pub const SHARED_SOURCE_STEM: &str = "data";

/// Which sheets of a document contribute rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetSelection {
    /// Every sheet, in document order.
    All,
    /// One sheet by exact name.
    Named(String),
}

/// A resolved data source for one card type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSource {
    pub path: PathBuf,
    pub selection: SheetSelection,
}

impl DataSource {
    /// Loads the selected rows as records, going through `cache`.
    pub fn records(&self, cache: &mut TableCache) -> Result<Vec<Record>> {
        let doc = cache.load(&self.path)?;
        match &self.selection {
            SheetSelection::All => Ok(doc.sheets().iter().flat_map(|s| s.records()).collect()),
            SheetSelection::Named(name) => doc
                .get_sheet(name)
                .map(|sheet| sheet.records())
                .ok_or_else(|| TableError::SheetNotFound {
                    sheet: name.clone(),
                    path: self.path.clone(),
                }),
        }
    }
}

/// Finds the data source for `type_name` inside `cards_dir`.
///
/// Returns `None` when no candidate file exists.
pub fn find_source(cards_dir: &Path, type_name: &str) -> Option<DataSource> {
    let own = TableFormat::ALL.iter().map(|format| DataSource {
        path: cards_dir.join(format!("{type_name}.{}", format.extension())),
        selection: SheetSelection::All,
    });
    let shared = TableFormat::ALL
        .iter()
        .filter(|format| format.is_multi_sheet())
        .map(|format| DataSource {
            path: cards_dir.join(format!("{SHARED_SOURCE_STEM}.{}", format.extension())),
            selection: SheetSelection::Named(type_name.to_string()),
        });

    own.chain(shared).find(|candidate| candidate.path.is_file())
}
