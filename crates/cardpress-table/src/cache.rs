//! Memoised document loading.
//!
//! A conversion run touches the same `data.*` workbook once per card type.
//! [`TableCache`] parses each file once and hands out shared references.
//! It is an ordinary value owned by the caller; the watch loop clears it
//! before every re-run so edits are picked up.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::document::TableDocument;
use crate::error::Result;

/// Path-keyed cache of loaded documents.
#[derive(Debug, Default)]
pub struct TableCache {
    documents: HashMap<PathBuf, Arc<TableDocument>>,
}

impl TableCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached document for `path`, loading it on first use.
    ///
    /// Paths are canonicalised so `cards/../cards/data.ods` and
    /// `cards/data.ods` share one entry.
    pub fn load(&mut self, path: &Path) -> Result<Arc<TableDocument>> {
        let key = path.canonicalize()?;
        if let Some(doc) = self.documents.get(&key) {
            tracing::trace!(path = %key.display(), "table cache hit");
            return Ok(Arc::clone(doc));
        }
        let doc = Arc::new(TableDocument::load(&key)?);
        self.documents.insert(key, Arc::clone(&doc));
        Ok(doc)
    }

    /// Drops every cached document.
    pub fn invalidate(&mut self) {
        self.documents.clear();
    }

    /// Drops the entry for a single path, if cached.
    pub fn invalidate_path(&mut self, path: &Path) {
        let key = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        self.documents.remove(&key);
    }

    /// Number of cached documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
