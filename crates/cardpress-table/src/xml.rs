//! Helpers shared by the zipped-XML backends.

use std::io::{Read, Seek};

use quick_xml::events::BytesStart;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::{Result, TableError};

/// Reads a UTF-8 archive entry into a string.
///
/// A missing entry is reported as [`TableError::MissingEntry`] so callers can
/// treat optional parts (shared strings, relationships) as absent.
pub(crate) fn read_entry<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<String> {
    let mut file = archive.by_name(name).map_err(|e| match e {
        ZipError::FileNotFound => TableError::MissingEntry(name.to_string()),
        other => TableError::Zip(other),
    })?;
    let mut content = String::new();
    file.read_to_string(&mut content)?;
    Ok(content)
}

/// Like [`read_entry`] but maps a missing entry to `None`.
pub(crate) fn read_optional_entry<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<String>> {
    match read_entry(archive, name) {
        Ok(content) => Ok(Some(content)),
        Err(TableError::MissingEntry(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Returns the unescaped value of the attribute with the exact qualified name.
pub(crate) fn attribute(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key)
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()))
}

/// Returns the value of the first attribute whose local name matches,
/// ignoring any namespace prefix.
pub(crate) fn attribute_local(e: &BytesStart<'_>, local: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == local)
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()))
}

/// Parses a repeat-count attribute, defaulting to 1.
pub(crate) fn repeat_count(e: &BytesStart<'_>, key: &[u8]) -> usize {
    attribute(e, key)
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(1)
        .max(1)
}
