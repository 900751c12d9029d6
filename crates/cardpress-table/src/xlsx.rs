//! Office Open XML workbook backend.
//!
//! Reads `.xlsx` archives without a spreadsheet engine: the workbook part
//! lists sheets, the relationships part maps each sheet to its worksheet
//! entry, and the optional shared-string table resolves `t="s"` cells.
//!
//! Only rows containing at least one non-empty cell are returned. Each row
//! starts at column A and ends at its last used cell; gaps in between are
//! filled with `""`.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::ZipArchive;

use crate::error::{Result, TableError};
use crate::sheet::Sheet;
use crate::xml::{attribute_local, read_entry, read_optional_entry};

const WORKBOOK_ENTRY: &str = "xl/workbook.xml";
const WORKBOOK_RELS_ENTRY: &str = "xl/_rels/workbook.xml.rels";
const SHARED_STRINGS_ENTRY: &str = "xl/sharedStrings.xml";

/// A parsed `.xlsx` workbook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XlsxDocument {
    sheets: Vec<Sheet>,
}

impl XlsxDocument {
    /// Opens an `.xlsx` archive from disk.
    pub fn open(path: &Path) -> Result<Self> {
        Self::from_reader(File::open(path)?)
    }

    /// Reads an `.xlsx` archive from any seekable source.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)?;

        let workbook = read_entry(&mut archive, WORKBOOK_ENTRY)?;
        let entries = parse_workbook(&workbook)?;

        let relationships = match read_optional_entry(&mut archive, WORKBOOK_RELS_ENTRY)? {
            Some(xml) => parse_relationships(&xml)?,
            None => HashMap::new(),
        };
        let shared = match read_optional_entry(&mut archive, SHARED_STRINGS_ENTRY)? {
            Some(xml) => parse_shared_strings(&xml)?,
            None => Vec::new(),
        };

        let mut sheets = Vec::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            let part = entry
                .rel_id
                .as_ref()
                .and_then(|id| relationships.get(id))
                .map(|target| resolve_target(target))
                .unwrap_or_else(|| format!("xl/worksheets/sheet{}.xml", index + 1));
            let xml = read_entry(&mut archive, &part)?;
            let rows = parse_worksheet(&xml, &shared)?;
            sheets.push(Sheet::new(entry.name.clone(), rows));
        }

        Ok(Self { sheets })
    }

    /// All sheets in workbook order.
    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }
}

#[derive(Debug)]
struct SheetEntry {
    name: String,
    rel_id: Option<String>,
}

fn parse_workbook(xml: &str) -> Result<Vec<SheetEntry>> {
    let mut reader = Reader::from_str(xml);
    let mut entries = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                let name = attribute_local(&e, b"name")
                    .ok_or_else(|| TableError::invalid("sheet element without a name"))?;
                entries.push(SheetEntry {
                    name,
                    rel_id: attribute_local(&e, b"id"),
                });
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(entries)
}

fn parse_relationships(xml: &str) -> Result<HashMap<String, String>> {
    let mut reader = Reader::from_str(xml);
    let mut map = HashMap::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                if let (Some(id), Some(target)) =
                    (attribute_local(&e, b"Id"), attribute_local(&e, b"Target"))
                {
                    map.insert(id, target);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(map)
}

/// Relationship targets are relative to `xl/` unless absolute.
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{target}"),
    }
}

fn parse_shared_strings(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut strings = Vec::new();
    let mut current: Option<String> = None;
    let mut in_text = false;
    let mut phonetic_depth = 0usize;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"si" => current = Some(String::new()),
                b"rPh" => phonetic_depth += 1,
                b"t" if phonetic_depth == 0 => in_text = true,
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Event::End(e) => match e.local_name().as_ref() {
                b"si" => strings.push(current.take().unwrap_or_default()),
                b"rPh" => phonetic_depth = phonetic_depth.saturating_sub(1),
                b"t" => in_text = false,
                _ => {}
            },
            Event::Text(t) if in_text => {
                if let Some(s) = current.as_mut() {
                    s.push_str(&t.unescape()?);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(strings)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellKind {
    Shared,
    Boolean,
    Inline,
    Plain,
}

impl CellKind {
    fn from_attr(value: Option<&str>) -> Self {
        match value {
            Some("s") => Self::Shared,
            Some("b") => Self::Boolean,
            Some("inlineStr") => Self::Inline,
            _ => Self::Plain,
        }
    }
}

struct CellDraft {
    column: usize,
    kind: CellKind,
    raw: String,
}

impl CellDraft {
    fn resolve(self, shared: &[String]) -> Result<(usize, String)> {
        let value = match self.kind {
            CellKind::Shared if self.raw.is_empty() => String::new(),
            CellKind::Shared => {
                let index: usize = self.raw.trim().parse().map_err(|_| {
                    TableError::invalid(format!("bad shared string index '{}'", self.raw))
                })?;
                shared.get(index).cloned().ok_or_else(|| {
                    TableError::invalid(format!("shared string {index} out of range"))
                })?
            }
            CellKind::Boolean => match self.raw.trim() {
                "1" => "TRUE".to_string(),
                "0" => "FALSE".to_string(),
                _ => self.raw,
            },
            CellKind::Inline | CellKind::Plain => self.raw,
        };
        Ok((self.column, value))
    }
}

fn parse_worksheet(xml: &str, shared: &[String]) -> Result<Vec<Vec<String>>> {
    let mut reader = Reader::from_str(xml);
    let mut rows = Vec::new();
    let mut cells: Vec<(usize, String)> = Vec::new();
    let mut next_column = 0usize;
    let mut cell: Option<CellDraft> = None;
    let mut in_value = false;
    let mut phonetic_depth = 0usize;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"row" => {
                    cells.clear();
                    next_column = 0;
                }
                b"c" => cell = Some(start_cell(&e, next_column)?),
                b"rPh" => phonetic_depth += 1,
                b"v" | b"t" if cell.is_some() && phonetic_depth == 0 => in_value = true,
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"c" => {
                next_column = start_cell(&e, next_column)?.column + 1;
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"v" | b"t" => in_value = false,
                b"rPh" => phonetic_depth = phonetic_depth.saturating_sub(1),
                b"c" => {
                    if let Some(draft) = cell.take() {
                        let (column, value) = draft.resolve(shared)?;
                        next_column = column + 1;
                        if !value.is_empty() {
                            cells.push((column, value));
                        }
                    }
                }
                b"row" => {
                    if let Some(row) = assemble_row(&cells) {
                        rows.push(row);
                    }
                    cells.clear();
                }
                _ => {}
            },
            Event::Text(t) if in_value => {
                if let Some(draft) = cell.as_mut() {
                    draft.raw.push_str(&t.unescape()?);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(rows)
}

fn start_cell(e: &BytesStart<'_>, fallback_column: usize) -> Result<CellDraft> {
    let column = match attribute_local(e, b"r") {
        Some(reference) => match column_index(&reference) {
            Ok(column) => column.unwrap_or(fallback_column),
            Err(()) => {
                return Err(TableError::invalid(format!(
                    "cell reference '{reference}' is beyond column XFD"
                )))
            }
        },
        None => fallback_column,
    };
    if column >= MAX_COLUMNS {
        return Err(TableError::invalid("row has more than 16384 columns"));
    }
    Ok(CellDraft {
        column,
        kind: CellKind::from_attr(attribute_local(e, b"t").as_deref()),
        raw: String::new(),
    })
}

fn assemble_row(cells: &[(usize, String)]) -> Option<Vec<String>> {
    let last = cells.iter().map(|(column, _)| *column).max()?;
    let mut row = vec![String::new(); last + 1];
    for (column, value) in cells {
        row[*column] = value.clone();
    }
    Some(row)
}

/// Columns in a worksheet, `A` through `XFD`.
const MAX_COLUMNS: usize = 16_384;

/// Converts the letter prefix of an A1-style reference to a zero-based column.
///
/// `Ok(None)` means the reference has no letters; `Err` means the column is
/// past `XFD`.
fn column_index(reference: &str) -> std::result::Result<Option<usize>, ()> {
    let mut one_based = 0usize;
    for b in reference.bytes().take_while(u8::is_ascii_alphabetic) {
        one_based = one_based
            .checked_mul(26)
            .and_then(|acc| acc.checked_add(usize::from(b.to_ascii_uppercase() - b'A' + 1)))
            .filter(|n| *n <= MAX_COLUMNS)
            .ok_or(())?;
    }
    Ok(one_based.checked_sub(1))
}
