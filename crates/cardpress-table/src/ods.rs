//! OpenDocument spreadsheet backend.
//!
//! An `.ods` file is a zip archive whose `content.xml` entry holds every
//! sheet. The parser streams that XML once and builds rows directly.
//!
//! # Compression Markers
//!
//! Spreadsheet applications compress runs of identical rows and cells with
//! `table:number-rows-repeated` and `table:number-columns-repeated`. Both are
//! expanded into literal duplicates. Runs of empty cells are only expanded
//! when a non-empty cell follows them, and rows without any non-empty cell are
//! dropped: the trailing padding written by office suites routinely repeats a
//! blank row a million times.
//!
//! # Cell Values
//!
//! | `office:value-type` | Value taken from |
//! |---------------------|------------------|
//! | `float`, `percentage`, `currency` | the `office:value` attribute |
//! | anything else / absent | inner text, paragraphs joined with `\n` |

use std::fs::File;
use std::io::{Read, Seek};
use std::iter;
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::ZipArchive;

use crate::error::Result;
use crate::sheet::Sheet;
use crate::xml::{attribute, read_entry, repeat_count};

const CONTENT_ENTRY: &str = "content.xml";

/// Value types whose canonical value lives in `office:value`.
const NUMERIC_TYPES: &[&str] = &["float", "percentage", "currency"];

/// A parsed OpenDocument spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OdsDocument {
    sheets: Vec<Sheet>,
}

impl OdsDocument {
    /// Opens an `.ods` archive from disk.
    pub fn open(path: &Path) -> Result<Self> {
        Self::from_reader(File::open(path)?)
    }

    /// Reads an `.ods` archive from any seekable source.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)?;
        let content = read_entry(&mut archive, CONTENT_ENTRY)?;
        Self::parse_content(&content)
    }

    /// Parses the `content.xml` part directly.
    pub fn parse_content(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        let mut parser = ContentParser::default();

        loop {
            match reader.read_event()? {
                Event::Start(e) => parser.start(&e, false),
                Event::Empty(e) => parser.start(&e, true),
                Event::End(e) => parser.end(e.name().as_ref()),
                Event::Text(t) if parser.collecting() => parser.push_text(&t.unescape()?),
                Event::CData(t) if parser.collecting() => {
                    parser.push_text(&String::from_utf8_lossy(&t))
                }
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(Self {
            sheets: parser.sheets,
        })
    }

    /// All sheets in document order.
    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }
}

#[derive(Default)]
struct ContentParser {
    sheets: Vec<Sheet>,
    table_depth: usize,
    table: Option<(String, Vec<Vec<String>>)>,
    row: Option<RowState>,
    cell: Option<CellState>,
    annotation_depth: usize,
}

impl ContentParser {
    fn in_sheet(&self) -> bool {
        self.table_depth == 1 && self.table.is_some()
    }

    fn collecting(&self) -> bool {
        self.annotation_depth == 0 && self.cell.as_ref().is_some_and(|c| c.fixed.is_none())
    }

    fn start(&mut self, e: &BytesStart<'_>, empty: bool) {
        match e.name().as_ref() {
            b"table:table" => {
                self.table_depth += 1;
                if self.table_depth == 1 {
                    self.table = attribute(e, b"table:name").map(|name| (name, Vec::new()));
                }
                if empty {
                    self.end(b"table:table");
                }
            }
            b"table:table-row" if self.in_sheet() && !empty => {
                self.row = Some(RowState::new(repeat_count(e, b"table:number-rows-repeated")));
            }
            b"table:table-cell" | b"table:covered-table-cell"
                if self.in_sheet() && self.row.is_some() =>
            {
                let cell = CellState::from_start(e);
                if empty {
                    self.finish_cell(cell);
                } else {
                    self.cell = Some(cell);
                }
            }
            b"office:annotation" if self.cell.is_some() && !empty => self.annotation_depth += 1,
            b"text:p" | b"text:h" if self.collecting() => {
                if let Some(cell) = self.cell.as_mut() {
                    cell.begin_paragraph();
                }
            }
            b"text:s" if self.collecting() => {
                let count = repeat_count(e, b"text:c");
                self.push_text(&" ".repeat(count));
            }
            b"text:tab" if self.collecting() => self.push_text("\t"),
            b"text:line-break" if self.collecting() => self.push_text("\n"),
            _ => {}
        }
    }

    fn end(&mut self, name: &[u8]) {
        match name {
            b"table:table" => {
                if self.table_depth == 1 {
                    if let Some((name, rows)) = self.table.take() {
                        self.sheets.push(Sheet::new(name, rows));
                    }
                }
                self.table_depth = self.table_depth.saturating_sub(1);
            }
            b"table:table-row" if self.table_depth == 1 => {
                if let (Some(row), Some((_, rows))) = (self.row.take(), self.table.as_mut()) {
                    row.finish_into(rows);
                }
            }
            b"table:table-cell" | b"table:covered-table-cell" if self.table_depth == 1 => {
                if let Some(cell) = self.cell.take() {
                    self.finish_cell(cell);
                }
            }
            b"office:annotation" => {
                self.annotation_depth = self.annotation_depth.saturating_sub(1);
            }
            _ => {}
        }
    }

    fn push_text(&mut self, text: &str) {
        if let Some(cell) = self.cell.as_mut() {
            cell.text.push_str(text);
        }
    }

    fn finish_cell(&mut self, cell: CellState) {
        if let Some(row) = self.row.as_mut() {
            let repeat = cell.repeat;
            row.push(cell.into_value(), repeat);
        }
    }
}

struct RowState {
    repeat: usize,
    cells: Vec<String>,
    pending_empty: usize,
}

impl RowState {
    fn new(repeat: usize) -> Self {
        Self {
            repeat,
            cells: Vec::new(),
            pending_empty: 0,
        }
    }

    fn push(&mut self, value: String, repeat: usize) {
        if value.is_empty() {
            self.pending_empty += repeat;
            return;
        }
        self.cells
            .extend(iter::repeat(String::new()).take(self.pending_empty));
        self.pending_empty = 0;
        self.cells.extend(iter::repeat(value).take(repeat));
    }

    fn finish_into(self, rows: &mut Vec<Vec<String>>) {
        if self.cells.is_empty() {
            return;
        }
        rows.extend(iter::repeat(self.cells).take(self.repeat));
    }
}

struct CellState {
    repeat: usize,
    fixed: Option<String>,
    text: String,
    paragraphs: usize,
}

impl CellState {
    fn from_start(e: &BytesStart<'_>) -> Self {
        let fixed = match attribute(e, b"office:value-type").as_deref() {
            Some(kind) if NUMERIC_TYPES.contains(&kind) => {
                Some(attribute(e, b"office:value").unwrap_or_default())
            }
            _ => None,
        };
        Self {
            repeat: repeat_count(e, b"table:number-columns-repeated"),
            fixed,
            text: String::new(),
            paragraphs: 0,
        }
    }

    fn begin_paragraph(&mut self) {
        if self.paragraphs > 0 {
            self.text.push('\n');
        }
        self.paragraphs += 1;
    }

    fn into_value(self) -> String {
        self.fixed.unwrap_or(self.text)
    }
}
