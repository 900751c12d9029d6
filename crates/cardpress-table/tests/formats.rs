//! Cross-format behaviour: the same card table authored as csv, ods and xlsx
//! must yield the same records.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use cardpress_table::{find_source, Record, SheetSelection, TableCache, TableDocument, TableError};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const TABLE: &[&[&str]] = &[
    &["Name", "Cost", "Text", "Copies"],
    &["Move", "1", "Go {tap} twice", "2"],
    &["Build", "3", "Costs {{coin}}; *any* tile", ""],
    &["", "0", "untitled", "1"],
];

fn write_zip(path: &Path, entries: &[(&str, String)]) {
    let mut zip = ZipWriter::new(File::create(path).unwrap());
    let options = SimpleFileOptions::default();
    for (name, content) in entries {
        zip.start_file(*name, options).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn write_csv(path: &Path, table: &[&[&str]]) {
    let mut text = String::from("// generated fixture\n\n");
    for row in table {
        let cells: Vec<String> = row
            .iter()
            .map(|c| {
                if c.contains(';') {
                    format!("\"{c}\"")
                } else {
                    c.to_string()
                }
            })
            .collect();
        text.push_str(&cells.join(";"));
        text.push('\n');
    }
    std::fs::write(path, text).unwrap();
}

fn ods_table(name: &str, table: &[&[&str]]) -> String {
    let mut xml = format!(r#"<table:table table:name="{name}">"#);
    for row in table {
        xml.push_str("<table:table-row>");
        for cell in row.iter() {
            if cell.is_empty() {
                xml.push_str("<table:table-cell/>");
            } else if cell.parse::<f64>().is_ok() {
                xml.push_str(&format!(
                    r#"<table:table-cell office:value-type="float" office:value="{cell}"><text:p>{cell}</text:p></table:table-cell>"#
                ));
            } else {
                xml.push_str(&format!(
                    r#"<table:table-cell office:value-type="string"><text:p>{}</text:p></table:table-cell>"#,
                    xml_escape(cell)
                ));
            }
        }
        // Trailing padding the way office suites write it.
        xml.push_str(r#"<table:table-cell table:number-columns-repeated="1020"/>"#);
        xml.push_str("</table:table-row>");
    }
    xml.push_str(r#"<table:table-row table:number-rows-repeated="1048000"><table:table-cell table:number-columns-repeated="1024"/></table:table-row>"#);
    xml.push_str("</table:table>");
    xml
}

fn write_ods(path: &Path, sheets: &[(&str, &[&[&str]])]) {
    let tables: String = sheets.iter().map(|(n, t)| ods_table(n, t)).collect();
    let content = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><office:document-content xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0" xmlns:table="urn:oasis:names:tc:opendocument:xmlns:table:1.0" xmlns:text="urn:oasis:names:tc:opendocument:xmlns:text:1.0"><office:body><office:spreadsheet>{tables}</office:spreadsheet></office:body></office:document-content>"#
    );
    write_zip(
        path,
        &[
            ("mimetype", "application/vnd.oasis.opendocument.spreadsheet".to_string()),
            ("content.xml", content),
        ],
    );
}

fn column_letter(index: usize) -> char {
    (b'A' + index as u8) as char
}

fn write_xlsx(path: &Path, sheets: &[(&str, &[&[&str]])]) {
    let mut shared: Vec<String> = Vec::new();
    let mut worksheets = Vec::new();

    for (_, table) in sheets {
        let mut xml = String::from(
            r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
        );
        for (r, row) in table.iter().enumerate() {
            xml.push_str(&format!(r#"<row r="{}">"#, r + 1));
            for (c, cell) in row.iter().enumerate() {
                let reference = format!("{}{}", column_letter(c), r + 1);
                if cell.is_empty() {
                    continue;
                }
                if cell.parse::<f64>().is_ok() {
                    xml.push_str(&format!(r#"<c r="{reference}"><v>{cell}</v></c>"#));
                } else {
                    let index = shared.len();
                    shared.push(xml_escape(cell));
                    xml.push_str(&format!(r#"<c r="{reference}" t="s"><v>{index}</v></c>"#));
                }
            }
            xml.push_str("</row>");
        }
        xml.push_str("</sheetData></worksheet>");
        worksheets.push(xml);
    }

    let sheet_list: String = sheets
        .iter()
        .enumerate()
        .map(|(i, (name, _))| {
            format!(r#"<sheet name="{name}" sheetId="{}" r:id="rId{}"/>"#, i + 1, i + 1)
        })
        .collect();
    let workbook = format!(
        r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>{sheet_list}</sheets></workbook>"#
    );
    let rels: String = (0..sheets.len())
        .map(|i| {
            format!(
                r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{}.xml"/>"#,
                i + 1,
                i + 1
            )
        })
        .collect();
    let rels = format!(
        r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{rels}</Relationships>"#
    );
    let sst: String = shared.iter().map(|s| format!("<si><t>{s}</t></si>")).collect();
    let sst = format!(
        r#"<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">{sst}</sst>"#
    );

    let names: Vec<String> = (0..worksheets.len())
        .map(|i| format!("xl/worksheets/sheet{}.xml", i + 1))
        .collect();
    let mut entries = vec![
        ("xl/workbook.xml", workbook),
        ("xl/_rels/workbook.xml.rels", rels),
        ("xl/sharedStrings.xml", sst),
    ];
    for (name, xml) in names.iter().zip(worksheets) {
        entries.push((name.as_str(), xml));
    }
    write_zip(path, &entries);
}

fn load_records(path: &PathBuf) -> Vec<Record> {
    let doc = TableDocument::load(path).unwrap();
    doc.sheets().iter().flat_map(|s| s.records()).collect()
}

#[test]
fn equivalent_content_yields_identical_records() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("actions.csv");
    let ods = dir.path().join("actions.ods");
    let xlsx = dir.path().join("actions.xlsx");
    write_csv(&csv, TABLE);
    write_ods(&ods, &[("actions", TABLE)]);
    write_xlsx(&xlsx, &[("actions", TABLE)]);

    let from_csv = load_records(&csv);
    let from_ods = load_records(&ods);
    let from_xlsx = load_records(&xlsx);

    assert_eq!(from_csv.len(), 3);
    assert_eq!(from_csv, from_ods);
    assert_eq!(from_csv, from_xlsx);

    assert_eq!(from_csv[1].get("Text"), Some("Costs {{coin}}; *any* tile"));
    assert_eq!(from_csv[1].get("Copies"), Some(""));
    assert_eq!(from_csv[2].title, "");
}

#[test]
fn blank_rows_are_dropped_by_every_format() {
    let table: &[&[&str]] = &[
        &["Name", "Cost", "Text"],
        &["Move", "1", "go"],
        &["", "", ""],
        &["Build", "3", "make"],
    ];
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("gaps.csv");
    let ods = dir.path().join("gaps.ods");
    let xlsx = dir.path().join("gaps.xlsx");
    write_csv(&csv, table);
    write_ods(&ods, &[("gaps", table)]);
    write_xlsx(&xlsx, &[("gaps", table)]);

    let from_csv = load_records(&csv);
    let titles: Vec<_> = from_csv.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["Move", "Build"]);
    assert_eq!(from_csv, load_records(&ods));
    assert_eq!(from_csv, load_records(&xlsx));
}

#[test]
fn shared_workbooks_serve_one_sheet_per_type() {
    let buildings: &[&[&str]] = &[&["Name", "Deck"], &["Farm", "Starter"], &["Mill", "Advanced"]];

    for ext in ["ods", "xlsx"] {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(format!("data.{ext}"));
        let sheets: &[(&str, &[&[&str]])] = &[("actions", TABLE), ("buildings", buildings)];
        if ext == "ods" {
            write_ods(&path, sheets);
        } else {
            write_xlsx(&path, sheets);
        }

        let mut cache = TableCache::new();
        let source = find_source(dir.path(), "buildings").unwrap();
        assert_eq!(source.selection, SheetSelection::Named("buildings".into()));
        let records = source.records(&mut cache).unwrap();
        let titles: Vec<_> = records.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Farm", "Mill"], "{ext}");

        let missing = find_source(dir.path(), "events").unwrap();
        assert!(matches!(
            missing.records(&mut cache),
            Err(TableError::SheetNotFound { .. })
        ));
        assert_eq!(cache.len(), 1, "{ext}: workbook parsed once");
    }
}

#[test]
fn own_multi_sheet_file_concatenates_sheets() {
    let dir = tempfile::tempdir().unwrap();
    let more: &[&[&str]] = &[&["Name", "Cost"], &["Extra", "9"]];
    write_ods(&dir.path().join("actions.ods"), &[("first", TABLE), ("second", more)]);

    let source = find_source(dir.path(), "actions").unwrap();
    let records = source.records(&mut TableCache::new()).unwrap();
    assert_eq!(records.len(), 4);
    assert_eq!(records[3].title, "Extra");
    assert_eq!(records[3].get("Text"), None);
}

#[test]
fn corrupt_archive_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.ods");
    std::fs::write(&path, b"not a zip").unwrap();
    assert!(matches!(TableDocument::load(&path), Err(TableError::Zip(_))));

    let path = dir.path().join("empty.xlsx");
    write_zip(&path, &[("other.xml", String::new())]);
    assert!(matches!(
        TableDocument::load(&path),
        Err(TableError::MissingEntry(_))
    ));
}
