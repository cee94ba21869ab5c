//! Round-trip tests for workbooks that were not produced by this crate.
//!
//! The fixture mimics a file saved by a spreadsheet application: shared
//! strings, custom styles, a drawing, document properties and a second sheet.
//! Writing cells back must leave everything but the edited worksheet alone.

use std::io::{Cursor, Write};

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use sheetbatch_core::CellValue;
use sheetbatch_xlsx::{XlsxPackage, XlsxReader, XlsxWriter};

const PARTS: &[(&str, &str)] = &[
    (
        "[Content_Types].xml",
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/worksheets/sheet2.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/><Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/><Override PartName="/xl/drawings/drawing1.xml" ContentType="application/vnd.openxmlformats-officedocument.drawing+xml"/><Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/></Types>"#,
    ),
    (
        "_rels/.rels",
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId3" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#,
    ),
    (
        "docProps/core.xml",
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/"><dc:creator>Analyst</dc:creator></cp:coreProperties>"#,
    ),
    (
        "xl/workbook.xml",
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><bookViews><workbookView activeTab="1"/></bookViews><sheets><sheet name="Summary" sheetId="1" r:id="rId1"/><sheet name="LDZ demand" sheetId="2" r:id="rId2"/></sheets><definedNames><definedName name="Total">Summary!$B$2</definedName></definedNames><calcPr calcId="191029"/></workbook>"#,
    ),
    (
        "xl/_rels/workbook.xml.rels",
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet2.xml"/><Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/><Relationship Id="rId4" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/></Relationships>"#,
    ),
    (
        "xl/styles.xml",
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><numFmts count="1"><numFmt numFmtId="164" formatCode="0.0%"/></numFmts><fonts count="2"><font><sz val="11"/><name val="Calibri"/></font><font><b/><sz val="11"/><name val="Calibri"/></font></fonts><fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills><borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="3"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="0" fontId="1" fillId="0" borderId="0" xfId="0" applyFont="1"/><xf numFmtId="164" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/></cellXfs><cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles></styleSheet>"#,
    ),
    (
        "xl/sharedStrings.xml",
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="3" uniqueCount="3"><si><t>Total</t></si><si><t>Date</t></si><si><t>LDZ</t></si></sst>"#,
    ),
    (
        "xl/worksheets/sheet1.xml",
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><dimension ref="A1:B2"/><sheetData><row r="1"><c r="A1" s="1" t="s"><v>0</v></c></row><row r="2"><c r="B2" s="2"><v>0.25</v></c></row></sheetData><drawing r:id="rId1"/></worksheet>"#,
    ),
    (
        "xl/worksheets/_rels/sheet1.xml.rels",
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/drawing" Target="../drawings/drawing1.xml"/></Relationships>"#,
    ),
    (
        "xl/drawings/drawing1.xml",
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<xdr:wsDr xmlns:xdr="http://schemas.openxmlformats.org/drawingml/2006/spreadsheetDrawing"/>"#,
    ),
    (
        "xl/worksheets/sheet2.xml",
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><dimension ref="A1:B3"/><sheetViews><sheetView workbookViewId="0"><pane ySplit="1" topLeftCell="A2" state="frozen"/></sheetView></sheetViews><sheetData><row r="1"><c r="A1" s="1" t="s"><v>1</v></c><c r="B1" s="1" t="s"><v>2</v></c></row><row r="2"><c r="A2"><v>45292</v></c><c r="B2"><v>301.5</v></c></row><row r="3"><c r="A3"><v>45293</v></c><c r="B3"><v>299</v></c></row></sheetData><autoFilter ref="A1:B3"/></worksheet>"#,
    ),
];

fn fixture() -> Vec<u8> {
    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
        let options = zip::write::SimpleFileOptions::default();
        for (name, content) in PARTS {
            zip.start_file(*name, options).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }
    buf
}

fn ymd(y: i32, m: u32, d: u32) -> CellValue {
    NaiveDate::from_ymd_opt(y, m, d).unwrap().into()
}

#[test]
fn test_reads_foreign_workbook() {
    let loaded = XlsxReader::read(Cursor::new(fixture())).unwrap();

    assert_eq!(loaded.workbook.sheet_names(), vec!["Summary", "LDZ demand"]);
    let summary = loaded.workbook.sheet_by_name("Summary").unwrap();
    assert_eq!(summary.value(1, 1), CellValue::text("Total"));
    assert_eq!(summary.value(2, 2), CellValue::Number(0.25));

    // Unstyled serials stay numbers
    let ldz = loaded.workbook.sheet_by_name("LDZ demand").unwrap();
    assert_eq!(ldz.value(2, 1), CellValue::Number(45292.0));
    assert_eq!(ldz.bounds(), Some((3, 2)));
}

#[test]
fn test_appending_rows_preserves_everything_else() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gas.xlsx");
    std::fs::write(&path, fixture()).unwrap();

    let mut loaded = XlsxReader::read_file(&path).unwrap();
    let ldz = loaded.workbook.sheet_by_name_mut("LDZ demand").unwrap();
    ldz.set_value(4, 1, ymd(2024, 1, 3));
    ldz.set_value(4, 2, 305.0.into());

    XlsxWriter::write_file(&loaded.workbook, Some(&loaded.package), &path).unwrap();

    let original = XlsxPackage::from_zip(Cursor::new(fixture())).unwrap();
    let written = XlsxPackage::from_zip(std::fs::File::open(&path).unwrap()).unwrap();

    for name in original.part_names() {
        match name {
            "xl/worksheets/sheet2.xml" | "xl/styles.xml" => {
                assert_ne!(original.part(name), written.part(name), "{} should change", name)
            }
            _ => assert_eq!(original.part(name), written.part(name), "{} changed", name),
        }
    }

    let sheet2 = String::from_utf8(written.part("xl/worksheets/sheet2.xml").unwrap().to_vec()).unwrap();
    assert!(sheet2.contains(r#"<dimension ref="A1:B4"/>"#));
    assert!(sheet2.contains(r#"<pane ySplit="1" topLeftCell="A2" state="frozen"/>"#));
    assert!(sheet2.contains(r#"<row r="4"><c r="A4" s="3"><v>45294</v></c><c r="B4"><v>305</v></c></row></sheetData><autoFilter ref="A1:B3"/>"#));

    let styles = String::from_utf8(written.part("xl/styles.xml").unwrap().to_vec()).unwrap();
    assert!(styles.contains(r#"<cellXfs count="4">"#));

    let reread = XlsxReader::read_file(&path).unwrap();
    let ldz = reread.workbook.sheet_by_name("LDZ demand").unwrap();
    assert_eq!(ldz.value(4, 1), ymd(2024, 1, 3));
    assert_eq!(ldz.value(4, 2), CellValue::Number(305.0));
    assert_eq!(ldz.value(3, 2), CellValue::Number(299.0));
}

#[test]
fn test_replacing_cell_keeps_its_format() {
    let mut loaded = XlsxReader::read(Cursor::new(fixture())).unwrap();
    loaded
        .workbook
        .sheet_by_name_mut("Summary")
        .unwrap()
        .set_value(2, 2, 0.5.into());

    let package = XlsxWriter::build(&loaded.workbook, Some(&loaded.package)).unwrap();
    let sheet1 = String::from_utf8(package.part("xl/worksheets/sheet1.xml").unwrap().to_vec()).unwrap();

    assert!(sheet1.contains(r#"<c r="B2" s="2"><v>0.5</v></c>"#));
    assert!(sheet1.contains(r#"<drawing r:id="rId1"/>"#));
    assert_eq!(package.part("xl/styles.xml"), loaded.package.part("xl/styles.xml"));
}

#[test]
fn test_new_sheet_is_registered() {
    let mut loaded = XlsxReader::read(Cursor::new(fixture())).unwrap();
    loaded
        .workbook
        .sheet_or_insert("Multiticker")
        .unwrap()
        .set_value(1, 1, "NBP".into());

    let package = XlsxWriter::build(&loaded.workbook, Some(&loaded.package)).unwrap();
    assert_eq!(package.sheet_part("Multiticker"), Some("xl/worksheets/sheet3.xml"));

    let workbook_xml = String::from_utf8(package.part("xl/workbook.xml").unwrap().to_vec()).unwrap();
    assert!(workbook_xml.contains(r#"<sheet name="Multiticker" sheetId="3" r:id="rId5"/></sheets>"#));
    assert!(workbook_xml.contains(r#"<definedName name="Total">Summary!$B$2</definedName>"#));

    let content_types = String::from_utf8(package.part("[Content_Types].xml").unwrap().to_vec()).unwrap();
    assert!(content_types.contains(r#"<Override PartName="/xl/worksheets/sheet3.xml""#));

    let reread = XlsxReader::read(Cursor::new(package.to_bytes().unwrap())).unwrap();
    assert_eq!(reread.workbook.sheet_names(), vec!["Summary", "LDZ demand", "Multiticker"]);
    assert_eq!(
        reread.workbook.sheet_by_name("Multiticker").unwrap().value(1, 1),
        CellValue::text("NBP")
    );
}
