//! XLSX reader

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::{XlsxError, XlsxResult};
use crate::package::{SheetPart, XlsxPackage};
use crate::styles::{read_date_styles, DateStyles};
use crate::xml::{
    attr, decode_excel_escapes, local_name, parse_error, parse_relationships, rels_part_for,
    resolve_target, REL_TYPE_OFFICE_DOCUMENT, REL_TYPE_SHARED_STRINGS, REL_TYPE_STYLES,
    REL_TYPE_WORKSHEET,
};
use sheetbatch_core::cell::excel_serial_to_datetime;
use sheetbatch_core::{CellAddress, CellError, CellValue, Sheet, Workbook};

/// A workbook read from disk together with the package it came from
#[derive(Debug, Clone)]
pub struct LoadedWorkbook {
    /// Logical cell content
    pub workbook: Workbook,
    /// Raw parts, used to write the file back without disturbing them
    pub package: XlsxPackage,
}

/// XLSX file reader
pub struct XlsxReader;

impl XlsxReader {
    /// Read a workbook from a file path
    pub fn read_file<P: AsRef<Path>>(path: P) -> XlsxResult<LoadedWorkbook> {
        let file = File::open(path)?;
        Self::read(BufReader::new(file))
    }

    /// Read a workbook from a reader
    pub fn read<R: Read + Seek>(reader: R) -> XlsxResult<LoadedWorkbook> {
        let mut package = XlsxPackage::from_zip(reader)?;

        // Verify this is an XLSX file
        if !package.contains_part("[Content_Types].xml") {
            return Err(XlsxError::InvalidFormat(
                "Missing [Content_Types].xml".into(),
            ));
        }

        package.workbook_part = Self::find_workbook_part(&package)?;
        let workbook_part = package.workbook_part.clone();

        let rels = parse_relationships(package.required_part(&rels_part_for(&workbook_part))?)?;
        let find_rel = |rel_type: &str| {
            rels.iter()
                .find(|r| r.rel_type == rel_type && !r.external)
                .map(|r| resolve_target(&workbook_part, &r.target))
        };
        package.styles_part = find_rel(REL_TYPE_STYLES);
        package.shared_strings_part = find_rel(REL_TYPE_SHARED_STRINGS);

        // Read shared strings (if present)
        let shared_strings = match package
            .shared_strings_part
            .as_deref()
            .and_then(|p| package.part(p))
        {
            Some(xml) => Self::read_shared_strings(xml)?,
            None => Vec::new(),
        };

        // Read styles (if present)
        let date_styles = match package.styles_part.as_deref().and_then(|p| package.part(p)) {
            Some(xml) => read_date_styles(xml)?,
            None => DateStyles::default(),
        };

        let sheet_info = Self::read_workbook_xml(package.required_part(&workbook_part)?)?;

        let mut workbook = Workbook::new();
        let mut sheets = Vec::with_capacity(sheet_info.len());

        for (name, r_id) in sheet_info {
            let rel = rels.iter().find(|r| r.id == r_id);
            match rel {
                Some(rel) if rel.rel_type == REL_TYPE_WORKSHEET => {
                    let part = resolve_target(&workbook_part, &rel.target);
                    let xml = package.required_part(&part)?;

                    workbook.add_sheet(&name)?;
                    let sheet = workbook
                        .sheet_by_name_mut(&name)
                        .ok_or_else(|| XlsxError::Parse(format!("sheet '{}' vanished", name)))?;
                    Self::read_worksheet(xml, &part, sheet, &shared_strings, &date_styles)?;

                    sheets.push(SheetPart { name, part });
                }
                Some(rel) => {
                    log::debug!("sheet '{}' is a {}; keeping it untouched", name, rel.rel_type);
                    workbook.reserve_sheet_name(&name);
                }
                None => {
                    log::warn!("sheet '{}' points at unknown relationship {}", name, r_id);
                    workbook.reserve_sheet_name(&name);
                }
            }
        }

        package.sheets = sheets;

        Ok(LoadedWorkbook { workbook, package })
    }

    /// Locate the main workbook part through the package relationships
    fn find_workbook_part(package: &XlsxPackage) -> XlsxResult<String> {
        let default = "xl/workbook.xml".to_string();
        let root_rels = match package.part("_rels/.rels") {
            Some(xml) => parse_relationships(xml)?,
            None => return Ok(default),
        };

        Ok(root_rels
            .iter()
            .find(|r| r.rel_type == REL_TYPE_OFFICE_DOCUMENT)
            .map(|r| resolve_target("", &r.target))
            .unwrap_or(default))
    }

    /// Read the shared strings table
    fn read_shared_strings(xml: &[u8]) -> XlsxResult<Vec<String>> {
        let mut xml_reader = Reader::from_reader(xml);

        let mut buf = Vec::new();
        let mut strings = Vec::new();
        let mut current_string = String::new();
        let mut in_si = false;
        let mut in_t = false;
        let mut in_phonetic = false;

        loop {
            match xml_reader.read_event_into(&mut buf)? {
                Event::Start(e) => match local_name(e.name().as_ref()) {
                    b"si" => {
                        in_si = true;
                        current_string.clear();
                    }
                    b"rPh" => in_phonetic = true,
                    b"t" if in_si && !in_phonetic => in_t = true,
                    _ => {}
                },
                Event::Empty(e) if local_name(e.name().as_ref()) == b"si" => {
                    strings.push(String::new());
                }
                Event::End(e) => match local_name(e.name().as_ref()) {
                    b"si" => {
                        // Decode Excel's _xHHHH_ escape sequences
                        strings.push(decode_excel_escapes(&current_string));
                        current_string.clear();
                        in_si = false;
                    }
                    b"rPh" => in_phonetic = false,
                    b"t" => in_t = false,
                    _ => {}
                },
                Event::Text(e) if in_t => {
                    current_string.push_str(&e.unescape()?);
                }
                Event::CData(e) if in_t => {
                    current_string.push_str(&String::from_utf8_lossy(&e));
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(strings)
    }

    /// Read workbook.xml to get sheet names and relationship ids, in tab order
    fn read_workbook_xml(xml: &[u8]) -> XlsxResult<Vec<(String, String)>> {
        let mut xml_reader = Reader::from_reader(xml);
        xml_reader.trim_text(true);

        let mut buf = Vec::new();
        let mut sheets = Vec::new();

        loop {
            match xml_reader.read_event_into(&mut buf)? {
                Event::Empty(e) | Event::Start(e) if local_name(e.name().as_ref()) == b"sheet" => {
                    // `r:id` is the only attribute with local name `id`
                    if let (Some(name), Some(r_id)) = (attr(&e, b"name")?, attr(&e, b"id")?) {
                        sheets.push((name, r_id));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(sheets)
    }

    /// Read the cells of one worksheet part into `sheet`
    fn read_worksheet(
        xml: &[u8],
        part: &str,
        sheet: &mut Sheet,
        shared_strings: &[String],
        date_styles: &DateStyles,
    ) -> XlsxResult<()> {
        let mut xml_reader = Reader::from_reader(xml);

        let mut buf = Vec::new();
        let mut current_row = 0u32;
        let mut last_col = 0u32;
        let mut cell: Option<RawCell> = None;
        let mut in_v = false;
        let mut in_is = false;
        let mut in_t = false;
        let mut in_phonetic = false;

        loop {
            match xml_reader.read_event_into(&mut buf)? {
                Event::Start(e) => match local_name(e.name().as_ref()) {
                    b"row" => {
                        current_row = row_number(&e, current_row)?;
                        last_col = 0;
                    }
                    b"c" => {
                        let raw = RawCell::from_start(&e, current_row, last_col)?;
                        last_col = raw.col;
                        cell = Some(raw);
                    }
                    b"v" if cell.is_some() => in_v = true,
                    b"is" if cell.is_some() => in_is = true,
                    b"rPh" => in_phonetic = true,
                    b"t" if in_is && !in_phonetic => in_t = true,
                    _ => {}
                },
                Event::Empty(e) => match local_name(e.name().as_ref()) {
                    b"row" => {
                        current_row = row_number(&e, current_row)?;
                        last_col = 0;
                    }
                    b"c" => {
                        // A styled cell without a value
                        last_col = RawCell::from_start(&e, current_row, last_col)?.col;
                    }
                    _ => {}
                },
                Event::Text(e) if in_v || in_t => {
                    if let Some(raw) = cell.as_mut() {
                        let text = e.unescape()?;
                        if in_v {
                            raw.value.push_str(&text);
                        } else {
                            raw.inline.push_str(&text);
                        }
                    }
                }
                Event::End(e) => match local_name(e.name().as_ref()) {
                    b"c" => {
                        if let Some(raw) = cell.take() {
                            if let Some(value) = raw.resolve(part, shared_strings, date_styles)? {
                                sheet.load_value(raw.row, raw.col, value);
                            }
                        }
                        in_v = false;
                        in_is = false;
                        in_t = false;
                    }
                    b"v" => in_v = false,
                    b"is" => in_is = false,
                    b"rPh" => in_phonetic = false,
                    b"t" => in_t = false,
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(())
    }
}

/// Row number of a `<row>` element; rows without `r` follow the previous one
pub(crate) fn row_number(e: &BytesStart<'_>, previous: u32) -> XlsxResult<u32> {
    match attr(e, b"r")? {
        Some(r) => r
            .trim()
            .parse()
            .map_err(|_| XlsxError::Parse(format!("invalid row number '{}'", r))),
        None => Ok(previous + 1),
    }
}

/// Position of a `<c>` element; cells without `r` follow the previous one
pub(crate) fn cell_position(
    e: &BytesStart<'_>,
    current_row: u32,
    last_col: u32,
) -> XlsxResult<(u32, u32)> {
    match attr(e, b"r")? {
        Some(r) => {
            let addr = CellAddress::parse(&r)?;
            Ok((addr.row, addr.col))
        }
        None => Ok((current_row.max(1), last_col + 1)),
    }
}

/// A `<c>` element as read, before type conversion
struct RawCell {
    row: u32,
    col: u32,
    cell_type: Option<String>,
    style: u32,
    value: String,
    inline: String,
}

impl RawCell {
    fn from_start(e: &BytesStart<'_>, current_row: u32, last_col: u32) -> XlsxResult<Self> {
        let (row, col) = cell_position(e, current_row, last_col)?;
        let style = attr(e, b"s")?
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(0);

        Ok(Self {
            row,
            col,
            cell_type: attr(e, b"t")?,
            style,
            value: String::new(),
            inline: String::new(),
        })
    }

    /// Convert to a cell value; formula cells yield their cached result
    fn resolve(
        &self,
        part: &str,
        shared_strings: &[String],
        date_styles: &DateStyles,
    ) -> XlsxResult<Option<CellValue>> {
        let cell_type = self.cell_type.as_deref().unwrap_or("n");

        if cell_type == "inlineStr" {
            return Ok(Some(CellValue::text(decode_excel_escapes(&self.inline))));
        }
        if self.value.is_empty() {
            return Ok(None);
        }

        let value = match cell_type {
            "s" => {
                let text = self
                    .value
                    .trim()
                    .parse::<usize>()
                    .ok()
                    .and_then(|index| shared_strings.get(index));
                match text {
                    Some(text) => CellValue::text(text),
                    None => {
                        log::warn!(
                            "{}: {} refers to missing shared string '{}'",
                            part,
                            self.address(),
                            self.value
                        );
                        return Ok(None);
                    }
                }
            }
            "str" => CellValue::text(decode_excel_escapes(&self.value)),
            "b" => CellValue::Boolean(self.value.trim() == "1"),
            "e" => match CellError::parse(self.value.trim()) {
                Some(err) => CellValue::Error(err),
                None => CellValue::text(&self.value),
            },
            "d" => match parse_iso_datetime(self.value.trim()) {
                Some(dt) => CellValue::Date(dt),
                None => CellValue::text(&self.value),
            },
            _ => {
                let n: f64 = self.value.trim().parse().map_err(|_| {
                    parse_error(part, format!("invalid number '{}' in {}", self.value, self.address()))
                })?;
                if date_styles.is_date(self.style) {
                    match excel_serial_to_datetime(n) {
                        Some(dt) => CellValue::Date(dt),
                        None => CellValue::number(n),
                    }
                } else {
                    CellValue::number(n)
                }
            }
        };

        Ok(Some(value))
    }

    fn address(&self) -> String {
        CellAddress::new(self.row, self.col).to_a1_string()
    }
}

/// Parse an ISO 8601 date or date-time as used by `t="d"` cells
fn parse_iso_datetime(s: &str) -> Option<NaiveDateTime> {
    const FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"];
    let s = s.trim_end_matches('Z');
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
