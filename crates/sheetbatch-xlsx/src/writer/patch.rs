//! In-place patching of existing package parts
//!
//! Every function here streams the original XML through a writer and only
//! touches the elements it has to; everything else is re-emitted exactly as
//! it was read.

use std::collections::BTreeMap;
use std::iter::Peekable;

use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;

use crate::error::{XlsxError, XlsxResult};
use crate::reader::{cell_position, row_number};
use crate::styles::DateStyles;
use crate::writer::cells::{dimension_ref, write_cell, write_row};
use crate::xml::{attr, local_name, parse_relationships, with_attr, without_attr, REL_NS};
use sheetbatch_core::{CellAddress, CellValue};

/// Pending cell writes of one worksheet: row -> [(col, value)], both ascending
pub(crate) type RowEdits<'a> = BTreeMap<u32, Vec<(u32, &'a CellValue)>>;

/// Output of [`patch_worksheet`]
#[derive(Debug)]
pub(crate) struct PatchedWorksheet {
    pub xml: Vec<u8>,
    /// A replaced cell used to hold a formula
    pub replaced_formula: bool,
}

struct PatchContext<'s> {
    prefix: String,
    date_xf: Option<u32>,
    date_styles: &'s DateStyles,
    replaced_formula: bool,
}

fn prefix_of(name: &[u8]) -> String {
    match name.iter().rposition(|b| *b == b':') {
        Some(idx) => String::from_utf8_lossy(&name[..=idx]).into_owned(),
        None => String::new(),
    }
}

fn element_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

/// Merge `edits` into a worksheet part
///
/// Rows and cells are visited in document order; an edited cell replaces the
/// existing `<c>` element (keeping its `s` attribute unless that would make a
/// number read back as a date), missing rows and cells are inserted in
/// row-major position, and the `<dimension>` grows to cover the edits.
pub(crate) fn patch_worksheet(
    original: &[u8],
    edits: &RowEdits<'_>,
    date_xf: Option<u32>,
    date_styles: &DateStyles,
) -> XlsxResult<PatchedWorksheet> {
    let mut reader = Reader::from_reader(original);
    let mut writer = Writer::new(Vec::with_capacity(original.len() + edits.len() * 64));
    let mut buf = Vec::new();
    let mut ctx = PatchContext {
        prefix: String::new(),
        date_xf,
        date_styles,
        replaced_formula: false,
    };
    let mut saw_sheet_data = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if local_name(e.name().as_ref()) == b"sheetData" => {
                saw_sheet_data = true;
                ctx.prefix = prefix_of(e.name().as_ref());
                writer.write_event(Event::Start(e))?;
                patch_sheet_data(&mut reader, &mut writer, edits, &mut ctx)?;
            }
            Event::Empty(e) if local_name(e.name().as_ref()) == b"sheetData" => {
                saw_sheet_data = true;
                ctx.prefix = prefix_of(e.name().as_ref());
                if edits.is_empty() {
                    writer.write_event(Event::Empty(e))?;
                } else {
                    let end = BytesEnd::new(element_name(&e));
                    writer.write_event(Event::Start(e))?;
                    write_remaining_rows(&mut writer, &mut edits.iter().peekable(), &ctx)?;
                    writer.write_event(Event::End(end))?;
                }
            }
            Event::Empty(e) if local_name(e.name().as_ref()) == b"dimension" => {
                let updated = grow_dimension(&e, edits)?;
                writer.write_event(Event::Empty(updated))?;
            }
            Event::End(e) if local_name(e.name().as_ref()) == b"worksheet" && !saw_sheet_data => {
                let prefix = prefix_of(e.name().as_ref());
                let sheet_data = format!("{}sheetData", prefix);
                ctx.prefix = prefix;
                writer.write_event(Event::Start(BytesStart::new(sheet_data.as_str())))?;
                write_remaining_rows(&mut writer, &mut edits.iter().peekable(), &ctx)?;
                writer.write_event(Event::End(BytesEnd::new(sheet_data.as_str())))?;
                writer.write_event(Event::End(e))?;
            }
            Event::Eof => break,
            ev => writer.write_event(ev)?,
        }
        buf.clear();
    }

    Ok(PatchedWorksheet {
        xml: writer.into_inner(),
        replaced_formula: ctx.replaced_formula,
    })
}

type RowIter<'e, 'a> = Peekable<std::collections::btree_map::Iter<'e, u32, Vec<(u32, &'a CellValue)>>>;

fn patch_sheet_data(
    reader: &mut Reader<&[u8]>,
    writer: &mut Writer<Vec<u8>>,
    edits: &RowEdits<'_>,
    ctx: &mut PatchContext<'_>,
) -> XlsxResult<()> {
    let mut pending = edits.iter().peekable();
    let mut buf = Vec::new();
    let mut last_row = 0u32;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if local_name(e.name().as_ref()) == b"row" => {
                let row = row_number(&e, last_row)?;
                last_row = row;
                write_rows_before(writer, &mut pending, row, ctx)?;

                let start = if attr(&e, b"r")?.is_none() {
                    with_attr(&e, "r", &row.to_string())?
                } else {
                    e.into_owned()
                };
                match pending.next_if(|(r, _)| **r == row) {
                    Some((_, cells)) => {
                        writer.write_event(Event::Start(without_attr(&start, b"spans")?))?;
                        patch_row(reader, writer, row, cells, ctx)?;
                    }
                    None => writer.write_event(Event::Start(start))?,
                }
            }
            Event::Empty(e) if local_name(e.name().as_ref()) == b"row" => {
                let row = row_number(&e, last_row)?;
                last_row = row;
                write_rows_before(writer, &mut pending, row, ctx)?;

                let start = if attr(&e, b"r")?.is_none() {
                    with_attr(&e, "r", &row.to_string())?
                } else {
                    e.to_owned().into_owned()
                };
                match pending.next_if(|(r, _)| **r == row) {
                    Some((_, cells)) => {
                        let end = BytesEnd::new(element_name(&e));
                        writer.write_event(Event::Start(without_attr(&start, b"spans")?))?;
                        for (col, value) in cells {
                            write_cell(writer, &ctx.prefix, row, *col, value, None, ctx.date_xf)?;
                        }
                        writer.write_event(Event::End(end))?;
                    }
                    None => writer.write_event(Event::Empty(start))?,
                }
            }
            Event::End(e) if local_name(e.name().as_ref()) == b"sheetData" => {
                write_remaining_rows(writer, &mut pending, ctx)?;
                writer.write_event(Event::End(e))?;
                return Ok(());
            }
            Event::Eof => {
                return Err(XlsxError::InvalidFormat(
                    "worksheet ends inside <sheetData>".into(),
                ))
            }
            ev => writer.write_event(ev)?,
        }
        buf.clear();
    }
}

fn write_rows_before(
    writer: &mut Writer<Vec<u8>>,
    pending: &mut RowIter<'_, '_>,
    row: u32,
    ctx: &PatchContext<'_>,
) -> XlsxResult<()> {
    while let Some((r, cells)) = pending.next_if(|(r, _)| **r < row) {
        write_row(writer, &ctx.prefix, *r, cells.iter().copied(), ctx.date_xf)?;
    }
    Ok(())
}

fn write_remaining_rows(
    writer: &mut Writer<Vec<u8>>,
    pending: &mut RowIter<'_, '_>,
    ctx: &PatchContext<'_>,
) -> XlsxResult<()> {
    for (r, cells) in pending {
        write_row(writer, &ctx.prefix, *r, cells.iter().copied(), ctx.date_xf)?;
    }
    Ok(())
}

fn patch_row(
    reader: &mut Reader<&[u8]>,
    writer: &mut Writer<Vec<u8>>,
    row: u32,
    cells: &[(u32, &CellValue)],
    ctx: &mut PatchContext<'_>,
) -> XlsxResult<()> {
    let mut pending = cells.iter().peekable();
    let mut buf = Vec::new();
    let mut last_col = 0u32;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if local_name(e.name().as_ref()) == b"c" => {
                let (_, col) = cell_position(&e, row, last_col)?;
                last_col = col;
                write_cells_before(writer, &mut pending, row, col, ctx)?;

                match pending.next_if(|(c, _)| *c == col) {
                    Some((_, value)) => {
                        let style = kept_style(attr(&e, b"s")?, value, ctx.date_styles);
                        if skip_element(reader)? {
                            ctx.replaced_formula = true;
                        }
                        write_cell(writer, &ctx.prefix, row, col, value, style.as_deref(), ctx.date_xf)?;
                    }
                    None => writer.write_event(Event::Start(with_reference(e, row, col)?))?,
                }
            }
            Event::Empty(e) if local_name(e.name().as_ref()) == b"c" => {
                let (_, col) = cell_position(&e, row, last_col)?;
                last_col = col;
                write_cells_before(writer, &mut pending, row, col, ctx)?;

                match pending.next_if(|(c, _)| *c == col) {
                    Some((_, value)) => {
                        let style = kept_style(attr(&e, b"s")?, value, ctx.date_styles);
                        write_cell(writer, &ctx.prefix, row, col, value, style.as_deref(), ctx.date_xf)?;
                    }
                    None => writer.write_event(Event::Empty(with_reference(e, row, col)?))?,
                }
            }
            Event::End(e) if local_name(e.name().as_ref()) == b"row" => {
                for (col, value) in pending.by_ref() {
                    write_cell(writer, &ctx.prefix, row, *col, value, None, ctx.date_xf)?;
                }
                writer.write_event(Event::End(e))?;
                return Ok(());
            }
            Event::Eof => {
                return Err(XlsxError::InvalidFormat("worksheet ends inside <row>".into()))
            }
            ev => writer.write_event(ev)?,
        }
        buf.clear();
    }
}

fn write_cells_before<'c, 'v: 'c>(
    writer: &mut Writer<Vec<u8>>,
    pending: &mut Peekable<std::slice::Iter<'c, (u32, &'v CellValue)>>,
    row: u32,
    col: u32,
    ctx: &PatchContext<'_>,
) -> XlsxResult<()> {
    while let Some((c, value)) = pending.next_if(|(c, _)| *c < col) {
        write_cell(writer, &ctx.prefix, row, *c, value, None, ctx.date_xf)?;
    }
    Ok(())
}

/// Style to carry over to a replaced cell
///
/// A number under a date format would read back as a date, so the format is
/// dropped in that case.
fn kept_style(style: Option<String>, value: &CellValue, date_styles: &DateStyles) -> Option<String> {
    let is_date_xf = |s: &str| s.parse::<u32>().map_or(false, |xf| date_styles.is_date(xf));
    match (value, style) {
        (CellValue::Number(_), Some(s)) if is_date_xf(&s) => None,
        (_, style) => style,
    }
}

/// Give a `<c>` without `r` an explicit reference so inserted neighbours
/// cannot shift it
fn with_reference(e: BytesStart<'_>, row: u32, col: u32) -> XlsxResult<BytesStart<'static>> {
    if attr(&e, b"r")?.is_some() {
        return Ok(e.into_owned());
    }
    with_attr(&e, "r", &CellAddress::new(row, col).to_a1_string())
}

/// Consume events up to the end of the current element; reports whether a
/// formula (`<f>`) was inside
fn skip_element(reader: &mut Reader<&[u8]>) -> XlsxResult<bool> {
    let mut buf = Vec::new();
    let mut depth = 0usize;
    let mut had_formula = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                had_formula |= local_name(e.name().as_ref()) == b"f";
                depth += 1;
            }
            Event::Empty(e) => had_formula |= local_name(e.name().as_ref()) == b"f",
            Event::End(_) if depth == 0 => return Ok(had_formula),
            Event::End(_) => depth -= 1,
            Event::Eof => {
                return Err(XlsxError::InvalidFormat("worksheet ends inside <c>".into()))
            }
            _ => {}
        }
        buf.clear();
    }
}

/// Widen a `<dimension ref>` to cover the edited cells
fn grow_dimension(e: &BytesStart<'_>, edits: &RowEdits<'_>) -> XlsxResult<BytesStart<'static>> {
    let (Some(first_row), Some(last_row)) = (edits.keys().next(), edits.keys().next_back()) else {
        return Ok(e.to_owned().into_owned());
    };
    let cols = edits.values().flatten().map(|(col, _)| *col);
    let min_col = cols.clone().min().unwrap_or(1);
    let max_col = cols.max().unwrap_or(1);

    let mut min = (*first_row, min_col);
    let mut max = (*last_row, max_col);

    if let Some(existing) = attr(e, b"ref")? {
        let mut corners = existing.split(':').map(CellAddress::parse);
        let start = corners.next().and_then(Result::ok);
        let end = corners.next().and_then(Result::ok).or(start);
        if let (Some(start), Some(end)) = (start, end) {
            min = (min.0.min(start.row), min.1.min(start.col));
            max = (max.0.max(end.row), max.1.max(end.col));
        }
    }

    with_attr(e, "ref", &dimension_ref(min, max))
}

/// Copy `xml`, appending a child built by `child` to the first `parent`
/// element; `child` receives the namespace prefix used by `parent`
pub(crate) fn append_child<F>(xml: &[u8], parent: &[u8], child: F) -> XlsxResult<Vec<u8>>
where
    F: Fn(&str) -> XlsxResult<BytesStart<'static>>,
{
    let mut reader = Reader::from_reader(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len() + 256));
    let mut buf = Vec::new();
    let mut depth = 0usize;
    let mut parent_depth = None;
    let mut done = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                if !done && parent_depth.is_none() && local_name(e.name().as_ref()) == parent {
                    parent_depth = Some(depth);
                }
                depth += 1;
                writer.write_event(Event::Start(e))?;
            }
            Event::End(e) => {
                depth = depth.saturating_sub(1);
                if !done && parent_depth == Some(depth) {
                    let prefix = prefix_of(e.name().as_ref());
                    writer.write_event(Event::Empty(child(&prefix)?))?;
                    done = true;
                }
                writer.write_event(Event::End(e))?;
            }
            Event::Empty(e) if !done && local_name(e.name().as_ref()) == parent => {
                let prefix = prefix_of(e.name().as_ref());
                let end = BytesEnd::new(element_name(&e));
                writer.write_event(Event::Start(e))?;
                writer.write_event(Event::Empty(child(&prefix)?))?;
                writer.write_event(Event::End(end))?;
                done = true;
            }
            Event::Eof => break,
            ev => writer.write_event(ev)?,
        }
        buf.clear();
    }

    if !done {
        return Err(XlsxError::InvalidFormat(format!(
            "no <{}> element to extend",
            String::from_utf8_lossy(parent)
        )));
    }
    Ok(writer.into_inner())
}

/// Copy `xml` without the `element` elements for which `drop` returns true
pub(crate) fn remove_elements<F>(xml: &[u8], element: &[u8], drop: F) -> XlsxResult<Vec<u8>>
where
    F: Fn(&BytesStart<'_>) -> XlsxResult<bool>,
{
    let mut reader = Reader::from_reader(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len()));
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Empty(e) if local_name(e.name().as_ref()) == element && drop(&e)? => {}
            Event::Start(e) if local_name(e.name().as_ref()) == element && drop(&e)? => {
                skip_element(&mut reader)?;
            }
            Event::Eof => break,
            ev => writer.write_event(ev)?,
        }
        buf.clear();
    }

    Ok(writer.into_inner())
}

/// Add a relationship, returning the patched part and the new id
pub(crate) fn add_relationship(
    rels_xml: &[u8],
    rel_type: &str,
    target: &str,
) -> XlsxResult<(Vec<u8>, String)> {
    let existing = parse_relationships(rels_xml)?;
    let next = existing
        .iter()
        .filter_map(|r| r.id.strip_prefix("rId")?.parse::<u32>().ok())
        .max()
        .unwrap_or(0)
        + 1;
    let id = (next..)
        .map(|n| format!("rId{}", n))
        .find(|id| existing.iter().all(|r| &r.id != id))
        .unwrap_or_else(|| format!("rId{}", next));

    let xml = append_child(rels_xml, b"Relationships", |prefix| {
        let mut rel = BytesStart::new(format!("{}Relationship", prefix));
        rel.push_attribute(("Id", id.as_str()));
        rel.push_attribute(("Type", rel_type));
        rel.push_attribute(("Target", target));
        Ok(rel)
    })?;
    Ok((xml, id))
}

/// Append a `<sheet>` entry to workbook.xml
pub(crate) fn add_sheet_entry(workbook_xml: &[u8], name: &str, rel_id: &str) -> XlsxResult<Vec<u8>> {
    let (rel_prefix, max_sheet_id) = scan_workbook(workbook_xml)?;

    let (xml, rel_prefix) = match rel_prefix {
        Some(prefix) => (workbook_xml.to_vec(), prefix),
        None => (declare_root_namespace(workbook_xml, "xmlns:r", REL_NS)?, "r".to_string()),
    };
    let sheet_id = (max_sheet_id + 1).to_string();
    let id_attr = format!("{}:id", rel_prefix);

    append_child(&xml, b"sheets", |prefix| {
        let mut sheet = BytesStart::new(format!("{}sheet", prefix));
        sheet.push_attribute(("name", name));
        sheet.push_attribute(("sheetId", sheet_id.as_str()));
        sheet.push_attribute((id_attr.as_str(), rel_id));
        Ok(sheet)
    })
}

/// Find the prefix bound to the relationships namespace and the largest sheetId
fn scan_workbook(xml: &[u8]) -> XlsxResult<(Option<String>, u32)> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut rel_prefix = None;
    let mut max_sheet_id = 0u32;
    let mut seen_root = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) => {
                if !seen_root {
                    seen_root = true;
                    for a in e.attributes() {
                        let a = a?;
                        let key = a.key.as_ref();
                        if key.starts_with(b"xmlns:") && a.unescape_value()? == REL_NS {
                            rel_prefix = Some(String::from_utf8_lossy(&key[6..]).into_owned());
                        }
                    }
                }
                if local_name(e.name().as_ref()) == b"sheet" {
                    let id = attr(&e, b"sheetId")?
                        .and_then(|v| v.trim().parse().ok())
                        .unwrap_or(0);
                    max_sheet_id = max_sheet_id.max(id);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok((rel_prefix, max_sheet_id))
}

fn declare_root_namespace(xml: &[u8], key: &str, value: &str) -> XlsxResult<Vec<u8>> {
    let mut reader = Reader::from_reader(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len() + 96));
    let mut buf = Vec::new();
    let mut seen_root = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if !seen_root => {
                seen_root = true;
                writer.write_event(Event::Start(with_attr(&e, key, value)?))?;
            }
            Event::Eof => break,
            ev => writer.write_event(ev)?,
        }
        buf.clear();
    }

    Ok(writer.into_inner())
}

/// Register a part in [Content_Types].xml (no-op if already listed)
pub(crate) fn add_override(content_types: &[u8], part_name: &str, content_type: &str) -> XlsxResult<Vec<u8>> {
    if has_override(content_types, part_name)? {
        return Ok(content_types.to_vec());
    }
    append_child(content_types, b"Types", |prefix| {
        let mut ov = BytesStart::new(format!("{}Override", prefix));
        ov.push_attribute(("PartName", part_name));
        ov.push_attribute(("ContentType", content_type));
        Ok(ov)
    })
}

fn has_override(content_types: &[u8], part_name: &str) -> XlsxResult<bool> {
    let mut reader = Reader::from_reader(content_types);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if local_name(e.name().as_ref()) == b"Override" => {
                if attr(&e, b"PartName")?.as_deref() == Some(part_name) {
                    return Ok(true);
                }
            }
            Event::Eof => return Ok(false),
            _ => {}
        }
        buf.clear();
    }
}

/// Drop the content-type override of a removed part
pub(crate) fn remove_override(content_types: &[u8], part_name: &str) -> XlsxResult<Vec<u8>> {
    remove_elements(content_types, b"Override", |e| {
        Ok(attr(e, b"PartName")?.as_deref() == Some(part_name))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::styles::{read_date_styles, DEFAULT_STYLES_XML};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn edits<'a>(cells: &'a [(u32, u32, CellValue)]) -> RowEdits<'a> {
        let mut rows = RowEdits::new();
        for (row, col, value) in cells {
            rows.entry(*row).or_default().push((*col, value));
        }
        rows
    }

    fn patch(original: &str, cells: &[(u32, u32, CellValue)]) -> (String, bool) {
        let patched =
            patch_worksheet(original.as_bytes(), &edits(cells), Some(9), &DateStyles::default())
                .unwrap();
        (String::from_utf8(patched.xml).unwrap(), patched.replaced_formula)
    }

    const SHEET: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><dimension ref="A1:C3"/><sheetViews><sheetView workbookViewId="0"/></sheetViews><sheetData><row r="1" spans="1:3"><c r="A1" t="s"><v>0</v></c><c r="C1" s="2"><v>3</v></c></row><row r="3" spans="1:3" ht="20" customHeight="1"><c r="B3"><f>A1*2</f><v>6</v></c></row></sheetData><mergeCells count="1"><mergeCell ref="A5:B5"/></mergeCells></worksheet>"#;

    #[test]
    fn test_no_edits_is_identity() {
        let (xml, replaced) = patch(SHEET, &[]);
        assert_eq!(xml, SHEET);
        assert!(!replaced);
    }

    #[test]
    fn test_replace_keeps_style_and_neighbours() {
        let (xml, _) = patch(SHEET, &[(1, 3, 42.0.into())]);
        assert!(xml.contains(r#"<row r="1"><c r="A1" t="s"><v>0</v></c><c r="C1" s="2"><v>42</v></c></row>"#));
        assert!(xml.contains(r#"<mergeCells count="1"><mergeCell ref="A5:B5"/></mergeCells>"#));
        assert!(xml.contains(r#"<sheetViews><sheetView workbookViewId="0"/></sheetViews>"#));
    }

    #[test]
    fn test_number_over_date_cell_drops_date_style() {
        let styles = read_date_styles(DEFAULT_STYLES_XML.as_bytes()).unwrap();
        let original = r#"<worksheet><sheetData><row r="1"><c r="A1" s="1"><v>45000</v></c><c r="B1" s="1"><v>45001</v></c><c r="C1" s="1"/></row></sheetData></worksheet>"#;
        let cells: [(u32, u32, CellValue); 3] = [
            (1, 1, 42.0.into()),
            (1, 2, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap().into()),
            (1, 3, "x".into()),
        ];
        let patched = patch_worksheet(original.as_bytes(), &edits(&cells), Some(1), &styles).unwrap();
        let xml = String::from_utf8(patched.xml).unwrap();
        assert!(xml.contains(r#"<c r="A1"><v>42</v></c>"#));
        assert!(xml.contains(r#"<c r="B1" s="1"><v>45293</v></c>"#));
        assert!(xml.contains(r#"<c r="C1" s="1" t="inlineStr">"#));
    }

    #[test]
    fn test_insert_cells_and_rows_in_order() {
        let (xml, _) = patch(
            SHEET,
            &[
                (1, 2, "mid".into()),
                (2, 1, 7.0.into()),
                (3, 4, true.into()),
                (6, 1, 1.0.into()),
            ],
        );
        assert!(xml.contains(
            r#"<c r="A1" t="s"><v>0</v></c><c r="B1" t="inlineStr"><is><t>mid</t></is></c><c r="C1" s="2"><v>3</v></c>"#
        ));
        assert!(xml.contains(r#"</row><row r="2"><c r="A2"><v>7</v></c></row><row r="3" ht="20" customHeight="1">"#));
        assert!(xml.contains(r#"<v>6</v></c><c r="D3" t="b"><v>1</v></c></row><row r="6"><c r="A6"><v>1</v></c></row></sheetData>"#));
        assert!(xml.contains(r#"<dimension ref="A1:D6"/>"#));
    }

    #[test]
    fn test_replacing_formula_is_reported() {
        let (xml, replaced) = patch(SHEET, &[(3, 2, 1.5.into())]);
        assert!(replaced);
        assert!(xml.contains(r#"<c r="B3"><v>1.5</v></c>"#));
        assert!(!xml.contains("<f>"));
    }

    #[test]
    fn test_empty_sheet_data_is_expanded() {
        let original = r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><dimension ref="A1"/><sheetData/></worksheet>"#;
        let (xml, _) = patch(original, &[(2, 2, "x".into())]);
        assert_eq!(
            xml,
            r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><dimension ref="A1:B2"/><sheetData><row r="2"><c r="B2" t="inlineStr"><is><t>x</t></is></c></row></sheetData></worksheet>"#
        );
    }

    #[test]
    fn test_prefixed_worksheet() {
        let original = r#"<x:worksheet xmlns:x="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><x:sheetData><x:row r="1"><x:c r="A1"><x:v>1</x:v></x:c></x:row></x:sheetData></x:worksheet>"#;
        let (xml, _) = patch(original, &[(1, 2, 2.0.into())]);
        assert!(xml.contains(r#"<x:c r="A1"><x:v>1</x:v></x:c><x:c r="B1"><x:v>2</x:v></x:c></x:row>"#));
    }

    #[test]
    fn test_rows_without_reference_get_one() {
        let original = r#"<worksheet><sheetData><row><c><v>1</v></c></row><row><c><v>2</v></c></row></sheetData></worksheet>"#;
        let (xml, _) = patch(original, &[(2, 2, 5.0.into())]);
        assert_eq!(
            xml,
            r#"<worksheet><sheetData><row r="1"><c><v>1</v></c></row><row r="2"><c r="A2"><v>2</v></c><c r="B2"><v>5</v></c></row></sheetData></worksheet>"#
        );
    }

    #[test]
    fn test_add_relationship_picks_free_id() {
        let rels = br#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="t" Target="a.xml"/><Relationship Id="rId3" Type="t" Target="b.xml"/></Relationships>"#;
        let (xml, id) = add_relationship(rels, "t2", "worksheets/sheet3.xml").unwrap();
        assert_eq!(id, "rId4");
        assert!(String::from_utf8(xml)
            .unwrap()
            .ends_with(r#"<Relationship Id="rId4" Type="t2" Target="worksheets/sheet3.xml"/></Relationships>"#));
    }

    #[test]
    fn test_add_sheet_entry() {
        let wb = br#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:rel="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="A" sheetId="4" rel:id="rId1"/></sheets><calcPr calcId="1"/></workbook>"#;
        let xml = String::from_utf8(add_sheet_entry(wb, "R&D", "rId7").unwrap()).unwrap();
        assert!(xml.contains(r#"<sheet name="A" sheetId="4" rel:id="rId1"/><sheet name="R&amp;D" sheetId="5" rel:id="rId7"/></sheets><calcPr calcId="1"/>"#));
    }

    #[test]
    fn test_content_type_overrides() {
        let ct = br#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Override PartName="/xl/calcChain.xml" ContentType="c"/></Types>"#;
        let added = add_override(ct, "/xl/worksheets/sheet2.xml", "w").unwrap();
        assert_eq!(add_override(&added, "/xl/worksheets/sheet2.xml", "w").unwrap(), added);

        let removed = String::from_utf8(remove_override(&added, "/xl/calcChain.xml").unwrap()).unwrap();
        assert_eq!(
            removed,
            r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Override PartName="/xl/worksheets/sheet2.xml" ContentType="w"/></Types>"#
        );
    }
}
