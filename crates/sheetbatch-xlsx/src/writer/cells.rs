//! Cell and worksheet XML generation

use std::collections::BTreeMap;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::writer::Writer;

use crate::error::{XlsxError, XlsxResult};
use crate::xml::{encode_excel_escapes, needs_space_preserve, REL_NS};
use sheetbatch_core::cell::datetime_to_excel_serial;
use sheetbatch_core::{CellAddress, CellValue, Sheet};

const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";

/// Write one `<c>` element
///
/// `style` is the `s` attribute the cell had before (kept so replaced cells
/// keep their formatting); dates always use `date_xf` so they display as
/// dates. Empty values produce nothing unless a style must be kept.
pub(crate) fn write_cell(
    writer: &mut Writer<Vec<u8>>,
    prefix: &str,
    row: u32,
    col: u32,
    value: &CellValue,
    style: Option<&str>,
    date_xf: Option<u32>,
) -> XlsxResult<()> {
    let c_name = format!("{}c", prefix);
    let reference = CellAddress::new(row, col).to_a1_string();

    let date_style;
    let style = match value {
        CellValue::Date(_) => {
            let xf = date_xf.ok_or_else(|| {
                XlsxError::InvalidFormat(format!("no date style available for {}", reference))
            })?;
            date_style = xf.to_string();
            Some(date_style.as_str())
        }
        _ => style,
    };

    let mut start = BytesStart::new(c_name.as_str());
    start.push_attribute(("r", reference.as_str()));
    if let Some(s) = style {
        start.push_attribute(("s", s));
    }

    let (cell_type, text) = match value {
        CellValue::Empty => {
            if style.is_some() {
                writer.write_event(Event::Empty(start))?;
            }
            return Ok(());
        }
        CellValue::Number(n) if !n.is_finite() => {
            return write_cell(writer, prefix, row, col, &CellValue::Empty, style, date_xf);
        }
        CellValue::Number(n) => (None, n.to_string()),
        CellValue::Date(dt) => (None, datetime_to_excel_serial(*dt).to_string()),
        CellValue::Boolean(b) => (Some("b"), if *b { "1" } else { "0" }.to_string()),
        CellValue::Error(e) => (Some("e"), e.as_str().to_string()),
        CellValue::Text(s) => {
            start.push_attribute(("t", "inlineStr"));
            writer.write_event(Event::Start(start))?;
            write_inline_string(writer, prefix, s.as_str())?;
            writer.write_event(Event::End(BytesEnd::new(c_name.as_str())))?;
            return Ok(());
        }
    };

    if let Some(t) = cell_type {
        start.push_attribute(("t", t));
    }
    writer.write_event(Event::Start(start))?;
    let v_name = format!("{}v", prefix);
    writer.write_event(Event::Start(BytesStart::new(v_name.as_str())))?;
    writer.write_event(Event::Text(BytesText::new(&text)))?;
    writer.write_event(Event::End(BytesEnd::new(v_name.as_str())))?;
    writer.write_event(Event::End(BytesEnd::new(c_name.as_str())))?;
    Ok(())
}

fn write_inline_string(writer: &mut Writer<Vec<u8>>, prefix: &str, s: &str) -> XlsxResult<()> {
    let is_name = format!("{}is", prefix);
    let t_name = format!("{}t", prefix);
    let encoded = encode_excel_escapes(s);

    let mut t = BytesStart::new(t_name.as_str());
    if needs_space_preserve(s) {
        t.push_attribute(("xml:space", "preserve"));
    }

    writer.write_event(Event::Start(BytesStart::new(is_name.as_str())))?;
    writer.write_event(Event::Start(t))?;
    writer.write_event(Event::Text(BytesText::new(&encoded)))?;
    writer.write_event(Event::End(BytesEnd::new(t_name.as_str())))?;
    writer.write_event(Event::End(BytesEnd::new(is_name.as_str())))?;
    Ok(())
}

/// Write a `<row>` holding `cells` (ascending columns)
pub(crate) fn write_row<'a>(
    writer: &mut Writer<Vec<u8>>,
    prefix: &str,
    row: u32,
    cells: impl IntoIterator<Item = (u32, &'a CellValue)>,
    date_xf: Option<u32>,
) -> XlsxResult<()> {
    let row_name = format!("{}row", prefix);
    let mut start = BytesStart::new(row_name.as_str());
    start.push_attribute(("r", row.to_string().as_str()));
    writer.write_event(Event::Start(start))?;
    for (col, value) in cells {
        write_cell(writer, prefix, row, col, value, None, date_xf)?;
    }
    writer.write_event(Event::End(BytesEnd::new(row_name.as_str())))?;
    Ok(())
}

/// `ref` value for a `<dimension>` element
pub(crate) fn dimension_ref(min: (u32, u32), max: (u32, u32)) -> String {
    let first = CellAddress::new(min.0, min.1).to_a1_string();
    if min == max {
        first
    } else {
        format!("{}:{}", first, CellAddress::new(max.0, max.1).to_a1_string())
    }
}

/// Generate the worksheet part for a sheet that does not exist on disk yet
pub(crate) fn write_new_worksheet(sheet: &Sheet, date_xf: Option<u32>) -> XlsxResult<Vec<u8>> {
    let mut writer = Writer::new(Vec::new());

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    writer.write_event(Event::Text(BytesText::from_escaped("\n")))?;

    let mut root = BytesStart::new("worksheet");
    root.push_attribute(("xmlns", MAIN_NS));
    root.push_attribute(("xmlns:r", REL_NS));
    writer.write_event(Event::Start(root))?;

    let dimension = match sheet.bounds() {
        Some(max) => dimension_ref((1, 1), max),
        None => "A1".to_string(),
    };
    let mut dim = BytesStart::new("dimension");
    dim.push_attribute(("ref", dimension.as_str()));
    writer.write_event(Event::Empty(dim))?;

    writer.write_event(Event::Start(BytesStart::new("sheetData")))?;

    let mut rows: BTreeMap<u32, Vec<(u32, &CellValue)>> = BTreeMap::new();
    for (row, col, value) in sheet.iter_cells() {
        rows.entry(row).or_default().push((col, value));
    }
    for (row, cells) in rows {
        write_row(&mut writer, "", row, cells, date_xf)?;
    }

    writer.write_event(Event::End(BytesEnd::new("sheetData")))?;
    writer.write_event(Event::End(BytesEnd::new("worksheet")))?;

    Ok(writer.into_inner())
}
