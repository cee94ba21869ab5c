//! XLSX styles (styles.xml) helpers
//!
//! Only number formats matter here: the reader needs to know which cell
//! formats display dates, and the writer needs one format index that shows
//! a plain date so date values keep rendering as dates.

use std::collections::HashMap;

use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;

use crate::error::{XlsxError, XlsxResult};
use crate::xml::{attr, local_name, with_attr};

/// Built-in number format for `m/d/yyyy` (shown in the locale's short date)
const NUM_FMT_SHORT_DATE: u32 = 14;

/// Cell format index of the date style in [`DEFAULT_STYLES_XML`]
pub(crate) const DEFAULT_DATE_XF: u32 = 1;

/// Styles part written into packages created from scratch
pub(crate) const DEFAULT_STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <fonts count="1">
    <font><sz val="11"/><name val="Calibri"/><family val="2"/></font>
  </fonts>
  <fills count="2">
    <fill><patternFill patternType="none"/></fill>
    <fill><patternFill patternType="gray125"/></fill>
  </fills>
  <borders count="1">
    <border><left/><right/><top/><bottom/><diagonal/></border>
  </borders>
  <cellStyleXfs count="1">
    <xf numFmtId="0" fontId="0" fillId="0" borderId="0"/>
  </cellStyleXfs>
  <cellXfs count="2">
    <xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/>
    <xf numFmtId="14" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/>
  </cellXfs>
  <cellStyles count="1">
    <cellStyle name="Normal" xfId="0" builtinId="0"/>
  </cellStyles>
</styleSheet>"#;

/// Which cell format indexes (`s` attribute values) display dates
#[derive(Debug, Clone, Default)]
pub(crate) struct DateStyles {
    date_xfs: Vec<bool>,
}

impl DateStyles {
    pub(crate) fn is_date(&self, xf: u32) -> bool {
        self.date_xfs.get(xf as usize).copied().unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Xf {
    num_fmt_id: u32,
    font_id: u32,
    fill_id: u32,
    border_id: u32,
}

fn parse_u32(value: Option<String>) -> u32 {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(0)
}

/// Scan styles.xml for custom number formats and the cellXfs list
fn scan_styles(xml: &[u8]) -> XlsxResult<(HashMap<u32, String>, Option<Vec<Xf>>)> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut num_fmts = HashMap::new();
    let mut cell_xfs: Option<Vec<Xf>> = None;
    let mut in_cell_xfs = false;
    let mut depth_in_xfs = 0usize;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match local_name(e.name().as_ref()) {
                b"cellXfs" => {
                    in_cell_xfs = true;
                    depth_in_xfs = 0;
                    cell_xfs.get_or_insert_with(Vec::new);
                }
                b"xf" if in_cell_xfs && depth_in_xfs == 0 => {
                    if let Some(xfs) = cell_xfs.as_mut() {
                        xfs.push(read_xf(&e)?);
                    }
                    depth_in_xfs += 1;
                }
                _ if in_cell_xfs => depth_in_xfs += 1,
                _ => {}
            },
            Event::Empty(e) => match local_name(e.name().as_ref()) {
                b"numFmt" => {
                    let id = attr(&e, b"numFmtId")?.and_then(|v| v.parse().ok());
                    let code = attr(&e, b"formatCode")?;
                    if let (Some(id), Some(code)) = (id, code) {
                        num_fmts.insert(id, code);
                    }
                }
                b"xf" if in_cell_xfs && depth_in_xfs == 0 => {
                    if let Some(xfs) = cell_xfs.as_mut() {
                        xfs.push(read_xf(&e)?);
                    }
                }
                b"cellXfs" => {
                    cell_xfs.get_or_insert_with(Vec::new);
                }
                _ => {}
            },
            Event::End(e) => {
                if local_name(e.name().as_ref()) == b"cellXfs" {
                    in_cell_xfs = false;
                } else if in_cell_xfs {
                    depth_in_xfs = depth_in_xfs.saturating_sub(1);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok((num_fmts, cell_xfs))
}

fn read_xf(e: &BytesStart<'_>) -> XlsxResult<Xf> {
    Ok(Xf {
        num_fmt_id: parse_u32(attr(e, b"numFmtId")?),
        font_id: parse_u32(attr(e, b"fontId")?),
        fill_id: parse_u32(attr(e, b"fillId")?),
        border_id: parse_u32(attr(e, b"borderId")?),
    })
}

/// Read which cell formats display dates
pub(crate) fn read_date_styles(xml: &[u8]) -> XlsxResult<DateStyles> {
    let (num_fmts, cell_xfs) = scan_styles(xml)?;

    let date_xfs = cell_xfs
        .unwrap_or_default()
        .iter()
        .map(|xf| match num_fmts.get(&xf.num_fmt_id) {
            Some(code) => is_date_format(code),
            None => is_builtin_date_format(xf.num_fmt_id),
        })
        .collect();

    Ok(DateStyles { date_xfs })
}

/// Built-in number formats that display a date or time
fn is_builtin_date_format(id: u32) -> bool {
    matches!(id, 14..=22 | 45..=47)
}

/// Whether a custom number format code displays a date or time
///
/// Quoted literals, backslash escapes and bracketed sections (colors, locale
/// tags) are ignored; elapsed-time sections like `[h]` count as time.
pub(crate) fn is_date_format(code: &str) -> bool {
    // Only the first section decides how positive numbers render
    let section = code.split(';').next().unwrap_or("");

    let mut chars = section.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => {
                for q in chars.by_ref() {
                    if q == '"' {
                        break;
                    }
                }
            }
            '\\' | '_' | '*' => {
                chars.next();
            }
            '[' => {
                let inner: String = chars.by_ref().take_while(|c| *c != ']').collect();
                let inner = inner.to_ascii_lowercase();
                if !inner.is_empty() && inner.chars().all(|c| matches!(c, 'h' | 'm' | 's')) {
                    return true;
                }
            }
            'y' | 'Y' | 'd' | 'D' | 'm' | 'M' | 'h' | 'H' | 's' | 'S' => return true,
            _ => {}
        }
    }
    false
}

/// Make sure styles.xml has a plain short-date cell format
///
/// Returns the patched part (or `None` when an existing format was reused)
/// and the cellXfs index to put in the `s` attribute of date cells.
pub(crate) fn ensure_date_xf(xml: &[u8]) -> XlsxResult<(Option<Vec<u8>>, u32)> {
    let (_, cell_xfs) = scan_styles(xml)?;
    let cell_xfs = cell_xfs
        .ok_or_else(|| XlsxError::InvalidFormat("styles.xml has no cellXfs".into()))?;

    let wanted = Xf {
        num_fmt_id: NUM_FMT_SHORT_DATE,
        font_id: 0,
        fill_id: 0,
        border_id: 0,
    };
    if let Some(idx) = cell_xfs.iter().position(|xf| *xf == wanted) {
        return Ok((None, idx as u32));
    }

    let new_index = cell_xfs.len() as u32;
    let count = (new_index + 1).to_string();

    let mut reader = Reader::from_reader(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len() + 128));
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if local_name(e.name().as_ref()) == b"cellXfs" => {
                writer.write_event(Event::Start(with_attr(&e, "count", &count)?))?;
            }
            Event::End(e) if local_name(e.name().as_ref()) == b"cellXfs" => {
                writer.write_event(Event::Empty(date_xf(e.name().as_ref())))?;
                writer.write_event(Event::End(e))?;
            }
            Event::Empty(e) if local_name(e.name().as_ref()) == b"cellXfs" => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                writer.write_event(Event::Start(with_attr(&e, "count", &count)?))?;
                writer.write_event(Event::Empty(date_xf(name.as_bytes())))?;
                writer.write_event(Event::End(BytesEnd::new(name)))?;
            }
            Event::Eof => break,
            ev => writer.write_event(ev)?,
        }
        buf.clear();
    }

    Ok((Some(writer.into_inner()), new_index))
}

/// `<xf>` for the short-date format, using the same prefix as `cell_xfs_name`
fn date_xf(cell_xfs_name: &[u8]) -> BytesStart<'static> {
    let name = match cell_xfs_name.iter().rposition(|b| *b == b':') {
        Some(idx) => format!("{}:xf", String::from_utf8_lossy(&cell_xfs_name[..idx])),
        None => "xf".to_string(),
    };
    let mut xf = BytesStart::new(name);
    xf.push_attribute(("numFmtId", "14"));
    xf.push_attribute(("fontId", "0"));
    xf.push_attribute(("fillId", "0"));
    xf.push_attribute(("borderId", "0"));
    xf.push_attribute(("xfId", "0"));
    xf.push_attribute(("applyNumberFormat", "1"));
    xf
}
