//! XLSX writer
//!
//! [`XlsxWriter::build`] turns a [`Workbook`] into a complete package. With a
//! base package (the file as it was loaded) only edited worksheets are
//! rewritten; without one a minimal package is generated from scratch.

mod cells;
mod patch;

use std::fs::File;
use std::io::{Seek, Write};
use std::path::Path;

use crate::error::{XlsxError, XlsxResult};
use crate::package::{SheetPart, XlsxPackage};
use crate::styles::{
    ensure_date_xf, read_date_styles, DateStyles, DEFAULT_DATE_XF, DEFAULT_STYLES_XML,
};
use crate::xml::{
    attr, parse_relationships, rels_part_for, relative_target, resolve_target, CT_STYLES,
    CT_WORKSHEET, REL_TYPE_STYLES, REL_TYPE_WORKSHEET,
};
use patch::RowEdits;
use sheetbatch_core::{CellValue, Sheet, Workbook};

const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
const REL_TYPE_CALC_CHAIN: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/calcChain";

/// XLSX file writer
pub struct XlsxWriter;

impl XlsxWriter {
    /// Build the package for `workbook`
    ///
    /// `base` is the package the workbook was loaded from, if any. Parts of
    /// `base` that no edit touches are carried over unchanged.
    pub fn build(workbook: &Workbook, base: Option<&XlsxPackage>) -> XlsxResult<XlsxPackage> {
        if workbook.is_empty() {
            return Err(XlsxError::InvalidFormat(
                "a workbook needs at least one sheet".into(),
            ));
        }

        let skeleton;
        let base = match base {
            Some(base) => base,
            None => {
                skeleton = Self::skeleton();
                &skeleton
            }
        };

        let mut package = base.clone();

        let date_xf = if Self::needs_date_style(workbook, base) {
            Some(Self::ensure_date_style(&mut package)?)
        } else {
            None
        };

        let styles_xml = package.styles_part.as_deref().and_then(|part| package.part(part));
        let date_styles = match styles_xml {
            Some(xml) => read_date_styles(xml)?,
            None => DateStyles::default(),
        };

        let mut replaced_formula = false;
        for sheet in workbook.sheets() {
            match base.sheet_part(sheet.name()) {
                Some(part) if sheet.has_edits() => {
                    let edits = row_edits(sheet);
                    let patched = patch::patch_worksheet(
                        base.required_part(part)?,
                        &edits,
                        date_xf,
                        &date_styles,
                    )?;
                    replaced_formula |= patched.replaced_formula;
                    package.set_part(part, patched.xml);
                }
                Some(_) => {}
                None => Self::append_sheet(&mut package, sheet, date_xf)?,
            }
        }

        if replaced_formula {
            Self::drop_calc_chain(&mut package)?;
        }

        Ok(package)
    }

    /// Build the package and write it as a zip archive
    pub fn write<W: Write + Seek>(
        workbook: &Workbook,
        base: Option<&XlsxPackage>,
        writer: W,
    ) -> XlsxResult<XlsxPackage> {
        let package = Self::build(workbook, base)?;
        package.write_zip(writer)?;
        Ok(package)
    }

    /// Write a workbook to a file path (not atomic)
    pub fn write_file<P: AsRef<Path>>(
        workbook: &Workbook,
        base: Option<&XlsxPackage>,
        path: P,
    ) -> XlsxResult<XlsxPackage> {
        let file = File::create(path)?;
        Self::write(workbook, base, file)
    }

    /// Whether any cell about to be written holds a date
    fn needs_date_style(workbook: &Workbook, base: &XlsxPackage) -> bool {
        let is_date = |value: &CellValue| matches!(value, CellValue::Date(_));
        workbook.sheets().any(|sheet| {
            if base.sheet_part(sheet.name()).is_some() {
                sheet.edits().any(|(_, _, v)| is_date(v))
            } else {
                sheet.iter_cells().any(|(_, _, v)| is_date(v))
            }
        })
    }

    /// Find or create a short-date cell format, returning its index
    fn ensure_date_style(package: &mut XlsxPackage) -> XlsxResult<u32> {
        if let Some(part) = package.styles_part.clone() {
            let (patched, index) = ensure_date_xf(package.required_part(&part)?)?;
            if let Some(xml) = patched {
                package.set_part(&part, xml);
            }
            return Ok(index);
        }

        let workbook_part = package.workbook_part.clone();
        let part = resolve_target(&workbook_part, "styles.xml");
        log::debug!("package has no styles part; adding {}", part);

        package.set_part(&part, DEFAULT_STYLES_XML.as_bytes().to_vec());
        Self::add_relationship(
            package,
            &workbook_part,
            REL_TYPE_STYLES,
            &relative_target(&workbook_part, &part),
        )?;
        Self::add_content_type(package, &part, CT_STYLES)?;
        package.styles_part = Some(part);

        Ok(DEFAULT_DATE_XF)
    }

    /// Add a worksheet part for a sheet that only exists in memory
    fn append_sheet(package: &mut XlsxPackage, sheet: &Sheet, date_xf: Option<u32>) -> XlsxResult<()> {
        let workbook_part = package.workbook_part.clone();
        let part = package.next_sheet_part_name();

        package.set_part(&part, cells::write_new_worksheet(sheet, date_xf)?);

        let rel_id = Self::add_relationship(
            package,
            &workbook_part,
            REL_TYPE_WORKSHEET,
            &relative_target(&workbook_part, &part),
        )?;

        let workbook_xml = patch::add_sheet_entry(
            package.required_part(&workbook_part)?,
            sheet.name(),
            &rel_id,
        )?;
        package.set_part(&workbook_part, workbook_xml);

        Self::add_content_type(package, &part, CT_WORKSHEET)?;

        log::debug!("added sheet '{}' as {}", sheet.name(), part);
        package.sheets.push(SheetPart {
            name: sheet.name().to_string(),
            part,
        });
        Ok(())
    }

    fn add_relationship(
        package: &mut XlsxPackage,
        source_part: &str,
        rel_type: &str,
        target: &str,
    ) -> XlsxResult<String> {
        let rels_part = rels_part_for(source_part);
        let (xml, id) = patch::add_relationship(package.required_part(&rels_part)?, rel_type, target)?;
        package.set_part(&rels_part, xml);
        Ok(id)
    }

    fn add_content_type(package: &mut XlsxPackage, part: &str, content_type: &str) -> XlsxResult<()> {
        let xml = patch::add_override(
            package.required_part(CONTENT_TYPES_PART)?,
            &format!("/{}", part),
            content_type,
        )?;
        package.set_part(CONTENT_TYPES_PART, xml);
        Ok(())
    }

    /// Remove the calculation chain so spreadsheet applications rebuild it
    ///
    /// The chain lists formula cells; once one is overwritten with a value
    /// the stale entry makes Excel report the file as corrupt.
    fn drop_calc_chain(package: &mut XlsxPackage) -> XlsxResult<()> {
        let workbook_part = package.workbook_part.clone();
        let rels_part = rels_part_for(&workbook_part);
        let Some(rels_xml) = package.part(&rels_part) else {
            return Ok(());
        };

        let chain = parse_relationships(rels_xml)?
            .into_iter()
            .find(|r| r.rel_type == REL_TYPE_CALC_CHAIN)
            .map(|r| resolve_target(&workbook_part, &r.target));
        let Some(chain) = chain else {
            return Ok(());
        };

        let rels_xml = patch::remove_elements(rels_xml, b"Relationship", |e| {
            Ok(attr(e, b"Type")?.as_deref() == Some(REL_TYPE_CALC_CHAIN))
        })?;
        package.set_part(&rels_part, rels_xml);

        let content_types = patch::remove_override(
            package.required_part(CONTENT_TYPES_PART)?,
            &format!("/{}", chain),
        )?;
        package.set_part(CONTENT_TYPES_PART, content_types);

        package.remove_part(&chain);
        log::debug!("formula cells were overwritten; removed {}", chain);
        Ok(())
    }

    /// Package of a workbook without sheets, to which new sheets get appended
    fn skeleton() -> XlsxPackage {
        let mut package = XlsxPackage::default();
        package.workbook_part = "xl/workbook.xml".into();
        package.styles_part = Some("xl/styles.xml".into());

        package.set_part(
            CONTENT_TYPES_PART,
            br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
    <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
    <Default Extension="xml" ContentType="application/xml"/>
    <Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
    <Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>
</Types>"#
                .to_vec(),
        );

        package.set_part(
            "_rels/.rels",
            br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#
                .to_vec(),
        );

        package.set_part(
            "xl/workbook.xml",
            br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
    <sheets>
    </sheets>
</workbook>"#
                .to_vec(),
        );

        package.set_part(
            "xl/_rels/workbook.xml.rels",
            br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
</Relationships>"#
                .to_vec(),
        );

        package.set_part("xl/styles.xml", DEFAULT_STYLES_XML.as_bytes().to_vec());

        package
    }
}

/// Group a sheet's pending edits by row
fn row_edits(sheet: &Sheet) -> RowEdits<'_> {
    let mut rows = RowEdits::new();
    for (row, col, value) in sheet.edits() {
        rows.entry(row).or_default().push((col, value));
    }
    rows
}
