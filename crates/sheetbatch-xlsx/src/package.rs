//! The raw part layout of an xlsx file
//!
//! An [`XlsxPackage`] keeps every zip entry of a loaded file in its original
//! order together with the decompressed bytes, plus the few locations the
//! writer needs (workbook part, styles part, one worksheet part per sheet).

use std::io::{Read, Seek, Write};

use crate::error::{XlsxError, XlsxResult};

const MAX_PREALLOC: u64 = 1 << 20;

/// Buffer size to reserve for a part; the size in the zip directory is untrusted
fn initial_capacity(declared: u64) -> usize {
    declared.min(MAX_PREALLOC) as usize
}

/// Where a sheet's cells live inside the package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetPart {
    /// Tab name
    pub name: String,
    /// Zip entry of the worksheet XML (`xl/worksheets/sheet1.xml`)
    pub part: String,
}

/// All parts of an xlsx file, in zip order
#[derive(Debug, Clone, Default)]
pub struct XlsxPackage {
    parts: Vec<(String, Vec<u8>)>,
    pub(crate) workbook_part: String,
    pub(crate) styles_part: Option<String>,
    pub(crate) shared_strings_part: Option<String>,
    pub(crate) sheets: Vec<SheetPart>,
}

impl XlsxPackage {
    /// Read every entry of a zip archive
    pub fn from_zip<R: Read + Seek>(reader: R) -> XlsxResult<Self> {
        let mut archive = zip::ZipArchive::new(reader)?;
        let mut parts = Vec::with_capacity(archive.len());

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            let mut data = Vec::with_capacity(initial_capacity(file.size()));
            file.read_to_end(&mut data)?;
            parts.push((name, data));
        }

        Ok(Self {
            parts,
            ..Default::default()
        })
    }

    /// Write the package as a zip archive
    pub fn write_zip<W: Write + Seek>(&self, writer: W) -> XlsxResult<W> {
        let mut zip = zip::ZipWriter::new(writer);
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);

        for (name, data) in &self.parts {
            zip.start_file(name.as_str(), options)?;
            zip.write_all(data)?;
        }

        Ok(zip.finish()?)
    }

    /// Serialize to an in-memory zip
    pub fn to_bytes(&self) -> XlsxResult<Vec<u8>> {
        let cursor = self.write_zip(std::io::Cursor::new(Vec::new()))?;
        Ok(cursor.into_inner())
    }

    /// Names of all parts, in zip order
    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|(name, _)| name.as_str())
    }

    /// Bytes of a part
    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, data)| data.as_slice())
    }

    /// Bytes of a part that must exist
    pub(crate) fn required_part(&self, name: &str) -> XlsxResult<&[u8]> {
        self.part(name)
            .ok_or_else(|| XlsxError::MissingPart(name.to_string()))
    }

    pub fn contains_part(&self, name: &str) -> bool {
        self.parts.iter().any(|(n, _)| n == name)
    }

    /// Replace a part in place, or append it if new
    pub(crate) fn set_part(&mut self, name: &str, data: Vec<u8>) {
        match self.parts.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = data,
            None => self.parts.push((name.to_string(), data)),
        }
    }

    pub(crate) fn remove_part(&mut self, name: &str) -> bool {
        let before = self.parts.len();
        self.parts.retain(|(n, _)| n != name);
        self.parts.len() != before
    }

    /// The main workbook part (usually `xl/workbook.xml`)
    pub fn workbook_part(&self) -> &str {
        &self.workbook_part
    }

    /// Sheets with a cell grid, in tab order
    pub fn sheets(&self) -> &[SheetPart] {
        &self.sheets
    }

    /// Worksheet part backing the sheet called `name`
    pub fn sheet_part(&self, name: &str) -> Option<&str> {
        self.sheets
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.part.as_str())
    }

    /// Smallest `xl/worksheets/sheetN.xml` not yet taken
    pub(crate) fn next_sheet_part_name(&self) -> String {
        let dir = match self.workbook_part.rfind('/') {
            Some(idx) => &self.workbook_part[..=idx],
            None => "",
        };
        (1u32..)
            .map(|n| format!("{}worksheets/sheet{}.xml", dir, n))
            .find(|name| !self.contains_part(name))
            .unwrap_or_else(|| format!("{}worksheets/sheet.xml", dir))
    }
}
