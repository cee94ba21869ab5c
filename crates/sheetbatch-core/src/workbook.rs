//! Workbook type - the in-memory document

use crate::error::{Error, Result};
use crate::sheet::Sheet;
use crate::MAX_SHEET_NAME_LEN;

/// A workbook (spreadsheet document)
///
/// Sheets keep insertion order; new sheets are always appended so tab order
/// stays stable. A fresh workbook has no sheets at all.
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    sheets: Vec<Sheet>,
    /// Tab names taken by non-grid sheets (chartsheets, dialog sheets)
    reserved_names: Vec<String>,
}

impl Workbook {
    /// Create an empty workbook with no sheets
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of sheets
    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    /// Check if the workbook has no sheets
    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    /// Get a sheet by index
    pub fn sheet(&self, index: usize) -> Option<&Sheet> {
        self.sheets.get(index)
    }

    /// Get a sheet by exact (case-sensitive) name
    pub fn sheet_by_name(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name() == name)
    }

    /// Get a mutable sheet by exact (case-sensitive) name
    pub fn sheet_by_name_mut(&mut self, name: &str) -> Option<&mut Sheet> {
        self.sheets.iter_mut().find(|s| s.name() == name)
    }

    /// Get the index of a sheet by exact name
    pub fn sheet_index(&self, name: &str) -> Option<usize> {
        self.sheets.iter().position(|s| s.name() == name)
    }

    /// Sheet names in tab order
    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name().to_string()).collect()
    }

    /// Iterate over all sheets in tab order
    pub fn sheets(&self) -> impl Iterator<Item = &Sheet> {
        self.sheets.iter()
    }

    /// Iterate over all sheets mutably
    pub fn sheets_mut(&mut self) -> impl Iterator<Item = &mut Sheet> {
        self.sheets.iter_mut()
    }

    /// Append a new empty sheet
    pub fn add_sheet(&mut self, name: &str) -> Result<usize> {
        self.validate_sheet_name(name)?;

        let index = self.sheets.len();
        self.sheets.push(Sheet::new(name));
        Ok(index)
    }

    /// Get the sheet called `name`, appending it if absent
    pub fn sheet_or_insert(&mut self, name: &str) -> Result<&mut Sheet> {
        let index = match self.sheet_index(name) {
            Some(index) => index,
            None => self.add_sheet(name)?,
        };
        Ok(&mut self.sheets[index])
    }

    /// Mark a tab name as taken by a sheet that holds no cell grid
    ///
    /// Reserved names never resolve to a [`Sheet`], and creating a sheet with
    /// one of them fails with [`Error::DuplicateSheetName`].
    pub fn reserve_sheet_name(&mut self, name: &str) {
        self.reserved_names.push(name.to_string());
    }

    /// Whether any sheet holds unpersisted edits
    pub fn has_edits(&self) -> bool {
        self.sheets.iter().any(Sheet::has_edits)
    }

    /// Forget pending edits on every sheet
    pub fn clear_edits(&mut self) {
        self.sheets.iter_mut().for_each(Sheet::clear_edits);
    }

    /// Validate a name for a new sheet
    ///
    /// Lookups are case-sensitive, but spreadsheet applications reject two
    /// tabs that differ only by case, so those count as duplicates here.
    fn validate_sheet_name(&self, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(Error::InvalidSheetName("Sheet name cannot be empty".into()));
        }
        if name.chars().count() > MAX_SHEET_NAME_LEN {
            return Err(Error::InvalidSheetName(format!(
                "Sheet name too long (max {} characters)",
                MAX_SHEET_NAME_LEN
            )));
        }

        const INVALID_CHARS: &[char] = &[':', '\\', '/', '?', '*', '[', ']'];
        if let Some(c) = INVALID_CHARS.iter().find(|c| name.contains(**c)) {
            return Err(Error::InvalidSheetName(format!(
                "Sheet name cannot contain '{}'",
                c
            )));
        }

        let name_lower = name.to_lowercase();
        let taken = self
            .sheets
            .iter()
            .map(Sheet::name)
            .chain(self.reserved_names.iter().map(String::as_str));
        if taken.into_iter().any(|n| n.to_lowercase() == name_lower) {
            return Err(Error::DuplicateSheetName(name.into()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_workbook_is_empty() {
        let wb = Workbook::new();
        assert_eq!(wb.sheet_count(), 0);
        assert!(wb.is_empty());
    }

    #[test]
    fn test_sheet_or_insert_appends() {
        let mut wb = Workbook::new();
        wb.add_sheet("Existing").unwrap();

        wb.sheet_or_insert("LDZ demand").unwrap();
        wb.sheet_or_insert("Multiticker").unwrap();
        wb.sheet_or_insert("LDZ demand").unwrap();

        assert_eq!(
            wb.sheet_names(),
            vec!["Existing", "LDZ demand", "Multiticker"]
        );
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        let mut wb = Workbook::new();
        wb.add_sheet("Data").unwrap();

        assert!(wb.sheet_by_name("Data").is_some());
        assert!(wb.sheet_by_name("data").is_none());
        assert!(matches!(
            wb.sheet_or_insert("DATA"),
            Err(Error::DuplicateSheetName(_))
        ));
    }

    #[test]
    fn test_reserved_names_block_new_sheets() {
        let mut wb = Workbook::new();
        wb.reserve_sheet_name("Chart1");

        assert!(wb.sheet_by_name("Chart1").is_none());
        assert!(matches!(
            wb.sheet_or_insert("chart1"),
            Err(Error::DuplicateSheetName(_))
        ));
    }

    #[test]
    fn test_invalid_sheet_name() {
        let mut wb = Workbook::new();

        assert!(wb.add_sheet("").is_err());
        assert!(wb.add_sheet("Sheet/1").is_err());
        assert!(wb.add_sheet("Sheet:1").is_err());
        assert!(wb.add_sheet("Sheet[1]").is_err());

        let long_name = "A".repeat(MAX_SHEET_NAME_LEN + 1);
        assert!(wb.add_sheet(&long_name).is_err());
        assert!(wb.add_sheet(&"Ä".repeat(MAX_SHEET_NAME_LEN)).is_ok());
    }
}
