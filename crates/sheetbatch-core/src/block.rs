//! Rectangular value blocks destined for a sheet region

use chrono::{NaiveDate, NaiveDateTime};

use crate::cell::CellValue;
use crate::error::{Error, Result};
use crate::{MAX_COLS, MAX_ROWS};

/// A rectangular batch of values plus the 1-based origin it is written to
///
/// Construction validates the shape, so a `CellBlock` is always rectangular,
/// non-empty and fits inside the sheet limits.
#[derive(Debug, Clone, PartialEq)]
pub struct CellBlock {
    values: Vec<Vec<CellValue>>,
    origin_row: u32,
    origin_col: u32,
}

impl CellBlock {
    /// Create a block whose top-left cell lands on `(origin_row, origin_col)`
    ///
    /// # Errors
    /// - [`Error::ShapeMismatch`] for zero rows, zero columns or ragged rows
    /// - [`Error::InvalidOrigin`] when either origin coordinate is 0
    /// - [`Error::OutOfBounds`] when the block would pass row 1,048,576 or column XFD
    /// - [`Error::UnsupportedDate`] for dates before 1900-01-01
    ///
    /// NaN and infinite numbers have no cell representation and become
    /// [`CellValue::Empty`].
    pub fn new(mut values: Vec<Vec<CellValue>>, origin_row: u32, origin_col: u32) -> Result<Self> {
        if origin_row < 1 || origin_col < 1 {
            return Err(Error::InvalidOrigin {
                row: origin_row,
                col: origin_col,
            });
        }

        let row_count = values.len();
        let col_count = values.first().map_or(0, Vec::len);
        if row_count == 0 || col_count == 0 {
            return Err(Error::ShapeMismatch(format!(
                "block must have at least one row and one column (got {}x{})",
                row_count, col_count
            )));
        }
        if let Some((i, row)) = values
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != col_count)
        {
            return Err(Error::ShapeMismatch(format!(
                "row {} has {} values, expected {}",
                i,
                row.len(),
                col_count
            )));
        }

        let end_row = origin_row as u64 + row_count as u64 - 1;
        let end_col = origin_col as u64 + col_count as u64 - 1;
        if end_row > MAX_ROWS as u64 || end_col > MAX_COLS as u64 {
            return Err(Error::OutOfBounds {
                row: end_row,
                col: end_col,
                max_row: MAX_ROWS,
                max_col: MAX_COLS,
            });
        }

        for value in values.iter_mut().flatten() {
            match value {
                CellValue::Number(n) if !n.is_finite() => *value = CellValue::Empty,
                CellValue::Date(dt) if *dt < first_excel_date() => {
                    return Err(Error::UnsupportedDate(dt.to_string()));
                }
                _ => {}
            }
        }

        Ok(Self {
            values,
            origin_row,
            origin_col,
        })
    }

    /// Build a block from anything convertible into [`CellValue`]
    pub fn from_rows<T, R>(rows: R, origin_row: u32, origin_col: u32) -> Result<Self>
    where
        T: Into<CellValue>,
        R: IntoIterator,
        R::Item: IntoIterator<Item = T>,
    {
        let values = rows
            .into_iter()
            .map(|row| row.into_iter().map(Into::into).collect())
            .collect();
        Self::new(values, origin_row, origin_col)
    }

    /// A single column of values starting at `(origin_row, origin_col)`
    pub fn column(values: Vec<CellValue>, origin_row: u32, origin_col: u32) -> Result<Self> {
        Self::new(
            values.into_iter().map(|v| vec![v]).collect(),
            origin_row,
            origin_col,
        )
    }

    /// A single row of values starting at `(origin_row, origin_col)`
    pub fn row(values: Vec<CellValue>, origin_row: u32, origin_col: u32) -> Result<Self> {
        Self::new(vec![values], origin_row, origin_col)
    }

    pub fn values(&self) -> &[Vec<CellValue>] {
        &self.values
    }

    pub fn row_count(&self) -> u32 {
        self.values.len() as u32
    }

    pub fn col_count(&self) -> u32 {
        self.values.first().map_or(0, Vec::len) as u32
    }

    pub fn origin_row(&self) -> u32 {
        self.origin_row
    }

    pub fn origin_col(&self) -> u32 {
        self.origin_col
    }

    /// Last row covered by the block (inclusive)
    pub fn end_row(&self) -> u32 {
        self.origin_row + self.row_count() - 1
    }

    /// Last column covered by the block (inclusive)
    pub fn end_col(&self) -> u32 {
        self.origin_col + self.col_count() - 1
    }

    /// Iterate over `(row, col, value)` in sheet coordinates, row-major
    pub fn iter(&self) -> impl Iterator<Item = (u32, u32, &CellValue)> + '_ {
        self.values.iter().enumerate().flat_map(move |(i, row)| {
            row.iter().enumerate().map(move |(j, value)| {
                (self.origin_row + i as u32, self.origin_col + j as u32, value)
            })
        })
    }

    /// Whether `(row, col)` falls inside the block footprint
    pub fn contains(&self, row: u32, col: u32) -> bool {
        (self.origin_row..=self.end_row()).contains(&row)
            && (self.origin_col..=self.end_col()).contains(&col)
    }
}

/// Dates earlier than this have no 1900-system serial
fn first_excel_date() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1900, 1, 1)
        .unwrap_or(NaiveDate::MIN)
        .and_time(chrono::NaiveTime::MIN)
}

/// A block body with optional row labels and column headers
///
/// Row labels go into the column just left of the body (one per body row).
/// Column headers go into row 1 above the body columns; date headers are
/// rendered as `dd-mm-YYYY` text.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledBlock {
    body: CellBlock,
    row_labels: Option<Vec<CellValue>>,
    column_headers: Option<Vec<CellValue>>,
}

impl LabeledBlock {
    pub fn new(body: CellBlock) -> Self {
        Self {
            body,
            row_labels: None,
            column_headers: None,
        }
    }

    /// Attach one label per body row
    pub fn with_row_labels(mut self, labels: Vec<CellValue>) -> Result<Self> {
        if labels.len() != self.body.row_count() as usize {
            return Err(Error::LabelMismatch(format!(
                "{} row labels for {} rows",
                labels.len(),
                self.body.row_count()
            )));
        }
        if self.body.origin_col() < 2 {
            return Err(Error::InvalidOrigin {
                row: self.body.origin_row(),
                col: 0,
            });
        }
        self.row_labels = Some(labels);
        Ok(self)
    }

    /// Attach one header per body column
    pub fn with_column_headers(mut self, headers: Vec<CellValue>) -> Result<Self> {
        if headers.len() != self.body.col_count() as usize {
            return Err(Error::LabelMismatch(format!(
                "{} column headers for {} columns",
                headers.len(),
                self.body.col_count()
            )));
        }
        self.column_headers = Some(headers);
        Ok(self)
    }

    pub fn body(&self) -> &CellBlock {
        &self.body
    }

    /// Expand into plain blocks, in the order they must be applied
    pub fn into_blocks(self) -> Result<Vec<CellBlock>> {
        let mut blocks = Vec::with_capacity(3);
        let origin_row = self.body.origin_row();
        let origin_col = self.body.origin_col();

        if let Some(labels) = self.row_labels {
            blocks.push(CellBlock::column(labels, origin_row, origin_col - 1)?);
        }
        blocks.push(self.body);
        if let Some(headers) = self.column_headers {
            let headers = headers.into_iter().map(header_value).collect();
            blocks.push(CellBlock::row(headers, 1, origin_col)?);
        }

        Ok(blocks)
    }
}

fn header_value(value: CellValue) -> CellValue {
    match value {
        CellValue::Date(d) => CellValue::text(d.format("%d-%m-%Y").to_string()),
        other => other,
    }
}
