//! Cell-related types and utilities
//!
//! This module contains:
//! - [`CellValue`] - The value stored in a cell
//! - [`CellAddress`] - A cell's location (e.g., "D2")
//! - [`CellError`] - Error literals loaded from existing workbooks

mod address;
mod value;

pub use address::CellAddress;
pub use value::{
    excel_serial_to_datetime, datetime_to_excel_serial, CellError, CellValue, SharedString,
};
