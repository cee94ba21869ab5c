//! Prelude module - common imports for sheetbatch users
//!
//! ```rust
//! use sheetbatch::prelude::*;
//! ```

pub use crate::{
    // Data model
    CellBlock,
    CellValue,
    LabeledBlock,

    // Session types
    DocumentHandle,
    FlushManager,
    FlushResult,
    FlushStatus,
    ImmediateWriter,
    SessionOptions,
    SheetWriter,
    UpdateMode,
    Updater,
    WorkbookCache,

    // Error types
    Error,
    Result,
};
