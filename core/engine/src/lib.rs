//! FILENAME: core/engine/src/lib.rs
//! PURPOSE: Main library entry point for the gridcalc spreadsheet engine.
//! CONTEXT: Re-exports public types and modules for use by host programs.
//! The engine is single-threaded: a `Sheet` is mutated through `&mut self`
//! and read through `&self`; callers sharing one across threads must wrap
//! it in a single lock.

pub mod cell;
pub mod error;
pub mod formula;
pub mod position;
pub mod sheet;
pub mod value;

/// Leading character that marks cell text as a formula.
pub const FORMULA_SIGN: char = '=';
/// Leading character that keeps text literal; it is dropped from the value.
pub const ESCAPE_SIGN: char = '\'';
/// Separator between columns in `print_values` / `print_texts` output.
pub const COLUMN_DELIMITER: char = '\t';

// Re-export commonly used types at the crate root
pub use cell::{Cell, CellContent};
pub use error::{Result, SheetError};
pub use formula::Formula;
pub use position::{Position, PositionParseError, Size, MAX_COLS, MAX_ROWS};
pub use sheet::{Sheet, SheetStats};
pub use value::{CellValue, FormulaError};
