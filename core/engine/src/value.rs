//! FILENAME: core/engine/src/value.rs
//! PURPOSE: The result of reading a cell and the error categories it may hold.
//! CONTEXT: Formula failures are ordinary values, not Rust errors: a
//! `CellValue::Error` propagates through any formula that reads it.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Represents the possible errors a formula can produce (e.g., #DIV/0!).
/// Equality compares only the category.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormulaError {
    /// A referenced position lies outside the sheet.
    #[error("#REF!")]
    Ref,
    /// A referenced cell holds text that is not a number.
    #[error("#VALUE!")]
    Value,
    /// Division by zero or any other non-finite arithmetic result.
    #[error("#DIV/0!")]
    Div0,
}

impl FormulaError {
    /// The canonical display string, e.g. `#REF!`.
    pub fn as_str(&self) -> &'static str {
        match self {
            FormulaError::Ref => "#REF!",
            FormulaError::Value => "#VALUE!",
            FormulaError::Div0 => "#DIV/0!",
        }
    }
}

/// Represents the calculated result of a cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Error(FormulaError),
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<FormulaError> for CellValue {
    fn from(err: FormulaError) -> Self {
        CellValue::Error(err)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Error(e) => f.write_str(e.as_str()),
        }
    }
}
