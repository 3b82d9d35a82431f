//! FILENAME: core/engine/src/error.rs
//! PURPOSE: Structural failures reported by sheet edits.
//! CONTEXT: Every variant is detected before the sheet is mutated, so an
//! `Err` always means the sheet is exactly as it was before the call.

use crate::position::Position;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SheetError {
    #[error("Invalid position ({}, {})", .0.row, .0.col)]
    InvalidPosition(Position),

    #[error("Circular dependency found with {0}")]
    CircularDependency(Position),

    #[error("Formula parse error: {0}")]
    FormulaParse(#[from] parser::ParseError),
}

pub type Result<T> = std::result::Result<T, SheetError>;
