//! FILENAME: core/engine/src/position.rs
//! PURPOSE: Cell coordinates, their bounds, and A1-notation conversion.
//! CONTEXT: A `Position` is a 0-based (row, col) pair. It can represent
//! coordinates outside the sheet (a formula may name one), so validity is
//! a separate check that every Sheet entry point performs.
//! Column "A" = 0, "B" = 1, ..., "Z" = 25, "AA" = 26, etc.
//! Row 1 in A1 notation = row 0 internally.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of addressable rows; valid rows are `0..MAX_ROWS`.
pub const MAX_ROWS: i32 = 16384;
/// Number of addressable columns; valid columns are `0..MAX_COLS`.
pub const MAX_COLS: i32 = 16384;

const LETTERS: i32 = 26;

/// A cell coordinate with 0-based indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub row: i32,
    pub col: i32,
}

/// Dimensions of a rectangular area, in cells.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub rows: i32,
    pub cols: i32,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid cell position: {0:?}")]
pub struct PositionParseError(pub String);

impl Position {
    /// The canonical invalid position.
    pub const NONE: Position = Position { row: -1, col: -1 };

    pub const fn new(row: i32, col: i32) -> Self {
        Position { row, col }
    }

    /// True when both coordinates lie inside the sheet bounds.
    pub fn is_valid(&self) -> bool {
        (0..MAX_ROWS).contains(&self.row) && (0..MAX_COLS).contains(&self.col)
    }

    /// Converts the syntactic parts of a reference ("AA", 100) into a position.
    /// Coordinates too large to represent yield `Position::NONE`; anything
    /// representable is returned as-is, valid or not.
    pub fn from_a1_parts(col_str: &str, row_num: u32) -> Position {
        let col = match col_to_index(col_str) {
            Some(col) => col,
            None => return Position::NONE,
        };
        match i32::try_from(row_num) {
            Ok(row) if row >= 1 => Position::new(row - 1, col),
            _ => Position::NONE,
        }
    }
}

impl fmt::Display for Position {
    /// Renders A1 notation; invalid positions render as an empty string.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_valid() {
            return Ok(());
        }
        write!(f, "{}{}", index_to_col(self.col), self.row + 1)
    }
}

impl FromStr for Position {
    type Err = PositionParseError;

    /// Parses upper-case A1 notation ("B7"). Malformed or out-of-bound
    /// text is an error.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let split = s
            .find(|c: char| !c.is_ascii_uppercase())
            .ok_or_else(|| PositionParseError(s.to_string()))?;
        let (letters, digits) = s.split_at(split);

        if letters.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PositionParseError(s.to_string()));
        }

        let row: u32 = digits
            .parse()
            .map_err(|_| PositionParseError(s.to_string()))?;
        let pos = Position::from_a1_parts(letters, row);
        if pos.is_valid() {
            Ok(pos)
        } else {
            Err(PositionParseError(s.to_string()))
        }
    }
}

/// Converts a column string (e.g., "A", "AA", "ABC") to a 0-based column index.
/// "A" -> 0, "B" -> 1, ..., "Z" -> 25, "AA" -> 26, "AB" -> 27, etc.
///
/// Returns `None` for an empty string, non-letters, or a value that
/// overflows `i32`.
pub fn col_to_index(col_str: &str) -> Option<i32> {
    if col_str.is_empty() {
        return None;
    }
    let mut result: i32 = 0;
    for c in col_str.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let digit = (c.to_ascii_uppercase() as i32) - ('A' as i32) + 1;
        result = result.checked_mul(LETTERS)?.checked_add(digit)?;
    }
    Some(result - 1) // Convert to 0-based
}

/// Converts a 0-based column index to a column string.
/// 0 -> "A", 1 -> "B", ..., 25 -> "Z", 26 -> "AA", 27 -> "AB", etc.
/// Negative indices yield an empty string.
pub fn index_to_col(col_index: i32) -> String {
    if col_index < 0 {
        return String::new();
    }
    let mut col_index = col_index;
    let mut result = String::new();
    loop {
        let remainder = col_index % LETTERS;
        result.insert(0, (b'A' + remainder as u8) as char);
        if col_index < LETTERS {
            break;
        }
        col_index = col_index / LETTERS - 1;
    }
    result
}
