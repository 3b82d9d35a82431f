//! FILENAME: core/engine/src/formula.rs
//! PURPOSE: Evaluates parsed formulas against a cell-value resolver.
//! CONTEXT: This is the engine side of the formula collaborator. The parser
//! crate produces the AST; this module maps its references to positions,
//! walks the tree with IEEE f64 arithmetic, and renders it canonically.
//! Cells never see the AST directly, only the four operations below.

use crate::position::Position;
use crate::value::FormulaError;
use parser::{BinaryOperator, Expression, ParseResult, UnaryOperator};
use smallvec::SmallVec;

/// A parsed formula together with the positions it reads.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    expression: Expression,
    /// De-duplicated, in first-seen source order. May hold out-of-bound positions.
    referenced: SmallVec<[Position; 4]>,
}

impl Formula {
    /// Parses formula text (without the leading formula sigil).
    pub fn parse(text: &str) -> ParseResult<Formula> {
        let expression = parser::parse(text)?;

        let mut referenced: SmallVec<[Position; 4]> = SmallVec::new();
        for cell in expression.cell_refs() {
            let pos = Position::from_a1_parts(&cell.col, cell.row);
            if !referenced.contains(&pos) {
                referenced.push(pos);
            }
        }

        Ok(Formula {
            expression,
            referenced,
        })
    }

    /// Computes the formula. `resolve` supplies the numeric value of each
    /// referenced position; the first error it returns aborts evaluation
    /// and is returned unchanged.
    pub fn evaluate<F>(&self, mut resolve: F) -> Result<f64, FormulaError>
    where
        F: FnMut(Position) -> Result<f64, FormulaError>,
    {
        eval(&self.expression, &mut resolve)
    }

    /// Positions this formula reads, without duplicates.
    pub fn referenced_cells(&self) -> &[Position] {
        &self.referenced
    }

    /// Canonical text of the formula, without the formula sigil.
    pub fn expression(&self) -> String {
        self.expression.to_string()
    }
}

fn eval<F>(expr: &Expression, resolve: &mut F) -> Result<f64, FormulaError>
where
    F: FnMut(Position) -> Result<f64, FormulaError>,
{
    let result = match expr {
        Expression::Number(n) => *n,
        Expression::CellRef(cell) => resolve(Position::from_a1_parts(&cell.col, cell.row))?,
        Expression::BinaryOp { left, op, right } => {
            let l = eval(left, resolve)?;
            let r = eval(right, resolve)?;
            match op {
                BinaryOperator::Add => l + r,
                BinaryOperator::Subtract => l - r,
                BinaryOperator::Multiply => l * r,
                BinaryOperator::Divide => l / r,
            }
        }
        Expression::UnaryOp { op, operand } => {
            let v = eval(operand, resolve)?;
            match op {
                UnaryOperator::Plus => v,
                UnaryOperator::Negate => -v,
            }
        }
    };

    // x/0, overflow to infinity and NaN all surface as #DIV/0!
    if result.is_finite() {
        Ok(result)
    } else {
        Err(FormulaError::Div0)
    }
}

/// Coerces cell text to a number for use inside a formula.
/// Empty text is zero; text made only of digits and dots that parses as a
/// number is that number; anything else is `#VALUE!`.
pub fn coerce_text(text: &str) -> Result<f64, FormulaError> {
    if text.is_empty() {
        return Ok(0.0);
    }
    if !text.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return Err(FormulaError::Value);
    }
    text.parse::<f64>().map_err(|_| FormulaError::Value)
}
