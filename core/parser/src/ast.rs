//! FILENAME: core/parser/src/ast.rs
//! PURPOSE: Defines the Abstract Syntax Tree (AST) for formula expressions.
//! CONTEXT: After the Lexer tokenizes a formula string, the Parser converts
//! those tokens into this tree structure. The engine walks the tree to
//! compute a value, and `Display` prints it back in canonical form.
//!
//! SUPPORTED EXPRESSIONS:
//! - Number literals
//! - Cell references: A1, AA100
//! - Binary operations: +, -, *, /
//! - Unary operations: +, -
//!
//! CANONICAL FORM:
//! No whitespace, upper-case references, and only the parentheses the
//! tree needs. Printing is a fixed point: print, re-parse, print again
//! gives the same text.

use std::fmt;

/// Represents a parsed formula expression.
#[derive(Debug, PartialEq, Clone)]
pub enum Expression {
    /// A numeric literal.
    Number(f64),

    /// A single cell reference like A1 or AA100.
    CellRef(CellRef),

    /// A binary operation: left op right (e.g., 5 + 3, A1 * B2).
    BinaryOp {
        left: Box<Expression>,
        op: BinaryOperator,
        right: Box<Expression>,
    },

    /// A unary operation: op operand (e.g., -5).
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expression>,
    },
}

/// A cell reference in its syntactic form.
/// The column is stored as upper-case letters ("A", "AA") and the row
/// is 1-indexed, exactly as written. Bounds are not checked here.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct CellRef {
    pub col: String,
    pub row: u32,
}

/// Binary operators for expressions.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum BinaryOperator {
    Add,      // +
    Subtract, // -
    Multiply, // *
    Divide,   // /
}

/// Unary operators.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum UnaryOperator {
    Plus,   // +
    Negate, // -
}

const PRECEDENCE_ADDITIVE: u8 = 1;
const PRECEDENCE_MULTIPLICATIVE: u8 = 2;
const PRECEDENCE_UNARY: u8 = 3;
const PRECEDENCE_ATOM: u8 = 4;

impl BinaryOperator {
    fn precedence(self) -> u8 {
        match self {
            BinaryOperator::Add | BinaryOperator::Subtract => PRECEDENCE_ADDITIVE,
            BinaryOperator::Multiply | BinaryOperator::Divide => PRECEDENCE_MULTIPLICATIVE,
        }
    }

    /// `a - (b - c)` differs from `a - b - c`; the same holds for `/`.
    fn is_right_sensitive(self) -> bool {
        matches!(self, BinaryOperator::Subtract | BinaryOperator::Divide)
    }
}

impl Expression {
    fn precedence(&self) -> u8 {
        match self {
            Expression::Number(_) | Expression::CellRef(_) => PRECEDENCE_ATOM,
            Expression::BinaryOp { op, .. } => op.precedence(),
            Expression::UnaryOp { .. } => PRECEDENCE_UNARY,
        }
    }

    /// Returns every cell reference in left-to-right source order.
    /// Duplicates are kept.
    pub fn cell_refs(&self) -> Vec<&CellRef> {
        let mut refs = Vec::new();
        self.collect_cell_refs(&mut refs);
        refs
    }

    fn collect_cell_refs<'a>(&'a self, refs: &mut Vec<&'a CellRef>) {
        match self {
            Expression::Number(_) => {}
            Expression::CellRef(cell) => refs.push(cell),
            Expression::BinaryOp { left, right, .. } => {
                left.collect_cell_refs(refs);
                right.collect_cell_refs(refs);
            }
            Expression::UnaryOp { operand, .. } => operand.collect_cell_refs(refs),
        }
    }
}

fn write_operand(f: &mut fmt::Formatter<'_>, expr: &Expression, parenthesize: bool) -> fmt::Result {
    if parenthesize {
        write!(f, "({})", expr)
    } else {
        write!(f, "{}", expr)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Number(n) => write!(f, "{}", n),
            Expression::CellRef(cell) => write!(f, "{}", cell),
            Expression::BinaryOp { left, op, right } => {
                let parent = op.precedence();
                write_operand(f, left, left.precedence() < parent)?;
                write!(f, "{}", op)?;
                let wrap_right = right.precedence() < parent
                    || (right.precedence() == parent && op.is_right_sensitive());
                write_operand(f, right, wrap_right)
            }
            Expression::UnaryOp { op, operand } => {
                write!(f, "{}", op)?;
                write_operand(f, operand, matches!(**operand, Expression::BinaryOp { .. }))
            }
        }
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.col, self.row)
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinaryOperator::Add => write!(f, "+"),
            BinaryOperator::Subtract => write!(f, "-"),
            BinaryOperator::Multiply => write!(f, "*"),
            BinaryOperator::Divide => write!(f, "/"),
        }
    }
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOperator::Plus => write!(f, "+"),
            UnaryOperator::Negate => write!(f, "-"),
        }
    }
}
