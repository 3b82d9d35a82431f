//! FILENAME: core/parser/src/lib.rs
//! PURPOSE: Library root for the gridcalc formula parser.
//! CONTEXT: This crate exposes the lexer, parser, and AST components
//! needed to convert formula strings into expression trees. It knows
//! nothing about sheets; cell references stay in their syntactic form.
//!
//! PIPELINE: Formula String --> Lexer --> Tokens --> Parser --> AST
//!
//! SUPPORTED FEATURES:
//! - Arithmetic: +, -, *, /
//! - Unary plus and minus: -A1, +5
//! - Numbers: 1, 1.5, .5, 2e3, 2.5E-2
//! - Cell references: A1, AA100
//! - Parentheses for grouping
//! - Canonical printing with minimal parentheses (via `Display`)

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod token;


pub use ast::{BinaryOperator, CellRef, Expression, UnaryOperator};
pub use lexer::Lexer;
pub use parser::{parse, ParseError, ParseResult, Parser};
pub use token::Token;
