//! FILENAME: core/parser/src/lexer.rs
//! PURPOSE: Scans a raw formula string and produces a stream of Tokens.
//! CONTEXT: This is the first stage of the parsing pipeline. It handles
//! whitespace skipping, number parsing (including exponents), and
//! identifiers that later become cell references.
//!
//! SUPPORTED OPERATORS:
//! - Single char: + - * / ( )

use crate::token::Token;
use std::iter::Peekable;
use std::str::Chars;

pub struct Lexer<'a> {
    input: Peekable<Chars<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input: input.chars().peekable(),
        }
    }

    /// Advances the lexer and returns the next token.
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        match self.input.next() {
            Some('+') => Token::Plus,
            Some('-') => Token::Minus,
            Some('*') => Token::Asterisk,
            Some('/') => Token::Slash,
            Some('(') => Token::LParen,
            Some(')') => Token::RParen,

            // Handle Numbers (starts with digit or dot)
            Some(ch) if ch.is_ascii_digit() || ch == '.' => self.read_number(ch),

            // Handle Identifiers (starts with letter)
            Some(ch) if ch.is_ascii_alphabetic() => self.read_identifier(ch),

            None => Token::EOF,

            Some(ch) => Token::Illegal(ch),
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(&ch) = self.input.peek() {
            if !ch.is_whitespace() {
                break;
            }
            self.input.next();
        }
    }

    fn read_number(&mut self, first_char: char) -> Token {
        let mut number_str = String::from(first_char);
        let mut has_dot = first_char == '.';

        while let Some(&ch) = self.input.peek() {
            if ch.is_ascii_digit() {
                number_str.push(ch);
                self.input.next();
            } else if ch == '.' && !has_dot {
                has_dot = true;
                number_str.push(ch);
                self.input.next();
            } else {
                break;
            }
        }

        if let Some(exponent) = self.read_exponent() {
            number_str.push_str(&exponent);
        }

        match number_str.parse::<f64>() {
            Ok(n) if n.is_finite() => Token::Number(n),
            // a lone "." or a literal that overflows, e.g. 1e999
            _ => Token::Illegal(first_char),
        }
    }

    /// Consumes an exponent suffix (`e5`, `E-2`, `e+10`) if one follows.
    /// Leaves the input untouched when the `e` is not followed by digits.
    fn read_exponent(&mut self) -> Option<String> {
        let mut probe = self.input.clone();
        let marker = probe.next().filter(|c| *c == 'e' || *c == 'E')?;

        let mut exponent = String::from(marker);
        if let Some(&sign) = probe.peek() {
            if sign == '+' || sign == '-' {
                exponent.push(sign);
                probe.next();
            }
        }

        let mut has_digits = false;
        while let Some(&ch) = probe.peek() {
            if !ch.is_ascii_digit() {
                break;
            }
            exponent.push(ch);
            probe.next();
            has_digits = true;
        }

        if !has_digits {
            return None;
        }
        self.input = probe;
        Some(exponent)
    }

    fn read_identifier(&mut self, first_char: char) -> Token {
        let mut ident = String::from(first_char);

        while let Some(&ch) = self.input.peek() {
            if ch.is_ascii_alphanumeric() {
                ident.push(ch);
                self.input.next();
            } else {
                break;
            }
        }

        Token::Identifier(ident.to_uppercase()) // Normalize to UPPERCASE
    }
}
