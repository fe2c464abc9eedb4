//! Parser Types and Constants
//!
//! Shared types, limits, and token helpers used across parser modules.

use serde::Serialize;
use thiserror::Error;

use crate::ast::types::Pos;
use crate::parser::lexer::TokenType;

// Parser limits to prevent hangs and resource exhaustion
pub const MAX_INPUT_SIZE: usize = 10_000_000; // 10MB max input
pub const MAX_PARSER_DEPTH: usize = 200; // Max nesting of blocks and lists

/// Resource limits applied to a single parse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseLimits {
    pub max_input_size: usize,
    pub max_depth: usize,
}

impl Default for ParseLimits {
    fn default() -> Self {
        Self {
            max_input_size: MAX_INPUT_SIZE,
            max_depth: MAX_PARSER_DEPTH,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParseErrorKind {
    /// Malformed token: unterminated string, bad `$`, stray character
    Lexical,
    /// Unexpected token
    Syntax,
    /// A node rejected its parts
    Construction,
    /// Input size or nesting limit exceeded
    Limit,
}

/// The first problem found while parsing. No tree is produced.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{name}:{line}:{column}: {message}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    /// Label of the parsed source
    pub name: String,
    pub pos: Pos,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(
        kind: ParseErrorKind,
        name: &str,
        source: &str,
        pos: Pos,
        message: impl Into<String>,
    ) -> Self {
        let (line, column) = line_column(source, pos);
        Self {
            kind,
            name: name.to_string(),
            pos,
            line,
            column,
            message: message.into(),
        }
    }
}

/// 1-based line and column (in characters) of a byte offset.
///
/// Offsets past the end, or inside a multi-byte character, are clamped.
pub fn line_column(source: &str, pos: Pos) -> (usize, usize) {
    let mut offset = pos.offset().min(source.len());
    while !source.is_char_boundary(offset) {
        offset -= 1;
    }
    let before = &source[..offset];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
    let column = before[line_start..].chars().count() + 1;
    (line, column)
}

/// Check if a token type can start a value (`word` operand)
pub fn is_value_token(t: TokenType) -> bool {
    matches!(
        t,
        TokenType::Arg | TokenType::Ident | TokenType::Number | TokenType::String | TokenType::Variable
    )
}

/// Check if a token type is a redirection operator
pub fn is_redirection_token(t: TokenType) -> bool {
    matches!(t, TokenType::Gt | TokenType::Lt)
}

/// Check if a token type ends a statement without being consumed by it
pub fn is_statement_end(t: TokenType) -> bool {
    matches!(t, TokenType::Semicolon | TokenType::RBrace | TokenType::Eof)
}
