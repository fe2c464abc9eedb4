//! Parser module for shlang scripts
//!
//! This module contains the lexer and parser for shlang scripts.

pub mod types;
pub mod lexer;
pub mod word_parser;
pub mod compound_parser;
pub mod command_parser;
pub mod parser;


// Re-exports
pub use types::{ParseError, ParseErrorKind, ParseLimits};
pub use lexer::{Lexer, Token, TokenCategory, TokenType};
pub use parser::{parse, Parser};
