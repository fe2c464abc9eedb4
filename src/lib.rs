//! shlang - lexer, parser and syntax tree for the shlang shell language
//!
//! This library turns shlang source text into a [`Tree`] that an evaluator
//! can walk. It does not execute anything.
//!
//! ```
//! use shlang::{parse, Node};
//!
//! let tree = parse("example", "out <= ls | wc -l").unwrap();
//! assert!(matches!(tree.nodes()[0], Node::ExecAssign(_)));
//! ```

pub mod ast;
pub mod parser;

pub use ast::types::*;
pub use ast::{CmpMode, Mismatch, StructuralEq};
pub use parser::{parse, ParseError, ParseErrorKind, ParseLimits, Parser};
