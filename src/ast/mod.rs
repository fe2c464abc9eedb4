//! Abstract Syntax Tree (AST) for shlang
//!
//! This module defines the tree the parser produces, position-independent
//! structural equality over it, and its canonical source rendering.
//!
//! Architecture:
//!   Input → Lexer → Parser → AST → (evaluator, outside this crate)

pub mod display;
pub mod equality;
pub mod types;

pub use equality::{CmpMode, Comparer, Mismatch, StructuralEq};
