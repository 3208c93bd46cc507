//! Frontend for the Vel language: lexer, AST, and parser.

pub mod ast;
pub mod lexer;
pub mod parser;

pub use parser::{parse, ParseOutcome};
