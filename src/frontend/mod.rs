//! Compiler frontend: source text to analyzed AST.
//!
//! Stages run strictly forward: optional alias normalization, lexing,
//! parsing, macro expansion, then semantic analysis. Each stage consumes the
//! prior stage's frozen output and reports failures as structured
//! diagnostics.

pub mod alias;
pub mod ast;
pub mod diagnostics;
pub mod lexer;
pub mod macros;
pub mod parser;
pub mod semantic;
pub mod symbols;
