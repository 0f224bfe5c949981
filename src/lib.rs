//! ICL (Intent Compression Language) compiler.
//!
//! Authors write compact symbolic intent; the compiler translates it through
//! a deterministic pipeline into several target languages with equivalent
//! observable behavior. This crate provides the frontend (alias normalizer,
//! lexer, parser, macro expansion, semantic analysis), the backend (typed IR,
//! lowering, intent graph, language packs), and the CLI.

pub mod backend;
pub mod cli;
pub mod format;
pub mod frontend;
pub mod pipeline;

pub use frontend::ast;
pub use frontend::diagnostics;
pub use frontend::lexer;
pub use frontend::parser;
pub use frontend::semantic;

pub use backend::graph;
pub use backend::ir;
pub use backend::lower;
pub use backend::packs;
