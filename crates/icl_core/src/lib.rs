//! Provide shared, pure language vocabulary for the ICL compiler.
//!
//! This crate is intentionally small and dependency-light. It contains the
//! deterministic tables and type rules that both the compiler pipeline and
//! external tooling rely on:
//!
//! - the symbolic type lattice ([`types::SymType`]) with its compatibility rule,
//! - the closed feature-id vocabulary used by pack coverage matrices ([`features`]),
//! - the natural-alias catalog consumed by the alias normalizer ([`aliases`]).
//!
//! ## Notes
//!
//! - This is a "semantic core" crate: **no IO**, no global state, and no
//!   compiler-specific node types.
//! - Every table here is insertion-ordered or sorted so downstream artifacts
//!   stay byte-stable.

pub mod aliases;
pub mod features;
pub mod types;
