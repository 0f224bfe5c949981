//! Compiler backend: analyzed AST to per-target artifacts.
//!
//! The IR builder produces a typed, target-agnostic tree with stable ids;
//! lowering reshapes it per target under the pack's feature-coverage gate;
//! packs emit and scaffold the final bundles. The intent graph and graph
//! optimizer serve the explain/diff surfaces.

pub mod contract;
pub mod graph;
pub mod ir;
pub mod lower;
pub mod optimize;
pub mod packs;
