//! Golden emission tests.
//!
//! Each fixture under `tests/golden/` holds an `.icl` source plus the
//! expected emission per target. Byte-for-byte comparison keeps emitter
//! changes reviewed and intentional.

use std::fs;

use icl::backend::packs::registry::default_registry;
use icl::pipeline::{self, CompileOptions};

fn load(name: &str) -> String {
    let path = format!("tests/golden/{name}");
    fs::read_to_string(&path).unwrap_or_else(|_| panic!("failed to read fixture {path}"))
}

fn emit(source: &str, target: &str) -> String {
    let packs = default_registry();
    pipeline::compile_source(source, target, &CompileOptions::default(), &packs)
        .unwrap_or_else(|failure| panic!("compile failed for {target}: {:?}", failure.diagnostics))
        .artifact
        .code
}

fn assert_golden(name: &str, target: &str, extension: &str) {
    let source = load(&format!("{name}.icl"));
    let expected = load(&format!("{name}.{extension}"));
    let actual = emit(&source, target);
    assert_eq!(
        actual, expected,
        "emission drifted for {name} on target {target}"
    );
}

#[test]
fn factorial_python() {
    assert_golden("factorial", "python", "py");
}

#[test]
fn factorial_js() {
    assert_golden("factorial", "js", "js");
}

#[test]
fn factorial_rust() {
    assert_golden("factorial", "rust", "rs");
}

#[test]
fn loop_sum_python() {
    assert_golden("loop_sum", "python", "py");
}

#[test]
fn loop_sum_js() {
    assert_golden("loop_sum", "js", "js");
}

#[test]
fn loop_sum_rust() {
    assert_golden("loop_sum", "rust", "rs");
}

#[test]
fn function_chain_python() {
    assert_golden("function_chain", "python", "py");
}

#[test]
fn function_chain_js() {
    assert_golden("function_chain", "js", "js");
}

#[test]
fn function_chain_rust() {
    assert_golden("function_chain", "rust", "rs");
}

#[test]
fn logic_gate_web_bundle() {
    let source = load("logic_gate.icl");
    let expected = load("logic_gate.app.js");
    let packs = default_registry();
    let artifacts = pipeline::compile_source(&source, "web", &CompileOptions::default(), &packs)
        .expect("web compile should succeed");
    assert_eq!(artifacts.artifact.bundle.files["app.js"], expected);
    assert_eq!(artifacts.artifact.bundle.primary_path, "app.js");
}
