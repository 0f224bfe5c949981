//! Feature gating and per-target failure isolation.

use icl::backend::packs::registry::default_registry;
use icl::pipeline::{self, CompileOptions};

fn options() -> CompileOptions {
    CompileOptions::default()
}

#[test]
fn declared_false_feature_fails_with_low001() {
    let packs = default_registry();
    for (source, feature) in [
        ("v:Num := 1;", "typed_annotation"),
        ("ok := true && false;", "logic"),
        ("fn f(n) { ret n; } x := @f(1);", "at_call"),
        ("f := lam(a) => a;", "lambda"),
    ] {
        let failure = pipeline::compile_source(source, "typescript", &options(), &packs)
            .expect_err("typescript declares this feature false");
        assert_eq!(failure.diagnostics.len(), 1);
        assert_eq!(failure.diagnostics[0].code, "LOW001");
        assert!(
            failure.diagnostics[0].message.contains(feature),
            "expected {feature} in: {}",
            failure.diagnostics[0].message
        );
        assert!(failure.diagnostics[0]
            .message
            .contains("typescript"));
    }
}

#[test]
fn gate_failure_produces_no_artifact() {
    let packs = default_registry();
    let outcome = pipeline::compile_targets(
        "v:Num := 1;",
        &["typescript".to_string()],
        &options(),
        &packs,
    )
    .expect("front half succeeds");
    assert!(outcome.targets["typescript"].is_err());
}

#[test]
fn sibling_targets_survive_one_target_failure() {
    let packs = default_registry();
    let targets = vec![
        "python".to_string(),
        "typescript".to_string(),
        "js".to_string(),
        "rust".to_string(),
    ];
    let outcome = pipeline::compile_targets("v:Num := 1; @print(v);", &targets, &options(), &packs)
        .expect("front half succeeds");

    assert!(outcome.targets["python"].is_ok());
    assert!(outcome.targets["js"].is_ok());
    assert!(outcome.targets["rust"].is_ok());
    let errors = outcome.targets["typescript"]
        .as_ref()
        .expect_err("typescript fails the gate");
    assert_eq!(errors[0].code, "LOW001");
}

#[test]
fn stable_targets_accept_the_full_feature_set() {
    let packs = default_registry();
    let source = "v:Num := 1; ok := true && !false; fn f(n:Num):Num => n; x := @f(v); \
                  g := lam(a:Num):Num => a + 1; if ok ? { @print(x); } loop i in 0..2 { @print(i); }";
    for target in ["python", "js", "rust", "web"] {
        pipeline::compile_source(source, target, &options(), &packs)
            .unwrap_or_else(|failure| {
                panic!("{target} rejected core features: {:?}", failure.diagnostics)
            });
    }
}

#[test]
fn absent_coverage_entries_gate_like_declared_false() {
    // Only an explicit `true` admits a feature; an id missing from the
    // coverage map fails the gate the same way a declared `false` does.
    let packs = default_registry();
    let mut manifest = packs
        .get("python")
        .expect("python pack")
        .manifest()
        .clone();
    manifest.feature_coverage.remove("loop");

    let front = pipeline::check_source("sum := 0; loop i in 0..3 { sum := sum + i; }", &options())
        .expect("front half succeeds");
    let error = icl::lower::lower(&front.ir, &manifest).expect_err("absent entry must gate");
    assert_eq!(error.code, "LOW001");
    assert!(error.message.contains("loop"));
}

#[test]
fn fallback_substitution_reports_low003_beside_artifact() {
    let packs = default_registry();
    let artifacts = pipeline::compile_source("print(1);", "ruby", &options(), &packs)
        .expect("ruby compiles plain print calls");
    assert_eq!(artifacts.artifact.diagnostics.len(), 1);
    assert_eq!(artifacts.artifact.diagnostics[0].code, "LOW003");
    assert!(artifacts.artifact.code.contains("print(1);"));
}
