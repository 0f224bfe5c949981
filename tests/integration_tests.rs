//! End-to-end pipeline tests: source in, per-target artifacts out.

use std::process::Command;

use icl::backend::packs::registry::default_registry;
use icl::pipeline::{self, CompileOptions};

fn options() -> CompileOptions {
    CompileOptions::default()
}

fn compile(source: &str, target: &str) -> String {
    let packs = default_registry();
    pipeline::compile_source(source, target, &options(), &packs)
        .unwrap_or_else(|failure| panic!("compile failed for {target}: {:?}", failure.diagnostics))
        .artifact
        .code
}

// ============================================================================
// Spec scenarios
// ============================================================================

#[test]
fn arithmetic_assignment_across_targets() {
    assert_eq!(compile("x := 1 + 2;", "python"), "x = (1 + 2)\n");
    assert_eq!(compile("x := 1 + 2;", "js"), "let x = (1 + 2);\n");
    assert_eq!(
        compile("x := 1 + 2;", "rust"),
        "fn main() {\n    let mut x: f64 = (1.0 + 2.0);\n}\n"
    );
}

#[test]
fn conditional_branches_declare_per_branch() {
    assert_eq!(
        compile("if true ? { x := 1; } : { x := 2; }", "python"),
        "if True:\n    x = 1\nelse:\n    x = 2\n"
    );
    assert_eq!(
        compile("if true ? { x := 1; } : { x := 2; }", "js"),
        "if (true) {\n    let x = 1;\n} else {\n    let x = 2;\n}\n"
    );
}

#[test]
fn loop_forms_match_targets() {
    let source = "sum := 0; loop i in 0..3 { sum := sum + i; }";
    assert_eq!(
        compile(source, "python"),
        "sum = 0\nfor i in range(0, 3):\n    sum = (sum + i)\n"
    );
    assert_eq!(
        compile(source, "js"),
        "let sum = 0;\nfor (let i = 0; i < 3; i++) {\n    sum = (sum + i);\n}\n"
    );
}

#[test]
fn function_definition_and_call_on_every_stable_target() {
    let source = "fn add(a:Num,b:Num):Num => a+b; result := @add(3,4);";
    for target in ["python", "js", "rust", "web"] {
        let code = compile(source, target);
        assert!(code.contains("add"), "no function in {target} output");
        assert!(code.contains("result"), "no assignment in {target} output");
    }
}

#[test]
fn expression_body_type_mismatch_is_sem006() {
    let failure = pipeline::check_source("fn f():Num => \"x\";", &options())
        .expect_err("check should fail");
    assert_eq!(failure.diagnostics[0].code, "SEM006");
}

#[test]
fn uncovered_feature_fails_with_low001_and_no_artifact() {
    let packs = default_registry();
    let failure =
        pipeline::compile_source("v:Num := 1;", "typescript", &options(), &packs)
            .expect_err("typescript rejects typed_annotation");
    assert_eq!(failure.diagnostics[0].code, "LOW001");
}

// ============================================================================
// Golden programs across stable targets
// ============================================================================

const GOLDEN_PROGRAMS: &[(&str, &str)] = &[
    (
        "factorial",
        "fn fact(n:Num):Num { if n <= 1 ? { ret 1; } : { ret n * @fact(n - 1); } } @print(@fact(5));",
    ),
    (
        "loop_sum",
        "sum := 0; loop i in 0..5 { sum := sum + i; } @print(sum);",
    ),
    (
        "nested_conditional",
        "x := 3; if x > 2 ? { if x < 10 ? { @print(1); } : { @print(2); } } : { @print(0); }",
    ),
    (
        "function_chain",
        "fn add(a:Num,b:Num):Num => a + b; fn twice(v:Num):Num => @add(v, v); @print(@twice(7));",
    ),
    (
        "logic_gate",
        "ok := true && !false; if ok ? { @print(1); } : { @print(0); }",
    ),
];

#[test]
fn stable_targets_compile_all_golden_programs() {
    let packs = default_registry();
    for (name, source) in GOLDEN_PROGRAMS {
        for target in ["python", "js", "rust", "web"] {
            let artifacts = pipeline::compile_source(source, target, &options(), &packs)
                .unwrap_or_else(|failure| {
                    panic!("{name}/{target} failed: {:?}", failure.diagnostics)
                });
            assert!(
                !artifacts.artifact.code.trim().is_empty(),
                "empty output for {name}/{target}"
            );
            let bundle = &artifacts.artifact.bundle;
            match target {
                "web" => {
                    for file in ["index.html", "styles.css", "app.js"] {
                        assert!(bundle.files.contains_key(file), "{name}: missing {file}");
                    }
                }
                "python" => assert!(bundle.files.contains_key("main.py")),
                "js" => assert!(bundle.files.contains_key("main.js")),
                "rust" => assert!(bundle.files.contains_key("main.rs")),
                _ => unreachable!(),
            }
        }
    }
}

#[test]
fn forward_reference_analyzes_cleanly() {
    pipeline::check_source("x := @later(2); fn later(n:Num):Num => n * 2;", &options())
        .expect("forward reference should not produce SEM011");
}

#[test]
fn compress_round_trips_golden_programs() {
    for (name, source) in GOLDEN_PROGRAMS {
        let compressed = icl::format::compress_source(source)
            .unwrap_or_else(|errors| panic!("{name} failed to compress: {errors:?}"));
        let original = pipeline::check_source(source, &options())
            .unwrap_or_else(|_| panic!("{name} should check"));
        let reparsed = pipeline::check_source(&compressed, &options())
            .unwrap_or_else(|failure| {
                panic!("{name} compressed form should check: {:?}", failure.diagnostics)
            });
        assert_eq!(
            serde_json::to_string(&icl::ast::program_to_json(&original.program)).unwrap(),
            serde_json::to_string(&icl::ast::program_to_json(&reparsed.program)).unwrap(),
            "{name} round trip changed the AST"
        );
    }
}

#[test]
fn macro_expansion_feeds_the_pipeline() {
    assert_eq!(compile("#echo(1 + 2);", "python"), "print((1 + 2))\n");
    let code = compile("#dbg(5);", "python");
    assert_eq!(code, "print('dbg:')\nprint(5)\n");
}

#[test]
fn explain_reports_source_map_within_source() {
    let packs = default_registry();
    let source = "x := 1 + 2;\ny := x;\n";
    let payload = pipeline::explain_source(source, Some("python"), &options(), &packs)
        .expect("explain should succeed");
    let source_map = payload["source_map"].as_object().expect("source map object");
    assert!(!source_map.is_empty());
    let line_count = source.lines().count() as u64;
    for (_, entry) in source_map {
        let line = entry["line"].as_u64().expect("line");
        let end_line = entry["end_line"].as_u64().expect("end_line");
        assert!(line >= 1 && line <= line_count);
        assert!(end_line >= line && end_line <= line_count + 1);
        assert_eq!(entry["file"], "<input>");
    }
}

// ============================================================================
// CLI surface
// ============================================================================

fn icl_command() -> Command {
    Command::new(env!("CARGO_BIN_EXE_icl"))
}

#[test]
fn cli_compiles_single_target_to_stdout() {
    let output = icl_command()
        .args(["compile", "--code", "x := 1 + 2;", "--target", "python"])
        .output()
        .expect("binary should run");
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "x = (1 + 2)\n");
}

#[test]
fn cli_multi_target_emits_bundle_payload() {
    let output = icl_command()
        .args(["compile", "--code", "x := 1;", "--targets", "python,js"])
        .output()
        .expect("binary should run");
    assert!(output.status.success());
    let payload: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    assert_eq!(payload["python"]["primary_path"], "main.py");
    assert_eq!(payload["js"]["files"]["main.js"], "let x = 1;\n");
}

#[test]
fn cli_check_reports_ok() {
    let output = icl_command()
        .args(["check", "--code", "x := 1;"])
        .output()
        .expect("binary should run");
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "OK\n");
}

#[test]
fn cli_compile_error_exits_one() {
    let output = icl_command()
        .args(["check", "--code", "x := missing;"])
        .output()
        .expect("binary should run");
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("SEM011"));
}

#[test]
fn cli_usage_error_exits_two() {
    let output = icl_command()
        .args(["compile", "--code", "x := 1;"])
        .output()
        .expect("binary should run");
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn cli_natural_mode_compiles_aliases() {
    let output = icl_command()
        .args([
            "compile",
            "--code",
            "mkfn inc(n:Num):Num => n + 1; prnt(@inc(1));",
            "--target",
            "python",
            "--natural",
        ])
        .output()
        .expect("binary should run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("def inc(n):"));
    assert!(stdout.contains("print(inc(1))"));
}

#[test]
fn cli_compress_outputs_compact_form() {
    let output = icl_command()
        .args(["compress", "--code", "x  :=  1 + 2 ;"])
        .output()
        .expect("binary should run");
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "x:=(1+2)\n");
}

#[test]
fn cli_pack_list_filters_by_stability() {
    let output = icl_command()
        .args(["pack", "list", "--stability", "stable"])
        .output()
        .expect("binary should run");
    assert!(output.status.success());
    let payload: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    let targets: Vec<&str> = payload
        .as_array()
        .expect("manifest list")
        .iter()
        .map(|manifest| manifest["target"].as_str().expect("target"))
        .collect();
    assert_eq!(targets, vec!["js", "python", "rust", "web"]);
}

#[test]
fn cli_contract_test_passes_for_stable_targets() {
    let output = icl_command()
        .args(["contract", "test"])
        .output()
        .expect("binary should run");
    assert!(output.status.success(), "contract suite should pass");
    let payload: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    assert_eq!(payload["ok"], true);
}
