//! Pipeline orchestration: the library API behind the CLI and services.
//!
//! One compilation is an ordered series of pure transformations over
//! immutable intermediate values: alias normalization (opt-in), lexing,
//! parsing, macro expansion, semantic analysis, IR building, graph
//! projection, then per-target lowering, emission, and scaffolding.
//! Multi-target runs share the front half; each target succeeds or fails
//! independently.

use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use icl_core::aliases::AliasMode;

use crate::backend::graph::{GraphBuilder, IntentGraph};
use crate::backend::ir::{self, IrBuilder, IrModule, SourceMap};
use crate::backend::lower::{self, LoweredModule};
use crate::backend::optimize::{GraphOptimizer, OptimizationReport};
use crate::backend::packs::registry::{self, PackRegistry};
use crate::backend::packs::{EmissionContext, OutputBundle};
use crate::frontend::alias::{self, AliasTrace};
use crate::frontend::ast::{self, Program};
use crate::frontend::diagnostics::Diagnostic;
use crate::frontend::lexer::{self, Token};
use crate::frontend::macros::MacroRegistry;
use crate::frontend::{parser, semantic};

/// Aggregated failure from any accumulating pipeline stage.
#[derive(Debug, Error)]
#[error("compilation failed with {} diagnostic(s)", diagnostics.len())]
pub struct CompileFailure {
    pub diagnostics: Vec<Diagnostic>,
}

impl From<Vec<Diagnostic>> for CompileFailure {
    fn from(diagnostics: Vec<Diagnostic>) -> Self {
        Self { diagnostics }
    }
}

impl From<Diagnostic> for CompileFailure {
    fn from(diagnostic: Diagnostic) -> Self {
        Self {
            diagnostics: vec![diagnostic],
        }
    }
}

/// Compilation options shared by every pipeline entry point.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub filename: String,
    /// `Some(mode)` enables the natural-alias normalizer.
    pub natural_aliases: Option<AliasMode>,
    pub optimize: bool,
    pub debug: bool,
    /// Plugin specifiers (`module[:symbol]`) applied to the macro registry.
    pub plugin_specs: Vec<String>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            filename: "<input>".to_string(),
            natural_aliases: None,
            optimize: false,
            debug: false,
            plugin_specs: Vec::new(),
        }
    }
}

/// Frozen front-half artifacts shared across targets.
#[derive(Debug)]
pub struct FrontArtifacts {
    pub tokens: Vec<Token>,
    pub program: Program,
    pub ir: IrModule,
    pub source_map: SourceMap,
    pub graph: IntentGraph,
    pub alias_trace: Option<AliasTrace>,
    pub optimization: Option<OptimizationReport>,
}

/// Emitted artifact for one target.
#[derive(Debug)]
pub struct TargetArtifact {
    pub target: String,
    pub code: String,
    pub lowered: LoweredModule,
    pub bundle: OutputBundle,
    /// Fallback diagnostics (`LOW002`/`LOW003`) that accompany the artifact.
    pub diagnostics: Vec<Diagnostic>,
}

/// Per-target outcome of a multi-target run.
pub type TargetOutcome = Result<TargetArtifact, Vec<Diagnostic>>;

/// Multi-target compilation result: shared front half, independent backends.
#[derive(Debug)]
pub struct MultiTargetArtifacts {
    pub front: FrontArtifacts,
    pub targets: BTreeMap<String, TargetOutcome>,
}

/// Single-target compilation result.
#[derive(Debug)]
pub struct CompileArtifacts {
    pub front: FrontArtifacts,
    pub artifact: TargetArtifact,
}

/// Apply a plugin specifier to the macro registry.
///
/// Like pack specifiers, plugin specifiers resolve against a static table of
/// built-in registrars; there is no dynamic loading.
pub fn load_plugin_spec(macros: &mut MacroRegistry, spec: &str) -> Result<(), Diagnostic> {
    let (module, symbol) =
        registry::split_spec(spec, "PLG004", "Plugin spec cannot be empty.")?;
    match module.as_str() {
        "icl.plugins.std_macros" => {
            if symbol != "register" {
                return Err(Diagnostic::new(
                    "PLG003",
                    format!("Plugin symbol '{symbol}' not found in module '{module}'."),
                )
                .with_hint("Use module[:symbol] with an exported register function."));
            }
            macros.register(Box::new(crate::frontend::macros::EchoMacro));
            macros.register(Box::new(crate::frontend::macros::DbgMacro));
            Ok(())
        }
        other => Err(Diagnostic::new(
            "PLG005",
            format!("Unknown plugin module '{other}' in spec '{spec}'."),
        )
        .with_hint("Built-in registrars: icl.plugins.std_macros[:register].")),
    }
}

fn build_macro_registry(options: &CompileOptions) -> Result<MacroRegistry, CompileFailure> {
    let mut macros = MacroRegistry::with_builtins();
    for spec in &options.plugin_specs {
        load_plugin_spec(&mut macros, spec)?;
    }
    Ok(macros)
}

/// Run the shared front half: alias -> lex -> parse -> expand -> semantic ->
/// IR -> graph (+ optional optimization).
pub fn front(source: &str, options: &CompileOptions) -> Result<FrontArtifacts, CompileFailure> {
    let macros = build_macro_registry(options)?;

    let (prepared, alias_trace) = match options.natural_aliases {
        Some(mode) => {
            let (normalized, trace) = alias::normalize(source, mode)?;
            debug!(rewrites = trace.count, "alias normalization applied");
            (normalized, Some(trace))
        }
        None => (source.to_string(), None),
    };

    let tokens = lexer::lex(&prepared).map_err(CompileFailure::from)?;
    debug!(tokens = tokens.len(), "lexed module");

    let program = parser::parse(&tokens).map_err(CompileFailure::from)?;
    let statements = macros.expand_program(program.statements)?;
    let program = Program {
        span: program.span,
        statements,
    };

    let model = semantic::analyze(&program).map_err(CompileFailure::from)?;
    let (ir, source_map) = IrBuilder::new(&model, options.filename.clone()).build(&program);
    debug!(nodes = source_map.len(), "built IR");

    let graph = GraphBuilder::new().build(&ir);
    let (graph, optimization) = if options.optimize {
        let (optimized, report) = GraphOptimizer::optimize(&graph);
        debug!(
            folded = report.folded_operations,
            removed = report.removed_assignments,
            "graph optimization applied"
        );
        (optimized, Some(report))
    } else {
        (graph, None)
    };

    Ok(FrontArtifacts {
        tokens,
        program,
        ir,
        source_map,
        graph,
        alias_trace,
        optimization,
    })
}

fn run_target(
    front: &FrontArtifacts,
    target: &str,
    packs: &PackRegistry,
    debug_mode: bool,
) -> TargetOutcome {
    let pack = packs.get(target).map_err(|diagnostic| vec![diagnostic])?;
    let manifest = pack.manifest();
    let lowered =
        lower::lower(&front.ir, manifest).map_err(|diagnostic| vec![diagnostic])?;

    let context = EmissionContext {
        target: manifest.target.clone(),
        debug: debug_mode,
    };
    let code = pack.emit(&lowered, &context);
    let bundle = pack.scaffold(&code, &context);
    let diagnostics = lowered.diagnostics.clone();

    Ok(TargetArtifact {
        target: manifest.target.clone(),
        code,
        lowered,
        bundle,
        diagnostics,
    })
}

/// Compile for several targets over one shared front half.
pub fn compile_targets(
    source: &str,
    targets: &[String],
    options: &CompileOptions,
    packs: &PackRegistry,
) -> Result<MultiTargetArtifacts, CompileFailure> {
    let front = front(source, options)?;
    let mut outcomes = BTreeMap::new();
    for target in targets {
        let outcome = run_target(&front, target, packs, options.debug);
        outcomes.insert(target.clone(), outcome);
    }
    Ok(MultiTargetArtifacts {
        front,
        targets: outcomes,
    })
}

/// Compile for a single target; the target's failure fails the compilation.
pub fn compile_source(
    source: &str,
    target: &str,
    options: &CompileOptions,
    packs: &PackRegistry,
) -> Result<CompileArtifacts, CompileFailure> {
    let front = front(source, options)?;
    let artifact = run_target(&front, target, packs, options.debug)
        .map_err(|diagnostics| CompileFailure { diagnostics })?;
    Ok(CompileArtifacts { front, artifact })
}

/// Validate source through semantic analysis, IR, and graph build.
pub fn check_source(
    source: &str,
    options: &CompileOptions,
) -> Result<FrontArtifacts, CompileFailure> {
    front(source, options)
}

/// Produce the explain payload: `ast`, `ir`, `lowered` (when a target is
/// given), `graph`, `source_map`, and `alias_trace` when normalization ran.
pub fn explain_source(
    source: &str,
    target: Option<&str>,
    options: &CompileOptions,
    packs: &PackRegistry,
) -> Result<Value, CompileFailure> {
    let front = front(source, options)?;

    let lowered = match target {
        Some(target) => {
            let pack = packs.get(target).map_err(CompileFailure::from)?;
            let lowered =
                lower::lower(&front.ir, pack.manifest()).map_err(CompileFailure::from)?;
            Some(lower::module_to_json(&lowered))
        }
        None => None,
    };

    let mut payload = serde_json::Map::new();
    payload.insert("ast".to_string(), ast::program_to_json(&front.program));
    payload.insert("ir".to_string(), ir::module_to_json(&front.ir));
    payload.insert("graph".to_string(), front.graph.to_json());
    payload.insert("source_map".to_string(), front.source_map.to_json());
    if let Some(lowered) = lowered {
        payload.insert("lowered".to_string(), lowered);
    }
    if let Some(trace) = &front.alias_trace {
        payload.insert(
            "alias_trace".to_string(),
            serde_json::to_value(trace).unwrap_or(Value::Null),
        );
    }
    Ok(Value::Object(payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::packs::registry::default_registry;

    fn options() -> CompileOptions {
        CompileOptions::default()
    }

    #[test]
    fn single_target_compile_produces_code_and_bundle() {
        let packs = default_registry();
        let artifacts = compile_source("x := 1 + 2;", "python", &options(), &packs)
            .expect("compile should succeed");
        assert_eq!(artifacts.artifact.code, "x = (1 + 2)\n");
        assert_eq!(artifacts.artifact.bundle.primary_path, "main.py");
    }

    #[test]
    fn multi_target_outcomes_are_independent() {
        let packs = default_registry();
        // typed_annotation is declared false for experimental packs, so the
        // typescript target fails while python succeeds on the same front.
        let artifacts = compile_targets(
            "v:Num := 1;",
            &["python".to_string(), "typescript".to_string()],
            &options(),
            &packs,
        )
        .expect("front half should succeed");
        assert!(artifacts.targets["python"].is_ok());
        let errors = artifacts.targets["typescript"]
            .as_ref()
            .expect_err("typescript should fail");
        assert_eq!(errors[0].code, "LOW001");
    }

    #[test]
    fn unknown_target_fails_with_pack001() {
        let packs = default_registry();
        let failure = compile_source("x := 1;", "zig", &options(), &packs)
            .expect_err("unknown target should fail");
        assert_eq!(failure.diagnostics[0].code, "PACK001");
    }

    #[test]
    fn check_source_reports_aggregated_semantic_errors() {
        let failure = check_source("x := missing; y := also_missing;", &options())
            .expect_err("check should fail");
        assert_eq!(failure.diagnostics.len(), 2);
    }

    #[test]
    fn explain_payload_has_stable_keys() {
        let packs = default_registry();
        let payload = explain_source("x := 1;", Some("python"), &options(), &packs)
            .expect("explain should succeed");
        for key in ["ast", "ir", "graph", "source_map", "lowered"] {
            assert!(payload.get(key).is_some(), "missing key {key}");
        }
        assert!(payload.get("alias_trace").is_none());
    }

    #[test]
    fn explain_includes_alias_trace_when_enabled() {
        let packs = default_registry();
        let mut options = options();
        options.natural_aliases = Some(AliasMode::Core);
        let payload = explain_source("prnt(1);", None, &options, &packs)
            .expect("explain should succeed");
        let trace = payload.get("alias_trace").expect("alias trace present");
        assert_eq!(trace["count"], 1);
        assert!(payload.get("lowered").is_none());
    }

    #[test]
    fn natural_alias_compile_matches_canonical_source() {
        let packs = default_registry();
        let mut natural = options();
        natural.natural_aliases = Some(AliasMode::Extended);
        let from_alias = compile_source(
            "mkfn add(a:Num,b:Num):Num => a + b; x := @add(2,3); prnt(x);",
            "python",
            &natural,
            &packs,
        )
        .expect("natural compile should succeed");
        let canonical = compile_source(
            "fn add(a:Num,b:Num):Num => a + b; x := @add(2,3); print(x);",
            "python",
            &options(),
            &packs,
        )
        .expect("canonical compile should succeed");
        assert_eq!(from_alias.artifact.code, canonical.artifact.code);
    }

    #[test]
    fn optimize_flag_keeps_emitted_code_stable() {
        let packs = default_registry();
        let plain = compile_source("x := 1 + 2; @print(x);", "python", &options(), &packs)
            .expect("compile should succeed");
        let mut optimized_options = options();
        optimized_options.optimize = true;
        let optimized =
            compile_source("x := 1 + 2; @print(x);", "python", &optimized_options, &packs)
                .expect("compile should succeed");
        assert_eq!(plain.artifact.code, optimized.artifact.code);
        assert!(optimized.front.optimization.is_some());
        assert!(plain.front.optimization.is_none());
    }

    #[test]
    fn plugin_spec_loader_accepts_std_macros() {
        let mut macros = MacroRegistry::with_builtins();
        load_plugin_spec(&mut macros, "icl.plugins.std_macros").expect("spec should load");
        let error = load_plugin_spec(&mut macros, "my.plugin").expect_err("unknown module");
        assert_eq!(error.code, "PLG005");
        let error =
            load_plugin_spec(&mut macros, "icl.plugins.std_macros:boot").expect_err("bad symbol");
        assert_eq!(error.code, "PLG003");
    }

    #[test]
    fn determinism_across_runs() {
        let packs = default_registry();
        let source =
            "fn fact(n:Num):Num { if n <= 1 ? { ret 1; } : { ret n * @fact(n - 1); } } @print(@fact(5));";
        for target in ["python", "js", "rust", "web"] {
            let first = compile_source(source, target, &options(), &packs)
                .expect("compile should succeed");
            let second = compile_source(source, target, &options(), &packs)
                .expect("compile should succeed");
            assert_eq!(first.artifact.code, second.artifact.code, "target {target}");
            assert_eq!(
                serde_json::to_string(&first.front.graph.to_json()).expect("serialize"),
                serde_json::to_string(&second.front.graph.to_json()).expect("serialize"),
            );
        }
    }
}
