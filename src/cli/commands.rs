//! Command implementations for the ICL CLI.
//!
//! Every command resolves its source, builds its registries, calls into the
//! pipeline library, and renders output. Compiler failures map to exit code
//! 1, usage mistakes to 2, and IO/serialization faults to 3.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};

use icl_core::aliases::{self, AliasMode};

use crate::backend::contract;
use crate::backend::graph::{diff_graphs, IntentGraph};
use crate::backend::packs::registry::{self, PackRegistry};
use crate::backend::packs::{OutputBundle, Stability};
use crate::cli::{
    AliasArgs, AliasCommand, Cli, CliError, CliResult, Command, ContractCommand, ExitCode,
    PackCommand, SourceArgs,
};
use crate::frontend::diagnostics::Diagnostic;
use crate::pipeline::{self, CompileFailure, CompileOptions};
use crate::format;

pub fn execute(cli: Cli) -> CliResult<ExitCode> {
    match cli.command {
        Command::Compile {
            source,
            target,
            targets,
            output,
            emit_graph,
            emit_sourcemap,
            optimize,
            debug,
            alias,
            plugins,
            packs,
        } => compile(
            source,
            target,
            targets,
            output,
            emit_graph,
            emit_sourcemap,
            optimize,
            debug,
            alias,
            plugins,
            packs,
        ),

        Command::Check {
            source,
            alias,
            plugins,
        } => check(source, alias, plugins),

        Command::Explain {
            source,
            target,
            alias,
            alias_trace,
            plugins,
            packs,
        } => explain(source, target, alias, alias_trace, plugins, packs),

        Command::Compress { source } => compress(source),

        Command::Diff { before, after } => diff(&before, &after),

        Command::Pack { command } => match command {
            PackCommand::List { stability, packs } => pack_list(stability, packs),
            PackCommand::Validate { target, packs } => pack_validate(target, packs),
        },

        Command::Contract { command } => match command {
            ContractCommand::Test { targets, all, packs } => contract_test(targets, all, packs),
        },

        Command::Alias { command } => match command {
            AliasCommand::List { mode, json } => alias_list(&mode, json),
        },
    }
}

// ============================================================================
// compile
// ============================================================================

#[allow(clippy::too_many_arguments)]
fn compile(
    source_args: SourceArgs,
    target: Option<String>,
    targets_args: Vec<String>,
    output: Option<PathBuf>,
    emit_graph: Option<PathBuf>,
    emit_sourcemap: Option<PathBuf>,
    optimize: bool,
    debug: bool,
    alias: AliasArgs,
    plugins: Vec<String>,
    packs: Vec<String>,
) -> CliResult<ExitCode> {
    let (source, filename) = resolve_source(&source_args)?;
    let targets = resolve_targets(target, targets_args)?;
    let options = build_options(&filename, &alias, optimize, debug, plugins)?;
    let registry = build_pack_registry(&packs)?;

    if targets.len() == 1 {
        let target = &targets[0];
        let artifacts = pipeline::compile_source(&source, target, &options, &registry)
            .map_err(|failure| compile_failure_error(&filename, failure))?;

        for diagnostic in &artifacts.artifact.diagnostics {
            eprintln!("{}", diagnostic.format(&filename));
        }
        if let Some(path) = &emit_graph {
            write_json(path, &artifacts.front.graph.to_json())?;
        }
        if let Some(path) = &emit_sourcemap {
            write_json(path, &artifacts.front.source_map.to_json())?;
        }
        if debug {
            eprintln!(
                "debug: tokens={} nodes={} edges={}",
                artifacts.front.tokens.len(),
                artifacts.front.graph.nodes.len(),
                artifacts.front.graph.edges.len()
            );
            if let Some(report) = &artifacts.front.optimization {
                eprintln!(
                    "debug: folded={} dead_assignments={}",
                    report.folded_operations, report.removed_assignments
                );
            }
        }

        match &output {
            Some(path) => write_bundle(&artifacts.artifact.bundle, path)?,
            None => print!("{}", artifacts.artifact.code),
        }
        return Ok(ExitCode::SUCCESS);
    }

    if emit_graph.is_some() {
        return Err(CliError::usage("--emit-graph supports single target only"));
    }

    let multi = pipeline::compile_targets(&source, &targets, &options, &registry)
        .map_err(|failure| compile_failure_error(&filename, failure))?;

    if let Some(path) = &emit_sourcemap {
        write_json(path, &multi.front.source_map.to_json())?;
    }

    let mut all_ok = true;
    if let Some(out_dir) = &output {
        for target in &targets {
            match &multi.targets[target] {
                Ok(artifact) => write_bundle(&artifact.bundle, &out_dir.join(target))?,
                Err(diagnostics) => {
                    all_ok = false;
                    for diagnostic in diagnostics {
                        eprintln!("{target}: {}", diagnostic.format(&filename));
                    }
                }
            }
        }
    } else {
        let mut payload = BTreeMap::new();
        for target in &targets {
            let value = match &multi.targets[target] {
                Ok(artifact) => json!({
                    "primary_path": artifact.bundle.primary_path,
                    "files": artifact.bundle.files,
                }),
                Err(diagnostics) => {
                    all_ok = false;
                    json!({ "diagnostics": diagnostics })
                }
            };
            payload.insert(target.clone(), value);
        }
        print_json(&json!(payload))?;
    }

    if all_ok {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::COMPILE_ERROR)
    }
}

// ============================================================================
// check / explain / compress / diff
// ============================================================================

fn check(source_args: SourceArgs, alias: AliasArgs, plugins: Vec<String>) -> CliResult<ExitCode> {
    let (source, filename) = resolve_source(&source_args)?;
    let options = build_options(&filename, &alias, false, false, plugins)?;
    pipeline::check_source(&source, &options)
        .map_err(|failure| compile_failure_error(&filename, failure))?;
    println!("OK");
    Ok(ExitCode::SUCCESS)
}

fn explain(
    source_args: SourceArgs,
    target: Option<String>,
    alias: AliasArgs,
    alias_trace: bool,
    plugins: Vec<String>,
    packs: Vec<String>,
) -> CliResult<ExitCode> {
    let (source, filename) = resolve_source(&source_args)?;
    let options = build_options(&filename, &alias, false, false, plugins)?;
    let registry = build_pack_registry(&packs)?;
    let mut payload =
        pipeline::explain_source(&source, target.as_deref(), &options, &registry)
            .map_err(|failure| compile_failure_error(&filename, failure))?;
    if !alias_trace {
        if let Some(object) = payload.as_object_mut() {
            object.remove("alias_trace");
        }
    }
    print_json(&payload)?;
    Ok(ExitCode::SUCCESS)
}

fn compress(source_args: SourceArgs) -> CliResult<ExitCode> {
    let (source, filename) = resolve_source(&source_args)?;
    let compressed = format::compress_source(&source)
        .map_err(|diagnostics| diagnostics_error(&filename, &diagnostics))?;
    print!("{compressed}");
    Ok(ExitCode::SUCCESS)
}

fn diff(before: &Path, after: &Path) -> CliResult<ExitCode> {
    let before_graph = load_graph(before)?;
    let after_graph = load_graph(after)?;
    let diff = diff_graphs(&before_graph, &after_graph);
    let payload = serde_json::to_value(&diff)
        .map_err(|error| CliError::internal(error.to_string()))?;
    print_json(&payload)?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// pack / contract / alias
// ============================================================================

fn pack_list(stability: Option<String>, packs: Vec<String>) -> CliResult<ExitCode> {
    let registry = build_pack_registry(&packs)?;
    let stability = match stability.as_deref() {
        Some(value) => Some(
            Stability::parse(value)
                .ok_or_else(|| CliError::usage(format!("Unknown stability '{value}'")))?,
        ),
        None => None,
    };
    let manifests = registry.manifests(stability);
    let payload = serde_json::to_value(&manifests)
        .map_err(|error| CliError::internal(error.to_string()))?;
    print_json(&payload)?;
    Ok(ExitCode::SUCCESS)
}

fn pack_validate(target: Option<String>, packs: Vec<String>) -> CliResult<ExitCode> {
    let registry = build_pack_registry(&packs)?;
    let results = registry
        .validate(target.as_deref())
        .map_err(|diagnostic| CliError::compile(diagnostic.format("<registry>")))?;
    let all_ok = results.iter().all(|result| result.ok);
    let payload = serde_json::to_value(&results)
        .map_err(|error| CliError::internal(error.to_string()))?;
    print_json(&payload)?;
    if all_ok {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::COMPILE_ERROR)
    }
}

fn contract_test(targets: Vec<String>, all: bool, packs: Vec<String>) -> CliResult<ExitCode> {
    let registry = build_pack_registry(&packs)?;
    let selected = if targets.is_empty() {
        None
    } else {
        Some(targets.as_slice())
    };
    let report = contract::run_contract_suite(&registry, selected, !all);
    let ok = report.ok;
    let payload = serde_json::to_value(&report)
        .map_err(|error| CliError::internal(error.to_string()))?;
    print_json(&payload)?;
    if ok {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::COMPILE_ERROR)
    }
}

fn alias_list(mode: &str, as_json: bool) -> CliResult<ExitCode> {
    let mode = AliasMode::parse(mode)
        .ok_or_else(|| CliError::usage(format!("Unknown alias mode '{mode}'")))?;
    let entries = aliases::entries(mode);
    if as_json {
        let payload = serde_json::to_value(&entries)
            .map_err(|error| CliError::internal(error.to_string()))?;
        print_json(&payload)?;
    } else {
        for entry in entries {
            println!(
                "{:<8} [{}] {} | aliases: {}",
                entry.canonical,
                entry.category,
                entry.description,
                entry.aliases.join(", ")
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// Helpers
// ============================================================================

fn resolve_source(args: &SourceArgs) -> CliResult<(String, String)> {
    match (&args.input, &args.code) {
        (Some(_), Some(_)) => Err(CliError::usage(
            "Use either input file path or --code, not both",
        )),
        (Some(path), None) => {
            let source = fs::read_to_string(path)
                .map_err(|error| CliError::internal(format!("{}: {error}", path.display())))?;
            Ok((source, path.display().to_string()))
        }
        (None, Some(code)) => Ok((code.clone(), "<inline>".to_string())),
        (None, None) => Err(CliError::usage(
            "No source provided. Pass input file path or --code",
        )),
    }
}

fn resolve_targets(target: Option<String>, targets_args: Vec<String>) -> CliResult<Vec<String>> {
    let mut targets = Vec::new();
    if let Some(target) = target {
        targets.push(target);
    }
    for item in targets_args {
        for chunk in item.split(',') {
            let chunk = chunk.trim();
            if !chunk.is_empty() {
                targets.push(chunk.to_string());
            }
        }
    }
    if targets.is_empty() {
        return Err(CliError::usage("No target provided. Use --target or --targets"));
    }
    let mut deduped = Vec::new();
    for item in targets {
        if !deduped.contains(&item) {
            deduped.push(item);
        }
    }
    Ok(deduped)
}

fn build_options(
    filename: &str,
    alias: &AliasArgs,
    optimize: bool,
    debug: bool,
    plugin_specs: Vec<String>,
) -> CliResult<CompileOptions> {
    let natural_aliases = if alias.natural {
        let mode = AliasMode::parse(&alias.alias_mode).ok_or_else(|| {
            CliError::usage(format!("Unknown alias mode '{}'", alias.alias_mode))
        })?;
        Some(mode)
    } else {
        None
    };
    Ok(CompileOptions {
        filename: filename.to_string(),
        natural_aliases,
        optimize,
        debug,
        plugin_specs,
    })
}

fn build_pack_registry(specs: &[String]) -> CliResult<PackRegistry> {
    let mut packs = registry::default_registry();
    for spec in specs {
        registry::load_pack_spec(&mut packs, spec)
            .map_err(|diagnostic| CliError::compile(diagnostic.format("<registry>")))?;
    }
    Ok(packs)
}

fn compile_failure_error(filename: &str, failure: CompileFailure) -> CliError {
    diagnostics_error(filename, &failure.diagnostics)
}

fn diagnostics_error(filename: &str, diagnostics: &[Diagnostic]) -> CliError {
    let lines: Vec<String> = diagnostics
        .iter()
        .map(|diagnostic| diagnostic.format(filename))
        .collect();
    CliError::compile(lines.join("\n"))
}

fn print_json(payload: &Value) -> CliResult<()> {
    let rendered = serde_json::to_string_pretty(payload)
        .map_err(|error| CliError::internal(error.to_string()))?;
    println!("{rendered}");
    Ok(())
}

fn write_json(path: &Path, payload: &Value) -> CliResult<()> {
    let rendered = serde_json::to_string_pretty(payload)
        .map_err(|error| CliError::internal(error.to_string()))?;
    fs::write(path, rendered)
        .map_err(|error| CliError::internal(format!("{}: {error}", path.display())))
}

fn load_graph(path: &Path) -> CliResult<IntentGraph> {
    let payload = fs::read_to_string(path)
        .map_err(|error| CliError::internal(format!("{}: {error}", path.display())))?;
    let value: Value = serde_json::from_str(&payload)
        .map_err(|error| CliError::internal(format!("{}: {error}", path.display())))?;
    IntentGraph::from_json(&value)
        .map_err(|error| CliError::internal(format!("{}: {error}", path.display())))
}

/// Write a scaffolded bundle to `path`. A path with an extension receives the
/// primary file only; multi-file bundles require a directory.
fn write_bundle(bundle: &OutputBundle, path: &Path) -> CliResult<()> {
    if path.extension().is_some() {
        if bundle.files.len() > 1 {
            return Err(CliError::usage(format!(
                "Output path '{}' must be a directory for multi-file target artifacts",
                path.display()
            )));
        }
        return fs::write(path, bundle.code())
            .map_err(|error| CliError::internal(format!("{}: {error}", path.display())));
    }

    fs::create_dir_all(path)
        .map_err(|error| CliError::internal(format!("{}: {error}", path.display())))?;
    for (relative, body) in &bundle.files {
        let file_path = path.join(relative);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|error| CliError::internal(format!("{}: {error}", parent.display())))?;
        }
        fs::write(&file_path, body)
            .map_err(|error| CliError::internal(format!("{}: {error}", file_path.display())))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targets_merge_and_dedupe() {
        let targets = resolve_targets(
            Some("python".to_string()),
            vec!["js,rust".to_string(), "python".to_string()],
        )
        .expect("targets should resolve");
        assert_eq!(targets, vec!["python", "js", "rust"]);
    }

    #[test]
    fn missing_target_is_usage_error() {
        let error = resolve_targets(None, vec![]).expect_err("should fail");
        assert_eq!(error.exit_code, ExitCode::USAGE_ERROR);
    }

    #[test]
    fn source_requires_exactly_one_input() {
        let error = resolve_source(&SourceArgs {
            input: None,
            code: None,
        })
        .expect_err("should fail");
        assert_eq!(error.exit_code, ExitCode::USAGE_ERROR);

        let (source, filename) = resolve_source(&SourceArgs {
            input: None,
            code: Some("x := 1;".to_string()),
        })
        .expect("inline code should resolve");
        assert_eq!(source, "x := 1;");
        assert_eq!(filename, "<inline>");
    }

    #[test]
    fn diagnostics_map_to_compile_exit_code() {
        let error = diagnostics_error(
            "demo.icl",
            &[Diagnostic::new("SEM011", "Undefined symbol 'x'.")],
        );
        assert_eq!(error.exit_code, ExitCode::COMPILE_ERROR);
        assert!(error.message.contains("SEM011"));
    }
}
