//! IR lowering: target-shaped module preparation.
//!
//! `lower` consults the selected pack's feature-coverage manifest, then
//! reshapes the IR for emission: expression-bodied functions gain an explicit
//! return, `@`-prefixed calls become plain calls, and required runtime
//! helpers are discovered. Unsupported features fail with `LOW001` before any
//! artifact is produced; fallback substitutions surface as `LOW002`/`LOW003`
//! diagnostics beside the artifact, never silently.

use std::collections::BTreeSet;

use serde_json::{json, Value};

use icl_core::types::SymType;

use crate::backend::ir::{literal_to_json, IrExpr, IrModule, IrParam, IrStmt};
use crate::backend::packs::PackManifest;
use crate::frontend::ast::Literal;
use crate::frontend::diagnostics::{Diagnostic, Span};

/// Target-shaped lowered module ready for emission.
#[derive(Debug, Clone, PartialEq)]
pub struct LoweredModule {
    pub id: u32,
    pub span: Span,
    pub target: String,
    pub statements: Vec<LoweredStmt>,
    pub required_helpers: Vec<String>,
    /// Fallback diagnostics (`LOW002`/`LOW003`) emitted during lowering.
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoweredStmt {
    Assignment {
        id: u32,
        span: Span,
        name: String,
        type_hint: Option<SymType>,
        value: LoweredExpr,
    },
    Expression {
        id: u32,
        span: Span,
        expr: LoweredExpr,
    },
    If {
        id: u32,
        span: Span,
        condition: LoweredExpr,
        then_block: Vec<LoweredStmt>,
        else_block: Vec<LoweredStmt>,
    },
    Loop {
        id: u32,
        span: Span,
        iterator: String,
        start: LoweredExpr,
        end: LoweredExpr,
        body: Vec<LoweredStmt>,
    },
    Function {
        id: u32,
        span: Span,
        name: String,
        params: Vec<IrParam>,
        return_type: Option<SymType>,
        body: Vec<LoweredStmt>,
    },
    Return {
        id: u32,
        span: Span,
        value: Option<LoweredExpr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoweredExpr {
    Literal {
        id: u32,
        span: Span,
        ty: SymType,
        value: Literal,
    },
    Ref {
        id: u32,
        span: Span,
        ty: SymType,
        name: String,
    },
    Unary {
        id: u32,
        span: Span,
        ty: SymType,
        operator: String,
        operand: Box<LoweredExpr>,
    },
    Binary {
        id: u32,
        span: Span,
        ty: SymType,
        left: Box<LoweredExpr>,
        operator: String,
        right: Box<LoweredExpr>,
    },
    Call {
        id: u32,
        span: Span,
        ty: SymType,
        callee: Box<LoweredExpr>,
        args: Vec<LoweredExpr>,
    },
    Lambda {
        id: u32,
        span: Span,
        ty: SymType,
        params: Vec<IrParam>,
        return_type: Option<SymType>,
        body: Box<LoweredExpr>,
    },
}

impl LoweredExpr {
    pub fn ty(&self) -> SymType {
        match self {
            LoweredExpr::Literal { ty, .. }
            | LoweredExpr::Ref { ty, .. }
            | LoweredExpr::Unary { ty, .. }
            | LoweredExpr::Binary { ty, .. }
            | LoweredExpr::Call { ty, .. }
            | LoweredExpr::Lambda { ty, .. } => *ty,
        }
    }
}

/// Lower an IR module for one target pack.
///
/// A feature id that is absent from the manifest's coverage map gates
/// exactly like one declared `false`: only an explicit `true` admits it.
pub fn lower(module: &IrModule, manifest: &PackManifest) -> Result<LoweredModule, Diagnostic> {
    let features = collect_features(module);
    let missing: Vec<&str> = features
        .iter()
        .filter(|feature| {
            !manifest
                .feature_coverage
                .get(**feature)
                .copied()
                .unwrap_or(false)
        })
        .copied()
        .collect();
    if !missing.is_empty() {
        return Err(Diagnostic::new(
            "LOW001",
            format!(
                "Target '{}' does not support required features: {}.",
                manifest.target,
                missing.join(", ")
            ),
        )
        .with_span(module.span)
        .with_hint("Choose a compatible target or reduce source feature usage."));
    }

    let mut lowerer = Lowerer {
        counter: 0,
        diagnostics: Vec::new(),
    };
    let id = lowerer.next_id();
    let statements: Vec<LoweredStmt> = module
        .statements
        .iter()
        .map(|stmt| lowerer.lower_stmt(stmt))
        .collect();

    let mut required_helpers = Vec::new();
    let uses_print = statements.iter().any(stmt_calls_print);
    if uses_print && matches!(manifest.target.as_str(), "js" | "web") {
        required_helpers.push("print".to_string());
    }
    // A target that needs a helper its manifest does not carry gets a plain
    // call substituted; the pack opted into that by declaring no helpers.
    if uses_print
        && !matches!(manifest.target.as_str(), "python" | "rust" | "js" | "web")
        && !manifest.runtime_helpers.iter().any(|h| h == "print")
    {
        lowerer.diagnostics.push(
            Diagnostic::new(
                "LOW003",
                format!(
                    "Builtin 'print' lowered to a plain call for target '{}'; the target runtime must provide it.",
                    manifest.target
                ),
            )
            .with_span(module.span)
            .with_hint("Declare a print runtime helper in the pack manifest for native output."),
        );
    }

    Ok(LoweredModule {
        id,
        span: module.span,
        target: manifest.target.clone(),
        statements,
        required_helpers,
        diagnostics: lowerer.diagnostics,
    })
}

struct Lowerer {
    counter: u32,
    diagnostics: Vec<Diagnostic>,
}

impl Lowerer {
    fn lower_stmt(&mut self, stmt: &IrStmt) -> LoweredStmt {
        match stmt {
            IrStmt::Assignment {
                span,
                name,
                type_hint,
                value,
                ..
            } => {
                let id = self.next_id();
                LoweredStmt::Assignment {
                    id,
                    span: *span,
                    name: name.clone(),
                    type_hint: *type_hint,
                    value: self.lower_expr(value),
                }
            }
            IrStmt::Expression { span, expr, .. } => {
                let id = self.next_id();
                LoweredStmt::Expression {
                    id,
                    span: *span,
                    expr: self.lower_expr(expr),
                }
            }
            IrStmt::If {
                span,
                condition,
                then_block,
                else_block,
                ..
            } => {
                let id = self.next_id();
                LoweredStmt::If {
                    id,
                    span: *span,
                    condition: self.lower_expr(condition),
                    then_block: then_block.iter().map(|s| self.lower_stmt(s)).collect(),
                    else_block: else_block.iter().map(|s| self.lower_stmt(s)).collect(),
                }
            }
            IrStmt::Loop {
                span,
                iterator,
                start,
                end,
                body,
                ..
            } => {
                let id = self.next_id();
                LoweredStmt::Loop {
                    id,
                    span: *span,
                    iterator: iterator.clone(),
                    start: self.lower_expr(start),
                    end: self.lower_expr(end),
                    body: body.iter().map(|s| self.lower_stmt(s)).collect(),
                }
            }
            IrStmt::Function {
                span,
                name,
                params,
                return_type,
                body,
                expr_body,
                ..
            } => {
                let id = self.next_id();
                let mut lowered_body: Vec<LoweredStmt> =
                    body.iter().map(|s| self.lower_stmt(s)).collect();
                // Expression bodies normalize into an explicit return.
                if let Some(expr) = expr_body {
                    let return_id = self.next_id();
                    let value = self.lower_expr(expr);
                    lowered_body.push(LoweredStmt::Return {
                        id: return_id,
                        span: expr_span(expr),
                        value: Some(value),
                    });
                }
                LoweredStmt::Function {
                    id,
                    span: *span,
                    name: name.clone(),
                    params: params.clone(),
                    return_type: *return_type,
                    body: lowered_body,
                }
            }
            IrStmt::Return { span, value, .. } => {
                let id = self.next_id();
                LoweredStmt::Return {
                    id,
                    span: *span,
                    value: value.as_ref().map(|expr| self.lower_expr(expr)),
                }
            }
        }
    }

    fn lower_expr(&mut self, expr: &IrExpr) -> LoweredExpr {
        match expr {
            IrExpr::Literal {
                span, ty, value, ..
            } => {
                let id = self.next_id();
                LoweredExpr::Literal {
                    id,
                    span: *span,
                    ty: *ty,
                    value: value.clone(),
                }
            }
            IrExpr::Ref { span, ty, name, .. } => {
                let id = self.next_id();
                LoweredExpr::Ref {
                    id,
                    span: *span,
                    ty: *ty,
                    name: name.clone(),
                }
            }
            IrExpr::Unary {
                span,
                ty,
                operator,
                operand,
                ..
            } => {
                let id = self.next_id();
                LoweredExpr::Unary {
                    id,
                    span: *span,
                    ty: *ty,
                    operator: operator.clone(),
                    operand: Box::new(self.lower_expr(operand)),
                }
            }
            IrExpr::Binary {
                span,
                ty,
                left,
                operator,
                right,
                ..
            } => {
                let id = self.next_id();
                LoweredExpr::Binary {
                    id,
                    span: *span,
                    ty: *ty,
                    left: Box::new(self.lower_expr(left)),
                    operator: operator.clone(),
                    right: Box::new(self.lower_expr(right)),
                }
            }
            // Call normalization: the @ flag is dropped here.
            IrExpr::Call {
                span,
                ty,
                callee,
                args,
                ..
            } => {
                let id = self.next_id();
                LoweredExpr::Call {
                    id,
                    span: *span,
                    ty: *ty,
                    callee: Box::new(self.lower_expr(callee)),
                    args: args.iter().map(|arg| self.lower_expr(arg)).collect(),
                }
            }
            IrExpr::Lambda {
                span,
                ty,
                params,
                return_type,
                body,
                ..
            } => {
                let id = self.next_id();
                LoweredExpr::Lambda {
                    id,
                    span: *span,
                    ty: *ty,
                    params: params.clone(),
                    return_type: *return_type,
                    body: Box::new(self.lower_expr(body)),
                }
            }
        }
    }

    fn next_id(&mut self) -> u32 {
        self.counter += 1;
        self.counter
    }
}

fn expr_span(expr: &IrExpr) -> Span {
    match expr {
        IrExpr::Literal { span, .. }
        | IrExpr::Ref { span, .. }
        | IrExpr::Unary { span, .. }
        | IrExpr::Binary { span, .. }
        | IrExpr::Call { span, .. }
        | IrExpr::Lambda { span, .. } => *span,
    }
}

// ============================================================================
// Feature collection
// ============================================================================

/// Collect the feature ids an IR module exercises.
pub fn collect_features(module: &IrModule) -> BTreeSet<&'static str> {
    let mut features = BTreeSet::new();
    for stmt in &module.statements {
        walk_stmt_features(stmt, &mut features);
    }
    features
}

fn walk_stmt_features(stmt: &IrStmt, features: &mut BTreeSet<&'static str>) {
    match stmt {
        IrStmt::Assignment {
            type_hint, value, ..
        } => {
            features.insert("assignment");
            if type_hint.is_some() {
                features.insert("typed_annotation");
            }
            walk_expr_features(value, features);
        }
        IrStmt::Expression { expr, .. } => {
            features.insert("expression_stmt");
            walk_expr_features(expr, features);
        }
        IrStmt::If {
            condition,
            then_block,
            else_block,
            ..
        } => {
            features.insert("if");
            walk_expr_features(condition, features);
            for inner in then_block.iter().chain(else_block) {
                walk_stmt_features(inner, features);
            }
        }
        IrStmt::Loop {
            start, end, body, ..
        } => {
            features.insert("loop");
            walk_expr_features(start, features);
            walk_expr_features(end, features);
            for inner in body {
                walk_stmt_features(inner, features);
            }
        }
        IrStmt::Function {
            params,
            return_type,
            body,
            expr_body,
            ..
        } => {
            features.insert("function");
            if return_type.is_some() || params.iter().any(|p| p.type_hint.is_some()) {
                features.insert("typed_annotation");
            }
            for inner in body {
                walk_stmt_features(inner, features);
            }
            if let Some(expr) = expr_body {
                walk_expr_features(expr, features);
            }
        }
        IrStmt::Return { value, .. } => {
            features.insert("return");
            if let Some(expr) = value {
                walk_expr_features(expr, features);
            }
        }
    }
}

fn walk_expr_features(expr: &IrExpr, features: &mut BTreeSet<&'static str>) {
    match expr {
        IrExpr::Literal { .. } => {
            features.insert("literal");
        }
        IrExpr::Ref { .. } => {
            features.insert("reference");
        }
        IrExpr::Unary { operand, .. } => {
            features.insert("unary");
            walk_expr_features(operand, features);
        }
        IrExpr::Binary {
            left,
            operator,
            right,
            ..
        } => {
            features.insert(match operator.as_str() {
                "&&" | "||" => "logic",
                "==" | "!=" | "<" | "<=" | ">" | ">=" => "comparison",
                _ => "arithmetic",
            });
            walk_expr_features(left, features);
            walk_expr_features(right, features);
        }
        IrExpr::Call {
            callee,
            args,
            at_prefixed,
            ..
        } => {
            features.insert("call");
            if *at_prefixed {
                features.insert("at_call");
            }
            walk_expr_features(callee, features);
            for arg in args {
                walk_expr_features(arg, features);
            }
        }
        IrExpr::Lambda { body, .. } => {
            features.insert("lambda");
            walk_expr_features(body, features);
        }
    }
}

// ============================================================================
// Helper discovery
// ============================================================================

fn stmt_calls_print(stmt: &LoweredStmt) -> bool {
    match stmt {
        LoweredStmt::Assignment { value, .. } => expr_calls_print(value),
        LoweredStmt::Expression { expr, .. } => expr_calls_print(expr),
        LoweredStmt::If {
            condition,
            then_block,
            else_block,
            ..
        } => {
            expr_calls_print(condition)
                || then_block.iter().chain(else_block).any(stmt_calls_print)
        }
        LoweredStmt::Loop {
            start, end, body, ..
        } => {
            expr_calls_print(start)
                || expr_calls_print(end)
                || body.iter().any(stmt_calls_print)
        }
        LoweredStmt::Function { body, .. } => body.iter().any(stmt_calls_print),
        LoweredStmt::Return { value, .. } => value.as_ref().is_some_and(expr_calls_print),
    }
}

fn expr_calls_print(expr: &LoweredExpr) -> bool {
    match expr {
        LoweredExpr::Call { callee, args, .. } => {
            if matches!(callee.as_ref(), LoweredExpr::Ref { name, .. } if name == "print") {
                return true;
            }
            expr_calls_print(callee) || args.iter().any(expr_calls_print)
        }
        LoweredExpr::Unary { operand, .. } => expr_calls_print(operand),
        LoweredExpr::Binary { left, right, .. } => {
            expr_calls_print(left) || expr_calls_print(right)
        }
        LoweredExpr::Lambda { body, .. } => expr_calls_print(body),
        LoweredExpr::Literal { .. } | LoweredExpr::Ref { .. } => false,
    }
}

// ============================================================================
// JSON serialization for explain payloads
// ============================================================================

pub fn module_to_json(module: &LoweredModule) -> Value {
    json!({
        "node_type": "LoweredModule",
        "id": module.id,
        "target": module.target,
        "statements": module.statements.iter().map(stmt_to_json).collect::<Vec<_>>(),
        "required_helpers": module.required_helpers,
        "diagnostics": module.diagnostics,
    })
}

fn params_to_json(params: &[IrParam]) -> Value {
    Value::Array(
        params
            .iter()
            .map(|param| {
                json!({
                    "name": param.name,
                    "type_hint": param.type_hint.map(SymType::as_str),
                })
            })
            .collect(),
    )
}

fn stmt_to_json(stmt: &LoweredStmt) -> Value {
    match stmt {
        LoweredStmt::Assignment {
            id,
            name,
            type_hint,
            value,
            ..
        } => json!({
            "node_type": "LoweredAssignment",
            "id": id,
            "name": name,
            "type_hint": type_hint.map(SymType::as_str),
            "value": expr_to_json(value),
        }),
        LoweredStmt::Expression { id, expr, .. } => json!({
            "node_type": "LoweredExpressionStmt",
            "id": id,
            "expr": expr_to_json(expr),
        }),
        LoweredStmt::If {
            id,
            condition,
            then_block,
            else_block,
            ..
        } => json!({
            "node_type": "LoweredIf",
            "id": id,
            "condition": expr_to_json(condition),
            "then_block": then_block.iter().map(stmt_to_json).collect::<Vec<_>>(),
            "else_block": else_block.iter().map(stmt_to_json).collect::<Vec<_>>(),
        }),
        LoweredStmt::Loop {
            id,
            iterator,
            start,
            end,
            body,
            ..
        } => json!({
            "node_type": "LoweredLoop",
            "id": id,
            "iterator": iterator,
            "start": expr_to_json(start),
            "end": expr_to_json(end),
            "body": body.iter().map(stmt_to_json).collect::<Vec<_>>(),
        }),
        LoweredStmt::Function {
            id,
            name,
            params,
            return_type,
            body,
            ..
        } => json!({
            "node_type": "LoweredFunction",
            "id": id,
            "name": name,
            "params": params_to_json(params),
            "return_type": return_type.map(SymType::as_str),
            "body": body.iter().map(stmt_to_json).collect::<Vec<_>>(),
        }),
        LoweredStmt::Return { id, value, .. } => json!({
            "node_type": "LoweredReturn",
            "id": id,
            "value": value.as_ref().map(expr_to_json),
        }),
    }
}

fn expr_to_json(expr: &LoweredExpr) -> Value {
    match expr {
        LoweredExpr::Literal { id, ty, value, .. } => json!({
            "node_type": "LoweredLiteral",
            "id": id,
            "expr_type": ty.as_str(),
            "value": literal_to_json(value),
        }),
        LoweredExpr::Ref { id, ty, name, .. } => json!({
            "node_type": "LoweredRef",
            "id": id,
            "expr_type": ty.as_str(),
            "name": name,
        }),
        LoweredExpr::Unary {
            id,
            ty,
            operator,
            operand,
            ..
        } => json!({
            "node_type": "LoweredUnary",
            "id": id,
            "expr_type": ty.as_str(),
            "operator": operator,
            "operand": expr_to_json(operand),
        }),
        LoweredExpr::Binary {
            id,
            ty,
            left,
            operator,
            right,
            ..
        } => json!({
            "node_type": "LoweredBinary",
            "id": id,
            "expr_type": ty.as_str(),
            "left": expr_to_json(left),
            "operator": operator,
            "right": expr_to_json(right),
        }),
        LoweredExpr::Call {
            id,
            ty,
            callee,
            args,
            ..
        } => json!({
            "node_type": "LoweredCall",
            "id": id,
            "expr_type": ty.as_str(),
            "callee": expr_to_json(callee),
            "args": args.iter().map(expr_to_json).collect::<Vec<_>>(),
        }),
        LoweredExpr::Lambda {
            id,
            ty,
            params,
            return_type,
            body,
            ..
        } => json!({
            "node_type": "LoweredLambda",
            "id": id,
            "expr_type": ty.as_str(),
            "params": params_to_json(params),
            "return_type": return_type.map(SymType::as_str),
            "body": expr_to_json(body),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ir::IrBuilder;
    use crate::backend::packs;
    use crate::frontend::{lexer, parser, semantic};

    fn build_ir(source: &str) -> IrModule {
        let tokens = lexer::lex(source).expect("lex should succeed");
        let program = parser::parse(&tokens).expect("parse should succeed");
        let model = semantic::analyze(&program).expect("analysis should succeed");
        IrBuilder::new(&model, "<input>").build(&program).0
    }

    fn python_manifest() -> PackManifest {
        packs::registry::default_registry()
            .get("python")
            .expect("python pack")
            .manifest()
            .clone()
    }

    #[test]
    fn collects_features_for_core_constructs() {
        let module = build_ir("fn f(a:Num):Num { ret a; } x := @f(1); @print(x);");
        let features = collect_features(&module);
        for expected in [
            "function",
            "typed_annotation",
            "return",
            "assignment",
            "call",
            "at_call",
            "expression_stmt",
            "literal",
            "reference",
        ] {
            assert!(features.contains(expected), "missing feature {expected}");
        }
    }

    #[test]
    fn expression_body_becomes_explicit_return() {
        let module = build_ir("fn add(a:Num,b:Num):Num => a+b;");
        let lowered = lower(&module, &python_manifest()).expect("lowering should succeed");
        let LoweredStmt::Function { body, .. } = &lowered.statements[0] else {
            panic!("expected function");
        };
        assert_eq!(body.len(), 1);
        assert!(matches!(body[0], LoweredStmt::Return { value: Some(_), .. }));
    }

    #[test]
    fn feature_gate_rejects_uncovered_feature() {
        let module = build_ir("v:Num := 1;");
        let mut manifest = python_manifest();
        manifest
            .feature_coverage
            .insert("typed_annotation".to_string(), false);
        let error = lower(&module, &manifest).expect_err("lowering should fail");
        assert_eq!(error.code, "LOW001");
        assert!(error.message.contains("typed_annotation"));
    }

    #[test]
    fn feature_gate_rejects_absent_coverage_entry() {
        let module = build_ir("sum := 0; loop i in 0..3 { sum := sum + i; }");
        let mut manifest = python_manifest();
        manifest.feature_coverage.remove("loop");
        let error = lower(&module, &manifest).expect_err("lowering should fail");
        assert_eq!(error.code, "LOW001");
        assert!(error.message.contains("loop"));
    }

    #[test]
    fn feature_gate_lists_every_missing_feature() {
        let module = build_ir("v:Num := 1; if true ? { @print(v); }");
        let mut manifest = python_manifest();
        manifest
            .feature_coverage
            .insert("typed_annotation".to_string(), false);
        manifest.feature_coverage.insert("if".to_string(), false);
        let error = lower(&module, &manifest).expect_err("lowering should fail");
        assert!(error.message.contains("if, typed_annotation"));
    }

    #[test]
    fn print_helper_discovered_for_js_targets() {
        let module = build_ir("@print(1);");
        let registry = packs::registry::default_registry();
        for (target, expected) in [("js", true), ("web", true), ("python", false)] {
            let manifest = registry.get(target).expect("pack").manifest().clone();
            let lowered = lower(&module, &manifest).expect("lowering should succeed");
            assert_eq!(
                lowered.required_helpers.contains(&"print".to_string()),
                expected,
                "helper mismatch for {target}"
            );
        }
    }

    #[test]
    fn pseudo_target_print_substitution_is_low003() {
        let module = build_ir("print(1);");
        let registry = packs::registry::default_registry();
        let manifest = registry.get("go").expect("go pack").manifest().clone();
        let lowered = lower(&module, &manifest).expect("lowering should succeed");
        assert_eq!(lowered.diagnostics.len(), 1);
        assert_eq!(lowered.diagnostics[0].code, "LOW003");
    }

    #[test]
    fn lowering_is_deterministic() {
        let module = build_ir("sum := 0; loop i in 0..3 { sum := sum + i; }");
        let manifest = python_manifest();
        let first = lower(&module, &manifest).expect("lowering should succeed");
        let second = lower(&module, &manifest).expect("lowering should succeed");
        assert_eq!(first, second);
    }
}
