//! Target-agnostic intermediate representation.
//!
//! The IR parallels the AST but is normalized and annotated: every node
//! carries a stable integer id (sequential from 1, pre-order) and every
//! expression carries its inferred symbolic type. Ids map back to source
//! spans through the [`SourceMap`], which persists all the way into the
//! final artifact bundle.

use std::collections::BTreeMap;

use serde_json::{json, Value};

use icl_core::types::SymType;

use crate::frontend::ast::{Expr, Literal, Program, Stmt};
use crate::frontend::diagnostics::Span;
use crate::frontend::semantic::SemanticModel;

/// Normalized function or lambda parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct IrParam {
    pub name: String,
    pub type_hint: Option<SymType>,
}

/// Top-level module IR container.
#[derive(Debug, Clone, PartialEq)]
pub struct IrModule {
    pub id: u32,
    pub span: Span,
    pub statements: Vec<IrStmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IrStmt {
    Assignment {
        id: u32,
        span: Span,
        name: String,
        type_hint: Option<SymType>,
        value: IrExpr,
    },
    Expression {
        id: u32,
        span: Span,
        expr: IrExpr,
    },
    If {
        id: u32,
        span: Span,
        condition: IrExpr,
        then_block: Vec<IrStmt>,
        else_block: Vec<IrStmt>,
    },
    Loop {
        id: u32,
        span: Span,
        iterator: String,
        start: IrExpr,
        end: IrExpr,
        body: Vec<IrStmt>,
    },
    Function {
        id: u32,
        span: Span,
        name: String,
        params: Vec<IrParam>,
        return_type: Option<SymType>,
        body: Vec<IrStmt>,
        expr_body: Option<IrExpr>,
    },
    Return {
        id: u32,
        span: Span,
        value: Option<IrExpr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum IrExpr {
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
        operand: Box<IrExpr>,
    },
    Binary {
        id: u32,
        span: Span,
        ty: SymType,
        left: Box<IrExpr>,
        operator: String,
        right: Box<IrExpr>,
    },
    Call {
        id: u32,
        span: Span,
        ty: SymType,
        callee: Box<IrExpr>,
        args: Vec<IrExpr>,
        /// `@`-prefixed call form; metadata only.
        at_prefixed: bool,
    },
    Lambda {
        id: u32,
        span: Span,
        ty: SymType,
        params: Vec<IrParam>,
        return_type: Option<SymType>,
        body: Box<IrExpr>,
    },
}

impl IrExpr {
    pub fn ty(&self) -> SymType {
        match self {
            IrExpr::Literal { ty, .. }
            | IrExpr::Ref { ty, .. }
            | IrExpr::Unary { ty, .. }
            | IrExpr::Binary { ty, .. }
            | IrExpr::Call { ty, .. }
            | IrExpr::Lambda { ty, .. } => *ty,
        }
    }
}

/// Node-id to source-span provenance, plus the module's file name.
#[derive(Debug, Clone, Default)]
pub struct SourceMap {
    pub file: String,
    entries: BTreeMap<u32, Span>,
}

impl SourceMap {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            entries: BTreeMap::new(),
        }
    }

    pub fn add(&mut self, id: u32, span: Span) {
        self.entries.insert(id, span);
    }

    pub fn get(&self, id: u32) -> Option<Span> {
        self.entries.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, Span)> + '_ {
        self.entries.iter().map(|(id, span)| (*id, *span))
    }

    /// Serialize to the stable `{id: {file, line, ...}}` payload.
    pub fn to_json(&self) -> Value {
        let mut map = serde_json::Map::new();
        for (id, span) in &self.entries {
            map.insert(
                id.to_string(),
                json!({
                    "file": self.file,
                    "line": span.line,
                    "column": span.column,
                    "end_line": span.end_line,
                    "end_column": span.end_column,
                }),
            );
        }
        Value::Object(map)
    }
}

/// Walks the analyzed AST producing IR and its source map.
pub struct IrBuilder<'a> {
    semantic: &'a SemanticModel,
    counter: u32,
    source_map: SourceMap,
}

impl<'a> IrBuilder<'a> {
    pub fn new(semantic: &'a SemanticModel, file: impl Into<String>) -> Self {
        Self {
            semantic,
            counter: 0,
            source_map: SourceMap::new(file),
        }
    }

    pub fn build(mut self, program: &Program) -> (IrModule, SourceMap) {
        let id = self.next_id(program.span);
        let statements = program
            .statements
            .iter()
            .map(|stmt| self.build_stmt(stmt))
            .collect();
        let module = IrModule {
            id,
            span: program.span,
            statements,
        };
        (module, self.source_map)
    }

    fn build_stmt(&mut self, stmt: &Stmt) -> IrStmt {
        match stmt {
            Stmt::Assignment {
                span,
                name,
                type_hint,
                value,
            } => {
                let id = self.next_id(*span);
                IrStmt::Assignment {
                    id,
                    span: *span,
                    name: name.clone(),
                    type_hint: resolve_hint(type_hint.as_deref()),
                    value: self.build_expr(value),
                }
            }
            Stmt::Expression { span, expr } => {
                let id = self.next_id(*span);
                IrStmt::Expression {
                    id,
                    span: *span,
                    expr: self.build_expr(expr),
                }
            }
            Stmt::If {
                span,
                condition,
                then_block,
                else_block,
            } => {
                let id = self.next_id(*span);
                IrStmt::If {
                    id,
                    span: *span,
                    condition: self.build_expr(condition),
                    then_block: then_block.iter().map(|s| self.build_stmt(s)).collect(),
                    else_block: else_block.iter().map(|s| self.build_stmt(s)).collect(),
                }
            }
            Stmt::Loop {
                span,
                iterator,
                start,
                end,
                body,
            } => {
                let id = self.next_id(*span);
                IrStmt::Loop {
                    id,
                    span: *span,
                    iterator: iterator.clone(),
                    start: self.build_expr(start),
                    end: self.build_expr(end),
                    body: body.iter().map(|s| self.build_stmt(s)).collect(),
                }
            }
            Stmt::FunctionDef {
                span,
                name,
                params,
                return_type,
                body,
                expr_body,
            } => {
                let id = self.next_id(*span);
                IrStmt::Function {
                    id,
                    span: *span,
                    name: name.clone(),
                    params: params
                        .iter()
                        .map(|param| IrParam {
                            name: param.name.clone(),
                            type_hint: resolve_hint(param.type_hint.as_deref()),
                        })
                        .collect(),
                    return_type: resolve_hint(return_type.as_deref()),
                    body: body.iter().map(|s| self.build_stmt(s)).collect(),
                    expr_body: expr_body.as_ref().map(|expr| self.build_expr(expr)),
                }
            }
            Stmt::Return { span, value } => {
                let id = self.next_id(*span);
                IrStmt::Return {
                    id,
                    span: *span,
                    value: value.as_ref().map(|expr| self.build_expr(expr)),
                }
            }
            // Macros are fully expanded before IR build; a survivor becomes a
            // marker call so downstream artifacts stay structurally valid.
            Stmt::Macro { span, name, args } => {
                let id = self.next_id(*span);
                let call_id = self.next_id(*span);
                let callee_id = self.next_id(*span);
                IrStmt::Expression {
                    id,
                    span: *span,
                    expr: IrExpr::Call {
                        id: call_id,
                        span: *span,
                        ty: SymType::Any,
                        callee: Box::new(IrExpr::Ref {
                            id: callee_id,
                            span: *span,
                            ty: SymType::Fn,
                            name: format!("__macro_{name}"),
                        }),
                        args: args.iter().map(|arg| self.build_expr(arg)).collect(),
                        at_prefixed: true,
                    },
                }
            }
        }
    }

    fn build_expr(&mut self, expr: &Expr) -> IrExpr {
        let ty = self.semantic.expr_type(expr.span()).unwrap_or(SymType::Any);
        match expr {
            Expr::Literal { span, value } => {
                let id = self.next_id(*span);
                IrExpr::Literal {
                    id,
                    span: *span,
                    ty,
                    value: value.clone(),
                }
            }
            Expr::Identifier { span, name } => {
                let id = self.next_id(*span);
                IrExpr::Ref {
                    id,
                    span: *span,
                    ty,
                    name: name.clone(),
                }
            }
            Expr::Unary {
                span,
                operator,
                operand,
            } => {
                let id = self.next_id(*span);
                IrExpr::Unary {
                    id,
                    span: *span,
                    ty,
                    operator: operator.clone(),
                    operand: Box::new(self.build_expr(operand)),
                }
            }
            Expr::Binary {
                span,
                left,
                operator,
                right,
            } => {
                let id = self.next_id(*span);
                IrExpr::Binary {
                    id,
                    span: *span,
                    ty,
                    left: Box::new(self.build_expr(left)),
                    operator: operator.clone(),
                    right: Box::new(self.build_expr(right)),
                }
            }
            Expr::Call {
                span,
                callee,
                args,
                at_prefixed,
            } => {
                let id = self.next_id(*span);
                IrExpr::Call {
                    id,
                    span: *span,
                    ty,
                    callee: Box::new(self.build_expr(callee)),
                    args: args.iter().map(|arg| self.build_expr(arg)).collect(),
                    at_prefixed: *at_prefixed,
                }
            }
            Expr::Lambda {
                span,
                params,
                return_type,
                body,
            } => {
                let id = self.next_id(*span);
                IrExpr::Lambda {
                    id,
                    span: *span,
                    ty: SymType::Fn,
                    params: params
                        .iter()
                        .map(|param| IrParam {
                            name: param.name.clone(),
                            type_hint: resolve_hint(param.type_hint.as_deref()),
                        })
                        .collect(),
                    return_type: resolve_hint(return_type.as_deref()),
                    body: Box::new(self.build_expr(body)),
                }
            }
        }
    }

    fn next_id(&mut self, span: Span) -> u32 {
        self.counter += 1;
        self.source_map.add(self.counter, span);
        self.counter
    }
}

fn resolve_hint(annotation: Option<&str>) -> Option<SymType> {
    annotation.map(|name| SymType::from_annotation(name).unwrap_or(SymType::Any))
}

// ============================================================================
// JSON serialization for explain payloads
// ============================================================================

pub fn literal_to_json(value: &Literal) -> Value {
    match value {
        Literal::Int(v) => json!(v),
        Literal::Float(v) => json!(v),
        Literal::Str(v) => json!(v),
        Literal::Bool(v) => json!(v),
    }
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

pub fn module_to_json(module: &IrModule) -> Value {
    json!({
        "node_type": "IRModule",
        "id": module.id,
        "statements": module.statements.iter().map(stmt_to_json).collect::<Vec<_>>(),
    })
}

pub fn stmt_to_json(stmt: &IrStmt) -> Value {
    match stmt {
        IrStmt::Assignment {
            id,
            name,
            type_hint,
            value,
            ..
        } => json!({
            "node_type": "IRAssignment",
            "id": id,
            "name": name,
            "type_hint": type_hint.map(SymType::as_str),
            "value": expr_to_json(value),
        }),
        IrStmt::Expression { id, expr, .. } => json!({
            "node_type": "IRExpressionStmt",
            "id": id,
            "expr": expr_to_json(expr),
        }),
        IrStmt::If {
            id,
            condition,
            then_block,
            else_block,
            ..
        } => json!({
            "node_type": "IRIf",
            "id": id,
            "condition": expr_to_json(condition),
            "then_block": then_block.iter().map(stmt_to_json).collect::<Vec<_>>(),
            "else_block": else_block.iter().map(stmt_to_json).collect::<Vec<_>>(),
        }),
        IrStmt::Loop {
            id,
            iterator,
            start,
            end,
            body,
            ..
        } => json!({
            "node_type": "IRLoop",
            "id": id,
            "iterator": iterator,
            "start": expr_to_json(start),
            "end": expr_to_json(end),
            "body": body.iter().map(stmt_to_json).collect::<Vec<_>>(),
        }),
        IrStmt::Function {
            id,
            name,
            params,
            return_type,
            body,
            expr_body,
            ..
        } => json!({
            "node_type": "IRFunction",
            "id": id,
            "name": name,
            "params": params_to_json(params),
            "return_type": return_type.map(SymType::as_str),
            "body": body.iter().map(stmt_to_json).collect::<Vec<_>>(),
            "expr_body": expr_body.as_ref().map(expr_to_json),
        }),
        IrStmt::Return { id, value, .. } => json!({
            "node_type": "IRReturn",
            "id": id,
            "value": value.as_ref().map(expr_to_json),
        }),
    }
}

pub fn expr_to_json(expr: &IrExpr) -> Value {
    match expr {
        IrExpr::Literal { id, ty, value, .. } => json!({
            "node_type": "IRLiteral",
            "id": id,
            "expr_type": ty.as_str(),
            "value": literal_to_json(value),
            "value_type": value.type_name(),
        }),
        IrExpr::Ref { id, ty, name, .. } => json!({
            "node_type": "IRRef",
            "id": id,
            "expr_type": ty.as_str(),
            "name": name,
        }),
        IrExpr::Unary {
            id,
            ty,
            operator,
            operand,
            ..
        } => json!({
            "node_type": "IRUnary",
            "id": id,
            "expr_type": ty.as_str(),
            "operator": operator,
            "operand": expr_to_json(operand),
        }),
        IrExpr::Binary {
            id,
            ty,
            left,
            operator,
            right,
            ..
        } => json!({
            "node_type": "IRBinary",
            "id": id,
            "expr_type": ty.as_str(),
            "left": expr_to_json(left),
            "operator": operator,
            "right": expr_to_json(right),
        }),
        IrExpr::Call {
            id,
            ty,
            callee,
            args,
            at_prefixed,
            ..
        } => json!({
            "node_type": "IRCall",
            "id": id,
            "expr_type": ty.as_str(),
            "callee": expr_to_json(callee),
            "args": args.iter().map(expr_to_json).collect::<Vec<_>>(),
            "at_prefixed": at_prefixed,
        }),
        IrExpr::Lambda {
            id,
            ty,
            params,
            return_type,
            body,
            ..
        } => json!({
            "node_type": "IRLambda",
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
    use crate::frontend::{lexer, parser, semantic};

    fn build(source: &str) -> (IrModule, SourceMap) {
        let tokens = lexer::lex(source).expect("lex should succeed");
        let program = parser::parse(&tokens).expect("parse should succeed");
        let model = semantic::analyze(&program).expect("analysis should succeed");
        IrBuilder::new(&model, "<input>").build(&program)
    }

    fn collect_ids(module: &IrModule) -> Vec<u32> {
        fn walk_expr(expr: &IrExpr, out: &mut Vec<u32>) {
            match expr {
                IrExpr::Literal { id, .. } | IrExpr::Ref { id, .. } => out.push(*id),
                IrExpr::Unary { id, operand, .. } => {
                    out.push(*id);
                    walk_expr(operand, out);
                }
                IrExpr::Binary {
                    id, left, right, ..
                } => {
                    out.push(*id);
                    walk_expr(left, out);
                    walk_expr(right, out);
                }
                IrExpr::Call {
                    id, callee, args, ..
                } => {
                    out.push(*id);
                    walk_expr(callee, out);
                    for arg in args {
                        walk_expr(arg, out);
                    }
                }
                IrExpr::Lambda { id, body, .. } => {
                    out.push(*id);
                    walk_expr(body, out);
                }
            }
        }
        fn walk_stmt(stmt: &IrStmt, out: &mut Vec<u32>) {
            match stmt {
                IrStmt::Assignment { id, value, .. } => {
                    out.push(*id);
                    walk_expr(value, out);
                }
                IrStmt::Expression { id, expr, .. } => {
                    out.push(*id);
                    walk_expr(expr, out);
                }
                IrStmt::If {
                    id,
                    condition,
                    then_block,
                    else_block,
                    ..
                } => {
                    out.push(*id);
                    walk_expr(condition, out);
                    for inner in then_block.iter().chain(else_block) {
                        walk_stmt(inner, out);
                    }
                }
                IrStmt::Loop {
                    id,
                    start,
                    end,
                    body,
                    ..
                } => {
                    out.push(*id);
                    walk_expr(start, out);
                    walk_expr(end, out);
                    for inner in body {
                        walk_stmt(inner, out);
                    }
                }
                IrStmt::Function {
                    id,
                    body,
                    expr_body,
                    ..
                } => {
                    out.push(*id);
                    for inner in body {
                        walk_stmt(inner, out);
                    }
                    if let Some(expr) = expr_body {
                        walk_expr(expr, out);
                    }
                }
                IrStmt::Return { id, value, .. } => {
                    out.push(*id);
                    if let Some(expr) = value {
                        walk_expr(expr, out);
                    }
                }
            }
        }

        let mut ids = vec![module.id];
        for stmt in &module.statements {
            walk_stmt(stmt, &mut ids);
        }
        ids
    }

    #[test]
    fn ids_are_sequential_from_one() {
        let (module, _) = build("x := 1 + 2; @print(x);");
        let mut ids = collect_ids(&module);
        ids.sort_unstable();
        let expected: Vec<u32> = (1..=ids.len() as u32).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn every_id_has_a_source_map_entry() {
        let (module, source_map) = build("fn add(a:Num,b:Num):Num => a+b; x := @add(1,2);");
        for id in collect_ids(&module) {
            assert!(source_map.get(id).is_some(), "id {id} missing from source map");
        }
    }

    #[test]
    fn expressions_carry_inferred_types() {
        let (module, _) = build("x := 1 + 2;");
        let IrStmt::Assignment { value, .. } = &module.statements[0] else {
            panic!("expected assignment");
        };
        assert_eq!(value.ty(), SymType::Num);
    }

    #[test]
    fn at_flag_is_preserved_as_metadata() {
        let (module, _) = build("fn f(n:Num):Num => n; x := @f(1);");
        let IrStmt::Assignment { value, .. } = &module.statements[1] else {
            panic!("expected assignment");
        };
        assert!(matches!(value, IrExpr::Call { at_prefixed: true, .. }));
    }

    #[test]
    fn lambda_is_typed_fn() {
        let (module, _) = build("f := lam(a:Num) => a + 1;");
        let IrStmt::Assignment { value, .. } = &module.statements[0] else {
            panic!("expected assignment");
        };
        assert_eq!(value.ty(), SymType::Fn);
    }

    #[test]
    fn two_builds_produce_identical_ids() {
        let source = "sum := 0; loop i in 0..3 { sum := sum + i; } @print(sum);";
        let (first, _) = build(source);
        let (second, _) = build(source);
        assert_eq!(collect_ids(&first), collect_ids(&second));
    }

    #[test]
    fn json_shape_is_tagged() {
        let (module, _) = build("x := 1;");
        let payload = module_to_json(&module);
        assert_eq!(payload["node_type"], "IRModule");
        assert_eq!(payload["statements"][0]["node_type"], "IRAssignment");
        assert_eq!(payload["statements"][0]["value"]["node_type"], "IRLiteral");
    }
}
