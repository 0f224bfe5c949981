//! Abstract syntax tree for ICL programs.
//!
//! A source-faithful tagged tree: every node carries the span it was parsed
//! from. Statements and expressions are closed enums so each later stage is
//! forced to handle every node kind exhaustively.

use crate::frontend::diagnostics::Span;

/// Literal payload. Integers and floats stay distinct so emitters can render
/// `1` versus `1.5` the way each target expects.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
}

impl Literal {
    /// Tag name used in graph attributes and explain payloads.
    pub fn type_name(&self) -> &'static str {
        match self {
            Literal::Int(_) => "int",
            Literal::Float(_) => "float",
            Literal::Str(_) => "str",
            Literal::Bool(_) => "bool",
        }
    }
}

/// Function or lambda parameter with optional type annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub type_hint: Option<String>,
}

/// Root AST node representing a full ICL module.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub span: Span,
    pub statements: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `name [: Type] := expr`
    Assignment {
        span: Span,
        name: String,
        type_hint: Option<String>,
        value: Expr,
    },
    /// Expression used in statement position.
    Expression { span: Span, expr: Expr },
    /// `if cond ? { ... } [: { ... }]`
    If {
        span: Span,
        condition: Expr,
        then_block: Vec<Stmt>,
        else_block: Vec<Stmt>,
    },
    /// `loop iter in start..end { ... }`
    Loop {
        span: Span,
        iterator: String,
        start: Expr,
        end: Expr,
        body: Vec<Stmt>,
    },
    /// `fn name(params) [:Type] => expr` or `fn name(params) [:Type] { ... }`
    FunctionDef {
        span: Span,
        name: String,
        params: Vec<Param>,
        return_type: Option<String>,
        body: Vec<Stmt>,
        expr_body: Option<Expr>,
    },
    /// `ret [expr]`
    Return { span: Span, value: Option<Expr> },
    /// `#name(args)` — replaced during macro expansion.
    Macro {
        span: Span,
        name: String,
        args: Vec<Expr>,
    },
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Assignment { span, .. }
            | Stmt::Expression { span, .. }
            | Stmt::If { span, .. }
            | Stmt::Loop { span, .. }
            | Stmt::FunctionDef { span, .. }
            | Stmt::Return { span, .. }
            | Stmt::Macro { span, .. } => *span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal {
        span: Span,
        value: Literal,
    },
    Identifier {
        span: Span,
        name: String,
    },
    Unary {
        span: Span,
        operator: String,
        operand: Box<Expr>,
    },
    Binary {
        span: Span,
        left: Box<Expr>,
        operator: String,
        right: Box<Expr>,
    },
    Call {
        span: Span,
        callee: Box<Expr>,
        args: Vec<Expr>,
        /// `@name(...)` form; telemetry only, no semantic effect.
        at_prefixed: bool,
    },
    Lambda {
        span: Span,
        params: Vec<Param>,
        return_type: Option<String>,
        body: Box<Expr>,
    },
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Literal { span, .. }
            | Expr::Identifier { span, .. }
            | Expr::Unary { span, .. }
            | Expr::Binary { span, .. }
            | Expr::Call { span, .. }
            | Expr::Lambda { span, .. } => *span,
        }
    }
}

// ============================================================================
// JSON serialization for explain payloads
// ============================================================================

use serde_json::{json, Value};

fn params_to_json(params: &[Param]) -> Value {
    Value::Array(
        params
            .iter()
            .map(|param| json!({"name": param.name, "type_hint": param.type_hint}))
            .collect(),
    )
}

pub fn program_to_json(program: &Program) -> Value {
    json!({
        "node_type": "Program",
        "statements": program.statements.iter().map(stmt_to_json).collect::<Vec<_>>(),
    })
}

pub fn stmt_to_json(stmt: &Stmt) -> Value {
    match stmt {
        Stmt::Assignment {
            name,
            type_hint,
            value,
            ..
        } => json!({
            "node_type": "AssignmentStmt",
            "name": name,
            "type_hint": type_hint,
            "value": expr_to_json(value),
        }),
        Stmt::Expression { expr, .. } => json!({
            "node_type": "ExpressionStmt",
            "expr": expr_to_json(expr),
        }),
        Stmt::If {
            condition,
            then_block,
            else_block,
            ..
        } => json!({
            "node_type": "IfStmt",
            "condition": expr_to_json(condition),
            "then_block": then_block.iter().map(stmt_to_json).collect::<Vec<_>>(),
            "else_block": else_block.iter().map(stmt_to_json).collect::<Vec<_>>(),
        }),
        Stmt::Loop {
            iterator,
            start,
            end,
            body,
            ..
        } => json!({
            "node_type": "LoopStmt",
            "iterator": iterator,
            "start": expr_to_json(start),
            "end": expr_to_json(end),
            "body": body.iter().map(stmt_to_json).collect::<Vec<_>>(),
        }),
        Stmt::FunctionDef {
            name,
            params,
            return_type,
            body,
            expr_body,
            ..
        } => json!({
            "node_type": "FunctionDefStmt",
            "name": name,
            "params": params_to_json(params),
            "return_type": return_type,
            "body": body.iter().map(stmt_to_json).collect::<Vec<_>>(),
            "expr_body": expr_body.as_ref().map(expr_to_json),
        }),
        Stmt::Return { value, .. } => json!({
            "node_type": "ReturnStmt",
            "value": value.as_ref().map(expr_to_json),
        }),
        Stmt::Macro { name, args, .. } => json!({
            "node_type": "MacroStmt",
            "name": name,
            "args": args.iter().map(expr_to_json).collect::<Vec<_>>(),
        }),
    }
}

pub fn expr_to_json(expr: &Expr) -> Value {
    match expr {
        Expr::Literal { value, .. } => json!({
            "node_type": "LiteralExpr",
            "value": match value {
                Literal::Int(v) => json!(v),
                Literal::Float(v) => json!(v),
                Literal::Str(v) => json!(v),
                Literal::Bool(v) => json!(v),
            },
            "value_type": value.type_name(),
        }),
        Expr::Identifier { name, .. } => json!({
            "node_type": "IdentifierExpr",
            "name": name,
        }),
        Expr::Unary {
            operator, operand, ..
        } => json!({
            "node_type": "UnaryExpr",
            "operator": operator,
            "operand": expr_to_json(operand),
        }),
        Expr::Binary {
            left,
            operator,
            right,
            ..
        } => json!({
            "node_type": "BinaryExpr",
            "operator": operator,
            "left": expr_to_json(left),
            "right": expr_to_json(right),
        }),
        Expr::Call {
            callee,
            args,
            at_prefixed,
            ..
        } => json!({
            "node_type": "CallExpr",
            "callee": expr_to_json(callee),
            "args": args.iter().map(expr_to_json).collect::<Vec<_>>(),
            "at_prefixed": at_prefixed,
        }),
        Expr::Lambda {
            params,
            return_type,
            body,
            ..
        } => json!({
            "node_type": "LambdaExpr",
            "params": params_to_json(params),
            "return_type": return_type,
            "body": expr_to_json(body),
        }),
    }
}
