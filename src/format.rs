//! Canonical compact ICL serialization (the `compress` surface).
//!
//! Produces a whitespace-minimal rendering of a parsed program that parses
//! back to the same AST (modulo span offsets): binaries re-parenthesize,
//! statements join with newlines, block interiors join with semicolons.

use crate::frontend::ast::{Expr, Literal, Program, Stmt};
use crate::frontend::diagnostics::Diagnostic;
use crate::frontend::{lexer, parser};

/// Parse source and return its canonical compact encoding.
pub fn compress_source(source: &str) -> Result<String, Vec<Diagnostic>> {
    let tokens = lexer::lex(source)?;
    let program = parser::parse(&tokens)?;
    Ok(compress_program(&program))
}

pub fn compress_program(program: &Program) -> String {
    let mut out = program
        .statements
        .iter()
        .map(emit_stmt)
        .collect::<Vec<_>>()
        .join("\n");
    while out.ends_with('\n') || out.ends_with(' ') {
        out.pop();
    }
    out.push('\n');
    out
}

fn emit_block(statements: &[Stmt]) -> String {
    statements.iter().map(emit_stmt).collect::<Vec<_>>().join(";")
}

fn emit_stmt(stmt: &Stmt) -> String {
    match stmt {
        Stmt::Assignment {
            name,
            type_hint,
            value,
            ..
        } => match type_hint {
            Some(hint) => format!("{name}:{hint}:={}", emit_expr(value)),
            None => format!("{name}:={}", emit_expr(value)),
        },

        Stmt::Expression { expr, .. } => emit_expr(expr),

        Stmt::Return { value, .. } => match value {
            Some(expr) => format!("ret {}", emit_expr(expr)),
            None => "ret".to_string(),
        },

        Stmt::Loop {
            iterator,
            start,
            end,
            body,
            ..
        } => format!(
            "loop {iterator} in {}..{}{{{}}}",
            emit_expr(start),
            emit_expr(end),
            emit_block(body)
        ),

        Stmt::If {
            condition,
            then_block,
            else_block,
            ..
        } => {
            if else_block.is_empty() {
                format!("if {}?{{{}}}", emit_expr(condition), emit_block(then_block))
            } else {
                format!(
                    "if {}?{{{}}}:{{{}}}",
                    emit_expr(condition),
                    emit_block(then_block),
                    emit_block(else_block)
                )
            }
        }

        Stmt::FunctionDef {
            name,
            params,
            return_type,
            body,
            expr_body,
            ..
        } => {
            let params_src = params
                .iter()
                .map(|param| match &param.type_hint {
                    Some(hint) => format!("{}:{}", param.name, hint),
                    None => param.name.clone(),
                })
                .collect::<Vec<_>>()
                .join(",");
            let suffix = match return_type {
                Some(hint) => format!(":{hint}"),
                None => String::new(),
            };
            match expr_body {
                Some(expr) => format!("fn {name}({params_src}){suffix}=>{}", emit_expr(expr)),
                None => format!("fn {name}({params_src}){suffix}{{{}}}", emit_block(body)),
            }
        }

        Stmt::Macro { name, args, .. } => {
            let args_src = args.iter().map(emit_expr).collect::<Vec<_>>().join(",");
            format!("#{name}({args_src})")
        }
    }
}

fn emit_expr(expr: &Expr) -> String {
    match expr {
        Expr::Literal { value, .. } => match value {
            Literal::Int(v) => v.to_string(),
            Literal::Float(v) => {
                let text = format!("{v}");
                if text.contains('.') {
                    text
                } else {
                    format!("{text}.0")
                }
            }
            Literal::Bool(true) => "true".to_string(),
            Literal::Bool(false) => "false".to_string(),
            Literal::Str(v) => {
                let mut out = String::with_capacity(v.len() + 2);
                out.push('"');
                for ch in v.chars() {
                    match ch {
                        '\\' => out.push_str("\\\\"),
                        '"' => out.push_str("\\\""),
                        '\n' => out.push_str("\\n"),
                        '\t' => out.push_str("\\t"),
                        other => out.push(other),
                    }
                }
                out.push('"');
                out
            }
        },

        Expr::Identifier { name, .. } => name.clone(),

        Expr::Unary {
            operator, operand, ..
        } => format!("{operator}{}", emit_expr(operand)),

        Expr::Binary {
            left,
            operator,
            right,
            ..
        } => format!("({}{}{})", emit_expr(left), operator, emit_expr(right)),

        Expr::Call {
            callee,
            args,
            at_prefixed,
            ..
        } => {
            let prefix = if *at_prefixed && matches!(callee.as_ref(), Expr::Identifier { .. }) {
                "@"
            } else {
                ""
            };
            let args_src = args.iter().map(emit_expr).collect::<Vec<_>>().join(",");
            format!("{prefix}{}({args_src})", emit_expr(callee))
        }

        Expr::Lambda {
            params,
            return_type,
            body,
            ..
        } => {
            let params_src = params
                .iter()
                .map(|param| match &param.type_hint {
                    Some(hint) => format!("{}:{}", param.name, hint),
                    None => param.name.clone(),
                })
                .collect::<Vec<_>>()
                .join(",");
            let suffix = match return_type {
                Some(hint) => format!(":{hint}"),
                None => String::new(),
            };
            format!("lam({params_src}){suffix}=>{}", emit_expr(body))
        }
    }
}

/// Strip spans for AST-level equivalence checks.
#[cfg(test)]
fn structural_fingerprint(program: &Program) -> String {
    format!("{:?}", crate::frontend::ast::program_to_json(program))
}
