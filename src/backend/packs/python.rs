//! Python language pack: indent-block emission.

use icl_core::features;

use crate::backend::lower::{LoweredExpr, LoweredModule, LoweredStmt};
use crate::backend::packs::{
    BlockModel, EmissionContext, LanguagePack, PackManifest, Scaffolding, Stability,
    StatementTermination,
};
use crate::frontend::ast::Literal;

pub struct PythonPack {
    manifest: PackManifest,
}

impl PythonPack {
    pub fn new() -> Self {
        Self {
            manifest: PackManifest {
                pack_id: "icl.python".to_string(),
                version: "2.0.0".to_string(),
                target: "python".to_string(),
                aliases: vec!["py".to_string()],
                stability: Stability::Stable,
                file_extension: "py".to_string(),
                block_model: BlockModel::Indent,
                statement_termination: StatementTermination::Newline,
                type_strategy: "gradual_symbolic_runtime".to_string(),
                runtime_helpers: vec![],
                scaffolding: Scaffolding::single("main.py"),
                feature_coverage: features::full_coverage(),
            },
        }
    }
}

impl Default for PythonPack {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguagePack for PythonPack {
    fn manifest(&self) -> &PackManifest {
        &self.manifest
    }

    fn emit(&self, lowered: &LoweredModule, _context: &EmissionContext) -> String {
        let mut lines = Vec::new();
        for stmt in &lowered.statements {
            emit_stmt(stmt, 0, &mut lines);
        }
        let mut out = lines.join("\n");
        while out.ends_with('\n') || out.ends_with(' ') {
            out.pop();
        }
        out.push('\n');
        out
    }
}

fn pad(level: usize) -> String {
    "    ".repeat(level)
}

fn emit_stmt(stmt: &LoweredStmt, indent: usize, lines: &mut Vec<String>) {
    match stmt {
        LoweredStmt::Assignment { name, value, .. } => {
            lines.push(format!("{}{} = {}", pad(indent), name, emit_expr(value)));
        }

        LoweredStmt::Expression { expr, .. } => {
            lines.push(format!("{}{}", pad(indent), emit_expr(expr)));
        }

        LoweredStmt::If {
            condition,
            then_block,
            else_block,
            ..
        } => {
            lines.push(format!("{}if {}:", pad(indent), emit_expr(condition)));
            if then_block.is_empty() {
                lines.push(format!("{}pass", pad(indent + 1)));
            } else {
                for inner in then_block {
                    emit_stmt(inner, indent + 1, lines);
                }
            }
            if !else_block.is_empty() {
                lines.push(format!("{}else:", pad(indent)));
                for inner in else_block {
                    emit_stmt(inner, indent + 1, lines);
                }
            }
        }

        LoweredStmt::Loop {
            iterator,
            start,
            end,
            body,
            ..
        } => {
            lines.push(format!(
                "{}for {} in range({}, {}):",
                pad(indent),
                iterator,
                emit_expr(start),
                emit_expr(end)
            ));
            if body.is_empty() {
                lines.push(format!("{}pass", pad(indent + 1)));
            } else {
                for inner in body {
                    emit_stmt(inner, indent + 1, lines);
                }
            }
        }

        LoweredStmt::Function {
            name, params, body, ..
        } => {
            let param_src: Vec<&str> = params.iter().map(|p| p.name.as_str()).collect();
            lines.push(format!(
                "{}def {}({}):",
                pad(indent),
                name,
                param_src.join(", ")
            ));
            if body.is_empty() {
                lines.push(format!("{}pass", pad(indent + 1)));
            } else {
                for inner in body {
                    emit_stmt(inner, indent + 1, lines);
                }
            }
        }

        LoweredStmt::Return { value, .. } => match value {
            Some(expr) => lines.push(format!("{}return {}", pad(indent), emit_expr(expr))),
            None => lines.push(format!("{}return", pad(indent))),
        },
    }
}

fn emit_expr(expr: &LoweredExpr) -> String {
    match expr {
        LoweredExpr::Literal { value, .. } => render_literal(value),

        LoweredExpr::Ref { name, .. } => name.clone(),

        LoweredExpr::Unary {
            operator, operand, ..
        } => {
            let operand_src = emit_expr(operand);
            if operator == "!" {
                format!("(not {operand_src})")
            } else {
                format!("({operator}{operand_src})")
            }
        }

        LoweredExpr::Binary {
            left,
            operator,
            right,
            ..
        } => {
            let mapped = match operator.as_str() {
                "&&" => "and",
                "||" => "or",
                other => other,
            };
            format!("({} {} {})", emit_expr(left), mapped, emit_expr(right))
        }

        LoweredExpr::Call { callee, args, .. } => {
            let args_src: Vec<String> = args.iter().map(emit_expr).collect();
            format!("{}({})", emit_expr(callee), args_src.join(", "))
        }

        LoweredExpr::Lambda { params, body, .. } => {
            let param_src: Vec<&str> = params.iter().map(|p| p.name.as_str()).collect();
            format!("(lambda {}: {})", param_src.join(", "), emit_expr(body))
        }
    }
}

fn render_literal(value: &Literal) -> String {
    match value {
        Literal::Int(v) => v.to_string(),
        Literal::Float(v) => render_float(*v),
        Literal::Bool(true) => "True".to_string(),
        Literal::Bool(false) => "False".to_string(),
        Literal::Str(v) => {
            let mut out = String::with_capacity(v.len() + 2);
            out.push('\'');
            for ch in v.chars() {
                match ch {
                    '\\' => out.push_str("\\\\"),
                    '\'' => out.push_str("\\'"),
                    '\n' => out.push_str("\\n"),
                    '\t' => out.push_str("\\t"),
                    '\r' => out.push_str("\\r"),
                    other => out.push(other),
                }
            }
            out.push('\'');
            out
        }
    }
}

fn render_float(value: f64) -> String {
    let text = format!("{value}");
    if text.contains('.') || text.contains('e') {
        text
    } else {
        format!("{text}.0")
    }
}
