//! JavaScript language pack.
//!
//! Assignments declare with `let` on the first binding in the enclosing
//! scope and plain-assign thereafter; block scopes (branches, loop bodies,
//! function bodies) track their own declarations. The `print` runtime helper
//! is injected when the lowered module requires it.

use std::collections::BTreeSet;

use icl_core::features;

use crate::backend::lower::{LoweredExpr, LoweredModule, LoweredStmt};
use crate::backend::packs::{
    BlockModel, EmissionContext, LanguagePack, PackManifest, Scaffolding, Stability,
    StatementTermination,
};
use crate::frontend::ast::Literal;

pub struct JavaScriptPack {
    manifest: PackManifest,
}

impl JavaScriptPack {
    pub fn new() -> Self {
        Self {
            manifest: PackManifest {
                pack_id: "icl.javascript".to_string(),
                version: "2.0.0".to_string(),
                target: "js".to_string(),
                aliases: vec!["javascript".to_string(), "node".to_string()],
                stability: Stability::Stable,
                file_extension: "js".to_string(),
                block_model: BlockModel::Braces,
                statement_termination: StatementTermination::Semicolon,
                type_strategy: "gradual_symbolic_runtime".to_string(),
                runtime_helpers: vec!["print".to_string()],
                scaffolding: Scaffolding::single("main.js"),
                feature_coverage: features::full_coverage(),
            },
        }
    }
}

impl Default for JavaScriptPack {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguagePack for JavaScriptPack {
    fn manifest(&self) -> &PackManifest {
        &self.manifest
    }

    fn emit(&self, lowered: &LoweredModule, _context: &EmissionContext) -> String {
        let body = JsEmitter::new().emit_module(lowered);
        if !lowered.required_helpers.iter().any(|h| h == "print") {
            return body;
        }
        let helper = "function print(value) {\n  console.log(value);\n}\n\n";
        format!("{helper}{body}")
    }
}

/// Statement emitter with scope-tracked `let` declarations.
pub struct JsEmitter {
    scopes: Vec<BTreeSet<String>>,
}

impl JsEmitter {
    pub fn new() -> Self {
        Self {
            scopes: vec![BTreeSet::new()],
        }
    }

    pub fn emit_module(mut self, lowered: &LoweredModule) -> String {
        let mut lines = Vec::new();
        for stmt in &lowered.statements {
            self.emit_stmt(stmt, 0, &mut lines);
        }
        let mut out = lines.join("\n");
        while out.ends_with('\n') || out.ends_with(' ') {
            out.pop();
        }
        out.push('\n');
        out
    }

    fn emit_stmt(&mut self, stmt: &LoweredStmt, indent: usize, lines: &mut Vec<String>) {
        match stmt {
            LoweredStmt::Assignment { name, value, .. } => {
                let value_src = self.emit_expr(value);
                if self.is_declared(name) {
                    lines.push(format!("{}{} = {};", pad(indent), name, value_src));
                } else {
                    self.declare(name);
                    lines.push(format!("{}let {} = {};", pad(indent), name, value_src));
                }
            }

            LoweredStmt::Expression { expr, .. } => {
                lines.push(format!("{}{};", pad(indent), self.emit_expr(expr)));
            }

            LoweredStmt::If {
                condition,
                then_block,
                else_block,
                ..
            } => {
                lines.push(format!(
                    "{}if ({}) {{",
                    pad(indent),
                    self.emit_expr(condition)
                ));
                self.scopes.push(BTreeSet::new());
                for inner in then_block {
                    self.emit_stmt(inner, indent + 1, lines);
                }
                self.scopes.pop();
                lines.push(format!("{}}}", pad(indent)));

                if !else_block.is_empty() {
                    let last = lines.len() - 1;
                    lines[last] = format!("{}}} else {{", pad(indent));
                    self.scopes.push(BTreeSet::new());
                    for inner in else_block {
                        self.emit_stmt(inner, indent + 1, lines);
                    }
                    self.scopes.pop();
                    lines.push(format!("{}}}", pad(indent)));
                }
            }

            LoweredStmt::Loop {
                iterator,
                start,
                end,
                body,
                ..
            } => {
                let start_src = self.emit_expr(start);
                let end_src = self.emit_expr(end);
                lines.push(format!(
                    "{}for (let {it} = {start_src}; {it} < {end_src}; {it}++) {{",
                    pad(indent),
                    it = iterator,
                ));
                self.scopes.push(BTreeSet::new());
                self.declare(iterator);
                for inner in body {
                    self.emit_stmt(inner, indent + 1, lines);
                }
                self.scopes.pop();
                lines.push(format!("{}}}", pad(indent)));
            }

            LoweredStmt::Function {
                name, params, body, ..
            } => {
                let param_src: Vec<&str> = params.iter().map(|p| p.name.as_str()).collect();
                lines.push(format!(
                    "{}function {}({}) {{",
                    pad(indent),
                    name,
                    param_src.join(", ")
                ));
                self.scopes.push(BTreeSet::new());
                for param in params {
                    self.declare(&param.name);
                }
                for inner in body {
                    self.emit_stmt(inner, indent + 1, lines);
                }
                self.scopes.pop();
                lines.push(format!("{}}}", pad(indent)));
            }

            LoweredStmt::Return { value, .. } => match value {
                Some(expr) => {
                    lines.push(format!("{}return {};", pad(indent), self.emit_expr(expr)))
                }
                None => lines.push(format!("{}return;", pad(indent))),
            },
        }
    }

    fn emit_expr(&mut self, expr: &LoweredExpr) -> String {
        match expr {
            LoweredExpr::Literal { value, .. } => render_literal(value),

            LoweredExpr::Ref { name, .. } => name.clone(),

            LoweredExpr::Unary {
                operator, operand, ..
            } => format!("({}{})", operator, self.emit_expr(operand)),

            LoweredExpr::Binary {
                left,
                operator,
                right,
                ..
            } => format!(
                "({} {} {})",
                self.emit_expr(left),
                operator,
                self.emit_expr(right)
            ),

            LoweredExpr::Call { callee, args, .. } => {
                let args_src: Vec<String> = args.iter().map(|arg| self.emit_expr(arg)).collect();
                format!("{}({})", self.emit_expr(callee), args_src.join(", "))
            }

            LoweredExpr::Lambda { params, body, .. } => {
                let param_src: Vec<&str> = params.iter().map(|p| p.name.as_str()).collect();
                format!("(({}) => {})", param_src.join(", "), self.emit_expr(body))
            }
        }
    }

    fn is_declared(&self, name: &str) -> bool {
        self.scopes.iter().any(|scope| scope.contains(name))
    }

    fn declare(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string());
        }
    }
}

impl Default for JsEmitter {
    fn default() -> Self {
        Self::new()
    }
}

fn pad(level: usize) -> String {
    "    ".repeat(level)
}

fn render_literal(value: &Literal) -> String {
    match value {
        Literal::Int(v) => v.to_string(),
        Literal::Float(v) => {
            let text = format!("{v}");
            if text.contains('.') || text.contains('e') {
                text
            } else {
                format!("{text}.0")
            }
        }
        Literal::Bool(true) => "true".to_string(),
        Literal::Bool(false) => "false".to_string(),
        Literal::Str(v) => serde_json::to_string(v).unwrap_or_else(|_| "\"\"".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::lower_for;

    fn emit(source: &str) -> String {
        let pack = JavaScriptPack::new();
        let lowered = lower_for(source, pack.manifest());
        pack.emit(&lowered, &EmissionContext::for_target("js"))
    }

    #[test]
    fn assignment_declares_with_let_once() {
        assert_eq!(emit("x := 1 + 2; x := 5;"), "let x = (1 + 2);\nx = 5;\n");
    }

    #[test]
    fn branch_scopes_declare_independently() {
        assert_eq!(
            emit("if true ? { x := 1; } : { x := 2; }"),
            "if (true) {\n    let x = 1;\n} else {\n    let x = 2;\n}\n"
        );
    }

    #[test]
    fn loop_renders_counter_form() {
        assert_eq!(
            emit("sum := 0; loop i in 0..3 { sum := sum + i; }"),
            "let sum = 0;\nfor (let i = 0; i < 3; i++) {\n    sum = (sum + i);\n}\n"
        );
    }

    #[test]
    fn print_helper_is_injected_when_required() {
        let out = emit("@print(1);");
        assert!(out.starts_with("function print(value) {\n  console.log(value);\n}\n\n"));
        assert!(out.ends_with("print(1);\n"));
    }

    #[test]
    fn no_helper_without_print_usage() {
        assert_eq!(emit("x := 1;"), "let x = 1;\n");
    }

    #[test]
    fn function_with_expression_body() {
        assert_eq!(
            emit("fn add(a:Num,b:Num):Num => a+b; result := @add(3,4);"),
            "function add(a, b) {\n    return (a + b);\n}\nlet result = add(3, 4);\n"
        );
    }

    #[test]
    fn lambda_renders_arrow_function() {
        assert_eq!(emit("f := lam(a:Num) => a + 1;"), "let f = ((a) => (a + 1));\n");
    }

    #[test]
    fn string_literals_are_json_escaped() {
        assert_eq!(emit("s := \"a\\\"b\";"), "let s = \"a\\\"b\";\n");
    }
}
