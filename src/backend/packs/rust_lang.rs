//! Rust language pack: typed emission with scope-tracked coercions.
//!
//! Symbolic types map onto concrete Rust types (Num -> f64, loop counters ->
//! i64) and every use site coerces operands to the type the construct needs,
//! so the emitted program compiles under rustc without inference surprises.
//! Top-level non-function statements collect into `fn main()`.

use std::collections::BTreeMap;
use std::fmt;

use icl_core::features;
use icl_core::types::SymType;

use crate::backend::lower::{LoweredExpr, LoweredModule, LoweredStmt};
use crate::backend::packs::{
    BlockModel, EmissionContext, LanguagePack, PackManifest, Scaffolding, Stability,
    StatementTermination,
};
use crate::frontend::ast::Literal;

pub struct RustPack {
    manifest: PackManifest,
}

impl RustPack {
    pub fn new() -> Self {
        Self {
            manifest: PackManifest {
                pack_id: "icl.rust".to_string(),
                version: "2.0.0".to_string(),
                target: "rust".to_string(),
                aliases: vec!["rs".to_string()],
                stability: Stability::Stable,
                file_extension: "rs".to_string(),
                block_model: BlockModel::Braces,
                statement_termination: StatementTermination::Semicolon,
                type_strategy: "gradual_symbolic_scaffold".to_string(),
                runtime_helpers: vec![],
                scaffolding: Scaffolding::single("main.rs"),
                feature_coverage: features::full_coverage(),
            },
        }
    }
}

impl Default for RustPack {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguagePack for RustPack {
    fn manifest(&self) -> &PackManifest {
        &self.manifest
    }

    fn emit(&self, lowered: &LoweredModule, _context: &EmissionContext) -> String {
        RustEmitter::new().emit_module(lowered)
    }
}

/// Concrete Rust types the emitter juggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RustType {
    F64,
    I64,
    Bool,
    Str,
    Unit,
    /// Closure-valued bindings; declared without an annotation.
    Fn,
}

impl RustType {
    fn from_hint(hint: Option<SymType>) -> RustType {
        match hint {
            Some(SymType::Bool) => RustType::Bool,
            Some(SymType::Str) => RustType::Str,
            Some(SymType::Void) => RustType::Unit,
            // Num, Any, Fn, and missing hints all scaffold as f64.
            _ => RustType::F64,
        }
    }

    fn is_numeric(self) -> bool {
        matches!(self, RustType::F64 | RustType::I64)
    }
}

impl fmt::Display for RustType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RustType::F64 => "f64",
            RustType::I64 => "i64",
            RustType::Bool => "bool",
            RustType::Str => "String",
            RustType::Unit => "()",
            RustType::Fn => "Fn",
        })
    }
}

struct RustEmitter {
    function_return_types: BTreeMap<String, RustType>,
    function_param_types: BTreeMap<String, Vec<RustType>>,
    scopes: Vec<BTreeMap<String, RustType>>,
    current_return: Option<RustType>,
}

impl RustEmitter {
    fn new() -> Self {
        Self {
            function_return_types: BTreeMap::new(),
            function_param_types: BTreeMap::new(),
            scopes: Vec::new(),
            current_return: None,
        }
    }

    fn emit_module(mut self, lowered: &LoweredModule) -> String {
        let mut functions = Vec::new();
        let mut main_stmts = Vec::new();
        for stmt in &lowered.statements {
            if matches!(stmt, LoweredStmt::Function { .. }) {
                functions.push(stmt);
            } else {
                main_stmts.push(stmt);
            }
        }

        for stmt in &functions {
            if let LoweredStmt::Function {
                name,
                params,
                return_type,
                ..
            } = stmt
            {
                let param_types = params
                    .iter()
                    .map(|param| RustType::from_hint(param.type_hint))
                    .collect();
                self.function_param_types.insert(name.clone(), param_types);
                self.function_return_types
                    .insert(name.clone(), RustType::from_hint(*return_type));
            }
        }

        let mut lines = Vec::new();
        for stmt in &functions {
            lines.extend(self.emit_function(stmt, 0));
            lines.push(String::new());
        }

        lines.push("fn main() {".to_string());
        self.push_scope();
        if main_stmts.is_empty() {
            lines.push(format!("{}// empty", pad(1)));
        } else {
            for stmt in &main_stmts {
                let (stmt_lines, _) = self.emit_stmt(stmt, 1);
                lines.extend(stmt_lines);
            }
        }
        self.pop_scope();
        lines.push("}".to_string());

        let mut out = lines.join("\n");
        while out.ends_with('\n') || out.ends_with(' ') {
            out.pop();
        }
        out.push('\n');
        out
    }

    fn emit_function(&mut self, stmt: &LoweredStmt, indent: usize) -> Vec<String> {
        let LoweredStmt::Function {
            name, params, body, ..
        } = stmt
        else {
            return Vec::new();
        };

        let return_type = self
            .function_return_types
            .get(name)
            .copied()
            .unwrap_or(RustType::F64);
        let param_types = self
            .function_param_types
            .get(name)
            .cloned()
            .unwrap_or_else(|| vec![RustType::F64; params.len()]);

        let rendered: Vec<String> = params
            .iter()
            .zip(param_types.iter())
            .map(|(param, ty)| format!("{}: {}", param.name, ty))
            .collect();

        let mut lines = vec![format!(
            "{}fn {}({}) -> {} {{",
            pad(indent),
            name,
            rendered.join(", "),
            return_type
        )];

        self.push_scope();
        for (param, ty) in params.iter().zip(param_types.iter()) {
            self.define(&param.name, *ty);
        }
        let previous_return = self.current_return;
        self.current_return = Some(return_type);

        let mut saw_return = false;
        for inner in body {
            let (stmt_lines, returned) = self.emit_stmt(inner, indent + 1);
            lines.extend(stmt_lines);
            saw_return |= returned;
        }
        if !saw_return {
            lines.push(format!(
                "{}return {};",
                pad(indent + 1),
                default_value(return_type)
            ));
        }

        self.current_return = previous_return;
        self.pop_scope();
        lines.push(format!("{}}}", pad(indent)));
        lines
    }

    fn emit_stmt(&mut self, stmt: &LoweredStmt, indent: usize) -> (Vec<String>, bool) {
        match stmt {
            LoweredStmt::Assignment { name, value, .. } => {
                let (value_src, value_ty) = self.emit_expr(value);

                if let Some(existing) = self.resolve(name) {
                    if existing == RustType::Fn {
                        return (vec![format!("{}{} = {};", pad(indent), name, value_src)], false);
                    }
                    let coerced = coerce(&value_src, value_ty, existing);
                    return (vec![format!("{}{} = {};", pad(indent), name, coerced)], false);
                }

                self.define(name, value_ty);
                if value_ty == RustType::Fn {
                    return (
                        vec![format!("{}let mut {} = {};", pad(indent), name, value_src)],
                        false,
                    );
                }
                (
                    vec![format!(
                        "{}let mut {}: {} = {};",
                        pad(indent),
                        name,
                        value_ty,
                        value_src
                    )],
                    false,
                )
            }

            LoweredStmt::Expression { expr, .. } => {
                if let LoweredExpr::Call { callee, args, .. } = expr {
                    if matches!(callee.as_ref(), LoweredExpr::Ref { name, .. } if name == "print") {
                        let arg = args
                            .first()
                            .map(|arg| self.emit_expr(arg).0)
                            .unwrap_or_else(|| "\"\"".to_string());
                        return (
                            vec![format!("{}println!(\"{{:?}}\", {});", pad(indent), arg)],
                            false,
                        );
                    }
                }
                let (src, _) = self.emit_expr(expr);
                (vec![format!("{}{};", pad(indent), src)], false)
            }

            LoweredStmt::If {
                condition,
                then_block,
                else_block,
                ..
            } => {
                let (cond_src, cond_ty) = self.emit_expr(condition);
                let cond = coerce(&cond_src, cond_ty, RustType::Bool);
                let mut lines = vec![format!("{}if {} {{", pad(indent), cond)];

                self.push_scope();
                let mut then_returned = false;
                for inner in then_block {
                    let (stmt_lines, returned) = self.emit_stmt(inner, indent + 1);
                    lines.extend(stmt_lines);
                    then_returned |= returned;
                }
                self.pop_scope();
                lines.push(format!("{}}}", pad(indent)));

                let mut else_returned = false;
                if !else_block.is_empty() {
                    let last = lines.len() - 1;
                    lines[last] = format!("{}}} else {{", pad(indent));
                    self.push_scope();
                    for inner in else_block {
                        let (stmt_lines, returned) = self.emit_stmt(inner, indent + 1);
                        lines.extend(stmt_lines);
                        else_returned |= returned;
                    }
                    self.pop_scope();
                    lines.push(format!("{}}}", pad(indent)));
                }

                (
                    lines,
                    !else_block.is_empty() && then_returned && else_returned,
                )
            }

            LoweredStmt::Loop {
                iterator,
                start,
                end,
                body,
                ..
            } => {
                let (start_src, start_ty) = self.emit_expr(start);
                let (end_src, end_ty) = self.emit_expr(end);
                let start_i64 = coerce(&start_src, start_ty, RustType::I64);
                let end_i64 = coerce(&end_src, end_ty, RustType::I64);

                let mut lines = vec![format!(
                    "{}for {} in ({})..({}) {{",
                    pad(indent),
                    iterator,
                    start_i64,
                    end_i64
                )];
                self.push_scope();
                self.define(iterator, RustType::I64);
                for inner in body {
                    let (stmt_lines, _) = self.emit_stmt(inner, indent + 1);
                    lines.extend(stmt_lines);
                }
                self.pop_scope();
                lines.push(format!("{}}}", pad(indent)));
                (lines, false)
            }

            LoweredStmt::Function { .. } => (self.emit_function(stmt, indent), false),

            LoweredStmt::Return { value, .. } => {
                let target = self.current_return.unwrap_or(RustType::F64);
                if let Some(expr) = value {
                    let (src, ty) = self.emit_expr(expr);
                    let coerced = coerce(&src, ty, target);
                    return (vec![format!("{}return {};", pad(indent), coerced)], true);
                }
                if target == RustType::Unit {
                    return (vec![format!("{}return;", pad(indent))], true);
                }
                (
                    vec![format!("{}return {};", pad(indent), default_value(target))],
                    true,
                )
            }
        }
    }

    fn emit_expr(&mut self, expr: &LoweredExpr) -> (String, RustType) {
        match expr {
            LoweredExpr::Literal { value, .. } => match value {
                Literal::Bool(true) => ("true".to_string(), RustType::Bool),
                Literal::Bool(false) => ("false".to_string(), RustType::Bool),
                Literal::Str(text) => {
                    let quoted =
                        serde_json::to_string(text).unwrap_or_else(|_| "\"\"".to_string());
                    (format!("{quoted}.to_string()"), RustType::Str)
                }
                Literal::Int(v) => (format!("{v}.0"), RustType::F64),
                Literal::Float(v) => {
                    let text = format!("{v}");
                    let rendered = if text.contains('.') || text.contains('e') {
                        text
                    } else {
                        format!("{text}.0")
                    };
                    (rendered, RustType::F64)
                }
            },

            LoweredExpr::Ref { name, .. } => {
                let ty = self.resolve(name).unwrap_or(RustType::F64);
                (name.clone(), ty)
            }

            LoweredExpr::Unary {
                operator, operand, ..
            } => {
                let (operand_src, operand_ty) = self.emit_expr(operand);
                if operator == "!" {
                    let coerced = coerce(&operand_src, operand_ty, RustType::Bool);
                    return (format!("(!{coerced})"), RustType::Bool);
                }
                let coerced = coerce(&operand_src, operand_ty, RustType::F64);
                (format!("({operator}{coerced})"), RustType::F64)
            }

            LoweredExpr::Binary {
                left,
                operator,
                right,
                ..
            } => {
                let (left_src, left_ty) = self.emit_expr(left);
                let (right_src, right_ty) = self.emit_expr(right);
                self.emit_binary(operator, left_src, left_ty, right_src, right_ty)
            }

            LoweredExpr::Call { callee, args, .. } => {
                let callee_name = match callee.as_ref() {
                    LoweredExpr::Ref { name, .. } => name.clone(),
                    other => self.emit_expr(other).0,
                };

                let expected = self
                    .function_param_types
                    .get(&callee_name)
                    .cloned()
                    .unwrap_or_else(|| vec![RustType::F64; args.len()]);
                let mut args_src = Vec::with_capacity(args.len());
                for (idx, arg) in args.iter().enumerate() {
                    let (src, ty) = self.emit_expr(arg);
                    let target = expected.get(idx).copied().unwrap_or(ty);
                    args_src.push(coerce(&src, ty, target));
                }

                let return_type = self
                    .function_return_types
                    .get(&callee_name)
                    .copied()
                    .unwrap_or(RustType::F64);
                (
                    format!("{}({})", callee_name, args_src.join(", ")),
                    return_type,
                )
            }

            LoweredExpr::Lambda { params, body, .. } => {
                self.push_scope();
                let mut rendered = Vec::with_capacity(params.len());
                for param in params {
                    let ty = RustType::from_hint(param.type_hint);
                    self.define(&param.name, ty);
                    rendered.push(param.name.clone());
                }
                let (body_src, _) = self.emit_expr(body);
                self.pop_scope();
                (format!("|{}| {}", rendered.join(", "), body_src), RustType::Fn)
            }
        }
    }

    fn emit_binary(
        &mut self,
        operator: &str,
        left_src: String,
        left_ty: RustType,
        right_src: String,
        right_ty: RustType,
    ) -> (String, RustType) {
        match operator {
            "+" | "-" | "*" | "/" | "%" => {
                if operator == "+" && (left_ty == RustType::Str || right_ty == RustType::Str) {
                    let left = to_string_expr(&left_src, left_ty);
                    let right = to_string_expr(&right_src, right_ty);
                    return (
                        format!("format!(\"{{}}{{}}\", {left}, {right})"),
                        RustType::Str,
                    );
                }
                let left = coerce(&left_src, left_ty, RustType::F64);
                let right = coerce(&right_src, right_ty, RustType::F64);
                (format!("({left} {operator} {right})"), RustType::F64)
            }

            "==" | "!=" => {
                let mut left_src = left_src;
                let mut right_src = right_src;
                let mut left_ty = left_ty;
                let mut right_ty = right_ty;
                if left_ty == RustType::Str && right_ty != RustType::Str {
                    right_src = to_string_expr(&right_src, right_ty);
                    right_ty = RustType::Str;
                }
                if right_ty == RustType::Str && left_ty != RustType::Str {
                    left_src = to_string_expr(&left_src, left_ty);
                    left_ty = RustType::Str;
                }
                if left_ty.is_numeric() && right_ty.is_numeric() {
                    left_src = coerce(&left_src, left_ty, RustType::F64);
                    right_src = coerce(&right_src, right_ty, RustType::F64);
                }
                (format!("({left_src} {operator} {right_src})"), RustType::Bool)
            }

            "<" | "<=" | ">" | ">=" => {
                let left = coerce(&left_src, left_ty, RustType::F64);
                let right = coerce(&right_src, right_ty, RustType::F64);
                (format!("({left} {operator} {right})"), RustType::Bool)
            }

            "&&" | "||" => {
                let left = coerce(&left_src, left_ty, RustType::Bool);
                let right = coerce(&right_src, right_ty, RustType::Bool);
                (format!("({left} {operator} {right})"), RustType::Bool)
            }

            _ => ("0.0".to_string(), RustType::F64),
        }
    }

    fn push_scope(&mut self) {
        self.scopes.push(BTreeMap::new());
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn define(&mut self, name: &str, ty: RustType) {
        if self.scopes.is_empty() {
            self.push_scope();
        }
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), ty);
        }
    }

    fn resolve(&self, name: &str) -> Option<RustType> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).copied())
    }
}

fn pad(level: usize) -> String {
    "    ".repeat(level)
}

fn coerce(src: &str, from: RustType, to: RustType) -> String {
    if from == to || from == RustType::Fn || to == RustType::Fn {
        return src.to_string();
    }
    match (from, to) {
        (RustType::I64, RustType::F64) => format!("({src} as f64)"),
        (RustType::F64, RustType::I64) => format!("({src} as i64)"),
        (RustType::Bool, RustType::F64) => format!("(if {src} {{ 1.0 }} else {{ 0.0 }})"),
        (RustType::F64, RustType::Bool) => format!("({src} != 0.0)"),
        (RustType::I64, RustType::Bool) => format!("({src} != 0)"),
        (RustType::Str, RustType::Bool) => format!("(!{src}.is_empty())"),
        (_, RustType::Str) => to_string_expr(src, from),
        _ => src.to_string(),
    }
}

fn to_string_expr(src: &str, from: RustType) -> String {
    match from {
        RustType::Str => src.to_string(),
        RustType::Bool | RustType::F64 | RustType::I64 => format!("({src}).to_string()"),
        _ => format!("format!(\"{{:?}}\", {src})"),
    }
}

fn default_value(ty: RustType) -> &'static str {
    match ty {
        RustType::Bool => "false",
        RustType::Str => "String::new()",
        RustType::Unit => "()",
        RustType::I64 => "0",
        RustType::F64 | RustType::Fn => "0.0",
    }
}
