//! Experimental pseudo-packs: profile-driven best-effort emitters.
//!
//! These give broad target coverage with semantics-parity scaffolds. They
//! declare `typed_annotation`, `logic`, `at_call`, and `lambda` unsupported,
//! so the lowering gate rejects source that uses those features instead of
//! producing approximate output.

use icl_core::features;

use crate::backend::lower::{LoweredExpr, LoweredModule, LoweredStmt};
use crate::backend::packs::{
    BlockModel, EmissionContext, LanguagePack, PackManifest, Scaffolding, Stability,
    StatementTermination,
};
use crate::frontend::ast::Literal;

/// Small syntax profile for one experimental target.
#[derive(Debug, Clone, Copy)]
pub struct PseudoProfile {
    pub target: &'static str,
    pub extension: &'static str,
    pub comment_prefix: &'static str,
    pub function_keyword: &'static str,
    pub declaration_prefix: &'static str,
}

pub const PSEUDO_PROFILES: &[PseudoProfile] = &[
    PseudoProfile { target: "typescript", extension: "ts", comment_prefix: "//", function_keyword: "function", declaration_prefix: "let " },
    PseudoProfile { target: "go", extension: "go", comment_prefix: "//", function_keyword: "func", declaration_prefix: "var " },
    PseudoProfile { target: "java", extension: "java", comment_prefix: "//", function_keyword: "static Object", declaration_prefix: "var " },
    PseudoProfile { target: "csharp", extension: "cs", comment_prefix: "//", function_keyword: "static object", declaration_prefix: "var " },
    PseudoProfile { target: "cpp", extension: "cpp", comment_prefix: "//", function_keyword: "auto", declaration_prefix: "auto " },
    PseudoProfile { target: "php", extension: "php", comment_prefix: "//", function_keyword: "function", declaration_prefix: "$" },
    PseudoProfile { target: "ruby", extension: "rb", comment_prefix: "#", function_keyword: "def", declaration_prefix: "" },
    PseudoProfile { target: "kotlin", extension: "kt", comment_prefix: "//", function_keyword: "fun", declaration_prefix: "var " },
    PseudoProfile { target: "swift", extension: "swift", comment_prefix: "//", function_keyword: "func", declaration_prefix: "var " },
    PseudoProfile { target: "lua", extension: "lua", comment_prefix: "--", function_keyword: "function", declaration_prefix: "local " },
    PseudoProfile { target: "dart", extension: "dart", comment_prefix: "//", function_keyword: "dynamic", declaration_prefix: "var " },
];

pub struct PseudoPack {
    profile: PseudoProfile,
    manifest: PackManifest,
}

impl PseudoPack {
    pub fn new(profile: PseudoProfile) -> Self {
        Self {
            manifest: PackManifest {
                pack_id: format!("icl.experimental.{}", profile.target),
                version: "2.0.0".to_string(),
                target: profile.target.to_string(),
                aliases: vec![],
                stability: Stability::Experimental,
                file_extension: profile.extension.to_string(),
                block_model: BlockModel::Braces,
                statement_termination: StatementTermination::Semicolon,
                type_strategy: "gradual_symbolic_best_effort".to_string(),
                runtime_helpers: vec![],
                scaffolding: Scaffolding::single(format!("main.{}", profile.extension)),
                feature_coverage: features::experimental_coverage(),
            },
            profile,
        }
    }
}

impl LanguagePack for PseudoPack {
    fn manifest(&self) -> &PackManifest {
        &self.manifest
    }

    fn emit(&self, lowered: &LoweredModule, _context: &EmissionContext) -> String {
        let mut lines = vec![
            format!(
                "{} experimental ICL pack: {}",
                self.profile.comment_prefix, self.profile.target
            ),
            format!(
                "{} semantics-parity target, syntax is best-effort scaffold",
                self.profile.comment_prefix
            ),
            String::new(),
        ];
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
}

impl PseudoPack {
    fn emit_stmt(&self, stmt: &LoweredStmt, indent: usize, lines: &mut Vec<String>) {
        let pad = "    ".repeat(indent);

        match stmt {
            LoweredStmt::Assignment { name, value, .. } => {
                lines.push(format!(
                    "{}{}{} = {};",
                    pad,
                    self.profile.declaration_prefix,
                    name,
                    self.emit_expr(value)
                ));
            }

            LoweredStmt::Expression { expr, .. } => {
                lines.push(format!("{}{};", pad, self.emit_expr(expr)));
            }

            LoweredStmt::If {
                condition,
                then_block,
                else_block,
                ..
            } => {
                lines.push(format!("{}if ({}) {{", pad, self.emit_expr(condition)));
                for inner in then_block {
                    self.emit_stmt(inner, indent + 1, lines);
                }
                lines.push(format!("{pad}}}"));
                if !else_block.is_empty() {
                    let last = lines.len() - 1;
                    lines[last] = format!("{pad}}} else {{");
                    for inner in else_block {
                        self.emit_stmt(inner, indent + 1, lines);
                    }
                    lines.push(format!("{pad}}}"));
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
                    "{}for ({}{it} = {start_src}; {it} < {end_src}; {it}++) {{",
                    pad,
                    self.profile.declaration_prefix,
                    it = iterator,
                ));
                for inner in body {
                    self.emit_stmt(inner, indent + 1, lines);
                }
                lines.push(format!("{pad}}}"));
            }

            LoweredStmt::Function {
                name, params, body, ..
            } => {
                let param_src: Vec<&str> = params.iter().map(|p| p.name.as_str()).collect();
                lines.push(format!(
                    "{}{} {}({}) {{",
                    pad,
                    self.profile.function_keyword,
                    name,
                    param_src.join(", ")
                ));
                for inner in body {
                    self.emit_stmt(inner, indent + 1, lines);
                }
                if body.is_empty() {
                    lines.push(format!("{pad}    return 0;"));
                }
                lines.push(format!("{pad}}}"));
            }

            LoweredStmt::Return { value, .. } => match value {
                Some(expr) => lines.push(format!("{}return {};", pad, self.emit_expr(expr))),
                None => lines.push(format!("{pad}return;")),
            },
        }
    }

    fn emit_expr(&self, expr: &LoweredExpr) -> String {
        match expr {
            LoweredExpr::Literal { value, .. } => match value {
                Literal::Bool(true) => "true".to_string(),
                Literal::Bool(false) => "false".to_string(),
                Literal::Int(v) => v.to_string(),
                Literal::Float(v) => format!("{v}"),
                Literal::Str(v) => serde_json::to_string(v).unwrap_or_else(|_| "\"\"".to_string()),
            },
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
            LoweredExpr::Lambda { .. } => "null".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::lower_for;

    #[test]
    fn profiles_cover_distinct_targets() {
        let mut targets: Vec<&str> = PSEUDO_PROFILES.iter().map(|p| p.target).collect();
        targets.sort_unstable();
        targets.dedup();
        assert_eq!(targets.len(), PSEUDO_PROFILES.len());
    }

    #[test]
    fn emits_banner_and_declaration_prefix() {
        let pack = PseudoPack::new(PSEUDO_PROFILES[1]); // go
        let lowered = lower_for("x := 1;", pack.manifest());
        let out = pack.emit(&lowered, &EmissionContext::for_target("go"));
        assert!(out.starts_with("// experimental ICL pack: go\n"));
        assert!(out.contains("var x = 1;"));
    }

    #[test]
    fn lua_profile_uses_its_comment_prefix() {
        let lua = PSEUDO_PROFILES
            .iter()
            .find(|p| p.target == "lua")
            .copied()
            .expect("lua profile");
        let pack = PseudoPack::new(lua);
        let lowered = lower_for("x := 1;", pack.manifest());
        let out = pack.emit(&lowered, &EmissionContext::for_target("lua"));
        assert!(out.starts_with("-- experimental ICL pack: lua\n"));
        assert!(out.contains("local x = 1;"));
    }
}
