//! Macro statement expansion.
//!
//! `#name(args)` statements are replaced with AST fragments produced by
//! registered expanders before semantic analysis ever sees them. Expansion
//! recurses into blocks and into the statements an expander returns, so
//! macros may expand to further macros.

use std::collections::BTreeMap;

use crate::frontend::ast::{Expr, Literal, Stmt};
use crate::frontend::diagnostics::{Diagnostic, Span};

/// Expander for one macro name.
pub trait MacroExpander {
    /// Macro identifier without the leading `#`.
    fn name(&self) -> &'static str;

    /// Expand one invocation into replacement statements.
    fn expand(&self, span: Span, args: &[Expr]) -> Result<Vec<Stmt>, Diagnostic>;
}

/// Registry of macro expanders keyed by name.
#[derive(Default)]
pub struct MacroRegistry {
    expanders: BTreeMap<&'static str, Box<dyn MacroExpander>>,
}

impl MacroRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the standard macros.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(EchoMacro));
        registry.register(Box::new(DbgMacro));
        registry
    }

    pub fn register(&mut self, expander: Box<dyn MacroExpander>) {
        self.expanders.insert(expander.name(), expander);
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.expanders.keys().copied().collect()
    }

    /// Expand every macro statement in the program, recursively.
    pub fn expand_program(&self, statements: Vec<Stmt>) -> Result<Vec<Stmt>, Diagnostic> {
        let mut expanded = Vec::with_capacity(statements.len());
        for stmt in statements {
            expanded.extend(self.expand_stmt(stmt)?);
        }
        Ok(expanded)
    }

    fn expand_stmt(&self, stmt: Stmt) -> Result<Vec<Stmt>, Diagnostic> {
        match stmt {
            Stmt::Macro { span, name, args } => {
                let Some(expander) = self.expanders.get(name.as_str()) else {
                    return Err(Diagnostic::new(
                        "PLG002",
                        format!("No macro expander registered for '#{name}'."),
                    )
                    .with_span(span)
                    .with_hint("Register a macro plugin before compilation."));
                };
                let mut result = Vec::new();
                for produced in expander.expand(span, &args)? {
                    result.extend(self.expand_stmt(produced)?);
                }
                Ok(result)
            }
            Stmt::If {
                span,
                condition,
                then_block,
                else_block,
            } => Ok(vec![Stmt::If {
                span,
                condition,
                then_block: self.expand_program(then_block)?,
                else_block: self.expand_program(else_block)?,
            }]),
            Stmt::Loop {
                span,
                iterator,
                start,
                end,
                body,
            } => Ok(vec![Stmt::Loop {
                span,
                iterator,
                start,
                end,
                body: self.expand_program(body)?,
            }]),
            Stmt::FunctionDef {
                span,
                name,
                params,
                return_type,
                body,
                expr_body,
            } => Ok(vec![Stmt::FunctionDef {
                span,
                name,
                params,
                return_type,
                body: self.expand_program(body)?,
                expr_body,
            }]),
            other => Ok(vec![other]),
        }
    }
}

fn print_call(span: Span, arg: Expr) -> Stmt {
    Stmt::Expression {
        span,
        expr: Expr::Call {
            span,
            callee: Box::new(Expr::Identifier {
                span,
                name: "print".to_string(),
            }),
            args: vec![arg],
            at_prefixed: true,
        },
    }
}

/// `#echo(expr)` -> `@print(expr)`
pub struct EchoMacro;

impl MacroExpander for EchoMacro {
    fn name(&self) -> &'static str {
        "echo"
    }

    fn expand(&self, span: Span, args: &[Expr]) -> Result<Vec<Stmt>, Diagnostic> {
        if args.len() != 1 {
            return Err(Diagnostic::new("PLG101", "#echo expects exactly one argument.")
                .with_span(span)
                .with_hint("Use #echo(value)."));
        }
        Ok(vec![print_call(span, args[0].clone())])
    }
}

/// `#dbg(expr)` -> `@print("dbg:"); @print(expr)`
pub struct DbgMacro;

impl MacroExpander for DbgMacro {
    fn name(&self) -> &'static str {
        "dbg"
    }

    fn expand(&self, span: Span, args: &[Expr]) -> Result<Vec<Stmt>, Diagnostic> {
        if args.len() != 1 {
            return Err(Diagnostic::new("PLG102", "#dbg expects exactly one argument.")
                .with_span(span)
                .with_hint("Use #dbg(value)."));
        }
        let label = print_call(
            span,
            Expr::Literal {
                span,
                value: Literal::Str("dbg:".to_string()),
            },
        );
        Ok(vec![label, print_call(span, args[0].clone())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::{lexer, parser};

    fn expand(source: &str) -> Result<Vec<Stmt>, Diagnostic> {
        let tokens = lexer::lex(source).expect("lex should succeed");
        let program = parser::parse(&tokens).expect("parse should succeed");
        MacroRegistry::with_builtins().expand_program(program.statements)
    }

    #[test]
    fn echo_becomes_print_call() {
        let statements = expand("#echo(1 + 2);").expect("expansion should succeed");
        assert_eq!(statements.len(), 1);
        let Stmt::Expression { expr, .. } = &statements[0] else {
            panic!("expected expression statement");
        };
        let Expr::Call {
            callee,
            at_prefixed,
            ..
        } = expr
        else {
            panic!("expected call");
        };
        assert!(at_prefixed);
        assert!(matches!(&**callee, Expr::Identifier { name, .. } if name == "print"));
    }

    #[test]
    fn dbg_expands_to_two_statements() {
        let statements = expand("#dbg(x);").expect("expansion should succeed");
        assert_eq!(statements.len(), 2);
    }

    #[test]
    fn macros_inside_blocks_are_expanded() {
        let statements = expand("fn f(v) { #echo(v); }").expect("expansion should succeed");
        let Stmt::FunctionDef { body, .. } = &statements[0] else {
            panic!("expected function definition");
        };
        assert!(matches!(body[0], Stmt::Expression { .. }));
    }

    #[test]
    fn unknown_macro_is_plg002() {
        let error = expand("#mystery(1);").expect_err("expansion should fail");
        assert_eq!(error.code, "PLG002");
    }

    #[test]
    fn echo_arity_is_enforced() {
        let error = expand("#echo(1, 2);").expect_err("expansion should fail");
        assert_eq!(error.code, "PLG101");
    }
}
