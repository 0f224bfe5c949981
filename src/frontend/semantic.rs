//! Semantic analysis: scopes, bindings, and symbolic-type checks.
//!
//! The analyzer runs in two passes. The first pass registers every top-level
//! function signature in the module scope so forward references resolve; the
//! second analyzes statements in source order. Errors accumulate so one run
//! reports as many issues as possible; analysis continues with `Any` where a
//! type could not be established.
//!
//! The inferred type of every expression is recorded (keyed by span) for the
//! IR builder, which annotates IR nodes without re-deriving types.

use std::collections::BTreeMap;

use icl_core::types::SymType;

use crate::frontend::ast::{Expr, Literal, Program, Stmt};
use crate::frontend::diagnostics::{Diagnostic, Span};
use crate::frontend::symbols::{SymbolInfo, SymbolTable};

type SpanKey = (u32, u32, u32, u32);

fn span_key(span: Span) -> SpanKey {
    (span.line, span.column, span.end_line, span.end_column)
}

/// Semantic output consumed by the IR builder.
#[derive(Debug, Default, Clone)]
pub struct SemanticModel {
    expr_types: BTreeMap<SpanKey, SymType>,
}

impl SemanticModel {
    pub fn expr_type(&self, span: Span) -> Option<SymType> {
        self.expr_types.get(&span_key(span)).copied()
    }
}

/// Run semantic analysis over a full program.
pub fn analyze(program: &Program) -> Result<SemanticModel, Vec<Diagnostic>> {
    Analyzer::new().analyze(program)
}

/// Analyzer state: symbol table, accumulated errors, recorded types.
pub struct Analyzer {
    symbols: SymbolTable,
    errors: Vec<Diagnostic>,
    model: SemanticModel,
}

impl Analyzer {
    pub fn new() -> Self {
        Self {
            symbols: SymbolTable::new(),
            errors: Vec::new(),
            model: SemanticModel::default(),
        }
    }

    pub fn analyze(mut self, program: &Program) -> Result<SemanticModel, Vec<Diagnostic>> {
        for stmt in &program.statements {
            if let Stmt::FunctionDef { .. } = stmt {
                self.register_function_signature(stmt);
            }
        }

        for stmt in &program.statements {
            self.check_stmt(stmt, false, None);
        }

        if self.errors.is_empty() {
            Ok(self.model)
        } else {
            Err(self.errors)
        }
    }

    fn register_function_signature(&mut self, stmt: &Stmt) {
        let Stmt::FunctionDef {
            span,
            name,
            params,
            return_type,
            ..
        } = stmt
        else {
            return;
        };

        if self.symbols.defined_locally(name) {
            self.errors.push(
                Diagnostic::new(
                    "SEM001",
                    format!("Function '{name}' is already defined in this scope."),
                )
                .with_span(*span)
                .with_hint("Use a unique function name or rename the existing function."),
            );
            return;
        }

        let param_types = params
            .iter()
            .map(|param| self.resolve_annotation(param.type_hint.as_deref(), *span))
            .collect();
        let return_ty = return_type
            .as_deref()
            .map(|annotation| self.resolve_annotation(Some(annotation), *span))
            .unwrap_or(SymType::Any);
        self.symbols.define(SymbolInfo::function(
            name.clone(),
            param_types,
            return_ty,
            Some(*span),
        ));
    }

    /// Returns true when the statement definitively returns on every path.
    fn check_stmt(
        &mut self,
        stmt: &Stmt,
        in_function: bool,
        expected_return: Option<SymType>,
    ) -> bool {
        match stmt {
            Stmt::Assignment {
                span,
                name,
                type_hint,
                value,
            } => {
                let value_ty = self.infer_expr(value);
                let target_ty = match type_hint.as_deref() {
                    Some(annotation) => {
                        let annotated = self.resolve_annotation(Some(annotation), *span);
                        if !SymType::compatible(annotated, value_ty) {
                            self.errors.push(
                                Diagnostic::new(
                                    "SEM002",
                                    format!(
                                        "Cannot assign value of type '{value_ty}' to '{name}' annotated as '{annotated}'."
                                    ),
                                )
                                .with_span(*span)
                                .with_hint("Align annotation with expression type or cast in source."),
                            );
                        }
                        annotated
                    }
                    None => value_ty,
                };
                self.symbols.define(SymbolInfo::variable(name.clone(), target_ty));
                false
            }

            Stmt::Expression { expr, .. } => {
                self.infer_expr(expr);
                false
            }

            Stmt::If {
                condition,
                then_block,
                else_block,
                ..
            } => {
                let cond_ty = self.infer_expr(condition);
                if !matches!(cond_ty, SymType::Bool | SymType::Any) {
                    self.errors.push(
                        Diagnostic::new(
                            "SEM003",
                            format!("If condition expects Bool, got '{cond_ty}'."),
                        )
                        .with_span(condition.span())
                        .with_hint("Use comparison/logical expressions for conditions."),
                    );
                }

                self.symbols.push_scope();
                let mut then_returns = false;
                for inner in then_block {
                    then_returns |= self.check_stmt(inner, in_function, expected_return);
                }
                self.symbols.pop_scope();

                self.symbols.push_scope();
                let mut else_returns = false;
                for inner in else_block {
                    else_returns |= self.check_stmt(inner, in_function, expected_return);
                }
                self.symbols.pop_scope();

                then_returns && else_returns && !else_block.is_empty()
            }

            Stmt::Loop {
                span,
                iterator,
                start,
                end,
                body,
            } => {
                let start_ty = self.infer_expr(start);
                let end_ty = self.infer_expr(end);
                if !matches!(start_ty, SymType::Num | SymType::Any)
                    || !matches!(end_ty, SymType::Num | SymType::Any)
                {
                    self.errors.push(
                        Diagnostic::new("SEM004", "Loop bounds must evaluate to Num.")
                            .with_span(*span)
                            .with_hint("Convert loop bound expressions to numbers."),
                    );
                }

                self.symbols.push_scope();
                self.symbols
                    .define(SymbolInfo::variable(iterator.clone(), SymType::Num));
                for inner in body {
                    self.check_stmt(inner, in_function, expected_return);
                }
                self.symbols.pop_scope();
                false
            }

            Stmt::FunctionDef {
                span,
                name,
                params,
                return_type,
                body,
                expr_body,
            } => {
                let Some(signature) = self.symbols.resolve(name).cloned() else {
                    self.errors.push(
                        Diagnostic::new(
                            "SEM005",
                            format!("Function signature for '{name}' is missing."),
                        )
                        .with_span(*span)
                        .with_hint("Function signatures must be registered before body analysis."),
                    );
                    return false;
                };
                if !signature.is_function {
                    return false;
                }

                self.symbols.push_scope();
                for (param, ty) in params.iter().zip(signature.param_types.iter()) {
                    self.symbols
                        .define(SymbolInfo::variable(param.name.clone(), *ty));
                }

                let declared_return = signature.return_type.unwrap_or(SymType::Any);

                if let Some(expr) = expr_body {
                    let body_ty = self.infer_expr(expr);
                    if !SymType::compatible(declared_return, body_ty) {
                        self.errors.push(
                            Diagnostic::new(
                                "SEM006",
                                format!(
                                    "Function '{name}' returns '{body_ty}' but is annotated as '{declared_return}'."
                                ),
                            )
                            .with_span(expr.span())
                            .with_hint("Adjust return annotation or expression type."),
                        );
                    }
                    self.symbols.pop_scope();
                    return false;
                }

                let mut found_return = false;
                for inner in body {
                    found_return |= self.check_stmt(inner, true, Some(declared_return));
                }
                self.symbols.pop_scope();

                let annotated_non_void =
                    return_type.is_some() && declared_return != SymType::Void;
                if annotated_non_void && !found_return {
                    self.errors.push(
                        Diagnostic::new(
                            "SEM007",
                            format!("Function '{name}' is missing a return value."),
                        )
                        .with_span(*span)
                        .with_hint("Add a ret statement in all execution paths."),
                    );
                }
                false
            }

            Stmt::Return { span, value } => {
                if !in_function {
                    self.errors.push(
                        Diagnostic::new("SEM008", "Return statements are only valid inside functions.")
                            .with_span(*span)
                            .with_hint("Move ret into a fn block or remove it."),
                    );
                    return true;
                }
                let value_ty = match value {
                    Some(expr) => self.infer_expr(expr),
                    None => SymType::Void,
                };
                if let Some(expected) = expected_return {
                    if !SymType::compatible(expected, value_ty) {
                        self.errors.push(
                            Diagnostic::new(
                                "SEM009",
                                format!(
                                    "Return type '{value_ty}' does not satisfy expected '{expected}'."
                                ),
                            )
                            .with_span(*span)
                            .with_hint("Change ret expression or function return annotation."),
                        );
                    }
                }
                true
            }

            Stmt::Macro { span, name, .. } => {
                self.errors.push(
                    Diagnostic::new(
                        "SEM010",
                        format!("Unexpanded macro '#{name}' reached semantic analysis."),
                    )
                    .with_span(*span)
                    .with_hint("Register a macro plugin for this macro or remove it."),
                );
                false
            }
        }
    }

    fn infer_expr(&mut self, expr: &Expr) -> SymType {
        let inferred = match expr {
            Expr::Literal { value, .. } => match value {
                Literal::Int(_) | Literal::Float(_) => SymType::Num,
                Literal::Str(_) => SymType::Str,
                Literal::Bool(_) => SymType::Bool,
            },

            Expr::Identifier { span, name } => match self.symbols.resolve(name) {
                Some(symbol) if symbol.is_function => SymType::Fn,
                Some(symbol) => symbol.ty,
                None => {
                    self.errors.push(
                        Diagnostic::new("SEM011", format!("Undefined symbol '{name}'."))
                            .with_span(*span)
                            .with_hint("Declare the variable or function before use."),
                    );
                    SymType::Any
                }
            },

            Expr::Unary {
                span,
                operator,
                operand,
            } => {
                let operand_ty = self.infer_expr(operand);
                match operator.as_str() {
                    "!" => {
                        if !matches!(operand_ty, SymType::Bool | SymType::Any) {
                            self.errors.push(
                                Diagnostic::new(
                                    "SEM012",
                                    format!("Unary '!' expects Bool, got '{operand_ty}'."),
                                )
                                .with_span(*span)
                                .with_hint("Use '!' with boolean expressions."),
                            );
                        }
                        SymType::Bool
                    }
                    "+" | "-" => {
                        if !matches!(operand_ty, SymType::Num | SymType::Any) {
                            self.errors.push(
                                Diagnostic::new(
                                    "SEM013",
                                    format!("Unary '{operator}' expects Num, got '{operand_ty}'."),
                                )
                                .with_span(*span)
                                .with_hint("Use numeric expressions with unary +/-."),
                            );
                        }
                        SymType::Num
                    }
                    _ => SymType::Any,
                }
            }

            Expr::Binary {
                span,
                left,
                operator,
                right,
            } => {
                let left_ty = self.infer_expr(left);
                let right_ty = self.infer_expr(right);
                self.check_binary(*span, operator, left_ty, right_ty)
            }

            Expr::Lambda {
                span,
                params,
                return_type,
                body,
            } => {
                self.symbols.push_scope();
                for param in params {
                    let ty = self.resolve_annotation(param.type_hint.as_deref(), *span);
                    self.symbols
                        .define(SymbolInfo::variable(param.name.clone(), ty));
                }
                let body_ty = self.infer_expr(body);
                self.symbols.pop_scope();

                if let Some(annotation) = return_type.as_deref() {
                    let declared = self.resolve_annotation(Some(annotation), *span);
                    if !SymType::compatible(declared, body_ty) {
                        self.errors.push(
                            Diagnostic::new(
                                "SEM021",
                                format!(
                                    "Lambda returns '{body_ty}' but is annotated as '{declared}'."
                                ),
                            )
                            .with_span(*span)
                            .with_hint("Adjust lambda return annotation or expression type."),
                        );
                    }
                }
                SymType::Fn
            }

            Expr::Call {
                span, callee, args, ..
            } => {
                for arg in args {
                    self.infer_expr(arg);
                }

                if let Expr::Identifier { name, .. } = callee.as_ref() {
                    let Some(symbol) = self.symbols.resolve(name).cloned() else {
                        self.errors.push(
                            Diagnostic::new(
                                "SEM017",
                                format!("Call target '{name}' is undefined."),
                            )
                            .with_span(*span)
                            .with_hint("Define function before calling it."),
                        );
                        self.record(callee.span(), SymType::Any);
                        return self.record(*span, SymType::Any);
                    };
                    self.record(callee.span(), if symbol.is_function { SymType::Fn } else { symbol.ty });

                    if symbol.is_function {
                        if let Some(arity) = symbol.arity {
                            if arity != args.len() {
                                self.errors.push(
                                    Diagnostic::new(
                                        "SEM019",
                                        format!(
                                            "Function '{name}' expects {arity} args, got {}.",
                                            args.len()
                                        ),
                                    )
                                    .with_span(*span)
                                    .with_hint("Adjust call argument count."),
                                );
                            }
                        }
                        return self.record(*span, symbol.return_type.unwrap_or(SymType::Any));
                    }

                    if matches!(symbol.ty, SymType::Fn | SymType::Any) {
                        return self.record(*span, SymType::Any);
                    }

                    self.errors.push(
                        Diagnostic::new("SEM018", format!("Symbol '{name}' is not callable."))
                            .with_span(*span)
                            .with_hint("Only function symbols or Fn-typed values can be invoked."),
                    );
                    return self.record(*span, SymType::Any);
                }

                let callee_ty = self.infer_expr(callee);
                if !matches!(callee_ty, SymType::Fn | SymType::Any) {
                    self.errors.push(
                        Diagnostic::new("SEM020", "Call expression target is not callable.")
                            .with_span(*span)
                            .with_hint("Use identifier/function references as call targets."),
                    );
                }
                SymType::Any
            }
        };

        self.record(expr.span(), inferred)
    }

    fn check_binary(
        &mut self,
        span: Span,
        operator: &str,
        left: SymType,
        right: SymType,
    ) -> SymType {
        match operator {
            "+" | "-" | "*" | "/" | "%" => {
                if operator == "+" && left == SymType::Str && right == SymType::Str {
                    return SymType::Str;
                }
                if matches!(left, SymType::Num | SymType::Any)
                    && matches!(right, SymType::Num | SymType::Any)
                {
                    return SymType::Num;
                }
                self.errors.push(
                    Diagnostic::new(
                        "SEM014",
                        format!("Operator '{operator}' requires numeric operands."),
                    )
                    .with_span(span)
                    .with_hint("Use Num operands or convert expression types."),
                );
                SymType::Num
            }

            "==" | "!=" => {
                // Mixed-base equality is rejected; either side may be Any.
                if left != SymType::Any && right != SymType::Any && left != right {
                    self.errors.push(
                        Diagnostic::new(
                            "SEM022",
                            format!("Equality '{operator}' requires matching operand types, got '{left}' and '{right}'."),
                        )
                        .with_span(span)
                        .with_hint("Compare values of the same type or widen one side to Any."),
                    );
                }
                SymType::Bool
            }

            "<" | "<=" | ">" | ">=" => {
                if !matches!(left, SymType::Num | SymType::Any)
                    || !matches!(right, SymType::Num | SymType::Any)
                {
                    self.errors.push(
                        Diagnostic::new(
                            "SEM015",
                            format!("Comparison '{operator}' requires Num-compatible operands."),
                        )
                        .with_span(span)
                        .with_hint("Compare numeric values for ordering operators."),
                    );
                }
                SymType::Bool
            }

            "&&" | "||" => {
                if !matches!(left, SymType::Bool | SymType::Any)
                    || !matches!(right, SymType::Bool | SymType::Any)
                {
                    self.errors.push(
                        Diagnostic::new(
                            "SEM016",
                            format!("Logical operator '{operator}' requires Bool operands."),
                        )
                        .with_span(span)
                        .with_hint("Use logical operators with boolean expressions."),
                    );
                }
                SymType::Bool
            }

            _ => SymType::Any,
        }
    }

    fn resolve_annotation(&mut self, annotation: Option<&str>, span: Span) -> SymType {
        let Some(name) = annotation else {
            return SymType::Any;
        };
        match SymType::from_annotation(name) {
            Some(ty) => ty,
            None => {
                self.errors.push(
                    Diagnostic::new("SEM002", format!("Unknown type annotation '{name}'."))
                        .with_span(span)
                        .with_hint("Annotations must be one of: Num, Str, Bool, Any, Fn, Void."),
                );
                SymType::Any
            }
        }
    }

    fn record(&mut self, span: Span, ty: SymType) -> SymType {
        self.model.expr_types.insert(span_key(span), ty);
        ty
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}
