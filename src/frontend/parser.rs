//! Parser for ICL token streams.
//!
//! Recursive-descent statements and blocks; precedence-climbing expressions
//! (binary operators are left-associative, unary binds tighter, postfix call
//! binds tightest). On a statement-level failure the parser records the
//! diagnostic, synchronizes to the next statement boundary, and continues, so
//! a single run reports every parse error in the module.

use crate::frontend::ast::{Expr, Literal, Param, Program, Stmt};
use crate::frontend::diagnostics::{Diagnostic, Span};
use crate::frontend::lexer::{Token, TokenKind};

/// Parser state over a lexed token slice.
pub struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    errors: Vec<Diagnostic>,
}

/// Parse a full token stream into a program AST.
pub fn parse(tokens: &[Token]) -> Result<Program, Vec<Diagnostic>> {
    Parser::new(tokens).parse_program()
}

fn binary_precedence(kind: TokenKind) -> Option<u8> {
    match kind {
        TokenKind::OrOr => Some(1),
        TokenKind::AndAnd => Some(2),
        TokenKind::EqEq | TokenKind::NotEq => Some(3),
        TokenKind::Lt | TokenKind::LtEq | TokenKind::Gt | TokenKind::GtEq => Some(4),
        TokenKind::Plus | TokenKind::Minus => Some(5),
        TokenKind::Star | TokenKind::Slash | TokenKind::Percent => Some(6),
        _ => None,
    }
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            pos: 0,
            errors: Vec::new(),
        }
    }

    pub fn parse_program(mut self) -> Result<Program, Vec<Diagnostic>> {
        let mut statements = Vec::new();

        while !self.is_at_end() {
            self.skip_semicolons();
            if self.is_at_end() {
                break;
            }
            match self.statement() {
                Ok(stmt) => {
                    statements.push(stmt);
                    self.skip_semicolons();
                }
                Err(diagnostic) => {
                    self.errors.push(diagnostic);
                    self.synchronize();
                }
            }
        }

        if !self.errors.is_empty() {
            return Err(self.errors);
        }

        let span = match (statements.first(), statements.last()) {
            (Some(first), Some(last)) => first.span().merge(last.span()),
            _ => self.peek().span,
        };
        Ok(Program { span, statements })
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn statement(&mut self) -> Result<Stmt, Diagnostic> {
        if self.match_token(TokenKind::Fn) {
            let fn_token = self.previous().clone();
            return self.function_def(&fn_token);
        }
        if self.match_token(TokenKind::If) {
            let if_token = self.previous().clone();
            return self.if_stmt(&if_token);
        }
        if self.match_token(TokenKind::Loop) {
            let loop_token = self.previous().clone();
            return self.loop_stmt(&loop_token);
        }
        if self.match_token(TokenKind::Ret) {
            let ret_token = self.previous().clone();
            return self.return_stmt(&ret_token);
        }
        if self.match_token(TokenKind::Hash) {
            let hash_token = self.previous().clone();
            return self.macro_stmt(&hash_token);
        }
        if self.is_assignment_start() {
            return self.assignment_stmt();
        }

        let expr = self.expression()?;
        Ok(Stmt::Expression {
            span: expr.span(),
            expr,
        })
    }

    fn assignment_stmt(&mut self) -> Result<Stmt, Diagnostic> {
        let name_token = self.expect(TokenKind::Ident, "Expected identifier in assignment.")?;
        let name = name_token.text.clone();
        let start_span = name_token.span;

        let type_hint = if self.match_token(TokenKind::Colon) {
            let type_token = self.expect(TokenKind::Ident, "Expected type name after ':'.")?;
            Some(type_token.text.clone())
        } else {
            None
        };

        self.expect(TokenKind::Assign, "Expected ':=' in assignment.")?;
        let value = self.expression()?;
        Ok(Stmt::Assignment {
            span: start_span.merge(value.span()),
            name,
            type_hint,
            value,
        })
    }

    fn function_def(&mut self, fn_token: &Token) -> Result<Stmt, Diagnostic> {
        let name = self
            .expect(TokenKind::Ident, "Expected function name after 'fn'.")?
            .text
            .clone();
        self.expect(TokenKind::LParen, "Expected '(' after function name.")?;
        let params = self.param_list("parameter")?;
        self.expect(TokenKind::RParen, "Expected ')' after function parameters.")?;

        let return_type = if self.match_token(TokenKind::Colon) {
            let type_token = self.expect(TokenKind::Ident, "Expected return type after ':'.")?;
            Some(type_token.text.clone())
        } else {
            None
        };

        if self.match_token(TokenKind::Arrow) {
            let expr = self.expression()?;
            return Ok(Stmt::FunctionDef {
                span: fn_token.span.merge(expr.span()),
                name,
                params,
                return_type,
                body: Vec::new(),
                expr_body: Some(expr),
            });
        }

        let (body, block_span) = self.block()?;
        Ok(Stmt::FunctionDef {
            span: fn_token.span.merge(block_span),
            name,
            params,
            return_type,
            body,
            expr_body: None,
        })
    }

    fn if_stmt(&mut self, if_token: &Token) -> Result<Stmt, Diagnostic> {
        let condition = self.expression()?;
        self.expect(TokenKind::Question, "Expected '?' after if condition.")?;
        let (then_block, then_span) = self.block()?;

        let mut else_block = Vec::new();
        let mut end_span = then_span;
        if self.match_token(TokenKind::Colon) {
            let (block, block_span) = self.block()?;
            else_block = block;
            end_span = block_span;
        }

        Ok(Stmt::If {
            span: if_token.span.merge(end_span),
            condition,
            then_block,
            else_block,
        })
    }

    fn loop_stmt(&mut self, loop_token: &Token) -> Result<Stmt, Diagnostic> {
        let iterator = self
            .expect(TokenKind::Ident, "Expected loop iterator name after 'loop'.")?
            .text
            .clone();
        self.expect(TokenKind::In, "Expected 'in' in loop header.")?;
        let start = self.expression()?;
        self.expect(TokenKind::Range, "Expected '..' in loop range.")?;
        let end = self.expression()?;
        let (body, body_span) = self.block()?;

        Ok(Stmt::Loop {
            span: loop_token.span.merge(body_span),
            iterator,
            start,
            end,
            body,
        })
    }

    fn return_stmt(&mut self, ret_token: &Token) -> Result<Stmt, Diagnostic> {
        if self.check(TokenKind::Semicolon)
            || self.check(TokenKind::RBrace)
            || self.check(TokenKind::Eof)
        {
            return Ok(Stmt::Return {
                span: ret_token.span,
                value: None,
            });
        }
        let value = self.expression()?;
        Ok(Stmt::Return {
            span: ret_token.span.merge(value.span()),
            value: Some(value),
        })
    }

    fn macro_stmt(&mut self, hash_token: &Token) -> Result<Stmt, Diagnostic> {
        let name = self
            .expect(TokenKind::Ident, "Expected macro name after '#'.")?
            .text
            .clone();
        self.expect(TokenKind::LParen, "Expected '(' after macro name.")?;
        let args = self.argument_list()?;
        let end = self.expect(TokenKind::RParen, "Expected ')' after macro arguments.")?;
        Ok(Stmt::Macro {
            span: hash_token.span.merge(end.span),
            name,
            args,
        })
    }

    fn block(&mut self) -> Result<(Vec<Stmt>, Span), Diagnostic> {
        let lbrace = self
            .expect(TokenKind::LBrace, "Expected '{' to start block.")?
            .span;
        let mut statements = Vec::new();
        self.skip_semicolons();

        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            let stmt = self.statement()?;
            statements.push(stmt);
            self.skip_semicolons();
        }

        let rbrace = self
            .expect(TokenKind::RBrace, "Expected '}' to close block.")?
            .span;
        Ok((statements, lbrace.merge(rbrace)))
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn expression(&mut self) -> Result<Expr, Diagnostic> {
        self.binary_expr(1)
    }

    fn binary_expr(&mut self, min_prec: u8) -> Result<Expr, Diagnostic> {
        let mut expr = self.unary_expr()?;

        loop {
            let Some(prec) = binary_precedence(self.peek().kind) else {
                break;
            };
            if prec < min_prec {
                break;
            }

            let operator = self.advance().text.clone();
            // Left associativity: the right side only admits strictly tighter operators.
            let right = self.binary_expr(prec + 1)?;
            let span = expr.span().merge(right.span());
            expr = Expr::Binary {
                span,
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn unary_expr(&mut self) -> Result<Expr, Diagnostic> {
        if self.match_token(TokenKind::Not)
            || self.match_token(TokenKind::Minus)
            || self.match_token(TokenKind::Plus)
        {
            let op_token = self.previous().clone();
            let operand = self.unary_expr()?;
            let span = op_token.span.merge(operand.span());
            return Ok(Expr::Unary {
                span,
                operator: op_token.text,
                operand: Box::new(operand),
            });
        }
        self.postfix_expr()
    }

    fn postfix_expr(&mut self) -> Result<Expr, Diagnostic> {
        let mut expr = self.primary_expr()?;
        while self.match_token(TokenKind::LParen) {
            let args = self.argument_list()?;
            let rparen = self.expect(TokenKind::RParen, "Expected ')' after call arguments.")?;
            let span = expr.span().merge(rparen.span);
            expr = Expr::Call {
                span,
                callee: Box::new(expr),
                args,
                at_prefixed: false,
            };
        }
        Ok(expr)
    }

    fn primary_expr(&mut self) -> Result<Expr, Diagnostic> {
        if self.match_token(TokenKind::Number) {
            let token = self.previous();
            let value = if token.text.contains('.') {
                Literal::Float(token.text.parse::<f64>().unwrap_or(0.0))
            } else {
                Literal::Int(token.text.parse::<i64>().unwrap_or(0))
            };
            return Ok(Expr::Literal {
                span: token.span,
                value,
            });
        }

        if self.match_token(TokenKind::String) {
            let token = self.previous();
            return Ok(Expr::Literal {
                span: token.span,
                value: Literal::Str(token.text.clone()),
            });
        }

        if self.match_token(TokenKind::True) {
            return Ok(Expr::Literal {
                span: self.previous().span,
                value: Literal::Bool(true),
            });
        }

        if self.match_token(TokenKind::False) {
            return Ok(Expr::Literal {
                span: self.previous().span,
                value: Literal::Bool(false),
            });
        }

        if self.match_token(TokenKind::Lam) {
            let lam_token = self.previous().clone();
            return self.lambda_expr(&lam_token);
        }

        if self.match_token(TokenKind::Ident) {
            let token = self.previous();
            return Ok(Expr::Identifier {
                span: token.span,
                name: token.text.clone(),
            });
        }

        if self.match_token(TokenKind::At) {
            let at_token = self.previous().clone();
            let callee_token =
                self.expect(TokenKind::Ident, "Expected callee identifier after '@'.")?;
            let callee = Expr::Identifier {
                span: callee_token.span,
                name: callee_token.text.clone(),
            };
            self.expect(TokenKind::LParen, "Expected '(' after @callee.")?;
            let args = self.argument_list()?;
            let end = self.expect(TokenKind::RParen, "Expected ')' after call arguments.")?;
            return Ok(Expr::Call {
                span: at_token.span.merge(end.span),
                callee: Box::new(callee),
                args,
                at_prefixed: true,
            });
        }

        if self.match_token(TokenKind::LParen) {
            let expr = self.expression()?;
            self.expect(TokenKind::RParen, "Expected ')' to close grouped expression.")?;
            return Ok(expr);
        }

        let token = self.peek();
        Err(Diagnostic::new(
            "PAR001",
            format!("Unexpected token {} in expression.", token.kind.describe()),
        )
        .with_span(token.span)
        .with_hint("Use literals, identifiers, calls, or parenthesized expressions."))
    }

    fn lambda_expr(&mut self, lam_token: &Token) -> Result<Expr, Diagnostic> {
        self.expect(TokenKind::LParen, "Expected '(' after 'lam'.")?;
        let params = self.param_list("lambda parameter")?;
        self.expect(TokenKind::RParen, "Expected ')' after lambda parameters.")?;

        let return_type = if self.match_token(TokenKind::Colon) {
            let type_token = self.expect(TokenKind::Ident, "Expected lambda return type after ':'.")?;
            Some(type_token.text.clone())
        } else {
            None
        };

        self.expect(TokenKind::Arrow, "Expected '=>' in lambda expression.")?;
        let body = self.expression()?;
        Ok(Expr::Lambda {
            span: lam_token.span.merge(body.span()),
            params,
            return_type,
            body: Box::new(body),
        })
    }

    fn param_list(&mut self, what: &str) -> Result<Vec<Param>, Diagnostic> {
        let mut params = Vec::new();
        if self.check(TokenKind::RParen) {
            return Ok(params);
        }
        loop {
            let name = self
                .expect(TokenKind::Ident, &format!("Expected {what} name."))?
                .text
                .clone();
            let type_hint = if self.match_token(TokenKind::Colon) {
                let type_token =
                    self.expect(TokenKind::Ident, "Expected parameter type after ':'.")?;
                Some(type_token.text.clone())
            } else {
                None
            };
            params.push(Param { name, type_hint });
            if !self.match_token(TokenKind::Comma) {
                break;
            }
        }
        Ok(params)
    }

    fn argument_list(&mut self) -> Result<Vec<Expr>, Diagnostic> {
        let mut args = Vec::new();
        if self.check(TokenKind::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.expression()?);
            if !self.match_token(TokenKind::Comma) {
                break;
            }
        }
        Ok(args)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Distinguish `name := ...` and `name:Type := ...` from expression
    /// statements that merely start with an identifier.
    fn is_assignment_start(&self) -> bool {
        if !self.check(TokenKind::Ident) {
            return false;
        }
        if self.peek_at(1).kind == TokenKind::Assign {
            return true;
        }
        self.peek_at(1).kind == TokenKind::Colon
            && self.peek_at(2).kind == TokenKind::Ident
            && self.peek_at(3).kind == TokenKind::Assign
    }

    fn expect(&mut self, kind: TokenKind, message: &str) -> Result<&Token, Diagnostic> {
        if self.check(kind) {
            return Ok(self.advance());
        }
        let token = self.peek();
        Err(Diagnostic::new(
            "PAR002",
            format!("{} Found {}.", message, token.kind.describe()),
        )
        .with_span(token.span)
        .with_hint("Adjust token order to match the grammar."))
    }

    fn match_token(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            return true;
        }
        false
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.pos += 1;
        }
        &self.tokens[self.pos - 1]
    }

    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        let idx = self.pos + offset;
        if idx >= self.tokens.len() {
            &self.tokens[self.tokens.len() - 1]
        } else {
            &self.tokens[idx]
        }
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.pos - 1]
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn skip_semicolons(&mut self) {
        while self.match_token(TokenKind::Semicolon) {}
    }

    /// Skip to the next statement boundary after a parse failure. Always
    /// consumes at least one token so recovery cannot loop.
    fn synchronize(&mut self) {
        if !self.is_at_end() {
            self.advance();
        }
        while !self.is_at_end() {
            if matches!(
                self.previous().kind,
                TokenKind::Semicolon | TokenKind::RBrace
            ) {
                return;
            }
            if matches!(
                self.peek().kind,
                TokenKind::Fn | TokenKind::If | TokenKind::Loop | TokenKind::Ret
            ) {
                return;
            }
            self.advance();
        }
    }
}
