//! Lexer for ICL source text.
//!
//! Converts source into an ordered token stream with 1-based line/column
//! spans. Errors accumulate: an unexpected character is recorded as `LEX001`
//! and skipped so the rest of the file still lexes; an unterminated string is
//! recorded as `LEX002` and ends the scan. Lexing fails with the collected
//! list when any error was recorded.

pub mod tokens;

pub use tokens::{Token, TokenKind, KEYWORDS};

use crate::frontend::diagnostics::{Diagnostic, Span};

/// Lexer state over the source character sequence.
pub struct Lexer {
    chars: Vec<char>,
    index: usize,
    line: u32,
    column: u32,
    tokens: Vec<Token>,
    errors: Vec<Diagnostic>,
}

/// Tokenize full source text.
pub fn lex(source: &str) -> Result<Vec<Token>, Vec<Diagnostic>> {
    Lexer::new(source).tokenize()
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            index: 0,
            line: 1,
            column: 1,
            tokens: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Tokenize the entire source, ending the stream with an `Eof` token.
    pub fn tokenize(mut self) -> Result<Vec<Token>, Vec<Diagnostic>> {
        while !self.is_at_end() {
            let ch = self.peek(0);

            if ch == ' ' || ch == '\t' || ch == '\r' || ch == '\n' {
                self.advance();
                continue;
            }

            if ch == '/' && self.peek(1) == '/' {
                while !self.is_at_end() && self.peek(0) != '\n' {
                    self.advance();
                }
                continue;
            }

            if ch.is_ascii_alphabetic() || ch == '_' {
                self.scan_identifier();
                continue;
            }

            if ch.is_ascii_digit() {
                self.scan_number();
                continue;
            }

            if ch == '"' {
                if !self.scan_string() {
                    break;
                }
                continue;
            }

            if self.scan_operator() {
                continue;
            }

            let span = Span::new(self.line, self.column, self.line, self.column + 1);
            self.errors.push(
                Diagnostic::new("LEX001", format!("Unexpected character '{ch}'."))
                    .with_span(span)
                    .with_hint("Remove the character or escape it inside a string literal."),
            );
            self.advance();
        }

        let eof_span = Span::new(self.line, self.column, self.line, self.column);
        self.tokens.push(Token::new(TokenKind::Eof, "", eof_span));

        if self.errors.is_empty() {
            Ok(self.tokens)
        } else {
            Err(self.errors)
        }
    }

    fn scan_identifier(&mut self) {
        let (start_line, start_column) = (self.line, self.column);
        let mut text = String::new();
        while !self.is_at_end() && (self.peek(0).is_ascii_alphanumeric() || self.peek(0) == '_') {
            text.push(self.advance());
        }
        let kind = KEYWORDS.get(text.as_str()).copied().unwrap_or(TokenKind::Ident);
        let span = Span::new(start_line, start_column, self.line, self.column);
        self.tokens.push(Token::new(kind, text, span));
    }

    fn scan_number(&mut self) {
        let (start_line, start_column) = (self.line, self.column);
        let mut text = String::new();
        let mut seen_dot = false;

        while !self.is_at_end() {
            let ch = self.peek(0);
            if ch.is_ascii_digit() {
                text.push(self.advance());
                continue;
            }
            // A dot joins the number only when followed by a digit, so the
            // loop range form `0..3` still lexes as NUMBER RANGE NUMBER.
            if ch == '.' && !seen_dot && self.peek(1).is_ascii_digit() {
                seen_dot = true;
                text.push(self.advance());
                continue;
            }
            break;
        }

        let span = Span::new(start_line, start_column, self.line, self.column);
        self.tokens.push(Token::new(TokenKind::Number, text, span));
    }

    /// Returns false when the string never terminates (scan must stop).
    fn scan_string(&mut self) -> bool {
        let (start_line, start_column) = (self.line, self.column);
        self.advance(); // opening quote
        let mut value = String::new();

        while !self.is_at_end() {
            let ch = self.advance();
            if ch == '"' {
                let span = Span::new(start_line, start_column, self.line, self.column);
                self.tokens.push(Token::new(TokenKind::String, value, span));
                return true;
            }
            if ch == '\\' {
                if self.is_at_end() {
                    break;
                }
                let escape = self.advance();
                value.push(match escape {
                    'n' => '\n',
                    't' => '\t',
                    '"' => '"',
                    '\\' => '\\',
                    other => other,
                });
                continue;
            }
            value.push(ch);
        }

        let span = Span::new(start_line, start_column, self.line, self.column);
        self.errors.push(
            Diagnostic::new("LEX002", "Unterminated string literal.")
                .with_span(span)
                .with_hint("Close the string with a double quote."),
        );
        false
    }

    fn scan_operator(&mut self) -> bool {
        let (start_line, start_column) = (self.line, self.column);

        // Two-character operators take priority over their prefixes.
        let pair: String = [self.peek(0), self.peek(1)].iter().collect();
        let two = match pair.as_str() {
            ":=" => Some(TokenKind::Assign),
            "=>" => Some(TokenKind::Arrow),
            ".." => Some(TokenKind::Range),
            "==" => Some(TokenKind::EqEq),
            "!=" => Some(TokenKind::NotEq),
            "<=" => Some(TokenKind::LtEq),
            ">=" => Some(TokenKind::GtEq),
            "&&" => Some(TokenKind::AndAnd),
            "||" => Some(TokenKind::OrOr),
            _ => None,
        };
        if let Some(kind) = two {
            self.advance();
            self.advance();
            let span = Span::new(start_line, start_column, self.line, self.column);
            self.tokens.push(Token::new(kind, pair, span));
            return true;
        }

        let single = match self.peek(0) {
            ':' => Some(TokenKind::Colon),
            '?' => Some(TokenKind::Question),
            ',' => Some(TokenKind::Comma),
            ';' => Some(TokenKind::Semicolon),
            '(' => Some(TokenKind::LParen),
            ')' => Some(TokenKind::RParen),
            '{' => Some(TokenKind::LBrace),
            '}' => Some(TokenKind::RBrace),
            '@' => Some(TokenKind::At),
            '#' => Some(TokenKind::Hash),
            '+' => Some(TokenKind::Plus),
            '-' => Some(TokenKind::Minus),
            '*' => Some(TokenKind::Star),
            '/' => Some(TokenKind::Slash),
            '%' => Some(TokenKind::Percent),
            '<' => Some(TokenKind::Lt),
            '>' => Some(TokenKind::Gt),
            '!' => Some(TokenKind::Not),
            _ => None,
        };
        if let Some(kind) = single {
            let ch = self.advance();
            let span = Span::new(start_line, start_column, self.line, self.column);
            self.tokens.push(Token::new(kind, ch.to_string(), span));
            return true;
        }

        false
    }

    fn peek(&self, offset: usize) -> char {
        self.chars.get(self.index + offset).copied().unwrap_or('\0')
    }

    fn advance(&mut self) -> char {
        let ch = self.chars[self.index];
        self.index += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        ch
    }

    fn is_at_end(&self) -> bool {
        self.index >= self.chars.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source)
            .expect("lex should succeed")
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn lexes_assignment_with_arithmetic() {
        assert_eq!(
            kinds("x := 1 + 2;"),
            vec![
                TokenKind::Ident,
                TokenKind::Assign,
                TokenKind::Number,
                TokenKind::Plus,
                TokenKind::Number,
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn range_does_not_swallow_integer_dots() {
        assert_eq!(
            kinds("0..3"),
            vec![
                TokenKind::Number,
                TokenKind::Range,
                TokenKind::Number,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn decimal_numbers_keep_single_dot() {
        let tokens = lex("1.5").expect("lex should succeed");
        assert_eq!(tokens[0].kind, TokenKind::Number);
        assert_eq!(tokens[0].text, "1.5");
    }

    #[test]
    fn keywords_are_reserved() {
        assert_eq!(
            kinds("fn if loop in ret true false lam"),
            vec![
                TokenKind::Fn,
                TokenKind::If,
                TokenKind::Loop,
                TokenKind::In,
                TokenKind::Ret,
                TokenKind::True,
                TokenKind::False,
                TokenKind::Lam,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn multi_char_operators_win_over_prefixes() {
        assert_eq!(
            kinds("<= >= == != && || := => .."),
            vec![
                TokenKind::LtEq,
                TokenKind::GtEq,
                TokenKind::EqEq,
                TokenKind::NotEq,
                TokenKind::AndAnd,
                TokenKind::OrOr,
                TokenKind::Assign,
                TokenKind::Arrow,
                TokenKind::Range,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn string_escapes_are_decoded() {
        let tokens = lex("\"a\\nb\\t\\\"c\\\\\"").expect("lex should succeed");
        assert_eq!(tokens[0].text, "a\nb\t\"c\\");
    }

    #[test]
    fn comments_emit_no_tokens() {
        assert_eq!(
            kinds("x := 1; // trailing note\ny := 2;"),
            vec![
                TokenKind::Ident,
                TokenKind::Assign,
                TokenKind::Number,
                TokenKind::Semicolon,
                TokenKind::Ident,
                TokenKind::Assign,
                TokenKind::Number,
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn unexpected_character_is_recorded_and_skipped() {
        let errors = lex("x := $ 1; y := 2 $;").expect_err("lex should fail");
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| e.code == "LEX001"));
        assert_eq!(errors[0].span.map(|s| (s.line, s.column)), Some((1, 6)));
    }

    #[test]
    fn unterminated_string_reports_lex002() {
        let errors = lex("s := \"oops").expect_err("lex should fail");
        assert_eq!(errors[0].code, "LEX002");
    }

    #[test]
    fn spans_are_one_based_and_monotonic() {
        let tokens = lex("a := 1;\nb := 2;").expect("lex should succeed");
        assert_eq!(tokens[0].span, Span::new(1, 1, 1, 2));
        let mut previous = (0u32, 0u32);
        for token in &tokens {
            let start = (token.span.line, token.span.column);
            assert!(start >= previous, "token spans must be non-decreasing");
            previous = start;
        }
    }
}
