//! Token types for the ICL lexer.

use phf::phf_map;

use crate::frontend::diagnostics::Span;

/// Finite token categories used by lexer and parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // ========== Identifiers and literals ==========
    Ident,
    Number,
    String,

    // ========== Keywords ==========
    Fn,
    Lam,
    If,
    Loop,
    In,
    Ret,
    True,
    False,

    // ========== Structure ==========
    Assign,    // :=
    Colon,     // :
    Arrow,     // =>
    Question,  // ?
    Range,     // ..
    Comma,     // ,
    Semicolon, // ;
    LParen,    // (
    RParen,    // )
    LBrace,    // {
    RBrace,    // }
    At,        // @
    Hash,      // #

    // ========== Operators ==========
    Plus,    // +
    Minus,   // -
    Star,    // *
    Slash,   // /
    Percent, // %
    EqEq,    // ==
    NotEq,   // !=
    Lt,      // <
    LtEq,    // <=
    Gt,      // >
    GtEq,    // >=
    AndAnd,  // &&
    OrOr,    // ||
    Not,     // !

    Eof,
}

impl TokenKind {
    /// Human-readable name used in parse diagnostics.
    pub fn describe(self) -> &'static str {
        match self {
            TokenKind::Ident => "identifier",
            TokenKind::Number => "number",
            TokenKind::String => "string",
            TokenKind::Fn => "'fn'",
            TokenKind::Lam => "'lam'",
            TokenKind::If => "'if'",
            TokenKind::Loop => "'loop'",
            TokenKind::In => "'in'",
            TokenKind::Ret => "'ret'",
            TokenKind::True => "'true'",
            TokenKind::False => "'false'",
            TokenKind::Assign => "':='",
            TokenKind::Colon => "':'",
            TokenKind::Arrow => "'=>'",
            TokenKind::Question => "'?'",
            TokenKind::Range => "'..'",
            TokenKind::Comma => "','",
            TokenKind::Semicolon => "';'",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::LBrace => "'{'",
            TokenKind::RBrace => "'}'",
            TokenKind::At => "'@'",
            TokenKind::Hash => "'#'",
            TokenKind::Plus => "'+'",
            TokenKind::Minus => "'-'",
            TokenKind::Star => "'*'",
            TokenKind::Slash => "'/'",
            TokenKind::Percent => "'%'",
            TokenKind::EqEq => "'=='",
            TokenKind::NotEq => "'!='",
            TokenKind::Lt => "'<'",
            TokenKind::LtEq => "'<='",
            TokenKind::Gt => "'>'",
            TokenKind::GtEq => "'>='",
            TokenKind::AndAnd => "'&&'",
            TokenKind::OrOr => "'||'",
            TokenKind::Not => "'!'",
            TokenKind::Eof => "end of input",
        }
    }
}

/// Reserved words. Identifiers are checked against this map after scanning.
pub static KEYWORDS: phf::Map<&'static str, TokenKind> = phf_map! {
    "fn" => TokenKind::Fn,
    "lam" => TokenKind::Lam,
    "if" => TokenKind::If,
    "loop" => TokenKind::Loop,
    "in" => TokenKind::In,
    "ret" => TokenKind::Ret,
    "true" => TokenKind::True,
    "false" => TokenKind::False,
};

/// A single lexical token with its original source span.
///
/// `text` holds the lexeme; for string tokens it is the unescaped value.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            text: text.into(),
            span,
        }
    }
}
