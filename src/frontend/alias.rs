//! Natural-alias normalization pass.
//!
//! Rewrites whole-word natural spellings into canonical ICL tokens before
//! lexing, skipping string literals and line comments. Off by default; the
//! pipeline enables it for `--natural` runs and records the rewrite trace for
//! the `explain` payload.

use serde::Serialize;

use icl_core::aliases::{self, AliasMode};

use crate::frontend::diagnostics::Diagnostic;
use crate::frontend::lexer;

/// One alias replacement event with its source location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AliasRewrite {
    pub alias: String,
    pub canonical: String,
    pub line: u32,
    pub column: u32,
}

/// Trace of a normalization pass, serialized into `explain` output.
#[derive(Debug, Clone, Serialize)]
pub struct AliasTrace {
    pub mode: AliasMode,
    pub changed: bool,
    pub count: usize,
    pub replacements: Vec<AliasRewrite>,
}

/// Normalize alias identifiers while preserving strings and comments.
///
/// The rewritten text must still form a valid token sequence; a rewrite that
/// breaks lexing (when the input lexed cleanly) fails with `ALI001` instead
/// of handing the parser a mangled module.
pub fn normalize(source: &str, mode: AliasMode) -> Result<(String, AliasTrace), Diagnostic> {
    let (normalized, replacements) = rewrite(source, mode);
    let changed = normalized != source;

    if changed && lexer::lex(&normalized).is_err() && lexer::lex(source).is_ok() {
        let first = replacements.first();
        let mut diagnostic = Diagnostic::new(
            "ALI001",
            "Alias normalization produced an invalid token sequence.",
        )
        .with_hint("Rename the conflicting identifier or disable natural alias mode.");
        if let Some(rewrite) = first {
            diagnostic = diagnostic.with_span(crate::frontend::diagnostics::Span::new(
                rewrite.line,
                rewrite.column,
                rewrite.line,
                rewrite.column + rewrite.alias.chars().count() as u32,
            ));
        }
        return Err(diagnostic);
    }

    let trace = AliasTrace {
        mode,
        changed,
        count: replacements.len(),
        replacements,
    };
    Ok((normalized, trace))
}

fn rewrite(source: &str, mode: AliasMode) -> (String, Vec<AliasRewrite>) {
    let chars: Vec<char> = source.chars().collect();
    let mut out = String::with_capacity(source.len());
    let mut replacements = Vec::new();

    let mut idx = 0;
    let mut line: u32 = 1;
    let mut column: u32 = 1;

    let bump = |ch: char, line: &mut u32, column: &mut u32| {
        if ch == '\n' {
            *line += 1;
            *column = 1;
        } else {
            *column += 1;
        }
    };

    while idx < chars.len() {
        let ch = chars[idx];

        // String literals pass through untouched, escapes included.
        if ch == '"' {
            out.push(ch);
            bump(ch, &mut line, &mut column);
            idx += 1;
            while idx < chars.len() {
                let cur = chars[idx];
                out.push(cur);
                bump(cur, &mut line, &mut column);
                idx += 1;
                if cur == '\\' && idx < chars.len() {
                    let escaped = chars[idx];
                    out.push(escaped);
                    bump(escaped, &mut line, &mut column);
                    idx += 1;
                    continue;
                }
                if cur == '"' {
                    break;
                }
            }
            continue;
        }

        // Line comments pass through untouched.
        if ch == '/' && idx + 1 < chars.len() && chars[idx + 1] == '/' {
            while idx < chars.len() && chars[idx] != '\n' {
                let cur = chars[idx];
                out.push(cur);
                bump(cur, &mut line, &mut column);
                idx += 1;
            }
            continue;
        }

        if ch.is_ascii_alphabetic() || ch == '_' {
            let start_line = line;
            let start_column = column;
            let mut word = String::new();
            while idx < chars.len() && (chars[idx].is_ascii_alphanumeric() || chars[idx] == '_') {
                let cur = chars[idx];
                word.push(cur);
                bump(cur, &mut line, &mut column);
                idx += 1;
            }
            match aliases::resolve(&word, mode) {
                Some(canonical) => {
                    out.push_str(canonical);
                    replacements.push(AliasRewrite {
                        alias: word,
                        canonical: canonical.to_string(),
                        line: start_line,
                        column: start_column,
                    });
                }
                None => out.push_str(&word),
            }
            continue;
        }

        out.push(ch);
        bump(ch, &mut line, &mut column);
        idx += 1;
    }

    (out, replacements)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_core_keyword_aliases() {
        let (text, trace) =
            normalize("mkfn add(a, b) => a + b; prnt(1);", AliasMode::Core).expect("normalize");
        assert_eq!(text, "fn add(a, b) => a + b; print(1);");
        assert_eq!(trace.count, 2);
        assert!(trace.changed);
        assert_eq!(trace.replacements[0].alias, "mkfn");
        assert_eq!(trace.replacements[0].canonical, "fn");
        assert_eq!(trace.replacements[0].line, 1);
        assert_eq!(trace.replacements[0].column, 1);
    }

    #[test]
    fn extended_mode_rewrites_word_operators() {
        let (text, _) =
            normalize("ok := yes and not no;", AliasMode::Extended).expect("normalize");
        assert_eq!(text, "ok := true && ! false;");
    }

    #[test]
    fn core_mode_leaves_word_operators_alone() {
        let (text, trace) = normalize("ok := yes;", AliasMode::Core).expect("normalize");
        assert_eq!(text, "ok := yes;");
        assert!(!trace.changed);
    }

    #[test]
    fn strings_and_comments_are_preserved() {
        let source = "s := \"say and echo\"; // prnt here\nsay(s);";
        let (text, trace) = normalize(source, AliasMode::Extended).expect("normalize");
        assert_eq!(text, "s := \"say and echo\"; // prnt here\nprint(s);");
        assert_eq!(trace.count, 1);
    }

    #[test]
    fn word_boundaries_are_identifier_boundaries() {
        let (text, trace) = normalize("sayings := 1;", AliasMode::Core).expect("normalize");
        assert_eq!(text, "sayings := 1;");
        assert_eq!(trace.count, 0);
    }
}
