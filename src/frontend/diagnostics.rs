//! Structured diagnostics for the ICL compiler.
//!
//! Every phase reports failures as [`Diagnostic`] values: a stable code
//! (`LEX001`, `SEM014`, ...), a message, an optional source span, and an
//! optional hint. Accumulating phases collect them into a `Vec`; nothing is
//! ever reported as bare text.

use serde::{Deserialize, Serialize};

/// Source range in 1-based line/column coordinates.
///
/// File names travel beside spans (in the source map and at print sites), so
/// spans stay `Copy` and cheap to attach to every token and node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    pub line: u32,
    pub column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl Span {
    pub fn new(line: u32, column: u32, end_line: u32, end_column: u32) -> Self {
        Self {
            line,
            column,
            end_line,
            end_column,
        }
    }

    /// Merge two spans into the range covering both, keeping source order.
    pub fn merge(self, other: Span) -> Span {
        Span {
            line: self.line,
            column: self.column,
            end_line: other.end_line,
            end_column: other.end_column,
        }
    }
}

/// Machine-readable diagnostic emitted by a compiler phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl Diagnostic {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            span: None,
            hint: None,
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Stable single-line rendering: `CODE file:line:col: message Hint: ...`.
    pub fn format(&self, file: &str) -> String {
        let location = match self.span {
            Some(span) => format!(" {}:{}:{}", file, span.line, span.column),
            None => String::new(),
        };
        let hint = match &self.hint {
            Some(hint) => format!(" Hint: {hint}"),
            None => String::new(),
        };
        format!("{}{}: {}{}", self.code, location, self.message, hint)
    }
}

/// Print a diagnostic with source context to stderr.
pub fn print_diagnostic(file: &str, source: &str, diagnostic: &Diagnostic) {
    let red = "\x1b[31m";
    let cyan = "\x1b[36m";
    let bold = "\x1b[1m";
    let reset = "\x1b[0m";

    eprintln!(
        "{bold}{red}error[{code}]{reset}{bold}: {message}{reset}",
        code = diagnostic.code,
        message = diagnostic.message,
    );

    let Some(span) = diagnostic.span else {
        if let Some(hint) = &diagnostic.hint {
            eprintln!("  {cyan}= hint:{reset} {hint}");
        }
        eprintln!();
        return;
    };

    eprintln!("  {cyan}-->{reset} {}:{}:{}", file, span.line, span.column);

    if let Some(line_text) = source.lines().nth(span.line.saturating_sub(1) as usize) {
        let line_num_width = span.line.to_string().len();
        eprintln!("  {cyan}{:>width$} |{reset}", "", width = line_num_width);
        eprintln!(
            "  {cyan}{:>width$} |{reset} {}",
            span.line,
            line_text,
            width = line_num_width
        );
        let caret_len = if span.end_line == span.line && span.end_column > span.column {
            (span.end_column - span.column) as usize
        } else {
            1
        };
        eprintln!(
            "  {cyan}{:>width$} |{reset} {}{red}{}{reset}",
            "",
            " ".repeat(span.column.saturating_sub(1) as usize),
            "^".repeat(caret_len.max(1)),
            width = line_num_width
        );
    }

    if let Some(hint) = &diagnostic.hint {
        eprintln!("  {cyan}= hint:{reset} {hint}");
    }
    eprintln!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_includes_code_location_and_hint() {
        let diag = Diagnostic::new("LEX001", "Unexpected character '$'.")
            .with_span(Span::new(2, 5, 2, 6))
            .with_hint("Remove the character.");
        assert_eq!(
            diag.format("demo.icl"),
            "LEX001 demo.icl:2:5: Unexpected character '$'. Hint: Remove the character."
        );
    }

    #[test]
    fn format_without_span_omits_location() {
        let diag = Diagnostic::new("PACK001", "Unknown target language pack 'zig'.");
        assert_eq!(
            diag.format("<input>"),
            "PACK001: Unknown target language pack 'zig'."
        );
    }

    #[test]
    fn span_merge_keeps_outer_range() {
        let merged = Span::new(1, 1, 1, 3).merge(Span::new(1, 5, 2, 4));
        assert_eq!(merged, Span::new(1, 1, 2, 4));
    }

    #[test]
    fn serializes_to_stable_payload() {
        let diag =
            Diagnostic::new("SEM011", "Undefined symbol 'x'.").with_span(Span::new(1, 1, 1, 2));
        let json = serde_json::to_string(&diag).expect("diagnostic should serialize");
        assert!(json.contains("\"code\":\"SEM011\""));
        assert!(json.contains("\"line\":1"));
        assert!(!json.contains("hint"));
    }
}
