use std::fmt;

/// Category of a fatal compile error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiagnosticKind {
    Lexical,
    Syntax,
    Semantic,
    Codegen,
    System,
}

impl DiagnosticKind {
    pub fn label(self) -> &'static str {
        match self {
            DiagnosticKind::Lexical => "Lexer Error",
            DiagnosticKind::Syntax => "Syntax Error",
            DiagnosticKind::Semantic => "Semantic Error",
            DiagnosticKind::Codegen => "Codegen Error",
            DiagnosticKind::System => "System Error",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single fatal diagnostic. The pipeline stops at the first one.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[error("[{kind}]{} {message}", line_suffix(.line))]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// 1-based source line; `None` for system errors.
    pub line: Option<usize>,
    pub message: String,
}

fn line_suffix(line: &Option<usize>) -> String {
    match *line {
        Some(line) => format!(" at line {}:", line),
        None => ":".to_string(),
    }
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, line: Option<usize>, message: impl Into<String>) -> Self {
        Self {
            kind,
            line,
            message: message.into(),
        }
    }

    pub fn lexical(line: usize, message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Lexical, Some(line), message)
    }

    pub fn syntax(line: usize, message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Syntax, Some(line), message)
    }

    pub fn semantic(line: usize, message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Semantic, Some(line), message)
    }

    pub fn codegen(message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Codegen, None, message)
    }

    pub fn system(message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::System, None, message)
    }
}

/// Render a diagnostic together with the offending source line, if known.
pub fn format_diagnostic(diag: &Diagnostic, source: &str) -> String {
    let head = diag.to_string();
    let Some(line) = diag.line else {
        return head;
    };
    match source.lines().nth(line.saturating_sub(1)) {
        Some(text) if !text.trim().is_empty() => {
            format!("{}\n  {:>4} | {}", head, line, text.trim_end())
        }
        _ => head,
    }
}

#[cfg(test)]
mod tests {
    use super::{Diagnostic, DiagnosticKind, format_diagnostic};

    #[test]
    fn display_carries_label_and_line() {
        let diag = Diagnostic::syntax(3, "unexpected token `。`");
        assert_eq!(diag.to_string(), "[Syntax Error] at line 3: unexpected token `。`");
        let sys = Diagnostic::system("pushback buffer overflow");
        assert_eq!(sys.to_string(), "[System Error]: pushback buffer overflow");
        assert_eq!(sys.kind, DiagnosticKind::System);
    }

    #[test]
    fn format_includes_source_excerpt() {
        let source = "メイン｛\n”A” を「1」で宣言する。\n｝\n";
        let diag = Diagnostic::syntax(2, "`を` must follow the preceding word directly");
        let rendered = format_diagnostic(&diag, source);
        assert!(rendered.starts_with("[Syntax Error] at line 2:"));
        assert!(
            rendered.ends_with("   2 | ”A” を「1」で宣言する。"),
            "excerpt missing: {rendered}"
        );
    }

    #[test]
    fn format_skips_excerpt_past_end_of_source() {
        let diag = Diagnostic::lexical(9, "unterminated literal");
        assert_eq!(
            format_diagnostic(&diag, "メイン｛｝"),
            "[Lexer Error] at line 9: unterminated literal"
        );
    }
}
