use crate::ast::Span;

pub type Results<T> = Result<T, SpannedError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpannedError {
    pub error: AstError,
    pub span: Option<Span>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AstError {
    /// Malformed statement or expression; `line` is the offending source text.
    SyntaxError { message: String, line: String },

    /// A conversion invariant broke. Indicates a frontend/converter mismatch.
    InternalError(String),
}

impl SpannedError {
    pub fn syntax(message: impl Into<String>, line: impl Into<String>, span: Span) -> Self {
        Self {
            error: AstError::SyntaxError {
                message: message.into(),
                line: line.into(),
            },
            span: Some(span),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            error: AstError::InternalError(message.into()),
            span: None,
        }
    }

    pub fn is_syntax_error(&self) -> bool {
        matches!(self.error, AstError::SyntaxError { .. })
    }
}

impl std::fmt::Display for AstError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SyntaxError { message, line } => {
                write!(f, "Syntax error: {} in `{}`", message, line)
            }
            Self::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::fmt::Display for SpannedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.span {
            Some(span) => write!(f, "{} (line {}, column {})", self.error, span.line, span.column),
            None => write!(f, "{}", self.error),
        }
    }
}

impl std::error::Error for AstError {}

impl std::error::Error for SpannedError {}

pub fn format_error(error: &SpannedError, source: &str) -> String {
    let mut result = format!("Error: {}", error.error);
    if let Some(span) = &error.span {
        result.push_str(&format!("\n  --> {}:{}", span.line, span.column));
        if let Some(line_text) = source.lines().nth(span.line.saturating_sub(1)) {
            result.push_str(&format!("\n   | {}", line_text));
            result.push_str(&format!(
                "\n   | {}^",
                " ".repeat(span.column.saturating_sub(1))
            ));
        }
    }
    result
}
