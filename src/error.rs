//! Error types for the filter compiler.

use std::fmt;

/// A single syntactic diagnostic with its source position.
///
/// Lines are 1-based and columns 1-based, counted in characters.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SyntaxDiagnostic {
    /// 1-based line of the offending input.
    pub line: u32,
    /// 1-based column of the offending input.
    pub column: u32,
    /// Human-readable description of the problem.
    pub message: String,
}

impl SyntaxDiagnostic {
    pub fn new(line: u32, column: u32, message: impl Into<String>) -> Self {
        Self {
            line,
            column,
            message: message.into(),
        }
    }
}

impl fmt::Display for SyntaxDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}:{} {}", self.line, self.column, self.message)
    }
}

/// Errors that can occur while compiling a filter query.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// The input failed to lex or parse. Carries every diagnostic collected,
    /// first-seen offending position first.
    #[error("syntax error in filter query: {}", format_diagnostics(.0))]
    InvalidSyntax(Vec<SyntaxDiagnostic>),

    /// Every condition in the query vanished because no referenced key exists
    /// in metadata.
    #[error("no applicable filter fields in query")]
    NoApplicableFields,

    /// The condition builder has no physical column for a valid key. This is
    /// an inconsistency between metadata and the signal schema.
    #[error("no column found for key `{0}`")]
    ColumnNotFound(String),

    /// A (NOT) BETWEEN operator received something other than exactly two
    /// values.
    #[error("(not) between operator requires two values")]
    BetweenValues,

    /// A (NOT) IN operator received something other than a list of values.
    #[error("(not) in operator requires a list of values")]
    InValues,

    /// The operator does not apply to the physical column's type.
    #[error("operator {operator} is not supported for column type {column_type}")]
    OperatorUnsupported {
        /// The rejected operator.
        operator: &'static str,
        /// Display form of the column type.
        column_type: String,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Propagated from the telemetry store.
    #[error("telemetry store error: {0}")]
    Storage(String),
}

fn format_diagnostics(diagnostics: &[SyntaxDiagnostic]) -> String {
    diagnostics
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_display() {
        let d = SyntaxDiagnostic::new(2, 14, "missing value after `=`");
        assert_eq!(d.to_string(), "line 2:14 missing value after `=`");
    }

    #[test]
    fn invalid_syntax_joins_diagnostics() {
        let err = QueryError::InvalidSyntax(vec![
            SyntaxDiagnostic::new(1, 3, "unterminated string"),
            SyntaxDiagnostic::new(1, 9, "unexpected token `)`"),
        ]);
        assert_eq!(
            err.to_string(),
            "syntax error in filter query: line 1:3 unterminated string; line 1:9 unexpected token `)`"
        );
    }
}
