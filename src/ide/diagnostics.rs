//! Diagnostics from error facts and error-recovery regions.
//!
//! Error codes follow a naming convention: E{category}{number}
//! - E01xx: Lexical errors (invalid tokens)
//! - E02xx: Structural errors (unbalanced delimiters)
//! - E03xx: Detailed parse errors (inside a boundary)

use std::fmt;

use crate::base::{LineCol, LineIndex, Span, TextSize};
use crate::engine::Engine;
use crate::fact::{BoundaryKind, Predicate};
use crate::lexer::{Delimiter, LexFault, Side, Token};

/// Error codes for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Invalid or unexpected character in source
    E0101,
    /// Unterminated string literal
    E0102,
    /// Unterminated block comment
    E0103,
    /// Unclosed brace `{`
    E0202,
    /// Unclosed parenthesis `(`
    E0203,
    /// Unclosed bracket `[`
    E0204,
    /// Unexpected closing delimiter
    E0205,
    /// Syntax error inside a boundary
    E0301,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::E0101 => "E0101",
            Self::E0102 => "E0102",
            Self::E0103 => "E0103",
            Self::E0202 => "E0202",
            Self::E0203 => "E0203",
            Self::E0204 => "E0204",
            Self::E0205 => "E0205",
            Self::E0301 => "E0301",
        }
    }

    pub fn category_description(&self) -> &'static str {
        match self {
            Self::E0101 | Self::E0102 | Self::E0103 => "lexical error",
            Self::E0202 | Self::E0203 | Self::E0204 | Self::E0205 => "structural error",
            Self::E0301 => "syntax error",
        }
    }

    pub fn default_message(&self) -> &'static str {
        match self {
            Self::E0101 => "invalid character",
            Self::E0102 => "unterminated string literal",
            Self::E0103 => "unterminated block comment",
            Self::E0202 => "unclosed brace",
            Self::E0203 => "unclosed parenthesis",
            Self::E0204 => "unclosed bracket",
            Self::E0205 => "unexpected closing delimiter",
            Self::E0301 => "syntax error",
        }
    }

    pub fn is_structural(&self) -> bool {
        matches!(self, Self::E0202 | Self::E0203 | Self::E0204 | Self::E0205)
    }

    fn of_fault(fault: LexFault) -> ErrorCode {
        match fault {
            LexFault::InvalidUtf8 | LexFault::UnexpectedChar => Self::E0101,
            LexFault::UnterminatedString => Self::E0102,
            LexFault::UnterminatedComment => Self::E0103,
        }
    }

    fn unclosed(delim: Delimiter) -> ErrorCode {
        match delim {
            Delimiter::Brace => Self::E0202,
            Delimiter::Paren => Self::E0203,
            Delimiter::Bracket => Self::E0204,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Severity level for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Severity {
    #[default]
    Error,
    /// Follow-on errors inside a region already reported as broken.
    Warning,
}

impl Severity {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
        }
    }
}

/// Related location information for a diagnostic, e.g. the opener of an
/// unclosed region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelatedInfo {
    pub message: String,
    pub span: Span,
}

/// A diagnostic positioned in the current buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: String,
    pub span: Span,
    pub start: LineCol,
    pub end: LineCol,
    pub code: ErrorCode,
    pub severity: Severity,
    /// Optional suggestion for fixing the error
    pub hint: Option<String>,
    pub related: Vec<RelatedInfo>,
}

impl Diagnostic {
    fn new(lines: &LineIndex, span: Span, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            span,
            start: lines.line_col(TextSize::from(span.start)),
            end: lines.line_col(TextSize::from(span.end)),
            code,
            severity: Severity::Error,
            hint: None,
            related: Vec::new(),
        }
    }

    fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    fn with_related(mut self, message: impl Into<String>, span: Span) -> Self {
        self.related.push(RelatedInfo {
            message: message.into(),
            span,
        });
        self
    }

    /// Format as `line:col: error[E0202]: message`.
    pub fn format(&self) -> String {
        format!(
            "{}: {}[{}]: {}",
            self.start,
            self.severity.as_str(),
            self.code,
            self.message
        )
    }
}

/// Diagnostics for the current generation, sorted by position.
pub fn diagnostics(engine: &Engine) -> Vec<Diagnostic> {
    let lines = engine.line_index();
    let tokens = engine.tokens();
    let mut out = Vec::new();

    let regions: Vec<Span> = engine
        .boundaries()
        .iter()
        .filter(|b| b.kind == BoundaryKind::ErrorRegion)
        .map(|b| b.span)
        .collect();

    for boundary in engine.boundaries() {
        if boundary.kind != BoundaryKind::ErrorRegion {
            continue;
        }
        // Declaration regions start at their header, not at the bracket.
        let opener = boundary
            .open_token
            .and_then(|id| tokens.iter().find(|t| t.id == id))
            .or_else(|| token_at(tokens, boundary.span.start))
            .and_then(|t| t.delimiter().map(|d| (t, d)));
        let diagnostic = match opener {
            Some((token, (delim, Side::Open))) => {
                let code = ErrorCode::unclosed(delim);
                Diagnostic::new(&lines, token.span, code, code.default_message())
                    .with_hint(format!("add a matching `{}`", delim.close_char()))
                    .with_related("region ends here", Span::empty(boundary.span.end))
            }
            Some((token, (_, Side::Close))) => Diagnostic::new(
                &lines,
                token.span,
                ErrorCode::E0205,
                ErrorCode::E0205.default_message(),
            )
            .with_hint("remove it or add the matching opener"),
            None => Diagnostic::new(
                &lines,
                boundary.span,
                ErrorCode::E0301,
                "unbalanced region",
            ),
        };
        out.push(diagnostic);
    }

    let snapshot = engine.snapshot();
    for fact in snapshot.facts() {
        let span = fact.subject();
        let message = fact.object().and_then(|v| v.as_text()).unwrap_or_default();
        match fact.predicate() {
            Predicate::LexError => {
                let code = token_at(tokens, span.start)
                    .and_then(|t| t.kind.fault())
                    .map_or(ErrorCode::E0101, ErrorCode::of_fault);
                out.push(Diagnostic::new(&lines, span, code, message));
            }
            Predicate::HasError => {
                let mut diagnostic = Diagnostic::new(&lines, span, ErrorCode::E0301, message);
                if regions.iter().any(|r| r.contains_span(span)) {
                    diagnostic.severity = Severity::Warning;
                }
                out.push(diagnostic);
            }
            _ => {}
        }
    }

    out.sort_by_key(|d| (d.span.start, d.span.end, d.code.as_str()));
    out
}

fn token_at(tokens: &[Token], offset: u32) -> Option<&Token> {
    let i = tokens.partition_point(|t| t.span.start < offset);
    tokens.get(i).filter(|t| t.span.start == offset)
}
