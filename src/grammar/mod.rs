//! Language plugins.
//!
//! A [`Grammar`] is the only language-specific code the pipeline depends on:
//! it configures the Layer 0 machine and classifies its raw tokens, decides
//! which brackets open which Layer 1 boundaries, and parses one boundary's
//! tokens into fact drafts for Layer 2.

mod curly;
mod cx;
mod json;
mod plain;

pub use curly::CurlyGrammar;
pub use cx::{Item, ParseCx, own_tokens};
pub use json::JsonGrammar;
pub use plain::PlainGrammar;

use std::fmt;

use smol_str::SmolStr;

use crate::base::Span;
use crate::fact::BoundaryKind;
use crate::lexer::{Delimiter, LexRules, RawKind, Token, TokenKind};

/// Supported languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LanguageId {
    Json,
    /// The curly-brace family: C, C++, Rust, Java, JavaScript, ...
    Curly,
    /// Fallback for anything else.
    Plain,
}

impl LanguageId {
    /// Pick a language from a file extension (without the dot).
    pub fn from_extension(ext: &str) -> LanguageId {
        match ext.to_ascii_lowercase().as_str() {
            "json" | "jsonc" | "geojson" => LanguageId::Json,
            "c" | "h" | "cc" | "cpp" | "cxx" | "hpp" | "rs" | "java" | "js" | "mjs" | "jsx"
            | "ts" | "tsx" | "go" | "cs" | "kt" | "swift" | "scala" | "dart" | "php" => {
                LanguageId::Curly
            }
            _ => LanguageId::Plain,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LanguageId::Json => "json",
            LanguageId::Curly => "curly",
            LanguageId::Plain => "plain",
        }
    }
}

impl fmt::Display for LanguageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a boundary opened by a bracket starts, and what it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opener {
    pub kind: BoundaryKind,
    /// Index of the boundary's first token; at or before the bracket.
    pub start: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// No production matches the boundary's tokens.
    Ambiguous,
    /// Nesting exceeded the boundary's depth budget.
    TooDeep,
}

/// Why a boundary could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    pub kind: FailureKind,
    pub span: Span,
    pub message: SmolStr,
}

/// The per-language plugin contract.
pub trait Grammar: Send + Sync + fmt::Debug {
    fn language(&self) -> LanguageId;

    fn lex_rules(&self) -> LexRules;

    /// Give a raw token its language-specific kind.
    fn classify(&self, raw: RawKind, text: &str) -> TokenKind;

    /// Bracket pairs that can open boundaries.
    fn boundary_delimiters(&self) -> &'static [Delimiter] {
        &[Delimiter::Brace, Delimiter::Bracket]
    }

    /// Decide the boundary opened by the bracket at `tokens[open]`, or
    /// `None` when that bracket is not structural.
    fn match_opener(&self, tokens: &[Token], open: usize, source: &str) -> Option<Opener>;

    /// Emit drafts for the boundary the context is positioned on.
    fn parse_boundary(&self, cx: &mut ParseCx<'_>) -> Result<(), ParseFailure>;
}

static JSON: JsonGrammar = JsonGrammar;
static CURLY: CurlyGrammar = CurlyGrammar;
static PLAIN: PlainGrammar = PlainGrammar;

/// The built-in grammar for a language.
pub fn grammar_for(language: LanguageId) -> &'static dyn Grammar {
    match language {
        LanguageId::Json => &JSON,
        LanguageId::Curly => &CURLY,
        LanguageId::Plain => &PLAIN,
    }
}

/// Strip the quotes of a string literal. Escapes are kept as written.
pub(crate) fn unquote(text: &str) -> &str {
    let mut chars = text.chars();
    match (chars.next(), chars.next_back()) {
        (Some(open), Some(close)) if open == close && matches!(open, '"' | '\'' | '`') => {
            &text[open.len_utf8()..text.len() - close.len_utf8()]
        }
        _ => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_extension() {
        assert_eq!(LanguageId::from_extension("json"), LanguageId::Json);
        assert_eq!(LanguageId::from_extension("RS"), LanguageId::Curly);
        assert_eq!(LanguageId::from_extension("ts"), LanguageId::Curly);
        assert_eq!(LanguageId::from_extension("md"), LanguageId::Plain);
    }

    #[test]
    fn test_grammar_for() {
        for lang in [LanguageId::Json, LanguageId::Curly, LanguageId::Plain] {
            assert_eq!(grammar_for(lang).language(), lang);
        }
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("\"a\""), "a");
        assert_eq!(unquote("'b'"), "b");
        assert_eq!(unquote("\"\""), "");
        assert_eq!(unquote("\"open"), "\"open");
        assert_eq!(unquote("\""), "\"");
    }
}
