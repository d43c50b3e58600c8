//! Semantic tokens: syntax highlighting from tokens and facts.
//!
//! Lexical classes give the base highlighting; semantic and syntactic facts
//! refine it where the detailed parser knows more (declared names, callees,
//! object keys).

use rustc_hash::FxHashMap;

use crate::base::{LineIndex, Span, TextSize};
use crate::engine::Engine;
use crate::fact::{NodeKind, Predicate, TokenClass};
use crate::index::IndexSnapshot;

/// Token type for semantic highlighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    Namespace,
    Type,
    Function,
    Variable,
    Property,
    Keyword,
    Comment,
    String,
    Number,
}

impl TokenType {
    /// Convert to LSP token type index.
    pub fn to_lsp_index(self) -> u32 {
        match self {
            TokenType::Namespace => 0,
            TokenType::Type => 1,
            TokenType::Function => 2,
            TokenType::Variable => 3,
            TokenType::Property => 4,
            TokenType::Keyword => 5,
            TokenType::Comment => 6,
            TokenType::String => 7,
            TokenType::Number => 8,
        }
    }

    fn of_class(class: TokenClass) -> Option<TokenType> {
        match class {
            TokenClass::Keyword => Some(TokenType::Keyword),
            TokenClass::Comment => Some(TokenType::Comment),
            TokenClass::String => Some(TokenType::String),
            TokenClass::Number => Some(TokenType::Number),
            _ => None,
        }
    }
}

/// A semantic token for syntax highlighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SemanticToken {
    /// Line number (0-indexed)
    pub line: u32,
    /// Column number (0-indexed, UTF-8 bytes)
    pub col: u32,
    /// Length in UTF-8 bytes
    pub length: u32,
    pub token_type: TokenType,
}

/// Semantic tokens for the current generation, sorted by position.
///
/// Tokens spanning several lines are split per line.
pub fn semantic_tokens(engine: &Engine) -> Vec<SemanticToken> {
    let mut types: FxHashMap<Span, TokenType> = FxHashMap::default();
    for token in engine.tokens() {
        if let Some(ty) = TokenType::of_class(token.class()) {
            types.insert(token.span, ty);
        }
    }

    let snapshot = engine.snapshot();
    for fact in snapshot.facts() {
        let ty = match fact.predicate() {
            Predicate::Defines => declared(&snapshot, fact.parent()),
            Predicate::References => TokenType::Function,
            Predicate::IsNode(NodeKind::Key) => TokenType::Property,
            _ => continue,
        };
        types.insert(fact.subject(), ty);
    }

    let lines = engine.line_index();
    let text = engine.text();
    let mut spans: Vec<(Span, TokenType)> = types.into_iter().collect();
    spans.sort_unstable_by_key(|(span, _)| *span);

    let mut tokens = Vec::with_capacity(spans.len());
    for (span, token_type) in spans {
        split_lines(&lines, text, span, |line, col, length| {
            tokens.push(SemanticToken {
                line,
                col,
                length,
                token_type,
            })
        });
    }
    tokens
}

/// The highlighting of a declared name follows the node declaring it.
fn declared(snapshot: &IndexSnapshot, parent: Option<crate::base::FactId>) -> TokenType {
    let kind = parent
        .and_then(|id| snapshot.get(id))
        .map(|fact| fact.predicate());
    match kind {
        Some(Predicate::IsNode(NodeKind::Function)) => TokenType::Function,
        Some(Predicate::IsNode(NodeKind::Class)) => TokenType::Type,
        Some(Predicate::IsNode(NodeKind::Module)) => TokenType::Namespace,
        _ => TokenType::Variable,
    }
}

fn split_lines(lines: &LineIndex, text: &str, span: Span, mut emit: impl FnMut(u32, u32, u32)) {
    let mut start = span.start;
    for piece in span.slice(text).split_inclusive('\n') {
        let len = piece.trim_end_matches(['\n', '\r']).len() as u32;
        if len > 0 {
            let at = lines.line_col(TextSize::from(start));
            emit(at.line, at.col, len);
        }
        start += piece.len() as u32;
    }
}
