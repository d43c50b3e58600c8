//! Cursor handed to [`Grammar::parse_boundary`](super::Grammar::parse_boundary).

use smol_str::SmolStr;
use tokio_util::sync::CancellationToken;

use crate::base::{Arena, ArenaId, Span};
use crate::fact::{FactDraft, NodeKind, Predicate};
use crate::lexer::{Delimiter, Side, Token, TokenKind};
use crate::structure::ParseBoundary;

use super::{FailureKind, ParseFailure};

/// What the cursor sees next: a significant token of this boundary, or a
/// nested boundary that is parsed on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Item<'a> {
    Token(&'a Token),
    Hole(Span),
}

impl Item<'_> {
    pub fn span(&self) -> Span {
        match self {
            Item::Token(t) => t.span,
            Item::Hole(span) => *span,
        }
    }
}

/// Tokens of `tokens` that belong to a boundary itself, skipping the
/// interiors of its child boundaries.
pub fn own_tokens<'a>(tokens: &'a [Token], holes: &'a [Span]) -> impl Iterator<Item = &'a Token> {
    tokens
        .iter()
        .filter(move |t| !holes.iter().any(|h| h.contains(t.span.start)))
}

const CANCEL_CHECK_INTERVAL: u32 = 256;

/// Parse state for one boundary: a cursor over its tokens that skips trivia
/// and steps over child boundaries, plus the arena drafts are emitted into.
#[derive(Debug)]
pub struct ParseCx<'a> {
    source: &'a str,
    tokens: &'a [Token],
    holes: &'a [Span],
    boundary: &'a ParseBoundary,
    cancel: Option<&'a CancellationToken>,
    pos: usize,
    hole: usize,
    last: Span,
    drafts: Arena<FactDraft>,
    depth: u32,
    limit: u32,
    steps: u32,
    cancelled: bool,
}

impl<'a> ParseCx<'a> {
    /// `tokens` are the tokens inside the boundary's span, `holes` the spans
    /// of its direct children in order.
    pub fn new(
        source: &'a str,
        tokens: &'a [Token],
        holes: &'a [Span],
        boundary: &'a ParseBoundary,
        limit: u32,
    ) -> Self {
        Self {
            source,
            tokens,
            holes,
            boundary,
            cancel: None,
            pos: 0,
            hole: 0,
            last: Span::empty(boundary.span.start),
            drafts: Arena::new(),
            depth: 0,
            limit: limit.max(1),
            steps: 0,
            cancelled: false,
        }
    }

    /// Emit drafts into a recycled buffer.
    pub fn with_buffer(mut self, buf: Vec<FactDraft>) -> Self {
        self.drafts = Arena::from_vec(buf);
        self
    }

    pub fn with_cancel(mut self, cancel: &'a CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn boundary(&self) -> &'a ParseBoundary {
        self.boundary
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    pub fn tokens(&self) -> &'a [Token] {
        self.tokens
    }

    /// Spans of the child boundaries, in order.
    pub fn holes(&self) -> &'a [Span] {
        self.holes
    }

    /// Error regions are parsed leniently: whatever was emitted before a
    /// failure is kept.
    pub fn is_tolerant(&self) -> bool {
        self.boundary.kind.is_error()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn text(&self, token: &Token) -> &'a str {
        token.span.slice(self.source)
    }

    /// Span of the last item consumed.
    pub fn last(&self) -> Span {
        self.last
    }

    pub fn peek(&mut self) -> Option<Item<'a>> {
        loop {
            let token = self.tokens.get(self.pos)?;
            if let Some(&hole) = self.holes.get(self.hole) {
                if token.span.start >= hole.start {
                    return Some(Item::Hole(hole));
                }
            }
            if token.is_eof() {
                return None;
            }
            if token.is_trivia() {
                self.pos += 1;
                continue;
            }
            return Some(Item::Token(token));
        }
    }

    pub fn peek_token(&mut self) -> Option<&'a Token> {
        match self.peek()? {
            Item::Token(t) => Some(t),
            Item::Hole(_) => None,
        }
    }

    pub fn peek_kind(&mut self) -> Option<TokenKind> {
        self.peek_token().map(|t| t.kind)
    }

    pub fn at_end(&mut self) -> bool {
        self.peek().is_none()
    }

    pub fn bump(&mut self) -> Option<Item<'a>> {
        let item = self.peek()?;
        match item {
            Item::Token(_) => self.pos += 1,
            Item::Hole(span) => {
                while self
                    .tokens
                    .get(self.pos)
                    .is_some_and(|t| t.span.start < span.end)
                {
                    self.pos += 1;
                }
                self.hole += 1;
            }
        }
        self.last = item.span();
        self.tick();
        Some(item)
    }

    /// Consume the next token if it has `kind`.
    pub fn eat(&mut self, kind: TokenKind) -> Option<&'a Token> {
        let token = self.peek_token().filter(|t| t.kind == kind)?;
        self.bump();
        Some(token)
    }

    /// Consume the next token if it opens or closes a bracket.
    pub fn eat_delimiter(&mut self, side: Side) -> Option<(&'a Token, Delimiter)> {
        let token = self.peek_token()?;
        match token.delimiter() {
            Some((delim, s)) if s == side => {
                self.bump();
                Some((token, delim))
            }
            _ => None,
        }
    }

    fn tick(&mut self) {
        self.steps += 1;
        if self.steps % CANCEL_CHECK_INTERVAL == 0 && self.cancel.is_some_and(|c| c.is_cancelled()) {
            self.cancelled = true;
            self.pos = self.tokens.len();
        }
    }

    /// Nest one level deeper.
    pub fn enter(&mut self) -> Result<(), ParseFailure> {
        if self.depth >= self.limit {
            return Err(ParseFailure {
                kind: FailureKind::TooDeep,
                span: self.last,
                message: SmolStr::new_static("nesting too deep"),
            });
        }
        self.depth += 1;
        Ok(())
    }

    pub fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// A failure at the next item, or at the last consumed one at end of
    /// input.
    pub fn fail(&mut self, message: &'static str) -> ParseFailure {
        let span = match self.peek() {
            Some(item) => item.span(),
            None if self.last.is_empty() => self.boundary.span,
            None => self.last,
        };
        ParseFailure {
            kind: FailureKind::Ambiguous,
            span,
            message: SmolStr::new_static(message),
        }
    }

    pub fn emit(&mut self, draft: FactDraft) -> ArenaId {
        self.drafts.alloc(draft)
    }

    /// Emit an `is_node` draft.
    pub fn node(&mut self, kind: NodeKind, span: Span, parent: Option<ArenaId>) -> ArenaId {
        self.emit(FactDraft::new(span, Predicate::IsNode(kind)).with_parent(parent))
    }

    /// Grow an emitted draft's subject to end at `end`.
    pub fn extend(&mut self, id: ArenaId, end: u32) {
        if let Some(draft) = self.drafts.get_mut(id) {
            draft.subject = Span::new(draft.subject.start, end.max(draft.subject.end));
        }
    }

    pub fn drafts(&self) -> &Arena<FactDraft> {
        &self.drafts
    }

    /// Drop every draft emitted after the first `len`.
    pub fn truncate(&mut self, len: usize) {
        self.drafts.truncate(len);
    }

    pub fn into_drafts(self) -> Vec<FactDraft> {
        self.drafts.into_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::{BoundaryId, IdAllocator};
    use crate::fact::BoundaryKind;
    use crate::grammar::{LanguageId, grammar_for};
    use crate::lexer::TokenStore;
    use std::sync::Arc;

    fn tokens(text: &str) -> Vec<Token> {
        let mut store = TokenStore::new(grammar_for(LanguageId::Json), Arc::new(IdAllocator::new()));
        store.apply_edit(crate::base::EditMap::new(Span::empty(0), text.len() as u32), text);
        store.tokens().to_vec()
    }

    fn boundary(span: Span) -> ParseBoundary {
        ParseBoundary::new(BoundaryId(1), span, BoundaryKind::Block, 0)
    }

    #[test]
    fn test_cursor_skips_trivia_and_holes() {
        let text = r#"{ "a" : [1, 2] , "b": 3 }"#;
        let toks = tokens(text);
        let holes = [Span::new(8, 14)];
        let b = boundary(Span::new(0, text.len() as u32));
        let mut cx = ParseCx::new(text, &toks, &holes, &b, 8);

        let spans: Vec<Span> = std::iter::from_fn(|| cx.bump().map(|i| i.span())).collect();
        assert_eq!(spans[0], Span::new(0, 1));
        assert_eq!(spans[1], Span::new(2, 5));
        assert_eq!(spans[3], Span::new(8, 14));
        assert_eq!(spans[4], Span::new(15, 16));
        assert_eq!(spans.last().copied(), Some(Span::new(24, 25)));
    }

    #[test]
    fn test_own_tokens_excludes_holes() {
        let text = "[[1], 2]";
        let toks = tokens(text);
        let holes = [Span::new(1, 4)];
        let own: Vec<_> = own_tokens(&toks, &holes).map(|t| t.span.start).collect();
        assert_eq!(own, vec![0, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_enter_respects_limit() {
        let b = boundary(Span::new(0, 0));
        let mut cx = ParseCx::new("", &[], &[], &b, 2);
        assert!(cx.enter().is_ok());
        assert!(cx.enter().is_ok());
        let err = cx.enter().unwrap_err();
        assert_eq!(err.kind, FailureKind::TooDeep);
        cx.leave();
        assert!(cx.enter().is_ok());
    }
}
