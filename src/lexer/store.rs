//! Incremental token storage.

use std::sync::Arc;

use crate::base::{EditMap, IdAllocator, Pool, Span, TokenId};
use crate::grammar::Grammar;

use super::machine::{LexCheckpoint, RawToken, TokenStream};
use super::token::{Token, TokenKind};

/// Change to the token sequence caused by one edit.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenDelta {
    pub removed: Vec<TokenId>,
    /// New tokens in new-generation coordinates, in text order.
    pub added: Vec<Token>,
    /// Region of the new text whose tokens changed, including the edit.
    pub affected: Span,
    pub edit: EditMap,
}

impl TokenDelta {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty()
    }
}

/// The current token sequence of one buffer.
///
/// Always ends with exactly one end-of-input token.
#[derive(Debug)]
pub struct TokenStore {
    grammar: &'static dyn Grammar,
    alloc: Arc<IdAllocator>,
    tokens: Vec<Token>,
    /// Relex buffers, reused across edits.
    scratch: Pool<(Span, TokenKind, u32)>,
}

const RELEX_CHUNK: usize = 256;

impl TokenStore {
    /// A store for the empty buffer.
    pub fn new(grammar: &'static dyn Grammar, alloc: Arc<IdAllocator>) -> Self {
        let mut store = Self {
            grammar,
            alloc,
            tokens: Vec::new(),
            scratch: Pool::new(RELEX_CHUNK, 2),
        };
        store.tokens = store.lex_from("", LexCheckpoint::default());
        store
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Index of the first token starting at or after `offset`.
    pub fn index_at(&self, offset: u32) -> usize {
        self.tokens.partition_point(|t| t.span.start < offset)
    }

    fn classify(&self, raw: RawToken, text: &str) -> (Span, TokenKind, u32) {
        let kind = self.grammar.classify(raw.kind, raw.span.slice(text));
        (raw.span, kind, raw.depth)
    }

    fn lex_from(&self, text: &str, at: LexCheckpoint) -> Vec<Token> {
        TokenStream::resume(text, self.grammar.lex_rules(), at)
            .map(|raw| {
                let (span, kind, depth) = self.classify(raw, text);
                Token::new(self.alloc.token_id(), span, kind, depth)
            })
            .collect()
    }

    fn depth_before(&self, index: usize) -> u32 {
        match index {
            0 => 0,
            i => self.tokens[i - 1].depth_after(),
        }
    }

    /// Bring the tokens up to date with `text`, the buffer after `edit`.
    ///
    /// Relexing starts at the token before the edit and stops as soon as the
    /// new token stream lines up with an old token past the edit at the same
    /// bracket depth; tokens on either side keep their ids.
    pub fn apply_edit(&mut self, edit: EditMap, text: &str) -> TokenDelta {
        if edit.is_noop() {
            return TokenDelta {
                removed: Vec::new(),
                added: Vec::new(),
                affected: Span::empty(edit.range.start),
                edit,
            };
        }

        let s = edit.range.start;
        let e = edit.range.end;
        let shift = edit.delta();
        let resume_at = s + edit.new_len;

        let first = self
            .tokens
            .partition_point(|t| t.span.end < s)
            .min(self.tokens.len().saturating_sub(1));
        let start = first.saturating_sub(1);
        let at = LexCheckpoint {
            offset: self.tokens.get(start).map_or(0, |t| t.span.start),
            depth: self.depth_before(start),
        };

        let mut fresh = self.scratch.take();
        let mut end = self.tokens.len();
        let mut depth = at.depth;
        for raw in TokenStream::resume(text, self.grammar.lex_rules(), at) {
            if raw.span.start >= resume_at {
                let old_start = (raw.span.start as i64 - shift) as u32;
                let synced = self
                    .tokens
                    .binary_search_by_key(&old_start, |t| t.span.start)
                    .ok()
                    .filter(|&j| j >= start && self.depth_before(j) == depth);
                if let Some(j) = synced {
                    end = j;
                    break;
                }
            }
            depth = raw.depth_after();
            fresh.push(self.classify(raw, text));
        }

        // Trim the part of the relexed run that did not change.
        let old_run = &self.tokens[start..end];
        let mut prefix = 0;
        while prefix < fresh.len() && prefix < old_run.len() {
            let old = &old_run[prefix];
            let (span, kind, depth) = fresh[prefix];
            if old.span.end <= s && old.span == span && old.kind == kind && old.depth == depth {
                prefix += 1;
            } else {
                break;
            }
        }
        let mut suffix = 0;
        while suffix < fresh.len() - prefix && suffix < old_run.len() - prefix {
            let old = &old_run[old_run.len() - 1 - suffix];
            let (span, kind, depth) = fresh[fresh.len() - 1 - suffix];
            let moved = Span::new(
                (old.span.start as i64 + shift) as u32,
                (old.span.end as i64 + shift) as u32,
            );
            if old.span.start >= e && moved == span && old.kind == kind && old.depth == depth {
                suffix += 1;
            } else {
                break;
            }
        }

        let removed_range = start + prefix..end - suffix;
        let mut affected = edit.new_range();
        let removed: Vec<TokenId> = self.tokens[removed_range.clone()]
            .iter()
            .map(|t| {
                affected = affected.merge(edit.map_span(t.span));
                t.id
            })
            .collect();
        let added: Vec<Token> = fresh[prefix..fresh.len() - suffix]
            .iter()
            .map(|&(span, kind, depth)| {
                affected = affected.merge(span);
                Token::new(self.alloc.token_id(), span, kind, depth)
            })
            .collect();

        let tail = removed_range.start + added.len();
        self.tokens.splice(removed_range, added.iter().copied());
        if shift != 0 {
            for token in &mut self.tokens[tail..] {
                token.span = Span::new(
                    (token.span.start as i64 + shift) as u32,
                    (token.span.end as i64 + shift) as u32,
                );
            }
        }

        tracing::trace!(
            removed = removed.len(),
            added = added.len(),
            ?affected,
            "relexed"
        );
        TokenDelta {
            removed,
            added,
            affected,
            edit,
        }
    }
}
