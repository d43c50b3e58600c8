//! JSON.

use crate::base::{ArenaId, Span};
use crate::fact::{BoundaryKind, FactDraft, NodeKind, Predicate};
use crate::lexer::{Delimiter, JsonToken, Keyword, LexFault, LexRules, RawKind, Token, TokenKind};

use super::{Grammar, Item, LanguageId, Opener, ParseCx, ParseFailure, unquote};

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonGrammar;

const fn json(t: JsonToken) -> TokenKind {
    TokenKind::Json(t)
}

fn is_number(text: &str) -> bool {
    text.bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'))
}

impl Grammar for JsonGrammar {
    fn language(&self) -> LanguageId {
        LanguageId::Json
    }

    fn lex_rules(&self) -> LexRules {
        LexRules::default()
    }

    fn classify(&self, raw: RawKind, text: &str) -> TokenKind {
        let unexpected = JsonToken::Error(LexFault::UnexpectedChar);
        json(match raw {
            RawKind::Whitespace => JsonToken::Whitespace,
            RawKind::String => JsonToken::String,
            RawKind::Number if is_number(text) => JsonToken::Number,
            RawKind::Ident => match Keyword::lookup(text) {
                Some(Keyword::True) => JsonToken::True,
                Some(Keyword::False) => JsonToken::False,
                Some(Keyword::Null) => JsonToken::Null,
                _ => unexpected,
            },
            RawKind::Open(d) if d != Delimiter::Paren => JsonToken::Open(d),
            RawKind::Close(d) if d != Delimiter::Paren => JsonToken::Close(d),
            RawKind::Punct(':') => JsonToken::Colon,
            RawKind::Punct(',') => JsonToken::Comma,
            RawKind::Punct('-') => JsonToken::Minus,
            RawKind::Error(fault) => JsonToken::Error(fault),
            RawKind::Eof => JsonToken::Eof,
            _ => unexpected,
        })
    }

    fn match_opener(&self, _tokens: &[Token], open: usize, _source: &str) -> Option<Opener> {
        Some(Opener {
            kind: BoundaryKind::Block,
            start: open,
        })
    }

    fn parse_boundary(&self, cx: &mut ParseCx<'_>) -> Result<(), ParseFailure> {
        let span = cx.boundary().span;
        if cx.boundary().is_implicit_root() {
            // A document whose top level is a bare value.
            value(cx, ArenaId(0))?;
        } else if cx.eat(json(JsonToken::Open(Delimiter::Brace))).is_some() {
            object(cx, span)?;
        } else if cx.eat(json(JsonToken::Open(Delimiter::Bracket))).is_some() {
            array(cx, span)?;
        } else {
            return Err(cx.fail("expected `{` or `[`"));
        }
        if !cx.at_end() {
            return Err(cx.fail("unexpected input after value"));
        }
        Ok(())
    }
}

fn object(cx: &mut ParseCx<'_>, span: Span) -> Result<(), ParseFailure> {
    let object = cx.node(NodeKind::Object, span, None);
    if cx.eat(json(JsonToken::Close(Delimiter::Brace))).is_some() {
        return Ok(());
    }
    loop {
        let Some(key) = cx.eat(json(JsonToken::String)) else {
            return Err(cx.fail("expected object key"));
        };
        let member = cx.node(NodeKind::Member, key.span, Some(object));
        let text = unquote(cx.text(key));
        cx.emit(
            FactDraft::new(key.span, Predicate::IsNode(NodeKind::Key))
                .with_text(text)
                .with_parent(Some(member)),
        );
        if cx.eat(json(JsonToken::Colon)).is_none() {
            return Err(cx.fail("expected `:`"));
        }
        let end = value(cx, member)?;
        cx.extend(member, end);

        if cx.eat(json(JsonToken::Comma)).is_some() {
            continue;
        }
        if cx.eat(json(JsonToken::Close(Delimiter::Brace))).is_some() {
            return Ok(());
        }
        return Err(cx.fail("expected `,` or `}`"));
    }
}

fn array(cx: &mut ParseCx<'_>, span: Span) -> Result<(), ParseFailure> {
    let array = cx.node(NodeKind::Array, span, None);
    if cx.eat(json(JsonToken::Close(Delimiter::Bracket))).is_some() {
        return Ok(());
    }
    loop {
        value(cx, array)?;
        if cx.eat(json(JsonToken::Comma)).is_some() {
            continue;
        }
        if cx.eat(json(JsonToken::Close(Delimiter::Bracket))).is_some() {
            return Ok(());
        }
        return Err(cx.fail("expected `,` or `]`"));
    }
}

/// Parse one value and return the offset it ends at. Nested objects and
/// arrays are boundaries of their own and only stepped over.
fn value(cx: &mut ParseCx<'_>, parent: ArenaId) -> Result<u32, ParseFailure> {
    let token = match cx.peek() {
        Some(Item::Hole(span)) => {
            cx.bump();
            return Ok(span.end);
        }
        Some(Item::Token(token)) => token,
        None => return Err(cx.fail("expected value")),
    };

    let (kind, span) = match token.kind {
        TokenKind::Json(JsonToken::String) => (NodeKind::String, token.span),
        TokenKind::Json(JsonToken::Number) => (NodeKind::Number, token.span),
        TokenKind::Json(JsonToken::True | JsonToken::False) => (NodeKind::Bool, token.span),
        TokenKind::Json(JsonToken::Null) => (NodeKind::Null, token.span),
        TokenKind::Json(JsonToken::Minus) => {
            cx.bump();
            match cx.peek_token() {
                Some(number) if number.kind == json(JsonToken::Number) => {
                    (NodeKind::Number, token.span.merge(number.span))
                }
                _ => return Err(cx.fail("expected number after `-`")),
            }
        }
        _ => return Err(cx.fail("expected value")),
    };
    cx.bump();

    let text = match kind {
        NodeKind::String => unquote(span.slice(cx.source())),
        _ => span.slice(cx.source()),
    };
    cx.emit(
        FactDraft::new(span, Predicate::IsNode(kind))
            .with_text(text)
            .with_parent(Some(parent)),
    );
    Ok(span.end)
}
