//! Classified tokens.

use crate::base::{Span, TokenId};
use crate::fact::{FactDraft, Predicate, SPECULATIVE_CONFIDENCE, TokenClass};

use super::keywords::Keyword;
use super::machine::{Delimiter, LexFault};

/// JSON token kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JsonToken {
    Whitespace,
    Open(Delimiter),
    Close(Delimiter),
    Colon,
    Comma,
    Minus,
    String,
    Number,
    True,
    False,
    Null,
    Error(LexFault),
    Eof,
}

/// Curly-brace family token kinds (C, Rust, JavaScript, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CurlyToken {
    Whitespace,
    Comment,
    Ident,
    Keyword(Keyword),
    String,
    Number,
    Open(Delimiter),
    Close(Delimiter),
    Semi,
    Comma,
    Punct(char),
    Error(LexFault),
    Eof,
}

/// Fallback token kinds for unstructured text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlainToken {
    Whitespace,
    Comment,
    Word,
    Number,
    String,
    Open(Delimiter),
    Close(Delimiter),
    Punct(char),
    Error(LexFault),
    Eof,
}

/// A token kind, one variant per language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Json(JsonToken),
    Curly(CurlyToken),
    Plain(PlainToken),
}

/// Opening or closing side of a bracket pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Open,
    Close,
}

impl TokenKind {
    pub fn class(self) -> TokenClass {
        use TokenClass as C;
        match self {
            TokenKind::Json(t) => match t {
                JsonToken::Whitespace => C::Whitespace,
                JsonToken::Open(_) => C::Open,
                JsonToken::Close(_) => C::Close,
                JsonToken::Colon | JsonToken::Comma | JsonToken::Minus => C::Punct,
                JsonToken::String => C::String,
                JsonToken::Number => C::Number,
                JsonToken::True | JsonToken::False | JsonToken::Null => C::Keyword,
                JsonToken::Error(_) => C::Error,
                JsonToken::Eof => C::Eof,
            },
            TokenKind::Curly(t) => match t {
                CurlyToken::Whitespace => C::Whitespace,
                CurlyToken::Comment => C::Comment,
                CurlyToken::Ident => C::Ident,
                CurlyToken::Keyword(_) => C::Keyword,
                CurlyToken::String => C::String,
                CurlyToken::Number => C::Number,
                CurlyToken::Open(_) => C::Open,
                CurlyToken::Close(_) => C::Close,
                CurlyToken::Semi | CurlyToken::Comma | CurlyToken::Punct(_) => C::Punct,
                CurlyToken::Error(_) => C::Error,
                CurlyToken::Eof => C::Eof,
            },
            TokenKind::Plain(t) => match t {
                PlainToken::Whitespace => C::Whitespace,
                PlainToken::Comment => C::Comment,
                PlainToken::Word => C::Ident,
                PlainToken::Number => C::Number,
                PlainToken::String => C::String,
                PlainToken::Open(_) => C::Open,
                PlainToken::Close(_) => C::Close,
                PlainToken::Punct(_) => C::Punct,
                PlainToken::Error(_) => C::Error,
                PlainToken::Eof => C::Eof,
            },
        }
    }

    pub fn delimiter(self) -> Option<(Delimiter, Side)> {
        match self {
            TokenKind::Json(JsonToken::Open(d))
            | TokenKind::Curly(CurlyToken::Open(d))
            | TokenKind::Plain(PlainToken::Open(d)) => Some((d, Side::Open)),
            TokenKind::Json(JsonToken::Close(d))
            | TokenKind::Curly(CurlyToken::Close(d))
            | TokenKind::Plain(PlainToken::Close(d)) => Some((d, Side::Close)),
            _ => None,
        }
    }

    pub fn fault(self) -> Option<LexFault> {
        match self {
            TokenKind::Json(JsonToken::Error(f))
            | TokenKind::Curly(CurlyToken::Error(f))
            | TokenKind::Plain(PlainToken::Error(f)) => Some(f),
            _ => None,
        }
    }

    pub fn is_trivia(self) -> bool {
        self.class().is_trivia()
    }

    pub fn is_error(self) -> bool {
        self.fault().is_some()
    }

    pub fn is_eof(self) -> bool {
        matches!(
            self,
            TokenKind::Json(JsonToken::Eof)
                | TokenKind::Curly(CurlyToken::Eof)
                | TokenKind::Plain(PlainToken::Eof)
        )
    }

    pub fn keyword(self) -> Option<Keyword> {
        match self {
            TokenKind::Curly(CurlyToken::Keyword(k)) => Some(k),
            _ => None,
        }
    }
}

/// Cached per-token flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TokenFlags(u8);

impl TokenFlags {
    pub const TRIVIA: TokenFlags = TokenFlags(1);
    pub const OPEN: TokenFlags = TokenFlags(1 << 1);
    pub const CLOSE: TokenFlags = TokenFlags(1 << 2);
    pub const ERROR: TokenFlags = TokenFlags(1 << 3);
    pub const EOF: TokenFlags = TokenFlags(1 << 4);

    pub fn of(kind: TokenKind) -> TokenFlags {
        let mut flags = TokenFlags::default();
        if kind.is_trivia() {
            flags.0 |= Self::TRIVIA.0;
        }
        match kind.delimiter() {
            Some((_, Side::Open)) => flags.0 |= Self::OPEN.0,
            Some((_, Side::Close)) => flags.0 |= Self::CLOSE.0,
            None => {}
        }
        if kind.is_error() {
            flags.0 |= Self::ERROR.0;
        }
        if kind.is_eof() {
            flags.0 |= Self::EOF.0;
        }
        flags
    }

    #[inline]
    pub fn contains(self, other: TokenFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Opener or closer.
    #[inline]
    pub fn is_delimiter(self) -> bool {
        self.0 & (Self::OPEN.0 | Self::CLOSE.0) != 0
    }
}

/// A lexical unit of the current text.
///
/// Tokens are values, not facts; [`Token::to_draft`] turns one into a
/// lexical fact when a consumer wants it in the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub id: TokenId,
    pub span: Span,
    pub kind: TokenKind,
    pub flags: TokenFlags,
    /// Bracket depth, see [`RawToken::depth`](super::RawToken::depth).
    pub depth: u32,
}

impl Token {
    pub fn new(id: TokenId, span: Span, kind: TokenKind, depth: u32) -> Self {
        Self {
            id,
            span,
            kind,
            flags: TokenFlags::of(kind),
            depth,
        }
    }

    #[inline]
    pub fn class(&self) -> TokenClass {
        self.kind.class()
    }

    #[inline]
    pub fn is_trivia(&self) -> bool {
        self.flags.contains(TokenFlags::TRIVIA)
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        self.flags.contains(TokenFlags::ERROR)
    }

    #[inline]
    pub fn is_eof(&self) -> bool {
        self.flags.contains(TokenFlags::EOF)
    }

    pub fn delimiter(&self) -> Option<(Delimiter, Side)> {
        self.kind.delimiter()
    }

    /// Bracket depth right after this token.
    pub fn depth_after(&self) -> u32 {
        if self.flags.contains(TokenFlags::OPEN) {
            self.depth + 1
        } else {
            self.depth
        }
    }

    pub fn text<'s>(&self, source: &'s str) -> &'s str {
        self.span.slice(source)
    }

    /// Same span, kind and depth.
    pub fn same_shape(&self, other: &Token) -> bool {
        self.span == other.span && self.kind == other.kind && self.depth == other.depth
    }

    /// The lexical fact describing this token. Error tokens become
    /// low-confidence `LexError` facts carrying the fault message.
    pub fn to_draft(&self, source: &str) -> FactDraft {
        match self.kind.fault() {
            Some(fault) => FactDraft::new(self.span, Predicate::LexError)
                .with_text(fault.message())
                .with_confidence(SPECULATIVE_CONFIDENCE),
            None => FactDraft::new(self.span, Predicate::Token(self.class()))
                .with_text(self.text(source)),
        }
    }
}
