//! Fallback for text in no known language.
//!
//! Braces still delimit blocks so folding and incremental reparse work; the
//! interior of a block is not interpreted.

use crate::fact::{BoundaryKind, NodeKind};
use crate::lexer::{Delimiter, LexRules, PlainToken, RawKind, Token, TokenKind};

use super::{Grammar, LanguageId, Opener, ParseCx, ParseFailure};

#[derive(Debug, Clone, Copy, Default)]
pub struct PlainGrammar;

impl Grammar for PlainGrammar {
    fn language(&self) -> LanguageId {
        LanguageId::Plain
    }

    fn lex_rules(&self) -> LexRules {
        LexRules {
            slash_comments: false,
            line_comment: Some('#'),
            single_quote_strings: false,
            backtick_strings: false,
            dollar_idents: false,
        }
    }

    fn classify(&self, raw: RawKind, _text: &str) -> TokenKind {
        TokenKind::Plain(match raw {
            RawKind::Whitespace => PlainToken::Whitespace,
            RawKind::LineComment | RawKind::BlockComment => PlainToken::Comment,
            RawKind::String => PlainToken::String,
            RawKind::Number => PlainToken::Number,
            RawKind::Ident => PlainToken::Word,
            RawKind::Open(d) => PlainToken::Open(d),
            RawKind::Close(d) => PlainToken::Close(d),
            RawKind::Punct(c) => PlainToken::Punct(c),
            RawKind::Error(fault) => PlainToken::Error(fault),
            RawKind::Eof => PlainToken::Eof,
        })
    }

    fn boundary_delimiters(&self) -> &'static [Delimiter] {
        &[Delimiter::Brace]
    }

    fn match_opener(&self, _tokens: &[Token], open: usize, _source: &str) -> Option<Opener> {
        Some(Opener {
            kind: BoundaryKind::Block,
            start: open,
        })
    }

    fn parse_boundary(&self, cx: &mut ParseCx<'_>) -> Result<(), ParseFailure> {
        let b = cx.boundary();
        let kind = match b.kind {
            BoundaryKind::Module => NodeKind::Module,
            _ => NodeKind::Block,
        };
        cx.node(kind, b.span, None);
        while cx.bump().is_some() {}
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_words() {
        let g = PlainGrammar;
        assert_eq!(
            g.classify(RawKind::Ident, "hello"),
            TokenKind::Plain(PlainToken::Word)
        );
        assert_eq!(
            g.classify(RawKind::LineComment, "# note"),
            TokenKind::Plain(PlainToken::Comment)
        );
        assert_eq!(g.lex_rules().line_comment, Some('#'));
    }
}
