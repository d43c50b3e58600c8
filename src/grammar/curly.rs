//! Curly-brace languages (C, Rust, Java, JavaScript, ...).
//!
//! Only the shape common to the family is understood: declarations
//! introduced by a keyword and a name, `;`-separated statements, bindings
//! and calls. Everything between is stepped over.

use crate::base::ArenaId;
use crate::fact::{BoundaryKind, FactDraft, NodeKind, Predicate};
use crate::lexer::{
    CurlyToken, DeclKind, Delimiter, Keyword, LexRules, RawKind, Side, Token, TokenFlags,
    TokenKind,
};

use super::{Grammar, Item, LanguageId, Opener, ParseCx, ParseFailure, own_tokens};

#[derive(Debug, Clone, Copy, Default)]
pub struct CurlyGrammar;

const fn curly(t: CurlyToken) -> TokenKind {
    TokenKind::Curly(t)
}

const OPEN_BRACE: TokenKind = curly(CurlyToken::Open(Delimiter::Brace));
const CLOSE_BRACE: TokenKind = curly(CurlyToken::Close(Delimiter::Brace));
const OPEN_PAREN: TokenKind = curly(CurlyToken::Open(Delimiter::Paren));

fn declares(token: &Token) -> Option<DeclKind> {
    token.kind.keyword().and_then(Keyword::decl)
}

impl Grammar for CurlyGrammar {
    fn language(&self) -> LanguageId {
        LanguageId::Curly
    }

    fn lex_rules(&self) -> LexRules {
        LexRules {
            slash_comments: true,
            line_comment: None,
            single_quote_strings: true,
            backtick_strings: true,
            dollar_idents: true,
        }
    }

    fn classify(&self, raw: RawKind, text: &str) -> TokenKind {
        curly(match raw {
            RawKind::Whitespace => CurlyToken::Whitespace,
            RawKind::LineComment | RawKind::BlockComment => CurlyToken::Comment,
            RawKind::String => CurlyToken::String,
            RawKind::Number => CurlyToken::Number,
            RawKind::Ident => match Keyword::lookup(text) {
                Some(keyword) => CurlyToken::Keyword(keyword),
                None => CurlyToken::Ident,
            },
            RawKind::Open(d) => CurlyToken::Open(d),
            RawKind::Close(d) => CurlyToken::Close(d),
            RawKind::Punct(';') => CurlyToken::Semi,
            RawKind::Punct(',') => CurlyToken::Comma,
            RawKind::Punct(c) => CurlyToken::Punct(c),
            RawKind::Error(fault) => CurlyToken::Error(fault),
            RawKind::Eof => CurlyToken::Eof,
        })
    }

    fn boundary_delimiters(&self) -> &'static [Delimiter] {
        &[Delimiter::Brace]
    }

    /// A brace preceded by a declaration header (`pub fn f(x: u32)`,
    /// `class A extends B`) opens a boundary starting at the header; any
    /// other brace opens a block starting at the brace.
    fn match_opener(&self, tokens: &[Token], open: usize, _source: &str) -> Option<Opener> {
        let depth = tokens.get(open)?.depth;
        let mut start = open;
        let mut decl = None;
        for i in (0..open).rev() {
            let token = &tokens[i];
            if token.depth < depth {
                break;
            }
            if token.depth == depth
                && (token.kind == curly(CurlyToken::Semi)
                    || token.kind == CLOSE_BRACE
                    || token.kind == OPEN_BRACE)
            {
                break;
            }
            if token.is_trivia() {
                continue;
            }
            start = i;
            match declares(token) {
                Some(DeclKind::Binding) | None => {}
                Some(kind) => decl = Some(kind),
            }
        }

        let kind = match decl {
            Some(DeclKind::Function) => BoundaryKind::Function,
            Some(DeclKind::Class) => BoundaryKind::Class,
            Some(DeclKind::Module) => BoundaryKind::Module,
            Some(DeclKind::Binding) | None => {
                return Some(Opener {
                    kind: BoundaryKind::Block,
                    start: open,
                });
            }
        };
        Some(Opener { kind, start })
    }

    fn parse_boundary(&self, cx: &mut ParseCx<'_>) -> Result<(), ParseFailure> {
        let b = cx.boundary();
        let kind = match b.kind {
            BoundaryKind::Function => NodeKind::Function,
            BoundaryKind::Class => NodeKind::Class,
            BoundaryKind::Module => NodeKind::Module,
            BoundaryKind::Block | BoundaryKind::ErrorRegion => NodeKind::Block,
        };
        let node = cx.node(kind, b.span, None);

        // The implicit root and stray-closer regions own no brace.
        let braced = own_tokens(cx.tokens(), cx.holes()).any(|t| t.kind == OPEN_BRACE);
        if braced {
            header(cx, node)?;
            if cx.eat(OPEN_BRACE).is_none() {
                return Err(cx.fail("expected `{`"));
            }
            statements(cx, node)?;
            if cx.eat(CLOSE_BRACE).is_none() {
                return Err(cx.fail("expected `}`"));
            }
        } else {
            statements(cx, node)?;
        }
        if !cx.at_end() {
            return Err(cx.fail("unexpected `}`"));
        }
        Ok(())
    }
}

/// Tokens before the body brace: modifiers, the declaring keyword and its
/// name, parameter lists.
fn header(cx: &mut ParseCx<'_>, node: ArenaId) -> Result<(), ParseFailure> {
    let mut named = false;
    loop {
        let Some(token) = cx.peek_token() else {
            return Ok(());
        };
        if token.kind == OPEN_BRACE {
            return Ok(());
        }
        match token.delimiter() {
            Some((_, Side::Open)) => {
                cx.bump();
                group(cx, token, node)?;
                continue;
            }
            Some((_, Side::Close)) => return Err(cx.fail("unbalanced delimiter")),
            None => {}
        }
        cx.bump();
        let decl = declares(token).filter(|d| *d != DeclKind::Binding);
        if decl.is_some() && !named {
            named = true;
            if let Some(name) = cx.eat(curly(CurlyToken::Ident)) {
                let text = cx.text(name);
                cx.emit(
                    FactDraft::new(name.span, Predicate::IsNode(NodeKind::Name))
                        .with_text(text)
                        .with_parent(Some(node)),
                );
                cx.emit(
                    FactDraft::new(name.span, Predicate::Defines)
                        .with_text(text)
                        .with_parent(Some(node)),
                );
            }
        }
    }
}

fn statements(cx: &mut ParseCx<'_>, scope: ArenaId) -> Result<(), ParseFailure> {
    loop {
        match cx.peek() {
            None => return Ok(()),
            Some(Item::Hole(_)) => {
                cx.bump();
            }
            Some(Item::Token(t)) if t.kind == CLOSE_BRACE => return Ok(()),
            Some(Item::Token(t)) if t.kind == curly(CurlyToken::Semi) => {
                cx.bump();
            }
            Some(Item::Token(_)) => statement(cx, scope)?,
        }
    }
}

fn statement(cx: &mut ParseCx<'_>, scope: ArenaId) -> Result<(), ParseFailure> {
    let start = match cx.peek() {
        Some(item) => item.span(),
        None => return Ok(()),
    };
    let stmt = cx.node(NodeKind::Statement, start, Some(scope));
    loop {
        let token = match cx.peek() {
            None => break,
            Some(Item::Hole(_)) => {
                cx.bump();
                cx.extend(stmt, cx.last().end);
                if cx.peek_kind() == Some(curly(CurlyToken::Semi)) {
                    continue;
                }
                break;
            }
            Some(Item::Token(token)) => token,
        };

        match token.kind {
            TokenKind::Curly(CurlyToken::Semi) => {
                cx.bump();
                cx.extend(stmt, token.span.end);
                break;
            }
            k if k == CLOSE_BRACE => break,
            TokenKind::Curly(CurlyToken::Close(_)) => {
                return Err(cx.fail("unbalanced delimiter"));
            }
            TokenKind::Curly(CurlyToken::Open(_)) => {
                cx.bump();
                group(cx, token, stmt)?;
            }
            TokenKind::Curly(CurlyToken::Error(_)) => {
                return Err(cx.fail("unexpected input"));
            }
            TokenKind::Curly(CurlyToken::Keyword(k)) if k.decl() == Some(DeclKind::Binding) => {
                cx.bump();
                if let Some(name) = cx.eat(curly(CurlyToken::Ident)) {
                    binding(cx, name, stmt, scope);
                }
            }
            TokenKind::Curly(CurlyToken::Ident) => {
                cx.bump();
                call(cx, token, stmt)?;
            }
            _ => {
                cx.bump();
            }
        }
        cx.extend(stmt, cx.last().end);
    }
    Ok(())
}

fn binding(cx: &mut ParseCx<'_>, name: &Token, stmt: ArenaId, scope: ArenaId) {
    let text = cx.text(name);
    cx.emit(
        FactDraft::new(name.span, Predicate::IsNode(NodeKind::Name))
            .with_text(text)
            .with_parent(Some(stmt)),
    );
    cx.emit(
        FactDraft::new(name.span, Predicate::Defines)
            .with_text(text)
            .with_parent(Some(stmt)),
    );
    cx.emit(
        FactDraft::new(name.span, Predicate::DefinedIn)
            .with_local(scope)
            .with_parent(Some(stmt)),
    );
}

/// An identifier directly followed by `(` is a call.
fn call(cx: &mut ParseCx<'_>, callee: &Token, parent: ArenaId) -> Result<(), ParseFailure> {
    let Some(open) = cx.eat(OPEN_PAREN) else {
        return Ok(());
    };
    let text = cx.text(callee);
    let call = cx.node(NodeKind::Call, callee.span, Some(parent));
    cx.emit(
        FactDraft::new(callee.span, Predicate::References)
            .with_text(text)
            .with_parent(Some(call)),
    );
    group(cx, open, call)?;
    cx.extend(call, cx.last().end);
    Ok(())
}

/// The rest of a bracketed group whose opener has been consumed.
fn group(cx: &mut ParseCx<'_>, open: &Token, parent: ArenaId) -> Result<(), ParseFailure> {
    let Some((expected, _)) = open.delimiter() else {
        return Ok(());
    };
    cx.enter()?;
    loop {
        let token = match cx.peek() {
            None => return Err(cx.fail("unclosed delimiter")),
            Some(Item::Hole(_)) => {
                cx.bump();
                continue;
            }
            Some(Item::Token(token)) => token,
        };
        match token.delimiter() {
            Some((delim, Side::Close)) if delim == expected => {
                cx.bump();
                cx.leave();
                return Ok(());
            }
            Some((_, Side::Close)) => return Err(cx.fail("mismatched delimiter")),
            Some((_, Side::Open)) => {
                cx.bump();
                group(cx, token, parent)?;
            }
            None if token.flags.contains(TokenFlags::ERROR) => {
                return Err(cx.fail("unexpected input"));
            }
            None if token.kind == curly(CurlyToken::Ident) => {
                cx.bump();
                call(cx, token, parent)?;
            }
            None => {
                cx.bump();
            }
        }
    }
}
