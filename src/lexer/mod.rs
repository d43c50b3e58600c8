//! Layer 0: streaming lexer.
//!
//! Raw text becomes a sequence of [`Token`]s with a running bracket depth,
//! the one piece of lexical state Layer 1 depends on. The machine can be fed
//! arbitrary chunks and resumed from any token boundary, which is what makes
//! [`TokenStore::apply_edit`] cheap: only the run of tokens around an edit is
//! lexed again.
//!
//! Illegal input never stops the lexer. The offending bytes become an error
//! token and lexing picks up at the next byte that can start a token.

mod keywords;
mod machine;
mod store;
mod token;

pub use keywords::{DeclKind, Keyword};
pub use machine::{
    Delimiter, LexCheckpoint, LexFault, LexRules, Lexer, RawKind, RawToken, TokenStream, lex,
};
pub use store::{TokenDelta, TokenStore};
pub use token::{CurlyToken, JsonToken, PlainToken, Side, Token, TokenFlags, TokenKind};
