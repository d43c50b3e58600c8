//! Logos-based keyword recognition.
//!
//! The state machine hands identifier text here; a keyword is an
//! identifier the DFA matches in full.

use logos::Logos;

/// Reserved words of the curly-brace family, plus the JSON literals.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    // =========================================================================
    // DECLARATIONS
    // =========================================================================
    #[token("fn")]
    Fn,
    #[token("function")]
    Function,
    #[token("def")]
    Def,
    #[token("class")]
    Class,
    #[token("struct")]
    Struct,
    #[token("enum")]
    Enum,
    #[token("trait")]
    Trait,
    #[token("interface")]
    Interface,
    #[token("impl")]
    Impl,
    #[token("mod")]
    Mod,
    #[token("module")]
    Module,
    #[token("namespace")]
    Namespace,
    #[token("package")]
    Package,

    // =========================================================================
    // BINDINGS
    // =========================================================================
    #[token("let")]
    Let,
    #[token("const")]
    Const,
    #[token("var")]
    Var,
    #[token("val")]
    Val,
    #[token("static")]
    Static,

    // =========================================================================
    // CONTROL FLOW
    // =========================================================================
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("for")]
    For,
    #[token("loop")]
    Loop,
    #[token("match")]
    Match,
    #[token("switch")]
    Switch,
    #[token("return")]
    Return,
    #[token("break")]
    Break,
    #[token("continue")]
    Continue,

    // =========================================================================
    // OTHER
    // =========================================================================
    #[token("pub")]
    Pub,
    #[token("use")]
    Use,
    #[token("import")]
    Import,
    #[token("new")]
    New,
    #[token("self")]
    SelfKw,
    #[token("this")]
    This,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,
    #[token("nil")]
    Nil,
}

/// What a declaration keyword introduces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclKind {
    Function,
    Class,
    Module,
    Binding,
}

impl Keyword {
    /// Match an entire identifier against the keyword table.
    pub fn lookup(text: &str) -> Option<Keyword> {
        let mut lexer = Keyword::lexer(text);
        match lexer.next() {
            Some(Ok(keyword)) if lexer.span().end == text.len() => Some(keyword),
            _ => None,
        }
    }

    pub fn decl(self) -> Option<DeclKind> {
        use Keyword::*;
        match self {
            Fn | Function | Def => Some(DeclKind::Function),
            Class | Struct | Enum | Trait | Interface | Impl => Some(DeclKind::Class),
            Mod | Module | Namespace | Package => Some(DeclKind::Module),
            Let | Const | Var | Val | Static => Some(DeclKind::Binding),
            _ => None,
        }
    }

    /// `true`, `false`, `null` and `nil`.
    pub fn is_literal(self) -> bool {
        matches!(
            self,
            Keyword::True | Keyword::False | Keyword::Null | Keyword::Nil
        )
    }
}
