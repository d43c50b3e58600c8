//! The predicate taxonomy.
//!
//! Every predicate belongs to exactly one [`Category`]; the category is the
//! sharding key of the fact index.

use std::fmt;

/// Index shard a predicate belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Lexical,
    Structural,
    Syntactic,
    Semantic,
    Relational,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Lexical,
        Category::Structural,
        Category::Syntactic,
        Category::Semantic,
        Category::Relational,
    ];

    pub const COUNT: usize = Self::ALL.len();

    /// Dense index used for per-category storage.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Category::Lexical => 0,
            Category::Structural => 1,
            Category::Syntactic => 2,
            Category::Semantic => 3,
            Category::Relational => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Lexical => "lexical",
            Category::Structural => "structural",
            Category::Syntactic => "syntactic",
            Category::Semantic => "semantic",
            Category::Relational => "relational",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse lexical class shared by every language's tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenClass {
    Whitespace,
    Comment,
    Ident,
    Keyword,
    String,
    Number,
    Punct,
    Open,
    Close,
    Error,
    Eof,
}

impl TokenClass {
    #[inline]
    pub fn is_trivia(self) -> bool {
        matches!(self, TokenClass::Whitespace | TokenClass::Comment)
    }
}

/// Kind of a Layer-1 boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoundaryKind {
    Function,
    Class,
    Block,
    Module,
    ErrorRegion,
}

impl BoundaryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BoundaryKind::Function => "function",
            BoundaryKind::Class => "class",
            BoundaryKind::Block => "block",
            BoundaryKind::Module => "module",
            BoundaryKind::ErrorRegion => "error-recovery-region",
        }
    }

    #[inline]
    pub fn is_error(self) -> bool {
        matches!(self, BoundaryKind::ErrorRegion)
    }
}

/// Kind of a syntax node asserted by `IsNode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    // Structured data
    Object,
    Array,
    Member,
    Key,
    String,
    Number,
    Bool,
    Null,
    // Code
    Function,
    Class,
    Module,
    Block,
    Statement,
    Call,
    Name,
    /// A boundary whose interior could not be parsed unambiguously.
    Unknown,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Object => "object",
            NodeKind::Array => "array",
            NodeKind::Member => "member",
            NodeKind::Key => "key",
            NodeKind::String => "string",
            NodeKind::Number => "number",
            NodeKind::Bool => "bool",
            NodeKind::Null => "null",
            NodeKind::Function => "function",
            NodeKind::Class => "class",
            NodeKind::Module => "module",
            NodeKind::Block => "block",
            NodeKind::Statement => "statement",
            NodeKind::Call => "call",
            NodeKind::Name => "name",
            NodeKind::Unknown => "unknown",
        }
    }
}

/// What a fact asserts about its subject span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Predicate {
    // Lexical
    /// The span is a token of this class.
    Token(TokenClass),
    /// The span contains bytes no token rule accepts.
    LexError,

    // Structural
    /// The span is a Layer-1 boundary.
    Boundary(BoundaryKind),

    // Syntactic
    /// The span is a syntax node.
    IsNode(NodeKind),
    /// The span contains a syntax error.
    HasError,

    // Semantic
    /// The span declares the name in the fact's object.
    Defines,
    /// The span refers to the name in the fact's object.
    References,

    // Relational
    /// The declaration at the span belongs to the node named in the object.
    DefinedIn,
}

impl Predicate {
    #[inline]
    pub const fn category(self) -> Category {
        match self {
            Predicate::Token(_) | Predicate::LexError => Category::Lexical,
            Predicate::Boundary(_) => Category::Structural,
            Predicate::IsNode(_) | Predicate::HasError => Category::Syntactic,
            Predicate::Defines | Predicate::References => Category::Semantic,
            Predicate::DefinedIn => Category::Relational,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Predicate::Token(_) => "is_token",
            Predicate::LexError => "lex_error",
            Predicate::Boundary(_) => "is_boundary",
            Predicate::IsNode(_) => "is_node",
            Predicate::HasError => "has_error",
            Predicate::Defines => "defines",
            Predicate::References => "references",
            Predicate::DefinedIn => "defined_in",
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Token(class) => write!(f, "is_token({:?})", class),
            Predicate::Boundary(kind) => write!(f, "is_boundary({})", kind.as_str()),
            Predicate::IsNode(kind) => write!(f, "is_node({})", kind.as_str()),
            other => f.write_str(other.name()),
        }
    }
}
