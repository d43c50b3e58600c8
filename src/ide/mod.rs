//! IDE features: high-level APIs for editor requests.
//!
//! Each function reads one [`Engine`](crate::engine::Engine) at its current
//! generation and corresponds to an LSP request.
//!
//! ## Design Principles
//!
//! 1. **Pure functions**: Take the engine in, return data out
//! 2. **No LSP types**: Uses our own types, converted at the LSP boundary
//! 3. **Fact driven**: Built on the fact index, not on parser internals
//!
//! ## Usage
//!
//! ```ignore
//! use strata::engine::{Engine, EngineConfig};
//! use strata::grammar::LanguageId;
//! use strata::ide;
//!
//! let mut engine = Engine::new(LanguageId::Curly, EngineConfig::default());
//! engine.open("fn main() {\n}\n")?;
//!
//! let folds = ide::folding_ranges(&engine);
//! let problems = ide::diagnostics(&engine);
//! ```

mod diagnostics;
mod folding;
mod semantic_tokens;

pub use diagnostics::{Diagnostic, ErrorCode, RelatedInfo, Severity, diagnostics};
pub use folding::{FoldingKind, FoldingRange, folding_ranges};
pub use semantic_tokens::{SemanticToken, TokenType, semantic_tokens};
