//! Semantic tokens tests for the IDE layer.

use strata::ide::{TokenType, semantic_tokens};

use crate::helpers::engine_helpers::*;

#[test]
fn test_semantic_tokens_sorted_and_in_bounds() {
    let source = "// entry\nclass Shape {\n    fn area() {\n        let r = radius();\n    }\n}\n";
    let engine = curly(source);
    let tokens = semantic_tokens(&engine);
    assert!(!tokens.is_empty());
    assert!(
        tokens
            .windows(2)
            .all(|w| (w[0].line, w[0].col) < (w[1].line, w[1].col))
    );
    let lines = source.lines().collect::<Vec<_>>();
    for token in &tokens {
        let line = lines[token.line as usize];
        assert!((token.col + token.length) as usize <= line.len());
    }
}

#[test]
fn test_declaration_kinds() {
    let source = "class Shape {\n    fn area() {\n        let r = radius();\n    }\n}\n";
    let engine = curly(source);
    let tokens = semantic_tokens(&engine);
    let at = |line: u32, col: u32| {
        tokens
            .iter()
            .find(|t| t.line == line && t.col == col)
            .map(|t| t.token_type)
    };
    assert_eq!(at(0, 6), Some(TokenType::Type));
    assert_eq!(at(1, 7), Some(TokenType::Function));
    assert_eq!(at(2, 12), Some(TokenType::Variable));
    assert_eq!(at(2, 16), Some(TokenType::Function));
}

#[test]
fn test_lsp_indices_are_distinct() {
    let all = [
        TokenType::Namespace,
        TokenType::Type,
        TokenType::Function,
        TokenType::Variable,
        TokenType::Property,
        TokenType::Keyword,
        TokenType::Comment,
        TokenType::String,
        TokenType::Number,
    ];
    let mut indices: Vec<u32> = all.iter().map(|t| t.to_lsp_index()).collect();
    indices.dedup();
    assert_eq!(indices.len(), all.len());
}
