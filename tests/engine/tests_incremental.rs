//! Incremental edits must leave the engine where a fresh parse of the new
//! text would, while touching as little as possible.

use rstest::rstest;
use strata::fact::{NodeKind, TokenClass};
use strata::{Edit, EngineError, Generation, LanguageId, Predicate, Span};

use crate::helpers::engine_helpers::*;
use crate::helpers::fact_assertions::*;

// =============================================================================
// EDIT EQUIVALENCE
// =============================================================================

#[rstest]
#[case::json_value(LanguageId::Json, r#"{"a": 1, "b": [true, null]}"#, 6, 7, "\"x\"")]
#[case::json_new_member(LanguageId::Json, r#"{"a": 1}"#, 7, 7, r#", "b": {"c": 2}"#)]
#[case::json_delete_member(LanguageId::Json, r#"{"a": 1, "b": 2}"#, 7, 15, "")]
#[case::json_inner_array(LanguageId::Json, r#"[[1, 2], [3], {"k": [4]}]"#, 10, 11, "5, 6")]
#[case::json_open_brace(LanguageId::Json, r#"[{"a": 1}, 2]"#, 10, 10, "{")]
#[case::json_remove_closer(LanguageId::Json, r#"{"a": [1, 2]}"#, 11, 12, "")]
#[case::json_whole_buffer(LanguageId::Json, "[1]", 0, 3, r#"{"z": false}"#)]
#[case::curly_body(
    LanguageId::Curly,
    "fn main() {\n    let x = 1;\n}\n",
    24,
    25,
    "add(2, 3)"
)]
#[case::curly_new_function(
    LanguageId::Curly,
    "fn a() {\n}\n",
    11,
    11,
    "fn b() {\n    a();\n}\n"
)]
#[case::curly_header_kind(LanguageId::Curly, "let f = x {\n    y();\n}\n", 0, 3, "fn")]
#[case::curly_comment(LanguageId::Curly, "fn f() {\n    g();\n}\n", 9, 9, "    /* note */\n")]
#[case::curly_unclosed(LanguageId::Curly, "class A {\n    fn m() {\n    }\n}\n", 27, 28, "")]
#[case::plain_braces(LanguageId::Plain, "a { b { c } }\n# done\n", 6, 7, "")]
#[case::json_heal_trailing_opener(LanguageId::Json, "{}{", 2, 3, "")]
#[case::curly_heal_outer_opener(LanguageId::Curly, "{{}", 0, 1, "")]
#[case::json_delete_child_boundary(LanguageId::Json, "[1, {}, 2]", 4, 6, "")]
#[case::json_stray_closer_inside(LanguageId::Json, "[{1}]", 2, 3, "]")]
#[case::json_close_then_reopen(LanguageId::Json, "[[1], [2]]", 4, 5, "")]
#[case::curly_nested_block(LanguageId::Curly, "x;\n{ { } }\n", 7, 8, "{ } }")]
#[case::json_scalar_root(LanguageId::Json, "42", 0, 2, "true")]
#[case::json_array_to_scalar(LanguageId::Json, "[1]", 0, 3, "\"s\"")]
#[case::json_scalar_to_array(LanguageId::Json, "1", 0, 1, "[1]")]
fn test_edit_matches_fresh_parse(
    #[case] language: LanguageId,
    #[case] text: &str,
    #[case] start: u32,
    #[case] end: u32,
    #[case] insert: &str,
) {
    let mut engine = engine_from(language, text);
    edit(&mut engine, start, end, insert);

    let mut expected_text = text.to_string();
    expected_text.replace_range(start as usize..end as usize, insert);
    assert_eq!(engine.text(), expected_text);

    let fresh = engine_from(language, &expected_text);
    assert_eq!(shape(&engine), shape(&fresh));
    let kinds = |e: &strata::Engine| {
        e.boundaries()
            .iter()
            .map(|b| (b.span, b.kind, b.depth))
            .collect::<Vec<_>>()
    };
    assert_eq!(kinds(&engine), kinds(&fresh));
    assert_consistent(&engine);
}

#[test]
fn test_edit_sequence_keeps_invariants() {
    let mut engine = json("");
    let steps: [(u32, u32, &str); 6] = [
        (0, 0, "{}"),
        (1, 1, r#""a": [1, 2, 3]"#),
        (8, 9, "[{}]"),
        (0, 1, ""),
        (0, 0, "{"),
        (3, 5, "bb"),
    ];
    let mut generation = engine.generation();
    for (start, end, insert) in steps {
        let outcome = edit(&mut engine, start, end, insert);
        assert!(outcome.generation > generation);
        generation = outcome.generation;
        assert_eq!(token_text(&engine), engine.text());
        assert_consistent(&engine);
    }
    let fresh = json(engine.text());
    assert_eq!(shape(&engine), shape(&fresh));
}

#[test]
fn test_healed_region_leaves_no_diagnostics() {
    let mut engine = json("{}{");
    assert!(!strata::ide::diagnostics(&engine).is_empty());
    edit(&mut engine, 2, 3, "");
    assert_eq!(engine.boundaries().len(), 1);
    assert_eq!(strata::ide::diagnostics(&engine), vec![]);
    assert_consistent(&engine);
}

#[rstest]
#[case::number("42", NodeKind::Number)]
#[case::negative("-7", NodeKind::Number)]
#[case::string(r#""text""#, NodeKind::String)]
#[case::boolean("true", NodeKind::Bool)]
#[case::null(" null\n", NodeKind::Null)]
fn test_scalar_document(#[case] text: &str, #[case] kind: NodeKind) {
    let engine = json(text);
    assert!(facts_with(&engine, Predicate::HasError).is_empty());
    assert_eq!(facts_with(&engine, Predicate::IsNode(kind)).len(), 1);
    assert_eq!(strata::ide::diagnostics(&engine), vec![]);
}

// =============================================================================
// ROUND TRIP
// =============================================================================

#[rstest]
#[case::empty(LanguageId::Json, "")]
#[case::object(LanguageId::Json, "{ \"a\" : [ 1 , 2 ] }\n")]
#[case::lex_error(LanguageId::Json, "[1, \u{a7}, \"open")]
#[case::curly(LanguageId::Curly, "// c\nfn f(a) {\n  /* b */ return a;\n}\r\n")]
#[case::unterminated_comment(LanguageId::Curly, "x = 1; /* never closed")]
#[case::plain(LanguageId::Plain, "# title\nsome { words }\n")]
fn test_tokens_reproduce_input(#[case] language: LanguageId, #[case] text: &str) {
    let engine = engine_from(language, text);
    assert_eq!(token_text(&engine), text);
    let eofs = engine.tokens().iter().filter(|t| t.is_eof()).count();
    assert_eq!(eofs, 1);
}

#[test]
fn test_empty_input_is_one_eof_token() {
    let engine = json("");
    assert_eq!(engine.tokens().len(), 1);
    assert_eq!(engine.tokens()[0].class(), TokenClass::Eof);
    assert!(engine.boundaries().is_empty());
}

// =============================================================================
// IDEMPOTENCE AND STALENESS
// =============================================================================

#[test]
fn test_noop_edit_yields_empty_delta() {
    let mut engine = json(r#"{"a": [1, {"b": 2}]}"#);
    let generation = engine.generation();
    let ids = engine.snapshot().all_ids();

    let outcome = edit(&mut engine, 5, 5, "");
    assert!(outcome.facts.is_empty());
    assert!(outcome.structure.is_empty());
    assert_eq!(engine.generation(), generation);
    assert_eq!(engine.snapshot().all_ids(), ids);
}

#[test]
fn test_stale_edit_changes_nothing() {
    let mut engine = json("[1]");
    edit(&mut engine, 1, 2, "2");
    let err = engine
        .apply_edit(Edit::insert(0, " ", Generation(1)))
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::StaleEdit {
            edit: Generation(1),
            current: Generation(2)
        }
    ));
    assert_eq!(engine.text(), "[2]");
}

#[test]
fn test_sibling_facts_keep_ids() {
    let mut engine = json(r#"[{"a": 1}, {"b": 2}]"#);
    let keys = facts_with(&engine, Predicate::IsNode(NodeKind::Key));
    let second = keys.iter().find(|k| k.has_text("b")).unwrap().id();

    let outcome = edit(&mut engine, 7, 8, "100");
    assert!(engine.snapshot().contains(second));
    assert!(!outcome.facts.removed.contains(&second));
    let moved = engine.get_fact(second).unwrap();
    assert_eq!(moved.subject(), Span::new(14, 17));
}
