//! Diagnostics tests for the IDE layer.

use rstest::rstest;
use strata::LanguageId;
use strata::ide::{ErrorCode, Severity, diagnostics};

use crate::helpers::engine_helpers::*;

// =============================================================================
// DIAGNOSTICS - CODES
// =============================================================================

#[rstest]
#[case::unclosed_brace(LanguageId::Json, r#"{"a": 1"#, ErrorCode::E0202)]
#[case::unclosed_bracket(LanguageId::Json, "[1, 2", ErrorCode::E0204)]
#[case::stray_closer(LanguageId::Json, "[1]]", ErrorCode::E0205)]
#[case::missing_colon(LanguageId::Json, r#"{"a" 1}"#, ErrorCode::E0301)]
#[case::bad_character(LanguageId::Json, "[1, \u{a7}]", ErrorCode::E0101)]
#[case::unterminated_string(LanguageId::Json, "[\"abc", ErrorCode::E0102)]
#[case::unterminated_comment(LanguageId::Curly, "fn f() {}\n/* open", ErrorCode::E0103)]
#[case::curly_unclosed(LanguageId::Curly, "fn f() {\n    g();\n", ErrorCode::E0202)]
fn test_diagnostic_code(#[case] language: LanguageId, #[case] text: &str, #[case] code: ErrorCode) {
    let engine = engine_from(language, text);
    let diagnostics = diagnostics(&engine);
    assert!(
        diagnostics.iter().any(|d| d.code == code),
        "expected {code} in {diagnostics:#?}"
    );
}

#[rstest]
#[case(LanguageId::Json, r#"{"a": [1, 2.5, true, null, "s"]}"#)]
#[case(LanguageId::Curly, "fn main() {\n    let x = f(1);\n}\n")]
#[case(LanguageId::Plain, "# notes\nsome { text }\n")]
fn test_clean_sources(#[case] language: LanguageId, #[case] text: &str) {
    let engine = engine_from(language, text);
    assert_eq!(diagnostics(&engine), vec![]);
}

// =============================================================================
// DIAGNOSTICS - EDITS
// =============================================================================

#[test]
fn test_fixing_the_error_clears_diagnostics() {
    let mut engine = json(r#"{"a" 1}"#);
    assert_eq!(diagnostics(&engine).len(), 1);
    edit(&mut engine, 4, 4, ":");
    assert!(diagnostics(&engine).is_empty());
}

#[test]
fn test_errors_inside_recovery_region_are_warnings() {
    let engine = json(r#"{"a": {"b" 1}"#);
    let diagnostics = diagnostics(&engine);
    let unclosed = diagnostics
        .iter()
        .find(|d| d.code == ErrorCode::E0202)
        .unwrap();
    assert_eq!(unclosed.severity, Severity::Error);
    assert!(
        diagnostics
            .iter()
            .filter(|d| d.code == ErrorCode::E0301)
            .all(|d| d.severity == Severity::Warning)
    );
}
