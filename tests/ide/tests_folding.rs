//! Folding ranges tests for the IDE layer.

use strata::ide::{FoldingKind, folding_ranges};

use crate::helpers::engine_helpers::*;

#[test]
fn test_nested_functions_fold() {
    let source = "class A {\n    fn m() {\n        x();\n    }\n}\n";
    let engine = curly(source);
    let ranges = folding_ranges(&engine);
    let lines: Vec<(u32, u32)> = ranges.iter().map(|r| (r.start_line, r.end_line)).collect();
    assert_eq!(lines, vec![(0, 4), (1, 3)]);
    assert!(ranges.iter().all(|r| r.kind == FoldingKind::Region));
}

#[test]
fn test_folding_follows_edits() {
    let mut engine = json("[\n  1\n]");
    assert_eq!(folding_ranges(&engine).len(), 1);
    edit(&mut engine, 1, 6, "");
    assert!(folding_ranges(&engine).is_empty());
}

#[test]
fn test_folding_range_has_lines() {
    let engine = json("{\n  \"a\": {\n    \"b\": [\n      1\n    ]\n  }\n}\n");
    for range in folding_ranges(&engine) {
        assert!(range.end_line > range.start_line);
    }
}
