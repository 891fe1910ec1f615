use chill_core::diagnostic::Severity;
use chill_core::span::{FileId, LineIndex, Position, Span};
use chill_core::symbols::SymbolKind;
use chill_core::{analyze, Analysis, AnalysisOptions};
use chill_ide::{CompletionKind, DocumentSymbol, QueryService};

const TICKS: &str = "m: MODULE\n\
  -- Number of ticks seen so far.\n\
  DCL total INT;\n\
  DCL v BOOL;\n\
  NEWMODE level = RANGE(0:255);\n\
  a: PROC (v INOUT INT);\n\
    DCL count INT;\n\
    count := v;\n\
    total := total + count;\n\
  END a;\n\
  b: PROC ();\n\
    DCL count level;\n\
    count := 3;\n\
  END b;\n\
END m;\n";

fn analyze_src(src: &str) -> Analysis {
    analyze(FileId(0), src, &AnalysisOptions::default())
}

/// Position `delta` bytes into the `nth` occurrence of `needle`.
fn at(src: &str, needle: &str, nth: usize, delta: usize) -> Position {
    let (offset, _) = src
        .match_indices(needle)
        .nth(nth)
        .unwrap_or_else(|| panic!("`{needle}` #{nth} not in source"));
    LineIndex::new(src).position((offset + delta) as u32)
}

fn text<'a>(src: &'a str, span: Span) -> &'a str {
    &src[span.start as usize..span.end as usize]
}

fn labels(items: &[chill_ide::CompletionItem]) -> Vec<&str> {
    items.iter().map(|i| i.label.as_str()).collect()
}

#[test]
fn ticks_unit_is_clean() {
    let analysis = analyze_src(TICKS);
    assert!(analysis.diagnostics.is_empty(), "{:#?}", analysis.diagnostics);
}

#[test]
fn completion_filters_by_prefix_in_the_innermost_scope() {
    let analysis = analyze_src(TICKS);
    let items = analysis.completions_at(at(TICKS, "count := 3", 0, 3));
    assert_eq!(labels(&items), ["count"]);
    assert_eq!(items[0].kind, CompletionKind::Symbol(SymbolKind::Variable));
    assert_eq!(items[0].detail.as_deref(), Some("level"));
}

#[test]
fn completion_lists_inner_scopes_first_without_shadowed_names() {
    let analysis = analyze_src(TICKS);
    let items = analysis.completions_at(at(TICKS, "total := total", 0, 0));
    let names = labels(&items);
    assert_eq!(names[..6], ["v", "count", "total", "level", "a", "b"]);
    assert_eq!(names.iter().filter(|n| **n == "v").count(), 1);
    assert_eq!(items[0].detail.as_deref(), Some("INT"));
    assert!(!names.contains(&"m"));
    assert_eq!(items[6].kind, CompletionKind::Keyword);
}

#[test]
fn completion_offers_keywords_then_predefined_names() {
    let src = "m: MODULE\n  DCL recent INT;\n  recent := 1;\nEND m;\n";
    let analysis = analyze_src(src);
    let items = analysis.completions_at(at(src, "recent :=", 0, 3));
    let names = labels(&items);
    assert_eq!(names[0], "recent");
    assert!(names.contains(&"RECEIVE"));
    assert!(names.iter().all(|n| n.to_ascii_uppercase().starts_with("REC")), "{names:?}");

    let items = analysis.completions_at(at(src, "recent :=", 0, 0));
    let predefined: Vec<&str> = items
        .iter()
        .filter(|i| i.kind == CompletionKind::Predefined)
        .map(|i| i.label.as_str())
        .collect();
    assert!(predefined.contains(&"WRITETEXT"));
    let first_predefined = items
        .iter()
        .position(|i| i.kind == CompletionKind::Predefined)
        .expect("predefined names offered");
    assert!(items[first_predefined..]
        .iter()
        .all(|i| i.kind == CompletionKind::Predefined));
}

#[test]
fn no_completion_inside_comments() {
    let analysis = analyze_src(TICKS);
    assert!(analysis.completions_at(at(TICKS, "ticks seen", 0, 3)).is_empty());
}

#[test]
fn hover_shows_mode_and_doc_comment() {
    let analysis = analyze_src(TICKS);
    let hover = analysis
        .hover_at(at(TICKS, "total + count", 0, 1))
        .expect("hover on a reference");
    assert_eq!(hover.kind, Some(SymbolKind::Variable));
    assert_eq!(hover.signature, "DCL total INT");
    assert_eq!(hover.documentation.as_deref(), Some("Number of ticks seen so far."));
    let decl = hover.declaration.expect("declaration span");
    assert_eq!(text(TICKS, decl), "total INT");
    assert!(hover.contents().contains("DCL total INT"));
}

#[test]
fn hover_without_comment_has_no_documentation() {
    let analysis = analyze_src(TICKS);
    let hover = analysis.hover_at(at(TICKS, "v BOOL", 0, 0)).expect("hover");
    assert_eq!(hover.signature, "DCL v BOOL");
    assert_eq!(hover.documentation, None);
}

#[test]
fn hover_describes_modes_and_parameters() {
    let analysis = analyze_src(TICKS);
    let level = analysis.hover_at(at(TICKS, "level =", 0, 0)).expect("hover");
    assert_eq!(level.signature, "NEWMODE level = RANGE(0:255)");
    let param = analysis.hover_at(at(TICKS, "count := v", 0, 9)).expect("hover");
    assert_eq!(param.signature, "v INT INOUT");
}

#[test]
fn hover_on_keywords_and_predefined_names() {
    let analysis = analyze_src(TICKS);
    let dcl = analysis.hover_at(at(TICKS, "DCL total", 0, 1)).expect("keyword hover");
    assert_eq!(dcl.symbol, None);
    assert_eq!(dcl.signature, "DCL");
    assert!(dcl.documentation.is_some());

    let int = analysis.hover_at(at(TICKS, "INT;", 0, 0)).expect("predefined hover");
    assert_eq!(int.signature, "INT");
    assert!(int.documentation.unwrap_or_default().contains("integer"));

    assert!(analysis.hover_at(at(TICKS, ":= 3", 0, 3)).is_none());
}

#[test]
fn definition_follows_the_innermost_binding() {
    let analysis = analyze_src(TICKS);
    let def = analysis
        .definition_of(at(TICKS, "count := 3", 0, 2))
        .expect("definition");
    let expected = TICKS.match_indices("count level").next().expect("decl").0 as u32;
    assert_eq!(def.start, expected);
    assert_eq!(text(TICKS, def), "count");

    let own = analysis.definition_of(at(TICKS, "count level", 0, 0));
    assert_eq!(own, Some(def));
}

#[test]
fn references_start_with_the_declaration_on_request() {
    let analysis = analyze_src(TICKS);
    let pos = at(TICKS, "total INT", 0, 0);
    let with_decl = analysis.references_of(pos, true);
    let without = analysis.references_of(pos, false);
    assert_eq!(with_decl.len(), 3);
    assert_eq!(without.len(), 2);
    assert_eq!(with_decl[1..], without[..]);
    assert_eq!(with_decl[0].start, TICKS.find("total INT").expect("decl") as u32);
    assert!(with_decl.iter().all(|span| text(TICKS, *span) == "total"));
}

#[test]
fn references_of_nothing_is_empty() {
    let analysis = analyze_src(TICKS);
    assert!(analysis.references_of(at(TICKS, ":= 3", 0, 3), true).is_empty());
    assert!(analysis.definition_of(at(TICKS, ":= 3", 0, 3)).is_none());
}

fn names(entries: &[DocumentSymbol]) -> Vec<&str> {
    entries.iter().map(|e| e.name.as_str()).collect()
}

#[test]
fn outline_mirrors_the_scope_tree() {
    let analysis = analyze_src(TICKS);
    let outline = analysis.document_symbols();
    assert_eq!(names(&outline), ["m"]);
    assert_eq!(outline[0].kind, SymbolKind::Module);
    let module = &outline[0].children;
    assert_eq!(names(module), ["total", "v", "level", "a", "b"]);

    let a = &module[3];
    let b = &module[4];
    assert_eq!(a.kind, SymbolKind::Procedure);
    assert_eq!(names(&a.children), ["v", "count"]);
    assert_eq!(names(&b.children), ["count"]);
    assert_eq!(b.children[0].detail.as_deref(), Some("level"));
    assert_eq!(module[2].detail.as_deref(), Some("RANGE(0:255)"));
    assert_eq!(b.children[0].selection_range.start.line, 11);
}

#[test]
fn loop_variables_appear_under_their_procedure() {
    let src = "m: MODULE\n\
      p: PROC ();\n\
        DCL sum INT := 0;\n\
        DO FOR i := 1 TO 3;\n\
          sum := sum + i;\n\
        OD;\n\
      END p;\n\
    END m;\n";
    let analysis = analyze_src(src);
    assert!(!analysis.has_errors(), "{:#?}", analysis.diagnostics);
    let outline = analysis.document_symbols();
    let p = &outline[0].children[0];
    assert_eq!(names(&p.children), ["sum", "i"]);
}

#[test]
fn diagnostics_become_markers() {
    let src = "m: MODULE\n  DCL x INT;\n  y := 1;\nEND m;\n";
    let analysis = analyze_src(src);
    let markers = analysis.diagnostics();
    assert_eq!(markers.len(), 1, "{markers:#?}");
    let marker = &markers[0];
    assert_eq!(marker.code, "E0201");
    assert_eq!(marker.severity, Severity::Error);
    assert_eq!(marker.range.start, Position::new(2, 2));
    assert_eq!(marker.range.end, Position::new(2, 3));
}

#[test]
fn duplicate_marker_points_at_the_first_declaration() {
    let src = "m: MODULE\n  DCL x INT;\n  DCL x BOOL;\nEND m;\n";
    let analysis = analyze_src(src);
    let markers = analysis.diagnostics();
    assert_eq!(markers.len(), 1);
    assert_eq!(markers[0].code, "E0200");
    assert_eq!(markers[0].related.len(), 1);
    assert_eq!(markers[0].related[0].0.start, Position::new(1, 6));
}
