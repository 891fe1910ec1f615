mod harness;

use chill_core::diagnostic::{codes, DiagnosticKind};
use chill_core::modes::Mode;
use chill_core::span::FileId;
use chill_core::symbols::SymbolKind;
use chill_core::{analyze, AnalysisOptions, Externals};
use harness::{analyze_src, errors, warnings, with_code};

fn symbol_mode(analysis: &chill_core::Analysis, name: &str) -> Mode {
    analysis
        .symbols
        .symbols()
        .iter()
        .find(|s| s.name == name)
        .and_then(|s| s.mode.clone())
        .unwrap_or_else(|| panic!("no mode recorded for `{name}`"))
}

#[test]
fn cyclic_synmodes_yield_one_error() {
    let analysis = analyze_src(
        "m: MODULE\n\
         SYNMODE a = b, b = c, c = a;\n\
         DCL x a;\n\
         END m;\n",
    );
    let cycles = with_code(&analysis, "E0300");
    assert_eq!(cycles.len(), 1, "{:#?}", analysis.diagnostics);
    assert!(cycles[0].notes.iter().any(|n| n.starts_with("cycle:")));
    assert!(symbol_mode(&analysis, "x").is_unknown());
}

#[test]
fn long_alias_chain_resolves() {
    let mut src = String::from("m: MODULE\nSYNMODE m0 = RANGE(1:10);\n");
    for i in 1..50 {
        src.push_str(&format!("SYNMODE m{i} = m{};\n", i - 1));
    }
    src.push_str("DCL x m49;\nEND m;\n");
    let analysis = analyze_src(&src);
    assert!(errors(&analysis).is_empty(), "{:#?}", analysis.diagnostics);
    assert_eq!(symbol_mode(&analysis, "x").strip(), &Mode::range(1, 10));
}

#[test]
fn duplicate_in_one_scope_only() {
    let analysis = analyze_src(
        "m: MODULE\n\
         DCL count INT;\n\
         DCL count BOOL;\n\
         p: PROC ();\n\
           DCL count CHAR;\n\
         END p;\n\
         END m;\n",
    );
    let dups = with_code(&analysis, "E0200");
    assert_eq!(dups.len(), 1, "{:#?}", analysis.diagnostics);
    assert_eq!(dups[0].secondary.len(), 1);
    assert_eq!(errors(&analysis).len(), 1);
}

#[test]
fn sibling_procedures_share_local_names() {
    let analysis = analyze_src(
        "m: MODULE\n\
         a: PROC ();\n  DCL count INT;\n  count := 1;\nEND a;\n\
         b: PROC ();\n  DCL count INT;\n  count := 2;\nEND b;\n\
         END m;\n",
    );
    assert!(analysis.diagnostics.is_empty(), "{:#?}", analysis.diagnostics);
    let counts = analysis
        .symbols
        .symbols()
        .iter()
        .filter(|s| s.name == "count")
        .count();
    assert_eq!(counts, 2);
}

#[test]
fn unresolved_name_suggests_spelling() {
    let analysis = analyze_src(
        "m: MODULE\n\
         DCL counter INT;\n\
         countr := 1;\n\
         END m;\n",
    );
    let unresolved = with_code(&analysis, "E0201");
    assert_eq!(unresolved.len(), 1);
    assert!(unresolved[0].message.contains("countr"));
    assert!(unresolved[0].notes.iter().any(|n| n.contains("`counter`")));
}

#[test]
fn names_are_case_sensitive() {
    let analysis = analyze_src("m: MODULE\nDCL Total INT;\ntotal := 1;\nEND m;\n");
    assert_eq!(with_code(&analysis, "E0201").len(), 1);
}

#[test]
fn newmode_range_bound_warning() {
    let analysis = analyze_src(
        "m: MODULE\n\
         NEWMODE b = RANGE(0:255);\n\
         DCL x b;\n\
         x := 300;\n\
         END m;\n",
    );
    assert!(errors(&analysis).is_empty(), "{:#?}", analysis.diagnostics);
    let bounds = with_code(&analysis, codes::RANGE_BOUND);
    assert_eq!(bounds.len(), 1);
    assert_eq!(bounds[0].kind, DiagnosticKind::ModeMismatch);
    assert_eq!(symbol_mode(&analysis, "b").strip(), &Mode::range(0, 255));
}

#[test]
fn newmodes_are_not_interchangeable() {
    let analysis = analyze_src(
        "m: MODULE\n\
         NEWMODE meters = INT, feet = INT;\n\
         DCL a meters, b feet;\n\
         a := b;\n\
         END m;\n",
    );
    assert_eq!(with_code(&analysis, "E0301").len(), 1, "{:#?}", analysis.diagnostics);
}

#[test]
fn synonyms_are_constants() {
    let analysis = analyze_src(
        "m: MODULE\n\
         SYN size = 4, last = size - 1;\n\
         DCL table ARRAY (0:last) INT;\n\
         table(last) := size;\n\
         END m;\n",
    );
    assert!(analysis.diagnostics.is_empty(), "{:#?}", analysis.diagnostics);
    match symbol_mode(&analysis, "table").strip() {
        Mode::Array { lo, hi, .. } => assert_eq!((*lo, *hi), (0, 3)),
        other => panic!("expected an array, got {other}"),
    }
}

#[test]
fn unsatisfied_seize_is_a_warning() {
    let analysis = analyze_src(
        "m: MODULE\n\
         SEIZE limit;\n\
         DCL x INT;\n\
         x := limit;\n\
         END m;\n",
    );
    assert!(errors(&analysis).is_empty(), "{:#?}", analysis.diagnostics);
    assert_eq!(with_code(&analysis, codes::UNSATISFIED_SEIZE).len(), 1);
    assert!(symbol_mode(&analysis, "limit").is_unknown());
}

#[test]
fn seize_is_satisfied_by_another_unit() {
    let provider = analyze_src(
        "lib: MODULE\n\
         GRANT limit, bump;\n\
         SYN limit = 10;\n\
         bump: PROC (v INOUT INT);\n  v := v + 1;\nEND bump;\n\
         END lib;\n",
    );
    assert!(provider.diagnostics.is_empty(), "{:#?}", provider.diagnostics);
    let externals: Externals = provider.exports().into_iter().collect();
    let user = analyze(
        FileId(1),
        "app: MODULE\n\
         SEIZE limit, bump;\n\
         DCL x INT := limit;\n\
         bump(x);\n\
         END app;\n",
        &AnalysisOptions { externals },
    );
    assert!(user.diagnostics.is_empty(), "{:#?}", user.diagnostics);
    let bump = user
        .symbols
        .symbols()
        .iter()
        .find(|s| s.name == "bump")
        .expect("seized symbol");
    assert_eq!(bump.kind, SymbolKind::Procedure);
    assert!(bump.seized);
}

#[test]
fn receive_case_outside_a_process_is_rejected() {
    let analysis = analyze_src(
        "m: MODULE\n\
         SIGNAL go;\n\
         RECEIVE CASE (go): ; ESAC;\n\
         END m;\n",
    );
    assert!(errors(&analysis)
        .iter()
        .any(|d| d.message.contains("only allowed inside a process")));
}

#[test]
fn send_without_destination_is_rejected() {
    let analysis = analyze_src(
        "m: MODULE\n\
         SIGNAL ping;\n\
         SEND ping;\n\
         END m;\n",
    );
    assert!(errors(&analysis)
        .iter()
        .any(|d| d.message.contains("has no destination process")));
}

#[test]
fn unhandled_signal_is_reported() {
    let analysis = analyze_src(
        "m: MODULE\n\
         SIGNAL a TO worker, b TO worker;\n\
         worker: PROCESS ();\n\
           RECEIVE CASE (a): ; ESAC;\n\
         END worker;\n\
         END m;\n",
    );
    assert!(errors(&analysis).is_empty(), "{:#?}", analysis.diagnostics);
    let w = warnings(&analysis);
    assert_eq!(w.len(), 1);
    assert_eq!(w[0].kind, DiagnosticKind::NonExhaustiveCase);
    assert!(w[0].message.contains("`b`"));
}

#[test]
fn one_mistake_one_diagnostic() {
    let analysis = analyze_src(
        "m: MODULE\n\
         DCL x INT;\n\
         x := ;\n\
         x := 2;\n\
         END m;\n",
    );
    assert_eq!(analysis.diagnostics.len(), 1, "{:#?}", analysis.diagnostics);
    assert_eq!(analysis.diagnostics.iter().next().map(|d| d.code), Some("E0100"));
}

#[test]
fn call_arity_and_argument_modes_are_checked() {
    let analysis = analyze_src(
        "m: MODULE\n\
         p: PROC (a INT, b BOOL);\n\
         END p;\n\
         worker: PROCESS (n INT);\n\
         END worker;\n\
         p(1);\n\
         p(TRUE, 1);\n\
         START worker(FALSE);\n\
         END m;\n",
    );
    let errs = errors(&analysis);
    assert!(errs.iter().all(|d| d.code == "E0301"), "{errs:#?}");
    assert_eq!(
        errs.iter()
            .filter(|d| d.message == "`p` expects 2 argument(s) but 1 were supplied")
            .count(),
        1,
        "{errs:#?}"
    );
    let positional: Vec<&str> = errs
        .iter()
        .filter(|d| d.message.contains("does not match parameter mode"))
        .map(|d| d.message.as_str())
        .collect();
    assert_eq!(
        positional,
        [
            "argument of mode `BOOL` does not match parameter mode `INT`",
            "argument of mode `INT` does not match parameter mode `BOOL`",
            "argument of mode `BOOL` does not match parameter mode `INT`",
        ]
    );
}

#[test]
fn overlapping_case_labels_are_errors() {
    let analysis = analyze_src(
        "m: MODULE\n\
         DCL n INT;\n\
         CASE n OF\n\
           (1, 2): n := 0;\n\
           (2:4): n := 1;\n\
         ELSE n := 2;\n\
         ESAC;\n\
         END m;\n",
    );
    let errs = errors(&analysis);
    assert_eq!(errs.len(), 1, "{errs:#?}");
    assert_eq!(errs[0].message, "case label overlaps a label of another alternative");
    assert_eq!(errs[0].secondary.len(), 1);
}

#[test]
fn signal_handled_twice_is_an_error() {
    let analysis = analyze_src(
        "m: MODULE\n\
         SIGNAL s TO worker;\n\
         worker: PROCESS ();\n\
           RECEIVE CASE\n\
             (s): ;\n\
             (s): ;\n\
           ESAC;\n\
         END worker;\n\
         END m;\n",
    );
    let errs = errors(&analysis);
    assert_eq!(errs.len(), 1, "{errs:#?}");
    assert_eq!(errs[0].message, "signal `s` is handled twice");
}

#[test]
fn unprovable_range_assignment_warns() {
    let analysis = analyze_src(
        "m: MODULE\n\
         NEWMODE digit = RANGE(0:9);\n\
         DCL d digit;\n\
         DCL n INT;\n\
         d := n;\n\
         END m;\n",
    );
    assert!(errors(&analysis).is_empty(), "{:#?}", analysis.diagnostics);
    let w = warnings(&analysis);
    assert_eq!(w.len(), 1, "{w:#?}");
    assert_eq!(w[0].kind, DiagnosticKind::UnprovableBound);
    assert_eq!(w[0].code, "W0401");
}

#[test]
fn constant_index_outside_the_array_warns() {
    let analysis = analyze_src(
        "m: MODULE\n\
         DCL a ARRAY(1:3) INT;\n\
         DCL v INT;\n\
         v := a(2);\n\
         v := a(5);\n\
         END m;\n",
    );
    assert!(errors(&analysis).is_empty(), "{:#?}", analysis.diagnostics);
    let w = warnings(&analysis);
    assert_eq!(w.len(), 1, "{w:#?}");
    assert_eq!(w[0].kind, DiagnosticKind::UnprovableBound);
    assert_eq!(w[0].message, "index 5 is outside the bounds 1:3");
}

#[test]
fn oversized_lengths_are_rejected() {
    let analysis = analyze_src(
        "m: MODULE\n\
         DCL a ARRAY(0:9223372036854775807) INT;\n\
         DCL s CHARS(9223372036854775807);\n\
         DCL t CHARS(0);\n\
         END m;\n",
    );
    let errs = errors(&analysis);
    let messages: Vec<&str> = errs.iter().map(|d| d.message.as_str()).collect();
    assert_eq!(messages.len(), 3, "{messages:#?}");
    assert!(messages[0].starts_with("array bounds `0:9223372036854775807` exceed"), "{messages:#?}");
    assert_eq!(messages[1], "CHARS length must be at most 2147483647, found 9223372036854775807");
    assert_eq!(messages[2], "CHARS length must be at least 1, found 0");
}

#[test]
fn powerset_tuples_take_the_location_mode() {
    let analysis = analyze_src(
        "m: MODULE\n\
         NEWMODE color = SET(red, green, blue);\n\
         DCL p POWERSET color;\n\
         DCL q POWERSET RANGE(1:8);\n\
         p := [red, blue];\n\
         p := [];\n\
         q := [2, 9];\n\
         p := [1];\n\
         INCL(p, green);\n\
         EXCL(q, red);\n\
         END m;\n",
    );
    let errs = errors(&analysis);
    assert_eq!(errs.len(), 2, "{errs:#?}");
    assert!(errs[0].message.starts_with("cannot assign a value of mode `POWERSET"), "{errs:#?}");
    assert!(errs[1].message.contains("is not a member mode of"), "{errs:#?}");
    let bounds = with_code(&analysis, codes::RANGE_BOUND);
    assert_eq!(bounds.len(), 1, "{:#?}", analysis.diagnostics);
    assert_eq!(bounds[0].message, "value 9 is outside the bounds of `RANGE(1:8)` (1:8)");
}
