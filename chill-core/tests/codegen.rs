mod harness;

use chill_core::diagnostic::codes;
use chill_core::CoreError;
use harness::{analyze_src, compile_src, run_c, try_compile_src, with_code};

const STATES: &str = "m: MODULE\n\
    NEWMODE state = SET(idle, active, error);\n\
    DCL s state := idle;\n\
    CASE s OF\n\
      (idle): s := active;\n\
      (active): s := idle;\n\
    ESAC;\n\
    END m;\n";

#[test]
fn case_without_else_warns_and_still_generates() {
    let analysis = analyze_src(STATES);
    let warnings = with_code(&analysis, "W0400");
    assert_eq!(warnings.len(), 1, "{:#?}", analysis.diagnostics);
    assert!(warnings[0].notes.iter().any(|n| n.contains("error")));
    assert!(!analysis.has_errors());

    let c = compile_src(STATES);
    assert!(c.contains("enum { idle = 0, active = 1, error = 2 };"), "{c}");
    assert!(c.contains("switch (s) {"), "{c}");
    assert!(c.contains("case idle:"), "{c}");
    assert!(!c.contains("default:"), "{c}");
}

#[test]
fn exhaustive_case_has_no_warning() {
    let analysis = analyze_src(
        "m: MODULE\n\
         DCL b BOOL;\n\
         DCL n INT;\n\
         CASE b OF (TRUE): n := 1; (FALSE): n := 0; ESAC;\n\
         CASE n OF (1:10): n := 0; ELSE n := 1; ESAC;\n\
         END m;\n",
    );
    assert!(analysis.diagnostics.is_empty(), "{:#?}", analysis.diagnostics);
}

#[test]
fn integer_case_without_else_warns() {
    let analysis = analyze_src("m: MODULE\nDCL n INT;\nCASE n OF (1): n := 2; ESAC;\nEND m;\n");
    assert_eq!(with_code(&analysis, "W0400").len(), 1);
}

#[test]
fn errors_block_generation() {
    let result = try_compile_src("m: MODULE\nDCL x INT;\nx := TRUE;\nEND m;\n");
    match result {
        Err(CoreError::Diagnostics(diags)) => {
            assert!(diags.iter().any(|d| d.code == "E0301"), "{diags:#?}");
        }
        other => panic!("expected diagnostics, got {other:?}"),
    }
}

#[test]
fn provenance_header_and_layout() {
    let c = compile_src("demo: MODULE\nDCL x INT := 1;\nEND demo;\n");
    assert!(c.starts_with("/*\n * Generated by chillc test from test.ch\n"), "{c}");
    assert!(c.contains("ITU-T Z.200 (1999)"));
    assert!(!c.contains("Generated at:"));
    assert!(c.contains("#include <pthread.h>"));
    assert!(c.contains("static int32_t x;"), "{c}");
    assert!(c.contains("x = 1;"), "{c}");
    assert!(c.contains("int main(void)"));
    assert!(c.contains("chill_join_all();"));
}

#[test]
fn range_modes_use_the_smallest_type() {
    let c = compile_src(
        "m: MODULE\n\
         DCL small RANGE(0:200), signed_small RANGE(-5:5), wide RANGE(0:70000);\n\
         END m;\n",
    );
    assert!(c.contains("static uint8_t small;"), "{c}");
    assert!(c.contains("static int8_t signed_small;"), "{c}");
    assert!(c.contains("static uint32_t wide;"), "{c}");
}

#[test]
fn reserved_c_names_are_renamed() {
    let c = compile_src("m: MODULE\nDCL main, printf INT;\nmain := 1;\nprintf := main;\nEND m;\n");
    assert!(c.contains("static int32_t u_main;"), "{c}");
    assert!(c.contains("u_printf = u_main;"), "{c}");
}

#[test]
fn inout_parameters_are_pointers() {
    let c = compile_src(
        "m: MODULE\n\
         bump: PROC (v INOUT INT, amount IN INT);\n  v := v + amount;\nEND bump;\n\
         DCL x INT;\n\
         bump(x, 2);\n\
         END m;\n",
    );
    assert!(c.contains("static void bump(int32_t *v, int32_t amount)"), "{c}");
    assert!(c.contains("(*v) = ((*v) + amount);"), "{c}");
    assert!(c.contains("bump(&x, 2);"), "{c}");
}

#[test]
fn region_procedures_lock_on_every_exit() {
    let c = compile_src(
        "m: MODULE\n\
         guard: REGION\n\
           GRANT add;\n\
           DCL total INT;\n\
           add: PROC (n INT) RETURNS (INT);\n\
             IF n < 0 THEN RETURN total; FI;\n\
             total := total + n;\n\
             RESULT total;\n\
           END add;\n\
         END guard;\n\
         DCL r INT;\n\
         r := add(1);\n\
         END m;\n",
    );
    assert!(c.contains("static pthread_mutex_t chill_region_guard;"), "{c}");
    assert!(c.contains("chill_region_init(&chill_region_guard);"), "{c}");
    assert_eq!(c.matches("chill_region_enter(&chill_region_guard);").count(), 1, "{c}");
    assert_eq!(c.matches("chill_region_leave(&chill_region_guard);").count(), 2, "{c}");
}

#[test]
fn processes_and_signals_lower_to_the_runtime() {
    let c = compile_src(
        "m: MODULE\n\
         SIGNAL job = (INT) TO worker;\n\
         worker: PROCESS ();\n\
           DCL n INT;\n\
           DO FOR EVER;\n\
             RECEIVE CASE\n\
               (job IN n WHERE n > 0): WRITETEXT('%C%/', n);\n\
             ESAC;\n\
           OD;\n\
         END worker;\n\
         START worker();\n\
         SEND job(3);\n\
         END m;\n",
    );
    assert!(c.contains("typedef struct {\n    int32_t f0;\n} chill_sig_job;"), "{c}");
    assert!(c.contains("static void chill_process_worker(void *chill_arg)"), "{c}");
    assert!(c.contains("chill_start(chill_process_worker, NULL, 0, &chill_last_worker);"), "{c}");
    assert!(c.contains("chill_latest(&chill_last_worker, \"worker\")"), "{c}");
    assert!(c.contains("->f0 > 0"), "{c}");
    assert!(c.contains("chill_wait_message("), "{c}");
    assert!(c.contains("printf(\"%lld\\n\", (long long)(n));"), "{c}");
}

#[test]
fn nested_procedure_cannot_reach_enclosing_locals() {
    let result = try_compile_src(
        "m: MODULE\n\
         outer: PROC ();\n\
           DCL hidden INT;\n\
           inner: PROC ();\n  hidden := 1;\nEND inner;\n\
           inner();\n\
         END outer;\n\
         END m;\n",
    );
    let Err(err) = result else {
        panic!("expected a code generation error");
    };
    let diags = err.diagnostics();
    assert_eq!(diags.iter().filter(|d| d.code == codes::UNSUPPORTED).count(), 1, "{diags:#?}");
}

#[test]
fn strings_are_bounded_buffers() {
    let c = compile_src(
        "m: MODULE\n\
         DCL name CHARS(8) := 'chill';\n\
         IF name = 'chill' THEN name := 'other'; FI;\n\
         END m;\n",
    );
    assert!(c.contains("char s[9];"), "{c}");
    assert!(c.contains("strcmp(name.s, \"chill\") == 0"), "{c}");
}

// FIFO delivery through a real C toolchain. Run with `--ignored` on a
// host that has `cc` (or `CHILLC_CC`) and pthreads.
#[test]
#[ignore = "requires a host C compiler with pthreads"]
fn receive_case_preserves_send_order() {
    let c = compile_src(
        "m: MODULE\n\
         SIGNAL a = (INT) TO sink, b = (INT) TO sink;\n\
         sink: PROCESS ();\n\
           DCL v INT;\n\
           DO FOR i := 1 TO 3;\n\
             RECEIVE CASE\n\
               (a IN v): WRITETEXT('A%C%/', v);\n\
               (b IN v): WRITETEXT('B%C%/', v);\n\
             ESAC;\n\
           OD;\n\
         END sink;\n\
         START sink();\n\
         SEND a(1);\n\
         SEND b(2);\n\
         SEND a(3);\n\
         END m;\n",
    );
    let dir = tempfile::tempdir().expect("tempdir");
    let out = run_c(&c, dir.path());
    assert_eq!(out, "A1\nB2\nA3\n");
}

#[test]
#[ignore = "requires a host C compiler with pthreads"]
fn buffers_and_regions_run() {
    let c = compile_src(
        "m: MODULE\n\
         DCL queue BUFFER (4) INT;\n\
         counter: REGION\n\
           GRANT add, get;\n\
           DCL total INT;\n\
           add: PROC (n INT);\n  total := total + n;\nEND add;\n\
           get: PROC () RETURNS (INT);\n  RETURN total;\nEND get;\n\
         END counter;\n\
         producer: PROCESS (n INT);\n\
           DO FOR i := 1 TO n;\n  SEND queue(i);\nOD;\n\
         END producer;\n\
         START producer(5);\n\
         DO FOR i := 1 TO 5;\n  add(RECEIVE queue);\nOD;\n\
         WRITETEXT('%C%/', get());\n\
         END m;\n",
    );
    let dir = tempfile::tempdir().expect("tempdir");
    assert_eq!(run_c(&c, dir.path()), "15\n");
}

#[test]
fn oversized_array_is_refused_before_generation() {
    let result = try_compile_src("m: MODULE\nDCL a ARRAY(0:9223372036854775807) INT;\nEND m;\n");
    let Err(CoreError::Diagnostics(diags)) = result else {
        panic!("expected diagnostics");
    };
    assert_eq!(diags.len(), 1, "{diags:#?}");
    assert_eq!(diags[0].code, "E0301");
}

#[test]
fn powerset_tuples_and_updates_are_bit_masks() {
    let c = compile_src(
        "m: MODULE\n\
         NEWMODE color = SET(red, green, blue);\n\
         DCL p POWERSET color;\n\
         DCL x color := green;\n\
         p := [red, green];\n\
         INCL(p, blue);\n\
         EXCL(p, red);\n\
         IF x IN p THEN WRITETEXT('x%/'); FI;\n\
         END m;\n",
    );
    assert!(
        c.contains("p = ((uint8_t)(((uint64_t)1 << (red)) | ((uint64_t)1 << (green))));"),
        "{c}"
    );
    assert!(c.contains("p = (uint8_t)(p | ((uint64_t)1 << (blue)));"), "{c}");
    assert!(c.contains("p = (uint8_t)(p & ~((uint64_t)1 << (red)));"), "{c}");
    assert!(c.contains("((((uint64_t)p) >> (x)) & 1u)"), "{c}");
}

#[test]
fn integer_tuple_is_offset_by_its_smallest_member() {
    let c = compile_src(
        "m: MODULE\n\
         DCL n INT := 3;\n\
         IF n IN [1, 3, 5] THEN n := 0; FI;\n\
         END m;\n",
    );
    assert!(c.contains("((uint64_t)1 << ((3) - 1))"), "{c}");
    assert!(c.contains(">> ((n) - 1)) & 1u)"), "{c}");
}

#[test]
fn stop_delay_events_and_while_loops_lower_to_the_runtime() {
    let c = compile_src(
        "m: MODULE\n\
         DCL ready EVENT;\n\
         DCL done BOOL := FALSE;\n\
         DCL w INSTANCE;\n\
         worker: PROCESS ();\n\
           DELAY ready;\n\
           DELAY 250 MILLISECS;\n\
           STOP;\n\
         END worker;\n\
         w := START worker();\n\
         DO WHILE NOT done;\n\
           done := TRUE;\n\
         OD;\n\
         CONTINUE ready;\n\
         STOP w;\n\
         END m;\n",
    );
    assert!(c.contains("chill_event_wait(&ready);"), "{c}");
    assert!(c.contains("chill_delay(((int64_t)250));"), "{c}");
    assert!(c.contains("chill_exit_process();"), "{c}");
    assert!(c.contains("chill_event_continue(&ready);"), "{c}");
    assert!(c.contains("chill_stop(w);"), "{c}");
    assert!(c.contains("while ("), "{c}");
    assert!(c.contains("done = true;"), "{c}");
}

#[test]
#[ignore = "requires a host C compiler with pthreads"]
fn powerset_membership_runs() {
    let c = compile_src(
        "m: MODULE\n\
         NEWMODE color = SET(red, green, blue);\n\
         DCL p POWERSET color;\n\
         DCL x color := green;\n\
         p := [red, green];\n\
         INCL(p, blue);\n\
         EXCL(p, red);\n\
         IF x IN p THEN WRITETEXT('x%/'); FI;\n\
         IF red IN p THEN WRITETEXT('red%/'); FI;\n\
         WRITETEXT('%C%/', CARD(p));\n\
         IF 3 IN [1, 3, 5] THEN WRITETEXT('odd%/'); FI;\n\
         END m;\n",
    );
    let dir = tempfile::tempdir().expect("tempdir");
    assert_eq!(run_c(&c, dir.path()), "x\n2\nodd\n");
}
