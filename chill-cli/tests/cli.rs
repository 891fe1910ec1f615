use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::tempdir;

const GOOD: &str = "m: MODULE\n  DCL x INT := 1;\n  x := x + 1;\nEND m;\n";
const BAD: &str = "m: MODULE\n  DCL x INT;\n  y := 1;\nEND m;\n";
const WARN: &str = "m: MODULE\n  NEWMODE b = RANGE(0:255);\n  DCL x b;\n  x := 300;\nEND m;\n";

fn chillc(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_chillc"))
        .args(args)
        .current_dir(dir)
        .env_remove("CHILLC_LOG")
        .output()
        .expect("failed to run chillc")
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

#[test]
fn writes_the_c_sibling_by_default() {
    let dir = tempdir().expect("tempdir");
    fs::write(dir.path().join("unit.ch"), GOOD).expect("write source");
    let out = chillc(dir.path(), &["unit.ch"]);
    assert_eq!(out.status.code(), Some(0), "{}", stderr(&out));
    let c = fs::read_to_string(dir.path().join("unit.c")).expect("generated C");
    assert!(c.contains("ITU-T Z.200 (1999)"));
    assert!(c.contains("unit.ch"));
    assert!(c.contains("int main("));
    assert!(stderr(&out).is_empty(), "{}", stderr(&out));
}

#[test]
fn errors_exit_one_and_write_nothing() {
    let dir = tempdir().expect("tempdir");
    fs::write(dir.path().join("bad.ch"), BAD).expect("write source");
    let out = chillc(dir.path(), &["bad.ch"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(!dir.path().join("bad.c").exists());
    let err = stderr(&out);
    assert!(err.contains("bad.ch:3:3: error[E0201]"), "{err}");
    assert!(err.contains("bad.ch: 1 error, 0 warnings"), "{err}");
}

#[test]
fn warnings_are_printed_but_do_not_fail() {
    let dir = tempdir().expect("tempdir");
    fs::write(dir.path().join("warn.ch"), WARN).expect("write source");
    let out = chillc(dir.path(), &["warn.ch", "-o", "gen/out.c"]);
    assert_eq!(out.status.code(), Some(0), "{}", stderr(&out));
    assert!(dir.path().join("gen/out.c").exists());
    let err = stderr(&out);
    assert!(err.contains("warning[W0302]"), "{err}");
    assert!(err.contains("0 errors, 1 warning"), "{err}");
}

#[test]
fn missing_input_is_an_internal_failure() {
    let dir = tempdir().expect("tempdir");
    let out = chillc(dir.path(), &["absent.ch"]);
    assert_eq!(out.status.code(), Some(2));
    assert!(stderr(&out).contains("failed to read input file absent.ch"));
}

#[test]
fn timestamp_and_no_main_shape_the_output() {
    let dir = tempdir().expect("tempdir");
    fs::write(dir.path().join("lib.ch"), GOOD).expect("write source");
    let out = chillc(dir.path(), &["lib.ch", "--no-main", "--timestamp", "2024-05-01T00:00:00Z"]);
    assert_eq!(out.status.code(), Some(0), "{}", stderr(&out));
    let c = fs::read_to_string(dir.path().join("lib.c")).expect("generated C");
    assert!(c.contains("Generated at: 2024-05-01T00:00:00Z"));
    assert!(c.contains("void chill_init_m(void)"));
    assert!(!c.contains("int main("));
}

#[test]
fn debug_listings_go_to_stdout() {
    let dir = tempdir().expect("tempdir");
    fs::write(dir.path().join("unit.ch"), GOOD).expect("write source");
    let out = chillc(dir.path(), &["unit.ch", "--emit", "symbols"]);
    assert_eq!(out.status.code(), Some(0));
    let text = String::from_utf8_lossy(&out.stdout);
    assert!(text.starts_with("scope Module m"), "{text}");
    assert!(text.contains("variable x : INT"), "{text}");
    assert!(!dir.path().join("unit.c").exists());

    let out = chillc(dir.path(), &["unit.ch", "--emit", "tokens", "-o", "tokens.txt"]);
    assert_eq!(out.status.code(), Some(0));
    let tokens = fs::read_to_string(dir.path().join("tokens.txt")).expect("listing");
    assert!(tokens.starts_with("1:1 Ident \"m\""), "{tokens}");
}

#[test]
fn listings_of_a_unit_with_errors_exit_one() {
    let dir = tempdir().expect("tempdir");
    fs::write(dir.path().join("bad.ch"), BAD).expect("write source");
    let out = chillc(dir.path(), &["bad.ch", "--emit", "symbols"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stdout).starts_with("scope Module m"));
    assert!(stderr(&out).contains("bad.ch: 1 error, 0 warnings"), "{}", stderr(&out));

    let out = chillc(dir.path(), &["bad.ch", "--emit", "tokens"]);
    assert_eq!(out.status.code(), Some(1));
}

#[test]
#[ignore = "requires a host C compiler with pthreads"]
fn check_cc_accepts_generated_code() {
    let dir = tempdir().expect("tempdir");
    fs::write(dir.path().join("unit.ch"), GOOD).expect("write source");
    let out = chillc(dir.path(), &["unit.ch", "--check-cc"]);
    assert_eq!(out.status.code(), Some(0), "{}", stderr(&out));
}
