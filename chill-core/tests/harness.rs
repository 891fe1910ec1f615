#![allow(dead_code)]

use std::path::Path;
use std::process::Command;

use chill_core::diagnostic::Diagnostic;
use chill_core::span::FileId;
use chill_core::{analyze, compile_c, Analysis, AnalysisOptions, CompileOptions, CoreError};

/// Analyse a unit with no external grants.
pub fn analyze_src(src: &str) -> Analysis {
    analyze(FileId(0), src, &AnalysisOptions::default())
}

/// Analyse and generate C, panicking on any error.
pub fn compile_src(src: &str) -> String {
    let analysis = analyze_src(src);
    assert!(
        !analysis.has_errors(),
        "unexpected errors: {:#?}",
        errors(&analysis)
    );
    compile_c(&analysis, &test_options())
        .map(|artifact| artifact.c_source)
        .unwrap_or_else(|e| panic!("code generation failed: {:#?}", e.diagnostics()))
}

/// Analyse and try to generate C.
pub fn try_compile_src(src: &str) -> Result<String, CoreError> {
    let analysis = analyze_src(src);
    compile_c(&analysis, &test_options()).map(|artifact| artifact.c_source)
}

pub fn test_options() -> CompileOptions {
    CompileOptions {
        source_name: "test.ch".to_string(),
        timestamp: None,
        compiler_version: "test".to_string(),
        emit_main: true,
    }
}

pub fn errors(analysis: &Analysis) -> Vec<&Diagnostic> {
    analysis.diagnostics.iter().filter(|d| d.is_error()).collect()
}

pub fn warnings(analysis: &Analysis) -> Vec<&Diagnostic> {
    analysis.diagnostics.iter().filter(|d| !d.is_error()).collect()
}

/// Diagnostics carrying `code`.
pub fn with_code<'a>(analysis: &'a Analysis, code: &str) -> Vec<&'a Diagnostic> {
    analysis.diagnostics.iter().filter(|d| d.code == code).collect()
}

/// Host C compiler from `CHILLC_CC`, falling back to `cc`.
pub fn host_cc() -> String {
    std::env::var("CHILLC_CC").unwrap_or_else(|_| "cc".to_string())
}

/// Build `c_source` with the host compiler and run it, returning stdout.
pub fn run_c(c_source: &str, dir: &Path) -> String {
    let c_path = dir.join("unit.c");
    let exe = dir.join("unit");
    std::fs::write(&c_path, c_source).expect("write C source");
    let status = Command::new(host_cc())
        .args(["-std=c11", "-pthread", "-Wall", "-o"])
        .arg(&exe)
        .arg(&c_path)
        .status()
        .expect("spawn C compiler");
    assert!(status.success(), "C compiler failed on:\n{c_source}");
    let output = Command::new(&exe).output().expect("run program");
    assert!(output.status.success(), "program failed: {:?}", output.status);
    String::from_utf8(output.stdout).expect("utf-8 output")
}
