use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use chill_core::diagnostic::{render, Diagnostic, Severity};
use chill_core::span::{FileId, LineIndex};
use chill_core::{analyze, compile_c, AnalysisOptions, CompileOptions, CoreError};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

mod dump;
mod toolchain;

const COMPILER_COMMIT: &str = env!("CHILLC_COMMIT");

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Emit {
    /// C11 translation unit
    C,
    /// Token listing
    Tokens,
    /// Scope and symbol listing
    Symbols,
}

/// Compile a CHILL (ITU-T Z.200) module to C11 with POSIX threads.
#[derive(Parser, Debug)]
#[command(name = "chillc", version, about, long_about = None)]
struct Cli {
    /// Source unit to compile
    input: PathBuf,

    /// Output file; defaults to the `.c` sibling of INPUT for C, stdout
    /// for the debug listings
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = Emit::C)]
    emit: Emit,

    /// Record a generation time in the provenance comment; without a
    /// value the current UTC time is used
    #[arg(long, value_name = "TEXT", num_args = 0..=1, default_missing_value = "now")]
    timestamp: Option<String>,

    /// Check the generated C with the host compiler (`CHILLC_CC`, default `cc`)
    #[arg(long)]
    check_cc: bool,

    /// Export `chill_init_<module>` instead of defining `main`
    #[arg(long)]
    no_main: bool,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace); otherwise
    /// `CHILLC_LOG` or `warn`
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// How a run that did not fail internally ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Success,
    /// Error diagnostics were reported; nothing was written.
    Rejected,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match execute(cli) {
        Ok(Outcome::Success) => ExitCode::SUCCESS,
        Ok(Outcome::Rejected) => ExitCode::from(1),
        Err(e) => {
            eprintln!("chillc: error: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_env("CHILLC_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn execute(cli: Cli) -> Result<Outcome> {
    let path = cli.input.display().to_string();
    let source = fs::read_to_string(&cli.input)
        .with_context(|| format!("failed to read input file {path}"))?;
    let analysis = analyze(FileId(0), &source, &AnalysisOptions::default());

    let listing = match cli.emit {
        Emit::Tokens => Some(dump::tokens(&analysis)),
        Emit::Symbols => Some(dump::symbols(&analysis)),
        Emit::C => None,
    };
    if let Some(listing) = listing {
        report(&path, &analysis.diagnostics.grouped(), &analysis.line_index);
        emit_listing(cli.output.as_deref(), &listing)?;
        return Ok(if analysis.has_errors() {
            Outcome::Rejected
        } else {
            Outcome::Success
        });
    }

    let options = CompileOptions {
        source_name: cli
            .input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.clone()),
        timestamp: cli.timestamp.as_deref().map(|t| match t {
            "now" => chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            other => other.to_string(),
        }),
        compiler_version: format!("{} ({COMPILER_COMMIT})", env!("CARGO_PKG_VERSION")),
        emit_main: !cli.no_main,
    };

    let artifact = match compile_c(&analysis, &options) {
        Ok(artifact) => {
            report(&path, &analysis.diagnostics.grouped(), &analysis.line_index);
            artifact
        }
        Err(CoreError::Diagnostics(diagnostics)) => {
            let diagnostics: Vec<&Diagnostic> = diagnostics.iter().collect();
            report(&path, &diagnostics, &analysis.line_index);
            return Ok(Outcome::Rejected);
        }
        Err(e @ CoreError::Internal(_)) => return Err(e).context("code generation failed"),
    };

    let output = cli.output.unwrap_or_else(|| cli.input.with_extension("c"));
    write_output(&output, artifact.c_source.as_bytes())?;
    tracing::info!(output = %output.display(), bytes = artifact.c_source.len(), "wrote C");

    if cli.check_cc {
        toolchain::check_c_source(&output)
            .with_context(|| format!("generated C in {} did not compile", output.display()))?;
    }
    Ok(Outcome::Success)
}

/// Print diagnostics and a summary line to stderr.
fn report(path: &str, diagnostics: &[&Diagnostic], index: &LineIndex) {
    if diagnostics.is_empty() {
        return;
    }
    for diag in diagnostics {
        eprintln!("{}", render(diag, path, index));
    }
    let errors = diagnostics.iter().filter(|d| d.severity == Severity::Error).count();
    let warnings = diagnostics.len() - errors;
    eprintln!(
        "{path}: {errors} error{}, {warnings} warning{}",
        plural(errors),
        plural(warnings)
    );
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

fn emit_listing(output: Option<&Path>, text: &str) -> Result<()> {
    match output {
        Some(path) => write_output(path, text.as_bytes()),
        None => {
            print!("{text}");
            Ok(())
        }
    }
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
    }
    fs::write(path, bytes).with_context(|| format!("failed to write output file {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_defaults() {
        let cli = Cli::parse_from(["chillc", "unit.ch"]);
        assert_eq!(cli.input, PathBuf::from("unit.ch"));
        assert_eq!(cli.emit, Emit::C);
        assert_eq!(cli.output, None);
        assert_eq!(cli.timestamp, None);
        assert!(!cli.check_cc && !cli.no_main);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn timestamp_value_is_optional() {
        let cli = Cli::parse_from(["chillc", "unit.ch", "--timestamp"]);
        assert_eq!(cli.timestamp.as_deref(), Some("now"));
        let cli = Cli::parse_from(["chillc", "--timestamp", "2024-01-01", "unit.ch"]);
        assert_eq!(cli.timestamp.as_deref(), Some("2024-01-01"));
    }

    #[test]
    fn emit_and_verbosity_flags() {
        let cli = Cli::parse_from(["chillc", "-vv", "--emit", "symbols", "-o", "out.txt", "unit.ch"]);
        assert_eq!(cli.emit, Emit::Symbols);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.output, Some(PathBuf::from("out.txt")));
    }
}
