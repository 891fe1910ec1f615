//! Pipeline entry points.
//!
//! `analyze` runs every front-end phase over one unit and returns an
//! immutable `Analysis`; it never fails, problems are diagnostics.
//! `compile_c` turns an error-free analysis into a C translation unit.

use crate::ast::Module;
use crate::codegen_c;
use crate::diagnostic::{Diagnostic, DiagnosticSink};
use crate::error::CoreError;
use crate::lexer::{self, Token, Trivia};
use crate::modecheck::{self, ModeTable};
use crate::parser;
use crate::resolve::{self, ExternalSymbol, Externals};
use crate::span::{FileId, LineIndex};
use crate::symbols::SymbolTable;

/// Inputs to analysis beyond the source text.
#[derive(Debug, Clone, Default)]
pub struct AnalysisOptions {
    /// Names granted by other units, used to satisfy SEIZE.
    pub externals: Externals,
}

/// Options for C generation.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Source file name recorded in the provenance comment.
    pub source_name: String,
    /// Generation timestamp; omitted from the output when `None` so
    /// that the core stays deterministic.
    pub timestamp: Option<String>,
    pub compiler_version: String,
    /// Emit `main`. Without it the unit exports `chill_init_<module>`.
    pub emit_main: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            source_name: "<input>".to_string(),
            timestamp: None,
            compiler_version: env!("CARGO_PKG_VERSION").to_string(),
            emit_main: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompilationArtifact {
    pub c_source: String,
}

/// Everything known about one analysed unit.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub file_id: FileId,
    pub source: String,
    pub line_index: LineIndex,
    pub tokens: Vec<Token>,
    pub trivia: Vec<Trivia>,
    /// Best-effort AST; `None` only for a unit without tokens.
    pub module: Option<Module>,
    pub symbols: SymbolTable,
    pub modes: ModeTable,
    pub diagnostics: DiagnosticSink,
}

impl Analysis {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }

    /// Module name, or an empty string for an unnamed unit.
    pub fn module_name(&self) -> String {
        self.module
            .as_ref()
            .and_then(|m| m.name.as_ref())
            .map(|n| n.name.clone())
            .unwrap_or_default()
    }

    /// Granted symbols, in grant order, as other units see them.
    pub fn exports(&self) -> Vec<ExternalSymbol> {
        let module = self.module_name();
        self.symbols
            .exports()
            .iter()
            .map(|&id| {
                let sym = self.symbols.symbol(id);
                ExternalSymbol {
                    name: sym.name.clone(),
                    kind: sym.kind,
                    mode: sym.mode.clone(),
                    module: module.clone(),
                }
            })
            .collect()
    }
}

/// Run lexing, parsing, name resolution and mode checking.
pub fn analyze(file_id: FileId, source: &str, options: &AnalysisOptions) -> Analysis {
    let _span = tracing::info_span!("analyze", file = file_id.0).entered();
    let lex = lexer::lex(file_id, source);
    let tokens = lex.tokens.clone();
    let trivia = lex.trivia.clone();
    let parse = parser::parse_tokens(file_id, lex);

    let mut sink = DiagnosticSink::new();
    sink.extend(parse.diagnostics);
    let (symbols, modes) = match &parse.module {
        Some(module) => {
            let mut symbols = resolve::resolve(module, &options.externals, &mut sink);
            let modes = modecheck::check(module, &mut symbols, &mut sink);
            (symbols, modes)
        }
        None => (SymbolTable::new(), ModeTable::default()),
    };
    tracing::debug!(
        tokens = tokens.len(),
        symbols = symbols.symbols().len(),
        errors = sink.error_count(),
        warnings = sink.warning_count(),
        "analysis finished"
    );
    Analysis {
        file_id,
        source: source.to_string(),
        line_index: LineIndex::new(source),
        tokens,
        trivia,
        module: parse.module,
        symbols,
        modes,
        diagnostics: sink,
    }
}

/// Generate C for an analysed unit. Refuses when any error diagnostic
/// exists; the error carries every diagnostic of the unit.
pub fn compile_c(
    analysis: &Analysis,
    options: &CompileOptions,
) -> Result<CompilationArtifact, CoreError> {
    let _span = tracing::info_span!("compile_c", source = %options.source_name).entered();
    if analysis.has_errors() {
        return Err(CoreError::from_diagnostics(all_diagnostics(analysis, Vec::new())));
    }
    let module = analysis
        .module
        .as_ref()
        .ok_or(CoreError::internal("error-free analysis without a module"))?;
    match codegen_c::generate(module, &analysis.symbols, &analysis.modes, options) {
        Ok(c_source) => Ok(CompilationArtifact { c_source }),
        Err(extra) => Err(CoreError::from_diagnostics(all_diagnostics(analysis, extra))),
    }
}

fn all_diagnostics(analysis: &Analysis, extra: Vec<Diagnostic>) -> Vec<Diagnostic> {
    let mut sink = analysis.diagnostics.clone();
    sink.extend(extra);
    sink.grouped().into_iter().cloned().collect()
}

/// Analyse and compile in one step.
pub fn compile_source(
    file_id: FileId,
    source: &str,
    analysis_options: &AnalysisOptions,
    options: &CompileOptions,
) -> Result<CompilationArtifact, CoreError> {
    let analysis = analyze(file_id, source, analysis_options);
    compile_c(&analysis, options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analysis_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Analysis>();
    }

    #[test]
    fn empty_unit_has_no_module() {
        let analysis = analyze(FileId(0), "  -- nothing here\n", &AnalysisOptions::default());
        assert!(analysis.module.is_none());
        assert!(compile_c(&analysis, &CompileOptions::default()).is_err());
    }

    #[test]
    fn exports_follow_grant_order() {
        let src = "m: MODULE\n  GRANT b, a;\n  DCL a INT;\n  DCL b BOOL;\nEND m;\n";
        let analysis = analyze(FileId(0), src, &AnalysisOptions::default());
        assert!(!analysis.has_errors(), "{:?}", analysis.diagnostics);
        let names: Vec<String> = analysis.exports().into_iter().map(|e| e.name).collect();
        assert_eq!(names, ["b", "a"]);
        assert_eq!(analysis.module_name(), "m");
    }
}
