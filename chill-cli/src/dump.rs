//! `--emit tokens` and `--emit symbols` debug listings.

use std::fmt::Write as _;

use chill_core::lexer::{Token, TokenKind};
use chill_core::symbols::ScopeId;
use chill_core::Analysis;

fn token_kind_name(kind: &TokenKind) -> &'static str {
    match kind {
        TokenKind::Keyword(_) => "Keyword",
        TokenKind::Reserved(_) => "Reserved",
        TokenKind::Predefined(_) => "Predefined",
        TokenKind::Ident(_) => "Ident",
        TokenKind::Int { .. } => "Int",
        TokenKind::Str(_) => "Str",
        TokenKind::Char(_) => "Char",
        TokenKind::Plus => "Plus",
        TokenKind::Minus => "Minus",
        TokenKind::Star => "Star",
        TokenKind::Slash => "Slash",
        TokenKind::Concat => "Concat",
        TokenKind::Eq => "Eq",
        TokenKind::Ne => "Ne",
        TokenKind::Lt => "Lt",
        TokenKind::Le => "Le",
        TokenKind::Gt => "Gt",
        TokenKind::Ge => "Ge",
        TokenKind::Assign => "Assign",
        TokenKind::LParen => "LParen",
        TokenKind::RParen => "RParen",
        TokenKind::LBracket => "LBracket",
        TokenKind::RBracket => "RBracket",
        TokenKind::Comma => "Comma",
        TokenKind::Semicolon => "Semicolon",
        TokenKind::Colon => "Colon",
        TokenKind::Dot => "Dot",
        TokenKind::Arrow => "Arrow",
        TokenKind::Eof => "Eof",
    }
}

fn token_extra(kind: &TokenKind) -> Option<String> {
    match kind {
        TokenKind::Int { value, radix } => Some(format!("value={value} radix={}", radix.base())),
        TokenKind::Str(value) => Some(format!("value={value:?}")),
        TokenKind::Char(c) => Some(format!("value={c:?}")),
        _ => None,
    }
}

/// One line per token: `line:col Kind "text" [value]`, 1-based.
pub fn tokens(analysis: &Analysis) -> String {
    let mut out = String::new();
    for Token { kind, text, pos, .. } in &analysis.tokens {
        let _ = write!(out, "{}:{} {} {:?}", pos.line + 1, pos.character + 1, token_kind_name(kind), text);
        if let Some(extra) = token_extra(kind) {
            let _ = write!(out, " {extra}");
        }
        out.push('\n');
    }
    out
}

/// The scope tree with each scope's symbols, modes and reference counts.
pub fn symbols(analysis: &Analysis) -> String {
    let mut out = String::new();
    if !analysis.symbols.scopes().is_empty() {
        scope(analysis, analysis.symbols.root(), 0, &mut out);
    }
    out
}

fn scope(analysis: &Analysis, id: ScopeId, depth: usize, out: &mut String) {
    let table = &analysis.symbols;
    let sc = table.scope(id);
    let indent = "  ".repeat(depth);
    let _ = writeln!(
        out,
        "{indent}scope {:?} {}",
        sc.kind,
        sc.name.as_deref().unwrap_or("<anonymous>")
    );
    for &sym_id in sc.symbols() {
        let sym = table.symbol(sym_id);
        let pos = analysis.line_index.position(sym.def_span.start);
        let mode = sym.mode.as_ref().map(|m| format!(" : {m}")).unwrap_or_default();
        let mut flags = String::new();
        if sym.scope != id {
            flags.push_str(" [bound]");
        }
        if sym.granted {
            flags.push_str(" [granted]");
        }
        if sym.seized {
            flags.push_str(" [seized]");
        }
        let _ = writeln!(
            out,
            "{indent}  {} {}{mode} @{}:{} refs={}{flags}",
            sym.kind,
            sym.name,
            pos.line + 1,
            pos.character + 1,
            sym.references.len()
        );
    }
    for &child in sc.children() {
        scope(analysis, child, depth + 1, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chill_core::span::FileId;
    use chill_core::{analyze, AnalysisOptions};

    #[test]
    fn token_listing_is_one_based() {
        let analysis = analyze(FileId(0), "m: MODULE\nDCL x INT := H'FF';\nEND m;\n", &AnalysisOptions::default());
        let listing = tokens(&analysis);
        let mut lines = listing.lines();
        assert_eq!(lines.next(), Some("1:1 Ident \"m\""));
        assert!(listing.contains("2:14 Int \"H'FF'\" value=255 radix=16"), "{listing}");
    }

    #[test]
    fn symbol_listing_nests_scopes() {
        let src = "m: MODULE\n  p: PROC ();\n    DCL n INT;\n  END p;\nEND m;\n";
        let analysis = analyze(FileId(0), src, &AnalysisOptions::default());
        let listing = symbols(&analysis);
        assert!(listing.starts_with("scope Module m\n"), "{listing}");
        assert!(listing.contains("\n  procedure p : PROC() @2:3 refs=1\n"), "{listing}");
        assert!(listing.contains("\n  scope Procedure p\n    variable n : INT @3:9 refs=0\n"), "{listing}");
    }
}
