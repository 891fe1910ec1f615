//! Editor queries over one analysed unit.
//!
//! Every query is a pure function of an `Analysis`; positions are
//! 0-based line/character pairs and results carry both the raw spans
//! and ranges ready for an editor.

use chill_core::ast::ModeDefKind;
use chill_core::diagnostic::Severity;
use chill_core::lexer::{Keyword, Token, TokenKind, TriviaKind, PREDEFINED_NAMES};
use chill_core::modes::Mode;
use chill_core::span::{LineIndex, Position, Span};
use chill_core::symbols::{ScopeId, Symbol, SymbolId, SymbolKind};
use chill_core::Analysis;

use crate::docs;

/// A line/character range, end exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

pub fn range_of(index: &LineIndex, span: Span) -> Range {
    Range {
        start: index.position(span.start),
        end: index.position(span.end),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionKind {
    Symbol(SymbolKind),
    Keyword,
    Predefined,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionItem {
    pub label: String,
    pub kind: CompletionKind,
    /// Mode or short signature.
    pub detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hover {
    /// Range of the identifier or keyword under the cursor.
    pub range: Range,
    /// `None` for keyword and predefined-name documentation.
    pub symbol: Option<SymbolId>,
    pub kind: Option<SymbolKind>,
    /// Declaration in CHILL-like notation, e.g. `DCL count INT`.
    pub signature: String,
    pub declaration: Option<Span>,
    /// Doc comment or keyword documentation.
    pub documentation: Option<String>,
    pub notes: Vec<String>,
}

impl Hover {
    /// Markdown text for the hover popup.
    pub fn contents(&self) -> String {
        let mut out = format!("```chill\n{}\n```", self.signature);
        if let Some(kind) = self.kind {
            out.push_str(&format!("\n\n*{kind}*"));
        }
        if let Some(doc) = &self.documentation {
            out.push_str("\n\n");
            out.push_str(doc);
        }
        for note in &self.notes {
            out.push_str("\n\n");
            out.push_str(note);
        }
        out
    }
}

/// Outline entry mirroring the scope tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSymbol {
    pub name: String,
    pub kind: SymbolKind,
    pub detail: Option<String>,
    /// Whole declaration.
    pub range: Range,
    /// Declaring identifier.
    pub selection_range: Range,
    pub children: Vec<DocumentSymbol>,
}

/// A diagnostic as an in-editor marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    pub range: Range,
    pub severity: Severity,
    pub code: &'static str,
    pub message: String,
    /// Secondary locations with their messages.
    pub related: Vec<(Range, String)>,
    pub notes: Vec<String>,
}

/// Read-only queries an editor asks about one unit.
pub trait QueryService {
    /// Candidates valid at `position`: visible symbols innermost scope
    /// first, then keywords, then predefined names, all filtered by
    /// the identifier prefix under the cursor.
    fn completions_at(&self, position: Position) -> Vec<CompletionItem>;

    fn hover_at(&self, position: Position) -> Option<Hover>;

    /// Declaring identifier of the symbol referenced or declared at
    /// `position`.
    fn definition_of(&self, position: Position) -> Option<Span>;

    /// Reference spans in discovery order, optionally preceded by the
    /// declaring identifier.
    fn references_of(&self, position: Position, include_declaration: bool) -> Vec<Span>;

    fn document_symbols(&self) -> Vec<DocumentSymbol>;

    /// Diagnostics in source order.
    fn diagnostics(&self) -> Vec<Marker>;
}

impl QueryService for Analysis {
    fn completions_at(&self, position: Position) -> Vec<CompletionItem> {
        let offset = self.line_index.offset(position);
        if in_comment_or_literal(self, offset) {
            return Vec::new();
        }
        let prefix = ident_prefix(&self.source, offset);
        let mut items = Vec::new();

        if !self.symbols.scopes().is_empty() {
            let scope = self.symbols.scope_at(offset);
            for id in self.symbols.visible(scope) {
                let sym = self.symbols.symbol(id);
                if sym.kind == SymbolKind::Module || !sym.name.starts_with(prefix) {
                    continue;
                }
                items.push(CompletionItem {
                    label: sym.name.clone(),
                    kind: CompletionKind::Symbol(sym.kind),
                    detail: sym.mode.as_ref().map(|m| describe_mode(sym, m)),
                });
            }
        }

        let upper = prefix.to_ascii_uppercase();
        let taken = |label: &str, items: &[CompletionItem]| items.iter().any(|i| i.label == label);
        for kw in Keyword::ALL {
            let label = kw.as_str();
            if label.starts_with(&upper) && !taken(label, &items) {
                items.push(CompletionItem {
                    label: label.to_string(),
                    kind: CompletionKind::Keyword,
                    detail: None,
                });
            }
        }
        for &name in PREDEFINED_NAMES {
            if name.starts_with(&upper) && !taken(name, &items) {
                items.push(CompletionItem {
                    label: name.to_string(),
                    kind: CompletionKind::Predefined,
                    detail: docs::predefined(name).map(str::to_string),
                });
            }
        }
        tracing::trace!(prefix, count = items.len(), "completions");
        items
    }

    fn hover_at(&self, position: Position) -> Option<Hover> {
        let offset = self.line_index.offset(position);
        if let Some((span, id)) = self.symbols.symbol_at(offset) {
            return Some(symbol_hover(self, span, id));
        }
        let token = token_at(&self.tokens, offset)?;
        let documentation = match &token.kind {
            TokenKind::Keyword(kw) => docs::keyword(*kw),
            TokenKind::Predefined(upper) => docs::predefined(upper),
            _ => None,
        }?;
        Some(Hover {
            range: range_of(&self.line_index, token.span),
            symbol: None,
            kind: None,
            signature: token.text.to_ascii_uppercase(),
            declaration: None,
            documentation: Some(documentation.to_string()),
            notes: Vec::new(),
        })
    }

    fn definition_of(&self, position: Position) -> Option<Span> {
        let offset = self.line_index.offset(position);
        let (_, id) = self.symbols.symbol_at(offset)?;
        Some(self.symbols.symbol(id).def_span)
    }

    fn references_of(&self, position: Position, include_declaration: bool) -> Vec<Span> {
        let offset = self.line_index.offset(position);
        let Some((_, id)) = self.symbols.symbol_at(offset) else {
            return Vec::new();
        };
        let sym = self.symbols.symbol(id);
        let mut out = Vec::with_capacity(sym.references.len() + 1);
        if include_declaration {
            out.push(sym.def_span);
        }
        out.extend(sym.references.iter().copied());
        out
    }

    fn document_symbols(&self) -> Vec<DocumentSymbol> {
        if self.symbols.scopes().is_empty() {
            return Vec::new();
        }
        let root = self.symbols.root();
        let children = outline(self, root);
        let module = self
            .symbols
            .scope(root)
            .symbols()
            .iter()
            .map(|&id| self.symbols.symbol(id))
            .find(|sym| sym.kind == SymbolKind::Module);
        match module {
            Some(module) => vec![outline_entry(self, module, children)],
            None => children,
        }
    }

    fn diagnostics(&self) -> Vec<Marker> {
        let mut diags: Vec<_> = self.diagnostics.iter().collect();
        diags.sort_by_key(|d| (d.primary.span.start, d.severity));
        diags
            .into_iter()
            .map(|d| Marker {
                range: range_of(&self.line_index, d.primary.span),
                severity: d.severity,
                code: d.code,
                message: d.message.clone(),
                related: d
                    .secondary
                    .iter()
                    .map(|label| {
                        let message = label.message.clone().unwrap_or_default();
                        (range_of(&self.line_index, label.span), message)
                    })
                    .collect(),
                notes: d.notes.clone(),
            })
            .collect()
    }
}

/// Identifier characters immediately before `offset`.
fn ident_prefix(source: &str, offset: u32) -> &str {
    let end = (offset as usize).min(source.len());
    let bytes = source.as_bytes();
    let mut start = end;
    while start > 0 && (bytes[start - 1].is_ascii_alphanumeric() || bytes[start - 1] == b'_') {
        start -= 1;
    }
    &source[start..end]
}

fn in_comment_or_literal(analysis: &Analysis, offset: u32) -> bool {
    let in_comment = analysis.trivia.iter().any(|t| match t.kind {
        TriviaKind::LineComment => t.span.start < offset && offset <= t.span.end,
        TriviaKind::BlockComment => t.span.start < offset && offset < t.span.end,
        _ => false,
    });
    in_comment
        || token_at(&analysis.tokens, offset).is_some_and(|t| {
            matches!(t.kind, TokenKind::Str(_) | TokenKind::Char(_))
                && t.span.start < offset
                && offset < t.span.end
        })
}

fn token_at(tokens: &[Token], offset: u32) -> Option<&Token> {
    let idx = tokens.partition_point(|t| t.span.start <= offset);
    tokens[..idx].last().filter(|t| t.span.contains(offset))
}

fn symbol_hover(analysis: &Analysis, span: Span, id: SymbolId) -> Hover {
    let sym = analysis.symbols.symbol(id);
    let mut notes = Vec::new();
    if sym.seized {
        match &sym.mode {
            Some(Mode::Unknown) | None => notes.push("Seized; no open unit grants it.".to_string()),
            Some(_) => notes.push("Seized from another unit.".to_string()),
        }
    }
    if sym.granted {
        notes.push("Granted.".to_string());
    }
    Hover {
        range: range_of(&analysis.line_index, span),
        symbol: Some(id),
        kind: Some(sym.kind),
        signature: signature(sym),
        declaration: Some(sym.decl_span),
        documentation: doc_comment(analysis, sym.decl_span.start),
        notes,
    }
}

/// Declaration of `sym` in CHILL-like notation.
fn signature(sym: &Symbol) -> String {
    let name = &sym.name;
    let mode = sym.mode.as_ref();
    match sym.kind {
        SymbolKind::Module => format!("{name}: MODULE"),
        SymbolKind::Region => format!("{name}: REGION"),
        SymbolKind::Mode => match (sym.mode_def, mode) {
            (Some(ModeDefKind::Newmode), Some(Mode::Novel { inner, .. })) => {
                format!("NEWMODE {name} = {inner}")
            }
            (Some(ModeDefKind::Newmode), Some(m)) => format!("NEWMODE {name} = {m}"),
            (Some(ModeDefKind::Synmode), Some(m)) => format!("SYNMODE {name} = {m}"),
            (_, Some(m)) => format!("{name} = {m}"),
            (_, None) => name.clone(),
        },
        SymbolKind::Variable => {
            let mode = mode.map(|m| format!(" {m}")).unwrap_or_default();
            match sym.param_dir {
                Some(dir) => format!("{name}{mode} {}", dir.as_str()),
                None => format!("DCL {name}{mode}"),
            }
        }
        SymbolKind::Synonym => match mode {
            Some(m) => format!("SYN {name} {m}"),
            None => format!("SYN {name}"),
        },
        SymbolKind::Procedure => match mode {
            Some(m) => format!("{name}: {m}"),
            None => format!("{name}: PROC"),
        },
        SymbolKind::Process | SymbolKind::Signal => match mode {
            Some(m) if !m.is_unknown() => m.to_string(),
            _ => format!("{} {name}", sym.kind.as_str().to_ascii_uppercase()),
        },
        SymbolKind::SetElement => match mode {
            Some(m) => format!("{name}: {m}"),
            None => name.clone(),
        },
    }
}

/// Mode shown next to a completion or outline entry.
fn describe_mode(sym: &Symbol, mode: &Mode) -> String {
    match (sym.kind, mode) {
        (SymbolKind::Mode, Mode::Novel { inner, .. }) => inner.to_string(),
        _ => mode.to_string(),
    }
}

/// Comment lines directly above the declaration starting at `start`.
/// A blank line or code on the comment's line ends the block.
fn doc_comment(analysis: &Analysis, start: u32) -> Option<String> {
    let mut anchor = start;
    // `DCL x`, `SYN k` and friends: the comment sits above the keyword.
    let idx = analysis.tokens.partition_point(|t| t.span.start < anchor);
    if let Some(prev) = idx.checked_sub(1).map(|i| &analysis.tokens[i]) {
        if matches!(
            prev.kind,
            TokenKind::Keyword(
                Keyword::Dcl | Keyword::Newmode | Keyword::Synmode | Keyword::Syn | Keyword::Signal
            )
        ) {
            anchor = prev.span.start;
        }
    }

    let trivia = &analysis.trivia;
    let mut i = trivia.partition_point(|t| t.span.end <= anchor);
    let mut expected_end = anchor;
    let mut lines = Vec::new();
    while i > 0 {
        let t = &trivia[i - 1];
        if t.span.end != expected_end {
            break;
        }
        match t.kind {
            TriviaKind::Whitespace if t.text.matches('\n').count() > 1 => break,
            TriviaKind::Whitespace => {}
            TriviaKind::LineComment | TriviaKind::BlockComment => {
                let line_start = analysis.source[..t.span.start as usize]
                    .rfind('\n')
                    .map_or(0, |n| n + 1);
                if !analysis.source[line_start..t.span.start as usize].trim().is_empty() {
                    break;
                }
                lines.push(comment_text(&t.text));
            }
            TriviaKind::Unknown => break,
        }
        expected_end = t.span.start;
        i -= 1;
    }
    if lines.is_empty() {
        return None;
    }
    lines.reverse();
    Some(lines.join("\n"))
}

fn comment_text(raw: &str) -> String {
    let body = if let Some(rest) = raw.strip_prefix("--") {
        rest
    } else {
        raw.trim_start_matches("/*").trim_end_matches("*/")
    };
    body.lines()
        .map(|line| line.trim().trim_start_matches('*').trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Entries for the symbols declared in `scope`. Anonymous scopes
/// (loops, blocks) are flattened into their parent.
fn outline(analysis: &Analysis, scope: ScopeId) -> Vec<DocumentSymbol> {
    let table = &analysis.symbols;
    let mut out: Vec<DocumentSymbol> = table
        .scope(scope)
        .symbols()
        .iter()
        .map(|&id| table.symbol(id))
        .filter(|sym| sym.scope == scope && sym.kind != SymbolKind::Module)
        .map(|sym| {
            let children = match sym.owned_scope {
                Some(inner) if inner != scope => outline(analysis, inner),
                _ => Vec::new(),
            };
            outline_entry(analysis, sym, children)
        })
        .collect();
    for &child in table.scope(scope).children() {
        if table.scope(child).owner.is_none() {
            out.extend(outline(analysis, child));
        }
    }
    out.sort_by_key(|entry| entry.selection_range.start);
    out
}

fn outline_entry(analysis: &Analysis, sym: &Symbol, children: Vec<DocumentSymbol>) -> DocumentSymbol {
    DocumentSymbol {
        name: sym.name.clone(),
        kind: sym.kind,
        detail: sym
            .mode
            .as_ref()
            .filter(|m| !m.is_unknown())
            .map(|m| describe_mode(sym, m)),
        range: range_of(&analysis.line_index, sym.decl_span),
        selection_range: range_of(&analysis.line_index, sym.def_span),
        children,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_stops_at_non_identifier() {
        assert_eq!(ident_prefix("x := cou", 8), "cou");
        assert_eq!(ident_prefix("x := ", 5), "");
        assert_eq!(ident_prefix("a_b1", 4), "a_b1");
        assert_eq!(ident_prefix("ab", 99), "ab");
    }

    #[test]
    fn comment_markers_are_stripped() {
        assert_eq!(comment_text("-- counts calls"), "counts calls");
        assert_eq!(comment_text("/* one\n * two */"), "one\ntwo");
    }
}
