//! Scope and symbol arenas.
//!
//! Scopes and symbols live in two vectors addressed by `ScopeId` and
//! `SymbolId`. A scope keeps a non-owning index to its parent, so
//! lookups walk outwards without ownership cycles.

use std::collections::HashMap;
use std::fmt;

use crate::ast::{ModeDefKind, ParamDir};
use crate::modes::Mode;
use crate::span::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    Module,
    Procedure,
    Process,
    Region,
    Block,
    Loop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Module,
    Mode,
    Variable,
    Procedure,
    Process,
    Signal,
    Synonym,
    SetElement,
    Region,
}

impl SymbolKind {
    /// Human-readable description used in diagnostics and hover text.
    pub fn as_str(self) -> &'static str {
        match self {
            SymbolKind::Module => "module",
            SymbolKind::Mode => "mode",
            SymbolKind::Variable => "variable",
            SymbolKind::Procedure => "procedure",
            SymbolKind::Process => "process",
            SymbolKind::Signal => "signal",
            SymbolKind::Synonym => "synonym",
            SymbolKind::SetElement => "set element",
            SymbolKind::Region => "region",
        }
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub id: SymbolId,
    pub name: String,
    pub kind: SymbolKind,
    /// Scope the symbol was declared in.
    pub scope: ScopeId,
    /// Span of the declaring identifier.
    pub def_span: Span,
    /// Span of the whole declaration.
    pub decl_span: Span,
    /// Reference spans in discovery order.
    pub references: Vec<Span>,
    /// Declared or canonical mode, filled in by the mode checker.
    pub mode: Option<Mode>,
    /// Scope owned by a procedure, process, region or module symbol.
    pub owned_scope: Option<ScopeId>,
    pub param_dir: Option<ParamDir>,
    pub mode_def: Option<ModeDefKind>,
    pub granted: bool,
    pub seized: bool,
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub id: ScopeId,
    pub kind: ScopeKind,
    pub name: Option<String>,
    pub owner: Option<SymbolId>,
    pub parent: Option<ScopeId>,
    pub span: Span,
    symbols: HashMap<String, SymbolId>,
    /// Declaration order, including names bound from elsewhere.
    order: Vec<SymbolId>,
    children: Vec<ScopeId>,
}

impl Scope {
    /// Lookup within this scope only.
    pub fn lookup(&self, name: &str) -> Option<SymbolId> {
        self.symbols.get(name).copied()
    }

    pub fn symbols(&self) -> &[SymbolId] {
        &self.order
    }

    pub fn children(&self) -> &[ScopeId] {
        &self.children
    }
}

/// Result of binding a name in a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Declared {
    New(SymbolId),
    /// The name already exists in that exact scope.
    Duplicate { existing: SymbolId },
}

/// Owner for all scopes and symbols of one analysis.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
    symbols: Vec<Symbol>,
    /// Identifier span of a reference to the symbol it resolves to.
    resolutions: HashMap<Span, SymbolId>,
    /// Identifier span of a declaration to its symbol.
    declarations: HashMap<Span, SymbolId>,
    unresolved: Vec<Span>,
    /// Module-level GRANTs, in grant order.
    exports: Vec<SymbolId>,
    /// Sorted (span, symbol) pairs for position queries.
    index: Vec<(Span, SymbolId)>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc_scope(
        &mut self,
        kind: ScopeKind,
        name: Option<String>,
        parent: Option<ScopeId>,
        owner: Option<SymbolId>,
        span: Span,
    ) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            id,
            kind,
            name,
            owner,
            parent,
            span,
            symbols: HashMap::new(),
            order: Vec::new(),
            children: Vec::new(),
        });
        if let Some(parent) = parent {
            self.scopes[parent.0 as usize].children.push(id);
        }
        if let Some(owner) = owner {
            self.symbols[owner.0 as usize].owned_scope = Some(id);
        }
        id
    }

    /// Root (module) scope. Only valid once a scope was allocated.
    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    pub fn scopes(&self) -> &[Scope] {
        &self.scopes
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0 as usize]
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.0 as usize]
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// Declare a new symbol in `scope`.
    pub fn declare(
        &mut self,
        scope: ScopeId,
        name: &str,
        kind: SymbolKind,
        def_span: Span,
        decl_span: Span,
    ) -> Declared {
        if let Some(existing) = self.scope(scope).lookup(name) {
            return Declared::Duplicate { existing };
        }
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(Symbol {
            id,
            name: name.to_string(),
            kind,
            scope,
            def_span,
            decl_span,
            references: Vec::new(),
            mode: None,
            owned_scope: None,
            param_dir: None,
            mode_def: None,
            granted: false,
            seized: false,
        });
        let sc = &mut self.scopes[scope.0 as usize];
        sc.symbols.insert(name.to_string(), id);
        sc.order.push(id);
        self.declarations.insert(def_span, id);
        Declared::New(id)
    }

    /// Make an existing symbol visible in another scope under its name.
    pub fn bind_alias(&mut self, scope: ScopeId, symbol: SymbolId) -> Declared {
        let name = self.symbol(symbol).name.clone();
        if let Some(existing) = self.scope(scope).lookup(&name) {
            return Declared::Duplicate { existing };
        }
        let sc = &mut self.scopes[scope.0 as usize];
        sc.symbols.insert(name, symbol);
        sc.order.push(symbol);
        Declared::New(symbol)
    }

    /// Innermost-first lookup.
    pub fn lookup(&self, mut scope: ScopeId, name: &str) -> Option<SymbolId> {
        loop {
            let sc = self.scope(scope);
            if let Some(id) = sc.lookup(name) {
                return Some(id);
            }
            scope = sc.parent?;
        }
    }

    pub fn record_reference(&mut self, span: Span, symbol: SymbolId) {
        self.resolutions.insert(span, symbol);
        self.symbols[symbol.0 as usize].references.push(span);
    }

    pub fn record_unresolved(&mut self, span: Span) {
        self.unresolved.push(span);
    }

    /// Symbol a reference identifier resolved to.
    pub fn resolved(&self, span: Span) -> Option<SymbolId> {
        self.resolutions.get(&span).copied()
    }

    /// Symbol declared by the identifier at `span`.
    pub fn declared_at(&self, span: Span) -> Option<SymbolId> {
        self.declarations.get(&span).copied()
    }

    /// Resolution or declaration for an identifier span.
    pub fn symbol_for(&self, span: Span) -> Option<SymbolId> {
        self.resolved(span).or_else(|| self.declared_at(span))
    }

    pub fn add_export(&mut self, symbol: SymbolId) {
        if !self.exports.contains(&symbol) {
            self.exports.push(symbol);
        }
        self.symbols[symbol.0 as usize].granted = true;
    }

    pub fn exports(&self) -> &[SymbolId] {
        &self.exports
    }

    pub fn unresolved(&self) -> &[Span] {
        &self.unresolved
    }

    /// Names visible from `scope`, innermost first, shadowed names
    /// omitted. Within a scope, declaration order.
    pub fn visible(&self, scope: ScopeId) -> Vec<SymbolId> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        let mut current = Some(scope);
        while let Some(id) = current {
            let sc = self.scope(id);
            for &sym in &sc.order {
                let name = &self.symbol(sym).name;
                if seen.insert(name.clone()) {
                    out.push(sym);
                }
            }
            current = sc.parent;
        }
        out
    }

    /// Build the position index. Called once resolution is complete.
    pub fn finish(&mut self) {
        let mut index: Vec<(Span, SymbolId)> = self
            .declarations
            .iter()
            .chain(self.resolutions.iter())
            .map(|(span, sym)| (*span, *sym))
            .collect();
        index.sort_by_key(|(span, _)| (span.start, span.end));
        index.dedup_by_key(|(span, _)| *span);
        self.index = index;
    }

    /// Identifier (declaration or reference) covering `offset`.
    pub fn symbol_at(&self, offset: u32) -> Option<(Span, SymbolId)> {
        let idx = self.index.partition_point(|(span, _)| span.start <= offset);
        self.index[..idx]
            .iter()
            .rev()
            .take(4)
            .find(|(span, _)| span.contains(offset))
            .copied()
    }

    /// Deepest scope whose span covers `offset`.
    pub fn scope_at(&self, offset: u32) -> ScopeId {
        let mut current = self.root();
        'descend: loop {
            for &child in self.scope(current).children() {
                let span = self.scope(child).span;
                if span.start <= offset && offset <= span.end {
                    current = child;
                    continue 'descend;
                }
            }
            return current;
        }
    }

    /// Nearest enclosing scope of the given kind, starting at `scope`.
    pub fn enclosing(&self, mut scope: ScopeId, kind: ScopeKind) -> Option<ScopeId> {
        loop {
            let sc = self.scope(scope);
            if sc.kind == kind {
                return Some(scope);
            }
            scope = sc.parent?;
        }
    }

    /// Scope nesting depth of a symbol's declaring scope.
    pub fn depth(&self, mut scope: ScopeId) -> usize {
        let mut depth = 0;
        while let Some(parent) = self.scope(scope).parent {
            depth += 1;
            scope = parent;
        }
        depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::FileId;

    fn sp(start: u32, end: u32) -> Span {
        Span::new(FileId(0), start, end)
    }

    #[test]
    fn duplicate_in_same_scope_only() {
        let mut table = SymbolTable::new();
        let root = table.alloc_scope(ScopeKind::Module, None, None, None, sp(0, 100));
        let inner = table.alloc_scope(ScopeKind::Block, None, Some(root), None, sp(10, 20));
        let a = table.declare(root, "a", SymbolKind::Variable, sp(1, 2), sp(1, 2));
        assert!(matches!(a, Declared::New(_)));
        let dup = table.declare(root, "a", SymbolKind::Variable, sp(3, 4), sp(3, 4));
        assert!(matches!(dup, Declared::Duplicate { .. }));
        let shadow = table.declare(inner, "a", SymbolKind::Variable, sp(11, 12), sp(11, 12));
        let Declared::New(shadow) = shadow else {
            panic!("shadowing must be allowed");
        };
        assert_eq!(table.lookup(inner, "a"), Some(shadow));
        assert_eq!(table.visible(inner), vec![shadow]);
    }

    #[test]
    fn position_index() {
        let mut table = SymbolTable::new();
        let root = table.alloc_scope(ScopeKind::Module, None, None, None, sp(0, 100));
        let Declared::New(x) = table.declare(root, "x", SymbolKind::Variable, sp(5, 6), sp(0, 10))
        else {
            panic!()
        };
        table.record_reference(sp(30, 31), x);
        table.finish();
        assert_eq!(table.symbol_at(30), Some((sp(30, 31), x)));
        assert_eq!(table.symbol_at(5), Some((sp(5, 6), x)));
        assert_eq!(table.symbol_at(20), None);
        assert_eq!(table.symbol(x).references, vec![sp(30, 31)]);
    }
}
