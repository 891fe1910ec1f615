//! Scope resolution.
//!
//! Builds the scope tree for a module, binds every declaration and
//! links every name use to its symbol. Declarations are hoisted per
//! scope before any use is resolved, so order within a scope does not
//! matter. Each name is looked up innermost-first; an inner
//! declaration shadows an outer one.

use std::collections::HashMap;

use crate::ast::*;
use crate::diagnostic::{codes, Diagnostic, DiagnosticKind, DiagnosticSink};
use crate::lexer::is_predefined;
use crate::modes::Mode;
use crate::span::Span;
use crate::suggest::did_you_mean;
use crate::symbols::{Declared, ScopeId, ScopeKind, SymbolId, SymbolKind, SymbolTable};

/// A name granted by another compilation unit.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalSymbol {
    pub name: String,
    pub kind: SymbolKind,
    pub mode: Option<Mode>,
    /// Granting module, or an empty string if it was unnamed.
    pub module: String,
}

/// Names other units grant, available to SEIZE.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Externals {
    symbols: HashMap<String, ExternalSymbol>,
}

impl Externals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, symbol: ExternalSymbol) {
        self.symbols.insert(symbol.name.clone(), symbol);
    }

    pub fn get(&self, name: &str) -> Option<&ExternalSymbol> {
        self.symbols.get(name)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl Extend<ExternalSymbol> for Externals {
    fn extend<T: IntoIterator<Item = ExternalSymbol>>(&mut self, iter: T) {
        for symbol in iter {
            self.insert(symbol);
        }
    }
}

impl FromIterator<ExternalSymbol> for Externals {
    fn from_iter<T: IntoIterator<Item = ExternalSymbol>>(iter: T) -> Self {
        let mut externals = Externals::new();
        externals.extend(iter);
        externals
    }
}

/// Resolve all names of `module`.
pub fn resolve(module: &Module, externals: &Externals, sink: &mut DiagnosticSink) -> SymbolTable {
    let _span = tracing::debug_span!("resolve").entered();
    let mut resolver = Resolver {
        table: SymbolTable::new(),
        externals,
        sink,
        item_scopes: HashMap::new(),
    };
    let root = resolver.table.alloc_scope(
        ScopeKind::Module,
        module.name.as_ref().map(|n| n.name.clone()),
        None,
        None,
        module.span,
    );
    if let Some(name) = &module.name {
        if let Some(id) = resolver.declare(root, name, SymbolKind::Module, module.span) {
            resolver.table.symbol_mut(id).owned_scope = Some(root);
            if let Some(end) = &module.end_name {
                if end.name == name.name {
                    resolver.table.record_reference(end.span, id);
                }
            }
        }
    }
    resolver.hoist(root, &module.items);
    resolver.walk(root, &module.items);
    resolver.table.finish();
    tracing::debug!(
        symbols = resolver.table.symbols().len(),
        scopes = resolver.table.scopes().len(),
        unresolved = resolver.table.unresolved().len(),
        "resolved"
    );
    resolver.table
}

struct Resolver<'a> {
    table: SymbolTable,
    externals: &'a Externals,
    sink: &'a mut DiagnosticSink,
    /// Scope owned by a procedure, process or region definition,
    /// keyed by the definition span.
    item_scopes: HashMap<Span, ScopeId>,
}

impl<'a> Resolver<'a> {
    fn declare(
        &mut self,
        scope: ScopeId,
        name: &Ident,
        kind: SymbolKind,
        decl_span: Span,
    ) -> Option<SymbolId> {
        match self.table.declare(scope, &name.name, kind, name.span, decl_span) {
            Declared::New(id) => Some(id),
            Declared::Duplicate { existing } => {
                self.duplicate(name, existing);
                None
            }
        }
    }

    fn duplicate(&mut self, name: &Ident, existing: SymbolId) {
        let prev = self.table.symbol(existing);
        let diag = Diagnostic::error(
            DiagnosticKind::DuplicateDeclaration,
            format!("`{}` is already declared in this scope", name.name),
            name.span,
        )
        .with_secondary_label(prev.def_span, format!("`{}` first declared here", prev.name));
        self.sink.push(diag);
    }

    // ---------------------------------------------------------------
    // declarations

    /// Bind every declaration of `items` in `scope`, then apply GRANTs.
    fn hoist(&mut self, scope: ScopeId, items: &[Item]) {
        for item in items {
            match item {
                Item::Seize(seize) => {
                    for name in &seize.names {
                        self.seize(scope, name);
                    }
                }
                Item::ModeDef(def) => {
                    if let Some(id) = self.declare(scope, &def.name, SymbolKind::Mode, def.span) {
                        self.table.symbol_mut(id).mode_def = Some(def.kind);
                    }
                    self.hoist_set_elements(scope, &def.mode);
                }
                Item::Dcl(dcl) => {
                    for name in &dcl.names {
                        self.declare(scope, name, SymbolKind::Variable, dcl.span);
                    }
                    self.hoist_set_elements(scope, &dcl.mode);
                }
                Item::Syn(syn) => {
                    self.declare(scope, &syn.name, SymbolKind::Synonym, syn.span);
                    if let Some(mode) = &syn.mode {
                        self.hoist_set_elements(scope, mode);
                    }
                }
                Item::Signal(signal) => {
                    self.declare(scope, &signal.name, SymbolKind::Signal, signal.span);
                    for mode in &signal.payload {
                        self.hoist_set_elements(scope, mode);
                    }
                }
                Item::Proc(proc) => {
                    self.hoist_owner(scope, &proc.name, SymbolKind::Procedure, ScopeKind::Procedure, proc.span);
                }
                Item::Process(process) => {
                    self.hoist_owner(scope, &process.name, SymbolKind::Process, ScopeKind::Process, process.span);
                }
                Item::Region(region) => {
                    let inner = self.hoist_owner(
                        scope,
                        &region.name,
                        SymbolKind::Region,
                        ScopeKind::Region,
                        region.span,
                    );
                    self.hoist(inner, &region.body);
                }
                Item::Grant(_) | Item::Stmt(_) => {}
            }
        }
        for item in items {
            if let Item::Grant(grant) = item {
                self.grant(scope, grant);
            }
        }
    }

    /// Declare a symbol that owns a scope and allocate that scope.
    fn hoist_owner(
        &mut self,
        scope: ScopeId,
        name: &Ident,
        kind: SymbolKind,
        scope_kind: ScopeKind,
        span: Span,
    ) -> ScopeId {
        let owner = self.declare(scope, name, kind, span);
        let inner = self
            .table
            .alloc_scope(scope_kind, Some(name.name.clone()), Some(scope), owner, span);
        self.item_scopes.insert(span, inner);
        inner
    }

    /// SET literals are declared in the scope of the mode that lists them.
    fn hoist_set_elements(&mut self, scope: ScopeId, mode: &ModeExpr) {
        match &mode.kind {
            ModeExprKind::Set(names) => {
                for name in names {
                    self.declare(scope, name, SymbolKind::SetElement, name.span);
                }
            }
            ModeExprKind::Powerset(inner) | ModeExprKind::Ref(inner) => {
                self.hoist_set_elements(scope, inner)
            }
            ModeExprKind::Struct(fields) => {
                for field in fields {
                    self.hoist_set_elements(scope, &field.mode);
                }
            }
            ModeExprKind::Array { index, elem } => {
                if let ArrayIndex::Mode(index) = index {
                    self.hoist_set_elements(scope, index);
                }
                self.hoist_set_elements(scope, elem);
            }
            ModeExprKind::Buffer { elem, .. } => self.hoist_set_elements(scope, elem),
            ModeExprKind::Proc { params, result } => {
                for (_, param) in params {
                    self.hoist_set_elements(scope, param);
                }
                if let Some(result) = result {
                    self.hoist_set_elements(scope, result);
                }
            }
            ModeExprKind::Named(_)
            | ModeExprKind::Range { .. }
            | ModeExprKind::Chars(_)
            | ModeExprKind::Bools(_)
            | ModeExprKind::Event => {}
        }
    }

    fn seize(&mut self, scope: ScopeId, name: &Ident) {
        let external = self.externals.get(&name.name).cloned();
        let kind = external.as_ref().map_or(SymbolKind::Variable, |e| e.kind);
        let Some(id) = self.declare(scope, name, kind, name.span) else {
            return;
        };
        let symbol = self.table.symbol_mut(id);
        symbol.seized = true;
        match external {
            Some(external) => {
                symbol.mode = Some(external.mode.unwrap_or(Mode::Unknown));
            }
            None => {
                symbol.mode = Some(Mode::Unknown);
                self.sink.push(
                    Diagnostic::warning(
                        DiagnosticKind::UnresolvedReference,
                        format!("no known module grants `{}`", name.name),
                        name.span,
                    )
                    .with_code(codes::UNSATISFIED_SEIZE)
                    .with_note("its mode is unknown, so uses of it are not checked"),
                );
            }
        }
    }

    fn grant(&mut self, scope: ScopeId, grant: &Grant) {
        let kind = self.table.scope(scope).kind;
        if !matches!(kind, ScopeKind::Module | ScopeKind::Region) {
            self.sink.push(Diagnostic::error(
                DiagnosticKind::SyntaxError,
                "GRANT is only allowed in a module or a region",
                grant.span,
            ));
            return;
        }
        let targets: Vec<SymbolId> = if grant.all {
            self.table
                .scope(scope)
                .symbols()
                .iter()
                .copied()
                .filter(|&id| self.table.symbol(id).kind != SymbolKind::Module)
                .collect()
        } else {
            let mut targets = Vec::new();
            for name in &grant.names {
                match self.table.scope(scope).lookup(&name.name) {
                    Some(id) => {
                        self.table.record_reference(name.span, id);
                        targets.push(id);
                    }
                    None => {
                        let what = if kind == ScopeKind::Region { "region" } else { "module" };
                        let mut diag = Diagnostic::error(
                            DiagnosticKind::UnresolvedReference,
                            format!("cannot grant `{}`: it is not declared in this {what}", name.name),
                            name.span,
                        );
                        let candidates = self.names_in(scope);
                        if let Some(help) = did_you_mean(&name.name, candidates) {
                            diag = diag.with_note(help);
                        }
                        self.sink.push(diag);
                        self.table.record_unresolved(name.span);
                    }
                }
            }
            targets
        };

        for id in targets {
            if kind == ScopeKind::Module {
                self.table.add_export(id);
                continue;
            }
            self.table.symbol_mut(id).granted = true;
            let Some(parent) = self.table.scope(scope).parent else {
                continue;
            };
            if let Declared::Duplicate { existing } = self.table.bind_alias(parent, id) {
                if existing != id {
                    let symbol = self.table.symbol(id);
                    let name = Ident {
                        name: symbol.name.clone(),
                        span: symbol.def_span,
                    };
                    self.duplicate(&name, existing);
                }
            }
        }
    }

    // ---------------------------------------------------------------
    // uses

    fn walk(&mut self, scope: ScopeId, items: &[Item]) {
        for item in items {
            match item {
                Item::Grant(_) | Item::Seize(_) => {}
                Item::ModeDef(def) => self.mode_expr(scope, &def.mode),
                Item::Dcl(dcl) => {
                    self.mode_expr(scope, &dcl.mode);
                    if let Some(init) = &dcl.init {
                        self.expr(scope, init);
                    }
                }
                Item::Syn(syn) => {
                    if let Some(mode) = &syn.mode {
                        self.mode_expr(scope, mode);
                    }
                    self.expr(scope, &syn.value);
                }
                Item::Signal(signal) => {
                    for mode in &signal.payload {
                        self.mode_expr(scope, mode);
                    }
                    if let Some(dest) = &signal.dest {
                        self.reference(scope, dest);
                    }
                }
                Item::Proc(proc) => {
                    let Some(&inner) = self.item_scopes.get(&proc.span) else {
                        continue;
                    };
                    self.params(inner, &proc.params);
                    if let Some(returns) = &proc.returns {
                        self.hoist_set_elements(inner, returns);
                        self.mode_expr(inner, returns);
                    }
                    self.hoist(inner, &proc.body);
                    self.walk(inner, &proc.body);
                    self.end_name(scope, &proc.name, proc.end_name.as_ref());
                }
                Item::Process(process) => {
                    let Some(&inner) = self.item_scopes.get(&process.span) else {
                        continue;
                    };
                    self.params(inner, &process.params);
                    self.hoist(inner, &process.body);
                    self.walk(inner, &process.body);
                    self.end_name(scope, &process.name, process.end_name.as_ref());
                }
                Item::Region(region) => {
                    let Some(&inner) = self.item_scopes.get(&region.span) else {
                        continue;
                    };
                    self.walk(inner, &region.body);
                    self.end_name(scope, &region.name, region.end_name.as_ref());
                }
                Item::Stmt(stmt) => self.stmt(scope, stmt),
            }
        }
    }

    fn params(&mut self, scope: ScopeId, params: &[Param]) {
        for param in params {
            self.hoist_set_elements(scope, &param.mode);
            self.mode_expr(scope, &param.mode);
            if let Some(id) = self.declare(scope, &param.name, SymbolKind::Variable, param.span) {
                self.table.symbol_mut(id).param_dir = Some(param.dir);
            }
        }
    }

    fn end_name(&mut self, scope: ScopeId, open: &Ident, end: Option<&Ident>) {
        let Some(end) = end else { return };
        if end.name != open.name {
            return;
        }
        if let Some(id) = self.table.declared_at(open.span) {
            debug_assert_eq!(self.table.symbol(id).scope, scope);
            self.table.record_reference(end.span, id);
        }
    }

    fn mode_expr(&mut self, scope: ScopeId, mode: &ModeExpr) {
        match &mode.kind {
            ModeExprKind::Named(name) => self.reference(scope, name),
            ModeExprKind::Range { base, lo, hi } => {
                if let Some(base) = base {
                    self.reference(scope, base);
                }
                self.expr(scope, lo);
                self.expr(scope, hi);
            }
            ModeExprKind::Set(_) | ModeExprKind::Event => {}
            ModeExprKind::Powerset(inner) | ModeExprKind::Ref(inner) => self.mode_expr(scope, inner),
            ModeExprKind::Chars(len) | ModeExprKind::Bools(len) => self.expr(scope, len),
            ModeExprKind::Struct(fields) => {
                for field in fields {
                    self.mode_expr(scope, &field.mode);
                }
            }
            ModeExprKind::Array { index, elem } => {
                match index {
                    ArrayIndex::Bounds(lo, hi) => {
                        self.expr(scope, lo);
                        self.expr(scope, hi);
                    }
                    ArrayIndex::Mode(index) => self.mode_expr(scope, index),
                }
                self.mode_expr(scope, elem);
            }
            ModeExprKind::Proc { params, result } => {
                for (_, param) in params {
                    self.mode_expr(scope, param);
                }
                if let Some(result) = result {
                    self.mode_expr(scope, result);
                }
            }
            ModeExprKind::Buffer { capacity, elem } => {
                if let Some(capacity) = capacity {
                    self.expr(scope, capacity);
                }
                self.mode_expr(scope, elem);
            }
        }
    }

    fn stmts(&mut self, scope: ScopeId, stmts: &[Stmt]) {
        for stmt in stmts {
            self.stmt(scope, stmt);
        }
    }

    fn stmt(&mut self, scope: ScopeId, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Assign { target, value } => {
                self.expr(scope, target);
                self.expr(scope, value);
            }
            StmtKind::Call(call) => self.expr(scope, call),
            StmtKind::If { arms, else_body } => {
                for (cond, body) in arms {
                    self.expr(scope, cond);
                    self.stmts(scope, body);
                }
                if let Some(body) = else_body {
                    self.stmts(scope, body);
                }
            }
            StmtKind::Case {
                selector,
                arms,
                else_body,
            } => {
                self.expr(scope, selector);
                for arm in arms {
                    for label in &arm.labels {
                        match label {
                            CaseLabel::Value(value) => self.expr(scope, value),
                            CaseLabel::Range(lo, hi) => {
                                self.expr(scope, lo);
                                self.expr(scope, hi);
                            }
                            CaseLabel::Any(_) => {}
                        }
                    }
                    self.stmts(scope, &arm.body);
                }
                if let Some(body) = else_body {
                    self.stmts(scope, body);
                }
            }
            StmtKind::DoWhile { cond, body } => {
                self.expr(scope, cond);
                self.stmts(scope, body);
            }
            StmtKind::DoFor {
                var,
                start,
                end,
                step,
                body,
                ..
            } => {
                self.expr(scope, start);
                self.expr(scope, end);
                if let Some(step) = step {
                    self.expr(scope, step);
                }
                let inner = self
                    .table
                    .alloc_scope(ScopeKind::Loop, None, Some(scope), None, stmt.span);
                self.declare(inner, var, SymbolKind::Variable, var.span);
                self.stmts(inner, body);
            }
            StmtKind::DoEver { body } => self.stmts(scope, body),
            StmtKind::Begin { body } => {
                let inner = self
                    .table
                    .alloc_scope(ScopeKind::Block, None, Some(scope), None, stmt.span);
                self.hoist(inner, body);
                self.walk(inner, body);
            }
            StmtKind::Exit | StmtKind::Return(None) | StmtKind::Stop(None) => {}
            StmtKind::Return(Some(value))
            | StmtKind::Result(value)
            | StmtKind::Stop(Some(value))
            | StmtKind::Delay(value)
            | StmtKind::Continue(value) => self.expr(scope, value),
            StmtKind::Send { target, args, dest } => {
                self.reference(scope, target);
                for arg in args {
                    self.expr(scope, arg);
                }
                if let Some(dest) = dest {
                    self.expr(scope, dest);
                }
            }
            StmtKind::ReceiveCase { alts, else_body } => {
                for alt in alts {
                    self.reference(scope, &alt.signal);
                    for binding in &alt.bindings {
                        self.reference(scope, binding);
                    }
                    if let Some(guard) = &alt.guard {
                        self.expr(scope, guard);
                    }
                    self.stmts(scope, &alt.body);
                }
                if let Some(body) = else_body {
                    self.stmts(scope, body);
                }
            }
            StmtKind::Start { process, args } => {
                self.reference(scope, process);
                for arg in args {
                    self.expr(scope, arg);
                }
            }
        }
    }

    fn expr(&mut self, scope: ScopeId, expr: &Expr) {
        match &expr.kind {
            ExprKind::Int { .. }
            | ExprKind::Bool(_)
            | ExprKind::Char(_)
            | ExprKind::Str(_)
            | ExprKind::Null
            | ExprKind::This => {}
            ExprKind::Name(name) => self.reference(scope, name),
            ExprKind::Binary { lhs, rhs, .. } => {
                self.expr(scope, lhs);
                self.expr(scope, rhs);
            }
            ExprKind::Unary { operand, .. } => self.expr(scope, operand),
            ExprKind::Call { callee, args } => {
                self.expr(scope, callee);
                for arg in args {
                    self.expr(scope, arg);
                }
            }
            ExprKind::Field { base, .. } => self.expr(scope, base),
            ExprKind::Index { base, index } => {
                self.expr(scope, base);
                self.expr(scope, index);
            }
            ExprKind::Deref(inner) | ExprKind::AddressOf(inner) | ExprKind::Receive(inner) => {
                self.expr(scope, inner)
            }
            ExprKind::Start { process, args } => {
                self.reference(scope, process);
                for arg in args {
                    self.expr(scope, arg);
                }
            }
            ExprKind::Duration { amount, .. } => self.expr(scope, amount),
            ExprKind::Tuple(elems) => {
                for elem in elems {
                    self.expr(scope, elem);
                }
            }
        }
    }

    /// Resolve one name use. Predefined names that no user declaration
    /// shadows resolve to the built-in and are not recorded.
    fn reference(&mut self, scope: ScopeId, name: &Ident) {
        if let Some(id) = self.table.lookup(scope, &name.name) {
            self.table.record_reference(name.span, id);
            return;
        }
        if is_predefined(&name.name) {
            return;
        }
        let mut diag = Diagnostic::error(
            DiagnosticKind::UnresolvedReference,
            format!("cannot find `{}` in this scope", name.name),
            name.span,
        );
        let candidates = self.names_in(scope);
        if let Some(help) = did_you_mean(&name.name, candidates) {
            diag = diag.with_note(help);
        }
        self.sink.push(diag);
        self.table.record_unresolved(name.span);
    }

    fn names_in(&self, scope: ScopeId) -> Vec<String> {
        self.table
            .visible(scope)
            .into_iter()
            .map(|id| self.table.symbol(id).name.clone())
            .collect()
    }
}
