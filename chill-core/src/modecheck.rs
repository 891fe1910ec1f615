//! Mode checking.
//!
//! Canonicalises every mode definition (detecting alias cycles),
//! assigns a mode to every declared symbol and every expression, and
//! reports incompatible uses. Results are side tables keyed by
//! `ExprId`; symbol modes are written back into the `SymbolTable`.

use std::collections::{HashMap, HashSet};

use crate::ast::*;
use crate::diagnostic::{codes, Diagnostic, DiagnosticKind, DiagnosticSink};
use crate::lexer::is_predefined;
use crate::modes::{compatible, Mode, Primitive, MAX_ARRAY_LENGTH, MAX_SMALL_CARDINALITY};
use crate::span::Span;
use crate::suggest::did_you_mean;
use crate::symbols::{SymbolId, SymbolKind, SymbolTable};

/// Predefined routines the compiler understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    WriteText,
    Num,
    Succ,
    Pred,
    Abs,
    Size,
    Length,
    Upper,
    Lower,
    Card,
    Max,
    Min,
    Incl,
    Excl,
}

impl Builtin {
    pub fn from_name(upper: &str) -> Option<Builtin> {
        Some(match upper {
            "WRITETEXT" => Builtin::WriteText,
            "NUM" => Builtin::Num,
            "SUCC" => Builtin::Succ,
            "PRED" => Builtin::Pred,
            "ABS" => Builtin::Abs,
            "SIZE" => Builtin::Size,
            "LENGTH" => Builtin::Length,
            "UPPER" => Builtin::Upper,
            "LOWER" => Builtin::Lower,
            "CARD" => Builtin::Card,
            "MAX" => Builtin::Max,
            "MIN" => Builtin::Min,
            "INCL" => Builtin::Incl,
            "EXCL" => Builtin::Excl,
            _ => return None,
        })
    }
}

/// What a `name(args)` expression turned out to be.
#[derive(Debug, Clone, PartialEq)]
pub enum CallKind {
    Procedure,
    /// Array, string or bit-string element access.
    Index,
    Builtin(Builtin),
    /// Mode conversion `m(value)`.
    Conversion(Mode),
}

/// One piece of a WRITETEXT format string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatPiece {
    Text(String),
    Newline,
    /// `%C`: the next argument in its default representation.
    Value,
}

/// Split a WRITETEXT format string. Returns the offending directive
/// character on error.
pub fn parse_format(format: &str) -> Result<Vec<FormatPiece>, char> {
    let mut pieces = Vec::new();
    let mut text = String::new();
    let mut chars = format.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            text.push(c);
            continue;
        }
        match chars.next() {
            Some('%') => text.push('%'),
            Some(d @ ('/' | 'C' | 'c')) => {
                if !text.is_empty() {
                    pieces.push(FormatPiece::Text(std::mem::take(&mut text)));
                }
                pieces.push(if d == '/' {
                    FormatPiece::Newline
                } else {
                    FormatPiece::Value
                });
            }
            Some(other) => return Err(other),
            None => return Err('%'),
        }
    }
    if !text.is_empty() {
        pieces.push(FormatPiece::Text(text));
    }
    Ok(pieces)
}

/// Side tables produced by the mode checker.
#[derive(Debug, Clone, Default)]
pub struct ModeTable {
    modes: HashMap<ExprId, Mode>,
    consts: HashMap<ExprId, i64>,
    calls: HashMap<ExprId, CallKind>,
}

impl ModeTable {
    pub fn mode(&self, id: ExprId) -> Option<&Mode> {
        self.modes.get(&id)
    }

    /// Folded value of a case label, array bound or other constant
    /// expression the checker needed.
    pub fn const_value(&self, id: ExprId) -> Option<i64> {
        self.consts.get(&id).copied()
    }

    pub fn call_kind(&self, id: ExprId) -> Option<&CallKind> {
        self.calls.get(&id)
    }
}

/// Check `module`, updating symbol modes in `table`.
pub fn check(module: &Module, table: &mut SymbolTable, sink: &mut DiagnosticSink) -> ModeTable {
    let _span = tracing::debug_span!("modecheck").entered();
    let module_name = module
        .name
        .as_ref()
        .map(|n| n.name.clone())
        .unwrap_or_default();
    let mut checker = Checker {
        table,
        sink,
        out: ModeTable::default(),
        module_name,
        mode_defs: HashMap::new(),
        syn_defs: HashMap::new(),
        element_owner: HashMap::new(),
        ordinals: HashMap::new(),
        signal_dest: HashMap::new(),
        mode_state: HashMap::new(),
        mode_stack: Vec::new(),
        cyclic: HashSet::new(),
        syn_state: HashMap::new(),
        ctx: Ctx::default(),
    };
    checker.collect(&module.items);
    checker.declare_items(&module.items);
    checker.check_items(&module.items);
    tracing::debug!(exprs = checker.out.modes.len(), "mode check finished");
    checker.out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    InProgress,
    Done,
}

#[derive(Debug, Clone, Default)]
struct Ctx {
    /// Inside a procedure: its result mode, if it has one.
    proc_result: Option<Option<Mode>>,
    /// Innermost enclosing process.
    process: Option<SymbolId>,
    /// Directly in a process body, not in a nested procedure.
    in_process_body: bool,
    loops: usize,
}

struct Checker<'a, 't> {
    table: &'t mut SymbolTable,
    sink: &'t mut DiagnosticSink,
    out: ModeTable,
    module_name: String,
    mode_defs: HashMap<SymbolId, &'a ModeDef>,
    syn_defs: HashMap<SymbolId, &'a SynDef>,
    /// SET literal of a top-level NEWMODE/SYNMODE SET to that mode.
    element_owner: HashMap<SymbolId, SymbolId>,
    ordinals: HashMap<SymbolId, i64>,
    /// Signal to its `TO` process, when it has one.
    signal_dest: HashMap<SymbolId, Option<SymbolId>>,
    mode_state: HashMap<SymbolId, State>,
    mode_stack: Vec<SymbolId>,
    cyclic: HashSet<SymbolId>,
    syn_state: HashMap<SymbolId, State>,
    ctx: Ctx,
}

impl<'a, 't> Checker<'a, 't> {
    fn error(&mut self, kind: DiagnosticKind, message: impl Into<String>, span: Span) {
        self.sink.push(Diagnostic::error(kind, message, span));
    }

    fn mismatch(&mut self, message: impl Into<String>, span: Span) {
        self.error(DiagnosticKind::ModeMismatch, message, span);
    }

    // ---------------------------------------------------------------
    // collection

    fn collect(&mut self, items: &'a [Item]) {
        for item in items {
            match item {
                Item::ModeDef(def) => {
                    if let Some(id) = self.table.declared_at(def.name.span) {
                        self.mode_defs.insert(id, def);
                        if let ModeExprKind::Set(names) = &def.mode.kind {
                            for name in names {
                                if let Some(elem) = self.table.declared_at(name.span) {
                                    self.element_owner.insert(elem, id);
                                }
                            }
                        }
                    }
                    self.collect_ordinals(&def.mode);
                }
                Item::Dcl(dcl) => self.collect_ordinals(&dcl.mode),
                Item::Syn(syn) => {
                    if let Some(id) = self.table.declared_at(syn.name.span) {
                        self.syn_defs.insert(id, syn);
                    }
                    if let Some(mode) = &syn.mode {
                        self.collect_ordinals(mode);
                    }
                }
                Item::Signal(signal) => {
                    for mode in &signal.payload {
                        self.collect_ordinals(mode);
                    }
                    if let Some(id) = self.table.declared_at(signal.name.span) {
                        let dest = signal.dest.as_ref().and_then(|d| self.table.resolved(d.span));
                        self.signal_dest.insert(id, dest);
                    }
                }
                Item::Proc(proc) => {
                    for param in &proc.params {
                        self.collect_ordinals(&param.mode);
                    }
                    if let Some(returns) = &proc.returns {
                        self.collect_ordinals(returns);
                    }
                    self.collect(&proc.body);
                }
                Item::Process(process) => {
                    for param in &process.params {
                        self.collect_ordinals(&param.mode);
                    }
                    self.collect(&process.body);
                }
                Item::Region(region) => self.collect(&region.body),
                Item::Stmt(stmt) => self.collect_stmt(stmt),
                Item::Grant(_) | Item::Seize(_) => {}
            }
        }
    }

    fn collect_stmt(&mut self, stmt: &'a Stmt) {
        match &stmt.kind {
            StmtKind::If { arms, else_body } => {
                for (_, body) in arms {
                    self.collect_stmts(body);
                }
                if let Some(body) = else_body {
                    self.collect_stmts(body);
                }
            }
            StmtKind::Case { arms, else_body, .. } => {
                for arm in arms {
                    self.collect_stmts(&arm.body);
                }
                if let Some(body) = else_body {
                    self.collect_stmts(body);
                }
            }
            StmtKind::ReceiveCase { alts, else_body } => {
                for alt in alts {
                    self.collect_stmts(&alt.body);
                }
                if let Some(body) = else_body {
                    self.collect_stmts(body);
                }
            }
            StmtKind::DoWhile { body, .. }
            | StmtKind::DoFor { body, .. }
            | StmtKind::DoEver { body } => self.collect_stmts(body),
            StmtKind::Begin { body } => self.collect(body),
            _ => {}
        }
    }

    fn collect_stmts(&mut self, stmts: &'a [Stmt]) {
        for stmt in stmts {
            self.collect_stmt(stmt);
        }
    }

    fn collect_ordinals(&mut self, mode: &ModeExpr) {
        match &mode.kind {
            ModeExprKind::Set(names) => {
                for (i, name) in names.iter().enumerate() {
                    if let Some(id) = self.table.declared_at(name.span) {
                        self.ordinals.insert(id, i as i64);
                    }
                }
            }
            ModeExprKind::Powerset(inner) | ModeExprKind::Ref(inner) => self.collect_ordinals(inner),
            ModeExprKind::Struct(fields) => {
                for field in fields {
                    self.collect_ordinals(&field.mode);
                }
            }
            ModeExprKind::Array { index, elem } => {
                if let ArrayIndex::Mode(index) = index {
                    self.collect_ordinals(index);
                }
                self.collect_ordinals(elem);
            }
            ModeExprKind::Buffer { elem, .. } => self.collect_ordinals(elem),
            ModeExprKind::Proc { params, result } => {
                for (_, param) in params {
                    self.collect_ordinals(param);
                }
                if let Some(result) = result {
                    self.collect_ordinals(result);
                }
            }
            _ => {}
        }
    }

    // ---------------------------------------------------------------
    // modes of declarations

    /// Canonical mode of a NEWMODE/SYNMODE symbol, computed once.
    fn resolve_mode_symbol(&mut self, id: SymbolId) -> Mode {
        if self.mode_state.get(&id) == Some(&State::Done) {
            return self.table.symbol(id).mode.clone().unwrap_or(Mode::Unknown);
        }
        let Some(def) = self.mode_defs.get(&id).copied() else {
            // Seized modes carry their canonical mode already.
            return self.table.symbol(id).mode.clone().unwrap_or(Mode::Unknown);
        };
        self.mode_state.insert(id, State::InProgress);
        self.mode_stack.push(id);
        let mut mode = self.mode_of(&def.mode);
        self.mode_stack.pop();
        if self.cyclic.contains(&id) {
            mode = Mode::Unknown;
        } else if def.kind == ModeDefKind::Newmode && !mode.is_unknown() {
            mode = Mode::Novel {
                name: def.name.name.clone(),
                key: format!("{}::{}@{}", self.module_name, def.name.name, def.name.span.start),
                inner: Box::new(mode),
            };
        }
        self.mode_state.insert(id, State::Done);
        self.table.symbol_mut(id).mode = Some(mode.clone());
        if let ModeExprKind::Set(names) = &def.mode.kind {
            for name in names {
                if let Some(elem) = self.table.declared_at(name.span) {
                    self.table.symbol_mut(elem).mode = Some(mode.clone());
                }
            }
        }
        mode
    }

    /// Mode of any symbol, computing lazily where needed.
    fn symbol_mode(&mut self, id: SymbolId) -> Mode {
        match self.table.symbol(id).kind {
            SymbolKind::Mode => self.resolve_mode_symbol(id),
            SymbolKind::Synonym => self.syn_mode(id),
            SymbolKind::SetElement => {
                if let Some(&owner) = self.element_owner.get(&id) {
                    self.resolve_mode_symbol(owner);
                }
                self.table.symbol(id).mode.clone().unwrap_or(Mode::Unknown)
            }
            _ => self.table.symbol(id).mode.clone().unwrap_or(Mode::Unknown),
        }
    }

    fn syn_mode(&mut self, id: SymbolId) -> Mode {
        if let Some(mode) = &self.table.symbol(id).mode {
            return mode.clone();
        }
        let Some(def) = self.syn_defs.get(&id).copied() else {
            return Mode::Unknown;
        };
        if self.syn_state.get(&id) == Some(&State::InProgress) {
            self.mismatch(
                format!("synonym `{}` is defined in terms of itself", def.name.name),
                def.name.span,
            );
            self.table.symbol_mut(id).mode = Some(Mode::Unknown);
            return Mode::Unknown;
        }
        self.syn_state.insert(id, State::InProgress);
        let value = self.check_expr(&def.value);
        let mode = match &def.mode {
            Some(declared) => {
                let declared = self.mode_of(declared);
                self.check_assign(&declared, &def.value, &value);
                declared
            }
            None => value,
        };
        match self.const_value(&def.value) {
            Some(v) if mode.is_discrete() => {
                self.out.consts.insert(def.value.id, v);
            }
            None if mode.is_discrete() && !mode.is_unknown() => {
                self.mismatch(
                    format!("value of synonym `{}` must be a constant expression", def.name.name),
                    def.value.span,
                );
            }
            _ => {}
        }
        self.syn_state.insert(id, State::Done);
        // A cycle may already have stored Unknown.
        let symbol = self.table.symbol_mut(id);
        if symbol.mode.is_none() {
            symbol.mode = Some(mode.clone());
        }
        symbol.mode.clone().unwrap_or(mode)
    }

    /// Canonicalise a surface mode expression.
    fn mode_of(&mut self, mode: &ModeExpr) -> Mode {
        match &mode.kind {
            ModeExprKind::Named(name) => self.named_mode(name),
            ModeExprKind::Range { base, lo, hi } => {
                let lo_v = self.require_const(lo, "range bound");
                let hi_v = self.require_const(hi, "range bound");
                let base_mode = match base {
                    Some(base) => self.named_mode(base),
                    None => match self.lookup_mode(lo) {
                        Mode::Range { base, .. } => *base,
                        other => other,
                    },
                };
                if base_mode.is_unknown() {
                    return Mode::Unknown;
                }
                if !base_mode.is_discrete() {
                    self.mismatch(format!("`{base_mode}` is not a discrete mode"), mode.span);
                    return Mode::Unknown;
                }
                let (Some(lo), Some(hi)) = (lo_v, hi_v) else {
                    return Mode::Unknown;
                };
                if lo > hi {
                    self.mismatch(format!("range `{lo}:{hi}` is empty"), mode.span);
                    return Mode::Unknown;
                }
                if let Some((blo, bhi)) = base_mode.discrete_bounds() {
                    if lo < blo || hi > bhi {
                        self.mismatch(
                            format!("range `{lo}:{hi}` is outside the bounds of `{base_mode}`"),
                            mode.span,
                        );
                        return Mode::Unknown;
                    }
                }
                let base = match base_mode.strip() {
                    Mode::Range { base, .. } => (**base).clone(),
                    _ => base_mode,
                };
                Mode::Range {
                    lo,
                    hi,
                    base: Box::new(base),
                }
            }
            ModeExprKind::Set(names) => {
                let set = Mode::Enumeration(names.iter().map(|n| n.name.clone()).collect());
                for name in names {
                    if let Some(elem) = self.table.declared_at(name.span) {
                        let symbol = self.table.symbol_mut(elem);
                        if symbol.mode.is_none() {
                            symbol.mode = Some(set.clone());
                        }
                    }
                }
                set
            }
            ModeExprKind::Powerset(inner) => {
                let base = self.mode_of(inner);
                if base.is_unknown() {
                    return Mode::Unknown;
                }
                if !base.is_discrete() {
                    self.mismatch(format!("POWERSET needs a discrete mode, found `{base}`"), inner.span);
                    return Mode::Unknown;
                }
                if base.cardinality().map_or(true, |c| c > MAX_SMALL_CARDINALITY) {
                    self.mismatch(
                        format!("POWERSET of `{base}` has more than {MAX_SMALL_CARDINALITY} members"),
                        inner.span,
                    );
                    return Mode::Unknown;
                }
                Mode::PowerSet(Box::new(base))
            }
            ModeExprKind::Ref(inner) => Mode::Reference(Box::new(self.mode_of(inner))),
            ModeExprKind::Chars(len) => match self.require_length(len, "CHARS") {
                Some(n) => Mode::CharString(n),
                None => Mode::Unknown,
            },
            ModeExprKind::Bools(len) => match self.require_length(len, "BOOLS") {
                Some(n) => Mode::BitString(n),
                None => Mode::Unknown,
            },
            ModeExprKind::Struct(fields) => {
                let mut out: Vec<(String, Mode)> = Vec::new();
                let mut seen: HashMap<&str, Span> = HashMap::new();
                for field in fields {
                    if let Some(&first) = seen.get(field.name.name.as_str()) {
                        self.sink.push(
                            Diagnostic::error(
                                DiagnosticKind::DuplicateDeclaration,
                                format!("field `{}` is already declared in this structure", field.name.name),
                                field.name.span,
                            )
                            .with_secondary_label(first, "first declared here".to_string()),
                        );
                        continue;
                    }
                    seen.insert(&field.name.name, field.name.span);
                    out.push((field.name.name.clone(), self.mode_of(&field.mode)));
                }
                Mode::Structure(out)
            }
            ModeExprKind::Array { index, elem } => {
                let (lo, hi, index_mode) = match index {
                    ArrayIndex::Bounds(lo, hi) => {
                        let lo_v = self.require_const(lo, "array bound");
                        let hi_v = self.require_const(hi, "array bound");
                        let base = self.lookup_mode(lo).root().clone();
                        let (Some(lo), Some(hi)) = (lo_v, hi_v) else {
                            return Mode::Unknown;
                        };
                        let base = if base.is_discrete() { base } else { Mode::int() };
                        (
                            lo,
                            hi,
                            Mode::Range {
                                lo,
                                hi,
                                base: Box::new(base),
                            },
                        )
                    }
                    ArrayIndex::Mode(index) => {
                        let index_mode = self.mode_of(index);
                        if index_mode.is_unknown() {
                            return Mode::Unknown;
                        }
                        let Some((lo, hi)) = index_mode.discrete_bounds() else {
                            self.mismatch(
                                format!("array index mode `{index_mode}` is not discrete"),
                                index.span,
                            );
                            return Mode::Unknown;
                        };
                        (lo, hi, index_mode)
                    }
                };
                if lo > hi {
                    self.mismatch(format!("array bounds `{lo}:{hi}` are empty"), mode.span);
                    return Mode::Unknown;
                }
                if hi as i128 - lo as i128 + 1 > MAX_ARRAY_LENGTH as i128 {
                    self.mismatch(
                        format!("array bounds `{lo}:{hi}` exceed {MAX_ARRAY_LENGTH} elements"),
                        mode.span,
                    );
                    return Mode::Unknown;
                }
                let elem = self.mode_of(elem);
                Mode::Array {
                    lo,
                    hi,
                    index: Box::new(index_mode),
                    elem: Box::new(elem),
                }
            }
            ModeExprKind::Proc { params, result } => {
                let params = params
                    .iter()
                    .map(|(dir, mode)| (*dir, self.mode_of(mode)))
                    .collect();
                let result = result.as_ref().map(|r| Box::new(self.mode_of(r)));
                Mode::Procedure { params, result }
            }
            ModeExprKind::Buffer { capacity, elem } => {
                let capacity = match capacity {
                    Some(expr) => match self.require_length(expr, "BUFFER") {
                        Some(n) => Some(n),
                        None => return Mode::Unknown,
                    },
                    None => None,
                };
                Mode::Buffer {
                    capacity,
                    elem: Box::new(self.mode_of(elem)),
                }
            }
            ModeExprKind::Event => Mode::Event,
        }
    }

    fn named_mode(&mut self, name: &Ident) -> Mode {
        match self.table.resolved(name.span) {
            Some(id) if self.table.symbol(id).kind == SymbolKind::Mode => {
                if self.mode_state.get(&id) == Some(&State::InProgress) {
                    self.report_cycle(id, name);
                    return Mode::Unknown;
                }
                self.resolve_mode_symbol(id)
            }
            Some(id) => {
                let symbol = self.table.symbol(id);
                let message = format!("`{}` is a {}, not a mode", symbol.name, symbol.kind);
                self.mismatch(message, name.span);
                Mode::Unknown
            }
            None => {
                let upper = name.name.to_ascii_uppercase();
                match Mode::predefined(&upper) {
                    Some(mode) => mode,
                    None if is_predefined(&name.name) => {
                        self.mismatch(format!("`{upper}` is not a supported mode"), name.span);
                        Mode::Unknown
                    }
                    // Already reported as unresolved.
                    None => Mode::Unknown,
                }
            }
        }
    }

    fn report_cycle(&mut self, id: SymbolId, at: &Ident) {
        let Some(pos) = self.mode_stack.iter().position(|&s| s == id) else {
            return;
        };
        let members: Vec<SymbolId> = self.mode_stack[pos..].to_vec();
        if members.iter().any(|m| self.cyclic.contains(m)) {
            return;
        }
        let mut chain: Vec<String> = members
            .iter()
            .map(|&m| self.table.symbol(m).name.clone())
            .collect();
        chain.push(self.table.symbol(id).name.clone());
        let mut diag = Diagnostic::error(
            DiagnosticKind::CyclicModeDefinition,
            format!("mode `{}` is defined in terms of itself", self.table.symbol(id).name),
            at.span,
        )
        .with_note(format!("cycle: {}", chain.join(" -> ")));
        for &m in &members[1..] {
            diag = diag.with_secondary_label(self.table.symbol(m).def_span, "part of the cycle".to_string());
        }
        self.sink.push(diag);
        self.cyclic.extend(members);
    }

    fn require_const(&mut self, expr: &Expr, what: &str) -> Option<i64> {
        let mode = self.check_expr(expr);
        match self.const_value(expr) {
            Some(v) => {
                self.out.consts.insert(expr.id, v);
                Some(v)
            }
            None => {
                if !mode.is_unknown() {
                    self.mismatch(format!("{what} must be a constant expression"), expr.span);
                }
                None
            }
        }
    }

    /// Mode already recorded for `expr`.
    fn lookup_mode(&self, expr: &Expr) -> Mode {
        self.out.modes.get(&expr.id).cloned().unwrap_or(Mode::Unknown)
    }

    fn require_length(&mut self, expr: &Expr, what: &str) -> Option<u32> {
        let value = self.require_const(expr, &format!("{what} length"))?;
        if value < 1 {
            self.mismatch(format!("{what} length must be at least 1, found {value}"), expr.span);
            return None;
        }
        match u32::try_from(value) {
            Ok(n) if n <= MAX_ARRAY_LENGTH => Some(n),
            _ => {
                self.mismatch(
                    format!("{what} length must be at most {MAX_ARRAY_LENGTH}, found {value}"),
                    expr.span,
                );
                None
            }
        }
    }

    /// Assign modes to the declarations of one scope.
    fn declare_items(&mut self, items: &[Item]) {
        for item in items {
            match item {
                Item::ModeDef(def) => match self.table.declared_at(def.name.span) {
                    Some(id) => {
                        self.resolve_mode_symbol(id);
                    }
                    None => {
                        self.mode_of(&def.mode);
                    }
                },
                Item::Dcl(dcl) => {
                    let mode = self.mode_of(&dcl.mode);
                    for name in &dcl.names {
                        if let Some(id) = self.table.declared_at(name.span) {
                            self.table.symbol_mut(id).mode = Some(mode.clone());
                        }
                    }
                }
                Item::Syn(syn) => match self.table.declared_at(syn.name.span) {
                    Some(id) => {
                        self.syn_mode(id);
                    }
                    None => {
                        self.check_expr(&syn.value);
                    }
                },
                Item::Signal(signal) => {
                    let payload = signal.payload.iter().map(|m| self.mode_of(m)).collect();
                    if let Some(dest) = &signal.dest {
                        if let Some(id) = self.table.resolved(dest.span) {
                            let symbol = self.table.symbol(id);
                            if symbol.kind != SymbolKind::Process {
                                let message = format!("`{}` is a {}, not a process", symbol.name, symbol.kind);
                                self.mismatch(message, dest.span);
                            }
                        }
                    }
                    if let Some(id) = self.table.declared_at(signal.name.span) {
                        self.table.symbol_mut(id).mode = Some(Mode::Signal {
                            name: signal.name.name.clone(),
                            payload,
                        });
                    }
                }
                Item::Proc(proc) => {
                    let params = self.declare_params(&proc.params);
                    let result = proc.returns.as_ref().map(|r| Box::new(self.mode_of(r)));
                    if let Some(id) = self.table.declared_at(proc.name.span) {
                        self.table.symbol_mut(id).mode = Some(Mode::Procedure { params, result });
                    }
                }
                Item::Process(process) => {
                    let params = self.declare_params(&process.params);
                    if let Some((dir, _)) = params.iter().find(|(dir, _)| dir.by_reference()) {
                        self.mismatch(
                            format!("process parameters are passed by value; `{}` is not allowed", dir.as_str()),
                            process.span,
                        );
                    }
                    if let Some(id) = self.table.declared_at(process.name.span) {
                        self.table.symbol_mut(id).mode = Some(Mode::Process {
                            name: process.name.name.clone(),
                            params: params.into_iter().map(|(_, m)| m).collect(),
                        });
                    }
                }
                Item::Region(region) => self.declare_items(&region.body),
                Item::Grant(_) | Item::Seize(_) | Item::Stmt(_) => {}
            }
        }
    }

    fn declare_params(&mut self, params: &[Param]) -> Vec<(ParamDir, Mode)> {
        params
            .iter()
            .map(|param| {
                let mode = self.mode_of(&param.mode);
                if let Some(id) = self.table.declared_at(param.name.span) {
                    self.table.symbol_mut(id).mode = Some(mode.clone());
                }
                (param.dir, mode)
            })
            .collect()
    }

    // ---------------------------------------------------------------
    // bodies

    fn check_items(&mut self, items: &[Item]) {
        for item in items {
            match item {
                Item::Dcl(dcl) => {
                    if let Some(init) = &dcl.init {
                        let target = dcl
                            .names
                            .first()
                            .and_then(|n| self.table.declared_at(n.span))
                            .map(|id| self.symbol_mode(id))
                            .unwrap_or(Mode::Unknown);
                        let value = self.check_expr(init);
                        self.check_assign(&target, init, &value);
                    }
                }
                Item::Proc(proc) => {
                    let result = proc.returns.as_ref().map(|_| {
                        self.table
                            .declared_at(proc.name.span)
                            .and_then(|id| match &self.table.symbol(id).mode {
                                Some(Mode::Procedure {
                                    result: Some(result),
                                    ..
                                }) => Some((**result).clone()),
                                _ => None,
                            })
                            .unwrap_or(Mode::Unknown)
                    });
                    let saved = std::mem::take(&mut self.ctx);
                    self.ctx = Ctx {
                        proc_result: Some(result),
                        process: saved.process,
                        in_process_body: false,
                        loops: 0,
                    };
                    self.declare_items(&proc.body);
                    self.check_items(&proc.body);
                    self.ctx = saved;
                }
                Item::Process(process) => {
                    let saved = std::mem::take(&mut self.ctx);
                    self.ctx = Ctx {
                        proc_result: None,
                        process: self.table.declared_at(process.name.span),
                        in_process_body: true,
                        loops: 0,
                    };
                    self.declare_items(&process.body);
                    self.check_items(&process.body);
                    self.ctx = saved;
                }
                Item::Region(region) => self.check_items(&region.body),
                Item::Stmt(stmt) => self.check_stmt(stmt),
                Item::ModeDef(_)
                | Item::Syn(_)
                | Item::Signal(_)
                | Item::Grant(_)
                | Item::Seize(_) => {}
            }
        }
    }

    fn check_stmts(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.check_stmt(stmt);
        }
    }

    fn check_loop_body(&mut self, body: &[Stmt]) {
        self.ctx.loops += 1;
        self.check_stmts(body);
        self.ctx.loops -= 1;
    }

    fn check_bool(&mut self, cond: &Expr, what: &str) {
        let mode = self.check_expr(cond);
        if !mode.is_bool() && !mode.is_unknown() {
            self.mismatch(format!("{what} must be BOOL, found `{mode}`"), cond.span);
        }
    }

    fn check_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Assign { target, value } => {
                let target_mode = self.check_expr(target);
                if !self.is_location(target) && !target_mode.is_unknown() {
                    self.mismatch("the left-hand side of `:=` is not a location", target.span);
                }
                let value_mode = self.check_expr(value);
                self.check_assign(&target_mode, value, &value_mode);
            }
            StmtKind::Call(call) => match &call.kind {
                ExprKind::Call { .. } => {
                    self.check_call(call, true);
                }
                ExprKind::Name(name) => {
                    let mode = self.check_expr(call);
                    match mode.strip() {
                        Mode::Procedure { params, .. } => {
                            if !params.is_empty() {
                                self.mismatch(
                                    format!("`{}` expects {} argument(s) but none were supplied", name.name, params.len()),
                                    call.span,
                                );
                            }
                            self.out.calls.insert(call.id, CallKind::Procedure);
                        }
                        Mode::Unknown => {}
                        other => {
                            let message = format!("`{}` of mode `{other}` cannot be called", name.name);
                            self.mismatch(message, call.span);
                        }
                    }
                }
                _ => {
                    self.check_expr(call);
                    self.error(
                        DiagnosticKind::SyntaxError,
                        "only procedure calls may be used as statements",
                        call.span,
                    );
                }
            },
            StmtKind::If { arms, else_body } => {
                for (cond, body) in arms {
                    self.check_bool(cond, "IF condition");
                    self.check_stmts(body);
                }
                if let Some(body) = else_body {
                    self.check_stmts(body);
                }
            }
            StmtKind::Case {
                selector,
                arms,
                else_body,
            } => self.check_case(selector, arms, else_body.as_deref()),
            StmtKind::DoWhile { cond, body } => {
                self.check_bool(cond, "WHILE condition");
                self.check_loop_body(body);
            }
            StmtKind::DoFor {
                var,
                start,
                end,
                step,
                body,
                ..
            } => {
                let start_mode = self.check_expr(start);
                let end_mode = self.check_expr(end);
                if !compatible(&start_mode, &end_mode) {
                    self.mismatch(
                        format!("loop bounds have different modes `{start_mode}` and `{end_mode}`"),
                        start.span.to(end.span),
                    );
                }
                let mode = if matches!(start_mode.strip(), Mode::Primitive(Primitive::Int))
                    && end_mode.is_discrete()
                {
                    end_mode
                } else {
                    start_mode
                };
                if !mode.is_discrete() && !mode.is_unknown() {
                    self.mismatch(format!("loop counter must be discrete, found `{mode}`"), start.span);
                }
                if let Some(step) = step {
                    let step_mode = self.check_expr(step);
                    if !step_mode.is_integer() && !step_mode.is_unknown() {
                        self.mismatch(format!("BY step must be an integer, found `{step_mode}`"), step.span);
                    }
                }
                if let Some(id) = self.table.declared_at(var.span) {
                    self.table.symbol_mut(id).mode = Some(mode);
                }
                self.check_loop_body(body);
            }
            StmtKind::DoEver { body } => self.check_loop_body(body),
            StmtKind::Begin { body } => {
                self.declare_items(body);
                self.check_items(body);
            }
            StmtKind::Exit => {
                if self.ctx.loops == 0 {
                    self.error(DiagnosticKind::SyntaxError, "EXIT outside of a loop", stmt.span);
                }
            }
            StmtKind::Return(value) => self.check_return(stmt.span, value.as_ref()),
            StmtKind::Result(value) => {
                let mode = self.check_expr(value);
                match self.ctx.proc_result.clone() {
                    Some(Some(result)) => self.check_assign(&result, value, &mode),
                    Some(None) => self.mismatch("RESULT in a procedure without RETURNS", stmt.span),
                    None => self.mismatch("RESULT outside of a procedure", stmt.span),
                }
            }
            StmtKind::Send { target, args, dest } => self.check_send(stmt, target, args, dest.as_ref()),
            StmtKind::ReceiveCase { alts, else_body } => {
                self.check_receive(stmt, alts, else_body.as_deref())
            }
            StmtKind::Start { process, args } => {
                self.check_start(process, args, stmt.span);
            }
            StmtKind::Stop(instance) => {
                if let Some(instance) = instance {
                    let mode = self.check_expr(instance);
                    if !compatible(&mode, &Mode::Instance) {
                        self.mismatch(format!("STOP needs an INSTANCE, found `{mode}`"), instance.span);
                    }
                }
            }
            StmtKind::Delay(value) => {
                let mode = self.check_expr(value);
                if !mode.is_duration() && !matches!(mode.strip(), Mode::Event | Mode::Unknown) {
                    self.mismatch(format!("DELAY needs a DURATION or an EVENT, found `{mode}`"), value.span);
                }
            }
            StmtKind::Continue(value) => {
                let mode = self.check_expr(value);
                if !matches!(mode.strip(), Mode::Event | Mode::Unknown) {
                    self.mismatch(format!("CONTINUE needs an EVENT, found `{mode}`"), value.span);
                }
            }
        }
    }

    fn check_return(&mut self, span: Span, value: Option<&Expr>) {
        let mode = value.map(|v| (v, self.check_expr(v)));
        match (self.ctx.proc_result.clone(), mode) {
            (Some(Some(result)), Some((expr, mode))) => self.check_assign(&result, expr, &mode),
            (Some(None), Some(_)) => self.mismatch("RETURN with a value in a procedure without RETURNS", span),
            (Some(_), None) => {}
            (None, None) if self.ctx.in_process_body => {}
            (None, Some(_)) if self.ctx.in_process_body => {
                self.mismatch("RETURN in a process cannot carry a value", span)
            }
            (None, _) => self.mismatch("RETURN outside of a procedure", span),
        }
    }

    fn check_case(&mut self, selector: &Expr, arms: &[CaseArm], else_body: Option<&[Stmt]>) {
        let sel = self.check_expr(selector);
        if !sel.is_discrete() && !sel.is_unknown() {
            self.mismatch(format!("CASE selector must be discrete, found `{sel}`"), selector.span);
        }
        let mut covered: Vec<(i64, i64, Span)> = Vec::new();
        let mut has_any = false;
        for arm in arms {
            for label in &arm.labels {
                let (lo, hi, span) = match label {
                    CaseLabel::Any(_) => {
                        has_any = true;
                        continue;
                    }
                    CaseLabel::Value(value) => {
                        let Some(v) = self.case_label(value, &sel) else { continue };
                        (v, v, value.span)
                    }
                    CaseLabel::Range(lo, hi) => {
                        let (Some(l), Some(h)) = (self.case_label(lo, &sel), self.case_label(hi, &sel)) else {
                            continue;
                        };
                        if l > h {
                            self.mismatch(format!("case label range `{l}:{h}` is empty"), lo.span.to(hi.span));
                            continue;
                        }
                        (l, h, lo.span.to(hi.span))
                    }
                };
                if let Some(&(_, _, prev)) = covered.iter().find(|(l, h, _)| lo <= *h && *l <= hi) {
                    self.sink.push(
                        Diagnostic::error(
                            DiagnosticKind::ModeMismatch,
                            "case label overlaps a label of another alternative",
                            span,
                        )
                        .with_secondary_label(prev, "previous label".to_string()),
                    );
                    continue;
                }
                covered.push((lo, hi, span));
            }
            self.check_stmts(&arm.body);
        }
        if let Some(body) = else_body {
            self.check_stmts(body);
            return;
        }
        if has_any || sel.is_unknown() || !sel.is_discrete() {
            return;
        }
        let never = matches!(
            sel.strip(),
            Mode::Primitive(Primitive::Int) | Mode::Primitive(Primitive::Char)
        );
        let exhaustive = !never
            && match (sel.discrete_bounds(), sel.cardinality()) {
                (Some((lo, hi)), Some(card)) if card <= MAX_SMALL_CARDINALITY => {
                    count_covered(&covered, lo, hi) == card
                }
                _ => false,
            };
        if exhaustive {
            return;
        }
        let mut diag = Diagnostic::warning(
            DiagnosticKind::NonExhaustiveCase,
            format!("CASE on `{sel}` does not cover every value and has no ELSE"),
            selector.span,
        );
        if let (Some(names), Some((lo, hi))) = (sel.set_elements(), sel.discrete_bounds()) {
            let missing: Vec<&str> = (lo..=hi)
                .filter(|v| !covered.iter().any(|(l, h, _)| l <= v && v <= h))
                .filter_map(|v| names.get(v as usize).map(String::as_str))
                .take(5)
                .collect();
            if !missing.is_empty() {
                diag = diag.with_note(format!("not covered: {}", missing.join(", ")));
            }
        }
        diag = diag.with_note("add an ELSE alternative to handle the remaining values");
        self.sink.push(diag);
    }

    fn case_label(&mut self, value: &Expr, sel: &Mode) -> Option<i64> {
        let mode = self.check_expr(value);
        if !compatible(sel, &mode) {
            self.mismatch(
                format!("case label of mode `{mode}` does not match selector mode `{sel}`"),
                value.span,
            );
            return None;
        }
        let v = self.require_const(value, "case label")?;
        if let Some((lo, hi)) = sel.discrete_bounds() {
            if !sel.is_unknown() && (v < lo || v > hi) {
                self.sink.push(
                    Diagnostic::warning(
                        DiagnosticKind::ModeMismatch,
                        format!("case label {v} is outside the bounds of `{sel}`"),
                        value.span,
                    )
                    .with_code(codes::RANGE_BOUND),
                );
            }
        }
        Some(v)
    }

    fn check_send(&mut self, stmt: &Stmt, target: &Ident, args: &[Expr], dest: Option<&Expr>) {
        let Some(id) = self.table.resolved(target.span) else {
            for arg in args {
                self.check_expr(arg);
            }
            if let Some(dest) = dest {
                self.check_expr(dest);
            }
            return;
        };
        let mode = self.symbol_mode(id);
        match mode.strip() {
            Mode::Signal { payload, .. } => {
                let params: Vec<(ParamDir, Mode)> =
                    payload.iter().map(|m| (ParamDir::In, m.clone())).collect();
                self.check_args(&target.name, &params, args, stmt.span);
                match dest {
                    Some(dest) => {
                        let dest_mode = self.check_expr(dest);
                        if !compatible(&dest_mode, &Mode::Instance) {
                            self.mismatch(format!("SEND ... TO needs an INSTANCE, found `{dest_mode}`"), dest.span);
                        }
                    }
                    None => {
                        let has_dest = matches!(self.signal_dest.get(&id), Some(Some(_)));
                        if !has_dest {
                            self.sink.push(
                                Diagnostic::error(
                                    DiagnosticKind::ModeMismatch,
                                    format!("signal `{}` has no destination process", target.name),
                                    stmt.span,
                                )
                                .with_note("add `TO instance` or declare the signal with `TO process`"),
                            );
                        }
                    }
                }
            }
            Mode::Buffer { elem, .. } => {
                let elem = (**elem).clone();
                if args.len() != 1 {
                    self.mismatch(
                        format!("SEND to buffer `{}` needs exactly one value", target.name),
                        stmt.span,
                    );
                }
                for arg in args {
                    let value = self.check_expr(arg);
                    self.check_assign(&elem, arg, &value);
                }
                if let Some(dest) = dest {
                    self.check_expr(dest);
                    self.mismatch("SEND to a buffer cannot have TO", dest.span);
                }
            }
            Mode::Unknown => {
                for arg in args {
                    self.check_expr(arg);
                }
                if let Some(dest) = dest {
                    self.check_expr(dest);
                }
            }
            other => {
                let message = format!("`{}` of mode `{other}` is neither a signal nor a buffer", target.name);
                self.mismatch(message, target.span);
            }
        }
    }

    fn check_receive(&mut self, stmt: &Stmt, alts: &[ReceiveAlt], else_body: Option<&[Stmt]>) {
        if self.ctx.process.is_none() {
            self.mismatch("RECEIVE CASE is only allowed inside a process", stmt.span);
        }
        let mut handled: HashMap<SymbolId, Span> = HashMap::new();
        for alt in alts {
            let signal = self.table.resolved(alt.signal.span);
            let mut payload: Option<Vec<Mode>> = None;
            if let Some(id) = signal {
                match self.symbol_mode(id).strip() {
                    Mode::Signal { payload: p, .. } => payload = Some(p.clone()),
                    Mode::Unknown => {}
                    other => {
                        let message = format!("`{}` of mode `{other}` is not a signal", alt.signal.name);
                        self.mismatch(message, alt.signal.span);
                    }
                }
                if let Some(&prev) = handled.get(&id) {
                    self.sink.push(
                        Diagnostic::error(
                            DiagnosticKind::ModeMismatch,
                            format!("signal `{}` is handled twice", alt.signal.name),
                            alt.signal.span,
                        )
                        .with_secondary_label(prev, "first handled here".to_string()),
                    );
                } else {
                    handled.insert(id, alt.signal.span);
                }
            }
            if let Some(payload) = &payload {
                if !alt.bindings.is_empty() && alt.bindings.len() != payload.len() {
                    self.mismatch(
                        format!(
                            "signal `{}` carries {} value(s) but {} location(s) were given",
                            alt.signal.name,
                            payload.len(),
                            alt.bindings.len()
                        ),
                        alt.span,
                    );
                }
            }
            for (i, binding) in alt.bindings.iter().enumerate() {
                let Some(id) = self.table.resolved(binding.span) else { continue };
                let symbol = self.table.symbol(id);
                if symbol.kind != SymbolKind::Variable {
                    let message = format!("`{}` is a {}, not a location", symbol.name, symbol.kind);
                    self.mismatch(message, binding.span);
                    continue;
                }
                let target = self.symbol_mode(id);
                if let Some(value) = payload.as_ref().and_then(|p| p.get(i)) {
                    if !compatible(&target, value) {
                        self.mismatch(
                            format!("cannot receive a value of mode `{value}` into `{}` of mode `{target}`", binding.name),
                            binding.span,
                        );
                    }
                }
            }
            if let Some(guard) = &alt.guard {
                self.check_bool(guard, "WHERE guard");
            }
            self.check_stmts(&alt.body);
        }
        if let Some(body) = else_body {
            self.check_stmts(body);
            return;
        }
        let Some(process) = self.ctx.process else { return };
        let mut missing: Vec<(u32, String)> = self
            .signal_dest
            .iter()
            .filter(|(sig, dest)| **dest == Some(process) && !handled.contains_key(sig))
            .map(|(sig, _)| {
                let symbol = self.table.symbol(*sig);
                (symbol.def_span.start, symbol.name.clone())
            })
            .collect();
        if missing.is_empty() {
            return;
        }
        missing.sort();
        let names: Vec<String> = missing.into_iter().map(|(_, n)| format!("`{n}`")).collect();
        let process_name = self.table.symbol(process).name.clone();
        self.sink.push(
            Diagnostic::warning(
                DiagnosticKind::NonExhaustiveCase,
                format!(
                    "RECEIVE CASE does not handle {} sent to process `{process_name}`",
                    names.join(", ")
                ),
                stmt.span,
            )
            .with_note("unhandled signals stay queued; add an ELSE alternative or handle them"),
        );
    }

    fn check_start(&mut self, process: &Ident, args: &[Expr], span: Span) -> Mode {
        let Some(id) = self.table.resolved(process.span) else {
            for arg in args {
                self.check_expr(arg);
            }
            return Mode::Unknown;
        };
        match self.symbol_mode(id).strip() {
            Mode::Process { params, .. } => {
                let params: Vec<(ParamDir, Mode)> =
                    params.iter().map(|m| (ParamDir::In, m.clone())).collect();
                self.check_args(&process.name, &params, args, span);
            }
            Mode::Unknown => {
                for arg in args {
                    self.check_expr(arg);
                }
            }
            _ => {
                let symbol = self.table.symbol(id);
                let message = format!("`{}` is a {}, not a process", symbol.name, symbol.kind);
                self.mismatch(message, process.span);
                for arg in args {
                    self.check_expr(arg);
                }
            }
        }
        Mode::Instance
    }

    fn check_args(&mut self, name: &str, params: &[(ParamDir, Mode)], args: &[Expr], span: Span) {
        if params.len() != args.len() {
            self.mismatch(
                format!(
                    "`{name}` expects {} argument(s) but {} were supplied",
                    params.len(),
                    args.len()
                ),
                span,
            );
        }
        for (i, arg) in args.iter().enumerate() {
            let value = self.check_expr(arg);
            let Some((dir, param)) = params.get(i) else { continue };
            if dir.by_reference() {
                if !self.is_location(arg) && !value.is_unknown() {
                    self.mismatch(
                        format!("argument for {} parameter must be a location", dir.as_str()),
                        arg.span,
                    );
                } else if !compatible(param, &value) {
                    self.mismatch(
                        format!("argument of mode `{value}` does not match parameter mode `{param}`"),
                        arg.span,
                    );
                }
            } else if compatible(param, &value) {
                self.check_assign(param, arg, &value);
            } else {
                self.mismatch(
                    format!("argument of mode `{value}` does not match parameter mode `{param}`"),
                    arg.span,
                );
            }
        }
    }

    /// Compatibility and bounds check for storing `value` into a
    /// location of mode `target`.
    fn check_assign(&mut self, target: &Mode, value_expr: &Expr, value: &Mode) {
        if !compatible(target, value) {
            self.mismatch(
                format!("cannot assign a value of mode `{value}` to a location of mode `{target}`"),
                value_expr.span,
            );
            return;
        }
        match target.strip() {
            Mode::Range { .. } => {
                if let Some(v) = self.const_value(value_expr) {
                    let (lo, hi) = target.discrete_bounds().unwrap_or((v, v));
                    if v < lo || v > hi {
                        self.sink.push(
                            Diagnostic::warning(
                                DiagnosticKind::ModeMismatch,
                                format!("value {v} is outside the bounds of `{target}` ({lo}:{hi})"),
                                value_expr.span,
                            )
                            .with_code(codes::RANGE_BOUND),
                        );
                    }
                } else if !value.is_unknown() && !value.bounds_within(target) {
                    self.sink.push(
                        Diagnostic::warning(
                            DiagnosticKind::UnprovableBound,
                            format!("value of mode `{value}` may be outside the bounds of `{target}`"),
                            value_expr.span,
                        )
                        .with_note("the value is not checked at run time"),
                    );
                }
            }
            Mode::CharString(n) => {
                if let ExprKind::Str(s) = &value_expr.kind {
                    let len = s.chars().count();
                    if len > *n as usize {
                        self.sink.push(
                            Diagnostic::warning(
                                DiagnosticKind::ModeMismatch,
                                format!("string of length {len} does not fit `CHARS({n})` and is truncated"),
                                value_expr.span,
                            )
                            .with_code(codes::RANGE_BOUND),
                        );
                    }
                }
            }
            Mode::PowerSet(_) => self.fit_tuple(target, value_expr),
            _ => {}
        }
    }

    // ---------------------------------------------------------------
    // expressions

    fn is_location(&self, expr: &Expr) -> bool {
        match &expr.kind {
            ExprKind::Name(name) => self
                .table
                .resolved(name.span)
                .is_some_and(|id| self.table.symbol(id).kind == SymbolKind::Variable),
            ExprKind::Field { base, .. } | ExprKind::Index { base, .. } => self.is_location(base),
            ExprKind::Deref(_) => true,
            ExprKind::Call { callee, .. } => {
                matches!(self.out.calls.get(&expr.id), Some(CallKind::Index)) && self.is_location(callee)
            }
            _ => false,
        }
    }

    fn check_expr(&mut self, expr: &Expr) -> Mode {
        let mode = self.expr_mode(expr);
        self.out.modes.insert(expr.id, mode.clone());
        mode
    }

    fn expr_mode(&mut self, expr: &Expr) -> Mode {
        match &expr.kind {
            ExprKind::Int { .. } => Mode::int(),
            ExprKind::Bool(_) => Mode::bool(),
            ExprKind::Char(_) => Mode::char(),
            ExprKind::Str(s) => Mode::CharString(s.chars().count() as u32),
            ExprKind::Null => Mode::Reference(Box::new(Mode::Unknown)),
            ExprKind::This => {
                if self.ctx.process.is_none() {
                    self.mismatch("THIS is only meaningful inside a process", expr.span);
                }
                Mode::Instance
            }
            ExprKind::Name(name) => self.name_mode(name),
            ExprKind::Binary { op, lhs, rhs } => {
                let mut l = self.check_expr(lhs);
                let mut r = self.check_expr(rhs);
                if *op == BinOp::In {
                    if l.is_discrete() && l.cardinality().is_some_and(|c| c <= 64) {
                        self.fit_tuple(&Mode::PowerSet(Box::new(l.strip().clone())), rhs);
                        r = self.lookup_mode(rhs);
                    }
                } else if is_set(&l) {
                    self.fit_tuple(&l, rhs);
                    r = self.lookup_mode(rhs);
                } else if is_set(&r) {
                    self.fit_tuple(&r, lhs);
                    l = self.lookup_mode(lhs);
                }
                self.binary_mode(*op, &l, &r, expr.span)
            }
            ExprKind::Unary { op, operand } => {
                let m = self.check_expr(operand);
                if m.is_unknown() {
                    return if *op == UnOp::Not { Mode::bool() } else { Mode::Unknown };
                }
                match op {
                    UnOp::Neg if m.is_integer() => Mode::int(),
                    UnOp::Neg if m.is_duration() => Mode::duration(),
                    UnOp::Not if m.is_bool() => Mode::bool(),
                    UnOp::Not if matches!(m.strip(), Mode::BitString(_) | Mode::PowerSet(_)) => m,
                    _ => {
                        let sym = if *op == UnOp::Neg { "-" } else { "NOT" };
                        self.mismatch(format!("operator `{sym}` cannot be applied to `{m}`"), expr.span);
                        Mode::Unknown
                    }
                }
            }
            ExprKind::Call { .. } => self.check_call(expr, false),
            ExprKind::Field { base, field } => {
                let base_mode = self.check_expr(base);
                match base_mode.strip() {
                    Mode::Unknown => Mode::Unknown,
                    Mode::Structure(fields) => match base_mode.field(&field.name) {
                        Some(mode) => mode.clone(),
                        None => {
                            let candidates: Vec<String> = fields.iter().map(|(n, _)| n.clone()).collect();
                            let mut diag = Diagnostic::error(
                                DiagnosticKind::UnresolvedReference,
                                format!("no field `{}` in `{base_mode}`", field.name),
                                field.span,
                            );
                            if let Some(help) = did_you_mean(&field.name, candidates) {
                                diag = diag.with_note(help);
                            }
                            self.sink.push(diag);
                            Mode::Unknown
                        }
                    },
                    _ => {
                        self.mismatch(format!("`{base_mode}` has no fields"), field.span);
                        Mode::Unknown
                    }
                }
            }
            ExprKind::Index { base, index } => {
                let base_mode = self.check_expr(base);
                self.index_mode(&base_mode, index, expr.span)
            }
            ExprKind::Deref(inner) => {
                let m = self.check_expr(inner);
                match m.strip() {
                    Mode::Reference(target) => (**target).clone(),
                    Mode::Unknown => Mode::Unknown,
                    _ => {
                        self.mismatch(format!("`->` needs a REF, found `{m}`"), expr.span);
                        Mode::Unknown
                    }
                }
            }
            ExprKind::AddressOf(inner) => {
                let m = self.check_expr(inner);
                if !self.is_location(inner) && !m.is_unknown() {
                    self.mismatch("only locations have an address", inner.span);
                }
                Mode::Reference(Box::new(m))
            }
            ExprKind::Start { process, args } => self.check_start(process, args, expr.span),
            ExprKind::Receive(buffer) => {
                let m = self.check_expr(buffer);
                match m.strip() {
                    Mode::Buffer { elem, .. } => (**elem).clone(),
                    Mode::Unknown => Mode::Unknown,
                    _ => {
                        self.mismatch(format!("RECEIVE needs a BUFFER, found `{m}`"), buffer.span);
                        Mode::Unknown
                    }
                }
            }
            ExprKind::Duration { amount, .. } => {
                let m = self.check_expr(amount);
                if !m.is_integer() && !m.is_unknown() {
                    self.mismatch(format!("duration amount must be an integer, found `{m}`"), amount.span);
                }
                Mode::duration()
            }
            ExprKind::Tuple(elems) => self.tuple_mode(elems),
        }
    }

    /// Mode of a powerset tuple on its own: a powerset over the members'
    /// root mode, narrowed to the folded bounds when the members are
    /// constant integers. A location or operand of powerset mode
    /// replaces it through `fit_tuple`.
    fn tuple_mode(&mut self, elems: &[Expr]) -> Mode {
        let mut base: Option<Mode> = None;
        for elem in elems {
            let m = self.check_expr(elem);
            if m.is_unknown() {
                continue;
            }
            if !m.is_discrete() {
                self.mismatch(format!("powerset members must be discrete, found `{m}`"), elem.span);
                continue;
            }
            match &base {
                None => base = Some(m.root().clone()),
                Some(b) if !compatible(b, &m) => {
                    self.mismatch(format!("`{m}` cannot share a powerset with `{b}`"), elem.span);
                }
                Some(_) => {}
            }
        }
        let Some(base) = base else {
            return Mode::PowerSet(Box::new(Mode::Unknown));
        };
        if base.is_integer() {
            let values: Option<Vec<i64>> = elems.iter().map(|e| self.const_value(e)).collect();
            if let Some(values) = values {
                let lo = values.iter().copied().min().unwrap_or(0);
                let hi = values.iter().copied().max().unwrap_or(0);
                return Mode::PowerSet(Box::new(Mode::Range {
                    lo,
                    hi,
                    base: Box::new(base),
                }));
            }
        }
        Mode::PowerSet(Box::new(base))
    }

    /// A powerset tuple takes the mode of the location or operand it
    /// meets; members are checked against that powerset's base.
    fn fit_tuple(&mut self, target: &Mode, expr: &Expr) {
        let ExprKind::Tuple(elems) = &expr.kind else { return };
        let Mode::PowerSet(base) = target.strip() else { return };
        let base = (**base).clone();
        for elem in elems {
            let m = self.lookup_mode(elem);
            if !compatible(&base, &m) {
                self.mismatch(format!("`{m}` is not a member mode of `{target}`"), elem.span);
                continue;
            }
            let (Some(v), Some((lo, hi))) = (self.const_value(elem), base.discrete_bounds()) else {
                continue;
            };
            if v < lo || v > hi {
                self.sink.push(
                    Diagnostic::warning(
                        DiagnosticKind::ModeMismatch,
                        format!("value {v} is outside the bounds of `{base}` ({lo}:{hi})"),
                        elem.span,
                    )
                    .with_code(codes::RANGE_BOUND),
                );
            }
        }
        self.out.modes.insert(expr.id, target.clone());
    }

    fn name_mode(&mut self, name: &Ident) -> Mode {
        let Some(id) = self.table.resolved(name.span) else {
            if is_predefined(&name.name) {
                self.mismatch(
                    format!("`{}` cannot be used as a value", name.name.to_ascii_uppercase()),
                    name.span,
                );
            }
            return Mode::Unknown;
        };
        let kind = self.table.symbol(id).kind;
        match kind {
            SymbolKind::Variable
            | SymbolKind::Synonym
            | SymbolKind::SetElement
            | SymbolKind::Procedure => self.symbol_mode(id),
            SymbolKind::Mode => {
                self.sink.push(
                    Diagnostic::error(
                        DiagnosticKind::ModeMismatch,
                        format!("mode `{}` used as a value", name.name),
                        name.span,
                    )
                    .with_note(format!("write `{}(value)` to convert a value", name.name)),
                );
                Mode::Unknown
            }
            SymbolKind::Process => {
                self.mismatch(format!("process `{}` can only be STARTed", name.name), name.span);
                Mode::Unknown
            }
            SymbolKind::Signal => {
                self.mismatch(format!("signal `{}` can only be sent or received", name.name), name.span);
                Mode::Unknown
            }
            SymbolKind::Region | SymbolKind::Module => {
                self.mismatch(format!("{} `{}` has no value", kind, name.name), name.span);
                Mode::Unknown
            }
        }
    }

    fn binary_mode(&mut self, op: BinOp, l: &Mode, r: &Mode, span: Span) -> Mode {
        let unknown = l.is_unknown() || r.is_unknown();
        let fail = |this: &mut Self| {
            this.mismatch(
                format!("operator `{}` cannot be applied to `{l}` and `{r}`", op.as_str()),
                span,
            );
            Mode::Unknown
        };
        match op {
            BinOp::And | BinOp::Or | BinOp::Xor => {
                if l.is_bool() && r.is_bool() {
                    return Mode::bool();
                }
                if is_set(l) && compatible(l, r) {
                    return l.clone();
                }
                if unknown {
                    return if is_set(l) {
                        l.clone()
                    } else if is_set(r) {
                        r.clone()
                    } else {
                        Mode::bool()
                    };
                }
                fail(self)
            }
            BinOp::AndIf | BinOp::OrIf => {
                if unknown || (l.is_bool() && r.is_bool()) {
                    Mode::bool()
                } else {
                    fail(self)
                }
            }
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
                if !compatible(l, r) {
                    self.mismatch(format!("cannot compare `{l}` with `{r}`"), span);
                    return Mode::bool();
                }
                let ordered = unknown
                    || l.is_discrete()
                    || l.is_char_like()
                    || matches!(l.strip(), Mode::Primitive(Primitive::Duration | Primitive::Time));
                if !op.is_relational() || matches!(op, BinOp::Eq | BinOp::Ne) || ordered {
                    Mode::bool()
                } else {
                    self.mismatch(format!("values of mode `{l}` are not ordered"), span);
                    Mode::bool()
                }
            }
            BinOp::In => match r.strip() {
                Mode::PowerSet(base) if compatible(l, base) => Mode::bool(),
                Mode::Unknown => Mode::bool(),
                _ => {
                    fail(self);
                    Mode::bool()
                }
            },
            BinOp::Add | BinOp::Sub => {
                if unknown {
                    Mode::Unknown
                } else if l.is_integer() && r.is_integer() {
                    Mode::int()
                } else if l.is_duration() && r.is_duration() {
                    Mode::duration()
                } else if matches!(l.strip(), Mode::Primitive(Primitive::Time)) && r.is_duration() {
                    Mode::Primitive(Primitive::Time)
                } else {
                    fail(self)
                }
            }
            BinOp::Mul => {
                if unknown {
                    Mode::Unknown
                } else if l.is_integer() && r.is_integer() {
                    Mode::int()
                } else if (l.is_duration() && r.is_integer()) || (l.is_integer() && r.is_duration()) {
                    Mode::duration()
                } else {
                    fail(self)
                }
            }
            BinOp::Div => {
                if unknown {
                    Mode::Unknown
                } else if l.is_integer() && r.is_integer() {
                    Mode::int()
                } else if l.is_duration() && r.is_integer() {
                    Mode::duration()
                } else {
                    fail(self)
                }
            }
            BinOp::Mod | BinOp::Rem => {
                if unknown {
                    Mode::Unknown
                } else if l.is_integer() && r.is_integer() {
                    Mode::int()
                } else {
                    fail(self)
                }
            }
            BinOp::Concat => {
                if unknown {
                    return Mode::Unknown;
                }
                let len = match (string_len(l), string_len(r)) {
                    (Some(a), Some(b)) => Some((a.checked_add(b), true)),
                    _ => match (l.strip(), r.strip()) {
                        (Mode::BitString(a), Mode::BitString(b)) => Some((a.checked_add(*b), false)),
                        _ => None,
                    },
                };
                match len {
                    Some((Some(n), chars)) if n <= MAX_ARRAY_LENGTH => {
                        if chars {
                            Mode::CharString(n)
                        } else {
                            Mode::BitString(n)
                        }
                    }
                    Some(_) => {
                        self.mismatch(format!("concatenation is longer than {MAX_ARRAY_LENGTH}"), span);
                        Mode::Unknown
                    }
                    None => fail(self),
                }
            }
        }
    }

    /// Element access on arrays, strings and bit strings.
    fn index_mode(&mut self, base: &Mode, index: &Expr, span: Span) -> Mode {
        let index_value = self.check_expr(index);
        let (elem, bounds, index_mode) = match base.strip() {
            Mode::Array { lo, hi, index, elem } => ((**elem).clone(), (*lo, *hi), (**index).clone()),
            Mode::CharString(n) => (Mode::char(), (0, *n as i64 - 1), Mode::int()),
            Mode::BitString(n) => (Mode::bool(), (0, *n as i64 - 1), Mode::int()),
            Mode::Unknown => return Mode::Unknown,
            other => {
                self.mismatch(format!("`{other}` cannot be indexed"), span);
                return Mode::Unknown;
            }
        };
        if !compatible(&index_mode, &index_value) {
            self.mismatch(
                format!("index of mode `{index_value}` does not match index mode `{index_mode}`"),
                index.span,
            );
        } else if let Some(v) = self.const_value(index) {
            if v < bounds.0 || v > bounds.1 {
                self.sink.push(
                    Diagnostic::warning(
                        DiagnosticKind::UnprovableBound,
                        format!("index {v} is outside the bounds {}:{}", bounds.0, bounds.1),
                        index.span,
                    )
                    .with_note("the index is not checked at run time"),
                );
            }
        }
        elem
    }

    /// `callee(args)`: procedure call, element access, mode conversion
    /// or predefined routine. `statement` is set for call statements.
    fn check_call(&mut self, expr: &Expr, statement: bool) -> Mode {
        let ExprKind::Call { callee, args } = &expr.kind else {
            return self.check_expr(expr);
        };
        if let ExprKind::Name(name) = &callee.kind {
            match self.table.resolved(name.span) {
                Some(id) if self.table.symbol(id).kind == SymbolKind::Mode => {
                    let target = self.resolve_mode_symbol(id);
                    self.out.modes.insert(callee.id, target.clone());
                    return self.conversion(expr, target, args);
                }
                None => {
                    let upper = name.name.to_ascii_uppercase();
                    if let Some(target) = Mode::predefined(&upper) {
                        self.out.modes.insert(callee.id, target.clone());
                        return self.conversion(expr, target, args);
                    }
                    if let Some(builtin) = Builtin::from_name(&upper) {
                        self.out.calls.insert(expr.id, CallKind::Builtin(builtin));
                        return self.builtin(expr, builtin, args, statement);
                    }
                    if is_predefined(&name.name) {
                        self.mismatch(
                            format!("predefined routine `{upper}` is not supported by this compiler"),
                            callee.span,
                        );
                    }
                    for arg in args {
                        self.check_expr(arg);
                    }
                    return Mode::Unknown;
                }
                Some(_) => {}
            }
        }
        let callee_mode = self.check_expr(callee);
        match callee_mode.strip() {
            Mode::Procedure { params, result } => {
                let params = params.clone();
                let result = result.clone();
                self.out.calls.insert(expr.id, CallKind::Procedure);
                let name = match &callee.kind {
                    ExprKind::Name(name) => name.name.clone(),
                    _ => "procedure".to_string(),
                };
                self.check_args(&name, &params, args, expr.span);
                match result {
                    Some(result) => *result,
                    None => {
                        if !statement {
                            self.mismatch(format!("`{name}` does not return a value"), expr.span);
                        }
                        Mode::Unknown
                    }
                }
            }
            Mode::Array { .. } | Mode::CharString(_) | Mode::BitString(_) => {
                self.out.calls.insert(expr.id, CallKind::Index);
                if args.len() != 1 {
                    self.mismatch("element access takes exactly one index", expr.span);
                    for arg in args {
                        self.check_expr(arg);
                    }
                    return Mode::Unknown;
                }
                if statement {
                    self.mismatch("element access is not a statement", expr.span);
                }
                self.index_mode(&callee_mode, &args[0], expr.span)
            }
            Mode::Unknown => {
                for arg in args {
                    self.check_expr(arg);
                }
                Mode::Unknown
            }
            other => {
                self.mismatch(format!("value of mode `{other}` cannot be called"), callee.span);
                for arg in args {
                    self.check_expr(arg);
                }
                Mode::Unknown
            }
        }
    }

    fn conversion(&mut self, expr: &Expr, target: Mode, args: &[Expr]) -> Mode {
        self.out.calls.insert(expr.id, CallKind::Conversion(target.clone()));
        if args.len() != 1 {
            self.mismatch(format!("conversion to `{target}` takes exactly one value"), expr.span);
            for arg in args {
                self.check_expr(arg);
            }
            return target;
        }
        let value = self.check_expr(&args[0]);
        let ok = value.is_unknown()
            || target.is_unknown()
            || compatible(&target, &value)
            || (target.is_discrete() && value.is_discrete());
        if !ok {
            self.mismatch(format!("cannot convert `{value}` to `{target}`"), args[0].span);
        }
        target
    }

    fn builtin(&mut self, expr: &Expr, builtin: Builtin, args: &[Expr], statement: bool) -> Mode {
        let modes: Vec<Mode> = args.iter().map(|a| self.check_expr(a)).collect();
        let arity = |this: &mut Self, n: usize, name: &str| -> bool {
            if modes.len() != n {
                this.mismatch(format!("`{name}` takes {n} argument(s)"), expr.span);
                false
            } else {
                true
            }
        };
        match builtin {
            Builtin::WriteText => {
                if !statement {
                    self.mismatch("WRITETEXT does not return a value", expr.span);
                }
                let Some(first) = args.first() else {
                    self.mismatch("WRITETEXT needs a format string", expr.span);
                    return Mode::Unknown;
                };
                let ExprKind::Str(format) = &first.kind else {
                    self.mismatch("the WRITETEXT format must be a string literal", first.span);
                    return Mode::Unknown;
                };
                match parse_format(format) {
                    Ok(pieces) => {
                        let wanted = pieces.iter().filter(|p| **p == FormatPiece::Value).count();
                        if wanted != args.len() - 1 {
                            self.mismatch(
                                format!("format has {wanted} `%C` directive(s) but {} value(s) were supplied", args.len() - 1),
                                expr.span,
                            );
                        }
                    }
                    Err(c) => self.mismatch(format!("unsupported format directive `%{c}`"), first.span),
                }
                for (arg, mode) in args.iter().zip(&modes).skip(1) {
                    let printable = mode.is_unknown()
                        || mode.is_discrete()
                        || mode.is_char_like()
                        || mode.is_duration();
                    if !printable {
                        self.mismatch(format!("values of mode `{mode}` cannot be written"), arg.span);
                    }
                }
                Mode::Unknown
            }
            Builtin::Num => {
                if arity(self, 1, "NUM") && !modes[0].is_discrete() && !modes[0].is_unknown() {
                    self.mismatch(format!("NUM needs a discrete value, found `{}`", modes[0]), args[0].span);
                }
                Mode::int()
            }
            Builtin::Succ | Builtin::Pred => {
                if !arity(self, 1, "SUCC/PRED") {
                    return Mode::Unknown;
                }
                if !modes[0].is_discrete() && !modes[0].is_unknown() {
                    self.mismatch(format!("SUCC and PRED need a discrete value, found `{}`", modes[0]), args[0].span);
                }
                modes[0].clone()
            }
            Builtin::Abs => {
                if arity(self, 1, "ABS") && !modes[0].is_integer() && !modes[0].is_unknown() {
                    self.mismatch(format!("ABS needs an integer, found `{}`", modes[0]), args[0].span);
                }
                Mode::int()
            }
            Builtin::Size => {
                arity(self, 1, "SIZE");
                Mode::int()
            }
            Builtin::Length => {
                if arity(self, 1, "LENGTH") && !modes[0].is_char_like() && !modes[0].is_unknown() {
                    self.mismatch(format!("LENGTH needs a string, found `{}`", modes[0]), args[0].span);
                }
                Mode::int()
            }
            Builtin::Upper | Builtin::Lower => {
                if !arity(self, 1, "UPPER/LOWER") {
                    return Mode::int();
                }
                let bounds = match modes[0].strip() {
                    Mode::Array { lo, hi, index, .. } => Some(((*lo, *hi), (**index).clone())),
                    Mode::CharString(n) => Some(((0, *n as i64 - 1), Mode::int())),
                    other if other.is_discrete() => other.discrete_bounds().map(|b| (b, modes[0].clone())),
                    _ => None,
                };
                match bounds {
                    Some(((lo, hi), mode)) => {
                        let v = if builtin == Builtin::Upper { hi } else { lo };
                        self.out.consts.insert(expr.id, v);
                        match mode.strip() {
                            Mode::Range { base, .. } => (**base).clone(),
                            _ => mode,
                        }
                    }
                    None => {
                        if !modes[0].is_unknown() {
                            self.mismatch(format!("UPPER and LOWER need an array or a discrete value, found `{}`", modes[0]), args[0].span);
                        }
                        Mode::int()
                    }
                }
            }
            Builtin::Card => {
                if arity(self, 1, "CARD")
                    && !matches!(modes[0].strip(), Mode::PowerSet(_) | Mode::Unknown)
                {
                    self.mismatch(format!("CARD needs a POWERSET value, found `{}`", modes[0]), args[0].span);
                }
                Mode::int()
            }
            Builtin::Max | Builtin::Min => {
                if modes.len() < 2 {
                    self.mismatch("MAX and MIN need at least two values", expr.span);
                }
                for (arg, mode) in args.iter().zip(&modes) {
                    if !mode.is_integer() && !mode.is_unknown() {
                        self.mismatch(format!("MAX and MIN need integers, found `{mode}`"), arg.span);
                    }
                }
                Mode::int()
            }
            Builtin::Incl | Builtin::Excl => {
                let name = if builtin == Builtin::Incl { "INCL" } else { "EXCL" };
                if !statement {
                    self.mismatch(format!("{name} does not return a value"), expr.span);
                }
                if !arity(self, 2, name) {
                    return Mode::Unknown;
                }
                match modes[0].strip() {
                    Mode::PowerSet(base) => {
                        if !self.is_location(&args[0]) {
                            self.mismatch(format!("{name} needs a powerset location"), args[0].span);
                        }
                        if !compatible(base, &modes[1]) {
                            self.mismatch(
                                format!("`{}` is not a member mode of `{}`", modes[1], modes[0]),
                                args[1].span,
                            );
                        }
                    }
                    Mode::Unknown => {}
                    other => {
                        self.mismatch(format!("{name} needs a POWERSET location, found `{other}`"), args[0].span);
                    }
                }
                Mode::Unknown
            }
        }
    }

    // ---------------------------------------------------------------
    // constants

    /// Fold a constant discrete expression. Enumeration literals fold to
    /// their ordinal, BOOL to 0/1 and CHAR to its code.
    fn const_value(&mut self, expr: &Expr) -> Option<i64> {
        if let Some(v) = self.out.consts.get(&expr.id) {
            return Some(*v);
        }
        match &expr.kind {
            ExprKind::Int { value, .. } => Some(*value),
            ExprKind::Bool(b) => Some(*b as i64),
            ExprKind::Char(c) => Some(*c as i64),
            ExprKind::Name(name) => {
                let id = self.table.resolved(name.span)?;
                match self.table.symbol(id).kind {
                    SymbolKind::SetElement => self.ordinals.get(&id).copied(),
                    SymbolKind::Synonym => {
                        let def = self.syn_defs.get(&id).copied()?;
                        if self.syn_state.get(&id) == Some(&State::InProgress)
                            && self.table.symbol(id).mode.is_some()
                        {
                            return None;
                        }
                        self.syn_mode(id);
                        if matches!(self.table.symbol(id).mode, Some(Mode::Unknown)) {
                            return None;
                        }
                        self.const_value(&def.value)
                    }
                    _ => None,
                }
            }
            ExprKind::Unary { op, operand } => {
                let v = self.const_value(operand)?;
                match op {
                    UnOp::Neg => v.checked_neg(),
                    UnOp::Not => Some(1 - v),
                }
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let l = self.const_value(lhs)?;
                let r = self.const_value(rhs)?;
                match op {
                    BinOp::Add => l.checked_add(r),
                    BinOp::Sub => l.checked_sub(r),
                    BinOp::Mul => l.checked_mul(r),
                    BinOp::Div => l.checked_div(r),
                    BinOp::Rem => l.checked_rem(r),
                    BinOp::Mod => {
                        if r <= 0 {
                            None
                        } else {
                            Some(l.rem_euclid(r))
                        }
                    }
                    BinOp::Eq => Some((l == r) as i64),
                    BinOp::Ne => Some((l != r) as i64),
                    BinOp::Lt => Some((l < r) as i64),
                    BinOp::Le => Some((l <= r) as i64),
                    BinOp::Gt => Some((l > r) as i64),
                    BinOp::Ge => Some((l >= r) as i64),
                    BinOp::And | BinOp::AndIf => Some((l != 0 && r != 0) as i64),
                    BinOp::Or | BinOp::OrIf => Some((l != 0 || r != 0) as i64),
                    BinOp::Xor => Some(((l != 0) != (r != 0)) as i64),
                    BinOp::In | BinOp::Concat => None,
                }
            }
            ExprKind::Call { callee, args } if args.len() == 1 => {
                let ExprKind::Name(name) = &callee.kind else { return None };
                let upper = name.name.to_ascii_uppercase();
                let v = self.const_value(&args[0])?;
                match self.table.resolved(name.span) {
                    Some(id) if self.table.symbol(id).kind == SymbolKind::Mode => Some(v),
                    Some(_) => None,
                    None => match upper.as_str() {
                        "NUM" => Some(v),
                        "ABS" => v.checked_abs(),
                        "SUCC" => v.checked_add(1),
                        "PRED" => v.checked_sub(1),
                        _ if Mode::predefined(&upper).is_some() => Some(v),
                        _ => None,
                    },
                }
            }
            _ => None,
        }
    }
}

fn is_set(mode: &Mode) -> bool {
    matches!(mode.strip(), Mode::BitString(_) | Mode::PowerSet(_))
}

fn string_len(mode: &Mode) -> Option<u32> {
    match mode.root() {
        Mode::Primitive(Primitive::Char) => Some(1),
        Mode::CharString(n) => Some(*n),
        _ => None,
    }
}

/// Number of values in `lo..=hi` covered by the (non-overlapping)
/// label intervals.
fn count_covered(covered: &[(i64, i64, Span)], lo: i64, hi: i64) -> u64 {
    covered
        .iter()
        .map(|&(l, h, _)| {
            let l = l.max(lo);
            let h = h.min(hi);
            if l > h {
                0
            } else {
                (h as i128 - l as i128 + 1) as u64
            }
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_directives() {
        assert_eq!(
            parse_format("n=%C%/").unwrap(),
            vec![
                FormatPiece::Text("n=".into()),
                FormatPiece::Value,
                FormatPiece::Newline
            ]
        );
        assert_eq!(
            parse_format("100%%").unwrap(),
            vec![FormatPiece::Text("100%".into())]
        );
        assert_eq!(parse_format("%X"), Err('X'));
        assert_eq!(parse_format("trailing %"), Err('%'));
    }

    #[test]
    fn coverage_counts_clip_to_bounds() {
        let s = Span::dummy();
        assert_eq!(count_covered(&[(0, 1, s), (3, 10, s)], 0, 4), 4);
        assert_eq!(count_covered(&[], 0, 4), 0);
    }
}
