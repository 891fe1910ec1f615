//! C11 generation.
//!
//! Lowers a checked module to one self-contained C translation unit:
//! the runtime from `c_runtime`, one typedef per distinct aggregate
//! mode, file-scope globals for module and region locations, one C
//! function per procedure and one thread entry per process. Nested
//! procedures are lifted to file scope; they may not touch locals of
//! the procedure they are nested in.
//!
//! Code generation only runs on modules without errors. Constructs
//! that are well-moded but have no C lowering are reported as
//! `E0500` diagnostics.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::ast::*;
use crate::c_runtime::{self, MAILBOX_CAPACITY, RESERVED_C_NAMES};
use crate::compiler::CompileOptions;
use crate::diagnostic::{codes, Diagnostic, DiagnosticKind};
use crate::modecheck::{parse_format, Builtin, CallKind, FormatPiece, ModeTable};
use crate::modes::{Mode, Primitive};
use crate::span::Span;
use crate::symbols::{ScopeId, ScopeKind, SymbolId, SymbolKind, SymbolTable};

const INDENT: &str = "    ";

/// Generate the C translation unit for `module`.
pub fn generate(
    module: &Module,
    table: &SymbolTable,
    modes: &ModeTable,
    options: &CompileOptions,
) -> Result<String, Vec<Diagnostic>> {
    let _span = tracing::debug_span!("codegen_c").entered();
    let mut gen = Gen::new(module, table, modes);
    gen.collect_items(&module.items);
    gen.declare();
    gen.module_init(options);
    while let Some(next) = gen.pending.pop_front() {
        match next {
            Pending::Proc(def) => gen.procedure(def),
            Pending::Process(def) => gen.process(def),
        }
    }
    if !gen.diagnostics.is_empty() {
        tracing::debug!(errors = gen.diagnostics.len(), "C generation failed");
        return Err(gen.diagnostics);
    }
    let text = gen.assemble(options);
    tracing::debug!(bytes = text.len(), "C generation finished");
    Ok(text)
}

enum Pending<'a> {
    Proc(&'a ProcDef),
    Process(&'a ProcessDef),
}

/// What the function being emitted is.
#[derive(Debug, Clone, Default)]
struct FuncCtx {
    /// Owning procedure or process scope; `None` for module code.
    home: Option<ScopeId>,
    /// Mutex held for the whole body of a region procedure.
    region: Option<String>,
    result: Option<Mode>,
    process: bool,
}

struct LoopLabel {
    name: String,
    used: bool,
}

#[derive(Default)]
struct Names {
    symbols: HashMap<SymbolId, String>,
    used: HashSet<String>,
}

impl Names {
    fn fresh(&mut self, base: &str) -> String {
        let base = c_identifier(base);
        let mut candidate = base.clone();
        let mut n = 1;
        while self.used.contains(&candidate) {
            n += 1;
            candidate = format!("{base}_{n}");
        }
        self.used.insert(candidate.clone());
        candidate
    }
}

/// Identifier safe to use in C: reserved words and the runtime's
/// `chill_` namespace get a `u_` prefix.
fn c_identifier(name: &str) -> String {
    let lower = name.to_ascii_lowercase();
    if RESERVED_C_NAMES.contains(&name) || lower.starts_with("chill_") {
        format!("u_{name}")
    } else {
        name.to_string()
    }
}

/// Registry of C types, one typedef per distinct aggregate mode.
#[derive(Default)]
struct Types {
    out: String,
    aggregates: HashMap<Mode, String>,
    /// NEWMODE key to its typedef name.
    novel: HashMap<String, String>,
    chars: HashSet<u32>,
    cats: HashSet<u32>,
    bits: HashSet<u64>,
    enum_names: HashMap<Vec<String>, String>,
    count: u32,
}

impl Types {
    fn c_type(&mut self, mode: &Mode) -> String {
        match mode {
            Mode::Novel { key, inner, .. } => match self.novel.get(key) {
                Some(name) => name.clone(),
                None => self.c_type(inner),
            },
            Mode::Primitive(p) => match p {
                Primitive::Int => "int32_t",
                Primitive::Bool => "bool",
                Primitive::Char => "char",
                Primitive::Time | Primitive::Duration => "int64_t",
            }
            .to_string(),
            Mode::Range { lo, hi, base } => match base.root() {
                Mode::Primitive(Primitive::Int) => int_type(*lo, *hi).to_string(),
                other => {
                    let other = other.clone();
                    self.c_type(&other)
                }
            },
            Mode::Enumeration(names) => {
                if names.len() <= 256 {
                    "uint8_t".to_string()
                } else {
                    "uint16_t".to_string()
                }
            }
            Mode::CharString(n) => self.chars(*n),
            Mode::BitString(n) => self.bits(*n as u64),
            Mode::PowerSet(base) => self.bits(base.cardinality().unwrap_or(1)),
            Mode::Reference(inner) => match inner.strip() {
                Mode::Unknown => "void *".to_string(),
                _ => format!("{} *", self.c_type(inner)),
            },
            Mode::Structure(fields) => {
                if let Some(name) = self.aggregates.get(mode) {
                    return name.clone();
                }
                let members: Vec<String> = fields
                    .iter()
                    .map(|(name, m)| format!("{INDENT}{} {};\n", self.c_type(m), c_identifier(name)))
                    .collect();
                self.count += 1;
                let name = format!("chill_struct_{}", self.count);
                self.out
                    .push_str(&format!("typedef struct {{\n{}}} {name};\n\n", members.concat()));
                self.aggregates.insert(mode.clone(), name.clone());
                name
            }
            Mode::Array { lo, hi, elem, .. } => {
                if let Some(name) = self.aggregates.get(mode) {
                    return name.clone();
                }
                let elem = self.c_type(elem);
                self.count += 1;
                let name = format!("chill_array_{}", self.count);
                let len = *hi as i128 - *lo as i128 + 1;
                self.out
                    .push_str(&format!("typedef struct {{\n{INDENT}{elem} e[{len}];\n}} {name};\n\n"));
                self.aggregates.insert(mode.clone(), name.clone());
                name
            }
            Mode::Procedure { params, result } => {
                if let Some(name) = self.aggregates.get(mode) {
                    return name.clone();
                }
                let ret = match result {
                    Some(r) => self.c_type(r),
                    None => "void".to_string(),
                };
                let params = self.param_types(params);
                self.count += 1;
                let name = format!("chill_proc_{}", self.count);
                self.out
                    .push_str(&format!("typedef {ret} (*{name})({params});\n\n"));
                self.aggregates.insert(mode.clone(), name.clone());
                name
            }
            Mode::Process { .. } | Mode::Instance => "chill_instance *".to_string(),
            Mode::Signal { .. } => "int".to_string(),
            Mode::Buffer { .. } => "chill_buffer".to_string(),
            Mode::Event => "chill_event".to_string(),
            Mode::Unknown => "int64_t".to_string(),
        }
    }

    fn param_types(&mut self, params: &[(ParamDir, Mode)]) -> String {
        if params.is_empty() {
            return "void".to_string();
        }
        params
            .iter()
            .map(|(dir, m)| {
                let t = self.c_type(m);
                if dir.by_reference() {
                    format!("{t} *")
                } else {
                    t
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// `CHARS(n)`: a NUL-terminated buffer wrapped in a struct so that
    /// it is assignable.
    fn chars(&mut self, n: u32) -> String {
        let name = format!("chill_chars_{n}");
        if self.chars.insert(n) {
            self.out.push_str(&format!(
                "typedef struct {{\n{INDENT}char s[{len}];\n}} {name};\n\n\
                 static inline {name} chill_str_{n}(const char *src)\n{{\n\
                 {INDENT}{name} r;\n\
                 {INDENT}size_t i = 0;\n\
                 {INDENT}memset(&r, 0, sizeof r);\n\
                 {INDENT}for (; i < {n} && src[i] != '\\0'; i++)\n\
                 {INDENT}{INDENT}r.s[i] = src[i];\n\
                 {INDENT}return r;\n}}\n\n",
                len = n + 1
            ));
        }
        name
    }

    fn concat(&mut self, n: u32) -> String {
        let ty = self.chars(n);
        let name = format!("chill_cat_{n}");
        if self.cats.insert(n) {
            self.out.push_str(&format!(
                "static inline {ty} {name}(const char *a, const char *b)\n{{\n\
                 {INDENT}{ty} r;\n\
                 {INDENT}size_t i = 0;\n\
                 {INDENT}memset(&r, 0, sizeof r);\n\
                 {INDENT}for (; i < {n} && *a != '\\0'; i++)\n\
                 {INDENT}{INDENT}r.s[i] = *a++;\n\
                 {INDENT}for (; i < {n} && *b != '\\0'; i++)\n\
                 {INDENT}{INDENT}r.s[i] = *b++;\n\
                 {INDENT}return r;\n}}\n\n"
            ));
        }
        name
    }

    /// Bit strings and powersets: an unsigned word up to 64 members,
    /// a word array above.
    fn bits(&mut self, n: u64) -> String {
        match n {
            0..=8 => "uint8_t".to_string(),
            9..=16 => "uint16_t".to_string(),
            17..=32 => "uint32_t".to_string(),
            33..=64 => "uint64_t".to_string(),
            _ => {
                let name = format!("chill_bits_{n}");
                if self.bits.insert(n) {
                    self.out.push_str(&format!(
                        "typedef struct {{\n{INDENT}uint64_t w[{}];\n}} {name};\n\n",
                        n.div_ceil(64)
                    ));
                }
                name
            }
        }
    }

    /// Table of literal names for WRITETEXT on SET values.
    fn enum_names(&mut self, names: &[String]) -> String {
        if let Some(table) = self.enum_names.get(names) {
            return table.clone();
        }
        self.count += 1;
        let table = format!("chill_names_{}", self.count);
        let list: Vec<String> = names.iter().map(|n| c_string(n)).collect();
        self.out.push_str(&format!(
            "static const char *const {table}[] = {{{}}};\n\n",
            list.join(", ")
        ));
        self.enum_names.insert(names.to_vec(), table.clone());
        table
    }
}

fn int_type(lo: i64, hi: i64) -> &'static str {
    if lo >= 0 {
        match hi {
            h if h <= u8::MAX as i64 => "uint8_t",
            h if h <= u16::MAX as i64 => "uint16_t",
            h if h <= u32::MAX as i64 => "uint32_t",
            _ => "int64_t",
        }
    } else if lo >= i8::MIN as i64 && hi <= i8::MAX as i64 {
        "int8_t"
    } else if lo >= i16::MIN as i64 && hi <= i16::MAX as i64 {
        "int16_t"
    } else if lo >= i32::MIN as i64 && hi <= i32::MAX as i64 {
        "int32_t"
    } else {
        "int64_t"
    }
}

fn bit_width(mode: &Mode) -> u64 {
    match mode.strip() {
        Mode::BitString(n) => *n as u64,
        Mode::PowerSet(base) => base.cardinality().unwrap_or(1),
        _ => 0,
    }
}

fn int_lit(v: i64) -> String {
    if v == i64::MIN {
        "INT64_MIN".to_string()
    } else if v < i32::MIN as i64 || v > i32::MAX as i64 {
        format!("INT64_C({v})")
    } else if v < 0 {
        format!("({v})")
    } else {
        v.to_string()
    }
}

fn char_lit(code: i64) -> String {
    let byte = (code & 0xff) as u8;
    match byte {
        b'\'' => "'\\''".to_string(),
        b'\\' => "'\\\\'".to_string(),
        0x20..=0x7e => format!("'{}'", byte as char),
        _ => format!("'\\{byte:03o}'"),
    }
}

fn escape_into(out: &mut String, s: &str, percent: bool) {
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '?' => out.push_str("\\?"),
            '%' if percent => out.push_str("%%"),
            ' '..='~' => out.push(c),
            _ => {
                let mut buf = [0u8; 4];
                for byte in c.encode_utf8(&mut buf).bytes() {
                    out.push_str(&format!("\\{byte:03o}"));
                }
            }
        }
    }
}

fn c_string(s: &str) -> String {
    let mut out = String::from("\"");
    escape_into(&mut out, s, false);
    out.push('"');
    out
}

/// Stable signal id so that separately compiled units agree.
fn signal_id(name: &str) -> u32 {
    let mut hash: u32 = 0x811c_9dc5;
    for byte in name.bytes() {
        hash ^= byte as u32;
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash & 0x7fff_ffff
}

fn zero_init(mode: &Mode) -> &'static str {
    match mode.strip() {
        Mode::Structure(_)
        | Mode::Array { .. }
        | Mode::CharString(_)
        | Mode::Buffer { .. }
        | Mode::Event => "{0}",
        Mode::BitString(_) | Mode::PowerSet(_) if bit_width(mode) > 64 => "{0}",
        Mode::Reference(_) | Mode::Instance | Mode::Process { .. } | Mode::Procedure { .. } => {
            "NULL"
        }
        _ => "0",
    }
}

struct Gen<'a> {
    table: &'a SymbolTable,
    modes: &'a ModeTable,
    module: &'a Module,
    names: Names,
    types: Types,
    decls: String,
    protos: String,
    funcs: String,
    /// Runtime object initialisation run before module code.
    init_prelude: String,
    syn_defs: HashMap<SymbolId, &'a SynDef>,
    signal_dest: HashMap<SymbolId, SymbolId>,
    /// Global synonyms without a constant initialiser.
    runtime_syns: HashSet<SymbolId>,
    out: String,
    indent: usize,
    func: FuncCtx,
    loops: Vec<LoopLabel>,
    subst: HashMap<SymbolId, String>,
    pending: VecDeque<Pending<'a>>,
    tmp: u32,
    reported: HashSet<(SymbolId, Option<ScopeId>)>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Gen<'a> {
    fn new(module: &'a Module, table: &'a SymbolTable, modes: &'a ModeTable) -> Gen<'a> {
        Gen {
            table,
            modes,
            module,
            names: Names::default(),
            types: Types::default(),
            decls: String::new(),
            protos: String::new(),
            funcs: String::new(),
            init_prelude: String::new(),
            syn_defs: HashMap::new(),
            signal_dest: HashMap::new(),
            runtime_syns: HashSet::new(),
            out: String::new(),
            indent: 0,
            func: FuncCtx::default(),
            loops: Vec::new(),
            subst: HashMap::new(),
            pending: VecDeque::new(),
            tmp: 0,
            reported: HashSet::new(),
            diagnostics: Vec::new(),
        }
    }

    fn unsupported(&mut self, message: impl Into<String>, span: Span) {
        self.diagnostics.push(
            Diagnostic::error(DiagnosticKind::ModeMismatch, message, span).with_code(codes::UNSUPPORTED),
        );
    }

    fn line(&mut self, text: impl AsRef<str>) {
        for _ in 0..self.indent {
            self.out.push_str(INDENT);
        }
        self.out.push_str(text.as_ref());
        self.out.push('\n');
    }

    fn next_tmp(&mut self) -> u32 {
        self.tmp += 1;
        self.tmp
    }

    fn cname(&mut self, id: SymbolId) -> String {
        if let Some(name) = self.names.symbols.get(&id) {
            return name.clone();
        }
        let name = self.names.fresh(&self.table.symbol(id).name);
        self.names.symbols.insert(id, name.clone());
        name
    }

    fn mode_of(&self, expr: &Expr) -> Mode {
        self.modes.mode(expr.id).cloned().unwrap_or(Mode::Unknown)
    }

    fn symbol_mode(&self, id: SymbolId) -> Mode {
        self.table.symbol(id).mode.clone().unwrap_or(Mode::Unknown)
    }

    fn c_type(&mut self, mode: &Mode) -> String {
        self.types.c_type(mode)
    }

    /// Procedure or process scope a location lives in; `Some(None)` for
    /// locals of module code, `None` for file-scope globals.
    fn home_of(&self, scope: ScopeId) -> Option<Option<ScopeId>> {
        let mut current = scope;
        loop {
            let sc = self.table.scope(current);
            match sc.kind {
                ScopeKind::Module | ScopeKind::Region if current == scope => return None,
                ScopeKind::Module | ScopeKind::Region => return Some(None),
                ScopeKind::Procedure | ScopeKind::Process => return Some(Some(current)),
                ScopeKind::Block | ScopeKind::Loop => match sc.parent {
                    Some(parent) => current = parent,
                    None => return Some(None),
                },
            }
        }
    }

    fn is_global(&self, id: SymbolId) -> bool {
        self.home_of(self.table.symbol(id).scope).is_none()
    }

    // ---------------------------------------------------------------
    // collection and file-scope declarations

    fn collect_items(&mut self, items: &'a [Item]) {
        for item in items {
            match item {
                Item::Syn(def) => {
                    if let Some(id) = self.table.declared_at(def.name.span) {
                        self.syn_defs.insert(id, def);
                    }
                }
                Item::Signal(def) => {
                    let dest = def.dest.as_ref().and_then(|d| self.table.resolved(d.span));
                    if let (Some(id), Some(dest)) = (self.table.declared_at(def.name.span), dest) {
                        self.signal_dest.insert(id, dest);
                    }
                }
                Item::Proc(def) => self.collect_items(&def.body),
                Item::Process(def) => self.collect_items(&def.body),
                Item::Region(def) => self.collect_items(&def.body),
                Item::Stmt(stmt) => self.collect_stmt(stmt),
                Item::Grant(_) | Item::Seize(_) | Item::ModeDef(_) | Item::Dcl(_) => {}
            }
        }
    }

    fn collect_stmt(&mut self, stmt: &'a Stmt) {
        let mut bodies: Vec<&'a [Stmt]> = Vec::new();
        match &stmt.kind {
            StmtKind::Begin { body } => self.collect_items(body),
            StmtKind::If { arms, else_body } => {
                bodies.extend(arms.iter().map(|(_, b)| b.as_slice()));
                bodies.extend(else_body.as_deref());
            }
            StmtKind::Case { arms, else_body, .. } => {
                bodies.extend(arms.iter().map(|a| a.body.as_slice()));
                bodies.extend(else_body.as_deref());
            }
            StmtKind::ReceiveCase { alts, else_body } => {
                bodies.extend(alts.iter().map(|a| a.body.as_slice()));
                bodies.extend(else_body.as_deref());
            }
            StmtKind::DoWhile { body, .. }
            | StmtKind::DoFor { body, .. }
            | StmtKind::DoEver { body } => bodies.push(body),
            _ => {}
        }
        for body in bodies {
            for stmt in body {
                self.collect_stmt(stmt);
            }
        }
    }

    fn declare(&mut self) {
        let table = self.table;
        // Names with linkage keep their spelling across units.
        for sym in table.symbols() {
            if sym.granted || sym.seized {
                self.cname(sym.id);
            }
            let unknown = sym.mode.as_ref().map_or(true, Mode::is_unknown);
            if sym.seized && unknown && !sym.references.is_empty() {
                let message = format!("no granting unit describes the seized name `{}`", sym.name);
                self.unsupported(message, sym.def_span);
            }
        }

        for sym in table.symbols() {
            if sym.kind != SymbolKind::Mode {
                continue;
            }
            if let Some(Mode::Novel { key, inner, .. }) = &sym.mode {
                let inner = self.c_type(inner);
                let name = self.cname(sym.id);
                self.types.out.push_str(&format!("typedef {inner} {name};\n\n"));
                self.types.novel.insert(key.clone(), name);
            }
        }

        self.declare_set_literals();

        let mut signal_ids: HashMap<u32, SymbolId> = HashMap::new();
        for sym in table.symbols() {
            match sym.kind {
                SymbolKind::Signal => {
                    let name = self.cname(sym.id);
                    let id = signal_id(&sym.name);
                    if let Some(&other) = signal_ids.get(&id) {
                        let message = format!(
                            "signals `{}` and `{}` map to the same C signal id",
                            table.symbol(other).name,
                            sym.name
                        );
                        self.unsupported(message, sym.def_span);
                    }
                    signal_ids.insert(id, sym.id);
                    self.decls.push_str(&format!("enum {{ CHILL_SIG_{name} = {id} }};\n"));
                    if let Some(Mode::Signal { payload, .. }) = &sym.mode {
                        if !payload.is_empty() {
                            let fields: Vec<String> = payload
                                .iter()
                                .enumerate()
                                .map(|(i, m)| format!("{INDENT}{} f{i};\n", self.c_type(m)))
                                .collect();
                            self.decls.push_str(&format!(
                                "typedef struct {{\n{}}} chill_sig_{name};\n",
                                fields.concat()
                            ));
                        }
                    }
                    self.decls.push('\n');
                }
                SymbolKind::Region => {
                    let name = self.cname(sym.id);
                    self.decls
                        .push_str(&format!("static pthread_mutex_t chill_region_{name};\n\n"));
                    self.init_prelude
                        .push_str(&format!("{INDENT}chill_region_init(&chill_region_{name});\n"));
                }
                SymbolKind::Process => self.declare_process(sym.id),
                SymbolKind::Procedure => self.declare_procedure(sym.id),
                SymbolKind::Variable if sym.param_dir.is_none() && self.is_global(sym.id) => {
                    self.declare_global(sym.id)
                }
                SymbolKind::Synonym if self.is_global(sym.id) => self.declare_synonym(sym.id),
                _ => {}
            }
        }
    }

    fn declare_set_literals(&mut self) {
        let table = self.table;
        let mut groups: Vec<(Vec<String>, Vec<String>)> = Vec::new();
        for sym in table.symbols() {
            if sym.kind != SymbolKind::SetElement {
                continue;
            }
            let Some(elements) = sym.mode.as_ref().and_then(|m| m.set_elements()) else {
                continue;
            };
            let Some(ordinal) = elements.iter().position(|e| *e == sym.name) else {
                continue;
            };
            let name = self.cname(sym.id);
            let entry = format!("{name} = {ordinal}");
            match groups.iter_mut().find(|(key, members)| key.as_slice() == elements && members.len() < elements.len()) {
                Some((_, members)) => members.push(entry),
                None => groups.push((elements.to_vec(), vec![entry])),
            }
        }
        for (_, members) in groups {
            self.decls.push_str(&format!("enum {{ {} }};\n", members.join(", ")));
        }
        if !self.decls.is_empty() {
            self.decls.push('\n');
        }
    }

    fn declare_process(&mut self, id: SymbolId) {
        let sym = self.table.symbol(id);
        let (seized, granted) = (sym.seized, sym.granted);
        let params = match &sym.mode {
            Some(Mode::Process { params, .. }) => params.clone(),
            _ => Vec::new(),
        };
        let name = self.cname(id);
        if !params.is_empty() {
            let fields: Vec<String> = params
                .iter()
                .enumerate()
                .map(|(i, m)| format!("{INDENT}{} a{i};\n", self.c_type(m)))
                .collect();
            self.decls
                .push_str(&format!("typedef struct {{\n{}}} chill_args_{name};\n", fields.concat()));
        }
        self.decls
            .push_str(&format!("static chill_instance *chill_last_{name};\n\n"));
        let linkage = if seized {
            "extern "
        } else if granted {
            ""
        } else {
            "static "
        };
        self.protos
            .push_str(&format!("{linkage}void chill_process_{name}(void *chill_arg);\n"));
    }

    fn declare_procedure(&mut self, id: SymbolId) {
        let sym = self.table.symbol(id);
        let Some(Mode::Procedure { params, result }) = sym.mode.clone() else {
            return;
        };
        let linkage = if sym.seized {
            "extern "
        } else if sym.granted {
            ""
        } else {
            "static "
        };
        let name = self.cname(id);
        let ret = match &result {
            Some(r) => self.c_type(r),
            None => "void".to_string(),
        };
        let params = self.types.param_types(&params);
        self.protos
            .push_str(&format!("{linkage}{ret} {name}({params});\n"));
    }

    fn declare_global(&mut self, id: SymbolId) {
        let sym = self.table.symbol(id);
        let (seized, granted) = (sym.seized, sym.granted);
        let mode = self.symbol_mode(id);
        if mode.is_unknown() {
            return;
        }
        let ty = self.c_type(&mode);
        let name = self.cname(id);
        if seized {
            self.decls.push_str(&format!("extern {ty} {name};\n"));
            return;
        }
        let linkage = if granted { "" } else { "static " };
        self.decls.push_str(&format!("{linkage}{ty} {name};\n"));
        if let Some(init) = self.runtime_object_init(&name, &mode) {
            self.init_prelude.push_str(&format!("{INDENT}{init}\n"));
        }
    }

    fn runtime_object_init(&mut self, name: &str, mode: &Mode) -> Option<String> {
        match mode.strip() {
            Mode::Buffer { capacity, elem } => {
                let elem = self.c_type(elem);
                let capacity = capacity.unwrap_or(MAILBOX_CAPACITY);
                Some(format!("chill_buffer_init(&{name}, sizeof({elem}), {capacity});"))
            }
            Mode::Event => Some(format!("chill_event_init(&{name});")),
            _ => None,
        }
    }

    fn declare_synonym(&mut self, id: SymbolId) {
        let sym = self.table.symbol(id);
        let (seized, granted) = (sym.seized, sym.granted);
        let mode = self.symbol_mode(id);
        if mode.is_unknown() {
            return;
        }
        let ty = self.c_type(&mode);
        let name = self.cname(id);
        if seized {
            let qualifier = if mode.is_discrete() { "const " } else { "" };
            self.decls.push_str(&format!("extern {qualifier}{ty} {name};\n"));
            return;
        }
        let linkage = if granted { "" } else { "static " };
        let value = self
            .syn_defs
            .get(&id)
            .and_then(|def| self.modes.const_value(def.value.id));
        match value {
            Some(v) if mode.is_discrete() => {
                let lit = self.literal(v, &mode);
                self.decls
                    .push_str(&format!("{linkage}const {ty} {name} = {lit};\n"));
            }
            _ => {
                self.decls.push_str(&format!("{linkage}{ty} {name};\n"));
                self.runtime_syns.insert(id);
            }
        }
    }

    fn literal(&self, v: i64, mode: &Mode) -> String {
        match mode.root() {
            Mode::Primitive(Primitive::Bool) => if v != 0 { "true" } else { "false" }.to_string(),
            Mode::Primitive(Primitive::Char) => char_lit(v),
            _ => int_lit(v),
        }
    }

    // ---------------------------------------------------------------
    // functions

    fn module_init(&mut self, options: &CompileOptions) {
        self.func = FuncCtx::default();
        self.out.clear();
        self.indent = 1;
        self.out.push_str(&self.init_prelude.clone());
        self.items(&self.module.items, true);
        let body = std::mem::take(&mut self.out);
        let header = if options.emit_main {
            "static void chill_module_init(void)".to_string()
        } else {
            format!("void chill_init_{}(void)", self.module_symbol_name())
        };
        self.funcs.push_str(&format!("{header}\n{{\n{body}}}\n\n"));
    }

    fn module_symbol_name(&self) -> String {
        self.module
            .name
            .as_ref()
            .map(|n| c_identifier(&n.name))
            .unwrap_or_else(|| "module".to_string())
    }

    fn procedure(&mut self, def: &'a ProcDef) {
        let Some(id) = self.table.declared_at(def.name.span) else { return };
        let sym = self.table.symbol(id);
        let Some(Mode::Procedure { params, result }) = sym.mode.clone() else { return };
        let linkage = if sym.granted { "" } else { "static " };
        let region = match self.table.scope(sym.scope) {
            sc if sc.kind == ScopeKind::Region => sc.owner.map(|owner| self.cname(owner)),
            _ => None,
        };
        let home = sym.owned_scope;
        let name = self.cname(id);

        let mut list = Vec::new();
        for (param, (dir, mode)) in def.params.iter().zip(&params) {
            let Some(pid) = self.table.declared_at(param.name.span) else { continue };
            let ty = self.c_type(mode);
            let pname = self.cname(pid);
            if dir.by_reference() {
                list.push(format!("{ty} *{pname}"));
            } else {
                list.push(format!("{ty} {pname}"));
            }
        }
        let list = if list.is_empty() { "void".to_string() } else { list.join(", ") };
        let ret = match &result {
            Some(r) => self.c_type(r),
            None => "void".to_string(),
        };

        self.func = FuncCtx {
            home,
            region: region.map(|r| format!("chill_region_{r}")),
            result: result.map(|r| *r),
            process: false,
        };
        self.out.clear();
        self.indent = 1;
        if let Some(region) = self.func.region.clone() {
            self.line(format!("chill_region_enter(&{region});"));
        }
        if let Some(result) = self.func.result.clone() {
            let ty = self.c_type(&result);
            self.line(format!("{ty} chill_result = {};", zero_init(&result)));
        }
        self.items(&def.body, false);
        if let Some(region) = self.func.region.clone() {
            self.line(format!("chill_region_leave(&{region});"));
        }
        if self.func.result.is_some() {
            self.line("return chill_result;");
        }
        let body = std::mem::take(&mut self.out);
        self.funcs
            .push_str(&format!("{linkage}{ret} {name}({list})\n{{\n{body}}}\n\n"));
    }

    fn process(&mut self, def: &'a ProcessDef) {
        let Some(id) = self.table.declared_at(def.name.span) else { return };
        let sym = self.table.symbol(id);
        let linkage = if sym.granted { "" } else { "static " };
        let home = sym.owned_scope;
        let name = self.cname(id);
        self.func = FuncCtx {
            home,
            region: None,
            result: None,
            process: true,
        };
        self.out.clear();
        self.indent = 1;
        if def.params.is_empty() {
            self.line("(void)chill_arg;");
        } else {
            self.line(format!("chill_args_{name} *chill_args = chill_arg;"));
        }
        for (i, param) in def.params.iter().enumerate() {
            let Some(pid) = self.table.declared_at(param.name.span) else { continue };
            let mode = self.symbol_mode(pid);
            let ty = self.c_type(&mode);
            let pname = self.cname(pid);
            self.line(format!("{ty} {pname} = chill_args->a{i};"));
        }
        self.items(&def.body, false);
        let body = std::mem::take(&mut self.out);
        self.funcs.push_str(&format!(
            "{linkage}void chill_process_{name}(void *chill_arg)\n{{\n{body}}}\n\n"
        ));
    }

    /// `global` is set for module and region level code, whose
    /// locations are file-scope globals.
    fn items(&mut self, items: &'a [Item], global: bool) {
        for item in items {
            match item {
                Item::Dcl(dcl) if global => self.global_init(dcl),
                Item::Dcl(dcl) => self.local_dcl(dcl),
                Item::Syn(def) => self.synonym_init(def, global),
                Item::Proc(def) => self.pending.push_back(Pending::Proc(def)),
                Item::Process(def) => self.pending.push_back(Pending::Process(def)),
                Item::Region(def) => self.items(&def.body, true),
                Item::Stmt(stmt) => self.stmt(stmt),
                Item::Grant(_) | Item::Seize(_) | Item::ModeDef(_) | Item::Signal(_) => {}
            }
        }
    }

    fn global_init(&mut self, dcl: &'a Dcl) {
        let Some(init) = &dcl.init else { return };
        let mut first: Option<String> = None;
        for name in &dcl.names {
            let Some(id) = self.table.declared_at(name.span) else { continue };
            let cname = self.cname(id);
            let value = match &first {
                Some(first) => first.clone(),
                None => {
                    let mode = self.symbol_mode(id);
                    self.coerce(init, &mode)
                }
            };
            self.line(format!("{cname} = {value};"));
            first.get_or_insert(cname);
        }
    }

    fn local_dcl(&mut self, dcl: &'a Dcl) {
        let mut first: Option<String> = None;
        for name in &dcl.names {
            let Some(id) = self.table.declared_at(name.span) else { continue };
            let mode = self.symbol_mode(id);
            let ty = self.c_type(&mode);
            let cname = self.cname(id);
            let value = match (&first, &dcl.init) {
                (Some(first), Some(_)) => Some(first.clone()),
                (None, Some(init)) => Some(self.coerce(init, &mode)),
                _ => None,
            };
            let object_init = self.runtime_object_init(&cname, &mode);
            if dcl.is_static {
                self.line(format!("static {ty} {cname};"));
                if value.is_some() || object_init.is_some() {
                    let once = format!("chill_once_{}", self.next_tmp());
                    self.line(format!("static bool {once};"));
                    self.line(format!("if (!{once}) {{"));
                    self.indent += 1;
                    self.line(format!("{once} = true;"));
                    if let Some(init) = &object_init {
                        self.line(init);
                    }
                    if let Some(value) = &value {
                        self.line(format!("{cname} = {value};"));
                    }
                    self.indent -= 1;
                    self.line("}");
                }
            } else {
                match &value {
                    Some(value) => self.line(format!("{ty} {cname} = {value};")),
                    None => self.line(format!("{ty} {cname} = {};", zero_init(&mode))),
                }
                if let Some(init) = &object_init {
                    self.line(init);
                }
            }
            if dcl.init.is_some() {
                first.get_or_insert(cname);
            }
        }
    }

    fn synonym_init(&mut self, def: &'a SynDef, global: bool) {
        let Some(id) = self.table.declared_at(def.name.span) else { return };
        if global {
            if self.runtime_syns.contains(&id) {
                let mode = self.symbol_mode(id);
                let cname = self.cname(id);
                let value = self.coerce(&def.value, &mode);
                self.line(format!("{cname} = {value};"));
            }
            return;
        }
        let mode = self.symbol_mode(id);
        let ty = self.c_type(&mode);
        let cname = self.cname(id);
        let value = self.coerce(&def.value, &mode);
        self.line(format!("const {ty} {cname} = {value};"));
    }

    // ---------------------------------------------------------------
    // statements

    fn block(&mut self, stmts: &'a [Stmt]) {
        self.indent += 1;
        for stmt in stmts {
            self.stmt(stmt);
        }
        self.indent -= 1;
    }

    fn stmt(&mut self, stmt: &'a Stmt) {
        match &stmt.kind {
            StmtKind::Assign { target, value } => self.assign(target, value),
            StmtKind::Call(call) => self.call_stmt(call),
            StmtKind::If { arms, else_body } => {
                for (i, (cond, body)) in arms.iter().enumerate() {
                    let cond = self.expr(cond);
                    if i == 0 {
                        self.line(format!("if ({cond}) {{"));
                    } else {
                        self.line(format!("}} else if ({cond}) {{"));
                    }
                    self.block(body);
                }
                if let Some(body) = else_body {
                    self.line("} else {");
                    self.block(body);
                }
                self.line("}");
            }
            StmtKind::Case {
                selector,
                arms,
                else_body,
            } => self.case(selector, arms, else_body.as_deref()),
            StmtKind::DoWhile { cond, body } => {
                let cond = self.expr(cond);
                self.push_loop();
                self.line(format!("while ({cond}) {{"));
                self.block(body);
                self.line("}");
                self.pop_loop();
            }
            StmtKind::DoFor {
                var,
                start,
                end,
                step,
                down,
                body,
            } => self.do_for(var, start, end, step.as_ref(), *down, body),
            StmtKind::DoEver { body } => {
                self.push_loop();
                self.line("for (;;) {");
                self.block(body);
                self.line("}");
                self.pop_loop();
            }
            StmtKind::Begin { body } => {
                self.line("{");
                self.indent += 1;
                self.items(body, false);
                self.indent -= 1;
                self.line("}");
            }
            StmtKind::Exit => match self.loops.last_mut() {
                Some(label) => {
                    label.used = true;
                    let name = label.name.clone();
                    self.line(format!("goto {name};"));
                }
                None => self.unsupported("EXIT outside of a loop", stmt.span),
            },
            StmtKind::Return(value) => self.return_stmt(value.as_ref()),
            StmtKind::Result(value) => {
                let mode = self.func.result.clone().unwrap_or(Mode::Unknown);
                let value = self.coerce(value, &mode);
                self.line(format!("chill_result = {value};"));
            }
            StmtKind::Send { target, args, dest } => self.send(stmt.span, target, args, dest.as_ref()),
            StmtKind::ReceiveCase { alts, else_body } => self.receive_case(alts, else_body.as_deref()),
            StmtKind::Start { process, args } => {
                let call = self.start(process, args);
                self.line(format!("{call};"));
            }
            StmtKind::Stop(None) => self.line("chill_exit_process();"),
            StmtKind::Stop(Some(instance)) => {
                let instance = self.expr(instance);
                self.line(format!("chill_stop({instance});"));
            }
            StmtKind::Delay(value) => {
                let mode = self.mode_of(value);
                let value = self.expr(value);
                if matches!(mode.strip(), Mode::Event) {
                    self.line(format!("chill_event_wait(&{value});"));
                } else {
                    self.line(format!("chill_delay({value});"));
                }
            }
            StmtKind::Continue(event) => {
                let event = self.expr(event);
                self.line(format!("chill_event_continue(&{event});"));
            }
        }
    }

    fn assign(&mut self, target: &'a Expr, value: &'a Expr) {
        if let Some((base, index)) = self.bit_element(target) {
            let width = bit_width(&self.mode_of(base));
            let b = self.expr(base);
            let i = self.expr(index);
            let v = self.expr(value);
            if width <= 64 {
                let ty = self.c_type(&self.mode_of(base));
                self.line(format!(
                    "{b} = ({ty})(({b} & ~((uint64_t)1 << ({i}))) | ((uint64_t)(({v}) != 0) << ({i})));"
                ));
            } else {
                self.line(format!(
                    "{b}.w[({i}) / 64] = ({b}.w[({i}) / 64] & ~((uint64_t)1 << (({i}) % 64))) | ((uint64_t)(({v}) != 0) << (({i}) % 64));"
                ));
            }
            return;
        }
        let mode = self.mode_of(target);
        let t = self.expr(target);
        let v = self.coerce(value, &mode);
        self.line(format!("{t} = {v};"));
    }

    /// Element of a bit string used as an assignment target.
    fn bit_element(&self, target: &'a Expr) -> Option<(&'a Expr, &'a Expr)> {
        let (base, index) = match &target.kind {
            ExprKind::Index { base, index } => (&**base, &**index),
            ExprKind::Call { callee, args }
                if args.len() == 1 && matches!(self.modes.call_kind(target.id), Some(CallKind::Index)) =>
            {
                (&**callee, &args[0])
            }
            _ => return None,
        };
        matches!(self.mode_of(base).strip(), Mode::BitString(_)).then_some((base, index))
    }

    fn call_stmt(&mut self, call: &'a Expr) {
        let kind = self.modes.call_kind(call.id).cloned();
        match (&call.kind, kind) {
            (ExprKind::Call { args, .. }, Some(CallKind::Builtin(Builtin::WriteText))) => self.write_text(args),
            (ExprKind::Call { args, .. }, Some(CallKind::Builtin(Builtin::Incl))) => {
                self.powerset_update(call, true, args)
            }
            (ExprKind::Call { args, .. }, Some(CallKind::Builtin(Builtin::Excl))) => {
                self.powerset_update(call, false, args)
            }
            (ExprKind::Name(_), _) => {
                let callee = self.expr(call);
                self.line(format!("{callee}();"));
            }
            _ => {
                let call = self.expr(call);
                self.line(format!("{call};"));
            }
        }
    }

    fn write_text(&mut self, args: &'a [Expr]) {
        let Some(ExprKind::Str(format)) = args.first().map(|a| &a.kind) else { return };
        let pieces = parse_format(format).unwrap_or_default();
        let mut fmt = String::new();
        let mut values = String::new();
        let mut rest = args.iter().skip(1);
        for piece in pieces {
            match piece {
                FormatPiece::Text(text) => escape_into(&mut fmt, &text, true),
                FormatPiece::Newline => fmt.push_str("\\n"),
                FormatPiece::Value => {
                    let Some(arg) = rest.next() else { continue };
                    let (directive, value) = self.printable(arg);
                    fmt.push_str(directive);
                    values.push_str(", ");
                    values.push_str(&value);
                }
            }
        }
        self.line(format!("printf(\"{fmt}\"{values});"));
        self.line("fflush(stdout);");
    }

    fn printable(&mut self, arg: &'a Expr) -> (&'static str, String) {
        let mode = self.mode_of(arg);
        match mode.root() {
            Mode::Primitive(Primitive::Bool) => {
                let v = self.expr(arg);
                ("%s", format!("({v}) ? \"TRUE\" : \"FALSE\""))
            }
            Mode::Primitive(Primitive::Char) => ("%c", self.expr(arg)),
            Mode::CharString(_) => ("%s", self.char_ptr(arg)),
            Mode::Enumeration(names) => {
                let names = names.clone();
                let table = self.types.enum_names(&names);
                let v = self.expr(arg);
                ("%s", format!("{table}[{v}]"))
            }
            _ => {
                let v = self.expr(arg);
                ("%lld", format!("(long long)({v})"))
            }
        }
    }

    fn push_loop(&mut self) {
        let name = format!("chill_exit_{}", self.next_tmp());
        self.loops.push(LoopLabel { name, used: false });
    }

    fn pop_loop(&mut self) {
        if let Some(label) = self.loops.pop() {
            if label.used {
                self.line(format!("{}:;", label.name));
            }
        }
    }

    fn do_for(
        &mut self,
        var: &Ident,
        start: &'a Expr,
        end: &'a Expr,
        step: Option<&'a Expr>,
        down: bool,
        body: &'a [Stmt],
    ) {
        let n = self.next_tmp();
        let counter = format!("chill_i_{n}");
        let limit = format!("chill_end_{n}");
        let start = self.expr(start);
        let end = self.expr(end);
        let step_const = step.and_then(|s| self.modes.const_value(s.id));
        let step = match step {
            Some(step) => self.expr(step),
            None => "1".to_string(),
        };
        let descending = down || step_const.is_some_and(|s| s < 0);
        let cmp = if descending { ">=" } else { "<=" };
        let advance = if down { "-=" } else { "+=" };

        self.line("{");
        self.indent += 1;
        let var_id = self.table.declared_at(var.span);
        let assign_var = match var_id {
            Some(id) => {
                let mode = self.symbol_mode(id);
                let ty = self.c_type(&mode);
                let cname = self.cname(id);
                self.line(format!("{ty} {cname};"));
                Some(format!("{cname} = ({ty}){counter};"))
            }
            None => None,
        };
        self.line(format!("int64_t {limit} = {end};"));
        self.push_loop();
        self.line(format!(
            "for (int64_t {counter} = {start}; {counter} {cmp} {limit}; {counter} {advance} {step}) {{"
        ));
        if let Some(assign) = assign_var {
            self.indent += 1;
            self.line(assign);
            self.indent -= 1;
        }
        self.block(body);
        self.line("}");
        self.pop_loop();
        self.indent -= 1;
        self.line("}");
    }

    fn return_stmt(&mut self, value: Option<&'a Expr>) {
        if self.func.process || self.func.home.is_none() {
            self.line("return;");
            return;
        }
        let region = self.func.region.clone();
        match (value, self.func.result.clone()) {
            (Some(value), Some(result)) => {
                let v = self.coerce(value, &result);
                match region {
                    Some(region) => {
                        let ty = self.c_type(&result);
                        self.line("{");
                        self.indent += 1;
                        self.line(format!("{ty} chill_ret = {v};"));
                        self.line(format!("chill_region_leave(&{region});"));
                        self.line("return chill_ret;");
                        self.indent -= 1;
                        self.line("}");
                    }
                    None => self.line(format!("return {v};")),
                }
            }
            (_, result) => {
                let ret = if result.is_some() { "return chill_result;" } else { "return;" };
                match region {
                    Some(region) => {
                        self.line("{");
                        self.indent += 1;
                        self.line(format!("chill_region_leave(&{region});"));
                        self.line(ret);
                        self.indent -= 1;
                        self.line("}");
                    }
                    None => self.line(ret),
                }
            }
        }
    }

    fn case(&mut self, selector: &'a Expr, arms: &'a [CaseArm], else_body: Option<&'a [Stmt]>) {
        let sel_mode = self.mode_of(selector);
        let sel = self.expr(selector);
        let simple = arms
            .iter()
            .flat_map(|a| &a.labels)
            .all(|l| matches!(l, CaseLabel::Value(_) | CaseLabel::Any(_)));
        if simple {
            self.line(format!("switch ({sel}) {{"));
            for arm in arms {
                for label in &arm.labels {
                    match label {
                        CaseLabel::Value(value) => {
                            let label = self.case_const(value, &sel_mode);
                            self.line(format!("case {label}:"));
                        }
                        CaseLabel::Any(_) => self.line("default:"),
                        CaseLabel::Range(..) => {}
                    }
                }
                self.case_body(&arm.body);
            }
            if let Some(body) = else_body {
                self.line("default:");
                self.case_body(body);
            }
            self.line("}");
            return;
        }

        let ty = self.c_type(&sel_mode);
        let tmp = format!("chill_sel_{}", self.next_tmp());
        self.line("{");
        self.indent += 1;
        self.line(format!("{ty} {tmp} = {sel};"));
        let mut default: Option<&'a [Stmt]> = else_body;
        let mut first = true;
        for arm in arms {
            let mut tests = Vec::new();
            for label in &arm.labels {
                match label {
                    CaseLabel::Value(value) => {
                        let v = self.case_const(value, &sel_mode);
                        tests.push(format!("{tmp} == {v}"));
                    }
                    CaseLabel::Range(lo, hi) => {
                        let lo = self.case_const(lo, &sel_mode);
                        let hi = self.case_const(hi, &sel_mode);
                        tests.push(format!("({tmp} >= {lo} && {tmp} <= {hi})"));
                    }
                    CaseLabel::Any(_) => {}
                }
            }
            if arm.labels.iter().any(|l| matches!(l, CaseLabel::Any(_))) {
                default = Some(arm.body.as_slice());
                continue;
            }
            if tests.is_empty() {
                continue;
            }
            let kw = if first { "if" } else { "} else if" };
            first = false;
            self.line(format!("{kw} ({}) {{", tests.join(" || ")));
            self.block(&arm.body);
        }
        if let Some(body) = default {
            if first {
                self.line("{");
            } else {
                self.line("} else {");
            }
            self.block(body);
            self.line("}");
        } else if !first {
            self.line("}");
        }
        self.indent -= 1;
        self.line("}");
    }

    fn case_body(&mut self, body: &'a [Stmt]) {
        self.indent += 1;
        self.line("{");
        self.block(body);
        self.indent += 1;
        self.line("break;");
        self.indent -= 1;
        self.line("}");
        self.indent -= 1;
    }

    fn case_const(&mut self, value: &'a Expr, sel: &Mode) -> String {
        if let ExprKind::Name(name) = &value.kind {
            if let Some(id) = self.table.resolved(name.span) {
                if self.table.symbol(id).kind == SymbolKind::SetElement {
                    return self.cname(id);
                }
            }
        }
        match self.modes.const_value(value.id) {
            Some(v) => self.literal(v, sel),
            None => self.expr(value),
        }
    }

    fn send(&mut self, span: Span, target: &Ident, args: &'a [Expr], dest: Option<&'a Expr>) {
        let Some(id) = self.table.resolved(target.span) else { return };
        let mode = self.symbol_mode(id);
        match mode.strip() {
            Mode::Signal { payload, .. } => {
                let name = self.cname(id);
                let payload = payload.clone();
                let dest = match dest {
                    Some(dest) => self.expr(dest),
                    None => match self.signal_dest.get(&id).copied() {
                        Some(process) => {
                            let pname = self.cname(process);
                            let literal = c_string(&self.table.symbol(process).name);
                            format!("chill_latest(&chill_last_{pname}, {literal})")
                        }
                        None => {
                            self.unsupported(format!("signal `{}` has no destination process", target.name), span);
                            return;
                        }
                    },
                };
                if payload.is_empty() {
                    self.line(format!("chill_send({dest}, CHILL_SIG_{name}, NULL, 0);"));
                    return;
                }
                let values: Vec<String> = args
                    .iter()
                    .zip(&payload)
                    .map(|(arg, m)| self.coerce(arg, m))
                    .collect();
                self.line(format!(
                    "chill_send({dest}, CHILL_SIG_{name}, &(chill_sig_{name}){{{}}}, sizeof(chill_sig_{name}));",
                    values.join(", ")
                ));
            }
            Mode::Buffer { elem, .. } => {
                let elem = (**elem).clone();
                let ty = self.c_type(&elem);
                let buffer = self.variable(id, target.span);
                if let Some(arg) = args.first() {
                    let value = self.coerce(arg, &elem);
                    self.line(format!("chill_buffer_put(&{buffer}, &({ty}){{{value}}});"));
                }
            }
            _ => {}
        }
    }

    fn receive_case(&mut self, alts: &'a [ReceiveAlt], else_body: Option<&'a [Stmt]>) {
        let n = self.next_tmp();
        let rx = format!("chill_rx_{n}");
        let msg = format!("chill_msg_{n}");
        let prev = format!("chill_prev_{n}");
        let cur = format!("chill_m_{n}");
        let payload_var = format!("chill_p_{n}");

        struct Alt {
            signal: String,
            payload: Vec<Mode>,
        }
        let mut info = Vec::new();
        for alt in alts {
            let Some(id) = self.table.resolved(alt.signal.span) else { continue };
            let payload = match self.symbol_mode(id).strip() {
                Mode::Signal { payload, .. } => payload.clone(),
                _ => Vec::new(),
            };
            info.push((alt, Alt { signal: self.cname(id), payload }));
        }

        self.line("{");
        self.indent += 1;
        self.line(format!("chill_instance *{rx} = chill_receiver();"));
        self.line(format!("chill_message *{msg} = NULL;"));
        self.line(format!("pthread_mutex_lock(&{rx}->lock);"));
        self.line("for (;;) {");
        self.indent += 1;
        self.line(format!("chill_message *{prev} = NULL;"));
        self.line(format!(
            "for (chill_message *{cur} = {rx}->head; {cur} != NULL; {prev} = {cur}, {cur} = {cur}->next) {{"
        ));
        self.indent += 1;
        for (i, (alt, a)) in info.iter().enumerate() {
            let alt: &'a ReceiveAlt = *alt;
            let kw = if i == 0 { "if" } else { "} else if" };
            self.line(format!("{kw} ({cur}->kind == CHILL_SIG_{}) {{", a.signal));
            self.indent += 1;
            match &alt.guard {
                None => {
                    self.line(format!("{msg} = {cur};"));
                    self.line("break;");
                }
                Some(guard) => {
                    if !a.payload.is_empty() && !alt.bindings.is_empty() {
                        self.line(format!(
                            "const chill_sig_{s} *{payload_var} = (const chill_sig_{s} *){cur}->payload;",
                            s = a.signal
                        ));
                        for (j, binding) in alt.bindings.iter().enumerate() {
                            if let Some(bid) = self.table.resolved(binding.span) {
                                self.subst.insert(bid, format!("{payload_var}->f{j}"));
                            }
                        }
                    }
                    let cond = self.expr(guard);
                    self.subst.clear();
                    self.line(format!("if ({cond}) {{"));
                    self.indent += 1;
                    self.line(format!("{msg} = {cur};"));
                    self.line("break;");
                    self.indent -= 1;
                    self.line("}");
                }
            }
            self.indent -= 1;
        }
        if !info.is_empty() {
            self.line("}");
        }
        self.indent -= 1;
        self.line("}");
        self.line(format!("if ({msg} != NULL) {{"));
        self.indent += 1;
        self.line(format!("chill_unlink({rx}, {prev}, {msg});"));
        self.line("break;");
        self.indent -= 1;
        self.line("}");
        if else_body.is_some() {
            self.line("break;");
        }
        self.line(format!("chill_wait_message({rx});"));
        self.indent -= 1;
        self.line("}");
        self.line(format!("pthread_mutex_unlock(&{rx}->lock);"));

        for (i, (alt, a)) in info.iter().enumerate() {
            let alt: &'a ReceiveAlt = *alt;
            let kw = if i == 0 { "if" } else { "} else if" };
            self.line(format!("{kw} ({msg} != NULL && {msg}->kind == CHILL_SIG_{}) {{", a.signal));
            self.indent += 1;
            if !a.payload.is_empty() && !alt.bindings.is_empty() {
                self.line(format!(
                    "const chill_sig_{s} *{payload_var} = (const chill_sig_{s} *){msg}->payload;",
                    s = a.signal
                ));
                for (j, (binding, value_mode)) in alt.bindings.iter().zip(&a.payload).enumerate() {
                    let Some(bid) = self.table.resolved(binding.span) else { continue };
                    let target_mode = self.symbol_mode(bid);
                    let target = self.variable(bid, binding.span);
                    let field = format!("{payload_var}->f{j}");
                    let value = match (target_mode.strip(), value_mode.strip()) {
                        (Mode::CharString(n), Mode::CharString(m)) if n != m => {
                            let n = *n;
                            self.types.chars(n);
                            format!("chill_str_{n}({field}.s)")
                        }
                        _ => field,
                    };
                    self.line(format!("{target} = {value};"));
                }
            }
            self.line(format!("free({msg});"));
            self.block(&alt.body);
            self.indent -= 1;
        }
        match else_body {
            Some(body) if info.is_empty() => {
                self.line("{");
                self.block(body);
                self.line("}");
            }
            Some(body) => {
                self.line("} else {");
                self.block(body);
                self.line("}");
            }
            None if !info.is_empty() => self.line("}"),
            None => {}
        }
        self.indent -= 1;
        self.line("}");
    }

    fn start(&mut self, process: &Ident, args: &'a [Expr]) -> String {
        let Some(id) = self.table.resolved(process.span) else {
            return "NULL".to_string();
        };
        let params = match self.symbol_mode(id).strip() {
            Mode::Process { params, .. } => params.clone(),
            _ => Vec::new(),
        };
        let name = self.cname(id);
        if params.is_empty() {
            return format!("chill_start(chill_process_{name}, NULL, 0, &chill_last_{name})");
        }
        let values: Vec<String> = args
            .iter()
            .zip(&params)
            .map(|(arg, m)| self.coerce(arg, m))
            .collect();
        format!(
            "chill_start(chill_process_{name}, &(chill_args_{name}){{{}}}, sizeof(chill_args_{name}), &chill_last_{name})",
            values.join(", ")
        )
    }

    // ---------------------------------------------------------------
    // expressions

    /// A variable or synonym reference, checked against the function
    /// being emitted.
    fn variable(&mut self, id: SymbolId, span: Span) -> String {
        if let Some(s) = self.subst.get(&id) {
            return s.clone();
        }
        let sym = self.table.symbol(id);
        if let Some(home) = self.home_of(sym.scope) {
            if home != self.func.home && self.reported.insert((id, self.func.home)) {
                let message = format!(
                    "`{}` is local to an enclosing procedure and cannot be used from a nested one",
                    sym.name
                );
                self.diagnostics.push(
                    Diagnostic::error(DiagnosticKind::ModeMismatch, message, span)
                        .with_code(codes::UNSUPPORTED)
                        .with_secondary_label(sym.def_span, "declared here".to_string())
                        .with_note("move the location to module level or pass it as a parameter"),
                );
            }
        }
        let by_ref = sym.param_dir.is_some_and(|d| d.by_reference());
        let name = self.cname(id);
        if by_ref {
            format!("(*{name})")
        } else {
            name
        }
    }

    fn expr(&mut self, expr: &'a Expr) -> String {
        match &expr.kind {
            ExprKind::Int { value, .. } => int_lit(*value),
            ExprKind::Bool(b) => if *b { "true" } else { "false" }.to_string(),
            ExprKind::Char(c) => char_lit(*c as i64),
            ExprKind::Str(s) => {
                let n = s.chars().count() as u32;
                self.types.chars(n);
                format!("chill_str_{n}({})", c_string(s))
            }
            ExprKind::Null => "NULL".to_string(),
            ExprKind::This => "chill_self".to_string(),
            ExprKind::Name(name) => match self.table.resolved(name.span) {
                Some(id) => match self.table.symbol(id).kind {
                    SymbolKind::Synonym => match self.synonym_const(id) {
                        Some(lit) => lit,
                        None => self.variable(id, name.span),
                    },
                    SymbolKind::Variable => self.variable(id, name.span),
                    _ => self.cname(id),
                },
                None => c_identifier(&name.name),
            },
            ExprKind::Binary { op, lhs, rhs } => self.binary(expr, *op, lhs, rhs),
            ExprKind::Unary { op, operand } => {
                let mode = self.mode_of(operand);
                let v = self.expr(operand);
                match op {
                    UnOp::Neg => format!("(-{v})"),
                    UnOp::Not if mode.is_bool() => format!("(!{v})"),
                    UnOp::Not => {
                        let width = bit_width(&mode);
                        if width > 64 {
                            self.unsupported("NOT on a bit set wider than 64 members", expr.span);
                            return v;
                        }
                        let ty = self.c_type(&mode);
                        format!("(({ty})(~(uint64_t){v} & {}))", mask(width))
                    }
                }
            }
            ExprKind::Call { callee, args } => self.call(expr, callee, args),
            ExprKind::Field { base, field } => {
                let base_mode = self.mode_of(base);
                let spelled = match base_mode.strip() {
                    Mode::Structure(fields) => fields
                        .iter()
                        .find(|(n, _)| n.eq_ignore_ascii_case(&field.name))
                        .map(|(n, _)| n.clone())
                        .unwrap_or_else(|| field.name.clone()),
                    _ => field.name.clone(),
                };
                let base = self.expr(base);
                format!("{base}.{}", c_identifier(&spelled))
            }
            ExprKind::Index { base, index } => self.index(base, index),
            ExprKind::Deref(inner) => {
                let v = self.expr(inner);
                format!("(*{v})")
            }
            ExprKind::AddressOf(inner) => {
                let v = self.expr(inner);
                format!("(&{v})")
            }
            ExprKind::Start { process, args } => self.start(process, args),
            ExprKind::Receive(buffer) => {
                let elem = match self.mode_of(buffer).strip() {
                    Mode::Buffer { elem, .. } => (**elem).clone(),
                    _ => Mode::Unknown,
                };
                let ty = self.c_type(&elem);
                let b = self.expr(buffer);
                format!("(*({ty} *)chill_buffer_get(&{b}, &({ty}){{0}}))")
            }
            ExprKind::Duration { amount, unit } => {
                let v = self.expr(amount);
                match unit.millis() {
                    Some(1) => format!("((int64_t){v})"),
                    Some(scale) => format!("((int64_t){v} * {scale})"),
                    None => format!("((int64_t){v} / 1000)"),
                }
            }
            ExprKind::Tuple(elems) => self.tuple(expr, elems),
        }
    }

    /// Powerset tuple as the OR of one bit per member.
    fn tuple(&mut self, expr: &'a Expr, elems: &'a [Expr]) -> String {
        if elems.is_empty() {
            return "0".to_string();
        }
        let mode = self.mode_of(expr);
        if bit_width(&mode) > 64 {
            self.unsupported(
                format!("powerset tuple of mode `{mode}` has more than 64 members"),
                expr.span,
            );
            return "0".to_string();
        }
        let ty = self.c_type(&mode);
        let bits: Vec<String> = elems.iter().map(|e| self.member_bit(&mode, e)).collect();
        format!("(({ty})({}))", bits.join(" | "))
    }

    fn member_bit(&mut self, set: &Mode, member: &'a Expr) -> String {
        let lo = match set.strip() {
            Mode::PowerSet(base) => base.discrete_bounds().map_or(0, |(lo, _)| lo),
            _ => 0,
        };
        let v = self.expr(member);
        if lo == 0 {
            format!("((uint64_t)1 << ({v}))")
        } else {
            format!("((uint64_t)1 << (({v}) - {}))", int_lit(lo))
        }
    }

    /// `INCL(p, e)` / `EXCL(p, e)`.
    fn powerset_update(&mut self, call: &'a Expr, include: bool, args: &'a [Expr]) {
        let [set, member] = args else { return };
        let mode = self.mode_of(set);
        if bit_width(&mode) > 64 {
            self.unsupported("INCL and EXCL on powersets of more than 64 members", call.span);
            return;
        }
        let ty = self.c_type(&mode);
        let bit = self.member_bit(&mode, member);
        let s = self.expr(set);
        if include {
            self.line(format!("{s} = ({ty})({s} | {bit});"));
        } else {
            self.line(format!("{s} = ({ty})({s} & ~{bit});"));
        }
    }

    fn synonym_const(&self, id: SymbolId) -> Option<String> {
        let mode = self.symbol_mode(id);
        if !mode.is_discrete() {
            return None;
        }
        let def = self.syn_defs.get(&id)?;
        let v = self.modes.const_value(def.value.id)?;
        Some(self.literal(v, &mode))
    }

    /// `CHARS` or `CHAR` operand as a `const char *`.
    fn char_ptr(&mut self, expr: &'a Expr) -> String {
        if let ExprKind::Str(s) = &expr.kind {
            return c_string(s);
        }
        let mode = self.mode_of(expr);
        let v = self.expr(expr);
        match mode.root() {
            Mode::Primitive(Primitive::Char) => format!("((const char[2]){{{v}, 0}})"),
            Mode::CharString(_) => format!("{v}.s"),
            _ => v,
        }
    }

    /// `expr` converted for storing into a location of `target` mode.
    fn coerce(&mut self, expr: &'a Expr, target: &Mode) -> String {
        if let Mode::CharString(n) = target.strip() {
            let n = *n;
            let source = self.mode_of(expr);
            let same = matches!(source.strip(), Mode::CharString(m) if *m == n);
            if !same || matches!(expr.kind, ExprKind::Str(_)) {
                self.types.chars(n);
                let ptr = self.char_ptr(expr);
                return format!("chill_str_{n}({ptr})");
            }
        }
        self.expr(expr)
    }

    fn binary(&mut self, expr: &'a Expr, op: BinOp, lhs: &'a Expr, rhs: &'a Expr) -> String {
        let lm = self.mode_of(lhs);
        let rm = self.mode_of(rhs);
        let strings = (lm.is_char_like() || rm.is_char_like())
            && !(matches!(lm.root(), Mode::Primitive(Primitive::Char))
                && matches!(rm.root(), Mode::Primitive(Primitive::Char)));
        match op {
            BinOp::And | BinOp::Or | BinOp::Xor => {
                if lm.is_bool() {
                    let l = self.expr(lhs);
                    let r = self.expr(rhs);
                    let sym = match op {
                        BinOp::And => "&&",
                        BinOp::Or => "||",
                        _ => "!=",
                    };
                    return format!("({l} {sym} {r})");
                }
                if bit_width(&lm) > 64 {
                    self.unsupported(
                        format!("`{}` on bit sets wider than 64 members", op.as_str()),
                        expr.span,
                    );
                }
                let l = self.expr(lhs);
                let r = self.expr(rhs);
                let sym = match op {
                    BinOp::And => "&",
                    BinOp::Or => "|",
                    _ => "^",
                };
                format!("({l} {sym} {r})")
            }
            BinOp::AndIf | BinOp::OrIf => {
                let l = self.expr(lhs);
                let r = self.expr(rhs);
                let sym = if op == BinOp::AndIf { "&&" } else { "||" };
                format!("({l} {sym} {r})")
            }
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
                let sym = match op {
                    BinOp::Eq => "==",
                    BinOp::Ne => "!=",
                    BinOp::Lt => "<",
                    BinOp::Le => "<=",
                    BinOp::Gt => ">",
                    _ => ">=",
                };
                if strings {
                    let l = self.char_ptr(lhs);
                    let r = self.char_ptr(rhs);
                    return format!("(strcmp({l}, {r}) {sym} 0)");
                }
                let aggregate = matches!(lm.strip(), Mode::Structure(_) | Mode::Array { .. })
                    || bit_width(&lm) > 64;
                if aggregate {
                    let ty = self.c_type(&lm);
                    let l = self.expr(lhs);
                    let r = self.expr(rhs);
                    return format!("(memcmp(&({ty}){{{l}}}, &({ty}){{{r}}}, sizeof({ty})) {sym} 0)");
                }
                let l = self.expr(lhs);
                let r = self.expr(rhs);
                format!("({l} {sym} {r})")
            }
            BinOp::In => {
                let lo = match rm.strip() {
                    Mode::PowerSet(base) => base.discrete_bounds().map_or(0, |(lo, _)| lo),
                    _ => 0,
                };
                let l = self.expr(lhs);
                let r = self.expr(rhs);
                let offset = if lo == 0 {
                    format!("({l})")
                } else {
                    format!("(({l}) - {})", int_lit(lo))
                };
                if bit_width(&rm) > 64 {
                    format!("((({r}).w[{offset} / 64] >> ({offset} % 64)) & 1u)")
                } else {
                    format!("((((uint64_t){r}) >> {offset}) & 1u)")
                }
            }
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Rem => {
                let l = self.expr(lhs);
                let r = self.expr(rhs);
                let sym = match op {
                    BinOp::Add => "+",
                    BinOp::Sub => "-",
                    BinOp::Mul => "*",
                    BinOp::Div => "/",
                    _ => "%",
                };
                format!("({l} {sym} {r})")
            }
            BinOp::Mod => {
                let l = self.expr(lhs);
                let r = self.expr(rhs);
                format!("chill_mod({l}, {r})")
            }
            BinOp::Concat => match self.mode_of(expr).strip() {
                Mode::CharString(n) => {
                    let helper = self.types.concat(*n);
                    let l = self.char_ptr(lhs);
                    let r = self.char_ptr(rhs);
                    format!("{helper}({l}, {r})")
                }
                Mode::BitString(n) if *n <= 64 => {
                    let shift = bit_width(&lm);
                    let ty = self.types.bits(*n as u64);
                    let l = self.expr(lhs);
                    let r = self.expr(rhs);
                    format!("(({ty})((uint64_t){l} | ((uint64_t){r} << {shift})))")
                }
                _ => {
                    self.unsupported("concatenation of bit strings wider than 64 bits", expr.span);
                    String::new()
                }
            },
        }
    }

    fn index(&mut self, base: &'a Expr, index: &'a Expr) -> String {
        let mode = self.mode_of(base);
        let b = self.expr(base);
        let i = self.expr(index);
        match mode.strip() {
            Mode::Array { lo: 0, .. } => format!("{b}.e[{i}]"),
            Mode::Array { lo, .. } => format!("{b}.e[({i}) - {}]", int_lit(*lo)),
            Mode::CharString(_) => format!("{b}.s[{i}]"),
            Mode::BitString(n) if *n > 64 => format!("(((({b}).w[({i}) / 64] >> (({i}) % 64)) & 1u) != 0)"),
            Mode::BitString(_) => format!("(((((uint64_t){b}) >> ({i})) & 1u) != 0)"),
            _ => format!("{b}[{i}]"),
        }
    }

    fn call(&mut self, expr: &'a Expr, callee: &'a Expr, args: &'a [Expr]) -> String {
        match self.modes.call_kind(expr.id).cloned() {
            Some(CallKind::Index) if args.len() == 1 => self.index(callee, &args[0]),
            Some(CallKind::Conversion(target)) if args.len() == 1 => self.conversion(&args[0], &target),
            Some(CallKind::Builtin(builtin)) => self.builtin(expr, builtin, args),
            _ => {
                let params = match self.mode_of(callee).strip() {
                    Mode::Procedure { params, .. } => params.clone(),
                    _ => Vec::new(),
                };
                let f = self.expr(callee);
                let mut values = Vec::new();
                for (i, arg) in args.iter().enumerate() {
                    match params.get(i) {
                        Some((dir, _)) if dir.by_reference() => {
                            let v = self.expr(arg);
                            values.push(format!("&{v}"));
                        }
                        Some((_, mode)) => {
                            let mode = mode.clone();
                            values.push(self.coerce(arg, &mode));
                        }
                        None => values.push(self.expr(arg)),
                    }
                }
                format!("{f}({})", values.join(", "))
            }
        }
    }

    fn conversion(&mut self, arg: &'a Expr, target: &Mode) -> String {
        let source = self.mode_of(arg);
        if matches!(target.strip(), Mode::CharString(_)) {
            return self.coerce(arg, target);
        }
        if target.is_discrete() && source.is_discrete() {
            let ty = self.c_type(target);
            let v = self.expr(arg);
            return format!("(({ty}){v})");
        }
        self.expr(arg)
    }

    fn builtin(&mut self, expr: &'a Expr, builtin: Builtin, args: &'a [Expr]) -> String {
        if let Some(v) = self.modes.const_value(expr.id) {
            return int_lit(v);
        }
        let Some(first) = args.first() else {
            return "0".to_string();
        };
        match builtin {
            Builtin::Num => {
                let v = self.expr(first);
                format!("((int32_t){v})")
            }
            Builtin::Succ => {
                let v = self.expr(first);
                format!("({v} + 1)")
            }
            Builtin::Pred => {
                let v = self.expr(first);
                format!("({v} - 1)")
            }
            Builtin::Abs => {
                let v = self.expr(first);
                format!("((int32_t)chill_abs({v}))")
            }
            Builtin::Size => {
                let mode = self.mode_of(first);
                let ty = self.c_type(&mode);
                format!("((int32_t)sizeof({ty}))")
            }
            Builtin::Length => match self.mode_of(first).root() {
                Mode::Primitive(Primitive::Char) => "1".to_string(),
                _ => {
                    let p = self.char_ptr(first);
                    format!("((int32_t)strlen({p}))")
                }
            },
            Builtin::Card => {
                let mode = self.mode_of(first);
                let width = bit_width(&mode);
                let v = self.expr(first);
                if width > 64 {
                    let words: Vec<String> = (0..width.div_ceil(64))
                        .map(|w| format!("chill_popcount(({v}).w[{w}])"))
                        .collect();
                    format!("({})", words.join(" + "))
                } else {
                    format!("chill_popcount((uint64_t){v})")
                }
            }
            Builtin::Max | Builtin::Min => {
                let f = if builtin == Builtin::Max { "chill_max" } else { "chill_min" };
                let mut acc = self.expr(first);
                for arg in &args[1..] {
                    let v = self.expr(arg);
                    acc = format!("{f}({acc}, {v})");
                }
                format!("((int32_t){acc})")
            }
            Builtin::Upper | Builtin::Lower | Builtin::WriteText | Builtin::Incl | Builtin::Excl => {
                self.unsupported(
                    format!("`{builtin:?}` cannot be used here"),
                    expr.span,
                );
                "0".to_string()
            }
        }
    }

    // ---------------------------------------------------------------
    // output

    fn assemble(&mut self, options: &CompileOptions) -> String {
        let mut text = String::new();
        text.push_str("/*\n");
        text.push_str(&format!(
            " * Generated by chillc {} from {}\n",
            options.compiler_version, options.source_name
        ));
        text.push_str(" * Source language: CHILL, ITU-T Z.200 (1999)\n");
        if let Some(timestamp) = &options.timestamp {
            text.push_str(&format!(" * Generated at: {timestamp}\n"));
        }
        text.push_str(" */\n\n");
        text.push_str(c_runtime::INCLUDES);
        text.push('\n');
        text.push_str(c_runtime::RUNTIME);
        if !self.types.out.is_empty() {
            text.push_str("\n/* ---- modes ---- */\n\n");
            text.push_str(&self.types.out);
        }
        if !self.decls.is_empty() {
            text.push_str("\n/* ---- declarations ---- */\n\n");
            text.push_str(&self.decls);
        }
        if !self.protos.is_empty() {
            text.push_str("\n/* ---- prototypes ---- */\n\n");
            text.push_str(&self.protos);
        }
        text.push_str("\n/* ---- code ---- */\n\n");
        text.push_str(&self.funcs);
        if options.emit_main {
            text.push_str("int main(void)\n{\n");
            text.push_str(&format!("{INDENT}chill_module_init();\n"));
            text.push_str(&format!("{INDENT}chill_join_all();\n"));
            text.push_str(&format!("{INDENT}return 0;\n}}\n"));
        }
        text
    }
}

fn mask(width: u64) -> String {
    if width >= 64 {
        "UINT64_MAX".to_string()
    } else {
        format!("UINT64_C({:#x})", (1u64 << width) - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_names_are_prefixed() {
        assert_eq!(c_identifier("int"), "u_int");
        assert_eq!(c_identifier("chill_x"), "u_chill_x");
        assert_eq!(c_identifier("counter"), "counter");
        let mut names = Names::default();
        assert_eq!(names.fresh("x"), "x");
        assert_eq!(names.fresh("x"), "x_2");
        assert_eq!(names.fresh("main"), "u_main");
    }

    #[test]
    fn range_types_are_the_smallest_that_fit() {
        assert_eq!(int_type(0, 255), "uint8_t");
        assert_eq!(int_type(1, 1000), "uint16_t");
        assert_eq!(int_type(-128, 127), "int8_t");
        assert_eq!(int_type(-1, 40_000), "int32_t");
        assert_eq!(int_type(i64::MIN, i64::MAX), "int64_t");
    }

    #[test]
    fn literals() {
        assert_eq!(int_lit(-3), "(-3)");
        assert_eq!(int_lit(5_000_000_000), "INT64_C(5000000000)");
        assert_eq!(char_lit('\'' as i64), "'\\''");
        assert_eq!(char_lit(10), "'\\012'");
        assert_eq!(c_string("a\"b%"), "\"a\\\"b%\"");
        let mut fmt = String::new();
        escape_into(&mut fmt, "50%", true);
        assert_eq!(fmt, "50%%");
    }

    #[test]
    fn aggregate_typedefs_are_shared() {
        let mut types = Types::default();
        let point = Mode::Structure(vec![("x".into(), Mode::int()), ("y".into(), Mode::int())]);
        let a = types.c_type(&point);
        let b = types.c_type(&point.clone());
        assert_eq!(a, b);
        assert_eq!(types.out.matches("typedef struct").count(), 1);
        assert_eq!(types.c_type(&Mode::CharString(8)), "chill_chars_8");
        assert!(types.out.contains("char s[9];"));
        assert_eq!(types.c_type(&Mode::BitString(100)), "chill_bits_100");
        assert!(types.out.contains("uint64_t w[2];"));
    }

    #[test]
    fn signal_ids_are_stable() {
        assert_eq!(signal_id("ping"), signal_id("ping"));
        assert_ne!(signal_id("ping"), signal_id("pong"));
        assert!(signal_id("ping") <= 0x7fff_ffff);
    }
}
