//! Abstract syntax tree for CHILL compilation units.
//!
//! The tree is owned top-down; semantic results (resolved symbols,
//! expression modes) live in side tables keyed by identifier span or
//! by `ExprId`, never in back-pointers.

use crate::lexer::Radix;
use crate::span::Span;

/// Stable identity of an expression within one parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(pub u32);

/// Identifier with span. `name` keeps the source spelling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub name: Option<Ident>,
    pub items: Vec<Item>,
    pub end_name: Option<Ident>,
    pub span: Span,
}

/// Anything that may appear in a module, procedure, process, region or
/// BEGIN block body.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Grant(Grant),
    Seize(Seize),
    ModeDef(ModeDef),
    Dcl(Dcl),
    Syn(SynDef),
    Signal(SignalDef),
    Proc(ProcDef),
    Process(ProcessDef),
    Region(RegionDef),
    Stmt(Stmt),
}

impl Item {
    pub fn span(&self) -> Span {
        match self {
            Item::Grant(g) => g.span,
            Item::Seize(s) => s.span,
            Item::ModeDef(m) => m.span,
            Item::Dcl(d) => d.span,
            Item::Syn(s) => s.span,
            Item::Signal(s) => s.span,
            Item::Proc(p) => p.span,
            Item::Process(p) => p.span,
            Item::Region(r) => r.span,
            Item::Stmt(s) => s.span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Grant {
    /// Empty when `all` is set.
    pub names: Vec<Ident>,
    pub all: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Seize {
    pub names: Vec<Ident>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeDefKind {
    /// Introduces a novel mode.
    Newmode,
    /// Transparent alias.
    Synmode,
}

/// One `name = mode` binding of a NEWMODE/SYNMODE statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ModeDef {
    pub kind: ModeDefKind,
    pub name: Ident,
    pub mode: ModeExpr,
    pub span: Span,
}

/// One `names mode [:= init]` entry of a DCL statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Dcl {
    pub names: Vec<Ident>,
    pub mode: ModeExpr,
    pub init: Option<Expr>,
    pub is_static: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SynDef {
    pub name: Ident,
    pub mode: Option<ModeExpr>,
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignalDef {
    pub name: Ident,
    pub payload: Vec<ModeExpr>,
    /// Process the signal is addressed to.
    pub dest: Option<Ident>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamDir {
    In,
    Out,
    InOut,
    Loc,
}

impl ParamDir {
    /// Passed by address in the generated code.
    pub fn by_reference(self) -> bool {
        matches!(self, ParamDir::Out | ParamDir::InOut | ParamDir::Loc)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ParamDir::In => "IN",
            ParamDir::Out => "OUT",
            ParamDir::InOut => "INOUT",
            ParamDir::Loc => "LOC",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: Ident,
    pub dir: ParamDir,
    pub mode: ModeExpr,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcAttr {
    General,
    Inline,
    Simple,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcDef {
    pub name: Ident,
    pub params: Vec<Param>,
    pub returns: Option<ModeExpr>,
    pub attrs: Vec<ProcAttr>,
    pub body: Vec<Item>,
    pub end_name: Option<Ident>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessDef {
    pub name: Ident,
    pub params: Vec<Param>,
    pub body: Vec<Item>,
    pub end_name: Option<Ident>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegionDef {
    pub name: Ident,
    pub body: Vec<Item>,
    pub end_name: Option<Ident>,
    pub span: Span,
}

/// Surface mode expression (before canonicalisation).
#[derive(Debug, Clone, PartialEq)]
pub struct ModeExpr {
    pub kind: ModeExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModeExprKind {
    /// A mode name: predefined (`INT`, `BOOL`, ...) or user defined.
    Named(Ident),
    /// `RANGE(lo:hi)` or `base(lo:hi)`.
    Range {
        base: Option<Ident>,
        lo: Expr,
        hi: Expr,
    },
    Set(Vec<Ident>),
    Powerset(Box<ModeExpr>),
    Ref(Box<ModeExpr>),
    Chars(Expr),
    Bools(Expr),
    Struct(Vec<Field>),
    Array {
        index: ArrayIndex,
        elem: Box<ModeExpr>,
    },
    Proc {
        params: Vec<(ParamDir, ModeExpr)>,
        result: Option<Box<ModeExpr>>,
    },
    Buffer {
        capacity: Option<Expr>,
        elem: Box<ModeExpr>,
    },
    Event,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: Ident,
    pub mode: ModeExpr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArrayIndex {
    Bounds(Expr, Expr),
    Mode(Box<ModeExpr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Assign {
        target: Expr,
        value: Expr,
    },
    /// Procedure call statement, with or without `CALL`.
    Call(Expr),
    If {
        arms: Vec<(Expr, Vec<Stmt>)>,
        else_body: Option<Vec<Stmt>>,
    },
    Case {
        selector: Expr,
        arms: Vec<CaseArm>,
        else_body: Option<Vec<Stmt>>,
    },
    DoWhile {
        cond: Expr,
        body: Vec<Stmt>,
    },
    DoFor {
        var: Ident,
        start: Expr,
        end: Expr,
        step: Option<Expr>,
        down: bool,
        body: Vec<Stmt>,
    },
    DoEver {
        body: Vec<Stmt>,
    },
    /// `BEGIN ... END` or a plain `DO; ... OD`.
    Begin {
        body: Vec<Item>,
    },
    Exit,
    Return(Option<Expr>),
    Result(Expr),
    /// `SEND name(args) [TO dest]`: a signal, or a buffer with one value.
    Send {
        target: Ident,
        args: Vec<Expr>,
        dest: Option<Expr>,
    },
    ReceiveCase {
        alts: Vec<ReceiveAlt>,
        else_body: Option<Vec<Stmt>>,
    },
    Start {
        process: Ident,
        args: Vec<Expr>,
    },
    Stop(Option<Expr>),
    Delay(Expr),
    Continue(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseArm {
    pub labels: Vec<CaseLabel>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CaseLabel {
    Value(Expr),
    Range(Expr, Expr),
    /// `(ELSE)` or `(*)`: matches everything else.
    Any(Span),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReceiveAlt {
    pub signal: Ident,
    pub bindings: Vec<Ident>,
    pub guard: Option<Expr>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub id: ExprId,
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Int { value: i64, radix: Radix },
    Bool(bool),
    Char(char),
    Str(String),
    Null,
    /// The running process instance.
    This,
    Name(Ident),
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnOp,
        operand: Box<Expr>,
    },
    /// `f(args)`. Also covers `a(i)` on arrays, which the mode checker
    /// reclassifies as indexing.
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Field {
        base: Box<Expr>,
        field: Ident,
    },
    Index {
        base: Box<Expr>,
        index: Box<Expr>,
    },
    /// `p->`
    Deref(Box<Expr>),
    /// `->x`
    AddressOf(Box<Expr>),
    Start {
        process: Ident,
        args: Vec<Expr>,
    },
    /// `RECEIVE buf`
    Receive(Box<Expr>),
    Duration {
        amount: Box<Expr>,
        unit: TimeUnit,
    },
    /// Powerset tuple `[a, b]`.
    Tuple(Vec<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Or,
    OrIf,
    Xor,
    And,
    AndIf,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    Add,
    Sub,
    Concat,
    Mul,
    Div,
    Mod,
    Rem,
}

impl BinOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinOp::Or => "OR",
            BinOp::OrIf => "ORIF",
            BinOp::Xor => "XOR",
            BinOp::And => "AND",
            BinOp::AndIf => "ANDIF",
            BinOp::Eq => "=",
            BinOp::Ne => "/=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::In => "IN",
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Concat => "//",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "MOD",
            BinOp::Rem => "REM",
        }
    }

    pub fn is_relational(self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(
            self,
            BinOp::Or | BinOp::OrIf | BinOp::Xor | BinOp::And | BinOp::AndIf
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Microsecs,
    Millisecs,
    Secs,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    /// Upper-cased predefined name to unit.
    pub fn from_name(name: &str) -> Option<TimeUnit> {
        match name {
            "MICROSECS" => Some(TimeUnit::Microsecs),
            "MILLISECS" => Some(TimeUnit::Millisecs),
            "SECS" | "SECONDS" => Some(TimeUnit::Secs),
            "MINUTES" => Some(TimeUnit::Minutes),
            "HOURS" => Some(TimeUnit::Hours),
            "DAYS" => Some(TimeUnit::Days),
            _ => None,
        }
    }

    /// Scale factor to milliseconds, or `None` for sub-millisecond units.
    pub fn millis(self) -> Option<i64> {
        match self {
            TimeUnit::Microsecs => None,
            TimeUnit::Millisecs => Some(1),
            TimeUnit::Secs => Some(1_000),
            TimeUnit::Minutes => Some(60_000),
            TimeUnit::Hours => Some(3_600_000),
            TimeUnit::Days => Some(86_400_000),
        }
    }
}
