//! Recursive-descent parser for CHILL compilation units.
//!
//! Statements and declarations are parsed by recursive descent and
//! expressions by precedence climbing. On a malformed construct the
//! parser reports one diagnostic, skips to the next `;` or block
//! closing keyword and resumes, so one mistake yields one diagnostic.

use crate::ast::*;
use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::lexer::{Keyword, LexResult, Token, TokenKind};
use crate::span::{FileId, Span};

#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Best-effort module; `None` only when the unit contains no
    /// tokens at all.
    pub module: Option<Module>,
    pub diagnostics: Vec<Diagnostic>,
}

pub fn parse_tokens(file_id: FileId, lex: LexResult) -> ParseResult {
    let mut parser = Parser {
        file_id,
        tokens: lex.tokens,
        pos: 0,
        diagnostics: lex.diagnostics,
        next_expr: 0,
    };
    let module = parser.parse_unit();
    tracing::trace!(diagnostics = parser.diagnostics.len(), "parsed");
    ParseResult {
        module,
        diagnostics: parser.diagnostics,
    }
}

/// Failure marker; the diagnostic has already been recorded.
type PResult<T> = Option<T>;

struct Parser {
    file_id: FileId,
    tokens: Vec<Token>,
    pos: usize,
    diagnostics: Vec<Diagnostic>,
    next_expr: u32,
}

fn is_block_closer(kind: &TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Keyword(
            Keyword::End
                | Keyword::Fi
                | Keyword::Od
                | Keyword::Esac
                | Keyword::Else
                | Keyword::Elsif
                | Keyword::Otherwise
        )
    )
}

impl Parser {
    // ---------------------------------------------------------------
    // unit / module

    fn parse_unit(&mut self) -> Option<Module> {
        if self.is_eof() {
            return None;
        }
        let start = self.peek_span();
        let name = if self.at_ident() && self.peek_kind_at(1) == Some(&TokenKind::Colon)
            && self.peek_kind_at(2) == Some(&TokenKind::Keyword(Keyword::Module))
        {
            let name = self.ident();
            self.next();
            name
        } else {
            None
        };
        let mut name = name;
        if self.consume_keyword(Keyword::Module) {
            if name.is_some() {
                self.consume_if(&TokenKind::Semicolon);
            } else {
                // alternate header: MODULE name;
                if self.at_ident() {
                    name = self.ident();
                }
                self.expect(&TokenKind::Semicolon);
            }
        } else {
            self.error_here("expected `MODULE` at the start of the compilation unit");
        }

        let items = self.parse_items(|k| k.is_keyword(Keyword::End));
        let mut end_name = None;
        if self.consume_keyword(Keyword::End) {
            end_name = self.end_name(name.as_ref());
            self.expect(&TokenKind::Semicolon);
        } else {
            self.error_here("expected `END` closing the module");
        }

        if !self.is_eof() {
            let span = self.peek_span();
            let second_module = self.tokens[self.pos..]
                .iter()
                .take(3)
                .any(|t| t.kind.is_keyword(Keyword::Module));
            let msg = if second_module {
                "a compilation unit may contain only one MODULE"
            } else {
                "unexpected tokens after the end of the module"
            };
            self.syntax_error(msg, span);
            self.pos = self.tokens.len().saturating_sub(1);
        }

        let end = self.prev_span();
        Some(Module {
            name,
            items,
            end_name,
            span: start.to(end),
        })
    }

    /// Optional name echo after END; must match the opening name.
    fn end_name(&mut self, open: Option<&Ident>) -> Option<Ident> {
        if !self.at_ident() {
            return None;
        }
        let closing = self.ident()?;
        if let Some(open) = open {
            if open.name != closing.name {
                self.diagnostics.push(
                    Diagnostic::error(
                        DiagnosticKind::SyntaxError,
                        format!(
                            "closing name `{}` does not match opening name `{}`",
                            closing.name, open.name
                        ),
                        closing.span,
                    )
                    .with_secondary_label(open.span, Some("opened here".to_string())),
                );
            }
        }
        Some(closing)
    }

    // ---------------------------------------------------------------
    // items

    fn parse_items(&mut self, stop: impl Fn(&TokenKind) -> bool) -> Vec<Item> {
        let mut items = Vec::new();
        while !self.is_eof() && !stop(&self.peek().kind) {
            if self.consume_if(&TokenKind::Semicolon) {
                continue;
            }
            let before = self.pos;
            match self.parse_item(&mut items) {
                Some(()) => {}
                None => self.synchronize(before),
            }
        }
        items
    }

    /// Parse one item; list-producing declarations push several.
    fn parse_item(&mut self, out: &mut Vec<Item>) -> PResult<()> {
        match self.peek().kind.clone() {
            TokenKind::Keyword(Keyword::Grant) => out.push(Item::Grant(self.parse_grant()?)),
            TokenKind::Keyword(Keyword::Seize) => out.push(Item::Seize(self.parse_seize()?)),
            TokenKind::Keyword(kw @ (Keyword::Newmode | Keyword::Synmode)) => {
                for def in self.parse_mode_defs(kw)? {
                    out.push(Item::ModeDef(def));
                }
            }
            TokenKind::Keyword(Keyword::Dcl) => {
                for dcl in self.parse_dcl()? {
                    out.push(Item::Dcl(dcl));
                }
            }
            TokenKind::Keyword(Keyword::Syn) => {
                for syn in self.parse_syn()? {
                    out.push(Item::Syn(syn));
                }
            }
            TokenKind::Keyword(Keyword::Signal) => {
                for sig in self.parse_signals()? {
                    out.push(Item::Signal(sig));
                }
            }
            _ if self.at_ident() && self.peek_kind_at(1) == Some(&TokenKind::Colon) => {
                match self.peek_kind_at(2).cloned() {
                    Some(TokenKind::Keyword(Keyword::Proc)) => {
                        out.push(Item::Proc(self.parse_proc()?))
                    }
                    Some(TokenKind::Keyword(Keyword::Process)) => {
                        out.push(Item::Process(self.parse_process()?))
                    }
                    Some(TokenKind::Keyword(Keyword::Region)) => {
                        out.push(Item::Region(self.parse_region()?))
                    }
                    Some(TokenKind::Keyword(Keyword::Module)) => {
                        let span = self.peek_span();
                        self.syntax_error("nested modules are not supported", span);
                        return None;
                    }
                    _ => {
                        let span = self.peek_span();
                        self.syntax_error("statement labels are not supported", span);
                        return None;
                    }
                }
            }
            _ => out.push(Item::Stmt(self.parse_stmt()?)),
        }
        Some(())
    }

    fn parse_grant(&mut self) -> PResult<Grant> {
        let start = self.next_span();
        if self.consume_keyword(Keyword::All) {
            self.expect(&TokenKind::Semicolon)?;
            return Some(Grant {
                names: Vec::new(),
                all: true,
                span: start.to(self.prev_span()),
            });
        }
        let names = self.ident_list()?;
        self.expect(&TokenKind::Semicolon)?;
        Some(Grant {
            names,
            all: false,
            span: start.to(self.prev_span()),
        })
    }

    fn parse_seize(&mut self) -> PResult<Seize> {
        let start = self.next_span();
        let names = self.ident_list()?;
        self.expect(&TokenKind::Semicolon)?;
        Some(Seize {
            names,
            span: start.to(self.prev_span()),
        })
    }

    fn parse_mode_defs(&mut self, kw: Keyword) -> PResult<Vec<ModeDef>> {
        self.next();
        let kind = if kw == Keyword::Newmode {
            ModeDefKind::Newmode
        } else {
            ModeDefKind::Synmode
        };
        let mut defs = Vec::new();
        loop {
            let name = self.ident()?;
            self.expect(&TokenKind::Eq)?;
            let mode = self.parse_mode()?;
            let span = name.span.to(mode.span);
            defs.push(ModeDef {
                kind,
                name,
                mode,
                span,
            });
            if !self.consume_if(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::Semicolon)?;
        Some(defs)
    }

    fn parse_dcl(&mut self) -> PResult<Vec<Dcl>> {
        self.next();
        let mut dcls = Vec::new();
        loop {
            let names = self.ident_list()?;
            let mut is_static = self.consume_keyword(Keyword::Static);
            let mode = self.parse_mode()?;
            is_static |= self.consume_keyword(Keyword::Static);
            let has_init = self.consume_keyword(Keyword::Init);
            let init = if self.consume_if(&TokenKind::Assign)
                || (has_init && self.consume_if(&TokenKind::Eq))
            {
                Some(self.parse_expr()?)
            } else if has_init {
                self.error_here("expected `:=` after INIT");
                return None;
            } else {
                None
            };
            let end = init.as_ref().map(|e| e.span).unwrap_or(mode.span);
            dcls.push(Dcl {
                span: names[0].span.to(end),
                names,
                mode,
                init,
                is_static,
            });
            if !self.consume_if(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::Semicolon)?;
        Some(dcls)
    }

    fn parse_syn(&mut self) -> PResult<Vec<SynDef>> {
        self.next();
        let mut syns = Vec::new();
        loop {
            let name = self.ident()?;
            let mode = if self.check(&TokenKind::Eq) {
                None
            } else {
                Some(self.parse_mode()?)
            };
            self.expect(&TokenKind::Eq)?;
            let value = self.parse_expr()?;
            syns.push(SynDef {
                span: name.span.to(value.span),
                name,
                mode,
                value,
            });
            if !self.consume_if(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::Semicolon)?;
        Some(syns)
    }

    fn parse_signals(&mut self) -> PResult<Vec<SignalDef>> {
        self.next();
        let mut sigs = Vec::new();
        loop {
            let name = self.ident()?;
            let mut payload = Vec::new();
            if self.consume_if(&TokenKind::Eq) {
                self.expect(&TokenKind::LParen)?;
                if !self.check(&TokenKind::RParen) {
                    loop {
                        payload.push(self.parse_mode()?);
                        if !self.consume_if(&TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(&TokenKind::RParen)?;
            }
            let dest = if self.consume_keyword(Keyword::To) {
                Some(self.ident()?)
            } else {
                None
            };
            sigs.push(SignalDef {
                span: name.span.to(self.prev_span()),
                name,
                payload,
                dest,
            });
            if !self.consume_if(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::Semicolon)?;
        Some(sigs)
    }

    fn parse_params(&mut self) -> PResult<Vec<Param>> {
        self.expect(&TokenKind::LParen)?;
        let mut params = Vec::new();
        if self.consume_if(&TokenKind::RParen) {
            return Some(params);
        }
        loop {
            let names = self.ident_list()?;
            let mut dir = self.param_dir();
            let mode = self.parse_mode()?;
            if dir.is_none() {
                dir = self.param_dir();
            }
            let dir = dir.unwrap_or(ParamDir::In);
            for name in names {
                params.push(Param {
                    span: name.span.to(mode.span),
                    name,
                    dir,
                    mode: mode.clone(),
                });
            }
            if !self.consume_if(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RParen)?;
        Some(params)
    }

    fn param_dir(&mut self) -> Option<ParamDir> {
        let dir = match self.peek().kind {
            TokenKind::Keyword(Keyword::In) => ParamDir::In,
            TokenKind::Keyword(Keyword::Out) => ParamDir::Out,
            TokenKind::Keyword(Keyword::Inout) => ParamDir::InOut,
            TokenKind::Keyword(Keyword::Loc) => ParamDir::Loc,
            _ => return None,
        };
        self.next();
        Some(dir)
    }

    fn parse_proc(&mut self) -> PResult<ProcDef> {
        let name = self.ident()?;
        self.expect(&TokenKind::Colon)?;
        self.expect_keyword(Keyword::Proc)?;
        let params = self.parse_params()?;
        let returns = if self.consume_keyword(Keyword::Returns) {
            self.expect(&TokenKind::LParen)?;
            let mode = self.parse_mode()?;
            self.expect(&TokenKind::RParen)?;
            Some(mode)
        } else {
            None
        };
        let mut attrs = Vec::new();
        loop {
            let attr = match self.peek().kind {
                TokenKind::Keyword(Keyword::General) => ProcAttr::General,
                TokenKind::Keyword(Keyword::Inline) => ProcAttr::Inline,
                TokenKind::Keyword(Keyword::Simple) => ProcAttr::Simple,
                _ => break,
            };
            self.next();
            attrs.push(attr);
        }
        self.expect(&TokenKind::Semicolon)?;
        let body = self.parse_items(|k| k.is_keyword(Keyword::End));
        self.expect_keyword(Keyword::End)?;
        let end_name = self.end_name(Some(&name));
        self.expect(&TokenKind::Semicolon)?;
        Some(ProcDef {
            span: name.span.to(self.prev_span()),
            name,
            params,
            returns,
            attrs,
            body,
            end_name,
        })
    }

    fn parse_process(&mut self) -> PResult<ProcessDef> {
        let name = self.ident()?;
        self.expect(&TokenKind::Colon)?;
        self.expect_keyword(Keyword::Process)?;
        let params = self.parse_params()?;
        self.expect(&TokenKind::Semicolon)?;
        let body = self.parse_items(|k| k.is_keyword(Keyword::End));
        self.expect_keyword(Keyword::End)?;
        let end_name = self.end_name(Some(&name));
        self.expect(&TokenKind::Semicolon)?;
        Some(ProcessDef {
            span: name.span.to(self.prev_span()),
            name,
            params,
            body,
            end_name,
        })
    }

    fn parse_region(&mut self) -> PResult<RegionDef> {
        let name = self.ident()?;
        self.expect(&TokenKind::Colon)?;
        self.expect_keyword(Keyword::Region)?;
        self.consume_if(&TokenKind::Semicolon);
        let body = self.parse_items(|k| k.is_keyword(Keyword::End));
        self.expect_keyword(Keyword::End)?;
        let end_name = self.end_name(Some(&name));
        self.expect(&TokenKind::Semicolon)?;
        Some(RegionDef {
            span: name.span.to(self.prev_span()),
            name,
            body,
            end_name,
        })
    }

    // ---------------------------------------------------------------
    // modes

    fn parse_mode(&mut self) -> PResult<ModeExpr> {
        let start = self.peek_span();
        let kind = match self.peek().kind.clone() {
            TokenKind::Keyword(Keyword::Range) => {
                self.next();
                let (lo, hi) = self.parse_bounds()?;
                ModeExprKind::Range { base: None, lo, hi }
            }
            TokenKind::Keyword(Keyword::Set) => {
                self.next();
                self.expect(&TokenKind::LParen)?;
                let names = self.ident_list()?;
                self.expect(&TokenKind::RParen)?;
                ModeExprKind::Set(names)
            }
            TokenKind::Keyword(Keyword::Powerset) => {
                self.next();
                ModeExprKind::Powerset(Box::new(self.parse_mode()?))
            }
            TokenKind::Keyword(Keyword::Ref) => {
                self.next();
                ModeExprKind::Ref(Box::new(self.parse_mode()?))
            }
            TokenKind::Keyword(kw @ (Keyword::Chars | Keyword::Bools)) => {
                self.next();
                self.expect(&TokenKind::LParen)?;
                let len = self.parse_expr()?;
                self.expect(&TokenKind::RParen)?;
                if kw == Keyword::Chars {
                    ModeExprKind::Chars(len)
                } else {
                    ModeExprKind::Bools(len)
                }
            }
            TokenKind::Keyword(Keyword::Struct) => {
                self.next();
                self.expect(&TokenKind::LParen)?;
                let mut fields = Vec::new();
                loop {
                    let names = self.ident_list()?;
                    let mode = self.parse_mode()?;
                    for name in names {
                        fields.push(Field {
                            name,
                            mode: mode.clone(),
                        });
                    }
                    if !self.consume_if(&TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(&TokenKind::RParen)?;
                ModeExprKind::Struct(fields)
            }
            TokenKind::Keyword(Keyword::Array) => {
                self.next();
                self.expect(&TokenKind::LParen)?;
                let index = if matches!(
                    self.peek().kind,
                    TokenKind::Keyword(Keyword::Range | Keyword::Set)
                ) {
                    ArrayIndex::Mode(Box::new(self.parse_mode()?))
                } else {
                    let lo = self.parse_expr()?;
                    if self.consume_if(&TokenKind::Colon) {
                        ArrayIndex::Bounds(lo, self.parse_expr()?)
                    } else if let ExprKind::Name(id) = lo.kind {
                        ArrayIndex::Mode(Box::new(ModeExpr {
                            span: id.span,
                            kind: ModeExprKind::Named(id),
                        }))
                    } else {
                        self.error_here("expected array bounds `lo:hi` or an index mode");
                        return None;
                    }
                };
                self.expect(&TokenKind::RParen)?;
                let elem = self.parse_mode()?;
                ModeExprKind::Array {
                    index,
                    elem: Box::new(elem),
                }
            }
            TokenKind::Keyword(Keyword::Proc) => {
                self.next();
                self.expect(&TokenKind::LParen)?;
                let mut params = Vec::new();
                if !self.check(&TokenKind::RParen) {
                    loop {
                        let mode = self.parse_mode()?;
                        let dir = self.param_dir().unwrap_or(ParamDir::In);
                        params.push((dir, mode));
                        if !self.consume_if(&TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(&TokenKind::RParen)?;
                let result = if self.consume_keyword(Keyword::Returns) {
                    self.expect(&TokenKind::LParen)?;
                    let mode = self.parse_mode()?;
                    self.expect(&TokenKind::RParen)?;
                    Some(Box::new(mode))
                } else {
                    None
                };
                ModeExprKind::Proc { params, result }
            }
            TokenKind::Keyword(Keyword::Buffer) => {
                self.next();
                let capacity = if self.consume_if(&TokenKind::LParen) {
                    let cap = self.parse_expr()?;
                    self.expect(&TokenKind::RParen)?;
                    Some(cap)
                } else {
                    None
                };
                let elem = self.parse_mode()?;
                ModeExprKind::Buffer {
                    capacity,
                    elem: Box::new(elem),
                }
            }
            TokenKind::Keyword(Keyword::Event) => {
                self.next();
                ModeExprKind::Event
            }
            _ if self.at_ident() => {
                let name = self.ident()?;
                if self.check(&TokenKind::LParen) {
                    let (lo, hi) = self.parse_bounds()?;
                    ModeExprKind::Range {
                        base: Some(name),
                        lo,
                        hi,
                    }
                } else {
                    ModeExprKind::Named(name)
                }
            }
            _ => {
                self.error_here("expected a mode");
                return None;
            }
        };
        Some(ModeExpr {
            kind,
            span: start.to(self.prev_span()),
        })
    }

    fn parse_bounds(&mut self) -> PResult<(Expr, Expr)> {
        self.expect(&TokenKind::LParen)?;
        let lo = self.parse_expr()?;
        self.expect(&TokenKind::Colon)?;
        let hi = self.parse_expr()?;
        self.expect(&TokenKind::RParen)?;
        Some((lo, hi))
    }

    // ---------------------------------------------------------------
    // statements

    fn parse_stmts(&mut self, stop: impl Fn(&TokenKind) -> bool) -> Vec<Stmt> {
        let mut stmts = Vec::new();
        while !self.is_eof() && !stop(&self.peek().kind) {
            if self.consume_if(&TokenKind::Semicolon) {
                continue;
            }
            let before = self.pos;
            match self.parse_stmt() {
                Some(stmt) => stmts.push(stmt),
                None => self.synchronize(before),
            }
        }
        stmts
    }

    fn parse_stmt(&mut self) -> PResult<Stmt> {
        let start = self.peek_span();
        let kind = match self.peek().kind.clone() {
            TokenKind::Keyword(Keyword::If) => self.parse_if()?,
            TokenKind::Keyword(Keyword::Case) => self.parse_case()?,
            TokenKind::Keyword(Keyword::Do) => self.parse_do()?,
            TokenKind::Keyword(Keyword::Begin) => {
                self.next();
                let body = self.parse_items(|k| k.is_keyword(Keyword::End));
                self.expect_keyword(Keyword::End)?;
                self.expect(&TokenKind::Semicolon)?;
                StmtKind::Begin { body }
            }
            TokenKind::Keyword(Keyword::Receive)
                if self.peek_kind_at(1) == Some(&TokenKind::Keyword(Keyword::Case)) =>
            {
                self.parse_receive_case()?
            }
            TokenKind::Keyword(Keyword::Send) => {
                self.next();
                let target = self.ident()?;
                let args = if self.check(&TokenKind::LParen) {
                    self.parse_args()?
                } else {
                    Vec::new()
                };
                let dest = if self.consume_keyword(Keyword::To) {
                    Some(self.parse_expr()?)
                } else {
                    None
                };
                self.expect(&TokenKind::Semicolon)?;
                StmtKind::Send { target, args, dest }
            }
            TokenKind::Keyword(Keyword::Start) => {
                self.next();
                let process = self.ident()?;
                let args = self.parse_args()?;
                self.expect(&TokenKind::Semicolon)?;
                StmtKind::Start { process, args }
            }
            TokenKind::Keyword(Keyword::Stop) => {
                self.next();
                let target = self.optional_expr()?;
                self.expect(&TokenKind::Semicolon)?;
                StmtKind::Stop(target)
            }
            TokenKind::Keyword(Keyword::Return) => {
                self.next();
                let value = self.optional_expr()?;
                self.expect(&TokenKind::Semicolon)?;
                StmtKind::Return(value)
            }
            TokenKind::Keyword(Keyword::Result) => {
                self.next();
                let value = self.parse_expr()?;
                self.expect(&TokenKind::Semicolon)?;
                StmtKind::Result(value)
            }
            TokenKind::Keyword(Keyword::Exit) => {
                self.next();
                self.expect(&TokenKind::Semicolon)?;
                StmtKind::Exit
            }
            TokenKind::Keyword(Keyword::Delay) => {
                self.next();
                let value = self.parse_expr()?;
                self.expect(&TokenKind::Semicolon)?;
                StmtKind::Delay(value)
            }
            TokenKind::Keyword(Keyword::Continue) => {
                self.next();
                let value = self.parse_expr()?;
                self.expect(&TokenKind::Semicolon)?;
                StmtKind::Continue(value)
            }
            TokenKind::Keyword(Keyword::Call) => {
                self.next();
                let call = self.parse_postfix()?;
                if !matches!(call.kind, ExprKind::Call { .. }) {
                    self.syntax_error("expected a procedure call after CALL", call.span);
                    return None;
                }
                self.expect(&TokenKind::Semicolon)?;
                StmtKind::Call(call)
            }
            TokenKind::Keyword(kw) if !matches!(kw, Keyword::Not | Keyword::This) => {
                self.error_here(format!("expected a statement, found `{kw}`"));
                return None;
            }
            _ => {
                let target = self.parse_postfix()?;
                if self.consume_if(&TokenKind::Assign) {
                    let value = self.parse_expr()?;
                    self.expect(&TokenKind::Semicolon)?;
                    StmtKind::Assign { target, value }
                } else if matches!(target.kind, ExprKind::Call { .. }) {
                    self.expect(&TokenKind::Semicolon)?;
                    StmtKind::Call(target)
                } else {
                    self.error_here("expected `:=` or a procedure call");
                    return None;
                }
            }
        };
        Some(Stmt {
            kind,
            span: start.to(self.prev_span()),
        })
    }

    fn optional_expr(&mut self) -> PResult<Option<Expr>> {
        if self.check(&TokenKind::Semicolon) {
            Some(None)
        } else {
            Some(Some(self.parse_expr()?))
        }
    }

    fn parse_if(&mut self) -> PResult<StmtKind> {
        self.next();
        let mut arms = Vec::new();
        let stop = |k: &TokenKind| {
            matches!(
                k,
                TokenKind::Keyword(Keyword::Elsif | Keyword::Else | Keyword::Fi)
            )
        };
        loop {
            let cond = self.parse_expr()?;
            self.expect_keyword(Keyword::Then)?;
            let body = self.parse_stmts(stop);
            arms.push((cond, body));
            if !self.consume_keyword(Keyword::Elsif) {
                break;
            }
        }
        let else_body = if self.consume_keyword(Keyword::Else) {
            Some(self.parse_stmts(|k| k.is_keyword(Keyword::Fi)))
        } else {
            None
        };
        self.expect_keyword(Keyword::Fi)?;
        self.expect(&TokenKind::Semicolon)?;
        Some(StmtKind::If { arms, else_body })
    }

    fn parse_case(&mut self) -> PResult<StmtKind> {
        self.next();
        let selector = self.parse_expr()?;
        self.expect_keyword(Keyword::Of)?;
        let mut arms = Vec::new();
        let stop = |k: &TokenKind| {
            matches!(
                k,
                TokenKind::LParen
                    | TokenKind::Keyword(Keyword::Else | Keyword::Otherwise | Keyword::Esac)
            )
        };
        while self.check(&TokenKind::LParen) {
            let start = self.next_span();
            let mut labels = Vec::new();
            loop {
                labels.push(self.parse_case_label()?);
                if !self.consume_if(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect(&TokenKind::RParen)?;
            self.expect(&TokenKind::Colon)?;
            let body = self.parse_stmts(stop);
            arms.push(CaseArm {
                labels,
                body,
                span: start.to(self.prev_span()),
            });
        }
        let else_body = if self.consume_keyword(Keyword::Else) || self.consume_keyword(Keyword::Otherwise)
        {
            Some(self.parse_stmts(|k| k.is_keyword(Keyword::Esac)))
        } else {
            None
        };
        self.expect_keyword(Keyword::Esac)?;
        self.expect(&TokenKind::Semicolon)?;
        Some(StmtKind::Case {
            selector,
            arms,
            else_body,
        })
    }

    fn parse_case_label(&mut self) -> PResult<CaseLabel> {
        let span = self.peek_span();
        if self.consume_keyword(Keyword::Else) || self.consume_if(&TokenKind::Star) {
            return Some(CaseLabel::Any(span));
        }
        let lo = self.parse_expr()?;
        if self.consume_if(&TokenKind::Colon) {
            let hi = self.parse_expr()?;
            return Some(CaseLabel::Range(lo, hi));
        }
        Some(CaseLabel::Value(lo))
    }

    fn parse_do(&mut self) -> PResult<StmtKind> {
        self.next();
        let od = |k: &TokenKind| k.is_keyword(Keyword::Od);
        let kind = if self.consume_keyword(Keyword::While) {
            let cond = self.parse_expr()?;
            self.expect(&TokenKind::Semicolon)?;
            let body = self.parse_stmts(od);
            StmtKind::DoWhile { cond, body }
        } else if self.consume_keyword(Keyword::For) {
            if self.consume_keyword(Keyword::Ever) {
                self.expect(&TokenKind::Semicolon)?;
                let body = self.parse_stmts(od);
                StmtKind::DoEver { body }
            } else {
                let var = self.ident()?;
                self.expect(&TokenKind::Assign)?;
                let start = self.parse_expr()?;
                let down = matches!(&self.peek().kind, TokenKind::Reserved(w) if w == "DOWN");
                if down {
                    self.next();
                }
                self.expect_keyword(Keyword::To)?;
                let end = self.parse_expr()?;
                let step = if self.consume_keyword(Keyword::By) {
                    Some(self.parse_expr()?)
                } else {
                    None
                };
                self.expect(&TokenKind::Semicolon)?;
                let body = self.parse_stmts(od);
                StmtKind::DoFor {
                    var,
                    start,
                    end,
                    step,
                    down,
                    body,
                }
            }
        } else if self.consume_keyword(Keyword::Ever) {
            self.expect(&TokenKind::Semicolon)?;
            let body = self.parse_stmts(od);
            StmtKind::DoEver { body }
        } else {
            self.expect(&TokenKind::Semicolon)?;
            let body = self.parse_items(od);
            StmtKind::Begin { body }
        };
        self.expect_keyword(Keyword::Od)?;
        self.expect(&TokenKind::Semicolon)?;
        Some(kind)
    }

    fn parse_receive_case(&mut self) -> PResult<StmtKind> {
        self.next();
        self.next();
        let stop = |k: &TokenKind| {
            matches!(
                k,
                TokenKind::LParen | TokenKind::Keyword(Keyword::Else | Keyword::Esac)
            )
        };
        let mut alts = Vec::new();
        while self.check(&TokenKind::LParen) {
            let start = self.next_span();
            let signal = self.ident()?;
            let bindings = if self.consume_keyword(Keyword::In) {
                self.ident_list()?
            } else {
                Vec::new()
            };
            let guard = if matches!(&self.peek().kind, TokenKind::Predefined(w) if w == "WHERE") {
                self.next();
                Some(self.parse_expr()?)
            } else {
                None
            };
            self.expect(&TokenKind::RParen)?;
            self.expect(&TokenKind::Colon)?;
            let body = self.parse_stmts(stop);
            alts.push(ReceiveAlt {
                signal,
                bindings,
                guard,
                body,
                span: start.to(self.prev_span()),
            });
        }
        let else_body = if self.consume_keyword(Keyword::Else) {
            Some(self.parse_stmts(|k| k.is_keyword(Keyword::Esac)))
        } else {
            None
        };
        self.expect_keyword(Keyword::Esac)?;
        self.expect(&TokenKind::Semicolon)?;
        Some(StmtKind::ReceiveCase { alts, else_body })
    }

    // ---------------------------------------------------------------
    // expressions

    fn parse_expr(&mut self) -> PResult<Expr> {
        self.parse_binary(0)
    }

    fn binary_op(&self) -> Option<(BinOp, u8)> {
        let op = match &self.peek().kind {
            TokenKind::Keyword(Keyword::Or) => (BinOp::Or, 0),
            TokenKind::Keyword(Keyword::OrIf) => (BinOp::OrIf, 0),
            TokenKind::Keyword(Keyword::Xor) => (BinOp::Xor, 0),
            TokenKind::Keyword(Keyword::And) => (BinOp::And, 1),
            TokenKind::Keyword(Keyword::AndIf) => (BinOp::AndIf, 1),
            TokenKind::Eq => (BinOp::Eq, 2),
            TokenKind::Ne => (BinOp::Ne, 2),
            TokenKind::Lt => (BinOp::Lt, 2),
            TokenKind::Le => (BinOp::Le, 2),
            TokenKind::Gt => (BinOp::Gt, 2),
            TokenKind::Ge => (BinOp::Ge, 2),
            TokenKind::Keyword(Keyword::In) => (BinOp::In, 2),
            TokenKind::Plus => (BinOp::Add, 3),
            TokenKind::Minus => (BinOp::Sub, 3),
            TokenKind::Concat => (BinOp::Concat, 3),
            TokenKind::Star => (BinOp::Mul, 4),
            TokenKind::Slash => (BinOp::Div, 4),
            TokenKind::Keyword(Keyword::Mod) => (BinOp::Mod, 4),
            TokenKind::Keyword(Keyword::Rem) => (BinOp::Rem, 4),
            _ => return None,
        };
        Some(op)
    }

    fn parse_binary(&mut self, min_prec: u8) -> PResult<Expr> {
        let mut lhs = self.parse_unary()?;
        while let Some((op, prec)) = self.binary_op() {
            if prec < min_prec {
                break;
            }
            self.next();
            let rhs = self.parse_binary(prec + 1)?;
            let span = lhs.span.to(rhs.span);
            lhs = self.mk_expr(
                ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                span,
            );
        }
        Some(lhs)
    }

    fn parse_unary(&mut self) -> PResult<Expr> {
        let start = self.peek_span();
        let op = match self.peek().kind {
            TokenKind::Minus => Some(UnOp::Neg),
            TokenKind::Keyword(Keyword::Not) => Some(UnOp::Not),
            TokenKind::Arrow => {
                self.next();
                let operand = self.parse_unary()?;
                let span = start.to(operand.span);
                return Some(self.mk_expr(ExprKind::AddressOf(Box::new(operand)), span));
            }
            _ => None,
        };
        match op {
            Some(op) => {
                self.next();
                let operand = self.parse_unary()?;
                let span = start.to(operand.span);
                Some(self.mk_expr(
                    ExprKind::Unary {
                        op,
                        operand: Box::new(operand),
                    },
                    span,
                ))
            }
            None => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> PResult<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek().kind.clone() {
                TokenKind::LParen => {
                    let args = self.parse_args()?;
                    let span = expr.span.to(self.prev_span());
                    expr = self.mk_expr(
                        ExprKind::Call {
                            callee: Box::new(expr),
                            args,
                        },
                        span,
                    );
                }
                TokenKind::LBracket => {
                    self.next();
                    let index = self.parse_expr()?;
                    self.expect(&TokenKind::RBracket)?;
                    let span = expr.span.to(self.prev_span());
                    expr = self.mk_expr(
                        ExprKind::Index {
                            base: Box::new(expr),
                            index: Box::new(index),
                        },
                        span,
                    );
                }
                TokenKind::Dot => {
                    self.next();
                    let field = self.ident()?;
                    let span = expr.span.to(field.span);
                    expr = self.mk_expr(
                        ExprKind::Field {
                            base: Box::new(expr),
                            field,
                        },
                        span,
                    );
                }
                TokenKind::Arrow => {
                    self.next();
                    let span = expr.span.to(self.prev_span());
                    expr = self.mk_expr(ExprKind::Deref(Box::new(expr)), span);
                }
                TokenKind::Predefined(word) if TimeUnit::from_name(&word).is_some() => {
                    let unit = TimeUnit::from_name(&word).unwrap_or(TimeUnit::Secs);
                    self.next();
                    let span = expr.span.to(self.prev_span());
                    expr = self.mk_expr(
                        ExprKind::Duration {
                            amount: Box::new(expr),
                            unit,
                        },
                        span,
                    );
                }
                _ => break,
            }
        }
        Some(expr)
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        let tok = self.peek().clone();
        let span = tok.span;
        let kind = match tok.kind {
            TokenKind::Int { value, radix } => {
                self.next();
                ExprKind::Int { value, radix }
            }
            TokenKind::Str(s) => {
                self.next();
                ExprKind::Str(s)
            }
            TokenKind::Char(c) => {
                self.next();
                ExprKind::Char(c)
            }
            TokenKind::Predefined(ref w) if w == "TRUE" || w == "FALSE" => {
                self.next();
                ExprKind::Bool(w == "TRUE")
            }
            TokenKind::Predefined(ref w) if w == "NULL" => {
                self.next();
                ExprKind::Null
            }
            TokenKind::Predefined(ref w)
                if TimeUnit::from_name(w).is_some()
                    && self.peek_kind_at(1) == Some(&TokenKind::LParen) =>
            {
                let unit = TimeUnit::from_name(w).unwrap_or(TimeUnit::Secs);
                self.next();
                self.next();
                let amount = self.parse_expr()?;
                self.expect(&TokenKind::RParen)?;
                ExprKind::Duration {
                    amount: Box::new(amount),
                    unit,
                }
            }
            TokenKind::Keyword(Keyword::This) => {
                self.next();
                ExprKind::This
            }
            TokenKind::Keyword(Keyword::Start) => {
                self.next();
                let process = self.ident()?;
                let args = self.parse_args()?;
                ExprKind::Start { process, args }
            }
            TokenKind::Keyword(Keyword::Receive) => {
                self.next();
                let buffer = self.parse_postfix()?;
                ExprKind::Receive(Box::new(buffer))
            }
            TokenKind::LParen => {
                self.next();
                let inner = self.parse_expr()?;
                self.expect(&TokenKind::RParen)?;
                // keep the parenthesised span so node spans cover their text
                let span = span.to(self.prev_span());
                return Some(Expr {
                    id: inner.id,
                    kind: inner.kind,
                    span,
                });
            }
            TokenKind::LBracket => {
                self.next();
                let mut elems = Vec::new();
                if !self.consume_if(&TokenKind::RBracket) {
                    loop {
                        elems.push(self.parse_expr()?);
                        if !self.consume_if(&TokenKind::Comma) {
                            break;
                        }
                    }
                    self.expect(&TokenKind::RBracket)?;
                }
                ExprKind::Tuple(elems)
            }
            _ if self.at_ident() => {
                let id = self.ident()?;
                ExprKind::Name(id)
            }
            other => {
                self.syntax_error(format!("expected an expression, found {}", other.describe()), span);
                return None;
            }
        };
        let span = span.to(self.prev_span());
        Some(self.mk_expr(kind, span))
    }

    fn parse_args(&mut self) -> PResult<Vec<Expr>> {
        self.expect(&TokenKind::LParen)?;
        let mut args = Vec::new();
        if self.consume_if(&TokenKind::RParen) {
            return Some(args);
        }
        loop {
            args.push(self.parse_expr()?);
            if !self.consume_if(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RParen)?;
        Some(args)
    }

    fn mk_expr(&mut self, kind: ExprKind, span: Span) -> Expr {
        let id = ExprId(self.next_expr);
        self.next_expr += 1;
        Expr { id, kind, span }
    }

    // ---------------------------------------------------------------
    // token helpers

    fn at_ident(&self) -> bool {
        matches!(
            self.peek().kind,
            TokenKind::Ident(_) | TokenKind::Predefined(_)
        )
    }

    fn ident(&mut self) -> PResult<Ident> {
        if self.at_ident() {
            let tok = self.next();
            return Some(Ident {
                name: tok.text,
                span: tok.span,
            });
        }
        let found = self.peek().kind.describe();
        self.error_here(format!("expected an identifier, found {found}"));
        None
    }

    fn ident_list(&mut self) -> PResult<Vec<Ident>> {
        let mut names = vec![self.ident()?];
        while self.check(&TokenKind::Comma) && self.peek_ident_at(1) {
            self.next();
            names.push(self.ident()?);
        }
        Some(names)
    }

    fn peek_ident_at(&self, offset: usize) -> bool {
        matches!(
            self.peek_kind_at(offset),
            Some(TokenKind::Ident(_) | TokenKind::Predefined(_))
        )
    }

    fn expect(&mut self, kind: &TokenKind) -> PResult<()> {
        if self.consume_if(kind) {
            Some(())
        } else {
            let found = self.peek().kind.describe();
            self.error_here(format!("expected {}, found {}", kind.describe(), found));
            None
        }
    }

    fn expect_keyword(&mut self, kw: Keyword) -> PResult<()> {
        self.expect(&TokenKind::Keyword(kw))
    }

    fn consume_keyword(&mut self, kw: Keyword) -> bool {
        self.consume_if(&TokenKind::Keyword(kw))
    }

    fn consume_if(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.next();
            true
        } else {
            false
        }
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn peek(&self) -> &Token {
        // the token vector always ends with Eof
        let idx = self.pos.min(self.tokens.len().saturating_sub(1));
        &self.tokens[idx]
    }

    fn peek_kind_at(&self, offset: usize) -> Option<&TokenKind> {
        self.tokens.get(self.pos + offset).map(|t| &t.kind)
    }

    fn peek_span(&self) -> Span {
        self.peek().span
    }

    /// Span of the next token, consuming it.
    fn next_span(&mut self) -> Span {
        self.next().span
    }

    fn prev_span(&self) -> Span {
        self.tokens
            .get(self.pos.saturating_sub(1))
            .map(|t| t.span)
            .unwrap_or_else(|| Span::empty(self.file_id, 0))
    }

    fn next(&mut self) -> Token {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() && tok.kind != TokenKind::Eof {
            self.pos += 1;
        }
        tok
    }

    fn is_eof(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn syntax_error(&mut self, message: impl Into<String>, span: Span) {
        self.diagnostics
            .push(Diagnostic::error(DiagnosticKind::SyntaxError, message, span));
    }

    fn error_here(&mut self, message: impl Into<String>) {
        let span = self.peek_span();
        self.syntax_error(message, span);
    }

    /// Skip to just after the next `;`, or up to a block closing
    /// keyword. Always makes progress from `before`.
    fn synchronize(&mut self, before: usize) {
        loop {
            let kind = &self.peek().kind;
            if *kind == TokenKind::Eof {
                return;
            }
            if *kind == TokenKind::Semicolon {
                self.next();
                return;
            }
            if is_block_closer(kind) {
                if self.pos == before {
                    self.next();
                }
                return;
            }
            self.next();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;

    fn parse(src: &str) -> ParseResult {
        parse_tokens(FileId(0), lex(FileId(0), src))
    }

    fn errors(res: &ParseResult) -> Vec<String> {
        res.diagnostics
            .iter()
            .filter(|d| d.is_error())
            .map(|d| d.message.clone())
            .collect()
    }

    #[test]
    fn module_with_declarations() {
        let res = parse(
            "demo: MODULE\n\
             NEWMODE counter = RANGE(0:65535), status = SET(idle, active);\n\
             DCL x, y counter := 0;\n\
             SYN max_size = 100;\n\
             END demo;",
        );
        assert!(errors(&res).is_empty(), "{:?}", res.diagnostics);
        let module = res.module.expect("module");
        assert_eq!(module.name.as_ref().map(|n| n.name.as_str()), Some("demo"));
        assert_eq!(module.items.len(), 4);
        match &module.items[2] {
            Item::Dcl(d) => {
                assert_eq!(d.names.len(), 2);
                assert!(d.init.is_some());
            }
            other => panic!("expected DCL, got {other:?}"),
        }
    }

    #[test]
    fn alternate_module_header() {
        let res = parse("MODULE example;\nDCL x INT;\nEND example;");
        assert!(errors(&res).is_empty(), "{:?}", res.diagnostics);
        assert_eq!(res.module.unwrap().name.unwrap().name, "example");
    }

    #[test]
    fn end_name_mismatch_is_reported() {
        let res = parse("m: MODULE\nEND n;");
        assert_eq!(errors(&res).len(), 1);
        assert!(errors(&res)[0].contains("does not match"));
        assert!(res.module.is_some());
    }

    #[test]
    fn precedence_of_arithmetic() {
        let res = parse("m: MODULE\nDCL x INT;\nx := 1 + 2 * 3 = 7 AND TRUE;\nEND m;");
        assert!(errors(&res).is_empty(), "{:?}", res.diagnostics);
        let module = res.module.unwrap();
        let Item::Stmt(Stmt {
            kind: StmtKind::Assign { value, .. },
            ..
        }) = &module.items[1]
        else {
            panic!("expected assignment");
        };
        let ExprKind::Binary { op, lhs, .. } = &value.kind else {
            panic!("expected binary");
        };
        assert_eq!(*op, BinOp::And);
        let ExprKind::Binary { op, lhs, .. } = &lhs.kind else {
            panic!("expected comparison");
        };
        assert_eq!(*op, BinOp::Eq);
        let ExprKind::Binary { op, .. } = &lhs.kind else {
            panic!("expected sum");
        };
        assert_eq!(*op, BinOp::Add);
    }

    #[test]
    fn recovery_yields_one_diagnostic_per_statement() {
        let res = parse(
            "m: MODULE\nDCL x INT;\nx := ;\nx := 1;\nx := * 2;\nx := 3;\nEND m;",
        );
        assert_eq!(errors(&res).len(), 2, "{:?}", res.diagnostics);
        let module = res.module.unwrap();
        // DCL plus the two well-formed assignments
        assert_eq!(module.items.len(), 3);
    }

    #[test]
    fn recovery_inside_nested_block() {
        let res = parse("m: MODULE\nDCL b BOOL;\nIF b THEN b := ; ELSE b := FALSE; FI;\nEND m;");
        assert_eq!(errors(&res).len(), 1, "{:?}", res.diagnostics);
        let module = res.module.unwrap();
        let Item::Stmt(Stmt {
            kind: StmtKind::If { arms, else_body },
            ..
        }) = &module.items[1]
        else {
            panic!("expected IF");
        };
        assert_eq!(arms.len(), 1);
        assert_eq!(else_body.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn process_with_receive_case() {
        let src = "m: MODULE\n\
                   SIGNAL a = (INT), b;\n\
                   worker: PROCESS ();\n\
                     DCL v INT;\n\
                     DO FOR EVER;\n\
                       RECEIVE CASE\n\
                         (a IN v WHERE v > 0): v := v + 1;\n\
                         (b): EXIT;\n\
                       ELSE DELAY 1 SECS;\n\
                       ESAC;\n\
                     OD;\n\
                   END worker;\n\
                   END m;";
        let res = parse(src);
        assert!(errors(&res).is_empty(), "{:?}", res.diagnostics);
        let module = res.module.unwrap();
        let Item::Process(p) = &module.items[2] else {
            panic!("expected process");
        };
        let Item::Stmt(Stmt {
            kind: StmtKind::DoEver { body },
            ..
        }) = &p.body[1]
        else {
            panic!("expected DO EVER");
        };
        let StmtKind::ReceiveCase { alts, else_body } = &body[0].kind else {
            panic!("expected RECEIVE CASE");
        };
        assert_eq!(alts.len(), 2);
        assert_eq!(alts[0].bindings.len(), 1);
        assert!(alts[0].guard.is_some());
        assert!(else_body.is_some());
    }

    #[test]
    fn case_with_ranges_and_else() {
        let res = parse(
            "m: MODULE\nDCL i INT;\nCASE i OF (1, 2): i := 0; (3:5): i := 1; ELSE i := 2; ESAC;\nEND m;",
        );
        assert!(errors(&res).is_empty(), "{:?}", res.diagnostics);
        let module = res.module.unwrap();
        let Item::Stmt(Stmt {
            kind: StmtKind::Case { arms, else_body, .. },
            ..
        }) = &module.items[1]
        else {
            panic!("expected CASE");
        };
        assert_eq!(arms.len(), 2);
        assert_eq!(arms[0].labels.len(), 2);
        assert!(matches!(arms[1].labels[0], CaseLabel::Range(..)));
        assert!(else_body.is_some());
    }

    #[test]
    fn proc_with_directions_and_returns() {
        let res = parse(
            "m: MODULE\nswap: PROC (a, b INOUT INT, c IN BOOL) RETURNS (INT) GENERAL;\nRETURN a;\nEND swap;\nEND m;",
        );
        assert!(errors(&res).is_empty(), "{:?}", res.diagnostics);
        let Item::Proc(p) = &res.module.unwrap().items[0] else {
            panic!("expected proc");
        };
        assert_eq!(p.params.len(), 3);
        assert_eq!(p.params[0].dir, ParamDir::InOut);
        assert_eq!(p.params[2].dir, ParamDir::In);
        assert!(p.returns.is_some());
        assert_eq!(p.attrs, vec![ProcAttr::General]);
    }

    #[test]
    fn node_spans_cover_their_text() {
        let src = "m: MODULE\nDCL x INT;\nx := (1 + 2);\nEND m;";
        let res = parse(src);
        let module = res.module.unwrap();
        let Item::Stmt(stmt) = &module.items[1] else {
            panic!("expected statement");
        };
        assert_eq!(&src[stmt.span.start as usize..stmt.span.end as usize], "x := (1 + 2);");
        let StmtKind::Assign { value, .. } = &stmt.kind else {
            panic!("expected assignment");
        };
        assert_eq!(&src[value.span.start as usize..value.span.end as usize], "(1 + 2)");
    }

    #[test]
    fn region_header_semicolon_is_optional() {
        for header in ["guard: REGION\n", "guard: REGION;\n"] {
            let src = format!("m: MODULE\n{header}GRANT add;\nDCL total INT;\nadd: PROC (n INT);\ntotal := total + n;\nEND add;\nEND guard;\nEND m;");
            let res = parse(&src);
            assert!(errors(&res).is_empty(), "{header:?}: {:?}", res.diagnostics);
            let Item::Region(r) = &res.module.unwrap().items[0] else {
                panic!("expected region");
            };
            assert_eq!(r.name.name, "guard");
            assert_eq!(r.body.len(), 3);
            assert_eq!(r.end_name.as_ref().map(|n| n.name.as_str()), Some("guard"));
        }
    }

    #[test]
    fn second_module_is_rejected() {
        let res = parse("a: MODULE\nEND a;\nb: MODULE\nEND b;");
        assert_eq!(errors(&res).len(), 1);
        assert!(errors(&res)[0].contains("only one MODULE"));
    }

    #[test]
    fn durations_in_both_forms() {
        let res = parse("m: MODULE\nDELAY 2 SECS;\nDELAY MILLISECS(50);\nEND m;");
        assert!(errors(&res).is_empty(), "{:?}", res.diagnostics);
        let module = res.module.unwrap();
        for item in &module.items {
            let Item::Stmt(Stmt {
                kind: StmtKind::Delay(e),
                ..
            }) = item
            else {
                panic!("expected DELAY");
            };
            assert!(matches!(e.kind, ExprKind::Duration { .. }));
        }
    }
}
