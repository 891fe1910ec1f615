//! Lossless lexer for CHILL source text.
//!
//! The lexer is a lazy iterator over significant tokens. Whitespace,
//! comments and unrecognised characters are kept as trivia on the side
//! together with lexical diagnostics, so tokens plus trivia always
//! reproduce the input exactly (see `reconstruct`).

use std::fmt;

use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::span::{FileId, Position, Span};

/// Source radix of an integer literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Radix {
    Binary,
    Octal,
    Decimal,
    Hexadecimal,
}

impl Radix {
    fn from_prefix(c: u8) -> Option<Radix> {
        match c.to_ascii_uppercase() {
            b'B' => Some(Radix::Binary),
            b'O' => Some(Radix::Octal),
            b'D' => Some(Radix::Decimal),
            b'H' => Some(Radix::Hexadecimal),
            _ => None,
        }
    }

    pub fn base(self) -> u32 {
        match self {
            Radix::Binary => 2,
            Radix::Octal => 8,
            Radix::Decimal => 10,
            Radix::Hexadecimal => 16,
        }
    }
}

macro_rules! keywords {
    ($($variant:ident => $text:literal,)*) => {
        /// Reserved words that the grammar gives a meaning to.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Keyword {
            $($variant,)*
        }

        impl Keyword {
            pub const ALL: &'static [Keyword] = &[$(Keyword::$variant,)*];

            pub fn as_str(self) -> &'static str {
                match self {
                    $(Keyword::$variant => $text,)*
                }
            }

            /// Case-insensitive lookup.
            pub fn lookup(word: &str) -> Option<Keyword> {
                let upper = word.to_ascii_uppercase();
                match upper.as_str() {
                    $($text => Some(Keyword::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

keywords! {
    All => "ALL",
    And => "AND",
    AndIf => "ANDIF",
    Array => "ARRAY",
    Begin => "BEGIN",
    Bools => "BOOLS",
    Buffer => "BUFFER",
    By => "BY",
    Call => "CALL",
    Case => "CASE",
    Chars => "CHARS",
    Continue => "CONTINUE",
    Dcl => "DCL",
    Delay => "DELAY",
    Do => "DO",
    Else => "ELSE",
    Elsif => "ELSIF",
    End => "END",
    Esac => "ESAC",
    Event => "EVENT",
    Ever => "EVER",
    Exit => "EXIT",
    Fi => "FI",
    For => "FOR",
    General => "GENERAL",
    Grant => "GRANT",
    If => "IF",
    In => "IN",
    Init => "INIT",
    Inline => "INLINE",
    Inout => "INOUT",
    Loc => "LOC",
    Mod => "MOD",
    Module => "MODULE",
    Newmode => "NEWMODE",
    Not => "NOT",
    Od => "OD",
    Of => "OF",
    Or => "OR",
    OrIf => "ORIF",
    Otherwise => "OTHERWISE",
    Out => "OUT",
    Powerset => "POWERSET",
    Proc => "PROC",
    Process => "PROCESS",
    Range => "RANGE",
    Receive => "RECEIVE",
    Ref => "REF",
    Region => "REGION",
    Rem => "REM",
    Result => "RESULT",
    Return => "RETURN",
    Returns => "RETURNS",
    Seize => "SEIZE",
    Send => "SEND",
    Set => "SET",
    Signal => "SIGNAL",
    Simple => "SIMPLE",
    Start => "START",
    Static => "STATIC",
    Stop => "STOP",
    Struct => "STRUCT",
    Syn => "SYN",
    Synmode => "SYNMODE",
    Then => "THEN",
    This => "THIS",
    To => "TO",
    While => "WHILE",
    Xor => "XOR",
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Z.200 reserved words (Appendix III.1). Those without a `Keyword`
/// lex as `TokenKind::Reserved`.
pub const RESERVED_WORDS: &[&str] = &[
    "ABSTRACT", "ACCESS", "AFTER", "ALL", "AND", "ANDIF", "ANY", "ARRAY", "ASSERT", "AT",
    "BASED_ON", "BEGIN", "BIN", "BODY", "BOOLS", "BUFFER", "BY", "CALL", "CASE", "CAUSE",
    "CHARS", "CONTEXT", "CONTINUE", "CYCLE", "DCL", "DELAY", "DO", "DOWN", "DYNAMIC", "ELSE",
    "ELSIF", "END", "ESAC", "EVENT", "EVER", "EXCEPTIONS", "EXIT", "FI", "FINAL", "FOR",
    "FORBID", "GENERAL", "GENERIC", "GOTO", "GRANT", "IF", "IMPLEMENTS", "IN", "INCOMPLETE",
    "INIT", "INLINE", "INOUT", "INTERFACE", "INVARIANT", "LOC", "MOD", "MODE", "MODULE", "NEW",
    "NEWMODE", "NONREF", "NOPACK", "NOT", "OD", "OF", "ON", "OR", "ORIF", "OTHERWISE", "OUT",
    "PACK", "POS", "POST", "POWERSET", "PRE", "PREFIXED", "PRIORITY", "PROC", "PROCESS",
    "RANGE", "READ", "RECEIVE", "REF", "REGION", "REM", "REMOTE", "RESULT", "RETURN",
    "RETURNS", "ROW", "SEIZE", "SELF", "SEND", "SET", "SIGNAL", "SIMPLE", "SPEC", "START",
    "STATIC", "STEP", "STOP", "STRUCT", "SYN", "SYNMODE", "TASK", "TEXT", "THEN", "THIS",
    "TIMEOUT", "TO", "UP", "VARYING", "WCHARS", "WHILE", "WITH", "WTEXT", "XOR",
];

/// Z.200 predefined names (Appendix III.2) plus the implementation
/// modes common in switching-system code.
pub const PREDEFINED_NAMES: &[&str] = &[
    // built-in routines
    "ABS", "ABSTIME", "ALLOCATE", "ARCCOS", "ARCSIN", "ARCTAN", "ASSOCIATE", "CARD", "CONNECT",
    "COS", "CREATE", "DELETE", "DISCONNECT", "DISSOCIATE", "EOLN", "EXCL", "EXISTING",
    "EXP", "EXPIRED", "FIRST", "FLOAT", "GETASSOCIATION", "GETSTACK", "GETTEXTACCESS", "GETTEXTINDEX",
    "GETTEXTRECORD", "GETUSAGE", "INCL", "INDEXABLE", "INTTIME", "ISASSOCIATED", "LAST", "LENGTH",
    "LN", "LOG", "LOWER", "MAX", "MIN", "MODIFY", "NUM", "OUTOFFILE", "PRED", "PTR",
    "READABLE", "READONLY", "READRECORD", "READTEXT", "READWRITE", "SAME", "SEQUENCIBLE",
    "SETTEXTACCESS", "SETTEXTINDEX", "SETTEXTRECORD", "SIN", "SIZE", "SQRT", "SUCC", "TAN",
    "TERMINATE", "UPPER", "USAGE", "VARIABLE", "WAIT", "WCHAR", "WHERE", "WRITEABLE",
    "WRITEONLY", "WRITERECORD", "WRITETEXT",
    // modes
    "INT", "BOOL", "CHAR", "DURATION", "TIME", "ASSOCIATION", "INSTANCE", "BYTE", "UBYTE",
    "UINT", "LONG", "ULONG",
    // constants
    "TRUE", "FALSE", "NULL",
    // time units
    "DAYS", "HOURS", "MILLISECS", "MINUTES", "SECS", "SECONDS", "MICROSECS",
];

pub fn is_reserved(word: &str) -> bool {
    let upper = word.to_ascii_uppercase();
    RESERVED_WORDS.contains(&upper.as_str())
}

pub fn is_predefined(word: &str) -> bool {
    let upper = word.to_ascii_uppercase();
    PREDEFINED_NAMES.contains(&upper.as_str())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Keyword(Keyword),
    /// Upper-cased reserved word with no role in this grammar.
    Reserved(String),
    /// Predefined name, upper-cased. The token text keeps the original
    /// spelling so the name may still be redeclared by the program.
    Predefined(String),
    Ident(String),
    Int { value: i64, radix: Radix },
    Str(String),
    Char(char),

    Plus,
    Minus,
    Star,
    Slash,
    Concat, // //
    Eq,
    Ne, // /=
    Lt,
    Le,
    Gt,
    Ge,
    Assign, // :=
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Semicolon,
    Colon,
    Dot,
    Arrow, // ->

    Eof,
}

impl TokenKind {
    pub fn is_keyword(&self, kw: Keyword) -> bool {
        matches!(self, TokenKind::Keyword(k) if *k == kw)
    }

    /// Short description used in "expected X, found Y" messages.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Keyword(k) => format!("`{k}`"),
            TokenKind::Reserved(w) => format!("reserved word `{w}`"),
            TokenKind::Predefined(w) | TokenKind::Ident(w) => format!("`{w}`"),
            TokenKind::Int { value, .. } => format!("integer literal `{value}`"),
            TokenKind::Str(_) => "string literal".to_string(),
            TokenKind::Char(_) => "character literal".to_string(),
            TokenKind::Eof => "end of file".to_string(),
            other => format!("`{}`", punct_text(other)),
        }
    }
}

fn punct_text(kind: &TokenKind) -> &'static str {
    match kind {
        TokenKind::Plus => "+",
        TokenKind::Minus => "-",
        TokenKind::Star => "*",
        TokenKind::Slash => "/",
        TokenKind::Concat => "//",
        TokenKind::Eq => "=",
        TokenKind::Ne => "/=",
        TokenKind::Lt => "<",
        TokenKind::Le => "<=",
        TokenKind::Gt => ">",
        TokenKind::Ge => ">=",
        TokenKind::Assign => ":=",
        TokenKind::LParen => "(",
        TokenKind::RParen => ")",
        TokenKind::LBracket => "[",
        TokenKind::RBracket => "]",
        TokenKind::Comma => ",",
        TokenKind::Semicolon => ";",
        TokenKind::Colon => ":",
        TokenKind::Dot => ".",
        TokenKind::Arrow => "->",
        _ => "?",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// Exact source text of the token.
    pub text: String,
    /// Start position of the token.
    pub pos: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriviaKind {
    Whitespace,
    LineComment,
    BlockComment,
    /// A character the lexer could not classify (reported and skipped).
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trivia {
    pub kind: TriviaKind,
    pub span: Span,
    pub text: String,
}

impl Trivia {
    pub fn is_comment(&self) -> bool {
        matches!(self.kind, TriviaKind::LineComment | TriviaKind::BlockComment)
    }
}

/// Restartable token iterator.
///
/// Trivia and diagnostics produced while iterating are collected on the
/// lexer and can be read back at any time.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    file_id: FileId,
    src: &'a str,
    pos: usize,
    line: u32,
    col: u32,
    done: bool,
    trivia: Vec<Trivia>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Lexer<'a> {
    pub fn new(file_id: FileId, src: &'a str) -> Lexer<'a> {
        Lexer {
            file_id,
            src,
            pos: 0,
            line: 0,
            col: 0,
            done: false,
            trivia: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Rewind to the start of the input, dropping collected side output.
    pub fn reset(&mut self) {
        *self = Lexer::new(self.file_id, self.src);
    }

    pub fn trivia(&self) -> &[Trivia] {
        &self.trivia
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    fn span(&self, start: usize, end: usize) -> Span {
        Span::new(self.file_id, start as u32, end as u32)
    }

    fn peek_byte(&self, ahead: usize) -> Option<u8> {
        self.src.as_bytes().get(self.pos + ahead).copied()
    }

    /// Advance over `len` bytes, keeping line/column in sync.
    fn bump(&mut self, len: usize) {
        let end = (self.pos + len).min(self.src.len());
        for ch in self.src[self.pos..end].chars() {
            if ch == '\n' {
                self.line += 1;
                self.col = 0;
            } else {
                self.col += 1;
            }
        }
        self.pos = end;
    }

    fn push_trivia(&mut self, kind: TriviaKind, start: usize) {
        self.trivia.push(Trivia {
            kind,
            span: self.span(start, self.pos),
            text: self.src[start..self.pos].to_string(),
        });
    }

    fn error(&mut self, message: impl Into<String>, start: usize, end: usize) {
        let span = self.span(start, end);
        self.diagnostics
            .push(Diagnostic::error(DiagnosticKind::LexicalError, message, span));
    }

    /// Consume trivia up to the next significant character.
    fn skip_trivia(&mut self) {
        loop {
            let Some(c) = self.peek_byte(0) else { return };
            let start = self.pos;
            if c.is_ascii_whitespace() {
                while matches!(self.peek_byte(0), Some(b) if b.is_ascii_whitespace()) {
                    self.bump(1);
                }
                self.push_trivia(TriviaKind::Whitespace, start);
            } else if c == b'-' && self.peek_byte(1) == Some(b'-') {
                let len = self.src[start..].find('\n').unwrap_or(self.src.len() - start);
                self.bump(len);
                self.push_trivia(TriviaKind::LineComment, start);
            } else if c == b'/' && self.peek_byte(1) == Some(b'*') {
                match self.src[start + 2..].find("*/") {
                    Some(idx) => self.bump(idx + 4),
                    None => {
                        self.bump(self.src.len() - start);
                        self.error("unterminated block comment", start, start + 2);
                    }
                }
                self.push_trivia(TriviaKind::BlockComment, start);
            } else if c.is_ascii() && !is_token_start(c) {
                self.bump(1);
                self.push_trivia(TriviaKind::Unknown, start);
                self.error(format!("unknown character `{}`", c as char), start, self.pos);
            } else if !c.is_ascii() {
                let len = self.src[start..].chars().next().map_or(1, char::len_utf8);
                self.bump(len);
                self.push_trivia(TriviaKind::Unknown, start);
                self.error(
                    format!("unknown character `{}`", &self.src[start..self.pos]),
                    start,
                    self.pos,
                );
            } else {
                return;
            }
        }
    }

    fn lex_token(&mut self) -> TokenKind {
        let start = self.pos;
        let bytes = self.src.as_bytes();
        let c = bytes[start];

        if Radix::from_prefix(c).is_some() && self.peek_byte(1) == Some(b'\'') {
            return self.lex_based_int();
        }
        if c.is_ascii_digit() {
            return self.lex_decimal();
        }
        if is_ident_start(c) {
            let mut end = start + 1;
            while end < bytes.len() && is_ident_continue(bytes[end]) {
                end += 1;
            }
            self.bump(end - start);
            return classify_word(&self.src[start..end]);
        }
        if c == b'\'' {
            return self.lex_string();
        }

        let two = self.src.get(start..start + 2).unwrap_or("");
        let (kind, len) = match two {
            ":=" => (TokenKind::Assign, 2),
            "/=" => (TokenKind::Ne, 2),
            "//" => (TokenKind::Concat, 2),
            "<=" => (TokenKind::Le, 2),
            ">=" => (TokenKind::Ge, 2),
            "->" => (TokenKind::Arrow, 2),
            _ => {
                let kind = match c {
                    b'+' => TokenKind::Plus,
                    b'-' => TokenKind::Minus,
                    b'*' => TokenKind::Star,
                    b'/' => TokenKind::Slash,
                    b'=' => TokenKind::Eq,
                    b'<' => TokenKind::Lt,
                    b'>' => TokenKind::Gt,
                    b'(' => TokenKind::LParen,
                    b')' => TokenKind::RParen,
                    b'[' => TokenKind::LBracket,
                    b']' => TokenKind::RBracket,
                    b',' => TokenKind::Comma,
                    b';' => TokenKind::Semicolon,
                    b':' => TokenKind::Colon,
                    _ => TokenKind::Dot,
                };
                (kind, 1)
            }
        };
        self.bump(len);
        kind
    }

    fn lex_decimal(&mut self) -> TokenKind {
        let start = self.pos;
        let bytes = self.src.as_bytes();
        let mut end = start;
        while end < bytes.len() && (bytes[end].is_ascii_digit() || bytes[end] == b'_') {
            end += 1;
        }
        self.bump(end - start);
        let digits = &self.src[start..end];
        let value = match parse_digits(digits, Radix::Decimal) {
            Ok(v) => v,
            Err(msg) => {
                self.error(msg, start, end);
                0
            }
        };
        TokenKind::Int {
            value,
            radix: Radix::Decimal,
        }
    }

    /// `B'1010'`, `O'17'`, `D'99'`, `H'FF'`.
    fn lex_based_int(&mut self) -> TokenKind {
        let start = self.pos;
        let radix = Radix::from_prefix(self.src.as_bytes()[start]).unwrap_or(Radix::Decimal);
        let body_start = start + 2;
        let rest = &self.src[body_start..];
        let body_len = rest
            .find(|c: char| c == '\'' || c == '\n' || c == ';')
            .unwrap_or(rest.len());
        let closed = rest[body_len..].starts_with('\'');
        let body = &rest[..body_len];
        let value = if !closed {
            self.bump(2 + body_len);
            self.error("malformed numeric literal: missing closing quote", start, self.pos);
            0
        } else {
            self.bump(3 + body_len);
            match parse_digits(body, radix) {
                Ok(v) => v,
                Err(msg) => {
                    self.error(msg, start, self.pos);
                    0
                }
            }
        };
        TokenKind::Int { value, radix }
    }

    fn lex_string(&mut self) -> TokenKind {
        let start = self.pos;
        let mut value = String::new();
        let mut idx = start + 1;
        let mut closed = false;
        let src = self.src;
        while idx < src.len() {
            let rest = &src[idx..];
            if rest.starts_with("''") {
                value.push('\'');
                idx += 2;
            } else if rest.starts_with('\'') {
                idx += 1;
                closed = true;
                break;
            } else if rest.starts_with('\n') {
                break;
            } else {
                let ch = rest.chars().next().unwrap_or('\0');
                value.push(ch);
                idx += ch.len_utf8();
            }
        }
        self.bump(idx - start);
        if !closed {
            self.error("unterminated string literal", start, idx);
        }
        let mut chars = value.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) if closed => TokenKind::Char(ch),
            _ => TokenKind::Str(value),
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.done {
            return None;
        }
        self.skip_trivia();
        let start = self.pos;
        let pos = Position::new(self.line, self.col);
        if start >= self.src.len() {
            self.done = true;
            return Some(Token {
                kind: TokenKind::Eof,
                span: self.span(start, start),
                text: String::new(),
                pos,
            });
        }
        let kind = self.lex_token();
        Some(Token {
            kind,
            span: self.span(start, self.pos),
            text: self.src[start..self.pos].to_string(),
            pos,
        })
    }
}

#[derive(Debug, Clone)]
pub struct LexResult {
    /// Significant tokens, terminated by a single `Eof`.
    pub tokens: Vec<Token>,
    pub trivia: Vec<Trivia>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Lex a whole unit eagerly.
pub fn lex(file_id: FileId, src: &str) -> LexResult {
    let mut lexer = Lexer::new(file_id, src);
    let tokens: Vec<Token> = lexer.by_ref().collect();
    tracing::trace!(tokens = tokens.len(), trivia = lexer.trivia.len(), "lexed");
    LexResult {
        tokens,
        trivia: lexer.trivia,
        diagnostics: lexer.diagnostics,
    }
}

/// Rebuild the source text from tokens and trivia.
pub fn reconstruct(tokens: &[Token], trivia: &[Trivia]) -> String {
    let mut pieces: Vec<(u32, &str)> = tokens
        .iter()
        .map(|t| (t.span.start, t.text.as_str()))
        .chain(trivia.iter().map(|t| (t.span.start, t.text.as_str())))
        .filter(|(_, text)| !text.is_empty())
        .collect();
    pieces.sort_by_key(|(start, _)| *start);
    pieces.into_iter().map(|(_, text)| text).collect()
}

fn classify_word(word: &str) -> TokenKind {
    if let Some(kw) = Keyword::lookup(word) {
        return TokenKind::Keyword(kw);
    }
    let upper = word.to_ascii_uppercase();
    if RESERVED_WORDS.contains(&upper.as_str()) {
        TokenKind::Reserved(upper)
    } else if PREDEFINED_NAMES.contains(&upper.as_str()) {
        TokenKind::Predefined(upper)
    } else {
        TokenKind::Ident(word.to_string())
    }
}

fn parse_digits(digits: &str, radix: Radix) -> Result<i64, String> {
    let cleaned: String = digits.chars().filter(|c| *c != '_').collect();
    if cleaned.is_empty() {
        return Err("malformed numeric literal: no digits".to_string());
    }
    if let Some(bad) = cleaned.chars().find(|c| !c.is_digit(radix.base())) {
        return Err(format!(
            "malformed numeric literal: `{bad}` is not a base-{} digit",
            radix.base()
        ));
    }
    i64::from_str_radix(&cleaned, radix.base())
        .map_err(|_| "malformed numeric literal: value does not fit in 64 bits".to_string())
}

fn is_token_start(b: u8) -> bool {
    is_ident_start(b) || b.is_ascii_digit() || b"'+-*/=<>()[],;:.".contains(&b)
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        lex(FileId(0), src).tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn keywords_are_case_insensitive() {
        assert_eq!(
            kinds("dcl Dcl DCL"),
            vec![
                TokenKind::Keyword(Keyword::Dcl),
                TokenKind::Keyword(Keyword::Dcl),
                TokenKind::Keyword(Keyword::Dcl),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn identifiers_keep_their_case() {
        assert_eq!(
            kinds("Count count"),
            vec![
                TokenKind::Ident("Count".into()),
                TokenKind::Ident("count".into()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn based_literals_carry_radix() {
        assert_eq!(
            kinds("B'101' h'FF' O'77' 1_000"),
            vec![
                TokenKind::Int { value: 5, radix: Radix::Binary },
                TokenKind::Int { value: 255, radix: Radix::Hexadecimal },
                TokenKind::Int { value: 63, radix: Radix::Octal },
                TokenKind::Int { value: 1000, radix: Radix::Decimal },
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn bad_digit_is_reported() {
        let res = lex(FileId(0), "B'102'");
        assert_eq!(res.diagnostics.len(), 1);
        assert_eq!(res.diagnostics[0].kind, DiagnosticKind::LexicalError);
    }

    #[test]
    fn doubled_quote_escapes() {
        assert_eq!(
            kinds("'it''s' 'x' ''''"),
            vec![
                TokenKind::Str("it's".into()),
                TokenKind::Char('x'),
                TokenKind::Char('\''),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn operators() {
        assert_eq!(
            kinds("a := b // c /= d -> e"),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::Assign,
                TokenKind::Ident("b".into()),
                TokenKind::Concat,
                TokenKind::Ident("c".into()),
                TokenKind::Ne,
                TokenKind::Ident("d".into()),
                TokenKind::Arrow,
                TokenKind::Ident("e".into()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn comments_are_trivia() {
        let src = "/* head */ x -- tail\n";
        let res = lex(FileId(0), src);
        assert_eq!(res.tokens.len(), 2);
        let comments: Vec<_> = res.trivia.iter().filter(|t| t.is_comment()).collect();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].text, "/* head */");
        assert_eq!(comments[1].text, "-- tail");
        assert_eq!(reconstruct(&res.tokens, &res.trivia), src);
    }

    #[test]
    fn unterminated_constructs() {
        let res = lex(FileId(0), "'abc\n/* open");
        let messages: Vec<_> = res.diagnostics.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, vec!["unterminated string literal", "unterminated block comment"]);
        assert_eq!(reconstruct(&res.tokens, &res.trivia), "'abc\n/* open");
    }

    #[test]
    fn unknown_character_is_skipped() {
        let res = lex(FileId(0), "a ? b");
        assert_eq!(res.tokens.len(), 3);
        assert_eq!(res.diagnostics.len(), 1);
        assert_eq!(reconstruct(&res.tokens, &res.trivia), "a ? b");
    }

    #[test]
    fn lexer_is_restartable() {
        let mut lexer = Lexer::new(FileId(0), "x y");
        let first: Vec<_> = lexer.by_ref().collect();
        lexer.reset();
        let second: Vec<_> = lexer.collect();
        assert_eq!(first, second);
    }

    #[test]
    fn positions_track_lines() {
        let res = lex(FileId(0), "a\n  b");
        assert_eq!(res.tokens[1].pos, Position::new(1, 2));
    }

    #[test]
    fn predefined_names_are_classified() {
        assert_eq!(
            kinds("int Secs WRITETEXT"),
            vec![
                TokenKind::Predefined("INT".into()),
                TokenKind::Predefined("SECS".into()),
                TokenKind::Predefined("WRITETEXT".into()),
                TokenKind::Eof
            ]
        );
    }
}
