//! Byte-driven lexing state machine.
//!
//! The machine is language-neutral: it splits input into whitespace,
//! comments, strings, numbers, identifiers, brackets and punctuation, and
//! tracks bracket depth. Grammars decide what the raw kinds mean.

use std::fmt;

use crate::base::Span;

/// Which bracket pair a delimiter token belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Delimiter {
    Brace,
    Bracket,
    Paren,
}

impl Delimiter {
    fn open(c: char) -> Option<Delimiter> {
        match c {
            '{' => Some(Delimiter::Brace),
            '[' => Some(Delimiter::Bracket),
            '(' => Some(Delimiter::Paren),
            _ => None,
        }
    }

    fn close(c: char) -> Option<Delimiter> {
        match c {
            '}' => Some(Delimiter::Brace),
            ']' => Some(Delimiter::Bracket),
            ')' => Some(Delimiter::Paren),
            _ => None,
        }
    }

    pub fn open_char(self) -> char {
        match self {
            Delimiter::Brace => '{',
            Delimiter::Bracket => '[',
            Delimiter::Paren => '(',
        }
    }

    pub fn close_char(self) -> char {
        match self {
            Delimiter::Brace => '}',
            Delimiter::Bracket => ']',
            Delimiter::Paren => ')',
        }
    }
}

/// Why a run of bytes could not be lexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LexFault {
    InvalidUtf8,
    UnexpectedChar,
    UnterminatedString,
    UnterminatedComment,
}

impl LexFault {
    pub fn message(self) -> &'static str {
        match self {
            LexFault::InvalidUtf8 => "invalid UTF-8 sequence",
            LexFault::UnexpectedChar => "unexpected character",
            LexFault::UnterminatedString => "unterminated string literal",
            LexFault::UnterminatedComment => "unterminated block comment",
        }
    }
}

impl fmt::Display for LexFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Token shapes recognized by the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RawKind {
    Whitespace,
    LineComment,
    BlockComment,
    String,
    Number,
    Ident,
    Open(Delimiter),
    Close(Delimiter),
    Punct(char),
    Error(LexFault),
    Eof,
}

/// Per-language switches of the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LexRules {
    /// `//` line and `/* */` block comments.
    pub slash_comments: bool,
    /// A character starting a comment that runs to end of line.
    pub line_comment: Option<char>,
    pub single_quote_strings: bool,
    /// Backtick strings; unlike the others they may span lines.
    pub backtick_strings: bool,
    pub dollar_idents: bool,
}

/// A token as produced by the machine, before classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawToken {
    pub span: Span,
    pub kind: RawKind,
    /// Bracket depth: openers carry the depth outside them, closers the
    /// depth after them, everything else the depth it sits at.
    pub depth: u32,
}

impl RawToken {
    /// Bracket depth right after this token.
    pub fn depth_after(&self) -> u32 {
        match self.kind {
            RawKind::Open(_) => self.depth + 1,
            _ => self.depth,
        }
    }
}

/// A position the machine can be resumed from: any token start, together
/// with the bracket depth in effect there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LexCheckpoint {
    pub offset: u32,
    pub depth: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    Whitespace,
    Slash,
    InString,
    InStringEscape,
    InNumber { exp: bool, dot: bool },
    InIdentifier,
    InComment { block: bool, star: bool },
    Error(LexFault),
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    Char(char),
    Invalid,
}

enum Step {
    /// The unit belongs to the current token.
    Consume,
    /// The unit closes the current token.
    ConsumeEmit(RawKind),
    /// The current token ended before the unit; emit it and look again.
    Reprocess(RawKind),
}

/// Streaming lexer. Feed it bytes in chunks of any size, then call
/// [`Lexer::finish`]; the tokens are identical however the input was split.
#[derive(Debug, Clone)]
pub struct Lexer {
    rules: LexRules,
    state: State,
    offset: u32,
    token_start: u32,
    depth: u32,
    quote: char,
    // UTF-8 assembly across chunk boundaries
    pending: [u8; 4],
    pending_len: usize,
    pending_need: usize,
}

impl Lexer {
    pub fn new(rules: LexRules) -> Self {
        Self::resume(rules, LexCheckpoint::default())
    }

    /// Start lexing at a token boundary other than the beginning.
    pub fn resume(rules: LexRules, at: LexCheckpoint) -> Self {
        Self {
            rules,
            state: State::Start,
            offset: at.offset,
            token_start: at.offset,
            depth: at.depth,
            quote: '"',
            pending: [0; 4],
            pending_len: 0,
            pending_need: 0,
        }
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn is_done(&self) -> bool {
        self.state == State::Done
    }

    /// Lex a chunk of input, appending completed tokens to `out`.
    pub fn feed(&mut self, bytes: &[u8], out: &mut Vec<RawToken>) {
        for &byte in bytes {
            if self.state == State::Done {
                return;
            }
            self.push_byte(byte, out);
        }
    }

    /// Flush the token in progress and emit the end-of-input token.
    pub fn finish(&mut self, out: &mut Vec<RawToken>) {
        if self.state == State::Done {
            return;
        }
        if self.pending_len > 0 {
            let len = self.pending_len as u32;
            self.pending_len = 0;
            self.step(Unit::Invalid, len, out);
        }
        let last = match self.state {
            State::Start | State::Done => None,
            State::Whitespace => Some(RawKind::Whitespace),
            State::Slash => Some(RawKind::Punct('/')),
            State::InString | State::InStringEscape => {
                Some(RawKind::Error(LexFault::UnterminatedString))
            }
            State::InNumber { .. } => Some(RawKind::Number),
            State::InIdentifier => Some(RawKind::Ident),
            State::InComment { block: false, .. } => Some(RawKind::LineComment),
            State::InComment { block: true, .. } => {
                Some(RawKind::Error(LexFault::UnterminatedComment))
            }
            State::Error(fault) => Some(RawKind::Error(fault)),
        };
        if let Some(kind) = last {
            self.emit(kind, out);
        }
        self.token_start = self.offset;
        self.emit(RawKind::Eof, out);
        self.state = State::Done;
    }

    fn push_byte(&mut self, byte: u8, out: &mut Vec<RawToken>) {
        if self.pending_len > 0 {
            if byte & 0xC0 != 0x80 {
                // broken sequence: the lead byte(s) become one invalid unit
                let len = self.pending_len as u32;
                self.pending_len = 0;
                self.step(Unit::Invalid, len, out);
            } else {
                self.pending[self.pending_len] = byte;
                self.pending_len += 1;
                if self.pending_len == self.pending_need {
                    let len = self.pending_len;
                    self.pending_len = 0;
                    let unit = std::str::from_utf8(&self.pending[..len])
                        .ok()
                        .and_then(|s| s.chars().next())
                        .map_or(Unit::Invalid, Unit::Char);
                    self.step(unit, len as u32, out);
                }
                return;
            }
        }

        match utf8_len(byte) {
            1 => self.step(Unit::Char(byte as char), 1, out),
            0 => self.step(Unit::Invalid, 1, out),
            need => {
                self.pending[0] = byte;
                self.pending_len = 1;
                self.pending_need = need;
            }
        }
    }

    fn emit(&mut self, kind: RawKind, out: &mut Vec<RawToken>) {
        if let RawKind::Close(_) = kind {
            self.depth = self.depth.saturating_sub(1);
        }
        out.push(RawToken {
            span: Span::new(self.token_start, self.offset),
            kind,
            depth: self.depth,
        });
        if let RawKind::Open(_) = kind {
            self.depth += 1;
        }
        self.token_start = self.offset;
        self.state = State::Start;
    }

    fn step(&mut self, unit: Unit, len: u32, out: &mut Vec<RawToken>) {
        loop {
            let step = match self.state {
                State::Done => return,
                State::Start => {
                    self.begin(unit, len, out);
                    return;
                }
                State::Whitespace => match unit {
                    Unit::Char(c) if c.is_whitespace() => Step::Consume,
                    _ => Step::Reprocess(RawKind::Whitespace),
                },
                State::Slash => match unit {
                    Unit::Char('/') => {
                        self.state = State::InComment {
                            block: false,
                            star: false,
                        };
                        Step::Consume
                    }
                    Unit::Char('*') => {
                        self.state = State::InComment {
                            block: true,
                            star: false,
                        };
                        Step::Consume
                    }
                    _ => Step::Reprocess(RawKind::Punct('/')),
                },
                State::InString => match unit {
                    Unit::Char(c) if c == self.quote => Step::ConsumeEmit(RawKind::String),
                    Unit::Char('\\') => {
                        self.state = State::InStringEscape;
                        Step::Consume
                    }
                    Unit::Char('\n') if self.quote != '`' => {
                        Step::Reprocess(RawKind::Error(LexFault::UnterminatedString))
                    }
                    _ => Step::Consume,
                },
                State::InStringEscape => {
                    self.state = State::InString;
                    Step::Consume
                }
                State::InNumber { exp, dot } => match unit {
                    Unit::Char('e' | 'E') => {
                        self.state = State::InNumber { exp: true, dot };
                        Step::Consume
                    }
                    Unit::Char('+' | '-') if exp => {
                        self.state = State::InNumber { exp: false, dot };
                        Step::Consume
                    }
                    Unit::Char('.') if !dot => {
                        self.state = State::InNumber { exp: false, dot: true };
                        Step::Consume
                    }
                    Unit::Char(c) if c.is_ascii_alphanumeric() || c == '_' => {
                        self.state = State::InNumber { exp: false, dot };
                        Step::Consume
                    }
                    _ => Step::Reprocess(RawKind::Number),
                },
                State::InIdentifier => match unit {
                    Unit::Char(c) if self.ident_continue(c) => Step::Consume,
                    _ => Step::Reprocess(RawKind::Ident),
                },
                State::InComment { block: false, .. } => match unit {
                    Unit::Char('\n') => Step::Reprocess(RawKind::LineComment),
                    _ => Step::Consume,
                },
                State::InComment { block: true, star } => {
                    if star && unit == Unit::Char('/') {
                        Step::ConsumeEmit(RawKind::BlockComment)
                    } else {
                        self.state = State::InComment {
                            block: true,
                            star: unit == Unit::Char('*'),
                        };
                        Step::Consume
                    }
                }
                State::Error(fault) => {
                    if self.starts_token(unit) {
                        Step::Reprocess(RawKind::Error(fault))
                    } else {
                        Step::Consume
                    }
                }
            };

            match step {
                Step::Consume => {
                    self.offset += len;
                    return;
                }
                Step::ConsumeEmit(kind) => {
                    self.offset += len;
                    self.emit(kind, out);
                    return;
                }
                Step::Reprocess(kind) => self.emit(kind, out),
            }
        }
    }

    /// Handle the first unit of a new token.
    fn begin(&mut self, unit: Unit, len: u32, out: &mut Vec<RawToken>) {
        self.token_start = self.offset;
        self.offset += len;
        let c = match unit {
            Unit::Char(c) => c,
            Unit::Invalid => {
                self.state = State::Error(LexFault::InvalidUtf8);
                return;
            }
        };

        self.state = if c.is_whitespace() {
            State::Whitespace
        } else if c == '/' && self.rules.slash_comments {
            State::Slash
        } else if Some(c) == self.rules.line_comment {
            State::InComment {
                block: false,
                star: false,
            }
        } else if self.is_quote(c) {
            self.quote = c;
            State::InString
        } else if c.is_ascii_digit() {
            State::InNumber {
                exp: false,
                dot: false,
            }
        } else if self.ident_start(c) {
            State::InIdentifier
        } else if let Some(delim) = Delimiter::open(c) {
            self.emit(RawKind::Open(delim), out);
            return;
        } else if let Some(delim) = Delimiter::close(c) {
            self.emit(RawKind::Close(delim), out);
            return;
        } else if c.is_ascii_punctuation() {
            self.emit(RawKind::Punct(c), out);
            return;
        } else {
            State::Error(LexFault::UnexpectedChar)
        };
    }

    fn is_quote(&self, c: char) -> bool {
        c == '"'
            || (c == '\'' && self.rules.single_quote_strings)
            || (c == '`' && self.rules.backtick_strings)
    }

    fn ident_start(&self, c: char) -> bool {
        c == '_' || (c == '$' && self.rules.dollar_idents) || unicode_ident::is_xid_start(c)
    }

    fn ident_continue(&self, c: char) -> bool {
        (c == '$' && self.rules.dollar_idents) || unicode_ident::is_xid_continue(c)
    }

    /// Whether an error run stops before `unit`.
    fn starts_token(&self, unit: Unit) -> bool {
        match unit {
            Unit::Invalid => false,
            Unit::Char(c) => {
                c.is_whitespace()
                    || c.is_ascii_punctuation()
                    || c.is_ascii_digit()
                    || self.ident_start(c)
            }
        }
    }
}

/// Length of the UTF-8 sequence introduced by `byte`, or 0 if it cannot
/// start one.
fn utf8_len(byte: u8) -> usize {
    match byte {
        0x00..=0x7F => 1,
        0xC2..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF4 => 4,
        _ => 0,
    }
}

/// Lex a whole string at once.
pub fn lex(source: &str, rules: LexRules) -> Vec<RawToken> {
    let mut out = Vec::with_capacity(source.len() / 3 + 1);
    let mut lexer = Lexer::new(rules);
    lexer.feed(source.as_bytes(), &mut out);
    lexer.finish(&mut out);
    out
}

const CHUNK: usize = 64;

/// Lazy token sequence over a string, restartable at any checkpoint.
///
/// Ends with exactly one zero-length [`RawKind::Eof`] token.
#[derive(Debug, Clone)]
pub struct TokenStream<'a> {
    source: &'a [u8],
    pos: usize,
    lexer: Lexer,
    buf: Vec<RawToken>,
    next: usize,
}

impl<'a> TokenStream<'a> {
    pub fn new(source: &'a str, rules: LexRules) -> Self {
        Self::resume(source, rules, LexCheckpoint::default())
    }

    pub fn resume(source: &'a str, rules: LexRules, at: LexCheckpoint) -> Self {
        Self {
            source: source.as_bytes(),
            pos: (at.offset as usize).min(source.len()),
            lexer: Lexer::resume(rules, at),
            buf: Vec::new(),
            next: 0,
        }
    }
}

impl Iterator for TokenStream<'_> {
    type Item = RawToken;

    fn next(&mut self) -> Option<RawToken> {
        loop {
            if let Some(token) = self.buf.get(self.next) {
                self.next += 1;
                return Some(*token);
            }
            if self.lexer.is_done() {
                return None;
            }
            self.buf.clear();
            self.next = 0;
            if self.pos < self.source.len() {
                let end = (self.pos + CHUNK).min(self.source.len());
                self.lexer.feed(&self.source[self.pos..end], &mut self.buf);
                self.pos = end;
            } else {
                self.lexer.finish(&mut self.buf);
            }
        }
    }
}
