//! Host-language lexer.
//!
//! Raw scanning is done by a `logos` lexer over the whole source. A second,
//! stateful pass turns the raw tokens into the logical token sequence the
//! expansion engine works on:
//!
//! 1. Track bracket depth: inside `()`, `[]`, `{}` a line break is an `Nl`
//!    and indentation is ignored.
//! 2. At the first significant token of each logical line, compare the line's
//!    leading whitespace with the indentation stack. A deeper prefix pushes a
//!    level and emits one `Indent` carrying the added suffix. A shallower
//!    prefix pops levels, emitting one `Dedent` per level carrying exactly the
//!    suffix that level pushed.
//! 3. Lines holding nothing but whitespace and comments only yield `Comment`
//!    and `Nl` tokens.
//! 4. At end of input, close the last logical line, pop every open level, and
//!    append the `EndMarker` sentinel.

use std::sync::Arc;

use logos::Logos;
use miette::NamedSource;

use crate::errors::{MakroError, Result, SourceArc};
use crate::syntax::token::{Position, Span, Token, TokenKind};

// ============================================================================
// RAW TOKENS
// ============================================================================

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
enum Raw {
    #[regex(r"[ \t\x0C]+")]
    Whitespace,

    #[regex(r"\r?\n")]
    LineBreak,

    #[regex(r"\\\r?\n")]
    Continuation,

    #[regex(r"#[^\r\n]*")]
    Comment,

    #[regex(r"[\p{XID_Start}_]\p{XID_Continue}*")]
    Name,

    #[regex(r"[0-9][0-9_]*(\.[0-9_]*)?([eE][+-]?[0-9_]+)?[jJ]?")]
    #[regex(r"\.[0-9][0-9_]*([eE][+-]?[0-9_]+)?[jJ]?")]
    #[regex(r"0[xX][0-9a-fA-F_]+")]
    #[regex(r"0[oO][0-7_]+")]
    #[regex(r"0[bB][01_]+")]
    Number,

    #[regex(r#"[rRbBfFuU]{0,2}""#, lex_quoted)]
    #[regex(r"[rRbBfFuU]{0,2}'", lex_quoted)]
    #[regex(r##"[rRbBfFuU]{0,2}""""##, lex_triple_quoted)]
    #[regex(r"[rRbBfFuU]{0,2}'''", lex_triple_quoted)]
    String,

    #[regex(r"\*\*=|//=|>>=|<<=|\.\.\.|!=|%=|&=|\*\*|\*=|\+=|-=|->|//|/=|:=|<<|<=|==|>=|>>|@=|\^=|\|=")]
    #[regex(r"[%&()*+,\-./:;<=>@\[\]\^{|}~!]")]
    Op,
}

/// Finishes a single-quoted string. A raw line break before the closing quote
/// makes the literal unterminated.
fn lex_quoted(lex: &mut logos::Lexer<Raw>) -> bool {
    let quote = lex.slice().as_bytes()[lex.slice().len() - 1];
    let rest = lex.remainder().as_bytes();
    let mut i = 0;
    while i < rest.len() {
        match rest[i] {
            b'\\' => i += 2,
            b'\n' => return false,
            c if c == quote => {
                lex.bump(i + 1);
                return true;
            }
            _ => i += 1,
        }
    }
    false
}

/// Finishes a triple-quoted string, which may span lines.
fn lex_triple_quoted(lex: &mut logos::Lexer<Raw>) -> bool {
    let quote = lex.slice().as_bytes()[lex.slice().len() - 1];
    let closing = [quote; 3];
    let rest = lex.remainder().as_bytes();
    let mut i = 0;
    while i < rest.len() {
        if rest[i] == b'\\' {
            i += 2;
            continue;
        }
        if rest[i..].starts_with(&closing) {
            lex.bump(i + 3);
            return true;
        }
        i += 1;
    }
    false
}

// ============================================================================
// LINE TABLE
// ============================================================================

/// Physical line bookkeeping for position and line-text lookups.
#[derive(Debug, Clone)]
pub struct LineTable {
    starts: Vec<usize>,
    lines: Vec<String>,
}

impl LineTable {
    pub fn new(source: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(
            source
                .bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        let lines = source.split_inclusive('\n').map(String::from).collect();
        Self { starts, lines }
    }

    /// Position of a byte offset.
    pub fn position(&self, offset: usize) -> Position {
        let index = self.starts.partition_point(|&s| s <= offset).saturating_sub(1);
        Position::new(index + 1, offset - self.starts[index])
    }

    /// Position just past the last byte of `span`, on that byte's line.
    fn end_position(&self, span: Span) -> Position {
        if span.is_empty() {
            return self.position(span.start);
        }
        let last = self.position(span.end - 1);
        Position::new(last.line, last.column + 1)
    }

    /// Text of physical line `line` (1-based) with its terminator, if any.
    pub fn line(&self, line: usize) -> Option<&str> {
        line.checked_sub(1)
            .and_then(|i| self.lines.get(i))
            .map(String::as_str)
    }

    /// Concatenated text of lines `first..=last`.
    pub fn lines_between(&self, first: usize, last: usize) -> String {
        (first..=last).filter_map(|l| self.line(l)).collect()
    }

    /// Number of physical lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

// ============================================================================
// PUBLIC API
// ============================================================================

/// Tokenizes `source`, naming it `name` in diagnostics.
pub fn tokenize(name: &str, source: &str) -> Result<Vec<Token>> {
    let src: SourceArc = Arc::new(NamedSource::new(name, source.to_string()));
    tokenize_with_source(source, &src)
}

/// Tokenizes `source` using an already-built diagnostic source handle.
pub fn tokenize_with_source(source: &str, src: &SourceArc) -> Result<Vec<Token>> {
    LogicalLexer::new(source, src).run()
}

// ============================================================================
// LOGICAL PASS
// ============================================================================

struct LogicalLexer<'a> {
    source: &'a str,
    src: &'a SourceArc,
    table: LineTable,
    tokens: Vec<Token>,
    indents: Vec<String>,
    brackets: Vec<(u8, Span)>,
    at_line_start: bool,
    line_indent: String,
}

impl<'a> LogicalLexer<'a> {
    fn new(source: &'a str, src: &'a SourceArc) -> Self {
        Self {
            source,
            src,
            table: LineTable::new(source),
            tokens: Vec::new(),
            indents: vec![String::new()],
            brackets: Vec::new(),
            at_line_start: true,
            line_indent: String::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Token>> {
        let mut raw = Raw::lexer(self.source);
        while let Some(result) = raw.next() {
            let range = raw.span();
            let span = Span {
                start: range.start,
                end: range.end,
            };
            match result {
                Ok(kind) => self.accept(kind, span)?,
                Err(()) => return Err(self.raw_error(raw.slice(), span)),
            }
        }
        self.finish()
    }

    fn accept(&mut self, raw: Raw, span: Span) -> Result<()> {
        let source = self.source;
        let text = &source[span.start..span.end];
        match raw {
            Raw::Whitespace => {
                if self.at_line_start && self.brackets.is_empty() {
                    self.line_indent = text.to_string();
                }
            }
            Raw::Continuation => {}
            Raw::Comment => self.push(TokenKind::Comment, span),
            Raw::LineBreak => {
                let kind = if self.brackets.is_empty() && !self.at_line_start {
                    TokenKind::Newline
                } else {
                    TokenKind::Nl
                };
                self.push(kind, span);
                if self.brackets.is_empty() {
                    self.at_line_start = true;
                    self.line_indent.clear();
                }
            }
            Raw::Name | Raw::Number | Raw::String | Raw::Op => {
                if self.at_line_start && self.brackets.is_empty() {
                    self.indentation(span)?;
                }
                self.at_line_start = false;
                let kind = match raw {
                    Raw::Name => TokenKind::Name,
                    Raw::Number => TokenKind::Number,
                    Raw::String => TokenKind::String,
                    _ => {
                        self.track_bracket(text, span)?;
                        TokenKind::Op
                    }
                };
                self.push(kind, span);
            }
        }
        Ok(())
    }

    /// Emits the `Indent`/`Dedent` tokens for a logical line whose first
    /// significant token starts at `first`.
    fn indentation(&mut self, first: Span) -> Result<()> {
        let indent = std::mem::take(&mut self.line_indent);
        let current = self.indents.last().cloned().unwrap_or_default();
        if indent == current {
            return Ok(());
        }

        let line_start = first.start - indent.len();
        if indent.len() > current.len() && indent.starts_with(&current) {
            let span = Span {
                start: line_start + current.len(),
                end: first.start,
            };
            let pushed = indent[current.len()..].to_string();
            self.push_text(TokenKind::Indent, pushed, span);
            self.indents.push(indent);
            return Ok(());
        }

        let at = Span {
            start: first.start,
            end: first.start,
        };
        while self.indents.len() > 1 && self.indents.last().map_or(0, String::len) > indent.len() {
            let popped = self.indents.pop().unwrap_or_default();
            let parent_len = self.indents.last().map_or(0, String::len);
            self.push_text(TokenKind::Dedent, popped[parent_len..].to_string(), at);
        }

        if self.indents.last().map(String::as_str) != Some(indent.as_str()) {
            let line = self.table.position(first.start).line;
            return Err(MakroError::syntax(
                "unindent does not match any outer indentation level",
                indent,
                line,
                self.src,
                Span {
                    start: line_start,
                    end: first.start,
                },
            ));
        }
        Ok(())
    }

    fn track_bracket(&mut self, text: &str, span: Span) -> Result<()> {
        let open = match text {
            "(" | "[" | "{" => {
                self.brackets.push((text.as_bytes()[0], span));
                return Ok(());
            }
            ")" => b'(',
            "]" => b'[',
            "}" => b'{',
            _ => return Ok(()),
        };
        match self.brackets.pop() {
            Some((found, _)) if found == open => Ok(()),
            _ => {
                let line = self.table.position(span.start).line;
                Err(MakroError::syntax(
                    format!("unmatched '{text}'"),
                    text,
                    line,
                    self.src,
                    span,
                ))
            }
        }
    }

    fn finish(mut self) -> Result<Vec<Token>> {
        if let Some((open, span)) = self.brackets.last().copied() {
            let line = self.table.position(span.start).line;
            return Err(MakroError::syntax(
                format!("'{}' was never closed", open as char),
                (open as char).to_string(),
                line,
                self.src,
                span,
            ));
        }

        let eof = Span {
            start: self.source.len(),
            end: self.source.len(),
        };
        if !self.at_line_start {
            self.push(TokenKind::Newline, eof);
        }
        while self.indents.len() > 1 {
            let popped = self.indents.pop().unwrap_or_default();
            let parent_len = self.indents.last().map_or(0, String::len);
            self.push_text(TokenKind::Dedent, popped[parent_len..].to_string(), eof);
        }
        self.push(TokenKind::EndMarker, eof);
        Ok(self.tokens)
    }

    fn push(&mut self, kind: TokenKind, span: Span) {
        let text = self.source[span.start..span.end].to_string();
        self.push_text(kind, text, span);
    }

    fn push_text(&mut self, kind: TokenKind, text: String, span: Span) {
        let start = self.table.position(span.start);
        let end = self.table.end_position(span);
        let line = self.table.lines_between(start.line, end.line);
        self.tokens
            .push(Token::new(kind, text, start, end, span, line));
    }

    fn raw_error(&self, slice: &str, span: Span) -> MakroError {
        let line = self.table.position(span.start).line;
        let message = if slice.ends_with(|c| c == '"' || c == '\'') {
            "unterminated string literal"
        } else {
            "unexpected character"
        };
        MakroError::syntax(message, slice, line, self.src, span)
    }
}
