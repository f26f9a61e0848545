//! Token types produced by the host-language lexer.
//!
//! The categories mirror a Python-style tokenizer: logical newlines are
//! distinguished from non-logical line breaks, and block structure is carried
//! by explicit `Indent`/`Dedent` tokens rather than whitespace.

use std::fmt;

use miette::SourceSpan;

/// Byte range into the whole source text.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Span> for SourceSpan {
    fn from(span: Span) -> Self {
        (span.start, span.len()).into()
    }
}

/// A (line, column) pair. Lines are 1-based, columns are byte offsets from
/// the start of the line.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Lexical category of a token.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Identifier or keyword: `def`, `foo`, `macro`
    Name,
    /// Numeric literal: `42`, `0x1f`, `3.5e2`
    Number,
    /// String literal including prefix and quotes: `f"x"`, `'''doc'''`
    String,
    /// Operator or delimiter: `+`, `**=`, `(`, `:`
    Op,
    /// `# ...` up to the end of the line
    Comment,
    /// End of a logical line
    Newline,
    /// Line break that does not end a statement (blank line, inside brackets)
    Nl,
    /// Increase of the block indentation
    Indent,
    /// Decrease of the block indentation
    Dedent,
    /// End-of-stream sentinel
    EndMarker,
}

impl TokenKind {
    /// Kinds that carry no meaning for macro grammars and are dropped by the
    /// token stream.
    pub fn is_trivia(self) -> bool {
        matches!(self, TokenKind::Comment | TokenKind::Nl)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::Name => "NAME",
            TokenKind::Number => "NUMBER",
            TokenKind::String => "STRING",
            TokenKind::Op => "OP",
            TokenKind::Comment => "COMMENT",
            TokenKind::Newline => "NEWLINE",
            TokenKind::Nl => "NL",
            TokenKind::Indent => "INDENT",
            TokenKind::Dedent => "DEDENT",
            TokenKind::EndMarker => "ENDMARKER",
        };
        f.write_str(name)
    }
}

/// A single immutable token.
///
/// `line` holds the full text of every physical line the token touches,
/// terminators included, so a multi-line string carries all of its lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub start: Position,
    pub end: Position,
    pub span: Span,
    pub line: String,
}

impl Token {
    pub fn new(
        kind: TokenKind,
        text: impl Into<String>,
        start: Position,
        end: Position,
        span: Span,
        line: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            text: text.into(),
            start,
            end,
            span,
            line: line.into(),
        }
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    /// True for a `Name` token spelled exactly `text`.
    pub fn is_name(&self, text: &str) -> bool {
        self.kind == TokenKind::Name && self.text == text
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:?} at {}:{}",
            self.kind, self.text, self.start.line, self.start.column
        )
    }
}
