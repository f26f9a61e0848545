//! Token stream cursor shared by the expansion engine and every macro parser.
//!
//! Macro grammars are plain recursive descent written against four operations:
//! [`TokenStream::matches`], [`TokenStream::check`], [`TokenStream::consume`]
//! and [`TokenStream::advance`]. The engine hands each macro parser the same
//! stream it is iterating, so a parser may consume an arbitrary self-delimited
//! span (a whole indented block, say) and the host loop resumes right after it.

use std::sync::Arc;

use miette::NamedSource;

use crate::errors::{MakroError, Result, SourceArc};
use crate::syntax::lexer::{tokenize_with_source, LineTable};
use crate::syntax::token::{Token, TokenKind};

// ============================================================================
// TOKEN MATCHER
// ============================================================================

/// Predicate over a token's kind and text. Unset parts match anything.
///
/// ```
/// use makros::syntax::{TokenKind, TokenMatcher};
/// let import = TokenMatcher::new().kind(TokenKind::Name).text("import");
/// let any_name = TokenMatcher::new().kind(TokenKind::Name);
/// # let _ = (import, any_name);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenMatcher {
    kind: Option<TokenKind>,
    text: Option<String>,
}

impl TokenMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires the token kind.
    pub fn kind(mut self, kind: TokenKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Requires the literal token text.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Shorthand for a `Name` with the given text.
    pub fn name(text: impl Into<String>) -> Self {
        Self::new().kind(TokenKind::Name).text(text)
    }

    /// Shorthand for an `Op` with the given text.
    pub fn op(text: impl Into<String>) -> Self {
        Self::new().kind(TokenKind::Op).text(text)
    }

    pub fn matches(&self, token: &Token) -> bool {
        if self.kind.is_some_and(|kind| kind != token.kind) {
            return false;
        }
        if self.text.as_deref().is_some_and(|text| text != token.text) {
            return false;
        }
        true
    }
}

// ============================================================================
// TOKEN STREAM
// ============================================================================

/// Cursor over one file's significant tokens.
///
/// Comments and non-logical line breaks are filtered out on construction.
/// The last token is always the `EndMarker` sentinel and the cursor only ever
/// moves forward.
#[derive(Debug)]
pub struct TokenStream {
    tokens: Vec<Token>,
    current: usize,
    source: SourceArc,
    table: LineTable,
}

impl TokenStream {
    /// Wraps an already-lexed token sequence.
    ///
    /// A missing sentinel is appended so the end-of-stream invariant always
    /// holds, even for hand-built token lists.
    pub fn new(tokens: Vec<Token>, source: SourceArc) -> Self {
        let mut tokens: Vec<Token> = tokens.into_iter().filter(|t| !t.kind.is_trivia()).collect();
        if !tokens.last().is_some_and(|t| t.is(TokenKind::EndMarker)) {
            let (start, span) = tokens
                .last()
                .map(|t| (t.end, t.span))
                .unwrap_or_default();
            let end_span = crate::syntax::token::Span {
                start: span.end,
                end: span.end,
            };
            tokens.push(Token::new(TokenKind::EndMarker, "", start, start, end_span, ""));
        }
        let table = LineTable::new(source.inner());
        Self {
            tokens,
            current: 0,
            source,
            table,
        }
    }

    /// Lexes `text` and wraps the result. `name` labels diagnostics.
    pub fn from_source(name: &str, text: &str) -> Result<Self> {
        let source: SourceArc = Arc::new(NamedSource::new(name, text.to_string()));
        let tokens = tokenize_with_source(text, &source)?;
        Ok(Self::new(tokens, source))
    }

    /// The token under the cursor.
    pub fn peek(&self) -> &Token {
        let index = self.current.min(self.tokens.len() - 1);
        &self.tokens[index]
    }

    /// The token just behind the cursor (the first token if nothing has been
    /// consumed yet).
    pub fn previous(&self) -> &Token {
        let index = self.current.saturating_sub(1).min(self.tokens.len() - 1);
        &self.tokens[index]
    }

    /// Returns the token under the cursor and steps past it. At the sentinel
    /// the cursor stays put.
    pub fn advance(&mut self) -> Token {
        if !self.is_at_end() {
            self.current += 1;
            return self.previous().clone();
        }
        self.peek().clone()
    }

    pub fn is_at_end(&self) -> bool {
        self.peek().is(TokenKind::EndMarker)
    }

    /// True if the cursor token satisfies `matcher`. Never true at the end.
    pub fn check(&self, matcher: &TokenMatcher) -> bool {
        !self.is_at_end() && matcher.matches(self.peek())
    }

    /// Tries each matcher in order; on the first hit advances and returns
    /// true. Leaves the cursor alone when nothing matches.
    pub fn matches(&mut self, matchers: &[TokenMatcher]) -> bool {
        if matchers.iter().any(|m| self.check(m)) {
            self.advance();
            return true;
        }
        false
    }

    /// Advances past a token satisfying `matcher`, or fails with a syntax
    /// error pointing at the current token.
    pub fn consume(&mut self, matcher: &TokenMatcher, context: &str) -> Result<Token> {
        if self.check(matcher) {
            return Ok(self.advance());
        }
        Err(self.error_at_current(context))
    }

    /// Builds a positional syntax error at the cursor token. Macro parsers use
    /// this for failures `consume` can't express.
    pub fn error_at_current(&self, context: &str) -> MakroError {
        let token = self.peek();
        MakroError::syntax(
            format!("{context}, found '{}'", token.text),
            token.text.clone(),
            token.start.line,
            &self.source,
            token.span,
        )
    }

    /// Cursor index into the filtered token list.
    pub fn cursor(&self) -> usize {
        self.current
    }

    /// Number of tokens, sentinel included.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    /// Tokens in `start..end` (cursor indices), clamped to the stream.
    pub fn tokens_between(&self, start: usize, end: usize) -> &[Token] {
        let end = end.min(self.tokens.len());
        &self.tokens[start.min(end)..end]
    }

    /// Diagnostic source handle for this stream.
    pub fn source(&self) -> &SourceArc {
        &self.source
    }

    /// Physical line lookups over the stream's source text.
    pub fn lines(&self) -> &LineTable {
        &self.table
    }
}

impl Iterator for TokenStream {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.is_at_end() {
            return None;
        }
        Some(self.advance())
    }
}
