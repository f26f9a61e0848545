//! Makros error handling.
//!
//! Every failure mode of the engine is a variant of [`MakroError`]. Errors are
//! `miette` diagnostics so the command line can render them with the offending
//! source line and a caret under the span, while library callers can still
//! match on the variant.
//!
//! Failures are never recovered from inside a pass: the first error aborts the
//! whole expansion and nothing is written to disk.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use crate::syntax::token::Span;

/// Shared source handle used by diagnostics.
pub type SourceArc = Arc<NamedSource<String>>;

/// Crate-wide result alias.
pub type Result<T, E = MakroError> = std::result::Result<T, E>;

// ============================================================================
// MAKRO ERROR
// ============================================================================

/// Unified error type for lexing, parsing, resolution, and expansion.
#[derive(Debug, Error, Diagnostic)]
pub enum MakroError {
    /// A `consume` call (or the lexer) found something other than what the
    /// grammar requires.
    #[error("Syntax error at line {line}: {message}")]
    #[diagnostic(code(makros::syntax))]
    TokenSyntax {
        message: String,
        found: String,
        line: usize,
        #[source_code]
        src: SourceArc,
        #[label("error found here")]
        span: SourceSpan,
    },

    /// A reference could not be mapped to a loadable macro.
    #[error("Could not resolve {reference}: {reason}")]
    #[diagnostic(
        code(makros::resolution),
        help("built-in macros are bare keywords; package macros are written `package.keyword`")
    )]
    Resolution { reference: String, reason: String },

    /// A package manifest failed validation.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Manifest(#[from] ManifestError),

    /// A macro's lint hook rejected the parsed invocation.
    #[error("Lint failure in macro '{keyword}': {message}")]
    #[diagnostic(code(makros::lint))]
    Lint { keyword: String, message: String },

    #[error("I/O error on {}: {source}", path.display())]
    #[diagnostic(code(makros::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Internal error: {message}")]
    #[diagnostic(code(makros::internal))]
    Internal { message: String },

    /// The user interrupted the run. Reported silently at the process boundary.
    #[error("Interrupted")]
    #[diagnostic(code(makros::interrupted))]
    Interrupted,
}

impl MakroError {
    /// Builds a syntax error pointing at `span` inside `src`.
    pub fn syntax(
        message: impl Into<String>,
        found: impl Into<String>,
        line: usize,
        src: &SourceArc,
        span: Span,
    ) -> Self {
        MakroError::TokenSyntax {
            message: message.into(),
            found: found.into(),
            line,
            src: Arc::clone(src),
            span: span.into(),
        }
    }

    pub fn resolution(reference: impl Into<String>, reason: impl Into<String>) -> Self {
        MakroError::Resolution {
            reference: reference.into(),
            reason: reason.into(),
        }
    }

    /// Helper for macro authors reporting lint failures.
    pub fn lint(keyword: impl Into<String>, message: impl Into<String>) -> Self {
        MakroError::Lint {
            keyword: keyword.into(),
            message: message.into(),
        }
    }

    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        MakroError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        MakroError::Internal {
            message: message.into(),
        }
    }

    /// True for a user interruption, which the CLI reports without a diagnostic.
    pub fn is_interrupt(&self) -> bool {
        matches!(self, MakroError::Interrupted)
    }
}

// ============================================================================
// MANIFEST ERRORS
// ============================================================================

/// Validation failures for a package's `macros.json`.
///
/// One variant per required field so callers (and tests) can tell exactly
/// which field is missing without parsing messages.
#[derive(Debug, Error, Diagnostic)]
pub enum ManifestError {
    #[error("Package manifest {} could not be read: {source}", path.display())]
    #[diagnostic(code(makros::manifest))]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Package manifest {} is not valid JSON: {source}", path.display())]
    #[diagnostic(code(makros::manifest))]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Package manifest {} is missing a name", path.display())]
    #[diagnostic(code(makros::manifest))]
    MissingName { path: PathBuf },

    #[error("Package manifest {} is missing a package name", path.display())]
    #[diagnostic(code(makros::manifest))]
    MissingPackageName { path: PathBuf },

    #[error("Package manifest {} has an invalid package name '{package}'", path.display())]
    #[diagnostic(code(makros::manifest))]
    InvalidPackageName { path: PathBuf, package: String },

    #[error("Package manifest {} is missing a description", path.display())]
    #[diagnostic(code(makros::manifest))]
    MissingDescription { path: PathBuf },

    #[error("Package manifest {} is missing macros", path.display())]
    #[diagnostic(code(makros::manifest))]
    MissingMacros { path: PathBuf },

    #[error("Macro #{index} in package manifest {} is missing a name", path.display())]
    #[diagnostic(code(makros::manifest))]
    MacroMissingName { path: PathBuf, index: usize },

    #[error("Macro #{index} in package manifest {} is missing a keyword", path.display())]
    #[diagnostic(code(makros::manifest))]
    MacroMissingKeyword { path: PathBuf, index: usize },

    #[error("Macro #{index} in package manifest {} is missing a description", path.display())]
    #[diagnostic(code(makros::manifest))]
    MacroMissingDescription { path: PathBuf, index: usize },

    #[error("Macro #{index} in package manifest {} is missing an implementation file", path.display())]
    #[diagnostic(code(makros::manifest))]
    MacroMissingFile { path: PathBuf, index: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_error_carries_label_span() {
        let src: SourceArc = Arc::new(NamedSource::new("t.mpy", "foo bar\n".to_string()));
        let err = MakroError::syntax("Expected x", "bar", 1, &src, Span { start: 4, end: 7 });
        match err {
            MakroError::TokenSyntax { span, line, .. } => {
                assert_eq!(span.offset(), 4);
                assert_eq!(span.len(), 3);
                assert_eq!(line, 1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn resolution_message_names_reference() {
        let err = MakroError::resolution("unknownpkg.foo", "no package directory");
        assert!(err.to_string().contains("unknownpkg.foo"));
        assert!(!err.is_interrupt());
        assert!(MakroError::Interrupted.is_interrupt());
    }

    #[test]
    fn manifest_errors_convert() {
        let err: MakroError = ManifestError::MissingName {
            path: PathBuf::from("pkg/macros.json"),
        }
        .into();
        assert!(matches!(err, MakroError::Manifest(ManifestError::MissingName { .. })));
        assert!(err.to_string().contains("missing a name"));
    }
}
