//! The import directive: `macro import <module> [. <submodule>]`.
//!
//! The engine handles this directive itself rather than through the plugin
//! registry, because it mutates the pass's list of available macros.

use crate::errors::Result;
use crate::syntax::{Token, TokenKind, TokenMatcher, TokenStream};

/// Separator between package and keyword in a reference string.
pub const REFERENCE_SEPARATOR: char = '.';

/// Parsed import directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDirective {
    pub module: Token,
    pub submodule: Option<Token>,
}

impl ImportDirective {
    /// Parses the directive body. The cursor must sit just past the reserved
    /// keyword.
    pub fn parse(tokens: &mut TokenStream) -> Result<Self> {
        tokens.consume(&TokenMatcher::name("import"), "Expected the keyword 'import'")?;

        let name = TokenMatcher::new().kind(TokenKind::Name);
        let module = tokens.consume(&name, "Expected the name of your module")?;

        let mut submodule = None;
        if tokens.matches(&[TokenMatcher::op(REFERENCE_SEPARATOR.to_string())]) {
            submodule = Some(tokens.consume(&name, "Expected the name of the macro file")?);
        }

        Ok(Self { module, submodule })
    }

    /// `module` or `module.submodule`.
    pub fn reference(&self) -> String {
        match &self.submodule {
            Some(sub) => format!("{}{REFERENCE_SEPARATOR}{}", self.module.text, sub.text),
            None => self.module.text.clone(),
        }
    }

    /// Comment left in the output in place of the directive.
    pub fn comment(&self) -> String {
        format!("# Macro imported: {}\n", self.reference())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::MakroError;

    fn parse(text: &str) -> Result<ImportDirective> {
        let mut tokens = TokenStream::from_source("t.mpy", text).unwrap();
        tokens.advance();
        ImportDirective::parse(&mut tokens)
    }

    #[test]
    fn builtin_reference() {
        let directive = parse("macro import enum\n").unwrap();
        assert_eq!(directive.reference(), "enum");
        assert_eq!(directive.comment(), "# Macro imported: enum\n");
    }

    #[test]
    fn package_reference() {
        let directive = parse("macro import shapes.circle\n").unwrap();
        assert_eq!(directive.reference(), "shapes.circle");
    }

    #[test]
    fn missing_import_keyword() {
        let err = parse("macro enum\n").unwrap_err();
        match err {
            MakroError::TokenSyntax { message, .. } => {
                assert_eq!(message, "Expected the keyword 'import', found 'enum'")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn dangling_separator() {
        let err = parse("macro import shapes.\n").unwrap_err();
        assert!(err.to_string().contains("Expected the name of the macro file"));
    }
}
