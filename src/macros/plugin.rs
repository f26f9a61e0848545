//! The contract every macro implementation satisfies.
//!
//! A macro is three steps run in order on one invocation:
//!
//! - **parse**: consume the tokens after the trigger keyword from the shared
//!   [`TokenStream`] and build an AST. The host resumes exactly where the
//!   parser leaves the cursor, so the grammar must be self-delimiting.
//! - **lint** (optional): validate the AST. Failures abort the pass.
//! - **translate**: turn the AST into host-language text. Translation never
//!   touches the token stream.
//!
//! Authors implement the typed [`Macro`] trait. The engine only sees the
//! object-safe [`MacroPlugin`] view, where the AST is an opaque [`MacroAst`];
//! a blanket impl bridges the two.

use std::any::{type_name, Any};
use std::fmt;

use crate::errors::{MakroError, Result};
use crate::syntax::TokenStream;

/// Typed macro implementation.
///
/// ```
/// use makros::macros::Macro;
/// use makros::syntax::{TokenKind, TokenMatcher, TokenStream};
///
/// struct Twice;
///
/// impl Macro for Twice {
///     type Ast = String;
///
///     fn parse(&self, tokens: &mut TokenStream) -> makros::Result<String> {
///         let name = tokens.consume(
///             &TokenMatcher::new().kind(TokenKind::Name),
///             "Expected a function name",
///         )?;
///         Ok(name.text)
///     }
///
///     fn translate(&self, ast: &String) -> String {
///         format!("{ast}()\n{ast}()")
///     }
/// }
/// ```
pub trait Macro: Send + Sync + 'static {
    type Ast: Any + Send;

    fn parse(&self, tokens: &mut TokenStream) -> Result<Self::Ast>;

    fn lint(&self, _ast: &Self::Ast) -> Result<()> {
        Ok(())
    }

    fn translate(&self, ast: &Self::Ast) -> String;
}

/// Type-erased AST handed from parse to lint to translate.
pub struct MacroAst {
    kind: &'static str,
    payload: Box<dyn Any + Send>,
}

impl MacroAst {
    pub fn new<T: Any + Send>(payload: T) -> Self {
        Self {
            kind: type_name::<T>(),
            payload: Box::new(payload),
        }
    }

    /// Name of the payload type.
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }

    fn expect<T: Any>(&self) -> Result<&T> {
        self.downcast_ref::<T>().ok_or_else(|| {
            MakroError::internal(format!(
                "macro AST of kind {} where {} was expected",
                self.kind,
                type_name::<T>()
            ))
        })
    }
}

impl fmt::Debug for MacroAst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MacroAst").field("kind", &self.kind).finish()
    }
}

/// Object-safe view of a macro used by the engine and the registry.
pub trait MacroPlugin: Send + Sync {
    fn parse(&self, tokens: &mut TokenStream) -> Result<MacroAst>;

    fn lint(&self, ast: &MacroAst) -> Result<()>;

    fn translate(&self, ast: &MacroAst) -> Result<String>;
}

impl<M: Macro> MacroPlugin for M {
    fn parse(&self, tokens: &mut TokenStream) -> Result<MacroAst> {
        Macro::parse(self, tokens).map(MacroAst::new)
    }

    fn lint(&self, ast: &MacroAst) -> Result<()> {
        Macro::lint(self, ast.expect::<M::Ast>()?)
    }

    fn translate(&self, ast: &MacroAst) -> Result<String> {
        Ok(Macro::translate(self, ast.expect::<M::Ast>()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{TokenKind, TokenMatcher};

    struct Call;

    impl Macro for Call {
        type Ast = String;

        fn parse(&self, tokens: &mut TokenStream) -> Result<String> {
            let name = tokens.consume(
                &TokenMatcher::new().kind(TokenKind::Name),
                "Expected a name",
            )?;
            Ok(name.text)
        }

        fn lint(&self, ast: &String) -> Result<()> {
            if ast == "forbidden" {
                return Err(MakroError::lint("call", "forbidden name"));
            }
            Ok(())
        }

        fn translate(&self, ast: &String) -> String {
            format!("{ast}()")
        }
    }

    #[test]
    fn erased_plugin_runs_all_three_steps() {
        let plugin: &dyn MacroPlugin = &Call;
        let mut tokens = TokenStream::from_source("t.py", "greet\n").unwrap();
        let ast = plugin.parse(&mut tokens).unwrap();
        assert!(ast.kind().contains("String"));
        plugin.lint(&ast).unwrap();
        assert_eq!(plugin.translate(&ast).unwrap(), "greet()");
        assert!(tokens.peek().is(TokenKind::Newline));
    }

    #[test]
    fn lint_failures_propagate() {
        let plugin: &dyn MacroPlugin = &Call;
        let mut tokens = TokenStream::from_source("t.py", "forbidden\n").unwrap();
        let ast = plugin.parse(&mut tokens).unwrap();
        assert!(matches!(plugin.lint(&ast), Err(MakroError::Lint { .. })));
    }

    #[test]
    fn foreign_ast_is_an_internal_error() {
        let plugin: &dyn MacroPlugin = &Call;
        let ast = MacroAst::new(42_u32);
        assert!(matches!(
            plugin.translate(&ast),
            Err(MakroError::Internal { .. })
        ));
    }
}
