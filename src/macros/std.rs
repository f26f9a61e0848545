//! Standard built-in macros.

use crate::errors::Result;
use crate::macros::plugin::Macro;
use crate::macros::registry::PluginRegistry;
use crate::syntax::TokenStream;

// ============================================================================
// REGISTRY
// ============================================================================

/// Registers all standard macros in the given registry.
///
/// Return values are ignored since the standard set never conflicts with
/// itself.
pub fn register_std_macros(registry: &mut PluginRegistry) {
    registry.register_builtin("hello", Hello);
}

// ============================================================================
// HELLO
// ============================================================================

/// `hello`: takes no arguments and prints a greeting.
#[derive(Debug, Clone, Copy, Default)]
pub struct Hello;

impl Macro for Hello {
    type Ast = ();

    fn parse(&self, _tokens: &mut TokenStream) -> Result<()> {
        Ok(())
    }

    fn translate(&self, _ast: &()) -> String {
        r#"print("Hello World")"#.to_string()
    }
}
