//! Makros: a source-to-source macro expander.
//!
//! Source files written in a Python-style host language may import macros
//! with `macro import <name>` or `macro import <package>.<name>` and then
//! use the imported trigger keywords. Expansion produces plain host-language
//! text: macro-free lines are copied through verbatim and each macro
//! invocation is replaced by its translation at the invocation's
//! indentation.
//!
//! ```
//! use makros::{Expander, MakrosConfig, PluginRegistry, Resolver};
//!
//! let mut resolver = Resolver::new(MakrosConfig::default(), PluginRegistry::with_std());
//! let output = Expander::new(&mut resolver)
//!     .expand_str("demo.mpy", "macro import hello\nhello\n")
//!     .unwrap();
//! assert!(output.contains("print(\"Hello World\")"));
//! ```

pub use crate::errors::{MakroError, ManifestError, Result};

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod macros;
pub mod syntax;

pub use crate::config::MakrosConfig;
pub use crate::engine::{Expander, Interrupt};
pub use crate::macros::{Macro, MacroDefinition, PluginKey, PluginRegistry, Resolver};
pub use crate::syntax::{Token, TokenKind, TokenMatcher, TokenStream};
