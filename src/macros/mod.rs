//! Macro plugins, packages, and resolution.
//!
//! - [`plugin`]: the parse / lint / translate contract macro authors implement.
//! - [`registry`]: compiled-in plugins keyed by built-in keyword or package.
//! - [`manifest`]: package `macros.json` loading and validation.
//! - [`resolver`]: turns import references into [`MacroDefinition`]s and
//!   bootstraps package helper files.
//! - [`hash_record`]: content hashes that let unchanged files skip expansion.
//! - [`import`]: the import directive grammar.
//! - [`codegen`]: helpers for translators emitting Python-style code.

pub mod codegen;
pub mod definition;
pub mod hash_record;
pub mod import;
pub mod manifest;
pub mod plugin;
pub mod registry;
pub mod resolver;
pub mod std;

pub use definition::{MacroDefinition, MacroOrigin};
pub use hash_record::{file_digest, HashRecord};
pub use import::ImportDirective;
pub use manifest::{MacroEntry, PackageManifest};
pub use plugin::{Macro, MacroAst, MacroPlugin};
pub use registry::{PluginKey, PluginRegistry};
pub use resolver::Resolver;
