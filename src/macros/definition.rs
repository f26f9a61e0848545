//! Resolved macros.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::macros::plugin::MacroPlugin;

/// Where a resolved macro came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MacroOrigin {
    /// A built-in macro. `file` is the on-disk implementation file when a
    /// built-in directory is configured.
    Builtin { file: Option<PathBuf> },
    /// A package macro declared in `manifest`, implemented by `file`.
    Package {
        dir: PathBuf,
        manifest_name: String,
        file: PathBuf,
    },
}

/// A loaded macro ready to be triggered in an expansion pass.
///
/// Cloning is cheap: the implementation is shared.
#[derive(Clone)]
pub struct MacroDefinition {
    /// The reference it was resolved from (`hello`, `shapes.circle`).
    pub reference: String,
    /// Trigger keyword.
    pub keyword: String,
    pub origin: MacroOrigin,
    pub plugin: Arc<dyn MacroPlugin>,
}

impl MacroDefinition {
    pub fn new(
        reference: impl Into<String>,
        keyword: impl Into<String>,
        origin: MacroOrigin,
        plugin: Arc<dyn MacroPlugin>,
    ) -> Self {
        Self {
            reference: reference.into(),
            keyword: keyword.into(),
            origin,
            plugin,
        }
    }

    /// True if both definitions share one implementation.
    pub fn same_plugin(&self, other: &MacroDefinition) -> bool {
        Arc::ptr_eq(&self.plugin, &other.plugin)
    }
}

impl fmt::Debug for MacroDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MacroDefinition")
            .field("reference", &self.reference)
            .field("keyword", &self.keyword)
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}
