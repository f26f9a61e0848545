//! Compiled-in registry of macro implementations.
//!
//! Macro implementations are Rust values, so "loading" a macro means looking
//! its plugin up here by a stable key. The resolver still verifies that the
//! implementation file named by a built-in location or a package manifest
//! exists on disk; the registry supplies the code behind it.
//!
//! # Keys
//! - [`PluginKey::Builtin`]: a bare keyword, e.g. `hello`.
//! - [`PluginKey::Package`]: a package and keyword, e.g. `shapes.circle`.
//!
//! # Summary Table
//! | Method                      | Overwrites | Error on Duplicate |
//! |-----------------------------|------------|--------------------|
//! | register_builtin            | Yes        | No                 |
//! | register_builtin_or_error   | No         | Yes                |
//! | register_package            | Yes        | No                 |
//! | register_package_or_error   | No         | Yes                |
//! | lookup/contains             | N/A        | N/A                |
//!
//! # Thread Safety
//! Plugins are `Send + Sync` and shared through `Arc`, but the registry itself
//! is plain owned data. Wrap it in a lock to mutate it from several threads.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::errors::{MakroError, Result};
use crate::macros::import::REFERENCE_SEPARATOR;
use crate::macros::plugin::MacroPlugin;

/// Stable key a plugin is registered under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PluginKey {
    Builtin(String),
    Package { package: String, keyword: String },
}

impl PluginKey {
    pub fn builtin(keyword: impl Into<String>) -> Self {
        PluginKey::Builtin(keyword.into())
    }

    pub fn package(package: impl Into<String>, keyword: impl Into<String>) -> Self {
        PluginKey::Package {
            package: package.into(),
            keyword: keyword.into(),
        }
    }

    /// The trigger keyword this key registers.
    pub fn keyword(&self) -> &str {
        match self {
            PluginKey::Builtin(keyword) => keyword,
            PluginKey::Package { keyword, .. } => keyword,
        }
    }
}

impl fmt::Display for PluginKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginKey::Builtin(keyword) => f.write_str(keyword),
            PluginKey::Package { package, keyword } => {
                write!(f, "{package}{REFERENCE_SEPARATOR}{keyword}")
            }
        }
    }
}

/// Registry of macro plugins keyed by [`PluginKey`].
///
/// # Example
/// ```rust
/// use makros::macros::{PluginKey, PluginRegistry};
/// let registry = PluginRegistry::with_std();
/// assert!(registry.contains(&PluginKey::builtin("hello")));
/// ```
#[derive(Clone, Default)]
pub struct PluginRegistry {
    plugins: HashMap<PluginKey, Arc<dyn MacroPlugin>>,
}

impl PluginRegistry {
    /// Creates an empty registry.
    ///
    /// ```rust
    /// use makros::macros::PluginRegistry;
    /// assert!(PluginRegistry::new().is_empty());
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the standard built-in macros.
    pub fn with_std() -> Self {
        let mut registry = Self::new();
        crate::macros::std::register_std_macros(&mut registry);
        registry
    }

    /// Registers a built-in macro under a bare keyword.
    ///
    /// Returns the plugin previously registered under that keyword, if any.
    pub fn register_builtin<P>(&mut self, keyword: &str, plugin: P) -> Option<Arc<dyn MacroPlugin>>
    where
        P: MacroPlugin + 'static,
    {
        self.insert(PluginKey::builtin(keyword), Arc::new(plugin))
    }

    /// Registers a built-in macro, refusing to replace an existing one.
    pub fn register_builtin_or_error<P>(&mut self, keyword: &str, plugin: P) -> Result<()>
    where
        P: MacroPlugin + 'static,
    {
        self.insert_or_error(PluginKey::builtin(keyword), Arc::new(plugin))
    }

    /// Registers the implementation of `keyword` in `package`.
    ///
    /// Returns the plugin previously registered under that key, if any.
    pub fn register_package<P>(
        &mut self,
        package: &str,
        keyword: &str,
        plugin: P,
    ) -> Option<Arc<dyn MacroPlugin>>
    where
        P: MacroPlugin + 'static,
    {
        self.insert(PluginKey::package(package, keyword), Arc::new(plugin))
    }

    /// Registers a package macro, refusing to replace an existing one.
    pub fn register_package_or_error<P>(&mut self, package: &str, keyword: &str, plugin: P) -> Result<()>
    where
        P: MacroPlugin + 'static,
    {
        self.insert_or_error(PluginKey::package(package, keyword), Arc::new(plugin))
    }

    /// Registers an already shared plugin under `key`.
    pub fn insert(&mut self, key: PluginKey, plugin: Arc<dyn MacroPlugin>) -> Option<Arc<dyn MacroPlugin>> {
        self.plugins.insert(key, plugin)
    }

    fn insert_or_error(&mut self, key: PluginKey, plugin: Arc<dyn MacroPlugin>) -> Result<()> {
        if self.plugins.contains_key(&key) {
            return Err(MakroError::internal(format!(
                "Macro '{key}' is already registered"
            )));
        }
        self.plugins.insert(key, plugin);
        Ok(())
    }

    /// Removes a plugin, returning it if it was registered.
    pub fn unregister(&mut self, key: &PluginKey) -> Option<Arc<dyn MacroPlugin>> {
        self.plugins.remove(key)
    }

    pub fn lookup(&self, key: &PluginKey) -> Option<Arc<dyn MacroPlugin>> {
        self.plugins.get(key).cloned()
    }

    pub fn contains(&self, key: &PluginKey) -> bool {
        self.plugins.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Registered keys in sorted order.
    pub fn keys(&self) -> Vec<PluginKey> {
        let mut keys: Vec<_> = self.plugins.keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("keys", &self.keys())
            .finish()
    }
}
