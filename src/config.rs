//! Runtime configuration.
//!
//! Settings are layered: built-in defaults, then an optional JSON file, then
//! `MAKROS_*` environment variables, then command-line flags (applied by the
//! binary).

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{MakroError, Result};
use crate::macros::manifest::MANIFEST_FILE;

pub const ENV_PACKAGES_ROOT: &str = "MAKROS_PACKAGES_ROOT";
pub const ENV_BUILTIN_DIR: &str = "MAKROS_BUILTIN_DIR";
pub const ENV_HASH_RECORD: &str = "MAKROS_HASH_RECORD";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MakrosConfig {
    /// Reserved keyword introducing an import directive.
    pub import_keyword: String,
    /// Extension of macro-source files, without the dot.
    pub source_extension: String,
    /// Extension of expanded host-language files, without the dot.
    pub output_extension: String,
    /// Manifest file name inside a package directory.
    pub manifest_file: String,
    /// Directory holding built-in macro implementation files. When unset the
    /// compiled-in registry is the only built-in location.
    pub builtin_dir: Option<PathBuf>,
    /// Root of installed packages, searched after the local tree.
    pub packages_root: Option<PathBuf>,
    /// Where content hashes are persisted. Unset keeps them in memory.
    pub hash_record: Option<PathBuf>,
}

impl Default for MakrosConfig {
    fn default() -> Self {
        Self {
            import_keyword: "macro".to_string(),
            source_extension: "mpy".to_string(),
            output_extension: "py".to_string(),
            manifest_file: MANIFEST_FILE.to_string(),
            builtin_dir: None,
            packages_root: None,
            hash_record: None,
        }
    }
}

impl MakrosConfig {
    /// Loads a JSON config file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| MakroError::io(path, e))?;
        let config = serde_json::from_str(&text).map_err(|e| {
            MakroError::internal(format!("invalid config file {}: {e}", path.display()))
        })?;
        debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    /// Applies `MAKROS_*` overrides from the process environment.
    pub fn apply_env(self) -> Self {
        self.apply_vars(|name| std::env::var_os(name))
    }

    /// Applies overrides from an arbitrary variable lookup. Empty values are
    /// ignored.
    pub fn apply_vars(mut self, lookup: impl Fn(&str) -> Option<OsString>) -> Self {
        let var = |name: &str| lookup(name).filter(|v| !v.is_empty()).map(PathBuf::from);
        if let Some(root) = var(ENV_PACKAGES_ROOT) {
            self.packages_root = Some(root);
        }
        if let Some(dir) = var(ENV_BUILTIN_DIR) {
            self.builtin_dir = Some(dir);
        }
        if let Some(record) = var(ENV_HASH_RECORD) {
            self.hash_record = Some(record);
        }
        self
    }

    /// True if `path` carries the macro-source extension.
    pub fn is_macro_source(&self, path: &Path) -> bool {
        path.extension()
            .is_some_and(|ext| ext.to_string_lossy() == self.source_extension)
    }

    /// Sibling path with the output extension, e.g. `a.mpy` to `a.py`.
    pub fn output_path(&self, source: &Path) -> PathBuf {
        source.with_extension(&self.output_extension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = MakrosConfig::default();
        assert_eq!(config.import_keyword, "macro");
        assert_eq!(config.manifest_file, "macros.json");
        assert!(config.hash_record.is_none());
    }

    #[test]
    fn file_keeps_defaults_for_missing_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("makros.json");
        fs::write(&path, r#"{"import_keyword": "use", "packages_root": "/opt/pkgs"}"#).unwrap();
        let config = MakrosConfig::load(&path).unwrap();
        assert_eq!(config.import_keyword, "use");
        assert_eq!(config.packages_root, Some(PathBuf::from("/opt/pkgs")));
        assert_eq!(config.source_extension, "mpy");
    }

    #[test]
    fn env_overrides() {
        let config = MakrosConfig::default().apply_vars(|name| match name {
            ENV_BUILTIN_DIR => Some("builtins".into()),
            ENV_HASH_RECORD => Some("".into()),
            _ => None,
        });
        assert_eq!(config.builtin_dir, Some(PathBuf::from("builtins")));
        assert!(config.hash_record.is_none());
        assert!(config.packages_root.is_none());
    }

    #[test]
    fn source_and_output_paths() {
        let config = MakrosConfig::default();
        assert!(config.is_macro_source(Path::new("a/b.mpy")));
        assert!(!config.is_macro_source(Path::new("a/b.py")));
        assert_eq!(config.output_path(Path::new("a/b.mpy")), PathBuf::from("a/b.py"));
    }
}
