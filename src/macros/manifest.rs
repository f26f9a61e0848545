//! Package manifests (`macros.json`).
//!
//! A manifest declares the macros a package provides and the helper files to
//! bootstrap before any of them are used:
//!
//! ```json
//! {
//!   "name": "Shapes",
//!   "package": "shapes",
//!   "description": "Geometry helpers",
//!   "bootstrap": ["ast.mpy"],
//!   "macros": [
//!     { "name": "Circle", "keyword": "circle", "description": "...", "file": "circle.mpy" }
//!   ]
//! }
//! ```
//!
//! Validation is eager: the first missing field is reported and nothing from
//! the package becomes usable.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::errors::ManifestError;

/// Default manifest file name inside a package directory.
pub const MANIFEST_FILE: &str = "macros.json";

// ============================================================================
// RAW SHAPE
// ============================================================================

#[derive(Debug, Default, Deserialize)]
struct RawManifest {
    name: Option<String>,
    package: Option<String>,
    description: Option<String>,
    macros: Option<Vec<RawMacroEntry>>,
    #[serde(default)]
    bootstrap: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawMacroEntry {
    name: Option<String>,
    keyword: Option<String>,
    description: Option<String>,
    file: Option<String>,
}

// ============================================================================
// VALIDATED MANIFEST
// ============================================================================

/// One macro declared by a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroEntry {
    pub name: String,
    pub keyword: String,
    pub description: String,
    pub file: String,
}

/// A validated package manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageManifest {
    pub path: PathBuf,
    pub name: String,
    pub package: String,
    pub description: String,
    pub macros: Vec<MacroEntry>,
    pub bootstrap: Vec<String>,
}

impl PackageManifest {
    /// Reads and validates the manifest at `path`.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let text = fs::read_to_string(path).map_err(|source| ManifestError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &text)
    }

    /// Validates manifest text. `path` is only used for error reporting.
    pub fn parse(path: &Path, text: &str) -> Result<Self, ManifestError> {
        let raw: RawManifest =
            serde_json::from_str(text).map_err(|source| ManifestError::Malformed {
                path: path.to_path_buf(),
                source,
            })?;
        Self::validate(path, raw)
    }

    fn validate(path: &Path, raw: RawManifest) -> Result<Self, ManifestError> {
        let path = path.to_path_buf();

        let Some(name) = raw.name else {
            return Err(ManifestError::MissingName { path });
        };
        let Some(package) = raw.package else {
            return Err(ManifestError::MissingPackageName { path });
        };
        if !is_identifier(&package) {
            return Err(ManifestError::InvalidPackageName { path, package });
        }
        let Some(description) = raw.description else {
            return Err(ManifestError::MissingDescription { path });
        };
        let Some(raw_macros) = raw.macros else {
            return Err(ManifestError::MissingMacros { path });
        };

        let mut macros = Vec::with_capacity(raw_macros.len());
        for (index, entry) in raw_macros.into_iter().enumerate() {
            macros.push(validate_entry(&path, index, entry)?);
        }

        Ok(Self {
            path,
            name,
            package,
            description,
            macros,
            bootstrap: raw.bootstrap,
        })
    }

    /// Finds the entry whose trigger keyword is `keyword`.
    pub fn entry(&self, keyword: &str) -> Option<&MacroEntry> {
        self.macros.iter().find(|entry| entry.keyword == keyword)
    }

    /// Directory containing the manifest.
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }
}

fn validate_entry(path: &Path, index: usize, raw: RawMacroEntry) -> Result<MacroEntry, ManifestError> {
    let at = || path.to_path_buf();
    let name = raw.name.ok_or_else(|| ManifestError::MacroMissingName { path: at(), index })?;
    let keyword = raw
        .keyword
        .ok_or_else(|| ManifestError::MacroMissingKeyword { path: at(), index })?;
    let description = raw
        .description
        .ok_or_else(|| ManifestError::MacroMissingDescription { path: at(), index })?;
    let file = raw.file.ok_or_else(|| ManifestError::MacroMissingFile { path: at(), index })?;
    Ok(MacroEntry {
        name,
        keyword,
        description,
        file,
    })
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}
