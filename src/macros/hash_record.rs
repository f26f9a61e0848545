//! Persisted content hashes used to skip recompiling unchanged macro sources.
//!
//! The record maps absolute file paths to lowercase hex SHA-256 digests and is
//! stored as a flat JSON object. It is only an optimisation: a missing or
//! unreadable record behaves exactly like an empty one.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::errors::{MakroError, Result};

#[derive(Debug, Clone, Default)]
pub struct HashRecord {
    path: Option<PathBuf>,
    digests: BTreeMap<String, String>,
    dirty: bool,
}

impl HashRecord {
    /// A record that lives only in memory.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Loads the record persisted at `path`.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let digests = match fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str::<BTreeMap<String, String>>(&text) {
                Ok(digests) => digests,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "ignoring corrupt hash record");
                    BTreeMap::new()
                }
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "ignoring unreadable hash record");
                BTreeMap::new()
            }
        };
        Self {
            path: Some(path),
            digests,
            dirty: false,
        }
    }

    /// True if `file` was recorded with exactly `digest`.
    pub fn is_unchanged(&self, file: &Path, digest: &str) -> bool {
        self.digests
            .get(&key(file))
            .is_some_and(|recorded| recorded == digest)
    }

    pub fn update(&mut self, file: &Path, digest: impl Into<String>) {
        let digest = digest.into();
        if self.digests.insert(key(file), digest.clone()).as_ref() != Some(&digest) {
            self.dirty = true;
        }
    }

    pub fn get(&self, file: &Path) -> Option<&str> {
        self.digests.get(&key(file)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.digests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }

    /// Writes the record back to disk. No-op for in-memory records or when
    /// nothing changed since the last save.
    pub fn save(&mut self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if !self.dirty {
            return Ok(());
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| MakroError::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(&self.digests)
            .map_err(|e| MakroError::internal(format!("hash record serialisation: {e}")))?;
        fs::write(path, json).map_err(|e| MakroError::io(path, e))?;
        debug!(path = %path.display(), entries = self.digests.len(), "saved hash record");
        self.dirty = false;
        Ok(())
    }
}

/// Streams `file` through SHA-256 and returns the lowercase hex digest.
pub fn file_digest(file: &Path) -> Result<String> {
    let mut reader = File::open(file).map_err(|e| MakroError::io(file, e))?;
    let mut hasher = Sha256::new();
    io::copy(&mut reader, &mut hasher).map_err(|e| MakroError::io(file, e))?;
    Ok(format!("{:x}", hasher.finalize()))
}

fn key(file: &Path) -> String {
    let absolute = fs::canonicalize(file).unwrap_or_else(|_| file.to_path_buf());
    absolute.to_string_lossy().into_owned()
}
