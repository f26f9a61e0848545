//! Maps import references to loaded macro definitions.
//!
//! A reference is either a bare keyword (`hello`, a built-in macro) or
//! `package.keyword`. Package directories are searched for under the current
//! search root first, then among the children of the installed-packages root.
//! The first package directory found wins.
//!
//! Loading a package may expand the helper files its manifest lists under
//! `bootstrap`, using the expansion engine itself. That happens at most once
//! per package directory for the lifetime of a [`Resolver`], and files whose
//! content hash is unchanged since the last run are not expanded again.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, trace};
use walkdir::WalkDir;

use crate::config::MakrosConfig;
use crate::engine::{Expander, Interrupt};
use crate::errors::{MakroError, Result};
use crate::macros::definition::{MacroDefinition, MacroOrigin};
use crate::macros::hash_record::{file_digest, HashRecord};
use crate::macros::import::REFERENCE_SEPARATOR;
use crate::macros::manifest::PackageManifest;
use crate::macros::registry::{PluginKey, PluginRegistry};

/// Long-lived resolution state shared by every expansion pass of a run.
#[derive(Debug)]
pub struct Resolver {
    config: MakrosConfig,
    registry: PluginRegistry,
    cache: HashMap<String, MacroDefinition>,
    bootstrapped: HashSet<PathBuf>,
    hashes: HashRecord,
    search_root: PathBuf,
    interrupt: Interrupt,
}

impl Resolver {
    /// Creates a resolver. The hash record is loaded from
    /// `config.hash_record` when set.
    pub fn new(config: MakrosConfig, registry: PluginRegistry) -> Self {
        let hashes = match &config.hash_record {
            Some(path) => HashRecord::load(path),
            None => HashRecord::in_memory(),
        };
        let search_root = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            config,
            registry,
            cache: HashMap::new(),
            bootstrapped: HashSet::new(),
            hashes,
            search_root,
            interrupt: Interrupt::new(),
        }
    }

    /// Shares `interrupt` with every pass this resolver drives.
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    pub fn config(&self) -> &MakrosConfig {
        &self.config
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn interrupt(&self) -> &Interrupt {
        &self.interrupt
    }

    pub fn hashes(&self) -> &HashRecord {
        &self.hashes
    }

    /// Directory local package searches start from.
    pub fn search_root(&self) -> &Path {
        &self.search_root
    }

    pub fn set_search_root(&mut self, root: impl Into<PathBuf>) {
        self.search_root = root.into();
    }

    /// A previously resolved definition, if any.
    pub fn cached(&self, reference: &str) -> Option<&MacroDefinition> {
        self.cache.get(reference)
    }

    /// True once the package at `dir` has run its bootstrap files.
    pub fn is_bootstrapped(&self, dir: &Path) -> bool {
        self.bootstrapped.contains(&canonical(dir))
    }

    // ========================================================================
    // RESOLUTION
    // ========================================================================

    /// Resolves `reference` to a macro definition, memoising the result.
    pub fn resolve(&mut self, reference: &str) -> Result<MacroDefinition> {
        if let Some(definition) = self.cache.get(reference) {
            trace!(reference, "resolution cache hit");
            return Ok(definition.clone());
        }

        let parts: Vec<&str> = reference.split(REFERENCE_SEPARATOR).collect();
        let definition = match parts.as_slice() {
            [keyword] if !keyword.is_empty() => self.resolve_builtin(keyword)?,
            [package, keyword] if !package.is_empty() && !keyword.is_empty() => {
                self.resolve_package(reference, package, keyword)?
            }
            _ => {
                return Err(MakroError::resolution(
                    reference,
                    "expected a keyword or `package.keyword`",
                ))
            }
        };

        debug!(reference, keyword = %definition.keyword, "resolved macro");
        self.cache.insert(reference.to_string(), definition.clone());
        Ok(definition)
    }

    fn resolve_builtin(&self, keyword: &str) -> Result<MacroDefinition> {
        let file = match &self.config.builtin_dir {
            Some(dir) => {
                let candidates = [
                    dir.join(format!("{keyword}.{}", self.config.output_extension)),
                    dir.join(format!("{keyword}.{}", self.config.source_extension)),
                ];
                let found = candidates.into_iter().find(|path| path.is_file());
                if found.is_none() {
                    return Err(MakroError::resolution(
                        keyword,
                        format!("no built-in macro file in {}", dir.display()),
                    ));
                }
                found
            }
            None => None,
        };

        let plugin = self
            .registry
            .lookup(&PluginKey::builtin(keyword))
            .ok_or_else(|| MakroError::resolution(keyword, "no built-in macro with this name"))?;

        Ok(MacroDefinition::new(
            keyword,
            keyword,
            MacroOrigin::Builtin { file },
            plugin,
        ))
    }

    fn resolve_package(
        &mut self,
        reference: &str,
        package: &str,
        keyword: &str,
    ) -> Result<MacroDefinition> {
        let dir = self
            .find_local(package)
            .or_else(|| self.find_installed(package))
            .ok_or_else(|| {
                MakroError::resolution(
                    reference,
                    format!("no package directory named '{package}' was found"),
                )
            })?;
        debug!(package, dir = %dir.display(), "found package directory");
        self.load_from_folder(&dir, reference, package, keyword)
    }

    /// First directory named `package` below the search root, in sorted walk
    /// order.
    fn find_local(&self, package: &str) -> Option<PathBuf> {
        WalkDir::new(&self.search_root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| entry.ok())
            .find(|entry| entry.file_type().is_dir() && entry.file_name() == package)
            .map(|entry| entry.into_path())
    }

    fn find_installed(&self, package: &str) -> Option<PathBuf> {
        let root = self.config.packages_root.as_ref()?;
        let candidate = root.join(package);
        candidate.is_dir().then_some(candidate)
    }

    fn load_from_folder(
        &mut self,
        dir: &Path,
        reference: &str,
        package: &str,
        keyword: &str,
    ) -> Result<MacroDefinition> {
        let manifest = PackageManifest::load(&dir.join(&self.config.manifest_file))?;

        let key = canonical(dir);
        if !self.bootstrapped.contains(&key) {
            // Marked up front so a bootstrap file importing from its own
            // package does not recurse.
            self.bootstrapped.insert(key.clone());
            let result = manifest
                .bootstrap
                .iter()
                .try_for_each(|file| self.bootstrap_file(&dir.join(file)).map(drop));
            if let Err(err) = result {
                self.bootstrapped.remove(&key);
                return Err(err);
            }
            self.hashes.save()?;
        }

        let entry = manifest.entry(keyword).ok_or_else(|| {
            MakroError::resolution(
                reference,
                format!(
                    "package '{package}' at {} does not contain the macro '{keyword}'",
                    dir.display()
                ),
            )
        })?;
        let file = self.implementation_file(&dir.join(&entry.file), reference)?;

        let plugin = self
            .registry
            .lookup(&PluginKey::package(package, keyword))
            .ok_or_else(|| {
                MakroError::resolution(reference, "no implementation is registered for this macro")
            })?;

        Ok(MacroDefinition::new(
            reference,
            keyword,
            MacroOrigin::Package {
                dir: dir.to_path_buf(),
                manifest_name: manifest.name.clone(),
                file,
            },
            plugin,
        ))
    }

    /// Macro-source implementation files are used through their expanded
    /// sibling, which is produced here when missing.
    fn implementation_file(&mut self, file: &Path, reference: &str) -> Result<PathBuf> {
        let missing = || {
            MakroError::resolution(
                reference,
                format!("implementation file {} does not exist", file.display()),
            )
        };

        if !self.config.is_macro_source(file) {
            if !file.is_file() {
                return Err(missing());
            }
            return Ok(file.to_path_buf());
        }

        let compiled = self.config.output_path(file);
        if !compiled.is_file() {
            if !file.is_file() {
                return Err(missing());
            }
            self.bootstrap_file(file)?;
            self.hashes.save()?;
        }
        Ok(compiled)
    }

    // ========================================================================
    // BOOTSTRAP
    // ========================================================================

    /// Expands a macro-source file to its output sibling unless its content
    /// hash is unchanged and the sibling still exists. Returns true if the
    /// file was expanded.
    ///
    /// Files without the macro-source extension are skipped.
    pub fn bootstrap_file(&mut self, path: &Path) -> Result<bool> {
        if !self.config.is_macro_source(path) {
            debug!(path = %path.display(), "not a macro source, skipping bootstrap");
            return Ok(false);
        }

        let digest = file_digest(path)?;
        let output = self.config.output_path(path);
        if output.is_file() && self.hashes.is_unchanged(path, &digest) {
            debug!(path = %path.display(), "unchanged since last run");
            return Ok(false);
        }

        info!(path = %path.display(), "bootstrapping");
        Expander::new(self).translate_file(path)?;
        self.hashes.update(path, digest);
        Ok(true)
    }

    /// Expands every macro-source file in the built-in directory. Returns the
    /// number of files actually expanded.
    pub fn bootstrap_builtins(&mut self) -> Result<usize> {
        let Some(dir) = self.config.builtin_dir.clone() else {
            return Ok(0);
        };

        let mut files: Vec<PathBuf> = fs::read_dir(&dir)
            .map_err(|e| MakroError::io(&dir, e))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && self.config.is_macro_source(path))
            .collect();
        files.sort();

        let mut expanded = 0;
        for file in &files {
            if self.bootstrap_file(file)? {
                expanded += 1;
            }
        }
        self.hashes.save()?;
        info!(dir = %dir.display(), expanded, total = files.len(), "bootstrapped built-in macros");
        Ok(expanded)
    }

    /// Persists the hash record.
    pub fn save_hashes(&mut self) -> Result<()> {
        self.hashes.save()
    }
}

fn canonical(dir: &Path) -> PathBuf {
    fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf())
}
