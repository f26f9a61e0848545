//! The Makros Command-Line Interface.
//!
//! This module builds the configuration from its layers, drives the library
//! for each subcommand, and leaves process concerns (signal handling, exit
//! status, the diagnostic hook) to the binary.

use std::path::Path;

use tracing::{debug, warn};

use crate::cli::args::{Command, GlobalOptions, MakrosArgs};
use crate::config::MakrosConfig;
use crate::engine::{Expander, Interrupt};
use crate::errors::{MakroError, Result};
use crate::macros::{PluginRegistry, Resolver};

pub mod args;
pub mod output;

/// Runs one CLI invocation with the standard built-in macros.
pub fn run(args: MakrosArgs, interrupt: &Interrupt) -> Result<()> {
    let config = build_config(&args.options)?;
    debug!(?config, "effective configuration");

    let mut resolver =
        Resolver::new(config, PluginRegistry::with_std()).with_interrupt(interrupt.clone());
    resolver.bootstrap_builtins()?;

    let result = match &args.command {
        Command::Expand { path } => handle_expand(&mut resolver, path),
        Command::Print { file } => handle_print(&mut resolver, file),
    };
    finish(result, resolver.save_hashes())
}

/// The pass's own error wins over a failure to save the hash record.
fn finish(result: Result<()>, saved: Result<()>) -> Result<()> {
    match (result, saved) {
        (Ok(()), saved) => saved,
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(save_err)) => {
            warn!(error = %save_err, "could not save the hash record");
            Err(err)
        }
    }
}

/// Defaults, then the config file, then the environment, then flags.
pub fn build_config(options: &GlobalOptions) -> Result<MakrosConfig> {
    let config = match &options.config {
        Some(path) => MakrosConfig::load(path)?,
        None => MakrosConfig::default(),
    };
    let mut config = config.apply_env();

    if let Some(root) = &options.packages_root {
        config.packages_root = Some(root.clone());
    }
    if let Some(dir) = &options.builtin_dir {
        config.builtin_dir = Some(dir.clone());
    }
    if let Some(record) = &options.hash_record {
        config.hash_record = Some(record.clone());
    }
    Ok(config)
}

/// Handles the `expand` subcommand.
fn handle_expand(resolver: &mut Resolver, path: &Path) -> Result<()> {
    let mut expander = Expander::new(resolver);
    let written = if path.is_dir() {
        expander.translate_folder(path)?
    } else {
        vec![expander.translate_file(path)?]
    };
    output::print_written(&written).map_err(|e| MakroError::io("<stdout>", e))
}

/// Handles the `print` subcommand.
fn handle_print(resolver: &mut Resolver, file: &Path) -> Result<()> {
    let text = Expander::new(resolver).expand_file(file)?;
    output::print_expanded(&text).map_err(|e| MakroError::io("<stdout>", e))
}
