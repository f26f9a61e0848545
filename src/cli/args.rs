//! Defines the command-line arguments and subcommands for the Makros CLI.
//!
//! This module uses the `clap` crate with its "derive" feature to create a
//! declarative and type-safe argument parsing structure.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "makros",
    version,
    about = "Expands syntactic macros in Python-style source files."
)]
pub struct MakrosArgs {
    #[command(flatten)]
    pub options: GlobalOptions,

    #[command(subcommand)]
    pub command: Command,
}

/// Settings shared by every subcommand. Each one overrides the config file
/// and the environment.
#[derive(Debug, Default, Args)]
pub struct GlobalOptions {
    /// JSON configuration file.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory of installed macro packages.
    #[arg(long, global = true, value_name = "DIR")]
    pub packages_root: Option<PathBuf>,

    /// Directory of built-in macro implementation files.
    #[arg(long, global = true, value_name = "DIR")]
    pub builtin_dir: Option<PathBuf>,

    /// File where content hashes are persisted between runs.
    #[arg(long, global = true, value_name = "FILE")]
    pub hash_record: Option<PathBuf>,
}

/// An enumeration of all available CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Translate a macro-source file, or every one under a directory, to its
    /// expanded sibling.
    Expand {
        /// File or directory to translate.
        #[arg(required = true)]
        path: PathBuf,
    },
    /// Print the expanded text of a macro-source file.
    Print {
        /// The macro-source file to expand.
        #[arg(required = true)]
        file: PathBuf,
    },
}
