//! Handles all user-facing output for the CLI.
//!
//! Results go to stdout; diagnostics go to stderr through `miette`.

use std::io::{self, Write};
use std::path::PathBuf;

use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::errors::MakroError;

/// Lists written output files, one per line, with a colored label.
pub fn print_written(paths: &[PathBuf]) -> io::Result<()> {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    for path in paths {
        stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true))?;
        write!(stdout, "Translated")?;
        stdout.reset()?;
        writeln!(stdout, " {}", path.display())?;
    }
    Ok(())
}

/// Writes expanded text to stdout exactly as produced.
pub fn print_expanded(text: &str) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    stdout.flush()
}

/// Renders an error as a `miette` report on stderr.
pub fn print_error(error: MakroError) {
    eprintln!("{:?}", miette::Report::new(error));
}
