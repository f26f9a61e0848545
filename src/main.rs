use std::process::ExitCode;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use makros::cli::{self, args::MakrosArgs, output};
use makros::Interrupt;

/// Exit status for a run stopped by the user.
const EXIT_INTERRUPTED: u8 = 130;

fn main() -> ExitCode {
    // Install miette's fancy error handler
    if let Err(err) = miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .build(),
        )
    })) {
        eprintln!("could not install the diagnostic handler: {err}");
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("MAKROS_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let interrupt = Interrupt::new();
    let handler = interrupt.clone();
    if let Err(err) = ctrlc::set_handler(move || {
        info!("Received interrupt signal");
        handler.trigger();
    }) {
        warn!(error = %err, "could not install the interrupt handler");
    }

    let args = MakrosArgs::parse();

    match cli::run(args, &interrupt) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) if err.is_interrupt() => ExitCode::from(EXIT_INTERRUPTED),
        Err(err) => {
            output::print_error(err);
            ExitCode::FAILURE
        }
    }
}
