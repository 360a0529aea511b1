//! CLI entry point. Reads trace lines from stdin, writes mobility reports
//! to stdout and protocol-anomaly warnings to stderr, until EOF or a fatal
//! decode/handler error.
//!
//! Configuration is env-var only, per the no-flags constraint: `RUST_LOG`
//! controls internal diagnostics (default `warn`), `NO_COLOR` and stderr's
//! TTY-ness control whether warnings are ANSI-wrapped.

use std::io::{self, IsTerminal, Write};
use std::process::ExitCode;

use lte_mobility_events::warnings::{ColorMode, Reports, Warnings};
use lte_mobility_events::{Dispatcher, Outcome};

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_env("RUST_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn color_mode() -> ColorMode {
    if std::env::var_os("NO_COLOR").is_some() || !io::stderr().is_terminal() {
        ColorMode::Plain
    } else {
        ColorMode::Colored
    }
}

fn main() -> ExitCode {
    init_tracing();

    let stdout = io::stdout();
    let stderr = io::stderr();
    let reports = Reports::new(stdout.lock());
    let warnings = Warnings::new(stderr.lock(), color_mode());
    let mut dispatcher = Dispatcher::new(reports, warnings);

    let stdin = io::stdin();
    match dispatcher.run(stdin.lock()) {
        Outcome::Eof => ExitCode::SUCCESS,
        Outcome::Failed { line, error } => {
            let mut stderr = io::stderr();
            match error {
                Some(err) => {
                    tracing::error!(line, %err, "fatal error");
                    let _ = writeln!(stderr, "Exception at line {line}: {err}");
                }
                None => {
                    tracing::error!(line, "fatal I/O error reading input");
                    let _ = writeln!(stderr, "Exception at line {line}");
                }
            }
            ExitCode::FAILURE
        }
    }
}
