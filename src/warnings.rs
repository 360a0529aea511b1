//! Output sinks for the two user-facing streams: mobility reports on
//! stdout and protocol-anomaly warnings on stderr. Both are parameterized
//! over an injectable `Write` so integration tests can capture them
//! instead of the process's real file descriptors.

use std::fmt;
use std::io::Write;

/// Whether warnings are wrapped in ANSI red. Driven by `NO_COLOR` / TTY
/// detection at the CLI boundary (`crate::main`), never by a CLI flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    Colored,
    Plain,
}

const ANSI_RED: &str = "\u{1b}[31m";
const ANSI_RESET: &str = "\u{1b}[0m";

/// Sink for `Warning [<ParserName>] [<timestamp>]: <message>` lines.
pub struct Warnings<W> {
    out: W,
    mode: ColorMode,
}

impl<W: Write> Warnings<W> {
    pub fn new(out: W, mode: ColorMode) -> Self {
        Self { out, mode }
    }

    pub fn warn(&mut self, parser: &str, timestamp: &str, message: impl fmt::Display) {
        let body = format!("Warning [{parser}] [{timestamp}]: {message}");
        tracing::warn!(parser, timestamp, %message, "protocol anomaly");
        match self.mode {
            ColorMode::Colored => {
                let _ = writeln!(self.out, "{ANSI_RED}{body}{ANSI_RESET}");
            }
            ColorMode::Plain => {
                let _ = writeln!(self.out, "{body}");
            }
        }
    }
}

/// Sink for `<Label> $ <key>: <value>[, <key>: <value>]*` report lines.
pub struct Reports<W> {
    out: W,
}

impl<W: Write> Reports<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn emit(&mut self, label: &str, fields: &[(&str, &str)]) {
        let line = Self::format(label, fields);
        tracing::debug!(label, "emitting mobility report");
        let _ = writeln!(self.out, "{line}");
    }

    fn format(label: &str, fields: &[(&str, &str)]) -> String {
        if fields.is_empty() {
            return format!("{label} $");
        }
        let body = fields
            .iter()
            .map(|(k, v)| format!("{k}: {v}"))
            .collect::<Vec<_>>()
            .join(", ");
        format!("{label} $ {body}")
    }
}
