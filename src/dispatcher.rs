//! The outer loop: reads a line, decodes it, applies any pending global
//! reset, and feeds every parser in a fixed registration order.

use std::io::{BufRead, Write};

use crate::error::Error;
use crate::event::Event;
use crate::parser::{
    FastRecoverAfterRlfParser, HandoverFailureParser, HandoverSuccessParser, Parser,
    SlowRecoverAfterRlfParser,
};
use crate::shared::SharedState;
use crate::warnings::{Reports, Warnings};

/// Registration order is fixed and load-bearing: HSP is the only parser
/// that can commit a success path on the same event that others are
/// still mid-matching, and its `reset_all` must pre-empt them at the top
/// of the next iteration.
pub struct Dispatcher<R: Write, S: Write> {
    parsers: Vec<Box<dyn Parser<R, S>>>,
    shared: SharedState,
    reports: Reports<R>,
    warnings: Warnings<S>,
}

/// Outcome of driving the dispatcher to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Clean end of stream; exit code 0.
    Eof,
    /// Malformed input or an uncaught handler error; exit code 1.
    /// `line` is the 1-based line at which the failure occurred.
    Failed { line: usize, error: Option<Error> },
}

impl<R: Write, S: Write> Dispatcher<R, S> {
    pub fn new(reports: Reports<R>, warnings: Warnings<S>) -> Self {
        Self {
            parsers: vec![
                Box::new(HandoverSuccessParser::new()),
                Box::new(HandoverFailureParser::new()),
                Box::new(FastRecoverAfterRlfParser::new()),
                Box::new(SlowRecoverAfterRlfParser::new()),
            ],
            shared: SharedState::default(),
            reports,
            warnings,
        }
    }

    #[cfg(test)]
    pub fn shared(&self) -> &SharedState {
        &self.shared
    }

    /// Drives the dispatcher over every line of `input` until EOF or a
    /// fatal error. Implements the stall-once protocol: a parser may set
    /// `shared.control.stall_once` to ask for the just-decoded event to be
    /// re-fed without consuming a new line.
    pub fn run(&mut self, input: impl BufRead) -> Outcome {
        let mut line_no = 0usize;
        let mut pending: Option<Event> = None;

        for line in input.lines() {
            let line = match line {
                Ok(line) => line,
                Err(_) => {
                    return Outcome::Failed {
                        line: line_no + 1,
                        error: None,
                    }
                }
            };
            line_no += 1;

            let event = match Event::decode(&line, line_no) {
                Ok(event) => event,
                Err(err) => {
                    return Outcome::Failed {
                        line: line_no,
                        error: Some(err),
                    }
                }
            };
            pending = Some(event);

            loop {
                let event = pending.as_ref().expect("just set");
                tracing::debug!(line_no, packet_type = %event.packet_type, "dispatching event");

                if self.shared.control.reset_all {
                    for parser in &mut self.parsers {
                        parser.reset();
                    }
                    self.shared.control.reset_all = false;
                    tracing::debug!(line_no, "reset_all applied to all parsers");
                }

                if let Err(err) = self.feed_all(event) {
                    return Outcome::Failed {
                        line: line_no,
                        error: Some(err),
                    };
                }

                if self.shared.control.stall_once {
                    self.shared.control.stall_once = false;
                    continue;
                }
                break;
            }
        }

        Outcome::Eof
    }

    fn feed_all(&mut self, event: &Event) -> Result<(), Error> {
        for parser in &mut self.parsers {
            let mut ctx = crate::parser::Context {
                shared: &mut self.shared,
                reports: &mut self.reports,
                warnings: &mut self.warnings,
            };
            parser.feed(event, &mut ctx)?;
        }
        Ok(())
    }
}
