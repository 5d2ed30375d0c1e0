use std::io::{BufRead, BufReader, Stdin, Stdout, Write};

use crate::error::Result;

use super::{Clarification, ClarificationKind};

/// Obtains a human answer for one clarification. May block indefinitely
/// (stdin, UI callback); HTTP-driven flows skip this entirely and resolve
/// clarifications out-of-band per request.
pub trait Responder {
    fn respond(&mut self, clarification: &Clarification) -> Result<String>;
}

/// Map a raw 1-based numeric entry onto one of the offered options.
/// Non-numeric or out-of-range entries return `None` so callers can
/// re-prompt instead of submitting garbage.
pub fn select_option<'a>(options: &'a [String], raw: &str) -> Option<&'a str> {
    let index: usize = raw.trim().parse().ok()?;
    index
        .checked_sub(1)
        .and_then(|i| options.get(i))
        .map(|s| s.as_str())
}

/// Line-oriented responder over arbitrary reader/writer pairs. The stdin
/// flavor backs the interactive CLI; tests drive it with cursors.
pub struct LineResponder<R, W> {
    input: R,
    output: W,
}

impl LineResponder<BufReader<Stdin>, Stdout> {
    pub fn stdin() -> Self {
        Self::new(BufReader::new(std::io::stdin()), std::io::stdout())
    }
}

impl<R: BufRead, W: Write> LineResponder<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn prompt(&mut self, text: &str) -> Result<String> {
        write!(self.output, "{text}")?;
        self.output.flush()?;

        let mut line = String::new();
        let read = self.input.read_line(&mut line)?;
        if read == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "input closed while waiting for an answer",
            )
            .into());
        }
        Ok(line.trim().to_string())
    }
}

impl<R: BufRead, W: Write> Responder for LineResponder<R, W> {
    fn respond(&mut self, clarification: &Clarification) -> Result<String> {
        writeln!(self.output, "\n--- Clarification ---")?;
        writeln!(self.output, "{}", clarification.guidance)?;

        match &clarification.kind {
            ClarificationKind::FreeText => self.prompt("Your answer: "),
            ClarificationKind::MultipleChoice { options } => {
                for (i, option) in options.iter().enumerate() {
                    writeln!(self.output, "{}. {option}", i + 1)?;
                }
                loop {
                    let raw = self.prompt("Enter your choice (number): ")?;
                    match select_option(options, &raw) {
                        Some(choice) => return Ok(choice.to_string()),
                        None => {
                            writeln!(self.output, "Invalid choice, try again")?;
                        }
                    }
                }
            }
            // Anything other than an affirmative is an edit instruction,
            // forwarded verbatim for the engine to apply.
            ClarificationKind::Verification => {
                self.prompt("Approve with 'yes', or describe the change: ")
            }
        }
    }
}
