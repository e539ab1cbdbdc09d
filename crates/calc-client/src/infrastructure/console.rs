//! Interactive console input.
//!
//! [`ConsoleInput`] shows the operation menu, reads the choice and both
//! operands, and hands the session a ready-to-send [`Expression`].  Anything
//! that cannot be sent is handled here by re-prompting: an unknown menu
//! choice, an operand that is not a 32-bit integer, or a division by zero.
//! End of input counts as choosing Exit.
//!
//! The reader and writer are generic so tests can drive the menu with an
//! in-memory script.  The binary uses locked stdin and stdout; logs go to
//! stderr and never interleave with the menu.

use std::io::{self, BufRead, Write};

use calc_core::{Expression, Operator};
use tracing::{info, warn};

use crate::application::ports::{ClientInput, InputSource};
use crate::application::session::SessionEvent;

const MENU: &str = "\
Select an operation:
(1) Add
(2) Subtract
(3) Divide
(4) Multiply
(5) Exit";

enum MenuChoice {
    Operation(Operator),
    Exit,
}

fn parse_choice(line: &str) -> Option<MenuChoice> {
    match line.trim() {
        "1" => Some(MenuChoice::Operation(Operator::Add)),
        "2" => Some(MenuChoice::Operation(Operator::Subtract)),
        "3" => Some(MenuChoice::Operation(Operator::Divide)),
        "4" => Some(MenuChoice::Operation(Operator::Multiply)),
        "5" => Some(MenuChoice::Exit),
        _ => None,
    }
}

/// Menu-driven [`InputSource`] over a line reader and a writer.
pub struct ConsoleInput<R, W> {
    reader: R,
    writer: W,
}

impl<R: BufRead, W: Write> ConsoleInput<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Returns the writer, e.g. to inspect what a test script produced.
    pub fn into_writer(self) -> W {
        self.writer
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        match self.reader.read_line(&mut line)? {
            0 => Ok(None),
            _ => Ok(Some(line)),
        }
    }

    fn prompt(&mut self, text: &str) -> io::Result<Option<String>> {
        write!(self.writer, "{text}")?;
        self.writer.flush()?;
        self.read_line()
    }

    fn read_operand(&mut self, label: &str) -> io::Result<Option<i32>> {
        loop {
            let Some(line) = self.prompt(label)? else {
                return Ok(None);
            };
            match line.trim().parse::<i32>() {
                Ok(value) => return Ok(Some(value)),
                Err(_) => writeln!(self.writer, "Invalid number, try again.")?,
            }
        }
    }

    fn read_input(&mut self) -> io::Result<ClientInput> {
        loop {
            writeln!(self.writer, "{MENU}")?;
            let Some(line) = self.prompt("> ")? else {
                return Ok(ClientInput::Exit);
            };
            let op = match parse_choice(&line) {
                Some(MenuChoice::Operation(op)) => op,
                Some(MenuChoice::Exit) => return Ok(ClientInput::Exit),
                None => {
                    writeln!(self.writer, "Invalid choice, try again.")?;
                    continue;
                }
            };

            let Some(lhs) = self.read_operand("Enter the first operand: ")? else {
                return Ok(ClientInput::Exit);
            };
            let Some(rhs) = self.read_operand("Enter the second operand: ")? else {
                return Ok(ClientInput::Exit);
            };

            match Expression::checked(lhs, op, rhs) {
                Ok(expr) => return Ok(ClientInput::Request(expr)),
                Err(e) => writeln!(self.writer, "Cannot send request: {e}.")?,
            }
        }
    }
}

impl<R: BufRead, W: Write> InputSource for ConsoleInput<R, W> {
    fn next_input(&mut self) -> ClientInput {
        self.read_input().unwrap_or_else(|e| {
            warn!("console I/O failed, exiting: {e}");
            ClientInput::Exit
        })
    }
}

/// Writes the user-facing outcome of `event` to `out`.
///
/// Results, service errors, unexpected responses and failures are printed;
/// progress events only go to the log.
pub fn render_event<W: Write>(out: &mut W, event: &SessionEvent) -> io::Result<()> {
    match event {
        SessionEvent::Result(_)
        | SessionEvent::ServiceError { .. }
        | SessionEvent::UnexpectedResponse(_)
        | SessionEvent::Failed(_) => writeln!(out, "{event}"),
        _ => {
            info!("{event}");
            Ok(())
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
