//! File-driven input: run a list of expressions and check the answers.
//!
//! A cases file holds one case per line:
//!
//! ```text
//! # expression[,expected]
//! 3+4,7
//! 2147483647*2,Overflow or underflow error
//! 10/3
//! ```
//!
//! Blank lines and lines starting with `#` are skipped.  `expected` is
//! compared with the result text, or with the mapped error text when the
//! service reports an error.  Cases without an expected value only need an
//! answer of any kind.
//!
//! Cases are sent exactly as written, spaces included, without being parsed
//! first.  Unlike the console, a batch file may contain operands wider than
//! 32 bits, a zero divisor, or text that is not an expression at all, which
//! is how the service's own range, overflow and malformed-input handling gets
//! exercised.

use std::collections::VecDeque;
use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::application::ports::{ClientInput, InputSource};
use crate::application::session::SessionEvent;

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("cannot read cases file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("line {line}: no request text before the expected value")]
    EmptyRequest { line: usize },
}

/// One request and, optionally, the answer it should get.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchCase {
    /// 1-based line number in the cases file.
    pub line: usize,
    /// Request payload, exactly as written in the file.
    pub request: String,
    pub expected: Option<String>,
}

/// Parses the contents of a cases file.
///
/// # Errors
///
/// Returns [`BatchError::EmptyRequest`] for the first line that has an
/// expected value but no request text.
pub fn parse_cases(text: &str) -> Result<Vec<BatchCase>, BatchError> {
    let mut cases = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (request, expected) = match line.split_once(',') {
            Some((request, expected)) => (request.trim_end(), Some(expected.trim().to_string())),
            None => (line, None),
        };
        if request.is_empty() {
            return Err(BatchError::EmptyRequest { line: index + 1 });
        }
        cases.push(BatchCase {
            line: index + 1,
            request: request.to_string(),
            expected,
        });
    }
    Ok(cases)
}

/// Reads and parses a cases file.
///
/// # Errors
///
/// Returns [`BatchError::Io`] if the file cannot be read, or
/// [`BatchError::EmptyRequest`] for a line with no request text.
pub fn load_cases(path: &Path) -> Result<Vec<BatchCase>, BatchError> {
    let text = std::fs::read_to_string(path).map_err(|source| BatchError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_cases(&text)
}

/// [`InputSource`] that yields each case in order, then Exit.
#[derive(Debug)]
pub struct BatchInput {
    queue: VecDeque<String>,
}

impl BatchInput {
    pub fn new(cases: &[BatchCase]) -> Self {
        Self {
            queue: cases.iter().map(|c| c.request.clone()).collect(),
        }
    }
}

impl InputSource for BatchInput {
    fn next_input(&mut self) -> ClientInput {
        self.queue
            .pop_front()
            .map_or(ClientInput::Exit, ClientInput::Raw)
    }
}

/// What the service said about one case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Value(String),
    ServiceError(String),
    Unexpected(String),
    /// No answer: the session ended before the case was answered.
    Unanswered,
}

impl Outcome {
    fn text(&self) -> Option<&str> {
        match self {
            Self::Value(text) | Self::ServiceError(text) => Some(text),
            Self::Unexpected(_) | Self::Unanswered => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(text) => f.write_str(text),
            Self::ServiceError(text) => write!(f, "error: {text}"),
            Self::Unexpected(kind) => write!(f, "unexpected {kind}"),
            Self::Unanswered => f.write_str("no answer"),
        }
    }
}

/// Collects session events and matches them to the cases.
#[derive(Debug)]
pub struct BatchReport {
    cases: Vec<BatchCase>,
    outcomes: Vec<Outcome>,
    sent: usize,
}

impl BatchReport {
    pub fn new(cases: Vec<BatchCase>) -> Self {
        let outcomes = vec![Outcome::Unanswered; cases.len()];
        Self {
            cases,
            outcomes,
            sent: 0,
        }
    }

    /// Records one session event.  Answers belong to the most recently sent
    /// case.
    pub fn record(&mut self, event: &SessionEvent) {
        let outcome = match event {
            SessionEvent::RequestSent(_) => {
                self.sent += 1;
                return;
            }
            SessionEvent::Result(text) => Outcome::Value(text.clone()),
            SessionEvent::ServiceError { message, .. } => Outcome::ServiceError(message.clone()),
            SessionEvent::UnexpectedResponse(kind) => Outcome::Unexpected(kind.to_string()),
            _ => return,
        };
        if let Some(slot) = self.sent.checked_sub(1).and_then(|i| self.outcomes.get_mut(i)) {
            debug!(case = self.sent, %outcome, "case answered");
            *slot = outcome;
        }
    }

    fn passed(case: &BatchCase, outcome: &Outcome) -> bool {
        match (&case.expected, outcome.text()) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(expected), Some(actual)) => expected == actual,
        }
    }

    /// Number of cases that got no answer or a different answer than expected.
    pub fn failures(&self) -> usize {
        self.cases
            .iter()
            .zip(&self.outcomes)
            .filter(|(case, outcome)| !Self::passed(case, outcome))
            .count()
    }

    pub fn outcomes(&self) -> &[Outcome] {
        &self.outcomes
    }

    /// Writes one line per case and a summary line.
    pub fn render<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for (case, outcome) in self.cases.iter().zip(&self.outcomes) {
            let verdict = if Self::passed(case, outcome) { "PASS" } else { "FAIL" };
            write!(out, "{verdict} line {}: {} => {outcome}", case.line, case.request)?;
            match &case.expected {
                Some(expected) if !Self::passed(case, outcome) => {
                    writeln!(out, " (expected {expected})")?
                }
                _ => writeln!(out)?,
            }
        }
        writeln!(
            out,
            "{} case(s), {} passed, {} failed",
            self.cases.len(),
            self.cases.len() - self.failures(),
            self.failures()
        )
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use calc_core::MessageKind;

    const CASES: &str = "\
# arithmetic smoke test
3+4,7

2147483647*2,Overflow or underflow error
10 / 3
";

    #[test]
    fn test_parse_cases_skips_comments_and_blanks() {
        // Arrange / Act
        let cases = parse_cases(CASES).unwrap();

        // Assert
        assert_eq!(cases.len(), 3);
        assert_eq!(cases[0].line, 2);
        assert_eq!(cases[0].request, "3+4");
        assert_eq!(cases[0].expected.as_deref(), Some("7"));
        assert_eq!(cases[1].line, 4);
        assert_eq!(cases[2].request, "10 / 3");
        assert_eq!(cases[2].expected, None);
    }

    #[test]
    fn test_parse_cases_keeps_non_expressions_as_written() {
        // Arrange / Act
        let cases = parse_cases("a + b,Generic error message\n3.5 + 4.2\n").unwrap();

        // Assert
        assert_eq!(cases[0].request, "a + b");
        assert_eq!(cases[0].expected.as_deref(), Some("Generic error message"));
        assert_eq!(cases[1].request, "3.5 + 4.2");
    }

    #[test]
    fn test_parse_cases_reports_line_without_request() {
        let result = parse_cases("1+1\n ,7\n");

        assert!(matches!(result, Err(BatchError::EmptyRequest { line: 2 })));
    }

    #[test]
    fn test_load_cases_missing_file_is_io_error() {
        let result = load_cases(Path::new("/nonexistent/calc-link/cases.txt"));

        assert!(matches!(result, Err(BatchError::Io { .. })));
    }

    #[test]
    fn test_batch_input_yields_cases_then_exit() {
        let cases = parse_cases("1+2\n3 * 4\n").unwrap();
        let mut input = BatchInput::new(&cases);

        assert_eq!(input.next_input(), ClientInput::Raw("1+2".to_string()));
        assert_eq!(input.next_input(), ClientInput::Raw("3 * 4".to_string()));
        assert_eq!(input.next_input(), ClientInput::Exit);
    }

    #[test]
    fn test_report_matches_answers_to_cases() {
        // Arrange
        let cases = parse_cases(CASES).unwrap();
        let mut report = BatchReport::new(cases.clone());

        // Act
        for (case, answer) in cases.iter().zip([
            SessionEvent::Result("7".to_string()),
            SessionEvent::ServiceError {
                kind: MessageKind::ErrorOverflow,
                message: "Overflow or underflow error".to_string(),
            },
            SessionEvent::Result("3".to_string()),
        ]) {
            report.record(&SessionEvent::RequestSent(case.request.clone()));
            report.record(&SessionEvent::Acknowledged);
            report.record(&answer);
        }

        // Assert
        assert_eq!(report.failures(), 0);
        assert_eq!(report.outcomes()[2], Outcome::Value("3".to_string()));
    }

    #[test]
    fn test_report_counts_wrong_and_missing_answers() {
        // Arrange: first case answered wrongly, the rest never answered.
        let cases = parse_cases(CASES).unwrap();
        let mut report = BatchReport::new(cases.clone());
        report.record(&SessionEvent::RequestSent(cases[0].request.clone()));
        report.record(&SessionEvent::Result("8".to_string()));
        report.record(&SessionEvent::Failed("transport failure".to_string()));

        // Act
        let mut out = Vec::new();
        report.render(&mut out).unwrap();

        // Assert
        assert_eq!(report.failures(), 3);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("FAIL line 2: 3+4 => 8 (expected 7)"));
        assert!(text.contains("no answer"));
        assert!(text.ends_with("3 case(s), 0 passed, 3 failed\n"));
    }

    #[test]
    fn test_unexpected_kind_never_passes() {
        let cases = parse_cases("1+1\n").unwrap();
        let mut report = BatchReport::new(cases.clone());
        report.record(&SessionEvent::RequestSent(cases[0].request.clone()));
        report.record(&SessionEvent::UnexpectedResponse(MessageKind::Unrecognized(9)));

        assert_eq!(report.failures(), 1);
    }
}
