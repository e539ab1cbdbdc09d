//! The arithmetic expression carried in a `Data` request payload.
//!
//! On the wire an expression is plain ASCII: `<operand1><operator><operand2>`,
//! for example `"3+4"` or `"-7/2"`.  The client formats it without spaces;
//! the parser also tolerates whitespace around the operator.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Errors raised while building or parsing an [`Expression`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExpressionError {
    /// The text is empty or does not start with an integer.
    #[error("malformed expression: {0:?}")]
    Malformed(String),

    /// No recognised operator follows the first operand.
    #[error("missing operator in {0:?}")]
    MissingOperator(String),

    /// An operand does not fit a 64-bit signed integer.
    #[error("operand out of range: {0}")]
    OperandOutOfRange(String),

    /// The request divides by zero; rejected before anything is sent.
    #[error("cannot divide by zero")]
    DivisionByZero,
}

/// The four supported operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operator {
    /// The ASCII symbol used on the wire.
    pub const fn symbol(&self) -> char {
        match self {
            Self::Add => '+',
            Self::Subtract => '-',
            Self::Multiply => '*',
            Self::Divide => '/',
        }
    }

    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '+' => Some(Self::Add),
            '-' => Some(Self::Subtract),
            '*' => Some(Self::Multiply),
            '/' => Some(Self::Divide),
            _ => None,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// A binary arithmetic expression.
///
/// Operands are stored as `i64` so a peer can tell an operand that is too
/// wide for 32 bits (`"9999999999+1"`) apart from a malformed one.  Clients
/// build expressions from `i32` operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expression {
    pub lhs: i64,
    pub op: Operator,
    pub rhs: i64,
}

impl Expression {
    /// Builds an expression from two 32-bit operands.
    pub fn new(lhs: i32, op: Operator, rhs: i32) -> Self {
        Self {
            lhs: i64::from(lhs),
            op,
            rhs: i64::from(rhs),
        }
    }

    /// Builds an expression, rejecting a zero divisor.
    ///
    /// # Errors
    ///
    /// Returns [`ExpressionError::DivisionByZero`] for `x / 0`.
    pub fn checked(lhs: i32, op: Operator, rhs: i32) -> Result<Self, ExpressionError> {
        if op == Operator::Divide && rhs == 0 {
            return Err(ExpressionError::DivisionByZero);
        }
        Ok(Self::new(lhs, op, rhs))
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.lhs, self.op, self.rhs)
    }
}

impl FromStr for Expression {
    type Err = ExpressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let (lhs, rest) = split_leading_integer(text)
            .ok_or_else(|| ExpressionError::Malformed(s.to_string()))?;
        let lhs = parse_operand(lhs)?;

        let mut chars = rest.trim_start().chars();
        let op = chars
            .next()
            .and_then(Operator::from_symbol)
            .ok_or_else(|| ExpressionError::MissingOperator(s.to_string()))?;

        let rhs_text = chars.as_str().trim();
        match split_leading_integer(rhs_text) {
            Some((digits, "")) => Ok(Self {
                lhs,
                op,
                rhs: parse_operand(digits)?,
            }),
            _ => Err(ExpressionError::Malformed(s.to_string())),
        }
    }
}

/// Splits an optionally signed run of ASCII digits off the front of `text`.
fn split_leading_integer(text: &str) -> Option<(&str, &str)> {
    let sign_len = usize::from(text.starts_with(['+', '-']));
    let digit_len = text[sign_len..]
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();
    if digit_len == 0 {
        return None;
    }
    Some(text.split_at(sign_len + digit_len))
}

fn parse_operand(digits: &str) -> Result<i64, ExpressionError> {
    digits
        .parse::<i64>()
        .map_err(|_| ExpressionError::OperandOutOfRange(digits.to_string()))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
