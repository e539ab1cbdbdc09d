//! Evaluation of `<int><op><int>` requests.
//!
//! Arithmetic happens on 32-bit signed integers.  Operands are read as
//! 64-bit first so an operand that is merely too wide can be told apart from
//! text that is not an expression at all.
//!
//! | Condition | Error |
//! |---|---|
//! | operand outside `i32` | [`CalcError::OutOfRange`] |
//! | `+` or `-` leaves `i32` | [`CalcError::OutOfRange`] |
//! | `*` leaves `i32` | [`CalcError::Overflow`] |
//! | divisor is zero, or `i32::MIN / -1` | [`CalcError::Overflow`] |
//! | anything that does not parse | [`CalcError::Invalid`] |

use calc_core::{Expression, ExpressionError, MessageKind, Operator};
use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CalcError {
    #[error("operand or result out of range")]
    OutOfRange,
    #[error("arithmetic overflow or underflow")]
    Overflow,
    #[error("not a valid expression")]
    Invalid,
}

impl CalcError {
    /// The error kind reported to the client.
    pub const fn message_kind(&self) -> MessageKind {
        match self {
            Self::OutOfRange => MessageKind::ErrorOutOfRange,
            Self::Overflow => MessageKind::ErrorOverflow,
            Self::Invalid => MessageKind::Error,
        }
    }
}

/// Evaluates the text of a request.
#[cfg_attr(test, mockall::automock)]
pub trait Calculator: Send + Sync {
    fn evaluate(&self, expression: &str) -> Result<i32, CalcError>;
}

/// 32-bit arithmetic that reports overflow instead of wrapping.
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckedCalculator;

impl Calculator for CheckedCalculator {
    fn evaluate(&self, expression: &str) -> Result<i32, CalcError> {
        let expr: Expression = expression.parse().map_err(|e| match e {
            ExpressionError::OperandOutOfRange(_) => CalcError::OutOfRange,
            _ => CalcError::Invalid,
        })?;
        let lhs = i32::try_from(expr.lhs).map_err(|_| CalcError::OutOfRange)?;
        let rhs = i32::try_from(expr.rhs).map_err(|_| CalcError::OutOfRange)?;

        match expr.op {
            Operator::Add => lhs.checked_add(rhs).ok_or(CalcError::OutOfRange),
            Operator::Subtract => lhs.checked_sub(rhs).ok_or(CalcError::OutOfRange),
            Operator::Multiply => lhs.checked_mul(rhs).ok_or(CalcError::Overflow),
            Operator::Divide => lhs.checked_div(rhs).ok_or(CalcError::Overflow),
        }
    }
}
