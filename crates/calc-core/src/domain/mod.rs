//! Domain entities for calc-link.
//!
//! Pure logic with no I/O: the arithmetic expression carried in `Data`
//! payloads, and the admission gate that limits a service to one client at a
//! time.

/// `<int><op><int>` expressions and their operators.
pub mod expression;

/// Single-client admission capability.
pub mod admission;
