//! Application layer for the service.
//!
//! No sockets and no runtime here: everything in this layer works on bytes
//! and strings, so it is tested without a listener.
//!
//! # Sub-modules
//!
//! - **`calculator`** – the [`calculator::Calculator`] trait and
//!   [`calculator::CheckedCalculator`], which evaluates `<int><op><int>` with
//!   32-bit overflow checks and classifies failures.
//!
//! - **`handle_request`** – [`handle_request::respond`], which turns one
//!   received frame into the messages to send back.

pub mod calculator;
pub mod handle_request;
