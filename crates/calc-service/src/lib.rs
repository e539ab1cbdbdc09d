//! calc-service library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! The service accepts one client at a time on a Unix socket, announces
//! itself, and answers each `Data` request with an `Ack` followed by the
//! result or an error kind.

pub mod application;
pub mod infrastructure;
