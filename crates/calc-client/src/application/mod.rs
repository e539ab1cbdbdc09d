//! Application layer for the client.
//!
//! - **`ports`** – the traits the session depends on: [`ports::Connector`]
//!   and [`ports::Transport`] for the byte stream, [`ports::InputSource`] for
//!   the user's requests.
//!
//! - **`session`** – [`session::ClientSession`], the protocol state machine.
//!   It decodes every frame it receives, decides the next state, and reports
//!   what happened as [`session::SessionEvent`]s.

pub mod ports;
pub mod session;
