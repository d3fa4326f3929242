//! `bogio`: byte-stream helpers for the bogmud telnet surface.
//!
//! Two small pieces live here:
//! - [`line::pop_line`]: splits accumulated input into lines, tolerant of the
//!   EOL variants telnet clients actually send
//! - [`telnet::IacParser`]: strips IAC sequences and refuses all negotiation
//!
//! Everything else (prompting, command handling) lives above this crate.

pub mod line;
pub mod telnet;

pub use line::{decode_line, pop_line};
pub use telnet::IacParser;
