//! Wire format spoken between the browser terminal and the gateway.

pub mod message;

pub use message::{Operation, TerminalMessage, END_OF_TRANSMISSION};
