//! Messenger-facing model: inbound events, outbound messages and the port trait.

pub mod port;
pub mod types;
