//! Core logic for the admin relay bot.
//!
//! This crate is intentionally framework-agnostic. Telegram lives behind the
//! messaging port (trait) implemented in the adapter crate.

pub mod config;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod links;
pub mod logging;
pub mod messaging;
pub mod relay;
pub mod store;

pub use errors::{Error, Result};
