//! Shared utilities used across the castellan crates: error context
//! machinery and time conversion helpers.

pub mod error;
pub mod time;

pub use error::FromMessage;
