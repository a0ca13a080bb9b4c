//! Shared building blocks for the Sajiki comment server and client.
//!
//! - `frame`: NUL-terminated wire framing and the literal protocol messages
//! - `logger`: tracing subscriber setup
//! - `time`: clock abstraction and timestamp helpers

pub mod frame;
pub mod logger;
pub mod time;
