//! Command-line client for the live comment server.

pub mod error;
pub mod formatter;
pub mod message;
pub mod session;
mod ui;

pub use session::{ClientConfig, run_client_session};
