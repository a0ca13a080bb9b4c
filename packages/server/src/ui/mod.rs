//! TCP comment server and diagnostics HTTP API.

mod handler;
mod server;
mod signal;
pub mod state; // UseCase 層からアクセスするため public

pub use server::Server;
pub use signal::shutdown_signal;
