//! Connection and HTTP handlers.

mod connection;
mod http;

pub use connection::handle_connection;
pub use http::{get_channel_detail, get_channels, health_check};
