//! Data Transfer Objects (DTOs).
//!
//! The TCP comment protocol carries XML documents rendered by `document`;
//! only the diagnostics HTTP API has DTOs:
//! - `http`: HTTP API response DTOs

pub mod http;
