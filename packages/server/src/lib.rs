//! Live comment broadcast server library.
//!
//! Viewers of the same movie share one comment stream: each TCP connection
//! names a movie in its first frame, receives that movie's comment history,
//! then every comment posted by any viewer of the movie is broadcast to all
//! of them. Histories are loaded on the first viewer and written back when
//! the last one leaves.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

pub mod config;
