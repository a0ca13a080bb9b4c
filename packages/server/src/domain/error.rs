//! Domain errors.

use thiserror::Error;

/// Movie id rejected at handshake
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MovieIdError {
    #[error("movie id is empty")]
    Empty,

    #[error("movie id '{0}' cannot be used as a file name")]
    InvalidFileName(String),
}

/// Comment frame that does not follow the 11-field CSV layout
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommentParseError {
    #[error("expected {expected} comma-separated fields, got {actual}")]
    FieldCount { expected: usize, actual: usize },
}

/// Comment list storage failure
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read comment list for '{movie_id}': {source}")]
    Read {
        movie_id: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write comment list for '{movie_id}': {source}")]
    Write {
        movie_id: String,
        #[source]
        source: std::io::Error,
    },
}
