//! Value objects.

use std::fmt;

use super::error::MovieIdError;

/// Opaque identifier of a movie; the sharding key for channels and broadcast
/// scope, and the stem of the persisted file name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MovieId(String);

impl MovieId {
    /// Create a movie id.
    ///
    /// The id is used verbatim as a file stem, so it must be non-empty and
    /// must not name a directory (`.`, `..`, path separators, NUL).
    pub fn new(value: String) -> Result<Self, MovieIdError> {
        if value.is_empty() {
            return Err(MovieIdError::Empty);
        }
        if value == "." || value == ".." || value.contains(['/', '\\', '\0']) {
            return Err(MovieIdError::InvalidFileName(value));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for MovieId {
    type Error = MovieIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for MovieId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Registry slot index; doubles as the connection's externally visible user id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(usize);

impl SlotId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unix timestamp in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(millis: i64) -> Self {
        Self(millis)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    /// Milliseconds from `self` to `later`
    pub fn elapsed_until(&self, later: Timestamp) -> i64 {
        later.0 - self.0
    }
}
