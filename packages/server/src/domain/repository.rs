//! Comment list storage trait.
//!
//! The domain only needs raw bytes in and out per movie id; parsing and
//! serializing the document is the channel's job. Concrete backends live in
//! `infrastructure::repository`.

use async_trait::async_trait;

use super::{MovieId, StoreError};

/// Persisted comment list storage, one entry per movie id
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommentListStore: Send + Sync {
    /// Read the stored comment list, or `None` if nothing was stored yet
    async fn load(&self, movie_id: &MovieId) -> Result<Option<Vec<u8>>, StoreError>;

    /// Replace the stored comment list
    async fn save(&self, movie_id: &MovieId, contents: &[u8]) -> Result<(), StoreError>;
}
