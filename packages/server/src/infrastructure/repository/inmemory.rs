//! InMemory comment list store.
//!
//! Keeps serialized comment lists in a `HashMap`. Nothing survives a restart;
//! used by tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{CommentListStore, MovieId, StoreError};

#[derive(Debug, Default)]
pub struct InMemoryCommentListStore {
    lists: Mutex<HashMap<MovieId, Vec<u8>>>,
}

impl InMemoryCommentListStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a stored comment list
    pub async fn insert(&self, movie_id: MovieId, contents: Vec<u8>) {
        self.lists.lock().await.insert(movie_id, contents);
    }

    /// Currently stored bytes for `movie_id`
    pub async fn get(&self, movie_id: &MovieId) -> Option<Vec<u8>> {
        self.lists.lock().await.get(movie_id).cloned()
    }
}

#[async_trait]
impl CommentListStore for InMemoryCommentListStore {
    async fn load(&self, movie_id: &MovieId) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.get(movie_id).await)
    }

    async fn save(&self, movie_id: &MovieId, contents: &[u8]) -> Result<(), StoreError> {
        self.insert(movie_id.clone(), contents.to_vec()).await;
        Ok(())
    }
}
