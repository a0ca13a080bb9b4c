//! Comment channel: one movie's shared, lock-guarded comment history.

use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};

use crate::domain::{CommentListStore, MovieId, StoreError, Timestamp};
#[cfg(test)]
use crate::domain::Comment;

use super::document::{CommentDocument, DocumentError};

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Comment history of one movie, shared by every viewer attached to it.
///
/// All reads and writes of the document go through one lock, so a snapshot
/// or a persist never observes half of an append.
#[derive(Debug)]
pub struct CommentChannel {
    movie_id: MovieId,
    created_at: Timestamp,
    document: Mutex<CommentDocument>,
}

impl CommentChannel {
    pub fn new(movie_id: MovieId, document: CommentDocument) -> Self {
        Self {
            movie_id,
            created_at: document.created_at(),
            document: Mutex::new(document),
        }
    }

    pub fn movie_id(&self) -> &MovieId {
        &self.movie_id
    }

    /// Creation time, fixed when the comment list was first created
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Lock the document for a sequence of operations that must not
    /// interleave with other appends (e.g. append then broadcast).
    pub async fn lock(&self) -> MutexGuard<'_, CommentDocument> {
        self.document.lock().await
    }

    pub async fn comment_count(&self) -> usize {
        self.lock().await.comment_count()
    }

    /// Replace the stored comment list with this channel's contents
    pub async fn persist(&self, store: &dyn CommentListStore) -> Result<(), ChannelError> {
        let document = self.lock().await;
        let bytes = document.to_bytes()?;
        store.save(&self.movie_id, &bytes).await?;
        Ok(())
    }
}

#[cfg(test)]
impl CommentChannel {
    pub async fn append(&self, comment: &Comment) {
        self.lock().await.append(comment);
    }

    pub async fn comments(&self) -> Vec<Comment> {
        self.lock().await.comments()
    }

    pub async fn render_snapshot(&self, now: Timestamp) -> Result<String, DocumentError> {
        self.lock()
            .await
            .render_snapshot(self.created_at.elapsed_until(now))
    }
}
