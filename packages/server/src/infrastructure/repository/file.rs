//! File-backed comment list store: one `<movieId>.xml` per movie.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::domain::{CommentListStore, MovieId, StoreError};

/// Stores each movie's comment list as `<dir>/<movieId>.xml`
#[derive(Debug, Clone)]
pub struct FileCommentListStore {
    dir: PathBuf,
}

impl FileCommentListStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, movie_id: &MovieId) -> PathBuf {
        self.dir.join(format!("{}.xml", movie_id))
    }

    fn temp_path_for(&self, movie_id: &MovieId) -> PathBuf {
        self.dir.join(format!(".{}.xml.tmp", movie_id))
    }
}

#[async_trait]
impl CommentListStore for FileCommentListStore {
    async fn load(&self, movie_id: &MovieId) -> Result<Option<Vec<u8>>, StoreError> {
        match tokio::fs::read(self.path_for(movie_id)).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Read {
                movie_id: movie_id.to_string(),
                source,
            }),
        }
    }

    async fn save(&self, movie_id: &MovieId, contents: &[u8]) -> Result<(), StoreError> {
        let write_error = |source| StoreError::Write {
            movie_id: movie_id.to_string(),
            source,
        };

        // Replace the file in one rename so a reader never sees a partial write
        let temp_path = self.temp_path_for(movie_id);
        tokio::fs::write(&temp_path, contents)
            .await
            .map_err(write_error)?;
        tokio::fs::rename(&temp_path, self.path_for(movie_id))
            .await
            .map_err(write_error)?;
        tracing::debug!(
            "Wrote {} bytes to {}",
            contents.len(),
            self.path_for(movie_id).display()
        );
        Ok(())
    }
}
