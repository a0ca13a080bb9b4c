//! Server configuration, built once at startup and passed down explicitly.

use std::{path::PathBuf, time::Duration};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("max users must be at least 1")]
    NoViewerSlots,

    #[error("max frame length must be at least 1 byte")]
    ZeroFrameLength,

    #[error("idle timeout must be at least 1 second")]
    ZeroIdleTimeout,

    #[error("failed to create comment list directory {path}: {source}")]
    CommentListDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Startup configuration of the comment server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Registry capacity
    pub max_users: usize,
    /// Directory holding `<movieId>.xml`
    pub comment_list_dir: PathBuf,
    /// Close connections that send nothing for this long; `None` waits forever
    pub idle_timeout: Option<Duration>,
    pub max_frame_length: usize,
    /// Port of the diagnostics HTTP API, disabled when `None`
    pub admin_port: Option<u16>,
}

impl ServerConfig {
    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_users == 0 {
            return Err(ConfigError::NoViewerSlots);
        }
        if self.max_frame_length == 0 {
            return Err(ConfigError::ZeroFrameLength);
        }
        if self.idle_timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err(ConfigError::ZeroIdleTimeout);
        }
        Ok(())
    }

    /// Validate, then create the comment list directory if it is missing
    pub async fn prepare(&self) -> Result<(), ConfigError> {
        self.validate()?;
        tokio::fs::create_dir_all(&self.comment_list_dir)
            .await
            .map_err(|source| ConfigError::CommentListDir {
                path: self.comment_list_dir.clone(),
                source,
            })
    }
}
