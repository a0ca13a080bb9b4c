//! UseCase 層のエラー型

use thiserror::Error;

use crate::{
    domain::CommentParseError,
    infrastructure::{DocumentError, HubError, RegistryError},
};

/// 視聴者接続時のエラー
#[derive(Debug, Error)]
pub enum AttachError {
    /// 全スロット使用中（高負荷時の想定内の状態）
    #[error("registry is full ({capacity} viewers)")]
    RegistryFull { capacity: usize },

    #[error(transparent)]
    Registry(RegistryError),

    #[error("failed to render snapshot: {0}")]
    Document(#[from] DocumentError),
}

impl From<RegistryError> for AttachError {
    fn from(error: RegistryError) -> Self {
        match error {
            RegistryError::Full { capacity } => Self::RegistryFull { capacity },
            other => Self::Registry(other),
        }
    }
}

impl From<HubError> for AttachError {
    fn from(error: HubError) -> Self {
        match error {
            HubError::Registry(e) => e.into(),
            HubError::Document(e) => Self::Document(e),
        }
    }
}

/// コメント投稿時のエラー
#[derive(Debug, Error)]
pub enum PostCommentError {
    /// フィールド数が合わないフレーム（破棄して接続は継続）
    #[error("malformed comment: {0}")]
    Malformed(#[from] CommentParseError),

    #[error("failed to render comment: {0}")]
    Document(#[from] DocumentError),
}

/// チャンネル詳細取得時のエラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GetChannelDetailError {
    #[error("invalid movie id")]
    InvalidMovieId,

    #[error("channel not found")]
    ChannelNotFound,
}
