//! Server state shared by connection handlers.

use std::{sync::Arc, time::Duration};

use crate::usecase::{
    AttachViewerUseCase, DetachViewerUseCase, GetChannelDetailUseCase, GetChannelsUseCase,
    PostCommentUseCase,
};

/// Per-connection limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// Close a connection after this long without a frame; `None` waits forever
    pub idle_timeout: Option<Duration>,
    pub max_frame_length: usize,
}

/// Shared application state
pub struct AppState {
    /// AttachViewerUseCase（視聴者接続のユースケース）
    pub attach_viewer_usecase: Arc<AttachViewerUseCase>,
    /// PostCommentUseCase（コメント投稿のユースケース）
    pub post_comment_usecase: Arc<PostCommentUseCase>,
    /// DetachViewerUseCase（視聴者切断のユースケース）
    pub detach_viewer_usecase: Arc<DetachViewerUseCase>,
    /// GetChannelsUseCase（チャンネル一覧取得のユースケース）
    pub get_channels_usecase: Arc<GetChannelsUseCase>,
    /// GetChannelDetailUseCase（チャンネル詳細取得のユースケース）
    pub get_channel_detail_usecase: Arc<GetChannelDetailUseCase>,
    pub connection: ConnectionSettings,
}
