//! UseCase 層
//!
//! ビジネスロジックを実装する層。
//! Domain 層のトレイト（`MessagePusher`, `CommentListStore`）と
//! Infrastructure 層のチャンネル管理（`ChannelHub`）を組み合わせて、
//! 接続・コメント投稿・切断の各処理を提供する。

pub mod attach_viewer;
pub mod detach_viewer;
pub mod error;
pub mod get_channels;
pub mod post_comment;

pub use attach_viewer::{AttachViewerUseCase, AttachedViewer};
pub use detach_viewer::DetachViewerUseCase;
pub use error::{AttachError, GetChannelDetailError, PostCommentError};
pub use get_channels::{GetChannelDetailUseCase, GetChannelsUseCase};
pub use post_comment::PostCommentUseCase;
