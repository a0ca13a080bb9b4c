//! Domain layer: value objects, the comment entity, and the seams the
//! infrastructure layer implements (storage and message pushing).

pub mod comment;
pub mod error;
pub mod message_pusher;
pub mod repository;
pub mod value_object;

pub use comment::{COMMENT_FIELD_COUNT, Comment};
pub use error::{CommentParseError, MovieIdError, StoreError};
pub use message_pusher::{FrameSink, MessagePusher};
pub use repository::CommentListStore;
pub use value_object::{MovieId, SlotId, Timestamp};

#[cfg(test)]
pub use message_pusher::MockMessagePusher;
#[cfg(test)]
pub use repository::MockCommentListStore;
