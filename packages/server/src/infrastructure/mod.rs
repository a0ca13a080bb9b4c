//! Infrastructure layer: the comment document, per-movie channels, the viewer
//! registry, and implementations of the domain seams.

pub mod channel;
pub mod channel_hub;
pub mod document;
pub mod dto;
pub mod message_pusher;
pub mod registry;
pub mod repository;

pub use channel::{ChannelError, CommentChannel};
pub use channel_hub::{
    AttachedChannel, ChannelDetail, ChannelHub, ChannelSummary, DetachOutcome, HubError,
};
pub use document::{CommentDocument, DocumentError};
pub use registry::{RegistryError, SlotInfo, ViewerRegistry};
