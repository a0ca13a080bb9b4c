//! Message push trait.
//!
//! Broadcast delivery to viewers goes through this seam so the use cases do
//! not depend on how sinks are stored.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::MovieId;

/// Outbound queue of one connection; drained by that connection's writer task
pub type FrameSink = mpsc::UnboundedSender<String>;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessagePusher: Send + Sync {
    /// Deliver `content` to every viewer currently watching `movie_id`,
    /// including the sender.
    ///
    /// Delivery is fire-and-forget per recipient: a failed recipient is
    /// logged and skipped. Returns the number of recipients reached.
    async fn broadcast(&self, movie_id: &MovieId, content: &str) -> usize;
}
