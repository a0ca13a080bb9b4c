//! Broadcast dispatcher over the viewer registry.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{MessagePusher, MovieId};

use super::super::registry::ViewerRegistry;

/// Pushes a rendered comment into the sink of every slot watching a movie
pub struct RegistryMessagePusher {
    registry: Arc<ViewerRegistry>,
}

impl RegistryMessagePusher {
    pub fn new(registry: Arc<ViewerRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl MessagePusher for RegistryMessagePusher {
    async fn broadcast(&self, movie_id: &MovieId, content: &str) -> usize {
        self.registry
            .for_each_watching(movie_id, |slot_id, sink| {
                // A closed sink means that viewer's connection is going away;
                // its own loop cleans up the slot.
                match sink.send(content.to_string()) {
                    Ok(()) => {
                        tracing::debug!("User ID {} received a comment on '{}'", slot_id, movie_id);
                        true
                    }
                    Err(e) => {
                        tracing::warn!("Failed to push comment to user ID {}: {}", slot_id, e);
                        false
                    }
                }
            })
            .await
    }
}
