//! Channel hub: per-movie channel lifecycle.
//!
//! A movie's channel is loaded from the store when its first viewer attaches
//! and written back (then discarded) when its last viewer detaches. Each movie
//! has its own lifecycle lock, so opening or persisting one movie never blocks
//! another.
//!
//! Lock order is lifecycle entry, then channel document, then registry table.
//! The registry lock is never held while waiting for another lock.

use std::{collections::HashMap, sync::Arc};

use sajiki_shared::time::Clock;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::domain::{CommentListStore, MovieId, SlotId, Timestamp};

use super::{
    channel::CommentChannel,
    document::{CommentDocument, DocumentError},
    registry::{RegistryError, SlotInfo, ViewerRegistry},
};

/// `Some` while the movie has at least one attached viewer
type LifecycleEntry = Arc<Mutex<Option<Arc<CommentChannel>>>>;

#[derive(Debug, Error)]
pub enum HubError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("failed to render snapshot: {0}")]
    Document(#[from] DocumentError),
}

/// Result of a successful attach
#[derive(Debug)]
pub struct AttachedChannel {
    pub channel: Arc<CommentChannel>,
    /// Serialized channel with `elapsedTime`, to be sent to the new viewer
    pub snapshot: String,
    /// Milliseconds since the channel was created
    pub elapsed: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetachOutcome {
    /// Movie the slot was bound to, `None` if it never finished attaching
    pub movie_id: Option<MovieId>,
    /// Whether this detach wrote the channel back to the store
    pub persisted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSummary {
    pub movie_id: MovieId,
    pub created_at: Timestamp,
    pub viewers: usize,
    pub comments: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelDetail {
    pub summary: ChannelSummary,
    pub slots: Vec<SlotInfo>,
}

pub struct ChannelHub {
    registry: Arc<ViewerRegistry>,
    store: Arc<dyn CommentListStore>,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<MovieId, LifecycleEntry>>,
}

impl ChannelHub {
    pub fn new(
        registry: Arc<ViewerRegistry>,
        store: Arc<dyn CommentListStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            store,
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &Arc<ViewerRegistry> {
        &self.registry
    }

    /// Bind an acquired slot to `movie_id` and render its snapshot.
    ///
    /// Opens the channel if this is the movie's first viewer. The snapshot is
    /// rendered under the same document lock as the bind, so every comment is
    /// either in the snapshot or broadcast to the new viewer afterwards.
    pub async fn attach(
        &self,
        slot_id: SlotId,
        movie_id: &MovieId,
    ) -> Result<AttachedChannel, HubError> {
        let entry = self.entry(movie_id).await;
        let result = {
            let mut current = entry.lock().await;
            let channel = match current.as_ref() {
                Some(channel) => channel.clone(),
                None => {
                    let channel = Arc::new(self.open(movie_id).await);
                    *current = Some(channel.clone());
                    channel
                }
            };

            let result = self.bind_and_render(slot_id, &channel).await;
            if result.is_err() && self.registry.active_count(movie_id).await == 0 {
                // Nobody is watching a channel we just opened
                current.take();
            }
            result.map(|(snapshot, elapsed)| AttachedChannel {
                channel,
                snapshot,
                elapsed,
            })
        };
        self.prune(movie_id, &entry).await;
        result
    }

    async fn bind_and_render(
        &self,
        slot_id: SlotId,
        channel: &CommentChannel,
    ) -> Result<(String, i64), HubError> {
        let document = channel.lock().await;
        self.registry
            .bind(slot_id, channel.movie_id().clone())
            .await?;
        let now = Timestamp::new(self.clock.now_millis());
        let elapsed = channel.created_at().elapsed_until(now);
        let snapshot = document.render_snapshot(elapsed)?;
        Ok((snapshot, elapsed))
    }

    /// Load the stored comment list, or start a fresh one.
    ///
    /// A fresh skeleton is written only when nothing is stored yet; an
    /// unreadable file is left in place until the channel is persisted.
    async fn open(&self, movie_id: &MovieId) -> CommentChannel {
        let now = Timestamp::new(self.clock.now_millis());
        let document = match self.store.load(movie_id).await {
            Ok(Some(bytes)) => match CommentDocument::parse(&bytes) {
                Ok(document) => {
                    tracing::info!(
                        "Opened comment list for '{}' ({} comments)",
                        movie_id,
                        document.comment_count()
                    );
                    document
                }
                Err(e) => {
                    tracing::error!(
                        "Comment list for '{}' is unreadable, starting fresh: {}",
                        movie_id,
                        e
                    );
                    CommentDocument::new(now)
                }
            },
            Ok(None) => {
                let document = CommentDocument::new(now);
                match document.to_bytes() {
                    Ok(bytes) => {
                        if let Err(e) = self.store.save(movie_id, &bytes).await {
                            tracing::error!("Failed to create comment list: {}", e);
                        }
                    }
                    Err(e) => tracing::error!("Failed to render comment list: {}", e),
                }
                tracing::info!("Created comment list for '{}'", movie_id);
                document
            }
            Err(e) => {
                tracing::error!("{}, starting fresh", e);
                CommentDocument::new(now)
            }
        };
        CommentChannel::new(movie_id.clone(), document)
    }

    /// Release a slot; when it was the movie's last viewer, persist and
    /// discard the channel.
    ///
    /// A failed persist is logged and the history is lost.
    pub async fn detach(&self, slot_id: SlotId) -> Result<DetachOutcome, HubError> {
        let Some(movie_id) = self.registry.bound_movie(slot_id).await? else {
            self.registry.release(slot_id).await?;
            return Ok(DetachOutcome {
                movie_id: None,
                persisted: false,
            });
        };

        let entry = self.entry(&movie_id).await;
        let persisted = {
            let mut current = entry.lock().await;
            self.registry.release(slot_id).await?;
            let last_viewer = self.registry.active_count(&movie_id).await == 0;
            match current.take_if(|_| last_viewer) {
                Some(channel) => self.persist(&channel).await,
                None => false,
            }
        };
        self.prune(&movie_id, &entry).await;

        Ok(DetachOutcome {
            movie_id: Some(movie_id),
            persisted,
        })
    }

    async fn persist(&self, channel: &CommentChannel) -> bool {
        match channel.persist(self.store.as_ref()).await {
            Ok(()) => {
                tracing::info!("Persisted comment list for '{}'", channel.movie_id());
                true
            }
            Err(e) => {
                tracing::error!(
                    "Failed to persist comment list for '{}': {}",
                    channel.movie_id(),
                    e
                );
                false
            }
        }
    }

    /// Write every live channel to the store, leaving them live.
    ///
    /// Returns the number of channels written.
    pub async fn persist_all(&self) -> usize {
        let mut persisted = 0;
        for entry in self.snapshot_entries().await {
            let current = entry.lock().await;
            if let Some(channel) = current.as_ref()
                && self.persist(channel).await
            {
                persisted += 1;
            }
        }
        self.sweep().await;
        persisted
    }

    /// Live channels sorted by movie id
    pub async fn live_channels(&self) -> Vec<ChannelSummary> {
        let mut summaries = Vec::new();
        for entry in self.snapshot_entries().await {
            let channel = entry.lock().await.clone();
            if let Some(channel) = channel {
                summaries.push(self.summarize(&channel).await);
            }
        }
        summaries.sort_by(|a, b| a.movie_id.cmp(&b.movie_id));
        self.sweep().await;
        summaries
    }

    pub async fn channel_detail(&self, movie_id: &MovieId) -> Option<ChannelDetail> {
        let channel = {
            let entry = self.entries.lock().await.get(movie_id).cloned()?;
            entry.lock().await.clone()
        };
        self.sweep().await;
        let channel = channel?;
        Some(ChannelDetail {
            summary: self.summarize(&channel).await,
            slots: self.registry.watchers(movie_id).await,
        })
    }

    async fn summarize(&self, channel: &CommentChannel) -> ChannelSummary {
        ChannelSummary {
            movie_id: channel.movie_id().clone(),
            created_at: channel.created_at(),
            viewers: self.registry.active_count(channel.movie_id()).await,
            comments: channel.comment_count().await,
        }
    }

    async fn entry(&self, movie_id: &MovieId) -> LifecycleEntry {
        self.entries
            .lock()
            .await
            .entry(movie_id.clone())
            .or_default()
            .clone()
    }

    async fn snapshot_entries(&self) -> Vec<LifecycleEntry> {
        self.entries.lock().await.values().cloned().collect()
    }

    /// Drop an idle lifecycle entry nobody else holds
    async fn prune(&self, movie_id: &MovieId, entry: &LifecycleEntry) {
        let mut entries = self.entries.lock().await;
        // One reference in the map, one held by the caller
        if is_idle(entry, 2) {
            entries.remove(movie_id);
        }
    }

    /// Drop every idle entry a concurrent `prune` had to skip while
    /// diagnostics held a clone of it
    async fn sweep(&self) {
        self.entries
            .lock()
            .await
            .retain(|_, entry| !is_idle(entry, 1));
    }
}

fn is_idle(entry: &LifecycleEntry, holders: usize) -> bool {
    Arc::strong_count(entry) == holders && entry.try_lock().is_ok_and(|current| current.is_none())
}
