//! Viewer registry: a fixed-capacity table of connection slots.
//!
//! Each slot binds a connection (its outbound sink) to the movie it watches.
//! The slot index is the connection's user id. Every operation takes the one
//! table-wide lock, so acquire/bind/release and enumeration never interleave.

use std::net::SocketAddr;

use thiserror::Error;
use tokio::sync::Mutex;

use crate::domain::{FrameSink, MovieId, SlotId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Expected under load; the connection is turned away
    #[error("all {capacity} viewer slots are in use")]
    Full { capacity: usize },

    #[error("slot {0} is not acquired")]
    NotAcquired(SlotId),

    #[error("slot {slot_id} is already bound to '{movie_id}'")]
    AlreadyBound { slot_id: SlotId, movie_id: MovieId },
}

/// Diagnostics view of an occupied slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotInfo {
    pub slot_id: SlotId,
    pub peer: Option<SocketAddr>,
}

#[derive(Debug, Default)]
struct Slot {
    /// `Some` while the slot is active
    sink: Option<FrameSink>,
    /// `Some` once attach has completed
    movie_id: Option<MovieId>,
    peer: Option<SocketAddr>,
}

impl Slot {
    fn is_active(&self) -> bool {
        self.sink.is_some()
    }

    fn watches(&self, movie_id: &MovieId) -> bool {
        self.is_active() && self.movie_id.as_ref() == Some(movie_id)
    }
}

#[derive(Debug)]
pub struct ViewerRegistry {
    capacity: usize,
    slots: Mutex<Vec<Slot>>,
}

impl ViewerRegistry {
    pub fn new(capacity: usize) -> Self {
        let slots = std::iter::repeat_with(Slot::default)
            .take(capacity)
            .collect();
        Self {
            capacity,
            slots: Mutex::new(slots),
        }
    }

    /// Take the lowest free slot for a new connection.
    ///
    /// The slot is active but not yet bound to a movie, so it receives no
    /// broadcasts until `bind`.
    pub async fn acquire(
        &self,
        sink: FrameSink,
        peer: Option<SocketAddr>,
    ) -> Result<SlotId, RegistryError> {
        let mut slots = self.slots.lock().await;
        let (index, slot) = slots
            .iter_mut()
            .enumerate()
            .find(|(_, slot)| !slot.is_active())
            .ok_or(RegistryError::Full {
                capacity: self.capacity,
            })?;

        slot.sink = Some(sink);
        slot.movie_id = None;
        slot.peer = peer;
        Ok(SlotId::new(index))
    }

    /// Record which movie an acquired slot is watching
    pub async fn bind(&self, slot_id: SlotId, movie_id: MovieId) -> Result<(), RegistryError> {
        let mut slots = self.slots.lock().await;
        let slot = active_slot(&mut slots, slot_id)?;
        if let Some(bound) = &slot.movie_id {
            return Err(RegistryError::AlreadyBound {
                slot_id,
                movie_id: bound.clone(),
            });
        }
        slot.movie_id = Some(movie_id);
        Ok(())
    }

    /// Movie an acquired slot is bound to, if any
    pub async fn bound_movie(&self, slot_id: SlotId) -> Result<Option<MovieId>, RegistryError> {
        let mut slots = self.slots.lock().await;
        Ok(active_slot(&mut slots, slot_id)?.movie_id.clone())
    }

    /// Return a slot to the free pool, dropping its sink.
    ///
    /// Returns the movie the slot was bound to.
    pub async fn release(&self, slot_id: SlotId) -> Result<Option<MovieId>, RegistryError> {
        let mut slots = self.slots.lock().await;
        let slot = active_slot(&mut slots, slot_id)?;
        let released = std::mem::take(slot);
        Ok(released.movie_id)
    }

    /// Call `deliver` for every active slot bound to `movie_id`, in slot order.
    ///
    /// `deliver` returns whether the delivery succeeded; the number of
    /// successful deliveries is returned.
    pub async fn for_each_watching<F>(&self, movie_id: &MovieId, mut deliver: F) -> usize
    where
        F: FnMut(SlotId, &FrameSink) -> bool,
    {
        let slots = self.slots.lock().await;
        let mut delivered = 0;
        for (index, slot) in slots.iter().enumerate() {
            let Some(sink) = slot.sink.as_ref().filter(|_| slot.watches(movie_id)) else {
                continue;
            };
            if deliver(SlotId::new(index), sink) {
                delivered += 1;
            }
        }
        delivered
    }

    /// Number of active slots bound to `movie_id`
    pub async fn active_count(&self, movie_id: &MovieId) -> usize {
        let slots = self.slots.lock().await;
        slots.iter().filter(|slot| slot.watches(movie_id)).count()
    }

    /// Slots bound to `movie_id`, in slot order
    pub async fn watchers(&self, movie_id: &MovieId) -> Vec<SlotInfo> {
        let slots = self.slots.lock().await;
        slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.watches(movie_id))
            .map(|(index, slot)| SlotInfo {
                slot_id: SlotId::new(index),
                peer: slot.peer,
            })
            .collect()
    }

}

#[cfg(test)]
impl ViewerRegistry {
    /// Number of active slots, bound or not
    pub async fn occupied(&self) -> usize {
        let slots = self.slots.lock().await;
        slots.iter().filter(|slot| slot.is_active()).count()
    }
}

fn active_slot(slots: &mut [Slot], slot_id: SlotId) -> Result<&mut Slot, RegistryError> {
    slots
        .get_mut(slot_id.index())
        .filter(|slot| slot.is_active())
        .ok_or(RegistryError::NotAcquired(slot_id))
}
