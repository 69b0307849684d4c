//! Subscriptions that republish store commits to displaying screens.

use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::model::{LocationId, PhotoId, TripId};

/// Events a subscriber can buffer before it is dropped as too slow.
const SUBSCRIPTION_BUFFER: usize = 64;

/// Identifier changes of one entity kind produced by a single save.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityChanges<I> {
    pub inserted: Vec<I>,
    pub updated: Vec<I>,
    pub deleted: Vec<I>,
}

impl<I> Default for EntityChanges<I> {
    fn default() -> Self {
        Self {
            inserted: Vec::new(),
            updated: Vec::new(),
            deleted: Vec::new(),
        }
    }
}

impl<I> EntityChanges<I> {
    pub fn is_empty(&self) -> bool {
        self.inserted.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }
}

/// Everything one durable commit changed, by stable identifier.
///
/// A trip whose photo set or location changed is listed as updated even when
/// none of its own attributes moved, so list cells showing derived content
/// (cover thumbnail, location name) get reconfigured.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    pub trips: EntityChanges<TripId>,
    pub photos: EntityChanges<PhotoId>,
    pub locations: EntityChanges<LocationId>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.trips.is_empty() && self.photos.is_empty() && self.locations.is_empty()
    }
}

/// Why a subscription stopped receiving events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The subscriber stopped draining its channel.
    BufferOverflow,
    /// The handle was released.
    Unsubscribed,
}

/// Event delivered to subscribers.
#[derive(Debug, Clone)]
pub enum StoreEvent {
    /// A context was saved to durable storage.
    Saved(ChangeSet),
    /// The subscription ended; no further events follow.
    Dropped { reason: DropReason },
}

#[derive(Default)]
struct HubInner {
    subscriptions: RwLock<HashMap<u64, Sender<StoreEvent>>>,
    next_id: AtomicU64,
}

/// Broadcasts store events to all live subscriptions.
#[derive(Clone, Default)]
pub(crate) struct SubscriptionHub {
    inner: Arc<HubInner>,
}

impl SubscriptionHub {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn subscribe(&self) -> SubscriptionHandle {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        let (sender, receiver) = bounded(SUBSCRIPTION_BUFFER);
        self.inner.subscriptions.write().insert(id, sender);
        SubscriptionHandle {
            id,
            receiver,
            hub: self.clone(),
        }
    }

    fn unsubscribe(&self, id: u64) {
        let mut subscriptions = self.inner.subscriptions.write();
        if let Some(sender) = subscriptions.remove(&id) {
            let _ = sender.try_send(StoreEvent::Dropped {
                reason: DropReason::Unsubscribed,
            });
        }
    }

    /// Deliver an event to every subscription. Subscribers whose buffer is
    /// full are dropped rather than blocking the saving context.
    pub(crate) fn broadcast(&self, event: StoreEvent) {
        let mut to_remove = Vec::new();

        {
            let subscriptions = self.inner.subscriptions.read();
            for (id, sender) in subscriptions.iter() {
                if sender.try_send(event.clone()).is_err() {
                    to_remove.push(*id);
                }
            }
        }

        if !to_remove.is_empty() {
            let mut subscriptions = self.inner.subscriptions.write();
            for id in to_remove {
                if let Some(sender) = subscriptions.remove(&id) {
                    let _ = sender.try_send(StoreEvent::Dropped {
                        reason: DropReason::BufferOverflow,
                    });
                }
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn subscription_count(&self) -> usize {
        self.inner.subscriptions.read().len()
    }
}

/// Receiving side of a subscription. Lives for the lifetime of a displaying
/// screen; dropping the handle cancels the subscription.
pub struct SubscriptionHandle {
    id: u64,
    receiver: Receiver<StoreEvent>,
    hub: SubscriptionHub,
}

impl SubscriptionHandle {
    /// Drain without blocking. Returns `None` when no event is pending.
    pub fn try_recv(&self) -> Option<StoreEvent> {
        self.receiver.try_recv().ok()
    }

    /// Block until an event arrives or the timeout elapses.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<StoreEvent> {
        self.receiver.recv_timeout(timeout).ok()
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.hub.unsubscribe(self.id);
    }
}
