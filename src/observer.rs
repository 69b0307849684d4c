//! Screen-lifetime observers: re-run the active query on each relevant
//! commit and emit a minimal snapshot transition.
//!
//! An observer owns its subscription; dropping the observer (screen torn
//! down) cancels it. Fetch failures are logged once and the previous
//! snapshot is kept; nothing is retried.

use std::collections::HashSet;

use crate::error::PersistenceError;
use crate::model::{PhotoId, TripId};
use crate::notify::{StoreEvent, SubscriptionHandle};
use crate::query::TripQuery;
use crate::snapshot::{self, Snapshot, SnapshotTransition, TripGridSection};
use crate::store::Store;

/// Drives the trip grid: one flat section ordered by the active query.
pub struct TripListObserver {
    store: Store,
    query: TripQuery,
    subscription: SubscriptionHandle,
    current: Vec<TripId>,
}

impl TripListObserver {
    pub fn new(store: &Store, query: TripQuery) -> Result<Self, PersistenceError> {
        let subscription = store.subscribe();
        let current = store.trip_ids(&query)?;
        Ok(Self {
            store: store.clone(),
            query,
            subscription,
            current,
        })
    }

    pub fn query(&self) -> &TripQuery {
        &self.query
    }

    /// Identifiers currently on screen, in render order.
    pub fn trip_ids(&self) -> &[TripId] {
        &self.current
    }

    pub fn snapshot(&self) -> Snapshot<TripGridSection, TripId> {
        snapshot::trip_grid_snapshot(&self.current)
    }

    /// Swap the active filter (search-as-you-type, category tabs) and
    /// re-fetch immediately.
    pub fn set_query(
        &mut self,
        query: TripQuery,
    ) -> Result<SnapshotTransition<TripId>, PersistenceError> {
        self.query = query;
        let fresh = self.store.trip_ids(&self.query)?;
        let diff = snapshot::transition(&self.current, &fresh, &HashSet::new());
        self.current = fresh;
        Ok(diff)
    }

    /// Drain commit notifications; when any touched trips, re-evaluate the
    /// query and diff against what is on screen. Returns `None` when there
    /// is nothing to animate.
    pub fn poll(&mut self) -> Option<SnapshotTransition<TripId>> {
        let mut relevant = false;
        let mut changed: HashSet<TripId> = HashSet::new();
        while let Some(event) = self.subscription.try_recv() {
            if let StoreEvent::Saved(changes) = event {
                if !changes.trips.is_empty() {
                    relevant = true;
                    changed.extend(changes.trips.updated.iter().copied());
                }
            }
        }
        if !relevant {
            return None;
        }

        let fresh = match self.store.trip_ids(&self.query) {
            Ok(ids) => ids,
            Err(err) => {
                tracing::error!("trip list fetch failed: {err}");
                return None;
            }
        };
        let diff = snapshot::transition(&self.current, &fresh, &changed);
        self.current = fresh;
        if diff.is_empty() {
            None
        } else {
            Some(diff)
        }
    }
}

/// Drives one trip's photo strip, in insertion order.
pub struct TripPhotosObserver {
    store: Store,
    trip_id: TripId,
    subscription: SubscriptionHandle,
    current: Vec<PhotoId>,
}

impl TripPhotosObserver {
    pub fn new(store: &Store, trip_id: TripId) -> Result<Self, PersistenceError> {
        let subscription = store.subscribe();
        let current = store.photo_ids_for_trip(trip_id)?;
        Ok(Self {
            store: store.clone(),
            trip_id,
            subscription,
            current,
        })
    }

    pub fn trip_id(&self) -> TripId {
        self.trip_id
    }

    pub fn photo_ids(&self) -> &[PhotoId] {
        &self.current
    }

    pub fn poll(&mut self) -> Option<SnapshotTransition<PhotoId>> {
        let mut relevant = false;
        let mut changed: HashSet<PhotoId> = HashSet::new();
        while let Some(event) = self.subscription.try_recv() {
            if let StoreEvent::Saved(changes) = event {
                if !changes.photos.is_empty()
                    || changes.trips.deleted.contains(&self.trip_id)
                    || changes.trips.updated.contains(&self.trip_id)
                {
                    relevant = true;
                    changed.extend(changes.photos.updated.iter().copied());
                }
            }
        }
        if !relevant {
            return None;
        }

        let fresh = match self.store.photo_ids_for_trip(self.trip_id) {
            Ok(ids) => ids,
            Err(err) => {
                tracing::error!(trip = %self.trip_id, "photo list fetch failed: {err}");
                return None;
            }
        };
        let diff = snapshot::transition(&self.current, &fresh, &changed);
        self.current = fresh;
        if diff.is_empty() {
            None
        } else {
            Some(diff)
        }
    }
}
