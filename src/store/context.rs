//! Editing contexts: isolated transactional workspaces over the store.
//!
//! A context stages creations, updates, and deletions in memory; nothing is
//! visible elsewhere until [`Store::save`](super::Store::save) commits it.
//! Child contexts layer on top of a parent's pending state and fold back
//! into it on merge, so a presented editor screen can be cancelled without
//! disturbing what the presenting screen has staged.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use super::{committed_location_for_trip, committed_photos_for_trip, committed_trip, StoreInner};
use crate::error::PersistenceError;
use crate::model::{
    now_ts, Location, Photo, PhotoId, PlaceSelection, Trip, TripCategory, TripId,
};

/// Everything a context has staged but not yet committed.
#[derive(Debug, Clone, Default)]
pub(crate) struct PendingChanges {
    pub(crate) trips: BTreeMap<i64, Trip>,
    pub(crate) photos: BTreeMap<i64, Photo>,
    pub(crate) locations: BTreeMap<i64, Location>,
    pub(crate) created_trips: BTreeSet<i64>,
    pub(crate) created_photos: BTreeSet<i64>,
    pub(crate) created_locations: BTreeSet<i64>,
    pub(crate) deleted_trips: BTreeSet<i64>,
    pub(crate) deleted_photos: BTreeSet<i64>,
    pub(crate) deleted_locations: BTreeSet<i64>,
}

impl PendingChanges {
    pub(crate) fn is_empty(&self) -> bool {
        self.trips.is_empty()
            && self.photos.is_empty()
            && self.locations.is_empty()
            && self.deleted_trips.is_empty()
            && self.deleted_photos.is_empty()
            && self.deleted_locations.is_empty()
    }

    fn stage_trip(&mut self, trip: Trip, created: bool) {
        let id = trip.id.0;
        self.deleted_trips.remove(&id);
        if created {
            self.created_trips.insert(id);
        }
        self.trips.insert(id, trip);
    }

    fn stage_photo(&mut self, photo: Photo, created: bool) {
        let id = photo.id.0;
        self.deleted_photos.remove(&id);
        if created {
            self.created_photos.insert(id);
        }
        self.photos.insert(id, photo);
    }

    fn stage_location(&mut self, location: Location, created: bool) {
        let id = location.id.0;
        self.deleted_locations.remove(&id);
        if created {
            self.created_locations.insert(id);
        }
        self.locations.insert(id, location);
    }

    /// A record created in this overlay and then deleted never reaches
    /// durable storage; it is forgotten rather than marked.
    fn delete_photo(&mut self, id: i64) {
        self.photos.remove(&id);
        if !self.created_photos.remove(&id) {
            self.deleted_photos.insert(id);
        }
    }

    fn delete_location(&mut self, id: i64) {
        self.locations.remove(&id);
        if !self.created_locations.remove(&id) {
            self.deleted_locations.insert(id);
        }
    }

    fn delete_trip(&mut self, id: i64) {
        let staged_photo_ids: Vec<i64> = self
            .photos
            .values()
            .filter(|photo| photo.trip_id.0 == id)
            .map(|photo| photo.id.0)
            .collect();
        for photo_id in staged_photo_ids {
            self.delete_photo(photo_id);
        }
        let staged_location_ids: Vec<i64> = self
            .locations
            .values()
            .filter(|location| location.trip_id.0 == id)
            .map(|location| location.id.0)
            .collect();
        for location_id in staged_location_ids {
            self.delete_location(location_id);
        }
        self.trips.remove(&id);
        if !self.created_trips.remove(&id) {
            self.deleted_trips.insert(id);
        }
    }

    /// Fold another overlay's changes on top of this one. Identifiers are
    /// never reused, so each id carries exactly one terminal operation.
    pub(crate) fn absorb(&mut self, other: PendingChanges) {
        let PendingChanges {
            trips,
            photos,
            locations,
            created_trips,
            created_photos,
            created_locations,
            deleted_trips,
            deleted_photos,
            deleted_locations,
        } = other;
        for id in deleted_trips {
            self.delete_trip(id);
        }
        for id in deleted_photos {
            self.delete_photo(id);
        }
        for id in deleted_locations {
            self.delete_location(id);
        }
        for (id, trip) in trips {
            self.stage_trip(trip, created_trips.contains(&id));
        }
        for (id, photo) in photos {
            self.stage_photo(photo, created_photos.contains(&id));
        }
        for (id, location) in locations {
            self.stage_location(location, created_locations.contains(&id));
        }
    }
}

/// An isolated editing workspace. Reads see committed state with this
/// context's (and its parent lineage's) pending changes overlaid.
pub struct EditContext {
    store: Arc<StoreInner>,
    base: PendingChanges,
    pending: PendingChanges,
}

impl EditContext {
    pub(crate) fn new(store: Arc<StoreInner>) -> Self {
        Self {
            store,
            base: PendingChanges::default(),
            pending: PendingChanges::default(),
        }
    }

    /// Fork a child context whose reads see this context's pending state.
    /// Fold it back with [`EditContext::merge`], or drop it to discard.
    pub fn child(&self) -> EditContext {
        EditContext {
            store: self.store.clone(),
            base: self.effective_pending(),
            pending: PendingChanges::default(),
        }
    }

    /// Fold a child's staged changes into this context without touching
    /// durable storage.
    pub fn merge(&mut self, child: EditContext) {
        self.pending.absorb(child.pending);
    }

    /// Discard this context's own staged changes. The parent lineage's
    /// state is unaffected.
    pub fn rollback(&mut self) {
        self.pending = PendingChanges::default();
    }

    pub fn has_changes(&self) -> bool {
        !self.pending.is_empty()
    }

    pub(crate) fn effective_pending(&self) -> PendingChanges {
        let mut effective = self.base.clone();
        effective.absorb(self.pending.clone());
        effective
    }

    pub(crate) fn clear(&mut self) {
        self.base = PendingChanges::default();
        self.pending = PendingChanges::default();
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Stage a new trip with default title and dates.
    pub fn new_trip(&mut self) -> Trip {
        let now = now_ts();
        let trip = Trip {
            id: self.store.ids.next_trip(),
            title: "New Trip".to_string(),
            notes: String::new(),
            creation_date: now,
            start_date: now,
            end_date: now,
            is_favorite: false,
            category: TripCategory::Solo,
        };
        self.pending.stage_trip(trip.clone(), true);
        trip
    }

    /// Stage the current attribute values of a trip.
    pub fn update_trip(&mut self, trip: &Trip) {
        self.pending.stage_trip(trip.clone(), false);
    }

    /// Stage deletion of a trip. Its photos and location go with it.
    pub fn delete_trip(&mut self, id: TripId) {
        self.pending.delete_trip(id.0);
    }

    /// Stage a photo picked for a trip. Photos keep their insertion order
    /// through `added_date`.
    pub fn add_photo(
        &mut self,
        trip_id: TripId,
        data: Vec<u8>,
        thumbnail: Vec<u8>,
        asset_identifier: Option<String>,
    ) -> Photo {
        let photo = Photo {
            id: self.store.ids.next_photo(),
            trip_id,
            data,
            thumbnail,
            asset_identifier,
            added_date: now_ts(),
        };
        self.pending.stage_photo(photo.clone(), true);
        photo
    }

    pub fn remove_photo(&mut self, id: PhotoId) {
        self.pending.delete_photo(id.0);
    }

    /// Stage a confirmed place-search result as the trip's location,
    /// replacing any previous one.
    pub fn set_location(
        &mut self,
        trip_id: TripId,
        place: PlaceSelection,
    ) -> Result<Location, PersistenceError> {
        if let Some(current) = self.location_for_trip(trip_id)? {
            self.pending.delete_location(current.id.0);
        }
        let location = Location {
            id: self.store.ids.next_location(),
            trip_id,
            name: place.name,
            latitude: place.latitude,
            longitude: place.longitude,
            formatted_address: place.formatted_address,
        };
        self.pending.stage_location(location.clone(), true);
        Ok(location)
    }

    /// Stage removal of the trip's location, if it has one.
    pub fn clear_location(&mut self, trip_id: TripId) -> Result<(), PersistenceError> {
        if let Some(current) = self.location_for_trip(trip_id)? {
            self.pending.delete_location(current.id.0);
        }
        Ok(())
    }

    // ========================================================================
    // Overlay reads
    // ========================================================================

    fn trip_deleted(&self, id: i64) -> bool {
        self.pending.deleted_trips.contains(&id) || self.base.deleted_trips.contains(&id)
    }

    fn photo_deleted(&self, id: i64) -> bool {
        self.pending.deleted_photos.contains(&id) || self.base.deleted_photos.contains(&id)
    }

    fn location_deleted(&self, id: i64) -> bool {
        self.pending.deleted_locations.contains(&id) || self.base.deleted_locations.contains(&id)
    }

    pub fn trip(&self, id: TripId) -> Result<Option<Trip>, PersistenceError> {
        if self.trip_deleted(id.0) {
            return Ok(None);
        }
        if let Some(trip) = self.pending.trips.get(&id.0) {
            return Ok(Some(trip.clone()));
        }
        if let Some(trip) = self.base.trips.get(&id.0) {
            return Ok(Some(trip.clone()));
        }
        let conn = self.store.conn.lock();
        committed_trip(&conn, id)
    }

    /// Photos of a trip in insertion order, pending changes included.
    pub fn photos_for_trip(&self, trip_id: TripId) -> Result<Vec<Photo>, PersistenceError> {
        if self.trip_deleted(trip_id.0) {
            return Ok(Vec::new());
        }
        let committed = {
            let conn = self.store.conn.lock();
            committed_photos_for_trip(&conn, trip_id)?
        };
        let mut merged: BTreeMap<i64, Photo> =
            committed.into_iter().map(|photo| (photo.id.0, photo)).collect();
        for photo in self.base.photos.values() {
            merged.insert(photo.id.0, photo.clone());
        }
        for photo in self.pending.photos.values() {
            merged.insert(photo.id.0, photo.clone());
        }
        let mut photos: Vec<Photo> = merged
            .into_values()
            .filter(|photo| photo.trip_id == trip_id && !self.photo_deleted(photo.id.0))
            .collect();
        photos.sort_by(|a, b| {
            a.added_date
                .cmp(&b.added_date)
                .then(a.id.0.cmp(&b.id.0))
        });
        Ok(photos)
    }

    pub fn photo_ids_for_trip(&self, trip_id: TripId) -> Result<Vec<PhotoId>, PersistenceError> {
        Ok(self
            .photos_for_trip(trip_id)?
            .into_iter()
            .map(|photo| photo.id)
            .collect())
    }

    pub fn location_for_trip(&self, trip_id: TripId) -> Result<Option<Location>, PersistenceError> {
        if self.trip_deleted(trip_id.0) {
            return Ok(None);
        }
        if let Some(location) = self
            .pending
            .locations
            .values()
            .find(|location| location.trip_id == trip_id)
        {
            return Ok(Some(location.clone()));
        }
        if let Some(location) = self
            .base
            .locations
            .values()
            .find(|location| location.trip_id == trip_id && !self.location_deleted(location.id.0))
        {
            return Ok(Some(location.clone()));
        }
        let committed = {
            let conn = self.store.conn.lock();
            committed_location_for_trip(&conn, trip_id)?
        };
        Ok(committed.filter(|location| !self.location_deleted(location.id.0)))
    }

    /// Asset identifiers of every photo already attached to the trip, in
    /// insertion order. The host hands these to the picker so previously
    /// imported images show up pre-selected.
    pub fn asset_identifiers_for_trip(
        &self,
        trip_id: TripId,
    ) -> Result<Vec<String>, PersistenceError> {
        Ok(self
            .photos_for_trip(trip_id)?
            .into_iter()
            .filter_map(|photo| photo.asset_identifier)
            .collect())
    }
}
