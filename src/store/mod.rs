//! Embedded record store for trips, photos, and locations.
//!
//! Committed state lives in a local SQLite file. Mutations are staged in an
//! [`EditContext`] and written in a single transaction by [`Store::save`],
//! which then broadcasts one change notification to subscribers.

mod schema;
pub mod context;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use crate::error::PersistenceError;
use crate::model::{
    format_ts, parse_ts, Location, LocationId, Photo, PhotoId, Trip, TripCategory, TripId,
};
use crate::notify::{ChangeSet, EntityChanges, StoreEvent, SubscriptionHandle, SubscriptionHub};
use crate::query::TripQuery;

pub use context::EditContext;
pub use schema::{MIGRATIONS, SCHEMA};

const TRIP_COLUMNS: &str = "id, title, notes, creation_date, start_date, end_date, is_favorite, category";
const PHOTO_COLUMNS: &str = "id, trip_id, data, thumbnail, asset_identifier, added_date";
const LOCATION_COLUMNS: &str = "id, trip_id, name, latitude, longitude, formatted_address";

/// Hands out identifiers that are stable before and after commit. Seeded
/// from the durable maximum so reopening a store never reuses an id.
pub(crate) struct IdAllocator {
    trips: AtomicI64,
    photos: AtomicI64,
    locations: AtomicI64,
}

impl IdAllocator {
    fn new() -> Self {
        Self {
            trips: AtomicI64::new(0),
            photos: AtomicI64::new(0),
            locations: AtomicI64::new(0),
        }
    }

    fn seed(&self, conn: &Connection) -> Result<(), rusqlite::Error> {
        let max_trip: i64 = conn.query_row("SELECT COALESCE(MAX(id), 0) FROM trips", [], |row| row.get(0))?;
        let max_photo: i64 = conn.query_row("SELECT COALESCE(MAX(id), 0) FROM photos", [], |row| row.get(0))?;
        let max_location: i64 =
            conn.query_row("SELECT COALESCE(MAX(id), 0) FROM locations", [], |row| row.get(0))?;
        self.trips.store(max_trip, Ordering::SeqCst);
        self.photos.store(max_photo, Ordering::SeqCst);
        self.locations.store(max_location, Ordering::SeqCst);
        Ok(())
    }

    pub(crate) fn next_trip(&self) -> TripId {
        TripId(self.trips.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub(crate) fn next_photo(&self) -> PhotoId {
        PhotoId(self.photos.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub(crate) fn next_location(&self) -> LocationId {
        LocationId(self.locations.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

pub(crate) struct StoreInner {
    pub(crate) conn: Mutex<Connection>,
    pub(crate) ids: IdAllocator,
    pub(crate) hub: SubscriptionHub,
}

/// Handle to the record store. Cheap to clone; all clones share the same
/// underlying connection and subscription hub.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Store {
    /// Open (or create) the store file at `path`.
    pub fn open(path: &Path) -> Result<Self, PersistenceError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// In-memory store, used by tests and previews.
    pub fn open_in_memory() -> Result<Self, PersistenceError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, PersistenceError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self {
            inner: Arc::new(StoreInner {
                conn: Mutex::new(conn),
                ids: IdAllocator::new(),
                hub: SubscriptionHub::new(),
            }),
        })
    }

    /// Apply the schema and migrations, then seed the id allocator.
    pub fn initialize(&self) -> Result<(), PersistenceError> {
        let conn = self.inner.conn.lock();
        conn.execute_batch(SCHEMA)?;
        for migration in MIGRATIONS {
            let _ = conn.execute(migration, []);
        }
        self.inner.ids.seed(&conn)?;
        Ok(())
    }

    /// Subscribe to change notifications for every subsequent save.
    pub fn subscribe(&self) -> SubscriptionHandle {
        self.inner.hub.subscribe()
    }

    /// Open a fresh editing context over the committed state.
    pub fn new_context(&self) -> EditContext {
        EditContext::new(self.inner.clone())
    }

    // ========================================================================
    // Committed-state reads (the "main context" view)
    // ========================================================================

    pub fn fetch_trips(&self, query: &TripQuery) -> Result<Vec<Trip>, PersistenceError> {
        let (clauses, query_params) = query.clauses();
        let sql = format!("SELECT {} FROM trips {}", TRIP_COLUMNS, clauses);
        let conn = self.inner.conn.lock();
        let mut stmt = conn.prepare(&sql)?;
        let trips = stmt
            .query_map(params_from_iter(query_params.iter()), trip_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(trips)
    }

    pub fn trip_ids(&self, query: &TripQuery) -> Result<Vec<TripId>, PersistenceError> {
        let (clauses, query_params) = query.clauses();
        let sql = format!("SELECT id FROM trips {}", clauses);
        let conn = self.inner.conn.lock();
        let mut stmt = conn.prepare(&sql)?;
        let ids = stmt
            .query_map(params_from_iter(query_params.iter()), |row| {
                Ok(TripId(row.get(0)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    pub fn trip(&self, id: TripId) -> Result<Option<Trip>, PersistenceError> {
        let conn = self.inner.conn.lock();
        committed_trip(&conn, id)
    }

    pub fn trip_count(&self) -> Result<u64, PersistenceError> {
        let conn = self.inner.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM trips", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    pub fn photo(&self, id: PhotoId) -> Result<Option<Photo>, PersistenceError> {
        let conn = self.inner.conn.lock();
        let result = conn.query_row(
            &format!("SELECT {} FROM photos WHERE id = ?1", PHOTO_COLUMNS),
            params![id.0],
            photo_from_row,
        );
        match result {
            Ok(photo) => Ok(Some(photo)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Photos of a trip in insertion order.
    pub fn photos_for_trip(&self, trip_id: TripId) -> Result<Vec<Photo>, PersistenceError> {
        let conn = self.inner.conn.lock();
        committed_photos_for_trip(&conn, trip_id)
    }

    pub fn photo_ids_for_trip(&self, trip_id: TripId) -> Result<Vec<PhotoId>, PersistenceError> {
        let conn = self.inner.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id FROM photos WHERE trip_id = ?1 ORDER BY added_date ASC, id ASC",
        )?;
        let ids = stmt
            .query_map(params![trip_id.0], |row| Ok(PhotoId(row.get(0)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    /// Thumbnail of the trip's first photo, used as the grid cover image.
    pub fn hero_thumbnail(&self, trip_id: TripId) -> Result<Option<Vec<u8>>, PersistenceError> {
        let conn = self.inner.conn.lock();
        let result = conn.query_row(
            "SELECT thumbnail FROM photos WHERE trip_id = ?1 ORDER BY added_date ASC, id ASC LIMIT 1",
            params![trip_id.0],
            |row| row.get::<_, Vec<u8>>(0),
        );
        match result {
            Ok(thumbnail) => Ok(Some(thumbnail)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn location_for_trip(&self, trip_id: TripId) -> Result<Option<Location>, PersistenceError> {
        let conn = self.inner.conn.lock();
        committed_location_for_trip(&conn, trip_id)
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Persist everything staged in `context` in one transaction, then emit
    /// a single change notification. On failure nothing is committed and the
    /// context keeps its pending changes; the caller logs and may retry by
    /// saving again.
    pub fn save(&self, context: &mut EditContext) -> Result<(), PersistenceError> {
        let pending = context.effective_pending();
        if pending.is_empty() {
            context.clear();
            return Ok(());
        }

        let mut deleted_photos: BTreeSet<i64> = pending.deleted_photos.clone();
        let mut deleted_locations: BTreeSet<i64> = pending.deleted_locations.clone();
        let mut touched_trips: BTreeSet<i64> = BTreeSet::new();
        for photo in pending.photos.values() {
            touched_trips.insert(photo.trip_id.0);
        }
        for location in pending.locations.values() {
            touched_trips.insert(location.trip_id.0);
        }

        let mut conn = self.inner.conn.lock();

        // Resolve cascade targets and touched parents while the rows are
        // still present.
        if !pending.deleted_trips.is_empty() {
            let list = id_list(&pending.deleted_trips);
            deleted_photos.extend(query_i64s(
                &conn,
                &format!("SELECT id FROM photos WHERE trip_id IN ({})", list),
            )?);
            deleted_locations.extend(query_i64s(
                &conn,
                &format!("SELECT id FROM locations WHERE trip_id IN ({})", list),
            )?);
        }
        if !pending.deleted_photos.is_empty() {
            let list = id_list(&pending.deleted_photos);
            touched_trips.extend(query_i64s(
                &conn,
                &format!("SELECT DISTINCT trip_id FROM photos WHERE id IN ({})", list),
            )?);
        }
        if !pending.deleted_locations.is_empty() {
            let list = id_list(&pending.deleted_locations);
            touched_trips.extend(query_i64s(
                &conn,
                &format!("SELECT DISTINCT trip_id FROM locations WHERE id IN ({})", list),
            )?);
        }

        let tx = conn.transaction()?;

        if !deleted_photos.is_empty() {
            tx.execute(
                &format!("DELETE FROM photos WHERE id IN ({})", id_list(&deleted_photos)),
                [],
            )?;
        }
        if !deleted_locations.is_empty() {
            tx.execute(
                &format!(
                    "DELETE FROM locations WHERE id IN ({})",
                    id_list(&deleted_locations)
                ),
                [],
            )?;
        }
        if !pending.deleted_trips.is_empty() {
            tx.execute(
                &format!(
                    "DELETE FROM trips WHERE id IN ({})",
                    id_list(&pending.deleted_trips)
                ),
                [],
            )?;
        }

        // INSERT OR REPLACE would delete-and-reinsert on conflict, firing
        // the cascade and destroying child rows; upsert instead.
        {
            let mut stmt = tx.prepare(
                "INSERT INTO trips (id, title, notes, creation_date, start_date, end_date, is_favorite, category) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8) \
                 ON CONFLICT(id) DO UPDATE SET \
                 title = excluded.title, notes = excluded.notes, \
                 creation_date = excluded.creation_date, start_date = excluded.start_date, \
                 end_date = excluded.end_date, is_favorite = excluded.is_favorite, \
                 category = excluded.category",
            )?;
            for trip in pending.trips.values() {
                stmt.execute(params![
                    trip.id.0,
                    trip.title,
                    trip.notes,
                    format_ts(&trip.creation_date),
                    format_ts(&trip.start_date),
                    format_ts(&trip.end_date),
                    trip.is_favorite,
                    trip.category.as_str(),
                ])?;
            }

            let mut stmt = tx.prepare(
                "INSERT INTO photos (id, trip_id, data, thumbnail, asset_identifier, added_date) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
                 ON CONFLICT(id) DO UPDATE SET \
                 trip_id = excluded.trip_id, data = excluded.data, \
                 thumbnail = excluded.thumbnail, asset_identifier = excluded.asset_identifier, \
                 added_date = excluded.added_date",
            )?;
            for photo in pending.photos.values() {
                stmt.execute(params![
                    photo.id.0,
                    photo.trip_id.0,
                    photo.data,
                    photo.thumbnail,
                    photo.asset_identifier,
                    format_ts(&photo.added_date),
                ])?;
            }

            let mut stmt = tx.prepare(
                "INSERT INTO locations (id, trip_id, name, latitude, longitude, formatted_address) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
                 ON CONFLICT(id) DO UPDATE SET \
                 trip_id = excluded.trip_id, name = excluded.name, \
                 latitude = excluded.latitude, longitude = excluded.longitude, \
                 formatted_address = excluded.formatted_address",
            )?;
            for location in pending.locations.values() {
                stmt.execute(params![
                    location.id.0,
                    location.trip_id.0,
                    location.name,
                    location.latitude,
                    location.longitude,
                    location.formatted_address,
                ])?;
            }
        }

        tx.commit()?;
        drop(conn);

        let changes = build_changeset(&pending, deleted_photos, deleted_locations, touched_trips);
        context.clear();
        tracing::debug!(
            trips_inserted = changes.trips.inserted.len(),
            trips_updated = changes.trips.updated.len(),
            trips_deleted = changes.trips.deleted.len(),
            "context saved"
        );
        self.inner.hub.broadcast(StoreEvent::Saved(changes));
        Ok(())
    }

    /// Delete a trip and everything it owns in one step.
    pub fn delete_trip(&self, id: TripId) -> Result<(), PersistenceError> {
        let mut context = self.new_context();
        context.delete_trip(id);
        self.save(&mut context)
    }

    /// Set the favorite flag on a committed trip. No-op if the trip is gone.
    pub fn set_favorite(&self, id: TripId, is_favorite: bool) -> Result<(), PersistenceError> {
        let trip = match self.trip(id)? {
            Some(trip) => trip,
            None => return Ok(()),
        };
        let mut context = self.new_context();
        context.update_trip(&Trip { is_favorite, ..trip });
        self.save(&mut context)
    }
}

fn build_changeset(
    pending: &context::PendingChanges,
    deleted_photos: BTreeSet<i64>,
    deleted_locations: BTreeSet<i64>,
    touched_trips: BTreeSet<i64>,
) -> ChangeSet {
    let mut trips = EntityChanges::<TripId>::default();
    for (id, _) in pending.trips.iter() {
        if pending.created_trips.contains(id) {
            trips.inserted.push(TripId(*id));
        } else {
            trips.updated.push(TripId(*id));
        }
    }
    for id in touched_trips {
        if pending.created_trips.contains(&id)
            || pending.deleted_trips.contains(&id)
            || pending.trips.contains_key(&id)
        {
            continue;
        }
        trips.updated.push(TripId(id));
    }
    trips.deleted = pending.deleted_trips.iter().map(|id| TripId(*id)).collect();

    let mut photos = EntityChanges::<PhotoId>::default();
    for (id, _) in pending.photos.iter() {
        if pending.created_photos.contains(id) {
            photos.inserted.push(PhotoId(*id));
        } else {
            photos.updated.push(PhotoId(*id));
        }
    }
    photos.deleted = deleted_photos.iter().map(|id| PhotoId(*id)).collect();

    let mut locations = EntityChanges::<LocationId>::default();
    for (id, _) in pending.locations.iter() {
        if pending.created_locations.contains(id) {
            locations.inserted.push(LocationId(*id));
        } else {
            locations.updated.push(LocationId(*id));
        }
    }
    locations.deleted = deleted_locations.iter().map(|id| LocationId(*id)).collect();

    ChangeSet {
        trips,
        photos,
        locations,
    }
}

fn id_list(ids: &BTreeSet<i64>) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn query_i64s(conn: &Connection, sql: &str) -> Result<Vec<i64>, PersistenceError> {
    let mut stmt = conn.prepare(sql)?;
    let values = stmt
        .query_map([], |row| row.get::<_, i64>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(values)
}

fn ts_value(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_ts(&raw).map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err)))
}

fn trip_from_row(row: &Row<'_>) -> rusqlite::Result<Trip> {
    let category: String = row.get(7)?;
    Ok(Trip {
        id: TripId(row.get(0)?),
        title: row.get(1)?,
        notes: row.get(2)?,
        creation_date: ts_value(row, 3)?,
        start_date: ts_value(row, 4)?,
        end_date: ts_value(row, 5)?,
        is_favorite: row.get(6)?,
        category: TripCategory::parse(&category),
    })
}

fn photo_from_row(row: &Row<'_>) -> rusqlite::Result<Photo> {
    Ok(Photo {
        id: PhotoId(row.get(0)?),
        trip_id: TripId(row.get(1)?),
        data: row.get(2)?,
        thumbnail: row.get(3)?,
        asset_identifier: row.get(4)?,
        added_date: ts_value(row, 5)?,
    })
}

fn location_from_row(row: &Row<'_>) -> rusqlite::Result<Location> {
    Ok(Location {
        id: LocationId(row.get(0)?),
        trip_id: TripId(row.get(1)?),
        name: row.get(2)?,
        latitude: row.get(3)?,
        longitude: row.get(4)?,
        formatted_address: row.get(5)?,
    })
}

pub(crate) fn committed_trip(conn: &Connection, id: TripId) -> Result<Option<Trip>, PersistenceError> {
    let result = conn.query_row(
        &format!("SELECT {} FROM trips WHERE id = ?1", TRIP_COLUMNS),
        params![id.0],
        trip_from_row,
    );
    match result {
        Ok(trip) => Ok(Some(trip)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub(crate) fn committed_photos_for_trip(
    conn: &Connection,
    trip_id: TripId,
) -> Result<Vec<Photo>, PersistenceError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM photos WHERE trip_id = ?1 ORDER BY added_date ASC, id ASC",
        PHOTO_COLUMNS
    ))?;
    let photos = stmt
        .query_map(params![trip_id.0], photo_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(photos)
}

pub(crate) fn committed_location_for_trip(
    conn: &Connection,
    trip_id: TripId,
) -> Result<Option<Location>, PersistenceError> {
    let result = conn.query_row(
        &format!("SELECT {} FROM locations WHERE trip_id = ?1", LOCATION_COLUMNS),
        params![trip_id.0],
        location_from_row,
    );
    match result {
        Ok(location) => Ok(Some(location)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}
