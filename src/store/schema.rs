pub const SCHEMA: &str = r#"
-- Trips table: one row per journey record
CREATE TABLE IF NOT EXISTS trips (
    id INTEGER PRIMARY KEY,
    title TEXT NOT NULL,
    notes TEXT NOT NULL DEFAULT '',
    creation_date TEXT NOT NULL,
    start_date TEXT NOT NULL,
    end_date TEXT NOT NULL,
    is_favorite INTEGER NOT NULL DEFAULT 0,
    category TEXT NOT NULL DEFAULT 'Solo'
);

CREATE INDEX IF NOT EXISTS idx_trips_creation_date ON trips(creation_date);
CREATE INDEX IF NOT EXISTS idx_trips_favorite ON trips(is_favorite);
CREATE INDEX IF NOT EXISTS idx_trips_category ON trips(category);

-- Photos: full image bytes plus a pre-rendered thumbnail, owned by a trip
CREATE TABLE IF NOT EXISTS photos (
    id INTEGER PRIMARY KEY,
    trip_id INTEGER NOT NULL,
    data BLOB NOT NULL,
    thumbnail BLOB NOT NULL,
    asset_identifier TEXT,
    added_date TEXT NOT NULL,
    FOREIGN KEY (trip_id) REFERENCES trips(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_photos_trip ON photos(trip_id);

-- Locations: at most one geographic point per trip
CREATE TABLE IF NOT EXISTS locations (
    id INTEGER PRIMARY KEY,
    trip_id INTEGER NOT NULL UNIQUE,
    name TEXT NOT NULL,
    latitude REAL NOT NULL,
    longitude REAL NOT NULL,
    formatted_address TEXT NOT NULL,
    FOREIGN KEY (trip_id) REFERENCES trips(id) ON DELETE CASCADE
);
"#;

/// Schema changes applied leniently on open; statements that already took
/// effect on an existing database are allowed to fail.
pub const MIGRATIONS: &[&str] = &[];
