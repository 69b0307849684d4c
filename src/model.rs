//! Record types for trips, photos, and locations.

use chrono::{DateTime, Timelike, Utc};
use std::fmt;

/// Timestamp format used for TEXT columns. Fixed-width so that
/// lexicographic order matches chronological order.
pub(crate) const TS_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

pub(crate) fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.format(TS_FORMAT).to_string()
}

pub(crate) fn parse_ts(value: &str) -> chrono::ParseResult<DateTime<Utc>> {
    chrono::NaiveDateTime::parse_from_str(value, TS_FORMAT).map(|naive| naive.and_utc())
}

/// Current time truncated to the precision the store can round-trip.
pub(crate) fn now_ts() -> DateTime<Utc> {
    let now = Utc::now();
    now.with_nanosecond(now.nanosecond() / 1_000 * 1_000)
        .unwrap_or(now)
}

/// Unique identifier for a trip. Stable across editing contexts and saves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TripId(pub i64);

impl fmt::Display for TripId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PhotoId(pub i64);

impl fmt::Display for PhotoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LocationId(pub i64);

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trip categories offered by the category picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TripCategory {
    Adventure,
    Business,
    Leisure,
    Solo,
}

impl TripCategory {
    pub const ALL: [TripCategory; 4] = [
        TripCategory::Adventure,
        TripCategory::Business,
        TripCategory::Leisure,
        TripCategory::Solo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TripCategory::Adventure => "Adventure",
            TripCategory::Business => "Business",
            TripCategory::Leisure => "Leisure",
            TripCategory::Solo => "Solo",
        }
    }

    /// Decode a stored category value. Unknown values fall back to `Solo`,
    /// matching the behavior for records written before a category was set.
    pub fn parse(value: &str) -> TripCategory {
        match value {
            "Adventure" => TripCategory::Adventure,
            "Business" => TripCategory::Business,
            "Leisure" => TripCategory::Leisure,
            _ => TripCategory::Solo,
        }
    }
}

impl fmt::Display for TripCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A journey record: dates, notes, category, and a favorite flag.
///
/// The store does not enforce `start_date <= end_date`; the editing UI
/// constrains the pickers but out-of-range values are accepted as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct Trip {
    pub id: TripId,
    pub title: String,
    pub notes: String,
    pub creation_date: DateTime<Utc>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_favorite: bool,
    pub category: TripCategory,
}

impl Trip {
    /// Abbreviated month and year, e.g. "Mar 2026".
    pub fn formatted_start_date(&self) -> String {
        self.start_date.format("%b %Y").to_string()
    }

    pub fn formatted_end_date(&self) -> String {
        self.end_date.format("%b %Y").to_string()
    }
}

/// An image attached to a trip, with a pre-rendered thumbnail.
#[derive(Debug, Clone, PartialEq)]
pub struct Photo {
    pub id: PhotoId,
    pub trip_id: TripId,
    /// Full image bytes as delivered by the picker.
    pub data: Vec<u8>,
    /// JPEG thumbnail bytes.
    pub thumbnail: Vec<u8>,
    /// Source-library asset identifier, used to pre-select previously
    /// imported images in the picker.
    pub asset_identifier: Option<String>,
    pub added_date: DateTime<Utc>,
}

/// A single geographic point attached to a trip.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub id: LocationId,
    pub trip_id: TripId,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub formatted_address: String,
}

/// A confirmed place-search result, as handed over by the host's search UI.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceSelection {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub formatted_address: String,
}
