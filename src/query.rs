//! Filter predicates and re-runnable queries over trips.

use crate::model::TripCategory;

/// Result cap for the recent-trips summary displays.
pub const RECENT_TRIPS_LIMIT: usize = 4;

/// Restriction applied when fetching trips. Only one filter is active at a
/// time; re-running a filter after a save always reflects the mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum TripFilter {
    /// No restriction.
    All,
    /// Trips with the favorite flag set.
    Favorite,
    /// Trips of one category.
    Category(TripCategory),
    /// Case-insensitive substring match on the title.
    Title(String),
}

impl TripFilter {
    /// SQL condition and positional parameters for this filter.
    pub(crate) fn predicate(&self) -> (String, Vec<String>) {
        match self {
            TripFilter::All => ("1 = 1".to_string(), Vec::new()),
            TripFilter::Favorite => ("is_favorite = 1".to_string(), Vec::new()),
            TripFilter::Category(category) => {
                ("category = ?1".to_string(), vec![category.as_str().to_string()])
            }
            TripFilter::Title(needle) => (
                "instr(lower(title), lower(?1)) > 0".to_string(),
                vec![needle.clone()],
            ),
        }
    }
}

/// A filter plus an optional result cap. Results are always ordered by
/// creation date descending, ties broken by insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct TripQuery {
    pub filter: TripFilter,
    pub limit: Option<usize>,
}

impl TripQuery {
    pub fn new(filter: TripFilter) -> Self {
        Self { filter, limit: None }
    }

    /// The full, unrestricted trip list.
    pub fn all() -> Self {
        Self::new(TripFilter::All)
    }

    /// The most recent trips, capped for summary displays.
    pub fn recent() -> Self {
        Self {
            filter: TripFilter::All,
            limit: Some(RECENT_TRIPS_LIMIT),
        }
    }

    /// The most recent favorite trips, capped for summary displays.
    pub fn recent_favorites() -> Self {
        Self {
            filter: TripFilter::Favorite,
            limit: Some(RECENT_TRIPS_LIMIT),
        }
    }

    /// WHERE/ORDER BY/LIMIT tail shared by id and full-record fetches.
    pub(crate) fn clauses(&self) -> (String, Vec<String>) {
        let (condition, params) = self.filter.predicate();
        let mut sql = format!(
            "WHERE {} ORDER BY creation_date DESC, id ASC",
            condition
        );
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        (sql, params)
    }
}

impl Default for TripQuery {
    fn default() -> Self {
        Self::all()
    }
}
