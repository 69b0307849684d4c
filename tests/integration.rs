//! End-to-end tests for the record store and editing contexts.

use chrono::{TimeZone, Utc};
use tempfile::TempDir;
use triplog::{
    PlaceSelection, Store, Trip, TripCategory, TripFilter, TripQuery, RECENT_TRIPS_LIMIT,
};

fn open_store() -> Store {
    let store = Store::open_in_memory().unwrap();
    store.initialize().unwrap();
    store
}

fn place(name: &str) -> PlaceSelection {
    PlaceSelection {
        name: name.to_string(),
        latitude: -12.84,
        longitude: 132.71,
        formatted_address: format!("{name}, NT, Australia"),
    }
}

/// Create and commit a trip with the given title and creation date offset
/// (later offset = more recent).
fn commit_trip(store: &Store, title: &str, day: u32) -> Trip {
    let mut context = store.new_context();
    let mut trip = context.new_trip();
    trip.title = title.to_string();
    trip.creation_date = Utc.with_ymd_and_hms(2026, 3, day, 12, 0, 0).unwrap();
    context.update_trip(&trip);
    store.save(&mut context).unwrap();
    trip
}

#[test]
fn test_round_trip_trip_photo_location() {
    let store = open_store();

    let mut context = store.new_context();
    let mut trip = context.new_trip();
    trip.title = "Kakadu Adventure".to_string();
    trip.notes = "Wetlands and rock art".to_string();
    trip.is_favorite = true;
    trip.category = TripCategory::Adventure;
    context.update_trip(&trip);
    let photo = context.add_photo(
        trip.id,
        b"full-image-bytes".to_vec(),
        b"thumbnail-bytes".to_vec(),
        Some("asset-42".to_string()),
    );
    let location = context.set_location(trip.id, place("Kakadu")).unwrap();
    store.save(&mut context).unwrap();

    // Re-fetch by identifier from a fresh context.
    let fresh = store.new_context();
    let fetched = fresh.trip(trip.id).unwrap().unwrap();
    assert_eq!(fetched, trip);

    let photos = fresh.photos_for_trip(trip.id).unwrap();
    assert_eq!(photos, vec![photo]);
    assert_eq!(photos[0].asset_identifier.as_deref(), Some("asset-42"));

    let fetched_location = fresh.location_for_trip(trip.id).unwrap().unwrap();
    assert_eq!(fetched_location, location);
    assert_eq!(fetched_location.trip_id, trip.id);

    assert_eq!(
        fresh.asset_identifiers_for_trip(trip.id).unwrap(),
        vec!["asset-42".to_string()]
    );
}

#[test]
fn test_cascade_delete_removes_owned_records() {
    let store = open_store();

    let mut context = store.new_context();
    let trip = context.new_trip();
    let photo_a = context.add_photo(trip.id, b"a".to_vec(), b"ta".to_vec(), None);
    let photo_b = context.add_photo(trip.id, b"b".to_vec(), b"tb".to_vec(), None);
    context.set_location(trip.id, place("Kakadu")).unwrap();
    store.save(&mut context).unwrap();

    let kept = commit_trip(&store, "Unrelated", 2);

    store.delete_trip(trip.id).unwrap();

    assert!(store.trip(trip.id).unwrap().is_none());
    assert!(store.photo(photo_a.id).unwrap().is_none());
    assert!(store.photo(photo_b.id).unwrap().is_none());
    assert!(store.photos_for_trip(trip.id).unwrap().is_empty());
    assert!(store.location_for_trip(trip.id).unwrap().is_none());

    // The unrelated trip is untouched.
    assert!(store.trip(kept.id).unwrap().is_some());
}

#[test]
fn test_favorite_filter_tracks_toggle() {
    let store = open_store();
    let trip = commit_trip(&store, "Reef Weekend", 1);
    commit_trip(&store, "Desert Drive", 2);

    let favorites = store
        .fetch_trips(&TripQuery::new(TripFilter::Favorite))
        .unwrap();
    assert!(favorites.is_empty());

    store.set_favorite(trip.id, true).unwrap();
    let favorites = store
        .fetch_trips(&TripQuery::new(TripFilter::Favorite))
        .unwrap();
    assert_eq!(favorites.len(), 1);
    assert_eq!(favorites[0].id, trip.id);

    store.set_favorite(trip.id, false).unwrap();
    let favorites = store
        .fetch_trips(&TripQuery::new(TripFilter::Favorite))
        .unwrap();
    assert!(favorites.is_empty());
}

#[test]
fn test_title_filter_case_insensitive_substring() {
    let store = open_store();
    let trip = commit_trip(&store, "Kakadu Adventure", 1);
    commit_trip(&store, "Reef Weekend", 2);

    for needle in ["kakadu", "ADVENTURE", "adu"] {
        let matches = store
            .fetch_trips(&TripQuery::new(TripFilter::Title(needle.to_string())))
            .unwrap();
        assert_eq!(matches.len(), 1, "substring {needle:?} should match");
        assert_eq!(matches[0].id, trip.id);
    }

    let matches = store
        .fetch_trips(&TripQuery::new(TripFilter::Title("outback".to_string())))
        .unwrap();
    assert!(matches.is_empty());
}

#[test]
fn test_category_filter() {
    let store = open_store();
    let mut context = store.new_context();
    let mut trip = context.new_trip();
    trip.title = "Client Offsite".to_string();
    trip.category = TripCategory::Business;
    context.update_trip(&trip);
    store.save(&mut context).unwrap();
    commit_trip(&store, "Solo Walk", 2);

    let business = store
        .fetch_trips(&TripQuery::new(TripFilter::Category(TripCategory::Business)))
        .unwrap();
    assert_eq!(business.len(), 1);
    assert_eq!(business[0].id, trip.id);

    let adventure = store
        .fetch_trips(&TripQuery::new(TripFilter::Category(
            TripCategory::Adventure,
        )))
        .unwrap();
    assert!(adventure.is_empty());
}

#[test]
fn test_recent_trips_capped_and_ordered() {
    let store = open_store();
    for day in 1..=6 {
        commit_trip(&store, &format!("Trip {day}"), day);
    }
    // Two trips sharing one creation date; insertion order breaks the tie.
    let tie_a = commit_trip(&store, "Tie A", 7);
    let mut context = store.new_context();
    let mut tie_b = context.new_trip();
    tie_b.title = "Tie B".to_string();
    tie_b.creation_date = tie_a.creation_date;
    context.update_trip(&tie_b);
    store.save(&mut context).unwrap();

    let recent = store.fetch_trips(&TripQuery::recent()).unwrap();
    assert_eq!(recent.len(), RECENT_TRIPS_LIMIT);
    assert_eq!(recent[0].title, "Tie A");
    assert_eq!(recent[1].title, "Tie B");
    assert_eq!(recent[2].title, "Trip 6");
    assert_eq!(recent[3].title, "Trip 5");

    // Strictly descending creation dates apart from the declared tie.
    for pair in recent.windows(2) {
        assert!(pair[0].creation_date >= pair[1].creation_date);
    }
}

#[test]
fn test_recent_favorites_capped() {
    let store = open_store();
    for day in 1..=6 {
        let trip = commit_trip(&store, &format!("Trip {day}"), day);
        store.set_favorite(trip.id, true).unwrap();
    }

    let recent = store.fetch_trips(&TripQuery::recent_favorites()).unwrap();
    assert_eq!(recent.len(), RECENT_TRIPS_LIMIT);
    assert!(recent.iter().all(|trip| trip.is_favorite));
    assert_eq!(recent[0].title, "Trip 6");
}

#[test]
fn test_rollback_discards_pending() {
    let store = open_store();

    let mut context = store.new_context();
    let trip = context.new_trip();
    context.add_photo(trip.id, b"a".to_vec(), b"ta".to_vec(), None);
    assert!(context.has_changes());

    context.rollback();
    assert!(!context.has_changes());
    assert!(context.trip(trip.id).unwrap().is_none());

    store.save(&mut context).unwrap();
    assert_eq!(store.trip_count().unwrap(), 0);
}

#[test]
fn test_create_then_delete_is_noop() {
    let store = open_store();

    let mut context = store.new_context();
    let trip = context.new_trip();
    context.add_photo(trip.id, b"a".to_vec(), b"ta".to_vec(), None);
    context.delete_trip(trip.id);

    assert!(!context.has_changes());
    store.save(&mut context).unwrap();
    assert_eq!(store.trip_count().unwrap(), 0);
}

#[test]
fn test_child_context_merges_into_parent() {
    let store = open_store();

    let mut parent = store.new_context();
    let mut trip = parent.new_trip();
    trip.title = "Draft".to_string();
    parent.update_trip(&trip);

    // The editor screen works in a child; its reads see the parent's
    // pending trip even though nothing is committed yet.
    let mut child = parent.child();
    let seen = child.trip(trip.id).unwrap().unwrap();
    assert_eq!(seen.title, "Draft");

    let photo = child.add_photo(trip.id, b"a".to_vec(), b"ta".to_vec(), None);
    let mut renamed = seen.clone();
    renamed.title = "Kakadu Adventure".to_string();
    child.update_trip(&renamed);

    parent.merge(child);
    store.save(&mut parent).unwrap();

    let committed = store.trip(trip.id).unwrap().unwrap();
    assert_eq!(committed.title, "Kakadu Adventure");
    assert_eq!(store.photos_for_trip(trip.id).unwrap(), vec![photo]);
}

#[test]
fn test_dropped_child_leaves_parent_untouched() {
    let store = open_store();

    let mut parent = store.new_context();
    let trip = parent.new_trip();

    {
        let mut child = parent.child();
        let mut doomed = child.trip(trip.id).unwrap().unwrap();
        doomed.title = "Abandoned Edit".to_string();
        child.update_trip(&doomed);
        child.add_photo(trip.id, b"x".to_vec(), b"tx".to_vec(), None);
        // Cancel: the child is dropped without merging.
    }

    store.save(&mut parent).unwrap();
    assert_eq!(store.trip(trip.id).unwrap().unwrap().title, "New Trip");
    assert!(store.photos_for_trip(trip.id).unwrap().is_empty());
}

#[test]
fn test_identity_stable_across_contexts() {
    let store = open_store();
    let trip = commit_trip(&store, "Shared", 1);

    // A detail view and a list view hold separate contexts over the same
    // logical record.
    let detail = store.new_context();
    let mut editor = store.new_context();

    let mut edited = editor.trip(trip.id).unwrap().unwrap();
    edited.notes = "Updated notes".to_string();
    editor.update_trip(&edited);

    // Isolation until save.
    assert_eq!(detail.trip(trip.id).unwrap().unwrap().notes, "");

    store.save(&mut editor).unwrap();
    assert_eq!(
        detail.trip(trip.id).unwrap().unwrap().notes,
        "Updated notes"
    );
}

#[test]
fn test_pending_overlay_is_invisible_to_committed_reads() {
    let store = open_store();
    let trip = commit_trip(&store, "Kakadu", 1);

    let mut context = store.new_context();
    let photo = context.add_photo(trip.id, b"a".to_vec(), b"ta".to_vec(), None);

    assert_eq!(context.photos_for_trip(trip.id).unwrap().len(), 1);
    assert!(store.photos_for_trip(trip.id).unwrap().is_empty());

    store.save(&mut context).unwrap();
    assert_eq!(store.photos_for_trip(trip.id).unwrap(), vec![photo]);
}

#[test]
fn test_photos_keep_insertion_order() {
    let store = open_store();
    let trip = commit_trip(&store, "Gallery", 1);

    let mut context = store.new_context();
    let first = context.add_photo(trip.id, b"1".to_vec(), b"t1".to_vec(), None);
    let second = context.add_photo(trip.id, b"2".to_vec(), b"t2".to_vec(), None);
    let third = context.add_photo(trip.id, b"3".to_vec(), b"t3".to_vec(), None);
    store.save(&mut context).unwrap();

    let ids = store.photo_ids_for_trip(trip.id).unwrap();
    assert_eq!(ids, vec![first.id, second.id, third.id]);

    let hero = store.hero_thumbnail(trip.id).unwrap().unwrap();
    assert_eq!(hero, b"t1".to_vec());
}

#[test]
fn test_remove_photo() {
    let store = open_store();
    let trip = commit_trip(&store, "Gallery", 1);

    let mut context = store.new_context();
    let photo = context.add_photo(trip.id, b"1".to_vec(), b"t1".to_vec(), None);
    let kept = context.add_photo(trip.id, b"2".to_vec(), b"t2".to_vec(), None);
    store.save(&mut context).unwrap();

    let mut context = store.new_context();
    context.remove_photo(photo.id);
    assert_eq!(context.photos_for_trip(trip.id).unwrap(), vec![kept.clone()]);
    store.save(&mut context).unwrap();

    assert!(store.photo(photo.id).unwrap().is_none());
    assert_eq!(store.photos_for_trip(trip.id).unwrap(), vec![kept]);
}

#[test]
fn test_location_replacement_and_clear() {
    let store = open_store();
    let trip = commit_trip(&store, "Kakadu", 1);

    let mut context = store.new_context();
    let first = context.set_location(trip.id, place("Kakadu")).unwrap();
    store.save(&mut context).unwrap();

    // Confirming a new search result replaces the record.
    let mut context = store.new_context();
    let second = context.set_location(trip.id, place("Darwin")).unwrap();
    assert_ne!(second.id, first.id);
    store.save(&mut context).unwrap();

    let current = store.location_for_trip(trip.id).unwrap().unwrap();
    assert_eq!(current.id, second.id);
    assert_eq!(current.name, "Darwin");

    let mut context = store.new_context();
    context.clear_location(trip.id).unwrap();
    assert!(context.location_for_trip(trip.id).unwrap().is_none());
    store.save(&mut context).unwrap();
    assert!(store.location_for_trip(trip.id).unwrap().is_none());
}

#[test]
fn test_out_of_range_dates_are_not_rejected() {
    let store = open_store();

    let mut context = store.new_context();
    let mut trip = context.new_trip();
    trip.start_date = Utc.with_ymd_and_hms(2026, 5, 10, 0, 0, 0).unwrap();
    trip.end_date = Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap();
    context.update_trip(&trip);
    store.save(&mut context).unwrap();

    let fetched = store.trip(trip.id).unwrap().unwrap();
    assert!(fetched.start_date > fetched.end_date);
}

#[test]
fn test_reopen_preserves_records_and_identity() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("trips.db");

    let first_id = {
        let store = Store::open(&db_path).unwrap();
        store.initialize().unwrap();
        let trip = commit_trip(&store, "Persisted", 1);
        trip.id
    };

    let store = Store::open(&db_path).unwrap();
    store.initialize().unwrap();

    let fetched = store.trip(first_id).unwrap().unwrap();
    assert_eq!(fetched.title, "Persisted");

    // The allocator resumes past committed ids.
    let mut context = store.new_context();
    let next = context.new_trip();
    assert!(next.id > first_id);
}
