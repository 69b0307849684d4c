//! Ordered, sectioned snapshots and minimal-diff transitions.
//!
//! A snapshot is what a displaying screen renders: a deduplicated sequence
//! of record identifiers grouped into sections. Transitions between two
//! snapshots carry only what changed, so a renderer can animate inserts,
//! removals, and moves, and reconfigure rows in place without discarding
//! their UI state.

use similar::{capture_diff_slices, Algorithm, DiffOp};
use std::collections::HashSet;
use std::hash::Hash;

use crate::model::{PhotoId, TripId};

/// One rendered group of items.
#[derive(Debug, Clone, PartialEq)]
pub struct Section<S, I> {
    pub id: S,
    pub items: Vec<I>,
}

/// An ordered, sectioned, deduplicated list of record identifiers.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<S, I: Eq + Hash> {
    sections: Vec<Section<S, I>>,
    seen: HashSet<I>,
}

impl<S: PartialEq, I: Eq + Hash + Clone> Snapshot<S, I> {
    pub fn new() -> Self {
        Self {
            sections: Vec::new(),
            seen: HashSet::new(),
        }
    }

    pub fn append_section(&mut self, id: S) {
        self.sections.push(Section {
            id,
            items: Vec::new(),
        });
    }

    /// Append items to a section. An identifier already present anywhere in
    /// the snapshot is skipped; identity must stay unique.
    pub fn append_items(&mut self, section: &S, items: impl IntoIterator<Item = I>) {
        let Some(target) = self.sections.iter_mut().find(|s| &s.id == section) else {
            return;
        };
        for item in items {
            if self.seen.insert(item.clone()) {
                target.items.push(item);
            }
        }
    }

    pub fn sections(&self) -> &[Section<S, I>] {
        &self.sections
    }

    /// All identifiers in render order.
    pub fn items(&self) -> Vec<I> {
        self.sections
            .iter()
            .flat_map(|section| section.items.iter().cloned())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.iter().all(|section| section.items.is_empty())
    }
}

/// Minimal difference between two ordered identifier lists.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotTransition<I> {
    /// In the old list but absent from the new fetch; removed, never
    /// reconfigured.
    pub removed: Vec<I>,
    /// New identifiers with their target index in the new list.
    pub inserted: Vec<(usize, I)>,
    /// Identifiers present in both lists whose relative order changed.
    pub moved: Vec<I>,
    /// Identifiers with stable identity whose attributes changed; the
    /// renderer refreshes the row in place rather than replacing it.
    pub reconfigured: Vec<I>,
}

impl<I> SnapshotTransition<I> {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty()
            && self.inserted.is_empty()
            && self.moved.is_empty()
            && self.reconfigured.is_empty()
    }
}

/// Diff an old ordered identifier list against a fresh fetch result.
///
/// `changed` holds identifiers whose attributes were touched by the commit;
/// of those, only the ones surviving into the new list are reported as
/// reconfigured.
pub fn transition<I>(old: &[I], new: &[I], changed: &HashSet<I>) -> SnapshotTransition<I>
where
    I: Clone + Eq + Hash + Ord,
{
    let old_set: HashSet<&I> = old.iter().collect();
    let new_set: HashSet<&I> = new.iter().collect();

    let removed: Vec<I> = old
        .iter()
        .filter(|id| !new_set.contains(*id))
        .cloned()
        .collect();
    let inserted: Vec<(usize, I)> = new
        .iter()
        .enumerate()
        .filter(|(_, id)| !old_set.contains(*id))
        .map(|(index, id)| (index, id.clone()))
        .collect();

    // Order changes among surviving identifiers: diff the two common
    // subsequences and collect everything outside the equal runs.
    let old_common: Vec<I> = old
        .iter()
        .filter(|id| new_set.contains(*id))
        .cloned()
        .collect();
    let new_common: Vec<I> = new
        .iter()
        .filter(|id| old_set.contains(*id))
        .cloned()
        .collect();
    let mut displaced: HashSet<I> = HashSet::new();
    for op in capture_diff_slices(Algorithm::Myers, &old_common, &new_common) {
        match op {
            DiffOp::Equal { .. } => {}
            DiffOp::Delete {
                old_index, old_len, ..
            } => {
                displaced.extend(old_common[old_index..old_index + old_len].iter().cloned());
            }
            DiffOp::Insert {
                new_index, new_len, ..
            } => {
                displaced.extend(new_common[new_index..new_index + new_len].iter().cloned());
            }
            DiffOp::Replace {
                old_index,
                old_len,
                new_index,
                new_len,
            } => {
                displaced.extend(old_common[old_index..old_index + old_len].iter().cloned());
                displaced.extend(new_common[new_index..new_index + new_len].iter().cloned());
            }
        }
    }
    let moved: Vec<I> = new_common
        .iter()
        .filter(|id| displaced.contains(*id))
        .cloned()
        .collect();
    let reconfigured: Vec<I> = new_common
        .iter()
        .filter(|id| changed.contains(*id))
        .cloned()
        .collect();

    SnapshotTransition {
        removed,
        inserted,
        moved,
        reconfigured,
    }
}

/// The trip grid renders one flat section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TripGridSection {
    Main,
}

pub fn trip_grid_snapshot(trip_ids: &[TripId]) -> Snapshot<TripGridSection, TripId> {
    let mut snapshot = Snapshot::new();
    snapshot.append_section(TripGridSection::Main);
    snapshot.append_items(&TripGridSection::Main, trip_ids.iter().copied());
    snapshot
}

/// Sections of the trip detail screen: the paged photo gallery, the notes
/// block, and the map (present only when the trip has a location).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TripDetailSection {
    Images,
    Details,
    Map,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TripDetailItem {
    Photo(PhotoId),
    Details,
    Map,
}

pub fn trip_detail_snapshot(
    photo_ids: &[PhotoId],
    has_location: bool,
) -> Snapshot<TripDetailSection, TripDetailItem> {
    let mut snapshot = Snapshot::new();
    snapshot.append_section(TripDetailSection::Images);
    snapshot.append_items(
        &TripDetailSection::Images,
        photo_ids.iter().map(|id| TripDetailItem::Photo(*id)),
    );
    snapshot.append_section(TripDetailSection::Details);
    snapshot.append_items(&TripDetailSection::Details, [TripDetailItem::Details]);
    if has_location {
        snapshot.append_section(TripDetailSection::Map);
        snapshot.append_items(&TripDetailSection::Map, [TripDetailItem::Map]);
    }
    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[i64]) -> Vec<TripId> {
        raw.iter().map(|id| TripId(*id)).collect()
    }

    #[test]
    fn test_removed_and_appended() {
        let old = ids(&[1, 2, 3]);
        let new = ids(&[2, 3, 4]);
        let diff = transition(&old, &new, &HashSet::new());

        assert_eq!(diff.removed, ids(&[1]));
        assert_eq!(diff.inserted, vec![(2, TripId(4))]);
        assert!(diff.moved.is_empty());
        assert!(diff.reconfigured.is_empty());
    }

    #[test]
    fn test_reorder_reports_moves_only() {
        let old = ids(&[1, 2, 3]);
        let new = ids(&[3, 1, 2]);
        let diff = transition(&old, &new, &HashSet::new());

        assert!(diff.removed.is_empty());
        assert!(diff.inserted.is_empty());
        assert_eq!(diff.moved, ids(&[3]));
    }

    #[test]
    fn test_changed_survivor_is_reconfigured() {
        let old = ids(&[1, 2]);
        let new = ids(&[1, 2]);
        let changed: HashSet<TripId> = [TripId(2), TripId(9)].into_iter().collect();
        let diff = transition(&old, &new, &changed);

        // The stale id 9 is not in the new fetch and must not surface.
        assert_eq!(diff.reconfigured, ids(&[2]));
        assert!(diff.removed.is_empty());
        assert!(diff.inserted.is_empty());
    }

    #[test]
    fn test_deleted_id_is_removed_not_reconfigured() {
        let old = ids(&[1, 2]);
        let new = ids(&[2]);
        let changed: HashSet<TripId> = [TripId(1)].into_iter().collect();
        let diff = transition(&old, &new, &changed);

        assert_eq!(diff.removed, ids(&[1]));
        assert!(diff.reconfigured.is_empty());
    }

    #[test]
    fn test_snapshot_deduplicates() {
        let mut snapshot = Snapshot::new();
        snapshot.append_section(TripGridSection::Main);
        snapshot.append_items(&TripGridSection::Main, ids(&[1, 2, 1, 3, 2]));
        assert_eq!(snapshot.items(), ids(&[1, 2, 3]));
    }

    #[test]
    fn test_detail_snapshot_sections() {
        let photos = [PhotoId(7), PhotoId(8)];
        let snapshot = trip_detail_snapshot(&photos, true);
        let sections: Vec<TripDetailSection> =
            snapshot.sections().iter().map(|s| s.id).collect();
        assert_eq!(
            sections,
            vec![
                TripDetailSection::Images,
                TripDetailSection::Details,
                TripDetailSection::Map
            ]
        );

        let without_location = trip_detail_snapshot(&photos, false);
        assert_eq!(without_location.sections().len(), 2);
    }
}
