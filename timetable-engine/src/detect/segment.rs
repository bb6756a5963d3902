//! Segment capacity check.

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::{RailTime, SegmentId, TimeWindow};
use crate::timetable::Traversal;
use crate::topology::TopologyGraph;

use super::conflict::{Conflict, ConflictKind, EventRef, Resource};

/// Report each maximal window during which a segment carries more trains
/// than its capacity.
pub(super) fn capacity(topology: &TopologyGraph, traversals: &[&Traversal]) -> Vec<Conflict> {
    let mut conflicts = Vec::new();

    for (segment_id, list) in by_segment(traversals) {
        let Some(segment) = topology.segment(segment_id) else {
            continue;
        };
        let limit = segment.capacity as usize;

        // (time, is_start, index); ends sort before starts at equal times
        // so back-to-back traversals do not count as concurrent.
        let mut points: Vec<(RailTime, bool, usize)> = Vec::with_capacity(list.len() * 2);
        for (i, traversal) in list.iter().enumerate() {
            points.push((traversal.window.start(), true, i));
            points.push((traversal.window.end(), false, i));
        }
        points.sort();

        let mut active: BTreeSet<usize> = BTreeSet::new();
        let mut present: BTreeSet<usize> = BTreeSet::new();
        let mut opened: Option<RailTime> = None;

        for (at, is_start, i) in points {
            if is_start {
                active.insert(i);
            } else {
                active.remove(&i);
            }

            match opened {
                None if active.len() > limit => {
                    opened = Some(at);
                    present = active.clone();
                }
                Some(_) if active.len() > limit => {
                    present.extend(active.iter().copied());
                }
                Some(start) if active.len() <= limit => {
                    if let Ok(window) = TimeWindow::new(start, at) {
                        if !window.is_empty() {
                            conflicts.push(Conflict::new(
                                ConflictKind::SegmentCapacityExceeded,
                                Resource::segment(segment_id),
                                present.iter().flat_map(|&i| event_refs(list[i])).collect(),
                                window,
                            ));
                        }
                    }
                    opened = None;
                    present.clear();
                }
                _ => {}
            }
        }
    }

    conflicts
}

pub(super) fn by_segment<'a>(
    traversals: &[&'a Traversal],
) -> BTreeMap<&'a SegmentId, Vec<&'a Traversal>> {
    let mut map: BTreeMap<&SegmentId, Vec<&Traversal>> = BTreeMap::new();
    for traversal in traversals {
        map.entry(&traversal.segment).or_default().push(traversal);
    }
    map
}

pub(super) fn event_refs(traversal: &Traversal) -> [EventRef; 2] {
    [
        EventRef::new(&traversal.train, &traversal.departure),
        EventRef::new(&traversal.train, &traversal.arrival),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EventId, TrainId};
    use crate::fixtures::{self, window};

    fn trav(train: &str, segment: &str, start: &str, end: &str) -> Traversal {
        Traversal {
            train: TrainId::parse(train).unwrap(),
            segment: SegmentId::parse(segment).unwrap(),
            departure: EventId::parse("E1").unwrap(),
            arrival: EventId::parse("E2").unwrap(),
            window: window(start, end),
        }
    }

    #[test]
    fn seed_capacity_conflict() {
        let topology = fixtures::topology();
        let a = trav("T001", "seg_S1_S2", "08:00", "08:20");
        let b = trav("T003", "seg_S1_S2", "08:15", "08:35");

        let conflicts = capacity(&topology, &[&a, &b]);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].window, window("08:15", "08:20"));
        assert_eq!(conflicts[0].involved.len(), 4);
    }

    #[test]
    fn back_to_back_is_fine() {
        let topology = fixtures::topology();
        let a = trav("A", "seg_S1_S2", "08:00", "08:20");
        let b = trav("B", "seg_S1_S2", "08:20", "08:40");
        assert!(capacity(&topology, &[&a, &b]).is_empty());
    }

    #[test]
    fn maximal_window_collects_every_train() {
        let topology = fixtures::topology();
        let a = trav("A", "seg_S2_S3", "08:00", "08:30");
        let b = trav("B", "seg_S2_S3", "08:10", "08:20");
        let c = trav("C", "seg_S2_S3", "08:15", "08:40");

        let conflicts = capacity(&topology, &[&a, &b, &c]);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].window, window("08:10", "08:30"));
        assert_eq!(conflicts[0].trains().len(), 3);
    }

    #[test]
    fn separate_windows_reported_separately() {
        let topology = fixtures::topology();
        let a = trav("A", "seg_S2_S3", "08:00", "08:10");
        let b = trav("B", "seg_S2_S3", "08:05", "08:15");
        let c = trav("C", "seg_S2_S3", "09:00", "09:10");
        let d = trav("D", "seg_S2_S3", "09:05", "09:15");

        let conflicts = capacity(&topology, &[&a, &b, &c, &d]);
        assert_eq!(conflicts.len(), 2);
        assert_eq!(conflicts[0].window, window("08:05", "08:10"));
        assert_eq!(conflicts[1].window, window("09:05", "09:10"));
    }
}
