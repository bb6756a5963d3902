//! Segment traversals derived from departure/arrival pairs.

use serde::Serialize;

use crate::domain::{EventId, EventKind, SegmentId, TimeWindow, TrainId};
use crate::topology::TopologyGraph;

use super::snapshot::Timetable;

/// One train running over one segment, `[departure, arrival)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Traversal {
    pub train: TrainId,
    pub segment: SegmentId,
    pub departure: EventId,
    pub arrival: EventId,
    pub window: TimeWindow,
}

impl Traversal {
    /// Entry time onto the segment.
    pub fn entry(&self) -> crate::domain::RailTime {
        self.window.start()
    }
}

impl Timetable {
    /// Every traversal in the snapshot, grouped by train.
    pub fn traversals(&self, topology: &TopologyGraph) -> Vec<Traversal> {
        self.scheduled_trains()
            .flat_map(|train| self.traversals_for_train(topology, train))
            .collect()
    }

    /// Traversals of one train in travel order.
    pub fn traversals_for_train(&self, topology: &TopologyGraph, train: &TrainId) -> Vec<Traversal> {
        self.events_for_train(train)
            .windows(2)
            .filter(|pair| {
                pair[0].kind == EventKind::Departure && pair[1].kind == EventKind::Arrival
            })
            .filter_map(|pair| {
                let (dep, arr) = (&pair[0], &pair[1]);
                let segment = topology.segment_between(&dep.station, &arr.station)?;
                Some(Traversal {
                    train: train.clone(),
                    segment: segment.id.clone(),
                    departure: dep.id.clone(),
                    arrival: arr.id.clone(),
                    window: TimeWindow::starting_at(
                        dep.time(),
                        arr.time().signed_duration_since(dep.time()),
                    ),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{self, time};

    #[test]
    fn seed_traversals() {
        let topology = fixtures::topology();
        let timetable = fixtures::seed_timetable(&topology);
        let traversals = timetable.traversals(&topology);

        assert_eq!(traversals.len(), 3);
        let t002 = traversals
            .iter()
            .find(|t| t.train.as_str() == "T002")
            .unwrap();
        assert_eq!(t002.segment.as_str(), "seg_S2_S3");
        assert_eq!(t002.entry(), time("08:10"));
        assert_eq!(t002.window.end(), time("08:35"));
        assert_eq!(t002.departure.as_str(), "E1");
        assert_eq!(t002.arrival.as_str(), "E2");
    }

    #[test]
    fn no_traversal_for_lone_event() {
        let topology = fixtures::topology();
        let timetable = fixtures::seed_timetable(&topology);
        let none = timetable.traversals_for_train(&topology, &TrainId::parse("T999").unwrap());
        assert!(none.is_empty());
    }
}
