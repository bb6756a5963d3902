//! Conflict detection.
//!
//! Detection is a pure function of a timetable snapshot, the constraint
//! registry and the topology. Results come back in a fixed order so two
//! runs over the same input diff cleanly.

mod conflict;
mod headway;
mod maintenance;
mod platform;
mod segment;

use std::collections::HashSet;

use tracing::debug;

use crate::constraints::ConstraintRegistry;
use crate::domain::{PlatformId, SegmentId, StationId};
use crate::timetable::{PlatformOccupancy, Timetable, Traversal, ValidationError};
use crate::topology::TopologyGraph;

pub use conflict::{Conflict, ConflictIdentity, ConflictKind, EventRef, Resource};

/// Restricts detection to a set of resources.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceFilter {
    platforms: HashSet<(StationId, PlatformId)>,
    segments: HashSet<SegmentId>,
}

impl ResourceFilter {
    /// A filter that matches nothing until resources are added.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, resource: &Resource) {
        match resource {
            Resource::Platform {
                station_id,
                platform_id,
            } => {
                self.platforms
                    .insert((station_id.clone(), platform_id.clone()));
            }
            Resource::Segment { segment_id } => {
                self.segments.insert(segment_id.clone());
            }
        }
    }

    pub fn with(mut self, resource: &Resource) -> Self {
        self.insert(resource);
        self
    }

    pub fn includes_platform(&self, station: &StationId, platform: &PlatformId) -> bool {
        self.platforms.contains(&(station.clone(), platform.clone()))
    }

    pub fn includes_segment(&self, segment: &SegmentId) -> bool {
        self.segments.contains(segment)
    }

    pub fn is_empty(&self) -> bool {
        self.platforms.is_empty() && self.segments.is_empty()
    }
}

/// Finds every conflict in a timetable snapshot.
#[derive(Debug, Clone, Copy)]
pub struct ConflictDetector<'a> {
    topology: &'a TopologyGraph,
    constraints: &'a ConstraintRegistry,
}

impl<'a> ConflictDetector<'a> {
    pub fn new(topology: &'a TopologyGraph, constraints: &'a ConstraintRegistry) -> Self {
        Self {
            topology,
            constraints,
        }
    }

    /// All conflicts in `timetable`, sorted.
    pub fn detect(&self, timetable: &Timetable) -> Vec<Conflict> {
        let derivation = timetable.occupancy_intervals(self.topology);
        let traversals = timetable.traversals(self.topology);

        self.run(
            derivation.occupancies.iter().collect(),
            derivation.rejected.iter().collect(),
            traversals.iter().collect(),
        )
    }

    /// Conflicts on the resources in `filter` only, sorted.
    pub fn detect_in(&self, timetable: &Timetable, filter: &ResourceFilter) -> Vec<Conflict> {
        let derivation = timetable.occupancy_intervals(self.topology);
        let traversals = timetable.traversals(self.topology);

        let on_platform =
            |o: &PlatformOccupancy| filter.includes_platform(&o.station, &o.platform);

        self.run(
            derivation
                .occupancies
                .iter()
                .filter(|o| on_platform(o))
                .collect(),
            derivation
                .rejected
                .iter()
                .filter(|r| on_platform(&r.occupancy))
                .collect(),
            traversals
                .iter()
                .filter(|t| filter.includes_segment(&t.segment))
                .collect(),
        )
    }

    fn run(
        &self,
        occupancies: Vec<&PlatformOccupancy>,
        rejected: Vec<&ValidationError>,
        traversals: Vec<&Traversal>,
    ) -> Vec<Conflict> {
        let mut conflicts = platform::overlaps(&occupancies);
        conflicts.extend(platform::length_violations(&rejected));
        conflicts.extend(segment::capacity(self.topology, &traversals));
        conflicts.extend(headway::violations(self.constraints, &traversals));
        conflicts.extend(maintenance::platform_closures(
            self.constraints,
            &occupancies,
        ));
        conflicts.extend(maintenance::segment_closures(self.constraints, &traversals));
        conflicts.sort();

        debug!(
            occupancies = occupancies.len(),
            traversals = traversals.len(),
            conflicts = conflicts.len(),
            "Detection complete"
        );

        conflicts
    }
}

/// Detect every conflict in `timetable`.
pub fn detect_conflicts(
    topology: &TopologyGraph,
    constraints: &ConstraintRegistry,
    timetable: &Timetable,
) -> Vec<Conflict> {
    ConflictDetector::new(topology, constraints).detect(timetable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EventId, TrainId};
    use crate::fixtures::{self, arrival, departure, time, train, window};
    use crate::timetable::DwellPolicy;

    fn tid(s: &str) -> TrainId {
        TrainId::parse(s).unwrap()
    }

    #[test]
    fn seed_conflicts() {
        let topology = fixtures::topology();
        let registry = ConstraintRegistry::new(&topology, fixtures::seed_constraints()).unwrap();
        let timetable = fixtures::seed_timetable(&topology);

        let conflicts = ConflictDetector::new(&topology, &registry).detect(&timetable);
        let kinds: Vec<_> = conflicts.iter().map(|c| (c.kind, c.window)).collect();

        assert_eq!(
            kinds,
            vec![
                (ConflictKind::PlatformLengthViolation, window("08:07", "08:10")),
                (ConflictKind::SegmentCapacityExceeded, window("08:15", "08:20")),
                (ConflictKind::PlatformLengthViolation, window("08:35", "08:45")),
            ]
        );
        assert_eq!(conflicts[1].trains(), vec![tid("T001"), tid("T003")]);
    }

    #[test]
    fn platform_overlap_scenario() {
        let topology = fixtures::topology();
        let registry = ConstraintRegistry::empty();
        let timetable = Timetable::build(
            &topology,
            vec![train("A", 1, 200.0), train("B", 2, 200.0)],
            vec![
                arrival("A", "E1", "S2", "S2P1", "08:20", 300, 60, 300),
                arrival("B", "E1", "S2", "S2P1", "08:22", 300, 60, 300),
            ],
            &DwellPolicy::default(),
        )
        .unwrap();

        let conflicts = ConflictDetector::new(&topology, &registry).detect(&timetable);
        assert_eq!(conflicts.len(), 1);
        let conflict = &conflicts[0];
        assert_eq!(conflict.kind, ConflictKind::PlatformOverlap);
        assert_eq!(conflict.window, window("08:22", "08:25"));
        assert_eq!(conflict.trains(), vec![tid("A"), tid("B")]);
        assert_eq!(
            conflict.involved,
            vec![
                EventRef::new(&tid("A"), &EventId::parse("E1").unwrap()),
                EventRef::new(&tid("B"), &EventId::parse("E1").unwrap()),
            ]
        );
    }

    #[test]
    fn headway_scenario() {
        let topology = fixtures::topology();
        let registry = ConstraintRegistry::new(&topology, fixtures::seed_constraints()).unwrap();
        let timetable = Timetable::build(
            &topology,
            vec![train("A", 1, 200.0), train("B", 2, 200.0)],
            vec![
                departure("A", "E1", "S2", "S2P1", "08:10", 120, 60, 300),
                arrival("A", "E2", "S3", "S3P1", "08:35", 300, 60, 300),
                departure("B", "E1", "S2", "S2P2", "08:12", 120, 60, 1800),
                arrival("B", "E2", "S3", "S3P2", "08:37", 300, 60, 1800),
            ],
            &DwellPolicy::default(),
        )
        .unwrap();

        let conflicts = ConflictDetector::new(&topology, &registry).detect(&timetable);
        let headway: Vec<_> = conflicts
            .iter()
            .filter(|c| c.kind == ConflictKind::HeadwayViolation)
            .collect();
        assert_eq!(headway.len(), 1);
        assert_eq!(headway[0].window, window("08:12", "08:15"));
        assert_eq!(headway[0].trains(), vec![tid("A"), tid("B")]);
        assert!(
            conflicts
                .iter()
                .any(|c| c.kind == ConflictKind::SegmentCapacityExceeded)
        );
    }

    #[test]
    fn length_violation_scenario() {
        let topology = fixtures::topology();
        let registry = ConstraintRegistry::empty();
        let timetable = Timetable::build(
            &topology,
            vec![train("T002", 3, 500.0), train("T004", 1, 200.0)],
            vec![
                arrival("T002", "E1", "S3", "S3P3", "08:35", 600, 120, 600),
                arrival("T004", "E1", "S3", "S3P3", "08:40", 300, 60, 300),
            ],
            &DwellPolicy::default(),
        )
        .unwrap();

        let conflicts = ConflictDetector::new(&topology, &registry).detect(&timetable);
        // The rejected occupancy does not also overlap T004.
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].kind, ConflictKind::PlatformLengthViolation);
        assert_eq!(conflicts[0].trains(), vec![tid("T002")]);
    }

    #[test]
    fn maintenance_scenario() {
        let topology = fixtures::topology();
        let registry = ConstraintRegistry::new(&topology, fixtures::seed_constraints()).unwrap();
        let timetable = Timetable::build(
            &topology,
            vec![train("A", 1, 200.0)],
            vec![
                departure("A", "E1", "S1", "S1P3", "07:40", 120, 60, 300),
                arrival("A", "E2", "S2", "S2P1", "08:00", 300, 60, 300),
            ],
            &DwellPolicy::default(),
        )
        .unwrap();

        let conflicts = ConflictDetector::new(&topology, &registry).detect(&timetable);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].kind, ConflictKind::MaintenanceOverlap);
        assert_eq!(conflicts[0].window, window("07:40", "07:50"));
    }

    #[test]
    fn scoped_detection() {
        let topology = fixtures::topology();
        let registry = ConstraintRegistry::new(&topology, fixtures::seed_constraints()).unwrap();
        let timetable = fixtures::seed_timetable(&topology);
        let detector = ConflictDetector::new(&topology, &registry);

        let segment = Resource::segment(&SegmentId::parse("seg_S1_S2").unwrap());
        let scoped = detector.detect_in(&timetable, &ResourceFilter::new().with(&segment));
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].resource, segment);

        assert!(detector.detect_in(&timetable, &ResourceFilter::new()).is_empty());
    }

    #[test]
    fn detection_is_deterministic() {
        let topology = fixtures::topology();
        let registry = ConstraintRegistry::new(&topology, fixtures::seed_constraints()).unwrap();
        let timetable = fixtures::seed_timetable(&topology);
        let detector = ConflictDetector::new(&topology, &registry);

        assert_eq!(detector.detect(&timetable), detector.detect(&timetable));
        assert_eq!(detector.detect(&timetable)[0].window.start(), time("08:07"));
    }
}
