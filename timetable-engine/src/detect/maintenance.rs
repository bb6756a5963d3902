//! Maintenance check: occupancy or traversal during a closure.

use crate::constraints::ConstraintRegistry;
use crate::timetable::{PlatformOccupancy, Traversal};

use super::conflict::{Conflict, ConflictKind, Resource};
use super::{platform, segment};

pub(super) fn platform_closures(
    constraints: &ConstraintRegistry,
    occupancies: &[&PlatformOccupancy],
) -> Vec<Conflict> {
    let mut conflicts = Vec::new();
    for occupancy in occupancies {
        for closure in constraints.platform_closures(&occupancy.station, &occupancy.platform) {
            if let Some(window) = closure.intersection(&occupancy.window) {
                conflicts.push(Conflict::new(
                    ConflictKind::MaintenanceOverlap,
                    Resource::platform(&occupancy.station, &occupancy.platform),
                    platform::event_refs(occupancy).collect(),
                    window,
                ));
            }
        }
    }
    conflicts
}

pub(super) fn segment_closures(
    constraints: &ConstraintRegistry,
    traversals: &[&Traversal],
) -> Vec<Conflict> {
    let mut conflicts = Vec::new();
    for traversal in traversals {
        for closure in constraints.segment_closures(&traversal.segment) {
            if let Some(window) = closure.intersection(&traversal.window) {
                conflicts.push(Conflict::new(
                    ConflictKind::MaintenanceOverlap,
                    Resource::segment(&traversal.segment),
                    segment::event_refs(traversal).into(),
                    window,
                ));
            }
        }
    }
    conflicts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EventId, PlatformId, SegmentId, StationId, TrainId};
    use crate::fixtures::{self, window};

    fn registry() -> ConstraintRegistry {
        ConstraintRegistry::new(&fixtures::topology(), fixtures::seed_constraints()).unwrap()
    }

    #[test]
    fn traversal_during_closure() {
        let traversal = Traversal {
            train: TrainId::parse("T001").unwrap(),
            segment: SegmentId::parse("seg_S1_S2").unwrap(),
            departure: EventId::parse("E1").unwrap(),
            arrival: EventId::parse("E2").unwrap(),
            window: window("07:40", "08:00"),
        };
        let conflicts = segment_closures(&registry(), &[&traversal]);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].window, window("07:40", "07:50"));
        assert_eq!(conflicts[0].involved.len(), 2);
    }

    #[test]
    fn occupancy_during_closure() {
        let occupancy = PlatformOccupancy {
            train: TrainId::parse("T003").unwrap(),
            station: StationId::parse("S1").unwrap(),
            platform: PlatformId::parse("S1P3").unwrap(),
            window: window("07:58", "08:05"),
            events: vec![EventId::parse("E1").unwrap()],
        };
        let conflicts = platform_closures(&registry(), &[&occupancy]);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].window, window("08:00", "08:05"));
    }

    #[test]
    fn ending_at_closure_start_is_fine() {
        let occupancy = PlatformOccupancy {
            train: TrainId::parse("T003").unwrap(),
            station: StationId::parse("S1").unwrap(),
            platform: PlatformId::parse("S1P3").unwrap(),
            window: window("07:55", "08:00"),
            events: vec![EventId::parse("E1").unwrap()],
        };
        assert!(platform_closures(&registry(), &[&occupancy]).is_empty());
    }
}
