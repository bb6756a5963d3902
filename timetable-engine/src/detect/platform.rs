//! Platform checks: overlapping occupancy and trains too long for their platform.

use std::collections::BTreeMap;

use crate::domain::{PlatformId, StationId};
use crate::timetable::{PlatformOccupancy, ValidationError};

use super::conflict::{Conflict, ConflictKind, EventRef, Resource};

/// Report every pair of different trains whose occupancies of one platform intersect.
pub(super) fn overlaps(occupancies: &[&PlatformOccupancy]) -> Vec<Conflict> {
    let mut by_platform: BTreeMap<(&StationId, &PlatformId), Vec<&PlatformOccupancy>> =
        BTreeMap::new();
    for occupancy in occupancies {
        by_platform
            .entry((&occupancy.station, &occupancy.platform))
            .or_default()
            .push(occupancy);
    }

    let mut conflicts = Vec::new();

    for ((station, platform), mut list) in by_platform {
        list.sort_by(|a, b| {
            (a.window.start(), a.window.end(), &a.train)
                .cmp(&(b.window.start(), b.window.end(), &b.train))
        });

        let mut active: Vec<&PlatformOccupancy> = Vec::new();
        for occupancy in list {
            active.retain(|a| a.window.end() > occupancy.window.start());

            for earlier in &active {
                if earlier.train == occupancy.train {
                    continue;
                }
                let Some(window) = earlier.window.intersection(&occupancy.window) else {
                    continue;
                };
                let involved = event_refs(earlier)
                    .chain(event_refs(occupancy))
                    .collect();
                conflicts.push(Conflict::new(
                    ConflictKind::PlatformOverlap,
                    Resource::platform(station, platform),
                    involved,
                    window,
                ));
            }

            active.push(occupancy);
        }
    }

    conflicts
}

/// One conflict per occupancy rejected for platform length.
pub(super) fn length_violations(rejected: &[&ValidationError]) -> Vec<Conflict> {
    rejected
        .iter()
        .map(|err| {
            let occupancy = &err.occupancy;
            Conflict::new(
                ConflictKind::PlatformLengthViolation,
                Resource::platform(&occupancy.station, &occupancy.platform),
                event_refs(occupancy).collect(),
                occupancy.window,
            )
        })
        .collect()
}

pub(super) fn event_refs(occupancy: &PlatformOccupancy) -> impl Iterator<Item = EventRef> + '_ {
    occupancy
        .events
        .iter()
        .map(|event| EventRef::new(&occupancy.train, event))
}
