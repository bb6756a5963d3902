//! Platform occupancy derived from adjacent events.

use serde::Serialize;
use tracing::warn;

use crate::domain::{EventId, EventKind, PlatformId, StationId, TimeWindow, TrainId};
use crate::topology::TopologyGraph;

use super::error::ValidationError;
use super::event::TimetableEvent;
use super::snapshot::Timetable;

/// The interval during which one train holds one platform.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlatformOccupancy {
    pub train: TrainId,
    pub station: StationId,
    pub platform: PlatformId,
    pub window: TimeWindow,
    /// The events the interval was derived from (one, or an arrival and its departure).
    pub events: Vec<EventId>,
}

/// Occupancies of a snapshot, with the ones rejected for platform length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OccupancyDerivation {
    pub occupancies: Vec<PlatformOccupancy>,
    pub rejected: Vec<ValidationError>,
}

impl Timetable {
    /// Derive platform occupancy for every train.
    ///
    /// Occupancies whose train is longer than the platform are moved to
    /// `rejected` and take no further part in detection.
    pub fn occupancy_intervals(&self, topology: &TopologyGraph) -> OccupancyDerivation {
        let mut derivation = OccupancyDerivation::default();
        for train in self.scheduled_trains() {
            let part = self.occupancies_for_train(topology, train);
            derivation.occupancies.extend(part.occupancies);
            derivation.rejected.extend(part.rejected);
        }
        derivation
    }

    /// Derive platform occupancy for one train.
    pub fn occupancies_for_train(
        &self,
        topology: &TopologyGraph,
        train: &TrainId,
    ) -> OccupancyDerivation {
        let mut derivation = OccupancyDerivation::default();
        let length_m = self.train(train).map(|t| t.length_m);

        for occupancy in raw_occupancies(train, self.events_for_train(train)) {
            let platform = topology.platform(&occupancy.station, &occupancy.platform);
            match (platform, length_m) {
                (Some(platform), Some(length_m)) if !platform.fits(length_m) => {
                    warn!(
                        train = %occupancy.train,
                        station = %occupancy.station,
                        platform = %occupancy.platform,
                        train_length_m = length_m,
                        platform_length_m = platform.length_m,
                        "Train does not fit platform; occupancy excluded"
                    );
                    derivation.rejected.push(ValidationError {
                        occupancy,
                        train_length_m: length_m,
                        platform_length_m: platform.length_m,
                    });
                }
                _ => derivation.occupancies.push(occupancy),
            }
        }

        derivation
    }
}

/// Pair each event with its dwell interval, clipped at the neighbouring events.
fn raw_occupancies(train: &TrainId, events: &[TimetableEvent]) -> Vec<PlatformOccupancy> {
    let mut out = Vec::new();
    let mut i = 0;

    while i < events.len() {
        let event = &events[i];
        let prev = i.checked_sub(1).map(|p| &events[p]);
        let next = events.get(i + 1);

        let (window, ids, consumed) = match (event.kind, next) {
            (EventKind::Arrival, Some(dep))
                if dep.kind == EventKind::Departure
                    && dep.station == event.station
                    && dep.platform == event.platform =>
            {
                let window = TimeWindow::starting_at(
                    event.time(),
                    dep.time().signed_duration_since(event.time()),
                );
                (window, vec![event.id.clone(), dep.id.clone()], 2)
            }
            (EventKind::Arrival, _) => {
                let mut window = event.dwell_window();
                if let Some(next) = next {
                    window = TimeWindow::starting_at(
                        window.start(),
                        window.end().min(next.time()).signed_duration_since(window.start()),
                    );
                }
                (window, vec![event.id.clone()], 1)
            }
            (EventKind::Departure, _) => {
                let mut window = event.dwell_window();
                if let Some(prev) = prev {
                    let start = window.start().max(prev.time());
                    window = TimeWindow::starting_at(start, window.end().signed_duration_since(start));
                }
                (window, vec![event.id.clone()], 1)
            }
        };

        if !window.is_empty() {
            out.push(PlatformOccupancy {
                train: train.clone(),
                station: event.station.clone(),
                platform: event.platform.clone(),
                window,
                events: ids,
            });
        }
        i += consumed;
    }

    out
}
