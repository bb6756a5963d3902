//! Versioned, copy-on-write timetable snapshots.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::domain::{EventId, EventKind, PlatformId, RailTime, Train, TrainId};
use crate::topology::TopologyGraph;

use super::error::TimetableError;
use super::event::{EventRecord, TimetableEvent};
use super::policy::DwellPolicy;

/// A single edit to an event, applied by [`Timetable::with_changes`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventChange {
    pub train: TrainId,
    pub event: EventId,
    /// New effective time, if retimed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<RailTime>,
    /// New platform, if reassigned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<PlatformId>,
}

impl EventChange {
    /// Move an event to a new time.
    pub fn retime(train: TrainId, event: EventId, time: RailTime) -> Self {
        Self {
            train,
            event,
            time: Some(time),
            platform: None,
        }
    }

    /// Move an event to another platform at the same station.
    pub fn reassign(train: TrainId, event: EventId, platform: PlatformId) -> Self {
        Self {
            train,
            event,
            time: None,
            platform: Some(platform),
        }
    }
}

/// An immutable timetable snapshot.
///
/// Snapshots are values: a repair never edits one in place but derives a
/// new snapshot with [`Timetable::with_changes`]. Trains untouched by a
/// change share their event storage with the parent snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Timetable {
    version: u64,
    trains: Arc<BTreeMap<TrainId, Train>>,
    /// Events per train, in travel order.
    events: BTreeMap<TrainId, Arc<Vec<TimetableEvent>>>,
}

impl Timetable {
    /// Validate trains and event records into a snapshot (version 0).
    ///
    /// Records of one train must appear in travel order; they are never
    /// re-sorted.
    pub fn build(
        topology: &TopologyGraph,
        trains: Vec<Train>,
        records: Vec<EventRecord>,
        policy: &DwellPolicy,
    ) -> Result<Self, TimetableError> {
        let mut train_map = BTreeMap::new();
        for train in trains {
            train.validate()?;
            let id = train.id.clone();
            if train_map.insert(id.clone(), train).is_some() {
                return Err(TimetableError::DuplicateTrain(id));
            }
        }

        let mut events: BTreeMap<TrainId, Vec<TimetableEvent>> = BTreeMap::new();
        let mut seen: HashSet<(TrainId, EventId)> = HashSet::new();

        for record in records {
            if !train_map.contains_key(&record.train_id) {
                return Err(TimetableError::UnknownTrain {
                    train: record.train_id,
                    event: record.event_id,
                });
            }
            if !seen.insert((record.train_id.clone(), record.event_id.clone())) {
                return Err(TimetableError::DuplicateEvent {
                    train: record.train_id,
                    event: record.event_id,
                });
            }

            let dwell_sec = match policy.resolve(record.kind, record.dwell_sec) {
                Some(dwell) => dwell,
                None => {
                    return Err(TimetableError::MissingDwell {
                        train: record.train_id,
                        event: record.event_id,
                    });
                }
            };
            if record.dwell_sec.is_none() {
                debug!(
                    train = %record.train_id,
                    event = %record.event_id,
                    dwell_sec,
                    "Filled missing dwell from policy"
                );
            }

            events
                .entry(record.train_id)
                .or_default()
                .push(TimetableEvent {
                    id: record.event_id,
                    kind: record.kind,
                    station: record.station_id,
                    platform: record.platform_id,
                    scheduled: record.scheduled_time,
                    actual: record.actual_time,
                    dwell_sec,
                    earliness_sec: record.earliness_sec,
                    lateness_sec: record.lateness_sec,
                });
        }

        for (train, train_events) in &events {
            validate_sequence(topology, train, train_events)?;
            warn_short_runs(topology, train, train_events);
        }

        Ok(Self {
            version: 0,
            trains: Arc::new(train_map),
            events: events
                .into_iter()
                .map(|(train, evs)| (train, Arc::new(evs)))
                .collect(),
        })
    }

    /// Snapshot version; each derived snapshot is one higher than its parent.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Look up a train by id.
    pub fn train(&self, id: &TrainId) -> Option<&Train> {
        self.trains.get(id)
    }

    /// All trains in id order.
    pub fn trains(&self) -> impl Iterator<Item = &Train> {
        self.trains.values()
    }

    /// Events of one train in travel order (empty if it has none).
    pub fn events_for_train(&self, id: &TrainId) -> &[TimetableEvent] {
        self.events.get(id).map(|evs| evs.as_slice()).unwrap_or(&[])
    }

    /// Look up an event by (train, event id).
    pub fn event(&self, train: &TrainId, event: &EventId) -> Option<&TimetableEvent> {
        self.events_for_train(train).iter().find(|e| &e.id == event)
    }

    /// Trains that have at least one event, in id order.
    pub fn scheduled_trains(&self) -> impl Iterator<Item = &TrainId> {
        self.events
            .iter()
            .filter(|(_, evs)| !evs.is_empty())
            .map(|(id, _)| id)
    }

    /// Every event with its train, grouped by train in id order.
    pub fn iter_events(&self) -> impl Iterator<Item = (&TrainId, &TimetableEvent)> {
        self.events
            .iter()
            .flat_map(|(train, evs)| evs.iter().map(move |e| (train, e)))
    }

    /// Total number of events.
    pub fn event_count(&self) -> usize {
        self.events.values().map(|evs| evs.len()).sum()
    }

    /// Derive a new snapshot with `changes` applied.
    ///
    /// The receiver is left untouched. Every changed train is re-validated,
    /// so a change that breaks time order or path consistency fails here.
    pub fn with_changes(
        &self,
        topology: &TopologyGraph,
        changes: &[EventChange],
    ) -> Result<Self, TimetableError> {
        let mut next = self.clone();
        let mut touched = HashSet::new();

        for change in changes {
            let unknown = || TimetableError::UnknownEvent {
                train: change.train.clone(),
                event: change.event.clone(),
            };
            let train_events = next.events.get_mut(&change.train).ok_or_else(unknown)?;
            let event = Arc::make_mut(train_events)
                .iter_mut()
                .find(|e| e.id == change.event)
                .ok_or_else(unknown)?;

            if let Some(time) = change.time {
                event.actual = (time != event.scheduled).then_some(time);
            }
            if let Some(platform) = &change.platform {
                event.platform = platform.clone();
            }
            touched.insert(change.train.clone());
        }

        for train in &touched {
            validate_sequence(topology, train, next.events_for_train(train))?;
        }

        next.version = self.version + 1;
        Ok(next)
    }

    /// Convert back to persisted event records, grouped by train.
    pub fn to_records(&self) -> Vec<EventRecord> {
        self.iter_events()
            .map(|(train, event)| event.to_record(train))
            .collect()
    }
}

/// Check station/platform references, time order and path consistency.
fn validate_sequence(
    topology: &TopologyGraph,
    train: &TrainId,
    events: &[TimetableEvent],
) -> Result<(), TimetableError> {
    for event in events {
        let station = topology
            .station(&event.station)
            .ok_or_else(|| TimetableError::UnknownStation {
                train: train.clone(),
                event: event.id.clone(),
                station: event.station.clone(),
            })?;
        if station.platform(&event.platform).is_none() {
            return Err(TimetableError::UnknownPlatform {
                train: train.clone(),
                event: event.id.clone(),
                station: event.station.clone(),
                platform: event.platform.clone(),
            });
        }
    }

    for pair in events.windows(2) {
        let (prev, cur) = (&pair[0], &pair[1]);

        if cur.time() <= prev.time() {
            return Err(TimetableError::NotTimeOrdered {
                train: train.clone(),
                event: cur.id.clone(),
                previous: prev.id.clone(),
            });
        }

        let broken = |reason| TimetableError::BrokenSequence {
            train: train.clone(),
            event: cur.id.clone(),
            reason,
        };

        match (prev.kind, cur.kind) {
            (EventKind::Arrival, EventKind::Departure) => {
                if cur.station != prev.station {
                    return Err(broken("departs from a station it did not arrive at"));
                }
            }
            (EventKind::Departure, EventKind::Arrival) => {
                if !topology.is_adjacent(&prev.station, &cur.station) {
                    return Err(TimetableError::NoSegment {
                        train: train.clone(),
                        event: cur.id.clone(),
                        from: prev.station.clone(),
                        to: cur.station.clone(),
                    });
                }
            }
            (EventKind::Arrival, EventKind::Arrival) => {
                return Err(broken("two arrivals without a departure between them"));
            }
            (EventKind::Departure, EventKind::Departure) => {
                return Err(broken("two departures without an arrival between them"));
            }
        }
    }

    Ok(())
}

/// Log runs scheduled faster than the segment's nominal travel time.
fn warn_short_runs(topology: &TopologyGraph, train: &TrainId, events: &[TimetableEvent]) {
    for pair in events.windows(2) {
        let (dep, arr) = (&pair[0], &pair[1]);
        if dep.kind != EventKind::Departure || arr.kind != EventKind::Arrival {
            continue;
        }
        let Some(segment) = topology.segment_between(&dep.station, &arr.station) else {
            continue;
        };
        let run = arr.time().signed_duration_since(dep.time());
        if run < segment.travel_time() {
            warn!(
                train = %train,
                segment = %segment.id,
                run_sec = run.num_seconds(),
                nominal_sec = segment.travel_time_sec,
                "Scheduled run is shorter than nominal travel time"
            );
        }
    }
}
