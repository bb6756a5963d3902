//! Candidate selection and move generation.
//!
//! Nothing here decides whether a move is good; the repairer verifies each
//! candidate against a scoped re-detection.

use std::cmp::Reverse;
use std::collections::HashSet;

use chrono::Duration;
use serde::Serialize;

use crate::constraints::ConstraintRegistry;
use crate::detect::{Conflict, ConflictIdentity, Resource};
use crate::domain::{EventId, EventKind, PlatformId, RailTime, TimeWindow, TrainId};
use crate::timetable::{EventChange, Timetable, TimetableEvent};
use crate::topology::TopologyGraph;

/// A change made to one train to clear one conflict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Move {
    Reassign { platform: PlatformId },
    Shift { delta_sec: i64 },
    ReassignAndShift { platform: PlatformId, delta_sec: i64 },
}

/// A move the repairer accepted, with the edits it made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedMove {
    pub conflict: ConflictIdentity,
    pub train: TrainId,
    #[serde(rename = "move")]
    pub action: Move,
    pub changes: Vec<EventChange>,
}

/// Trains allowed to move for `conflict`, most junior first.
///
/// Yield order is higher priority number, then later scheduled time at the
/// conflict, then larger train id. When several trains are involved the most senior
/// one stays put.
pub(super) fn candidates(timetable: &Timetable, conflict: &Conflict) -> Vec<TrainId> {
    let mut trains: Vec<_> = conflict
        .trains()
        .into_iter()
        .filter_map(|train| {
            let priority = timetable.train(&train)?.priority;
            let at = conflict
                .events_of(&train)
                .filter_map(|event| timetable.event(&train, event))
                .map(|event| event.scheduled)
                .min()?;
            Some((priority, at, train))
        })
        .collect();

    trains.sort_by(|a, b| b.cmp(a));
    if trains.len() > 1 {
        trains.pop();
    }
    trains.into_iter().map(|(_, _, train)| train).collect()
}

/// Other platforms at the conflict's station that `train` fits, in declared order.
pub(super) fn reassign_targets(
    topology: &TopologyGraph,
    timetable: &Timetable,
    conflict: &Conflict,
    train: &TrainId,
) -> Vec<PlatformId> {
    let Resource::Platform {
        station_id,
        platform_id,
    } = &conflict.resource
    else {
        return Vec::new();
    };
    let (Some(station), Some(train)) = (topology.station(station_id), timetable.train(train))
    else {
        return Vec::new();
    };

    station
        .platforms()
        .iter()
        .filter(|p| &p.id != platform_id && p.fits(train.length_m))
        .map(|p| p.id.clone())
        .collect()
}

pub(super) fn reassign_changes(
    train: &TrainId,
    group: &[EventId],
    platform: &PlatformId,
) -> Vec<EventChange> {
    group
        .iter()
        .map(|event| EventChange::reassign(train.clone(), event.clone(), platform.clone()))
        .collect()
}

/// Shift amounts that line the group's intervals up with a neighbour,
/// smallest first, later before earlier on ties.
pub(super) fn shift_deltas(
    topology: &TopologyGraph,
    constraints: &ConstraintRegistry,
    timetable: &Timetable,
    train: &TrainId,
    group: &[EventId],
    limit: usize,
) -> Vec<Duration> {
    let in_group = |event: &EventId| group.contains(event);
    let occupancies = timetable.occupancy_intervals(topology).occupancies;
    let traversals = timetable.traversals(topology);
    let mut deltas = Vec::new();

    for own in occupancies
        .iter()
        .filter(|o| &o.train == train && o.events.iter().any(in_group))
    {
        let w = own.window;
        for other in occupancies.iter().filter(|o| {
            &o.train != train && o.station == own.station && o.platform == own.platform
        }) {
            push_aligning(&mut deltas, &w, &other.window);
        }
        for closure in constraints.platform_closures(&own.station, &own.platform) {
            push_aligning(&mut deltas, &w, closure);
        }
    }

    for own in traversals
        .iter()
        .filter(|t| &t.train == train && (in_group(&t.departure) || in_group(&t.arrival)))
    {
        let w = own.window;
        let headway = constraints.headway(&own.segment);
        for other in traversals
            .iter()
            .filter(|t| &t.train != train && t.segment == own.segment)
        {
            push_aligning(&mut deltas, &w, &other.window);
            if let Some(gap) = headway {
                deltas.push((other.entry() + gap).signed_duration_since(w.start()));
                deltas.push((other.entry() - gap).signed_duration_since(w.start()));
            }
        }
        for closure in constraints.segment_closures(&own.segment) {
            push_aligning(&mut deltas, &w, closure);
        }
    }

    let mut seen = HashSet::new();
    deltas.retain(|d| !d.is_zero() && seen.insert(d.num_seconds()));
    deltas.sort_by_key(|d| (d.num_seconds().abs(), Reverse(d.num_seconds())));
    deltas.truncate(limit);
    deltas
}

/// Deltas that move `own` to start where `other` ends, or end where it starts.
fn push_aligning(deltas: &mut Vec<Duration>, own: &TimeWindow, other: &TimeWindow) {
    deltas.push(other.end().signed_duration_since(own.start()));
    deltas.push(other.start().signed_duration_since(own.end()));
}

/// Retime the group by `delta`, carrying neighbours along where the
/// sequence would otherwise break.
///
/// Returns `None` if any moved event would leave its allowed range.
pub(super) fn shift_changes(
    topology: &TopologyGraph,
    timetable: &Timetable,
    train: &TrainId,
    group: &[EventId],
    delta: Duration,
) -> Option<Vec<EventChange>> {
    let events = timetable.events_for_train(train);
    let indices: Vec<usize> = events
        .iter()
        .enumerate()
        .filter(|(_, e)| group.contains(&e.id))
        .map(|(i, _)| i)
        .collect();
    let (&lo, &hi) = (indices.first()?, indices.last()?);

    let mut times: Vec<RailTime> = events.iter().map(TimetableEvent::time).collect();
    let mut moved = vec![false; events.len()];
    for &i in &indices {
        times[i] = events[i].time().checked_add(delta)?;
        moved[i] = true;
    }

    for j in hi + 1..events.len() {
        if link_holds(topology, &events[j - 1], times[j - 1], &events[j], times[j]) {
            break;
        }
        times[j] = events[j].time().checked_add(delta)?;
        moved[j] = true;
    }
    for j in (0..lo).rev() {
        if link_holds(topology, &events[j], times[j], &events[j + 1], times[j + 1]) {
            break;
        }
        times[j] = events[j].time().checked_add(delta)?;
        moved[j] = true;
    }

    let mut changes = Vec::new();
    for (i, event) in events.iter().enumerate() {
        if !moved[i] {
            continue;
        }
        if !event.allows(times[i]) {
            return None;
        }
        changes.push(EventChange::retime(train.clone(), event.id.clone(), times[i]));
    }
    Some(changes)
}

/// True if `next` at `next_at` still follows `prev` at `prev_at`.
///
/// A run may not get shorter than the segment's nominal time, unless it was
/// already scheduled shorter, in which case it may not shrink further.
fn link_holds(
    topology: &TopologyGraph,
    prev: &TimetableEvent,
    prev_at: RailTime,
    next: &TimetableEvent,
    next_at: RailTime,
) -> bool {
    if next_at <= prev_at {
        return false;
    }
    if prev.kind == EventKind::Departure && next.kind == EventKind::Arrival {
        if let Some(segment) = topology.segment_between(&prev.station, &next.station) {
            let scheduled_run = next.time().signed_duration_since(prev.time());
            let required = segment.travel_time().min(scheduled_run);
            return next_at.signed_duration_since(prev_at) >= required;
        }
    }
    true
}

/// Every resource `train` uses in `timetable`.
pub(super) fn resources_of(
    topology: &TopologyGraph,
    timetable: &Timetable,
    train: &TrainId,
) -> Vec<Resource> {
    let derivation = timetable.occupancies_for_train(topology, train);
    let platforms = derivation
        .occupancies
        .iter()
        .chain(derivation.rejected.iter().map(|r| &r.occupancy))
        .map(|o| Resource::platform(&o.station, &o.platform));
    let segments = timetable
        .traversals_for_train(topology, train)
        .into_iter()
        .map(|t| Resource::segment(&t.segment));
    platforms.chain(segments).collect()
}
