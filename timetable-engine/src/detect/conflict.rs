//! Conflict records and their deterministic ordering.

use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;

use crate::domain::{EventId, PlatformId, SegmentId, StationId, TimeWindow, TrainId};

/// The kind of a conflict. Declaration order is the tie-break order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    PlatformOverlap,
    SegmentCapacityExceeded,
    HeadwayViolation,
    MaintenanceOverlap,
    PlatformLengthViolation,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConflictKind::PlatformOverlap => "platform overlap",
            ConflictKind::SegmentCapacityExceeded => "segment capacity exceeded",
            ConflictKind::HeadwayViolation => "headway violation",
            ConflictKind::MaintenanceOverlap => "maintenance overlap",
            ConflictKind::PlatformLengthViolation => "platform length violation",
        };
        f.write_str(name)
    }
}

/// The infrastructure a conflict is about.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Resource {
    Platform {
        station_id: StationId,
        platform_id: PlatformId,
    },
    Segment {
        segment_id: SegmentId,
    },
}

impl Resource {
    pub fn platform(station: &StationId, platform: &PlatformId) -> Self {
        Resource::Platform {
            station_id: station.clone(),
            platform_id: platform.clone(),
        }
    }

    pub fn segment(segment: &SegmentId) -> Self {
        Resource::Segment {
            segment_id: segment.clone(),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Platform {
                station_id,
                platform_id,
            } => write!(f, "platform {platform_id} at {station_id}"),
            Resource::Segment { segment_id } => write!(f, "segment {segment_id}"),
        }
    }
}

/// A (train, event) pair named by a conflict.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EventRef {
    pub train: TrainId,
    pub event: EventId,
}

impl EventRef {
    pub fn new(train: &TrainId, event: &EventId) -> Self {
        Self {
            train: train.clone(),
            event: event.clone(),
        }
    }
}

/// A detected violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conflict {
    pub kind: ConflictKind,
    pub resource: Resource,
    /// Involved events, sorted.
    pub involved: Vec<EventRef>,
    pub window: TimeWindow,
}

/// What stays the same about a conflict while trains are moved around.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ConflictIdentity {
    pub kind: ConflictKind,
    pub resource: Resource,
    pub trains: Vec<TrainId>,
}

impl Conflict {
    pub(crate) fn new(
        kind: ConflictKind,
        resource: Resource,
        mut involved: Vec<EventRef>,
        window: TimeWindow,
    ) -> Self {
        involved.sort();
        involved.dedup();
        Self {
            kind,
            resource,
            involved,
            window,
        }
    }

    /// Distinct trains involved, sorted by id.
    pub fn trains(&self) -> Vec<TrainId> {
        let mut trains: Vec<TrainId> = self.involved.iter().map(|e| e.train.clone()).collect();
        trains.dedup();
        trains
    }

    /// Events of `train` named by this conflict.
    pub fn events_of<'a>(&'a self, train: &'a TrainId) -> impl Iterator<Item = &'a EventId> {
        self.involved
            .iter()
            .filter(move |e| &e.train == train)
            .map(|e| &e.event)
    }

    pub fn identity(&self) -> ConflictIdentity {
        ConflictIdentity {
            kind: self.kind,
            resource: self.resource.clone(),
            trains: self.trains(),
        }
    }
}

impl ConflictIdentity {
    /// True if `self` is what remains of `other` after some of its trains
    /// left: same kind and resource, strictly fewer trains, none new.
    pub fn narrows(&self, other: &ConflictIdentity) -> bool {
        self.kind == other.kind
            && self.resource == other.resource
            && self.trains.len() < other.trains.len()
            && self.trains.iter().all(|t| other.trains.contains(t))
    }
}

impl Ord for Conflict {
    fn cmp(&self, other: &Self) -> Ordering {
        self.window
            .start()
            .cmp(&other.window.start())
            .then_with(|| self.kind.cmp(&other.kind))
            .then_with(|| self.trains().cmp(&other.trains()))
            .then_with(|| self.resource.cmp(&other.resource))
            .then_with(|| self.window.end().cmp(&other.window.end()))
            .then_with(|| self.involved.cmp(&other.involved))
    }
}

impl PartialOrd for Conflict {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let trains: Vec<String> = self.trains().iter().map(ToString::to_string).collect();
        write!(
            f,
            "{} on {} during {} ({})",
            self.kind,
            self.resource,
            self.window,
            trains.join(", ")
        )
    }
}
