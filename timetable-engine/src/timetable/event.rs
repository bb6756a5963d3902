//! Timetable event types.
//!
//! `EventRecord` is the persisted, unvalidated shape of an event. The engine
//! only works with `TimetableEvent`, produced by `Timetable::build` once the
//! record has been checked against the topology and the dwell policy.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::domain::{EventId, EventKind, PlatformId, RailTime, StationId, TimeWindow, TrainId};

/// A timetable event as stored or received over the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub train_id: TrainId,
    pub event_id: EventId,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub station_id: StationId,
    pub platform_id: PlatformId,
    pub scheduled_time: RailTime,
    /// Retimed value set by the repairer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_time: Option<RailTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dwell_sec: Option<u32>,
    pub earliness_sec: u32,
    pub lateness_sec: u32,
}

/// A validated event belonging to one train.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimetableEvent {
    pub id: EventId,
    pub kind: EventKind,
    pub station: StationId,
    pub platform: PlatformId,
    /// The published time.
    pub scheduled: RailTime,
    /// The repaired time, if the event has been moved.
    pub actual: Option<RailTime>,
    pub dwell_sec: u32,
    pub earliness_sec: u32,
    pub lateness_sec: u32,
}

impl TimetableEvent {
    /// Returns the effective time: actual if retimed, else scheduled.
    pub fn time(&self) -> RailTime {
        self.actual.unwrap_or(self.scheduled)
    }

    /// Returns the dwell as a Duration.
    pub fn dwell(&self) -> Duration {
        Duration::seconds(i64::from(self.dwell_sec))
    }

    /// Returns the allowed earliness as a Duration.
    pub fn earliness(&self) -> Duration {
        Duration::seconds(i64::from(self.earliness_sec))
    }

    /// Returns the allowed lateness as a Duration.
    pub fn lateness(&self) -> Duration {
        Duration::seconds(i64::from(self.lateness_sec))
    }

    /// The inclusive range of times this event may be moved to.
    pub fn allowed_range(&self) -> (RailTime, RailTime) {
        (
            self.scheduled - self.earliness(),
            self.scheduled + self.lateness(),
        )
    }

    /// True if `time` lies within `[scheduled - earliness, scheduled + lateness]`.
    pub fn allows(&self, time: RailTime) -> bool {
        let (earliest, latest) = self.allowed_range();
        earliest <= time && time <= latest
    }

    /// Signed seconds between effective and scheduled time (positive = late).
    pub fn deviation_sec(&self) -> i64 {
        self.time().seconds_since(self.scheduled)
    }

    /// True if the effective time is within the lateness bound.
    pub fn is_on_time(&self) -> bool {
        self.deviation_sec().abs() <= i64::from(self.lateness_sec)
    }

    /// Window for a platform stop of `dwell` either side of the event.
    pub(crate) fn dwell_window(&self) -> TimeWindow {
        match self.kind {
            EventKind::Arrival => TimeWindow::starting_at(self.time(), self.dwell()),
            EventKind::Departure => {
                TimeWindow::starting_at(self.time() - self.dwell(), self.dwell())
            }
        }
    }

    /// Convert back to the persisted shape.
    pub fn to_record(&self, train: &TrainId) -> EventRecord {
        EventRecord {
            train_id: train.clone(),
            event_id: self.id.clone(),
            kind: self.kind,
            station_id: self.station.clone(),
            platform_id: self.platform.clone(),
            scheduled_time: self.scheduled,
            actual_time: self.actual,
            dwell_sec: Some(self.dwell_sec),
            earliness_sec: self.earliness_sec,
            lateness_sec: self.lateness_sec,
        }
    }
}
