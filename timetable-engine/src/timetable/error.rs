//! Timetable error types.

use crate::domain::{EventId, InvalidTrain, PlatformId, StationId, TrainId};

use super::PlatformOccupancy;

/// Errors that reject a timetable.
///
/// These are fatal for the scenario that owns the timetable only.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TimetableError {
    /// A train record is malformed
    #[error(transparent)]
    InvalidTrain(#[from] InvalidTrain),

    /// Two train records share an id
    #[error("duplicate train {0}")]
    DuplicateTrain(TrainId),

    /// An event references a train not in the timetable
    #[error("event {event} references unknown train {train}")]
    UnknownTrain { train: TrainId, event: EventId },

    /// An event id is used twice within one train
    #[error("duplicate event {event} for train {train}")]
    DuplicateEvent { train: TrainId, event: EventId },

    /// A change refers to an event that does not exist
    #[error("train {train} has no event {event}")]
    UnknownEvent { train: TrainId, event: EventId },

    /// An event names a station missing from the topology
    #[error("event {event} of train {train} references unknown station {station}")]
    UnknownStation {
        train: TrainId,
        event: EventId,
        station: StationId,
    },

    /// An event names a platform its station does not have
    #[error("event {event} of train {train} references unknown platform {platform} at {station}")]
    UnknownPlatform {
        train: TrainId,
        event: EventId,
        station: StationId,
        platform: PlatformId,
    },

    /// An event is not strictly later than its predecessor
    #[error("event {event} of train {train} is not after event {previous}")]
    NotTimeOrdered {
        train: TrainId,
        event: EventId,
        previous: EventId,
    },

    /// No dwell given and the dwell policy requires one
    #[error("event {event} of train {train} has no dwell duration")]
    MissingDwell { train: TrainId, event: EventId },

    /// A departure is followed by an arrival with no segment between them
    #[error("train {train} runs from {from} to {to} (event {event}) but no segment joins them")]
    NoSegment {
        train: TrainId,
        event: EventId,
        from: StationId,
        to: StationId,
    },

    /// Arrivals and departures do not alternate along the path
    #[error("event {event} of train {train} breaks the event sequence: {reason}")]
    BrokenSequence {
        train: TrainId,
        event: EventId,
        reason: &'static str,
    },
}

/// A train that does not fit the platform it is assigned to.
///
/// The offending occupancy is excluded from derived occupancy and reported
/// instead; the rest of the timetable remains usable.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error(
    "train {} ({} m) does not fit platform {} ({} m) at station {}",
    .occupancy.train,
    .train_length_m,
    .occupancy.platform,
    .platform_length_m,
    .occupancy.station
)]
pub struct ValidationError {
    pub occupancy: PlatformOccupancy,
    pub train_length_m: f64,
    pub platform_length_m: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::time;
    use crate::domain::TimeWindow;

    #[test]
    fn error_display() {
        let train = TrainId::parse("T001").unwrap();
        let event = EventId::parse("E2").unwrap();

        let err = TimetableError::NotTimeOrdered {
            train: train.clone(),
            event: event.clone(),
            previous: EventId::parse("E1").unwrap(),
        };
        assert_eq!(err.to_string(), "event E2 of train T001 is not after event E1");

        let err = TimetableError::MissingDwell {
            train: train.clone(),
            event: event.clone(),
        };
        assert_eq!(err.to_string(), "event E2 of train T001 has no dwell duration");

        let err = TimetableError::NoSegment {
            train,
            event,
            from: StationId::parse("S3").unwrap(),
            to: StationId::parse("S1").unwrap(),
        };
        assert_eq!(
            err.to_string(),
            "train T001 runs from S3 to S1 (event E2) but no segment joins them"
        );
    }

    #[test]
    fn validation_error_display() {
        let err = ValidationError {
            occupancy: PlatformOccupancy {
                train: TrainId::parse("T002").unwrap(),
                station: StationId::parse("S3").unwrap(),
                platform: PlatformId::parse("S3P3").unwrap(),
                window: TimeWindow::new(time("08:35"), time("08:45")).unwrap(),
                events: vec![EventId::parse("E2").unwrap()],
            },
            train_length_m: 500.0,
            platform_length_m: 300.0,
        };
        assert_eq!(
            err.to_string(),
            "train T002 (500 m) does not fit platform S3P3 (300 m) at station S3"
        );
    }
}
