//! Train and event classification types.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::TrainId;

/// Service class of a train.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrainClass {
    Passenger,
    Freight,
    Express,
}

impl fmt::Display for TrainClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TrainClass::Passenger => "passenger",
            TrainClass::Freight => "freight",
            TrainClass::Express => "express",
        };
        f.write_str(name)
    }
}

/// Dispatch priority. Lower numbers are more important.
///
/// `Priority(0)` outranks `Priority(3)`: when two trains conflict the one
/// with the larger number yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Priority(pub u8);

impl Priority {
    /// True if this priority yields to `other`.
    pub fn yields_to(&self, other: Priority) -> bool {
        self.0 > other.0
    }
}

/// Error returned when a train record is malformed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvalidTrain {
    #[error("train {0} must have a positive length")]
    NonPositiveLength(TrainId),

    #[error("train {0} must have a positive average speed")]
    NonPositiveSpeed(TrainId),
}

/// A train taking part in a timetable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Train {
    #[serde(rename = "train_id")]
    pub id: TrainId,
    #[serde(rename = "type")]
    pub class: TrainClass,
    pub priority: Priority,
    pub avg_speed_kmh: f64,
    pub length_m: f64,
}

impl Train {
    /// Create a validated train.
    pub fn new(
        id: TrainId,
        class: TrainClass,
        priority: Priority,
        avg_speed_kmh: f64,
        length_m: f64,
    ) -> Result<Self, InvalidTrain> {
        let train = Self {
            id,
            class,
            priority,
            avg_speed_kmh,
            length_m,
        };
        train.validate()?;
        Ok(train)
    }

    /// Check the invariants of a (possibly deserialized) train.
    pub fn validate(&self) -> Result<(), InvalidTrain> {
        // NaN fails both comparisons, so it is rejected here too.
        if !(self.length_m > 0.0) {
            return Err(InvalidTrain::NonPositiveLength(self.id.clone()));
        }
        if !(self.avg_speed_kmh > 0.0) {
            return Err(InvalidTrain::NonPositiveSpeed(self.id.clone()));
        }
        Ok(())
    }
}

/// Whether an event is an arrival or a departure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Arrival,
    Departure,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Arrival => f.write_str("arrival"),
            EventKind::Departure => f.write_str("departure"),
        }
    }
}
