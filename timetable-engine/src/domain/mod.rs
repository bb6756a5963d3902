//! Domain types for the timetable engine.
//!
//! This module contains the value types shared by every engine component.
//! All types enforce their invariants at construction time, so code that
//! receives these types can trust their validity.

mod ids;
mod time;
mod train;

pub use ids::{EventId, InvalidId, PlatformId, SegmentId, StationId, TrainId};
pub use time::{RailTime, TimeError, TimeWindow};
pub use train::{EventKind, InvalidTrain, Priority, Train, TrainClass};
