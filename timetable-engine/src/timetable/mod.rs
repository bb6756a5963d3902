//! Timetable store: validated per-train events and derived records.
//!
//! A [`Timetable`] is an immutable snapshot. Platform occupancy and segment
//! traversals are derived from it on demand and never stored.

mod error;
mod event;
mod occupancy;
mod policy;
mod snapshot;
mod traversal;

pub use error::{TimetableError, ValidationError};
pub use event::{EventRecord, TimetableEvent};
pub use occupancy::{OccupancyDerivation, PlatformOccupancy};
pub use policy::{DwellPolicy, DEFAULT_ARRIVAL_DWELL_SEC, DEFAULT_DEPARTURE_DWELL_SEC};
pub use snapshot::{EventChange, Timetable};
pub use traversal::Traversal;
