//! How missing dwell durations are handled.

use serde::{Deserialize, Serialize};

use crate::domain::EventKind;

/// Default platform time after an arrival, in seconds.
pub const DEFAULT_ARRIVAL_DWELL_SEC: u32 = 300;

/// Default platform time before a departure, in seconds.
pub const DEFAULT_DEPARTURE_DWELL_SEC: u32 = 120;

/// Policy for event records that carry no dwell duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum DwellPolicy {
    /// A missing dwell rejects the timetable.
    Require,
    /// A missing dwell is filled with a per-kind default.
    Default { arrival_sec: u32, departure_sec: u32 },
}

impl DwellPolicy {
    /// Resolve the dwell for an event, or `None` if the policy rejects it.
    pub fn resolve(&self, kind: EventKind, given: Option<u32>) -> Option<u32> {
        match (given, self) {
            (Some(dwell), _) => Some(dwell),
            (None, DwellPolicy::Require) => None,
            (None, DwellPolicy::Default { arrival_sec, .. }) if kind == EventKind::Arrival => {
                Some(*arrival_sec)
            }
            (None, DwellPolicy::Default { departure_sec, .. }) => Some(*departure_sec),
        }
    }
}

impl Default for DwellPolicy {
    fn default() -> Self {
        DwellPolicy::Default {
            arrival_sec: DEFAULT_ARRIVAL_DWELL_SEC,
            departure_sec: DEFAULT_DEPARTURE_DWELL_SEC,
        }
    }
}
