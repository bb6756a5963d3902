//! Operational constraints and their lookup index.
//!
//! Constraints are a closed set of kinds. The registry only answers lookup
//! questions ("which closures touch this resource?"); deciding what counts
//! as a conflict is the detector's job.

use std::collections::HashMap;
use std::fmt;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{PlatformId, RailTime, SegmentId, StationId, TimeWindow};
use crate::topology::TopologyGraph;

/// An operational constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Constraint {
    /// A segment closed for a period.
    Maintenance {
        segment_id: SegmentId,
        start: RailTime,
        end: RailTime,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    /// Minimum gap between successive entries onto a segment.
    Headway {
        segment_id: SegmentId,
        min_gap_sec: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    /// A platform closed for a period.
    PlatformMaintenance {
        station_id: StationId,
        platform_id: PlatformId,
        start: RailTime,
        end: RailTime,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
}

/// The kind of a [`Constraint`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    Maintenance,
    Headway,
    PlatformMaintenance,
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintKind::Maintenance => f.write_str("maintenance"),
            ConstraintKind::Headway => f.write_str("headway"),
            ConstraintKind::PlatformMaintenance => f.write_str("platform_maintenance"),
        }
    }
}

impl Constraint {
    pub fn kind(&self) -> ConstraintKind {
        match self {
            Constraint::Maintenance { .. } => ConstraintKind::Maintenance,
            Constraint::Headway { .. } => ConstraintKind::Headway,
            Constraint::PlatformMaintenance { .. } => ConstraintKind::PlatformMaintenance,
        }
    }
}

/// Error returned when a constraint does not fit the topology.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConstraintError {
    #[error("constraint references unknown segment {0}")]
    UnknownSegment(SegmentId),

    #[error("constraint references unknown station {0}")]
    UnknownStation(StationId),

    #[error("constraint references unknown platform {platform} at station {station}")]
    UnknownPlatform {
        station: StationId,
        platform: PlatformId,
    },

    #[error("{kind} constraint ends ({end}) before it starts ({start})")]
    InvalidWindow {
        kind: ConstraintKind,
        start: RailTime,
        end: RailTime,
    },
}

/// Constraints of one scenario, indexed by resource.
#[derive(Debug, Clone, Default)]
pub struct ConstraintRegistry {
    constraints: Vec<Constraint>,
    /// Closure windows per segment, sorted by start.
    segment_closures: HashMap<SegmentId, Vec<TimeWindow>>,
    /// Closure windows per (station, platform), sorted by start.
    platform_closures: HashMap<(StationId, PlatformId), Vec<TimeWindow>>,
    /// Strictest headway per segment.
    headways: HashMap<SegmentId, Duration>,
}

impl ConstraintRegistry {
    /// Index `constraints`, checking every reference against `topology`.
    pub fn new(
        topology: &TopologyGraph,
        constraints: Vec<Constraint>,
    ) -> Result<Self, ConstraintError> {
        let mut registry = Self::default();

        for constraint in &constraints {
            match constraint {
                Constraint::Maintenance {
                    segment_id,
                    start,
                    end,
                    ..
                } => {
                    if topology.segment(segment_id).is_none() {
                        return Err(ConstraintError::UnknownSegment(segment_id.clone()));
                    }
                    let window = closure_window(ConstraintKind::Maintenance, *start, *end)?;
                    registry
                        .segment_closures
                        .entry(segment_id.clone())
                        .or_default()
                        .push(window);
                }
                Constraint::Headway {
                    segment_id,
                    min_gap_sec,
                    ..
                } => {
                    if topology.segment(segment_id).is_none() {
                        return Err(ConstraintError::UnknownSegment(segment_id.clone()));
                    }
                    let gap = Duration::seconds(i64::from(*min_gap_sec));
                    let entry = registry
                        .headways
                        .entry(segment_id.clone())
                        .or_insert(gap);
                    *entry = (*entry).max(gap);
                }
                Constraint::PlatformMaintenance {
                    station_id,
                    platform_id,
                    start,
                    end,
                    ..
                } => {
                    let station = topology
                        .station(station_id)
                        .ok_or_else(|| ConstraintError::UnknownStation(station_id.clone()))?;
                    if station.platform(platform_id).is_none() {
                        return Err(ConstraintError::UnknownPlatform {
                            station: station_id.clone(),
                            platform: platform_id.clone(),
                        });
                    }
                    let window =
                        closure_window(ConstraintKind::PlatformMaintenance, *start, *end)?;
                    registry
                        .platform_closures
                        .entry((station_id.clone(), platform_id.clone()))
                        .or_default()
                        .push(window);
                }
            }
        }

        for windows in registry
            .segment_closures
            .values_mut()
            .chain(registry.platform_closures.values_mut())
        {
            windows.sort();
        }

        debug!(
            constraints = constraints.len(),
            segment_closures = registry.segment_closures.len(),
            platform_closures = registry.platform_closures.len(),
            headways = registry.headways.len(),
            "Constraint registry built"
        );

        registry.constraints = constraints;
        Ok(registry)
    }

    /// A registry with no constraints.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The constraints in their original order.
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Maintenance windows on `segment`, sorted by start.
    pub fn segment_closures(&self, segment: &SegmentId) -> &[TimeWindow] {
        self.segment_closures
            .get(segment)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Maintenance windows on a platform, sorted by start.
    pub fn platform_closures(&self, station: &StationId, platform: &PlatformId) -> &[TimeWindow] {
        self.platform_closures
            .get(&(station.clone(), platform.clone()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The minimum entry gap on `segment`, if one applies.
    pub fn headway(&self, segment: &SegmentId) -> Option<Duration> {
        self.headways.get(segment).copied()
    }

    /// True if `window` intersects any maintenance window on `segment`.
    pub fn segment_closed_during(&self, segment: &SegmentId, window: &TimeWindow) -> bool {
        self.segment_closures(segment)
            .iter()
            .any(|closure| closure.overlaps(window))
    }

    /// True if `window` intersects any maintenance window on the platform.
    pub fn platform_closed_during(
        &self,
        station: &StationId,
        platform: &PlatformId,
        window: &TimeWindow,
    ) -> bool {
        self.platform_closures(station, platform)
            .iter()
            .any(|closure| closure.overlaps(window))
    }
}

fn closure_window(
    kind: ConstraintKind,
    start: RailTime,
    end: RailTime,
) -> Result<TimeWindow, ConstraintError> {
    TimeWindow::new(start, end).map_err(|_| ConstraintError::InvalidWindow { kind, start, end })
}
