//! Data transfer objects for web requests and responses.

use serde::{Deserialize, Serialize};

use crate::constraints::Constraint;
use crate::detect::Conflict;
use crate::domain::{PlatformId, SegmentId, StationId, Train};
use crate::repair::{AppliedMove, RepairOutcome};
use crate::scenario::{MetricsDelta, Scenario, ScenarioMetrics};
use crate::timetable::{DwellPolicy, EventRecord, PlatformOccupancy};
use crate::topology::TopologyGraph;

/// A timetable and the constraints to check it against.
#[derive(Debug, Clone, Deserialize)]
pub struct TimetableRequest {
    pub trains: Vec<Train>,

    pub events: Vec<EventRecord>,

    #[serde(default)]
    pub constraints: Vec<Constraint>,

    /// Overrides the server's dwell policy for this request
    #[serde(default)]
    pub dwell_policy: Option<DwellPolicy>,
}

/// Request to repair a timetable.
#[derive(Debug, Clone, Deserialize)]
pub struct RepairRequest {
    #[serde(flatten)]
    pub timetable: TimetableRequest,

    /// Overrides the server's iteration bound
    #[serde(default)]
    pub max_iterations: Option<usize>,
}

/// Conflicts found in a timetable.
#[derive(Debug, Serialize)]
pub struct DetectResponse {
    pub conflicts: Vec<Conflict>,

    /// Occupancies that could not be placed, as messages
    pub warnings: Vec<String>,
}

/// A repaired timetable.
#[derive(Debug, Serialize)]
pub struct RepairResponse {
    /// Snapshot version of the repaired timetable
    pub version: u64,

    pub iterations: usize,

    pub moves: Vec<AppliedMove>,

    /// Every event after repair, with `actual_time` set where it moved
    pub events: Vec<EventRecord>,

    pub occupancies: Vec<PlatformOccupancy>,
}

impl RepairResponse {
    pub fn from_outcome(outcome: &RepairOutcome, topology: &TopologyGraph) -> Self {
        Self {
            version: outcome.timetable.version(),
            iterations: outcome.iterations,
            moves: outcome.moves.clone(),
            events: outcome.timetable.to_records(),
            occupancies: outcome.timetable.occupancy_intervals(topology).occupancies,
        }
    }
}

/// Body returned when no repair exists.
#[derive(Debug, Serialize)]
pub struct InfeasibleResponse {
    pub error: String,

    pub iterations: usize,

    pub residual: Vec<Conflict>,
}

/// Request to evaluate a baseline and its variants.
#[derive(Debug, Clone, Deserialize)]
pub struct EvaluateRequest {
    pub baseline: Scenario,

    #[serde(default)]
    pub variants: Vec<Scenario>,
}

/// Metrics for every scenario, baseline first.
#[derive(Debug, Serialize)]
pub struct EvaluateResponse {
    pub results: Vec<ScenarioMetrics>,

    /// One entry per finished variant, relative to the baseline; empty
    /// when the baseline itself did not finish
    pub deltas: Vec<MetricsDelta>,
}

/// A station in the topology summary.
#[derive(Debug, Serialize)]
pub struct StationSummary {
    pub station_id: StationId,
    pub name: String,
    pub platforms: Vec<PlatformSummary>,
}

/// A platform in the topology summary.
#[derive(Debug, Serialize)]
pub struct PlatformSummary {
    pub platform_id: PlatformId,
    pub length_m: f64,
}

/// A segment in the topology summary.
#[derive(Debug, Serialize)]
pub struct SegmentSummary {
    pub segment_id: SegmentId,
    pub from: StationId,
    pub to: StationId,
    pub capacity: u32,
    pub travel_time_sec: u32,
}

/// The loaded network.
#[derive(Debug, Serialize)]
pub struct TopologyResponse {
    pub stations: Vec<StationSummary>,
    pub segments: Vec<SegmentSummary>,
}

impl TopologyResponse {
    pub fn from_graph(topology: &TopologyGraph) -> Self {
        let stations = topology
            .stations()
            .map(|s| StationSummary {
                station_id: s.id.clone(),
                name: s.name.clone(),
                platforms: s
                    .platforms()
                    .iter()
                    .map(|p| PlatformSummary {
                        platform_id: p.id.clone(),
                        length_m: p.length_m,
                    })
                    .collect(),
            })
            .collect();
        let segments = topology
            .segments()
            .map(|s| SegmentSummary {
                segment_id: s.id.clone(),
                from: s.from.clone(),
                to: s.to.clone(),
                capacity: s.capacity,
                travel_time_sec: s.travel_time_sec,
            })
            .collect();
        Self { stations, segments }
    }
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}
