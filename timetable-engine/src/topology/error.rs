//! Topology error types.

use std::path::PathBuf;

use crate::domain::{PlatformId, SegmentId, StationId};

/// Errors raised while building the network graph.
///
/// Any of these rejects the whole network: the graph is never partially
/// constructed.
#[derive(Debug, thiserror::Error)]
pub enum TopologyError {
    /// Reading the network document failed
    #[error("failed to read network from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The network document is not valid JSON for the schema
    #[error("network JSON parse error: {message}")]
    Json { message: String },

    /// Two stations share an id
    #[error("duplicate station {0}")]
    DuplicateStation(StationId),

    /// Two platforms of one station share an id
    #[error("duplicate platform {platform} at station {station}")]
    DuplicatePlatform {
        station: StationId,
        platform: PlatformId,
    },

    /// A platform has a non-positive length
    #[error("platform {platform} at station {station} must have a positive length")]
    InvalidPlatformLength {
        station: StationId,
        platform: PlatformId,
    },

    /// Two segments share an id
    #[error("duplicate segment {0}")]
    DuplicateSegment(SegmentId),

    /// Two segments connect the same ordered pair of stations
    #[error("segments {first} and {second} both run from {from} to {to}")]
    ParallelSegments {
        first: SegmentId,
        second: SegmentId,
        from: StationId,
        to: StationId,
    },

    /// A segment references a station that does not exist
    #[error("segment {segment} references unknown station {station}")]
    UnknownStation {
        segment: SegmentId,
        station: StationId,
    },

    /// A segment starts and ends at the same station
    #[error("segment {0} starts and ends at the same station")]
    SelfLoop(SegmentId),

    /// A segment admits no trains
    #[error("segment {0} must have capacity of at least 1")]
    ZeroCapacity(SegmentId),
}
