//! The immutable network graph.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use tracing::debug;

use crate::domain::{PlatformId, SegmentId, StationId};

use super::error::TopologyError;
use super::network::{NetworkDocument, Platform, Segment, Station};

/// Stations, platforms and directed segments of one network.
///
/// Built once per process and shared read-only (typically behind an `Arc`)
/// by every scenario. There is no mutation API.
#[derive(Debug, Clone)]
pub struct TopologyGraph {
    stations: BTreeMap<StationId, Station>,
    segments: BTreeMap<SegmentId, Segment>,
    /// (from, to) -> segment, for traversal lookup.
    by_endpoints: HashMap<(StationId, StationId), SegmentId>,
    /// Outgoing segments per station, in segment id order.
    outgoing: HashMap<StationId, Vec<SegmentId>>,
}

impl TopologyGraph {
    /// Build a graph, checking every structural invariant.
    pub fn new(stations: Vec<Station>, segments: Vec<Segment>) -> Result<Self, TopologyError> {
        let mut station_map = BTreeMap::new();

        for station in stations {
            let mut seen = HashSet::new();
            for platform in &station.platforms {
                if !seen.insert(&platform.id) {
                    return Err(TopologyError::DuplicatePlatform {
                        station: station.id.clone(),
                        platform: platform.id.clone(),
                    });
                }
                if !(platform.length_m > 0.0) {
                    return Err(TopologyError::InvalidPlatformLength {
                        station: station.id.clone(),
                        platform: platform.id.clone(),
                    });
                }
            }

            let id = station.id.clone();
            if station_map.insert(id.clone(), station).is_some() {
                return Err(TopologyError::DuplicateStation(id));
            }
        }

        let mut segment_map = BTreeMap::new();
        let mut by_endpoints: HashMap<(StationId, StationId), SegmentId> = HashMap::new();
        let mut outgoing: HashMap<StationId, Vec<SegmentId>> = HashMap::new();

        for segment in segments {
            for station in [&segment.from, &segment.to] {
                if !station_map.contains_key(station) {
                    return Err(TopologyError::UnknownStation {
                        segment: segment.id.clone(),
                        station: station.clone(),
                    });
                }
            }
            if segment.from == segment.to {
                return Err(TopologyError::SelfLoop(segment.id));
            }
            if segment.capacity == 0 {
                return Err(TopologyError::ZeroCapacity(segment.id));
            }

            let key = (segment.from.clone(), segment.to.clone());
            if let Some(existing) = by_endpoints.get(&key) {
                return Err(TopologyError::ParallelSegments {
                    first: existing.clone(),
                    second: segment.id,
                    from: key.0,
                    to: key.1,
                });
            }

            if segment_map.contains_key(&segment.id) {
                return Err(TopologyError::DuplicateSegment(segment.id));
            }

            by_endpoints.insert(key, segment.id.clone());
            outgoing
                .entry(segment.from.clone())
                .or_default()
                .push(segment.id.clone());
            segment_map.insert(segment.id.clone(), segment);
        }

        for ids in outgoing.values_mut() {
            ids.sort();
        }

        debug!(
            stations = station_map.len(),
            segments = segment_map.len(),
            "Topology built"
        );

        Ok(Self {
            stations: station_map,
            segments: segment_map,
            by_endpoints,
            outgoing,
        })
    }

    /// Build a graph from a parsed network document.
    pub fn from_document(doc: NetworkDocument) -> Result<Self, TopologyError> {
        Self::new(doc.stations, doc.segments)
    }

    /// Load and build a graph from a JSON network file.
    pub fn load(path: &Path) -> Result<Self, TopologyError> {
        Self::from_document(NetworkDocument::load(path)?)
    }

    /// Look up a station by id.
    pub fn station(&self, id: &StationId) -> Option<&Station> {
        self.stations.get(id)
    }

    /// Look up a platform by (station, platform id).
    pub fn platform(&self, station: &StationId, platform: &PlatformId) -> Option<&Platform> {
        self.stations.get(station)?.platform(platform)
    }

    /// Look up a segment by id.
    pub fn segment(&self, id: &SegmentId) -> Option<&Segment> {
        self.segments.get(id)
    }

    /// Look up the segment running from `from` to `to`.
    pub fn segment_between(&self, from: &StationId, to: &StationId) -> Option<&Segment> {
        let id = self.by_endpoints.get(&(from.clone(), to.clone()))?;
        self.segments.get(id)
    }

    /// Segments leaving `station`, in id order.
    pub fn outgoing(&self, station: &StationId) -> impl Iterator<Item = &Segment> {
        self.outgoing
            .get(station)
            .into_iter()
            .flatten()
            .filter_map(|id| self.segments.get(id))
    }

    /// True if a single segment joins `from` to `to`.
    pub fn is_adjacent(&self, from: &StationId, to: &StationId) -> bool {
        self.outgoing(from).any(|segment| &segment.to == to)
    }

    /// All stations in id order.
    pub fn stations(&self) -> impl Iterator<Item = &Station> {
        self.stations.values()
    }

    /// All segments in id order.
    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.segments.values()
    }

    /// Returns the number of stations.
    pub fn station_count(&self) -> usize {
        self.stations.len()
    }

    /// Returns the number of segments.
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }
}
